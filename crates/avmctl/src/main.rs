use std::time::Duration;

use anyhow::Result;
use avmctl_core::{Config, OperationConfig, VmAction};
use clap::{CommandFactory, Parser};
use clap_complete::{generate, shells};
use tracing::{debug, error, info, trace};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod connection;
mod error;
mod output;

use cli::{BatchArgs, Cli, Commands, VmArgs};
use connection::{ConnectionManager, WaitSettings};
use error::AvmCtlError;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level
    init_tracing(cli.verbose);

    // Load configuration from specified path or default location
    let (config, config_path) = if let Some(config_file) = &cli.config_file {
        let path = std::path::PathBuf::from(config_file);
        debug!("Loading config from explicit path: {:?}", path);
        let config = Config::load_from_path(&path)?;
        (config, Some(path))
    } else {
        debug!("Loading config from default location");
        (Config::load()?, None)
    };
    let conn_mgr = ConnectionManager::with_config_path(config, config_path);

    if let Err(e) = execute_command(&cli, &conn_mgr).await {
        e.print_diagnostic();
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    // Check for RUST_LOG env var first, then fall back to verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "avmctl=warn,avmctl_core=warn",
            1 => "avmctl=info,avmctl_core=info",
            2 => "avmctl=debug,avmctl_core=debug",
            _ => "avmctl=trace,avmctl_core=trace",
        };
        tracing_subscriber::EnvFilter::new(level)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .compact(),
        )
        .init();

    debug!("Tracing initialized with verbosity level: {}", verbose);
}

fn wait_settings(cli: &Cli) -> WaitSettings {
    WaitSettings {
        poll_interval: cli.poll_interval.map(Duration::from_secs),
        wait_timeout: cli.wait_timeout.map(Duration::from_secs),
    }
}

fn vm_config(
    cli: &Cli,
    conn_mgr: &ConnectionManager,
    args: &VmArgs,
) -> Result<OperationConfig, AvmCtlError> {
    conn_mgr
        .resolve_settings(cli.profile.as_deref(), args.vm_name.as_deref(), &args.azure)?
        .operation_config(wait_settings(cli))
}

/// Shared config for a batch; its VM is the first target
fn batch_config(
    cli: &Cli,
    conn_mgr: &ConnectionManager,
    args: &BatchArgs,
) -> Result<OperationConfig, AvmCtlError> {
    let first = args.targets.first().ok_or_else(|| AvmCtlError::InvalidInput {
        message: "batch needs at least one --target".to_string(),
    })?;

    let mut settings =
        conn_mgr.resolve_settings(cli.profile.as_deref(), Some(&first.vm_name), &args.azure)?;
    if settings.resource_group.is_none() && args.targets.iter().all(|t| t.resource_group.is_some())
    {
        settings.resource_group = first.resource_group.clone();
    }
    settings.operation_config(wait_settings(cli))
}

async fn execute_command(cli: &Cli, conn_mgr: &ConnectionManager) -> Result<(), AvmCtlError> {
    // Log command execution with sanitized parameters
    info!("Command: {}", format_command(&cli.command));

    let start = std::time::Instant::now();
    let result = match &cli.command {
        Commands::Start(args) => {
            let config = vm_config(cli, conn_mgr, args)?;
            commands::vm::handle_action(config, VmAction::Start, cli.output).await
        }
        Commands::Stop { deallocate, vm } => {
            let config = vm_config(cli, conn_mgr, vm)?;
            let action = if *deallocate {
                VmAction::Deallocate
            } else {
                VmAction::Stop
            };
            commands::vm::handle_action(config, action, cli.output).await
        }
        Commands::Status(args) => {
            let config = vm_config(cli, conn_mgr, args)?;
            commands::vm::handle_status(config, cli.output).await
        }
        Commands::EnsureRunning(args) => {
            let config = vm_config(cli, conn_mgr, args)?;
            commands::vm::handle_ensure_running(config, cli.output).await
        }
        Commands::Batch(args) => {
            let config = batch_config(cli, conn_mgr, args)?;
            commands::batch::handle_batch(config, &args.targets, args.action, cli.output).await
        }
        Commands::Profile(profile_cmd) => {
            debug!("Executing profile command");
            commands::profile::handle_profile_command(profile_cmd, conn_mgr, cli.output).await
        }
        Commands::Version => {
            debug!("Showing version information");
            let output_data = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "name": env!("CARGO_PKG_NAME"),
            });
            match cli.output {
                cli::OutputFormat::Json => {
                    output::print_output(&output_data, output::OutputFormat::Json)?
                }
                cli::OutputFormat::Yaml => {
                    output::print_output(&output_data, output::OutputFormat::Yaml)?
                }
                _ => println!("avmctl {}", env!("CARGO_PKG_VERSION")),
            }
            Ok(())
        }
        Commands::Completions { shell } => {
            debug!("Generating completions for {:?}", shell);
            generate_completions(*shell);
            Ok(())
        }
    };

    let duration = start.elapsed();
    match &result {
        Ok(_) => info!("Command completed successfully in {:?}", duration),
        Err(e) => error!("Command failed after {:?}: {}", duration, e),
    }
    trace!(?duration, "Command finished");

    result
}

/// Generate shell completions
fn generate_completions(shell: cli::Shell) {
    let mut cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    match shell {
        cli::Shell::Bash => generate(shells::Bash, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Zsh => generate(shells::Zsh, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::Fish => generate(shells::Fish, &mut cmd, name, &mut std::io::stdout()),
        cli::Shell::PowerShell => {
            generate(shells::PowerShell, &mut cmd, name, &mut std::io::stdout())
        }
        cli::Shell::Elvish => generate(shells::Elvish, &mut cmd, name, &mut std::io::stdout()),
    }
}

/// Format command for human-readable logging (without sensitive data)
fn format_command(command: &Commands) -> String {
    let vm = |args: &VmArgs| args.vm_name.clone().unwrap_or_else(|| "<profile vm>".to_string());

    match command {
        Commands::Start(args) => format!("start {}", vm(args)),
        Commands::Stop {
            deallocate: true,
            vm: args,
        } => format!("stop --deallocate {}", vm(args)),
        Commands::Stop { vm: args, .. } => format!("stop {}", vm(args)),
        Commands::Status(args) => format!("status {}", vm(args)),
        Commands::EnsureRunning(args) => format!("ensure-running {}", vm(args)),
        Commands::Batch(args) => format!("batch {} ({} targets)", args.action, args.targets.len()),
        Commands::Version => "version".to_string(),
        Commands::Completions { shell } => format!("completions {:?}", shell),
        Commands::Profile(cmd) => {
            use cli::ProfileCommands::*;
            match cmd {
                List { .. } => "profile list".to_string(),
                Path => "profile path".to_string(),
                Show { name } => format!("profile show {}", name),
                Set { name, .. } => format!("profile set {} [credentials redacted]", name),
                Remove { name, .. } => format!("profile remove {}", name),
                Default { name } => format!("profile default {}", name),
            }
        }
    }
}
