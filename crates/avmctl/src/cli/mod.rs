//! CLI structure and command definitions

use avmctl_core::{VmAction, VmTarget};
use clap::{Args, Parser, Subcommand};

pub mod profile;

pub use profile::ProfileCommands;

/// Azure VM power control: start, stop, deallocate and check status
#[derive(Parser, Debug)]
#[command(name = "avmctl")]
#[command(version, about = "Azure VM power control from the command line")]
#[command(long_about = "
Azure VM power control from the command line

Settings are taken from flags, then environment variables, then the
selected profile:
    AZURE_SUBSCRIPTION_ID  AZURE_RESOURCE_GROUP  AZURE_VM_NAME
    AZURE_TENANT_ID        AZURE_CLIENT_ID       AZURE_CLIENT_SECRET
    MODE                   WEBHOOK_URL

In 'dev' mode (the default) each outcome is printed locally; any other
mode posts it to WEBHOOK_URL.

EXAMPLES:
    # Store a service principal and a default VM
    avmctl profile set prod --subscription-id SUB --tenant-id TENANT \\
        --client-id CLIENT --client-secret SECRET \\
        --resource-group rg-web --vm-name web-01

    # Start, check, stop
    avmctl start
    avmctl status -o json
    avmctl stop --deallocate

    # Several VMs in one go
    avmctl batch stop --target web-01 --target web-02:rg-other

For more help on a specific command, run:
    avmctl <command> --help
")]
pub struct Cli {
    /// Profile to use for this command
    #[arg(long, short, global = true, env = "AVMCTL_PROFILE")]
    pub profile: Option<String>,

    /// Path to alternate configuration file
    #[arg(long, global = true, env = "AVMCTL_CONFIG_FILE")]
    pub config_file: Option<String>,

    /// Output format
    #[arg(long, short = 'o', global = true, value_enum, default_value = "auto")]
    pub output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, short, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Give up waiting on start/stop after this many seconds (default: wait until done)
    #[arg(long, global = true, value_name = "SECONDS")]
    pub wait_timeout: Option<u64>,

    /// Seconds between status polls when Azure sends no Retry-After
    #[arg(long, global = true, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format options
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable messages
    Auto,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
    /// Table output
    Table,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a VM and wait until it is running
    Start(VmArgs),

    /// Power off a VM; add --deallocate to release its compute as well
    #[command(after_help = "EXAMPLES:
    # Power off (still billed for compute)
    avmctl stop --vm-name web-01

    # Power off and deallocate
    avmctl stop --vm-name web-01 --deallocate
")]
    Stop {
        /// Deallocate instead of only powering off
        #[arg(long)]
        deallocate: bool,

        #[command(flatten)]
        vm: VmArgs,
    },

    /// Show the VM's power state
    #[command(visible_alias = "st")]
    Status(VmArgs),

    /// Start the VM only if it is not already running
    EnsureRunning(VmArgs),

    /// Apply one action to several VMs, one after another
    #[command(after_help = "EXAMPLES:
    # Targets default to --resource-group / the profile's resource group
    avmctl batch start --target web-01 --target web-02

    # Per-target resource group
    avmctl batch status -t web-01:rg-a -t web-02:rg-b -o table
")]
    Batch(BatchArgs),

    /// Profile management
    #[command(subcommand, visible_alias = "prof", visible_alias = "pr")]
    #[command(after_help = "EXAMPLES:
    # Create a profile
    avmctl profile set prod --subscription-id SUB --tenant-id TENANT \\
        --client-id CLIENT --client-secret SECRET

    # List all profiles
    avmctl profile list

    # Show profile details
    avmctl profile show prod

    # Set the default profile
    avmctl profile default prod
")]
    Profile(ProfileCommands),

    /// Version information
    #[command(visible_alias = "ver", visible_alias = "v")]
    Version,

    /// Generate shell completions
    #[command(visible_alias = "comp")]
    #[command(after_help = "EXAMPLES:
    # Bash
    avmctl completions bash > ~/.local/share/bash-completion/completions/avmctl

    # Zsh
    avmctl completions zsh > ~/.zfunc/_avmctl
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    #[value(name = "powershell", alias = "power-shell")]
    PowerShell,
    Elvish,
}

/// Azure subscription, service principal and notification settings
#[derive(Args, Debug, Clone, Default)]
pub struct AzureArgs {
    /// Azure subscription id
    #[arg(long, env = "AZURE_SUBSCRIPTION_ID")]
    pub subscription_id: Option<String>,

    /// Resource group containing the VM
    #[arg(long, short = 'g', env = "AZURE_RESOURCE_GROUP")]
    pub resource_group: Option<String>,

    /// Entra ID tenant of the service principal
    #[arg(long, env = "AZURE_TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Service principal application (client) id
    #[arg(long, env = "AZURE_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Service principal secret
    #[arg(long, env = "AZURE_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Notification mode: 'dev' prints locally, anything else posts to the webhook
    #[arg(long, env = "MODE")]
    pub mode: Option<String>,

    /// Webhook receiving operation outcomes in non-dev modes
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,
}

/// Arguments shared by single-VM commands
#[derive(Args, Debug, Clone)]
pub struct VmArgs {
    /// VM name
    #[arg(long, short = 'n', env = "AZURE_VM_NAME")]
    pub vm_name: Option<String>,

    #[command(flatten)]
    pub azure: AzureArgs,
}

/// Arguments for `batch`
#[derive(Args, Debug, Clone)]
pub struct BatchArgs {
    /// Action to apply to every target
    #[arg(value_enum)]
    pub action: VmAction,

    /// Target VM as NAME or NAME:RESOURCE_GROUP (repeatable)
    #[arg(long = "target", short = 't', required = true, value_parser = parse_target)]
    pub targets: Vec<VmTarget>,

    #[command(flatten)]
    pub azure: AzureArgs,
}

fn parse_target(s: &str) -> Result<VmTarget, String> {
    s.parse::<VmTarget>().map_err(|e| e.to_string())
}
