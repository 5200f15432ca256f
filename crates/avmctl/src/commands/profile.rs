//! Profile management command implementations

use std::io::{self, Write};

use avmctl_core::{CloudEndpoints, OperationMode, Profile};
use colored::Colorize;
use serde_json::json;
use tracing::{debug, info, trace};

use crate::cli::{OutputFormat, ProfileCommands};
use crate::connection::ConnectionManager;
use crate::error::{AvmCtlError, Result as CliResult};
use crate::output;

/// Values collected by `profile set`
pub struct ProfileInput<'a> {
    pub name: &'a str,
    pub subscription_id: &'a str,
    pub tenant_id: &'a str,
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub resource_group: Option<&'a str>,
    pub vm_name: Option<&'a str>,
    pub mode: Option<&'a str>,
    pub webhook_url: Option<&'a str>,
    pub authority_host: Option<&'a str>,
    pub resource_manager: Option<&'a str>,
    pub tags: &'a [String],
    pub make_default: bool,
    pub use_keyring: bool,
}

/// Handle profile management commands
pub async fn handle_profile_command(
    profile_cmd: &ProfileCommands,
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
) -> CliResult<()> {
    use ProfileCommands::*;

    match profile_cmd {
        List { tags } => handle_list(conn_mgr, output_format, tags),
        Path => handle_path(conn_mgr, output_format),
        Show { name } => handle_show(conn_mgr, name, output_format),
        Set {
            name,
            subscription_id,
            tenant_id,
            client_id,
            client_secret,
            resource_group,
            vm_name,
            mode,
            webhook_url,
            authority_host,
            resource_manager,
            tags,
            default,
            #[cfg(feature = "secure-storage")]
            use_keyring,
        } => {
            #[cfg(feature = "secure-storage")]
            let use_keyring = *use_keyring;
            #[cfg(not(feature = "secure-storage"))]
            let use_keyring = false;

            handle_set(
                conn_mgr,
                &ProfileInput {
                    name,
                    subscription_id,
                    tenant_id,
                    client_id,
                    client_secret,
                    resource_group: resource_group.as_deref(),
                    vm_name: vm_name.as_deref(),
                    mode: mode.as_deref(),
                    webhook_url: webhook_url.as_deref(),
                    authority_host: authority_host.as_deref(),
                    resource_manager: resource_manager.as_deref(),
                    tags,
                    make_default: *default,
                    use_keyring,
                },
            )
        }
        Remove { name, yes } => handle_remove(conn_mgr, name, *yes),
        Default { name } => handle_default(conn_mgr, name),
    }
}

fn structured(output_format: OutputFormat) -> Option<output::OutputFormat> {
    match output_format {
        OutputFormat::Json => Some(output::OutputFormat::Json),
        OutputFormat::Yaml => Some(output::OutputFormat::Yaml),
        OutputFormat::Auto | OutputFormat::Table => None,
    }
}

fn secret_storage(profile: &Profile) -> &'static str {
    if profile.uses_keyring() {
        "keyring"
    } else if profile.client_secret.starts_with("${") {
        "environment"
    } else {
        "config file"
    }
}

fn handle_list(
    conn_mgr: &ConnectionManager,
    output_format: OutputFormat,
    tag_filter: &[String],
) -> CliResult<()> {
    debug!("Listing all configured profiles");
    let profiles: Vec<_> = conn_mgr
        .config
        .list_profiles()
        .into_iter()
        .filter(|(_, profile)| {
            tag_filter.is_empty() || profile.tags.iter().any(|t| tag_filter.contains(t))
        })
        .collect();
    trace!("Found {} profiles", profiles.len());
    let default_name = conn_mgr.config.default_profile.as_deref();
    let config_path = conn_mgr.effective_config_path();

    if let Some(fmt) = structured(output_format) {
        let profile_list: Vec<serde_json::Value> = profiles
            .iter()
            .map(|(name, profile)| {
                let mut obj = json!({
                    "name": name,
                    "is_default": default_name == Some(name.as_str()),
                    "subscription_id": profile.subscription_id,
                    "resource_group": profile.resource_group,
                    "vm_name": profile.vm_name,
                    "mode": profile.mode.clone().unwrap_or_default(),
                });
                if !profile.tags.is_empty() {
                    obj["tags"] = json!(&profile.tags);
                }
                obj
            })
            .collect();

        output::print_output(
            json!({
                "config_path": config_path.map(|p| p.display().to_string()),
                "profiles": profile_list,
                "count": profiles.len(),
            }),
            fmt,
        )?;
        return Ok(());
    }

    if let Some(path) = config_path {
        println!("Configuration file: {}", path.display());
        println!();
    }

    if profiles.is_empty() {
        info!("No profiles configured");
        println!("No profiles configured.");
        println!("Use 'avmctl profile set' to create a profile.");
        return Ok(());
    }

    for (name, profile) in &profiles {
        let tag_suffix = if profile.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", profile.tags.join(", "))
                .dimmed()
                .to_string()
        };
        if default_name == Some(name.as_str()) {
            println!(
                "  {} {}{}",
                name.bold().cyan(),
                "(default)".green(),
                tag_suffix
            );
        } else {
            println!("  {}{}", name.bold().cyan(), tag_suffix);
        }
        println!(
            "    {} {}",
            "Subscription:".dimmed(),
            profile.subscription_id
        );
        if let Some(vm) = &profile.vm_name {
            println!(
                "    {}           {}/{}",
                "VM:".dimmed(),
                profile.resource_group.as_deref().unwrap_or("-"),
                vm
            );
        }
    }

    Ok(())
}

fn handle_path(conn_mgr: &ConnectionManager, output_format: OutputFormat) -> CliResult<()> {
    let config_path = conn_mgr
        .effective_config_path()
        .ok_or_else(|| AvmCtlError::Config("Could not determine config directory".to_string()))?;

    match structured(output_format) {
        Some(fmt) => output::print_output(
            json!({ "config_path": config_path.display().to_string() }),
            fmt,
        )?,
        None => println!("{}", config_path.display()),
    }
    Ok(())
}

fn handle_show(
    conn_mgr: &ConnectionManager,
    name: &str,
    output_format: OutputFormat,
) -> CliResult<()> {
    let profile = conn_mgr.config.get_profile(name)?;
    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    let mode = profile.mode.clone().unwrap_or_default();

    if let Some(fmt) = structured(output_format) {
        let mut data = json!({
            "name": name,
            "is_default": is_default,
            "subscription_id": profile.subscription_id,
            "tenant_id": profile.tenant_id,
            "client_id_preview": Profile::preview(&profile.client_id),
            "client_secret": secret_storage(profile),
            "resource_group": profile.resource_group,
            "vm_name": profile.vm_name,
            "mode": mode,
            "webhook_url": profile.webhook_url,
        });
        if let Some(endpoints) = &profile.endpoints {
            data["endpoints"] = json!(endpoints);
        }
        if !profile.tags.is_empty() {
            data["tags"] = json!(&profile.tags);
        }
        output::print_output(&data, fmt)?;
        return Ok(());
    }

    println!("Profile: {}", name);
    println!("Subscription: {}", profile.subscription_id);
    println!("Tenant: {}", profile.tenant_id);
    println!("Client ID: {}", Profile::preview(&profile.client_id));
    println!("Client Secret: configured ({})", secret_storage(profile));
    if let Some(group) = &profile.resource_group {
        println!("Resource Group: {}", group);
    }
    if let Some(vm) = &profile.vm_name {
        println!("VM: {}", vm);
    }
    println!("Mode: {}", mode);
    if let Some(url) = &profile.webhook_url {
        println!("Webhook: {}", url);
    }
    if let Some(endpoints) = &profile.endpoints {
        println!("Authority: {}", endpoints.authority_host);
        println!("Resource Manager: {}", endpoints.resource_manager);
    }
    if !profile.tags.is_empty() {
        println!("Tags: {}", profile.tags.join(", "));
    }
    if is_default {
        println!("Default: yes");
    }
    Ok(())
}

fn handle_set(conn_mgr: &ConnectionManager, input: &ProfileInput<'_>) -> CliResult<()> {
    debug!("Setting profile: {}", input.name);
    let existing = conn_mgr.config.profiles.get(input.name);
    if existing.is_some() {
        info!(profile = %input.name, "Replacing existing profile");
    }

    let client_secret = if input.use_keyring {
        store_in_keyring(input.name, input.client_secret)?
    } else {
        input.client_secret.to_string()
    };

    let endpoints = if input.authority_host.is_some() || input.resource_manager.is_some() {
        let defaults = CloudEndpoints::default();
        Some(CloudEndpoints {
            authority_host: input
                .authority_host
                .map(str::to_string)
                .unwrap_or(defaults.authority_host),
            resource_manager: input
                .resource_manager
                .map(str::to_string)
                .unwrap_or(defaults.resource_manager),
            compute_api_version: defaults.compute_api_version,
        })
    } else {
        existing.and_then(|p| p.endpoints.clone())
    };

    // Keep existing tags unless new ones were given
    let tags = if input.tags.is_empty() {
        existing.map(|p| p.tags.clone()).unwrap_or_default()
    } else {
        input.tags.to_vec()
    };

    let profile = Profile {
        subscription_id: input.subscription_id.to_string(),
        tenant_id: input.tenant_id.to_string(),
        client_id: input.client_id.to_string(),
        client_secret,
        resource_group: input.resource_group.map(str::to_string),
        vm_name: input.vm_name.map(str::to_string),
        mode: input.mode.map(OperationMode::parse),
        webhook_url: input.webhook_url.map(str::to_string),
        endpoints,
        tags,
    };

    let mut config = conn_mgr.config.clone();
    config.set_profile(input.name.to_string(), profile);

    let is_first = config.profiles.len() == 1;
    if input.make_default || is_first {
        config.default_profile = Some(input.name.to_string());
    }

    conn_mgr.save_config(&config)?;

    println!("Profile '{}' saved successfully.", input.name);
    if config.default_profile.as_deref() == Some(input.name) {
        println!("Profile '{}' is the default profile.", input.name);
    }
    Ok(())
}

#[cfg(feature = "secure-storage")]
fn store_in_keyring(profile_name: &str, secret: &str) -> CliResult<String> {
    use anyhow::Context;
    use avmctl_core::config::CredentialStore;

    let reference = CredentialStore::new()
        .store_credential(&format!("{}-client-secret", profile_name), secret)
        .context("Failed to store client secret in keyring")?;
    Ok(reference)
}

#[cfg(not(feature = "secure-storage"))]
fn store_in_keyring(_profile_name: &str, _secret: &str) -> CliResult<String> {
    Err(AvmCtlError::Config(
        "keyring support is not compiled in (feature 'secure-storage')".to_string(),
    ))
}

fn handle_remove(conn_mgr: &ConnectionManager, name: &str, skip_confirm: bool) -> CliResult<()> {
    debug!("Removing profile: {}", name);
    conn_mgr.config.get_profile(name)?;

    let is_default = conn_mgr.config.default_profile.as_deref() == Some(name);
    if is_default {
        println!("Warning: '{}' is the default profile.", name);
    }

    if !skip_confirm && !confirm(&format!("Are you sure you want to remove profile '{}'?", name))? {
        println!("Profile removal cancelled.");
        return Ok(());
    }

    let mut config = conn_mgr.config.clone();
    config.remove_profile(name);
    conn_mgr.save_config(&config)?;

    if is_default {
        println!("Default profile cleared.");
    }
    println!("Profile '{}' removed successfully.", name);
    Ok(())
}

fn handle_default(conn_mgr: &ConnectionManager, name: &str) -> CliResult<()> {
    debug!("Setting default profile: {}", name);
    conn_mgr.config.get_profile(name)?;

    let mut config = conn_mgr.config.clone();
    config.default_profile = Some(name.to_string());
    conn_mgr.save_config(&config)?;

    println!("Default profile set to '{}'.", name);
    Ok(())
}

fn confirm(prompt: &str) -> CliResult<bool> {
    print!("{} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}
