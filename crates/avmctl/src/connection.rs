//! Settings resolution: flags and environment first, then the selected profile

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use avmctl_core::{
    CloudEndpoints, Config, OperationConfig, OperationMode, Profile, ServicePrincipal, VmIdentity,
};
use tracing::{debug, info, trace};

use crate::cli::AzureArgs;
use crate::error::{AvmCtlError, MissingSetting, Result as CliResult};

const SUBSCRIPTION_ID: MissingSetting = MissingSetting {
    name: "subscription id",
    flag: "--subscription-id",
    env: "AZURE_SUBSCRIPTION_ID",
};
const RESOURCE_GROUP: MissingSetting = MissingSetting {
    name: "resource group",
    flag: "--resource-group",
    env: "AZURE_RESOURCE_GROUP",
};
const VM_NAME: MissingSetting = MissingSetting {
    name: "vm name",
    flag: "--vm-name",
    env: "AZURE_VM_NAME",
};
const TENANT_ID: MissingSetting = MissingSetting {
    name: "tenant id",
    flag: "--tenant-id",
    env: "AZURE_TENANT_ID",
};
const CLIENT_ID: MissingSetting = MissingSetting {
    name: "client id",
    flag: "--client-id",
    env: "AZURE_CLIENT_ID",
};
const CLIENT_SECRET: MissingSetting = MissingSetting {
    name: "client secret",
    flag: "--client-secret",
    env: "AZURE_CLIENT_SECRET",
};

/// Loaded configuration plus where it came from
#[derive(Clone)]
pub struct ConnectionManager {
    pub config: Config,
    pub config_path: Option<PathBuf>,
}

/// How long to wait on long-running operations
#[derive(Debug, Clone, Copy)]
pub struct WaitSettings {
    pub poll_interval: Option<Duration>,
    pub wait_timeout: Option<Duration>,
}

/// Merged settings for one invocation; any field may still be missing
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub vm_name: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub mode: OperationMode,
    pub webhook_url: Option<String>,
    pub endpoints: CloudEndpoints,
}

impl ConnectionManager {
    /// Create a connection manager with a custom config path
    pub fn with_config_path(config: Config, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    /// Save the configuration to the appropriate location
    pub fn save_config(&self, config: &Config) -> CliResult<()> {
        if let Some(ref path) = self.config_path {
            config
                .save_to_path(path)
                .context("Failed to save configuration")?;
        } else {
            config.save().context("Failed to save configuration")?;
        }
        Ok(())
    }

    /// Path of the config file in use
    pub fn effective_config_path(&self) -> Option<PathBuf> {
        self.config_path
            .clone()
            .or_else(|| Config::config_path().ok())
    }

    /// Select the profile for this invocation.
    ///
    /// An explicitly named profile must exist. Without one, the default (or the
    /// only/first) profile is used when any are configured.
    fn select_profile(&self, profile_name: Option<&str>) -> CliResult<Option<(String, &Profile)>> {
        if let Some(name) = profile_name {
            let profile = self.config.get_profile(name)?;
            return Ok(Some((name.to_string(), profile)));
        }

        if self.config.profiles.is_empty() {
            debug!("No profiles configured; using flags and environment only");
            return Ok(None);
        }

        let name = self.config.resolve_profile(None)?;
        let profile = self.config.get_profile(&name)?;
        Ok(Some((name, profile)))
    }

    /// Merge flags/environment over the selected profile
    pub fn resolve_settings(
        &self,
        profile_name: Option<&str>,
        vm_name: Option<&str>,
        args: &AzureArgs,
    ) -> CliResult<Settings> {
        let selected = self.select_profile(profile_name)?;
        trace!(profile = ?selected.as_ref().map(|(n, _)| n), "Resolving settings");

        let Some((name, profile)) = selected else {
            return Ok(Settings {
                subscription_id: non_empty(args.subscription_id.clone()),
                resource_group: non_empty(args.resource_group.clone()),
                vm_name: non_empty(vm_name.map(str::to_string)),
                tenant_id: non_empty(args.tenant_id.clone()),
                client_id: non_empty(args.client_id.clone()),
                client_secret: non_empty(args.client_secret.clone()),
                mode: args
                    .mode
                    .as_deref()
                    .map(OperationMode::parse)
                    .unwrap_or_default(),
                webhook_url: non_empty(args.webhook_url.clone()),
                endpoints: CloudEndpoints::default(),
            });
        };

        info!(profile = %name, "Using profile");
        let profile = profile.expanded();

        // Only touch the keyring when no secret was given on the command line
        let client_secret = match non_empty(args.client_secret.clone()) {
            Some(secret) => Some(secret),
            None => non_empty(Some(profile.resolve_client_secret()?)),
        };

        Ok(Settings {
            subscription_id: non_empty(args.subscription_id.clone())
                .or_else(|| non_empty(Some(profile.subscription_id.clone()))),
            resource_group: non_empty(args.resource_group.clone())
                .or_else(|| non_empty(profile.resource_group.clone())),
            vm_name: non_empty(vm_name.map(str::to_string))
                .or_else(|| non_empty(profile.vm_name.clone())),
            tenant_id: non_empty(args.tenant_id.clone())
                .or_else(|| non_empty(Some(profile.tenant_id.clone()))),
            client_id: non_empty(args.client_id.clone())
                .or_else(|| non_empty(Some(profile.client_id.clone()))),
            client_secret,
            mode: args
                .mode
                .as_deref()
                .map(OperationMode::parse)
                .or_else(|| profile.mode.clone())
                .unwrap_or_default(),
            webhook_url: non_empty(args.webhook_url.clone())
                .or_else(|| non_empty(profile.webhook_url.clone())),
            endpoints: profile.endpoints.clone().unwrap_or_default(),
        })
    }
}

impl Settings {
    /// Build the operation config, reporting every missing setting at once
    pub fn operation_config(&self, wait: WaitSettings) -> CliResult<OperationConfig> {
        let required = [
            (&self.subscription_id, SUBSCRIPTION_ID),
            (&self.resource_group, RESOURCE_GROUP),
            (&self.vm_name, VM_NAME),
            (&self.tenant_id, TENANT_ID),
            (&self.client_id, CLIENT_ID),
            (&self.client_secret, CLIENT_SECRET),
        ];
        let missing: Vec<MissingSetting> = required
            .iter()
            .filter(|(value, _)| value.is_none())
            .map(|(_, setting)| setting.clone())
            .collect();
        if !missing.is_empty() {
            return Err(AvmCtlError::MissingSettings { missing });
        }

        let get = |value: &Option<String>| value.clone().unwrap_or_default();
        let mut config = OperationConfig::new(
            VmIdentity::new(
                get(&self.subscription_id),
                get(&self.resource_group),
                get(&self.vm_name),
            ),
            ServicePrincipal::new(
                get(&self.tenant_id),
                get(&self.client_id),
                get(&self.client_secret),
            ),
        )
        .with_mode(self.mode.clone())
        .with_endpoints(self.endpoints.clone())
        .with_wait_timeout(wait.wait_timeout);
        if let Some(interval) = wait.poll_interval {
            config = config.with_poll_interval(interval);
        }
        if let Some(url) = &self.webhook_url {
            config = config.with_webhook_url(url.clone());
        }

        debug!(vm = %config.vm, mode = %config.mode, "Operation config resolved");
        Ok(config)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
