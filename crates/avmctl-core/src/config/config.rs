//! Profile file management
//!
//! Profiles are stored as TOML with one table per profile. Values may
//! reference environment variables (`${VAR}` or `${VAR:-default}`) and the
//! client secret may be a `keyring:` reference. References are kept as written
//! in [`Config`] and only expanded by [`Profile::expanded`], so saving a loaded
//! config never writes environment values to disk.
//!
//! ```toml
//! default_profile = "prod"
//!
//! [profiles.prod]
//! subscription_id = "00000000-0000-0000-0000-000000000000"
//! tenant_id = "11111111-1111-1111-1111-111111111111"
//! client_id = "22222222-2222-2222-2222-222222222222"
//! client_secret = "${AZURE_CLIENT_SECRET}"
//! resource_group = "rg-web"
//! vm_name = "web-01"
//! mode = "prod"
//! webhook_url = "https://hooks.example.com/avm"
//! ```

#[cfg(target_os = "macos")]
use directories::BaseDirs;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::credential::CredentialStore;
use super::error::{ConfigError, Result};
use super::operation::CloudEndpoints;
use crate::types::OperationMode;

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct Config {
    /// Profile used when none is named explicitly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,
    /// Map of profile name -> profile configuration
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

/// One Azure subscription + service principal, optionally pinned to a VM
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    pub subscription_id: String,
    pub tenant_id: String,
    pub client_id: String,
    /// Plaintext, `${VAR}` or `keyring:<key>`
    pub client_secret: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<OperationMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    /// Sovereign cloud or test endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints: Option<CloudEndpoints>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl Profile {
    /// Check if the client secret lives in the keyring
    pub fn uses_keyring(&self) -> bool {
        CredentialStore::is_keyring_reference(&self.client_secret)
    }

    /// Copy of this profile with `${VAR}` references expanded
    pub fn expanded(&self) -> Profile {
        Profile {
            subscription_id: expand_env_vars(&self.subscription_id),
            tenant_id: expand_env_vars(&self.tenant_id),
            client_id: expand_env_vars(&self.client_id),
            client_secret: expand_env_vars(&self.client_secret),
            resource_group: self.resource_group.as_deref().map(expand_env_vars),
            vm_name: self.vm_name.as_deref().map(expand_env_vars),
            mode: self
                .mode
                .as_ref()
                .map(|mode| OperationMode::parse(&expand_env_vars(mode.as_str()))),
            webhook_url: self.webhook_url.as_deref().map(expand_env_vars),
            endpoints: self.endpoints.as_ref().map(|endpoints| CloudEndpoints {
                authority_host: expand_env_vars(&endpoints.authority_host),
                resource_manager: expand_env_vars(&endpoints.resource_manager),
                compute_api_version: endpoints.compute_api_version.clone(),
            }),
            tags: self.tags.clone(),
        }
    }

    /// Resolve the client secret through the credential store.
    ///
    /// Call on an [`expanded`](Self::expanded) profile when the secret may be
    /// a `${VAR}` reference.
    pub fn resolve_client_secret(&self) -> Result<String> {
        CredentialStore::new()
            .get_credential(&self.client_secret, None)
            .map_err(|e| {
                ConfigError::CredentialError(format!("Failed to resolve client secret: {}", e))
            })
    }

    /// Short masked preview of an identifier for display
    pub fn preview(value: &str) -> String {
        format!("{}...", value.chars().take(8).collect::<String>())
    }
}

impl Config {
    /// Resolve which profile to use
    ///
    /// Order: explicit name, `default_profile`, the alphabetically first profile.
    pub fn resolve_profile(&self, explicit_profile: Option<&str>) -> Result<String> {
        if let Some(name) = explicit_profile {
            return Ok(name.to_string());
        }

        if let Some(ref default) = self.default_profile {
            return Ok(default.clone());
        }

        self.list_profiles()
            .first()
            .map(|(name, _)| name.to_string())
            .ok_or_else(|| ConfigError::NoProfiles {
                suggestion: "Use 'avmctl profile set' to create a profile.".to_string(),
            })
    }

    /// Look up a profile, failing with `ProfileNotFound`
    pub fn get_profile(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::ProfileNotFound {
                name: name.to_string(),
            })
    }

    /// Load configuration from the standard location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path; a missing file is an empty config
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| ConfigError::LoadError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to the standard location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to_path(&config_path)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::SaveError {
                path: parent.display().to_string(),
                source: e,
            })?;
        }

        let content = toml::to_string_pretty(self)?;

        fs::write(config_path, content).map_err(|e| ConfigError::SaveError {
            path: config_path.display().to_string(),
            source: e,
        })?;

        Ok(())
    }

    /// Set or update a profile
    pub fn set_profile(&mut self, name: String, profile: Profile) {
        self.profiles.insert(name, profile);
    }

    /// Remove a profile by name, clearing the default if it pointed there
    pub fn remove_profile(&mut self, name: &str) -> Option<Profile> {
        if self.default_profile.as_deref() == Some(name) {
            self.default_profile = None;
        }
        self.profiles.remove(name)
    }

    /// List all profiles sorted by name
    pub fn list_profiles(&self) -> Vec<(&String, &Profile)> {
        let mut profiles: Vec<_> = self.profiles.iter().collect();
        profiles.sort_by_key(|(name, _)| *name);
        profiles
    }

    /// Get the path to the configuration file
    ///
    /// On macOS, `~/.config/avmctl/config.toml` is preferred when it exists,
    /// falling back to the platform location.
    /// On Linux: ~/.config/avmctl/config.toml
    /// On Windows: %APPDATA%\avmctl\avmctl\config.toml
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            if let Some(base_dirs) = BaseDirs::new() {
                let linux_style_path = base_dirs
                    .home_dir()
                    .join(".config")
                    .join("avmctl")
                    .join("config.toml");

                if linux_style_path
                    .parent()
                    .map(|p| p.exists())
                    .unwrap_or(false)
                {
                    return Ok(linux_style_path);
                }
            }
        }

        let proj_dirs =
            ProjectDirs::from("com", "avmctl", "avmctl").ok_or(ConfigError::ConfigDirError)?;

        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}

/// Expand `${VAR}` and `${VAR:-default}` references; unknown variables stay as-is
fn expand_env_vars(value: &str) -> String {
    shellexpand::env_with_context_no_errors(value, |var| std::env::var(var).ok()).to_string()
}
