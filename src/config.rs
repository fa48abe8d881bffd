//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.queueboard.toml` files.

use crate::api::ApiConfig;
use crate::models::WorkspaceDirectory;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = ".queueboard.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Routing API settings.
    #[serde(default)]
    pub api: ApiSettings,

    /// Workspace id -> label.
    #[serde(default = "default_workspaces")]
    pub workspaces: BTreeMap<String, String>,

    /// Audit log settings.
    #[serde(default)]
    pub audit: AuditConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            api: ApiSettings::default(),
            workspaces: default_workspaces(),
            audit: AuditConfig::default(),
        }
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Workspace preselected by `stats` when `--workspace` is not given.
    /// Use "All" to show every workspace.
    #[serde(default = "default_workspace")]
    pub default_workspace: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_workspace: default_workspace(),
            verbose: false,
        }
    }
}

fn default_workspace() -> String {
    "Sales".to_string()
}

/// Routing API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the routing API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. Prefer the CHILI_API_KEY environment variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Queues requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Admin console base URL used for queue links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_base_url: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            page_size: default_page_size(),
            timeout_seconds: default_timeout(),
            admin_base_url: None,
        }
    }
}

fn default_base_url() -> String {
    "https://edge.na.chilipiper.com".to_string()
}

fn default_page_size() -> usize {
    100
}

fn default_timeout() -> u64 {
    30
}

fn default_workspaces() -> BTreeMap<String, String> {
    [
        ("64ad3cc865a4906cd3cc2dcf", "Sales"),
        ("61b9daad2747672e7282273d", "CS"),
    ]
    .into_iter()
    .map(|(id, label)| (id.to_string(), label.to_string()))
    .collect()
}

/// Audit log settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    /// JSON-lines file that receives audit rows. Auditing is off when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,

    /// Acting user recorded on audit rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment variables) take precedence over
    /// config file settings, but only when they were actually provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref key) = args.api_key {
            self.api.api_key = Some(key.clone());
        }
        if let Some(ref url) = args.base_url {
            self.api.base_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.api.timeout_seconds = timeout;
        }
        if let Some(ref actor) = args.actor {
            self.audit.actor = Some(actor.clone());
        }
        if let Some(ref path) = args.audit_log {
            self.audit.log_path = Some(path.clone());
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Connection settings for the routing client. Fails without an API key.
    pub fn api_config(&self) -> Result<ApiConfig> {
        let api_key = match self.api.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => bail!(
                "CHILI_API_KEY is not set. Export it, pass --api-key, or set api.api_key in {}",
                CONFIG_FILE
            ),
        };

        Ok(ApiConfig {
            base_url: self.api.base_url.clone(),
            api_key,
            page_size: self.api.page_size,
            timeout_seconds: self.api.timeout_seconds,
        })
    }

    pub fn workspace_directory(&self) -> WorkspaceDirectory {
        WorkspaceDirectory::new(self.workspaces.clone())
    }

    /// Acting user for audit rows: config, then `$USER`, then "unknown".
    pub fn actor(&self) -> String {
        self.audit
            .actor
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "unknown".to_string())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.general.default_workspace, "Sales");
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.api.timeout_seconds, 30);
        assert_eq!(
            config.workspaces.get("61b9daad2747672e7282273d").map(String::as_str),
            Some("CS")
        );
        assert!(config.audit.log_path.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
default_workspace = "All"
verbose = true

[api]
base_url = "https://routing.example.com"
api_key = "abc123"
page_size = 50
admin_base_url = "https://admin.example.com"

[workspaces]
ws-1 = "Sales"
ws-2 = "CS"

[audit]
log_path = "audit/queueboard.jsonl"
actor = "ops@example.com"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.default_workspace, "All");
        assert!(config.general.verbose);
        assert_eq!(config.api.base_url, "https://routing.example.com");
        assert_eq!(config.api.page_size, 50);
        assert_eq!(config.workspaces.len(), 2);
        assert_eq!(config.workspace_directory().label("ws-2"), "CS");
        assert_eq!(
            config.audit.log_path,
            Some(PathBuf::from("audit/queueboard.jsonl"))
        );
        assert_eq!(config.actor(), "ops@example.com");

        let api = config.api_config().unwrap();
        assert_eq!(api.api_key, "abc123");
        assert_eq!(api.page_size, 50);
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let config: Config = toml::from_str("").unwrap();
        let err = config.api_config().unwrap_err();
        assert!(err.to_string().contains("CHILI_API_KEY"));

        let blank: Config = toml::from_str("[api]\napi_key = \"  \"\n").unwrap();
        assert!(blank.api_config().is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[workspaces]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.workspaces, default_workspaces());
    }
}
