//! Configuration loading and management

use anyhow::{Context, Result, bail};
use costcat_sync_adapters::aws::AwsSettings;
use costcat_sync_domain::{DigestKeys, EffectiveStart, OwnershipMarker, usecases::SyncConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::args::LogFormat;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub categories: CategoriesConfig,

    #[serde(default)]
    pub digests: DigestsConfig,

    #[serde(default)]
    pub aws: AwsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoriesConfig {
    #[serde(default)]
    pub tags: TagList,

    #[serde(default = "default_start_year")]
    pub start_year: i32,

    #[serde(default = "default_start_month")]
    pub start_month: u8,

    #[serde(default = "default_owner_tag_key")]
    pub owner_tag_key: String,

    #[serde(default = "default_owner_tag_value")]
    pub owner_tag_value: String,
}

/// Tag keys as either `"A, B"` or `["A", "B"]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagList {
    Csv(String),
    List(Vec<String>),
}

impl Default for TagList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl TagList {
    /// Trimmed, non-empty tag keys
    pub fn keys(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            Self::Csv(s) => s.split(',').collect(),
            Self::List(items) => items.iter().map(String::as_str).collect(),
        };
        raw.into_iter()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestBackend {
    Ssm,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestsConfig {
    #[serde(default = "default_digest_backend")]
    pub backend: DigestBackend,

    #[serde(default = "default_accounts_key")]
    pub accounts_key: String,

    #[serde(default = "default_units_key")]
    pub units_key: String,

    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AwsConfig {
    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub endpoint_url: Option<String>,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_start_year() -> i32 {
    2024
}

fn default_start_month() -> u8 {
    1
}

fn default_owner_tag_key() -> String {
    OwnershipMarker::DEFAULT_KEY.to_string()
}

fn default_owner_tag_value() -> String {
    OwnershipMarker::DEFAULT_VALUE.to_string()
}

fn default_digest_backend() -> DigestBackend {
    DigestBackend::Ssm
}

fn default_accounts_key() -> String {
    "/costcat/org/accounts-digest".to_string()
}

fn default_units_key() -> String {
    "/costcat/org/units-digest".to_string()
}

fn default_sqlite_path() -> PathBuf {
    PathBuf::from("./digests.sqlite")
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            dry_run: false,
        }
    }
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            tags: TagList::default(),
            start_year: default_start_year(),
            start_month: default_start_month(),
            owner_tag_key: default_owner_tag_key(),
            owner_tag_value: default_owner_tag_value(),
        }
    }
}

impl Default for DigestsConfig {
    fn default() -> Self {
        Self {
            backend: default_digest_backend(),
            accounts_key: default_accounts_key(),
            units_key: default_units_key(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        // Try default config path if none specified
        let default_path = PathBuf::from("./config.toml");
        let path = config_path.unwrap_or(&default_path);

        if path.exists() {
            builder = builder.add_source(config::File::from(path));
        } else if config_path.is_some() {
            // User specified a path that doesn't exist
            bail!("Config file not found: {}", path.display());
        }

        // Add environment variable overrides
        builder = builder.add_source(
            config::Environment::with_prefix("COSTCAT_SYNC")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Log format from the `[general]` section
    pub fn log_format(&self) -> Result<LogFormat> {
        match self.general.log_format.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("Unknown log format '{}': expected text or json", other),
        }
    }

    /// Validate and convert into the sync run configuration
    pub fn to_sync_config(&self, dry_run_flag: bool) -> Result<SyncConfig> {
        let allowed_tag_keys = self.categories.tags.keys();
        if allowed_tag_keys.is_empty() {
            tracing::warn!("No tag keys configured, no cost category will be produced");
        }

        let effective_start =
            EffectiveStart::new(self.categories.start_year, self.categories.start_month)
                .context("Invalid [categories] start date")?;

        if self.digests.accounts_key.trim().is_empty() || self.digests.units_key.trim().is_empty()
        {
            bail!("Digest keys must not be empty");
        }
        if self.digests.accounts_key == self.digests.units_key {
            bail!("Accounts and units digest keys must differ");
        }

        Ok(SyncConfig {
            allowed_tag_keys,
            effective_start,
            marker: OwnershipMarker::new(
                &self.categories.owner_tag_key,
                &self.categories.owner_tag_value,
            ),
            digest_keys: DigestKeys {
                accounts: self.digests.accounts_key.clone(),
                units: self.digests.units_key.clone(),
            },
            dry_run: dry_run_flag || self.general.dry_run,
        })
    }

    pub fn aws_settings(&self) -> AwsSettings {
        AwsSettings {
            region: self.aws.region.clone(),
            endpoint_url: self.aws.endpoint_url.clone(),
        }
    }

    /// Generate example configuration as TOML string
    pub fn example_toml() -> String {
        r#"# costcat-sync configuration

[general]
log_level = "info"
log_format = "text"  # text, json
dry_run = false

[categories]
# Account tag keys turned into cost categories (comma-separated or array)
tags = "CostCenter, Team"
start_year = 2024
start_month = 1
owner_tag_key = "aws-finops-managed"
owner_tag_value = "true"

[digests]
backend = "ssm"  # ssm, sqlite
accounts_key = "/costcat/org/accounts-digest"
units_key = "/costcat/org/units-digest"
sqlite_path = "./digests.sqlite"

[aws]
# region = "us-east-1"
# endpoint_url = "http://localhost:4566"
"#
        .to_string()
    }
}
