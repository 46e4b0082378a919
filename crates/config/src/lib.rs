use anyhow::{Context, Result};
use colproto::{ReadOptions, RequiredFields};
use config_rs::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix, e.g. `COLPROTO_READER__BATCH_SIZE`
pub const ENV_PREFIX: &str = "COLPROTO";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Column file reader configuration
    #[serde(default)]
    pub reader: ReaderConfig,
}

/// Configuration for reading a column file split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Comma-separated schema indices of the fields to populate; empty means all
    #[serde(default)]
    pub required_fields: String,

    /// Rows decoded per parquet batch (default: 1024)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// First row group of the split
    #[serde(default)]
    pub start_row_group: usize,

    /// Number of row groups in the split, 0 for all remaining
    #[serde(default)]
    pub total_row_groups: usize,
}

fn default_batch_size() -> usize {
    1024
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            required_fields: String::new(),
            batch_size: default_batch_size(),
            start_row_group: 0,
            total_row_groups: 0,
        }
    }
}

impl Config {
    /// Load Config with layered configuration priority:
    /// 1. Default values
    /// 2. TOML file (if provided)
    /// 3. Environment variables (`COLPROTO_` prefix, `__` between sections)
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder()
            .set_default("reader.required_fields", "")?
            .set_default("reader.batch_size", default_batch_size() as i64)?
            .set_default("reader.start_row_group", 0)?
            .set_default("reader.total_row_groups", 0)?;

        if let Some(path) = config_file {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            builder = builder.add_source(File::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load Config from a TOML file, still allowing environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load(Some(path.as_ref()))
    }

    /// Load Config from defaults and environment variables only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.reader.validate()
    }
}

impl ReaderConfig {
    /// Validate the reader configuration
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.batch_size > 0, "reader batch_size must be greater than 0");
        anyhow::ensure!(
            self.required_fields
                .chars()
                .all(|c| c.is_ascii_digit() || c == ',' || c.is_whitespace()),
            "reader required_fields must be comma-separated field indices, got {:?}",
            self.required_fields
        );
        Ok(())
    }

    /// Parses the required fields directive
    pub fn required_fields(&self) -> Result<RequiredFields> {
        RequiredFields::parse(&self.required_fields).with_context(|| {
            format!("Invalid required_fields directive {:?}", self.required_fields)
        })
    }

    /// Split selection for the parquet source
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            start_row_group: self.start_row_group,
            total_row_groups: self.total_row_groups,
            batch_size: self.batch_size,
        }
    }
}
