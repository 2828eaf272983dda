//! Subcommands of the `recap` binary.

pub mod batch;
pub mod config;
pub mod extract;
pub mod scan;

use std::path::Path;

use recap_core::models::config::RecapConfig;

/// Output format for extracted fields.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

/// Load the configuration named by `--config`, or the user's config file,
/// or the defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RecapConfig> {
    if let Some(path) = config_path {
        return Ok(RecapConfig::from_file(Path::new(path))?);
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        Ok(RecapConfig::from_file(&default_path)?)
    } else {
        Ok(RecapConfig::default())
    }
}
