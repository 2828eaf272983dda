//! Config command - inspect and edit the recap configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;
use tracing::debug;

use recap_core::models::config::RecapConfig;

use super::load_config;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show the effective configuration
    Show,

    /// Write a configuration file with default values
    Init(InitArgs),

    /// Print one value, e.g. "storage.data_dir", or a whole section
    Get {
        /// Configuration key
        key: String,
    },

    /// Change one value, e.g. `recap config set extraction.vendor_max_chars 40`
    Set {
        /// Configuration key of the form section.field
        key: String,
        /// New value
        value: String,
    },

    /// Show where configuration, models and data are looked up
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

pub fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommand::Show => show_config(&path, config_path),
        ConfigCommand::Init(init_args) => {
            init_config(init_args.output.as_deref().unwrap_or(path.as_path()), init_args.force)
        }
        ConfigCommand::Get { key } => {
            let value = lookup(&load_config(config_path)?, &key)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        ConfigCommand::Set { key, value } => set_config(&path, config_path, &key, &value),
        ConfigCommand::Path => show_path(&path, config_path),
    }
}

/// Per-user configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("recap")
        .join("config.json")
}

fn show_config(path: &Path, config_path: Option<&str>) -> anyhow::Result<()> {
    if !path.exists() {
        println!(
            "{} No config file at {}, showing defaults.",
            style("ℹ").blue(),
            path.display()
        );
    }
    let config = load_config(config_path)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    write_config(path, &RecapConfig::default())?;
    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        path.display()
    );
    Ok(())
}

fn set_config(path: &Path, config_path: Option<&str>, key: &str, raw: &str) -> anyhow::Result<()> {
    let current = if path.exists() {
        load_config(config_path)?
    } else {
        debug!("{} does not exist yet, starting from defaults", path.display());
        RecapConfig::default()
    };

    let updated = assign(&current, key, raw)?;
    write_config(path, &updated)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&lookup(&updated, key)?)?
    );
    Ok(())
}

fn show_path(path: &Path, config_path: Option<&str>) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());

    if !path.exists() {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'recap config init' to create a configuration file.");
        return Ok(());
    }
    println!("Status: {}", style("exists").green());

    let config = load_config(config_path)?;
    let models = if config.ocr.models_present() {
        style("found").green()
    } else {
        style("missing").yellow()
    };
    println!("OCR models: {} ({})", config.ocr.model_dir.display(), models);
    println!("Images: {}", config.storage.images_dir().display());
    println!("Ledger: {}", config.storage.ledger_path().display());
    Ok(())
}

fn write_config(path: &Path, config: &RecapConfig) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    config.save(path)?;
    Ok(())
}

/// Value stored under a dotted key.
fn lookup(config: &RecapConfig, key: &str) -> anyhow::Result<Value> {
    let json = serde_json::to_value(config)?;
    key.split('.')
        .try_fold(&json, |current, part| current.get(part))
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))
}

/// Copy of `config` with the field named by `section.field` set from user
/// text. The result is parsed back into a `RecapConfig`, so a value of the
/// wrong type is an error rather than a silently ignored entry.
fn assign(config: &RecapConfig, key: &str, raw: &str) -> anyhow::Result<RecapConfig> {
    let (section, field) = key
        .split_once('.')
        .ok_or_else(|| anyhow::anyhow!("Expected a key of the form section.field, got {}", key))?;

    let mut json = serde_json::to_value(config)?;
    let slot = json
        .get_mut(section)
        .and_then(|s| s.get_mut(field))
        .ok_or_else(|| anyhow::anyhow!("Unknown configuration key: {}", key))?;

    *slot = if slot.is_string() {
        Value::String(raw.to_string())
    } else {
        serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
    };

    serde_json::from_value(json).map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_field_and_section() {
        let config = RecapConfig::default();

        assert_eq!(
            lookup(&config, "extraction.vendor_max_chars").unwrap(),
            Value::from(50)
        );
        assert!(lookup(&config, "storage").unwrap().is_object());
        assert!(lookup(&config, "storage.missing").is_err());
    }

    #[test]
    fn test_assign_typed_values() {
        let config = RecapConfig::default();

        let config = assign(&config, "extraction.vendor_max_chars", "40").unwrap();
        let config = assign(&config, "ocr.keep_unk", "true").unwrap();
        let config = assign(&config, "storage.data_dir", "/srv/receipts").unwrap();

        assert_eq!(config.extraction.vendor_max_chars, 40);
        assert!(config.ocr.keep_unk);
        assert_eq!(config.storage.data_dir, PathBuf::from("/srv/receipts"));
    }

    #[test]
    fn test_assign_numeric_text_to_string_field() {
        let config = assign(&RecapConfig::default(), "storage.images_subdir", "2024").unwrap();
        assert_eq!(config.storage.images_subdir, "2024");
    }

    #[test]
    fn test_assign_rejects_wrong_type() {
        let config = RecapConfig::default();

        assert!(assign(&config, "extraction.vendor_max_chars", "lots").is_err());
        assert!(assign(&config, "extraction.vendor_max_chars", "-1").is_err());
        assert!(assign(&config, "ocr.keep_unk", "maybe").is_err());
    }

    #[test]
    fn test_assign_rejects_unknown_keys() {
        let config = RecapConfig::default();

        assert!(assign(&config, "ocr.threads", "4").is_err());
        assert!(assign(&config, "logging.level", "debug").is_err());
        assert!(assign(&config, "storage", "{}").is_err());
        assert!(assign(&config, "storage.data_dir.inner", "x").is_err());
    }
}
