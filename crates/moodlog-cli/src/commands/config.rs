//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use moodlog_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(output: &Output) -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "store": config.store_path(),
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.data_dir.display());
        }
        OutputFormat::Human => {
            println!("Configuration:");
            println!("  data_dir: {}", config.data_dir.display());
            println!("  store:    {}", config.store_path().display());
            println!(
                "  log_file: {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "(not set)".to_string())
            );
            println!();
            println!("Config file: {}", Config::config_file_path().display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, output: &Output) -> Result<()> {
    let mut config = Config::load().context("Failed to load configuration")?;
    apply(&mut config, &key, &value)?;

    config.save().context("Failed to save configuration")?;
    output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

/// Apply one `key = value` assignment
fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "data_dir" => {
            if value.is_empty() {
                bail!("data_dir cannot be empty");
            }
            config.data_dir = PathBuf::from(value);
        }
        "log_file" => {
            config.log_file = if value.is_empty() || value == "none" {
                None
            } else {
                Some(PathBuf::from(value))
            };
        }
        _ => bail!("Unknown configuration key: {}. Valid keys: data_dir, log_file", key),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            data_dir: PathBuf::from("/tmp/moodlog"),
            log_file: Some(PathBuf::from("/tmp/moodlog.log")),
        }
    }

    #[test]
    fn test_apply_data_dir() {
        let mut config = config();
        apply(&mut config, "data_dir", "/srv/journal").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/journal"));
        assert!(apply(&mut config, "data_dir", "").is_err());
    }

    #[test]
    fn test_apply_log_file_none_clears() {
        let mut config = config();
        apply(&mut config, "log_file", "none").unwrap();
        assert_eq!(config.log_file, None);
    }

    #[test]
    fn test_apply_unknown_key() {
        let err = apply(&mut config(), "sync_url", "x").unwrap_err();
        assert!(err.to_string().contains("Unknown configuration key"));
    }
}
