use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::cli::CliArgs;
use crate::expression::TimeoutExpress;

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Config {
    pub version: u32,
    pub default_timeout_express: String,
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DisplayConfig {
    /// Rewrite the countdown line in place instead of printing one line per tick
    pub inline: bool,
    pub expired_message: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: 1,
            default_timeout_express: "15m".to_string(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            inline: true,
            expired_message: "订单已超时".to_string(),
        }
    }
}

pub fn get_default_config_path() -> Result<PathBuf> {
    let proj_dirs = ProjectDirs::from("", "", "paycountdown")
        .context("Failed to determine project directories")?;

    let config_dir = proj_dirs.config_dir();
    Ok(config_dir.join("paycountdown.toml"))
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p,
            None => get_default_config_path()?,
        };

        if !path.exists() {
            let default_config = Config::default();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .context("Failed to create config directory")?;
            }
            default_config.save(&path)?;
            return Ok(default_config);
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config to TOML")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    pub fn from_cli_and_file(cli_args: &CliArgs) -> Result<Self> {
        let mut config = Self::load(cli_args.config.clone())?;

        // CLI args override config file
        if let Some(expr) = &cli_args.timeout_express {
            config.default_timeout_express = expr.clone();
        }

        Ok(config)
    }

    /// Strictly validated form of `default_timeout_express`
    pub fn timeout_express(&self) -> Result<TimeoutExpress> {
        self.default_timeout_express
            .parse::<TimeoutExpress>()
            .with_context(|| format!("Invalid timeout expression {:?}", self.default_timeout_express))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::TimeUnit;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.version, 1);
        assert_eq!(config.default_timeout_express, "15m");
        assert!(config.display.inline);
        assert!(!config.display.expired_message.is_empty());
    }

    #[test]
    fn test_config_load_nonexistent_creates_default() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("nested").join("paycountdown.toml");

        let config = Config::load(Some(config_path.clone()))?;

        assert_eq!(config, Config::default());
        assert!(config_path.exists());
        Ok(())
    }

    #[test]
    fn test_config_save_and_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test.toml");

        let mut config = Config::default();
        config.default_timeout_express = "2h".to_string();
        config.display.inline = false;

        config.save(&config_path)?;
        let loaded_config = Config::load(Some(config_path))?;

        assert_eq!(config, loaded_config);
        Ok(())
    }

    #[test]
    fn test_missing_display_section_uses_defaults() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "version = 1\ndefault_timeout_express = \"30m\"\n")?;

        let config = Config::load(Some(config_path))?;
        assert_eq!(config.default_timeout_express, "30m");
        assert_eq!(config.display, DisplayConfig::default());
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test.toml");
        fs::write(&config_path, "version = \"one\"")?;

        let err = Config::load(Some(config_path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        Ok(())
    }

    #[test]
    fn test_cli_override() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test.toml");
        Config::default().save(&config_path)?;

        let cli_args = CliArgs {
            created: None,
            timeout_express: Some("1d".to_string()),
            config: Some(config_path),
            check: false,
        };

        let config = Config::from_cli_and_file(&cli_args)?;
        assert_eq!(config.default_timeout_express, "1d");
        assert_eq!(
            config.timeout_express()?,
            TimeoutExpress::Span { value: 1, unit: TimeUnit::Days }
        );
        Ok(())
    }

    #[test]
    fn test_invalid_timeout_express_reports_value() {
        let config = Config {
            default_timeout_express: "0m".to_string(),
            ..Config::default()
        };
        let err = config.timeout_express().unwrap_err();
        assert!(err.to_string().contains("\"0m\""));
    }

    #[test]
    fn test_get_default_config_path() -> Result<()> {
        let path = get_default_config_path()?;
        assert!(path.ends_with("paycountdown.toml"));
        Ok(())
    }
}
