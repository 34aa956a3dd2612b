// ABOUTME: Configuration paths and persisted user preferences
// ABOUTME: Resolves the config dir from flag, env var, or platform default

use crate::storage::{ensure_private_dir, write_atomic};
use crate::{Error, Result};
use clap::ValueEnum;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const CONFIG_DIR_ENV: &str = "GDOCS_CONFIG_DIR";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Plain,
    Markdown,
}

pub struct Paths {
    pub config_dir: PathBuf,
    pub token_file: PathBuf,
    pub client_secrets_file: PathBuf,
    pub config_file: PathBuf,
}

impl Paths {
    pub fn new(config_dir_override: Option<PathBuf>) -> Result<Self> {
        let config_dir = match config_dir_override {
            Some(dir) => dir,
            None => match std::env::var_os(CONFIG_DIR_ENV) {
                Some(dir) if !dir.is_empty() => PathBuf::from(dir),
                _ => ProjectDirs::from("", "", "gdocs")
                    .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                    .config_dir()
                    .to_path_buf(),
            },
        };

        Ok(Paths {
            token_file: config_dir.join("token.json"),
            client_secrets_file: config_dir.join("credentials.json"),
            config_file: config_dir.join("config.json"),
            config_dir,
        })
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        ensure_private_dir(&self.config_dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output_format: OutputFormat,
    #[serde(default = "default_limit")]
    pub default_limit: u32,
}

fn default_limit() -> u32 {
    20
}

impl Default for Config {
    fn default() -> Self {
        Config {
            output_format: OutputFormat::default(),
            default_limit: default_limit(),
        }
    }
}

impl Config {
    /// Load preferences, falling back to defaults when the file is absent.
    pub fn load(paths: &Paths) -> Result<Self> {
        if !paths.config_file.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(&paths.config_file)?;
        serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!(
                "Failed to parse {}: {}",
                paths.config_file.display(),
                e
            ))
        })
    }

    /// Change one preference by its file key.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "output_format" => {
                self.output_format = OutputFormat::from_str(value, true).map_err(|_| {
                    Error::Config(format!(
                        "Invalid output_format {:?}. Expected table, json, plain or markdown",
                        value
                    ))
                })?;
            }
            "default_limit" => {
                self.default_limit = value
                    .parse()
                    .ok()
                    .filter(|limit| *limit > 0)
                    .ok_or_else(|| {
                        Error::Config(format!(
                            "Invalid default_limit {:?}. Expected a positive number",
                            value
                        ))
                    })?;
            }
            other => {
                return Err(Error::Config(format!(
                    "Unknown setting {:?}. Known settings: output_format, default_limit",
                    other
                )))
            }
        }
        Ok(())
    }

    pub fn save(&self, paths: &Paths) -> Result<()> {
        paths.ensure_dirs()?;
        let json = serde_json::to_string_pretty(self)?;
        write_atomic(&paths.config_file, json.as_bytes())
    }
}
