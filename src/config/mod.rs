//! Configuration management.
//!
//! Configuration is read from `~/.config/ferrotype/config.toml` at
//! startup. If the file doesn't exist, a default configuration with
//! comments is created; missing keys fall back to defaults.

use std::fs;
use std::io::Write;
use std::path::PathBuf;

use serde::Deserialize;

use crate::app::{FerrotypeError, Result};
use crate::sync::mirror::DEFAULT_WORKERS;

pub const DEFAULT_INTERVAL: &str = "8h";
pub const DEFAULT_MAX_PAGES: usize = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// URL of the newest feed page.
    pub feed_url: String,
    /// Base URL of the image endpoint; images live at `<base>/<id>.jpg`.
    pub image_base_url: String,
    /// Bearer token for the image endpoint, if it requires one.
    pub access_token: Option<String>,
    /// Directory the mirrored images are written to.
    pub storage_dir: Option<PathBuf>,
    /// Path of the SQLite database.
    pub db_path: Option<PathBuf>,
    /// Sync interval for the daemon, e.g. "8h", "30m".
    pub interval: String,
    /// Upper bound on feed pages fetched per sync run.
    pub max_pages: usize,
    /// Concurrent image downloads.
    pub workers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            feed_url: String::new(),
            image_base_url: String::new(),
            access_token: None,
            storage_dir: None,
            db_path: None,
            interval: DEFAULT_INTERVAL.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl Config {
    /// Load configuration from the default path, creating a commented
    /// default file on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_config_path()?)
    }

    pub fn load_from(config_path: PathBuf) -> Result<Self> {
        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)?;

        toml::from_str(&content).map_err(|e| {
            FerrotypeError::Config(format!("{}: {e}", config_path.display()))
        })
    }

    /// `~/.config/ferrotype/config.toml`
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| FerrotypeError::Config("Could not find config directory".into()))?;
        Ok(config_dir.join("ferrotype").join("config.toml"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.feed_url.is_empty() {
            return Err(FerrotypeError::Config("feed_url is not set".into()));
        }
        if self.image_base_url.is_empty() {
            return Err(FerrotypeError::Config("image_base_url is not set".into()));
        }
        if self.workers == 0 {
            return Err(FerrotypeError::Config("workers must be at least 1".into()));
        }
        if self.max_pages == 0 {
            return Err(FerrotypeError::Config("max_pages must be at least 1".into()));
        }
        Ok(())
    }

    fn create_default_config(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(Self::default_config_content().as_bytes())?;

        Ok(())
    }

    fn default_config_content() -> String {
        r##"# Ferrotype configuration
#
# feed_url: newest page of the picture feed (required).
# image_base_url: images are fetched from <image_base_url>/<id>.jpg (required).
# access_token: bearer token for the image endpoint, if needed.

feed_url = ""
image_base_url = ""
# access_token = ""

# Where mirrored images and the database live. Defaults to the
# platform data directory.
# storage_dir = "/var/lib/ferrotype/pictures"
# db_path = "/var/lib/ferrotype/ferrotype.db"

# Daemon sync interval: "8h", "30m", "1d", or plain seconds.
interval = "8h"

# Safety bound on feed pages fetched per run.
max_pages = 50

# Concurrent image downloads.
workers = 4
"##
        .to_string()
    }
}
