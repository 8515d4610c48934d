//! Configuration loading
//!
//! Resolution follows a fixed priority order per setting:
//! 1. Environment variable (`ROOMTONE_API_URL`, `ROOMTONE_USER_ID`)
//! 2. TOML config file (`<config dir>/roomtone/config.toml`)
//! 3. Compiled default (fallback)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_API_URL: &str = "http://localhost:10000";
const DEFAULT_POLL_ATTEMPTS: u32 = 3;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 7;

/// Resolved Roomtone configuration
#[derive(Debug, Clone)]
pub struct RoomtoneConfig {
    /// Base URL of the remote diary/deco/room service
    pub api_base_url: String,

    /// Acting user; all diary and room operations are scoped to this id
    pub user_id: Uuid,

    /// Enrichment poll budget (attempts per uploaded diary)
    pub poll_attempts: u32,

    /// Wait before each enrichment poll, including the first
    pub poll_interval: Duration,
}

impl Default for RoomtoneConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            user_id: Uuid::nil(),
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

/// Partial file contents; any field may be omitted
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    api_base_url: Option<String>,
    user_id: Option<Uuid>,
    poll_attempts: Option<u32>,
    poll_interval_secs: Option<u64>,
}

impl RoomtoneConfig {
    /// Load configuration using the env -> file -> default priority order.
    pub fn load() -> Result<Self> {
        let file = match config_file_path() {
            Some(path) if path.exists() => {
                let text = std::fs::read_to_string(&path)
                    .map_err(|e| Error::Config(format!("reading {path:?}: {e}")))?;
                toml::from_str::<ConfigFile>(&text)
                    .map_err(|e| Error::Config(format!("parsing {path:?}: {e}")))?
            }
            _ => ConfigFile::default(),
        };
        Self::resolve(file)
    }

    fn resolve(file: ConfigFile) -> Result<Self> {
        let defaults = Self::default();

        let api_base_url = std::env::var("ROOMTONE_API_URL")
            .ok()
            .or(file.api_base_url)
            .unwrap_or(defaults.api_base_url);

        let user_id = match std::env::var("ROOMTONE_USER_ID") {
            Ok(raw) => raw
                .parse::<Uuid>()
                .map_err(|e| Error::Config(format!("ROOMTONE_USER_ID: {e}")))?,
            Err(_) => file.user_id.unwrap_or(defaults.user_id),
        };

        let poll_attempts = file.poll_attempts.unwrap_or(defaults.poll_attempts);
        if poll_attempts == 0 {
            return Err(Error::Config("poll_attempts must be at least 1".to_string()));
        }

        let poll_interval = file
            .poll_interval_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.poll_interval);

        Ok(Self {
            api_base_url,
            user_id,
            poll_attempts,
            poll_interval,
        })
    }
}

/// Platform config file location, if one can be determined
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("roomtone").join("config.toml"))
}
