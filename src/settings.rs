//! Environment-backed server settings.

use std::path::PathBuf;

use anyhow::Result;
use config::{Config, Environment};
use serde::Deserialize;

use timeline_sync_core::SyncMode;

fn default_port() -> u16 {
    3000
}

#[derive(Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL that webhook subscriptions point at. Falls back
    /// to localhost for local development.
    #[serde(default)]
    pub app_url: Option<String>,

    #[serde(default)]
    pub sync_mode: SyncMode,

    /// Server-level token for endpoints not tied to a stored board
    /// config (column listing).
    #[serde(default)]
    pub monday_api_token: Option<String>,

    /// When set, board state is persisted in a sled database at this
    /// path instead of in memory.
    #[serde(default)]
    pub storage_path: Option<PathBuf>,
}

impl Settings {
    /// Read PORT, APP_URL, SYNC_MODE, MONDAY_API_TOKEN and STORAGE_PATH
    /// from the environment.
    pub fn load() -> Result<Self> {
        let settings = Config::builder()
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn app_url(&self) -> String {
        self.app_url
            .clone()
            .unwrap_or_else(|| format!("http://localhost:{}", self.port))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            port: default_port(),
            app_url: None,
            sync_mode: SyncMode::default(),
            monday_api_token: None,
            storage_path: None,
        }
    }
}
