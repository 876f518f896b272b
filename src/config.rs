// Client configuration loaded from YAML with environment overrides

use eyre::{Context, Result, eyre};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const CONFIG_ENV: &str = "FARMSTORE_CONFIG";
pub const API_URL_ENV: &str = "FARMSTORE_API_URL";
pub const USER_ID_ENV: &str = "FARMSTORE_USER_ID";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Farm grid dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: usize,
    pub cols: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self { rows: 3, cols: 3 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmConfig {
    /// Root of the farm API, without a trailing slash
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    /// Player id sent with every request once known
    pub user_id: Option<i64>,
    pub grid: GridConfig,
}

impl Default for FarmConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_ms: DEFAULT_TIMEOUT_MS,
            user_id: None,
            grid: GridConfig::default(),
        }
    }
}

impl FarmConfig {
    /// Load configuration: explicit path, then `$FARMSTORE_CONFIG`, then the
    /// user config dir, then defaults. Environment overrides apply last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match Self::locate(explicit) {
            Some(path) => Self::read_file(&path)?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Ok(path) = env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }

        let default = dirs::config_dir()?.join("farmstore").join("config.yaml");
        default.exists().then_some(default)
    }

    pub fn read_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;

        info!(file = ?path, "Loaded config");
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var(API_URL_ENV) {
            debug!(%url, "API URL from environment");
            self.api_base_url = url;
        }

        if let Ok(raw) = env::var(USER_ID_ENV) {
            let id = raw
                .trim()
                .parse::<i64>()
                .with_context(|| format!("{} is not a valid user id: {}", USER_ID_ENV, raw))?;
            self.user_id = Some(id);
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.grid.rows == 0 || self.grid.cols == 0 {
            return Err(eyre!(
                "Grid must have at least one row and column, got {}x{}",
                self.grid.rows,
                self.grid.cols
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(eyre!("request_timeout_ms must be greater than 0"));
        }
        if self.api_base_url.trim().is_empty() {
            return Err(eyre!("api_base_url must not be empty"));
        }
        Ok(())
    }

    /// Base URL with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
