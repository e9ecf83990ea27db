use crate::error::{InsightsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level application configuration, loaded from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub filters: FilterDefaults,
    pub dashboard: DashboardConfig,
}

impl AppConfig {
    /// Load configuration from default path (~/.config/call-insights/config.toml),
    /// falling back to defaults if the file doesn't exist.
    pub fn load() -> anyhow::Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.filters.validate()?;
        Ok(config)
    }

    /// Write current configuration to the default path.
    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::default_path())
    }

    /// Write current configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Default config file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("call-insights")
            .join("config.toml")
    }

    /// Data directory for explorer history.
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("call-insights")
    }
}

/// Where conversation records are fetched from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// "file" reads `path`, "http" issues a GET against `url`.
    pub kind: SourceKind,
    /// JSON file holding the full record array.
    pub path: PathBuf,
    /// Endpoint returning the full record array.
    pub url: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::File,
            path: PathBuf::from("data/conversations.json"),
            url: "http://localhost:3000/api/conversations".into(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Http,
}

/// Values the filter spec is reset to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterDefaults {
    /// Length of the default date window, ending now.
    pub window_days: i64,
    /// Upper duration bound in seconds.
    pub max_duration: f64,
    /// Upper cost bound.
    pub max_cost: f64,
}

impl FilterDefaults {
    /// Window length in milliseconds. `None` when `window_days` is negative
    /// or too large to express as a duration.
    pub fn window_millis(&self) -> Option<i64> {
        if self.window_days < 0 {
            return None;
        }
        chrono::Duration::try_days(self.window_days).map(|window| window.num_milliseconds())
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_millis().is_none() {
            return Err(InsightsError::Config(format!(
                "filters.window_days = {} is out of range",
                self.window_days
            )));
        }
        Ok(())
    }
}

impl Default for FilterDefaults {
    fn default() -> Self {
        Self {
            window_days: 30,
            max_duration: 3600.0, // 1 hour
            max_cost: 100.0,
        }
    }
}

/// Text dashboard rendering options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Rows shown in the recent calls table.
    pub recent_calls: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { recent_calls: 5 }
    }
}
