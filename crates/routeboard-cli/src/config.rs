use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use routeboard_core::{parse_time_of_day, DisplayWindow, EfficiencyConfig};
use serde::{Deserialize, Serialize};

const DEFAULT_TITLE: &str = "Route Timeline Viewer";
const DEFAULT_TEST_QUERY: &str = "SELECT 1";

pub const CONFIG_PATH_ENV: &str = "ROUTEBOARD_CONFIG";
const TITLE_ENV: &str = "ROUTEBOARD_TITLE";
const DATABASE_ENV: &str = "ROUTEBOARD_DATABASE";
const TIMELINE_QUERY_ENV: &str = "ROUTEBOARD_TIMELINE_QUERY";
const TEST_QUERY_ENV: &str = "ROUTEBOARD_TEST_QUERY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub title: String,
    pub database: Option<PathBuf>,
    pub timeline_query: Option<String>,
    pub test_query: Option<String>,
    pub efficiency: EfficiencySettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EfficiencySettings {
    pub window_start: String,
    pub window_end: String,
    pub total_work_minutes_per_day: i64,
    pub min_activity_minutes: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    pub start: String,
    pub end: String,
    pub clip: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            database: None,
            timeline_query: None,
            test_query: None,
            efficiency: EfficiencySettings::default(),
            display: DisplaySettings::default(),
        }
    }
}

impl Default for EfficiencySettings {
    fn default() -> Self {
        Self {
            window_start: "08:00".to_string(),
            window_end: "17:00".to_string(),
            total_work_minutes_per_day: 540,
            min_activity_minutes: 5.0,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            start: "06:00".to_string(),
            end: "20:00".to_string(),
            clip: true,
        }
    }
}

impl Settings {
    /// `ROUTEBOARD_CONFIG` if set, otherwise `<config dir>/routeboard/config.toml`.
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|d| d.join("routeboard").join("config.toml"))
    }

    /// Load `.env`, then the config file (defaults when absent), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }

        let mut settings = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok());
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let settings = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    /// Overrides from the environment win over the config file. Empty values
    /// are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(title) = get(TITLE_ENV) {
            self.title = title;
        }
        if let Some(database) = get(DATABASE_ENV) {
            self.database = Some(PathBuf::from(database));
        }
        if let Some(query) = get(TIMELINE_QUERY_ENV) {
            self.timeline_query = Some(query);
        }
        if let Some(query) = get(TEST_QUERY_ENV) {
            self.test_query = Some(query);
        }
    }

    pub fn timeline_query(&self) -> Result<&str> {
        self.timeline_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Missing timeline query: set {TIMELINE_QUERY_ENV} \
                     or `timeline_query` in the config file"
                )
            })
    }

    pub fn test_query(&self) -> &str {
        self.test_query.as_deref().unwrap_or(DEFAULT_TEST_QUERY)
    }

    pub fn efficiency_config(&self) -> Result<EfficiencyConfig> {
        let config = EfficiencyConfig {
            window_start: parse_time_of_day(&self.efficiency.window_start)?,
            window_end: parse_time_of_day(&self.efficiency.window_end)?,
            total_work_minutes_per_day: self.efficiency.total_work_minutes_per_day,
            min_activity_minutes: self.efficiency.min_activity_minutes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn display_window(&self) -> Result<DisplayWindow> {
        let display = DisplayWindow {
            start: parse_time_of_day(&self.display.start)?,
            end: parse_time_of_day(&self.display.end)?,
            clip: self.display.clip,
        };
        display.validate()?;
        Ok(display)
    }
}
