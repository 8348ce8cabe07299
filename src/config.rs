use anyhow::{Context, Result};
use chrono::FixedOffset;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::EngineConfig;
use crate::error::TrainLoadError;
use crate::logging::LogConfig;
use crate::models::ThresholdOverrides;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine constants (stress, PMC, zones, readiness)
    pub engine: EngineConfig,

    /// Logging settings
    pub logging: LogConfig,

    /// Athlete personalisation
    pub athlete: AthleteSettings,
}

/// Per-athlete settings supplied by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AthleteSettings {
    /// UTC offset used for day bucketing, e.g. "+02:00"
    pub timezone: String,

    /// Weekly stress target; the readiness default applies when unset
    pub weekly_stress_target: Option<Decimal>,

    /// Manually entered thresholds
    pub overrides: ThresholdOverrides,
}

impl Default for AthleteSettings {
    fn default() -> Self {
        AthleteSettings {
            timezone: "+00:00".to_string(),
            weekly_stress_target: None,
            overrides: ThresholdOverrides::default(),
        }
    }
}

impl AthleteSettings {
    /// Parse the configured timezone into a fixed offset
    pub fn timezone_offset(&self) -> std::result::Result<FixedOffset, TrainLoadError> {
        parse_utc_offset(&self.timezone)
    }
}

/// Parse "UTC", "Z", "+02:00", "-0530" or "+9" into a fixed offset
pub fn parse_utc_offset(value: &str) -> std::result::Result<FixedOffset, TrainLoadError> {
    let invalid = || TrainLoadError::InvalidTimezone(value.to_string());
    let trimmed = value.trim();

    if trimmed.eq_ignore_ascii_case("utc") || trimmed.eq_ignore_ascii_case("z") || trimmed.is_empty() {
        return FixedOffset::east_opt(0).ok_or_else(invalid);
    }

    let (sign, rest) = match trimmed.chars().next() {
        Some('+') => (1, &trimmed[1..]),
        Some('-') => (-1, &trimmed[1..]),
        _ => return Err(invalid()),
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => (rest.get(..2).ok_or_else(invalid)?, rest.get(2..).ok_or_else(invalid)?),
        None => (rest, "0"),
    };
    let is_number = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
    if !is_number(hours) || !is_number(minutes) {
        return Err(invalid());
    }

    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}

impl AppConfig {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;

        config
            .athlete
            .timezone_offset()
            .with_context(|| format!("Invalid athlete timezone in {}", path.as_ref().display()))?;
        config
            .engine
            .validate()
            .with_context(|| format!("Invalid engine settings in {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
        }

        let toml_content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize configuration to TOML")?;

        fs::write(&path, toml_content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))?;

        Ok(())
    }

    /// Get default configuration file path
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".trainload")
            .join("config.toml")
    }

    /// Load the default file, falling back to defaults when it is missing or invalid
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();
        if !config_path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&config_path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %config_path.display(), error = %err, "Ignoring unreadable config file");
                Self::default()
            }
        }
    }
}
