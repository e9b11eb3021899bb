use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Deserialize, Debug)]
pub struct Config {
    /// Path of the SQLite database file
    #[serde(default = "default_database_path")]
    pub database_path: String,
    /// Timezone applied to new dates when none is given (IANA format)
    #[serde(default = "detect_system_timezone")]
    pub default_timezone: String,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Tuning for occurrence reconciliation
#[derive(Deserialize, Debug)]
pub struct EngineConfig {
    /// Ceiling on generated cache rows per date record
    #[serde(default = "default_max_generated")]
    pub max_generated_occurrences: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            default_timezone: detect_system_timezone(),
            engine: EngineConfig::default(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_generated_occurrences: default_max_generated(),
        }
    }
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("cadence.toml"))
            .merge(Env::prefixed("CADENCE_").split("__"))
            .extract()
    }
}

fn default_database_path() -> String {
    "cadence.db".to_string()
}

fn default_max_generated() -> usize {
    10_000
}

/// Validates that a timezone string is a valid IANA timezone name
pub fn validate_timezone(timezone: &str) -> Result<Tz, String> {
    Tz::from_str(timezone).map_err(|_| {
        format!(
            "Invalid timezone: '{}'. Use IANA timezone names like 'America/New_York'",
            timezone
        )
    })
}

/// Detects the system timezone, falling back to UTC if detection fails
pub fn detect_system_timezone() -> String {
    // Method 1: the TZ environment variable
    if let Ok(tz) = std::env::var("TZ") {
        if validate_timezone(&tz).is_ok() {
            return tz;
        }
    }

    // Method 2: /etc/timezone (Linux)
    #[cfg(target_os = "linux")]
    {
        if let Ok(tz) = std::fs::read_to_string("/etc/timezone") {
            let tz = tz.trim();
            if validate_timezone(tz).is_ok() {
                return tz.to_string();
            }
        }
    }

    // Method 3: platform detection
    if let Ok(local_tz) = iana_time_zone::get_timezone() {
        if validate_timezone(&local_tz).is_ok() {
            return local_tz;
        }
    }

    // Fallback to UTC
    "UTC".to_string()
}
