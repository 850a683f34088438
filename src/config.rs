//! Configuration management for Solis Flux
//!
//! This module handles loading and eager validation of the application
//! configuration from YAML files. Every key the scheduler depends on is
//! checked once at startup so that a broken file fails fast instead of at
//! the first trigger.

use crate::error::{FluxError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

fn default_cron_before() -> i64 {
    20
}

fn default_retry_delay_seconds() -> u64 {
    300
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Minutes before each period start at which the daily job runs
    #[serde(default = "default_cron_before")]
    pub cron_before: i64,

    /// Delay before the single retry of a failed scheduled run
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: u64,

    /// Usable energy (kWh) wanted after the morning charge period
    pub morning_requirement: f64,

    /// Usable energy (kWh) wanted after the evening discharge period
    pub evening_requirement: f64,

    /// Entity id of the "solar forecast remaining today" sensor
    pub forecast_remaining: String,

    /// Timezone the cron triggers are evaluated in
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Inverter control parameters
    pub solis_control: SolisControlConfig,

    /// Home Assistant REST API connection
    #[serde(default)]
    pub home_assistant: HomeAssistantConfig,

    /// State file for the forecast history
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Web server binding configuration
    #[serde(default)]
    pub web: WebConfig,
}

/// A daily HH:MM window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    /// Start time in HH:MM format
    pub start: String,

    /// End time in HH:MM format
    pub end: String,
}

impl PeriodConfig {
    /// Parsed start time
    pub fn start_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.start)
    }

    /// Parsed end time
    pub fn end_time(&self) -> Result<NaiveTime> {
        parse_hhmm(&self.end)
    }
}

/// Home Assistant entities used to drive the inverter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InverterEntities {
    /// Battery state of charge sensor (percent)
    pub battery_soc: String,

    /// `time.*` entities holding the charge slot
    pub charge_start: String,
    pub charge_end: String,

    /// `time.*` entities holding the discharge slot
    pub discharge_start: String,
    pub discharge_end: String,
}

/// Inverter and battery parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolisControlConfig {
    /// Cheap-rate charging window
    pub charge_period: PeriodConfig,

    /// Peak-rate discharging window
    pub discharge_period: PeriodConfig,

    /// Usable battery capacity at 100% SOC in kWh
    pub battery_capacity_kwh: f64,

    /// SOC (percent) below which the inverter will not discharge
    pub overdischarge_soc: f64,

    /// Grid charging power in kW
    pub charge_power_kw: f64,

    /// Forced discharge power in kW
    pub discharge_power_kw: f64,

    /// Entity mapping
    pub entities: InverterEntities,
}

/// Home Assistant API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HomeAssistantConfig {
    /// Base URL, e.g. http://homeassistant.local:8123
    pub base_url: String,

    /// Long-lived access token; falls back to HA_TOKEN
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Persistent state configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Path of the JSON state file
    pub file: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Path to log file
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

/// Web server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Whether the diagnostic HTTP API is served
    pub enabled: bool,

    /// Bind address
    pub host: String,

    /// TCP port
    pub port: u16,
}

/// Parse an `HH:MM` string into a time of day
pub fn parse_hhmm(value: &str) -> Result<NaiveTime> {
    Ok(NaiveTime::parse_from_str(value.trim(), "%H:%M")?)
}

impl Config {
    /// Load configuration from a YAML file and validate it
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "solis_flux.yaml",
            "/data/solis_flux.yaml",
            "/etc/solis-flux/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Err(FluxError::config(format!(
            "No configuration file found (looked in {})",
            default_paths.join(", ")
        )))
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Parsed timezone
    pub fn tz(&self) -> Result<chrono_tz::Tz> {
        self.timezone.parse::<chrono_tz::Tz>().map_err(|_| {
            FluxError::validation("timezone", format!("Unknown timezone {}", self.timezone))
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.cron_before < 0 || self.cron_before >= 24 * 60 {
            return Err(FluxError::validation(
                "cron_before",
                "Must be between 0 and 1439 minutes",
            ));
        }

        if !self.morning_requirement.is_finite() || self.morning_requirement < 0.0 {
            return Err(FluxError::validation(
                "morning_requirement",
                "Must be a non-negative number",
            ));
        }

        if !self.evening_requirement.is_finite() || self.evening_requirement < 0.0 {
            return Err(FluxError::validation(
                "evening_requirement",
                "Must be a non-negative number",
            ));
        }

        if self.forecast_remaining.trim().is_empty() {
            return Err(FluxError::validation(
                "forecast_remaining",
                "Sensor entity id cannot be empty",
            ));
        }

        self.tz()?;

        let solis = &self.solis_control;
        for (field, value) in [
            ("solis_control.charge_period.start", &solis.charge_period.start),
            ("solis_control.charge_period.end", &solis.charge_period.end),
            (
                "solis_control.discharge_period.start",
                &solis.discharge_period.start,
            ),
            (
                "solis_control.discharge_period.end",
                &solis.discharge_period.end,
            ),
        ] {
            if parse_hhmm(value).is_err() {
                return Err(FluxError::validation(
                    field,
                    format!("Invalid HH:MM time '{}'", value),
                ));
            }
        }

        if solis.battery_capacity_kwh <= 0.0 {
            return Err(FluxError::validation(
                "solis_control.battery_capacity_kwh",
                "Must be positive",
            ));
        }

        if !(0.0..100.0).contains(&solis.overdischarge_soc) {
            return Err(FluxError::validation(
                "solis_control.overdischarge_soc",
                "Must be between 0 and 100",
            ));
        }

        if solis.charge_power_kw <= 0.0 {
            return Err(FluxError::validation(
                "solis_control.charge_power_kw",
                "Must be positive",
            ));
        }

        if solis.discharge_power_kw <= 0.0 {
            return Err(FluxError::validation(
                "solis_control.discharge_power_kw",
                "Must be positive",
            ));
        }

        let entities = &solis.entities;
        for (field, value) in [
            ("solis_control.entities.battery_soc", &entities.battery_soc),
            ("solis_control.entities.charge_start", &entities.charge_start),
            ("solis_control.entities.charge_end", &entities.charge_end),
            (
                "solis_control.entities.discharge_start",
                &entities.discharge_start,
            ),
            (
                "solis_control.entities.discharge_end",
                &entities.discharge_end,
            ),
        ] {
            if value.trim().is_empty() {
                return Err(FluxError::validation(field, "Entity id cannot be empty"));
            }
        }

        if self.home_assistant.base_url.trim().is_empty() {
            return Err(FluxError::validation(
                "home_assistant.base_url",
                "Base URL cannot be empty",
            ));
        }

        if self.persistence.file.trim().is_empty() {
            return Err(FluxError::validation(
                "persistence.file",
                "State file path cannot be empty",
            ));
        }

        if self.web.enabled && self.web.port == 0 {
            return Err(FluxError::validation(
                "web.port",
                "Port must be greater than 0",
            ));
        }

        Ok(())
    }
}
