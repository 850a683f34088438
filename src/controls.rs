//! Battery control vocabulary and the target level calculation
//!
//! The two daily operations are a morning charge and an evening discharge.
//! Each is tied to a forecast period, and each aims for a usable energy
//! level that is reduced by whatever solar production is still expected.

use crate::error::FluxError;
use crate::logging::{LogContext, get_logger, get_logger_with_context};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the inverter is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// Grid charge during the cheap morning window
    Charge,

    /// Forced discharge during the evening peak window
    Discharge,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Charge => "charge",
            Self::Discharge => "discharge",
        }
    }

    /// Forecast period the action plans for
    pub fn period(&self) -> Period {
        match self {
            Self::Charge => Period::Morning,
            Self::Discharge => Period::Evening,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = FluxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "charge" => Ok(Self::Charge),
            "discharge" => Ok(Self::Discharge),
            other => Err(FluxError::validation(
                "action",
                format!("Invalid action: {}", other),
            )),
        }
    }
}

/// Daily operating window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Morning,
    Evening,
}

impl Period {
    pub const ALL: [Period; 2] = [Period::Morning, Period::Evening];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Evening => "evening",
        }
    }

    pub fn action(&self) -> Action {
        match self {
            Self::Morning => Action::Charge,
            Self::Evening => Action::Discharge,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether inverter settings are really written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Push the computed window to the inverter
    Live,

    /// Compute and validate only ("notional")
    Test,
}

impl RunMode {
    /// Label used in log lines, e.g. "notional charge"
    pub fn label(&self, action: Action) -> String {
        match self {
            Self::Live => action.to_string(),
            Self::Test => format!("notional {}", action),
        }
    }
}

/// Reduce the required energy level by the solar forecast.
///
/// The result is not clamped: a forecast larger than the requirement gives a
/// negative target.
pub fn calc_level(required: f64, forecast: f64, period: Option<Period>) -> f64 {
    let level = required - forecast;
    let logger = match period {
        Some(p) => get_logger_with_context(LogContext::new("controls").with_period(p.as_str())),
        None => get_logger("controls"),
    };
    logger.info(&format!(
        "Energy required {:.1}kWh - solar {} forecast {:.1}kWh = target {:.1}kWh",
        required,
        period.map(|p| p.as_str()).unwrap_or(""),
        forecast,
        level
    ));
    level
}

/// Target level for a period, skipping the adjustment when no forecast could
/// be obtained (a zero forecast counts as none).
pub fn adjusted_level(required: f64, forecast: Option<f64>, period: Period) -> f64 {
    match forecast {
        Some(f) if f != 0.0 => calc_level(required, f, Some(period)),
        _ => required,
    }
}
