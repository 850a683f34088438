//! On-demand diagnostic run of the level calculation and time setter
//!
//! Always runs in test mode: the window is computed and the inverter is
//! checked, but nothing is written.

use crate::controls::{Action, Period, RunMode, calc_level};
use crate::forecast::ForecastStore;
use crate::logging::{StructuredLogger, get_logger};
use crate::setter::{TimeSetter, TimesOutcome};
use serde::{Deserialize, Serialize};

/// Diagnostic call parameters
#[derive(Debug, Clone, Deserialize)]
pub struct TestRequest {
    /// `charge` or `discharge`
    pub action: String,

    /// Target level in kWh; defaults to the configured requirement
    #[serde(default)]
    pub level_required: Option<f64>,

    /// Lower the level by the current forecast (not recorded to history)
    #[serde(default)]
    pub use_forecast: bool,
}

/// What a diagnostic call did
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub action: String,
    pub level_required: f64,
    pub forecast: Option<f64>,

    /// `None` when there was no level to aim for and nothing was run
    pub outcome: Option<TimesOutcome>,
}

#[derive(Clone)]
pub struct DiagnosticService {
    forecast: ForecastStore,
    setter: TimeSetter,
    morning_requirement: f64,
    evening_requirement: f64,
    logger: StructuredLogger,
}

impl DiagnosticService {
    pub fn new(
        forecast: ForecastStore,
        setter: TimeSetter,
        morning_requirement: f64,
        evening_requirement: f64,
    ) -> Self {
        Self {
            forecast,
            setter,
            morning_requirement,
            evening_requirement,
            logger: get_logger("diagnostic"),
        }
    }

    fn requirement(&self, period: Period) -> f64 {
        match period {
            Period::Morning => self.morning_requirement,
            Period::Evening => self.evening_requirement,
        }
    }

    pub async fn test(&self, request: TestRequest) -> TestReport {
        self.logger.info(&format!(
            "Diagnostic {} run (level {:?}, use_forecast {})",
            request.action, request.level_required, request.use_forecast
        ));

        let action = request.action.parse::<Action>().ok();
        let period = action.map(|a| a.period());

        // An explicit level of zero counts as not given
        let mut level = match (request.level_required, period) {
            (Some(level), _) if level != 0.0 => level,
            (_, Some(period)) => self.requirement(period),
            (_, None) => 0.0,
        };

        let mut forecast = None;
        if level == 0.0 {
            self.logger
                .warn(&format!("No level required for '{}', nothing to test", request.action));
            return TestReport {
                action: request.action,
                level_required: level,
                forecast,
                outcome: None,
            };
        }

        if request.use_forecast
            && let Some(period) = period
        {
            forecast = self.forecast.get_forecast(Some(period), false).await;
            if let Some(value) = forecast
                && value != 0.0
            {
                level = calc_level(level, value, Some(period));
            }
        }

        let outcome = self
            .setter
            .set_times(&request.action, level, RunMode::Test)
            .await;

        TestReport {
            action: request.action,
            level_required: level,
            forecast,
            outcome: Some(outcome),
        }
    }
}
