//! Solar forecast lookup with a per-period fallback history
//!
//! The live value comes from the "forecast remaining" sensor. Each scheduled
//! run records what it saw, keeping the last [`FORECAST_HISTORY_LEN`] values
//! per period, so that a run which finds the sensor unavailable can fall back
//! to their mean.

use crate::controls::Period;
use crate::logging::{LogContext, get_logger_with_context};
use crate::persistence::PersistenceManager;
use crate::state::{StateReader, sensor_entity_id};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Number of past forecasts kept per period
pub const FORECAST_HISTORY_LEN: usize = 7;

/// Bounded FIFO of past forecasts (kWh), oldest first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastHistory {
    values: VecDeque<f64>,
}

impl ForecastHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the persisted comma separated form. Entries that are not finite
    /// numbers are skipped, and only the newest values are kept.
    pub fn parse(raw: &str) -> Self {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .collect()
    }

    /// Append a value, dropping the oldest one when full
    pub fn push(&mut self, value: f64) {
        self.values.push_back(value);
        while self.values.len() > FORECAST_HISTORY_LEN {
            self.values.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    /// Arithmetic mean, `None` when empty
    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
        }
    }

    /// Persisted form: one decimal per value, comma separated
    pub fn to_persisted(&self) -> String {
        self.values
            .iter()
            .map(|v| format!("{:.1}", v))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl FromIterator<f64> for ForecastHistory {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut history = Self::new();
        for value in iter {
            history.push(value);
        }
        history
    }
}

/// Persistence key of a period's history
pub fn history_key(period: Period) -> String {
    format!("{}_forecasts", period)
}

/// Forecast sensor reader with history fallback
#[derive(Clone)]
pub struct ForecastStore {
    states: Arc<dyn StateReader>,
    persistence: Arc<Mutex<PersistenceManager>>,
    sensor: String,
    logger: crate::logging::StructuredLogger,
}

impl ForecastStore {
    pub fn new(
        states: Arc<dyn StateReader>,
        persistence: Arc<Mutex<PersistenceManager>>,
        sensor: &str,
    ) -> Self {
        let sensor = sensor_entity_id(sensor);
        let logger = get_logger_with_context(
            LogContext::new("forecast").with_field("sensor", sensor.clone()),
        );
        Self {
            states,
            persistence,
            sensor,
            logger,
        }
    }

    /// Sensor entity id being read
    pub fn sensor(&self) -> &str {
        &self.sensor
    }

    /// Current sensor value; read failures and non-numeric states count as absent
    async fn current(&self) -> Option<f64> {
        match self.states.get(&self.sensor).await {
            Ok(Some(raw)) => match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Some(v),
                _ => {
                    self.logger
                        .warn(&format!("Ignoring non-numeric forecast '{}'", raw));
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                self.logger
                    .warn(&format!("Could not read forecast sensor: {}", e));
                None
            }
        }
    }

    /// Solar forecast in kWh.
    ///
    /// Without a period this is the raw sensor value. With a period the result
    /// is always `Some`: the sensor value (recorded to history when `save` is
    /// set), or the history mean, or `0.0` when there is no history either.
    pub async fn get_forecast(&self, period: Option<Period>, save: bool) -> Option<f64> {
        let current = self.current().await;
        let Some(period) = period else {
            return current;
        };

        let key = history_key(period);
        let mut store = self.persistence.lock().await;
        if let Err(e) = store.persist(&key, "") {
            self.logger
                .error(&format!("Could not create {} history: {}", period, e));
        }
        let mut history = ForecastHistory::parse(store.get(&key).unwrap_or_default());

        match current {
            None => {
                let fallback = history.mean().unwrap_or(0.0);
                self.logger.info(&format!(
                    "Forecast unavailable, using {} mean of {} stored value(s): {:.1}kWh",
                    period,
                    history.len(),
                    fallback
                ));
                Some(fallback)
            }
            Some(value) => {
                if save {
                    history.push(value);
                    if let Err(e) = store.set(&key, &history.to_persisted()) {
                        self.logger
                            .error(&format!("Could not save {} history: {}", period, e));
                    }
                }
                Some(value)
            }
        }
    }

    /// Stored history of a period
    pub async fn history(&self, period: Period) -> ForecastHistory {
        let store = self.persistence.lock().await;
        ForecastHistory::parse(store.get(&history_key(period)).unwrap_or_default())
    }
}
