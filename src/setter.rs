//! Time setter: turn a target level into an inverter charge or discharge slot
//!
//! Every call walks the same path: open a session, connect, take an energy
//! snapshot, compute the window, then either push it (live) or only verify
//! the inverter is reachable (test). The session is closed whatever happens.

use crate::config::SolisControlConfig;
use crate::controls::{Action, RunMode};
use crate::inverter::{
    EnergySnapshot, InverterControl, InverterSession, TimeWindow, TimeWindows, charge_times,
    discharge_times,
};
use crate::logging::{StructuredLogger, get_logger};
use serde::Serialize;
use std::sync::Arc;

/// What was computed for one time setter call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimesReport {
    pub action: Action,
    pub mode: RunMode,
    pub label: String,
    pub snapshot: EnergySnapshot,
    pub window: TimeWindow,
    pub level_required: f64,
}

/// Result of a time setter call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TimesOutcome {
    /// Window pushed (live) or inverter verified (test)
    Ok { report: TimesReport },

    /// Window computed but the push or verification failed
    Failed { report: TimesReport, detail: String },

    /// No session could be established
    NotConnected { detail: String },

    /// Window could not be computed
    Error { detail: String },

    /// Action was neither charge nor discharge; nothing was attempted
    InvalidAction { action: String },
}

impl TimesOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// Status string: `OK` or a description of the failure
    pub fn status(&self) -> String {
        match self {
            Self::Ok { .. } => "OK".to_string(),
            Self::Failed { detail, .. } | Self::NotConnected { detail } | Self::Error { detail } => {
                detail.clone()
            }
            Self::InvalidAction { action } => format!("Invalid action: {}", action),
        }
    }
}

/// Applies charge/discharge windows through an [`InverterControl`]
#[derive(Clone)]
pub struct TimeSetter {
    control: Arc<dyn InverterControl>,
    solis: SolisControlConfig,
    logger: StructuredLogger,
}

impl TimeSetter {
    pub fn new(control: Arc<dyn InverterControl>, solis: SolisControlConfig) -> Self {
        Self {
            control,
            solis,
            logger: get_logger("setter"),
        }
    }

    /// Entry point taking the action by name. Unknown actions are logged
    /// and rejected before any connection attempt.
    pub async fn set_times(&self, action: &str, level_required: f64, mode: RunMode) -> TimesOutcome {
        match action.parse::<Action>() {
            Ok(action) => self.apply(action, level_required, mode).await,
            Err(_) => {
                self.logger.warn(&format!("Invalid action: {}", action));
                TimesOutcome::InvalidAction {
                    action: action.to_string(),
                }
            }
        }
    }

    pub async fn apply(&self, action: Action, level_required: f64, mode: RunMode) -> TimesOutcome {
        let mut session = match self.control.open_session().await {
            Ok(session) => session,
            Err(e) => {
                self.logger
                    .error(&format!("Could not connect to Solis API: {}", e));
                return TimesOutcome::NotConnected {
                    detail: e.to_string(),
                };
            }
        };

        let outcome = self
            .run_session(session.as_mut(), action, level_required, mode)
            .await;
        session.close().await;
        outcome
    }

    async fn run_session(
        &self,
        session: &mut dyn InverterSession,
        action: Action,
        level_required: f64,
        mode: RunMode,
    ) -> TimesOutcome {
        let status = match session.connect().await {
            Ok(status) => status,
            Err(e) => {
                self.logger
                    .error(&format!("Could not connect to Solis API: {}", e));
                return TimesOutcome::NotConnected {
                    detail: e.to_string(),
                };
            }
        };

        let snapshot = EnergySnapshot::from_soc(&self.solis, status.soc_percent);
        let window = match action {
            Action::Charge => charge_times(&self.solis, &snapshot, level_required),
            Action::Discharge => discharge_times(&self.solis, &snapshot, level_required),
        };
        let window = match window {
            Ok(window) => window,
            Err(e) => {
                self.logger
                    .error(&format!("Could not compute {} window: {}", action, e));
                return TimesOutcome::Error {
                    detail: e.to_string(),
                };
            }
        };

        let result = match mode {
            RunMode::Test => session.check_all().await,
            RunMode::Live => {
                let windows = match action {
                    Action::Charge => TimeWindows {
                        charge: Some(window),
                        discharge: None,
                    },
                    Action::Discharge => TimeWindows {
                        charge: None,
                        discharge: Some(window),
                    },
                };
                session.set_inverter_times(&windows).await
            }
        };

        let report = TimesReport {
            action,
            mode,
            label: mode.label(action),
            snapshot,
            window,
            level_required,
        };
        let start = window.start.format("%H:%M");
        let end = window.end.format("%H:%M");

        match result {
            Ok(()) => {
                self.logger.info(&format!(
                    "Current energy {:.1}kWh ({:.0}%) -> set {} from {} to {} to reach {:.1}kWh target",
                    snapshot.current_energy,
                    snapshot.soc_percent,
                    report.label,
                    start,
                    end,
                    level_required
                ));
                TimesOutcome::Ok { report }
            }
            Err(e) => {
                self.logger.error(&format!(
                    "Current energy {:.1}kWh ({:.0}%) -> error setting {} from {} to {} to reach {:.1}kWh target -> {}",
                    snapshot.current_energy,
                    snapshot.soc_percent,
                    report.label,
                    start,
                    end,
                    level_required,
                    e
                ));
                TimesOutcome::Failed {
                    report,
                    detail: e.to_string(),
                }
            }
        }
    }
}
