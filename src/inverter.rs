//! Inverter control seam
//!
//! The time setter talks to the inverter through short-lived sessions:
//! open, connect, read or write, close. The window arithmetic lives in
//! [`energy`]; the only production backend drives the inverter through
//! Home Assistant entities.

use crate::error::Result;
use serde::Serialize;

pub mod energy;
pub mod home_assistant;

pub use energy::{
    EnergySnapshot, TimeWindow, TimeWindows, charge_times, discharge_times, time_adjust,
};
pub use home_assistant::HaInverterControl;

/// Live readings returned by a successful connect
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InverterStatus {
    /// Battery state of charge in percent
    pub soc_percent: f64,
}

/// Factory for inverter sessions
#[async_trait::async_trait]
pub trait InverterControl: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn InverterSession>>;
}

/// One scoped conversation with the inverter. Callers must `close` the
/// session on every exit path.
#[async_trait::async_trait]
pub trait InverterSession: Send {
    /// Establish the connection and read the current battery state
    async fn connect(&mut self) -> Result<InverterStatus>;

    /// Verify the inverter is reachable and its time settings readable,
    /// without changing anything
    async fn check_all(&mut self) -> Result<()>;

    /// Write the given slots; `None` slots are left as they are
    async fn set_inverter_times(&mut self, windows: &TimeWindows) -> Result<()>;

    /// Release the session
    async fn close(&mut self);
}
