//! # Solis Flux - forecast-aware battery scheduling for Solis inverters
//!
//! Sets the inverter's timed charge and discharge slots twice a day so the
//! battery holds just enough energy, taking the remaining solar forecast
//! into account.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading and validation
//! - `logging`: Structured logging and tracing
//! - `homeassistant`: Home Assistant REST client
//! - `state`: Entity state reads with sentinel handling
//! - `persistence`: JSON key-value state file
//! - `forecast`: Solar forecast with per-period history fallback
//! - `controls`: Actions, periods and the target level calculation
//! - `inverter`: Inverter session seam and window arithmetic
//! - `setter`: Applies a charge or discharge window
//! - `scheduler`: Daily cron triggers with a single retry
//! - `service`: Diagnostic (dry-run) calls
//! - `web`: HTTP API
//! - `app`: Component wiring
//! - `options`: Command line options

pub mod app;
pub mod config;
pub mod controls;
pub mod error;
pub mod forecast;
pub mod homeassistant;
pub mod inverter;
pub mod logging;
pub mod options;
pub mod persistence;
pub mod scheduler;
pub mod service;
pub mod setter;
pub mod state;
pub mod web;

// Re-export commonly used types
pub use app::App;
pub use config::Config;
pub use error::{FluxError, Result};
