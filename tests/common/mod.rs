#![allow(dead_code)]

use solis_flux::config::Config;
use solis_flux::error::{FluxError, Result};
use solis_flux::forecast::ForecastStore;
use solis_flux::inverter::{InverterControl, InverterSession, InverterStatus, TimeWindows};
use solis_flux::persistence::PersistenceManager;
use solis_flux::setter::TimeSetter;
use solis_flux::state::StateReader;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub const FORECAST_SENSOR: &str = "sensor.solcast_pv_forecast_forecast_remaining_today";

/// Config pointing its state file at `state_file`
pub fn test_config(state_file: &Path) -> Config {
    let mut config = Config::default();
    config.persistence.file = state_file.to_string_lossy().to_string();
    config.morning_requirement = 8.0;
    config.evening_requirement = 4.0;
    config.web.enabled = false;
    config
}

/// In-memory entity states
#[derive(Default)]
pub struct FakeStates {
    values: Mutex<HashMap<String, String>>,
}

impl FakeStates {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set(&self, entity_id: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(entity_id.to_string(), value.to_string());
    }

    pub fn remove(&self, entity_id: &str) {
        self.values.lock().unwrap().remove(entity_id);
    }
}

#[async_trait::async_trait]
impl StateReader for FakeStates {
    async fn get(&self, entity_id: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap();
        Ok(values
            .get(entity_id)
            .and_then(|v| solis_flux::state::normalize_state(v)))
    }
}

/// Call counters shared between a scripted inverter and its sessions
#[derive(Default)]
pub struct Calls {
    pub opens: AtomicUsize,
    pub connects: AtomicUsize,
    pub checks: AtomicUsize,
    pub sets: AtomicUsize,
    pub closes: AtomicUsize,
    pub windows: Mutex<Vec<TimeWindows>>,
}

impl Calls {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
    pub fn sets(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Inverter whose results are scripted per call
pub struct ScriptedInverter {
    pub soc_percent: f64,
    pub connect_ok: bool,
    /// Results of successive `set_inverter_times` calls; empty means OK
    pub set_results: Mutex<VecDeque<std::result::Result<(), String>>>,
    pub calls: Arc<Calls>,
}

impl ScriptedInverter {
    pub fn new(soc_percent: f64) -> Self {
        Self {
            soc_percent,
            connect_ok: true,
            set_results: Mutex::new(VecDeque::new()),
            calls: Arc::new(Calls::default()),
        }
    }

    pub fn unreachable() -> Self {
        Self {
            connect_ok: false,
            ..Self::new(0.0)
        }
    }

    pub fn failing_sets(self, count: usize) -> Self {
        {
            let mut results = self.set_results.lock().unwrap();
            for _ in 0..count {
                results.push_back(Err("inverter rejected times".to_string()));
            }
        }
        self
    }
}

struct ScriptedSession {
    soc_percent: f64,
    connect_ok: bool,
    next_set: Option<std::result::Result<(), String>>,
    calls: Arc<Calls>,
}

#[async_trait::async_trait]
impl InverterControl for ScriptedInverter {
    async fn open_session(&self) -> Result<Box<dyn InverterSession>> {
        self.calls.opens.fetch_add(1, Ordering::SeqCst);
        let next_set = self.set_results.lock().unwrap().pop_front();
        Ok(Box::new(ScriptedSession {
            soc_percent: self.soc_percent,
            connect_ok: self.connect_ok,
            next_set,
            calls: self.calls.clone(),
        }))
    }
}

#[async_trait::async_trait]
impl InverterSession for ScriptedSession {
    async fn connect(&mut self) -> Result<InverterStatus> {
        self.calls.connects.fetch_add(1, Ordering::SeqCst);
        if self.connect_ok {
            Ok(InverterStatus {
                soc_percent: self.soc_percent,
            })
        } else {
            Err(FluxError::network("connection refused"))
        }
    }

    async fn check_all(&mut self) -> Result<()> {
        self.calls.checks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn set_inverter_times(&mut self, windows: &TimeWindows) -> Result<()> {
        self.calls.sets.fetch_add(1, Ordering::SeqCst);
        self.calls.windows.lock().unwrap().push(*windows);
        match self.next_set.take() {
            Some(Err(detail)) => Err(FluxError::inverter(detail)),
            _ => Ok(()),
        }
    }

    async fn close(&mut self) {
        self.calls.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Forecast store over fake states and a fresh state file
pub fn forecast_store(config: &Config, states: Arc<FakeStates>) -> ForecastStore {
    let persistence = PersistenceManager::new(&config.persistence.file);
    ForecastStore::new(
        states,
        Arc::new(tokio::sync::Mutex::new(persistence)),
        &config.forecast_remaining,
    )
}

pub fn time_setter(config: &Config, inverter: ScriptedInverter) -> (TimeSetter, Arc<Calls>) {
    let calls = inverter.calls.clone();
    (
        TimeSetter::new(Arc::new(inverter), config.solis_control.clone()),
        calls,
    )
}
