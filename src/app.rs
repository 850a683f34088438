//! Application wiring: build every component from the configuration

use crate::config::Config;
use crate::error::Result;
use crate::forecast::ForecastStore;
use crate::homeassistant::HomeAssistantClient;
use crate::inverter::{HaInverterControl, InverterControl};
use crate::logging::get_logger;
use crate::persistence::PersistenceManager;
use crate::scheduler::Scheduler;
use crate::service::DiagnosticService;
use crate::setter::TimeSetter;
use crate::state::StateReader;
use crate::web::{self, AppState};
use std::sync::Arc;
use tokio::sync::{Mutex, watch};

/// Fully wired service
pub struct App {
    config: Config,
    scheduler: Scheduler,
    state: AppState,
}

impl App {
    /// Build against Home Assistant as configured
    pub fn from_config(config: Config) -> Result<Self> {
        let client = HomeAssistantClient::from_config(&config.home_assistant)?;
        let control =
            HaInverterControl::new(client.clone(), config.solis_control.entities.clone());
        Self::with_backends(config, Arc::new(client), Arc::new(control))
    }

    /// Build with explicit state and inverter backends
    pub fn with_backends(
        config: Config,
        states: Arc<dyn StateReader>,
        control: Arc<dyn InverterControl>,
    ) -> Result<Self> {
        let logger = get_logger("app");

        let mut persistence = PersistenceManager::new(&config.persistence.file);
        if let Err(e) = persistence.load() {
            logger.warn(&format!(
                "Could not load state from {}: {}; starting empty",
                config.persistence.file, e
            ));
        }
        let persistence = Arc::new(Mutex::new(persistence));

        let forecast = ForecastStore::new(states, persistence, &config.forecast_remaining);
        let setter = TimeSetter::new(control, config.solis_control.clone());
        let scheduler = Scheduler::new(&config, forecast.clone(), setter.clone())?;
        let service = DiagnosticService::new(
            forecast.clone(),
            setter,
            config.morning_requirement,
            config.evening_requirement,
        );

        let state = AppState {
            scheduler: scheduler.clone(),
            service,
            forecast,
        };

        Ok(Self {
            config,
            scheduler,
            state,
        })
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn web_state(&self) -> AppState {
        self.state.clone()
    }

    /// Run the scheduler (and the web server when enabled) until `shutdown`
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<()> {
        let logger = get_logger("app");

        let web_task = if self.config.web.enabled {
            let state = self.state.clone();
            let host = self.config.web.host.clone();
            let port = self.config.web.port;
            let web_logger = logger.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = web::serve(state, &host, port).await {
                    web_logger.error(&format!("Web server error: {}", e));
                }
            }))
        } else {
            logger.info("Web server disabled");
            None
        };

        self.scheduler.run(shutdown).await;

        if let Some(task) = web_task {
            task.abort();
        }
        logger.info("Shutdown complete");
        Ok(())
    }
}
