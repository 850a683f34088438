//! Home Assistant REST API client
//!
//! Used for two things: reading sensor states (the solar forecast, the
//! battery SOC) and calling services to write the inverter's time slots.

use crate::config::HomeAssistantConfig;
use crate::error::{FluxError, Result};
use crate::logging::get_logger;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

pub mod types;

pub use types::HaEntityState;

/// Home Assistant REST API client
#[derive(Clone)]
pub struct HomeAssistantClient {
    base_url: String,
    token: String,
    client: Client,
    logger: crate::logging::StructuredLogger,
}

impl HomeAssistantClient {
    /// Create a new client
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FluxError::config(format!("Failed to build HTTP client: {}", e)))?;

        let base_url: String = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
            logger: get_logger("homeassistant"),
        })
    }

    /// Create a client from configuration, falling back to `HA_TOKEN`
    pub fn from_config(cfg: &HomeAssistantConfig) -> Result<Self> {
        let token = cfg
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| std::env::var("HA_TOKEN").ok())
            .ok_or_else(|| {
                FluxError::config(
                    "Home Assistant token not found in config or HA_TOKEN environment variable",
                )
            })?;

        Self::new(
            cfg.base_url.clone(),
            token,
            Duration::from_secs(cfg.timeout_seconds.max(1)),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get the state of a specific entity. A missing entity is `Ok(None)`.
    pub async fn get_state(&self, entity_id: &str) -> Result<Option<HaEntityState>> {
        let url = format!("{}/api/states/{}", self.base_url, entity_id);
        self.logger
            .trace(&format!("Getting state for entity {}", entity_id));

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let state = response.json::<HaEntityState>().await?;
                self.logger
                    .debug(&format!("Entity {} = '{}'", entity_id, state.state));
                Ok(Some(state))
            }
            StatusCode::NOT_FOUND => {
                self.logger
                    .debug(&format!("Entity not found: {}", entity_id));
                Ok(None)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(FluxError::home_assistant(
                format!("Authentication failed reading {}", entity_id),
            )),
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(FluxError::home_assistant(format!(
                    "Status {} reading {}: {}",
                    status, entity_id, error_text
                )))
            }
        }
    }

    /// Call a service given as `domain.service`
    pub async fn call_service(&self, service: &str, data: Value) -> Result<()> {
        let Some((domain, name)) = service.split_once('.') else {
            return Err(FluxError::validation(
                "service",
                format!("Invalid service format '{}', expected 'domain.service'", service),
            ));
        };

        let url = format!("{}/api/services/{}/{}", self.base_url, domain, name);
        self.logger
            .debug(&format!("Calling service {} with {}", service, data));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&data)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FluxError::home_assistant(format!(
                "Authentication failed calling {}",
                service
            )));
        }
        let error_text = response.text().await.unwrap_or_default();
        Err(FluxError::home_assistant(format!(
            "Service {} failed (status {}): {}",
            service, status, error_text
        )))
    }
}
