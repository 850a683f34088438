//! Inverter backend driven through Home Assistant entities
//!
//! The SOC comes from a sensor and the charge/discharge slots are `time.*`
//! entities exposed by the inverter integration, written with the
//! `time.set_value` service.

use super::{InverterControl, InverterSession, InverterStatus, TimeWindow, TimeWindows};
use crate::config::InverterEntities;
use crate::error::{FluxError, Result};
use crate::homeassistant::HomeAssistantClient;
use crate::logging::{StructuredLogger, get_logger};
use crate::state::normalize_state;

/// Session factory bound to one Home Assistant instance
#[derive(Clone)]
pub struct HaInverterControl {
    client: HomeAssistantClient,
    entities: InverterEntities,
}

impl HaInverterControl {
    pub fn new(client: HomeAssistantClient, entities: InverterEntities) -> Self {
        Self { client, entities }
    }
}

#[async_trait::async_trait]
impl InverterControl for HaInverterControl {
    async fn open_session(&self) -> Result<Box<dyn InverterSession>> {
        Ok(Box::new(HaInverterSession {
            client: self.client.clone(),
            entities: self.entities.clone(),
            connected: false,
            logger: get_logger("inverter"),
        }))
    }
}

struct HaInverterSession {
    client: HomeAssistantClient,
    entities: InverterEntities,
    connected: bool,
    logger: StructuredLogger,
}

impl HaInverterSession {
    fn ensure_connected(&self) -> Result<()> {
        if self.connected {
            Ok(())
        } else {
            Err(FluxError::inverter("Session is not connected"))
        }
    }

    /// Normalized state of an entity, erroring when it cannot be read
    async fn read(&self, entity_id: &str) -> Result<String> {
        let state = self
            .client
            .get_state(entity_id)
            .await?
            .ok_or_else(|| FluxError::inverter(format!("Entity {} not found", entity_id)))?;
        normalize_state(&state.state)
            .ok_or_else(|| FluxError::inverter(format!("Entity {} is unavailable", entity_id)))
    }

    async fn read_soc(&self) -> Result<f64> {
        let raw = self.read(&self.entities.battery_soc).await?;
        let soc = raw.parse::<f64>().map_err(|_| {
            FluxError::inverter(format!(
                "Battery SOC '{}' from {} is not a number",
                raw, self.entities.battery_soc
            ))
        })?;
        if !(0.0..=100.0).contains(&soc) {
            return Err(FluxError::inverter(format!(
                "Battery SOC {} out of range",
                soc
            )));
        }
        Ok(soc)
    }

    async fn write_slot(
        &self,
        start_entity: &str,
        end_entity: &str,
        window: &TimeWindow,
    ) -> Result<()> {
        for (entity_id, time) in [(start_entity, window.start), (end_entity, window.end)] {
            self.client
                .call_service(
                    "time.set_value",
                    serde_json::json!({
                        "entity_id": entity_id,
                        "time": time.format("%H:%M:%S").to_string(),
                    }),
                )
                .await?;
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl InverterSession for HaInverterSession {
    async fn connect(&mut self) -> Result<InverterStatus> {
        let soc_percent = self.read_soc().await?;
        self.connected = true;
        self.logger
            .debug(&format!("Connected, battery at {:.0}%", soc_percent));
        Ok(InverterStatus { soc_percent })
    }

    async fn check_all(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.read_soc().await?;
        for entity_id in [
            &self.entities.charge_start,
            &self.entities.charge_end,
            &self.entities.discharge_start,
            &self.entities.discharge_end,
        ] {
            self.read(entity_id).await?;
        }
        Ok(())
    }

    async fn set_inverter_times(&mut self, windows: &TimeWindows) -> Result<()> {
        self.ensure_connected()?;
        if let Some(window) = &windows.charge {
            self.write_slot(&self.entities.charge_start, &self.entities.charge_end, window)
                .await?;
        }
        if let Some(window) = &windows.discharge {
            self.write_slot(
                &self.entities.discharge_start,
                &self.entities.discharge_end,
                window,
            )
            .await?;
        }
        Ok(())
    }

    async fn close(&mut self) {
        if self.connected {
            self.logger.debug("Session closed");
        }
        self.connected = false;
    }
}
