//! Entity state lookup
//!
//! Home Assistant reports missing data as the strings `unavailable`,
//! `unknown` or `none`. Those sentinels are turned into `None` here so the
//! rest of the crate never compares against them.

use crate::error::Result;
use crate::homeassistant::HomeAssistantClient;

const SENTINELS: [&str; 3] = ["unavailable", "unknown", "none"];

/// Normalize a raw state string, mapping sentinel values to `None`
pub fn normalize_state(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || SENTINELS.iter().any(|s| trimmed.eq_ignore_ascii_case(s)) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Prefix a bare sensor name with `sensor.`
pub fn sensor_entity_id(name: &str) -> String {
    if name.starts_with("sensor.") {
        name.to_string()
    } else {
        format!("sensor.{}", name)
    }
}

/// Read access to entity states
#[async_trait::async_trait]
pub trait StateReader: Send + Sync {
    /// Current state of `entity_id`, `None` when absent or a sentinel
    async fn get(&self, entity_id: &str) -> Result<Option<String>>;
}

#[async_trait::async_trait]
impl StateReader for HomeAssistantClient {
    async fn get(&self, entity_id: &str) -> Result<Option<String>> {
        let state = self.get_state(entity_id).await?;
        Ok(state.and_then(|s| normalize_state(&s.state)))
    }
}
