//! Persistence layer for string-valued state
//!
//! A small key-value store backed by a JSON file. It stands in for the
//! persistent state variables a home-automation host would otherwise keep,
//! and is what the forecast history survives restarts in.

use crate::error::Result;
use crate::logging::get_logger;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Persistent state structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PersistentState {
    /// String values keyed by name
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

/// Persistence manager
pub struct PersistenceManager {
    file_path: String,
    state: PersistentState,
    logger: crate::logging::StructuredLogger,
}

impl PersistenceManager {
    /// Create a new persistence manager
    pub fn new(file_path: &str) -> Self {
        let logger = get_logger("persistence");
        Self {
            file_path: file_path.to_string(),
            state: PersistentState::default(),
            logger,
        }
    }

    /// Load state from disk
    pub fn load(&mut self) -> Result<()> {
        let path = Path::new(&self.file_path);

        if !path.exists() {
            self.logger
                .info("No persistent state file found, using defaults");
            return Ok(());
        }

        let contents = std::fs::read_to_string(path)?;
        self.state = serde_json::from_str(&contents)?;
        self.logger.info(&format!(
            "Loaded {} persistent value(s) from {}",
            self.state.values.len(),
            self.file_path
        ));

        Ok(())
    }

    /// Save state to disk
    pub fn save(&self) -> Result<()> {
        let contents = serde_json::to_string_pretty(&self.state)?;
        if let Some(parent) = Path::new(&self.file_path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.file_path, contents)?;
        self.logger.debug("Saved persistent state to disk");

        Ok(())
    }

    /// Get a value from persistent state
    pub fn get(&self, key: &str) -> Option<&str> {
        self.state.values.get(key).map(String::as_str)
    }

    /// Make sure `key` exists, creating it with `default` if it does not.
    /// Existing values are left untouched.
    pub fn persist(&mut self, key: &str, default: &str) -> Result<()> {
        if self.state.values.contains_key(key) {
            return Ok(());
        }
        self.state
            .values
            .insert(key.to_string(), default.to_string());
        self.save()
    }

    /// Set a value and write it through to disk
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.state
            .values
            .insert(key.to_string(), value.to_string());
        self.save()
    }
}
