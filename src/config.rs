//! Engine configuration.
//!
//! Hosts either build an [`EngineConfig`] with the `with_*` setters or load
//! one from JSON. Missing JSON fields fall back to the defaults.
//!
//! ```ignore
//! let config = EngineConfig::from_json_str(r#"{ "tick_interval_ms": 16 }"#)?
//!     .with_max_retries(None);
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::error::{BridgeError, BridgeResult};

/// Default reconciliation cadence in milliseconds.
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Default number of ticks a command may wait for a missing reference.
pub const DEFAULT_MAX_RETRIES: u32 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Interval between reconciliation ticks.
    pub tick_interval_ms: u64,
    /// Ticks a deferred command may wait. `None` retries forever.
    pub max_retries: Option<u32>,
    /// Script-side prefix for per-object accessors and the handler table.
    pub widgets_namespace: String,
    /// Script-side name under which the engine installs itself.
    pub bridge_accessor: String,
    /// Install a per-object accessor after registering each object.
    pub expose_objects: bool,
    /// Payload key whose presence marks an object persistent.
    pub persistent_marker: String,
    /// Payload key whose presence marks an unmount as hide-not-destroy.
    pub retained_marker: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            max_retries: Some(DEFAULT_MAX_RETRIES),
            widgets_namespace: "$widgets".to_string(),
            bridge_accessor: "$bridge".to_string(),
            expose_objects: true,
            persistent_marker: "persistent".to_string(),
            retained_marker: "retained".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> BridgeResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|err| BridgeError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_widgets_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.widgets_namespace = namespace.into();
        self
    }

    pub fn with_bridge_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.bridge_accessor = accessor.into();
        self
    }

    pub fn with_expose_objects(mut self, expose: bool) -> Self {
        self.expose_objects = expose;
        self
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> BridgeResult<()> {
        if self.tick_interval_ms == 0 {
            return Err(BridgeError::Config("tick_interval_ms must be positive".into()));
        }
        if self.widgets_namespace.is_empty() {
            return Err(BridgeError::Config("widgets_namespace is empty".into()));
        }
        if self.bridge_accessor.is_empty() {
            return Err(BridgeError::Config("bridge_accessor is empty".into()));
        }
        if self.persistent_marker.is_empty() || self.retained_marker.is_empty() {
            return Err(BridgeError::Config("markers must not be empty".into()));
        }
        if self.persistent_marker == self.retained_marker {
            return Err(BridgeError::Config(format!(
                "persistent and retained markers are both `{}`",
                self.persistent_marker
            )));
        }
        Ok(())
    }
}
