//! Simulator configuration.
//!
//! Mirrors the simulator's knobs as a plain serde struct so drivers can
//! load it from JSON alongside a snapshot. Every field has a default, so
//! `{}` is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Round budget used by the original driver loop.
pub const DEFAULT_MAX_ROUNDS: u64 = 100_000;

/// Upper bound on deliveries in one immediate-mode cascade.
pub const DEFAULT_MAX_IMMEDIATE_DELIVERIES: u64 = 100_000;

/// How emitted messages reach their recipients when the simulator is built
/// from configuration alone. External transports are attached in code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Deliver at emission time, depth-first.
    Immediate,
    /// Buffer into the pending batch until the next `flush`.
    #[default]
    Batched,
}

/// Configuration for a [`Simulator`](crate::Simulator).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub mode: DeliveryMode,
    /// Round budget for [`Simulator::run`](crate::Simulator::run).
    pub max_rounds: u64,
    pub max_immediate_deliveries: u64,
    /// First word that marks a message as a probe for the default classifier.
    pub probe_prefix: String,
}

impl SimulatorConfig {
    /// Batched delivery with default budgets.
    pub fn batched() -> Self {
        SimulatorConfig::default()
    }

    /// Immediate (unbatched) delivery with default budgets.
    pub fn immediate() -> Self {
        SimulatorConfig {
            mode: DeliveryMode::Immediate,
            ..SimulatorConfig::default()
        }
    }

    /// Override the round budget.
    pub fn with_max_rounds(mut self, max_rounds: u64) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Override the immediate-mode cascade budget.
    pub fn with_max_immediate_deliveries(mut self, limit: u64) -> Self {
        self.max_immediate_deliveries = limit;
        self
    }

    /// Override the probe prefix used by the default classifier.
    pub fn with_probe_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.probe_prefix = prefix.into();
        self
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(s: &str) -> SimResult<Self> {
        let config: SimulatorConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make the simulator unusable.
    pub fn validate(&self) -> SimResult<()> {
        if self.max_rounds == 0 {
            return Err(SimError::InvalidConfig("max_rounds must be positive".into()));
        }
        if self.max_immediate_deliveries == 0 {
            return Err(SimError::InvalidConfig(
                "max_immediate_deliveries must be positive".into(),
            ));
        }
        if self.probe_prefix.trim().is_empty() {
            return Err(SimError::InvalidConfig("probe_prefix must not be empty".into()));
        }
        Ok(())
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        SimulatorConfig {
            mode: DeliveryMode::Batched,
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_immediate_deliveries: DEFAULT_MAX_IMMEDIATE_DELIVERIES,
            probe_prefix: "probe".into(),
        }
    }
}
