/// Snapshot export and restoration.
///
/// A snapshot is one JSON object: every registered node's own snapshot
/// under its name, plus the reserved keys `log` (ordered delivery events)
/// and `batch` (pending packages). The struct below is that layout; node
/// entries are flattened next to the two reserved fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SimError, SimResult};
use crate::eventlog::Entry;
use crate::node::{is_reserved_name, NetworkNode};
use crate::transport::TransportPackage;

/// Full exported state of a simulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub nodes: IndexMap<String, Value>,
    pub log: Vec<Entry>,
    pub batch: Vec<TransportPackage>,
}

impl Snapshot {
    /// Parse a snapshot value. Fails closed: a missing `log` or `batch`,
    /// a wrongly shaped entry, or a reserved node name is an error.
    pub fn from_value(value: Value) -> SimResult<Self> {
        if !value.is_object() {
            return Err(SimError::MalformedSnapshot("expected a JSON object".into()));
        }
        let snapshot: Snapshot = serde_json::from_value(value)
            .map_err(|e| SimError::MalformedSnapshot(e.to_string()))?;
        if let Some(name) = snapshot.nodes.keys().find(|n| is_reserved_name(n)) {
            return Err(SimError::MalformedSnapshot(format!(
                "reserved key {:?} used as a node name",
                name
            )));
        }
        Ok(snapshot)
    }

    /// Parse a snapshot from JSON text.
    pub fn from_json_str(s: &str) -> SimResult<Self> {
        let value: Value =
            serde_json::from_str(s).map_err(|e| SimError::MalformedSnapshot(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_value(&self) -> SimResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> SimResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild every node through `factory`, in snapshot order.
    pub(crate) fn restore_nodes(
        &self,
        factory: &dyn NodeFactory,
    ) -> SimResult<Vec<(String, Box<dyn NetworkNode>)>> {
        self.nodes
            .iter()
            .map(|(name, state)| {
                factory
                    .restore(name, state)
                    .map(|node| (name.clone(), node))
                    .map_err(|e| SimError::MalformedSnapshot(format!("node {:?}: {:#}", name, e)))
            })
            .collect()
    }
}

// ── NodeFactory ───────────────────────────────────────────────────────

/// Rebuilds a node instance from the value its `to_snapshot` produced.
pub trait NodeFactory {
    fn restore(&self, name: &str, state: &Value) -> anyhow::Result<Box<dyn NetworkNode>>;
}

/// A factory backed by a closure.
impl<F> NodeFactory for F
where
    F: Fn(&str, &Value) -> anyhow::Result<Box<dyn NetworkNode>>,
{
    fn restore(&self, name: &str, state: &Value) -> anyhow::Result<Box<dyn NetworkNode>> {
        (self)(name, state)
    }
}
