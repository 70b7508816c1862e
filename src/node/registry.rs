//! `Registry`: owns every node, keyed by name.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{SimError, SimResult};
use crate::eventlog::ROUND_MARKER;

use super::traits::NetworkNode;

/// Snapshot keys that cannot double as node names.
pub const RESERVED_NAMES: [&str; 3] = ["log", "batch", ROUND_MARKER];

/// Whether `name` collides with a snapshot key or the round marker.
pub fn is_reserved_name(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

/// Holds named node instances.
///
/// Lookups are O(1); iteration follows registration order so snapshots
/// list nodes deterministically.
#[derive(Default)]
pub struct Registry {
    nodes: IndexMap<String, Box<dyn NetworkNode>>,
}

impl Registry {
    pub fn new() -> Self {
        Registry {
            nodes: IndexMap::new(),
        }
    }

    /// Register `node` under `name`, returning any node it replaced.
    ///
    /// Re-registering a name overwrites the binding in place and keeps its
    /// original position.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        node: Box<dyn NetworkNode>,
    ) -> SimResult<Option<Box<dyn NetworkNode>>> {
        let name = name.into();
        if is_reserved_name(&name) {
            return Err(SimError::ReservedName(name));
        }
        Ok(self.nodes.insert(name, node))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Resolve a recipient name. `None` means "unknown recipient".
    pub fn resolve(&self, name: &str) -> Option<&dyn NetworkNode> {
        self.nodes.get(name).map(|node| node.as_ref())
    }

    pub fn resolve_mut(&mut self, name: &str) -> Option<&mut Box<dyn NetworkNode>> {
        self.nodes.get_mut(name)
    }

    /// Downcast a node reference for inspection.
    ///
    /// Returns `None` if the node is not registered or has a wrong type.
    pub fn node<T: NetworkNode + 'static>(&self, name: &str) -> Option<&T> {
        self.nodes.get(name)?.as_any().downcast_ref::<T>()
    }

    /// Downcast a mutable node reference.
    pub fn node_mut<T: NetworkNode + 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.nodes.get_mut(name)?.as_any_mut().downcast_mut::<T>()
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Every node's own snapshot, keyed by name.
    pub fn to_snapshot(&self) -> IndexMap<String, Value> {
        self.nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.to_snapshot()))
            .collect()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .finish()
    }
}
