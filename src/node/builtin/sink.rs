//! `SinkNode`: records all received messages for test assertions.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::node::traits::{NetworkNode, NodeContext};

/// A node that records every message it receives and never replies.
///
/// Ideal as a terminal node in tests that verify delivery counts,
/// ordering, and contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkNode {
    /// All messages received, in delivery order: `(from, message)`.
    pub received: Vec<(String, String)>,
}

impl SinkNode {
    pub fn new() -> Self {
        SinkNode::default()
    }
}

impl NetworkNode for SinkNode {
    fn process(&mut self, _ctx: &mut NodeContext<'_>, from: &str, message: &str) -> anyhow::Result<()> {
        self.received.push((from.to_string(), message.to_string()));
        Ok(())
    }

    fn to_snapshot(&self) -> Value {
        json!({ "kind": "sink", "received": self.received })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
