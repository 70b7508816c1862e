//! `EchoNode`: echoes every received message back to its sender.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::node::traits::{NetworkNode, NodeContext};

/// A simple node that echoes every message back to its sender.
///
/// Two echo nodes talking to each other never converge, which makes the
/// pair a handy fixture for round-budget tests. `echoed` counts replies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoNode {
    pub echoed: u64,
}

impl EchoNode {
    pub fn new() -> Self {
        EchoNode::default()
    }
}

impl NetworkNode for EchoNode {
    fn process(&mut self, ctx: &mut NodeContext<'_>, from: &str, message: &str) -> anyhow::Result<()> {
        self.echoed += 1;
        ctx.send(from, message);
        Ok(())
    }

    fn to_snapshot(&self) -> Value {
        json!({ "kind": "echo", "echoed": self.echoed })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
