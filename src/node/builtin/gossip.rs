//! `GossipNode`: floods each new message to its neighbours once.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::node::traits::{NetworkNode, NodeContext};

/// Flooding node: the first time it sees a message text it forwards it to
/// every neighbour except the one it came from. Repeats are ignored, so a
/// flood over any finite topology converges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipNode {
    pub neighbours: Vec<String>,
    /// Message texts already forwarded.
    pub seen: BTreeSet<String>,
}

impl GossipNode {
    pub fn new<I, S>(neighbours: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GossipNode {
            neighbours: neighbours.into_iter().map(Into::into).collect(),
            seen: BTreeSet::new(),
        }
    }

    /// Start a flood from this node. Returns `false` if the message was
    /// already seen and nothing was sent.
    pub fn originate(&mut self, ctx: &mut NodeContext<'_>, message: &str) -> bool {
        if !self.seen.insert(message.to_string()) {
            return false;
        }
        for neighbour in &self.neighbours {
            ctx.send(neighbour.as_str(), message);
        }
        true
    }
}

impl NetworkNode for GossipNode {
    fn process(&mut self, ctx: &mut NodeContext<'_>, from: &str, message: &str) -> anyhow::Result<()> {
        if !self.seen.insert(message.to_string()) {
            return Ok(());
        }
        for neighbour in self.neighbours.iter().filter(|n| n.as_str() != from) {
            ctx.send(neighbour.as_str(), message);
        }
        Ok(())
    }

    fn to_snapshot(&self) -> Value {
        json!({
            "kind": "gossip",
            "neighbours": self.neighbours,
            "seen": self.seen,
        })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
