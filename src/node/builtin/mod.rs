//! Built-in node implementations: EchoNode, SinkNode and GossipNode.
//!
//! Small reference nodes for tests, demos and the WASM scenario. Each one
//! tags its snapshot with a `"kind"` so [`BuiltinFactory`] can restore it.

pub mod echo;
pub mod gossip;
pub mod sink;

pub use echo::EchoNode;
pub use gossip::GossipNode;
pub use sink::SinkNode;

use serde::Deserialize;
use serde_json::Value;

use crate::node::traits::NetworkNode;
use crate::snapshot::NodeFactory;

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum BuiltinState {
    Echo(EchoNode),
    Sink(SinkNode),
    Gossip(GossipNode),
}

/// Restores built-in nodes from their tagged snapshots.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinFactory;

impl NodeFactory for BuiltinFactory {
    fn restore(&self, _name: &str, state: &Value) -> anyhow::Result<Box<dyn NetworkNode>> {
        let node: Box<dyn NetworkNode> = match BuiltinState::deserialize(state)? {
            BuiltinState::Echo(n) => Box::new(n),
            BuiltinState::Sink(n) => Box::new(n),
            BuiltinState::Gossip(n) => Box::new(n),
        };
        Ok(node)
    }
}
