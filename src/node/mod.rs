//! Node abstraction and registry.
//!
//! Nodes are independent protocol instances that never share memory.
//! All interaction is mediated by the simulator: a node receives a
//! message through [`NetworkNode::process`] and emits through the
//! [`NodeContext`] it is handed for that call.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`traits`] | [`NetworkNode`] trait, [`NodeContext`], [`Outbox`] |
//! | [`registry`] | [`Registry`] name → node map |
//! | [`builtin`] | [`EchoNode`], [`SinkNode`], [`GossipNode`], [`BuiltinFactory`] |

pub mod builtin;
pub mod registry;
pub mod traits;

// Flat re-exports so external callers can use `roundnet::node::Registry` etc.
pub use builtin::{BuiltinFactory, EchoNode, GossipNode, SinkNode};
pub use registry::{is_reserved_name, Registry, RESERVED_NAMES};
pub use traits::{NetworkNode, NodeContext, OutboundMessage, Outbox};
