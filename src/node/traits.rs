//! `NetworkNode` trait and the `NodeContext` handed to running nodes.

use serde_json::Value;

// ── Outbox ────────────────────────────────────────────────────────────

/// A message a node asked to send while it was running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub to: String,
    pub message: String,
}

/// Messages emitted by one node during one call, in emission order.
///
/// The simulator drains the outbox as soon as the node returns, so the
/// node never observes its own messages being delivered mid-call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outbox {
    messages: Vec<OutboundMessage>,
}

impl Outbox {
    pub fn new() -> Self {
        Outbox::default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[OutboundMessage] {
        &self.messages
    }

    /// Take everything emitted so far, leaving the outbox empty.
    pub fn drain(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.messages)
    }
}

// ── NodeContext ───────────────────────────────────────────────────────

/// Send-capable handle given to a node for the duration of one call.
///
/// This is the only way a node can reach the simulator. It carries the
/// node's own registered name so protocol code does not have to store it.
pub struct NodeContext<'a> {
    name: &'a str,
    outbox: &'a mut Outbox,
}

impl<'a> NodeContext<'a> {
    /// Build a context for `name` writing into `outbox`. The simulator does
    /// this for every call; tests can use it to drive a node directly.
    pub fn new(name: &'a str, outbox: &'a mut Outbox) -> Self {
        NodeContext { name, outbox }
    }

    /// The name this node is registered under.
    #[inline]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Ask the simulator to send `message` to `to`.
    ///
    /// Whether and when it is delivered depends on the delivery strategy;
    /// the node itself cannot tell.
    pub fn send(&mut self, to: impl Into<String>, message: impl Into<String>) {
        self.outbox.messages.push(OutboundMessage {
            to: to.into(),
            message: message.into(),
        });
    }

    /// Number of messages emitted so far in this call.
    pub fn emitted(&self) -> usize {
        self.outbox.len()
    }
}

// ── NetworkNode ───────────────────────────────────────────────────────

/// Trait implemented by every simulated protocol instance.
///
/// # Contract
///
/// Implementations **must**:
/// - Reach other nodes only through `ctx.send`.
/// - Be deterministic for equal inputs.
/// - Return an error for input they cannot handle; the simulator relays it
///   to the driver untouched.
///
/// # Example
///
/// ```rust
/// use roundnet::node::{NetworkNode, NodeContext};
/// use serde_json::{json, Value};
///
/// struct Counter { seen: u64 }
///
/// impl NetworkNode for Counter {
///     fn process(&mut self, ctx: &mut NodeContext<'_>, from: &str, message: &str) -> anyhow::Result<()> {
///         self.seen += 1;
///         if message == "ping" {
///             ctx.send(from, "pong");
///         }
///         Ok(())
///     }
///     fn to_snapshot(&self) -> Value { json!({ "seen": self.seen }) }
///     fn as_any(&self) -> &dyn std::any::Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
/// }
/// ```
pub trait NetworkNode {
    /// Handle an inbound message from the node registered as `from`.
    fn process(&mut self, ctx: &mut NodeContext<'_>, from: &str, message: &str)
        -> anyhow::Result<()>;

    /// Structured view of this node's state, embedded in simulator snapshots.
    fn to_snapshot(&self) -> Value;

    /// Downcast support, required for `Registry::node::<T>()`.
    fn as_any(&self) -> &dyn std::any::Any;
    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
