//! Structured error types for roundnet.
//!
//! All fallible public APIs return `Result<T, SimError>`. Conditions the
//! simulator treats as normal (a message addressed to an unknown node, a
//! run that never converges) are *not* errors and never show up here.

/// The top-level error type for the simulator.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    // ── Node errors ───────────────────────────────────────

    /// A node name was referenced by the driver but is not registered.
    #[error("node {0:?} not found")]
    UnknownNode(String),

    /// The name collides with a reserved snapshot key or the round marker.
    #[error("node name {0:?} is reserved")]
    ReservedName(String),

    /// A node downcast to a concrete type failed (type mismatch).
    #[error("node {node:?} is not a {expected}")]
    NodeTypeMismatch {
        node: String,
        expected: &'static str,
    },

    /// A node's `process` call failed. Never swallowed by the simulator.
    #[error("node {node:?} failed to process message from {from:?}")]
    NodeFailed {
        node: String,
        from: String,
        #[source]
        source: anyhow::Error,
    },

    // ── Delivery errors ───────────────────────────────────

    /// The external transport collaborator rejected an operation.
    #[error("transport error")]
    Transport(#[source] anyhow::Error),

    /// An immediate-mode cascade exceeded its delivery budget.
    #[error("immediate delivery cascade exceeded {limit} deliveries")]
    ImmediateBudgetExceeded { limit: u64 },

    // ── Snapshot / config errors ──────────────────────────

    /// A snapshot could not be restored. Restoration is all-or-nothing.
    #[error("malformed snapshot: {0}")]
    MalformedSnapshot(String),

    /// A simulator configuration failed validation.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// JSON encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, SimError>`.
pub type SimResult<T> = Result<T, SimError>;
