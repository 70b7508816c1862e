//! # roundnet: Deterministic Round-Based Network Simulator
//!
//! Runs many independent protocol instances ("nodes") in one process and
//! controls exactly when, and in which round, each message they emit
//! reaches its recipient. No async, no threads, no wall-clock time: a
//! delivery that makes a node emit again is captured for the *next* round,
//! so reentrant protocols progress breadth-first and every run of the same
//! scenario produces the same log.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────┐
//! │         Simulator           │ ← add_node / emit / flush / run
//! │  ┌───────────────────────┐ │
//! │  │ Registry              │ │ ← name → NetworkNode
//! │  └───────────────────────┘ │
//! │  ┌───────────────────────┐ │
//! │  │ Pending batch         │ │ ← emitted, not yet delivered
//! │  └───────────────────────┘ │
//! │  ┌───────────────────────┐ │
//! │  │ DeliveryStrategy      │ │ ← immediate / batched / external
//! │  └───────────────────────┘ │
//! │  ┌───────────────────────┐ │
//! │  │ EventLog              │ │ ← sent / received / round markers
//! │  └───────────────────────┘ │
//! └────────────────────────────┘
//! ```
//!
//! ```rust
//! use roundnet::{SimulationBuilder, SinkNode};
//!
//! let mut sim = SimulationBuilder::new()
//!     .echo("B")
//!     .sink("A")
//!     .emit("A", "B", "ping")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(sim.flush().unwrap(), vec!["[A]->[B] ping"]);
//! assert_eq!(sim.flush().unwrap(), vec!["[B]->[A] ping"]);
//! assert!(sim.flush().unwrap().is_empty());
//! assert_eq!(sim.node::<SinkNode>("A").unwrap().received.len(), 1);
//! ```

pub mod classify;
pub mod config;
pub mod dsl;
pub mod error;
pub mod eventlog;
pub mod node;
pub mod simulator;
pub mod snapshot;
pub mod transport;
pub mod wasm;

// Re-exports for convenience.
pub use classify::{MessageCategory, MessageClassifier, PrefixClassifier};
pub use config::{DeliveryMode, SimulatorConfig};
pub use dsl::SimulationBuilder;
pub use error::{SimError, SimResult};
pub use eventlog::{Entry, EntryKind, EventLog};
pub use node::{
    BuiltinFactory, EchoNode, GossipNode, NetworkNode, NodeContext, Registry, SinkNode,
};
pub use simulator::{RunOutcome, Simulator};
pub use snapshot::{NodeFactory, Snapshot};
pub use transport::{
    DeliveryStrategy, HeldTransport, LoopbackTransport, Transport, TransportPackage,
};
