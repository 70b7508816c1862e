/// Fluent builder DSL for simulator setup.
///
/// Hides the boilerplate of choosing a strategy, registering nodes and
/// seeding the first round, while preserving full determinism: nodes are
/// registered and seed messages emitted in call order.

use crate::config::SimulatorConfig;
use crate::error::SimResult;
use crate::node::{EchoNode, GossipNode, NetworkNode, SinkNode};
use crate::simulator::Simulator;
use crate::transport::{DeliveryStrategy, Transport};

// ── SimulationBuilder ─────────────────────────────────────────────────

/// Fluent builder for a ready-to-flush [`Simulator`].
///
/// # Example
/// ```rust
/// use roundnet::dsl::SimulationBuilder;
///
/// let mut sim = SimulationBuilder::new()
///     .gossip("A", ["B", "C"])
///     .gossip("B", ["A", "C"])
///     .sink("C")
///     .emit("A", "B", "probe 1")
///     .build()
///     .unwrap();
///
/// assert_eq!(sim.flush().unwrap(), vec!["[A]->[B] probe 1"]);
/// ```
pub struct SimulationBuilder {
    config: SimulatorConfig,
    strategy: Option<DeliveryStrategy>,
    nodes: Vec<(String, Box<dyn NetworkNode>)>,
    emissions: Vec<(String, String, String)>,
    links: Vec<String>,
}

impl SimulationBuilder {
    /// Create a new builder (batched delivery, default budgets).
    pub fn new() -> Self {
        SimulationBuilder {
            config: SimulatorConfig::default(),
            strategy: None,
            nodes: Vec::new(),
            emissions: Vec::new(),
            links: Vec::new(),
        }
    }

    // ── Strategy ──────────────────────────────────────────────

    /// Use a full configuration. Its `mode` applies unless a transport is
    /// attached.
    pub fn config(mut self, config: SimulatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Deliver at emission time.
    pub fn immediate(mut self) -> Self {
        self.config.mode = crate::config::DeliveryMode::Immediate;
        self
    }

    /// Deliver on flush (the default).
    pub fn batched(mut self) -> Self {
        self.config.mode = crate::config::DeliveryMode::Batched;
        self
    }

    /// Deliver through an external transport, initialised with `links`.
    pub fn transport<T: Transport + 'static>(mut self, transport: T, links: &[&str]) -> Self {
        self.strategy = Some(DeliveryStrategy::external(transport));
        self.links = links.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Override the round budget used by `Simulator::run`.
    pub fn max_rounds(mut self, max_rounds: u64) -> Self {
        self.config.max_rounds = max_rounds;
        self
    }

    // ── Nodes ─────────────────────────────────────────────────

    /// Register a custom node.
    pub fn node(mut self, name: &str, node: Box<dyn NetworkNode>) -> Self {
        self.nodes.push((name.to_string(), node));
        self
    }

    /// Register a custom node using a factory function that receives its name.
    pub fn node_with<F, N>(mut self, name: &str, factory: F) -> Self
    where
        F: FnOnce(&str) -> N,
        N: NetworkNode + 'static,
    {
        self.nodes.push((name.to_string(), Box::new(factory(name))));
        self
    }

    /// Register an `EchoNode`.
    pub fn echo(self, name: &str) -> Self {
        self.node(name, Box::new(EchoNode::new()))
    }

    /// Register a `SinkNode`.
    pub fn sink(self, name: &str) -> Self {
        self.node(name, Box::new(SinkNode::new()))
    }

    /// Register a `GossipNode` with the given neighbours.
    pub fn gossip<I, S>(self, name: &str, neighbours: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.node(name, Box::new(GossipNode::new(neighbours)))
    }

    // ── Seed messages ─────────────────────────────────────────

    /// Emit a message from `from` once all nodes are registered.
    pub fn emit(mut self, from: &str, to: &str, message: &str) -> Self {
        self.emissions
            .push((from.to_string(), to.to_string(), message.to_string()));
        self
    }

    // ── Build ─────────────────────────────────────────────────

    /// Build the simulator: validate config, init the transport, register
    /// nodes, then emit seed messages.
    pub fn build(self) -> SimResult<Simulator> {
        let mut sim = match self.strategy {
            Some(strategy) => Simulator::with_strategy(self.config, strategy)?,
            None => Simulator::with_config(self.config)?,
        };
        sim.init(&self.links)?;

        for (name, node) in self.nodes {
            sim.add_node(name, node)?;
        }
        for (from, to, message) in &self.emissions {
            sim.emit(from, to, message)?;
        }
        Ok(sim)
    }
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
