//! Round-based dispatcher.
//!
//! The simulator owns the registry, the event log and the pending batch.
//! Nodes emit through a [`NodeContext`]; what happens next depends on the
//! [`DeliveryStrategy`]:
//!
//! - **Batched / External**: the emission is logged as sent and appended
//!   to the pending batch. `flush` swaps the batch for an empty one before
//!   delivering anything, so messages emitted during a flush always wait
//!   for the next one. This is what turns reentrant emission into
//!   breadth-first rounds.
//! - **Immediate**: the emission is delivered on the spot, depth-first,
//!   bounded by `max_immediate_deliveries`.
//!
//! The simulator never drives itself. A caller flushes until a round comes
//! back empty (convergence) or its round budget runs out; [`Simulator::run`]
//! is that loop.

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::{debug, info, trace, warn};

use crate::classify::{MessageClassifier, PrefixClassifier};
use crate::config::{DeliveryMode, SimulatorConfig};
use crate::error::{SimError, SimResult};
use crate::eventlog::EventLog;
use crate::node::{NetworkNode, NodeContext, OutboundMessage, Outbox, Registry};
use crate::snapshot::{NodeFactory, Snapshot};
use crate::transport::{DeliveryStrategy, Transport, TransportPackage};

// ── RunOutcome ────────────────────────────────────────────────────────

/// How a driver loop ended. Neither variant is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// A flush delivered nothing.
    Converged { rounds: u64, deliveries: u64 },
    /// Every round in the budget delivered something.
    BudgetExhausted { rounds: u64, deliveries: u64 },
}

impl RunOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, RunOutcome::Converged { .. })
    }

    /// Flush calls made, including the final empty one when converged.
    pub fn rounds(&self) -> u64 {
        match *self {
            RunOutcome::Converged { rounds, .. } | RunOutcome::BudgetExhausted { rounds, .. } => {
                rounds
            }
        }
    }

    /// Messages delivered across all rounds.
    pub fn deliveries(&self) -> u64 {
        match *self {
            RunOutcome::Converged { deliveries, .. }
            | RunOutcome::BudgetExhausted { deliveries, .. } => deliveries,
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunOutcome::Converged { rounds, deliveries } => write!(
                f,
                "converged after {} rounds ({} deliveries)",
                rounds, deliveries
            ),
            RunOutcome::BudgetExhausted { rounds, deliveries } => write!(
                f,
                "did not converge within {} rounds ({} deliveries)",
                rounds, deliveries
            ),
        }
    }
}

// ── Simulator ─────────────────────────────────────────────────────────

/// In-process network of named nodes with round-based delivery.
pub struct Simulator {
    registry: Registry,
    log: EventLog,
    /// Messages emitted since the last flush began.
    batch: Vec<TransportPackage>,
    /// Packages the transport has returned but no node has processed yet.
    inbound: VecDeque<TransportPackage>,
    strategy: DeliveryStrategy,
    config: SimulatorConfig,
    classifier: Box<dyn MessageClassifier>,
    rounds: u64,
}

impl Simulator {
    /// Batched simulator with the default configuration.
    pub fn batched() -> Self {
        Self::build(SimulatorConfig::batched(), DeliveryStrategy::Batched)
    }

    /// Immediate (unbatched) simulator with the default configuration.
    pub fn immediate() -> Self {
        Self::build(SimulatorConfig::immediate(), DeliveryStrategy::Immediate)
    }

    /// Simulator whose strategy follows `config.mode`.
    pub fn with_config(config: SimulatorConfig) -> SimResult<Self> {
        let strategy = match config.mode {
            DeliveryMode::Immediate => DeliveryStrategy::Immediate,
            DeliveryMode::Batched => DeliveryStrategy::Batched,
        };
        Self::with_strategy(config, strategy)
    }

    /// Batched simulator that delivers through an external transport.
    pub fn with_transport(
        config: SimulatorConfig,
        transport: impl Transport + 'static,
    ) -> SimResult<Self> {
        Self::with_strategy(config, DeliveryStrategy::external(transport))
    }

    /// Simulator with an explicit strategy. `config.mode` is ignored.
    pub fn with_strategy(config: SimulatorConfig, strategy: DeliveryStrategy) -> SimResult<Self> {
        config.validate()?;
        Ok(Self::build(config, strategy))
    }

    /// Rebuild a simulator from a snapshot.
    pub fn from_snapshot(
        config: SimulatorConfig,
        snapshot: Snapshot,
        factory: &dyn NodeFactory,
    ) -> SimResult<Self> {
        let mut sim = Self::with_config(config)?;
        sim.restore_snapshot(snapshot, factory)?;
        Ok(sim)
    }

    fn build(config: SimulatorConfig, strategy: DeliveryStrategy) -> Self {
        let classifier = Box::new(PrefixClassifier::new(config.probe_prefix.clone()));
        Simulator {
            registry: Registry::new(),
            log: EventLog::new(),
            batch: Vec::new(),
            inbound: VecDeque::new(),
            strategy,
            config,
            classifier,
            rounds: 0,
        }
    }

    /// Replace the probe classifier used by [`probe_log`](Self::probe_log).
    pub fn set_classifier(&mut self, classifier: impl MessageClassifier + 'static) {
        self.classifier = Box::new(classifier);
    }

    /// Hand the link list to the transport collaborator, if there is one.
    pub fn init(&mut self, links: &[String]) -> SimResult<()> {
        if let DeliveryStrategy::External(transport) = &mut self.strategy {
            debug!(links = links.len(), "initialising transport");
            transport.init(links).map_err(SimError::Transport)?;
        }
        Ok(())
    }

    // ── Registration and emission ─────────────────────────────────

    /// Register `node` under `name`. Re-registering a name replaces the
    /// previous node.
    pub fn add_node(&mut self, name: impl Into<String>, node: Box<dyn NetworkNode>) -> SimResult<()> {
        let name = name.into();
        if self.registry.register(name.clone(), node)?.is_some() {
            warn!(node = %name, "node re-registered, previous instance replaced");
        } else {
            debug!(node = %name, "node registered");
        }
        Ok(())
    }

    /// Emit a message on behalf of the registered node `from`, exactly as
    /// if the node had called `ctx.send` itself.
    pub fn emit(&mut self, from: &str, to: &str, message: &str) -> SimResult<()> {
        if !self.registry.contains(from) {
            return Err(SimError::UnknownNode(from.to_string()));
        }
        let emitted = vec![OutboundMessage {
            to: to.to_string(),
            message: message.to_string(),
        }];
        self.dispatch_emissions(from, emitted)
    }

    /// Run driver code against a typed node, e.g. to make it start a
    /// protocol. Anything it sends through `ctx` is dispatched afterwards.
    pub fn with_node<T, R, F>(&mut self, name: &str, f: F) -> SimResult<R>
    where
        T: NetworkNode + 'static,
        F: FnOnce(&mut T, &mut NodeContext<'_>) -> R,
    {
        if !self.registry.contains(name) {
            return Err(SimError::UnknownNode(name.to_string()));
        }
        let node = self
            .registry
            .node_mut::<T>(name)
            .ok_or_else(|| SimError::NodeTypeMismatch {
                node: name.to_string(),
                expected: std::any::type_name::<T>(),
            })?;
        let mut outbox = Outbox::new();
        let result = {
            let mut ctx = NodeContext::new(name, &mut outbox);
            f(node, &mut ctx)
        };
        self.dispatch_emissions(name, outbox.drain())?;
        Ok(result)
    }

    fn dispatch_emissions(&mut self, sender: &str, emitted: Vec<OutboundMessage>) -> SimResult<()> {
        if emitted.is_empty() {
            return Ok(());
        }
        if !self.strategy.is_batched() {
            return self.cascade(sender, emitted);
        }
        for OutboundMessage { to, message } in emitted {
            trace!(sender, receiver = %to, "queued for next round");
            self.log.record_sent(sender, &to, &message);
            self.batch.push(TransportPackage::new(sender, to, message));
        }
        Ok(())
    }

    /// Immediate mode: deliver depth-first, so everything caused by a
    /// message happens before the emitter's next message is sent.
    ///
    /// When a node fails, what it emitted is still delivered, the rest of
    /// the cascade is discarded and the first failure is returned.
    fn cascade(&mut self, sender: &str, emitted: Vec<OutboundMessage>) -> SimResult<()> {
        let mut stack: Vec<TransportPackage> = emitted
            .into_iter()
            .rev()
            .map(|m| TransportPackage::new(sender, m.to, m.message))
            .collect();
        let mut delivered = 0u64;
        let mut failure: Option<SimError> = None;

        while let Some(package) = stack.pop() {
            self.log
                .record_sent(&package.sender, &package.receiver, &package.message);
            if !self.registry.contains(&package.receiver) {
                trace!(sender = %package.sender, receiver = %package.receiver, "dropped, unknown recipient");
                continue;
            }
            if delivered >= self.config.max_immediate_deliveries {
                return Err(SimError::ImmediateBudgetExceeded {
                    limit: self.config.max_immediate_deliveries,
                });
            }
            delivered += 1;
            self.log
                .record_received(&package.sender, &package.receiver, &package.message);

            let Some((emitted, result)) = self.invoke(&package) else {
                continue;
            };
            if let Err(source) = result {
                warn!(node = %package.receiver, discarded = stack.len(), "cascade aborted");
                stack.clear();
                failure.get_or_insert_with(|| node_failed(&package, source));
            }
            stack.extend(
                emitted
                    .into_iter()
                    .rev()
                    .map(|m| TransportPackage::new(package.receiver.clone(), m.to, m.message)),
            );
        }
        failure.map_or(Ok(()), Err)
    }

    // ── Delivery ──────────────────────────────────────────────────

    /// Call the receiver's `process`, collecting whatever it emits.
    /// `None` when the receiver is not registered.
    fn invoke(
        &mut self,
        package: &TransportPackage,
    ) -> Option<(Vec<OutboundMessage>, anyhow::Result<()>)> {
        let node = self.registry.resolve_mut(&package.receiver)?;
        let mut outbox = Outbox::new();
        let result = {
            let mut ctx = NodeContext::new(&package.receiver, &mut outbox);
            node.process(&mut ctx, &package.sender, &package.message)
        };
        Some((outbox.drain(), result))
    }

    /// Hand `package` to its receiver in-process.
    ///
    /// A receiver that is not registered makes this a no-op. Messages the
    /// receiver emits are dispatched per the strategy, including when the
    /// receiver then fails; the failure itself is returned untouched.
    pub fn receive(&mut self, package: &TransportPackage) -> SimResult<()> {
        let Some((emitted, result)) = self.invoke(package) else {
            trace!(sender = %package.sender, receiver = %package.receiver, "dropped, unknown recipient");
            return Ok(());
        };
        trace!(sender = %package.sender, receiver = %package.receiver, "delivered");
        let dispatched = self.dispatch_emissions(&package.receiver, emitted);
        result.map_err(|source| node_failed(package, source))?;
        dispatched
    }

    /// Route one flushed package through the transport seam. The package
    /// is logged as received once it has left the simulator, so a package
    /// the transport refuses leaves no received entry.
    pub fn deliver(&mut self, package: &TransportPackage) -> SimResult<()> {
        match &mut self.strategy {
            DeliveryStrategy::External(transport) => {
                transport.send(package.clone()).map_err(SimError::Transport)?;
                self.log
                    .record_received(&package.sender, &package.receiver, &package.message);
                self.pump_transport().map(|_| ())
            }
            DeliveryStrategy::Immediate | DeliveryStrategy::Batched => {
                self.log
                    .record_received(&package.sender, &package.receiver, &package.message);
                self.receive(package)
            }
        }
    }

    /// Receive every package the external transport has handed back.
    /// Returns how many were processed; always `0` for in-process
    /// strategies.
    ///
    /// If a receiver fails, the packages behind it stay queued in the
    /// simulator and the next call delivers them first.
    pub fn pump_transport(&mut self) -> SimResult<usize> {
        let DeliveryStrategy::External(transport) = &mut self.strategy else {
            return Ok(0);
        };
        self.inbound.extend(transport.poll());
        let mut count = 0;
        while let Some(package) = self.inbound.pop_front() {
            count += 1;
            self.receive(&package)?;
        }
        Ok(count)
    }

    // ── Rounds ────────────────────────────────────────────────────

    /// Deliver the pending batch as one round.
    ///
    /// Returns one `[sender]->[receiver] message` line per delivered
    /// package, in batch order. Packages for unknown receivers are dropped
    /// without a trace in the log or the report. An empty report means
    /// the network is quiescent.
    ///
    /// If a node fails, the error is returned and the packages of this
    /// round not yet delivered go back to the front of the pending batch.
    /// A package the transport refused counts as not yet delivered.
    pub fn flush(&mut self) -> SimResult<Vec<String>> {
        self.rounds += 1;
        let round = self.rounds;
        self.log.record_round_marker();

        let taken = std::mem::take(&mut self.batch);
        let mut pending = taken.into_iter();
        let mut report = Vec::new();
        let mut dropped = 0usize;

        while let Some(package) = pending.next() {
            if !self.registry.contains(&package.receiver) {
                dropped += 1;
                trace!(round, sender = %package.sender, receiver = %package.receiver, "dropped, unknown recipient");
                continue;
            }
            if let Err(err) = self.deliver(&package) {
                let emitted = std::mem::take(&mut self.batch);
                if matches!(err, SimError::Transport(_)) {
                    self.batch.push(package);
                }
                self.batch.extend(pending);
                self.batch.extend(emitted);
                warn!(round, error = %err, requeued = self.batch.len(), "round aborted");
                return Err(err);
            }
            report.push(package.describe());
        }

        debug!(
            round,
            delivered = report.len(),
            dropped,
            pending = self.batch.len(),
            "round flushed"
        );
        Ok(report)
    }

    /// Preview of the pending batch, rendered like flush reports.
    pub fn get_batch(&self) -> Vec<String> {
        self.batch.iter().map(TransportPackage::describe).collect()
    }

    pub fn pending_batch(&self) -> &[TransportPackage] {
        &self.batch
    }

    /// Flush until quiescent or until the configured round budget is spent.
    pub fn run(&mut self) -> SimResult<RunOutcome> {
        self.run_rounds(self.config.max_rounds)
    }

    /// Flush until quiescent or until `max_rounds` flushes have been made.
    pub fn run_rounds(&mut self, max_rounds: u64) -> SimResult<RunOutcome> {
        let mut deliveries = 0u64;
        for round in 1..=max_rounds {
            let report = self.flush()?;
            if report.is_empty() {
                let outcome = RunOutcome::Converged {
                    rounds: round,
                    deliveries,
                };
                info!(rounds = round, deliveries, "simulation converged");
                return Ok(outcome);
            }
            deliveries += report.len() as u64;
        }
        warn!(max_rounds, deliveries, "simulation did not converge");
        Ok(RunOutcome::BudgetExhausted {
            rounds: max_rounds,
            deliveries,
        })
    }

    // ── Log queries ───────────────────────────────────────────────

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    /// See [`EventLog::local_log`].
    pub fn local_log(&self, name: &str) -> Vec<String> {
        self.log.local_log(name)
    }

    /// See [`EventLog::full_log`].
    pub fn full_log(&self, include_both_directions: bool) -> Vec<String> {
        self.log.full_log(include_both_directions)
    }

    /// Probe paths grouped by message, using the configured classifier.
    pub fn probe_log(&self) -> IndexMap<String, Vec<String>> {
        self.log.probe_log(self.classifier.as_ref())
    }

    pub fn sequence_diagram(&self) -> String {
        self.log.render_sequence_diagram()
    }

    // ── Snapshots ─────────────────────────────────────────────────

    /// Export nodes, log and pending batch.
    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            nodes: self.registry.to_snapshot(),
            log: self.log.entries().to_vec(),
            batch: self.batch.clone(),
        }
    }

    pub fn to_snapshot_json(&self) -> SimResult<String> {
        self.to_snapshot().to_json_pretty()
    }

    /// Replace nodes, log and batch with the snapshot's contents.
    ///
    /// Every node is rebuilt before anything is replaced, so on error the
    /// simulator is left exactly as it was.
    pub fn restore_snapshot(&mut self, snapshot: Snapshot, factory: &dyn NodeFactory) -> SimResult<()> {
        let mut registry = Registry::new();
        for (name, node) in snapshot.restore_nodes(factory)? {
            registry.register(name, node).map_err(|e| SimError::MalformedSnapshot(e.to_string()))?;
        }
        self.registry = registry;
        self.log = EventLog::from_entries(snapshot.log);
        self.batch = snapshot.batch;
        self.inbound.clear();
        self.rounds = self.log.rounds() as u64;
        debug!(
            nodes = self.registry.len(),
            entries = self.log.len(),
            pending = self.batch.len(),
            "snapshot restored"
        );
        Ok(())
    }

    // ── Inspection ────────────────────────────────────────────────

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Downcast a node for inspection.
    pub fn node<T: NetworkNode + 'static>(&self, name: &str) -> Option<&T> {
        self.registry.node::<T>(name)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn strategy(&self) -> &DeliveryStrategy {
        &self.strategy
    }

    /// Flush calls made so far (restored snapshots count their markers).
    pub fn rounds(&self) -> u64 {
        self.rounds
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::batched()
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("strategy", &self.strategy)
            .field("registry", &self.registry)
            .field("log_len", &self.log.len())
            .field("batch_len", &self.batch.len())
            .field("inbound_len", &self.inbound.len())
            .field("rounds", &self.rounds)
            .finish()
    }
}

fn node_failed(package: &TransportPackage, source: anyhow::Error) -> SimError {
    SimError::NodeFailed {
        node: package.receiver.clone(),
        from: package.sender.clone(),
        source,
    }
}

#[cfg(test)]
mod tests;
