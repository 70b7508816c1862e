//! Transport seam: how a flushed package reaches `receive`.
//!
//! In-process strategies call `receive` directly. The external strategy
//! hands each package to a [`Transport`] and picks it back up when the
//! transport returns it, which may happen outside the flush that sent it.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One in-flight message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransportPackage {
    pub sender: String,
    pub receiver: String,
    pub message: String,
}

impl TransportPackage {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        TransportPackage {
            sender: sender.into(),
            receiver: receiver.into(),
            message: message.into(),
        }
    }

    /// `[sender]->[receiver] message`, the flush-report rendering.
    pub fn describe(&self) -> String {
        format!("[{}]->[{}] {}", self.sender, self.receiver, self.message)
    }
}

impl std::fmt::Display for TransportPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

// ── Transport ─────────────────────────────────────────────────────────

/// External messaging collaborator.
///
/// The simulator never manages the collaborator's lifecycle beyond
/// `init`; it only sends packages and polls for the ones coming back.
pub trait Transport {
    /// Prepare the collaborator for the given links. Defaults to a no-op.
    fn init(&mut self, _links: &[String]) -> anyhow::Result<()> {
        Ok(())
    }

    /// Accept a package for eventual delivery.
    fn send(&mut self, package: TransportPackage) -> anyhow::Result<()>;

    /// Packages that have come back and should now be received, in order.
    fn poll(&mut self) -> Vec<TransportPackage>;
}

/// Hands every package straight back on the next poll.
///
/// In-process stand-in for an external sync service: the round trip goes
/// through the seam but timing is identical to direct delivery.
#[derive(Debug, Clone, Default)]
pub struct LoopbackTransport {
    links: Vec<String>,
    returned: VecDeque<TransportPackage>,
    sent: u64,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        LoopbackTransport::default()
    }

    /// Links passed to the last `init`.
    pub fn links(&self) -> &[String] {
        &self.links
    }

    /// Total packages accepted.
    pub fn sent(&self) -> u64 {
        self.sent
    }
}

impl Transport for LoopbackTransport {
    fn init(&mut self, links: &[String]) -> anyhow::Result<()> {
        self.links = links.to_vec();
        Ok(())
    }

    fn send(&mut self, package: TransportPackage) -> anyhow::Result<()> {
        self.sent += 1;
        self.returned.push_back(package);
        Ok(())
    }

    fn poll(&mut self) -> Vec<TransportPackage> {
        self.returned.drain(..).collect()
    }
}

/// Holds packages until the driver releases them.
///
/// Models a collaborator that answers asynchronously: packages sent during
/// a flush are received only when a later `pump_transport` finds them
/// released. Clones share the same queues, so a test can keep one handle
/// while the simulator owns another.
#[derive(Debug, Clone, Default)]
pub struct HeldTransport {
    inner: std::rc::Rc<std::cell::RefCell<HeldQueues>>,
}

#[derive(Debug, Default)]
struct HeldQueues {
    held: VecDeque<TransportPackage>,
    released: VecDeque<TransportPackage>,
}

impl HeldTransport {
    pub fn new() -> Self {
        HeldTransport::default()
    }

    /// Number of packages waiting to be released.
    pub fn held(&self) -> usize {
        self.inner.borrow().held.len()
    }

    /// Release up to `n` held packages, oldest first. Returns how many.
    pub fn release(&self, n: usize) -> usize {
        let mut queues = self.inner.borrow_mut();
        let n = n.min(queues.held.len());
        for _ in 0..n {
            if let Some(package) = queues.held.pop_front() {
                queues.released.push_back(package);
            }
        }
        n
    }

    /// Release everything currently held.
    pub fn release_all(&self) -> usize {
        let held = self.held();
        self.release(held)
    }
}

impl Transport for HeldTransport {
    fn send(&mut self, package: TransportPackage) -> anyhow::Result<()> {
        self.inner.borrow_mut().held.push_back(package);
        Ok(())
    }

    fn poll(&mut self) -> Vec<TransportPackage> {
        self.inner.borrow_mut().released.drain(..).collect()
    }
}

// ── Delivery strategy ─────────────────────────────────────────────────

/// The closed set of ways a simulator moves messages, fixed at
/// construction.
pub enum DeliveryStrategy {
    /// Deliver at emission time, depth-first, without batching.
    Immediate,
    /// Buffer emissions; deliver in-process on `flush`.
    Batched,
    /// Buffer emissions; on `flush` hand packages to an external transport.
    External(Box<dyn Transport>),
}

impl DeliveryStrategy {
    pub fn external(transport: impl Transport + 'static) -> Self {
        DeliveryStrategy::External(Box::new(transport))
    }

    /// Whether emissions wait in the pending batch.
    pub fn is_batched(&self) -> bool {
        !matches!(self, DeliveryStrategy::Immediate)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeliveryStrategy::Immediate => "immediate",
            DeliveryStrategy::Batched => "batched",
            DeliveryStrategy::External(_) => "external",
        }
    }
}

impl std::fmt::Debug for DeliveryStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
