//! Scenario and property tests for `Simulator`.

use proptest::prelude::*;
use serde_json::{json, Value};

use crate::classify::MessageCategory;
use crate::config::SimulatorConfig;
use crate::error::SimError;
use crate::eventlog::EntryKind;
use crate::node::{BuiltinFactory, EchoNode, GossipNode, NetworkNode, NodeContext, SinkNode};
use crate::simulator::{RunOutcome, Simulator};
use crate::snapshot::Snapshot;
use crate::transport::{HeldTransport, LoopbackTransport, Transport, TransportPackage};

// ── Test nodes ────────────────────────────────────────────────────────

/// Answers "ping" with "pong"; ignores everything else.
#[derive(Debug, Default)]
struct PingPong {
    seen: Vec<String>,
}

impl NetworkNode for PingPong {
    fn process(&mut self, ctx: &mut NodeContext<'_>, from: &str, message: &str) -> anyhow::Result<()> {
        self.seen.push(format!("{}:{}", from, message));
        if message == "ping" {
            ctx.send(from, "pong");
        }
        Ok(())
    }

    fn to_snapshot(&self) -> Value {
        json!({ "seen": self.seen })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Rejects any message equal to "poison", after emitting a warning.
#[derive(Debug, Default)]
struct Picky;

impl NetworkNode for Picky {
    fn process(&mut self, ctx: &mut NodeContext<'_>, from: &str, message: &str) -> anyhow::Result<()> {
        if message == "poison" {
            ctx.send(from, "complaint");
            anyhow::bail!("refusing {:?}", message);
        }
        Ok(())
    }

    fn to_snapshot(&self) -> Value {
        Value::Null
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Message is a number `k`; on receipt with `k > 0`, sends `k - 1` to
/// every target. Always terminates.
#[derive(Debug, Clone)]
struct Countdown {
    targets: Vec<String>,
}

impl NetworkNode for Countdown {
    fn process(&mut self, ctx: &mut NodeContext<'_>, _from: &str, message: &str) -> anyhow::Result<()> {
        let k: u32 = message.parse()?;
        if k > 0 {
            for t in &self.targets {
                ctx.send(t.as_str(), (k - 1).to_string());
            }
        }
        Ok(())
    }

    fn to_snapshot(&self) -> Value {
        json!({ "targets": self.targets })
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// Refuses the first "unroutable" package it is given; loops back
/// everything else on the next poll.
#[derive(Debug, Default)]
struct RefuseOnce {
    refused: bool,
    returned: Vec<TransportPackage>,
}

impl Transport for RefuseOnce {
    fn send(&mut self, package: TransportPackage) -> anyhow::Result<()> {
        if package.message == "unroutable" && !self.refused {
            self.refused = true;
            anyhow::bail!("no route to {}", package.receiver);
        }
        self.returned.push(package);
        Ok(())
    }

    fn poll(&mut self) -> Vec<TransportPackage> {
        std::mem::take(&mut self.returned)
    }
}

fn ping_pong_pair() -> Simulator {
    let mut sim = Simulator::batched();
    sim.add_node("A", Box::new(PingPong::default())).unwrap();
    sim.add_node("B", Box::new(PingPong::default())).unwrap();
    sim
}

// ── Round scenarios ───────────────────────────────────────────────────

#[test]
fn test_ping_pong_rounds() {
    let mut sim = ping_pong_pair();
    sim.emit("A", "B", "ping").unwrap();
    assert_eq!(sim.get_batch(), vec!["[A]->[B] ping"]);

    assert_eq!(sim.flush().unwrap(), vec!["[A]->[B] ping"]);
    assert_eq!(sim.get_batch(), vec!["[B]->[A] pong"]);
    assert_eq!(sim.flush().unwrap(), vec!["[B]->[A] pong"]);
    assert!(sim.flush().unwrap().is_empty());

    assert_eq!(sim.local_log("A"), vec!["TO[B] ping", "FROM[B] pong"]);
    assert_eq!(sim.local_log("B"), vec!["FROM[A] ping", "TO[A] pong"]);
    assert_eq!(sim.rounds(), 3);
    assert_eq!(sim.node::<PingPong>("B").unwrap().seen, vec!["A:ping"]);
}

#[test]
fn test_flush_with_nothing_pending() {
    let mut sim = ping_pong_pair();
    assert!(sim.flush().unwrap().is_empty());
    assert!(sim.flush().unwrap().is_empty());
    // Markers are still recorded.
    assert_eq!(sim.log().rounds(), 2);
}

#[test]
fn test_unknown_recipient_dropped() {
    let mut sim = ping_pong_pair();
    sim.emit("A", "Z", "anyone?").unwrap();
    assert_eq!(sim.get_batch(), vec!["[A]->[Z] anyone?"]);

    assert!(sim.flush().unwrap().is_empty());
    assert_eq!(sim.local_log("A"), vec!["TO[Z] anyone?"]);
    assert!(sim.local_log("Z").is_empty());
    assert!(sim
        .log()
        .entries()
        .iter()
        .all(|e| e.kind != EntryKind::Received));
    assert!(sim.get_batch().is_empty());
}

#[test]
fn test_late_registration_does_not_revive_dropped_message() {
    let mut sim = ping_pong_pair();
    sim.emit("A", "Z", "early").unwrap();
    sim.flush().unwrap();
    sim.add_node("Z", Box::new(SinkNode::new())).unwrap();
    assert!(sim.flush().unwrap().is_empty());
    assert!(sim.node::<SinkNode>("Z").unwrap().received.is_empty());
}

#[test]
fn test_registration_before_flush_receives() {
    let mut sim = ping_pong_pair();
    sim.emit("A", "Z", "early").unwrap();
    sim.add_node("Z", Box::new(SinkNode::new())).unwrap();
    assert_eq!(sim.flush().unwrap(), vec!["[A]->[Z] early"]);
    assert_eq!(
        sim.node::<SinkNode>("Z").unwrap().received,
        vec![("A".to_string(), "early".to_string())]
    );
}

#[test]
fn test_probe_log_scenario() {
    let mut sim = Simulator::batched();
    sim.add_node("A", Box::new(SinkNode::new())).unwrap();
    sim.add_node("C", Box::new(SinkNode::new())).unwrap();
    sim.emit("A", "C", "probe M").unwrap();
    sim.emit("A", "C", "not a probe").unwrap();
    sim.flush().unwrap();

    let probes = sim.probe_log();
    assert_eq!(probes.len(), 1);
    assert_eq!(probes["probe M"], vec!["[A]->[C]", "[A]>-[C]"]);
}

#[test]
fn test_custom_classifier() {
    let mut sim = ping_pong_pair();
    sim.set_classifier(|m: &str| {
        if m == "ping" {
            MessageCategory::Probe
        } else {
            MessageCategory::Other
        }
    });
    sim.emit("A", "B", "ping").unwrap();
    sim.run().unwrap();
    assert_eq!(sim.probe_log()["ping"], vec!["[A]->[B]", "[A]>-[B]"]);
    assert!(!sim.probe_log().contains_key("pong"));
}

#[test]
fn test_gossip_flood_converges() {
    let mut sim = Simulator::batched();
    sim.add_node("A", Box::new(GossipNode::new(["B", "C"]))).unwrap();
    sim.add_node("B", Box::new(GossipNode::new(["A", "C"]))).unwrap();
    sim.add_node("C", Box::new(GossipNode::new(["A", "B", "D"]))).unwrap();
    sim.add_node("D", Box::new(GossipNode::new(["C"]))).unwrap();

    let started = sim
        .with_node("A", |node: &mut GossipNode, ctx| node.originate(ctx, "probe 1"))
        .unwrap();
    assert!(started);

    let outcome = sim.run().unwrap();
    assert!(outcome.is_converged());
    for name in ["A", "B", "C", "D"] {
        assert!(sim.node::<GossipNode>(name).unwrap().seen.contains("probe 1"));
    }
    let paths = &sim.probe_log()["probe 1"];
    assert_eq!(paths[0], "[A]->[B]");
    assert_eq!(paths[1], "[A]->[C]");
    assert!(paths.contains(&"[C]>-[D]".to_string()));
}

#[test]
fn test_echo_pair_exhausts_budget() {
    let mut sim = Simulator::with_config(SimulatorConfig::batched().with_max_rounds(5)).unwrap();
    sim.add_node("A", Box::new(EchoNode::new())).unwrap();
    sim.add_node("B", Box::new(EchoNode::new())).unwrap();
    sim.emit("A", "B", "hello").unwrap();

    let outcome = sim.run().unwrap();
    assert_eq!(
        outcome,
        RunOutcome::BudgetExhausted {
            rounds: 5,
            deliveries: 5
        }
    );
    assert!(outcome.to_string().contains("did not converge within 5 rounds"));
    assert_eq!(sim.get_batch().len(), 1);
}

#[test]
fn test_run_counts_final_empty_round() {
    let mut sim = ping_pong_pair();
    sim.emit("A", "B", "ping").unwrap();
    let outcome = sim.run_rounds(10).unwrap();
    assert_eq!(
        outcome,
        RunOutcome::Converged {
            rounds: 3,
            deliveries: 2
        }
    );
}

#[test]
fn test_run_rounds_zero_budget() {
    let mut sim = ping_pong_pair();
    sim.emit("A", "B", "ping").unwrap();
    let outcome = sim.run_rounds(0).unwrap();
    assert_eq!(outcome.rounds(), 0);
    assert!(!outcome.is_converged());
    assert_eq!(sim.get_batch().len(), 1);
}

// ── Driver errors ─────────────────────────────────────────────────────

#[test]
fn test_emit_from_unknown_node() {
    let mut sim = ping_pong_pair();
    let err = sim.emit("ghost", "A", "boo").unwrap_err();
    assert!(matches!(err, SimError::UnknownNode(n) if n == "ghost"));
    assert!(sim.log().is_empty());
}

#[test]
fn test_with_node_type_mismatch() {
    let mut sim = ping_pong_pair();
    let err = sim
        .with_node("A", |_node: &mut SinkNode, _ctx| ())
        .unwrap_err();
    assert!(matches!(err, SimError::NodeTypeMismatch { .. }));
    let err = sim
        .with_node("nobody", |_node: &mut SinkNode, _ctx| ())
        .unwrap_err();
    assert!(matches!(err, SimError::UnknownNode(_)));
}

#[test]
fn test_reserved_name_rejected() {
    let mut sim = Simulator::batched();
    assert!(matches!(
        sim.add_node("batch", Box::new(SinkNode::new())),
        Err(SimError::ReservedName(_))
    ));
}

#[test]
fn test_node_failure_propagates_and_requeues() {
    let mut sim = Simulator::batched();
    sim.add_node("A", Box::new(SinkNode::new())).unwrap();
    sim.add_node("P", Box::new(Picky)).unwrap();
    sim.emit("A", "P", "fine").unwrap();
    sim.emit("A", "P", "poison").unwrap();
    sim.emit("A", "P", "after").unwrap();

    let err = sim.flush().unwrap_err();
    match err {
        SimError::NodeFailed { node, from, source } => {
            assert_eq!(node, "P");
            assert_eq!(from, "A");
            assert!(source.to_string().contains("poison"));
        }
        other => panic!("unexpected error: {other}"),
    }

    // The rest of the round comes first, then what P emitted before failing.
    assert_eq!(
        sim.get_batch(),
        vec!["[A]->[P] after", "[P]->[A] complaint"]
    );
    assert_eq!(
        sim.flush().unwrap(),
        vec!["[A]->[P] after", "[P]->[A] complaint"]
    );
    assert_eq!(
        sim.node::<SinkNode>("A").unwrap().received,
        vec![("P".to_string(), "complaint".to_string())]
    );
}

#[test]
fn test_transport_refusal_requeues_package() {
    let mut sim = Simulator::with_transport(SimulatorConfig::batched(), RefuseOnce::default()).unwrap();
    sim.add_node("A", Box::new(SinkNode::new())).unwrap();
    sim.add_node("B", Box::new(SinkNode::new())).unwrap();
    sim.emit("A", "B", "ok").unwrap();
    sim.emit("A", "B", "unroutable").unwrap();
    sim.emit("A", "B", "later").unwrap();

    match sim.flush().unwrap_err() {
        SimError::Transport(source) => assert!(source.to_string().contains("no route to B")),
        other => panic!("unexpected error: {other}"),
    }

    // The refused package never left, so it is neither received nor lost.
    assert_eq!(
        sim.get_batch(),
        vec!["[A]->[B] unroutable", "[A]->[B] later"]
    );
    assert_eq!(sim.local_log("B"), vec!["FROM[A] ok"]);
    assert_eq!(sim.node::<SinkNode>("B").unwrap().received.len(), 1);

    assert_eq!(
        sim.flush().unwrap(),
        vec!["[A]->[B] unroutable", "[A]->[B] later"]
    );
    let received: Vec<&str> = sim
        .node::<SinkNode>("B")
        .unwrap()
        .received
        .iter()
        .map(|(_, m)| m.as_str())
        .collect();
    assert_eq!(received, vec!["ok", "unroutable", "later"]);
}

#[test]
fn test_pump_failure_keeps_remaining_packages() {
    let handle = HeldTransport::new();
    let mut sim = Simulator::with_transport(SimulatorConfig::batched(), handle.clone()).unwrap();
    sim.add_node("A", Box::new(SinkNode::new())).unwrap();
    sim.add_node("P", Box::new(Picky)).unwrap();
    sim.add_node("S", Box::new(SinkNode::new())).unwrap();
    sim.emit("A", "P", "poison").unwrap();
    sim.emit("A", "S", "after").unwrap();

    assert_eq!(sim.flush().unwrap(), vec!["[A]->[P] poison", "[A]->[S] after"]);
    assert_eq!(handle.release_all(), 2);

    let err = sim.pump_transport().unwrap_err();
    assert!(matches!(err, SimError::NodeFailed { ref node, .. } if node == "P"));
    assert_eq!(handle.held(), 0);
    assert!(sim.node::<SinkNode>("S").unwrap().received.is_empty());
    assert_eq!(sim.get_batch(), vec!["[P]->[A] complaint"]);

    // The package behind the failure is still owed to S.
    assert_eq!(sim.pump_transport().unwrap(), 1);
    assert_eq!(
        sim.node::<SinkNode>("S").unwrap().received,
        vec![("A".to_string(), "after".to_string())]
    );
    assert_eq!(sim.local_log("S"), vec!["FROM[A] after"]);
    assert_eq!(sim.pump_transport().unwrap(), 0);
}

// ── Immediate strategy ────────────────────────────────────────────────

#[test]
fn test_immediate_delivers_depth_first() {
    let mut sim = Simulator::immediate();
    sim.add_node("A", Box::new(PingPong::default())).unwrap();
    sim.add_node("B", Box::new(PingPong::default())).unwrap();
    sim.emit("A", "B", "ping").unwrap();

    assert!(sim.get_batch().is_empty());
    assert_eq!(
        sim.full_log(true),
        vec![
            "[A]->[B] ping",
            "[A]>-[B] ping",
            "[B]->[A] pong",
            "[B]>-[A] pong",
        ]
    );
    assert!(sim.flush().unwrap().is_empty());
}

#[test]
fn test_immediate_cascade_order() {
    let mut sim = Simulator::immediate();
    sim.add_node("A", Box::new(Countdown { targets: vec!["B".into(), "C".into()] }))
        .unwrap();
    sim.add_node("B", Box::new(Countdown { targets: vec!["C".into()] })).unwrap();
    sim.add_node("C", Box::new(SinkNode::new())).unwrap();
    sim.emit("C", "A", "2").unwrap();

    // A's message to B is followed by everything it causes before A's
    // message to C is sent.
    assert_eq!(
        sim.full_log(false),
        vec!["[C]->[A] 2", "[A]->[B] 1", "[B]->[C] 0", "[A]->[C] 1"]
    );
}

#[test]
fn test_immediate_failure_delivers_own_emissions() {
    let mut emitted = Simulator::immediate();
    let mut received = Simulator::immediate();
    for sim in [&mut emitted, &mut received] {
        sim.add_node("A", Box::new(SinkNode::new())).unwrap();
        sim.add_node("P", Box::new(Picky)).unwrap();
    }

    let err = emitted.emit("A", "P", "poison").unwrap_err();
    assert!(matches!(err, SimError::NodeFailed { ref node, .. } if node == "P"));
    assert_eq!(
        emitted.full_log(true),
        vec![
            "[A]->[P] poison",
            "[A]>-[P] poison",
            "[P]->[A] complaint",
            "[P]>-[A] complaint",
        ]
    );

    // Direct receipt follows the same policy.
    let err = received
        .receive(&TransportPackage::new("A", "P", "poison"))
        .unwrap_err();
    assert!(matches!(err, SimError::NodeFailed { .. }));
    for sim in [&emitted, &received] {
        assert_eq!(
            sim.node::<SinkNode>("A").unwrap().received,
            vec![("P".to_string(), "complaint".to_string())]
        );
    }
}

#[test]
fn test_immediate_budget() {
    let config = SimulatorConfig::immediate().with_max_immediate_deliveries(10);
    let mut sim = Simulator::with_config(config).unwrap();
    sim.add_node("A", Box::new(EchoNode::new())).unwrap();
    sim.add_node("B", Box::new(EchoNode::new())).unwrap();
    let err = sim.emit("A", "B", "loop").unwrap_err();
    assert!(matches!(err, SimError::ImmediateBudgetExceeded { limit: 10 }));
    assert_eq!(sim.node::<EchoNode>("A").unwrap().echoed, 5);
}

// ── External transport ────────────────────────────────────────────────

#[test]
fn test_loopback_matches_batched() {
    let mut batched = ping_pong_pair();
    let mut looped =
        Simulator::with_transport(SimulatorConfig::batched(), LoopbackTransport::new()).unwrap();
    looped.add_node("A", Box::new(PingPong::default())).unwrap();
    looped.add_node("B", Box::new(PingPong::default())).unwrap();
    looped.init(&["A-B".to_string()]).unwrap();

    for sim in [&mut batched, &mut looped] {
        sim.emit("A", "B", "ping").unwrap();
        sim.run().unwrap();
    }
    assert_eq!(batched.log().entries(), looped.log().entries());
    assert_eq!(batched.log().log_hash(), looped.log().log_hash());
}

#[test]
fn test_held_transport_defers_receive() {
    let handle = HeldTransport::new();
    let mut sim = Simulator::with_transport(SimulatorConfig::batched(), handle.clone()).unwrap();
    sim.add_node("A", Box::new(PingPong::default())).unwrap();
    sim.add_node("B", Box::new(PingPong::default())).unwrap();
    sim.emit("A", "B", "ping").unwrap();

    // The flush reports the hand-off, but B has not processed anything.
    assert_eq!(sim.flush().unwrap(), vec!["[A]->[B] ping"]);
    assert!(sim.node::<PingPong>("B").unwrap().seen.is_empty());
    assert_eq!(handle.held(), 1);
    assert_eq!(sim.pump_transport().unwrap(), 0);

    handle.release_all();
    assert_eq!(sim.pump_transport().unwrap(), 1);
    assert_eq!(sim.node::<PingPong>("B").unwrap().seen, vec!["A:ping"]);
    assert_eq!(sim.get_batch(), vec!["[B]->[A] pong"]);
}

#[test]
fn test_receive_unknown_is_noop() {
    let mut sim = ping_pong_pair();
    sim.receive(&TransportPackage::new("A", "Z", "void")).unwrap();
    assert!(sim.log().is_empty());
    assert!(sim.get_batch().is_empty());
}

// ── Snapshots ─────────────────────────────────────────────────────────

#[test]
fn test_snapshot_composition() {
    let mut sim = ping_pong_pair();
    sim.emit("A", "B", "ping").unwrap();
    let snap = sim.to_snapshot();

    assert_eq!(snap.nodes.keys().collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(snap.log, sim.log().entries());
    assert_eq!(snap.batch, vec![TransportPackage::new("A", "B", "ping")]);

    let value: Value = serde_json::from_str(&sim.to_snapshot_json().unwrap()).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    assert_eq!(keys, vec!["A", "B", "log", "batch"]);
    assert_eq!(value["batch"][0]["receiver"], "B");
}

#[test]
fn test_snapshot_restore_continues_identically() {
    let build = || {
        let mut sim = Simulator::batched();
        sim.add_node("A", Box::new(GossipNode::new(["B"]))).unwrap();
        sim.add_node("B", Box::new(GossipNode::new(["A", "C"]))).unwrap();
        sim.add_node("C", Box::new(SinkNode::new())).unwrap();
        sim.with_node("A", |n: &mut GossipNode, ctx| n.originate(ctx, "probe x"))
            .unwrap();
        sim
    };

    let mut original = build();
    original.flush().unwrap();
    let snapshot = Snapshot::from_json_str(&original.to_snapshot_json().unwrap()).unwrap();

    let mut restored =
        Simulator::from_snapshot(SimulatorConfig::batched(), snapshot, &BuiltinFactory).unwrap();
    assert_eq!(restored.rounds(), 1);
    assert_eq!(restored.get_batch(), original.get_batch());

    original.run().unwrap();
    restored.run().unwrap();
    assert_eq!(original.log().entries(), restored.log().entries());
    assert_eq!(
        original.to_snapshot().to_value().unwrap(),
        restored.to_snapshot().to_value().unwrap()
    );
}

#[test]
fn test_failed_restore_leaves_state_untouched() {
    let mut sim = ping_pong_pair();
    sim.emit("A", "B", "ping").unwrap();
    let before = sim.to_snapshot();

    let bad = Snapshot::from_value(json!({
        "X": { "kind": "echo", "echoed": 0 },
        "Y": { "kind": "teleporter" },
        "log": [],
        "batch": []
    }))
    .unwrap();
    let err = sim.restore_snapshot(bad, &BuiltinFactory).unwrap_err();
    assert!(matches!(err, SimError::MalformedSnapshot(m) if m.contains("\"Y\"")));
    assert_eq!(sim.to_snapshot(), before);
}

#[test]
fn test_restore_with_closure_factory() {
    let snap = Snapshot::from_value(json!({
        "A": { "seen": [] },
        "log": [],
        "batch": [{ "sender": "A", "receiver": "A", "message": "ping" }]
    }))
    .unwrap();
    let factory = |_name: &str, _state: &Value| -> anyhow::Result<Box<dyn NetworkNode>> {
        Ok(Box::new(PingPong::default()))
    };
    let mut sim = Simulator::batched();
    sim.restore_snapshot(snap, &factory).unwrap();
    assert_eq!(sim.flush().unwrap(), vec!["[A]->[A] ping"]);
    assert_eq!(sim.flush().unwrap(), vec!["[A]->[A] pong"]);
}

// ── Properties ────────────────────────────────────────────────────────

const NAMES: [&str; 5] = ["A", "B", "C", "D", "E"];

fn arb_network() -> impl Strategy<Value = (Vec<(usize, Vec<usize>)>, Vec<(usize, usize, u32)>)> {
    let nodes = prop::collection::vec((0..4usize, prop::collection::vec(0..5usize, 0..3)), 1..4);
    let seeds = prop::collection::vec((0..4usize, 0..5usize, 0..4u32), 0..6);
    (nodes, seeds)
}

fn build_network(
    nodes: &[(usize, Vec<usize>)],
    seeds: &[(usize, usize, u32)],
) -> (Simulator, usize) {
    let mut sim = Simulator::batched();
    for (idx, targets) in nodes {
        let targets = targets.iter().map(|t| NAMES[*t].to_string()).collect();
        sim.add_node(NAMES[*idx], Box::new(Countdown { targets })).unwrap();
    }
    let mut emitted = 0;
    for (from, to, k) in seeds {
        if sim.emit(NAMES[*from], NAMES[*to], &k.to_string()).is_ok() {
            emitted += 1;
        }
    }
    (sim, emitted)
}

proptest! {
    #[test]
    fn prop_rounds_are_isolated((nodes, seeds) in arb_network()) {
        let (mut sim, _) = build_network(&nodes, &seeds);
        for _ in 0..10 {
            let expected: Vec<String> = sim
                .pending_batch()
                .iter()
                .filter(|p| sim.registry().contains(&p.receiver))
                .map(TransportPackage::describe)
                .collect();
            let report = sim.flush().unwrap();
            prop_assert_eq!(report, expected);
        }
    }

    #[test]
    fn prop_draining_is_idempotent((nodes, seeds) in arb_network()) {
        let (mut sim, _) = build_network(&nodes, &seeds);
        let outcome = sim.run_rounds(50).unwrap();
        prop_assert!(outcome.is_converged());
        prop_assert!(sim.flush().unwrap().is_empty());
        prop_assert!(sim.flush().unwrap().is_empty());
    }

    #[test]
    fn prop_full_log_is_sent_subsequence((nodes, seeds) in arb_network()) {
        let (mut sim, _) = build_network(&nodes, &seeds);
        sim.run_rounds(50).unwrap();

        let sent = sim.full_log(false);
        let both = sim.full_log(true);
        let sent_entries = sim.log().entries().iter().filter(|e| e.kind == EntryKind::Sent).count();
        prop_assert_eq!(sent.len(), sent_entries);
        prop_assert_eq!(both.len(), sim.log().len());

        let mut it = both.iter();
        for line in &sent {
            prop_assert!(it.any(|l| l == line));
        }
    }

    #[test]
    fn prop_every_received_has_a_send((nodes, seeds) in arb_network()) {
        let (mut sim, emitted) = build_network(&nodes, &seeds);
        sim.run_rounds(50).unwrap();
        let entries = sim.log().entries();
        let sent = entries.iter().filter(|e| e.kind == EntryKind::Sent && !e.is_round_marker()).count();
        let received = entries.iter().filter(|e| e.kind == EntryKind::Received).count();
        prop_assert!(received <= sent);
        prop_assert!(sent >= emitted);
    }

    #[test]
    fn prop_local_log_matches_entries((nodes, seeds) in arb_network()) {
        let (mut sim, _) = build_network(&nodes, &seeds);
        sim.run_rounds(50).unwrap();
        for name in NAMES {
            let expected = sim.log().entries().iter().filter(|e| {
                (e.sender == name && e.kind == EntryKind::Sent)
                    || (e.receiver == name && e.kind == EntryKind::Received)
            }).count();
            let local = sim.local_log(name);
            prop_assert_eq!(local.len(), expected);
            for line in &local {
                prop_assert!(line.starts_with("TO[") || line.starts_with("FROM["));
            }
        }
    }

    #[test]
    fn prop_snapshot_keys_match_registry((nodes, seeds) in arb_network()) {
        let (mut sim, _) = build_network(&nodes, &seeds);
        sim.flush().unwrap();
        let snap = sim.to_snapshot();
        let names: Vec<&str> = sim.registry().names().collect();
        prop_assert_eq!(snap.nodes.keys().map(String::as_str).collect::<Vec<_>>(), names);
        prop_assert_eq!(&snap.log[..], sim.log().entries());
        prop_assert_eq!(&snap.batch[..], sim.pending_batch());
    }
}
