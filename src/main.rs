use roundnet::{RunOutcome, SimResult, SimulationBuilder, Simulator};
use tracing_subscriber::EnvFilter;

/// Six peers, each pair sharing a link, flooding one probe.
const LINKS: [(&str, &str); 6] = [
    ("alic", "bobb"),
    ("alic", "char"),
    ("bobb", "char"),
    ("alic", "dave"),
    ("alic", "edwa"),
    ("dave", "edwa"),
];

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,roundnet=info")),
        )
        .init();

    println!("═══════════════════════════════════════════════════════");
    println!("  roundnet — Deterministic Round-Based Network Simulator");
    println!("  Probe flood + replay verification demo");
    println!("═══════════════════════════════════════════════════════");
    println!();

    // ── Run 1: original simulation ────────────────────────────
    let first = match run_simulation("Run 1") {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("  Run 1 failed: {}", e);
            std::process::exit(1);
        }
    };

    // ── Run 2: identical replay ───────────────────────────────
    let second = match run_simulation("Run 2") {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("  Run 2 failed: {}", e);
            std::process::exit(1);
        }
    };

    // ── Verify ────────────────────────────────────────────────
    println!("  Verification:");
    println!("    Run 1 log hash: {:016x}", first);
    println!("    Run 2 log hash: {:016x}", second);
    if first == second {
        println!("    ✓ Logs are IDENTICAL — deterministic replay confirmed.");
    } else {
        println!("    ✗ MISMATCH — determinism violation detected!");
        std::process::exit(1);
    }
}

fn build() -> SimResult<Simulator> {
    let mut builder = SimulationBuilder::new().max_rounds(100);
    let mut names: Vec<&str> = Vec::new();
    for (a, b) in LINKS {
        for name in [a, b] {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    for name in &names {
        let neighbours: Vec<&str> = LINKS
            .iter()
            .filter_map(|(a, b)| match (*a == *name, *b == *name) {
                (true, _) => Some(*b),
                (_, true) => Some(*a),
                _ => None,
            })
            .collect();
        builder = builder.gossip(name, neighbours);
    }
    builder.build()
}

fn run_simulation(label: &str) -> SimResult<u64> {
    let mut sim = build()?;
    sim.with_node("char", |node: &mut roundnet::GossipNode, ctx| {
        node.originate(ctx, "probe from-char")
    })?;

    let outcome = sim.run()?;
    match outcome {
        RunOutcome::Converged { rounds, deliveries } => {
            println!("  {}: converged in {} rounds, {} deliveries", label, rounds, deliveries)
        }
        RunOutcome::BudgetExhausted { .. } => println!("  {}: {}", label, outcome),
    }

    for line in sim.local_log("alic") {
        println!("    alic {}", line);
    }
    for (probe, paths) in sim.probe_log() {
        println!("    {:?} travelled {} hops", probe, paths.len());
    }
    println!();

    Ok(sim.log().log_hash())
}
