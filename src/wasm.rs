#![cfg(feature = "wasm")]

use wasm_bindgen::prelude::*;

use crate::dsl::SimulationBuilder;
use crate::simulator::Simulator as Inner;

fn to_js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Counts cross the boundary as `u32`, saturating.
fn js_count(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// WASM binding for the round-based simulator.
///
/// Exposes a predefined gossip scenario to JavaScript so a page can step
/// through rounds and render the log.
#[wasm_bindgen]
pub struct Simulator {
    inner: Inner,
}

#[wasm_bindgen]
impl Simulator {
    /// Create the demo scenario: a small mesh flooding one probe.
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<Simulator, JsValue> {
        console_error_panic_hook::set_once();

        let mut inner = SimulationBuilder::new()
            .gossip("alic", ["bobb", "char", "dave"])
            .gossip("bobb", ["alic", "char"])
            .gossip("char", ["alic", "bobb"])
            .gossip("dave", ["alic", "edwa"])
            .gossip("edwa", ["dave"])
            .max_rounds(1_000)
            .build()
            .map_err(to_js_error)?;
        inner
            .with_node("bobb", |node: &mut crate::node::GossipNode, ctx| {
                node.originate(ctx, "probe hello")
            })
            .map_err(to_js_error)?;

        Ok(Simulator { inner })
    }

    /// Deliver one round. Returns the flush report as a JSON array.
    pub fn flush(&mut self) -> Result<String, JsValue> {
        let report = self.inner.flush().map_err(to_js_error)?;
        serde_json::to_string(&report).map_err(to_js_error)
    }

    /// Pending messages as a JSON array.
    pub fn batch_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.get_batch()).map_err(to_js_error)
    }

    /// Run until quiescent. Returns the number of rounds flushed.
    pub fn run(&mut self) -> Result<u32, JsValue> {
        let outcome = self.inner.run().map_err(to_js_error)?;
        Ok(js_count(outcome.rounds()))
    }

    /// The full log (both directions) as a JSON array of lines.
    pub fn full_log_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.full_log(true)).map_err(to_js_error)
    }

    /// PlantUML rendering of the log.
    pub fn sequence_diagram(&self) -> String {
        self.inner.sequence_diagram()
    }

    /// Nodes, log and batch as pretty JSON.
    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        self.inner.to_snapshot_json().map_err(to_js_error)
    }

    /// Rounds flushed so far.
    pub fn rounds(&self) -> u32 {
        js_count(self.inner.rounds())
    }
}
