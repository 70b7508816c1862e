/// Append-only delivery log.
///
/// Records every `sent` and `received` transition in the order it
/// happened, plus one round marker per flush. All queries are pure
/// transformations over that ordered sequence, so the log is the single
/// source of truth for "what happened when".

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::classify::{MessageCategory, MessageClassifier};

/// Sender, receiver and message text of a round-boundary marker.
pub const ROUND_MARKER: &str = "---";

// ── Hash utility ──────────────────────────────────────────────────────

/// Combine two u64 hashes deterministically.
pub fn hash_combine(a: u64, b: u64) -> u64 {
    let mut h = a;
    h = h.wrapping_mul(0x517cc1b727220a95);
    h = h.wrapping_add(b);
    h ^= h >> 32;
    h
}

/// Hash a byte slice deterministically (FNV-1a variant).
pub fn hash_bytes(data: &[u8]) -> u64 {
    let mut h: u64 = 0xcbf29ce484222325;
    for &b in data {
        h ^= b as u64;
        h = h.wrapping_mul(0x100000001b3);
    }
    h
}

// ── Entry ─────────────────────────────────────────────────────────────

/// Which side of a delivery an [`Entry`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Sent,
    Received,
}

/// One immutable delivery event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub sender: String,
    pub receiver: String,
    pub message: String,
    #[serde(alias = "event")]
    pub kind: EntryKind,
}

impl Entry {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        message: impl Into<String>,
        kind: EntryKind,
    ) -> Self {
        Entry {
            sender: sender.into(),
            receiver: receiver.into(),
            message: message.into(),
            kind,
        }
    }

    /// The marker appended at the start of every flush.
    pub fn round_marker() -> Self {
        Entry::new(ROUND_MARKER, ROUND_MARKER, ROUND_MARKER, EntryKind::Sent)
    }

    pub fn is_round_marker(&self) -> bool {
        self.sender == ROUND_MARKER && self.receiver == ROUND_MARKER && self.message == ROUND_MARKER
    }

    /// `[sender]->[receiver]` for sent entries, `[sender]>-[receiver]` for
    /// received ones.
    pub fn describe_path(&self) -> String {
        match self.kind {
            EntryKind::Sent => format!("[{}]->[{}]", self.sender, self.receiver),
            EntryKind::Received => format!("[{}]>-[{}]", self.sender, self.receiver),
        }
    }

    fn hash(&self) -> u64 {
        let mut h = match self.kind {
            EntryKind::Sent => 1,
            EntryKind::Received => 2,
        };
        h = hash_combine(h, hash_bytes(self.sender.as_bytes()));
        h = hash_combine(h, hash_bytes(self.receiver.as_bytes()));
        hash_combine(h, hash_bytes(self.message.as_bytes()))
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.describe_path(), self.message)
    }
}

// ── Event Log ─────────────────────────────────────────────────────────

/// Append-only log of delivery events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    entries: Vec<Entry>,
}

impl EventLog {
    /// Create an empty event log.
    pub fn new() -> Self {
        EventLog {
            entries: Vec::new(),
        }
    }

    /// Rebuild a log from previously exported entries.
    pub fn from_entries(entries: Vec<Entry>) -> Self {
        EventLog { entries }
    }

    pub fn record_sent(&mut self, sender: &str, receiver: &str, message: &str) {
        self.entries
            .push(Entry::new(sender, receiver, message, EntryKind::Sent));
    }

    pub fn record_received(&mut self, sender: &str, receiver: &str, message: &str) {
        self.entries
            .push(Entry::new(sender, receiver, message, EntryKind::Received));
    }

    /// Append a round-boundary marker.
    pub fn record_round_marker(&mut self) {
        self.entries.push(Entry::round_marker());
    }

    /// Access the recorded entries.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of recorded entries (markers included).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of round markers, i.e. flush calls observed by this log.
    pub fn rounds(&self) -> usize {
        self.entries.iter().filter(|e| e.is_round_marker()).count()
    }

    // ── Queries ───────────────────────────────────────────────────

    /// What `name` itself observed: `TO[receiver] message` for its own
    /// sends, `FROM[sender] message` for what it received.
    pub fn local_log(&self, name: &str) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| {
                if entry.sender == name && entry.kind == EntryKind::Sent {
                    Some(format!("TO[{}] {}", entry.receiver, entry.message))
                } else if entry.receiver == name && entry.kind == EntryKind::Received {
                    Some(format!("FROM[{}] {}", entry.sender, entry.message))
                } else {
                    None
                }
            })
            .collect()
    }

    /// One line per entry. Without `include_both_directions` only sent
    /// entries are kept, so every logical message appears once.
    pub fn full_log(&self, include_both_directions: bool) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| include_both_directions || entry.kind == EntryKind::Sent)
            .map(|entry| entry.to_string())
            .collect()
    }

    /// Path descriptions of every probe message, grouped by exact message
    /// text. Groups appear in the order their message was first logged.
    pub fn probe_log(&self, classifier: &dyn MessageClassifier) -> IndexMap<String, Vec<String>> {
        let mut probes: IndexMap<String, Vec<String>> = IndexMap::new();
        for entry in self.entries.iter().filter(|e| !e.is_round_marker()) {
            if classifier.classify(&entry.message) != MessageCategory::Probe {
                continue;
            }
            probes
                .entry(entry.message.clone())
                .or_default()
                .push(entry.describe_path());
        }
        probes
    }

    /// PlantUML sequence diagram of the whole log. Each sent entry becomes
    /// an arrow; round markers become numbered separators.
    pub fn render_sequence_diagram(&self) -> String {
        let mut participants: IndexMap<&str, usize> = IndexMap::new();
        for entry in self.entries.iter().filter(|e| !e.is_round_marker()) {
            for name in [entry.sender.as_str(), entry.receiver.as_str()] {
                let next = participants.len();
                participants.entry(name).or_insert(next);
            }
        }

        let mut out = String::from("@startuml\n");
        for (name, idx) in &participants {
            out.push_str(&format!("participant \"{}\" as P{}\n", quote(name), idx));
        }

        let mut round = 0usize;
        for entry in &self.entries {
            if entry.is_round_marker() {
                round += 1;
                out.push_str(&format!("== Round {} ==\n", round));
                continue;
            }
            if entry.kind != EntryKind::Sent {
                continue;
            }
            // Both names were collected above.
            let (Some(from), Some(to)) = (
                participants.get(entry.sender.as_str()),
                participants.get(entry.receiver.as_str()),
            ) else {
                continue;
            };
            out.push_str(&format!("P{} -> P{} : {}\n", from, to, quote(&entry.message)));
        }
        out.push_str("@enduml\n");
        out
    }

    /// Compute a deterministic hash of the entire log.
    pub fn log_hash(&self) -> u64 {
        self.entries
            .iter()
            .fold(0u64, |h, entry| hash_combine(h, entry.hash()))
    }
}

fn quote(s: &str) -> String {
    s.replace('"', "'").replace('\n', "\\n")
}

// ── Verification ──────────────────────────────────────────────────────

/// Compare two logs for identical entries in identical order.
pub fn logs_match(a: &EventLog, b: &EventLog) -> bool {
    a.entries == b.entries
}
