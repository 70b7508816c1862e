//! Message classification for probe-path auditing.
//!
//! The event log does not understand message contents. It asks a
//! [`MessageClassifier`] which messages are *probes* and groups only those.

/// Category assigned to a message by a classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCategory {
    /// Diagnostic message whose propagation path is worth auditing.
    Probe,
    /// Anything else. Ignored by probe-log extraction.
    Other,
}

/// Pure function from message text to category.
pub trait MessageClassifier {
    fn classify(&self, message: &str) -> MessageCategory;
}

/// A classifier backed by a closure, handy in tests.
impl<F> MessageClassifier for F
where
    F: Fn(&str) -> MessageCategory,
{
    fn classify(&self, message: &str) -> MessageCategory {
        (self)(message)
    }
}

/// Classifies a message as a probe when its first whitespace-separated
/// word equals the configured prefix (`"probe abc"` with prefix `"probe"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixClassifier {
    prefix: String,
}

impl PrefixClassifier {
    pub fn new(prefix: impl Into<String>) -> Self {
        PrefixClassifier {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for PrefixClassifier {
    fn default() -> Self {
        PrefixClassifier::new("probe")
    }
}

impl MessageClassifier for PrefixClassifier {
    fn classify(&self, message: &str) -> MessageCategory {
        match message.split_whitespace().next() {
            Some(word) if word == self.prefix => MessageCategory::Probe,
            _ => MessageCategory::Other,
        }
    }
}
