//! OSC bundle: a timetagged container of messages and nested bundles.

use serde::{Deserialize, Serialize};

use super::message::Message;
use super::timetag::Timetag;

/// A timestamped group of messages and nested bundles sent as one unit.
///
/// Messages and nested bundles are kept in separate lists. On the wire all
/// messages are written before all nested bundles, so interleaving between
/// the two kinds is not preserved.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Bundle {
    pub timetag: Timetag,
    pub messages: Vec<Message>,
    pub bundles: Vec<Bundle>,
    /// Out-of-band label, encoded right after the timetag.
    pub name: String,
}

impl Bundle {
    pub fn new(timetag: impl Into<Timetag>) -> Self {
        Self {
            timetag: timetag.into(),
            ..Default::default()
        }
    }

    /// Set the bundle name, builder style.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn message(mut self, message: Message) -> Self {
        self.messages.push(message);
        self
    }

    pub fn bundle(mut self, bundle: Bundle) -> Self {
        self.bundles.push(bundle);
        self
    }

    pub fn push_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn push_bundle(&mut self, bundle: Bundle) {
        self.bundles.push(bundle);
    }

    /// Number of direct elements (messages plus nested bundles).
    pub fn len(&self) -> usize {
        self.messages.len() + self.bundles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.bundles.is_empty()
    }
}
