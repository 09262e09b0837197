//! Status events emitted while nodes execute.
//!
//! Every node type has a named channel (`<node-type>-execution`) with a
//! single `status` topic. Events are ephemeral: they drive live node
//! badges in an editor and are never persisted.

use serde::{Deserialize, Serialize};

use crate::utils;

/// The single topic name every node-type channel exposes.
pub const STATUS_TOPIC: &str = "status";

/// Per-node execution status as observers see it.
///
/// `Initial` is never published; it is the observer-side default before
/// any event for the node has arrived.
#[derive(
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    strum::AsRefStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Initial,
    Loading,
    Success,
    Error,
}

/// One event on a node type's `status` topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusMessage {
    /// Channel name, `<node-type>-execution`.
    pub channel: String,
    /// Topic name; always [`STATUS_TOPIC`].
    pub topic: String,
    pub node_id: String,
    pub status: NodeStatus,
    /// Millisecond timestamp assigned at publish time. Observers keep
    /// the most recently timestamped matching event.
    pub timestamp: i64,
}

impl StatusMessage {
    pub fn new(
        channel: impl Into<String>,
        node_id: impl Into<String>,
        status: NodeStatus,
    ) -> Self {
        Self {
            channel: channel.into(),
            topic: STATUS_TOPIC.to_string(),
            node_id: node_id.into(),
            status,
            timestamp: utils::time::time_millis(),
        }
    }
}

/// Transport side of event delivery.
///
/// The runner publishes through this trait; executors never touch it,
/// which keeps them pure and testable against a recording publisher.
pub trait StatusPublisher: Send + Sync {
    /// Fire-and-forget; delivery is not guaranteed.
    fn publish(&self, message: StatusMessage);
}

/// Publisher that remembers everything, for tests and dry runs.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: std::sync::Mutex<Vec<StatusMessage>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<StatusMessage> {
        self.messages.lock().unwrap().clone()
    }

    /// Statuses recorded for one node, in publish order.
    pub fn statuses_for(&self, node_id: &str) -> Vec<NodeStatus> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.node_id == node_id)
            .map(|m| m.status)
            .collect()
    }
}

impl StatusPublisher for RecordingPublisher {
    fn publish(&self, message: StatusMessage) {
        self.messages.lock().unwrap().push(message);
    }
}
