//! Topic-keyed publish/subscribe registry for snapshot change notifications.
//!
//! Subscribers register an unbounded channel under a [`Topic`]; publishing
//! delivers the event to every channel registered under that topic at the
//! time of the call. Delivery never blocks the publisher and never drops an
//! event for a live subscriber: a subscriber that does not drain its channel
//! only grows its own queue. Channels whose receiver was dropped are pruned
//! on the next publish to their topic.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::mpsc;
use tracing::debug;

use crate::types::{Regulations, WorkspaceConfig};

/// Category of change notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Full workspace configuration.
    BackendConfig,
    /// Workspace configuration restricted to processor-enabled destinations.
    ProcessConfig,
    /// Workspace and source regulations.
    Regulations,
}

impl Topic {
    /// Every topic the broker serves.
    pub const ALL: [Topic; 3] = [Topic::BackendConfig, Topic::ProcessConfig, Topic::Regulations];

    /// Label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BackendConfig => "backendConfig",
            Self::ProcessConfig => "processConfig",
            Self::Regulations => "regulations",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload carried by a [`DataEvent`].
#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    WorkspaceConfig(Arc<WorkspaceConfig>),
    Regulations(Arc<Regulations>),
}

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct DataEvent {
    pub topic: Topic,
    pub data: EventData,
}

impl DataEvent {
    pub fn new(topic: Topic, data: EventData) -> Self {
        Self { topic, data }
    }

    /// Returns the workspace configuration carried by the event, if any.
    pub fn workspace_config(&self) -> Option<&WorkspaceConfig> {
        match &self.data {
            EventData::WorkspaceConfig(config) => Some(config),
            EventData::Regulations(_) => None,
        }
    }

    /// Returns the regulations carried by the event, if any.
    pub fn regulations(&self) -> Option<&Regulations> {
        match &self.data {
            EventData::Regulations(regulations) => Some(regulations),
            EventData::WorkspaceConfig(_) => None,
        }
    }
}

/// Sending half of a subscriber channel.
pub type EventSender = mpsc::UnboundedSender<DataEvent>;
/// Receiving half of a subscriber channel.
pub type EventReceiver = mpsc::UnboundedReceiver<DataEvent>;

/// Registry of subscriber channels grouped by topic.
#[derive(Debug, Default)]
pub struct EventBroker {
    subscribers: RwLock<HashMap<Topic, Vec<EventSender>>>,
}

impl EventBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sender` under `topic`.
    pub fn register(&self, topic: Topic, sender: EventSender) {
        let mut guard = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.entry(topic).or_default().push(sender);
    }

    /// Delivers `data` to every channel currently registered under `topic`.
    ///
    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, topic: Topic, data: EventData) -> usize {
        let event = DataEvent::new(topic, data);
        let (delivered, closed) = {
            let guard = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            let Some(senders) = guard.get(&topic) else {
                return 0;
            };
            let mut delivered = 0;
            let mut closed = 0;
            for sender in senders {
                if sender.send(event.clone()).is_ok() {
                    delivered += 1;
                } else {
                    closed += 1;
                }
            }
            (delivered, closed)
        };

        if closed > 0 {
            self.prune(topic);
        }
        debug!(
            topic = %topic,
            delivered,
            "backend-config: published update"
        );
        delivered
    }

    /// Delivers a single event to one channel without touching the registry.
    ///
    /// Returns `false` when the receiver has already been dropped.
    pub fn publish_to(&self, sender: &EventSender, topic: Topic, data: EventData) -> bool {
        sender.send(DataEvent::new(topic, data)).is_ok()
    }

    /// Number of live channels registered under `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        let guard = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard
            .get(&topic)
            .map(|senders| senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    fn prune(&self, topic: Topic) {
        let mut guard = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(senders) = guard.get_mut(&topic) {
            let before = senders.len();
            senders.retain(|sender| !sender.is_closed());
            debug!(
                topic = %topic,
                removed = before - senders.len(),
                "backend-config: pruned closed subscribers"
            );
        }
    }
}
