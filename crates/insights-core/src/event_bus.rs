//! Change notifications for the conversation store.
//!
//! The store publishes one [`StoreEvent`] per mutation or load step. Views
//! hold a [`FilteredSubscriber`], drain it between inputs and re-read the
//! store when anything relevant arrived.

use std::collections::HashSet;
use tokio::sync::broadcast;

/// Events a slow view can fall behind by before it starts losing them.
const CHANNEL_CAPACITY: usize = 256;

/// What happened to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// One filter field was set. `field` uses the camelCase filter name.
    FiltersChanged { field: String },
    FiltersReset,
    LoadStarted { ticket: u64 },
    RecordsLoaded { count: usize },
    LoadFailed { error: String },
    /// A load finished after a newer one had started and was dropped.
    LoadSuperseded { ticket: u64 },
}

/// Payload-free discriminant of [`StoreEvent`], used to pick subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreEventType {
    FiltersChanged,
    FiltersReset,
    LoadStarted,
    RecordsLoaded,
    LoadFailed,
    LoadSuperseded,
}

impl StoreEvent {
    pub fn event_type(&self) -> StoreEventType {
        match self {
            Self::FiltersChanged { .. } => StoreEventType::FiltersChanged,
            Self::FiltersReset => StoreEventType::FiltersReset,
            Self::LoadStarted { .. } => StoreEventType::LoadStarted,
            Self::RecordsLoaded { .. } => StoreEventType::RecordsLoaded,
            Self::LoadFailed { .. } => StoreEventType::LoadFailed,
            Self::LoadSuperseded { .. } => StoreEventType::LoadSuperseded,
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Returns how many subscribers received the event. Publishing with no
    /// subscriber is not an error.
    pub fn publish(&self, event: StoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the given kinds only.
    pub fn subscribe_filtered(
        &self,
        kinds: impl IntoIterator<Item = StoreEventType>,
    ) -> FilteredSubscriber {
        FilteredSubscriber {
            receiver: self.sender.subscribe(),
            kinds: kinds.into_iter().collect(),
        }
    }
}

pub struct FilteredSubscriber {
    receiver: broadcast::Receiver<StoreEvent>,
    kinds: HashSet<StoreEventType>,
}

impl FilteredSubscriber {
    /// Next queued event of a subscribed kind, skipping the rest. `None` once
    /// the queue is empty. Events lost to lag are skipped as well.
    pub fn try_recv(&mut self) -> Option<StoreEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.kinds.contains(&event.event_type()) => return Some(event),
                Ok(_) | Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}
