use std::sync::mpsc::{self, Receiver, Sender};

use crate::core::tree::MutationRecord;

/// The host notifications the plugin can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Child-list changes anywhere under the document root.
    TreeMutations,
    /// A file or folder was renamed in the vault.
    Rename,
}

/// A single notification delivered to a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// One batch of mutation records, as a `MutationObserver` callback receives it.
    Mutations(Vec<MutationRecord>),
    Rename { path: String, old_path: String },
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::Mutations(_) => EventKind::TreeMutations,
            HostEvent::Rename { .. } => EventKind::Rename,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// The receiving end of a subscription. Events queue up until drained.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub kind: EventKind,
    receiver: Receiver<HostEvent>,
}

impl Subscription {
    /// Takes every event delivered since the last drain.
    pub fn drain(&self) -> Vec<HostEvent> {
        self.receiver.try_iter().collect()
    }
}

/// Registration of handlers against the host's notifiers.
pub trait HostEvents {
    fn subscribe(&mut self, kind: EventKind) -> Subscription;
    /// Returns `false` when the id was not (or no longer) subscribed.
    fn unsubscribe(&mut self, id: SubscriptionId) -> bool;
}

/// Fan-out of host events to every live subscriber of the matching kind.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriptionId, EventKind, Sender<HostEvent>)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` and returns how many subscribers received it.
    /// Subscribers whose receiving end was dropped are forgotten.
    pub fn emit(&mut self, event: HostEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;

        self.subscribers.retain(|(_, sub_kind, sender)| {
            if *sub_kind != kind {
                return true;
            }
            match sender.send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => false,
            }
        });

        delivered
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers.iter().filter(|(_, k, _)| *k == kind).count()
    }
}

impl HostEvents for EventBus {
    fn subscribe(&mut self, kind: EventKind) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, kind, sender));

        Subscription { id, kind, receiver }
    }

    fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _, _)| *sub_id != id);
        before != self.subscribers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_reach_matching_subscribers_only() {
        let mut bus = EventBus::new();
        let renames = bus.subscribe(EventKind::Rename);
        let mutations = bus.subscribe(EventKind::TreeMutations);

        let delivered = bus.emit(HostEvent::Rename {
            path: "b".to_string(),
            old_path: "a".to_string(),
        });

        assert_eq!(delivered, 1);
        assert_eq!(renames.drain().len(), 1);
        assert!(mutations.drain().is_empty());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe(EventKind::TreeMutations);

        assert!(bus.unsubscribe(sub.id));
        assert!(!bus.unsubscribe(sub.id));
        assert_eq!(bus.emit(HostEvent::Mutations(Vec::new())), 0);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_dropped_receivers_are_pruned() {
        let mut bus = EventBus::new();
        drop(bus.subscribe(EventKind::TreeMutations));

        assert_eq!(bus.emit(HostEvent::Mutations(Vec::new())), 0);
        assert_eq!(bus.subscriber_count(EventKind::TreeMutations), 0);
    }
}
