//! Object notifications.
//!
//! Every persisted object owns an [`EventFeed`]. The object emits an event
//! after each externally visible change, once its internal lock has been
//! released, so subscribers may call back into the object.
//!
//! # Usage
//!
//! ```rust
//! use recordkit_core::{EventKind, NoopHooks, PersistedObject};
//!
//! let person = PersistedObject::new(NoopHooks);
//! let events = person.subscribe();
//!
//! person.set_property("Name", "Bob").unwrap();
//! person.save().unwrap();
//!
//! let kinds: Vec<EventKind> = events.try_iter().map(|e| e.kind).collect();
//! assert_eq!(
//!     kinds,
//!     vec![EventKind::PropertyChanged { name: "Name".into() }, EventKind::Created]
//! );
//! ```

use crate::types::ObjectId;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::mpsc::{self, Receiver, Sender};

/// What happened to the object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A property value changed.
    PropertyChanged {
        /// The changed property.
        name: String,
    },
    /// The create hook succeeded.
    Created,
    /// The update hook succeeded.
    Updated,
    /// Data was reloaded by the fetch hook.
    Fetched,
    /// The object was deleted.
    Deleted,
}

/// A single notification from one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEvent {
    /// The object that emitted the event.
    pub object_id: ObjectId,
    /// Per-object sequence number, starting at 1.
    pub sequence: u64,
    /// What happened.
    pub kind: EventKind,
}

struct FeedState {
    next_sequence: u64,
    history: VecDeque<ObjectEvent>,
}

/// Distributes one object's events to subscribers.
///
/// The event feed:
/// - Preserves emission order
/// - Supports multiple subscribers
/// - Keeps a bounded history for polling
/// - Is thread-safe
pub struct EventFeed {
    object_id: ObjectId,
    subscribers: RwLock<Vec<Sender<ObjectEvent>>>,
    state: RwLock<FeedState>,
    max_history: usize,
}

impl EventFeed {
    /// Creates a feed for `object_id` keeping `max_history` events.
    #[must_use]
    pub fn new(object_id: ObjectId, max_history: usize) -> Self {
        Self {
            object_id,
            subscribers: RwLock::new(Vec::new()),
            state: RwLock::new(FeedState {
                next_sequence: 1,
                history: VecDeque::new(),
            }),
            max_history,
        }
    }

    /// Subscribes to the feed.
    ///
    /// Returns a receiver that will receive all future events.
    pub fn subscribe(&self) -> Receiver<ObjectEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribe_sender(tx);
        rx
    }

    /// Forwards all future events into an existing channel.
    ///
    /// Lets one receiver observe many objects.
    pub fn subscribe_sender(&self, sender: Sender<ObjectEvent>) {
        self.subscribers.write().push(sender);
    }

    /// Emits an event to all subscribers and returns it.
    pub fn emit(&self, kind: EventKind) -> ObjectEvent {
        // Held across sequencing and delivery so subscribers see sequence order.
        let mut subscribers = self.subscribers.write();

        let event = {
            let mut state = self.state.write();
            let event = ObjectEvent {
                object_id: self.object_id,
                sequence: state.next_sequence,
                kind,
            };
            state.next_sequence += 1;
            state.history.push_back(event.clone());
            while state.history.len() > self.max_history {
                state.history.pop_front();
            }
            event
        };

        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        event
    }

    /// Returns events with sequence > cursor, up to limit.
    #[must_use]
    pub fn poll(&self, cursor: u64, limit: usize) -> Vec<ObjectEvent> {
        self.state
            .read()
            .history
            .iter()
            .filter(|e| e.sequence > cursor)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Returns the latest sequence number emitted, or 0.
    #[must_use]
    pub fn latest_sequence(&self) -> u64 {
        self.state.read().next_sequence - 1
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Returns the number of events in history.
    #[must_use]
    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }
}

impl std::fmt::Debug for EventFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventFeed")
            .field("object_id", &self.object_id)
            .field("subscribers", &self.subscriber_count())
            .field("latest_sequence", &self.latest_sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    fn feed() -> EventFeed {
        EventFeed::new(ObjectId::new(), 1024)
    }

    #[test]
    fn emit_and_receive() {
        let feed = feed();
        let rx = feed.subscribe();

        let event = feed.emit(EventKind::Created);
        assert_eq!(event.sequence, 1);

        let received = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(received, event);
    }

    #[test]
    fn multiple_subscribers() {
        let feed = feed();
        let rx1 = feed.subscribe();
        let rx2 = feed.subscribe();

        let event = feed.emit(EventKind::Deleted);

        assert_eq!(rx1.recv().unwrap(), event);
        assert_eq!(rx2.recv().unwrap(), event);
    }

    #[test]
    fn shared_sender_sees_both_objects() {
        let a = feed();
        let b = feed();
        let (tx, rx) = mpsc::channel();
        a.subscribe_sender(tx.clone());
        b.subscribe_sender(tx);

        a.emit(EventKind::Created);
        b.emit(EventKind::Deleted);

        let ids: Vec<ObjectId> = rx.try_iter().map(|e| e.object_id).collect();
        assert_eq!(ids, vec![a.object_id, b.object_id]);
    }

    #[test]
    fn subscriber_cleanup() {
        let feed = feed();
        let rx = feed.subscribe();
        assert_eq!(feed.subscriber_count(), 1);

        drop(rx);

        feed.emit(EventKind::Updated);
        assert_eq!(feed.subscriber_count(), 0);
    }

    #[test]
    fn poll_from_cursor() {
        let feed = feed();
        for _ in 0..5 {
            feed.emit(EventKind::Updated);
        }

        let events = feed.poll(2, 10);
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);
        assert_eq!(feed.poll(0, 3).len(), 3);
    }

    #[test]
    fn history_truncation() {
        let feed = EventFeed::new(ObjectId::new(), 5);
        for _ in 0..10 {
            feed.emit(EventKind::Updated);
        }

        assert_eq!(feed.history_len(), 5);
        assert_eq!(feed.poll(0, 100)[0].sequence, 6);
        assert_eq!(feed.latest_sequence(), 10);
    }

    #[test]
    fn threaded_subscribe() {
        let feed = Arc::new(feed());
        let rx = feed.subscribe();

        let feed_clone = Arc::clone(&feed);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(10));
            feed_clone.emit(EventKind::PropertyChanged {
                name: "Name".to_string(),
            });
        });

        let received = rx.recv_timeout(Duration::from_millis(500)).unwrap();
        assert_eq!(
            received.kind,
            EventKind::PropertyChanged {
                name: "Name".to_string()
            }
        );

        handle.join().unwrap();
    }
}
