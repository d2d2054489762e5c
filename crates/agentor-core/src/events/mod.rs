//! Event bus: single-publisher, many-subscriber fan-out of lifecycle
//! events (§4.7).
//!
//! Ground truth is the `tokio::sync::mpsc` fan-out the orchestrator uses
//! to funnel `LifecycleDone` results back to one loop, generalized here
//! from one consumer to N. `tokio::sync::mpsc` itself has no drop-oldest
//! mode, so each subscriber gets a small hand-rolled bounded queue
//! instead of a channel, guarded by a `std::sync::Mutex` plus a `Notify`
//! for wakeups -- the same "one coarse lock, dispatch cost is dwarfed by
//! task execution" rationale as the lock manager and `WorktreeManager`.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use agentor_types::{Event, EventType};
use chrono::Utc;
use tokio::sync::Notify;

/// Default retained ring size for `events(since)` queries.
pub const DEFAULT_RING_CAPACITY: usize = 1024;

/// Default per-subscriber bounded queue size.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 256;

struct SubscriberState {
    queue: VecDeque<Event>,
    capacity: usize,
    dropped_pending: u64,
    closed: bool,
}

struct SubscriberQueue {
    state: Mutex<SubscriberState>,
    notify: Notify,
}

impl SubscriberQueue {
    fn push(&self, event: Event) {
        let mut state = self.state.lock().expect("subscriber queue mutex poisoned");
        if state.queue.len() >= state.capacity {
            state.queue.pop_front();
            state.dropped_pending += 1;
        }
        state.queue.push_back(event);
        drop(state);
        self.notify.notify_one();
    }

    fn close(&self) {
        self.state.lock().expect("subscriber queue mutex poisoned").closed = true;
        self.notify.notify_waiters();
    }
}

/// A subscription handle. Dropping it unsubscribes (§6: the bus only
/// holds a `Weak` reference to the underlying queue).
pub struct EventSubscription {
    queue: Arc<SubscriberQueue>,
}

impl EventSubscription {
    /// Wait for the next event, or `None` once the bus is shut down.
    pub async fn recv(&self) -> Option<Event> {
        loop {
            {
                let mut state = self.queue.state.lock().expect("subscriber queue mutex poisoned");
                if state.dropped_pending > 0 {
                    let count = state.dropped_pending;
                    state.dropped_pending = 0;
                    return Some(Event {
                        seq: 0,
                        event_type: EventType::EventsDropped,
                        timestamp: Utc::now(),
                        data: serde_json::json!({ "count": count }),
                    });
                }
                if let Some(event) = state.queue.pop_front() {
                    return Some(event);
                }
                if state.closed {
                    return None;
                }
            }
            self.queue.notify.notified().await;
        }
    }
}

struct BusInner {
    next_seq: u64,
    ring: VecDeque<Event>,
    ring_capacity: usize,
    subscribers: Vec<Weak<SubscriberQueue>>,
}

/// Single-publisher, many-subscriber event fan-out with a bounded
/// retained ring for replay via [`EventBus::events_since`].
pub struct EventBus {
    inner: Mutex<BusInner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_RING_CAPACITY)
    }
}

impl EventBus {
    pub fn new(ring_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(BusInner {
                next_seq: 0,
                ring: VecDeque::new(),
                ring_capacity,
                subscribers: Vec::new(),
            }),
        }
    }

    /// Publish a lifecycle event, assigning it the next monotonic `seq`
    /// and fanning it out to every live subscriber in emission order
    /// (§8 property 6).
    pub fn publish(&self, event_type: EventType, data: serde_json::Value) -> Event {
        let mut inner = self.inner.lock().expect("event bus mutex poisoned");
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let event = Event {
            seq,
            event_type,
            timestamp: Utc::now(),
            data,
        };

        inner.ring.push_back(event.clone());
        while inner.ring.len() > inner.ring_capacity {
            inner.ring.pop_front();
        }

        inner.subscribers.retain(|weak| {
            if let Some(sub) = weak.upgrade() {
                sub.push(event.clone());
                true
            } else {
                false
            }
        });

        event
    }

    /// Subscribe with a bounded per-subscriber queue. Slow subscribers
    /// never stall `publish`: once their queue is full, the oldest
    /// queued event is dropped and surfaced as a synthetic
    /// `EventsDropped` marker on their next `recv`.
    pub fn subscribe(&self, capacity: usize) -> EventSubscription {
        let queue = Arc::new(SubscriberQueue {
            state: Mutex::new(SubscriberState {
                queue: VecDeque::new(),
                capacity,
                dropped_pending: 0,
                closed: false,
            }),
            notify: Notify::new(),
        });
        self.inner
            .lock()
            .expect("event bus mutex poisoned")
            .subscribers
            .push(Arc::downgrade(&queue));
        EventSubscription { queue }
    }

    /// Events retained in the ring with `seq > since`, oldest first.
    pub fn events_since(&self, since: u64) -> Vec<Event> {
        self.inner
            .lock()
            .expect("event bus mutex poisoned")
            .ring
            .iter()
            .filter(|e| e.seq > since)
            .cloned()
            .collect()
    }

    /// Wake every live subscriber with a close signal so their `recv`
    /// returns `None` once drained. Called during orchestrator shutdown.
    pub fn close_all(&self) {
        let inner = self.inner.lock().expect("event bus mutex poisoned");
        for weak in &inner.subscribers {
            if let Some(sub) = weak.upgrade() {
                sub.close();
            }
        }
    }
}
