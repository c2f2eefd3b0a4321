//! Fan-out of job state snapshots to live observers.
//!
//! Delivery is **best-effort and fire-and-forget**: no acknowledgment, no
//! retry, no per-observer replay. An observer that subscribes after an event
//! was published never sees that event. The store remains the single
//! authoritative copy; this registry only holds transient references for the
//! duration of a push.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;

use thiserror::Error;

use crate::bus::Subscription;

/// Opaque identity of one subscribed observer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl core::fmt::Display for ObserverId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

/// Handle returned by [`Broadcaster::subscribe`]: the observer's identity
/// plus the channel its events arrive on.
#[derive(Debug)]
pub struct ObserverHandle<M> {
    id: ObserverId,
    events: Subscription<M>,
}

impl<M> ObserverHandle<M> {
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn events(&self) -> &Subscription<M> {
        &self.events
    }

    /// Split the handle so the subscription can move into a consumer loop
    /// while the id stays behind for a later `unsubscribe`.
    pub fn into_parts(self) -> (ObserverId, Subscription<M>) {
        (self.id, self.events)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// Fan-out failed due to internal lock poisoning.
    #[error("broadcaster registry lock poisoned")]
    Poisoned,
}

/// Mutex-guarded observer registry with snapshot-at-publish fan-out.
///
/// Subscribe/unsubscribe may race with an in-flight publish; each publish
/// operates on the subscriber set snapshotted at call time, so an observer
/// added mid-publish may or may not see that event but never sees it twice.
#[derive(Debug)]
pub struct Broadcaster<M> {
    subscribers: Mutex<HashMap<ObserverId, mpsc::Sender<M>>>,
    next_id: AtomicU64,
}

/// Fan-out of full [`veriflow_core::Job`] records, the pipeline's push payload.
pub type JobBroadcaster = Broadcaster<veriflow_core::Job>;

impl<M> Broadcaster<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new observer channel.
    pub fn subscribe(&self) -> ObserverHandle<M> {
        let (tx, rx) = mpsc::channel();
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));

        // If the lock is poisoned we still hand out a subscription; it just
        // never receives events until the process restarts.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.insert(id, tx);
        }

        ObserverHandle {
            id,
            events: Subscription::new(rx),
        }
    }

    /// Remove an observer; subsequent publishes no longer target it.
    pub fn unsubscribe(&self, id: ObserverId) {
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.remove(&id);
        }
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

impl<M> Default for Broadcaster<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<M> Broadcaster<M>
where
    M: Clone + Send + 'static,
{
    /// Push `message` to every currently subscribed observer.
    ///
    /// Observers whose channel is gone are dropped from future fan-out;
    /// a single failed delivery never affects the other observers.
    pub fn publish(&self, message: M) -> Result<(), BroadcastError> {
        let snapshot: Vec<(ObserverId, mpsc::Sender<M>)> = {
            let subs = self.subscribers.lock().map_err(|_| BroadcastError::Poisoned)?;
            subs.iter().map(|(id, tx)| (*id, tx.clone())).collect()
        };

        let mut dead = Vec::new();
        for (id, tx) in &snapshot {
            if tx.send(message.clone()).is_err() {
                dead.push(*id);
            }
        }

        if !dead.is_empty() {
            tracing::debug!(dropped = dead.len(), "pruning disconnected observers");
            let mut subs = self.subscribers.lock().map_err(|_| BroadcastError::Poisoned)?;
            for id in dead {
                subs.remove(&id);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn every_subscriber_receives_each_publish() {
        let bus: Broadcaster<u32> = Broadcaster::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(7).unwrap();

        assert_eq!(a.events().recv().unwrap(), 7);
        assert_eq!(b.events().recv().unwrap(), 7);
    }

    #[test]
    fn late_subscriber_never_sees_past_events() {
        let bus: Broadcaster<u32> = Broadcaster::new();
        bus.publish(1).unwrap();

        let late = bus.subscribe();
        assert!(late.events().recv_timeout(Duration::from_millis(50)).is_err());

        bus.publish(2).unwrap();
        assert_eq!(late.events().recv().unwrap(), 2);
    }

    #[test]
    fn unsubscribed_observer_is_no_longer_targeted() {
        let bus: Broadcaster<u32> = Broadcaster::new();
        let handle = bus.subscribe();
        let id = handle.id();

        bus.unsubscribe(id);
        bus.publish(3).unwrap();

        assert!(handle.events().try_recv().is_err());
        assert_eq!(bus.observer_count(), 0);
    }

    #[test]
    fn disconnected_observer_is_pruned_without_affecting_others() {
        let bus: Broadcaster<u32> = Broadcaster::new();
        let dead = bus.subscribe();
        let live = bus.subscribe();
        drop(dead);

        bus.publish(4).unwrap();

        assert_eq!(live.events().recv().unwrap(), 4);
        assert_eq!(bus.observer_count(), 1);
    }

    #[test]
    fn observer_ids_are_unique() {
        let bus: Broadcaster<u32> = Broadcaster::new();
        let a = bus.subscribe();
        let b = bus.subscribe();
        assert_ne!(a.id(), b.id());
    }
}
