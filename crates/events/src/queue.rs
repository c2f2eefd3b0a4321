//! Broker queue decoupling intake from the validation workers.
//!
//! Payloads are JSON text, the wire format a broker would carry; only the
//! consuming side deserializes, so malformed payloads surface at the worker
//! boundary. Delivery is unordered across jobs and may be repeated by the
//! producer (at-least-once); consumers must be idempotent.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    /// All consumers are gone and the queue can no longer accept messages.
    #[error("queue disconnected")]
    Disconnected,
    /// Publish failed due to internal lock poisoning.
    #[error("queue lock poisoned")]
    Poisoned,
}

/// Producer half of the broker hand-off.
///
/// Implementations must be shareable across threads; the `Arc` blanket impl
/// lets one queue value be handed to intake and workers alike.
pub trait MessageQueue: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Enqueue one message payload.
    fn publish(&self, payload: String) -> Result<(), Self::Error>;

    /// Create a competing-consumer handle. Every message is delivered to
    /// exactly one of the queue's consumers.
    fn consumer(&self) -> QueueConsumer;
}

impl<Q> MessageQueue for Arc<Q>
where
    Q: MessageQueue + ?Sized,
{
    type Error = Q::Error;

    fn publish(&self, payload: String) -> Result<(), Self::Error> {
        (**self).publish(payload)
    }

    fn consumer(&self) -> QueueConsumer {
        (**self).consumer()
    }
}

/// Receiving handle shared by competing worker instances.
///
/// Consumers contend on the receiver lock only while waiting; the lock is
/// released as soon as a message is taken, so message processing overlaps
/// across workers.
#[derive(Debug, Clone)]
pub struct QueueConsumer {
    receiver: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl QueueConsumer {
    /// Wait up to `timeout` for the next message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<String, RecvTimeoutError> {
        let receiver = self
            .receiver
            .lock()
            .map_err(|_| RecvTimeoutError::Disconnected)?;
        receiver.recv_timeout(timeout)
    }
}

/// In-process queue backed by a std mpsc channel.
#[derive(Debug)]
pub struct InMemoryQueue {
    sender: Mutex<mpsc::Sender<String>>,
    receiver: Arc<Mutex<mpsc::Receiver<String>>>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            sender: Mutex::new(tx),
            receiver: Arc::new(Mutex::new(rx)),
        }
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageQueue for InMemoryQueue {
    type Error = QueueError;

    fn publish(&self, payload: String) -> Result<(), Self::Error> {
        let sender = self.sender.lock().map_err(|_| QueueError::Poisoned)?;
        sender.send(payload).map_err(|_| QueueError::Disconnected)
    }

    fn consumer(&self) -> QueueConsumer {
        QueueConsumer {
            receiver: self.receiver.clone(),
        }
    }
}
