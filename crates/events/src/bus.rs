//! Subscription mechanics shared by the messaging primitives.

use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// A receiving end for pushed messages.
///
/// Designed for single-threaded consumption: each subscription is owned by
/// one consumer loop. The usual pattern is `recv_timeout` with a short tick
/// so the loop can interleave shutdown checks:
///
/// ```ignore
/// loop {
///     match subscription.recv_timeout(Duration::from_millis(250)) {
///         Ok(msg) => handle(msg),
///         Err(RecvTimeoutError::Timeout) => continue,      // check shutdown
///         Err(RecvTimeoutError::Disconnected) => break,    // sender gone
///     }
/// }
/// ```
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
