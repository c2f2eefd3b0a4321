//! `veriflow-events` — in-process messaging mechanics.
//!
//! Two distinct delivery shapes live here:
//!
//! - [`queue`]: the broker hand-off between intake and the validation
//!   workers. Competing consumers; each message goes to exactly one worker.
//! - [`broadcast`]: fan-out of job snapshots to live observers. Every
//!   subscriber gets a copy; delivery is best-effort and fire-and-forget.

pub mod broadcast;
pub mod bus;
pub mod queue;

pub use broadcast::{BroadcastError, Broadcaster, JobBroadcaster, ObserverHandle, ObserverId};
pub use bus::Subscription;
pub use queue::{InMemoryQueue, MessageQueue, QueueConsumer, QueueError};
