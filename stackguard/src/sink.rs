use std::sync::Arc;

use thiserror::Error;

use stackguard_types::Event;

/// An error surfaced by a sink while delivering an event.
///
/// Delivery errors never mask the guarded function's own fault; the guard
/// logs them and carries on.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink is not able to accept events at all.
    #[error("sink unavailable: {0}")]
    Unavailable(String),
    /// The sink accepted the event but could not deliver it.
    #[error("event delivery failed: {0}")]
    Delivery(String),
}

/// The external consumer of captured events.
///
/// A sink owns delivery and any queueing or transport concerns, including
/// its own concurrency discipline: one sink instance may be shared by many
/// concurrently executing guards.
pub trait Sink: Send + Sync {
    /// Accepts one event for delivery.
    fn send_event(&self, event: Event) -> Result<(), SinkError>;

    /// Flushes any queued events, returning `true` on success.
    ///
    /// Sinks without internal queueing keep the default no-op.
    fn flush(&self) -> bool {
        true
    }
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn send_event(&self, event: Event) -> Result<(), SinkError> {
        (**self).send_event(event)
    }

    fn flush(&self) -> bool {
        (**self).flush()
    }
}
