//! # Mole Events
//!
//! Events flow FROM actors TO the presentation layer:
//!
//! ```text
//! ┌──────────┐
//! │ mole-0   │──┐
//! ├──────────┤  │    ┌─────────────┐     ┌──────────────┐
//! │ mole-1   │──┼───>│  EventSink  │────>│  Renderer /  │
//! ├──────────┤  │    │ (unbounded) │     │  Score keeper│
//! │ mole-N   │──┘    └─────────────┘     └──────────────┘
//! ```
//!
//! Every actor publishes from its own thread, so sinks must be `Send + Sync`
//! and must never block the publisher.

use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

/// Something that happened to one cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoleEvent {
    /// The mole at this index popped up.
    Activated(usize),
    /// The mole at this index went back down.
    Deactivated(usize),
    /// The mole at this index was hit during its current window.
    Hit(usize),
}

impl MoleEvent {
    /// Index of the cell the event refers to.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Activated(i) | Self::Deactivated(i) | Self::Hit(i) => i,
        }
    }
}

/// Publish target for actor events.
///
/// Implementations are always-accepting: a publish never fails and never
/// waits on the consumer.
pub trait EventSink: Send + Sync {
    /// A mole popped up.
    fn publish_activated(&self, index: usize);

    /// A mole went back down.
    fn publish_deactivated(&self, index: usize);

    /// A mole was hit.
    fn publish_hit(&self, index: usize);

    /// Dispatches to the per-variant method.
    fn publish(&self, event: MoleEvent) {
        match event {
            MoleEvent::Activated(i) => self.publish_activated(i),
            MoleEvent::Deactivated(i) => self.publish_deactivated(i),
            MoleEvent::Hit(i) => self.publish_hit(i),
        }
    }
}

/// Sink that forwards every event into an unbounded channel.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    sender: Sender<MoleEvent>,
}

impl ChannelSink {
    fn send(&self, event: MoleEvent) {
        // Receiver dropped: nobody is listening, the event is discarded.
        let _ = self.sender.send(event);
    }
}

impl EventSink for ChannelSink {
    fn publish_activated(&self, index: usize) {
        self.send(MoleEvent::Activated(index));
    }

    fn publish_deactivated(&self, index: usize) {
        self.send(MoleEvent::Deactivated(index));
    }

    fn publish_hit(&self, index: usize) {
        self.send(MoleEvent::Hit(index));
    }
}

/// Consumer end of a [`ChannelSink`].
#[derive(Clone, Debug)]
pub struct EventReceiver {
    receiver: Receiver<MoleEvent>,
}

impl EventReceiver {
    /// Receives one event (non-blocking).
    #[inline]
    #[must_use]
    pub fn try_recv(&self) -> Option<MoleEvent> {
        self.receiver.try_recv().ok()
    }

    /// Waits up to `timeout` for one event.
    ///
    /// Returns `None` on timeout or when every sink has been dropped.
    #[must_use]
    pub fn recv_timeout(&self, timeout: Duration) -> Option<MoleEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Receives all pending events (non-blocking).
    #[must_use]
    pub fn drain(&self) -> Vec<MoleEvent> {
        self.receiver.try_iter().collect()
    }

    /// Number of events waiting.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

/// Factory for connected sink/receiver pairs.
pub struct EventBus;

impl EventBus {
    /// Creates an unbounded sink and its receiver.
    #[must_use]
    pub fn unbounded() -> (ChannelSink, EventReceiver) {
        let (sender, receiver) = unbounded();
        (ChannelSink { sender }, EventReceiver { receiver })
    }
}

/// One entry of a [`RecordingSink`] log.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    /// The event.
    pub event: MoleEvent,
    /// When it was published.
    pub at: Instant,
}

/// Sink that keeps every event in memory, in publish order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    log: Mutex<Vec<RecordedEvent>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, event: MoleEvent) {
        self.log.lock().push(RecordedEvent {
            event,
            at: Instant::now(),
        });
    }

    /// Copy of the log so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RecordedEvent> {
        self.log.lock().clone()
    }

    /// Events only, without timestamps.
    #[must_use]
    pub fn events(&self) -> Vec<MoleEvent> {
        self.log.lock().iter().map(|r| r.event).collect()
    }

    /// Events for one cell, in publish order.
    #[must_use]
    pub fn events_for(&self, index: usize) -> Vec<MoleEvent> {
        self.log
            .lock()
            .iter()
            .map(|r| r.event)
            .filter(|e| e.index() == index)
            .collect()
    }

    /// Number of events recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn publish_activated(&self, index: usize) {
        self.record(MoleEvent::Activated(index));
    }

    fn publish_deactivated(&self, index: usize) {
        self.record(MoleEvent::Deactivated(index));
    }

    fn publish_hit(&self, index: usize) {
        self.record(MoleEvent::Hit(index));
    }
}
