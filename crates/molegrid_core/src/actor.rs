//! # Mole Actor
//!
//! One actor per cell, each on its own thread:
//!
//! ```text
//!        ┌──────────────────────────────────────────────────────────┐
//!        v                                                          │
//!   idle sleep ──> late-hit check ──> try_acquire ──(None)──────────┤
//!   (random)                              │                         │
//!                                     (Permit)                      │
//!                                         v                         │
//!                    Activated ──> active sleep ──> resolve hit ──> Deactivated
//!                                  (interruptible)                  + release
//! ```
//!
//! The pending hit is the only value written from outside the actor thread.
//! It lives in an atomic; everything else about the current cycle is local to
//! the loop.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use crate::clock::now_millis;
use crate::config::{TimingConfig, MAX_SLEEP_MS};
use crate::events::EventSink;
use crate::gate::CapacityGate;
use crate::signal::{Wake, WakeSignal};

/// Sentinel for "no click recorded yet". Never handed to a window.
const NO_HIT: u64 = u64::MAX;

/// Half-open interval `[start, start + duration)` in wall-clock milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitWindow {
    /// When the mole popped up.
    pub activated_at: u64,
    /// How long it stays up.
    pub duration_ms: u64,
}

impl HitWindow {
    /// Creates a window.
    #[must_use]
    pub const fn new(activated_at: u64, duration_ms: u64) -> Self {
        Self {
            activated_at,
            duration_ms,
        }
    }

    /// Whether a click at `timestamp` lands inside the window.
    #[inline]
    #[must_use]
    pub const fn contains(&self, timestamp: u64) -> bool {
        timestamp >= self.activated_at && timestamp - self.activated_at < self.duration_ms
    }

    /// First instant after the window.
    #[must_use]
    pub const fn end(&self) -> u64 {
        self.activated_at.saturating_add(self.duration_ms)
    }
}

/// Hit bookkeeping for the most recent activation cycle.
#[derive(Debug, Default)]
struct Cycle {
    window: Option<HitWindow>,
    hit_consumed: bool,
}

impl Cycle {
    fn begin(&mut self, window: HitWindow) {
        self.window = Some(window);
        self.hit_consumed = false;
    }

    /// Returns true if `pending` scores a hit not yet counted for this cycle.
    fn resolve(&mut self, pending: Option<u64>) -> bool {
        let (Some(window), Some(timestamp)) = (self.window, pending) else {
            return false;
        };
        if self.hit_consumed || !window.contains(timestamp) {
            return false;
        }
        self.hit_consumed = true;
        true
    }
}

/// `ms` from now, capped at [`MAX_SLEEP_MS`] and at what `Instant` can hold.
fn deadline_after(ms: u64) -> Instant {
    let now = Instant::now();
    now.checked_add(Duration::from_millis(ms.min(MAX_SLEEP_MS)))
        .unwrap_or(now)
}

/// Everything an actor thread owns besides the shared [`MoleActor`].
pub(crate) struct ActorContext {
    gate: Arc<CapacityGate>,
    sink: Arc<dyn EventSink>,
    timing: TimingConfig,
    cell_count: usize,
    rng: ChaCha8Rng,
}

impl ActorContext {
    /// Every actor on a board shares `seed`; each draws from its own stream.
    pub(crate) fn new(
        gate: Arc<CapacityGate>,
        sink: Arc<dyn EventSink>,
        timing: TimingConfig,
        cell_count: usize,
        seed: u64,
        index: usize,
    ) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(u64::try_from(index).unwrap_or(u64::MAX));
        Self {
            gate,
            sink,
            timing,
            cell_count,
            rng,
        }
    }
}

/// Shared half of a cell's actor.
///
/// The board keeps one `Arc<MoleActor>` per cell to route hits and answer
/// `is_active`; the actor thread holds the other.
#[derive(Debug)]
pub struct MoleActor {
    index: usize,
    active: AtomicBool,
    pending_hit: AtomicU64,
    signal: WakeSignal,
}

impl MoleActor {
    /// Creates an idle actor for cell `index`.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self {
            index,
            active: AtomicBool::new(false),
            pending_hit: AtomicU64::new(NO_HIT),
            signal: WakeSignal::new(),
        }
    }

    /// Cell index.
    #[inline]
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Whether the mole is currently up.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stores the latest click timestamp for this cell.
    pub fn record_hit(&self, timestamp: u64) {
        self.pending_hit.store(timestamp, Ordering::Release);
    }

    /// Latest click timestamp, if any.
    #[must_use]
    pub fn pending_hit(&self) -> Option<u64> {
        match self.pending_hit.load(Ordering::Acquire) {
            NO_HIT => None,
            timestamp => Some(timestamp),
        }
    }

    /// Cuts the active sleep short so the pending hit is resolved now.
    pub fn interrupt(&self) {
        self.signal.interrupt();
    }

    /// Asks the loop to exit at its next checkpoint.
    pub fn terminate(&self) {
        self.signal.terminate();
    }

    /// Whether termination was requested.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.signal.is_terminated()
    }

    /// Actor thread body. Returns once terminated and idle.
    pub(crate) fn run(&self, context: ActorContext) {
        let ActorContext {
            gate,
            sink,
            timing,
            cell_count,
            mut rng,
        } = context;
        let idle_range = timing.idle_range(cell_count);
        let mut cycle = Cycle::default();

        debug!(index = self.index, "mole started");

        loop {
            let idle_ms = rng.gen_range(idle_range.clone());
            let deadline = deadline_after(idle_ms);
            if self.signal.sleep_until(deadline, false) == Wake::Terminated {
                break;
            }

            // A click may have landed just before the last window closed.
            self.resolve(&mut cycle, sink.as_ref());

            if self.signal.is_terminated() {
                break;
            }
            let Some(permit) = gate.try_acquire() else {
                trace!(index = self.index, "gate full, back to sleep");
                continue;
            };

            let duration_ms = rng.gen_range(timing.active_range());
            let terminated = self.activate(&mut cycle, duration_ms, sink.as_ref());
            drop(permit);

            if terminated {
                break;
            }
        }

        debug!(index = self.index, "mole stopped");
    }

    /// One Active phase. The caller holds the permit throughout.
    ///
    /// Returns true if termination was requested while up.
    fn activate(&self, cycle: &mut Cycle, duration_ms: u64, sink: &dyn EventSink) -> bool {
        self.signal.clear_interrupt();
        cycle.begin(HitWindow::new(now_millis(), duration_ms));
        self.active.store(true, Ordering::Release);
        sink.publish_activated(self.index);
        debug!(index = self.index, duration_ms, "mole up");

        let deadline = deadline_after(duration_ms);
        let terminated = loop {
            match self.signal.sleep_until(deadline, true) {
                Wake::Elapsed => break false,
                Wake::Terminated => break true,
                Wake::Interrupted => {
                    if self.resolve(cycle, sink) {
                        break false;
                    }
                    // Click outside the window: stay up until the deadline.
                }
            }
        };

        self.resolve(cycle, sink);
        self.active.store(false, Ordering::Release);
        sink.publish_deactivated(self.index);
        debug!(index = self.index, "mole down");

        terminated
    }

    fn resolve(&self, cycle: &mut Cycle, sink: &dyn EventSink) -> bool {
        if cycle.resolve(self.pending_hit()) {
            debug!(index = self.index, "mole hit");
            sink.publish_hit(self.index);
            true
        } else {
            false
        }
    }
}
