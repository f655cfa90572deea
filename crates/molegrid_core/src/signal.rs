//! Per-actor wake signal.
//!
//! Both actor sleeps park on one condvar. A sleep ends when its deadline
//! passes, when the board terminates the actor, or (for interruptible sleeps
//! only) when a hit interrupts it. Early wake-up is an ordinary return value,
//! not an error.

use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// Why a sleep returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Wake {
    /// The deadline passed.
    Elapsed,
    /// A hit asked the actor to re-check its window.
    Interrupted,
    /// The board asked the actor to exit.
    Terminated,
}

#[derive(Debug, Default)]
struct Flags {
    interrupted: bool,
    terminated: bool,
}

/// Interrupt/terminate flags plus the condvar sleepers wait on.
#[derive(Debug, Default)]
pub struct WakeSignal {
    flags: Mutex<Flags>,
    condvar: Condvar,
}

impl WakeSignal {
    /// Creates a signal with no pending interrupt.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps until `deadline`.
    ///
    /// Termination always wakes the sleeper. An interrupt wakes it only when
    /// `interruptible` is set; the interrupt is consumed on return.
    pub fn sleep_until(&self, deadline: Instant, interruptible: bool) -> Wake {
        let mut flags = self.flags.lock();
        loop {
            if flags.terminated {
                return Wake::Terminated;
            }
            if interruptible && flags.interrupted {
                flags.interrupted = false;
                return Wake::Interrupted;
            }
            if Instant::now() >= deadline {
                return Wake::Elapsed;
            }
            // Spurious wakeups and timeouts both re-check the flags above.
            let _ = self.condvar.wait_until(&mut flags, deadline);
        }
    }

    /// Wakes an interruptible sleep.
    pub fn interrupt(&self) {
        self.flags.lock().interrupted = true;
        self.condvar.notify_all();
    }

    /// Drops an interrupt that arrived while nobody was listening for one.
    pub fn clear_interrupt(&self) {
        self.flags.lock().interrupted = false;
    }

    /// Wakes any sleep and makes every later sleep return immediately.
    pub fn terminate(&self) {
        self.flags.lock().terminated = true;
        self.condvar.notify_all();
    }

    /// Whether [`terminate`](Self::terminate) has been called.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.flags.lock().terminated
    }
}
