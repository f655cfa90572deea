//! # Capacity Gate
//!
//! Lock-free bound on how many moles may be up at once.
//!
//! ```text
//!   mole-0 ──┐                         ┌── Permit ──> Active
//!   mole-1 ──┼──> try_acquire() ──────>┤
//!   mole-N ──┘    (never blocks)       └── None ────> sleep, retry later
//! ```
//!
//! The gate is a single atomic counter of free permits. Acquisition is a
//! decrement-if-positive CAS loop; release is the [`Permit`] destructor, so a
//! permit is returned exactly once on every exit path, including unwinding and
//! shutdown. There is no wait queue: a caller that loses simply tries again on
//! its next cycle.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{BoardError, BoardResult};

/// Counting gate used in non-blocking mode only.
#[derive(Debug)]
pub struct CapacityGate {
    /// Free permits.
    available: AtomicUsize,
    /// Permits the gate was created with.
    capacity: usize,
}

impl CapacityGate {
    /// Creates a gate with `capacity` free permits.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfiguration`] if `capacity` is zero.
    pub fn new(capacity: usize) -> BoardResult<Self> {
        if capacity == 0 {
            return Err(BoardError::InvalidConfiguration(
                "gate capacity must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            available: AtomicUsize::new(capacity),
            capacity,
        })
    }

    /// Takes a permit if one is free. Returns immediately either way.
    ///
    /// The permit goes back to the gate when the returned guard is dropped.
    #[must_use = "dropping the permit releases it immediately"]
    pub fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut current = self.available.load(Ordering::Acquire);
        loop {
            if current == 0 {
                return None;
            }
            match self.available.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(Permit { gate: self }),
                Err(actual) => current = actual,
            }
        }
    }

    /// Returns a permit. Only [`Permit::drop`] calls this.
    fn release(&self) {
        let previous = self.available.fetch_add(1, Ordering::AcqRel);
        debug_assert!(previous < self.capacity, "permit released twice");
    }

    /// Total permits.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently free.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.available.load(Ordering::Acquire)
    }

    /// Permits currently held.
    #[inline]
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.capacity - self.available()
    }
}

/// One unit of capacity, borrowed from a [`CapacityGate`].
///
/// Not `Clone`: each successful acquisition releases exactly once.
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a CapacityGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}
