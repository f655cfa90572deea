//! # Board Configuration
//!
//! Loaded once before a board is built, either from code or from a TOML file:
//!
//! ```toml
//! size = 4
//! max_active = 3
//! seed = 42
//!
//! [timing]
//! min_sleep_ms = 1000
//! per_cell_sleep_ms = 800
//! min_active_ms = 1000
//! max_active_ms = 3000
//! ```
//!
//! Missing keys fall back to the defaults below.

use std::ops::Range;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BoardError, BoardResult};

/// Floor of the idle ("waiting to pop up") sleep.
pub const DEFAULT_MIN_SLEEP_MS: u64 = 1000;

/// Per-cell contribution to the idle sleep ceiling.
///
/// Bigger boards wait longer between pop-ups so density stays constant.
pub const DEFAULT_PER_CELL_SLEEP_MS: u64 = 800;

/// Shortest time a mole stays up.
pub const DEFAULT_MIN_ACTIVE_MS: u64 = 1000;

/// Exclusive upper bound on the time a mole stays up.
pub const DEFAULT_MAX_ACTIVE_MS: u64 = 3000;

/// Upper limit on any single sleep (one day, in ms).
pub const MAX_SLEEP_MS: u64 = 86_400_000;

/// Sleep ranges used by every actor on a board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Lower bound of the idle sleep (ms).
    pub min_sleep_ms: u64,
    /// Idle sleep ceiling is `cell_count * per_cell_sleep_ms` (ms).
    pub per_cell_sleep_ms: u64,
    /// Lower bound of the active window (ms).
    pub min_active_ms: u64,
    /// Exclusive upper bound of the active window (ms).
    pub max_active_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            min_sleep_ms: DEFAULT_MIN_SLEEP_MS,
            per_cell_sleep_ms: DEFAULT_PER_CELL_SLEEP_MS,
            min_active_ms: DEFAULT_MIN_ACTIVE_MS,
            max_active_ms: DEFAULT_MAX_ACTIVE_MS,
        }
    }
}

impl TimingConfig {
    /// Range of idle sleep durations (ms) for a board with `cell_count` cells.
    ///
    /// When the scaled ceiling does not exceed the floor the range collapses
    /// to exactly `min_sleep_ms`.
    #[must_use]
    pub fn idle_range(&self, cell_count: usize) -> Range<u64> {
        let ceiling = self
            .per_cell_sleep_ms
            .saturating_mul(u64::try_from(cell_count).unwrap_or(u64::MAX));
        if ceiling > self.min_sleep_ms {
            self.min_sleep_ms..ceiling
        } else {
            self.min_sleep_ms..self.min_sleep_ms.saturating_add(1)
        }
    }

    /// Range of active window durations (ms).
    #[must_use]
    pub const fn active_range(&self) -> Range<u64> {
        self.min_active_ms..self.max_active_ms
    }

    /// Longest possible active window.
    #[must_use]
    pub const fn max_active_duration(&self) -> Duration {
        Duration::from_millis(self.max_active_ms)
    }

    /// Checks that every range is non-empty and no sleep exceeds
    /// [`MAX_SLEEP_MS`].
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfiguration`] for a zero-length or
    /// inverted active window, or an out-of-limit duration.
    pub fn validate(&self) -> BoardResult<()> {
        for (name, value) in [
            ("min_sleep_ms", self.min_sleep_ms),
            ("per_cell_sleep_ms", self.per_cell_sleep_ms),
            ("max_active_ms", self.max_active_ms),
        ] {
            if value > MAX_SLEEP_MS {
                return Err(BoardError::InvalidConfiguration(format!(
                    "{name} must be at most {MAX_SLEEP_MS}, got {value}"
                )));
            }
        }
        if self.min_active_ms == 0 {
            return Err(BoardError::InvalidConfiguration(
                "min_active_ms must be at least 1".to_string(),
            ));
        }
        if self.min_active_ms >= self.max_active_ms {
            return Err(BoardError::InvalidConfiguration(format!(
                "active window range is empty: [{}, {})",
                self.min_active_ms, self.max_active_ms
            )));
        }
        Ok(())
    }
}

/// Everything needed to build a board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BoardConfig {
    /// Grid dimension; the board has `size * size` cells.
    pub size: usize,
    /// Maximum number of simultaneously active moles.
    pub max_active: usize,
    /// Seed for the per-actor generators. `None` draws a fresh one per start.
    pub seed: Option<u64>,
    /// Sleep ranges.
    pub timing: TimingConfig,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            size: 3,
            max_active: 3,
            seed: None,
            timing: TimingConfig::default(),
        }
    }
}

impl BoardConfig {
    /// Creates a configuration with default timing.
    #[must_use]
    pub fn new(size: usize, max_active: usize) -> Self {
        Self {
            size,
            max_active,
            ..Self::default()
        }
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the timing.
    #[must_use]
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// Number of cells (`size²`).
    ///
    /// Only meaningful after [`validate`](Self::validate) succeeded.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.size.saturating_mul(self.size)
    }

    /// Validates dimensions, capacity and timing.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfiguration`] if `size < 1`,
    /// `max_active < 1`, the cell count overflows, or the timing is invalid.
    pub fn validate(&self) -> BoardResult<()> {
        if self.size < 1 {
            return Err(BoardError::InvalidConfiguration(format!(
                "size must be at least 1, got {}",
                self.size
            )));
        }
        if self.max_active < 1 {
            return Err(BoardError::InvalidConfiguration(format!(
                "max_active must be at least 1, got {}",
                self.max_active
            )));
        }
        if self.size.checked_mul(self.size).is_none() {
            return Err(BoardError::InvalidConfiguration(format!(
                "size {} overflows the cell count",
                self.size
            )));
        }
        self.timing.validate()?;

        // Exclusive end of the idle range; the longest sleep is one less.
        let longest = self.timing.idle_range(self.cell_count()).end.saturating_sub(1);
        if longest > MAX_SLEEP_MS {
            return Err(BoardError::InvalidConfiguration(format!(
                "idle sleep up to {longest}ms for {} cells exceeds {MAX_SLEEP_MS}ms",
                self.cell_count()
            )));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Config`] on malformed TOML and
    /// [`BoardError::InvalidConfiguration`] if validation fails.
    pub fn from_toml_str(source: &str) -> BoardResult<Self> {
        let config: Self = toml::from_str(source).map_err(|e| BoardError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> BoardResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| BoardError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}
