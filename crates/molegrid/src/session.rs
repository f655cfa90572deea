//! # Game Session
//!
//! One player, one board, one round at a time:
//!
//! ```text
//!   start() ──> Playing ──tick() x round_secs──> Finished
//!                  ^                                │
//!                  └──── reset() / apply_settings() ┘
//! ```
//!
//! The session owns the receiving end of the board's event bus. Score is
//! the number of `Hit` events seen so far, so callers pump events between
//! ticks. The timer is driven by the caller, once per second.

use std::ops::RangeInclusive;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use molegrid_core::{
    now_millis, Board, BoardConfig, EventBus, EventReceiver, MoleEvent, TimingConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{SessionError, SessionResult};

/// Board sizes a session offers (3x3 to 5x5).
pub const BOARD_SIZES: RangeInclusive<usize> = 3..=5;

/// Choices for the number of moles allowed up at once.
pub const MAX_MOLE_CHOICES: RangeInclusive<usize> = 1..=10;

/// Round length in seconds.
pub const DEFAULT_ROUND_SECS: u32 = 30;

/// How long ending a round waits for the actor threads.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Player-facing settings.
///
/// ```toml
/// board_size = 4
/// max_moles = 2
/// round_secs = 30
///
/// [timing]
/// min_active_ms = 800
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Grid dimension.
    pub board_size: usize,
    /// Moles allowed up at once.
    pub max_moles: usize,
    /// Round length in seconds.
    pub round_secs: u32,
    /// Fixed seed for reproducible rounds.
    pub seed: Option<u64>,
    /// Engine timing.
    pub timing: TimingConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            board_size: 3,
            max_moles: 3,
            round_secs: DEFAULT_ROUND_SECS,
            seed: None,
            timing: TimingConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Creates settings with the default round length and timing.
    #[must_use]
    pub fn new(board_size: usize, max_moles: usize) -> Self {
        Self {
            board_size,
            max_moles,
            ..Self::default()
        }
    }

    /// Sets the round length.
    #[must_use]
    pub fn with_round_secs(mut self, round_secs: u32) -> Self {
        self.round_secs = round_secs;
        self
    }

    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the engine timing.
    #[must_use]
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    /// The board configuration these settings produce.
    #[must_use]
    pub fn board_config(&self) -> BoardConfig {
        BoardConfig {
            size: self.board_size,
            max_active: self.max_moles,
            seed: self.seed,
            timing: self.timing,
        }
    }

    /// Validates the settings and the board they produce.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSettings`] for choices outside the
    /// offered ranges, or [`SessionError::Board`] for invalid timing.
    pub fn validate(&self) -> SessionResult<()> {
        if !BOARD_SIZES.contains(&self.board_size) {
            return Err(SessionError::InvalidSettings(format!(
                "board_size must be in {}..={}, got {}",
                BOARD_SIZES.start(),
                BOARD_SIZES.end(),
                self.board_size
            )));
        }
        if !MAX_MOLE_CHOICES.contains(&self.max_moles) {
            return Err(SessionError::InvalidSettings(format!(
                "max_moles must be in {}..={}, got {}",
                MAX_MOLE_CHOICES.start(),
                MAX_MOLE_CHOICES.end(),
                self.max_moles
            )));
        }
        if self.round_secs == 0 {
            return Err(SessionError::InvalidSettings(
                "round_secs must be at least 1".to_string(),
            ));
        }
        self.board_config().validate()?;
        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] on malformed TOML, otherwise any
    /// [`validate`](Self::validate) error.
    pub fn from_toml_str(source: &str) -> SessionResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| SessionError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Config`] if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> SessionResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| SessionError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }
}

/// Where the session is in its round.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    /// Built, no round played yet.
    Ready,
    /// Board running, timer counting down.
    Playing,
    /// Timer ran out or the round was ended.
    Finished,
}

/// A scored, timed round over a [`Board`].
pub struct GameSession {
    config: SessionConfig,
    board: Board,
    events: Option<EventReceiver>,
    score: u32,
    time_remaining: u32,
    state: SessionState,
}

impl GameSession {
    /// Builds a session; the board is created but not started.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings are invalid.
    pub fn new(config: SessionConfig) -> SessionResult<Self> {
        config.validate()?;
        let board = Board::with_config(config.board_config())?;
        Ok(Self {
            time_remaining: config.round_secs,
            config,
            board,
            events: None,
            score: 0,
            state: SessionState::Ready,
        })
    }

    /// Starts a round: zero score, full timer, board running.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::AlreadyPlaying`] during a round, or the
    /// board's error if its threads cannot be started.
    pub fn start(&mut self) -> SessionResult<()> {
        if self.state == SessionState::Playing {
            return Err(SessionError::AlreadyPlaying);
        }

        let (sink, events) = EventBus::unbounded();
        self.board.start(Arc::new(sink))?;
        self.events = Some(events);
        self.score = 0;
        self.time_remaining = self.config.round_secs;
        self.state = SessionState::Playing;

        info!(
            board_size = self.config.board_size,
            max_moles = self.config.max_moles,
            round_secs = self.config.round_secs,
            "round started"
        );
        Ok(())
    }

    /// Advances the round timer by one second.
    ///
    /// At zero the board is stopped and the session is `Finished`. Outside
    /// a round this does nothing.
    ///
    /// # Errors
    ///
    /// Returns the board's error if stopping fails.
    pub fn tick(&mut self) -> SessionResult<SessionState> {
        if self.state != SessionState::Playing {
            return Ok(self.state);
        }

        self.time_remaining = self.time_remaining.saturating_sub(1);
        debug!(remaining = self.time_remaining, "tick");

        if self.time_remaining == 0 {
            self.finish()?;
        }
        Ok(self.state)
    }

    /// Drains pending board events, scoring every `Hit`.
    ///
    /// Returns the drained events in order.
    pub fn pump_events(&mut self) -> Vec<MoleEvent> {
        let Some(receiver) = &self.events else {
            return Vec::new();
        };

        let events = receiver.drain();
        for event in &events {
            if let MoleEvent::Hit(index) = event {
                self.score = self.score.saturating_add(1);
                debug!(index, score = self.score, "mole whacked");
            }
        }
        events
    }

    /// Clicks `index` now.
    ///
    /// # Errors
    ///
    /// See [`Board::hit`].
    pub fn hit(&self, index: usize) -> SessionResult<()> {
        self.hit_at(index, now_millis())
    }

    /// Clicks `index` at an explicit wall-clock time (ms).
    ///
    /// # Errors
    ///
    /// See [`Board::hit`].
    pub fn hit_at(&self, index: usize, timestamp: u64) -> SessionResult<()> {
        self.board.hit(index, timestamp)?;
        Ok(())
    }

    /// Ends the current round early. Does nothing outside a round.
    ///
    /// # Errors
    ///
    /// Returns the board's error if stopping fails.
    pub fn end(&mut self) -> SessionResult<()> {
        if self.state == SessionState::Playing {
            self.finish()?;
        }
        Ok(())
    }

    /// Ends any round in progress and starts a fresh one on the same board.
    ///
    /// # Errors
    ///
    /// Returns the board's error if it cannot be stopped or restarted.
    pub fn reset(&mut self) -> SessionResult<()> {
        self.end()?;
        self.start()
    }

    /// Replaces the settings, rebuilds the board and starts a new round.
    ///
    /// Invalid settings leave the current round untouched.
    ///
    /// # Errors
    ///
    /// Returns the validation error for `config`, or the board's error.
    pub fn apply_settings(&mut self, config: SessionConfig) -> SessionResult<()> {
        config.validate()?;
        let board = Board::with_config(config.board_config())?;

        self.end()?;
        self.board = board;
        self.config = config;
        self.start()
    }

    fn finish(&mut self) -> SessionResult<()> {
        self.board.stop()?;
        if !self.board.join(SHUTDOWN_GRACE) {
            warn!(grace = ?SHUTDOWN_GRACE, "actors still running after stop");
        }
        self.pump_events();
        self.state = SessionState::Finished;

        info!(score = self.score, "round over");
        Ok(())
    }

    /// Hits scored in the current (or last) round.
    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    /// Seconds left on the round timer.
    #[must_use]
    pub const fn time_remaining(&self) -> u32 {
        self.time_remaining
    }

    /// Session state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a round is in progress.
    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state == SessionState::Playing
    }

    /// Whether the mole at `index` is up.
    #[must_use]
    pub fn is_active(&self, index: usize) -> bool {
        self.board.is_active(index)
    }

    /// Current settings.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The board being played.
    #[must_use]
    pub const fn board(&self) -> &Board {
        &self.board
    }
}
