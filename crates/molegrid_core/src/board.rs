//! # Board Controller
//!
//! Owns the actors and the gate for one round and routes clicks to them.
//!
//! ```text
//!                 ┌──────────────────────────────────────┐
//!   start() ─────>│ Board                                │
//!   stop()  ─────>│  ├─ CapacityGate (max_active)        │
//!   hit(i, t) ───>│  ├─ MoleActor[0..size²]  ──threads──>│──> EventSink
//!   is_active(i) <│  └─ JoinHandle[0..size²]             │
//!                 └──────────────────────────────────────┘
//! ```
//!
//! Lifecycle is `NotStarted -> Running -> Stopped`, and `Stopped -> Running`
//! again on restart. `stop()` only signals; `join()` or dropping the board
//! waits for the threads.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::actor::{ActorContext, MoleActor};
use crate::config::BoardConfig;
use crate::error::{BoardError, BoardResult};
use crate::events::EventSink;
use crate::gate::CapacityGate;

/// Poll interval while waiting for actor threads to finish.
const JOIN_POLL: Duration = Duration::from_millis(5);

/// Board lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BoardState {
    /// Built, never started.
    NotStarted,
    /// Actors are running.
    Running,
    /// Termination has been signalled.
    Stopped,
}

/// Everything created by one `start()`.
struct Round {
    gate: Arc<CapacityGate>,
    actors: Vec<Arc<MoleActor>>,
    handles: Vec<JoinHandle<()>>,
}

impl Round {
    fn terminate(&self) {
        for actor in &self.actors {
            actor.terminate();
        }
    }

    fn join_all(&mut self) {
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                warn!("mole thread panicked");
            }
        }
    }
}

/// A grid of moles sharing one capacity gate.
pub struct Board {
    config: BoardConfig,
    state: BoardState,
    round: Option<Round>,
}

impl std::fmt::Debug for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Board")
            .field("size", &self.config.size)
            .field("max_active", &self.config.max_active)
            .field("state", &self.state)
            .field("active", &self.active_count())
            .finish()
    }
}

impl Board {
    /// Creates a `size x size` board allowing `max_active` moles up at once.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfiguration`] if `size < 1` or
    /// `max_active < 1`.
    pub fn new(size: usize, max_active: usize) -> BoardResult<Self> {
        Self::with_config(BoardConfig::new(size, max_active))
    }

    /// Creates a board from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InvalidConfiguration`] if the configuration does
    /// not validate.
    pub fn with_config(config: BoardConfig) -> BoardResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: BoardState::NotStarted,
            round: None,
        })
    }

    /// Spawns one thread per cell and starts the round.
    ///
    /// Restarting a stopped board first waits for the previous round's
    /// threads, then builds a fresh gate and fresh actors.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::AlreadyRunning`] if the board is running and
    /// [`BoardError::ThreadSpawn`] if a thread could not be created (any
    /// threads already spawned are stopped and joined).
    pub fn start(&mut self, sink: Arc<dyn EventSink>) -> BoardResult<()> {
        if self.state == BoardState::Running {
            return Err(BoardError::AlreadyRunning);
        }
        if let Some(mut previous) = self.round.take() {
            previous.terminate();
            previous.join_all();
        }

        let cell_count = self.config.cell_count();
        let gate = Arc::new(CapacityGate::new(self.config.max_active)?);
        let seed = self.config.seed.unwrap_or_else(rand::random);

        let actors: Vec<Arc<MoleActor>> = (0..cell_count)
            .map(|index| Arc::new(MoleActor::new(index)))
            .collect();
        let mut handles = Vec::with_capacity(cell_count);

        for actor in &actors {
            let context = ActorContext::new(
                Arc::clone(&gate),
                Arc::clone(&sink),
                self.config.timing,
                cell_count,
                seed,
                actor.index(),
            );
            let worker = Arc::clone(actor);
            let spawned = thread::Builder::new()
                .name(format!("mole-{}", actor.index()))
                .spawn(move || worker.run(context));

            match spawned {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    let mut aborted = Round {
                        gate,
                        actors: actors.clone(),
                        handles,
                    };
                    aborted.terminate();
                    aborted.join_all();
                    return Err(BoardError::ThreadSpawn(e.to_string()));
                }
            }
        }

        info!(
            size = self.config.size,
            cells = cell_count,
            max_active = self.config.max_active,
            seed,
            "board started"
        );

        self.round = Some(Round {
            gate,
            actors,
            handles,
        });
        self.state = BoardState::Running;
        Ok(())
    }

    /// Signals every actor to exit at its next checkpoint. Does not wait.
    ///
    /// Actors that are up when this is called still publish `Deactivated`
    /// and release their permit on the way out.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InactiveBoard`] if the board is not running.
    pub fn stop(&mut self) -> BoardResult<()> {
        if self.state != BoardState::Running {
            return Err(BoardError::InactiveBoard);
        }
        if let Some(round) = &self.round {
            round.terminate();
        }
        self.state = BoardState::Stopped;
        info!("board stopped");
        Ok(())
    }

    /// Waits up to `timeout` for the current round's threads to exit.
    ///
    /// Returns true if every thread has exited (trivially so if the board
    /// never started). Only meaningful after [`stop`](Self::stop).
    pub fn join(&mut self, timeout: Duration) -> bool {
        let Some(round) = self.round.as_mut() else {
            return true;
        };
        let deadline = Instant::now() + timeout;
        loop {
            if round.handles.iter().all(JoinHandle::is_finished) {
                round.join_all();
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(JOIN_POLL);
        }
    }

    /// Routes a click at `timestamp` (wall-clock ms) to cell `index`.
    ///
    /// The click is recorded on the actor; if the mole is up its active
    /// sleep is interrupted so the hit is resolved immediately.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::InactiveBoard`] if the board is not running and
    /// [`BoardError::IndexOutOfRange`] for a cell that does not exist. Both
    /// leave the board untouched.
    pub fn hit(&self, index: usize, timestamp: u64) -> BoardResult<()> {
        let round = match (&self.round, self.state) {
            (Some(round), BoardState::Running) => round,
            _ => {
                debug!(index, "hit ignored, board not running");
                return Err(BoardError::InactiveBoard);
            }
        };

        let Some(actor) = round.actors.get(index) else {
            warn!(index, cells = round.actors.len(), "hit ignored, index out of range");
            return Err(BoardError::IndexOutOfRange {
                index,
                cell_count: round.actors.len(),
            });
        };

        actor.record_hit(timestamp);
        if actor.is_active() {
            actor.interrupt();
        }
        Ok(())
    }

    /// Whether the mole at `index` is up. False if not running or out of range.
    #[must_use]
    pub fn is_active(&self, index: usize) -> bool {
        if self.state != BoardState::Running {
            return false;
        }
        self.round
            .as_ref()
            .and_then(|round| round.actors.get(index))
            .is_some_and(|actor| actor.is_active())
    }

    /// Number of moles currently up in the current round.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.round.as_ref().map_or(0, |round| {
            round.actors.iter().filter(|a| a.is_active()).count()
        })
    }

    /// Gate permits currently held in the current round.
    #[must_use]
    pub fn permits_in_use(&self) -> usize {
        self.round.as_ref().map_or(0, |round| round.gate.in_use())
    }

    /// Lifecycle state.
    #[must_use]
    pub const fn state(&self) -> BoardState {
        self.state
    }

    /// Grid dimension.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.config.size
    }

    /// Number of cells (`size²`).
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.config.cell_count()
    }

    /// Capacity of the gate.
    #[must_use]
    pub const fn max_active(&self) -> usize {
        self.config.max_active
    }

    /// The configuration the board was built with.
    #[must_use]
    pub const fn config(&self) -> &BoardConfig {
        &self.config
    }
}

impl Drop for Board {
    fn drop(&mut self) {
        if let Some(mut round) = self.round.take() {
            round.terminate();
            round.join_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimingConfig;
    use crate::events::{EventBus, MoleEvent, RecordingSink};

    fn quick_config(size: usize, max_active: usize) -> BoardConfig {
        BoardConfig::new(size, max_active)
            .with_seed(1)
            .with_timing(TimingConfig {
                min_sleep_ms: 5,
                per_cell_sleep_ms: 2,
                min_active_ms: 20,
                max_active_ms: 40,
            })
    }

    #[test]
    fn test_new_rejects_bad_dimensions() {
        assert!(matches!(
            Board::new(0, 1),
            Err(BoardError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            Board::new(1, 0),
            Err(BoardError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_unbounded_sleep_never_reaches_start() {
        let config = BoardConfig::new(1, 1).with_timing(TimingConfig {
            min_sleep_ms: u64::MAX,
            ..TimingConfig::default()
        });
        assert!(matches!(
            Board::with_config(config),
            Err(BoardError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_not_started_board_is_inert() {
        let mut board = Board::new(3, 3).unwrap();
        assert_eq!(board.state(), BoardState::NotStarted);
        assert_eq!(board.cell_count(), 9);
        assert_eq!(board.hit(0, 0), Err(BoardError::InactiveBoard));
        assert_eq!(board.stop(), Err(BoardError::InactiveBoard));
        assert!(!board.is_active(0));
        assert_eq!(board.active_count(), 0);
        assert!(board.join(Duration::ZERO));
    }

    #[test]
    fn test_start_twice_rejected() {
        let mut board = Board::with_config(quick_config(2, 1)).unwrap();
        let (sink, _receiver) = EventBus::unbounded();
        let sink: Arc<dyn EventSink> = Arc::new(sink);

        board.start(Arc::clone(&sink)).unwrap();
        assert_eq!(board.state(), BoardState::Running);
        assert_eq!(board.start(sink), Err(BoardError::AlreadyRunning));

        board.stop().unwrap();
        assert!(board.join(Duration::from_secs(2)));
    }

    #[test]
    fn test_hit_out_of_range() {
        let mut board = Board::with_config(quick_config(2, 1)).unwrap();
        let sink = Arc::new(RecordingSink::new());
        board.start(sink.clone()).unwrap();

        assert_eq!(
            board.hit(4, 0),
            Err(BoardError::IndexOutOfRange {
                index: 4,
                cell_count: 4
            })
        );

        board.stop().unwrap();
        assert!(board.join(Duration::from_secs(2)));
        assert!(sink.events().iter().all(|e| e.index() < 4));
    }

    #[test]
    fn test_hit_after_stop_is_inactive() {
        let mut board = Board::with_config(quick_config(2, 2)).unwrap();
        board.start(Arc::new(RecordingSink::new())).unwrap();
        board.stop().unwrap();

        assert_eq!(board.hit(0, 0), Err(BoardError::InactiveBoard));
        assert_eq!(board.stop(), Err(BoardError::InactiveBoard));
        assert!(!board.is_active(0));
    }

    #[test]
    fn test_restart_after_stop() {
        let mut board = Board::with_config(quick_config(2, 2)).unwrap();
        let first = Arc::new(RecordingSink::new());
        board.start(first.clone()).unwrap();
        thread::sleep(Duration::from_millis(100));
        board.stop().unwrap();

        let second = Arc::new(RecordingSink::new());
        board.start(second.clone()).unwrap();
        assert_eq!(board.state(), BoardState::Running);

        // The first round is fully joined, so its log is final.
        let settled = first.len();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(first.len(), settled);
        assert!(second
            .events()
            .iter()
            .any(|e| matches!(e, MoleEvent::Activated(_))));

        board.stop().unwrap();
        assert!(board.join(Duration::from_secs(2)));
        assert_eq!(board.permits_in_use(), 0);
    }

    #[test]
    fn test_drop_joins_threads() {
        let sink = Arc::new(RecordingSink::new());
        {
            let mut board = Board::with_config(quick_config(3, 2)).unwrap();
            board.start(sink.clone()).unwrap();
            thread::sleep(Duration::from_millis(50));
        }
        let settled = sink.len();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(sink.len(), settled);
        // Only the board's clone is gone; every actor thread has released its Arc too.
        assert_eq!(Arc::strong_count(&sink), 1);
    }
}
