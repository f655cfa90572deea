//! # MOLEGRID Core
//!
//! Concurrent whack-a-mole engine:
//! - One thread per grid cell, each popping up on its own random schedule
//! - A lock-free capacity gate bounding how many moles are up at once
//! - Race-safe hit detection against caller-supplied click timestamps
//!
//! ## Architecture Rules
//!
//! 1. **Bounded admission** - A mole is up only while it holds a gate permit
//! 2. **Permits are RAII** - Release happens in `Drop`, on every exit path
//! 3. **One hit per cycle** - A window scores at most once
//! 4. **Cooperative shutdown** - Actors exit at their next checkpoint, never mid-window
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use molegrid_core::{now_millis, Board, EventBus, MoleEvent};
//!
//! let mut board = Board::new(3, 3)?;
//! let (sink, events) = EventBus::unbounded();
//! board.start(Arc::new(sink))?;
//!
//! if let Some(MoleEvent::Activated(index)) = events.recv_timeout(timeout) {
//!     board.hit(index, now_millis())?;
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod actor;
pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod gate;
pub mod signal;

pub use actor::{HitWindow, MoleActor};
pub use board::{Board, BoardState};
pub use clock::now_millis;
pub use config::{BoardConfig, TimingConfig};
pub use error::{BoardError, BoardResult};
pub use events::{
    ChannelSink, EventBus, EventReceiver, EventSink, MoleEvent, RecordedEvent, RecordingSink,
};
pub use gate::{CapacityGate, Permit};
pub use signal::{Wake, WakeSignal};
