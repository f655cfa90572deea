//! # MOLEGRID
//!
//! Game sessions over the [`molegrid_core`] engine: a score that counts
//! hits, a round timer that stops the board at zero, and the reset /
//! apply-settings flows.
//!
//! ```rust,ignore
//! use molegrid::{GameSession, SessionConfig};
//!
//! let mut session = GameSession::new(SessionConfig::default())?;
//! session.start()?;
//! while session.is_playing() {
//!     std::thread::sleep(std::time::Duration::from_secs(1));
//!     session.tick()?;
//! }
//! println!("score: {}", session.score());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod session;

pub use error::{SessionError, SessionResult};
pub use session::{GameSession, SessionConfig, SessionState};
