//! # MOLEGRID Headless
//!
//! Plays one round with a simulated player and prints the result.
//! No window, no widgets.
//!
//! ```bash
//! # Default 3x3 board, 3 moles, 30 seconds
//! ./molegrid_headless
//!
//! # Settings from a file
//! ./molegrid_headless session.toml
//! ```

use std::time::{Duration, Instant};

use molegrid::{GameSession, SessionConfig, SessionState};
use molegrid_core::MoleEvent;
use rand::Rng;

/// How often the player looks at the board.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Timer resolution of the round.
const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Fastest and slowest reaction to a mole popping up (ms).
const REACTION_MS: std::ops::Range<u64> = 200..900;

/// Chance the player clicks the right hole.
const ACCURACY: f64 = 0.8;

/// A click the player has decided on but not yet made.
struct PendingClick {
    index: usize,
    at: Instant,
}

/// Running totals for the summary.
#[derive(Default)]
struct Tally {
    pop_ups: u32,
    clicks: u32,
    misclicks: u32,
}

fn main() {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("                   MOLEGRID HEADLESS v0.1.0");
    println!("                      SIMULATED PLAYER");
    println!("═══════════════════════════════════════════════════════════════════");
    println!();

    // === SETTINGS ===
    let config = match std::env::args().nth(1) {
        Some(path) => match SessionConfig::load(&path) {
            Ok(config) => {
                println!("   ✓ Settings loaded from {path}");
                config
            }
            Err(e) => {
                eprintln!("   ✗ FATAL: {e}");
                std::process::exit(1);
            }
        },
        None => SessionConfig::default(),
    };

    println!(
        "  Board:    {0}x{0} ({1} holes)",
        config.board_size,
        config.board_size * config.board_size
    );
    println!("  Moles:    {} at once", config.max_moles);
    println!("  Round:    {}s", config.round_secs);
    println!();

    let mut session = match GameSession::new(config) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("   ✗ FATAL: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = session.start() {
        eprintln!("   ✗ FATAL: Failed to start round: {e}");
        std::process::exit(1);
    }
    println!("🔨 Round started");

    let tally = play(&mut session);

    // === SUMMARY ===
    println!();
    println!("═══════════════════════════════════════════════════════════════════");
    println!("                          ROUND OVER");
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Score:      {}", session.score());
    println!("  Pop-ups:    {}", tally.pop_ups);
    println!("  Clicks:     {}", tally.clicks);
    println!("  Misclicks:  {}", tally.misclicks);
    if tally.clicks > 0 {
        println!(
            "  Hit rate:   {:.1}%",
            f64::from(session.score()) * 100.0 / f64::from(tally.clicks)
        );
    }
}

/// Runs the round to completion, reacting to pop-ups with a random delay.
fn play(session: &mut GameSession) -> Tally {
    let mut rng = rand::thread_rng();
    let mut tally = Tally::default();
    let mut pending: Vec<PendingClick> = Vec::new();
    let cells = session.board().cell_count();
    let mut next_tick = Instant::now() + TICK_INTERVAL;

    while session.state() == SessionState::Playing {
        for event in session.pump_events() {
            match event {
                MoleEvent::Activated(index) => {
                    tally.pop_ups += 1;
                    let delay = Duration::from_millis(rng.gen_range(REACTION_MS));
                    pending.push(PendingClick {
                        index,
                        at: Instant::now() + delay,
                    });
                }
                MoleEvent::Hit(index) => println!("   ✓ Whacked mole {index}"),
                MoleEvent::Deactivated(_) => {}
            }
        }

        let now = Instant::now();
        let (due, waiting): (Vec<_>, Vec<_>) =
            pending.drain(..).partition(|click| click.at <= now);
        pending = waiting;

        for click in due {
            let target = if rng.gen_bool(ACCURACY) {
                click.index
            } else {
                tally.misclicks += 1;
                rng.gen_range(0..cells)
            };
            tally.clicks += 1;
            if let Err(e) = session.hit(target) {
                eprintln!("   ✗ Click on {target} rejected: {e}");
            }
        }

        if now >= next_tick {
            next_tick += TICK_INTERVAL;
            match session.tick() {
                Ok(SessionState::Playing) => {
                    if session.time_remaining() % 5 == 0 {
                        println!(
                            "⏱  {}s left, score {}",
                            session.time_remaining(),
                            session.score()
                        );
                    }
                }
                Ok(_) => break,
                Err(e) => {
                    eprintln!("   ✗ Timer failed: {e}");
                    break;
                }
            }
        }

        std::thread::sleep(POLL_INTERVAL);
    }

    tally
}
