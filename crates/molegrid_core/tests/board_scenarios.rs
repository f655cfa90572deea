//! Integration tests for the board: capacity, hit routing and shutdown.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use molegrid_core::{
    now_millis, Board, BoardConfig, BoardError, BoardState, EventBus, MoleEvent, RecordingSink,
    TimingConfig,
};

fn fast_timing() -> TimingConfig {
    TimingConfig {
        min_sleep_ms: 1,
        per_cell_sleep_ms: 1,
        min_active_ms: 5,
        max_active_ms: 15,
    }
}

fn count(events: &[MoleEvent], pred: impl Fn(&MoleEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

/// Checks one cell's event log: cycles of Activated, Deactivated with at most
/// one Hit per cycle. A hit resolved after the window closed may trail the
/// Deactivated of its cycle, but never follows the next Activated.
fn assert_cell_protocol(index: usize, events: &[MoleEvent]) {
    let mut up = false;
    let mut hit_this_cycle = false;

    for event in events {
        match event {
            MoleEvent::Activated(_) => {
                assert!(!up, "cell {index}: Activated twice without Deactivated");
                up = true;
                hit_this_cycle = false;
            }
            MoleEvent::Hit(_) => {
                assert!(!hit_this_cycle, "cell {index}: two hits in one cycle");
                hit_this_cycle = true;
            }
            MoleEvent::Deactivated(_) => {
                assert!(up, "cell {index}: Deactivated without Activated");
                up = false;
            }
        }
    }
    assert!(!up, "cell {index}: still up after the board was joined");
}

#[test]
fn test_capacity_never_exceeded_across_dimensions() {
    for size in 1..=10usize {
        let cells = size * size;
        for max_active in [1, 3, cells / 2 + 1, 100] {
            let config = BoardConfig::new(size, max_active)
                .with_seed((size * 1_000 + max_active) as u64)
                .with_timing(fast_timing());
            let mut board = Board::with_config(config).unwrap();
            let sink = Arc::new(RecordingSink::new());
            board.start(sink.clone()).unwrap();

            let deadline = Instant::now() + Duration::from_millis(120);
            while Instant::now() < deadline {
                // Per-cell flags are read one by one; the gate count is exact.
                let held = board.permits_in_use();
                assert!(
                    held <= max_active,
                    "size {size}, max_active {max_active}: {held} permits held"
                );
                thread::sleep(Duration::from_millis(1));
            }

            board.stop().unwrap();
            assert!(board.join(Duration::from_secs(2)));
            assert_eq!(board.permits_in_use(), 0);
        }
    }
}

/// Scenario A: default timing, no clicks, five seconds.
#[test]
fn test_idle_run_balanced_events_no_hits() {
    let mut board = Board::new(3, 3).unwrap();
    let sink = Arc::new(RecordingSink::new());
    board.start(sink.clone()).unwrap();

    let deadline = Instant::now() + Duration::from_millis(5_000);
    while Instant::now() < deadline {
        assert!(board.active_count() <= 3);
        thread::sleep(Duration::from_millis(10));
    }

    board.stop().unwrap();
    assert!(board.join(Duration::from_secs(2)));

    let events = sink.events();
    let activated = count(&events, |e| matches!(e, MoleEvent::Activated(_)));
    let deactivated = count(&events, |e| matches!(e, MoleEvent::Deactivated(_)));
    assert!(activated > 0, "nothing popped up in five seconds");
    assert_eq!(activated, deactivated);
    assert_eq!(count(&events, |e| matches!(e, MoleEvent::Hit(_))), 0);
}

/// Scenario B: a click inside the window scores once and ends it early.
#[test]
fn test_hit_in_window_scores_once_and_ends_early() {
    let config = BoardConfig::new(1, 1).with_seed(3).with_timing(TimingConfig {
        min_sleep_ms: 5,
        per_cell_sleep_ms: 1,
        min_active_ms: 2_000,
        max_active_ms: 3_000,
    });
    let mut board = Board::with_config(config).unwrap();
    let (sink, events) = EventBus::unbounded();
    board.start(Arc::new(sink)).unwrap();

    assert_eq!(
        events.recv_timeout(Duration::from_secs(2)),
        Some(MoleEvent::Activated(0))
    );
    let up_at = Instant::now();
    let clicked_at = now_millis();

    board.hit(0, clicked_at).unwrap();

    assert_eq!(
        events.recv_timeout(Duration::from_secs(1)),
        Some(MoleEvent::Hit(0))
    );
    assert_eq!(
        events.recv_timeout(Duration::from_secs(1)),
        Some(MoleEvent::Deactivated(0))
    );
    assert!(
        up_at.elapsed() < Duration::from_millis(2_000),
        "window was not cut short"
    );

    // Same click again: already consumed for that cycle.
    board.hit(0, clicked_at).unwrap();
    thread::sleep(Duration::from_millis(50));

    board.stop().unwrap();
    assert!(board.join(Duration::from_secs(2)));

    let rest = events.drain();
    assert_eq!(count(&rest, |e| matches!(e, MoleEvent::Hit(_))), 0);
}

/// Scenario C: a click on a cell that does not exist changes nothing.
#[test]
fn test_out_of_range_hit_is_reported_and_ignored() {
    let config = BoardConfig::new(3, 3).with_seed(5).with_timing(fast_timing());
    let mut board = Board::with_config(config).unwrap();
    let sink = Arc::new(RecordingSink::new());
    board.start(sink.clone()).unwrap();

    assert_eq!(
        board.hit(15, now_millis()),
        Err(BoardError::IndexOutOfRange {
            index: 15,
            cell_count: 9
        })
    );
    assert_eq!(board.state(), BoardState::Running);
    assert!(!board.is_active(15));

    thread::sleep(Duration::from_millis(50));
    board.stop().unwrap();
    assert!(board.join(Duration::from_secs(2)));

    let events = sink.events();
    assert!(events.iter().all(|e| e.index() < 9));
    assert_eq!(count(&events, |e| matches!(e, MoleEvent::Hit(_))), 0);
}

/// Scenario D: stop mid-run with default timing still drains quickly.
#[test]
fn test_stop_mid_run_releases_everything() {
    let mut board = Board::new(3, 3).unwrap();
    let sink = Arc::new(RecordingSink::new());
    board.start(sink.clone()).unwrap();

    // Let some moles come up; idle sleeps here last up to 7.2s.
    let deadline = Instant::now() + Duration::from_secs(3);
    while board.active_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }

    board.stop().unwrap();
    assert_eq!(board.state(), BoardState::Stopped);
    assert!(
        board.join(Duration::from_millis(500)),
        "actors did not exit within the grace period"
    );
    assert_eq!(board.active_count(), 0);
    assert_eq!(board.permits_in_use(), 0);

    let settled = sink.len();
    thread::sleep(Duration::from_millis(200));
    assert_eq!(sink.len(), settled, "events published after shutdown");

    let events = sink.events();
    assert_eq!(
        count(&events, |e| matches!(e, MoleEvent::Activated(_))),
        count(&events, |e| matches!(e, MoleEvent::Deactivated(_)))
    );
}

#[test]
fn test_event_order_per_cell_under_clicks() {
    let config = BoardConfig::new(4, 4).with_seed(9).with_timing(TimingConfig {
        min_sleep_ms: 1,
        per_cell_sleep_ms: 2,
        min_active_ms: 10,
        max_active_ms: 30,
    });
    let mut board = Board::with_config(config).unwrap();
    let sink = Arc::new(RecordingSink::new());
    board.start(sink.clone()).unwrap();

    // Click every visible mole, some of them twice.
    let deadline = Instant::now() + Duration::from_millis(600);
    let mut round = 0usize;
    while Instant::now() < deadline {
        for index in 0..board.cell_count() {
            if board.is_active(index) {
                board.hit(index, now_millis()).unwrap();
                if round % 2 == 0 {
                    board.hit(index, now_millis()).unwrap();
                }
            }
        }
        round += 1;
        thread::sleep(Duration::from_millis(1));
    }

    board.stop().unwrap();
    assert!(board.join(Duration::from_secs(2)));

    for index in 0..board.cell_count() {
        assert_cell_protocol(index, &sink.events_for(index));
    }
    let events = sink.events();
    assert!(count(&events, |e| matches!(e, MoleEvent::Hit(_))) > 0);
}

/// A click stamped inside a window but delivered after it closed still
/// scores, before the next pop-up. A click at the window end does not.
#[test]
fn test_late_click_resolves_against_closed_window() {
    // One cell: the idle sleep is exactly `min_sleep_ms`.
    let config = BoardConfig::new(1, 1).with_seed(8).with_timing(TimingConfig {
        min_sleep_ms: 1_000,
        per_cell_sleep_ms: 1,
        min_active_ms: 50,
        max_active_ms: 51,
    });
    let mut board = Board::with_config(config).unwrap();
    let (sink, events) = EventBus::unbounded();
    board.start(Arc::new(sink)).unwrap();
    let wait = Duration::from_secs(3);

    assert_eq!(events.recv_timeout(wait), Some(MoleEvent::Activated(0)));
    let inside = now_millis();
    assert_eq!(events.recv_timeout(wait), Some(MoleEvent::Deactivated(0)));

    // Mole is down; the click is only recorded.
    board.hit(0, inside).unwrap();
    assert!(!board.is_active(0));
    assert_eq!(events.recv_timeout(wait), Some(MoleEvent::Hit(0)));
    assert_eq!(events.recv_timeout(wait), Some(MoleEvent::Activated(0)));

    assert_eq!(events.recv_timeout(wait), Some(MoleEvent::Deactivated(0)));
    // The window ran its full length, so now is at or past its end.
    let at_end = now_millis();
    board.hit(0, at_end).unwrap();
    assert_eq!(events.recv_timeout(wait), Some(MoleEvent::Activated(0)));

    board.stop().unwrap();
    assert!(board.join(Duration::from_secs(2)));
    let rest = events.drain();
    assert!(!rest.contains(&MoleEvent::Hit(0)));
}
