use std::sync::Arc;
use std::thread;

use blaseball_terminal::state::{Count, GameSummary, LiveEvent, ScheduleSnapshot};
use blaseball_terminal::stream::FrameBuffer;
use blaseball_terminal::sync::{SequenceGate, SharedState};

fn event(sequence: i64) -> LiveEvent {
    LiveEvent {
        sequence,
        narrative_text: format!("play {sequence}"),
        bases_occupied: Vec::new(),
        baserunner_ids: Vec::new(),
        baserunner_names: Vec::new(),
        inning_number: 1,
        is_top_half: true,
        count: Count {
            balls: 0,
            strikes: 0,
            outs: 0,
        },
        weather_code: 7,
        away_batter_id: None,
        away_batter_name: None,
        home_batter_id: None,
        home_batter_name: None,
    }
}

fn schedule(day_id: i64) -> ScheduleSnapshot {
    ScheduleSnapshot {
        day_id,
        games: vec![GameSummary {
            away_team_name: "Away".to_string(),
            home_team_name: "Home".to_string(),
        }],
    }
}

#[test]
fn sequence_gate_admits_each_sequence_once() {
    let mut gate = SequenceGate::new();
    assert!(gate.admit(5));
    assert!(!gate.admit(5));
    assert!(gate.admit(6));
    assert!(!gate.admit(6));
}

#[test]
fn sequence_gate_checks_equality_not_ordering() {
    let mut gate = SequenceGate::new();
    assert!(gate.admit(10));
    // Out-of-order delivery is not detected; only exact repeats are dropped.
    assert!(gate.admit(4));
    assert!(gate.admit(10));
}

#[test]
fn publish_event_is_last_write_wins() {
    let shared = SharedState::new();
    shared.publish_event(event(1));
    shared.publish_event(event(2));

    let taken = shared.take_event().expect("a pending event");
    assert_eq!(taken.sequence, 2, "the overwritten event is never observed");
    assert!(shared.take_event().is_none(), "take clears the cell");
}

#[test]
fn publish_schedule_is_last_write_wins() {
    let shared = SharedState::new();
    shared.publish_schedule(schedule(1));
    shared.publish_schedule(schedule(2));

    let taken = shared.take_schedule().expect("a pending schedule");
    assert_eq!(taken.day_id, 2);
    assert!(shared.take_schedule().is_none());
}

#[test]
fn schedule_and_event_cells_are_independent() {
    let shared = SharedState::new();
    shared.publish_schedule(schedule(1));
    shared.publish_event(event(7));

    assert!(shared.take_event().is_some());
    assert!(
        shared.take_schedule().is_some(),
        "taking one kind must not clear the other"
    );
}

#[test]
fn concurrent_publish_and_take_never_tears_or_regresses() {
    let shared = Arc::new(SharedState::new());
    let producer = {
        let shared = Arc::clone(&shared);
        thread::spawn(move || {
            for seq in 1..=500 {
                shared.publish_event(event(seq));
            }
        })
    };

    let mut seen = Vec::new();
    while seen.last() != Some(&500) {
        match shared.take_event() {
            Some(event) => {
                // A whole-value swap means the fields always belong together.
                assert_eq!(event.narrative_text, format!("play {}", event.sequence));
                seen.push(event.sequence);
            }
            None => thread::yield_now(),
        }
    }
    producer.join().expect("producer thread panicked");
    assert!(
        seen.windows(2).all(|pair| pair[0] < pair[1]),
        "coalescing only ever skips forward for an in-order producer"
    );
}

#[test]
fn frame_buffer_joins_data_lines_and_skips_noise() {
    let mut frames = FrameBuffer::new();
    assert_eq!(frames.push_line(": keepalive comment"), None);
    assert_eq!(frames.push_line("event: message"), None);
    assert_eq!(frames.push_line("data: {\"a\":"), None);
    assert_eq!(frames.push_line("data: 1}"), None);
    assert_eq!(frames.push_line(""), Some("{\"a\":\n1}".to_string()));
}

#[test]
fn frame_buffer_ignores_blank_lines_between_frames() {
    let mut frames = FrameBuffer::new();
    assert_eq!(frames.push_line(""), None);
    assert_eq!(frames.push_line("data:{\"b\":2}"), None);
    assert_eq!(frames.push_line(""), Some("{\"b\":2}".to_string()));
    assert_eq!(frames.push_line(""), None, "buffer is drained per frame");
}
