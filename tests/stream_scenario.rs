use serde_json::json;

use blaseball_terminal::state::{
    AppState, StatRequest, apply_live_event, apply_schedule, inning_label,
};
use blaseball_terminal::stream::{StreamError, handle_message};
use blaseball_terminal::sync::{SequenceGate, SharedState};

fn payload(day: i64, play_count: i64, away_batter: Option<&str>) -> String {
    json!({
        "value": {
            "games": {
                "sim": { "day": day },
                "schedule": [
                    {
                        "awayTeamName": "Hellmouth Sunbeams",
                        "homeTeamName": "Kansas City Breath Mints",
                        "playCount": play_count,
                        "lastUpdate": format!("Play {play_count} happened."),
                        "basesOccupied": [],
                        "baseRunners": [],
                        "baseRunnerNames": [],
                        "inning": 0,
                        "topOfInning": true,
                        "awayBatter": away_batter,
                        "awayBatterName": away_batter.map(|_| "Jessica Telephone"),
                        "homeBatter": null,
                        "homeBatterName": null,
                        "atBatBalls": 0,
                        "atBatStrikes": 0,
                        "halfInningOuts": 0,
                        "weather": 1
                    }
                ]
            }
        }
    })
    .to_string()
}

/// One render tick: drain the handoff cell in the contract's order.
fn render_tick(
    state: &mut AppState,
    shared: &SharedState,
    populations: &mut usize,
    applications: &mut Vec<i64>,
    launches: &mut Vec<StatRequest>,
) {
    if let Some(snapshot) = shared.take_schedule() {
        if apply_schedule(state, snapshot) {
            *populations += 1;
        }
    }
    if let Some(event) = shared.take_event() {
        applications.push(event.sequence);
        if let Some(request) = apply_live_event(state, event) {
            launches.push(request);
        }
    }
}

#[test]
fn out_of_range_index_leaves_shared_state_unmodified() {
    let shared = SharedState::new();
    let mut gate = SequenceGate::new();

    let err = handle_message(&payload(1, 5, Some("p1")), 3, &mut gate, &shared)
        .expect_err("index 3 has no game");
    assert!(matches!(err, StreamError::Malformed(_)));
    assert!(shared.take_schedule().is_none());
    assert!(shared.take_event().is_none());

    // The gate was not advanced either: the same play is still new later.
    handle_message(&payload(1, 5, Some("p1")), 0, &mut gate, &shared).expect("in range now");
    assert!(shared.take_event().is_some());
}

#[test]
fn duplicate_frames_render_once_and_fetch_once() {
    let shared = SharedState::new();
    let mut gate = SequenceGate::new();
    let mut state = AppState::new();
    let mut populations = 0;
    let mut applications = Vec::new();
    let mut launches = Vec::new();

    // Play 5, an identical redelivery, then play 6 with the same batter.
    for raw in [
        payload(1, 5, Some("p1")),
        payload(1, 5, Some("p1")),
        payload(1, 6, Some("p1")),
    ] {
        handle_message(&raw, 0, &mut gate, &shared).expect("well-formed frame");
        render_tick(
            &mut state,
            &shared,
            &mut populations,
            &mut applications,
            &mut launches,
        );
    }

    assert_eq!(applications, vec![5, 6], "the repeat is discarded");
    assert_eq!(populations, 1, "one day, one selector population");
    assert_eq!(launches.len(), 1, "batter never changed");
    assert_eq!(launches[0].player_id, "p1");

    let current = state.current.as_ref().expect("an applied event");
    assert_eq!(inning_label(current), "Top of 1");
    assert_eq!(state.plays.len(), 2);
    assert_eq!(state.games[0].label(), "Hellmouth Sunbeams at Kansas City Breath Mints");
}

#[test]
fn burst_between_ticks_coalesces_to_the_latest_event() {
    let shared = SharedState::new();
    let mut gate = SequenceGate::new();
    let mut state = AppState::new();
    let mut populations = 0;
    let mut applications = Vec::new();
    let mut launches = Vec::new();

    // Three frames land before the loop gets a tick in.
    for play in [7, 8, 9] {
        handle_message(&payload(2, play, None), 0, &mut gate, &shared).expect("well-formed frame");
    }
    render_tick(
        &mut state,
        &shared,
        &mut populations,
        &mut applications,
        &mut launches,
    );

    assert_eq!(applications, vec![9], "intermediate plays are skipped by design");
    assert!(launches.is_empty());
}
