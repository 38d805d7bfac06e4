use serde::Deserialize;

use crate::state::{Count, GameSummary, LiveEvent, ScheduleSnapshot};
use crate::stream::StreamError;

#[derive(Debug, Deserialize)]
struct StreamPayload {
    value: StreamValue,
}

#[derive(Debug, Deserialize)]
struct StreamValue {
    games: StreamGames,
}

#[derive(Debug, Deserialize)]
struct StreamGames {
    #[serde(default)]
    schedule: Vec<WireGame>,
    sim: WireSim,
}

#[derive(Debug, Deserialize)]
struct WireSim {
    day: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireGame {
    away_team_name: String,
    home_team_name: String,
    play_count: i64,
    #[serde(default)]
    last_update: String,
    #[serde(default)]
    bases_occupied: Vec<u8>,
    #[serde(default)]
    base_runners: Vec<String>,
    #[serde(default)]
    base_runner_names: Vec<String>,
    inning: i64,
    top_of_inning: bool,
    away_batter: Option<String>,
    away_batter_name: Option<String>,
    home_batter: Option<String>,
    home_batter_name: Option<String>,
    #[serde(default)]
    at_bat_balls: u8,
    #[serde(default)]
    at_bat_strikes: u8,
    #[serde(default)]
    half_inning_outs: u8,
    weather: i64,
}

/// What one well-formed payload yields: the whole day's schedule plus the
/// candidate event for the watched game. Novelty is not decided here.
#[derive(Debug, Clone)]
pub struct StreamUpdate {
    pub schedule: ScheduleSnapshot,
    pub event: LiveEvent,
}

/// Decodes one stream payload. The schedule is extracted unconditionally;
/// the event comes from the element at `watched_index`. An index with no
/// game is malformed, not a reason to guess.
pub fn parse_stream_payload(raw: &str, watched_index: usize) -> Result<StreamUpdate, StreamError> {
    let payload: StreamPayload = serde_json::from_str(raw)
        .map_err(|err| StreamError::Malformed(format!("invalid stream json: {err}")))?;
    let games = payload.value.games;

    let schedule = ScheduleSnapshot {
        day_id: games.sim.day,
        games: games
            .schedule
            .iter()
            .map(|game| GameSummary {
                away_team_name: game.away_team_name.clone(),
                home_team_name: game.home_team_name.clone(),
            })
            .collect(),
    };

    let Some(item) = games.schedule.into_iter().nth(watched_index) else {
        return Err(StreamError::Malformed(format!(
            "watched game index {watched_index} out of range ({} games)",
            schedule.games.len()
        )));
    };

    let event = LiveEvent {
        sequence: item.play_count,
        narrative_text: item.last_update,
        bases_occupied: item.bases_occupied,
        baserunner_ids: item.base_runners,
        baserunner_names: item.base_runner_names,
        inning_number: item.inning + 1, // wire innings are zero-based
        is_top_half: item.top_of_inning,
        count: Count {
            balls: item.at_bat_balls,
            strikes: item.at_bat_strikes,
            outs: item.half_inning_outs,
        },
        weather_code: item.weather,
        away_batter_id: opt_id(item.away_batter),
        away_batter_name: opt_id(item.away_batter_name),
        home_batter_id: opt_id(item.home_batter),
        home_batter_name: opt_id(item.home_batter_name),
    };

    Ok(StreamUpdate { schedule, event })
}

// The feed uses both null and "" for "no batter".
fn opt_id(raw: Option<String>) -> Option<String> {
    raw.filter(|value| !value.trim().is_empty())
}
