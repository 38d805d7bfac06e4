use std::collections::{HashMap, VecDeque};

use chrono::Local;

use crate::stream::StreamPhase;

/// One game from the day's schedule, addressed by its position in the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameSummary {
    pub away_team_name: String,
    pub home_team_name: String,
}

impl GameSummary {
    pub fn label(&self) -> String {
        format!("{} at {}", self.away_team_name, self.home_team_name)
    }
}

/// One simulated day of games. Replaced wholesale when the day rolls over,
/// never mutated in place.
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub day_id: i64,
    pub games: Vec<GameSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Count {
    pub balls: u8,
    pub strikes: u8,
    pub outs: u8,
}

/// Latest known state of the watched game. Immutable once decoded; a newer
/// event fully replaces the old one.
#[derive(Debug, Clone)]
pub struct LiveEvent {
    /// Play count. Monotonic per game but used only for equality dedup.
    pub sequence: i64,
    pub narrative_text: String,
    /// Base indices currently held (0 = first base).
    pub bases_occupied: Vec<u8>,
    pub baserunner_ids: Vec<String>,
    pub baserunner_names: Vec<String>,
    /// 1-based; the wire value is zero-based.
    pub inning_number: i64,
    pub is_top_half: bool,
    pub count: Count,
    pub weather_code: i64,
    pub away_batter_id: Option<String>,
    pub away_batter_name: Option<String>,
    pub home_batter_id: Option<String>,
    pub home_batter_name: Option<String>,
}

impl LiveEvent {
    /// The player currently at the plate, if any. There is no batter while
    /// runners advance between at-bats.
    pub fn batter(&self) -> Option<(&str, &str)> {
        let (id, name) = if self.is_top_half {
            (&self.away_batter_id, &self.away_batter_name)
        } else {
            (&self.home_batter_id, &self.home_batter_name)
        };
        match (id, name) {
            (Some(id), Some(name)) => Some((id.as_str(), name.as_str())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerStats {
    pub batting_average: f64,
    pub home_runs: i64,
}

#[derive(Debug, Clone)]
pub struct TeamInfo {
    pub team_id: String,
    pub full_name: String,
    pub team_slogan: Option<String>,
    pub division: Option<String>,
}

/// Player-info panel contents. Stats arrive later than the name and may
/// never arrive at all.
#[derive(Debug, Clone)]
pub struct BatterPanel {
    pub player_id: String,
    pub player_name: String,
    pub stats: Option<PlayerStats>,
}

#[derive(Debug, Clone)]
pub struct PlayRow {
    pub sequence: i64,
    pub text: String,
}

/// Produced by the render loop when the batter changes; the caller owns the
/// actual fetch spawn so state application stays pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRequest {
    pub player_id: String,
    pub player_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Live,
    Teams,
}

/// Messages from background tasks to the render loop. All presentation
/// mutation happens on the loop; background threads only produce values.
#[derive(Debug, Clone)]
pub enum Delta {
    /// Active-team roster, keyed by full name (the schedule carries names,
    /// not ids).
    SetTeams(HashMap<String, TeamInfo>),
    SetPlayerStats {
        player_id: String,
        stats: PlayerStats,
    },
    StreamPhase {
        phase: StreamPhase,
        detail: Option<String>,
    },
    Log(String),
}

#[derive(Debug)]
pub struct AppState {
    pub screen: Screen,
    pub games: Vec<GameSummary>,
    pub selected_game: usize,
    /// Day whose schedule currently populates the selector.
    pub day: Option<i64>,
    pub current: Option<LiveEvent>,
    pub plays: VecDeque<PlayRow>,
    pub batter: Option<BatterPanel>,
    /// Batter id recorded at apply time, before any fetch returns, so a
    /// second event for the same batter does not launch another fetch.
    pub last_batter_id: Option<String>,
    pub teams: HashMap<String, TeamInfo>,
    pub stream_phase: StreamPhase,
    pub stream_detail: Option<String>,
    pub logs: VecDeque<String>,
    pub help_overlay: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self {
            screen: Screen::Live,
            games: Vec::new(),
            selected_game: 0,
            day: None,
            current: None,
            plays: VecDeque::with_capacity(64),
            batter: None,
            last_batter_id: None,
            teams: HashMap::new(),
            stream_phase: StreamPhase::Disconnected,
            stream_detail: None,
            logs: VecDeque::with_capacity(200),
            help_overlay: false,
        }
    }

    pub fn watched_game(&self) -> Option<&GameSummary> {
        self.games.get(self.selected_game)
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        let stamp = Local::now().format("%H:%M:%S");
        self.logs.push_back(format!("{stamp} {}", msg.into()));
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

/// Repopulates the game selector when the simulated day rolls over. Returns
/// true when the selector was rebuilt. Same-day snapshots are no-ops; the
/// stream only supports populating once per day.
pub fn apply_schedule(state: &mut AppState, snapshot: ScheduleSnapshot) -> bool {
    if state.day == Some(snapshot.day_id) {
        return false;
    }
    state.day = Some(snapshot.day_id);
    state.games = snapshot.games;
    if state.selected_game >= state.games.len() {
        state.selected_game = 0;
    }
    true
}

/// Applies one deduplicated event to the presentation state and reports the
/// stat fetch to launch when the batter changed.
pub fn apply_live_event(state: &mut AppState, event: LiveEvent) -> Option<StatRequest> {
    const MAX_PLAYS: usize = 200;
    state.plays.push_back(PlayRow {
        sequence: event.sequence,
        text: event.narrative_text.clone(),
    });
    while state.plays.len() > MAX_PLAYS {
        state.plays.pop_front();
    }

    let request = match event.batter() {
        Some((id, name)) if state.last_batter_id.as_deref() != Some(id) => {
            state.last_batter_id = Some(id.to_string());
            state.batter = Some(BatterPanel {
                player_id: id.to_string(),
                player_name: name.to_string(),
                stats: None,
            });
            Some(StatRequest {
                player_id: id.to_string(),
                player_name: name.to_string(),
            })
        }
        _ => None,
    };

    state.current = Some(event);
    request
}

pub fn apply_delta(state: &mut AppState, delta: Delta) {
    match delta {
        Delta::SetTeams(teams) => {
            state.push_log(format!("[INFO] Team roster loaded ({} active)", teams.len()));
            state.teams = teams;
        }
        Delta::SetPlayerStats { player_id, stats } => {
            // A fetch can outlive the at-bat that launched it; a result for
            // a batter who is no longer displayed is dropped.
            if let Some(panel) = &mut state.batter
                && panel.player_id == player_id
            {
                panel.stats = Some(stats);
            }
        }
        Delta::StreamPhase { phase, detail } => {
            match &detail {
                Some(detail) => state.push_log(format!("[WARN] Stream {}: {detail}", phase.label())),
                None => state.push_log(format!("[INFO] Stream {}", phase.label())),
            }
            state.stream_phase = phase;
            state.stream_detail = detail;
        }
        Delta::Log(msg) => state.push_log(msg),
    }
}

/// Mapping provided by SIBR:
/// https://github.com/Society-for-Internet-Blaseball-Research/blaseball-api-spec/blob/master/game-main.md
pub fn weather_name(code: i64) -> Option<&'static str> {
    Some(match code {
        0 => "Void",
        1 => "Sun 2",
        2 => "Overcast",
        3 => "Rainy",
        4 => "Sandstorm",
        5 => "Snowy",
        6 => "Acidic",
        7 => "Solar Eclipse",
        8 => "Glitter",
        9 => "Blooddrain",
        10 => "Peanuts",
        11 => "Lots of Birds",
        12 => "Feedback",
        13 => "Reverb",
        14 => "Black Hole",
        17 => "Coffee 3s",
        18 => "Flooding",
        _ => return None,
    })
}

pub fn weather_label(code: i64) -> String {
    format!("({code}) {}", weather_name(code).unwrap_or("(weather)"))
}

pub fn inning_label(event: &LiveEvent) -> String {
    let half = if event.is_top_half { "Top" } else { "Bot" };
    format!("{half} of {}", event.inning_number)
}

pub fn count_label(count: Count) -> String {
    format!("{}-{}. {} down.", count.balls, count.strikes, count.outs)
}

/// Runner i stands on `bases_occupied[i]`; the runner lists are positionally
/// aligned with the occupied-base list.
pub fn bases_lines(event: &LiveEvent) -> Vec<String> {
    event
        .bases_occupied
        .iter()
        .enumerate()
        .map(|(i, base)| {
            let name = event
                .baserunner_names
                .get(i)
                .map(String::as_str)
                .unwrap_or("(runner)");
            format!("{}B: {name}", base + 1)
        })
        .collect()
}
