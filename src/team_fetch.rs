use std::collections::HashMap;
use std::env;
use std::sync::mpsc::Sender;
use std::thread;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::http_client::http_client;
use crate::state::{Delta, TeamInfo};

const DEFAULT_REFERENCE_API: &str = "https://api.blaseball-reference.com";

pub fn reference_api_base() -> String {
    env::var("REFERENCE_API")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_REFERENCE_API.to_string())
}

#[derive(Debug, Deserialize)]
struct WireTeam {
    team_id: String,
    #[serde(default)]
    current_team_status: Option<String>,
    full_name: String,
    #[serde(default)]
    team_slogan: Option<String>,
    #[serde(default)]
    division: Option<String>,
}

/// Keyed by full name: the stream schedule carries team names, not ids.
/// Only active teams are kept.
pub fn parse_teams_json(raw: &str) -> Result<HashMap<String, TeamInfo>> {
    let teams: Vec<WireTeam> = serde_json::from_str(raw).context("invalid teams json")?;
    Ok(teams
        .into_iter()
        .filter(|team| team.current_team_status.as_deref() == Some("active"))
        .map(|team| {
            (
                team.full_name.clone(),
                TeamInfo {
                    team_id: team.team_id,
                    full_name: team.full_name,
                    team_slogan: team.team_slogan,
                    division: team.division,
                },
            )
        })
        .collect())
}

fn fetch_active_teams() -> Result<HashMap<String, TeamInfo>> {
    let client = http_client()?;
    let url = format!("{}/v2/teams?season=current", reference_api_base());
    let body = client
        .get(&url)
        .send()
        .context("teams request failed")?
        .error_for_status()
        .context("teams request rejected")?
        .text()
        .context("failed reading teams body")?;
    parse_teams_json(&body)
}

/// One-shot startup fetch; the roster does not change within a run. A miss
/// is a warning, not a failure: the UI renders placeholders.
pub fn spawn_team_fetch(tx: Sender<Delta>) {
    thread::spawn(move || match fetch_active_teams() {
        Ok(teams) => {
            let _ = tx.send(Delta::SetTeams(teams));
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Team roster fetch failed: {err}")));
        }
    });
}
