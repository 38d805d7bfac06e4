use std::sync::mpsc::Sender;
use std::thread;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use crate::http_client::http_client;
use crate::state::{Delta, PlayerStats, StatRequest};
use crate::team_fetch::reference_api_base;

/// The stats payload nests the season numbers as
/// `[0].splits[0].stat.{batting_average, home_runs}`.
pub fn parse_hitting_stats_json(raw: &str) -> Result<PlayerStats> {
    let root: Value = serde_json::from_str(raw).context("invalid stats json")?;
    let stat = root
        .get(0)
        .and_then(|group| group.get("splits"))
        .and_then(|splits| splits.get(0))
        .and_then(|split| split.get("stat"))
        .ok_or_else(|| anyhow!("no season split in stats payload"))?;

    let batting_average =
        number_field(stat, "batting_average").ok_or_else(|| anyhow!("missing batting_average"))?;
    let home_runs =
        number_field(stat, "home_runs").ok_or_else(|| anyhow!("missing home_runs"))? as i64;

    Ok(PlayerStats {
        batting_average,
        home_runs,
    })
}

// The reference API serializes some numerics as strings.
fn number_field(stat: &Value, key: &str) -> Option<f64> {
    match stat.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn fetch_hitting_stats(player_id: &str) -> Result<PlayerStats> {
    let client = http_client()?;
    let url = format!(
        "{}/v2/stats?type=season&season=current&group=hitting&playerId={player_id}",
        reference_api_base()
    );
    let body = client
        .get(&url)
        .send()
        .context("stats request failed")?
        .error_for_status()
        .context("stats request rejected")?
        .text()
        .context("failed reading stats body")?;
    parse_hitting_stats_json(&body)
}

/// Fire-and-forget: one thread per batter change. The result carries the
/// player id it was fetched for and goes back over the delta channel; the
/// render loop decides whether it still applies. In-flight fetches are
/// never cancelled when superseded.
pub fn spawn_stats_fetch(tx: Sender<Delta>, request: StatRequest) {
    thread::spawn(move || match fetch_hitting_stats(&request.player_id) {
        Ok(stats) => {
            let _ = tx.send(Delta::SetPlayerStats {
                player_id: request.player_id,
                stats,
            });
        }
        Err(err) => {
            // No retry; the panel keeps whatever it was showing.
            let _ = tx.send(Delta::Log(format!(
                "[WARN] Hitting stats fetch failed for {}: {err}",
                request.player_name
            )));
        }
    });
}
