use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

const REQUEST_TIMEOUT_SECS: u64 = 10;

static CLIENT: OnceCell<Client> = OnceCell::new();
static STREAM_CLIENT: OnceCell<Client> = OnceCell::new();

/// Client for the auxiliary reference-API lookups (teams, hitting stats).
pub fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

/// Client for the live event stream. The connection stays open for the whole
/// process lifetime, so no read timeout is set; only the connect phase is
/// bounded.
pub fn stream_client() -> Result<&'static Client> {
    STREAM_CLIENT.get_or_try_init(|| {
        Client::builder()
            .connect_timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build stream client")
    })
}
