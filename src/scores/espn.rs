use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::fetcher::ScoreFetcher;
use super::ScoreSnapshot;
use crate::error::FetchError;
use crate::sports::Sport;

/// The scoreboard page ships its render state as a JSON literal assigned to
/// this global.
const STATE_MARKER: &str = "window['__espnfitt__']=";

/// Where the scoreboard lives inside the page state, newest layout first.
const SCOREBOARD_POINTERS: &[&str] = &["/page/content/scoreboard", "/page/content/events"];

/// Fetcher backed by the public ESPN scoreboard pages.
pub struct EspnScoreboard {
    http: Client,
}

impl EspnScoreboard {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .user_agent(concat!("season-scores/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(EspnScoreboard { http })
    }
}

#[async_trait]
impl ScoreFetcher for EspnScoreboard {
    fn name(&self) -> &str {
        "ESPN"
    }

    async fn fetch(&self, url: &Url, sport: Sport) -> Result<ScoreSnapshot> {
        debug!("Fetching {} scoreboard from {}", sport, url);

        let resp = self
            .http
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("{} scoreboard request failed", sport))?;

        if !resp.status().is_success() {
            anyhow::bail!("{} scoreboard error: {}", sport, resp.status());
        }

        let html = resp
            .text()
            .await
            .with_context(|| format!("Failed to read {} scoreboard body", sport))?;

        let data = extract_scoreboard(&html)?;
        Ok(ScoreSnapshot::new(sport, data))
    }
}

/// Pull the scoreboard subtree out of the page's embedded state.
fn extract_scoreboard(html: &str) -> Result<Value, FetchError> {
    let start = html
        .find(STATE_MARKER)
        .ok_or_else(|| FetchError::Malformed("embedded page state not found".into()))?
        + STATE_MARKER.len();
    let rest = &html[start..];
    let end = rest
        .find(";</script>")
        .ok_or_else(|| FetchError::Malformed("embedded page state is not terminated".into()))?;

    let state: Value = serde_json::from_str(&rest[..end])
        .map_err(|e| FetchError::Malformed(format!("embedded page state: {}", e)))?;

    SCOREBOARD_POINTERS
        .iter()
        .find_map(|p| state.pointer(p))
        .cloned()
        .ok_or_else(|| FetchError::Malformed("no scoreboard in page state".into()))
}
