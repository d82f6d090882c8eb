use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use super::ScoreSnapshot;
use crate::sports::Sport;

/// One fetch-and-parse cycle against a sport's scoreboard.
#[async_trait]
pub trait ScoreFetcher: Send + Sync {
    /// Fetch the current scoreboard at `url` for `sport`.
    async fn fetch(&self, url: &Url, sport: Sport) -> Result<ScoreSnapshot>;

    /// Human-readable name for logging.
    fn name(&self) -> &str;
}
