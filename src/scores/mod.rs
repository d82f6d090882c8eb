pub mod cache;
pub mod espn;
pub mod fetcher;

pub use cache::ScoreCache;
pub use espn::EspnScoreboard;
pub use fetcher::ScoreFetcher;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::sports::Sport;

/// Latest scoreboard state for one sport. The payload is opaque to the
/// scheduler; it is stored and served exactly as the fetcher produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSnapshot {
    pub sport: Sport,
    pub captured_at: DateTime<Utc>,
    pub data: Value,
}

impl ScoreSnapshot {
    pub fn new(sport: Sport, data: Value) -> Self {
        ScoreSnapshot {
            sport,
            captured_at: Utc::now(),
            data,
        }
    }

    /// A payload with nothing in it is treated as a failed fetch, never cached.
    pub fn is_empty(&self) -> bool {
        match &self.data {
            Value::Null => true,
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}
