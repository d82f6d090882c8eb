//! In-memory store of the latest snapshot per sport.
//!
//! Each sport's polling loop is the only writer for its key; the query API
//! reads concurrently. Nothing expires: a snapshot stays until the next
//! successful fetch for that sport replaces it.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::ScoreSnapshot;
use crate::sports::Sport;

/// Thread-safe sport -> snapshot map.
#[derive(Clone, Default)]
pub struct ScoreCache {
    inner: Arc<RwLock<HashMap<Sport, ScoreSnapshot>>>,
}

impl ScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot for `sport` wholesale.
    pub async fn put(&self, sport: Sport, snapshot: ScoreSnapshot) {
        let mut inner = self.inner.write().await;
        inner.insert(sport, snapshot);
        debug!("ScoreCache: {} updated ({} sports cached)", sport, inner.len());
    }

    /// Last snapshot written for `sport`. Never fetches.
    pub async fn get(&self, sport: Sport) -> Option<ScoreSnapshot> {
        self.inner.read().await.get(&sport).cloned()
    }
}
