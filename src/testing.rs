//! Fakes shared by the unit tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::schedule::Clock;
use crate::scores::{ScoreFetcher, ScoreSnapshot};
use crate::sports::Sport;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Clock whose date only moves when a test says so.
pub struct FixedClock(Mutex<NaiveDate>);

impl FixedClock {
    pub fn new(today: NaiveDate) -> Self {
        FixedClock(Mutex::new(today))
    }

    pub fn set(&self, today: NaiveDate) {
        *self.0.lock().unwrap() = today;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.0.lock().unwrap()
    }
}

/// Fetcher that counts calls and can be told to fail, return nothing, or take
/// a while. Successful payloads are `{"call": n}` with `n` the global call
/// number.
#[derive(Default)]
pub struct ScriptedFetcher {
    delay: Duration,
    calls: AtomicUsize,
    per_sport: Mutex<HashMap<Sport, usize>>,
    failing: AtomicBool,
    empty: AtomicBool,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        ScriptedFetcher {
            delay,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, sport: Sport) -> usize {
        self.per_sport.lock().unwrap().get(&sport).copied().unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_empty(&self, empty: bool) {
        self.empty.store(empty, Ordering::SeqCst);
    }
}

#[async_trait]
impl ScoreFetcher for ScriptedFetcher {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, _url: &Url, sport: Sport) -> Result<ScoreSnapshot> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.per_sport.lock().unwrap().entry(sport).or_default() += 1;

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("scripted failure on call {}", n);
        }
        if self.empty.load(Ordering::SeqCst) {
            return Ok(ScoreSnapshot::new(sport, Value::Null));
        }
        Ok(ScoreSnapshot::new(sport, json!({ "call": n })))
    }
}
