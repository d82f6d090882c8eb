//! Per-sport polling loops.
//!
//! Every schedulable sport owns exactly one [`ScheduleEntry`] for the lifetime
//! of the scheduler. `start` and `stop` serialize on that entry's lock, so a
//! sport can never have two live loops no matter how calls interleave.
//!
//! ```text
//!  start(sport) ──▶ immediate cycle ──▶ spawn loop ─┐
//!                                                   │ every poll_interval
//!        ┌──────────────────────────────────────────┘
//!        ▼
//!   in season? ──no──▶ stop(sport), loop exits
//!        │ yes
//!        ▼
//!   fetch (bounded by fetch_timeout) ──ok──▶ ScoreCache::put
//!        │ err
//!        ▼
//!   log, keep last snapshot, wait for next tick
//! ```
//!
//! A loop runs its cycle inline between ticks, so fetches for one sport never
//! overlap and cache writes per sport stay totally ordered. Ticks that fall
//! due while a slow fetch is still running are skipped, not queued.
//!
//! `stop` leaves the cancelled loop's handle in the entry and the next `start`
//! waits for it before fetching, so a stop/start pair never puts two fetches
//! for the same sport in flight.

use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use url::Url;

use super::clock::Clock;
use crate::error::{ConfigError, FetchError};
use crate::scores::{ScoreCache, ScoreFetcher, ScoreSnapshot};
use crate::sports::{SeasonCalendar, Sport, SportCatalog};

/// Timing knobs for the polling loops.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Time between two cycles of the same sport.
    pub poll_interval: Duration,
    /// Upper bound on a single fetch; hitting it counts as a failed cycle.
    pub fetch_timeout: Duration,
}

impl SchedulerSettings {
    /// Longest accepted poll interval.
    pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(24 * 3600);
    const MIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

    /// Clamp the poll interval so the loop timer can always be armed.
    fn bounded(self) -> Self {
        SchedulerSettings {
            poll_interval: self
                .poll_interval
                .clamp(Self::MIN_POLL_INTERVAL, Self::MAX_POLL_INTERVAL),
            ..self
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        SchedulerSettings {
            poll_interval: Duration::from_secs(30),
            fetch_timeout: Duration::from_secs(25),
        }
    }
}

/// What a call to [`SportScheduler::start`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// The immediate cycle found the sport out of season; no loop was spawned.
    OutOfSeason,
    Excluded(ConfigError),
}

/// Runtime record for one sport.
#[derive(Debug)]
pub struct ScheduleEntry {
    pub sport: Sport,
    cancel: Option<CancelHandle>,
    /// Last stopped loop, possibly still finishing a fetch.
    stopping: Option<JoinHandle<()>>,
}

/// Handle to a running loop. Each loop gets a fresh generation so a loop
/// that is on its way out can never stop its successor.
#[derive(Debug)]
struct CancelHandle {
    generation: u64,
    cancel: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl CancelHandle {
    fn cancel(self) -> JoinHandle<()> {
        // The loop may already have exited and dropped its receiver.
        let _ = self.cancel.send(true);
        self.task
    }
}

impl ScheduleEntry {
    fn new(sport: Sport) -> Self {
        ScheduleEntry {
            sport,
            cancel: None,
            stopping: None,
        }
    }
}

struct Slot {
    url: Url,
    /// Mirrors `entry.cancel.is_some()`. Only written with `entry` locked, read
    /// without it so status queries never wait behind a fetch.
    running: AtomicBool,
    entry: Mutex<ScheduleEntry>,
}

impl Slot {
    fn take_handle(&self, entry: &mut ScheduleEntry) -> Option<CancelHandle> {
        self.running.store(false, Ordering::Release);
        entry.cancel.take()
    }
}

enum Cycle {
    Updated,
    Failed,
    OutOfSeason,
}

struct Inner {
    fetcher: Arc<dyn ScoreFetcher>,
    cache: ScoreCache,
    calendar: SeasonCalendar,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    slots: HashMap<Sport, Slot>,
    excluded: HashMap<Sport, ConfigError>,
    next_generation: AtomicU64,
}

/// Owns one polling loop per in-season sport.
#[derive(Clone)]
pub struct SportScheduler {
    inner: Arc<Inner>,
}

impl SportScheduler {
    pub fn new(
        catalog: &SportCatalog,
        fetcher: Arc<dyn ScoreFetcher>,
        cache: ScoreCache,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        let bounded = settings.bounded();
        if bounded.poll_interval != settings.poll_interval {
            warn!(
                "[Schedule] Poll interval {:?} out of range, using {:?}",
                settings.poll_interval, bounded.poll_interval
            );
        }
        let settings = bounded;

        let mut slots = HashMap::new();
        let mut excluded = HashMap::new();
        for sport in catalog.sports() {
            match catalog.schedulable(sport) {
                Ok((url, _)) => {
                    slots.insert(
                        sport,
                        Slot {
                            url,
                            running: AtomicBool::new(false),
                            entry: Mutex::new(ScheduleEntry::new(sport)),
                        },
                    );
                }
                Err(e) => {
                    warn!("[Schedule] {} excluded from scheduling: {}", sport, e);
                    excluded.insert(sport, e);
                }
            }
        }

        info!(
            "[Schedule] {} sport(s) schedulable via {}, poll interval {:?}",
            slots.len(),
            fetcher.name(),
            settings.poll_interval
        );

        SportScheduler {
            inner: Arc::new(Inner {
                fetcher,
                cache,
                calendar: catalog.calendar(),
                clock,
                settings,
                slots,
                excluded,
                next_generation: AtomicU64::new(0),
            }),
        }
    }

    /// Why `sport` can't be scheduled, if it can't.
    pub fn exclusion(&self, sport: Sport) -> Option<ConfigError> {
        if self.inner.slots.contains_key(&sport) {
            return None;
        }
        Some(
            self.inner
                .excluded
                .get(&sport)
                .cloned()
                .unwrap_or(ConfigError::NotConfigured(sport)),
        )
    }

    /// Begin polling `sport`: one cycle right away, then one per interval.
    /// Does nothing if the sport is already being polled.
    pub async fn start(&self, sport: Sport) -> StartOutcome {
        let Some(slot) = self.inner.slots.get(&sport) else {
            let reason = self.exclusion(sport).unwrap_or(ConfigError::NotConfigured(sport));
            warn!("[Schedule] Not starting {}: {}", sport, reason);
            return StartOutcome::Excluded(reason);
        };

        // Held across the first cycle so a concurrent start waits and then
        // sees `running`.
        let mut entry = slot.entry.lock().await;
        if slot.running.load(Ordering::Acquire) {
            info!("[Schedule] {} polling already active", sport);
            return StartOutcome::AlreadyRunning;
        }

        if let Some(previous) = entry.stopping.take() {
            debug!("[Schedule] Waiting for previous {} loop to finish", sport);
            if let Err(e) = previous.await {
                error!("[Schedule] Previous {} polling task ended abnormally: {}", sport, e);
            }
        }

        if let Cycle::OutOfSeason = self.inner.run_cycle(sport, &slot.url).await {
            return StartOutcome::OutOfSeason;
        }

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(
            Arc::clone(&self.inner),
            sport,
            generation,
            cancel_rx,
        ));

        entry.cancel = Some(CancelHandle {
            generation,
            cancel: cancel_tx,
            task,
        });
        slot.running.store(true, Ordering::Release);

        info!(
            "[Schedule] Started polling {} every {:?} (in season)",
            sport, self.inner.settings.poll_interval
        );
        StartOutcome::Started
    }

    /// Stop polling `sport`. Returns whether a loop was running.
    ///
    /// A fetch already in flight is allowed to finish and write its result;
    /// the timer never fires again after this returns. A later `start` waits
    /// for that fetch before running its own.
    pub async fn stop(&self, sport: Sport) -> bool {
        let Some(slot) = self.inner.slots.get(&sport) else {
            return false;
        };
        let mut entry = slot.entry.lock().await;
        match slot.take_handle(&mut entry) {
            Some(handle) => {
                entry.stopping = Some(handle.cancel());
                info!("[Schedule] Stopped polling {}", entry.sport);
                true
            }
            None => false,
        }
    }

    /// Never waits on a cycle in progress.
    pub fn is_active(&self, sport: Sport) -> bool {
        self.inner
            .slots
            .get(&sport)
            .is_some_and(|slot| slot.running.load(Ordering::Acquire))
    }

    /// Sports with a live loop, in a stable order.
    pub fn active_sports(&self) -> Vec<Sport> {
        let mut active: Vec<Sport> = self
            .inner
            .slots
            .iter()
            .filter(|(_, slot)| slot.running.load(Ordering::Acquire))
            .map(|(sport, _)| *sport)
            .collect();
        active.sort();
        active
    }

    /// Stop every loop and wait for in-flight cycles to finish.
    pub async fn shutdown(&self) {
        let mut tasks = Vec::new();
        for (sport, slot) in &self.inner.slots {
            let mut entry = slot.entry.lock().await;
            if let Some(handle) = slot.take_handle(&mut entry) {
                info!("[Schedule] Stopping {} for shutdown", sport);
                tasks.push(handle.cancel());
            }
            tasks.extend(entry.stopping.take());
        }

        for result in join_all(tasks).await {
            if let Err(e) = result {
                error!("[Schedule] Polling task ended abnormally: {}", e);
            }
        }
        info!("[Schedule] All polling loops stopped");
    }
}

impl Inner {
    /// One tick: season check, then fetch and cache.
    async fn run_cycle(&self, sport: Sport, url: &Url) -> Cycle {
        if !self.calendar.is_in_season(sport, self.clock.today()) {
            info!("[Season Check] {} is out of season, stopping polling", sport);
            return Cycle::OutOfSeason;
        }

        match self.fetch(sport, url).await {
            Ok(snapshot) => {
                self.cache.put(sport, snapshot).await;
                Cycle::Updated
            }
            Err(e) => {
                warn!("[Schedule] {} fetch failed, keeping last snapshot: {}", sport, e);
                Cycle::Failed
            }
        }
    }

    async fn fetch(&self, sport: Sport, url: &Url) -> Result<ScoreSnapshot, FetchError> {
        let timeout = self.settings.fetch_timeout;
        let snapshot = tokio::time::timeout(timeout, self.fetcher.fetch(url, sport))
            .await
            .map_err(|_| FetchError::Timeout(timeout))??;

        if snapshot.sport != sport {
            return Err(FetchError::Malformed(format!(
                "asked for {} but got a {} snapshot",
                sport, snapshot.sport
            )));
        }
        if snapshot.is_empty() {
            return Err(FetchError::Malformed("empty payload".into()));
        }
        Ok(snapshot)
    }

    /// Self-stop from inside a loop. Only clears the entry if it still
    /// belongs to that loop's generation.
    async fn stop_generation(
        &self,
        sport: Sport,
        generation: u64,
        cancel: &mut watch::Receiver<bool>,
    ) {
        let Some(slot) = self.slots.get(&sport) else {
            return;
        };
        // Once cancelled the entry belongs to someone else, and a `start`
        // holding the lock may be waiting for this task to exit.
        let mut entry = tokio::select! {
            biased;
            _ = cancel.changed() => return,
            entry = slot.entry.lock() => entry,
        };
        let owned = entry
            .cancel
            .as_ref()
            .is_some_and(|h| h.generation == generation);
        if owned {
            if let Some(handle) = slot.take_handle(&mut entry) {
                // Dropping our own JoinHandle detaches; the task is this one.
                drop(handle.cancel());
            }
            info!("[Schedule] Stopped polling {}", sport);
        }
    }
}

async fn poll_loop(
    inner: Arc<Inner>,
    sport: Sport,
    generation: u64,
    mut cancel: watch::Receiver<bool>,
) {
    let Some(url) = inner.slots.get(&sport).map(|s| s.url.clone()) else {
        return;
    };
    let period = inner.settings.poll_interval;
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            // Err means the handle was dropped, which is also a stop.
            _ = cancel.changed() => break,
            _ = interval.tick() => {}
        }
        if *cancel.borrow() {
            break;
        }

        if let Cycle::OutOfSeason = inner.run_cycle(sport, &url).await {
            inner.stop_generation(sport, generation, &mut cancel).await;
            break;
        }
    }

    debug!("[Schedule] {} polling loop (generation {}) exited", sport, generation);
}
