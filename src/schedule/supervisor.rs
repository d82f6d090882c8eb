use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::clock::Clock;
use super::scheduler::{SportScheduler, StartOutcome};
use crate::sports::{SeasonCalendar, Sport, SportCatalog};

/// What a reconciliation pass decided for one sport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reconciliation {
    Started,
    Stopped,
    AlreadyActive,
    OutOfSeason,
    Excluded,
}

/// Brings the set of running loops in line with the season calendar.
pub struct SeasonSupervisor {
    sports: Vec<Sport>,
    calendar: SeasonCalendar,
    scheduler: SportScheduler,
    clock: Arc<dyn Clock>,
}

impl SeasonSupervisor {
    pub fn new(catalog: &SportCatalog, scheduler: SportScheduler, clock: Arc<dyn Clock>) -> Self {
        SeasonSupervisor {
            sports: catalog.sports().collect(),
            calendar: catalog.calendar(),
            scheduler,
            clock,
        }
    }

    /// Start every in-season sport that isn't running and stop every running
    /// sport that is out of season. Sports are handled independently.
    pub async fn reconcile(&self, today: NaiveDate) -> Vec<(Sport, Reconciliation)> {
        info!("[Season Check] Checking season status for all sports ({})", today);

        let mut report = Vec::with_capacity(self.sports.len());
        for &sport in &self.sports {
            let action = self.reconcile_sport(sport, today).await;
            report.push((sport, action));
        }
        report
    }

    async fn reconcile_sport(&self, sport: Sport, today: NaiveDate) -> Reconciliation {
        if let Some(reason) = self.scheduler.exclusion(sport) {
            warn!("[Season Check] {} skipped: {}", sport, reason);
            return Reconciliation::Excluded;
        }

        let in_season = self.calendar.is_in_season(sport, today);
        let active = self.scheduler.is_active(sport);

        match (in_season, active) {
            (true, false) => {
                info!("[Season Check] {} season has started", sport);
                match self.scheduler.start(sport).await {
                    StartOutcome::Started => Reconciliation::Started,
                    StartOutcome::AlreadyRunning => Reconciliation::AlreadyActive,
                    StartOutcome::OutOfSeason => Reconciliation::OutOfSeason,
                    StartOutcome::Excluded(reason) => {
                        warn!("[Season Check] {} skipped: {}", sport, reason);
                        Reconciliation::Excluded
                    }
                }
            }
            (false, true) => {
                info!("[Season Check] {} season has ended", sport);
                self.scheduler.stop(sport).await;
                Reconciliation::Stopped
            }
            (true, true) => {
                info!("[Season Check] {} is in season and active", sport);
                Reconciliation::AlreadyActive
            }
            (false, false) => {
                info!("[Season Check] {} is out of season", sport);
                Reconciliation::OutOfSeason
            }
        }
    }

    /// Reconcile against the clock's current date.
    pub async fn reconcile_now(&self) -> Vec<(Sport, Reconciliation)> {
        self.reconcile(self.clock.today()).await
    }

    /// Re-run reconciliation every `period`, starting one period from now.
    /// The caller is expected to have run the startup pass already.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!("[Schedule] Season checks will run every {:?}", period);
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.reconcile_now().await;
            }
        })
    }
}
