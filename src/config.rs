use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::schedule::SchedulerSettings;
use crate::sports::{SeasonWindow, Sport, SportCatalog};

/// Longest accepted gap between two season reconciliation passes.
const MAX_SEASON_CHECK_INTERVAL_HOURS: u64 = 24 * 30;

/// Season-aware live scoreboard poller
#[derive(Parser, Debug, Clone)]
#[command(name = "season-scores", version, about)]
pub struct Config {
    /// Query API listen address
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: String,

    /// Scoreboard site base URL
    #[arg(long, env = "SCOREBOARD_BASE_URL", default_value = "https://www.espn.com")]
    pub base_url: String,

    /// Sports to serve, comma separated (MLB, NBA, NFL, NCAAM, NCAAF, NHL)
    #[arg(long, env = "SPORTS", value_delimiter = ',', default_value = "MLB")]
    pub sports: Vec<Sport>,

    /// Season window overrides, e.g. "NBA=10-01..06-30" or "NFL=off"
    #[arg(long = "season", env = "SEASON_WINDOWS", value_delimiter = ',')]
    pub seasons: Vec<SeasonOverride>,

    /// Seconds between two scoreboard fetches for the same sport
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "30")]
    pub poll_interval_secs: u64,

    /// Give up on a single fetch after this many seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value = "25")]
    pub fetch_timeout_secs: u64,

    /// Hours between two season reconciliation passes
    #[arg(long, env = "SEASON_CHECK_INTERVAL_HOURS", default_value = "24")]
    pub season_check_interval_hours: u64,
}

/// `SPORT=MM-DD..MM-DD` replaces a sport's season window; `SPORT=off` removes
/// it so the sport is served but never polled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonOverride {
    pub sport: Sport,
    pub window: Option<SeasonWindow>,
}

impl FromStr for SeasonOverride {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sport, window) = s
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidWindow(s.to_string()))?;
        let window = match window.trim() {
            w if w.eq_ignore_ascii_case("off") => None,
            w => Some(w.parse()?),
        };
        Ok(SeasonOverride {
            sport: sport.parse()?,
            window,
        })
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_addr
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid listen address '{}'", self.listen_addr))?;
        Url::parse(&self.base_url)
            .with_context(|| format!("invalid scoreboard base URL '{}'", self.base_url))?;
        if self.sports.is_empty() {
            anyhow::bail!("at least one sport must be configured");
        }
        for o in &self.seasons {
            if !self.sports.contains(&o.sport) {
                anyhow::bail!("season override for {} but it is not in --sports", o.sport);
            }
        }
        let max_poll_secs = SchedulerSettings::MAX_POLL_INTERVAL.as_secs();
        if self.poll_interval_secs == 0 || self.poll_interval_secs > max_poll_secs {
            anyhow::bail!("poll_interval_secs must be between 1 and {}", max_poll_secs);
        }
        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > max_poll_secs {
            anyhow::bail!("fetch_timeout_secs must be between 1 and {}", max_poll_secs);
        }
        if self.season_check_interval_hours == 0
            || self.season_check_interval_hours > MAX_SEASON_CHECK_INTERVAL_HOURS
        {
            anyhow::bail!(
                "season_check_interval_hours must be between 1 and {}",
                MAX_SEASON_CHECK_INTERVAL_HOURS
            );
        }
        Ok(())
    }

    /// Built-in table for the selected sports with overrides applied.
    pub fn catalog(&self) -> anyhow::Result<SportCatalog> {
        let base_url = Url::parse(&self.base_url)
            .with_context(|| format!("invalid scoreboard base URL '{}'", self.base_url))?;
        let mut catalog = SportCatalog::with_defaults(base_url, &self.sports);
        for o in &self.seasons {
            if let Some(config) = catalog.get_mut(o.sport) {
                config.window = o.window;
            }
        }
        Ok(catalog)
    }

    pub fn scheduler_settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
        }
    }

    pub fn season_check_interval(&self) -> Duration {
        Duration::from_secs(self.season_check_interval_hours.saturating_mul(3600))
    }
}
