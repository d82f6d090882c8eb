pub mod season;

pub use season::{MonthDay, SeasonCalendar, SeasonWindow};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::ConfigError;

/// Leagues with a known scoreboard page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sport {
    Mlb,
    Nba,
    Nfl,
    Ncaam,
    Ncaaf,
    Nhl,
}

impl Sport {
    pub const ALL: [Sport; 6] = [
        Sport::Mlb,
        Sport::Nba,
        Sport::Nfl,
        Sport::Ncaam,
        Sport::Ncaaf,
        Sport::Nhl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Mlb => "MLB",
            Sport::Nba => "NBA",
            Sport::Nfl => "NFL",
            Sport::Ncaam => "NCAAM",
            Sport::Ncaaf => "NCAAF",
            Sport::Nhl => "NHL",
        }
    }

    /// Path segment of the league on the scoreboard site.
    pub fn url_segment(&self) -> &'static str {
        match self {
            Sport::Mlb => "mlb",
            Sport::Nba => "nba",
            Sport::Nfl => "nfl",
            Sport::Ncaam => "mens-college-basketball",
            Sport::Ncaaf => "college-football",
            Sport::Nhl => "nhl",
        }
    }

    /// Default season window, preseason through the final championship game.
    pub fn default_window(&self) -> SeasonWindow {
        let (start, end) = match self {
            Sport::Mlb => ((3, 20), (11, 1)),
            Sport::Nba => ((10, 15), (6, 30)),
            Sport::Nfl => ((9, 1), (2, 15)),
            Sport::Ncaam => ((11, 1), (4, 15)),
            Sport::Ncaaf => ((8, 15), (1, 15)),
            Sport::Nhl => ((9, 15), (6, 30)),
        };
        SeasonWindow::new(MonthDay::known(start.0, start.1), MonthDay::known(end.0, end.1))
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sport {
    type Err = ConfigError;

    /// Case-insensitive: "mlb", "MLB" and "Mlb" are the same sport.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Sport::ALL
            .into_iter()
            .find(|sport| sport.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ConfigError::UnknownSport(s.to_string()))
    }
}

/// Per-sport configuration. Either half may be missing, which keeps the sport
/// out of scheduling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SportConfig {
    pub url_path: Option<String>,
    pub window: Option<SeasonWindow>,
}

impl SportConfig {
    pub fn defaults(sport: Sport) -> Self {
        SportConfig {
            url_path: Some(sport.url_segment().to_string()),
            window: Some(sport.default_window()),
        }
    }
}

/// The configured sports and where their scoreboards live.
#[derive(Debug, Clone)]
pub struct SportCatalog {
    base_url: Url,
    sports: BTreeMap<Sport, SportConfig>,
}

impl SportCatalog {
    pub fn new(mut base_url: Url) -> Self {
        // Url::join replaces the last path segment unless the base ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        SportCatalog {
            base_url,
            sports: BTreeMap::new(),
        }
    }

    /// Catalog with the built-in URL segment and window for each sport.
    pub fn with_defaults(base_url: Url, sports: &[Sport]) -> Self {
        let mut catalog = SportCatalog::new(base_url);
        for &sport in sports {
            catalog.insert(sport, SportConfig::defaults(sport));
        }
        catalog
    }

    pub fn insert(&mut self, sport: Sport, config: SportConfig) {
        self.sports.insert(sport, config);
    }

    pub fn get(&self, sport: Sport) -> Option<&SportConfig> {
        self.sports.get(&sport)
    }

    pub fn get_mut(&mut self, sport: Sport) -> Option<&mut SportConfig> {
        self.sports.get_mut(&sport)
    }

    /// Configured sports in a stable order.
    pub fn sports(&self) -> impl Iterator<Item = Sport> + '_ {
        self.sports.keys().copied()
    }

    /// A sport is queryable once it has a scoreboard URL mapping.
    pub fn is_configured(&self, sport: Sport) -> bool {
        self.get(sport).is_some_and(|c| c.url_path.is_some())
    }

    pub fn scoreboard_url(&self, sport: Sport) -> Result<Url, ConfigError> {
        let path = self
            .get(sport)
            .ok_or(ConfigError::NotConfigured(sport))?
            .url_path
            .as_deref()
            .ok_or(ConfigError::MissingUrl(sport))?;
        self.base_url
            .join(&format!("{}/scoreboard", path.trim_matches('/')))
            .map_err(|_| ConfigError::MissingUrl(sport))
    }

    /// URL and window for a sport that can be scheduled, or the reason it
    /// cannot.
    pub fn schedulable(&self, sport: Sport) -> Result<(Url, SeasonWindow), ConfigError> {
        let url = self.scoreboard_url(sport)?;
        let window = self
            .get(sport)
            .and_then(|c| c.window)
            .ok_or(ConfigError::MissingWindow(sport))?;
        Ok((url, window))
    }

    pub fn calendar(&self) -> SeasonCalendar {
        SeasonCalendar::new(
            self.sports
                .iter()
                .filter_map(|(sport, config)| config.window.map(|w| (*sport, w))),
        )
    }
}
