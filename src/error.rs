use std::time::Duration;

use thiserror::Error;

use crate::sports::Sport;

/// Problems with the sport table. A sport carrying one of these is left out of
/// scheduling; none of them stop the process once it is running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown sport '{0}'")]
    UnknownSport(String),

    #[error("invalid month-day '{0}', expected MM-DD")]
    InvalidMonthDay(String),

    #[error("invalid season window '{0}', expected MM-DD..MM-DD or 'off'")]
    InvalidWindow(String),

    #[error("no season window configured for {0}")]
    MissingWindow(Sport),

    #[error("no scoreboard URL configured for {0}")]
    MissingUrl(Sport),

    #[error("{0} is not configured")]
    NotConfigured(Sport),
}

/// A single failed fetch cycle. Logged and retried on the next tick.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed scoreboard payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Upstream(#[from] anyhow::Error),
}
