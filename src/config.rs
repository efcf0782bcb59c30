use std::env;
use std::time::Duration;

use crate::errors::{MatchError, MatchResult};
use crate::state::DEFAULT_TURN_LIMIT;

pub const DEFAULT_DISCONNECT_GRACE: Duration = Duration::from_secs(60);
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(30);

const GRACE_VAR: &str = "NOVUS_DISCONNECT_GRACE_SECS";
const INACTIVITY_VAR: &str = "NOVUS_INACTIVITY_SECS";
const TURN_LIMIT_VAR: &str = "NOVUS_TURN_LIMIT";

/// Timer and rules settings shared by every match a registry creates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchConfig {
    pub disconnect_grace: Duration,
    pub inactivity_timeout: Duration,
    pub turn_limit: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            disconnect_grace: DEFAULT_DISCONNECT_GRACE,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
            turn_limit: DEFAULT_TURN_LIMIT,
        }
    }
}

impl MatchConfig {
    /// Defaults overridden by any of the `NOVUS_*` environment variables
    pub fn from_env() -> MatchResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> MatchResult<Self> {
        let mut config = MatchConfig::default();
        if let Some(secs) = parse_var::<u64>(&lookup, GRACE_VAR)? {
            config.disconnect_grace = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, INACTIVITY_VAR)? {
            config.inactivity_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = parse_var::<u32>(&lookup, TURN_LIMIT_VAR)? {
            if limit == 0 {
                return Err(MatchError::configuration(format!("{TURN_LIMIT_VAR} must be positive")));
            }
            config.turn_limit = limit;
        }
        log::debug!("Match config: {:?}", config);
        Ok(config)
    }

    pub fn with_disconnect_grace(mut self, grace: Duration) -> Self {
        self.disconnect_grace = grace;
        self
    }

    pub fn with_inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    pub fn with_turn_limit(mut self, turn_limit: u32) -> Self {
        self.turn_limit = turn_limit;
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> MatchResult<Option<T>> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| MatchError::configuration(format!("{key}={raw:?} is not a valid number"))),
    }
}
