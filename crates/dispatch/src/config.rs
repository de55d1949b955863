//! Engine tuning knobs, read from the environment with named defaults.

use std::time::Duration;

use shiftline_core::prioritizer::DEFAULT_MAX_MATCH_DISTANCE_METERS;

/// Default number of contacts per campaign batch.
const DEFAULT_BATCH_SIZE: usize = 50;

/// Default delay between batches: a deliberate throttle that respects
/// provider rate limits and lets early replies shrink later batches.
const DEFAULT_BATCH_DELAY_SECS: u64 = 900;

/// Default grace period before an unconfirmed push falls back to SMS.
const DEFAULT_PUSH_FALLBACK_GRACE_SECS: u64 = 600;

/// Default bounded wait for the per-account ledger lock.
const DEFAULT_ACCOUNT_LOCK_WAIT_MS: u64 = 5_000;

/// Runtime configuration for the dispatch engine.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub push_fallback_grace: Duration,
    pub max_match_distance_meters: f64,
    pub account_lock_wait: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: Duration::from_secs(DEFAULT_BATCH_DELAY_SECS),
            push_fallback_grace: Duration::from_secs(DEFAULT_PUSH_FALLBACK_GRACE_SECS),
            max_match_distance_meters: DEFAULT_MAX_MATCH_DISTANCE_METERS,
            account_lock_wait: Duration::from_millis(DEFAULT_ACCOUNT_LOCK_WAIT_MS),
        }
    }
}

impl DispatchConfig {
    /// Build a config from `SHIFTLINE_*` environment variables, falling back
    /// to the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: env_parse("SHIFTLINE_BATCH_SIZE", defaults.batch_size),
            batch_delay: Duration::from_secs(env_parse(
                "SHIFTLINE_BATCH_DELAY_SECS",
                defaults.batch_delay.as_secs(),
            )),
            push_fallback_grace: Duration::from_secs(env_parse(
                "SHIFTLINE_PUSH_GRACE_SECS",
                defaults.push_fallback_grace.as_secs(),
            )),
            max_match_distance_meters: env_parse(
                "SHIFTLINE_MAX_MATCH_DISTANCE_METERS",
                defaults.max_match_distance_meters,
            ),
            account_lock_wait: Duration::from_millis(env_parse(
                "SHIFTLINE_ACCOUNT_LOCK_WAIT_MS",
                defaults.account_lock_wait.as_millis() as u64,
            )),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DispatchConfig::default();
        assert!(config.batch_size > 0);
        assert!(config.batch_delay > Duration::ZERO);
        assert!(config.push_fallback_grace > Duration::ZERO);
        assert!(config.account_lock_wait > Duration::ZERO);
    }
}
