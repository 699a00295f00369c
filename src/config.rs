//! Engine configuration
//!
//! Defaults mirror the pacing a chat user expects; every value can be
//! overridden from the environment.

use std::time::Duration;

const DEFAULT_PACING_ENV: &str = "STEPCHAT_DEFAULT_PACING_MS";
const MIN_STEP_DELAY_ENV: &str = "STEPCHAT_MIN_STEP_DELAY_MS";
const RESTART_DELAY_ENV: &str = "STEPCHAT_RESTART_DELAY_MS";

/// Timing knobs for the step player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Pacing used when a step declares no (or a zero) `delay`
    pub default_pacing: Duration,
    /// Lower bound applied to a declared `delay` before doubling it
    pub min_step_delay: Duration,
    /// Gap between clearing the ledgers and re-entering the initial step
    pub restart_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_pacing: Duration::from_millis(800),
            min_step_delay: Duration::ZERO,
            restart_delay: Duration::from_millis(50),
        }
    }
}

impl EngineConfig {
    /// Build a config from `STEPCHAT_*` environment variables.
    ///
    /// Missing or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |name: &str, fallback: Duration| {
            lookup(name)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map_or(fallback, Duration::from_millis)
        };
        Self {
            default_pacing: millis(DEFAULT_PACING_ENV, defaults.default_pacing),
            min_step_delay: millis(MIN_STEP_DELAY_ENV, defaults.min_step_delay),
            restart_delay: millis(RESTART_DELAY_ENV, defaults.restart_delay),
        }
    }

    /// How long a play of a step with the given declared delay takes to settle.
    ///
    /// A declared delay is clamped to `min_step_delay` and doubled; no delay
    /// (or zero) falls back to `default_pacing`.
    pub fn pacing(&self, declared: Option<Duration>) -> Duration {
        match declared {
            Some(delay) if !delay.is_zero() => delay.max(self.min_step_delay) * 2,
            _ => self.default_pacing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_pacing_doubles_declared_delay() {
        let config = EngineConfig::default();
        assert_eq!(
            config.pacing(Some(Duration::from_millis(300))),
            Duration::from_millis(600)
        );
    }

    #[test]
    fn test_pacing_falls_back_to_default() {
        let config = EngineConfig::default();
        assert_eq!(config.pacing(None), Duration::from_millis(800));
        assert_eq!(config.pacing(Some(Duration::ZERO)), Duration::from_millis(800));
    }

    #[test]
    fn test_pacing_respects_minimum() {
        let config = EngineConfig {
            min_step_delay: Duration::from_millis(100),
            ..EngineConfig::default()
        };
        assert_eq!(
            config.pacing(Some(Duration::from_millis(10))),
            Duration::from_millis(200)
        );
    }

    #[test]
    fn test_from_lookup_overrides_and_ignores_garbage() {
        let env: HashMap<&str, &str> = HashMap::from([
            (DEFAULT_PACING_ENV, "1000"),
            (RESTART_DELAY_ENV, "soon"),
        ]);
        let config = EngineConfig::from_lookup(|name| env.get(name).map(ToString::to_string));
        assert_eq!(config.default_pacing, Duration::from_millis(1000));
        assert_eq!(config.restart_delay, Duration::from_millis(50));
        assert_eq!(config.min_step_delay, Duration::ZERO);
    }
}
