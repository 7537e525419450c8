use std::str::FromStr;

use thiserror::Error;

use crate::game::constants::{spawn, timing};

/// Rejected configuration values
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("tick_rate must be between 1 and 1000, got {0}")]
    TickRate(u32),
    #[error("spawn ring must have a finite inner radius >= 0 and width > 0")]
    SpawnRing,
    #[error("spawn_attempts_per_agent must be at least 1")]
    SpawnAttempts,
    #[error("max_ticks must be at least 1 when set")]
    MaxTicks,
}

/// Simulation configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// RNG seed; `None` seeds from entropy
    pub seed: Option<u64>,
    /// Agents requested at spawn
    pub agent_count: usize,
    /// Inner radius of the spawn ring around the origin
    pub spawn_ring_inner: f32,
    /// Width of the spawn ring
    pub spawn_ring_width: f32,
    /// Placement attempts budgeted per requested agent
    pub spawn_attempts_per_agent: u32,
    /// Run the perception pass on the rayon pool for large populations
    pub parallel_perception: bool,
    /// Host frame rate; converts wall-clock cooldowns to ticks
    pub tick_rate: u32,
    /// JSON world file; the built-in city is used when unset
    pub world_file: Option<String>,
    /// Stop the headless runner after this many ticks
    pub max_ticks: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: None,
            agent_count: spawn::DEFAULT_AGENT_COUNT,
            spawn_ring_inner: spawn::RING_INNER,
            spawn_ring_width: spawn::RING_WIDTH,
            spawn_attempts_per_agent: spawn::ATTEMPTS_PER_AGENT,
            parallel_perception: true,
            tick_rate: timing::TICK_RATE,
            world_file: None,
            max_ticks: None,
        }
    }
}

/// Parse an environment variable, keeping `current` (with a warning) when
/// the value does not parse or is rejected by `accept`
fn env_or<T, F>(name: &str, current: T, accept: F, expectation: &str) -> T
where
    T: FromStr,
    F: Fn(&T) -> bool,
{
    let Ok(raw) = std::env::var(name) else {
        return current;
    };
    match raw.trim().parse::<T>() {
        Ok(parsed) if accept(&parsed) => parsed,
        Ok(_) => {
            tracing::warn!("{} must be {}, using default", name, expectation);
            current
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            current
        }
    }
}

impl SimConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(seed) = std::env::var("SIM_SEED") {
            match seed.trim().parse::<u64>() {
                Ok(parsed) => config.seed = Some(parsed),
                Err(_) => tracing::warn!("Invalid SIM_SEED '{}', seeding from entropy", seed),
            }
        }

        config.agent_count = env_or(
            "AGENT_COUNT",
            config.agent_count,
            |n| *n <= 10_000,
            "0-10000",
        );
        config.spawn_ring_inner = env_or(
            "SPAWN_RING_INNER",
            config.spawn_ring_inner,
            |r: &f32| r.is_finite() && *r >= 0.0,
            "a finite value >= 0",
        );
        config.spawn_ring_width = env_or(
            "SPAWN_RING_WIDTH",
            config.spawn_ring_width,
            |w: &f32| w.is_finite() && *w > 0.0,
            "a finite value > 0",
        );
        config.spawn_attempts_per_agent = env_or(
            "SPAWN_ATTEMPTS_PER_AGENT",
            config.spawn_attempts_per_agent,
            |n| (1..=1000).contains(n),
            "1-1000",
        );
        config.parallel_perception = env_or(
            "PARALLEL_PERCEPTION",
            config.parallel_perception,
            |_| true,
            "true or false",
        );
        config.tick_rate = env_or(
            "TICK_RATE",
            config.tick_rate,
            |n| (1..=1000).contains(n),
            "1-1000",
        );

        if let Ok(path) = std::env::var("WORLD_FILE") {
            if !path.trim().is_empty() {
                config.world_file = Some(path);
            }
        }

        if let Ok(max_ticks) = std::env::var("MAX_TICKS") {
            match max_ticks.trim().parse::<u64>() {
                Ok(parsed) if parsed > 0 => config.max_ticks = Some(parsed),
                Ok(_) => tracing::warn!("MAX_TICKS must be > 0, running until a terminal state"),
                Err(_) => tracing::warn!(
                    "Invalid MAX_TICKS '{}', running until a terminal state",
                    max_ticks
                ),
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > 1000 {
            return Err(ConfigError::TickRate(self.tick_rate));
        }
        if !(self.spawn_ring_inner.is_finite() && self.spawn_ring_inner >= 0.0)
            || !(self.spawn_ring_width.is_finite() && self.spawn_ring_width > 0.0)
        {
            return Err(ConfigError::SpawnRing);
        }
        if self.spawn_attempts_per_agent == 0 {
            return Err(ConfigError::SpawnAttempts);
        }
        if self.max_ticks == Some(0) {
            return Err(ConfigError::MaxTicks);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SimConfig::default();
        assert_eq!(config.agent_count, 100);
        assert_eq!(config.tick_rate, 60);
        assert_eq!(config.spawn_ring_inner, 800.0);
        assert_eq!(config.spawn_ring_width, 1200.0);
        assert!(config.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = SimConfig::load_or_default();
        assert!(config.tick_rate > 0);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = SimConfig {
            tick_rate: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::TickRate(0)));

        let config = SimConfig {
            spawn_ring_width: 0.0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SpawnRing));

        let config = SimConfig {
            spawn_attempts_per_agent: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::SpawnAttempts));

        let config = SimConfig {
            max_ticks: Some(0),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MaxTicks));
    }

    #[test]
    fn test_env_or_keeps_current_when_unset() {
        let value = env_or("ZOMBIE_DRIFT_SIM_TEST_UNSET_VAR", 7u32, |_| true, "anything");
        assert_eq!(value, 7);
    }
}
