use std::time::Duration;

use crate::error::{AiError, Result};

/// Kernel configuration
#[derive(Debug, Clone)]
pub struct KernelConfig {
    /// Worker threads of each zone's parallel tick pool
    pub zone_threads: usize,
    /// Idle poll interval of the scheduler thread
    pub scheduler_idle: Duration,
    /// Tick length used by the demo runner
    pub tick: Duration,
    /// Record per-node debug state in the demo zone
    pub debug_zone: bool,
    /// How long the demo runner runs before it stops
    pub run_for: Duration,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            zone_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            scheduler_idle: Duration::from_millis(1),
            tick: Duration::from_millis(16),
            debug_zone: false,
            run_for: Duration::from_secs(5),
        }
    }
}

fn env_millis(name: &str, range: std::ops::RangeInclusive<u64>) -> Option<Duration> {
    let value = std::env::var(name).ok()?;
    match value.parse::<u64>() {
        Ok(parsed) if range.contains(&parsed) => Some(Duration::from_millis(parsed)),
        Ok(_) => {
            tracing::warn!(
                "{} must be {}-{}, using default",
                name,
                range.start(),
                range.end()
            );
            None
        }
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, value);
            None
        }
    }
}

fn parse_flag(name: &str, value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!("Invalid {} '{}', using default", name, value);
            None
        }
    }
}

impl KernelConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(threads) = std::env::var("SIMPLEAI_ZONE_THREADS") {
            match threads.parse::<usize>() {
                Ok(parsed) if (1..=256).contains(&parsed) => config.zone_threads = parsed,
                Ok(_) => tracing::warn!("SIMPLEAI_ZONE_THREADS must be 1-256, using default"),
                Err(_) => {
                    tracing::warn!("Invalid SIMPLEAI_ZONE_THREADS '{}', using default", threads)
                }
            }
        }

        if let Some(idle) = env_millis("SIMPLEAI_SCHEDULER_IDLE_MS", 1..=1000) {
            config.scheduler_idle = idle;
        }

        if let Some(tick) = env_millis("SIMPLEAI_TICK_MS", 1..=10_000) {
            config.tick = tick;
        }

        if let Ok(debug_zone) = std::env::var("SIMPLEAI_DEBUG_ZONE") {
            if let Some(enabled) = parse_flag("SIMPLEAI_DEBUG_ZONE", &debug_zone) {
                config.debug_zone = enabled;
            }
        }

        if let Ok(secs) = std::env::var("SIMPLEAI_RUN_SECS") {
            if let Ok(parsed) = secs.parse::<u64>() {
                config.run_for = Duration::from_secs(parsed);
            } else {
                tracing::warn!("Invalid SIMPLEAI_RUN_SECS '{}', using default", secs);
            }
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<()> {
        if self.zone_threads == 0 {
            return Err(AiError::InvalidConfig(
                "zone_threads must be at least 1".to_string(),
            ));
        }
        if self.scheduler_idle.is_zero() {
            return Err(AiError::InvalidConfig(
                "scheduler_idle cannot be 0".to_string(),
            ));
        }
        if self.tick.is_zero() {
            return Err(AiError::InvalidConfig("tick cannot be 0".to_string()));
        }
        Ok(())
    }

    /// Tick length in millis as passed to `Zone::update`
    pub fn tick_millis(&self) -> i64 {
        self.tick.as_millis() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = KernelConfig::default();
        assert!(config.zone_threads >= 1);
        assert_eq!(config.scheduler_idle, Duration::from_millis(1));
        assert_eq!(config.tick_millis(), 16);
        assert!(!config.debug_zone);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = KernelConfig::load_or_default();
        assert!(config.zone_threads > 0);
    }

    #[test]
    fn test_validate_rejects_zero_threads() {
        let config = KernelConfig {
            zone_threads: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AiError::InvalidConfig(_))));
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("SIMPLEAI_DEBUG_ZONE", "On"), Some(true));
        assert_eq!(parse_flag("SIMPLEAI_DEBUG_ZONE", " 0 "), Some(false));
        assert_eq!(parse_flag("SIMPLEAI_DEBUG_ZONE", "maybe"), None);
    }
}
