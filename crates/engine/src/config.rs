//! Engine configuration loaded from the environment (spec.md SPEC_FULL.md
//! §2, "Configuration"), mirroring the teacher's `AppConfig::from_env()` /
//! `env::var(...).unwrap_or_else(...)` pattern.

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Which persistence slot this process run operates on (spec.md §6
    /// "CLI surface", `run --slot <n>`).
    pub slot: u32,
    /// Global tick rate for the movement engine, default 20Hz (spec.md
    /// §4.8).
    pub tick_interval_ms: u64,
    /// How often each service polls the Outbox, in milliseconds
    /// (spec.md §5: "0.5-1.5s").
    pub service_poll_interval_ms: u64,
    /// Witness engagement sweep frequency, >= 1Hz (spec.md §4.6).
    pub engagement_sweep_interval_ms: u64,
    /// Bounded exponential backoff cap for bus lock contention (spec.md
    /// §7: "retries with bounded exponential backoff up to 10 attempts").
    pub max_lock_retry_attempts: u32,
    /// Wall-clock budget for one intent's run through the Action Pipeline
    /// (spec.md §7 error kind `timeout`); a run that exceeds this is
    /// abandoned and logged rather than left to hang a single-writer task.
    pub pipeline_stage_timeout_ms: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let slot = env_or("TALEFORGE_SLOT", "0")
            .parse::<u32>()
            .context("TALEFORGE_SLOT must be a non-negative integer")?;
        let tick_interval_ms = env_or("TALEFORGE_TICK_INTERVAL_MS", "50")
            .parse::<u64>()
            .context("TALEFORGE_TICK_INTERVAL_MS must be an integer")?;
        let service_poll_interval_ms = env_or("TALEFORGE_SERVICE_POLL_INTERVAL_MS", "1000")
            .parse::<u64>()
            .context("TALEFORGE_SERVICE_POLL_INTERVAL_MS must be an integer")?;
        let engagement_sweep_interval_ms = env_or("TALEFORGE_ENGAGEMENT_SWEEP_INTERVAL_MS", "1000")
            .parse::<u64>()
            .context("TALEFORGE_ENGAGEMENT_SWEEP_INTERVAL_MS must be an integer")?;
        let max_lock_retry_attempts = env_or("TALEFORGE_MAX_LOCK_RETRY_ATTEMPTS", "10")
            .parse::<u32>()
            .context("TALEFORGE_MAX_LOCK_RETRY_ATTEMPTS must be an integer")?;
        let pipeline_stage_timeout_ms = env_or("TALEFORGE_PIPELINE_STAGE_TIMEOUT_MS", "5000")
            .parse::<u64>()
            .context("TALEFORGE_PIPELINE_STAGE_TIMEOUT_MS must be an integer")?;

        Ok(Self {
            slot,
            tick_interval_ms,
            service_poll_interval_ms,
            engagement_sweep_interval_ms,
            max_lock_retry_attempts,
            pipeline_stage_timeout_ms,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_env_vars() {
        for key in [
            "TALEFORGE_SLOT",
            "TALEFORGE_TICK_INTERVAL_MS",
            "TALEFORGE_SERVICE_POLL_INTERVAL_MS",
            "TALEFORGE_ENGAGEMENT_SWEEP_INTERVAL_MS",
            "TALEFORGE_MAX_LOCK_RETRY_ATTEMPTS",
            "TALEFORGE_PIPELINE_STAGE_TIMEOUT_MS",
        ] {
            std::env::remove_var(key);
        }
        let config = AppConfig::from_env().expect("defaults should parse");
        assert_eq!(config.slot, 0);
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.max_lock_retry_attempts, 10);
    }
}
