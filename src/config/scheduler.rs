//! Scheduler configuration.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable prefix used by [`SchedulerConfig::from_env`].
pub const ENV_PREFIX: &str = "JOB_SCHEDULER_";

/// Fixed-window admission limit: at most `cap` job starts per `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Jobs that may start within one window.
    pub cap: usize,
    /// Window length.
    pub period: Duration,
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Maximum number of jobs running at once.
    pub concurrency: usize,
    /// Per-job timeout in milliseconds, applied once a job starts.
    pub timeout_ms: Option<u64>,
    /// Start dispatching on submission. When false the scheduler is created
    /// paused and waits for `start()`.
    pub auto_start: bool,
    /// Job starts allowed per interval. Requires `interval_ms`.
    pub interval_cap: Option<usize>,
    /// Rate window length in milliseconds. Requires `interval_cap`.
    pub interval_ms: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            concurrency: num_cpus::get().max(1),
            timeout_ms: None,
            auto_start: true,
            interval_cap: None,
            interval_ms: None,
        }
    }
}

impl SchedulerConfig {
    /// Default configuration: one slot per CPU, auto-start, no timeout, no rate window.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the concurrency limit.
    #[must_use]
    pub const fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the default per-job timeout. Sub-millisecond timeouts round up
    /// to one millisecond.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(duration_to_ms(timeout));
        self
    }

    /// Enable or disable auto-start.
    #[must_use]
    pub const fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Allow at most `cap` job starts per `period`.
    #[must_use]
    pub fn with_rate_window(mut self, cap: usize, period: Duration) -> Self {
        self.interval_cap = Some(cap);
        self.interval_ms = Some(duration_to_ms(period));
        self
    }

    /// The default per-job timeout.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// The rate window, when both the cap and the interval are set.
    #[must_use]
    pub fn rate_window(&self) -> Option<RateWindow> {
        match (self.interval_cap, self.interval_ms) {
            (Some(cap), Some(ms)) => Some(RateWindow {
                cap,
                period: Duration::from_millis(ms),
            }),
            _ => None,
        }
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid value.
    pub fn validate(&self) -> Result<(), String> {
        if self.concurrency == 0 {
            return Err("concurrency must be greater than 0".into());
        }
        if self.timeout_ms == Some(0) {
            return Err("timeout_ms must be greater than 0".into());
        }
        match (self.interval_cap, self.interval_ms) {
            (Some(0), _) => Err("interval_cap must be greater than 0".into()),
            (_, Some(0)) => Err("interval_ms must be greater than 0".into()),
            (Some(_), None) | (None, Some(_)) => {
                Err("interval_cap and interval_ms must be set together".into())
            }
            _ => Ok(()),
        }
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `JOB_SCHEDULER_*` environment variables.
    ///
    /// A `.env` file in the working directory (or a parent) is loaded first
    /// if present. Unset variables keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns a message when a variable does not parse or the result is invalid.
    pub fn from_env() -> Result<Self, String> {
        // a missing .env file is fine
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup using the
    /// `JOB_SCHEDULER_*` names.
    ///
    /// # Errors
    ///
    /// Returns a message when a value does not parse or the result is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut cfg = Self::default();
        if let Some(v) = read("CONCURRENCY") {
            cfg.concurrency = parse_var("CONCURRENCY", &v)?;
        }
        if let Some(v) = read("TIMEOUT_MS") {
            cfg.timeout_ms = Some(parse_var("TIMEOUT_MS", &v)?);
        }
        if let Some(v) = read("AUTO_START") {
            cfg.auto_start = parse_var("AUTO_START", &v)?;
        }
        if let Some(v) = read("INTERVAL_CAP") {
            cfg.interval_cap = Some(parse_var("INTERVAL_CAP", &v)?);
        }
        if let Some(v) = read("INTERVAL_MS") {
            cfg.interval_ms = Some(parse_var("INTERVAL_MS", &v)?);
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Whole milliseconds in `d`, saturating at `u64::MAX`. A nonzero duration
/// never maps to 0.
fn duration_to_ms(d: Duration) -> u64 {
    let ms = u64::try_from(d.as_millis()).unwrap_or(u64::MAX);
    if ms == 0 && !d.is_zero() {
        1
    } else {
        ms
    }
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| format!("{ENV_PREFIX}{name}={value:?}: {e}"))
}
