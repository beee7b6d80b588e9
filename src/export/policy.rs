use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ExportError;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// What the exporter does when one date's query fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop the whole run at the first failing date.
    Abort,
    /// Log the failure, record the date and move on.
    #[default]
    Skip,
    /// Re-run the query up to `max_attempts` times, then skip.
    Retry { max_attempts: u32 },
}

impl FailurePolicy {
    pub fn parse(name: &str, max_attempts: u32) -> Result<Self, ExportError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "abort" => Ok(FailurePolicy::Abort),
            "skip" => Ok(FailurePolicy::Skip),
            "retry" if max_attempts == 0 => Err(ExportError::Config(
                "max attempts for the retry policy must be at least 1".to_string(),
            )),
            "retry" => Ok(FailurePolicy::Retry { max_attempts }),
            other => Err(ExportError::Config(format!(
                "unknown failure policy {other:?}, expected abort, skip or retry"
            ))),
        }
    }

    pub fn attempts(&self) -> u32 {
        match self {
            FailurePolicy::Retry { max_attempts } => *max_attempts,
            _ => 1,
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FailurePolicy::parse(s, DEFAULT_MAX_ATTEMPTS)
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => f.write_str("abort"),
            FailurePolicy::Skip => f.write_str("skip"),
            FailurePolicy::Retry { max_attempts } => write!(f, "retry({max_attempts})"),
        }
    }
}

/// Exponential backoff from `base`, capped at ten times `base`, plus up to
/// 25% jitter.
pub fn retry_delay(base: Duration, attempt: u32) -> Duration {
    let cap = base * 10;
    let delay = base.saturating_mul(2u32.saturating_pow(attempt)).min(cap);
    let jitter_ms = fastrand::u64(0..=delay.as_millis() as u64 / 4);
    delay + Duration::from_millis(jitter_ms)
}
