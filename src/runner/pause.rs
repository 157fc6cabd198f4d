use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Inclusive `[min, max]` range of whole seconds.
///
/// Deserializes from either `[min, max]` or `"min-max"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PauseRangeRepr", into = "[u64; 2]")]
pub struct PauseRange {
    pub min: u64,
    pub max: u64,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PauseRangeRepr {
    Pair([u64; 2]),
    Text(String),
}

impl TryFrom<PauseRangeRepr> for PauseRange {
    type Error = String;

    fn try_from(value: PauseRangeRepr) -> Result<Self, Self::Error> {
        match value {
            PauseRangeRepr::Pair([min, max]) => Ok(PauseRange { min, max }),
            PauseRangeRepr::Text(text) => text.parse(),
        }
    }
}

impl From<PauseRange> for [u64; 2] {
    fn from(range: PauseRange) -> Self {
        [range.min, range.max]
    }
}

impl std::str::FromStr for PauseRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (min, max) = s
            .split_once('-')
            .ok_or_else(|| format!("expected 'min-max', got '{}'", s))?;
        let min = min
            .trim()
            .parse()
            .map_err(|_| format!("invalid pause start in '{}'", s))?;
        let max = max
            .trim()
            .parse()
            .map_err(|_| format!("invalid pause end in '{}'", s))?;
        Ok(PauseRange { min, max })
    }
}

impl Default for PauseRange {
    fn default() -> Self {
        Self { min: 1, max: 3 }
    }
}

impl PauseRange {
    pub const NONE: PauseRange = PauseRange { min: 0, max: 0 };

    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }
}

impl std::fmt::Display for PauseRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}s", self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    Elapsed,
    Cancelled,
}

/// Picks a whole number of seconds uniformly from the range. A reversed range
/// is treated as its ordered counterpart.
pub fn delay<R: Rng>(range: PauseRange, rng: &mut R) -> Duration {
    let (lo, hi) = if range.min <= range.max {
        (range.min, range.max)
    } else {
        (range.max, range.min)
    };
    Duration::from_secs(rng.gen_range(lo..=hi))
}

/// Sleeps for a random duration from `range`, returning early when `cancel`
/// fires.
pub async fn pause(range: PauseRange, cancel: &CancellationToken) -> PauseOutcome {
    let duration = delay(range, &mut rand::thread_rng());
    pause_for(duration, cancel).await
}

pub async fn pause_for(duration: Duration, cancel: &CancellationToken) -> PauseOutcome {
    if cancel.is_cancelled() {
        return PauseOutcome::Cancelled;
    }
    if duration.is_zero() {
        return PauseOutcome::Elapsed;
    }
    tokio::select! {
        _ = cancel.cancelled() => PauseOutcome::Cancelled,
        _ = tokio::time::sleep(duration) => PauseOutcome::Elapsed,
    }
}
