//! Per-destination results

use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Overall result of one destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResultCode {
    AllFailed = 0,
    AllSucceeded = 1,
    PartialSuccess = 2,
}

impl ResultCode {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Result for the bucket counts of a run. A dry run always succeeds.
    pub fn from_counts(counts: BucketCounts, executed: bool) -> Self {
        if !executed {
            return ResultCode::AllSucceeded;
        }

        match (counts.succeeded, counts.failed) {
            (0, failed) if failed > 0 => ResultCode::AllFailed,
            (_, failed) if failed > 0 => ResultCode::PartialSuccess,
            _ => ResultCode::AllSucceeded,
        }
    }
}

impl fmt::Display for ResultCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ResultCode::AllFailed => "all failed",
            ResultCode::AllSucceeded => "all succeeded",
            ResultCode::PartialSuccess => "partial success",
        };
        write!(f, "{}({})", text, self.code())
    }
}

/// Executed bucket tally of one destination
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BucketCounts {
    pub succeeded: usize,
    pub failed: usize,
}

impl BucketCounts {
    pub fn record<T, E>(&mut self, result: &std::result::Result<T, E>) {
        match result {
            Ok(_) => self.succeeded += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Outcome reported by one destination worker
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOutcome {
    pub target_id: String,
    pub result: ResultCode,
    pub counts: BucketCounts,
    pub elapsed_secs: f64,
}

impl SyncOutcome {
    pub fn new(target_id: &str, counts: BucketCounts, executed: bool, elapsed: Duration) -> Self {
        Self {
            target_id: target_id.to_string(),
            result: ResultCode::from_counts(counts, executed),
            counts,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    /// Outcome of a destination that could not be synchronized at all
    pub fn failed(target_id: &str, elapsed: Duration) -> Self {
        Self {
            target_id: target_id.to_string(),
            result: ResultCode::AllFailed,
            counts: BucketCounts::default(),
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, succeeded: {}, failed: {}, elapsed: {:.6} s",
            self.target_id, self.result, self.counts.succeeded, self.counts.failed, self.elapsed_secs
        )
    }
}

/// Everything the driver collected in one run
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub outcomes: Vec<SyncOutcome>,
    pub elapsed_secs: f64,
}

impl SyncReport {
    pub fn outcome(&self, target_id: &str) -> Option<&SyncOutcome> {
        self.outcomes.iter().find(|o| o.target_id == target_id)
    }
}
