use std::fmt;

use serde::{Deserialize, Serialize};

/// A trigger's or a metric's opinion about the world at a point in time.
///
/// Ordering (via [`State::severity`]) is ERROR > WARN > NODATA > OK, with
/// EXCEPTION overriding all of them. `TEST` never participates in severity
/// comparisons; it only flows through the notification pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Ok,
    Warn,
    Error,
    NoData,
    Exception,
    Test,
}

impl State {
    /// Score weight used to accumulate [`crate::types::CheckData::score`].
    pub fn score(&self) -> i64 {
        match self {
            | State::Ok => 0,
            | State::Warn => 1,
            | State::NoData => 1000,
            | State::Error => 100,
            | State::Exception => 100_000,
            | State::Test => 0,
        }
    }

    /// Relative badness used to pick the worst of several metric states and
    /// to decide `ignoreRecoverings`/`ignoreWarnings` semantics. Not the same
    /// ordinal as `score` (NODATA outscores ERROR in UI weight, but ERROR is
    /// worse severity-wise).
    fn severity_rank(&self) -> u8 {
        match self {
            | State::Ok => 0,
            | State::Warn => 1,
            | State::NoData => 2,
            | State::Error => 3,
            | State::Exception => 4,
            | State::Test => 0,
        }
    }

    pub fn worse_than(&self, other: &State) -> bool {
        self.severity_rank() > other.severity_rank()
    }

    pub fn worst<'a>(states: impl IntoIterator<Item = &'a State>) -> State {
        states
            .into_iter()
            .copied()
            .max_by_key(|s| s.severity_rank())
            .unwrap_or(State::Ok)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            | State::Ok => "OK",
            | State::Warn => "WARN",
            | State::Error => "ERROR",
            | State::NoData => "NODATA",
            | State::Exception => "EXCEPTION",
            | State::Test => "TEST",
        };
        write!(f, "{s}")
    }
}

/// Behavior to apply to a metric when it stops reporting for longer than
/// `trigger.ttl`. `Del` additionally removes the metric from `CheckData`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TtlState {
    Ok,
    Warn,
    Error,
    NoData,
    Del,
}

impl TtlState {
    /// Maps a TTL state to the metric state it produces when a metric goes
    /// missing. `Del` without a prior recorded event degrades to `NODATA`
    /// (there is nothing to delete yet).
    pub fn to_metric_state(self) -> State {
        match self {
            | TtlState::Ok => State::Ok,
            | TtlState::Warn => State::Warn,
            | TtlState::Error => State::Error,
            | TtlState::NoData => State::NoData,
            | TtlState::Del => State::NoData,
        }
    }
}

impl Default for TtlState {
    fn default() -> Self {
        TtlState::NoData
    }
}
