use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::state::State;

/// Per-(trigger, metric) snapshot carried inside a trigger's `CheckData`.
///
/// Invariant: `event_timestamp <= timestamp`.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricState {
    pub state: State,
    pub timestamp: i64,
    pub value: Option<f64>,
    /// Timestamp of the last state transition for this metric.
    pub event_timestamp: i64,
    pub suppressed: bool,
    /// State changes strictly before this wall-clock time are suppressed
    /// and do not emit events. `0` means no maintenance window.
    pub maintenance: i64,
}

impl Default for MetricState {
    /// The "previous state" recovered for a metric the trigger has never
    /// seen before (§4.C step 3: "Recover previous MetricState from
    /// lastCheck.metrics[name] (default zero values)"). Matches the
    /// original's zero-value `MetricState.State`, which reads as NODATA —
    /// an unknown metric is absent data until proven otherwise.
    fn default() -> Self {
        Self {
            state: State::NoData,
            timestamp: 0,
            value: None,
            event_timestamp: 0,
            suppressed: false,
            maintenance: 0,
        }
    }
}

impl MetricState {
    pub fn is_in_maintenance(&self, at: i64) -> bool {
        self.maintenance != 0 && at < self.maintenance
    }
}

/// The last-check snapshot for a trigger. Fully overwritten on every
/// successful check; never partially patched.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckData {
    pub state: State,
    pub timestamp: i64,
    pub event_timestamp: i64,
    /// Ordering weight for UIs, accumulated over metrics. See
    /// [`State::score`].
    pub score: i64,
    pub message: Option<String>,
    pub metrics: HashMap<String, MetricState>,
    pub last_successful_check_timestamp: i64,
}

impl CheckData {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            state: State::NoData,
            timestamp: now.timestamp(),
            event_timestamp: now.timestamp(),
            score: 0,
            message: None,
            metrics: HashMap::new(),
            last_successful_check_timestamp: now.timestamp(),
        }
    }
}
