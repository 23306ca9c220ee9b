//! Component B: the abstract metric source, §4.B.

mod errors;
pub mod local;
pub mod remote;

pub use errors::FetchError;

use async_trait::async_trait;

/// One resolved series. `values[i]` corresponds to
/// `start_time + i * step_time`; `NaN` marks an absent sample.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricData {
    pub name: String,
    pub start_time: i64,
    pub stop_time: i64,
    pub step_time: i64,
    pub values: Vec<f64>,
    /// Set when the pattern that produced this series matched nothing.
    pub wildcard: bool,
}

impl MetricData {
    /// Samples the series at `timestamp`, per §4.C step 3. Returns `None`
    /// if `timestamp` falls outside `[start_time, stop_time)` or lands on a
    /// `NaN` (absent) sample.
    pub fn value_at(&self, timestamp: i64) -> Option<f64> {
        if timestamp < self.start_time || self.step_time <= 0 {
            return None;
        }
        let index = ((timestamp - self.start_time) / self.step_time) as usize;
        let value = *self.values.get(index)?;
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }
}

pub trait FetchResult: Send {
    fn metrics_data(&self) -> &[MetricData];
    /// Raw metric names touched by the query, used for store compaction
    /// (`RemoveMetricsValues`/`RemovePatternsMetrics`).
    fn pattern_metrics(&self) -> &[String];
}

pub struct SimpleFetchResult {
    pub metrics_data: Vec<MetricData>,
    pub pattern_metrics: Vec<String>,
}

impl FetchResult for SimpleFetchResult {
    fn metrics_data(&self) -> &[MetricData] {
        &self.metrics_data
    }

    fn pattern_metrics(&self) -> &[String] {
        &self.pattern_metrics
    }
}

#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn fetch(
        &self,
        target: &str,
        from: i64,
        until: i64,
        allow_real_time_alerting: bool,
    ) -> Result<SimpleFetchResult, FetchError>;
}
