//! Remote metric source: queries an HTTP-exposed time-series store. The
//! concrete wire format of that store is an external collaborator
//! (spec.md §1); this client speaks a render-style JSON contract
//! `[{target, datapoints: [[value, timestamp], ...]}]` which is the
//! lowest-common-denominator most graphite-compatible backends expose.

use async_trait::async_trait;
use serde::Deserialize;

use super::{FetchError, MetricData, SimpleFetchResult};
use crate::metric_source::MetricSource;

#[derive(Debug, Deserialize)]
struct RenderSeries {
    target: String,
    datapoints: Vec<(Option<f64>, i64)>,
}

pub struct RemoteMetricSource {
    base_url: url::Url,
    client: reqwest::Client,
    request_timeout: std::time::Duration,
}

impl RemoteMetricSource {
    pub fn new(base_url: url::Url, request_timeout: std::time::Duration) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
            request_timeout,
        }
    }
}

#[async_trait]
impl MetricSource for RemoteMetricSource {
    async fn fetch(
        &self,
        target: &str,
        from: i64,
        until: i64,
        allow_real_time_alerting: bool,
    ) -> Result<SimpleFetchResult, FetchError> {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("target", target)
            .append_pair("from", &from.to_string())
            .append_pair("until", &until.to_string())
            .append_pair(
                "allowRealTimeAlerting",
                if allow_real_time_alerting { "1" } else { "0" },
            );

        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|_| FetchError::RemoteUnavailable)?;

        if !response.status().is_success() {
            return Err(FetchError::RemoteUnavailable);
        }

        let series: Vec<RenderSeries> = response
            .json()
            .await
            .map_err(|e| FetchError::FetchFailure(e.to_string()))?;

        let metrics_data = series
            .iter()
            .map(|s| to_metric_data(s))
            .collect::<Vec<_>>();

        Ok(SimpleFetchResult {
            pattern_metrics: series.iter().map(|s| s.target.clone()).collect(),
            metrics_data,
        })
    }
}

fn to_metric_data(series: &RenderSeries) -> MetricData {
    if series.datapoints.is_empty() {
        return MetricData {
            name: series.target.clone(),
            start_time: 0,
            stop_time: 0,
            step_time: 60,
            values: vec![],
            wildcard: series.target.contains('*'),
        };
    }
    let step_time = if series.datapoints.len() > 1 {
        series.datapoints[1].1 - series.datapoints[0].1
    } else {
        60
    };
    MetricData {
        name: series.target.clone(),
        start_time: series.datapoints[0].1,
        stop_time: series.datapoints.last().unwrap().1 + step_time,
        step_time,
        values: series
            .datapoints
            .iter()
            .map(|(v, _)| v.unwrap_or(f64::NAN))
            .collect(),
        wildcard: false,
    }
}
