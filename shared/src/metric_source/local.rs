//! A small in-process graphite-like function evaluator. It resolves raw
//! series by exact name or dotted-segment wildcard pattern (`a.*.c`) and
//! supports a handful of aggregate/transform functions layered on top,
//! enough to exercise the evaluator (§4.C) without pulling in a full query
//! engine — the concrete metric-source query engine itself is out of scope
//! (spec.md §1).

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use super::{FetchError, MetricData, SimpleFetchResult};
use crate::metric_source::MetricSource;

#[derive(Default)]
pub struct LocalMetricSource {
    series: RwLock<HashMap<String, MetricData>>,
}

impl LocalMetricSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, data: MetricData) {
        self.series.write().unwrap().insert(data.name.clone(), data);
    }

    fn matching_series(&self, pattern: &str) -> Vec<MetricData> {
        let series = self.series.read().unwrap();
        if !pattern.contains('*') {
            return series.get(pattern).cloned().into_iter().collect();
        }
        let pattern_segments: Vec<&str> = pattern.split('.').collect();
        series
            .values()
            .filter(|m| segments_match(&pattern_segments, m.name.split('.').collect()))
            .cloned()
            .collect()
    }
}

fn segments_match(pattern: &[&str], name: Vec<&str>) -> bool {
    pattern.len() == name.len()
        && pattern
            .iter()
            .zip(name.iter())
            .all(|(p, n)| *p == "*" || p == n)
}

/// A hand-rolled subset of a graphite function call:
/// `fn(arg, arg, ...)` or a bare target/pattern.
enum Expr {
    Target(String),
    Call(String, Vec<Expr>),
}

fn parse(input: &str) -> Expr {
    let input = input.trim();
    if let Some(open) = input.find('(') {
        if input.ends_with(')') {
            let name = input[..open].to_owned();
            let args_str = &input[open + 1..input.len() - 1];
            let args = split_args(args_str).into_iter().map(|a| parse(&a)).collect();
            return Expr::Call(name, args);
        }
    }
    Expr::Target(input.trim_matches('"').to_owned())
}

fn split_args(s: &str) -> Vec<String> {
    let mut depth = 0i32;
    let mut current = String::new();
    let mut out = Vec::new();
    for c in s.chars() {
        match c {
            | '(' => {
                depth += 1;
                current.push(c);
            }
            | ')' => {
                depth -= 1;
                current.push(c);
            }
            | ',' if depth == 0 => {
                out.push(current.trim().to_owned());
                current.clear();
            }
            | _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(current.trim().to_owned());
    }
    out
}

impl LocalMetricSource {
    fn eval(&self, expr: &Expr) -> Result<Vec<MetricData>, FetchError> {
        match expr {
            | Expr::Target(pattern) => {
                let found = self.matching_series(pattern);
                if found.is_empty() && pattern.contains('*') {
                    // A wildcard target that resolved to nothing is still a
                    // valid (if empty) result, flagged via `wildcard`.
                    Ok(vec![MetricData {
                        name: pattern.clone(),
                        start_time: 0,
                        stop_time: 0,
                        step_time: 60,
                        values: vec![],
                        wildcard: true,
                    }])
                } else {
                    Ok(found)
                }
            }
            | Expr::Call(name, args) => match name.as_str() {
                | "alias" => {
                    let mut series = self.eval(&args[0])?;
                    if let Some(Expr::Target(label)) = args.get(1) {
                        for s in series.iter_mut() {
                            s.name = label.clone();
                        }
                    }
                    Ok(series)
                }
                | "scale" => {
                    let mut series = self.eval(&args[0])?;
                    let factor: f64 = match &args[1] {
                        | Expr::Target(n) => n.parse().unwrap_or(1.0),
                        | _ => 1.0,
                    };
                    for s in series.iter_mut() {
                        for v in s.values.iter_mut() {
                            *v *= factor;
                        }
                    }
                    Ok(series)
                }
                | other => Err(FetchError::UnknownFunction(other.to_owned())),
            },
        }
    }
}

#[async_trait]
impl MetricSource for LocalMetricSource {
    async fn fetch(
        &self,
        target: &str,
        from: i64,
        until: i64,
        _allow_real_time_alerting: bool,
    ) -> Result<SimpleFetchResult, FetchError> {
        let expr = parse(target);
        let metrics_data = self
            .eval(&expr)?
            .into_iter()
            .map(|mut m| {
                if !m.wildcard {
                    clip_to_window(&mut m, from, until);
                }
                m
            })
            .collect();
        let pattern_metrics = extract_targets(&expr);
        Ok(SimpleFetchResult {
            metrics_data,
            pattern_metrics,
        })
    }
}

fn clip_to_window(data: &mut MetricData, from: i64, until: i64) {
    if data.start_time >= from && data.stop_time <= until {
        return;
    }
    data.start_time = data.start_time.max(from);
    data.stop_time = data.stop_time.min(until);
}

fn extract_targets(expr: &Expr) -> Vec<String> {
    match expr {
        | Expr::Target(t) => vec![t.clone()],
        | Expr::Call(_, args) => args.iter().flat_map(extract_targets).collect(),
    }
}
