//! Component C: the pure per-trigger evaluator (§4.C). Takes a trigger, its
//! previous last-check, and fresh metric data, and produces the new
//! per-metric states, the trigger-wide aggregate, and the notification
//! events those transitions emit. Never touches the store directly — the
//! check worker pool (§4.D, [`crate::worker`]) is the only caller and owns
//! all persistence.

use std::collections::{HashMap, HashSet};

use shared::metric_source::{MetricData, MetricSource};
use shared::types::{
    CheckData,
    MetricState,
    NotificationEvent,
    State,
    Trigger,
    TriggerId,
    TriggerType,
    TtlState,
};

use crate::error::EvaluatorError;
use crate::expression::{self, ExpressionValues};

/// Output of one evaluator pass: the metrics to merge into a fresh
/// `CheckData`, the events that resulted from state transitions, and the
/// raw metric names touched (for store compaction per §4.D step 6).
pub struct EvaluationOutcome {
    pub metrics: HashMap<String, MetricState>,
    pub events: Vec<NotificationEvent>,
    pub pattern_metrics: Vec<String>,
}

/// Runs one full evaluation of `trigger` against `last_check`, per §4.C
/// steps 1-5. `metrics_ttl` is the engine-wide window (`from = lastCheck.timestamp
/// - metricsTTL`); `trigger.ttl` is the per-trigger no-data timeout.
pub async fn evaluate(
    source: &dyn MetricSource,
    trigger: &Trigger,
    last_check: &CheckData,
    now: i64,
    metrics_ttl: i64,
) -> Result<EvaluationOutcome, EvaluatorError> {
    if trigger.targets.is_empty() {
        return Err(EvaluatorError::NoMetrics);
    }
    if !trigger.has_thresholds() && trigger.trigger_type != TriggerType::Expression
    {
        return Err(EvaluatorError::MissingThresholds);
    }

    // Step 1 - fetch.
    let from = last_check.timestamp - metrics_ttl;
    let until = now;
    let allow_rt = trigger.allows_real_time_alerting();

    let main_target = trigger.main_target().expect("targets checked non-empty above");
    let main_result = source.fetch(main_target, from, until, allow_rt).await?;

    let mut additional_results = Vec::with_capacity(trigger.additional_targets().len());
    for target in trigger.additional_targets() {
        additional_results.push(source.fetch(target, from, until, false).await?);
    }

    let mut pattern_metrics: Vec<String> = main_result.pattern_metrics.clone();
    for r in &additional_results {
        pattern_metrics.extend(r.pattern_metrics.iter().cloned());
    }

    // Step 2 - select metrics to check.
    let real_main: Vec<&MetricData> =
        main_result.metrics_data.iter().filter(|m| !m.wildcard).collect();

    let mut seen = HashSet::new();
    let mut duplicates = Vec::new();
    for m in &real_main {
        if !seen.insert(m.name.as_str()) {
            duplicates.push(m.name.clone());
        }
    }
    if !duplicates.is_empty() {
        return Err(EvaluatorError::SameMetricNames(duplicates.join(", ")));
    }

    let known_names: HashSet<&String> = last_check.metrics.keys().collect();
    if real_main.is_empty() && known_names.is_empty() {
        return Err(EvaluatorError::OnlyWildcards);
    }

    let mut names_to_check: Vec<String> =
        real_main.iter().map(|m| m.name.clone()).collect();
    for name in &known_names {
        if !names_to_check.iter().any(|n| n == *name) {
            names_to_check.push((*name).clone());
        }
    }

    let main_by_name: HashMap<&str, &MetricData> =
        real_main.iter().map(|m| (m.name.as_str(), *m)).collect();

    // Step 3/4 - per-metric walk, NODATA synthesis, transitions.
    let mut new_metrics = HashMap::with_capacity(names_to_check.len());
    let mut events = Vec::new();
    let ttl = trigger.ttl.unwrap_or(0) as i64;

    for name in &names_to_check {
        let prev = last_check.metrics.get(name).cloned().unwrap_or_default();
        let is_new_metric = !last_check.metrics.contains_key(name);
        let metric_data = main_by_name.get(name.as_str()).copied();

        let mut produced = walk_metric(
            trigger,
            metric_data,
            &prev,
            until,
            ttl,
            &additional_results,
        )?;

        let result = check_for_no_data(
            trigger,
            &prev,
            produced.last().cloned(),
            now,
            last_check.timestamp,
            ttl,
        );
        match result {
            | NoDataOutcome::Delete => continue,
            | NoDataOutcome::Synthesized(state) => produced.push(state),
            | NoDataOutcome::None => {}
        }

        let (current, metric_events) =
            apply_transitions(trigger, name, &prev, is_new_metric, produced);
        events.extend(metric_events);
        new_metrics.insert(name.clone(), current);
    }

    Ok(EvaluationOutcome {
        metrics: new_metrics,
        events,
        pattern_metrics,
    })
}

/// §4.C step 3: walks `valueTimestamp` from
/// `max(previous.eventTimestamp, metricData.startTime)` to `until` in
/// `stepTime` increments, producing a candidate [`MetricState`] at every
/// step that has a full set of required samples.
fn walk_metric(
    trigger: &Trigger,
    metric_data: Option<&MetricData>,
    prev: &MetricState,
    until: i64,
    ttl: i64,
    additional_results: &[shared::metric_source::SimpleFetchResult],
) -> Result<Vec<MetricState>, EvaluatorError> {
    let Some(data) = metric_data else {
        return Ok(Vec::new());
    };
    if data.step_time <= 0 {
        return Ok(Vec::new());
    }

    // A floor below which steps are considered already accounted for by a
    // prior check; guards against re-walking a huge TTL-expanded window.
    let checkpoint = prev.timestamp - ttl.max(0);
    let start = prev.event_timestamp.max(data.start_time);

    let mut produced = Vec::new();
    for ts in shared::timeutil::step_range(start, until, data.step_time) {
        if ts <= checkpoint {
            continue;
        }
        let Some(main_value) = data.value_at(ts) else {
            continue;
        };

        let mut additional_values = Vec::with_capacity(additional_results.len());
        let mut all_present = true;
        for result in additional_results {
            let value = result.metrics_data.first().and_then(|m| m.value_at(ts));
            if value.is_none() {
                all_present = false;
            }
            additional_values.push(value);
        }
        if !all_present {
            continue;
        }

        let state = compute_candidate_state(
            trigger,
            main_value,
            &additional_values,
            prev.state,
        )?;

        produced.push(MetricState {
            state,
            timestamp: ts,
            value: Some(main_value),
            event_timestamp: prev.event_timestamp,
            suppressed: prev.suppressed,
            maintenance: prev.maintenance,
        });
    }
    Ok(produced)
}

/// §4.C "Compute candidate state" bullet.
fn compute_candidate_state(
    trigger: &Trigger,
    main_value: f64,
    additional_values: &[Option<f64>],
    prev_state: State,
) -> Result<State, EvaluatorError> {
    match trigger.trigger_type {
        | TriggerType::Rising => {
            if let Some(err) = trigger.error_value {
                if main_value >= err {
                    return Ok(State::Error);
                }
            }
            if let Some(warn) = trigger.warn_value {
                if main_value >= warn {
                    return Ok(State::Warn);
                }
            }
            Ok(State::Ok)
        }
        | TriggerType::Falling => {
            if let Some(err) = trigger.error_value {
                if main_value <= err {
                    return Ok(State::Error);
                }
            }
            if let Some(warn) = trigger.warn_value {
                if main_value <= warn {
                    return Ok(State::Warn);
                }
            }
            Ok(State::Ok)
        }
        | TriggerType::Expression => {
            let expr = trigger.expression.as_deref().ok_or_else(|| {
                EvaluatorError::FetchFailure(
                    "expression trigger has no expression".to_owned(),
                )
            })?;
            let values = ExpressionValues {
                main: Some(main_value),
                additional: additional_values.to_vec(),
                prev_state,
                warn_value: trigger.warn_value,
                error_value: trigger.error_value,
            };
            expression::evaluate(expr, &values)
                .map_err(EvaluatorError::FetchFailure)
        }
    }
}

enum NoDataOutcome {
    None,
    Synthesized(MetricState),
    Delete,
}

/// §4.C "After walking, checkForNoData". The synthesized state's `timestamp`
/// is `lastCheck.timestamp`, per spec and the original fixture (`check_test.go`'s
/// `Timestamp: lastCheck.Timestamp` on both the metric state and the pushed
/// event) — there is no new sample, but the last check's time is still the
/// most recent moment this trigger actually observed anything.
fn check_for_no_data(
    trigger: &Trigger,
    prev: &MetricState,
    last_produced: Option<MetricState>,
    now: i64,
    last_check_timestamp: i64,
    ttl: i64,
) -> NoDataOutcome {
    if ttl == 0 {
        return NoDataOutcome::None;
    }
    let reference = last_produced.as_ref().unwrap_or(prev);
    if now - reference.timestamp <= ttl {
        return NoDataOutcome::None;
    }
    if trigger.ttl_state == TtlState::Del && reference.event_timestamp != 0 {
        return NoDataOutcome::Delete;
    }
    NoDataOutcome::Synthesized(MetricState {
        state: trigger.ttl_state.to_metric_state(),
        timestamp: last_check_timestamp,
        value: None,
        event_timestamp: reference.event_timestamp,
        suppressed: reference.suppressed,
        maintenance: reference.maintenance,
    })
}

/// §4.C step 4: folds `produced` states onto `prev`, emitting an event on
/// every state change unless suppressed by maintenance or muted as a
/// brand-new metric's first appearance.
fn apply_transitions(
    trigger: &Trigger,
    metric: &str,
    prev: &MetricState,
    is_new_metric: bool,
    produced: Vec<MetricState>,
) -> (MetricState, Vec<NotificationEvent>) {
    let mut current = prev.clone();
    let mut events = Vec::new();
    let mut first_transition = true;

    for mut state in produced {
        if state.maintenance != 0 && state.timestamp < state.maintenance {
            state.suppressed = true;
            state.event_timestamp = current.event_timestamp;
            current = state;
            continue;
        }

        if state.state != current.state {
            let muted = is_new_metric && first_transition && trigger.mute_new_metrics;
            state.event_timestamp = state.timestamp;
            if !muted {
                events.push(NotificationEvent {
                    trigger_id: trigger.id.clone(),
                    metric: metric.to_owned(),
                    value: state.value,
                    old_state: current.state,
                    state: state.state,
                    timestamp: state.timestamp,
                    subscription_id: None,
                    contact_id: None,
                    message_event_info: None,
                    is_trigger_event: false,
                });
            }
            state.suppressed = false;
        } else {
            state.event_timestamp = current.event_timestamp;
        }
        first_transition = false;
        current = state;
    }

    (current, events)
}

/// Builds the trigger-wide ERROR event used by `handle_check_result` for
/// signals that abort a whole check (duplicate names, exceptions, ...)
/// rather than a single metric's transition.
pub fn trigger_wide_event(
    trigger_id: &TriggerId,
    old_state: State,
    new_state: State,
    timestamp: i64,
    message_event_info: Option<String>,
) -> NotificationEvent {
    NotificationEvent {
        trigger_id: trigger_id.clone(),
        metric: String::new(),
        value: None,
        old_state,
        state: new_state,
        timestamp,
        subscription_id: None,
        contact_id: None,
        message_event_info,
        is_trigger_event: true,
    }
}
