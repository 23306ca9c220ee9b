//! §4.D step 4: projects the evaluator's `Result` into a fresh `CheckData`
//! plus whatever events it implies. No evaluator error is ever silently
//! dropped (§7): every branch sets `CheckData.message` and, where the
//! table below calls for it, emits a trigger-wide event.

use shared::types::{CheckData, NotificationEvent, State, Trigger, TtlState};

use crate::error::EvaluatorError;
use crate::evaluator::{trigger_wide_event, EvaluationOutcome};

pub struct HandleOutcome {
    pub check: CheckData,
    pub events: Vec<NotificationEvent>,
}

pub fn handle_check_result(
    trigger: &Trigger,
    prev_check: &CheckData,
    now: i64,
    result: Result<EvaluationOutcome, EvaluatorError>,
) -> HandleOutcome {
    match result {
        | Ok(outcome) => {
            // The trigger's aggregate `state`/`score` carry forward from the
            // previous check unchanged on a clean evaluation — only the
            // per-metric transitions below drive state changes, and those
            // are reported purely through the emitted `events`, never by
            // rewriting the aggregate here. See DESIGN.md's "aggregate
            // carry-forward" entry.
            let mut check = CheckData {
                state: prev_check.state,
                timestamp: now,
                event_timestamp: prev_check.event_timestamp,
                score: prev_check.score,
                message: None,
                metrics: outcome.metrics,
                last_successful_check_timestamp: now,
            };
            if !outcome.events.is_empty() {
                check.event_timestamp = now;
            }
            HandleOutcome {
                check,
                events: outcome.events,
            }
        }
        | Err(EvaluatorError::NoMetrics) => no_metrics(trigger, prev_check, now),
        | Err(EvaluatorError::OnlyWildcards) => {
            only_wildcards(trigger, prev_check, now)
        }
        | Err(EvaluatorError::SameMetricNames(names)) => {
            let event = trigger_wide_event(
                &trigger.id,
                prev_check.state,
                State::Error,
                now,
                None,
            );
            HandleOutcome {
                check: degrade(
                    prev_check,
                    now,
                    State::Error,
                    format!(
                        "Several metrics have an identical name: {names}"
                    ),
                ),
                events: vec![event],
            }
        }
        | Err(EvaluatorError::UnknownFunction(name)) => {
            let event = trigger_wide_event(
                &trigger.id,
                prev_check.state,
                State::Exception,
                now,
                None,
            );
            HandleOutcome {
                check: degrade(
                    prev_check,
                    now,
                    State::Exception,
                    format!("Unknown graphite function: \"{name}\""),
                ),
                events: vec![event],
            }
        }
        | Err(EvaluatorError::RemoteUnavailable) => {
            remote_unavailable(trigger, prev_check, now)
        }
        | Err(
            e @ (EvaluatorError::FetchFailure(_)
            | EvaluatorError::WrongTargets(_)
            | EvaluatorError::MissingThresholds),
        ) => {
            let event = trigger_wide_event(
                &trigger.id,
                prev_check.state,
                State::Exception,
                now,
                None,
            );
            HandleOutcome {
                check: degrade(prev_check, now, State::Exception, e.to_string()),
                events: vec![event],
            }
        }
    }
}

fn no_metrics(trigger: &Trigger, prev_check: &CheckData, now: i64) -> HandleOutcome {
    const MESSAGE: &str = "Trigger has no metrics, check your target";
    let ttl = trigger.ttl.unwrap_or(0) as i64;
    if ttl == 0 {
        HandleOutcome {
            check: degrade(prev_check, now, State::NoData, MESSAGE.to_owned()),
            events: vec![],
        }
    } else {
        let new_state = trigger.ttl_state.to_metric_state();
        let interval = now - prev_check.last_successful_check_timestamp;
        let event = trigger_wide_event(
            &trigger.id,
            prev_check.state,
            new_state,
            now,
            Some(format!("current value is {new_state} for {interval} seconds")),
        );
        HandleOutcome {
            check: degrade(prev_check, now, new_state, MESSAGE.to_owned()),
            events: vec![event],
        }
    }
}

fn only_wildcards(
    trigger: &Trigger,
    prev_check: &CheckData,
    now: i64,
) -> HandleOutcome {
    const MESSAGE: &str = "Trigger never received metrics";
    if prev_check.metrics.is_empty()
        && matches!(trigger.ttl_state, TtlState::Ok | TtlState::Del)
    {
        let event_timestamp = if trigger.ttl_state == TtlState::Del {
            prev_check.event_timestamp
        } else {
            now
        };
        let mut check = degrade(prev_check, now, State::Ok, MESSAGE.to_owned());
        check.event_timestamp = event_timestamp;
        return HandleOutcome {
            check,
            events: vec![],
        };
    }

    let new_state = if prev_check.state == State::Ok {
        State::Error
    } else {
        trigger.ttl_state.to_metric_state()
    };
    let event = trigger_wide_event(
        &trigger.id,
        prev_check.state,
        new_state,
        now,
        None,
    );
    HandleOutcome {
        check: degrade(prev_check, now, new_state, MESSAGE.to_owned()),
        events: vec![event],
    }
}

fn remote_unavailable(
    trigger: &Trigger,
    prev_check: &CheckData,
    now: i64,
) -> HandleOutcome {
    let ttl = trigger.ttl.unwrap_or(0) as i64;
    let interval = now - prev_check.last_successful_check_timestamp;
    if interval <= ttl {
        // Swallowed silently: keep prior state, no event, and leave
        // `last_successful_check_timestamp` untouched (§8 scenario S5,
        // §9 open question notwithstanding).
        return HandleOutcome {
            check: prev_check.clone(),
            events: vec![],
        };
    }
    let event = trigger_wide_event(
        &trigger.id,
        prev_check.state,
        State::Exception,
        now,
        None,
    );
    let mut check = degrade(
        prev_check,
        now,
        State::Exception,
        format!(
            "Remote server unavailable. Trigger is not checked for {interval} seconds"
        ),
    );
    check.last_successful_check_timestamp = prev_check.last_successful_check_timestamp;
    HandleOutcome {
        check,
        events: vec![event],
    }
}

/// Builds a new `CheckData` that keeps `prev_check`'s per-metric map but
/// overrides the aggregate fields, used by every evaluator-error branch.
fn degrade(
    prev_check: &CheckData,
    now: i64,
    state: State,
    message: String,
) -> CheckData {
    CheckData {
        state,
        timestamp: now,
        event_timestamp: now,
        score: state.score(),
        message: Some(message),
        metrics: prev_check.metrics.clone(),
        last_successful_check_timestamp: now,
    }
}

#[cfg(test)]
mod tests {
    use shared::types::{CheckData, TriggerType};
    use std::collections::HashSet;

    use super::*;
    use shared::types::TriggerId;

    fn trigger() -> Trigger {
        Trigger {
            id: TriggerId::from("t1"),
            name: "test".into(),
            targets: vec!["metric.test".into()],
            warn_value: Some(10.0),
            error_value: Some(20.0),
            trigger_type: TriggerType::Rising,
            expression: None,
            patterns: vec!["metric.test".into()],
            tags: HashSet::new(),
            schedule: None,
            ttl: Some(600),
            ttl_state: TtlState::NoData,
            is_remote: false,
            mute_new_metrics: false,
        }
    }

    #[test]
    fn remote_unavailable_within_ttl_is_silent() {
        let t = trigger();
        let prev = CheckData {
            state: State::Ok,
            timestamp: 1000,
            event_timestamp: 1000,
            score: 0,
            message: None,
            metrics: Default::default(),
            last_successful_check_timestamp: 1000,
        };
        let outcome = handle_check_result(
            &t,
            &prev,
            1060,
            Err(EvaluatorError::RemoteUnavailable),
        );
        assert!(outcome.events.is_empty());
        assert_eq!(outcome.check.state, State::Ok);
        assert_eq!(outcome.check.last_successful_check_timestamp, 1000);
    }

    #[test]
    fn remote_unavailable_past_ttl_raises_exception() {
        let t = trigger();
        let prev = CheckData {
            state: State::Ok,
            timestamp: 1000,
            event_timestamp: 1000,
            score: 0,
            message: None,
            metrics: Default::default(),
            last_successful_check_timestamp: 1000,
        };
        let outcome = handle_check_result(
            &t,
            &prev,
            1700,
            Err(EvaluatorError::RemoteUnavailable),
        );
        assert_eq!(outcome.events.len(), 1);
        assert_eq!(outcome.check.state, State::Exception);
        assert_eq!(outcome.check.last_successful_check_timestamp, 1000);
    }
}
