//! Trigger evaluation scheduling window (supplemented feature #5 in
//! SPEC_FULL.md: the original applies one `ScheduleData` shape to both
//! triggers and subscriptions; §3 only spells out the subscription side in
//! detail, so the trigger-side gate lives here, consulted by the planner
//! before a trigger id is queued for a check).

use chrono::{DateTime, Utc};
use shared::types::Trigger;

/// A trigger with no `schedule` is always in-window. One with a schedule
/// is only checked during its enabled minutes, in its configured offset.
pub fn is_trigger_in_schedule(trigger: &Trigger, now: DateTime<Utc>) -> bool {
    match &trigger.schedule {
        | Some(schedule) => schedule.contains(now),
        | None => true,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use shared::types::{Schedule, ScheduleDay, TriggerId, TriggerType, TtlState};

    use super::*;

    fn trigger_with_schedule(schedule: Option<Schedule>) -> Trigger {
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
            schedule,
            ttl: Some(600),
            ttl_state: TtlState::NoData,
            is_remote: false,
            mute_new_metrics: false,
        }
    }

    #[test]
    fn no_schedule_is_always_in_window() {
        let t = trigger_with_schedule(None);
        assert!(is_trigger_in_schedule(&t, Utc::now()));
    }

    #[test]
    fn disabled_day_is_out_of_window() {
        let mut days = [ScheduleDay::always(); 7];
        for day in days.iter_mut() {
            day.enabled = false;
        }
        let t = trigger_with_schedule(Some(Schedule {
            timezone_offset_minutes: 0,
            days,
        }));
        assert!(!is_trigger_in_schedule(&t, Utc::now()));
    }
}
