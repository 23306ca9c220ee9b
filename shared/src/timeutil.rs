//! Small time-axis helpers shared by the evaluator (§4.C) and the
//! scheduler (§4.E).

use chrono::{DateTime, Utc};

/// Rounds `timestamp` down to the nearest multiple of `step`, matching the
/// original's `moira.TruncateTimestampToMomentInPast`. Returns `timestamp`
/// unchanged when `step <= 0`.
pub fn truncate_to_step(timestamp: i64, step: i64) -> i64 {
    if step <= 0 {
        return timestamp;
    }
    timestamp - timestamp.rem_euclid(step)
}

/// Iterates `from..=until` in `step` increments, the walk the evaluator
/// performs in §4.C step 3. Empty when `step <= 0` or `from > until`.
pub fn step_range(from: i64, until: i64, step: i64) -> impl Iterator<Item = i64> {
    let step = step.max(0);
    let mut current = from;
    std::iter::from_fn(move || {
        if step == 0 || current > until {
            None
        } else {
            let value = current;
            current += step;
            Some(value)
        }
    })
}

pub fn now_ts(now: DateTime<Utc>) -> i64 {
    now.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_rounds_down() {
        assert_eq!(truncate_to_step(3617, 10), 3610);
        assert_eq!(truncate_to_step(3610, 10), 3610);
    }

    #[test]
    fn step_range_is_inclusive_of_until() {
        let values: Vec<i64> = step_range(0, 20, 10).collect();
        assert_eq!(values, vec![0, 10, 20]);
    }

    #[test]
    fn step_range_empty_when_from_after_until() {
        let values: Vec<i64> = step_range(100, 50, 10).collect();
        assert!(values.is_empty());
    }
}
