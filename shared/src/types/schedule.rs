use serde::{Deserialize, Serialize};

/// One weekday's enabled window, expressed as minutes since midnight in the
/// schedule's timezone. `start <= end`; a day with `enabled = false` never
/// matches regardless of `start`/`end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub enabled: bool,
    pub start_minute: u16,
    pub end_minute: u16,
}

impl ScheduleDay {
    pub fn always() -> Self {
        Self {
            enabled: true,
            start_minute: 0,
            end_minute: 24 * 60,
        }
    }

    fn contains(&self, minute_of_day: u16) -> bool {
        self.enabled
            && minute_of_day >= self.start_minute
            && minute_of_day < self.end_minute
    }
}

/// Weekly recurring delivery/evaluation window, anchored to a fixed UTC
/// offset rather than an IANA timezone (matches the original's
/// `TimezoneOffset`-in-minutes representation).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Offset from UTC in minutes, e.g. `-300` for US Eastern standard time.
    pub timezone_offset_minutes: i32,
    /// Monday .. Sunday, index 0 = Monday.
    pub days: [ScheduleDay; 7],
}

impl Schedule {
    pub fn always() -> Self {
        Self {
            timezone_offset_minutes: 0,
            days: [ScheduleDay::always(); 7],
        }
    }

    /// Is `at` (any timezone) inside an enabled window of this schedule?
    pub fn contains(&self, at: chrono::DateTime<chrono::Utc>) -> bool {
        use chrono::{Datelike, Timelike};
        let shifted = at + chrono::Duration::minutes(self.timezone_offset_minutes as i64);
        let weekday_index = shifted.weekday().num_days_from_monday() as usize;
        let minute_of_day = (shifted.hour() * 60 + shifted.minute()) as u16;
        self.days[weekday_index].contains(minute_of_day)
    }

    /// Nearest minute at or after `from` that falls inside an enabled
    /// window, scanning up to 7 days ahead. Returns `from` unchanged if the
    /// schedule never disables (or already matches).
    pub fn next_enabled_minute(
        &self,
        from: chrono::DateTime<chrono::Utc>,
    ) -> chrono::DateTime<chrono::Utc> {
        let mut candidate = from;
        let limit = from + chrono::Duration::days(8);
        while candidate < limit {
            if self.contains(candidate) {
                return candidate;
            }
            candidate += chrono::Duration::minutes(1);
        }
        // Pathological all-disabled schedule: don't hang the caller forever.
        from
    }
}
