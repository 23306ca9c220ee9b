use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::ids::TriggerId;
use super::schedule::Schedule;
use super::state::TtlState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Rising,
    Falling,
    Expression,
}

/// A named, scheduled evaluator over one or more metric queries.
///
/// Immutable except via the explicit update path; the checker never mutates
/// a `Trigger` while evaluating it.
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub id: TriggerId,
    pub name: String,
    pub targets: Vec<String>,
    pub warn_value: Option<f64>,
    pub error_value: Option<f64>,
    pub trigger_type: TriggerType,
    pub expression: Option<String>,
    pub patterns: Vec<String>,
    pub tags: HashSet<String>,
    pub schedule: Option<Schedule>,
    #[serde(with = "ttl_as_string")]
    pub ttl: Option<u64>,
    pub ttl_state: TtlState,
    pub is_remote: bool,
    pub mute_new_metrics: bool,
}

impl Trigger {
    /// `allowRealTimeAlerting` per §4.C: true iff there is exactly one
    /// target to fetch.
    pub fn allows_real_time_alerting(&self) -> bool {
        self.targets.len() == 1
    }

    pub fn main_target(&self) -> Option<&str> {
        self.targets.first().map(String::as_str)
    }

    pub fn additional_targets(&self) -> &[String] {
        if self.targets.len() > 1 {
            &self.targets[1..]
        } else {
            &[]
        }
    }

    pub fn has_thresholds(&self) -> bool {
        self.warn_value.is_some() || self.error_value.is_some()
    }
}

/// Historically `trigger.ttl` is serialized as a string: empty string means
/// `None`/`0`, a numeric string parses to `Some`. We preserve this external
/// wire compatibility on both read and write.
mod ttl_as_string {
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(
        value: &Option<u64>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = match value {
            | Some(v) => v.to_string(),
            | None => String::new(),
        };
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse::<u64>().map(Some).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_round_trips_through_string() {
        let t = sample_trigger(Some(600));
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"ttl\":\"600\""));
        let back: Trigger = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ttl, Some(600));
    }

    #[test]
    fn empty_ttl_string_parses_to_none() {
        let t = sample_trigger(None);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"ttl\":\"\""));
        let back: Trigger = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ttl, None);
    }

    fn sample_trigger(ttl: Option<u64>) -> Trigger {
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
            ttl,
            ttl_state: TtlState::NoData,
            is_remote: false,
            mute_new_metrics: false,
        }
    }
}
