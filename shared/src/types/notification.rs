use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::contact::Contact;
use super::event::NotificationEvent;
use super::ids::TriggerId;
use super::subscription::PlottingOptions;
use super::trigger::Trigger;

/// Minimal trigger snapshot carried in notifications, per §6.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerData {
    pub id: TriggerId,
    pub name: String,
    pub desc: Option<String>,
    pub targets: Vec<String>,
    pub warn_value: Option<f64>,
    pub error_value: Option<f64>,
    pub is_remote: bool,
    pub tags: HashSet<String>,
}

impl From<&Trigger> for TriggerData {
    fn from(trigger: &Trigger) -> Self {
        Self {
            id: trigger.id.clone(),
            name: trigger.name.clone(),
            desc: None,
            targets: trigger.targets.clone(),
            warn_value: trigger.warn_value,
            error_value: trigger.error_value,
            is_remote: trigger.is_remote,
            tags: trigger.tags.clone(),
        }
    }
}

/// Deterministic identity of a scheduled notification, used to dedup
/// `AddNotification` calls within one event-processing pass (§3, §8.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DispatchKey {
    pub contact_id: String,
    pub trigger_id: String,
    pub metric: String,
    pub state: String,
    pub timestamp: i64,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledNotification {
    pub event: NotificationEvent,
    pub trigger: TriggerData,
    pub contact: Contact,
    pub send_fail: u32,
    pub timestamp: i64,
    pub throttled: bool,
    pub plotting: PlottingOptions,
}

impl ScheduledNotification {
    pub fn dispatch_key(&self) -> DispatchKey {
        DispatchKey {
            contact_id: self.contact.id.0.clone(),
            trigger_id: self.event.trigger_id.0.clone(),
            metric: self.event.metric.clone(),
            state: self.event.state.to_string(),
            timestamp: self.event.timestamp,
        }
    }
}
