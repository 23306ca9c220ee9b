use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::ids::{ContactId, SubscriptionId, TriggerId};
use super::state::State;

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    pub trigger_id: TriggerId,
    pub metric: String,
    pub value: Option<f64>,
    pub old_state: State,
    pub state: State,
    pub timestamp: i64,
    pub subscription_id: Option<SubscriptionId>,
    pub contact_id: Option<ContactId>,
    /// e.g. "current value is NODATA for 610 seconds".
    pub message_event_info: Option<String>,
    /// True for trigger-wide events (exception, wildcard-only, duplicate
    /// metric names) that are not about one specific metric transition.
    pub is_trigger_event: bool,
}

impl NotificationEvent {
    pub fn is_test(&self) -> bool {
        matches!(self.state, State::Test)
    }
}
