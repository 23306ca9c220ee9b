use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

use super::event::NotificationEvent;
use super::ids::{ContactId, OwnerId, SubscriptionId};
use super::schedule::Schedule;
use super::state::State;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlottingOptions {
    pub enabled: bool,
    pub theme: Option<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user: OwnerId,
    pub enabled: bool,
    pub tags: HashSet<String>,
    pub any_tags: bool,
    pub contacts: Vec<ContactId>,
    pub schedule: Option<Schedule>,
    pub throttling_enabled: bool,
    pub ignore_warnings: bool,
    pub ignore_recoverings: bool,
    pub plotting: PlottingOptions,
}

impl Subscription {
    /// Synthetic subscription built from a bare contact id on `TEST`
    /// events that don't carry a `subscription_id` (§4.F step 3).
    pub fn synthetic_for_test(user: OwnerId, contact: ContactId) -> Self {
        Self {
            id: SubscriptionId::from("testSubscription"),
            user,
            enabled: true,
            tags: HashSet::new(),
            any_tags: false,
            contacts: vec![contact],
            schedule: None,
            throttling_enabled: false,
            ignore_warnings: false,
            ignore_recoverings: false,
            plotting: PlottingOptions::default(),
        }
    }

    /// `ignoreRecoverings` when severity doesn't increase, `ignoreWarnings`
    /// when either side of the transition is WARN. Matches
    /// `SubscriptionData.MustIgnore` in the original.
    pub fn must_ignore(&self, event: &NotificationEvent) -> bool {
        if self.ignore_recoverings && !event.state.worse_than(&event.old_state)
        {
            return true;
        }
        if self.ignore_warnings
            && (event.state == State::Warn || event.old_state == State::Warn)
        {
            return true;
        }
        false
    }

    /// `subscription.anyTags OR subscription.tags ⊆ trigger.tags`, per
    /// invariant (iv) in §3.
    pub fn matches_tags(&self, trigger_tags: &HashSet<String>) -> bool {
        self.any_tags || (!self.tags.is_empty() && self.tags.is_subset(trigger_tags))
    }
}
