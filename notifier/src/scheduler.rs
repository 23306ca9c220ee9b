//! Component E (§4.E). Turns an accepted event into a
//! [`ScheduledNotification`] due at some future (or immediate) timestamp,
//! and decides whether a subscription wants to hear about an event at all.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use shared::store::{Store, StoreError};
use shared::types::{
    Contact,
    NotificationEvent,
    PlottingOptions,
    ScheduledNotification,
    Schedule,
    Subscription,
    TriggerData,
};

/// §4.E: `TEST` events are due immediately and bypass throttling entirely;
/// everything else is shifted past the trigger's throttle watermark, any
/// resend backoff, and the subscription's delivery window, in that order.
pub async fn schedule_notification(
    store: &dyn Store,
    now: DateTime<Utc>,
    event: NotificationEvent,
    trigger: TriggerData,
    contact: Contact,
    plotting: PlottingOptions,
    throttling_enabled: bool,
    send_fail: u32,
    schedule: Option<&Schedule>,
) -> Result<ScheduledNotification, StoreError> {
    if event.is_test() {
        return Ok(ScheduledNotification {
            event,
            trigger,
            contact,
            send_fail: 0,
            timestamp: now.timestamp(),
            throttled: false,
            plotting,
        });
    }

    let next_allowed = if throttling_enabled {
        store.get_trigger_throttling(&event.trigger_id).await?
    } else {
        None
    };
    let base = match next_allowed {
        | Some(t) if t > now => t,
        | _ => now,
    };

    let due = if send_fail > 0 {
        now + chrono::Duration::minutes(1)
    } else if let Some(schedule) = schedule {
        schedule.next_enabled_minute(base)
    } else {
        base
    };

    Ok(ScheduledNotification {
        event,
        trigger,
        contact,
        send_fail,
        timestamp: due.timestamp(),
        throttled: due > now,
        plotting,
    })
}

/// §4.E `isNotificationRequired`. `None` subscription (e.g. a `TEST` event
/// whose contact/subscription id resolved to nothing) never requires a
/// notification.
pub fn is_notification_required(
    subscription: Option<&Subscription>,
    trigger_tags: &HashSet<String>,
    event: &NotificationEvent,
) -> bool {
    let Some(subscription) = subscription else {
        return false;
    };
    if event.is_test() {
        return true;
    }
    subscription.enabled
        && !must_ignore(subscription, event)
        && tags_match(subscription, trigger_tags)
}

/// Standalone, independently testable wrapper around
/// [`Subscription::must_ignore`] — mirrors `subscription.MustIgnore` being
/// called as its own step in the original's `isNotificationRequired`.
pub fn must_ignore(subscription: &Subscription, event: &NotificationEvent) -> bool {
    subscription.must_ignore(event)
}

/// Standalone wrapper around [`Subscription::matches_tags`] — mirrors the
/// original's free `moira.Subset(subscription.Tags, trigger.Tags)` helper.
pub fn tags_match(subscription: &Subscription, trigger_tags: &HashSet<String>) -> bool {
    subscription.matches_tags(trigger_tags)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use shared::store::memory::InMemoryStore;
    use shared::types::{ContactId, OwnerId, State, SubscriptionId};

    use super::*;

    fn event(state: State) -> NotificationEvent {
        NotificationEvent {
            trigger_id: "t1".into(),
            metric: "m".into(),
            value: Some(1.0),
            old_state: State::Ok,
            state,
            timestamp: 1000,
            subscription_id: None,
            contact_id: None,
            message_event_info: None,
            is_trigger_event: false,
        }
    }

    fn subscription() -> Subscription {
        Subscription {
            id: SubscriptionId::from("s1"),
            user: OwnerId::from("u1"),
            enabled: true,
            tags: HashSet::from(["a".to_owned()]),
            any_tags: false,
            contacts: vec![ContactId::from("c1")],
            schedule: None,
            throttling_enabled: false,
            ignore_warnings: false,
            ignore_recoverings: false,
            plotting: Default::default(),
        }
    }

    fn contact() -> Contact {
        Contact {
            id: ContactId::from("c1"),
            user: OwnerId::from("u1"),
            contact_type: "webhook".into(),
            value: "https://example.test/hook".into(),
        }
    }

    #[test]
    fn test_events_are_always_required() {
        assert!(is_notification_required(
            None,
            &HashSet::new(),
            &event(State::Test)
        ));
    }

    #[test]
    fn disabled_subscription_is_never_required() {
        let mut sub = subscription();
        sub.enabled = false;
        assert!(!is_notification_required(
            Some(&sub),
            &HashSet::from(["a".to_owned()]),
            &event(State::Error)
        ));
    }

    #[test]
    fn non_matching_tags_are_not_required() {
        let sub = subscription();
        assert!(!is_notification_required(
            Some(&sub),
            &HashSet::from(["b".to_owned()]),
            &event(State::Error)
        ));
    }

    #[tokio::test]
    async fn test_event_is_due_immediately_and_unthrottled() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let n = schedule_notification(
            &store,
            now,
            event(State::Test),
            TriggerData::default(),
            contact(),
            Default::default(),
            true,
            0,
            None,
        )
        .await
        .unwrap();
        assert_eq!(n.timestamp, now.timestamp());
        assert!(!n.throttled);
    }

    #[tokio::test]
    async fn resend_backs_off_by_one_minute() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let n = schedule_notification(
            &store,
            now,
            event(State::Error),
            TriggerData::default(),
            contact(),
            Default::default(),
            false,
            1,
            None,
        )
        .await
        .unwrap();
        assert!(n.timestamp >= now.timestamp() + 60);
        assert!(n.throttled);
    }

    #[tokio::test]
    async fn throttling_watermark_pushes_due_time_out() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        let next_allowed = now + chrono::Duration::seconds(120);
        store
            .set_trigger_throttling(&"t1".into(), next_allowed)
            .await
            .unwrap();
        let n = schedule_notification(
            &store,
            now,
            event(State::Error),
            TriggerData::default(),
            contact(),
            Default::default(),
            true,
            0,
            None,
        )
        .await
        .unwrap();
        assert_eq!(n.timestamp, next_allowed.timestamp());
        assert!(n.throttled);
    }
}
