//! Component F (§4.F): drains the event queue, resolves trigger and
//! subscriptions (or a synthetic subscription for `TEST` events), and hands
//! each accepted (event, subscription, contact) tuple to the scheduler.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use shared::shutdown::Shutdown;
use shared::store::{Store, StoreError};
use shared::types::{NotificationEvent, Subscription, TriggerData};
use tracing::{debug, instrument, warn};

use crate::scheduler;

pub struct EventFetchWorker {
    store: Arc<dyn Store>,
}

impl EventFetchWorker {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn run(&self, mut shutdown: Shutdown) {
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = self.tick() => {}
            }
        }
    }

    /// One iteration of `FetchEventsWorker.Start`'s select loop: fetch one
    /// event and process it, or back off when the queue is empty/unhealthy.
    async fn tick(&self) {
        match self.store.fetch_notification_event().await {
            | Ok(Some(event)) => {
                counter!("notifier.events_received_total", 1);
                if let Err(err) = self.process_event(event).await {
                    counter!("notifier.events_processing_failed_total", 1);
                    warn!(error = %err, "failed to process notification event");
                }
            }
            | Ok(None) => {
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            | Err(err) => {
                counter!("notifier.events_malformed_total", 1);
                warn!(error = %err, "failed to fetch notification event");
                tokio::time::sleep(Duration::from_secs(5)).await;
            }
        }
    }

    #[instrument(skip(self, event), fields(trigger_id = %event.trigger_id, metric = %event.metric))]
    async fn process_event(&self, event: NotificationEvent) -> Result<(), StoreError> {
        let (trigger_data, subscriptions) = if event.is_test() {
            let subscription = self.resolve_test_subscription(&event).await?;
            (TriggerData::default(), subscription.into_iter().collect())
        } else {
            let trigger = self.store.get_trigger(&event.trigger_id).await?;
            if trigger.tags.is_empty() {
                return Err(StoreError::NotFound(format!(
                    "no tags found for trigger id {}",
                    event.trigger_id
                )));
            }
            let trigger_data = TriggerData::from(&trigger);
            let subscriptions =
                self.store.get_tags_subscriptions(&trigger.tags).await?;
            (trigger_data, subscriptions)
        };

        let mut duplications = HashSet::new();
        for subscription in &subscriptions {
            if !scheduler::is_notification_required(
                Some(subscription),
                &trigger_data.tags,
                &event,
            ) {
                continue;
            }

            for contact_id in &subscription.contacts {
                let contact = match self.store.get_contact(contact_id).await {
                    | Ok(contact) => contact,
                    | Err(err) => {
                        warn!(
                            %contact_id,
                            error = %err,
                            "failed to resolve contact, skipping it"
                        );
                        continue;
                    }
                };

                let mut event_for_contact = event.clone();
                event_for_contact.subscription_id = Some(subscription.id.clone());

                let notification = scheduler::schedule_notification(
                    self.store.as_ref(),
                    Utc::now(),
                    event_for_contact,
                    trigger_data.clone(),
                    contact,
                    subscription.plotting.clone(),
                    subscription.throttling_enabled,
                    0,
                    subscription.schedule.as_ref(),
                )
                .await?;

                let key = notification.dispatch_key();
                if duplications.insert(key) {
                    if let Err(err) =
                        self.store.add_notification(notification).await
                    {
                        warn!(error = %err, "failed to save scheduled notification");
                    }
                } else {
                    debug!(contact_id = %contact_id, "skipping duplicate notification for contact");
                }
            }
        }
        Ok(())
    }

    /// §4.F step 3, `getNotificationSubscriptions` in the original: resolve a
    /// `TEST` event's subscription by id, or synthesize one from its contact
    /// id, or signal "nothing to notify" when neither is present.
    async fn resolve_test_subscription(
        &self,
        event: &NotificationEvent,
    ) -> Result<Option<Subscription>, StoreError> {
        if let Some(subscription_id) = &event.subscription_id {
            return self.store.get_subscription(subscription_id).await.map(Some);
        }
        if let Some(contact_id) = &event.contact_id {
            let contact = self.store.get_contact(contact_id).await?;
            return Ok(Some(Subscription::synthetic_for_test(
                contact.user,
                contact.id,
            )));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use shared::store::memory::InMemoryStore;
    use shared::types::{
        Contact,
        ContactId,
        OwnerId,
        State,
        Subscription,
        SubscriptionId,
        Trigger,
        TriggerId,
        TriggerType,
        TtlState,
    };
    use std::collections::HashSet;

    use super::*;

    fn trigger(tags: &[&str]) -> Trigger {
        Trigger {
            id: TriggerId::from("t1"),
            name: "test".into(),
            targets: vec!["metric.test".into()],
            warn_value: Some(10.0),
            error_value: Some(20.0),
            trigger_type: TriggerType::Rising,
            expression: None,
            patterns: vec!["metric.test".into()],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            schedule: None,
            ttl: Some(600),
            ttl_state: TtlState::NoData,
            is_remote: false,
            mute_new_metrics: false,
        }
    }

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

    #[tokio::test]
    async fn dedups_two_subscriptions_sharing_one_contact() {
        let store = Arc::new(InMemoryStore::new());
        store.put_trigger(trigger(&["a"]));
        store.put_contact(Contact {
            id: ContactId::from("c1"),
            user: OwnerId::from("u1"),
            contact_type: "webhook".into(),
            value: "https://example.test".into(),
        });
        store.put_subscription(Subscription {
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
        });
        store.put_subscription(Subscription {
            id: SubscriptionId::from("s2"),
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
        });

        let worker = EventFetchWorker::new(store.clone());
        worker.process_event(event(State::Error)).await.unwrap();

        assert_eq!(store.notification_count(), 1);
    }

    #[tokio::test]
    async fn no_tags_trigger_is_an_error() {
        let store = Arc::new(InMemoryStore::new());
        store.put_trigger(trigger(&[]));
        let worker = EventFetchWorker::new(store);
        assert!(worker.process_event(event(State::Error)).await.is_err());
    }

    #[tokio::test]
    async fn test_event_resolves_synthetic_subscription_from_contact() {
        let store = Arc::new(InMemoryStore::new());
        store.put_contact(Contact {
            id: ContactId::from("c1"),
            user: OwnerId::from("u1"),
            contact_type: "webhook".into(),
            value: "https://example.test".into(),
        });
        let mut test_event = event(State::Test);
        test_event.contact_id = Some(ContactId::from("c1"));

        let worker = EventFetchWorker::new(store.clone());
        worker.process_event(test_event).await.unwrap();

        assert_eq!(store.notification_count(), 1);
    }
}
