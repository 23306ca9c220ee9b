use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{LockToken, Store, StoreError};
use crate::types::{
    CheckData,
    Contact,
    ContactId,
    NotificationEvent,
    ScheduledNotification,
    Subscription,
    SubscriptionId,
    Trigger,
    TriggerId,
};

struct Lock {
    token: String,
    expires_at: std::time::Instant,
}

#[derive(Default)]
struct Inner {
    triggers: HashMap<TriggerId, Trigger>,
    last_checks: HashMap<TriggerId, CheckData>,
    locks: HashMap<TriggerId, Lock>,
    events: VecDeque<NotificationEvent>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    contacts: HashMap<ContactId, Contact>,
    notifications: Vec<ScheduledNotification>,
    throttling: HashMap<TriggerId, DateTime<Utc>>,
    heartbeats: u64,
}

/// An in-process reference implementation of [`Store`]. Not meant for
/// production use — it exists so the checker and notifier can be exercised
/// end-to-end in tests without a real backend (see spec.md §1: persistence
/// backend internals are out of scope).
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_trigger(&self, trigger: Trigger) {
        self.inner.lock().unwrap().triggers.insert(trigger.id.clone(), trigger);
    }

    pub fn put_subscription(&self, subscription: Subscription) {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    pub fn put_contact(&self, contact: Contact) {
        self.inner.lock().unwrap().contacts.insert(contact.id.clone(), contact);
    }

    pub fn notification_count(&self) -> usize {
        self.inner.lock().unwrap().notifications.len()
    }

    pub fn heartbeat_count(&self) -> u64 {
        self.inner.lock().unwrap().heartbeats
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_trigger(&self, id: &TriggerId) -> Result<Trigger, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .triggers
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("trigger {id}")))
    }

    async fn acquire_trigger_check_lock(
        &self,
        id: &TriggerId,
        ttl: Duration,
    ) -> Result<LockToken, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let now = std::time::Instant::now();
        if let Some(existing) = inner.locks.get(id) {
            if existing.expires_at > now {
                return Err(StoreError::BusyLock(format!(
                    "triggerCheck:{id}"
                )));
            }
        }
        let token = format!("{:x}", rand::random::<u64>());
        inner.locks.insert(
            id.clone(),
            Lock {
                token: token.clone(),
                expires_at: now + ttl,
            },
        );
        Ok(LockToken(token))
    }

    async fn delete_trigger_check_lock(
        &self,
        id: &TriggerId,
        token: &LockToken,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(existing) = inner.locks.get(id) {
            if existing.token == token.0 {
                inner.locks.remove(id);
            }
        }
        Ok(())
    }

    async fn get_trigger_last_check(
        &self,
        id: &TriggerId,
    ) -> Result<Option<CheckData>, StoreError> {
        Ok(self.inner.lock().unwrap().last_checks.get(id).cloned())
    }

    async fn set_trigger_last_check(
        &self,
        id: &TriggerId,
        check: &CheckData,
        _is_remote: bool,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .last_checks
            .insert(id.clone(), check.clone());
        Ok(())
    }

    async fn remove_metrics_values(
        &self,
        _metrics: &[String],
        _until: i64,
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn remove_patterns_metrics(
        &self,
        _patterns: &[String],
    ) -> Result<(), StoreError> {
        Ok(())
    }

    async fn push_notification_event(
        &self,
        event: NotificationEvent,
        _is_trigger_event: bool,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().events.push_back(event);
        Ok(())
    }

    async fn fetch_notification_event(
        &self,
    ) -> Result<Option<NotificationEvent>, StoreError> {
        Ok(self.inner.lock().unwrap().events.pop_front())
    }

    async fn get_tags_subscriptions(
        &self,
        tags: &HashSet<String>,
    ) -> Result<Vec<Subscription>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| s.matches_tags(tags))
            .cloned()
            .collect())
    }

    async fn get_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Subscription, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("subscription {id}")))
    }

    async fn get_contact(
        &self,
        id: &ContactId,
    ) -> Result<Contact, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .contacts
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("contact {id}")))
    }

    async fn add_notification(
        &self,
        notification: ScheduledNotification,
    ) -> Result<(), StoreError> {
        self.inner.lock().unwrap().notifications.push(notification);
        Ok(())
    }

    async fn add_notifications(
        &self,
        notifications: Vec<ScheduledNotification>,
        _due: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .notifications
            .extend(notifications);
        Ok(())
    }

    async fn get_notifications(
        &self,
        from: i64,
        to: i64,
    ) -> Result<Vec<ScheduledNotification>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let (due, rest): (Vec<_>, Vec<_>) = inner
            .notifications
            .drain(..)
            .partition(|n| n.timestamp >= from && n.timestamp <= to);
        inner.notifications = rest;
        Ok(due)
    }

    async fn get_trigger_throttling(
        &self,
        id: &TriggerId,
    ) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.inner.lock().unwrap().throttling.get(id).copied())
    }

    async fn set_trigger_throttling(
        &self,
        id: &TriggerId,
        next_allowed: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .unwrap()
            .throttling
            .insert(id.clone(), next_allowed);
        Ok(())
    }

    async fn update_metrics_heartbeat(&self) -> Result<(), StoreError> {
        self.inner.lock().unwrap().heartbeats += 1;
        Ok(())
    }

    async fn get_all_trigger_ids(&self) -> Result<Vec<TriggerId>, StoreError> {
        Ok(self.inner.lock().unwrap().triggers.keys().cloned().collect())
    }
}
