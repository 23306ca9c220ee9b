//! The narrow store contract the checker and notifier depend on (component
//! A, §4.A). Persistence-backend internals are out of scope for this crate
//! (see spec.md §1 Out-of-scope); this module only defines the contract
//! plus [`memory::InMemoryStore`], an in-process reference implementation
//! used by every test in the workspace.

mod errors;
pub mod memory;

pub use errors::StoreError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

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

/// An expiring lease on `triggerCheck:<id>`, returned by
/// [`Store::acquire_trigger_check_lock`]. Mutual exclusion across
/// processes, bounded by `ttl`; the owner is expected to call
/// [`Store::delete_trigger_check_lock`] before `ttl` elapses.
#[derive(Debug, Clone)]
pub struct LockToken(pub String);

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_trigger(
        &self,
        id: &TriggerId,
    ) -> Result<Trigger, StoreError>;

    async fn acquire_trigger_check_lock(
        &self,
        id: &TriggerId,
        ttl: std::time::Duration,
    ) -> Result<LockToken, StoreError>;

    async fn delete_trigger_check_lock(
        &self,
        id: &TriggerId,
        token: &LockToken,
    ) -> Result<(), StoreError>;

    async fn get_trigger_last_check(
        &self,
        id: &TriggerId,
    ) -> Result<Option<CheckData>, StoreError>;

    async fn set_trigger_last_check(
        &self,
        id: &TriggerId,
        check: &CheckData,
        is_remote: bool,
    ) -> Result<(), StoreError>;

    /// Time-windowed compaction of source-side metric storage. `until` is
    /// the oldest timestamp still worth retaining.
    async fn remove_metrics_values(
        &self,
        metrics: &[String],
        until: i64,
    ) -> Result<(), StoreError>;

    /// Used on `ttlState=DEL` cleanup once a trigger has no metrics left.
    async fn remove_patterns_metrics(
        &self,
        patterns: &[String],
    ) -> Result<(), StoreError>;

    async fn push_notification_event(
        &self,
        event: NotificationEvent,
        is_trigger_event: bool,
    ) -> Result<(), StoreError>;

    /// FIFO pop. `Ok(None)` means the queue is currently empty (the `Empty`
    /// condition from §4.A is not an error).
    async fn fetch_notification_event(
        &self,
    ) -> Result<Option<NotificationEvent>, StoreError>;

    /// All subscriptions whose tag set is a (non-empty) subset of `tags`,
    /// plus every `anyTags` subscription.
    async fn get_tags_subscriptions(
        &self,
        tags: &std::collections::HashSet<String>,
    ) -> Result<Vec<Subscription>, StoreError>;

    async fn get_subscription(
        &self,
        id: &SubscriptionId,
    ) -> Result<Subscription, StoreError>;

    async fn get_contact(
        &self,
        id: &ContactId,
    ) -> Result<Contact, StoreError>;

    async fn add_notification(
        &self,
        notification: ScheduledNotification,
    ) -> Result<(), StoreError>;

    async fn add_notifications(
        &self,
        notifications: Vec<ScheduledNotification>,
        due: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Notifications with due timestamp in `[from, to]`, queryable by due
    /// time. Implementations remove the returned notifications atomically.
    async fn get_notifications(
        &self,
        from: i64,
        to: i64,
    ) -> Result<Vec<ScheduledNotification>, StoreError>;

    /// `(next_allowed, _)`. `None` means no throttling watermark is set.
    async fn get_trigger_throttling(
        &self,
        id: &TriggerId,
    ) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn set_trigger_throttling(
        &self,
        id: &TriggerId,
        next_allowed: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn update_metrics_heartbeat(&self) -> Result<(), StoreError>;

    /// All known trigger ids. Not named in §4.A's operation list, but the
    /// check worker pool's periodic planner (§4.D step 1: "enumerate all
    /// triggers whose `nextCheckAt ≤ now`") needs some way to discover
    /// triggers to enumerate; the original exposes this as
    /// `GetTriggerIDs`/`GetLocalTriggerIDs`/`GetRemoteTriggerIDs`. Kept
    /// narrow here as one listing op, filtered by the planner itself.
    async fn get_all_trigger_ids(&self) -> Result<Vec<TriggerId>, StoreError>;
}
