//! Component G (§4.G): drains due notifications every tick, batches them
//! into per-(contact, trigger, throttle-state, retry-count) packages, and
//! hands each to the sender channel matching its contact type.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use shared::shutdown::Shutdown;
use shared::store::Store;
use shared::types::{Contact, ContactId, NotificationEvent, PlottingOptions, TriggerData, TriggerId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{instrument, warn};

use crate::resend;
use crate::sender::Sender;

/// One batched delivery attempt: every event here shares a contact, a
/// trigger, a throttle state, and a retry count, so one `Sender::send_events`
/// call can carry all of them at once.
#[derive(Clone)]
pub struct Package {
    pub events: Vec<NotificationEvent>,
    pub trigger: TriggerData,
    pub contact: Contact,
    pub plotting: PlottingOptions,
    pub throttled: bool,
    pub send_fail: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PackageKey {
    contact_id: ContactId,
    trigger_id: TriggerId,
    throttled: bool,
    send_fail: u32,
}

pub struct DispatchWorker {
    store: Arc<dyn Store>,
    channels: HashMap<String, mpsc::Sender<Package>>,
    tick_interval: Duration,
    sending_timeout: Duration,
    resending_timeout_s: u64,
}

impl DispatchWorker {
    /// Spawns one sender-loop task per `Sender`, each consuming its own
    /// bounded channel, and returns the worker plus those tasks' handles so
    /// the caller can join them on shutdown alongside the dispatch tick loop.
    pub fn new(
        store: Arc<dyn Store>,
        senders: Vec<Arc<dyn Sender>>,
        channel_capacity: usize,
        tick_interval: Duration,
        sending_timeout: Duration,
        resending_timeout_s: u64,
    ) -> (Arc<Self>, Vec<JoinHandle<()>>) {
        let mut channels = HashMap::with_capacity(senders.len());
        let mut sender_tasks = Vec::with_capacity(senders.len());
        for sender in senders {
            let (tx, rx) = mpsc::channel(channel_capacity);
            channels.insert(sender.contact_type().to_owned(), tx);
            let store = store.clone();
            sender_tasks.push(tokio::spawn(Self::sender_loop(
                sender,
                rx,
                store,
                resending_timeout_s,
            )));
        }
        (
            Arc::new(Self {
                store,
                channels,
                tick_interval,
                sending_timeout,
                resending_timeout_s,
            }),
            sender_tasks,
        )
    }

    async fn sender_loop(
        sender: Arc<dyn Sender>,
        mut rx: mpsc::Receiver<Package>,
        store: Arc<dyn Store>,
        resending_timeout_s: u64,
    ) {
        while let Some(pkg) = rx.recv().await {
            counter!("notifier.send_attempts_total", 1);
            let result = sender
                .send_events(&pkg.events, &pkg.contact, &pkg.trigger, &pkg.plotting, pkg.throttled)
                .await;
            match result {
                | Ok(()) => counter!("notifier.sends_succeeded_total", 1),
                | Err(err) => {
                    counter!("notifier.sends_failed_total", 1);
                    resend::resend(
                        store.as_ref(),
                        resending_timeout_s,
                        pkg,
                        &err.to_string(),
                    )
                    .await;
                }
            }
        }
    }

    pub async fn run(self: Arc<Self>, mut shutdown: Shutdown) {
        let mut ticker = tokio::time::interval(self.tick_interval);
        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }
    }

    #[instrument(skip(self))]
    async fn tick(&self) {
        let now = Utc::now().timestamp();
        let due = match self.store.get_notifications(0, now).await {
            | Ok(due) => due,
            | Err(err) => {
                warn!(error = %err, "failed to fetch due notifications");
                return;
            }
        };
        if due.is_empty() {
            return;
        }
        for package in group_into_packages(due) {
            self.dispatch_package(package).await;
        }
    }

    async fn dispatch_package(&self, package: Package) {
        let Some(channel) = self.channels.get(&package.contact.contact_type).cloned() else {
            resend::resend(
                self.store.as_ref(),
                self.resending_timeout_s,
                package,
                &format!("unknown contact type [{}]", package.contact.contact_type),
            )
            .await;
            return;
        };

        let fallback = package.clone();
        match tokio::time::timeout(self.sending_timeout, channel.send(package)).await {
            | Ok(Ok(())) => {}
            | Ok(Err(_)) => {
                resend::resend(
                    self.store.as_ref(),
                    self.resending_timeout_s,
                    fallback,
                    "sender channel closed",
                )
                .await;
            }
            | Err(_) => {
                resend::resend(
                    self.store.as_ref(),
                    self.resending_timeout_s,
                    fallback,
                    "timed out enqueueing package",
                )
                .await;
            }
        }
    }
}

/// §4.G step 2: group by `(contact, trigger, throttled, sendFail)`, merging
/// events in timestamp order. Grouping includes the contact id (not just its
/// type) so two different recipients of the same contact type never get
/// merged into one delivery.
fn group_into_packages(
    mut notifications: Vec<shared::types::ScheduledNotification>,
) -> Vec<Package> {
    notifications.sort_by_key(|n| n.event.timestamp);

    let mut order = Vec::new();
    let mut by_key: HashMap<PackageKey, Package> = HashMap::new();
    for notification in notifications {
        let key = PackageKey {
            contact_id: notification.contact.id.clone(),
            trigger_id: notification.event.trigger_id.clone(),
            throttled: notification.throttled,
            send_fail: notification.send_fail,
        };
        by_key
            .entry(key.clone())
            .and_modify(|pkg| pkg.events.push(notification.event.clone()))
            .or_insert_with(|| {
                order.push(key.clone());
                Package {
                    events: vec![notification.event.clone()],
                    trigger: notification.trigger.clone(),
                    contact: notification.contact.clone(),
                    plotting: notification.plotting.clone(),
                    throttled: notification.throttled,
                    send_fail: notification.send_fail,
                }
            });
    }
    order
        .into_iter()
        .filter_map(|key| by_key.remove(&key))
        .collect()
}

#[cfg(test)]
mod tests {
    use shared::types::{OwnerId, State};

    use super::*;

    fn notification(
        contact_id: &str,
        trigger_id: &str,
        timestamp: i64,
    ) -> shared::types::ScheduledNotification {
        shared::types::ScheduledNotification {
            event: NotificationEvent {
                trigger_id: trigger_id.into(),
                metric: "m".into(),
                value: Some(1.0),
                old_state: State::Ok,
                state: State::Error,
                timestamp,
                subscription_id: None,
                contact_id: None,
                message_event_info: None,
                is_trigger_event: false,
            },
            trigger: TriggerData {
                id: trigger_id.into(),
                ..Default::default()
            },
            contact: Contact {
                id: contact_id.into(),
                user: OwnerId::from("u1"),
                contact_type: "webhook".into(),
                value: "https://example.test".into(),
            },
            send_fail: 0,
            timestamp,
            throttled: false,
            plotting: Default::default(),
        }
    }

    #[test]
    fn groups_by_contact_trigger_throttle_and_fail_count() {
        let notifications = vec![
            notification("c1", "t1", 200),
            notification("c1", "t1", 100),
            notification("c2", "t1", 150),
        ];
        let packages = group_into_packages(notifications);
        assert_eq!(packages.len(), 2);
        let c1_pkg = packages
            .iter()
            .find(|p| p.contact.id.0 == "c1")
            .expect("c1 package present");
        assert_eq!(c1_pkg.events.len(), 2);
        assert_eq!(c1_pkg.events[0].timestamp, 100);
        assert_eq!(c1_pkg.events[1].timestamp, 200);
    }
}
