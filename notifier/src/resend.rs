//! `resend(pkg, reason)` from §4.G: the single path every delivery failure
//! routes through, whether the failure is "no sender for this contact
//! type", "enqueue timed out", or "the sender itself returned an error".

use chrono::Utc;
use shared::store::Store;
use tracing::{error, warn};

use crate::dispatch::Package;
use crate::scheduler;

/// Reschedules every event in `pkg` one minute out with an incremented
/// `send_fail`, unless the package has already been retried past
/// `resending_timeout_s` — then it's dropped and logged, matching the
/// original's `FailCount * time.Minute > ResendingTimeout` cutoff.
pub async fn resend(
    store: &dyn Store,
    resending_timeout_s: u64,
    pkg: Package,
    reason: &str,
) {
    warn!(
        reason,
        fail_count = pkg.send_fail,
        trigger_id = %pkg.trigger.id,
        "can't send message, will retry"
    );

    if u64::from(pkg.send_fail) * 60 > resending_timeout_s {
        error!(
            trigger_id = %pkg.trigger.id,
            "stop resending: notification interval timed out"
        );
        return;
    }

    let next_send_fail = pkg.send_fail + 1;
    for event in pkg.events {
        match scheduler::schedule_notification(
            store,
            Utc::now(),
            event,
            pkg.trigger.clone(),
            pkg.contact.clone(),
            pkg.plotting.clone(),
            false,
            next_send_fail,
            None,
        )
        .await
        {
            | Ok(notification) => {
                if let Err(err) = store.add_notification(notification).await {
                    error!(error = %err, "failed to save rescheduled notification");
                }
            }
            | Err(err) => error!(error = %err, "failed to reschedule notification"),
        }
    }
}
