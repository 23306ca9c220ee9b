//! The per-trigger `triggerCheck:<id>` lock (§3 Lock table, §5 Exclusion,
//! §9 "Scoped lock"). [`TriggerLockGuard::acquire`] is the only way to get
//! one; holding it is how a check worker (§4.D) guarantees "at most one
//! concurrent check per trigger globally" (invariant (a)). Dropping the
//! guard releases the lock even if the holder panics or returns early on
//! any exit path, since the release itself happens in `Drop` rather than
//! requiring the caller to remember to call it.

use std::sync::Arc;
use std::time::Duration;

use shared::store::{LockToken, Store, StoreError};
use shared::types::TriggerId;

pub struct TriggerLockGuard {
    store: Arc<dyn Store>,
    trigger_id: TriggerId,
    token: Option<LockToken>,
}

impl TriggerLockGuard {
    /// §4.D step 2: `AcquireTriggerCheckLock(id, 10s)`. Returns
    /// `Err(StoreError::BusyLock(_))` when another worker already owns the
    /// lock — callers should treat that as "yield", not a failure (§7).
    pub async fn acquire(
        store: Arc<dyn Store>,
        trigger_id: TriggerId,
        ttl: Duration,
    ) -> Result<Self, StoreError> {
        let token = store.acquire_trigger_check_lock(&trigger_id, ttl).await?;
        Ok(Self {
            store,
            trigger_id,
            token: Some(token),
        })
    }
}

impl Drop for TriggerLockGuard {
    fn drop(&mut self) {
        let Some(token) = self.token.take() else {
            return;
        };
        let store = self.store.clone();
        let trigger_id = self.trigger_id.clone();
        tokio::spawn(async move {
            if let Err(err) =
                store.delete_trigger_check_lock(&trigger_id, &token).await
            {
                tracing::warn!(
                    %trigger_id,
                    error = %err,
                    "failed to release trigger check lock; it will expire on its own TTL"
                );
            }
        });
    }
}
