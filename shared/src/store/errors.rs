use thiserror::Error;

/// §4.A: "All errors are one of: NotFound, BusyLock, Unavailable (transient
/// backend), or Fatal."
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("lock busy: {0}")]
    BusyLock(String),
    #[error("store temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("fatal store error: {0}")]
    Fatal(String),
}

impl StoreError {
    pub fn is_busy_lock(&self) -> bool {
        matches!(self, StoreError::BusyLock(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}
