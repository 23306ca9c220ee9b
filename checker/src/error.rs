use thiserror::Error;

use shared::metric_source::FetchError;
use shared::store::StoreError;

/// §7 Error handling design: the evaluator's error kinds. None of these
/// abort a worker — `handle_check_result` (§4.D) projects every one of
/// them into a `CheckData` plus, where the table says so, a trigger-wide
/// event. There is no silent-drop path.
#[derive(Debug, Error, Clone)]
pub enum EvaluatorError {
    #[error("unknown graphite function: \"{0}\"")]
    UnknownFunction(String),
    #[error("remote server unavailable")]
    RemoteUnavailable,
    #[error("fetch failed: {0}")]
    FetchFailure(String),
    #[error("trigger has no metrics")]
    NoMetrics,
    #[error("trigger has only wildcard metrics")]
    OnlyWildcards,
    #[error("several metrics have an identical name: {0}")]
    SameMetricNames(String),
    #[error("wrong targets at indices {0:?}")]
    WrongTargets(Vec<usize>),
    #[error("error value and warning value can not be empty")]
    MissingThresholds,
}

impl From<FetchError> for EvaluatorError {
    fn from(value: FetchError) -> Self {
        match value {
            | FetchError::UnknownFunction(name) => {
                EvaluatorError::UnknownFunction(name)
            }
            | FetchError::RemoteUnavailable => {
                EvaluatorError::RemoteUnavailable
            }
            | FetchError::FetchFailure(msg) => {
                EvaluatorError::FetchFailure(msg)
            }
        }
    }
}

/// Errors that can terminate a single check-worker iteration outright
/// (store-level failures); everything evaluator-shaped is folded into
/// `CheckData` instead and never reaches this type.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("trigger check lock is held by another worker")]
    BusyLock,
    #[error(transparent)]
    Store(#[from] StoreError),
}
