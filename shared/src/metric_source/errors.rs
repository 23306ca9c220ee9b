use thiserror::Error;

/// §4.B: "`Fetch` fails with `UnknownFunction(name)`, `RemoteUnavailable`,
/// or `FetchFailure`."
#[derive(Debug, Error, Clone)]
pub enum FetchError {
    #[error("unknown graphite function: \"{0}\"")]
    UnknownFunction(String),
    #[error("remote metric store unavailable")]
    RemoteUnavailable,
    #[error("fetch failed: {0}")]
    FetchFailure(String),
}
