use thiserror::Error;

/// Errors a `Sender` can report back to the dispatch worker (§4.G step 4:
/// "Sender workers consume and invoke the sender capability; failure →
/// resend(pkg, err.Error())"). Every variant routes to [`crate::resend`]; none
/// of them abort the dispatch worker.
#[derive(Debug, Error, Clone)]
pub enum SendError {
    #[error("request timed out")]
    Timeout,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("contact rejected delivery: {0}")]
    Rejected(String),
}
