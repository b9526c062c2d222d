use thiserror::Error;

/// Why a generate request did not produce an answer.
///
/// Every variant is absorbed by the session and shown to the user as the
/// same fallback message; the cause only ends up in the logs.
#[derive(Debug, Error)]
pub enum RequestFailed {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed response: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("request task ended abnormally: {0}")]
    Aborted(String),
}
