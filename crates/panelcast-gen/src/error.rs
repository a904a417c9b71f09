use std::time::Duration;

/// Errors from the generation backend, HTTP and CLI paths combined.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The backend host did not answer the reachability probe.
    #[error("ollama not reachable at {host}: {source}")]
    Unreachable {
        host: String,
        source: reqwest::Error,
    },

    /// The requested model is not loaded on the backend.
    #[error("model {model} not available via api")]
    ModelUnavailable { model: String },

    /// The backend answered with a non-success status.
    #[error("ollama returned HTTP {status}")]
    BadStatus { status: u16 },

    /// The response carried neither `message.content` nor `response`.
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),

    /// The CLI fallback exited non-zero.
    #[error("ollama cli failed: {0}")]
    CliFailed(String),

    /// The CLI fallback binary is not installed.
    #[error("ollama cli not found on PATH")]
    CliMissing,

    /// The CLI fallback exceeded its time budget and was killed.
    #[error("ollama cli timed out after {0:?}")]
    CliTimeout(Duration),

    /// HTTP client layer error.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error while supervising the CLI fallback.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GenerationError>;
