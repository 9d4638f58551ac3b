use thiserror::Error;

/// Errors the pipeline stages branch on.
///
/// Most code paths return `anyhow::Result`; these variants are attached to the
/// chain where a caller needs to tell a transient failure from a permanent one.
#[derive(Debug, Error)]
pub enum RestabotError {
    #[error("{service} returned HTTP {status}: {body}")]
    Api {
        service: String,
        status: u16,
        body: String,
    },

    #[error("Slack API error: {0}")]
    Slack(String),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("no image found for {0}")]
    MissingImage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RestabotError {
    pub fn api(service: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::Api {
            service: service.into(),
            status,
            body: body.into(),
        }
    }

    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Slack(code) => code == "ratelimited" || code == "internal_error",
            _ => false,
        }
    }
}

/// Walks an `anyhow` chain looking for a retryable [`RestabotError`].
pub fn is_retryable(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<RestabotError>())
        .any(RestabotError::is_retryable)
}
