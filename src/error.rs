use thiserror::Error;

/// Crate-level error enum. Every fallible operation in the pipeline funnels
/// into one of these variants; total transforms (sanitize, rewrite, inject)
/// have no failure path by design and never appear here.
#[derive(Debug, Error)]
pub enum LabError {
    /// Non-success HTTP status from the generation or session endpoint.
    /// Carries the status code and the raw response body.
    #[error("transport error (status {status}): {body}")]
    Transport { status: u16, body: String },

    /// The endpoint answered 2xx but the envelope is missing the required
    /// candidates/content/parts shape.
    #[error("malformed response from generation endpoint: {0}")]
    MalformedResponse(String),

    /// Topic was empty or whitespace-only after trimming.
    #[error("topic must not be empty")]
    InvalidTopic,

    /// A newer generation run claimed the run token; this run's remaining
    /// work is discarded instead of racing to publish.
    #[error("generation run superseded by a newer run")]
    Superseded,

    /// Configuration could not be loaded or is missing a required value.
    #[error("config error: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
