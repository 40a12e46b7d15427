//! Policy runtime error types.

/// Errors from policy instance selection and evaluation.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// No instance is registered under the address and none could be created.
    #[error("policy instance {0} not found")]
    InstanceNotFound(String),
    /// No default instance is configured.
    #[error("no default policy instance configured")]
    NoDefaultInstance,
    /// The runtime rejected or failed to evaluate the query.
    #[error("query [{query}] failed: {reason}")]
    Query { query: String, reason: String },
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The runtime returned an unexpected non-2xx status.
    #[error("runtime {endpoint} returned {status}: {body}")]
    ApiError {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// Client configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),
}
