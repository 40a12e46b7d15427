//! Directory error types.

/// Errors from a directory relation lookup.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// The directory reported that the object or relation does not exist.
    #[error("{object_type}:{object_key} not found")]
    NotFound {
        object_type: String,
        object_key: String,
    },
    /// HTTP transport error.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The directory returned a non-2xx status other than 404.
    #[error("directory {endpoint} returned {status}: {body}")]
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
    /// Seed data for an in-memory directory was malformed.
    #[error("invalid directory seed: {0}")]
    Seed(#[from] serde_json::Error),
}

/// Failure to resolve an identity string to a user object.
#[derive(Debug, thiserror::Error)]
pub enum IdentityLookupError {
    /// No user is bound to the identity.
    #[error("user not found for identity [{identity}]: {reason}")]
    NotFound { identity: String, reason: String },
    /// The directory call itself failed.
    #[error(transparent)]
    Directory(DirectoryError),
}
