//! # HTTP Directory Client
//!
//! Talks to a directory REST gateway:
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/api/v2/directory/relation` | Relation lookup |
//!
//! Request parameters travel as query string entries (`object_type`,
//! `object_key`, `relation`, `subject_type`, `with_objects`). A 404 is a
//! not-found report; any other non-2xx status is an API error. Requests are
//! sent once with the configured timeout.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;
use zeroize::Zeroizing;

use crate::error::DirectoryError;
use crate::model::{RelationRequest, RelationResponse};
use crate::Directory;

const RELATION_PATH: &str = "api/v2/directory/relation";

/// Configuration for [`HttpDirectory`].
///
/// Custom `Debug` implementation redacts the `api_key` field.
#[derive(Clone)]
pub struct DirectoryConfig {
    /// Base URL of the directory gateway.
    pub base_url: Url,
    /// Optional bearer API key.
    pub api_key: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DirectoryConfig {
    /// Configuration with no API key and a 5 second timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            timeout_secs: 5,
        }
    }

    /// Attach a bearer API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(Zeroizing::new(api_key.into()));
        self
    }
}

/// Directory client backed by a REST gateway.
#[derive(Debug, Clone)]
pub struct HttpDirectory {
    http: reqwest::Client,
    relation_url: String,
}

impl HttpDirectory {
    /// Build a client from configuration.
    pub fn new(config: DirectoryConfig) -> Result<Self, DirectoryError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", key.as_str()))
                    .map_err(|_| DirectoryError::Config("invalid API key characters".into()))?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| DirectoryError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let relation_url = format!(
            "{}/{RELATION_PATH}",
            config.base_url.as_str().trim_end_matches('/')
        );
        Ok(Self { http, relation_url })
    }
}

#[async_trait]
impl Directory for HttpDirectory {
    async fn get_relation(
        &self,
        request: &RelationRequest,
    ) -> Result<RelationResponse, DirectoryError> {
        let endpoint = format!("GET /{RELATION_PATH}");
        let with_objects = if request.with_objects { "true" } else { "false" };

        let resp = self
            .http
            .get(&self.relation_url)
            .query(&[
                ("object_type", request.object_type.as_str()),
                ("object_key", request.object_key.as_str()),
                ("relation", request.relation.as_str()),
                ("subject_type", request.subject_type.as_str()),
                ("with_objects", with_objects),
            ])
            .send()
            .await
            .map_err(|e| DirectoryError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(
                object_type = %request.object_type,
                relation = %request.relation,
                "directory relation not found"
            );
            return Err(DirectoryError::NotFound {
                object_type: request.object_type.clone(),
                object_key: request.object_key.clone(),
            });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(DirectoryError::ApiError {
                endpoint,
                status: status.as_u16(),
                body,
            });
        }

        resp.json().await.map_err(|e| DirectoryError::Deserialization {
            endpoint,
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_debug_redacts_api_key() {
        let config = DirectoryConfig::new(Url::parse("http://localhost:9292").unwrap())
            .with_api_key("super-secret");
        let debug = format!("{config:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn relation_url_ignores_trailing_slash() {
        let dir = HttpDirectory::new(DirectoryConfig::new(
            Url::parse("http://localhost:9292/").unwrap(),
        ))
        .unwrap();
        assert_eq!(dir.relation_url, "http://localhost:9292/api/v2/directory/relation");
    }
}
