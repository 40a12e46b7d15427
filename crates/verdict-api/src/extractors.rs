//! # Request Extractors
//!
//! Per-request metadata carried in headers rather than the JSON body:
//!
//! | Header | Meaning |
//! |--------|---------|
//! | `x-policy-instance-id` | tenant identifier |
//! | `x-policy-name` | policy name within the tenant |
//! | `x-instance-label` | instance label within the tenant |
//! | `x-request-timeout-ms` | request deadline override |

use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use verdict_core::PolicyContext;
use verdict_engine::CallScope;

use crate::error::AppError;
use crate::state::AppState;

pub const POLICY_INSTANCE_ID_HEADER: &str = "x-policy-instance-id";
pub const POLICY_NAME_HEADER: &str = "x-policy-name";
pub const INSTANCE_LABEL_HEADER: &str = "x-instance-label";
pub const REQUEST_TIMEOUT_HEADER: &str = "x-request-timeout-ms";

/// Instance addressing supplied through headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyHeaders {
    pub instance_id: Option<String>,
    pub policy_name: Option<String>,
    pub instance_label: Option<String>,
}

impl PolicyHeaders {
    fn from_headers(headers: &HeaderMap) -> Result<Self, AppError> {
        Ok(Self {
            instance_id: header_str(headers, POLICY_INSTANCE_ID_HEADER)?,
            policy_name: header_str(headers, POLICY_NAME_HEADER)?,
            instance_label: header_str(headers, INSTANCE_LABEL_HEADER)?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.instance_id.is_none() && self.policy_name.is_none() && self.instance_label.is_none()
    }

    /// Overwrite the addressing fields of `ctx` with any header present.
    pub fn apply(&self, ctx: &mut PolicyContext) {
        if let Some(id) = &self.instance_id {
            ctx.id = id.clone();
        }
        if let Some(name) = &self.policy_name {
            ctx.name = name.clone();
        }
        if let Some(label) = &self.instance_label {
            ctx.instance_label = label.clone();
        }
    }

    /// Apply to an optional context, creating one when headers are present.
    pub fn apply_optional(&self, ctx: &mut Option<PolicyContext>) {
        if self.is_empty() {
            return;
        }
        self.apply(ctx.get_or_insert_with(PolicyContext::default));
    }
}

#[axum::async_trait]
impl<S: Send + Sync> FromRequestParts<S> for PolicyHeaders {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Self::from_headers(&parts.headers)
    }
}

/// The [`CallScope`] bounding this request.
///
/// The deadline is `x-request-timeout-ms` when present, otherwise the
/// configured default. A disconnecting client drops the handler future and
/// with it every pending collaborator call.
#[derive(Debug, Clone)]
pub struct RequestScope(pub CallScope);

#[axum::async_trait]
impl FromRequestParts<AppState> for RequestScope {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let timeout = match header_str(&parts.headers, REQUEST_TIMEOUT_HEADER)? {
            Some(raw) => {
                let ms: u64 = raw.parse().map_err(|_| {
                    AppError::BadRequest(format!("{REQUEST_TIMEOUT_HEADER} must be an integer"))
                })?;
                if ms == 0 {
                    return Err(AppError::BadRequest(format!(
                        "{REQUEST_TIMEOUT_HEADER} must be positive"
                    )));
                }
                Duration::from_millis(ms)
            }
            None => state.request_timeout,
        };
        Ok(Self(CallScope::unbounded().with_timeout(timeout)))
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Result<Option<String>, AppError> {
    match headers.get(name) {
        None => Ok(None),
        Some(value) => {
            let s = value
                .to_str()
                .map_err(|_| AppError::BadRequest(format!("header {name} is not valid ASCII")))?
                .trim();
            Ok((!s.is_empty()).then(|| s.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn headers_fill_policy_context() {
        let mut headers = HeaderMap::new();
        headers.insert(POLICY_INSTANCE_ID_HEADER, HeaderValue::from_static("acme"));
        headers.insert(POLICY_NAME_HEADER, HeaderValue::from_static("peoplefinder"));
        let policy = PolicyHeaders::from_headers(&headers).unwrap();

        let mut ctx = PolicyContext::new("app.GET", ["allowed"]);
        policy.apply(&mut ctx);
        assert_eq!(ctx.id, "acme");
        assert_eq!(ctx.name, "peoplefinder");
        assert_eq!(ctx.path, "app.GET");
        assert!(ctx.address().is_some());
    }

    #[test]
    fn absent_headers_leave_optional_context_unset() {
        let policy = PolicyHeaders::from_headers(&HeaderMap::new()).unwrap();
        let mut ctx = None;
        policy.apply_optional(&mut ctx);
        assert!(ctx.is_none());
    }

    #[test]
    fn blank_headers_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(INSTANCE_LABEL_HEADER, HeaderValue::from_static("  "));
        let policy = PolicyHeaders::from_headers(&headers).unwrap();
        assert!(policy.is_empty());
    }
}
