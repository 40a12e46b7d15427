//! # OPA-Compatible REST Runtime
//!
//! Drives a policy engine that speaks the OPA REST API:
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | GET    | `/v1/policies` | Enumerate compiled modules (package names) |
//! | POST   | `/v1/query` | Evaluate an ad-hoc query |
//! | POST   | `/v1/compile` | Partially evaluate a query |
//!
//! Explain, pretty, metrics, and instrument options travel as query string
//! parameters. A 400 response is a query error carrying the engine's message;
//! any other non-2xx status is an API error. Requests are never retried.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;
use verdict_core::{ExplainMode, InstanceAddress};
use zeroize::Zeroizing;

use crate::error::RuntimeError;
use crate::registry::RuntimeFactory;
use crate::{CompileResult, EvalOptions, EvalResult, PolicyRuntime};

/// Configuration for [`OpaHttpRuntime`].
///
/// Custom `Debug` implementation redacts the `token` field.
#[derive(Clone)]
pub struct OpaConfig {
    /// Base URL of the engine, e.g. `http://localhost:8181`.
    pub base_url: Url,
    /// Optional bearer token.
    pub token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for OpaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpaConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpaConfig {
    /// Configuration with no token and a 10 second timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            token: None,
            timeout_secs: 10,
        }
    }
}

// -- Wire types ---------------------------------------------------------------

#[derive(Deserialize)]
struct PoliciesResponse {
    #[serde(default)]
    result: Vec<PolicyModule>,
}

#[derive(Deserialize)]
struct PolicyModule {
    ast: ModuleAst,
}

#[derive(Deserialize)]
struct ModuleAst {
    package: PackageAst,
}

#[derive(Deserialize)]
struct PackageAst {
    path: Vec<PathTerm>,
}

#[derive(Deserialize)]
struct PathTerm {
    value: Value,
}

impl PackageAst {
    /// Dotted package name without the leading `data` term.
    fn name(&self) -> String {
        self.path
            .iter()
            .skip(1)
            .map(|t| match &t.value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

#[derive(Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
    input: &'a Value,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    metrics: Option<Map<String, Value>>,
    #[serde(default)]
    explanation: Option<Vec<Value>>,
}

#[derive(Serialize)]
struct CompileRequest<'a> {
    query: &'a str,
    input: &'a Value,
    unknowns: &'a [String],
    options: CompileOptions<'a>,
}

#[derive(Serialize)]
struct CompileOptions<'a> {
    #[serde(rename = "disableInlining")]
    disable_inlining: &'a [String],
}

#[derive(Deserialize)]
struct CompileResponse {
    #[serde(default)]
    result: Option<Map<String, Value>>,
    #[serde(default)]
    metrics: Option<Map<String, Value>>,
    #[serde(default)]
    explanation: Option<Vec<Value>>,
}

// -- Client -------------------------------------------------------------------

/// Policy runtime backed by an OPA-compatible REST engine.
#[derive(Debug, Clone)]
pub struct OpaHttpRuntime {
    http: reqwest::Client,
    base_url: String,
}

impl OpaHttpRuntime {
    /// Build a client from configuration.
    pub fn new(config: OpaConfig) -> Result<Self, RuntimeError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.token {
            headers.insert(
                reqwest::header::AUTHORIZATION,
                reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                    .map_err(|_| RuntimeError::Config("invalid token characters".into()))?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| RuntimeError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let base_url = config.base_url.as_str().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    fn option_params(options: &EvalOptions) -> Vec<(&'static str, &'static str)> {
        let mut params = Vec::new();
        if options.explain != ExplainMode::Off {
            params.push(("explain", options.explain.as_str()));
        }
        if options.pretty {
            params.push(("pretty", "true"));
        }
        if options.metrics {
            params.push(("metrics", "true"));
        }
        if options.instrument {
            params.push(("instrument", "true"));
        }
        params
    }

    /// Send a request and map transport and status failures.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
        query: Option<&str>,
    ) -> Result<reqwest::Response, RuntimeError> {
        let resp = request.send().await.map_err(|e| RuntimeError::Http {
            endpoint: endpoint.to_string(),
            source: e,
        })?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        match (status, query) {
            (reqwest::StatusCode::BAD_REQUEST, Some(query)) => Err(RuntimeError::Query {
                query: query.to_string(),
                reason: body,
            }),
            _ => Err(RuntimeError::ApiError {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            }),
        }
    }
}

#[async_trait]
impl PolicyRuntime for OpaHttpRuntime {
    async fn list_packages(&self, internal_prefix: &str) -> Result<Vec<String>, RuntimeError> {
        let endpoint = "GET /v1/policies";
        let url = format!("{}/v1/policies", self.base_url);

        let resp = self.send(self.http.get(&url), endpoint, None).await?;
        let policies: PoliciesResponse = resp
            .json()
            .await
            .map_err(|e| RuntimeError::Deserialization {
                endpoint: endpoint.to_string(),
                source: e,
            })?;

        let names: BTreeSet<String> = policies
            .result
            .iter()
            .map(|m| m.ast.package.name())
            .filter(|name| name.starts_with(internal_prefix))
            .collect();
        Ok(names.into_iter().collect())
    }

    async fn evaluate(
        &self,
        query: &str,
        input: &Value,
        options: &EvalOptions,
    ) -> Result<EvalResult, RuntimeError> {
        let endpoint = "POST /v1/query";
        let url = format!("{}/v1/query", self.base_url);

        let request = self
            .http
            .post(&url)
            .query(&Self::option_params(options))
            .json(&QueryRequest { query, input });
        let resp = self.send(request, endpoint, Some(query)).await?;
        let body: QueryResponse = resp
            .json()
            .await
            .map_err(|e| RuntimeError::Deserialization {
                endpoint: endpoint.to_string(),
                source: e,
            })?;

        Ok(EvalResult {
            bindings: body.result.unwrap_or_default(),
            metrics: body.metrics,
            explanation: body.explanation,
        })
    }

    async fn compile(
        &self,
        query: &str,
        input: &Value,
        unknowns: &[String],
        disable_inlining: bool,
        options: &EvalOptions,
    ) -> Result<CompileResult, RuntimeError> {
        let endpoint = "POST /v1/compile";
        let url = format!("{}/v1/compile", self.base_url);

        let no_inlining: &[String] = if disable_inlining { unknowns } else { &[] };
        let request = self
            .http
            .post(&url)
            .query(&Self::option_params(options))
            .json(&CompileRequest {
                query,
                input,
                unknowns,
                options: CompileOptions {
                    disable_inlining: no_inlining,
                },
            });
        let resp = self.send(request, endpoint, Some(query)).await?;
        let body: CompileResponse = resp
            .json()
            .await
            .map_err(|e| RuntimeError::Deserialization {
                endpoint: endpoint.to_string(),
                source: e,
            })?;

        Ok(CompileResult {
            result: body.result.unwrap_or_default(),
            metrics: body.metrics,
            explanation: body.explanation,
        })
    }
}

/// Creates [`OpaHttpRuntime`]s from a URL template.
///
/// The template may contain `{tenant_id}`, `{policy_name}`, and
/// `{instance_label}` placeholders, e.g.
/// `http://opa-{tenant_id}.policies.svc:8181`.
pub struct OpaRuntimeFactory {
    template: String,
    token: Option<Zeroizing<String>>,
    timeout_secs: u64,
}

impl std::fmt::Debug for OpaRuntimeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpaRuntimeFactory")
            .field("template", &self.template)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl OpaRuntimeFactory {
    /// Factory expanding `template` per address.
    pub fn new(
        template: impl Into<String>,
        token: Option<Zeroizing<String>>,
        timeout_secs: u64,
    ) -> Self {
        Self {
            template: template.into(),
            token,
            timeout_secs,
        }
    }

    /// Expand the template for `address`.
    pub fn url_for(&self, address: &InstanceAddress) -> Result<Url, RuntimeError> {
        let raw = self
            .template
            .replace("{tenant_id}", &address.tenant_id)
            .replace("{policy_name}", &address.policy_name)
            .replace("{instance_label}", &address.instance_label);
        Url::parse(&raw)
            .map_err(|e| RuntimeError::Config(format!("invalid instance URL for {address}: {e}")))
    }
}

impl RuntimeFactory for OpaRuntimeFactory {
    fn create(&self, address: &InstanceAddress) -> Result<Arc<dyn PolicyRuntime>, RuntimeError> {
        let config = OpaConfig {
            base_url: self.url_for(address)?,
            token: self.token.clone(),
            timeout_secs: self.timeout_secs,
        };
        Ok(Arc::new(OpaHttpRuntime::new(config)?))
    }
}
