//! # Service Configuration
//!
//! Every setting is a CLI flag with an environment-variable fallback.
//! Statically known policy instances come from an optional YAML file:
//!
//! ```yaml
//! instances:
//!   - tenant_id: acme
//!     policy_name: peoplefinder
//!     url: http://opa-acme.policies.svc:8181
//!   - tenant_id: acme
//!     instance_label: canary
//!     url: http://opa-acme-canary.policies.svc:8181
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::{ArgAction, Parser, ValueEnum};
use serde::Deserialize;
use url::Url;
use verdict_core::InstanceAddress;

/// Where Is decisions are recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionLogSetting {
    /// Decisions are not recorded.
    Off,
    /// One structured tracing event per decision.
    Tracing,
    /// JSON lines appended to a file.
    File(PathBuf),
}

impl FromStr for DecisionLogSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(Self::Off),
            "tracing" => Ok(Self::Tracing),
            other => match other.strip_prefix("file:") {
                Some(path) if !path.is_empty() => Ok(Self::File(PathBuf::from(path))),
                _ => Err(format!(
                    "invalid decision log setting {other:?}: expected off, tracing or file:<path>"
                )),
            },
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Service configuration.
///
/// Custom `Debug` redacts every credential.
#[derive(Clone, Parser)]
#[command(name = "verdict-api", version, about = "Policy decision service")]
pub struct AppConfig {
    /// Listen port.
    #[arg(long, env = "PORT", default_value_t = 8383)]
    pub port: u16,

    /// Bearer token required on /api routes. Unset disables authentication.
    #[arg(long, env = "AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Directory gateway base URL.
    #[arg(long, env = "DIRECTORY_URL")]
    pub directory_url: Option<Url>,

    #[arg(long, env = "DIRECTORY_API_KEY", hide_env_values = true)]
    pub directory_api_key: Option<String>,

    #[arg(long, env = "DIRECTORY_TIMEOUT_SECS", default_value_t = 5)]
    pub directory_timeout_secs: u64,

    /// JSON seed for an in-process directory, used when no directory URL is set.
    #[arg(long, env = "DIRECTORY_SEED_FILE")]
    pub directory_seed_file: Option<PathBuf>,

    /// Policy engine serving the default instance.
    #[arg(long, env = "RUNTIME_URL")]
    pub runtime_url: Option<Url>,

    #[arg(long, env = "RUNTIME_TOKEN", hide_env_values = true)]
    pub runtime_token: Option<String>,

    #[arg(long, env = "RUNTIME_TIMEOUT_SECS", default_value_t = 10)]
    pub runtime_timeout_secs: u64,

    /// URL template for instances not listed in the instances file, e.g.
    /// `http://opa-{tenant_id}.svc:8181`.
    #[arg(long, env = "INSTANCE_URL_TEMPLATE")]
    pub instance_url_template: Option<String>,

    /// YAML file listing statically known policy instances.
    #[arg(long, env = "INSTANCES_FILE")]
    pub instances_file: Option<PathBuf>,

    #[arg(long, env = "ENABLE_RESOURCE_CONTEXT", default_value_t = true, action = ArgAction::Set)]
    pub enable_resource_context: bool,

    #[arg(long, env = "ENABLE_IDENTITY_CONTEXT", default_value_t = true, action = ArgAction::Set)]
    pub enable_identity_context: bool,

    /// `off`, `tracing` or `file:<path>`.
    #[arg(long, env = "DECISION_LOG", default_value = "tracing")]
    pub decision_log: DecisionLogSetting,

    /// Default per-request deadline in milliseconds.
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value_t = 5000)]
    pub request_timeout_ms: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &redact(&self.auth_token))
            .field("directory_url", &self.directory_url)
            .field("directory_api_key", &redact(&self.directory_api_key))
            .field("directory_timeout_secs", &self.directory_timeout_secs)
            .field("directory_seed_file", &self.directory_seed_file)
            .field("runtime_url", &self.runtime_url)
            .field("runtime_token", &redact(&self.runtime_token))
            .field("runtime_timeout_secs", &self.runtime_timeout_secs)
            .field("instance_url_template", &self.instance_url_template)
            .field("instances_file", &self.instances_file)
            .field("enable_resource_context", &self.enable_resource_context)
            .field("enable_identity_context", &self.enable_identity_context)
            .field("decision_log", &self.decision_log)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Configuration with every default applied and nothing attached.
    pub fn defaults() -> Self {
        Self::parse_from(["verdict-api"])
    }
}

/// One statically known policy instance.
#[derive(Clone, Deserialize)]
pub struct InstanceEntry {
    pub tenant_id: String,
    #[serde(default)]
    pub policy_name: String,
    #[serde(default)]
    pub instance_label: String,
    pub url: Url,
    #[serde(default)]
    pub token: Option<String>,
}

impl std::fmt::Debug for InstanceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceEntry")
            .field("tenant_id", &self.tenant_id)
            .field("policy_name", &self.policy_name)
            .field("instance_label", &self.instance_label)
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
struct InstancesFile {
    #[serde(default)]
    instances: Vec<InstanceEntry>,
}

/// Configuration file errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("instance {index} in {path} is not addressable: tenant_id and one of policy_name or instance_label are required")]
    Unaddressable { path: PathBuf, index: usize },
}

/// Parse the instances YAML document, pairing each entry with its address.
pub fn parse_instances(
    path: &Path,
    contents: &str,
) -> Result<Vec<(InstanceAddress, InstanceEntry)>, ConfigError> {
    let file: InstancesFile =
        serde_yaml::from_str(contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
    file.instances
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            InstanceAddress::new(&entry.tenant_id, &entry.policy_name, &entry.instance_label)
                .map(|address| (address, entry))
                .ok_or_else(|| ConfigError::Unaddressable {
                    path: path.to_path_buf(),
                    index,
                })
        })
        .collect()
}

/// Read and parse the instances file at `path`.
pub async fn load_instances(
    path: &Path,
) -> Result<Vec<(InstanceAddress, InstanceEntry)>, ConfigError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    parse_instances(path, &contents)
}

/// Read a JSON directory seed.
pub async fn load_directory_seed(path: &Path) -> Result<serde_json::Value, ConfigError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}
