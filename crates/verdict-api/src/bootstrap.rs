//! # Bootstrap
//!
//! Builds the [`AppState`] from an [`AppConfig`]: the directory client, the
//! policy instance registry, and the decision log sink.

use std::sync::Arc;
use std::time::Duration;

use verdict_directory::{Directory, DirectoryConfig, HttpDirectory, MemoryDirectory};
use verdict_engine::{
    Authorizer, AuthorizerConfig, DecisionLogger, FileDecisionLogger, IdentityResolver,
    TracingDecisionLogger,
};
use verdict_runtime::{InstanceRegistry, OpaConfig, OpaHttpRuntime, OpaRuntimeFactory};
use zeroize::Zeroizing;

use crate::config::{load_directory_seed, load_instances, AppConfig, ConfigError, DecisionLogSetting};
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Startup failure.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("directory client: {0}")]
    Directory(#[from] verdict_directory::DirectoryError),
    #[error("policy runtime client: {0}")]
    Runtime(#[from] verdict_runtime::RuntimeError),
    #[error("decision log: {0}")]
    DecisionLog(#[from] verdict_engine::DecisionLogError),
    #[error("metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Assemble the application state described by `config`.
pub async fn bootstrap(config: &AppConfig) -> Result<AppState, BootstrapError> {
    let resolver = match build_directory(config).await? {
        Some(directory) => IdentityResolver::new(directory),
        None => IdentityResolver::without_directory(),
    };
    let registry = build_registry(config).await?;
    tracing::info!(
        addressed_instances = registry.len(),
        default_instance = registry.has_default(),
        "policy instances configured"
    );

    let authorizer_config = AuthorizerConfig {
        enable_resource_context: config.enable_resource_context,
        enable_identity_context: config.enable_identity_context,
    };
    let mut authorizer = Authorizer::new(authorizer_config, Arc::new(registry), resolver);
    if let Some(logger) = build_decision_log(&config.decision_log).await? {
        authorizer = authorizer.with_decision_log(logger);
    }

    Ok(AppState::new(Arc::new(authorizer), ApiMetrics::new()?)
        .with_auth_token(config.auth_token.clone())
        .with_request_timeout(Duration::from_millis(config.request_timeout_ms)))
}

async fn build_directory(config: &AppConfig) -> Result<Option<Arc<dyn Directory>>, BootstrapError> {
    if let Some(url) = &config.directory_url {
        let mut dir_config = DirectoryConfig::new(url.clone());
        dir_config.timeout_secs = config.directory_timeout_secs;
        if let Some(key) = &config.directory_api_key {
            dir_config = dir_config.with_api_key(key.clone());
        }
        tracing::info!(url = %url, "directory gateway configured");
        let directory: Arc<dyn Directory> = Arc::new(HttpDirectory::new(dir_config)?);
        return Ok(Some(directory));
    }
    if let Some(path) = &config.directory_seed_file {
        let seed = load_directory_seed(path).await?;
        tracing::info!(path = %path.display(), "in-process directory seeded");
        let directory: Arc<dyn Directory> = Arc::new(MemoryDirectory::from_json(seed)?);
        return Ok(Some(directory));
    }
    tracing::warn!("no directory configured; identities other than NONE will fail to resolve");
    Ok(None)
}

async fn build_registry(config: &AppConfig) -> Result<InstanceRegistry, BootstrapError> {
    let runtime_token = config.runtime_token.clone().map(Zeroizing::new);
    let mut registry = InstanceRegistry::new();

    if let Some(url) = &config.runtime_url {
        let runtime = OpaHttpRuntime::new(OpaConfig {
            base_url: url.clone(),
            token: runtime_token.clone(),
            timeout_secs: config.runtime_timeout_secs,
        })?;
        registry = registry.with_default(Arc::new(runtime));
    } else {
        tracing::warn!("no default policy runtime configured");
    }

    if let Some(template) = &config.instance_url_template {
        registry = registry.with_factory(Arc::new(OpaRuntimeFactory::new(
            template.clone(),
            runtime_token.clone(),
            config.runtime_timeout_secs,
        )));
    }

    if let Some(path) = &config.instances_file {
        for (address, entry) in load_instances(path).await? {
            let runtime = OpaHttpRuntime::new(OpaConfig {
                base_url: entry.url.clone(),
                token: entry.token.clone().map(Zeroizing::new).or_else(|| runtime_token.clone()),
                timeout_secs: config.runtime_timeout_secs,
            })?;
            tracing::debug!(instance = %address, url = %entry.url, "registering policy instance");
            registry.register(address, Arc::new(runtime));
        }
    }
    Ok(registry)
}

async fn build_decision_log(
    setting: &DecisionLogSetting,
) -> Result<Option<Arc<dyn DecisionLogger>>, BootstrapError> {
    let logger: Arc<dyn DecisionLogger> = match setting {
        DecisionLogSetting::Off => return Ok(None),
        DecisionLogSetting::Tracing => Arc::new(TracingDecisionLogger),
        DecisionLogSetting::File(path) => {
            tracing::info!(path = %path.display(), "decision log file opened");
            Arc::new(FileDecisionLogger::open(path).await?)
        }
    };
    Ok(Some(logger))
}
