//! Configuration module for eventsync-server.
//!
//! Loads the service description from a file or from the environment,
//! validates it, and resolves the runtime settings given on the command
//! line. Also handles admin secret hashing.

pub mod file;
pub mod runtime;

use std::sync::Arc;

use eventsync_core::config::{self as service_config, AggregatedConfigError, ServiceConfig};
use thiserror::Error;
use url::Url;

use crate::config::file::ConfigSource;

/// Default Pub/Sub REST endpoint.
pub const DEFAULT_PUBSUB_ENDPOINT: &str = "https://pubsub.googleapis.com";

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read the service description from {source_name}: {error}")]
    Io {
        source_name: String,
        error: std::io::Error,
    },

    #[error("failed to parse the service description: {0}")]
    Parse(#[from] service_config::ConfigError),

    #[error("the service description {0}")]
    Invalid(#[from] AggregatedConfigError),

    #[error("no service description given, use --config or EVENTSYNC_CONFIG")]
    MissingSource,

    #[error("invalid Pub/Sub endpoint {value:?}: {error}")]
    PubSubEndpoint {
        value: String,
        error: url::ParseError,
    },

    #[error("password hashing error: {0}")]
    HashError(String),

    #[error("DATABASE_URL environment variable not set")]
    MissingDatabaseUrl,
}

/// A validated service description.
pub struct LoadedConfig {
    pub service: Arc<ServiceConfig>,
    /// Human readable acceptance report.
    pub report: String,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    source: ConfigSource,
}

impl ConfigLoader {
    pub fn new(source: ConfigSource) -> Self {
        Self { source }
    }

    /// Pick the source: an explicit file wins over the inline document.
    pub fn from_args(
        path: Option<std::path::PathBuf>,
        inline: Option<String>,
    ) -> Result<Self, ConfigError> {
        match (path, inline) {
            (Some(path), _) => Ok(Self::new(ConfigSource::File(path))),
            (None, Some(raw)) if !raw.trim().is_empty() => Ok(Self::new(ConfigSource::Inline(raw))),
            _ => Err(ConfigError::MissingSource),
        }
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    /// Read, parse and validate the service description.
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let raw = self.source.read().map_err(|error| ConfigError::Io {
            source_name: self.source.describe(),
            error,
        })?;
        let document = service_config::load(&raw, self.source.format())?;
        let validated = service_config::validate(&document)?;

        Ok(LoadedConfig {
            service: Arc::new(validated.config),
            report: validated.report,
        })
    }
}

/// Resolve the Pub/Sub endpoint. The emulator host takes precedence and may
/// be given without a scheme, e.g. `localhost:8085`.
pub fn pubsub_endpoint(
    emulator_host: Option<&str>,
    endpoint: Option<&str>,
) -> Result<Url, ConfigError> {
    let raw = emulator_host
        .or(endpoint)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_PUBSUB_ENDPOINT);
    let with_scheme = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    };

    Url::parse(&with_scheme).map_err(|error| ConfigError::PubSubEndpoint {
        value: raw.to_string(),
        error,
    })
}

/// Get the database URL given by `--database-url` or `DATABASE_URL`.
pub fn get_database_url(database_url: Option<String>) -> Result<String, ConfigError> {
    database_url
        .filter(|url| !url.is_empty())
        .ok_or(ConfigError::MissingDatabaseUrl)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVICE_JSON: &str = r#"{
        "serviceName": "orders",
        "endpoints": [
            {"eventKey": "paid", "acceptedHttpMethods": ["post"]},
            {"eventKey": "shipped"}
        ],
        "trigger": {"type": "window", "observationPeriod": 600},
        "targetSink": {"webhook": "https://hooks.example.com/orders"}
    }"#;

    #[test]
    fn test_load_inline_document() {
        let loader = ConfigLoader::from_args(None, Some(SERVICE_JSON.to_string())).unwrap();
        let loaded = loader.load().unwrap();

        assert_eq!(loaded.service.service_name, "orders");
        assert_eq!(loaded.service.endpoints.len(), 2);
        assert!(loaded.report.contains("orders"));
    }

    #[test]
    fn test_missing_source() {
        assert!(matches!(
            ConfigLoader::from_args(None, None),
            Err(ConfigError::MissingSource)
        ));
        assert!(matches!(
            ConfigLoader::from_args(None, Some("  ".to_string())),
            Err(ConfigError::MissingSource)
        ));
    }

    #[test]
    fn test_invalid_document_is_rejected() {
        let loader = ConfigLoader::new(ConfigSource::Inline(
            r#"{"serviceName": "", "endpoints": []}"#.to_string(),
        ));
        let err = loader.load().err().unwrap();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("blocking error"));

        let loader = ConfigLoader::new(ConfigSource::Inline("{not json".to_string()));
        assert!(matches!(loader.load(), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let loader = ConfigLoader::new(ConfigSource::File("/nonexistent/service.json".into()));
        assert!(matches!(loader.load(), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_pubsub_endpoint_resolution() {
        assert_eq!(
            pubsub_endpoint(None, None).unwrap().as_str(),
            "https://pubsub.googleapis.com/"
        );
        assert_eq!(
            pubsub_endpoint(Some("localhost:8085"), Some("https://other.example.com"))
                .unwrap()
                .as_str(),
            "http://localhost:8085/"
        );
        assert_eq!(
            pubsub_endpoint(None, Some("https://pubsub.example.com"))
                .unwrap()
                .as_str(),
            "https://pubsub.example.com/"
        );
        assert!(pubsub_endpoint(Some("http://[bad"), None).is_err());
    }
}
