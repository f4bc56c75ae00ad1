//! Service configuration.
//!
//! The raw document (`eventsync_sdk::objects::ServiceConfigDocument`) is loaded
//! by [`load`] without any semantic check, then turned into the normalized
//! [`ServiceConfig`] by [`validate`]. The normalized config is immutable for
//! the whole process lifetime.

mod admin;
mod validator;

pub use admin::AdminConfig;
pub use validator::{AggregatedConfigError, ConfigViolation, ValidatedConfig, validate};

use eventsync_sdk::objects::{
    EndpointDocument, HttpMethod, SelectionPolicy, ServiceConfigDocument, TargetSinkDocument,
    TriggerDocument, TriggerType,
};
use smallvec::SmallVec;
use thiserror::Error;
use url::Url;

/// Accepted methods of an endpoint. Never more than the 8 known methods.
pub type MethodSet = SmallVec<[HttpMethod; 8]>;

/// Normalized service description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service identity. Scopes stored events and the trigger lock.
    pub service_name: String,
    /// Endpoints in configuration order.
    pub endpoints: Vec<Endpoint>,
    pub trigger: TriggerConfig,
    pub sink: SinkTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub event_key: String,
    /// Canonical uppercase methods, deduplicated, never empty.
    pub accepted_methods: MethodSet,
    /// Always at least 1.
    pub min_occurrence: u32,
    pub selection_policy: SelectionPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerConfig {
    pub trigger_type: TriggerType,
    /// Length of the observation window in seconds. Always > 0.
    pub observation_period_secs: u64,
    pub keep_after_trigger: bool,
}

/// Where published aggregates go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkTarget {
    /// Google Pub/Sub topic `projects/<project>/topics/<topic>`.
    PubSubTopic { project: String, topic: String },
    /// HTTP(S) endpoint receiving a JSON `POST`.
    Webhook { url: Url },
}

impl ServiceConfig {
    /// Look up an endpoint by its event key.
    pub fn endpoint(&self, event_key: &str) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.event_key == event_key)
    }

    /// Event keys in configuration order.
    pub fn event_keys(&self) -> Vec<String> {
        self.endpoints.iter().map(|e| e.event_key.clone()).collect()
    }
}

impl TriggerConfig {
    pub fn observation_period(&self) -> time::Duration {
        time::Duration::seconds(i64::try_from(self.observation_period_secs).unwrap_or(i64::MAX))
    }
}

impl std::fmt::Display for SinkTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkTarget::PubSubTopic { project, topic } => {
                write!(f, "projects/{project}/topics/{topic}")
            }
            SinkTarget::Webhook { url } => write!(f, "{url}"),
        }
    }
}

impl From<&ServiceConfig> for ServiceConfigDocument {
    fn from(config: &ServiceConfig) -> Self {
        let target_sink = match &config.sink {
            SinkTarget::PubSubTopic { .. } => TargetSinkDocument {
                topic: Some(config.sink.to_string()),
                webhook: None,
            },
            SinkTarget::Webhook { url } => TargetSinkDocument {
                topic: None,
                webhook: Some(url.to_string()),
            },
        };

        ServiceConfigDocument {
            service_name: config.service_name.clone(),
            endpoints: config
                .endpoints
                .iter()
                .map(|e| EndpointDocument {
                    event_key: e.event_key.clone(),
                    accepted_http_methods: e
                        .accepted_methods
                        .iter()
                        .map(|m| m.as_str().to_string())
                        .collect(),
                    min_nb_of_occurrence: i64::from(e.min_occurrence),
                    event_to_send: e.selection_policy.as_str().to_string(),
                })
                .collect(),
            trigger: Some(TriggerDocument {
                trigger_type: config.trigger.trigger_type.as_str().to_string(),
                observation_period: i64::try_from(config.trigger.observation_period_secs)
                    .unwrap_or(i64::MAX),
                keep_event_after_trigger: config.trigger.keep_after_trigger,
            }),
            target_sink: Some(target_sink),
        }
    }
}

/// Encoding of a raw service description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
}

/// The raw service description could not be parsed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON service description: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML service description: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Deserialize a raw service description. No semantic validation happens
/// here; see [`validate`].
pub fn load(raw: &str, format: ConfigFormat) -> Result<ServiceConfigDocument, ConfigError> {
    let document = match format {
        ConfigFormat::Json => serde_json::from_str(raw)?,
        ConfigFormat::Toml => toml::from_str(raw)?,
    };
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_json_keeps_raw_tokens() {
        let raw = r#"{
            "serviceName": "orders",
            "endpoints": [
                {"eventKey": "paid", "acceptedHttpMethods": ["post", "Put"]},
                {"eventKey": "shipped", "minNbOfOccurrence": -1, "eventToSend": "first"}
            ],
            "trigger": {"type": "window", "observationPeriod": 3600},
            "targetPubSub": {"topic": "projects/p/topics/t"}
        }"#;

        let doc = load(raw, ConfigFormat::Json).unwrap();
        assert_eq!(doc.service_name, "orders");
        assert_eq!(doc.endpoints[0].accepted_http_methods, vec!["post", "Put"]);
        assert_eq!(doc.endpoints[1].min_nb_of_occurrence, -1);
        assert_eq!(doc.endpoints[1].event_to_send, "first");
        assert_eq!(
            doc.target_sink.unwrap().topic.as_deref(),
            Some("projects/p/topics/t")
        );
    }

    #[test]
    fn test_load_toml() {
        let raw = r#"
serviceName = "orders"

[[endpoints]]
eventKey = "paid"

[[endpoints]]
eventKey = "shipped"
acceptedHttpMethods = ["GET"]

[trigger]
type = "none"
observationPeriod = 60
keepEventAfterTrigger = true

[targetSink]
webhook = "https://hooks.example.com/sync"
"#;
        let doc = load(raw, ConfigFormat::Toml).unwrap();
        assert_eq!(doc.endpoints.len(), 2);
        let trigger = doc.trigger.unwrap();
        assert_eq!(trigger.trigger_type, "none");
        assert!(trigger.keep_event_after_trigger);
    }

    #[test]
    fn test_load_rejects_malformed_document() {
        assert!(matches!(
            load("{\"serviceName\": ", ConfigFormat::Json),
            Err(ConfigError::Json(_))
        ));
        assert!(matches!(
            load("serviceName = ", ConfigFormat::Toml),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn test_sink_target_display() {
        let sink = SinkTarget::PubSubTopic {
            project: "p".to_string(),
            topic: "t".to_string(),
        };
        assert_eq!(sink.to_string(), "projects/p/topics/t");
    }
}
