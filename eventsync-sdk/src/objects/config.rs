//! Service description document.
//!
//! These structs map one-to-one to the JSON (or TOML) document an operator
//! writes. Every field is kept in its raw form so that validation can report
//! all problems at once instead of failing on the first bad token during
//! deserialization.

use serde::{Deserialize, Serialize};

/// Root of the service description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfigDocument {
    /// Name of the service. Also scopes the stored events.
    #[serde(default)]
    pub service_name: String,
    /// Event sources that must all report before a trigger.
    #[serde(default)]
    pub endpoints: Vec<EndpointDocument>,
    /// Trigger conditions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<TriggerDocument>,
    /// Publish destination of the aggregates.
    #[serde(
        default,
        alias = "targetPubSub",
        skip_serializing_if = "Option::is_none"
    )]
    pub target_sink: Option<TargetSinkDocument>,
}

/// One event source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDocument {
    /// URL path suffix used to submit events to this endpoint.
    #[serde(default)]
    pub event_key: String,
    /// Accepted HTTP methods, any case. Empty means all of them.
    #[serde(default)]
    pub accepted_http_methods: Vec<String>,
    /// Minimal number of events in the window. 0 means 1.
    #[serde(default)]
    pub min_nb_of_occurrence: i64,
    /// `ALL`, `FIRST`, `LAST` or `BOUNDARIES`. Empty means `ALL`.
    #[serde(default)]
    pub event_to_send: String,
}

/// Trigger conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerDocument {
    /// `window` or `none`.
    #[serde(default, rename = "type")]
    pub trigger_type: String,
    /// Observation period in seconds.
    #[serde(default)]
    pub observation_period: i64,
    /// Keep the events eligible for later triggers once published.
    #[serde(default)]
    pub keep_event_after_trigger: bool,
}

/// Publish destination. Exactly one of the fields must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSinkDocument {
    /// Fully qualified Pub/Sub topic: `projects/<ProjectID>/topics/<TopicName>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// HTTP(S) URL receiving the aggregate as a JSON `POST`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook: Option<String>,
}
