//! Ingestion and admin API response types.

use serde::{Deserialize, Serialize};

/// Outcome of a trigger cycle, as reported to API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TriggerReport {
    /// An aggregate was published.
    Triggered {
        #[serde(rename = "eventID")]
        event_id: String,
    },
    /// The window does not satisfy every endpoint yet.
    NotNeeded,
    /// The cycle runs in the background; its outcome is only logged.
    Scheduled,
    /// The cycle failed. `kind` names the failure class.
    Failed { kind: String, message: String },
}

/// Response of `ANY /event/{eventKey}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    /// Store-assigned identifier of the stored event.
    pub event_id: String,
    pub event_key: String,
    pub trigger: TriggerReport,
}

/// Response of `POST /trigger`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub service_name: String,
    pub trigger: TriggerReport,
}

/// Response of `POST /reset`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetResponse {
    pub service_name: String,
    /// Number of window events marked consumed.
    pub reset_events: usize,
}

/// Error body returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Failure class, e.g. `no_such_endpoint` or `publish_error`.
    pub kind: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_report_is_tagged() {
        let json = serde_json::to_value(TriggerReport::Triggered {
            event_id: "f00".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "triggered");
        assert_eq!(json["eventID"], "f00");

        let json = serde_json::to_value(TriggerReport::NotNeeded).unwrap();
        assert_eq!(json, serde_json::json!({"status": "not_needed"}));

        let parsed: TriggerReport =
            serde_json::from_str(r#"{"status":"failed","kind":"publish_error","message":"boom"}"#)
                .unwrap();
        assert_eq!(
            parsed,
            TriggerReport::Failed {
                kind: "publish_error".to_string(),
                message: "boom".to_string()
            }
        );
    }
}
