//! Published aggregate payload.
//!
//! This is the message body delivered to the sink once every endpoint is
//! satisfied. The `serviceName` is additionally carried as a message
//! attribute (topic sink) or header (webhook sink).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

use super::method::HttpMethod;
use super::policy::{SelectionPolicy, TriggerType};

/// Aggregate notification for one trigger cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatePayload {
    /// Fingerprint of the embedded events. Lets consumers deduplicate.
    #[serde(rename = "eventID")]
    pub event_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub service_name: String,
    pub trigger_type: TriggerType,
    /// Group of events per configured event key.
    pub events: BTreeMap<String, EventGroupPayload>,
}

/// Window statistics and selected events of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventGroupPayload {
    /// Oldest event of the window, whether selected or not.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub first_event_date: Option<OffsetDateTime>,
    /// Youngest event of the window, whether selected or not.
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_event_date: Option<OffsetDateTime>,
    /// Number of window events before selection.
    pub number_of_events: usize,
    pub min_nb_of_occurrence: u32,
    pub event_to_send: SelectionPolicy,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventPayload>,
}

/// A received event as embedded in an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    #[serde(with = "time::serde::rfc3339")]
    pub datetime: OffsetDateTime,
    pub event_key: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query_params: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    pub http_method: HttpMethod,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_payload_field_names() {
        let mut events = BTreeMap::new();
        events.insert(
            "entry1".to_string(),
            EventGroupPayload {
                first_event_date: Some(datetime!(2022-03-28 00:00 UTC)),
                last_event_date: Some(datetime!(2022-03-28 00:00 UTC)),
                number_of_events: 1,
                min_nb_of_occurrence: 1,
                event_to_send: SelectionPolicy::First,
                events: vec![EventPayload {
                    datetime: datetime!(2022-03-28 00:00 UTC),
                    event_key: "entry1".to_string(),
                    headers: BTreeMap::new(),
                    query_params: BTreeMap::new(),
                    content: "done".to_string(),
                    http_method: HttpMethod::Post,
                }],
            },
        );
        events.insert(
            "entry2".to_string(),
            EventGroupPayload {
                first_event_date: None,
                last_event_date: None,
                number_of_events: 0,
                min_nb_of_occurrence: 1,
                event_to_send: SelectionPolicy::All,
                events: vec![],
            },
        );
        let payload = AggregatePayload {
            event_id: "abc".to_string(),
            date: datetime!(2022-03-28 01:00 UTC),
            service_name: "svc".to_string(),
            trigger_type: TriggerType::Window,
            events,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["eventID"], "abc");
        assert_eq!(value["serviceName"], "svc");
        assert_eq!(value["triggerType"], "window");
        assert_eq!(value["events"]["entry1"]["numberOfEvents"], 1);
        assert_eq!(value["events"]["entry1"]["eventToSend"], "FIRST");
        assert_eq!(value["events"]["entry1"]["events"][0]["httpMethod"], "POST");
        assert!(value["events"]["entry2"].get("firstEventDate").is_none());
        assert!(value["events"]["entry2"].get("events").is_none());

        let back: AggregatePayload = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }
}
