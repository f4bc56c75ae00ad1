use std::collections::{BTreeMap, HashMap};

use eventsync_sdk::objects::{EventPayload, HttpMethod};
use time::OffsetDateTime;

/// Multi-valued headers or query parameters, kept as received.
pub type HeaderMap = BTreeMap<String, Vec<String>>;

/// Unconsumed window events grouped by event key.
///
/// Stores return every requested key, with an empty list when nothing was
/// received for it.
pub type WindowEvents = HashMap<String, Vec<Event>>;

/// An event to be appended to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub source_key: String,
    pub received_at: OffsetDateTime,
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub query_params: HeaderMap,
    /// Raw request body.
    pub content: String,
}

/// A stored event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Opaque handle assigned by the store.
    pub external_id: String,
    pub source_key: String,
    pub received_at: OffsetDateTime,
    pub method: HttpMethod,
    pub headers: HeaderMap,
    pub query_params: HeaderMap,
    pub content: String,
    pub consumed: bool,
}

impl Event {
    /// Attach a store handle to a new event.
    pub fn stored(external_id: String, event: NewEvent) -> Self {
        Self {
            external_id,
            source_key: event.source_key,
            received_at: event.received_at,
            method: event.method,
            headers: event.headers,
            query_params: event.query_params,
            content: event.content,
            consumed: false,
        }
    }

    pub fn to_payload(&self) -> EventPayload {
        EventPayload {
            datetime: self.received_at,
            event_key: self.source_key.clone(),
            headers: self.headers.clone(),
            query_params: self.query_params.clone(),
            content: self.content.clone(),
            http_method: self.method,
        }
    }
}
