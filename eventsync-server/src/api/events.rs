use axum::{
    Json,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
};
use bytes::Bytes;
use eventsync_core::events::HeaderMap as MultiValueMap;
use eventsync_core::processors::{IncomingEvent, TriggerStatus};
use eventsync_sdk::objects::{IngestResponse, TriggerReport};

use super::{ApiError, failure_report, outcome_report};
use crate::state::AppState;

/// `ANY /event/{eventKey}`: store an event and run the trigger cycle.
///
/// Answers 502 when the event was stored but the synchronous cycle failed;
/// the body then carries the failure in its trigger report.
pub(super) async fn ingest_event(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    let path = urlencoding::decode(uri.path())
        .map_err(|_| ApiError::InvalidPath(uri.path().to_string()))?
        .into_owned();

    let incoming = IncomingEvent {
        path,
        method: method.as_str().to_string(),
        headers: collect_headers(&headers),
        query_params: collect_query(uri.query()),
        body,
    };

    let ctx = state.request_context();
    let outcome = state
        .ingestor
        .ingest(&ctx, incoming)
        .await
        .map_err(ApiError::Ingest)?;

    let (status, trigger) = match &outcome.trigger {
        TriggerStatus::Completed(result) => (StatusCode::OK, outcome_report(result)),
        TriggerStatus::Scheduled => (StatusCode::OK, TriggerReport::Scheduled),
        TriggerStatus::Failed(e) => (StatusCode::BAD_GATEWAY, failure_report(e)),
    };

    Ok((
        status,
        Json(IngestResponse {
            event_id: outcome.event.external_id,
            event_key: outcome.event.source_key,
            trigger,
        }),
    ))
}

fn collect_headers(headers: &HeaderMap) -> MultiValueMap {
    let mut collected = MultiValueMap::new();
    for (name, value) in headers {
        collected
            .entry(name.as_str().to_string())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    collected
}

fn collect_query(query: Option<&str>) -> MultiValueMap {
    let mut collected = MultiValueMap::new();
    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        collected
            .entry(key.into_owned())
            .or_default()
            .push(value.into_owned());
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_valued_query() {
        let query = collect_query(Some("step=a&step=b&name=caf%C3%A9&empty="));
        assert_eq!(query["step"], vec!["a", "b"]);
        assert_eq!(query["name"], vec!["café"]);
        assert_eq!(query["empty"], vec![""]);
        assert!(collect_query(None).is_empty());
    }

    #[test]
    fn test_multi_valued_headers() {
        let mut headers = HeaderMap::new();
        headers.append("x-tag", "one".parse().unwrap());
        headers.append("x-tag", "two".parse().unwrap());
        headers.insert("content-type", "application/json".parse().unwrap());

        let collected = collect_headers(&headers);
        assert_eq!(collected["x-tag"], vec!["one", "two"]);
        assert_eq!(collected["content-type"], vec!["application/json"]);
    }
}
