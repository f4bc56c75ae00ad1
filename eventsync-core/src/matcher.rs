//! Resolution of an inbound (event key, method) pair to a configured endpoint.

use std::sync::Arc;

use eventsync_sdk::headers::EVENT_PATH_PREFIX;
use thiserror::Error;

use crate::config::{Endpoint, ServiceConfig};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    #[error("missing or incorrect eventKey in the path")]
    EmptyKey,

    #[error("invalid endpoint {event_key:?}")]
    NoSuchEndpoint { event_key: String },

    #[error("invalid method {method:?} for endpoint {event_key:?}")]
    MethodNotAllowed { event_key: String, method: String },
}

impl MatchError {
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::EmptyKey => "empty_key",
            MatchError::NoSuchEndpoint { .. } => "no_such_endpoint",
            MatchError::MethodNotAllowed { .. } => "method_not_allowed",
        }
    }
}

/// Strip the ingress prefix from a request path.
///
/// Returns an empty key when the path does not start with the exact prefix.
pub fn extract_event_key(path: &str) -> &str {
    path.strip_prefix(EVENT_PATH_PREFIX).unwrap_or_default()
}

#[derive(Debug, Clone)]
pub struct EndpointMatcher {
    config: Arc<ServiceConfig>,
}

impl EndpointMatcher {
    pub fn new(config: Arc<ServiceConfig>) -> Self {
        Self { config }
    }

    /// Find the endpoint for `event_key` accepting `method`.
    ///
    /// The method is compared as is against the canonical uppercase set;
    /// callers uppercase the request method first.
    pub fn match_endpoint(&self, event_key: &str, method: &str) -> Result<&Endpoint, MatchError> {
        if event_key.is_empty() {
            return Err(MatchError::EmptyKey);
        }
        let endpoint = self
            .config
            .endpoint(event_key)
            .ok_or_else(|| MatchError::NoSuchEndpoint {
                event_key: event_key.to_string(),
            })?;

        if endpoint
            .accepted_methods
            .iter()
            .any(|accepted| accepted.as_str() == method)
        {
            Ok(endpoint)
        } else {
            Err(MatchError::MethodNotAllowed {
                event_key: event_key.to_string(),
                method: method.to_string(),
            })
        }
    }
}
