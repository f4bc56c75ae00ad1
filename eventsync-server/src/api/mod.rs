//! HTTP API.
//!
//! # Endpoints
//!
//! - `ANY      /event/{eventKey}`        : ingest an event
//! - `GET|POST /trigger[?mode=evaluate]` : run a trigger cycle (admin)
//! - `GET|POST /reset`                   : mark the window consumed (admin)
//! - `GET      /config`                  : normalized service description (admin)

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{any, get},
};
use eventsync_core::context::Interrupted;
use eventsync_core::matcher::MatchError;
use eventsync_core::processors::{CoordinatorError, IngestError, TriggerOutcome};
use eventsync_core::sink::PublishError;
use eventsync_sdk::objects::{ErrorResponse, TriggerReport};

use crate::state::AppState;

mod admin;
mod events;
pub mod extractors;

/// Build the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/event", any(events::ingest_event))
        .route("/event/", any(events::ingest_event))
        .route("/event/{*event_key}", any(events::ingest_event))
        .route("/trigger", get(admin::trigger).post(admin::trigger))
        .route("/reset", get(admin::reset).post(admin::reset))
        .route("/config", get(admin::config))
}

// ---------------------------------------------------------------------------
// Shared error type
// ---------------------------------------------------------------------------

/// Errors that can occur in API handlers.
#[derive(Debug)]
pub(crate) enum ApiError {
    /// The request path is not valid percent-encoded UTF-8.
    InvalidPath(String),
    Ingest(IngestError),
    Coordinator(CoordinatorError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            ApiError::Ingest(IngestError::Match(e)) => match e {
                MatchError::EmptyKey => StatusCode::BAD_REQUEST,
                MatchError::NoSuchEndpoint { .. } => StatusCode::NOT_FOUND,
                MatchError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            },
            ApiError::Ingest(IngestError::Store(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Ingest(IngestError::Interrupted(i)) => interrupted_status(*i),
            ApiError::Coordinator(e) => coordinator_status(e),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::InvalidPath(_) => "invalid_path",
            ApiError::Ingest(e) => e.kind(),
            ApiError::Coordinator(e) => e.kind(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::InvalidPath(path) => write!(f, "invalid request path {path:?}"),
            ApiError::Ingest(e) => write!(f, "{e}"),
            ApiError::Coordinator(e) => write!(f, "{e}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, kind = self.kind(), "API request failed");
        } else {
            tracing::debug!(error = %self, kind = self.kind(), "API request rejected");
        }
        let body = ErrorResponse {
            kind: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn interrupted_status(interrupted: Interrupted) -> StatusCode {
    match interrupted {
        Interrupted::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Interrupted::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn coordinator_status(error: &CoordinatorError) -> StatusCode {
    match error {
        CoordinatorError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
        CoordinatorError::Publish(PublishError::Interrupted(i))
        | CoordinatorError::Interrupted(i) => interrupted_status(*i),
        CoordinatorError::Publish(_) => StatusCode::BAD_GATEWAY,
        CoordinatorError::CycleInProgress { .. } => StatusCode::CONFLICT,
    }
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

pub(crate) fn outcome_report(outcome: &TriggerOutcome) -> TriggerReport {
    match outcome {
        TriggerOutcome::Triggered(aggregate) => TriggerReport::Triggered {
            event_id: aggregate.id.clone(),
        },
        TriggerOutcome::NotNeeded => TriggerReport::NotNeeded,
    }
}

pub(crate) fn failure_report(error: &CoordinatorError) -> TriggerReport {
    TriggerReport::Failed {
        kind: error.kind().to_string(),
        message: error.to_string(),
    }
}
