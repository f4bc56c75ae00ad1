//! Admin API handlers.
//!
//! Guarded by [`AdminAuth`] when an admin secret is configured. Cycles
//! started here never wait for a running one: they fail with 409 instead.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use eventsync_core::processors::{LockMode, TriggerMode, TriggerOutcome};
use eventsync_sdk::objects::{ResetResponse, ServiceConfigDocument, TriggerResponse};
use serde::Deserialize;

use super::{ApiError, outcome_report};
use crate::api::extractors::AdminAuth;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum TriggerModeParam {
    Evaluate,
    Force,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct TriggerQuery {
    mode: Option<TriggerModeParam>,
}

/// `GET|POST /trigger`: publish the current window.
///
/// Forced by default; `?mode=evaluate` publishes only when every endpoint
/// is satisfied and answers 412 otherwise.
pub(super) async fn trigger(
    State(state): State<AppState>,
    _auth: AdminAuth,
    Query(query): Query<TriggerQuery>,
) -> Result<(StatusCode, Json<TriggerResponse>), ApiError> {
    let mode = match query.mode {
        Some(TriggerModeParam::Evaluate) => TriggerMode::Evaluate,
        Some(TriggerModeParam::Force) | None => TriggerMode::Force,
    };

    let ctx = state.request_context();
    let outcome = state
        .coordinator
        .trigger(&ctx, mode, LockMode::FailFast)
        .await
        .map_err(ApiError::Coordinator)?;

    let status = match outcome {
        TriggerOutcome::Triggered(_) => StatusCode::OK,
        TriggerOutcome::NotNeeded => StatusCode::PRECONDITION_FAILED,
    };
    Ok((
        status,
        Json(TriggerResponse {
            service_name: state.config().service_name.clone(),
            trigger: outcome_report(&outcome),
        }),
    ))
}

/// `GET|POST /reset`: mark every window event consumed without publishing.
pub(super) async fn reset(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Result<Json<ResetResponse>, ApiError> {
    let ctx = state.request_context();
    let reset_events = state
        .coordinator
        .reset(&ctx, LockMode::FailFast)
        .await
        .map_err(ApiError::Coordinator)?;

    tracing::info!(reset_events, "window reset through the admin API");
    Ok(Json(ResetResponse {
        service_name: state.config().service_name.clone(),
        reset_events,
    }))
}

/// `GET /config`: the normalized service description.
pub(super) async fn config(
    State(state): State<AppState>,
    _auth: AdminAuth,
) -> Json<ServiceConfigDocument> {
    Json(ServiceConfigDocument::from(state.config().as_ref()))
}
