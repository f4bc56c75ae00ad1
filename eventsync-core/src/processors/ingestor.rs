//! EventIngestor.
//!
//! Turns an inbound request into a stored event and runs the trigger cycle
//! afterwards, either inline or on a background task.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use eventsync_sdk::objects::HttpMethod;
use thiserror::Error;
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::coordinator::{CoordinatorError, PublishCoordinator, TriggerMode, TriggerOutcome};
use super::single_flight::LockMode;
use crate::context::{ExecContext, Interrupted};
use crate::events::{Event, HeaderMap, NewEvent};
use crate::matcher::{EndpointMatcher, MatchError, extract_event_key};
use crate::store::StoreError;

/// How the trigger cycle following an ingestion runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerProcessing {
    /// The caller waits for the cycle and sees its outcome.
    Sync,
    /// The cycle runs in the background; its outcome is only logged.
    Async,
}

/// Raw parts of an inbound request.
#[derive(Debug, Clone, Default)]
pub struct IncomingEvent {
    /// Decoded request path, e.g. `/event/payment-done`.
    pub path: String,
    /// Request method as received, any case.
    pub method: String,
    pub headers: HeaderMap,
    pub query_params: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug)]
pub enum TriggerStatus {
    Completed(TriggerOutcome),
    /// The event is stored but the cycle failed.
    Failed(CoordinatorError),
    Scheduled,
}

#[derive(Debug)]
pub struct IngestOutcome {
    pub event: Event,
    pub trigger: TriggerStatus,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("impossible to store the event: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl IngestError {
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::Match(e) => e.kind(),
            IngestError::Store(_) => "store_error",
            IngestError::Interrupted(e) => e.kind(),
        }
    }
}

pub struct EventIngestor {
    matcher: EndpointMatcher,
    coordinator: Arc<PublishCoordinator>,
    processing: TriggerProcessing,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    background_timeout: Option<Duration>,
}

impl EventIngestor {
    /// `shutdown` cancels background cycles; request cancellation never does.
    pub fn new(
        coordinator: Arc<PublishCoordinator>,
        processing: TriggerProcessing,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            matcher: EndpointMatcher::new(coordinator.config().clone()),
            coordinator,
            processing,
            tracker: TaskTracker::new(),
            shutdown,
            background_timeout: None,
        }
    }

    /// Deadline applied to each background cycle.
    pub fn with_background_timeout(mut self, timeout: Duration) -> Self {
        self.background_timeout = Some(timeout);
        self
    }

    pub fn processing(&self) -> TriggerProcessing {
        self.processing
    }

    pub async fn ingest(
        &self,
        ctx: &ExecContext,
        incoming: IncomingEvent,
    ) -> Result<IngestOutcome, IngestError> {
        let event_key = extract_event_key(&incoming.path);
        let method = incoming.method.to_uppercase();
        let endpoint = self.matcher.match_endpoint(event_key, &method)?;
        // the matcher only accepts canonical tokens
        let Ok(method) = method.parse::<HttpMethod>() else {
            return Err(MatchError::MethodNotAllowed {
                event_key: event_key.to_string(),
                method,
            }
            .into());
        };

        let new_event = NewEvent {
            source_key: endpoint.event_key.clone(),
            received_at: OffsetDateTime::now_utc(),
            method,
            headers: incoming.headers,
            query_params: incoming.query_params,
            content: String::from_utf8_lossy(&incoming.body).into_owned(),
        };
        let store = self.coordinator.store();
        let event = ctx.run(store.append(new_event)).await??;
        info!(
            event_key = %event.source_key,
            external_id = %event.external_id,
            "event stored"
        );

        let trigger = match self.processing {
            TriggerProcessing::Sync => {
                match self
                    .coordinator
                    .trigger(ctx, TriggerMode::Evaluate, LockMode::Wait)
                    .await
                {
                    Ok(outcome) => TriggerStatus::Completed(outcome),
                    Err(e) => {
                        warn!(error = %e, "trigger after ingestion failed");
                        TriggerStatus::Failed(e)
                    }
                }
            }
            TriggerProcessing::Async => {
                self.spawn_trigger();
                TriggerStatus::Scheduled
            }
        };

        Ok(IngestOutcome { event, trigger })
    }

    fn spawn_trigger(&self) {
        let coordinator = self.coordinator.clone();
        let mut ctx = ExecContext::new(self.shutdown.child_token());
        if let Some(timeout) = self.background_timeout {
            ctx = ctx.with_timeout(timeout);
        }

        self.tracker.spawn(async move {
            match coordinator
                .trigger(&ctx, TriggerMode::Evaluate, LockMode::Wait)
                .await
            {
                Ok(TriggerOutcome::Triggered(aggregate)) => {
                    info!(event_id = %aggregate.id, "background trigger published");
                }
                Ok(TriggerOutcome::NotNeeded) => debug!("background trigger not needed"),
                Err(e) => warn!(error = %e, kind = e.kind(), "background trigger failed"),
            }
        });
    }

    /// Stop accepting background work and wait for the running cycles and
    /// their consumed-marking.
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(in_flight = self.tracker.len(), "waiting for background triggers");
        self.tracker.wait().await;
        self.coordinator.drain().await;
    }
}
