//! PublishCoordinator.
//!
//! Runs a trigger cycle: query the window, evaluate, build the aggregate,
//! publish it, and mark the window consumed. The whole sequence holds the
//! single-flight lock of the service so that two cycles never publish the
//! same events.
//!
//! Consumed-marking only happens after the sink acknowledged the aggregate.
//! It runs on a task of the coordinator's own tracker, so dropping the
//! caller's future after the publish never leaves the window unmarked.
//! Marking failures at that point are retried and logged; the aggregate is
//! never retracted.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use eventsync_sdk::headers::SERVICE_NAME_ATTRIBUTE;
use eventsync_sdk::objects::TriggerType;
use thiserror::Error;
use time::OffsetDateTime;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span, debug, error, info, warn};

use super::retry::RetryPolicy;
use super::single_flight::{AcquireError, FlightGuard, LockMode, SingleFlight};
use crate::builder::{self, Aggregate};
use crate::config::ServiceConfig;
use crate::context::{ExecContext, Interrupted};
use crate::evaluator;
use crate::events::WindowEvents;
use crate::sink::{OutboundMessage, PublishError, Sink};
use crate::store::{EventStore, StoreError};

/// Whether the trigger conditions are checked before publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerMode {
    /// Publish only when every endpoint is satisfied.
    Evaluate,
    /// Publish whatever the window holds.
    Force,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Triggered(Aggregate),
    /// The window does not satisfy every endpoint. Not a failure.
    NotNeeded,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    #[error("a trigger cycle is already running for {service_name:?}")]
    CycleInProgress { service_name: String },

    #[error(transparent)]
    Interrupted(#[from] Interrupted),
}

impl CoordinatorError {
    pub fn kind(&self) -> &'static str {
        match self {
            CoordinatorError::Store(_) => "store_error",
            CoordinatorError::Publish(PublishError::Interrupted(interrupted))
            | CoordinatorError::Interrupted(interrupted) => interrupted.kind(),
            CoordinatorError::Publish(_) => "publish_error",
            CoordinatorError::CycleInProgress { .. } => "cycle_in_progress",
        }
    }
}

impl From<AcquireError> for CoordinatorError {
    fn from(value: AcquireError) -> Self {
        match value {
            AcquireError::InProgress { key } => {
                CoordinatorError::CycleInProgress { service_name: key }
            }
            AcquireError::Interrupted(interrupted) => CoordinatorError::Interrupted(interrupted),
        }
    }
}

pub struct PublishCoordinator {
    config: Arc<ServiceConfig>,
    store: Arc<dyn EventStore>,
    sink: Arc<dyn Sink>,
    flights: Arc<SingleFlight>,
    publish_retry: RetryPolicy,
    mark_retry: RetryPolicy,
    marking: TaskTracker,
}

impl PublishCoordinator {
    pub fn new(
        config: Arc<ServiceConfig>,
        store: Arc<dyn EventStore>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            config,
            store,
            sink,
            flights: Arc::new(SingleFlight::new()),
            publish_retry: RetryPolicy::default(),
            mark_retry: RetryPolicy::default(),
            marking: TaskTracker::new(),
        }
    }

    /// Share the lock registry with other coordinators of the process.
    pub fn with_single_flight(mut self, flights: Arc<SingleFlight>) -> Self {
        self.flights = flights;
        self
    }

    pub fn with_retry(mut self, publish: RetryPolicy, mark: RetryPolicy) -> Self {
        self.publish_retry = publish;
        self.mark_retry = mark;
        self
    }

    pub fn config(&self) -> &Arc<ServiceConfig> {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn EventStore> {
        &self.store
    }

    /// Wait for every consumed-marking task, including the ones whose
    /// cycle was abandoned by its caller.
    pub async fn drain(&self) {
        self.marking.close();
        self.marking.wait().await;
    }

    /// Run one trigger cycle.
    #[tracing::instrument(skip_all, fields(service = %self.config.service_name, mode = ?mode))]
    pub async fn trigger(
        &self,
        ctx: &ExecContext,
        mode: TriggerMode,
        lock: LockMode,
    ) -> Result<TriggerOutcome, CoordinatorError> {
        if mode == TriggerMode::Evaluate && self.config.trigger.trigger_type == TriggerType::None {
            debug!("trigger type is none, only forced triggers publish");
            return Ok(TriggerOutcome::NotNeeded);
        }

        let flight = self.lock(ctx, lock).await?;
        let window = self.query_window(ctx).await?;

        if mode == TriggerMode::Evaluate && !evaluator::needed(&window, &self.config) {
            debug!("trigger conditions not met");
            return Ok(TriggerOutcome::NotNeeded);
        }

        let aggregate = builder::build(&window, &self.config, OffsetDateTime::now_utc());
        let message = self.outbound_message(&aggregate)?;
        self.publish_retry
            .retry(ctx, "publish", || self.sink.publish(ctx, &message))
            .await?;
        info!(
            event_id = %aggregate.id,
            sink = %self.sink.describe(),
            "aggregate published"
        );

        if self.config.trigger.keep_after_trigger {
            debug!("events kept after trigger");
        } else {
            let failures = self.mark_window_consumed(window, flight).await;
            if !failures.is_empty() {
                error!(
                    event_id = %aggregate.id,
                    failed = failures.len(),
                    "some published events could not be marked consumed"
                );
            }
        }

        Ok(TriggerOutcome::Triggered(aggregate))
    }

    /// Mark every event currently in the window consumed without publishing.
    ///
    /// Returns the number of events marked.
    #[tracing::instrument(skip_all, fields(service = %self.config.service_name))]
    pub async fn reset(
        &self,
        ctx: &ExecContext,
        lock: LockMode,
    ) -> Result<usize, CoordinatorError> {
        let flight = self.lock(ctx, lock).await?;
        let window = self.query_window(ctx).await?;
        let total = window.values().map(Vec::len).sum::<usize>();

        let mut failures = self.mark_window_consumed(window, flight).await;
        info!(
            reset = total - failures.len(),
            failed = failures.len(),
            "window reset"
        );
        match failures.pop() {
            Some(error) => Err(CoordinatorError::Store(error)),
            None => Ok(total),
        }
    }

    async fn lock(
        &self,
        ctx: &ExecContext,
        mode: LockMode,
    ) -> Result<FlightGuard, CoordinatorError> {
        Ok(self
            .flights
            .acquire(ctx, &self.config.service_name, mode)
            .await?)
    }

    async fn query_window(&self, ctx: &ExecContext) -> Result<WindowEvents, CoordinatorError> {
        let since = OffsetDateTime::now_utc() - self.config.trigger.observation_period();
        let keys = self.config.event_keys();
        let window = ctx.run(self.store.query_window(&keys, since)).await??;
        debug!(
            events = window.values().map(Vec::len).sum::<usize>(),
            "window queried"
        );
        Ok(window)
    }

    fn outbound_message(&self, aggregate: &Aggregate) -> Result<OutboundMessage, PublishError> {
        let data = serde_json::to_vec(&aggregate.to_payload())?;
        Ok(OutboundMessage {
            data: Bytes::from(data),
            attributes: BTreeMap::from([(
                SERVICE_NAME_ATTRIBUTE.to_string(),
                self.config.service_name.clone(),
            )]),
        })
    }

    /// Mark every window event consumed, one by one, on a tracked task.
    ///
    /// The task runs to completion even if the caller's context is cancelled
    /// or this future is dropped. It holds the flight until the last event is
    /// marked, so the next cycle never sees a half-marked window.
    async fn mark_window_consumed(
        &self,
        window: WindowEvents,
        flight: FlightGuard,
    ) -> Vec<StoreError> {
        let store = self.store.clone();
        let retry = self.mark_retry;
        let marking = async move {
            let ctx = ExecContext::background();
            let mut failures = Vec::new();
            for event in window.into_values().flatten() {
                let marked = retry
                    .retry(&ctx, "mark_consumed", || store.mark_consumed(&event.external_id))
                    .await;
                if let Err(e) = marked {
                    warn!(
                        external_id = %event.external_id,
                        error = %e,
                        "failed to mark event consumed"
                    );
                    failures.push(e);
                }
            }
            drop(flight);
            failures
        };
        let marking = self.marking.spawn(marking.instrument(Span::current()));

        match marking.await {
            Ok(failures) => failures,
            Err(e) => {
                error!(error = %e, "consumed-marking task failed");
                vec![StoreError::Aborted(e.to_string())]
            }
        }
    }
}
