//! Application state shared across all request handlers.

use std::sync::Arc;
use std::time::Duration;

use eventsync_core::config::{AdminConfig, ServiceConfig};
use eventsync_core::context::ExecContext;
use eventsync_core::processors::{EventIngestor, PublishCoordinator};

/// Application state that is shared across all request handlers.
///
/// This is cloneable and cheap to pass around (everything is behind Arc).
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<PublishCoordinator>,
    pub ingestor: Arc<EventIngestor>,
    /// Hashed admin secret. `None` leaves the admin endpoints open.
    pub admin: Option<Arc<AdminConfig>>,
    pub trigger_timeout: Duration,
}

impl AppState {
    pub fn new(
        coordinator: Arc<PublishCoordinator>,
        ingestor: Arc<EventIngestor>,
        admin: Option<AdminConfig>,
        trigger_timeout: Duration,
    ) -> Self {
        Self {
            coordinator,
            ingestor,
            admin: admin.map(Arc::new),
            trigger_timeout,
        }
    }

    /// The service description, immutable for the lifetime of the process.
    pub fn config(&self) -> &Arc<ServiceConfig> {
        self.coordinator.config()
    }

    /// Context of one request. Dropping the handler future abandons the work
    /// in flight; the deadline bounds the rest.
    pub fn request_context(&self) -> ExecContext {
        ExecContext::background().with_timeout(self.trigger_timeout)
    }
}
