//! Persistent event store collaborator.
//!
//! A store is scoped to one service identity: it only ever sees the events
//! of that service.

mod memory;
mod postgres;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;

use crate::events::{Event, NewEvent, WindowEvents};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("event not found: {external_id}")]
    NotFound { external_id: String },

    #[error("stored event {external_id} is unreadable: {reason}")]
    Corrupt { external_id: String, reason: String },

    #[error("store operation aborted: {0}")]
    Aborted(String),
}

#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persist a new, unconsumed event and return it with its handle.
    async fn append(&self, event: NewEvent) -> Result<Event, StoreError>;

    /// Unconsumed events of the given keys received strictly after `since`.
    ///
    /// Every requested key is present in the result. Events are ordered by
    /// reception time.
    async fn query_window(
        &self,
        source_keys: &[String],
        since: OffsetDateTime,
    ) -> Result<WindowEvents, StoreError>;

    /// Mark an event consumed. Marking a consumed event again is a no-op.
    async fn mark_consumed(&self, external_id: &str) -> Result<(), StoreError>;
}
