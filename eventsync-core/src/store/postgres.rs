use async_trait::async_trait;
use kanau::processor::Processor;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{EventStore, StoreError};
use crate::entities::stored_event::{GetWindowEvents, InsertEvent, MarkEventConsumed};
use crate::events::{Event, NewEvent, WindowEvents};
use crate::framework::DatabaseProcessor;

/// PostgreSQL event store scoped to one service.
#[derive(Debug, Clone)]
pub struct PgEventStore {
    db: DatabaseProcessor,
    service_name: String,
}

impl PgEventStore {
    pub fn new(pool: PgPool, service_name: impl Into<String>) -> Self {
        Self {
            db: DatabaseProcessor { pool },
            service_name: service_name.into(),
        }
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: NewEvent) -> Result<Event, StoreError> {
        let row = self
            .db
            .process(InsertEvent {
                service_name: self.service_name.clone(),
                event,
            })
            .await?;
        Event::try_from(row)
    }

    async fn query_window(
        &self,
        source_keys: &[String],
        since: OffsetDateTime,
    ) -> Result<WindowEvents, StoreError> {
        let rows = self
            .db
            .process(GetWindowEvents {
                service_name: self.service_name.clone(),
                event_keys: source_keys.to_vec(),
                since,
            })
            .await?;

        let mut window = source_keys
            .iter()
            .map(|key| (key.clone(), Vec::new()))
            .collect::<WindowEvents>();
        for row in rows {
            let event = Event::try_from(row)?;
            if let Some(events) = window.get_mut(&event.source_key) {
                events.push(event);
            }
        }
        Ok(window)
    }

    async fn mark_consumed(&self, external_id: &str) -> Result<(), StoreError> {
        let not_found = || StoreError::NotFound {
            external_id: external_id.to_string(),
        };
        let event_id = Uuid::parse_str(external_id).map_err(|_| not_found())?;
        self.db
            .process(MarkEventConsumed {
                service_name: self.service_name.clone(),
                event_id,
            })
            .await?
            .map(|_| ())
            .ok_or_else(not_found)
    }
}
