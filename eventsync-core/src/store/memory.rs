use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{EventStore, StoreError};
use crate::events::{Event, NewEvent, WindowEvents};

/// In-process event store. Events are lost on restart.
///
/// Consumed events are dropped at the next append, so memory follows the
/// unconsumed backlog. Marking a dropped event again reports `NotFound`.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    events: RwLock<BTreeMap<String, Event>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every retained event, consumed or not, in insertion order.
    pub async fn snapshot(&self) -> Vec<Event> {
        self.events.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<Event, StoreError> {
        // v7 ids sort by creation time, which keeps the map in insertion order
        let event = Event::stored(Uuid::now_v7().to_string(), event);
        let mut events = self.events.write().await;
        events.retain(|_, e| !e.consumed);
        events.insert(event.external_id.clone(), event.clone());
        Ok(event)
    }

    async fn query_window(
        &self,
        source_keys: &[String],
        since: OffsetDateTime,
    ) -> Result<WindowEvents, StoreError> {
        let events = self.events.read().await;
        let window = source_keys
            .iter()
            .map(|key| {
                let mut matching = events
                    .values()
                    .filter(|e| !e.consumed && e.source_key == *key && e.received_at > since)
                    .cloned()
                    .collect::<Vec<_>>();
                matching.sort_by_key(|e| e.received_at);
                (key.clone(), matching)
            })
            .collect();
        Ok(window)
    }

    async fn mark_consumed(&self, external_id: &str) -> Result<(), StoreError> {
        let mut events = self.events.write().await;
        let event = events
            .get_mut(external_id)
            .ok_or_else(|| StoreError::NotFound {
                external_id: external_id.to_string(),
            })?;
        event.consumed = true;
        Ok(())
    }
}
