use eventsync_sdk::objects::HttpMethod;
use kanau::processor::Processor;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::events::{Event, HeaderMap, NewEvent};
use crate::framework::DatabaseProcessor;
use crate::store::StoreError;

/// A row of the `events` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct StoredEvent {
    pub id: Uuid,
    pub event_key: String,
    pub received_at: OffsetDateTime,
    pub http_method: String,
    pub headers: Json<HeaderMap>,
    pub query_params: Json<HeaderMap>,
    pub content: String,
    pub consumed: bool,
}

impl TryFrom<StoredEvent> for Event {
    type Error = StoreError;

    fn try_from(row: StoredEvent) -> Result<Self, Self::Error> {
        let method = row
            .http_method
            .parse::<HttpMethod>()
            .map_err(|e| StoreError::Corrupt {
                external_id: row.id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Event {
            external_id: row.id.to_string(),
            source_key: row.event_key,
            received_at: row.received_at,
            method,
            headers: row.headers.0,
            query_params: row.query_params.0,
            content: row.content,
            consumed: row.consumed,
        })
    }
}

#[derive(Debug, Clone)]
/// Insert a new unconsumed event of a service.
pub struct InsertEvent {
    pub service_name: String,
    pub event: NewEvent,
}

impl Processor<InsertEvent> for DatabaseProcessor {
    type Output = StoredEvent;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertEvent")]
    async fn process(&self, insert: InsertEvent) -> Result<StoredEvent, sqlx::Error> {
        let InsertEvent {
            service_name,
            event,
        } = insert;
        sqlx::query_as::<_, StoredEvent>(
            r#"
            INSERT INTO events
                (id, service_name, event_key, received_at, http_method, headers, query_params, content)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, event_key, received_at, http_method, headers, query_params, content, consumed
            "#,
        )
        .bind(Uuid::now_v7())
        .bind(service_name)
        .bind(event.source_key)
        .bind(event.received_at)
        .bind(event.method.as_str())
        .bind(Json(event.headers))
        .bind(Json(event.query_params))
        .bind(event.content)
        .fetch_one(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Get the unconsumed events of some keys received after `since`,
/// oldest first.
pub struct GetWindowEvents {
    pub service_name: String,
    pub event_keys: Vec<String>,
    pub since: OffsetDateTime,
}

impl Processor<GetWindowEvents> for DatabaseProcessor {
    type Output = Vec<StoredEvent>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetWindowEvents")]
    async fn process(&self, query: GetWindowEvents) -> Result<Vec<StoredEvent>, sqlx::Error> {
        let GetWindowEvents {
            service_name,
            event_keys,
            since,
        } = query;
        sqlx::query_as::<_, StoredEvent>(
            r#"
            SELECT id, event_key, received_at, http_method, headers, query_params, content, consumed
            FROM events
            WHERE service_name = $1
              AND event_key = ANY($2)
              AND consumed = FALSE
              AND received_at > $3
            ORDER BY received_at ASC, id ASC
            "#,
        )
        .bind(service_name)
        .bind(event_keys)
        .bind(since)
        .fetch_all(&self.pool)
        .await
    }
}

#[derive(Debug, Clone)]
/// Mark one event consumed.
///
/// Returns `None` when the service has no event with this id. An already
/// consumed event is returned unchanged.
pub struct MarkEventConsumed {
    pub service_name: String,
    pub event_id: Uuid,
}

impl Processor<MarkEventConsumed> for DatabaseProcessor {
    type Output = Option<Uuid>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:MarkEventConsumed")]
    async fn process(&self, update: MarkEventConsumed) -> Result<Option<Uuid>, sqlx::Error> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE events
            SET consumed = TRUE
            WHERE service_name = $1 AND id = $2
            RETURNING id
            "#,
        )
        .bind(update.service_name)
        .bind(update.event_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn row(method: &str) -> StoredEvent {
        StoredEvent {
            id: Uuid::nil(),
            event_key: "entry1".to_string(),
            received_at: datetime!(2024-05-01 12:00 UTC),
            http_method: method.to_string(),
            headers: Json(HeaderMap::from([(
                "content-type".to_string(),
                vec!["text/plain".to_string()],
            )])),
            query_params: Json(HeaderMap::new()),
            content: "hello".to_string(),
            consumed: false,
        }
    }

    #[test]
    fn test_row_conversion() {
        let event = Event::try_from(row("PUT")).unwrap();
        assert_eq!(event.external_id, Uuid::nil().to_string());
        assert_eq!(event.method, HttpMethod::Put);
        assert_eq!(event.headers["content-type"], vec!["text/plain"]);
    }

    #[test]
    fn test_unknown_method_is_corrupt() {
        assert!(matches!(
            Event::try_from(row("put")),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
