//! Postgres event store.
//!
//! The `UNIQUE (stream_id, sequence_number)` constraint is the final arbiter
//! for racing writers: whichever transaction commits second fails with a
//! unique violation, reported as [`EventStoreError::Concurrency`].
//!
//! Failures map as follows:
//!
//! | sqlx error                           | EventStoreError |
//! |--------------------------------------|-----------------|
//! | database error `23505`               | `Concurrency`   |
//! | any other database error             | `InvalidAppend` |
//! | pool closed or timed out, io, tls    | `Unavailable`   |
//! | row decoding and everything else     | `InvalidAppend` |
//!
//! [`EventStore`] is synchronous, so the store drives its own current-thread
//! tokio runtime. Calling it from inside another runtime panics.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tokio::runtime::Runtime;
use tracing::{debug, instrument};
use uuid::Uuid;

use stockroom_core::{AggregateId, ExpectedVersion};

use super::r#trait::{
    EventStore, EventStoreError, StoredEvent, UncommittedEvent, batch_stream, check_head,
    commit_batch,
};

const SCHEMA: &str = include_str!("../../migrations/0001_events.sql");
const UNIQUE_VIOLATION: &str = "23505";
const MAX_CONNECTIONS: u32 = 4;

#[derive(Debug, Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
    runtime: Arc<Runtime>,
}

#[derive(Debug, FromRow)]
struct EventRow {
    event_id: Uuid,
    stream_id: Uuid,
    aggregate_type: String,
    sequence_number: i64,
    event_type: String,
    event_version: i32,
    occurred_at: DateTime<Utc>,
    payload: serde_json::Value,
}

impl From<EventRow> for StoredEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            stream_id: AggregateId::from_uuid(row.stream_id),
            aggregate_type: row.aggregate_type,
            sequence_number: row.sequence_number as u64,
            event_type: row.event_type,
            event_version: row.event_version as u32,
            occurred_at: row.occurred_at,
            payload: row.payload,
        }
    }
}

/// Version and owning aggregate type of a stream. Version 0 means empty.
#[derive(Debug, FromRow)]
struct StreamHead {
    version: i64,
    aggregate_type: Option<String>,
}

impl PostgresEventStore {
    /// Connect to `database_url` and create the `events` table if missing.
    #[instrument(skip_all, err)]
    pub fn connect(database_url: &str) -> Result<Self, EventStoreError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| EventStoreError::Unavailable(format!("cannot start runtime: {e}")))?;

        let pool = runtime
            .block_on(
                PgPoolOptions::new()
                    .max_connections(MAX_CONNECTIONS)
                    .connect(database_url),
            )
            .map_err(|e| storage_error("connect", e))?;

        runtime
            .block_on(sqlx::raw_sql(SCHEMA).execute(&pool))
            .map_err(|e| storage_error("create schema", e))?;

        Ok(Self {
            pool,
            runtime: Arc::new(runtime),
        })
    }

    async fn fetch_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT event_id, stream_id, aggregate_type, sequence_number, \
                    event_type, event_version, occurred_at, payload \
             FROM events WHERE stream_id = $1 ORDER BY sequence_number",
        )
        .bind(stream_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("load stream", e))?;

        debug!(stream_id = %stream_id.as_uuid(), events = rows.len(), "stream loaded");
        Ok(rows.into_iter().map(StoredEvent::from).collect())
    }

    /// Check the stream head and insert the whole batch in one transaction.
    async fn insert_batch(
        &self,
        stream_id: AggregateId,
        aggregate_type: String,
        events: Vec<UncommittedEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("begin", e))?;

        let head = stream_head(&mut tx, stream_id).await?;
        let current = head.version as u64;

        if let Err(err) = check_head(
            head.aggregate_type.as_deref(),
            &aggregate_type,
            current,
            expected,
        ) {
            tx.rollback().await.map_err(|e| storage_error("rollback", e))?;
            return Err(err);
        }

        let stored = commit_batch(events, current);

        let mut insert = QueryBuilder::<Postgres>::new(
            "INSERT INTO events (event_id, stream_id, aggregate_type, sequence_number, \
             event_type, event_version, occurred_at, payload) ",
        );
        insert.push_values(&stored, |mut row, event| {
            row.push_bind(event.event_id)
                .push_bind(*event.stream_id.as_uuid())
                .push_bind(event.aggregate_type.clone())
                .push_bind(event.sequence_number as i64)
                .push_bind(event.event_type.clone())
                .push_bind(event.event_version as i32)
                .push_bind(event.occurred_at)
                .push_bind(event.payload.clone());
        });
        insert
            .build()
            .execute(&mut *tx)
            .await
            .map_err(|e| storage_error("insert", e))?;

        tx.commit().await.map_err(|e| storage_error("commit", e))?;
        Ok(stored)
    }
}

async fn stream_head(
    tx: &mut Transaction<'_, Postgres>,
    stream_id: AggregateId,
) -> Result<StreamHead, EventStoreError> {
    sqlx::query_as(
        "SELECT COALESCE(MAX(sequence_number), 0) AS version, \
                MAX(aggregate_type) AS aggregate_type \
         FROM events WHERE stream_id = $1",
    )
    .bind(stream_id.as_uuid())
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| storage_error("read stream head", e))
}

fn storage_error(operation: &str, err: sqlx::Error) -> EventStoreError {
    match err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
            EventStoreError::Concurrency(format!("{operation}: {}", db.message()))
        }
        sqlx::Error::Database(db) => {
            EventStoreError::InvalidAppend(format!("{operation}: {}", db.message()))
        }
        sqlx::Error::PoolClosed | sqlx::Error::PoolTimedOut => {
            EventStoreError::Unavailable(format!("{operation}: connection pool unavailable"))
        }
        sqlx::Error::Io(e) => EventStoreError::Unavailable(format!("{operation}: {e}")),
        sqlx::Error::Tls(e) => EventStoreError::Unavailable(format!("{operation}: {e}")),
        other => EventStoreError::InvalidAppend(format!("{operation}: {other}")),
    }
}

impl EventStore for PostgresEventStore {
    #[instrument(skip_all, fields(events = events.len(), ?expected), err)]
    fn append(
        &self,
        events: Vec<UncommittedEvent>,
        expected: ExpectedVersion,
    ) -> Result<Vec<StoredEvent>, EventStoreError> {
        let Some((stream_id, aggregate_type)) = batch_stream(&events)? else {
            return Ok(Vec::new());
        };
        self.runtime
            .block_on(self.insert_batch(stream_id, aggregate_type, events, expected))
    }

    fn load_stream(&self, stream_id: AggregateId) -> Result<Vec<StoredEvent>, EventStoreError> {
        self.runtime.block_on(self.fetch_stream(stream_id))
    }
}
