use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    AggregateId, EventEnvelope, EventId, EventStoreError, ProviderId, Result, SlotKey, Version,
    store::{AppendOptions, EventStore, EventStream, SlotClaim, validate_events_for_append},
};

/// PostgreSQL-backed store.
///
/// Slot claims live in `slot_claims`, whose primary key over
/// (provider_id, date, time_slot) is the exclusive-allocation guarantee.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn row_to_event(row: PgRow) -> Result<EventEnvelope> {
        Ok(EventEnvelope {
            event_id: EventId::from_uuid(row.try_get::<Uuid, _>("id")?),
            event_type: row.try_get("event_type")?,
            aggregate_id: AggregateId::from_uuid(row.try_get::<Uuid, _>("aggregate_id")?),
            aggregate_type: row.try_get("aggregate_type")?,
            version: Version::new(row.try_get("version")?),
            timestamp: row.try_get("timestamp")?,
            payload: row.try_get("payload")?,
        })
    }

    fn row_to_claim(row: PgRow) -> Result<SlotClaim> {
        Ok(SlotClaim {
            slot: SlotKey {
                provider_id: ProviderId::new(row.try_get::<String, _>("provider_id")?),
                date: row.try_get("date")?,
                time_slot: row.try_get("time_slot")?,
            },
            holder: AggregateId::from_uuid(row.try_get::<Uuid, _>("holder_id")?),
            claimed_at: row.try_get::<DateTime<Utc>, _>("claimed_at")?,
        })
    }
}

#[async_trait]
impl EventStore for PostgresEventStore {
    #[tracing::instrument(skip(self, events, options), fields(events = events.len()))]
    async fn append(&self, events: Vec<EventEnvelope>, options: AppendOptions) -> Result<Version> {
        let aggregate_id = validate_events_for_append(&events)?;

        let mut tx = self.pool.begin().await?;

        if let Some(expected) = options.expected_version {
            let current_version: Option<i64> =
                sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                    .bind(aggregate_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?;

            let actual = Version::new(current_version.unwrap_or(0));
            if actual != expected {
                return Err(EventStoreError::ConcurrencyConflict {
                    aggregate_id,
                    expected,
                    actual,
                });
            }
        }

        let claimed_at = Utc::now();
        for slot in &options.claims {
            let inserted: Option<Uuid> = sqlx::query_scalar(
                r#"
                INSERT INTO slot_claims (provider_id, date, time_slot, holder_id, claimed_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (provider_id, date, time_slot) DO NOTHING
                RETURNING holder_id
                "#,
            )
            .bind(slot.provider_id.as_str())
            .bind(&slot.date)
            .bind(&slot.time_slot)
            .bind(aggregate_id.as_uuid())
            .bind(claimed_at)
            .fetch_optional(&mut *tx)
            .await?;

            if inserted.is_none() {
                let holder: Option<Uuid> = sqlx::query_scalar(
                    "SELECT holder_id FROM slot_claims WHERE provider_id = $1 AND date = $2 AND time_slot = $3",
                )
                .bind(slot.provider_id.as_str())
                .bind(&slot.date)
                .bind(&slot.time_slot)
                .fetch_optional(&mut *tx)
                .await?;

                tracing::debug!(%slot, "slot claim lost");
                // Dropping the transaction rolls back claims made so far.
                return Err(EventStoreError::SlotTaken {
                    slot: slot.clone(),
                    holder: holder.map(AggregateId::from_uuid),
                });
            }
        }

        let mut last_version = Version::initial();
        for event in &events {
            sqlx::query(
                r#"
                INSERT INTO events (id, event_type, aggregate_id, aggregate_type, version, timestamp, payload)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(event.event_id.as_uuid())
            .bind(&event.event_type)
            .bind(event.aggregate_id.as_uuid())
            .bind(&event.aggregate_type)
            .bind(event.version.as_i64())
            .bind(event.timestamp)
            .bind(&event.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.constraint() == Some("unique_aggregate_version")
                {
                    return EventStoreError::ConcurrencyConflict {
                        aggregate_id,
                        expected: options.expected_version.unwrap_or(Version::initial()),
                        actual: event.version,
                    };
                }
                EventStoreError::Database(e)
            })?;

            last_version = event.version;
        }

        for slot in &options.releases {
            sqlx::query(
                "DELETE FROM slot_claims WHERE provider_id = $1 AND date = $2 AND time_slot = $3 AND holder_id = $4",
            )
            .bind(slot.provider_id.as_str())
            .bind(&slot.date)
            .bind(&slot.time_slot)
            .bind(aggregate_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        metrics::counter!("event_store_appends_total", "store" => "postgres").increment(1);
        Ok(last_version)
    }

    async fn get_events_for_aggregate(
        &self,
        aggregate_id: AggregateId,
    ) -> Result<Vec<EventEnvelope>> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload
            FROM events
            WHERE aggregate_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_event).collect()
    }

    async fn stream_all_events(&self) -> Result<EventStream> {
        use futures_util::StreamExt;

        let stream = sqlx::query(
            r#"
            SELECT id, event_type, aggregate_id, aggregate_type, version, timestamp, payload
            FROM events
            ORDER BY sequence ASC
            "#,
        )
        .fetch(&self.pool)
        .map(|result| match result {
            Ok(row) => Self::row_to_event(row),
            Err(e) => Err(EventStoreError::Database(e)),
        });

        Ok(Box::pin(stream))
    }

    async fn get_aggregate_version(&self, aggregate_id: AggregateId) -> Result<Option<Version>> {
        let version: Option<i64> =
            sqlx::query_scalar("SELECT MAX(version) FROM events WHERE aggregate_id = $1")
                .bind(aggregate_id.as_uuid())
                .fetch_one(&self.pool)
                .await?;

        Ok(version.map(Version::new))
    }

    async fn slot_holder(&self, slot: &SlotKey) -> Result<Option<AggregateId>> {
        let holder: Option<Uuid> = sqlx::query_scalar(
            "SELECT holder_id FROM slot_claims WHERE provider_id = $1 AND date = $2 AND time_slot = $3",
        )
        .bind(slot.provider_id.as_str())
        .bind(&slot.date)
        .bind(&slot.time_slot)
        .fetch_optional(&self.pool)
        .await?;

        Ok(holder.map(AggregateId::from_uuid))
    }

    async fn active_claims(&self, provider_id: &ProviderId) -> Result<Vec<SlotClaim>> {
        let rows = sqlx::query(
            r#"
            SELECT provider_id, date, time_slot, holder_id, claimed_at
            FROM slot_claims
            WHERE provider_id = $1
            ORDER BY date ASC, time_slot ASC
            "#,
        )
        .bind(provider_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_claim).collect()
    }
}
