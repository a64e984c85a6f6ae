// Rotation repository: per-channel ordered participant lists
//
// Every mutation runs in a single transaction that first takes a
// transaction-scoped advisory lock on the channel, so concurrent commands and
// scheduler ticks for the same channel serialize. A transaction dropped
// without commit is rolled back by sqlx.

use crate::db::DbPool;
use crate::errors::{RotateError, SendError, StoreError};
use crate::models::{dedup_preserving_order, rotate_left, RotationEntry, RotationOutcome};
use async_trait::async_trait;
use futures::future::BoxFuture;
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::{debug, info, instrument, warn};

/// Announcement callback invoked with the head of the rotation.
///
/// It runs inside the rotation transaction: returning an error rolls the
/// rotation back.
pub type Announce<'a> =
    Box<dyn FnOnce(String) -> BoxFuture<'a, Result<(), SendError>> + Send + 'a>;

/// Transactional access to channel rotations
#[async_trait]
pub trait RotationStore: Send + Sync {
    /// Ordered user ids for a channel; empty if none
    async fn get_rotation(&self, channel_id: &str) -> Result<Vec<String>, StoreError>;

    /// Replace the channel's rotation with `user_ids` in order.
    ///
    /// Users absent from the list are removed. Repeated ids keep their first
    /// position. Returns the number of stored entries.
    async fn replace_rotation(
        &self,
        channel_id: &str,
        user_ids: &[String],
    ) -> Result<usize, StoreError>;

    /// Remove every entry for the channel. Returns the number removed.
    async fn delete_rotation(&self, channel_id: &str) -> Result<u64, StoreError>;

    /// Announce the head and move it to the tail, atomically.
    async fn rotate_once(
        &self,
        channel_id: &str,
        announce: Announce<'_>,
    ) -> Result<RotationOutcome, RotateError>;

    /// Channels with at least one entry
    async fn list_channels(&self) -> Result<Vec<String>, StoreError>;

    /// Readiness probe for the backing store
    async fn health_check(&self) -> Result<(), StoreError>;
}

/// Postgres-backed rotation store
#[derive(Debug, Clone)]
pub struct RotationRepository {
    pool: DbPool,
    lock_timeout_ms: u64,
}

impl RotationRepository {
    /// Create a new RotationRepository
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            lock_timeout_ms: 2_000,
        }
    }

    /// Bound the wait for another transaction holding the same channel
    pub fn with_lock_timeout_ms(mut self, lock_timeout_ms: u64) -> Self {
        self.lock_timeout_ms = lock_timeout_ms;
        self
    }

    /// Full entries for a channel, ordered by position
    #[instrument(skip(self))]
    pub async fn get_entries(&self, channel_id: &str) -> Result<Vec<RotationEntry>, StoreError> {
        let entries = sqlx::query_as::<_, RotationEntry>(
            r#"
            SELECT channel_id, user_id, position, updated_at
            FROM rotation_entries
            WHERE channel_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(channel_id)
        .fetch_all(self.pool.pool())
        .await?;

        Ok(entries)
    }

    /// Begin a transaction holding the channel's advisory lock
    async fn begin_channel_transaction(
        &self,
        channel_id: &str,
    ) -> Result<Transaction<'static, Postgres>, StoreError> {
        let mut tx = self
            .pool
            .pool()
            .begin()
            .await
            .map_err(|e| StoreError::TransactionFailed(format!("begin: {}", e)))?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(format!("{}ms", self.lock_timeout_ms))
            .execute(&mut *tx)
            .await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(channel_id)
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }
}

async fn fetch_user_ids(
    conn: &mut PgConnection,
    channel_id: &str,
) -> Result<Vec<String>, StoreError> {
    let user_ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT user_id
        FROM rotation_entries
        WHERE channel_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(channel_id)
    .fetch_all(conn)
    .await?;

    Ok(user_ids)
}

async fn commit(tx: Transaction<'static, Postgres>) -> Result<(), StoreError> {
    tx.commit().await.map_err(|e| match StoreError::from(e) {
        // Deferred constraints surface at commit
        violation @ StoreError::ConstraintViolation(_) => violation,
        other => StoreError::TransactionFailed(format!("commit: {}", other)),
    })
}

async fn rollback(tx: Transaction<'static, Postgres>, channel_id: &str) {
    if let Err(e) = tx.rollback().await {
        // The connection is discarded by the pool; nothing was committed.
        warn!(channel_id = %channel_id, error = %e, "Rollback failed");
    }
}

#[async_trait]
impl RotationStore for RotationRepository {
    #[instrument(skip(self))]
    async fn get_rotation(&self, channel_id: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self
            .pool
            .pool()
            .acquire()
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;
        let user_ids = fetch_user_ids(&mut conn, channel_id).await?;

        debug!(count = user_ids.len(), "Fetched rotation");
        Ok(user_ids)
    }

    #[instrument(skip(self, user_ids), fields(requested = user_ids.len()))]
    async fn replace_rotation(
        &self,
        channel_id: &str,
        user_ids: &[String],
    ) -> Result<usize, StoreError> {
        let user_ids = dedup_preserving_order(user_ids);

        let mut tx = self.begin_channel_transaction(channel_id).await?;

        let removed = sqlx::query(
            r#"
            DELETE FROM rotation_entries
            WHERE channel_id = $1 AND NOT (user_id = ANY($2))
            "#,
        )
        .bind(channel_id)
        .bind(&user_ids)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            INSERT INTO rotation_entries (channel_id, user_id, position, updated_at)
            SELECT $1, u.user_id, (u.ord - 1)::INTEGER, now()
            FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS u(user_id, ord)
            ON CONFLICT (channel_id, user_id)
            DO UPDATE SET position = EXCLUDED.position, updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(channel_id)
        .bind(&user_ids)
        .execute(&mut *tx)
        .await?;

        commit(tx).await?;

        info!(
            channel_id = %channel_id,
            stored = user_ids.len(),
            removed = removed,
            "Rotation replaced"
        );
        Ok(user_ids.len())
    }

    #[instrument(skip(self))]
    async fn delete_rotation(&self, channel_id: &str) -> Result<u64, StoreError> {
        let mut tx = self.begin_channel_transaction(channel_id).await?;

        let removed = sqlx::query("DELETE FROM rotation_entries WHERE channel_id = $1")
            .bind(channel_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        commit(tx).await?;

        info!(channel_id = %channel_id, removed = removed, "Rotation deleted");
        Ok(removed)
    }

    #[instrument(skip(self, announce))]
    async fn rotate_once(
        &self,
        channel_id: &str,
        announce: Announce<'_>,
    ) -> Result<RotationOutcome, RotateError> {
        let mut tx = self.begin_channel_transaction(channel_id).await?;

        let user_ids = fetch_user_ids(&mut tx, channel_id).await?;
        let Some(head) = user_ids.first().cloned() else {
            rollback(tx, channel_id).await;
            debug!("No rotation entries, nothing to announce");
            return Ok(RotationOutcome::Empty);
        };

        if let Err(e) = announce(head.clone()).await {
            rollback(tx, channel_id).await;
            warn!(channel_id = %channel_id, user_id = %head, error = %e, "Announcement failed, rotation left unchanged");
            return Err(RotateError::Send(e));
        }

        let next = rotate_left(&user_ids);
        let updated = sqlx::query(
            r#"
            UPDATE rotation_entries AS r
            SET position = (u.ord - 1)::INTEGER, updated_at = now()
            FROM UNNEST($2::TEXT[]) WITH ORDINALITY AS u(user_id, ord)
            WHERE r.channel_id = $1 AND r.user_id = u.user_id
            "#,
        )
        .bind(channel_id)
        .bind(&next)
        .execute(&mut *tx)
        .await
        .map_err(StoreError::from)?
        .rows_affected();

        if updated != next.len() as u64 {
            rollback(tx, channel_id).await;
            return Err(StoreError::TransactionFailed(format!(
                "expected to reposition {} entries, updated {}",
                next.len(),
                updated
            ))
            .into());
        }

        commit(tx).await?;

        info!(
            channel_id = %channel_id,
            announced = %head,
            size = next.len(),
            "Rotation advanced"
        );
        Ok(RotationOutcome::Advanced {
            announced: head,
            next,
        })
    }

    #[instrument(skip(self))]
    async fn list_channels(&self) -> Result<Vec<String>, StoreError> {
        let channels = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT channel_id FROM rotation_entries ORDER BY channel_id",
        )
        .fetch_all(self.pool.pool())
        .await?;

        debug!(count = channels.len(), "Found channels with rotations");
        Ok(channels)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.pool.health_check().await
    }
}
