use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "entity_lifecycle", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityLifecycle {
    Active,
    PendingApproval,
    Disabled,
}

/// Approval marker for a single (entity type, entity id) pair.
///
/// Entities without a row are implicitly active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EntityStatus {
    pub id: i64,
    pub entity_type: String,
    pub entity_id: i64,
    pub status: EntityLifecycle,
    pub approval_request_id: Option<i64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityStatus {
    pub async fn find<'e>(
        executor: impl PgExecutor<'e>,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let status = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM entity_status
            WHERE entity_type = $1 AND entity_id = $2
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_optional(executor)
        .await?;

        Ok(status)
    }

    /// Marks an entity as waiting on `approval_request_id`.
    ///
    /// Updates the existing row in place (keeping its id) or creates one.
    /// The upsert is a single statement, so concurrent gate calls for the
    /// same entity serialize on the unique key; every write bumps `version`.
    pub async fn mark_pending<'e>(
        executor: impl PgExecutor<'e>,
        entity_type: &str,
        entity_id: i64,
        approval_request_id: i64,
    ) -> Result<Self, sqlx::Error> {
        let status = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO entity_status (entity_type, entity_id, status, approval_request_id)
            VALUES ($1, $2, 'pending_approval', $3)
            ON CONFLICT (entity_type, entity_id) DO UPDATE
            SET
                status = 'pending_approval',
                approval_request_id = EXCLUDED.approval_request_id,
                version = entity_status.version + 1,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .bind(approval_request_id)
        .fetch_one(executor)
        .await?;

        Ok(status)
    }

    /// Releases the marker held by a resolved request.
    ///
    /// Only a row still referencing `approval_request_id` is touched; a
    /// marker already taken over by a newer request is left alone.
    pub async fn settle<'e>(
        executor: impl PgExecutor<'e>,
        approval_request_id: i64,
        status: EntityLifecycle,
    ) -> Result<Option<Self>, sqlx::Error> {
        let settled = sqlx::query_as::<_, Self>(
            r#"
            UPDATE entity_status
            SET
                status = $2,
                approval_request_id = NULL,
                version = version + 1,
                updated_at = NOW()
            WHERE approval_request_id = $1
            RETURNING *
            "#,
        )
        .bind(approval_request_id)
        .bind(status)
        .fetch_optional(executor)
        .await?;

        Ok(settled)
    }

    /// Drops the marker held by a request whose entity no longer exists
    pub async fn remove_for_request<'e>(
        executor: impl PgExecutor<'e>,
        approval_request_id: i64,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM entity_status WHERE approval_request_id = $1
            "#,
        )
        .bind(approval_request_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected())
    }
}
