use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, PgPool};
use std::{fmt, str::FromStr};

/// Kinds of operation an approval request can defer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "operation_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Delete,
    Unpublish,
    Disable,
    Archive,
    BulkUpdate,
    FinalModification,
    Create,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown operation kind: {0}")]
pub struct UnknownOperationKind(pub String);

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::Delete,
        OperationKind::Unpublish,
        OperationKind::Disable,
        OperationKind::Archive,
        OperationKind::BulkUpdate,
        OperationKind::FinalModification,
        OperationKind::Create,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Delete => "delete",
            OperationKind::Unpublish => "unpublish",
            OperationKind::Disable => "disable",
            OperationKind::Archive => "archive",
            OperationKind::BulkUpdate => "bulk_update",
            OperationKind::FinalModification => "final_modification",
            OperationKind::Create => "create",
        }
    }

    /// Matches the exact wire value only
    pub fn from_wire(s: &str) -> Option<Self> {
        OperationKind::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Operations that need review when performed by a restricted role.
    /// `Create` is a valid request kind but never triggers the gate itself.
    pub fn is_major(&self) -> bool {
        !matches!(self, OperationKind::Create)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = UnknownOperationKind;

    /// Accepts the wire value ("bulk_update") or the variant name in any
    /// letter case ("BULK_UPDATE", "Bulk_Update") that dashboard clients send.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OperationKind::from_wire(s)
            .or_else(|| {
                OperationKind::ALL
                    .into_iter()
                    .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            })
            .ok_or_else(|| UnknownOperationKind(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "approval_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ApprovalRequest {
    pub id: i64,
    pub requester_id: i64,
    pub operation_type: OperationKind,
    pub target_entity_type: String,
    pub target_entity_id: i64,
    pub target_entity_data: Option<serde_json::Value>, // snapshot before the operation
    pub operation_data: serde_json::Value,
    pub reason: Option<String>,
    pub status: ApprovalStatus,
    pub approved_by: Option<i64>, // reviewer for both approvals and rejections
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateApprovalRequestData {
    pub requester_id: i64,
    pub operation_type: OperationKind,
    pub target_entity_type: String,
    pub target_entity_id: i64,
    pub target_entity_data: Option<serde_json::Value>,
    pub operation_data: serde_json::Value,
    pub reason: Option<String>,
}

impl ApprovalRequest {
    /// Inserts a new request in the pending state
    pub async fn create<'e>(
        executor: impl PgExecutor<'e>,
        data: &CreateApprovalRequestData,
    ) -> Result<Self, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO approval_requests (
                requester_id, operation_type, target_entity_type, target_entity_id,
                target_entity_data, operation_data, reason, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
            RETURNING *
            "#,
        )
        .bind(data.requester_id)
        .bind(data.operation_type)
        .bind(&data.target_entity_type)
        .bind(data.target_entity_id)
        .bind(&data.target_entity_data)
        .bind(&data.operation_data)
        .bind(&data.reason)
        .fetch_one(executor)
        .await?;

        Ok(request)
    }

    pub async fn find_by_id<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
    ) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM approval_requests WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(request)
    }

    /// Lists pending requests, oldest first
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let requests = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM approval_requests
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    /// Lists every request filed by a user, newest first
    pub async fn list_by_requester(
        pool: &PgPool,
        requester_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let requests = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM approval_requests
            WHERE requester_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(requester_id)
        .fetch_all(pool)
        .await?;

        Ok(requests)
    }

    /// Moves a pending request to its final status.
    ///
    /// Returns `None` when the request does not exist or has already been
    /// resolved; the status column only ever leaves `pending` once.
    pub async fn resolve<'e>(
        executor: impl PgExecutor<'e>,
        id: i64,
        status: ApprovalStatus,
        reviewer_id: i64,
        rejection_reason: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let request = sqlx::query_as::<_, Self>(
            r#"
            UPDATE approval_requests
            SET
                status = $2,
                approved_by = $3,
                approved_at = NOW(),
                rejection_reason = $4,
                updated_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(reviewer_id)
        .bind(rejection_reason)
        .fetch_optional(executor)
        .await?;

        Ok(request)
    }

    /// Deletes a request. Entity markers still pointing at it go with it.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM approval_requests WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Counts requests grouped by status
    pub async fn count_by_status(
        pool: &PgPool,
    ) -> Result<Vec<(ApprovalStatus, i64)>, sqlx::Error> {
        let counts = sqlx::query_as::<_, (ApprovalStatus, i64)>(
            r#"
            SELECT status, COUNT(*) FROM approval_requests
            GROUP BY status
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(counts)
    }

    /// Dashboard icon hint: resolved requests show their outcome, pending
    /// ones the kind of operation waiting on review
    pub fn icon(&self) -> &'static str {
        match (self.status, self.operation_type) {
            (ApprovalStatus::Approved, _) => "approved",
            (ApprovalStatus::Rejected, _) => "rejected",
            (_, OperationKind::Delete) => "delete",
            (_, OperationKind::Disable) => "disable",
            (_, OperationKind::Unpublish) => "unpublish",
            _ => "pending",
        }
    }

    /// Icon hint for the review queue, where every entry is pending and
    /// kinds without their own icon show as a plain request
    pub fn review_icon(&self) -> &'static str {
        match self.operation_type {
            OperationKind::Delete => "delete",
            OperationKind::Disable => "disable",
            OperationKind::Unpublish => "unpublish",
            _ => "request",
        }
    }
}
