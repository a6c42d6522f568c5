use sqlx::PgPool;

use crate::models::{
    approval_request::{ApprovalRequest, CreateApprovalRequestData, OperationKind},
    entity_status::EntityStatus,
    role::Role,
};

#[derive(thiserror::Error, Debug)]
pub enum GateError {
    #[error("Invalid operation kind: {0}")]
    InvalidOperationKind(String),

    #[error("Failed to record approval request: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// A mutation a restricted user wants to perform on some entity
#[derive(Debug, Clone)]
pub struct NewApprovalRequest {
    pub requester_id: i64,
    pub role: Role,
    pub operation_kind: String,
    pub target_entity_type: String,
    pub target_entity_id: i64,
    pub operation_data: serde_json::Value,
    pub target_entity_data: Option<serde_json::Value>,
    pub reason: Option<String>,
}

/// What a mutation handler should do after consulting the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    /// Apply the mutation now
    Proceed,
    /// The mutation was parked; do not apply it
    Deferred { request_id: i64 },
}

/// Returns true when `role` may not perform `operation_kind` without review.
///
/// Anything that does not parse as a known role or operation kind is not
/// gated, so callers must pass the exact literals ("Student", "bulk_update").
pub fn requires_approval(role: &str, operation_kind: &str) -> bool {
    match (role.parse::<Role>(), OperationKind::from_wire(operation_kind)) {
        (Ok(role), Some(kind)) => requires_approval_for(role, kind),
        _ => false,
    }
}

pub fn requires_approval_for(role: Role, kind: OperationKind) -> bool {
    role.is_restricted() && kind.is_major()
}

/// Records a pending approval request and marks its target entity.
///
/// Both writes happen in one transaction: on any database error the
/// transaction is dropped uncommitted and neither row survives. The
/// requested mutation itself is never performed here.
#[tracing::instrument(
    skip(pool, request),
    fields(
        requester_id = request.requester_id,
        role = %request.role,
        entity_type = %request.target_entity_type,
        entity_id = request.target_entity_id,
    )
)]
pub async fn create_approval_request(
    pool: &PgPool,
    request: NewApprovalRequest,
) -> Result<i64, GateError> {
    let operation_type = request
        .operation_kind
        .parse::<OperationKind>()
        .map_err(|e| GateError::InvalidOperationKind(e.0))?;

    let data = CreateApprovalRequestData {
        requester_id: request.requester_id,
        operation_type,
        target_entity_type: request.target_entity_type,
        target_entity_id: request.target_entity_id,
        target_entity_data: request.target_entity_data,
        operation_data: request.operation_data,
        reason: request.reason,
    };

    let result = record_request(pool, &data).await;

    match result {
        Ok((approval, status)) => {
            tracing::info!(
                approval_request_id = approval.id,
                operation = %approval.operation_type,
                entity_status_id = status.id,
                entity_status_version = status.version,
                "Approval request created"
            );
            Ok(approval.id)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create approval request");
            Err(GateError::Persistence(e))
        }
    }
}

async fn record_request(
    pool: &PgPool,
    data: &CreateApprovalRequestData,
) -> Result<(ApprovalRequest, EntityStatus), sqlx::Error> {
    let mut tx = pool.begin().await?;

    // 1. Park the operation
    let approval = ApprovalRequest::create(&mut *tx, data).await?;

    // 2. Point the entity marker at it
    let status = EntityStatus::mark_pending(
        &mut *tx,
        &data.target_entity_type,
        data.target_entity_id,
        approval.id,
    )
    .await?;

    // 3. Both or neither
    tx.commit().await?;

    Ok((approval, status))
}

/// Consults the gate for a mutation and parks it when review is needed.
///
/// Mutation handlers call this before touching the entity and only apply
/// the change on `GateOutcome::Proceed`.
pub async fn intercept(
    pool: &PgPool,
    request: NewApprovalRequest,
) -> Result<GateOutcome, GateError> {
    let kind = request
        .operation_kind
        .parse::<OperationKind>()
        .map_err(|e| GateError::InvalidOperationKind(e.0))?;

    if !requires_approval_for(request.role, kind) {
        tracing::debug!(
            role = %request.role,
            operation = %kind,
            "Operation does not require approval"
        );
        return Ok(GateOutcome::Proceed);
    }

    let request_id = create_approval_request(pool, request).await?;
    Ok(GateOutcome::Deferred { request_id })
}
