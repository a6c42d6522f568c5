use serde::Serialize;
use sqlx::PgPool;

use crate::models::{
    approval_request::{ApprovalRequest, ApprovalStatus, OperationKind},
    entity_status::{EntityLifecycle, EntityStatus},
};

#[derive(thiserror::Error, Debug)]
pub enum ResolutionError {
    #[error("Approval request not found or already processed")]
    NotPending,

    #[error("Approval request not found")]
    NotFound,

    #[error("You can only delete your own approval requests")]
    Forbidden,

    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// A reviewer's verdict on a pending request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject { reason: Option<String> },
}

impl Decision {
    fn status(&self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject { .. } => ApprovalStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}

/// Approves or rejects a pending request and releases its entity marker.
///
/// The request row transitions at most once; deciding an already resolved
/// request fails with `NotPending`. Carrying out the approved mutation on
/// the domain entity is left to the owner of that entity.
#[tracing::instrument(skip(pool, decision))]
pub async fn decide(
    pool: &PgPool,
    request_id: i64,
    reviewer_id: i64,
    decision: Decision,
) -> Result<ApprovalRequest, ResolutionError> {
    let rejection_reason = match &decision {
        Decision::Reject { reason } => reason.as_deref(),
        Decision::Approve => None,
    };

    let mut tx = pool.begin().await?;

    let request = ApprovalRequest::resolve(
        &mut *tx,
        request_id,
        decision.status(),
        reviewer_id,
        rejection_reason,
    )
    .await?
    .ok_or(ResolutionError::NotPending)?;

    match settled_lifecycle(&decision, request.operation_type) {
        Some(lifecycle) => {
            EntityStatus::settle(&mut *tx, request.id, lifecycle).await?;
        }
        None => {
            EntityStatus::remove_for_request(&mut *tx, request.id).await?;
        }
    }

    tx.commit().await?;

    tracing::info!(
        status = request.status.as_str(),
        operation = %request.operation_type,
        entity_type = %request.target_entity_type,
        entity_id = request.target_entity_id,
        "Approval request resolved"
    );

    Ok(request)
}

/// Where an entity's marker ends up once its request is decided.
/// `None` means the entity is gone and the marker is dropped.
fn settled_lifecycle(decision: &Decision, kind: OperationKind) -> Option<EntityLifecycle> {
    match (decision, kind) {
        (Decision::Approve, OperationKind::Delete) => None,
        (Decision::Approve, OperationKind::Disable) => Some(EntityLifecycle::Disabled),
        _ => Some(EntityLifecycle::Active),
    }
}

/// Lets a requester take back one of their own requests, whatever its status
#[tracing::instrument(skip(pool))]
pub async fn withdraw(
    pool: &PgPool,
    request_id: i64,
    requester_id: i64,
) -> Result<(), ResolutionError> {
    let request = ApprovalRequest::find_by_id(pool, request_id)
        .await?
        .ok_or(ResolutionError::NotFound)?;

    if request.requester_id != requester_id {
        tracing::warn!(owner_id = request.requester_id, "Withdrawal by non-requester refused");
        return Err(ResolutionError::Forbidden);
    }

    ApprovalRequest::delete(pool, request_id).await?;

    tracing::info!("Approval request withdrawn");

    Ok(())
}

pub async fn stats(pool: &PgPool) -> Result<ApprovalStats, ResolutionError> {
    let counts = ApprovalRequest::count_by_status(pool).await?;

    let mut stats = ApprovalStats::default();
    for (status, count) in counts {
        match status {
            ApprovalStatus::Pending => stats.pending = count,
            ApprovalStatus::Approved => stats.approved = count,
            ApprovalStatus::Rejected => stats.rejected = count,
        }
    }
    stats.total = stats.pending + stats.approved + stats.rejected;

    Ok(stats)
}
