use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use crate::api::middleware::{
    auth::{get_authenticated_actor, require_reviewer},
    session::AppState,
};
use crate::error::{AppError, Result};
use crate::models::approval_request::ApprovalRequest;
use crate::services::{
    approval_gate::{self, NewApprovalRequest},
    approval_resolution::{self, ApprovalStats, Decision},
};

/// An approval request as shown on dashboards
#[derive(Debug, Serialize)]
pub struct ApprovalRequestView {
    #[serde(flatten)]
    pub request: ApprovalRequest,
    pub icon: &'static str,
}

impl ApprovalRequestView {
    /// Entry in the reviewer queue
    fn for_review(request: ApprovalRequest) -> Self {
        let icon = request.review_icon();
        Self { request, icon }
    }
}

impl From<ApprovalRequest> for ApprovalRequestView {
    fn from(request: ApprovalRequest) -> Self {
        let icon = request.icon();
        Self { request, icon }
    }
}

/// Matches the `target_entity_type` column width
const MAX_ENTITY_TYPE_LEN: usize = 50;

#[derive(Debug, Serialize)]
pub struct ApprovalListResponse {
    pub requests: Vec<ApprovalRequestView>,
}

#[derive(Debug, Deserialize)]
pub struct CreateApprovalBody {
    pub operation_type: String,
    pub target_entity_type: String,
    pub target_entity_id: i64,
    #[serde(default = "empty_object")]
    pub operation_data: serde_json::Value,
    pub target_entity_data: Option<serde_json::Value>,
    pub reason: Option<String>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

#[derive(Debug, Serialize)]
pub struct CreateApprovalResponse {
    pub message: &'static str,
    pub request_id: i64,
    pub icon: &'static str,
    pub status: &'static str,
}

/// File an approval request for a restricted operation
async fn create_request(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateApprovalBody>,
) -> Result<(StatusCode, Json<CreateApprovalResponse>)> {
    let actor = get_authenticated_actor(&session).await?;

    if !actor.role.is_restricted() {
        return Err(AppError::Forbidden(
            "Only Students, Presenters, and Mentors can request approvals".to_string(),
        ));
    }

    let target_entity_type = body.target_entity_type.trim();
    if target_entity_type.is_empty() {
        return Err(AppError::Validation(
            "target_entity_type is required".to_string(),
        ));
    }
    if target_entity_type.chars().count() > MAX_ENTITY_TYPE_LEN {
        return Err(AppError::Validation(format!(
            "target_entity_type must be at most {} characters",
            MAX_ENTITY_TYPE_LEN
        )));
    }

    let request_id = approval_gate::create_approval_request(
        &state.pool,
        NewApprovalRequest {
            requester_id: actor.user_id,
            role: actor.role,
            operation_kind: body.operation_type,
            target_entity_type: target_entity_type.to_string(),
            target_entity_id: body.target_entity_id,
            operation_data: body.operation_data,
            target_entity_data: body.target_entity_data,
            reason: body.reason.filter(|r| !r.trim().is_empty()),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateApprovalResponse {
            message: "Approval request created successfully",
            request_id,
            icon: "request",
            status: "pending",
        }),
    ))
}

/// Pending requests awaiting review
async fn list_pending(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApprovalListResponse>> {
    require_reviewer(&session).await?;

    let requests = ApprovalRequest::list_pending(&state.pool).await?;

    Ok(Json(ApprovalListResponse {
        requests: requests
            .into_iter()
            .map(ApprovalRequestView::for_review)
            .collect(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub decision: String,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub message: String,
    pub icon: &'static str,
    pub status: &'static str,
}

/// Approve or reject a pending request
async fn decide_request(
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
    session: Session,
    Json(body): Json<DecisionBody>,
) -> Result<Json<DecisionResponse>> {
    let reviewer = require_reviewer(&session).await?;

    let decision = match body.decision.as_str() {
        "approve" => Decision::Approve,
        "reject" => Decision::Reject {
            reason: body.rejection_reason,
        },
        _ => {
            return Err(AppError::Validation(
                "Decision must be 'approve' or 'reject'".to_string(),
            ))
        }
    };

    let request =
        approval_resolution::decide(&state.pool, request_id, reviewer.user_id, decision).await?;

    let status = request.status.as_str();
    Ok(Json(DecisionResponse {
        message: format!("Request {} successfully", status),
        icon: request.icon(),
        status,
    }))
}

/// Requests filed by the signed-in user
async fn my_requests(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApprovalListResponse>> {
    let actor = get_authenticated_actor(&session).await?;

    let requests = ApprovalRequest::list_by_requester(&state.pool, actor.user_id).await?;

    Ok(Json(ApprovalListResponse {
        requests: requests.into_iter().map(Into::into).collect(),
    }))
}

async fn approval_stats(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ApprovalStats>> {
    require_reviewer(&session).await?;

    let stats = approval_resolution::stats(&state.pool).await?;

    Ok(Json(stats))
}

#[derive(Debug, Serialize)]
pub struct WithdrawResponse {
    pub message: &'static str,
}

/// Delete one of the signed-in user's own requests
async fn withdraw_request(
    State(state): State<AppState>,
    Path(request_id): Path<i64>,
    session: Session,
) -> Result<Json<WithdrawResponse>> {
    let actor = get_authenticated_actor(&session).await?;

    approval_resolution::withdraw(&state.pool, request_id, actor.user_id).await?;

    Ok(Json(WithdrawResponse {
        message: "Approval request deleted successfully",
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/approvals/request", post(create_request))
        .route("/approvals/pending", get(list_pending))
        .route("/approvals/my-requests", get(my_requests))
        .route("/approvals/stats", get(approval_stats))
        .route("/approvals/:id/decision", post(decide_request))
        .route("/approvals/:id", delete(withdraw_request))
}
