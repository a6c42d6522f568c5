//! Integration tests for deciding and withdrawing approval requests.

mod common;

use crate::common::{unique_id, TestHarness};
use lms_gate::models::{
    approval_request::{ApprovalRequest, ApprovalStatus},
    entity_status::{EntityLifecycle, EntityStatus},
    role::Role,
};
use lms_gate::services::{
    approval_gate::{create_approval_request, NewApprovalRequest},
    approval_resolution::{self, Decision, ResolutionError},
};
use serde_json::json;
use test_context::test_context;

const REVIEWER_ID: i64 = 1;

async fn park(
    ctx: &TestHarness,
    requester_id: i64,
    kind: &str,
    entity_type: &str,
    entity_id: i64,
) -> i64 {
    create_approval_request(
        &ctx.db_pool,
        NewApprovalRequest {
            requester_id,
            role: Role::Presenter,
            operation_kind: kind.to_string(),
            target_entity_type: entity_type.to_string(),
            target_entity_id: entity_id,
            operation_data: json!({}),
            target_entity_data: None,
            reason: None,
        },
    )
    .await
    .expect("Failed to create approval request")
}

#[test_context(TestHarness)]
#[tokio::test]
async fn approving_a_delete_drops_the_marker(ctx: &TestHarness) {
    let course_id = unique_id();
    let request_id = park(ctx, unique_id(), "delete", "course", course_id).await;

    let resolved = approval_resolution::decide(&ctx.db_pool, request_id, REVIEWER_ID, Decision::Approve)
        .await
        .unwrap();

    assert_eq!(resolved.status, ApprovalStatus::Approved);
    assert_eq!(resolved.approved_by, Some(REVIEWER_ID));
    assert!(resolved.approved_at.is_some());
    assert_eq!(ctx.count_markers_for("course", course_id).await, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn approving_a_disable_disables_the_entity(ctx: &TestHarness) {
    let user_id = unique_id();
    let request_id = park(ctx, unique_id(), "disable", "user", user_id).await;

    approval_resolution::decide(&ctx.db_pool, request_id, REVIEWER_ID, Decision::Approve)
        .await
        .unwrap();

    let marker = EntityStatus::find(&ctx.db_pool, "user", user_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.status, EntityLifecycle::Disabled);
    assert_eq!(marker.approval_request_id, None);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn rejecting_restores_active_and_keeps_reason(ctx: &TestHarness) {
    let cohort_id = unique_id();
    let request_id = park(ctx, unique_id(), "archive", "cohort", cohort_id).await;

    let resolved = approval_resolution::decide(
        &ctx.db_pool,
        request_id,
        REVIEWER_ID,
        Decision::Reject {
            reason: Some("cohort still running".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(resolved.status, ApprovalStatus::Rejected);
    assert_eq!(resolved.rejection_reason.as_deref(), Some("cohort still running"));

    let marker = EntityStatus::find(&ctx.db_pool, "cohort", cohort_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.status, EntityLifecycle::Active);
    assert_eq!(marker.approval_request_id, None);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn a_request_is_decided_only_once(ctx: &TestHarness) {
    let course_id = unique_id();
    let request_id = park(ctx, unique_id(), "unpublish", "course", course_id).await;

    approval_resolution::decide(&ctx.db_pool, request_id, REVIEWER_ID, Decision::Approve)
        .await
        .unwrap();

    let second = approval_resolution::decide(
        &ctx.db_pool,
        request_id,
        REVIEWER_ID,
        Decision::Reject { reason: None },
    )
    .await;
    assert!(matches!(second, Err(ResolutionError::NotPending)));

    let stored = ApprovalRequest::find_by_id(&ctx.db_pool, request_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, ApprovalStatus::Approved);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn deciding_a_superseded_request_leaves_the_newer_marker(ctx: &TestHarness) {
    let course_id = unique_id();
    let older = park(ctx, unique_id(), "unpublish", "course", course_id).await;
    let newer = park(ctx, unique_id(), "archive", "course", course_id).await;

    approval_resolution::decide(
        &ctx.db_pool,
        older,
        REVIEWER_ID,
        Decision::Reject { reason: None },
    )
    .await
    .unwrap();

    let marker = EntityStatus::find(&ctx.db_pool, "course", course_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(marker.status, EntityLifecycle::PendingApproval);
    assert_eq!(marker.approval_request_id, Some(newer));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn deciding_an_unknown_request_is_not_pending(ctx: &TestHarness) {
    let result =
        approval_resolution::decide(&ctx.db_pool, i64::MAX, REVIEWER_ID, Decision::Approve).await;

    assert!(matches!(result, Err(ResolutionError::NotPending)));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn withdrawing_removes_request_and_marker(ctx: &TestHarness) {
    let requester_id = unique_id();
    let course_id = unique_id();
    let request_id = park(ctx, requester_id, "delete", "course", course_id).await;

    approval_resolution::withdraw(&ctx.db_pool, request_id, requester_id)
        .await
        .unwrap();

    assert!(ApprovalRequest::find_by_id(&ctx.db_pool, request_id)
        .await
        .unwrap()
        .is_none());
    assert_eq!(ctx.count_markers_for("course", course_id).await, 0);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn only_the_requester_can_withdraw(ctx: &TestHarness) {
    let course_id = unique_id();
    let request_id = park(ctx, unique_id(), "delete", "course", course_id).await;

    let result = approval_resolution::withdraw(&ctx.db_pool, request_id, unique_id()).await;

    assert!(matches!(result, Err(ResolutionError::Forbidden)));
    assert_eq!(ctx.count_requests_for("course", course_id).await, 1);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn withdrawing_a_missing_request_is_not_found(ctx: &TestHarness) {
    let result = approval_resolution::withdraw(&ctx.db_pool, i64::MAX, unique_id()).await;

    assert!(matches!(result, Err(ResolutionError::NotFound)));
}

#[test_context(TestHarness)]
#[tokio::test]
async fn stats_add_up(ctx: &TestHarness) {
    let pending = park(ctx, unique_id(), "archive", "course", unique_id()).await;
    let approved = park(ctx, unique_id(), "archive", "course", unique_id()).await;
    approval_resolution::decide(&ctx.db_pool, approved, REVIEWER_ID, Decision::Approve)
        .await
        .unwrap();

    let stats = approval_resolution::stats(&ctx.db_pool).await.unwrap();

    assert!(stats.pending >= 1, "request {pending} should count as pending");
    assert!(stats.approved >= 1);
    assert_eq!(stats.total, stats.pending + stats.approved + stats.rejected);
}

#[test_context(TestHarness)]
#[tokio::test]
async fn requester_listing_is_newest_first(ctx: &TestHarness) {
    let requester_id = unique_id();
    let first = park(ctx, requester_id, "archive", "course", unique_id()).await;
    let second = park(ctx, requester_id, "disable", "course", unique_id()).await;

    let requests = ApprovalRequest::list_by_requester(&ctx.db_pool, requester_id)
        .await
        .unwrap();

    let ids: Vec<i64> = requests.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![second, first]);
}
