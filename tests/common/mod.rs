//! Test harness with a shared Postgres container.
//!
//! The container starts and migrations run once per test binary; every test
//! gets its own pool against the same database, so tests must use entity ids
//! from [`unique_id`] to stay independent.

#![allow(dead_code)]

use anyhow::{Context, Result};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use std::sync::atomic::{AtomicI64, Ordering};
use test_context::AsyncTestContext;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, Session, SessionManagerLayer};

use lms_gate::api::middleware::session::{AppState, SESSION_KEY_ROLE, SESSION_KEY_USER_ID};

struct SharedTestInfra {
    db_url: String,
    // Keep the container alive for the entire test run
    _postgres: ContainerAsync<Postgres>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();

static NEXT_ID: AtomicI64 = AtomicI64::new(1_000);

/// Ids unique within this test binary, for entities and users
pub fn unique_id() -> i64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let postgres = Postgres::default()
            .with_tag("16")
            .start()
            .await
            .context("Failed to start Postgres container")?;

        let pg_host = postgres.get_host().await?;
        let pg_port = postgres.get_host_port_ipv4(5432).await?;
        let db_url = format!(
            "postgresql://postgres:postgres@{}:{}/postgres",
            pg_host, pg_port
        );

        let pool = PgPool::connect(&db_url)
            .await
            .context("Failed to connect to Postgres for migrations")?;

        lms_gate::db::run_migrations(&pool)
            .await
            .context("Failed to run migrations")?;

        pool.close().await;

        Ok(Self {
            db_url,
            _postgres: postgres,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

pub struct TestHarness {
    pub db_pool: PgPool,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::new().await.expect("Failed to create test harness")
    }

    async fn teardown(self) {
        self.db_pool.close().await;
    }
}

impl TestHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let db_pool = PgPool::connect(&infra.db_url)
            .await
            .context("Failed to connect to test database")?;

        Ok(Self { db_pool })
    }

    /// The full HTTP app over an in-memory session store, plus a sign-in
    /// route standing in for the external login flow
    pub fn app(&self) -> Router {
        lms_gate::api::router()
            .route("/test/sign-in", post(sign_in))
            .layer(SessionManagerLayer::new(MemoryStore::default()).with_secure(false))
            .with_state(AppState {
                pool: self.db_pool.clone(),
            })
    }

    pub async fn count_requests_for(&self, entity_type: &str, entity_id: i64) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM approval_requests WHERE target_entity_type = $1 AND target_entity_id = $2",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_one(&self.db_pool)
        .await
        .expect("Failed to count approval requests")
    }

    pub async fn count_markers_for(&self, entity_type: &str, entity_id: i64) -> i64 {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM entity_status WHERE entity_type = $1 AND entity_id = $2",
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_one(&self.db_pool)
        .await
        .expect("Failed to count entity status rows")
    }
}

#[derive(Deserialize)]
struct SignIn {
    user_id: i64,
    role: String,
}

async fn sign_in(session: Session, Json(body): Json<SignIn>) -> StatusCode {
    session
        .insert(SESSION_KEY_USER_ID, body.user_id)
        .await
        .expect("Failed to write user id");
    session
        .insert(SESSION_KEY_ROLE, body.role)
        .await
        .expect("Failed to write role");
    StatusCode::NO_CONTENT
}

/// Signs in through the test route and returns the session cookie
pub async fn sign_in_as(app: &Router, user_id: i64, role: &str) -> String {
    let body = serde_json::json!({ "user_id": user_id, "role": role });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/test/sign-in")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("sign-in should set a session cookie")
        .to_str()
        .unwrap();

    set_cookie.split(';').next().unwrap().to_string()
}

/// Sends a request with an optional session cookie and JSON body
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
