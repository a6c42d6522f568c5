use axum::extract::FromRef;
use sqlx::PgPool;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;

/// Session keys written by the login flow and read by the approval API
pub const SESSION_KEY_USER_ID: &str = "user_id";
pub const SESSION_KEY_ROLE: &str = "role";

/// Creates a Postgres-backed session layer for Axum
pub async fn create_session_layer(
    pool: PgPool,
    cookie_secure: bool,
) -> Result<SessionManagerLayer<PostgresStore>, sqlx::Error> {
    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(cookie_secure)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(24)));

    Ok(session_layer)
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
}

impl FromRef<AppState> for PgPool {
    fn from_ref(state: &AppState) -> PgPool {
        state.pool.clone()
    }
}
