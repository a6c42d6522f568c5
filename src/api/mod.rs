// API module - HTTP endpoints

use axum::Router;

use self::middleware::session::AppState;

pub mod approvals;
pub mod entities;
pub mod health;
pub mod middleware;

/// All HTTP routes; callers add the session layer and state
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(approvals::router())
        .merge(entities::router())
}
