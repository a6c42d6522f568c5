use tower_sessions::Session;

use super::session::{SESSION_KEY_ROLE, SESSION_KEY_USER_ID};
use crate::error::AppError;
use crate::models::role::Role;

/// Authentication error responses
#[derive(Debug)]
pub enum AuthError {
    Unauthorized,
    Forbidden(&'static str),
    SessionError(String),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthorized => AppError::Unauthorized,
            AuthError::Forbidden(msg) => AppError::Forbidden(msg.to_string()),
            AuthError::SessionError(msg) => AppError::Session(msg),
        }
    }
}

/// The signed-in user acting on a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i64,
    pub role: Role,
}

/// Reads the acting user from the session.
///
/// A session without a user id, or with a role this service does not
/// know, is treated as signed out.
pub async fn get_authenticated_actor(session: &Session) -> Result<Actor, AuthError> {
    let user_id: i64 = session
        .get(SESSION_KEY_USER_ID)
        .await
        .map_err(|e| AuthError::SessionError(e.to_string()))?
        .ok_or(AuthError::Unauthorized)?;

    let role: String = session
        .get(SESSION_KEY_ROLE)
        .await
        .map_err(|e| AuthError::SessionError(e.to_string()))?
        .ok_or(AuthError::Unauthorized)?;

    let role = role.parse::<Role>().map_err(|e| {
        tracing::warn!(user_id, error = %e, "Session carries unknown role");
        AuthError::Unauthorized
    })?;

    Ok(Actor { user_id, role })
}

/// Like [`get_authenticated_actor`], but only admins and managers pass
pub async fn require_reviewer(session: &Session) -> Result<Actor, AuthError> {
    let actor = get_authenticated_actor(session).await?;

    if !actor.role.can_review() {
        return Err(AuthError::Forbidden(
            "Only Admins and Managers can review approval requests",
        ));
    }

    Ok(actor)
}
