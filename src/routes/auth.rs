use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::{LoginRequest, LoginResponse, Session};
use crate::AppState;

fn session_key(token: &str) -> String {
    format!("session:{}", token)
}

/// POST /api/auth/login - Exchange the admin password for a bearer token
///
/// `rememberMe` extends the session to the configured remember-me window
/// instead of the short default TTL.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.password != state.config.admin_password {
        tracing::warn!("Rejected login attempt with wrong password");
        return Err(ApiError::Unauthorized("Invalid password".to_string()));
    }

    let now = chrono::Utc::now().timestamp_millis();
    // Saturate so an absurd TTL from the environment cannot overflow
    let ttl_ms = if payload.remember_me {
        i64::try_from(state.config.remember_me_days)
            .unwrap_or(i64::MAX)
            .saturating_mul(24 * 60 * 60 * 1000)
    } else {
        i64::try_from(state.config.session_ttl_seconds)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000)
    };

    let token = Uuid::new_v4().to_string();
    let session = Session {
        created_at: now,
        expires_at: now.saturating_add(ttl_ms),
    };
    state.store.set(&session_key(&token), &session).await?;

    tracing::info!(
        "Admin logged in (remember_me={}, ttl={}ms)",
        payload.remember_me,
        ttl_ms
    );

    Ok(Json(LoginResponse {
        token,
        expires_at: session.expires_at,
    }))
}

/// POST /api/auth/logout - Invalidate the current session token
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)?;
    state.store.remove(&session_key(token)).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))
}

/// Validate the bearer token on a protected route. Expired sessions are
/// removed as a side effect.
pub async fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let token = bearer_token(headers)?;
    let key = session_key(token);

    let session: Session = state
        .store
        .get(&key)
        .await
        .ok_or_else(|| ApiError::Unauthorized("Invalid or expired session".to_string()))?;

    if session.is_expired(chrono::Utc::now().timestamp_millis()) {
        if let Err(e) = state.store.remove(&key).await {
            tracing::warn!("Failed to remove expired session: {}", e);
        }
        return Err(ApiError::Unauthorized("Invalid or expired session".to_string()));
    }

    Ok(())
}
