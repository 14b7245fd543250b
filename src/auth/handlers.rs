use axum::{
    extract::{rejection::JsonRejection, FromRef, State},
    routing::post,
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginRequest, TokenResponse},
        jwt::JwtKeys,
        password::verify_password,
    },
    error::{json_body, LedgerError},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, LedgerError> {
    let payload = json_body(payload)?;
    let email = payload.email.trim().to_lowercase();

    let user = match state.store.find_user_by_email(&email).await? {
        Some(u) => u,
        None => {
            warn!(%email, "login unknown email");
            return Err(LedgerError::Unauthenticated("Invalid credentials"));
        }
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login invalid password");
        return Err(LedgerError::Unauthenticated("Invalid credentials"));
    }

    if !user.is_active {
        warn!(user_id = user.id, "login by inactive user");
        return Err(LedgerError::Forbidden("User inactive"));
    }

    let access_token = JwtKeys::from_ref(&state).sign(user.id)?;

    info!(user_id = user.id, "user logged in");
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}
