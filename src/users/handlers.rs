use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{dto::CreateUserRequest, services::create_user};
use crate::{
    auth::{AdminUser, AuthUser},
    error::{json_body, LedgerError},
    ledger::User,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users/me", get(get_me))
}

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/admin/me", get(get_admin_me))
        .route("/admin/users", get(list_users).post(create_user_by_admin))
}

#[instrument(skip(user), fields(user_id = user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

#[instrument(skip(admin), fields(user_id = admin.id))]
pub async fn get_admin_me(AdminUser(admin): AdminUser) -> Json<User> {
    Json(admin)
}

#[instrument(skip(state, admin), fields(user_id = admin.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<Json<Vec<User>>, LedgerError> {
    let users = state.store.list_users().await?;
    info!(count = users.len(), "users listed");
    Ok(Json(users))
}

#[instrument(skip(state, admin, payload), fields(user_id = admin.id))]
pub async fn create_user_by_admin(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), LedgerError> {
    let body = json_body(payload)?;
    let user = create_user(state.store.as_ref(), body, false).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
