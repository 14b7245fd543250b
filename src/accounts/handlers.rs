use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use super::dto::CreateAccountRequest;
use crate::{
    auth::AuthUser,
    error::{json_body, LedgerError},
    ledger::Account,
    money,
    state::AppState,
};

pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", post(create_account))
        .route("/accounts/", post(create_account))
        .route("/users/me/accounts", get(list_my_accounts))
}

/// Opens an account for the caller with the given starting balance.
#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreateAccountRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Account>), LedgerError> {
    let body = json_body(payload)?;
    let balance = money::non_negative_amount("balance", body.balance)?;

    let account = state.store.create_account(user.id, balance).await?;
    info!(account_id = account.id, balance = %account.balance, "account opened");
    Ok((StatusCode::CREATED, Json(account)))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_my_accounts(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Account>>, LedgerError> {
    let accounts = state.store.list_accounts(user.id).await?;
    Ok(Json(accounts))
}
