use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};

use super::{
    dto::CreatePaymentRequest,
    services::{transfer, TransferRequest},
};
use crate::{
    auth::AuthUser,
    error::{json_body, LedgerError},
    ledger::Payment,
    money,
    state::AppState,
    users::validate_email,
};

pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route("/payments/", get(list_payments).post(create_payment))
}

#[instrument(skip(state, user, payload), fields(user_id = user.id))]
pub async fn create_payment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Payment>), LedgerError> {
    let body = json_body(payload)?;
    let amount = money::positive_amount("amount", body.amount)?;
    let recipient_email = validate_email("recipient_email", &body.recipient_email)?;

    let payment = transfer(
        state.store.as_ref(),
        TransferRequest {
            acting_user_id: user.id,
            source_account_id: body.account_id,
            amount,
            recipient_email,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(payment)))
}

#[instrument(skip(state, user), fields(user_id = user.id))]
pub async fn list_payments(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Payment>>, LedgerError> {
    let payments = state.store.list_payments(user.id).await?;
    info!(count = payments.len(), "payments listed");
    Ok(Json(payments))
}
