use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{info, warn};

use super::signature;
use crate::{
    error::LedgerError,
    ledger::{LedgerStore, NewPayment, Payment, PaymentStatus},
    money,
};

const REQUIRED_FIELDS: [&str; 5] = [
    "transaction_id",
    "user_id",
    "account_id",
    "amount",
    signature::SIGNATURE_FIELD,
];

const MAX_TRANSACTION_ID_LEN: usize = 100;

/// An external credit after its signature has been checked.
#[derive(Debug, Clone)]
pub struct CreditEvent {
    pub transaction_id: String,
    pub user_id: i64,
    pub account_id: i64,
    pub amount: Decimal,
}

fn integer_field(fields: &Map<String, Value>, name: &'static str) -> Result<i64, LedgerError> {
    fields
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| LedgerError::validation(name, "must be an integer"))
}

fn amount_field(fields: &Map<String, Value>) -> Result<Decimal, LedgerError> {
    let text = match fields.get("amount") {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.clone(),
        _ => return Err(LedgerError::validation("amount", "must be a number")),
    };
    let amount = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| LedgerError::validation("amount", "must be a decimal number"))?;
    money::positive_amount("amount", amount)
}

/// Reads typed values out of an already verified payload.
pub fn parse_event(fields: &Map<String, Value>) -> Result<CreditEvent, LedgerError> {
    let transaction_id = fields
        .get("transaction_id")
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| LedgerError::validation("transaction_id", "must be a non-empty string"))?;
    if transaction_id.chars().count() > MAX_TRANSACTION_ID_LEN {
        return Err(LedgerError::validation(
            "transaction_id",
            format!("must be at most {MAX_TRANSACTION_ID_LEN} characters"),
        ));
    }

    Ok(CreditEvent {
        transaction_id: transaction_id.to_string(),
        user_id: integer_field(fields, "user_id")?,
        account_id: integer_field(fields, "account_id")?,
        amount: amount_field(fields)?,
    })
}

/// Verifies and applies one webhook delivery.
///
/// Re-delivery of a payload that was already applied fails with
/// [`LedgerError::DuplicateTransaction`] and leaves the balance untouched.
pub async fn ingest(
    store: &dyn LedgerStore,
    secret: &str,
    fields: &Map<String, Value>,
) -> Result<Payment, LedgerError> {
    if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !fields.contains_key(**f)) {
        return Err(LedgerError::validation(*missing, "is required"));
    }

    if !signature::verify(fields, secret) {
        warn!("webhook signature rejected");
        return Err(LedgerError::InvalidSignature);
    }

    let event = parse_event(fields)?;
    apply_credit(store, event).await
}

/// Credits the account and journals the payment as one unit.
pub async fn apply_credit(
    store: &dyn LedgerStore,
    event: CreditEvent,
) -> Result<Payment, LedgerError> {
    let mut tx = store.begin().await?;

    let user = tx
        .user_by_id(event.user_id)
        .await?
        .ok_or(LedgerError::NotFound("user"))?;

    let account = tx
        .lock_account(event.account_id)
        .await?
        .filter(|a| a.user_id == user.id)
        .ok_or(LedgerError::NotFound("account"))?;

    if tx.payment_exists(&event.transaction_id).await? {
        warn!(transaction_id = %event.transaction_id, "webhook already processed");
        return Err(LedgerError::DuplicateTransaction);
    }

    let account = tx.adjust_balance(account.id, event.amount).await?;
    let payment = tx
        .insert_payment(NewPayment {
            account_id: account.id,
            user_id: user.id,
            amount: event.amount,
            recipient_email: user.email,
            transaction_id: event.transaction_id,
            status: PaymentStatus::Completed,
        })
        .await?;
    tx.commit().await?;

    info!(
        payment_id = payment.id,
        account_id = account.id,
        transaction_id = ?payment.transaction_id,
        amount = %payment.amount,
        balance = %account.balance,
        "webhook credit applied"
    );
    Ok(payment)
}
