use rust_decimal::Decimal;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub account_id: i64,
    pub amount: Decimal,
    pub recipient_email: String,
}
