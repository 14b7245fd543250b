use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Every failure the ledger surfaces to a caller.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("transaction already processed")]
    DuplicateTransaction,

    #[error("user with this email already exists")]
    EmailTaken,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Stable machine-readable code for the response body.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            Self::EmailTaken => "EMAIL_TAKEN",
            Self::Database(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidSignature
            | Self::InsufficientFunds
            | Self::DuplicateTransaction
            | Self::EmailTaken => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Unwraps a JSON body, turning a malformed one into a validation error.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, LedgerError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| LedgerError::validation("body", e.body_text()))
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<&'static str>,
}

impl IntoResponse for LedgerError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = match &self {
            Self::Database(_) | Self::Internal(_) => {
                error!(error = %self, "request failed");
                ErrorResponse {
                    code: self.code(),
                    message: "Internal server error".into(),
                    field: None,
                }
            }
            Self::Validation { field, .. } => ErrorResponse {
                code: self.code(),
                message: self.to_string(),
                field: Some(*field),
            },
            _ => ErrorResponse {
                code: self.code(),
                message: self.to_string(),
                field: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(err: LedgerError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            LedgerError::validation("amount", "must be positive").http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::Unauthenticated("missing token").http_status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LedgerError::Forbidden("not owner").http_status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            LedgerError::NotFound("account").http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LedgerError::InsufficientFunds.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::DuplicateTransaction.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::Internal("boom".into()).http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn validation_body_names_field() {
        let (status, body) = body_json(LedgerError::validation("amount", "must be positive")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["field"], "amount");
        assert_eq!(body["message"], "invalid amount: must be positive");
    }

    #[tokio::test]
    async fn internal_body_hides_detail() {
        let (status, body) =
            body_json(LedgerError::Internal("relation \"payments\" does not exist".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["code"], "INTERNAL_ERROR");
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("field").is_none());
    }

    #[tokio::test]
    async fn duplicate_has_stable_code() {
        let (_, body) = body_json(LedgerError::DuplicateTransaction).await;
        assert_eq!(body["code"], "DUPLICATE_TRANSACTION");
    }
}
