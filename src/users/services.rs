use lazy_static::lazy_static;
use regex::Regex;
use tracing::info;

use super::dto::CreateUserRequest;
use crate::{
    auth::password::hash_password,
    error::LedgerError,
    ledger::{LedgerStore, NewUser, User},
};

const MIN_PASSWORD_LEN: usize = 6;
const MAX_FULL_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 120;

/// Trims and lower-cases an email, rejecting anything that is not address-shaped.
pub fn validate_email(field: &'static str, raw: &str) -> Result<String, LedgerError> {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    let email = raw.trim().to_lowercase();
    if email.len() > MAX_EMAIL_LEN || !EMAIL_RE.is_match(&email) {
        return Err(LedgerError::validation(field, "Invalid email"));
    }
    Ok(email)
}

/// Creates an active user; `is_admin` is only ever set by seeding.
pub async fn create_user(
    store: &dyn LedgerStore,
    req: CreateUserRequest,
    is_admin: bool,
) -> Result<User, LedgerError> {
    let email = validate_email("email", &req.email)?;

    let full_name = req.full_name.trim();
    let name_len = full_name.chars().count();
    if name_len == 0 || name_len > MAX_FULL_NAME_LEN {
        return Err(LedgerError::validation(
            "full_name",
            format!("must be 1 to {MAX_FULL_NAME_LEN} characters"),
        ));
    }

    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(LedgerError::validation(
            "password",
            format!("must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(LedgerError::EmailTaken);
    }

    let user = store
        .create_user(NewUser {
            email,
            full_name: full_name.to_string(),
            password_hash: hash_password(&req.password)?,
            is_admin,
        })
        .await?;

    info!(user_id = user.id, is_admin, "user created");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::MemoryLedger;

    fn req(email: &str, name: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.into(),
            full_name: name.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            validate_email("email", "  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
    }

    #[test]
    fn bad_emails_rejected() {
        for raw in ["", "no-at-sign", "a@b", "two@@example.com", "sp ace@example.com"] {
            assert!(validate_email("email", raw).is_err(), "{raw} accepted");
        }
    }

    #[tokio::test]
    async fn creates_active_non_admin_user() {
        let store = MemoryLedger::new();
        let user = create_user(&store, req("New@Example.com", "New User", "secret1"), false)
            .await
            .unwrap();
        assert_eq!(user.email, "new@example.com");
        assert!(user.is_active);
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "secret1");
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let store = MemoryLedger::new();
        create_user(&store, req("dup@example.com", "A", "secret1"), false)
            .await
            .unwrap();
        let err = create_user(&store, req("DUP@example.com", "B", "secret2"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::EmailTaken));
    }

    #[tokio::test]
    async fn field_rules() {
        let store = MemoryLedger::new();
        let err = create_user(&store, req("a@example.com", "", "secret1"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { field: "full_name", .. }));

        let err = create_user(&store, req("a@example.com", "A", "short"), false)
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation { field: "password", .. }));
    }
}
