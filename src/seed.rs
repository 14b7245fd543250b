use rust_decimal::Decimal;
use tracing::info;

use crate::{
    auth::password::hash_password,
    config::SeedConfig,
    error::LedgerError,
    ledger::{LedgerStore, NewUser},
};

const ADMIN_OPENING_BALANCE: i64 = 100_000; // cents
const USER_OPENING_BALANCE: i64 = 50_000;

/// Creates the default admin and user unless they already exist.
///
/// Accounts are only opened for identities created by this call, so a
/// restart never hands out a second opening balance.
pub async fn seed_defaults(store: &dyn LedgerStore, seed: &SeedConfig) -> Result<(), LedgerError> {
    ensure_user(
        store,
        &seed.admin_email,
        "Admin User",
        &seed.admin_password,
        true,
        Decimal::new(ADMIN_OPENING_BALANCE, 2),
    )
    .await?;
    ensure_user(
        store,
        &seed.user_email,
        "Test User",
        &seed.user_password,
        false,
        Decimal::new(USER_OPENING_BALANCE, 2),
    )
    .await
}

async fn ensure_user(
    store: &dyn LedgerStore,
    email: &str,
    full_name: &str,
    password: &str,
    is_admin: bool,
    opening_balance: Decimal,
) -> Result<(), LedgerError> {
    let email = email.trim().to_lowercase();
    if store.find_user_by_email(&email).await?.is_some() {
        return Ok(());
    }

    let user = store
        .create_user(NewUser {
            email,
            full_name: full_name.into(),
            password_hash: hash_password(password)?,
            is_admin,
        })
        .await?;
    let account = store.create_account(user.id, opening_balance).await?;

    info!(
        user_id = user.id,
        account_id = account.id,
        is_admin,
        "default user seeded"
    );
    Ok(())
}
