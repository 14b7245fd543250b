use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};
use tracing::{debug, info};

use super::model::{Account, NewPayment, NewUser, Payment, User};
use super::store::{LedgerStore, LedgerTx};
use crate::{error::LedgerError, money};

const UNIQUE_VIOLATION: &str = "23505";
const CHECK_VIOLATION: &str = "23514";
const NUMERIC_OUT_OF_RANGE: &str = "22003";

const USER_COLUMNS: &str =
    "id, email, full_name, password_hash, is_active, is_admin, created_at";
const ACCOUNT_COLUMNS: &str = "id, user_id, balance, created_at";
const PAYMENT_COLUMNS: &str =
    "id, account_id, user_id, amount, recipient_email, transaction_id, status, created_at";

/// Postgres-backed ledger. Owns the connection pool for the process lifetime.
#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("run migrations")?;
        info!("migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
        info!("database pool closed");
    }
}

/// Translates constraint violations into the ledger errors they stand for.
fn map_db_error(e: sqlx::Error) -> LedgerError {
    if let sqlx::Error::Database(db) = &e {
        let code = db.code();
        match (code.as_deref(), db.constraint()) {
            (Some(CHECK_VIOLATION), Some("accounts_balance_non_negative")) => {
                return LedgerError::InsufficientFunds
            }
            (Some(UNIQUE_VIOLATION), Some("payments_transaction_id_key")) => {
                return LedgerError::DuplicateTransaction
            }
            (Some(UNIQUE_VIOLATION), Some("users_email_key")) => return LedgerError::EmailTaken,
            (Some(NUMERIC_OUT_OF_RANGE), _) => return money::balance_overflow(),
            _ => {}
        }
    }
    LedgerError::Database(e)
}

pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn user_by_id(&mut self, id: i64) -> Result<Option<User>, LedgerError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, LedgerError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, LedgerError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(account)
    }

    async fn payment_exists(&mut self, transaction_id: &str) -> Result<bool, LedgerError> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT id FROM payments WHERE transaction_id = $1")
                .bind(transaction_id)
                .fetch_optional(&mut *self.tx)
                .await?;
        Ok(found.is_some())
    }

    async fn adjust_balance(
        &mut self,
        account_id: i64,
        delta: Decimal,
    ) -> Result<Account, LedgerError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "UPDATE accounts SET balance = balance + $2 WHERE id = $1 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(account_id)
        .bind(delta)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_db_error)?
        .ok_or(LedgerError::NotFound("account"))?;
        debug!(account_id, %delta, balance = %account.balance, "balance adjusted");
        Ok(account)
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, LedgerError> {
        let row = sqlx::query_as::<_, Payment>(&format!(
            r#"
            INSERT INTO payments (account_id, user_id, amount, recipient_email, transaction_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(payment.account_id)
        .bind(payment.user_id)
        .bind(payment.amount)
        .bind(&payment.recipient_email)
        .bind(&payment.transaction_id)
        .bind(payment.status)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_db_error)?;
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        self.tx.commit().await.map_err(map_db_error)
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgLedgerTx { tx }))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, LedgerError> {
        let row = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (email, full_name, password_hash, is_admin)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(row)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, LedgerError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn list_users(&self) -> Result<Vec<User>, LedgerError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn create_account(
        &self,
        user_id: i64,
        balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "INSERT INTO accounts (user_id, balance) VALUES ($1, $2) RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(user_id)
        .bind(balance)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;
        Ok(account)
    }

    async fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>, LedgerError> {
        let accounts = sqlx::query_as::<_, Account>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_id = $1 ORDER BY id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(accounts)
    }

    async fn list_payments(&self, user_id: i64) -> Result<Vec<Payment>, LedgerError> {
        let payments = sqlx::query_as::<_, Payment>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payments)
    }
}
