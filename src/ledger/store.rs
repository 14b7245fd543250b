use async_trait::async_trait;
use rust_decimal::Decimal;

use super::model::{Account, NewPayment, NewUser, Payment, User};
use crate::error::LedgerError;

/// One all-or-nothing unit of work against the ledger.
///
/// Dropping a unit without calling [`LedgerTx::commit`] discards every write
/// made through it.
#[async_trait]
pub trait LedgerTx: Send {
    async fn user_by_id(&mut self, id: i64) -> Result<Option<User>, LedgerError>;

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, LedgerError>;

    /// Loads an account and holds it exclusively until the unit ends.
    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, LedgerError>;

    async fn payment_exists(&mut self, transaction_id: &str) -> Result<bool, LedgerError>;

    /// Adds `delta` (negative for a debit) to the balance. The store itself
    /// refuses a negative result with [`LedgerError::InsufficientFunds`].
    async fn adjust_balance(
        &mut self,
        account_id: i64,
        delta: Decimal,
    ) -> Result<Account, LedgerError>;

    /// The store itself refuses a repeated transaction identifier with
    /// [`LedgerError::DuplicateTransaction`].
    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, LedgerError>;

    async fn commit(self: Box<Self>) -> Result<(), LedgerError>;
}

/// Durable home of users, accounts and payments.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError>;

    /// Fails with [`LedgerError::EmailTaken`] when the email is in use.
    async fn create_user(&self, user: NewUser) -> Result<User, LedgerError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, LedgerError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError>;

    async fn list_users(&self) -> Result<Vec<User>, LedgerError>;

    async fn create_account(&self, user_id: i64, balance: Decimal)
        -> Result<Account, LedgerError>;

    async fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>, LedgerError>;

    /// Payments where `user_id` is the acting user.
    async fn list_payments(&self, user_id: i64) -> Result<Vec<Payment>, LedgerError>;
}
