use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::model::{Account, NewPayment, NewUser, Payment, User};
use super::store::{LedgerStore, LedgerTx};
use crate::{error::LedgerError, money};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<i64, User>,
    accounts: BTreeMap<i64, Account>,
    payments: BTreeMap<i64, Payment>,
    next_user_id: i64,
    next_account_id: i64,
    next_payment_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }

    fn insert_user(&mut self, user: NewUser) -> Result<User, LedgerError> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(LedgerError::EmailTaken);
        }
        let id = Self::next_id(&mut self.next_user_id);
        let row = User {
            id,
            email: user.email,
            full_name: user.full_name,
            password_hash: user.password_hash,
            is_active: true,
            is_admin: user.is_admin,
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.insert(id, row.clone());
        Ok(row)
    }

    fn user_by_email(&self, email: &str) -> Option<User> {
        self.users.values().find(|u| u.email == email).cloned()
    }
}

/// In-process ledger with the same guarantees as the Postgres store.
///
/// A unit of work holds the single writer lock for its whole lifetime and
/// mutates a staged copy of the tables, which replaces the live tables only
/// on commit.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a user inactive; there is no HTTP surface for this.
    #[cfg(test)]
    pub async fn deactivate_user(&self, id: i64) -> Result<(), LedgerError> {
        let mut tables = self.tables.lock().await;
        let user = tables.users.get_mut(&id).ok_or(LedgerError::NotFound("user"))?;
        user.is_active = false;
        Ok(())
    }

    #[cfg(test)]
    pub async fn payment_count(&self) -> usize {
        self.tables.lock().await.payments.len()
    }
}

pub struct MemoryLedgerTx {
    live: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl LedgerTx for MemoryLedgerTx {
    async fn user_by_id(&mut self, id: i64) -> Result<Option<User>, LedgerError> {
        Ok(self.staged.users.get(&id).cloned())
    }

    async fn user_by_email(&mut self, email: &str) -> Result<Option<User>, LedgerError> {
        Ok(self.staged.user_by_email(email))
    }

    async fn lock_account(&mut self, id: i64) -> Result<Option<Account>, LedgerError> {
        Ok(self.staged.accounts.get(&id).cloned())
    }

    async fn payment_exists(&mut self, transaction_id: &str) -> Result<bool, LedgerError> {
        Ok(self
            .staged
            .payments
            .values()
            .any(|p| p.transaction_id.as_deref() == Some(transaction_id)))
    }

    async fn adjust_balance(
        &mut self,
        account_id: i64,
        delta: Decimal,
    ) -> Result<Account, LedgerError> {
        let account = self
            .staged
            .accounts
            .get_mut(&account_id)
            .ok_or(LedgerError::NotFound("account"))?;
        let balance = account.balance + delta;
        if balance < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds);
        }
        if !money::fits_column(balance) {
            return Err(money::balance_overflow());
        }
        account.balance = balance;
        Ok(account.clone())
    }

    async fn insert_payment(&mut self, payment: NewPayment) -> Result<Payment, LedgerError> {
        if self.payment_exists(&payment.transaction_id).await? {
            return Err(LedgerError::DuplicateTransaction);
        }
        let id = Tables::next_id(&mut self.staged.next_payment_id);
        let row = Payment {
            id,
            account_id: payment.account_id,
            user_id: payment.user_id,
            amount: payment.amount,
            recipient_email: payment.recipient_email,
            transaction_id: Some(payment.transaction_id),
            status: payment.status,
            created_at: OffsetDateTime::now_utc(),
        };
        self.staged.payments.insert(id, row.clone());
        Ok(row)
    }

    async fn commit(self: Box<Self>) -> Result<(), LedgerError> {
        let MemoryLedgerTx { mut live, staged } = *self;
        *live = staged;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        let live = self.tables.clone().lock_owned().await;
        let staged = live.clone();
        Ok(Box::new(MemoryLedgerTx { live, staged }))
    }

    async fn create_user(&self, user: NewUser) -> Result<User, LedgerError> {
        self.tables.lock().await.insert_user(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, LedgerError> {
        Ok(self.tables.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, LedgerError> {
        Ok(self.tables.lock().await.user_by_email(email))
    }

    async fn list_users(&self) -> Result<Vec<User>, LedgerError> {
        Ok(self.tables.lock().await.users.values().cloned().collect())
    }

    async fn create_account(
        &self,
        user_id: i64,
        balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let mut tables = self.tables.lock().await;
        if !tables.users.contains_key(&user_id) {
            return Err(LedgerError::NotFound("user"));
        }
        if balance < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds);
        }
        let id = Tables::next_id(&mut tables.next_account_id);
        let account = Account {
            id,
            user_id,
            balance,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.accounts.insert(id, account.clone());
        Ok(account)
    }

    async fn list_accounts(&self, user_id: i64) -> Result<Vec<Account>, LedgerError> {
        Ok(self
            .tables
            .lock()
            .await
            .accounts
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn list_payments(&self, user_id: i64) -> Result<Vec<Payment>, LedgerError> {
        Ok(self
            .tables
            .lock()
            .await
            .payments
            .values()
            .rev()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }
}
