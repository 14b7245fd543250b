use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::LedgerError,
    ledger::{LedgerStore, NewPayment, Payment, PaymentStatus},
};

/// A user-initiated debit of one of the caller's own accounts.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub acting_user_id: i64,
    pub source_account_id: i64,
    pub amount: Decimal,
    pub recipient_email: String,
}

/// Debits the source account and journals a completed payment as one unit.
///
/// Checks run in order and the first failure wins: the account exists, the
/// caller owns it, the amount is positive and covered by the balance, and the
/// recipient is a known user. The recipient's own accounts are not credited.
pub async fn transfer(
    store: &dyn LedgerStore,
    req: TransferRequest,
) -> Result<Payment, LedgerError> {
    let mut tx = store.begin().await?;

    let account = tx
        .lock_account(req.source_account_id)
        .await?
        .ok_or(LedgerError::NotFound("account"))?;

    if account.user_id != req.acting_user_id {
        warn!(
            account_id = account.id,
            user_id = req.acting_user_id,
            "transfer from foreign account"
        );
        return Err(LedgerError::Forbidden("Account belongs to another user"));
    }

    if req.amount <= Decimal::ZERO || account.balance < req.amount {
        warn!(
            account_id = account.id,
            balance = %account.balance,
            amount = %req.amount,
            "insufficient funds"
        );
        return Err(LedgerError::InsufficientFunds);
    }

    let recipient = tx
        .user_by_email(&req.recipient_email)
        .await?
        .ok_or(LedgerError::NotFound("recipient"))?;

    let account = tx.adjust_balance(account.id, -req.amount).await?;
    let payment = tx
        .insert_payment(NewPayment {
            account_id: account.id,
            user_id: req.acting_user_id,
            amount: req.amount,
            recipient_email: recipient.email,
            transaction_id: Uuid::new_v4().to_string(),
            status: PaymentStatus::Completed,
        })
        .await?;
    tx.commit().await?;

    info!(
        payment_id = payment.id,
        account_id = account.id,
        amount = %payment.amount,
        balance = %account.balance,
        "transfer completed"
    );
    Ok(payment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{Account, MemoryLedger, NewUser, User};
    use std::str::FromStr;
    use std::sync::Arc;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    async fn user(store: &MemoryLedger, email: &str) -> User {
        store
            .create_user(NewUser {
                email: email.into(),
                full_name: "Test".into(),
                password_hash: "hash".into(),
                is_admin: false,
            })
            .await
            .unwrap()
    }

    async fn balance_of(store: &MemoryLedger, account: &Account) -> Decimal {
        store
            .list_accounts(account.user_id)
            .await
            .unwrap()
            .into_iter()
            .find(|a| a.id == account.id)
            .unwrap()
            .balance
    }

    fn request(owner: &User, account: &Account, amount: &str, to: &str) -> TransferRequest {
        TransferRequest {
            acting_user_id: owner.id,
            source_account_id: account.id,
            amount: dec(amount),
            recipient_email: to.into(),
        }
    }

    struct Fixture {
        store: MemoryLedger,
        sender: User,
        account: Account,
    }

    async fn fixture(balance: &str) -> Fixture {
        let store = MemoryLedger::new();
        let sender = user(&store, "user@example.com").await;
        user(&store, "admin@example.com").await;
        let account = store.create_account(sender.id, dec(balance)).await.unwrap();
        Fixture {
            store,
            sender,
            account,
        }
    }

    #[tokio::test]
    async fn transfer_debits_and_records_payment() {
        let f = fixture("500.00").await;

        let payment = transfer(
            &f.store,
            request(&f.sender, &f.account, "100.00", "admin@example.com"),
        )
        .await
        .unwrap();

        assert_eq!(balance_of(&f.store, &f.account).await, dec("400.00"));
        assert_eq!(payment.amount, dec("100.00"));
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.user_id, f.sender.id);
        assert_eq!(payment.account_id, f.account.id);
        assert_eq!(payment.recipient_email, "admin@example.com");
        let tx_id = payment.transaction_id.expect("generated transaction id");
        assert!(Uuid::parse_str(&tx_id).is_ok());

        let listed = f.store.list_payments(f.sender.id).await.unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn overdraft_rejected_balance_unchanged() {
        let f = fixture("500.00").await;
        let err = transfer(
            &f.store,
            request(&f.sender, &f.account, "1000.00", "admin@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds));
        assert_eq!(balance_of(&f.store, &f.account).await, dec("500.00"));
        assert_eq!(f.store.payment_count().await, 0);
    }

    #[tokio::test]
    async fn exact_balance_drains_to_zero() {
        let f = fixture("500.00").await;
        transfer(
            &f.store,
            request(&f.sender, &f.account, "500.00", "admin@example.com"),
        )
        .await
        .unwrap();
        assert_eq!(balance_of(&f.store, &f.account).await, Decimal::ZERO);
    }

    #[tokio::test]
    async fn foreign_account_is_forbidden() {
        let f = fixture("500.00").await;
        let intruder = user(&f.store, "mallory@example.com").await;
        let err = transfer(
            &f.store,
            request(&intruder, &f.account, "1.00", "admin@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));
        assert_eq!(balance_of(&f.store, &f.account).await, dec("500.00"));
    }

    #[tokio::test]
    async fn missing_account_is_not_found() {
        let f = fixture("500.00").await;
        let mut req = request(&f.sender, &f.account, "1.00", "admin@example.com");
        req.source_account_id = 9_999;
        let err = transfer(&f.store, req).await.unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("account")));
    }

    #[tokio::test]
    async fn unknown_recipient_is_not_found_and_rolls_back() {
        let f = fixture("500.00").await;
        let err = transfer(
            &f.store,
            request(&f.sender, &f.account, "1.00", "ghost@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound("recipient")));
        assert_eq!(balance_of(&f.store, &f.account).await, dec("500.00"));
    }

    #[tokio::test]
    async fn ownership_checked_before_funds() {
        let f = fixture("1.00").await;
        let intruder = user(&f.store, "mallory@example.com").await;
        let err = transfer(
            &f.store,
            request(&intruder, &f.account, "1000.00", "nobody@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::Forbidden(_)));
    }

    #[tokio::test]
    async fn funds_checked_before_recipient() {
        let f = fixture("1.00").await;
        let err = transfer(
            &f.store,
            request(&f.sender, &f.account, "2.00", "nobody@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds));
    }

    #[tokio::test]
    async fn non_positive_amount_rejected() {
        let f = fixture("5.00").await;
        let err = transfer(
            &f.store,
            request(&f.sender, &f.account, "0", "admin@example.com"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds));
    }

    #[tokio::test]
    async fn recipient_account_is_not_credited() {
        let f = fixture("50.00").await;
        let admin = f
            .store
            .find_user_by_email("admin@example.com")
            .await
            .unwrap()
            .unwrap();
        let admin_account = f.store.create_account(admin.id, dec("10.00")).await.unwrap();

        transfer(
            &f.store,
            request(&f.sender, &f.account, "20.00", "admin@example.com"),
        )
        .await
        .unwrap();
        assert_eq!(balance_of(&f.store, &admin_account).await, dec("10.00"));
    }

    #[tokio::test]
    async fn concurrent_drains_never_go_negative() {
        let f = fixture("100.00").await;
        let store = Arc::new(f.store);

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                let req = request(&f.sender, &f.account, "15.00", "admin@example.com");
                tokio::spawn(async move { transfer(store.as_ref(), req).await })
            })
            .collect();

        let mut ok = 0;
        for h in handles {
            match h.await.unwrap() {
                Ok(_) => ok += 1,
                Err(e) => assert!(matches!(e, LedgerError::InsufficientFunds)),
            }
        }
        assert_eq!(ok, 6);
        assert_eq!(balance_of(&store, &f.account).await, dec("10.00"));
        assert_eq!(store.payment_count().await, 6);
    }
}
