//! In-memory stores for accounts, cards and transactions
//!
//! The repository owns the lock; the data types stay pure. Readers get
//! copies, so nothing outside this module can observe a half-applied
//! mutation. Balance holds run under the write lock, which serializes them
//! per account (and, conservatively, across accounts).

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::models::{Account, Card, Transaction, TransactionStatus};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,

    #[error("insufficient funds")]
    InsufficientFunds,
}

#[derive(Default)]
struct Stores {
    accounts: HashMap<String, Account>,
    cards: HashMap<String, Card>,
    transactions: Vec<Transaction>,
}

#[derive(Default)]
pub struct Repository {
    inner: RwLock<Stores>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_account(&self, account: Account) {
        self.inner.write().accounts.insert(account.id.clone(), account);
    }

    pub fn get_account(&self, account_id: &str) -> Result<Account, RepositoryError> {
        self.inner
            .read()
            .accounts
            .get(account_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    /// Copy-on-read listing; order is unspecified
    pub fn list_accounts(&self) -> Vec<Account> {
        self.inner.read().accounts.values().cloned().collect()
    }

    /// Move `amount` from available to hold, serialized under the write lock
    pub fn hold_funds(&self, account_id: &str, amount: i64) -> Result<(), RepositoryError> {
        let mut stores = self.inner.write();
        let account = stores
            .accounts
            .get_mut(account_id)
            .ok_or(RepositoryError::NotFound)?;

        if account.available_balance < amount {
            return Err(RepositoryError::InsufficientFunds);
        }

        account.available_balance -= amount;
        account.hold_balance += amount;
        Ok(())
    }

    pub fn create_card(&self, card: Card) {
        self.inner.write().cards.insert(card.id.clone(), card);
    }

    pub fn find_card_by_pan(&self, pan: &str) -> Result<Card, RepositoryError> {
        self.inner
            .read()
            .cards
            .values()
            .find(|card| card.number == pan)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    pub fn create_transaction(&self, transaction: Transaction) {
        self.inner.write().transactions.push(transaction);
    }

    /// Flip a pending transaction to Authorized with its codes
    pub fn mark_authorized(
        &self,
        transaction_id: &str,
        approval_code: &str,
        authorization_code: &str,
    ) -> Result<(), RepositoryError> {
        let mut stores = self.inner.write();
        let transaction = stores
            .transactions
            .iter_mut()
            .find(|t| t.id == transaction_id)
            .ok_or(RepositoryError::NotFound)?;

        transaction.status = TransactionStatus::Authorized;
        transaction.approval_code = approval_code.to_string();
        transaction.authorization_code = authorization_code.to_string();
        Ok(())
    }

    /// Copy-on-read transaction listing for one account, oldest first
    pub fn list_transactions(&self, account_id: &str) -> Vec<Transaction> {
        self.inner
            .read()
            .transactions
            .iter()
            .filter(|t| t.account_id == account_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str, balance: i64) -> Account {
        Account {
            id: id.to_string(),
            owner_name: "Tester".to_string(),
            available_balance: balance,
            hold_balance: 0,
            currency: "USD".to_string(),
        }
    }

    #[test]
    fn test_hold_moves_funds_and_conserves_total() {
        let repo = Repository::new();
        repo.create_account(account("a1", 1000));

        repo.hold_funds("a1", 600).unwrap();

        let after = repo.get_account("a1").unwrap();
        assert_eq!(after.available_balance, 400);
        assert_eq!(after.hold_balance, 600);
        assert_eq!(after.available_balance + after.hold_balance, 1000);
    }

    #[test]
    fn test_insufficient_hold_leaves_balances_untouched() {
        let repo = Repository::new();
        repo.create_account(account("a1", 1000));
        repo.hold_funds("a1", 600).unwrap();

        let err = repo.hold_funds("a1", 500).unwrap_err();
        assert_eq!(err, RepositoryError::InsufficientFunds);

        let after = repo.get_account("a1").unwrap();
        assert_eq!(after.available_balance, 400);
        assert_eq!(after.hold_balance, 600);
    }

    #[test]
    fn test_hold_on_unknown_account() {
        let repo = Repository::new();
        assert_eq!(
            repo.hold_funds("nope", 1).unwrap_err(),
            RepositoryError::NotFound
        );
    }

    #[test]
    fn test_concurrent_holds_never_overdraw() {
        use std::sync::Arc;

        let repo = Arc::new(Repository::new());
        repo.create_account(account("a1", 100));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let repo = repo.clone();
                std::thread::spawn(move || {
                    let mut granted = 0;
                    for _ in 0..10 {
                        if repo.hold_funds("a1", 10).is_ok() {
                            granted += 1;
                        }
                    }
                    granted
                })
            })
            .collect();

        let granted: i64 = handles.into_iter().map(|h| h.join().unwrap()).sum();

        let after = repo.get_account("a1").unwrap();
        assert_eq!(granted, 10);
        assert_eq!(after.available_balance, 0);
        assert_eq!(after.hold_balance, 100);
    }

    #[test]
    fn test_find_card_by_pan() {
        let repo = Repository::new();
        repo.create_card(Card {
            id: "c1".to_string(),
            account_id: "a1".to_string(),
            card_holder_name: "Tester".to_string(),
            number: "7000000000000001".to_string(),
            expiration_date: "0927".to_string(),
            card_verification_value: "123".to_string(),
        });

        assert!(repo.find_card_by_pan("7000000000000001").is_ok());
        assert_eq!(
            repo.find_card_by_pan("7000000000000002").unwrap_err(),
            RepositoryError::NotFound
        );
    }
}
