//! In-memory merchant and payment stores
//!
//! Same locking discipline as the issuer repository: the container owns a
//! RwLock, readers get copies.

use std::collections::HashMap;

use parking_lot::RwLock;
use thiserror::Error;

use crate::models::{Merchant, Payment};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,
}

#[derive(Default)]
struct Stores {
    merchants: HashMap<String, Merchant>,
    payments: HashMap<String, Payment>,
}

#[derive(Default)]
pub struct Repository {
    inner: RwLock<Stores>,
}

impl Repository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_merchant(&self, merchant: Merchant) {
        self.inner
            .write()
            .merchants
            .insert(merchant.id.clone(), merchant);
    }

    pub fn get_merchant(&self, merchant_id: &str) -> Result<Merchant, RepositoryError> {
        self.inner
            .read()
            .merchants
            .get(merchant_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    pub fn create_payment(&self, payment: Payment) {
        self.inner
            .write()
            .payments
            .insert(payment.id.clone(), payment);
    }

    /// Replace a payment record after its status changed
    pub fn update_payment(&self, payment: Payment) {
        self.create_payment(payment);
    }

    #[cfg(test)]
    pub(crate) fn payments_snapshot(&self) -> Vec<Payment> {
        self.inner.read().payments.values().cloned().collect()
    }

    pub fn get_payment(
        &self,
        merchant_id: &str,
        payment_id: &str,
    ) -> Result<Payment, RepositoryError> {
        self.inner
            .read()
            .payments
            .get(payment_id)
            .filter(|payment| payment.merchant_id == merchant_id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PaymentStatus, SafeCard};
    use chrono::Utc;

    #[test]
    fn test_payment_is_scoped_to_its_merchant() {
        let repo = Repository::new();
        repo.create_payment(Payment {
            id: "p1".to_string(),
            merchant_id: "m1".to_string(),
            amount: 100,
            currency: "USD".to_string(),
            card: SafeCard::default(),
            status: PaymentStatus::Pending,
            authorization_code: String::new(),
            response_code: String::new(),
            created_at: Utc::now(),
        });

        assert!(repo.get_payment("m1", "p1").is_ok());
        assert_eq!(
            repo.get_payment("m2", "p1").unwrap_err(),
            RepositoryError::NotFound
        );
    }
}
