//! Issuer business logic

use std::sync::Arc;

use chrono::Utc;
use rand::Rng;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use tap_iso8583::approval;

use crate::models::{
    self, Account, AuthorizationRequest, AuthorizationResponse, Card, CardRequest, CreateAccount,
    Transaction, TransactionStatus,
};
use crate::personalizer::{PersonalizerClient, PersonalizerError};
use crate::repository::{Repository, RepositoryError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    #[error(transparent)]
    Repository(RepositoryError),

    #[error("personalizing card: {0}")]
    Personalizer(#[from] PersonalizerError),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => ServiceError::NotFound,
            other => ServiceError::Repository(other),
        }
    }
}

pub struct Service {
    pub(crate) repo: Arc<Repository>,
    personalizer: Option<PersonalizerClient>,
}

impl Service {
    pub fn new(repo: Arc<Repository>, personalizer: Option<PersonalizerClient>) -> Self {
        Self { repo, personalizer }
    }

    pub fn create_account(&self, create: CreateAccount) -> Account {
        let account = Account {
            id: Uuid::new_v4().to_string(),
            owner_name: create.owner_name,
            available_balance: create.balance,
            hold_balance: 0,
            currency: create.currency,
        };

        self.repo.create_account(account.clone());
        info!(account = %account.id, "account created");
        account
    }

    pub fn get_account(&self, account_id: &str) -> Result<Account, ServiceError> {
        Ok(self.repo.get_account(account_id)?)
    }

    pub fn list_accounts(&self) -> Vec<Account> {
        self.repo.list_accounts()
    }

    /// Issue a card for an account; with `flash` set the physical card is
    /// personalized through the personalizer service first
    pub async fn issue_card(
        &self,
        account_id: &str,
        request: CardRequest,
        flash: bool,
    ) -> Result<Card, ServiceError> {
        let account = self.repo.get_account(account_id)?;

        let card = Card {
            id: Uuid::new_v4().to_string(),
            account_id: account.id.clone(),
            card_holder_name: account.owner_name.clone(),
            number: models::generate_card_number("7"),
            expiration_date: request.expiry_date.clone(),
            card_verification_value: request.card_verification_value.clone(),
        };

        if flash {
            let personalizer = self
                .personalizer
                .as_ref()
                .ok_or_else(|| PersonalizerError::NotConfigured)?;

            personalizer
                .personalize(
                    &account.owner_name,
                    &card.number,
                    &request.expiry_date,
                    &request.pin,
                )
                .await?;
        }

        self.repo.create_card(card.clone());
        info!(card = %card.id, account = %account.id, "card issued");
        Ok(card)
    }

    pub fn list_transactions(&self, account_id: &str) -> Result<Vec<Transaction>, ServiceError> {
        // listing an unknown account is a 404, not an empty list
        self.repo.get_account(account_id)?;
        Ok(self.repo.list_transactions(account_id))
    }

    /// Decide an authorization request
    ///
    /// Declines are structured responses, not errors: an unknown card
    /// yields approval 14 and a failed hold yields approval 51.
    pub fn authorize(
        &self,
        request: AuthorizationRequest,
    ) -> Result<AuthorizationResponse, ServiceError> {
        info!(
            amount = request.amount,
            currency = %request.currency,
            merchant = %request.merchant.name,
            pan = %request.card.number,
            "authorizing request"
        );

        let card = match self.repo.find_card_by_pan(&request.card.number) {
            Ok(card) => card,
            Err(RepositoryError::NotFound) => {
                warn!(pan = %request.card.number, "card not found");
                return Ok(AuthorizationResponse {
                    approval_code: approval::INVALID_CARD.to_string(),
                    authorization_code: String::new(),
                });
            }
            Err(other) => return Err(other.into()),
        };

        let account = self.repo.get_account(&card.account_id)?;

        let transaction = Transaction {
            id: Uuid::new_v4().to_string(),
            account_id: account.id.clone(),
            card_id: card.id.clone(),
            amount: request.amount,
            currency: request.currency.clone(),
            merchant: request.merchant.clone(),
            status: TransactionStatus::Pending,
            approval_code: String::new(),
            authorization_code: String::new(),
            created_at: Utc::now(),
        };
        let transaction_id = transaction.id.clone();
        self.repo.create_transaction(transaction);

        match self.repo.hold_funds(&account.id, request.amount) {
            Ok(()) => {}
            Err(RepositoryError::InsufficientFunds) => {
                info!(account = %account.id, amount = request.amount, "insufficient funds");
                return Ok(AuthorizationResponse {
                    approval_code: approval::INSUFFICIENT_FUNDS.to_string(),
                    authorization_code: String::new(),
                });
            }
            Err(other) => return Err(other.into()),
        }

        let authorization_code = generate_authorization_code();
        self.repo
            .mark_authorized(&transaction_id, approval::APPROVED, &authorization_code)?;

        info!(
            account = %account.id,
            authorization_code = %authorization_code,
            "authorization approved"
        );

        Ok(AuthorizationResponse {
            approval_code: approval::APPROVED.to_string(),
            authorization_code,
        })
    }
}

/// 6 uniformly random decimal digits
fn generate_authorization_code() -> String {
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CardDetails, Merchant};

    fn service_with_account(balance: i64) -> (Service, String, String) {
        let repo = Arc::new(Repository::new());
        let service = Service::new(repo, None);

        let account = service.create_account(CreateAccount {
            owner_name: "Ada Lovelace".to_string(),
            balance,
            currency: "USD".to_string(),
        });

        let card = Card {
            id: "c1".to_string(),
            account_id: account.id.clone(),
            card_holder_name: account.owner_name.clone(),
            number: "7000000000000001".to_string(),
            expiration_date: "0927".to_string(),
            card_verification_value: "123".to_string(),
        };
        service.repo.create_card(card);

        (service, account.id, "7000000000000001".to_string())
    }

    fn request(pan: &str, amount: i64) -> AuthorizationRequest {
        AuthorizationRequest {
            amount,
            currency: "USD".to_string(),
            card: CardDetails {
                number: pan.to_string(),
                ..CardDetails::default()
            },
            merchant: Merchant {
                name: "Coffee Stand".to_string(),
                ..Merchant::default()
            },
        }
    }

    #[test]
    fn test_approved_hold_updates_balances() {
        let (service, account_id, pan) = service_with_account(1000);

        let response = service.authorize(request(&pan, 600)).unwrap();
        assert_eq!(response.approval_code, "00");
        assert_eq!(response.authorization_code.len(), 6);
        assert!(response
            .authorization_code
            .bytes()
            .all(|b| b.is_ascii_digit()));

        let account = service.get_account(&account_id).unwrap();
        assert_eq!(account.available_balance, 400);
        assert_eq!(account.hold_balance, 600);

        let transactions = service.list_transactions(&account_id).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].status, TransactionStatus::Authorized);
        assert_eq!(transactions[0].approval_code, "00");
    }

    #[test]
    fn test_second_hold_declines_without_touching_balances() {
        let (service, account_id, pan) = service_with_account(1000);

        service.authorize(request(&pan, 600)).unwrap();
        let declined = service.authorize(request(&pan, 500)).unwrap();

        assert_eq!(declined.approval_code, "51");
        assert!(declined.authorization_code.is_empty());

        let account = service.get_account(&account_id).unwrap();
        assert_eq!(account.available_balance, 400);
        assert_eq!(account.hold_balance, 600);
    }

    #[test]
    fn test_unknown_card_is_invalid_card() {
        let (service, _, _) = service_with_account(1000);

        let response = service.authorize(request("9999999999999999", 100)).unwrap();
        assert_eq!(response.approval_code, "14");
    }

    #[test]
    fn test_authorization_codes_are_six_digits() {
        for _ in 0..20 {
            let code = generate_authorization_code();
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }
}
