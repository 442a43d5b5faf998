//! Acquirer business logic
//!
//! Payment creation extracts card identity (from an EMV payload or raw
//! card details), persists the record, then runs the authorization through
//! the gateway. A decline is a normal outcome; only transport and codec
//! failures turn the payment into an Error.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use tap_emv::{decode, find_first, tags};
use tap_iso8583::approval;

use crate::gateway::{AuthorizationData, AuthorizationGateway, GatewayError};
use crate::models::{
    CreateMerchant, CreatePayment, Merchant, Payment, PaymentStatus, SafeCard,
};
use crate::repository::{Repository, RepositoryError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("not found")]
    NotFound,

    /// Malformed request from the boundary; carries a human message
    #[error("{0}")]
    Validation(String),

    #[error("authorizing payment: {0}")]
    Gateway(#[from] GatewayError),
}

impl From<RepositoryError> for ServiceError {
    fn from(_: RepositoryError) -> Self {
        ServiceError::NotFound
    }
}

/// Card identity pulled out of a payment intent
struct ExtractedCard {
    pan: String,
    /// MMYY
    expiry: String,
    cvv: String,
    cardholder: String,
}

pub struct Service {
    pub(crate) repo: Arc<Repository>,
    gateway: Arc<dyn AuthorizationGateway>,
}

impl Service {
    pub fn new(repo: Arc<Repository>, gateway: Arc<dyn AuthorizationGateway>) -> Self {
        Self { repo, gateway }
    }

    pub fn create_merchant(&self, create: CreateMerchant) -> Merchant {
        let merchant = Merchant {
            id: Uuid::new_v4().to_string(),
            name: create.name,
            mcc: create.mcc,
            postal_code: create.postal_code,
            web_site: create.web_site,
        };

        self.repo.create_merchant(merchant.clone());
        info!(merchant = %merchant.id, name = %merchant.name, "merchant created");
        merchant
    }

    pub fn get_merchant(&self, merchant_id: &str) -> Result<Merchant, ServiceError> {
        Ok(self.repo.get_merchant(merchant_id)?)
    }

    pub async fn create_payment(
        &self,
        merchant_id: &str,
        create: CreatePayment,
    ) -> Result<Payment, ServiceError> {
        let merchant = self.repo.get_merchant(merchant_id)?;

        if create.amount <= 0 {
            return Err(ServiceError::Validation(
                "amount must be greater than 0".to_string(),
            ));
        }

        let card = extract_card(&create)?;

        let mut payment = Payment {
            id: Uuid::new_v4().to_string(),
            merchant_id: merchant.id.clone(),
            amount: create.amount,
            currency: create.currency.clone(),
            card: SafeCard {
                first6: card.pan.chars().take(6).collect(),
                last4: card.pan.chars().skip(card.pan.len().saturating_sub(4)).collect(),
                expiration_date: card.expiry.clone(),
            },
            status: PaymentStatus::Pending,
            authorization_code: String::new(),
            response_code: String::new(),
            created_at: Utc::now(),
        };

        info!(
            payment = %payment.id,
            cardholder = %card.cardholder,
            first6 = %payment.card.first6,
            last4 = %payment.card.last4,
            "creating payment"
        );

        self.repo.create_payment(payment.clone());

        let data = AuthorizationData {
            pan: card.pan,
            expiry: card.expiry,
            cvv: card.cvv,
            amount: create.amount,
            currency: create.currency,
        };

        match self.gateway.authorize(&data, &merchant).await {
            Ok(response) => {
                payment.authorization_code = response.authorization_code;
                payment.response_code = response.approval_code.clone();
                payment.status = if response.approval_code == approval::APPROVED {
                    PaymentStatus::Authorized
                } else {
                    PaymentStatus::Declined
                };
            }
            Err(err) => {
                warn!(payment = %payment.id, error = %err, "authorization transport failed");
                payment.status = PaymentStatus::Error;
                self.repo.update_payment(payment);
                return Err(err.into());
            }
        }

        self.repo.update_payment(payment.clone());
        info!(payment = %payment.id, status = ?payment.status, "payment decided");
        Ok(payment)
    }

    pub fn get_payment(
        &self,
        merchant_id: &str,
        payment_id: &str,
    ) -> Result<Payment, ServiceError> {
        Ok(self.repo.get_payment(merchant_id, payment_id)?)
    }
}

/// Pull PAN, expiry, CVV and cardholder out of a payment intent
fn extract_card(create: &CreatePayment) -> Result<ExtractedCard, ServiceError> {
    if let Some(payload_hex) = &create.emv_payload {
        let payload = hex::decode(payload_hex)
            .map_err(|_| ServiceError::Validation("emv_payload is not hex".to_string()))?;
        return extract_from_emv(&payload);
    }

    if let Some(card) = &create.card {
        if card.number.len() < 10 {
            return Err(ServiceError::Validation("card number too short".to_string()));
        }
        return Ok(ExtractedCard {
            pan: card.number.clone(),
            expiry: card.expiration_date.clone(),
            cvv: default_cvv(&card.card_verification_value),
            cardholder: String::new(),
        });
    }

    Err(ServiceError::Validation(
        "either card or emv_payload is required".to_string(),
    ))
}

fn extract_from_emv(payload: &[u8]) -> Result<ExtractedCard, ServiceError> {
    let tlvs = decode(payload)
        .map_err(|err| ServiceError::Validation(format!("decoding EMV payload: {err}")))?;

    let pan = find_first(&tlvs, tags::APPLICATION_PAN)
        .map(|t| t.hex_value())
        .ok_or_else(|| ServiceError::Validation("EMV payload has no PAN (5A)".to_string()))?;
    // BCD PANs of odd length carry a trailing filler nibble
    let pan = pan.trim_end_matches('F').to_string();

    let expiry_ymd = find_first(&tlvs, tags::APPLICATION_EXPIRATION_DATE)
        .map(|t| t.hex_value())
        .ok_or_else(|| ServiceError::Validation("EMV payload has no expiry (5F24)".to_string()))?;
    if expiry_ymd.len() < 4 {
        return Err(ServiceError::Validation("EMV expiry too short".to_string()));
    }

    // 5F24 is YYMMDD; the payment record keeps MMYY
    let expiry = format!("{}{}", &expiry_ymd[2..4], &expiry_ymd[..2]);

    let cardholder = find_first(&tlvs, tags::CARDHOLDER_NAME)
        .map(|t| t.ascii_value())
        .unwrap_or_default();

    Ok(ExtractedCard {
        pan,
        expiry,
        cvv: default_cvv(""),
        cardholder,
    })
}

/// Field 8 on the wire is fixed-width; contactless payments carry no CVV
fn default_cvv(cvv: &str) -> String {
    if cvv.is_empty() {
        "0000".to_string()
    } else {
        cvv.to_string()
    }
}
