//! Authorization gateway to the issuer
//!
//! The service talks to a trait so tests can script decisions; the real
//! implementation dials the issuer's length-prefixed endpoint, sends one
//! 0100 and waits for the 0110.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use tap_iso8583::spec::{auth_spec, fields};
use tap_iso8583::{currency, Client, Iso8583Error, Message, MTI_AUTHORIZATION_REQUEST};

use crate::models::Merchant;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("issuer exchange failed: {0}")]
    Exchange(#[from] Iso8583Error),

    #[error("unsupported currency {0:?}")]
    UnsupportedCurrency(String),
}

/// Everything the wire request needs about one payment
#[derive(Debug, Clone)]
pub struct AuthorizationData {
    pub pan: String,
    /// MMYY
    pub expiry: String,
    pub cvv: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub approval_code: String,
    pub authorization_code: String,
}

#[async_trait]
pub trait AuthorizationGateway: Send + Sync {
    async fn authorize(
        &self,
        payment: &AuthorizationData,
        merchant: &Merchant,
    ) -> Result<GatewayResponse, GatewayError>;
}

/// Gateway that dials the issuer per authorization
pub struct IssuerGateway {
    issuer_addr: String,
    stan: AtomicU64,
}

impl IssuerGateway {
    pub fn new(issuer_addr: &str) -> Self {
        Self {
            issuer_addr: issuer_addr.to_string(),
            stan: AtomicU64::new(1),
        }
    }

    fn next_stan(&self) -> String {
        let n = self.stan.fetch_add(1, Ordering::Relaxed) % 1_000_000;
        format!("{n:06}")
    }

    fn build_request(
        &self,
        payment: &AuthorizationData,
        merchant: &Merchant,
    ) -> Result<Message, GatewayError> {
        let currency_code = currency::numeric(&payment.currency)
            .ok_or_else(|| GatewayError::UnsupportedCurrency(payment.currency.clone()))?;

        let mut message = Message::new(MTI_AUTHORIZATION_REQUEST);
        message
            .set(fields::PAN, payment.pan.as_str())
            .set(fields::AMOUNT, payment.amount.to_string())
            .set(
                fields::PROCESSING_DATETIME,
                Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            )
            .set(fields::CURRENCY, currency_code)
            .set(fields::CVV, payment.cvv.as_str())
            .set(fields::EXPIRATION, payment.expiry.as_str())
            .set_subfield(
                fields::ACCEPTOR_INFO,
                fields::acceptor::MERCHANT_NAME,
                merchant.name.as_str(),
            )
            .set_subfield(fields::ACCEPTOR_INFO, fields::acceptor::MCC, merchant.mcc.as_str())
            .set_subfield(
                fields::ACCEPTOR_INFO,
                fields::acceptor::POSTAL_CODE,
                merchant.postal_code.as_str(),
            )
            .set_subfield(
                fields::ACCEPTOR_INFO,
                fields::acceptor::MERCHANT_URL,
                merchant.web_site.as_str(),
            )
            .set(fields::STAN, self.next_stan());

        Ok(message)
    }
}

#[async_trait]
impl AuthorizationGateway for IssuerGateway {
    async fn authorize(
        &self,
        payment: &AuthorizationData,
        merchant: &Merchant,
    ) -> Result<GatewayResponse, GatewayError> {
        let request = self.build_request(payment, merchant)?;

        let mut client = Client::connect(&self.issuer_addr, auth_spec())
            .await
            .map_err(GatewayError::Exchange)?;
        let response = client.request(&request).await?;

        let approval_code = response
            .get(fields::APPROVAL_CODE)
            .unwrap_or_default()
            .to_string();
        let authorization_code = response
            .get(fields::AUTHORIZATION_CODE)
            .unwrap_or_default()
            .to_string();

        info!(approval = %approval_code, "issuer decided");

        Ok(GatewayResponse {
            approval_code,
            authorization_code,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merchant() -> Merchant {
        Merchant {
            id: "m1".to_string(),
            name: "Coffee Stand".to_string(),
            mcc: "5411".to_string(),
            postal_code: "94103".to_string(),
            web_site: "https://example.com".to_string(),
        }
    }

    #[test]
    fn test_request_fields() {
        let gateway = IssuerGateway::new("127.0.0.1:8583");

        let message = gateway
            .build_request(
                &AuthorizationData {
                    pan: "4111111111111111".to_string(),
                    expiry: "0925".to_string(),
                    cvv: "1234".to_string(),
                    amount: 1234,
                    currency: "USD".to_string(),
                },
                &merchant(),
            )
            .unwrap();

        assert_eq!(message.mti, MTI_AUTHORIZATION_REQUEST);
        assert_eq!(message.get(fields::PAN), Some("4111111111111111"));
        assert_eq!(message.get(fields::CURRENCY), Some("840"));
        assert_eq!(message.get(fields::STAN), Some("000001"));
        assert_eq!(
            message.subfield(fields::ACCEPTOR_INFO, "01"),
            Some("Coffee Stand")
        );
        assert_eq!(message.get(fields::PROCESSING_DATETIME).unwrap().len(), 20);

        // the dictionary accepts what we built
        assert!(message.pack(auth_spec()).is_ok());
    }

    #[test]
    fn test_stan_increments_and_wraps_to_six_digits() {
        let gateway = IssuerGateway::new("127.0.0.1:8583");
        assert_eq!(gateway.next_stan(), "000001");
        assert_eq!(gateway.next_stan(), "000002");

        gateway.stan.store(1_000_000, Ordering::Relaxed);
        assert_eq!(gateway.next_stan(), "000000");
    }

    #[test]
    fn test_unknown_currency_is_rejected() {
        let gateway = IssuerGateway::new("127.0.0.1:8583");
        let err = gateway
            .build_request(
                &AuthorizationData {
                    pan: "4111111111111111".to_string(),
                    expiry: "0925".to_string(),
                    cvv: "1234".to_string(),
                    amount: 1,
                    currency: "XXX".to_string(),
                },
                &merchant(),
            )
            .unwrap_err();

        assert!(matches!(err, GatewayError::UnsupportedCurrency(_)));
    }
}
