//! ISO 8583 endpoint glue
//!
//! Translates between wire messages and the authorization model, then lets
//! the service decide. Declines travel back as approval codes; only
//! malformed requests close the connection.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use tap_iso8583::spec::fields;
use tap_iso8583::{
    currency, Iso8583Error, Message, MessageHandler, MTI_AUTHORIZATION_REQUEST,
    MTI_AUTHORIZATION_RESPONSE,
};

use crate::models::{AuthorizationRequest, CardDetails, Merchant};
use crate::service::Service;

pub struct AuthorizationEndpoint {
    service: Arc<Service>,
}

impl AuthorizationEndpoint {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }

    fn parse_request(message: &Message) -> Result<AuthorizationRequest, Iso8583Error> {
        if message.mti != MTI_AUTHORIZATION_REQUEST {
            return Err(Iso8583Error::Handler(format!(
                "unexpected MTI {:?}",
                message.mti
            )));
        }

        let amount = message
            .get(fields::AMOUNT)
            .unwrap_or("0")
            .parse::<i64>()
            .map_err(|_| Iso8583Error::Handler("amount is not numeric".to_string()))?;

        let currency = message
            .get(fields::CURRENCY)
            .and_then(currency::alpha)
            .unwrap_or("USD")
            .to_string();

        let field = |number| message.get(number).unwrap_or_default().to_string();
        let acceptor = |tag| {
            message
                .subfield(fields::ACCEPTOR_INFO, tag)
                .unwrap_or_default()
                .to_string()
        };

        Ok(AuthorizationRequest {
            amount,
            currency,
            card: CardDetails {
                number: field(fields::PAN),
                expiration_date: field(fields::EXPIRATION),
                card_verification_value: field(fields::CVV),
                card_holder_name: String::new(),
            },
            merchant: Merchant {
                name: acceptor(fields::acceptor::MERCHANT_NAME),
                mcc: acceptor(fields::acceptor::MCC),
                postal_code: acceptor(fields::acceptor::POSTAL_CODE),
                website: acceptor(fields::acceptor::MERCHANT_URL),
            },
        })
    }
}

#[async_trait]
impl MessageHandler for AuthorizationEndpoint {
    async fn handle(&self, request: Message) -> Result<Message, Iso8583Error> {
        let auth_request = Self::parse_request(&request)?;

        let decision = self.service.authorize(auth_request).map_err(|err| {
            warn!(error = %err, "authorization failed");
            Iso8583Error::Handler(err.to_string())
        })?;

        let mut response = Message::new(MTI_AUTHORIZATION_RESPONSE);
        response
            .set(fields::APPROVAL_CODE, decision.approval_code)
            .set(fields::AUTHORIZATION_CODE, pad_code(decision.authorization_code));
        Ok(response)
    }
}

/// Field 6 is fixed-width; declines carry an all-zero code
fn pad_code(code: String) -> String {
    if code.is_empty() {
        "000000".to_string()
    } else {
        code
    }
}
