//! Acquirer-side data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMerchant {
    pub name: String,
    pub mcc: String,
    pub postal_code: String,
    #[serde(rename = "website")]
    pub web_site: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Merchant {
    pub id: String,
    pub name: String,
    pub mcc: String,
    pub postal_code: String,
    #[serde(rename = "website")]
    pub web_site: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Pending,
    Authorized,
    Declined,
    Error,
}

/// Card details as supplied by an e-commerce caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    pub number: String,
    /// MMYY
    #[serde(rename = "expiry")]
    pub expiration_date: String,
    #[serde(rename = "cvv", default)]
    pub card_verification_value: String,
}

/// What the acquirer is allowed to keep of a card
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafeCard {
    pub first6: String,
    pub last4: String,
    /// MMYY
    #[serde(rename = "expiry")]
    pub expiration_date: String,
}

/// A payment intent from a merchant
///
/// Exactly one of `card` and `emv_payload` is expected; the payload is the
/// hex-encoded BER-TLV bundle harvested by the terminal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePayment {
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub card: Option<CardDetails>,
    #[serde(default)]
    pub emv_payload: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub merchant_id: String,
    pub amount: i64,
    pub currency: String,
    pub card: SafeCard,
    pub status: PaymentStatus,
    #[serde(default)]
    pub authorization_code: String,
    #[serde(default)]
    pub response_code: String,
    pub created_at: DateTime<Utc>,
}
