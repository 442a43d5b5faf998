//! Issuer-side data model
//!
//! Plain data types; synchronization lives in the repository that owns
//! them, not here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Request body for account creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccount {
    #[serde(rename = "owner")]
    pub owner_name: String,
    pub balance: i64,
    pub currency: String,
}

impl CreateAccount {
    /// Boundary validation; violations come back as a human message
    pub fn validate(&self) -> Result<(), String> {
        if self.owner_name.is_empty() || self.owner_name.len() > 26 {
            return Err("owner must be between 1 and 26 characters".to_string());
        }
        if !self.owner_name.is_ascii() {
            return Err("owner must contain only ASCII characters".to_string());
        }
        if self.balance < 1 {
            return Err("balance must be greater than 0".to_string());
        }
        if self.balance > 100_000_000 {
            return Err("balance must be at most 100000000".to_string());
        }
        if self.currency != "USD" {
            return Err("currency must be USD".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    #[serde(rename = "owner")]
    pub owner_name: String,
    #[serde(rename = "balance")]
    pub available_balance: i64,
    pub hold_balance: i64,
    pub currency: String,
}

/// Request body for card issuance
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardRequest {
    #[serde(rename = "expiry")]
    pub expiry_date: String,
    #[serde(rename = "cvv")]
    pub card_verification_value: String,
    pub pin: String,
}

impl CardRequest {
    pub fn validate(&self) -> Result<(), String> {
        if !is_mmyy(&self.expiry_date) {
            return Err("expiry must be in MMYY format".to_string());
        }
        if self.pin.len() != 4 || !self.pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err("pin must be 4 digits".to_string());
        }
        Ok(())
    }
}

/// Expiry dates are pinned to MMYY throughout the system
pub fn is_mmyy(value: &str) -> bool {
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(value[..2].parse::<u8>(), Ok(1..=12))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub account_id: String,
    pub card_holder_name: String,
    #[serde(rename = "pan")]
    pub number: String,
    #[serde(rename = "expiry")]
    pub expiration_date: String,
    #[serde(rename = "cvv")]
    pub card_verification_value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Merchant {
    pub name: String,
    pub mcc: String,
    pub postal_code: String,
    pub website: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Authorized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub card_id: String,
    pub amount: i64,
    pub currency: String,
    pub merchant: Merchant,
    pub status: TransactionStatus,
    pub approval_code: String,
    pub authorization_code: String,
    pub created_at: DateTime<Utc>,
}

/// Card identification as it arrives in an authorization request
#[derive(Debug, Clone, Default)]
pub struct CardDetails {
    pub number: String,
    pub expiration_date: String,
    pub card_holder_name: String,
    pub card_verification_value: String,
}

#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub amount: i64,
    pub currency: String,
    pub card: CardDetails,
    pub merchant: Merchant,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub approval_code: String,
    pub authorization_code: String,
}

/// Generate a Luhn-valid 16-digit PAN starting with `bin`
pub fn generate_card_number(bin: &str) -> String {
    use rand::Rng;

    let mut number = bin.to_string();
    let mut rng = rand::thread_rng();

    while number.len() < 15 {
        number.push(char::from(b'0' + rng.gen_range(0..10)));
    }

    let check = luhn_check_digit(&number);
    number.push(check);
    number
}

/// Luhn check digit for the given partial number
fn luhn_check_digit(digits: &str) -> char {
    let mut sum = 0u32;

    // rightmost digit of the partial number is doubled, then every other
    for (index, ch) in digits.chars().rev().enumerate() {
        let mut digit = ch.to_digit(10).unwrap_or(0);
        if index % 2 == 0 {
            digit *= 2;
            if digit > 9 {
                digit = digit / 10 + digit % 10;
            }
        }
        sum += digit;
    }

    let check = (10 - sum % 10) % 10;
    char::from(b'0' + check as u8)
}

/// Whether a card number carries a valid Luhn check digit
pub fn is_luhn_valid(number: &str) -> bool {
    if number.len() < 12 || number.len() > 19 {
        return false;
    }
    if !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let (body, check) = number.split_at(number.len() - 1);
    luhn_check_digit(body) == check.chars().next().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_numbers_are_luhn_valid() {
        for _ in 0..50 {
            let number = generate_card_number("7");
            assert_eq!(number.len(), 16);
            assert!(number.starts_with('7'));
            assert!(is_luhn_valid(&number), "{number} failed Luhn");
        }
    }

    #[test]
    fn test_known_luhn_numbers() {
        assert!(is_luhn_valid("4111111111111111"));
        assert!(is_luhn_valid("5500005555555559"));
        assert!(!is_luhn_valid("4111111111111112"));
        assert!(!is_luhn_valid("41111"));
        assert!(!is_luhn_valid("411111111111111A"));
    }

    #[test]
    fn test_expiry_format() {
        assert!(is_mmyy("0927"));
        assert!(is_mmyy("1230"));
        assert!(!is_mmyy("1327"));
        assert!(!is_mmyy("0027"));
        assert!(!is_mmyy("927"));
        assert!(!is_mmyy("09/27"));
    }

    #[test]
    fn test_create_account_validation() {
        let good = CreateAccount {
            owner_name: "Ada Lovelace".to_string(),
            balance: 1000,
            currency: "USD".to_string(),
        };
        assert!(good.validate().is_ok());

        let mut bad = good.clone();
        bad.balance = 0;
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.currency = "EUR".to_string();
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.owner_name = "x".repeat(27);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_card_request_validation() {
        let good = CardRequest {
            expiry_date: "0927".to_string(),
            card_verification_value: "123".to_string(),
            pin: "1234".to_string(),
        };
        assert!(good.validate().is_ok());

        let mut bad = good.clone();
        bad.pin = "12a4".to_string();
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.expiry_date = "2709".to_string();
        assert!(bad.validate().is_err());
    }
}
