//! Personalization job model

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A card to be written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRequest {
    pub name: String,
    pub pan: String,
    /// MMYY
    pub expiry: String,
    pub pin: String,
}

impl CardRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() || self.name.len() > 26 {
            return Err("name must be between 1 and 26 characters".to_string());
        }
        if self.pan.len() != 16 || !self.pan.bytes().all(|b| b.is_ascii_digit()) {
            return Err("pan must be 16 digits".to_string());
        }
        if !is_mmyy(&self.expiry) {
            return Err("expiry must be in MMYY format".to_string());
        }
        if self.pin.len() != 4 || !self.pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err("pin must be 4 digits".to_string());
        }
        Ok(())
    }
}

fn is_mmyy(value: &str) -> bool {
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    matches!(value[..2].parse::<u8>(), Ok(1..=12))
}

/// What the writer reports back once the card is done
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardResponse {
    pub card_holder: String,
    pub pan: String,
    pub expiry: String,
}

/// Lifecycle of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Queued,
    WaitingForCard,
    Processing,
    Done,
    Failed,
}

/// Queue snapshot entry exposed over HTTP
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub name: String,
    pub state: JobState,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JobError {
    #[error("service is shutting down")]
    Cancelled,

    #[error("job queue is closed")]
    QueueClosed,

    #[error("waiting for card: {0}")]
    Watch(String),

    #[error("writing card: {0}")]
    Write(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CardRequest {
        CardRequest {
            name: "Ada Lovelace".to_string(),
            pan: "7000000000000001".to_string(),
            expiry: "0927".to_string(),
            pin: "1234".to_string(),
        }
    }

    #[test]
    fn test_validation() {
        assert!(request().validate().is_ok());

        let mut bad = request();
        bad.pan = "700".to_string();
        assert!(bad.validate().is_err());

        let mut bad = request();
        bad.expiry = "1327".to_string();
        assert!(bad.validate().is_err());

        let mut bad = request();
        bad.pin = "12345".to_string();
        assert!(bad.validate().is_err());
    }
}
