//! HTTP client for the card personalizer service

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PersonalizerError {
    #[error("no personalizer configured")]
    NotConfigured,

    #[error("personalizer request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("personalizer rejected the card: {0}")]
    Rejected(String),
}

#[derive(Debug, Serialize)]
struct PersonalizeRequest<'a> {
    name: &'a str,
    pan: &'a str,
    expiry: &'a str,
    pin: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct PersonalizeResponse {
    pub card_holder: String,
    pub pan: String,
    pub expiry: String,
}

pub struct PersonalizerClient {
    base_url: String,
    http: reqwest::Client,
}

impl PersonalizerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    /// Submit a card for physical personalization and wait for the result
    pub async fn personalize(
        &self,
        name: &str,
        pan: &str,
        expiry: &str,
        pin: &str,
    ) -> Result<PersonalizeResponse, PersonalizerError> {
        let response = self
            .http
            .post(format!("{}/cards", self.base_url))
            .json(&PersonalizeRequest {
                name,
                pan,
                expiry,
                pin,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PersonalizerError::Rejected(body));
        }

        let card: PersonalizeResponse = response.json().await?;
        info!(card_holder = %card.card_holder, "card personalized");
        Ok(card)
    }
}
