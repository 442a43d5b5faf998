//! Blocking HTTP clients for the acquirer and the receipt printer

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tap_acquirer::models::{CreatePayment, Payment};

pub struct AcquirerClient {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl AcquirerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: reqwest::blocking::Client::new(),
        }
    }

    /// POST a payment intent and return the decided payment
    pub fn create_payment(
        &self,
        merchant_id: &str,
        create: &CreatePayment,
    ) -> anyhow::Result<Payment> {
        let response = self
            .http
            .post(format!("{}/merchants/{merchant_id}/payments", self.base_url))
            .json(create)
            .send()
            .context("sending payment to acquirer")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            bail!("acquirer returned {status}: {body}");
        }

        response.json().context("decoding payment response")
    }
}

#[derive(Debug, Serialize)]
pub struct Receipt {
    pub payment_id: String,
    pub processing_date_time: DateTime<Utc>,
    pub pan: String,
    pub cardholder: String,
    pub amount: i64,
    pub authorization_code: String,
    pub response_code: String,
}

#[derive(Debug, Deserialize)]
pub struct PrintJob {
    pub number_in_queue: i32,
    pub waiting_time: i32,
}

/// POST a receipt to the printer service
pub fn print_receipt(printer_url: &str, receipt: &Receipt) -> anyhow::Result<PrintJob> {
    let response = reqwest::blocking::Client::new()
        .post(format!("{}/receipts", printer_url.trim_end_matches('/')))
        .json(receipt)
        .send()
        .context("sending receipt to printer")?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().unwrap_or_default();
        bail!("printer returned {status}: {body}");
    }

    response.json().context("decoding print job response")
}
