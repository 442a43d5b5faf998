//! Card writing
//!
//! The static-data record mirrors what the terminal kernels later read
//! back: a 70 template carrying the PAN, expiry and cardholder name. The
//! record is written with PUT DATA through the shared reader handle.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::info;

use tap_card::apdu::commands;
use tap_card::kernel::ApduTransport;
use tap_card::CardReader;
use tap_emv::{encode, Tlv};

use crate::models::{CardRequest, CardResponse, JobError};

#[async_trait]
pub trait CardWriter: Send + Sync + 'static {
    async fn write(&self, request: &CardRequest) -> Result<CardResponse, JobError>;
}

pub struct PcscWriter {
    reader: Arc<Mutex<CardReader>>,
}

impl PcscWriter {
    pub fn new(reader: Arc<Mutex<CardReader>>) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl CardWriter for PcscWriter {
    async fn write(&self, request: &CardRequest) -> Result<CardResponse, JobError> {
        let reader = self.reader.clone();
        let request = request.clone();

        let response = tokio::task::spawn_blocking(move || write_card(&reader, &request))
            .await
            .map_err(|err| JobError::Write(err.to_string()))??;

        Ok(response)
    }
}

fn write_card(
    reader: &Mutex<CardReader>,
    request: &CardRequest,
) -> Result<CardResponse, JobError> {
    let record = static_data_record(request).map_err(|err| JobError::Write(err.to_string()))?;

    let mut reader = reader.lock();
    reader.connect().map_err(|err| JobError::Write(err.to_string()))?;

    let command = commands::put_data(&[0x70], &record);
    let result = reader.transmit(&command);
    reader.disconnect();

    let response = result.map_err(|err| JobError::Write(err.to_string()))?;
    if !response.is_success() {
        return Err(JobError::Write(format!(
            "card rejected record write with status {}",
            response.status_string()
        )));
    }

    info!(card_holder = %request.name, "card written");

    Ok(CardResponse {
        card_holder: request.name.clone(),
        pan: request.pan.clone(),
        expiry: request.expiry.clone(),
    })
}

/// Build the 70 record the kernels read back after a tap
fn static_data_record(request: &CardRequest) -> Result<Vec<u8>, tap_emv::TlvError> {
    let record = Tlv::constructed(
        "70",
        vec![
            Tlv::primitive("5A", hex::decode(&request.pan).unwrap_or_default()),
            Tlv::primitive(
                "5F24",
                hex::decode(expiry_to_yymmdd(&request.expiry)).unwrap_or_default(),
            ),
            Tlv::primitive("5F20", request.name.as_bytes().to_vec()),
        ],
    );

    encode(&[record])
}

/// MMYY to the YYMMDD form of tag 5F24; the day is pinned to 31
fn expiry_to_yymmdd(expiry: &str) -> String {
    format!("{}{}31", &expiry[2..4], &expiry[..2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tap_emv::{decode, find_first};

    fn request() -> CardRequest {
        CardRequest {
            name: "Ada Lovelace".to_string(),
            pan: "7000000000000001".to_string(),
            expiry: "0927".to_string(),
            pin: "1234".to_string(),
        }
    }

    #[test]
    fn test_expiry_conversion() {
        assert_eq!(expiry_to_yymmdd("0927"), "270931");
        assert_eq!(expiry_to_yymmdd("1230"), "301231");
    }

    #[test]
    fn test_record_carries_the_tags_the_kernel_reads() {
        let record = static_data_record(&request()).unwrap();

        let tlvs = decode(&record).unwrap();
        let template = find_first(&tlvs, "70").unwrap();
        assert_eq!(template.children.len(), 3);

        assert_eq!(
            find_first(&tlvs, "5A").unwrap().hex_value(),
            "7000000000000001"
        );
        assert_eq!(find_first(&tlvs, "5F24").unwrap().hex_value(), "270931");
        assert_eq!(
            find_first(&tlvs, "5F20").unwrap().ascii_value(),
            "Ada Lovelace"
        );
    }
}
