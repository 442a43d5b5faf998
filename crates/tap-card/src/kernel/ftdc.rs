//! FTDC kernel - fixed application profile for the workshop card
//!
//! The card carries a single application with a known AID and keeps its
//! cardholder record in record 1 of SFI 1, so the whole flow is
//! SELECT -> READ RECORD with no processing options step.

use tracing::{debug, info};

use super::{expect_success, ApduTransport, Kernel, TagsDb};
use crate::apdu::commands;
use crate::error::CardError;
use tap_emv::{decode, find_first, tags};

/// AID of the workshop payment application
pub const FTDC_AID: [u8; 8] = [0xA0, 0x00, 0x00, 0x00, 0x02, 0x03, 0x04, 0x05];

#[derive(Debug, Default)]
pub struct FtdcKernel;

impl FtdcKernel {
    pub fn new() -> Self {
        Self
    }

    fn select_application(
        &self,
        transport: &mut dyn ApduTransport,
        db: &mut TagsDb,
    ) -> Result<(), CardError> {
        let response = expect_success(transport.transmit(&commands::select(&FTDC_AID))?)?;

        let fci = decode(&response.data)?;

        if let Some(adf_name) = find_first(&fci, tags::ADF_NAME) {
            db.push(adf_name.clone());
        }
        if let Some(label) = find_first(&fci, tags::APPLICATION_LABEL) {
            info!(label = %label.ascii_value(), "application selected");
            db.push(label.clone());
        }

        Ok(())
    }

    fn read_records(
        &self,
        transport: &mut dyn ApduTransport,
        db: &mut TagsDb,
    ) -> Result<(), CardError> {
        let response = expect_success(transport.transmit(&commands::read_record(1, 1))?)?;

        let tlvs = decode(&response.data)?;
        let template = find_first(&tlvs, tags::RECORD_TEMPLATE)
            .ok_or(CardError::MissingTag(tags::RECORD_TEMPLATE))?;

        debug!(children = template.children.len(), "record template read");
        db.extend(template.children.iter().cloned());

        Ok(())
    }
}

impl Kernel for FtdcKernel {
    fn process(&mut self, transport: &mut dyn ApduTransport) -> Result<TagsDb, CardError> {
        let mut db = TagsDb::default();

        self.select_application(transport, &mut db)?;
        self.read_records(transport, &mut db)?;

        Ok(db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::{ApduCommand, ApduResponse};
    use tap_emv::{encode, Tlv};

    /// Scripted card: answers each transmitted command in order
    struct ScriptedCard {
        replies: Vec<ApduResponse>,
        sent: Vec<ApduCommand>,
    }

    impl ScriptedCard {
        fn new(replies: Vec<ApduResponse>) -> Self {
            Self {
                replies,
                sent: Vec::new(),
            }
        }
    }

    impl ApduTransport for ScriptedCard {
        fn transmit(&mut self, command: &ApduCommand) -> Result<ApduResponse, CardError> {
            self.sent.push(command.clone());
            if self.replies.is_empty() {
                return Err(CardError::ShortResponse);
            }
            Ok(self.replies.remove(0))
        }
    }

    fn ok(data: Vec<u8>) -> ApduResponse {
        ApduResponse {
            data,
            sw1: 0x90,
            sw2: 0x00,
        }
    }

    fn fci_bytes() -> Vec<u8> {
        let fci = Tlv::constructed(
            "6F",
            vec![
                Tlv::primitive("84", FTDC_AID.to_vec()),
                Tlv::primitive("50", b"FTDC".to_vec()),
            ],
        );
        encode(&[fci]).unwrap()
    }

    fn record_bytes() -> Vec<u8> {
        let record = Tlv::constructed(
            "70",
            vec![
                Tlv::primitive("5A", hex::decode("4111111111111111").unwrap()),
                Tlv::primitive("5F24", hex::decode("250930").unwrap()),
                Tlv::primitive("5F20", b"CARDHOLDER/TEST".to_vec()),
            ],
        );
        encode(&[record]).unwrap()
    }

    #[test]
    fn test_happy_path_collects_five_tags_in_order() {
        let mut card = ScriptedCard::new(vec![ok(fci_bytes()), ok(record_bytes())]);

        let db = FtdcKernel::new().process(&mut card).unwrap();

        let tags: Vec<&str> = db.tags().iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(tags, vec!["84", "50", "5A", "5F24", "5F20"]);

        assert_eq!(db.find("5A").unwrap().hex_value(), "4111111111111111");
        assert_eq!(db.find("5F20").unwrap().ascii_value(), "CARDHOLDER/TEST");

        // SELECT by DF name, then READ RECORD 1 / SFI 1
        assert_eq!(card.sent[0].to_bytes()[..4], [0x00, 0xA4, 0x04, 0x00]);
        assert_eq!(card.sent[1].to_bytes(), vec![0x00, 0xB2, 0x01, 0x0C, 0x00]);
    }

    #[test]
    fn test_select_failure_aborts_with_status() {
        let mut card = ScriptedCard::new(vec![ApduResponse {
            data: vec![],
            sw1: 0x6A,
            sw2: 0x82,
        }]);

        let err = FtdcKernel::new().process(&mut card).unwrap_err();
        match err {
            CardError::Status(sw) => assert_eq!(sw.0, 0x6A82),
            other => panic!("unexpected error: {other:?}"),
        }
        // the flow stops at the first failure
        assert_eq!(card.sent.len(), 1);
    }

    #[test]
    fn test_missing_record_template_is_an_error() {
        let stray = encode(&[Tlv::primitive("5A", vec![0x41])]).unwrap();
        let mut card = ScriptedCard::new(vec![ok(fci_bytes()), ok(stray)]);

        let err = FtdcKernel::new().process(&mut card).unwrap_err();
        assert!(matches!(err, CardError::MissingTag("70")));
    }
}
