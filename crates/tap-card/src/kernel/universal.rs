//! Universal kernel - PPSE-driven flow for real contactless cards
//!
//! SELECT PPSE -> pick the highest-priority application -> SELECT its AID ->
//! answer the PDOL -> GET PROCESSING OPTIONS -> walk the AFL reading records.
//! Cards that do not expose the PPSE directory are tried against a short
//! list of known AIDs instead.

use tracing::{debug, info};

use super::ftdc::FTDC_AID;
use super::{expect_success, ApduTransport, Kernel, TagsDb};
use crate::apdu::commands;
use crate::error::CardError;
use crate::terminal::{Terminal, Transaction};
use tap_emv::{decode, find_first, parse_dol, tags, Tlv};

/// AIDs tried when the card has no PPSE directory
const KNOWN_AIDS: [&[u8]; 3] = [
    &FTDC_AID,
    &[0xA0, 0x00, 0x00, 0x00, 0x03, 0x10, 0x10], // Visa
    &[0xA0, 0x00, 0x00, 0x00, 0x04, 0x10, 0x10], // Mastercard
];

/// One application advertised in the PPSE directory
#[derive(Debug, Clone)]
pub struct ApplicationInfo {
    pub aid: Vec<u8>,
    pub label: Option<String>,
    pub priority: Option<u8>,
}

/// Application Interchange Profile capability bits (byte 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aip {
    pub offline_data_authentication: bool,
    pub cardholder_verification: bool,
    pub terminal_risk_management: bool,
    pub issuer_authentication: bool,
    pub combined_data_authentication: bool,
}

impl Aip {
    pub fn parse(bytes: &[u8]) -> Result<Self, CardError> {
        if bytes.len() < 2 {
            return Err(CardError::Malformed(format!(
                "AIP needs 2 bytes, got {}",
                bytes.len()
            )));
        }

        Ok(Self {
            offline_data_authentication: bytes[0] & 0x80 != 0,
            cardholder_verification: bytes[0] & 0x40 != 0,
            terminal_risk_management: bytes[0] & 0x20 != 0,
            issuer_authentication: bytes[0] & 0x10 != 0,
            combined_data_authentication: bytes[0] & 0x08 != 0,
        })
    }
}

/// One AFL quartet: a range of records in a short file
#[derive(Debug, Clone, Copy)]
struct AflEntry {
    sfi: u8,
    first_record: u8,
    last_record: u8,
    #[allow(dead_code)]
    offline_auth_count: u8,
}

fn parse_afl(data: &[u8]) -> Result<Vec<AflEntry>, CardError> {
    if data.len() % 4 != 0 {
        return Err(CardError::Malformed(format!(
            "AFL length {} is not a multiple of 4",
            data.len()
        )));
    }

    Ok(data
        .chunks_exact(4)
        .map(|quartet| AflEntry {
            sfi: quartet[0] >> 3,
            first_record: quartet[1],
            last_record: quartet[2],
            offline_auth_count: quartet[3],
        })
        .collect())
}

pub struct UniversalKernel {
    terminal: Terminal,
    transaction: Transaction,
}

impl UniversalKernel {
    pub fn new(terminal: Terminal, transaction: Transaction) -> Self {
        Self {
            terminal,
            transaction,
        }
    }

    /// SELECT PPSE and pick an application; falls back to direct selection.
    /// Returns the FCI of the selected application.
    fn select_application(
        &self,
        transport: &mut dyn ApduTransport,
    ) -> Result<Vec<Tlv>, CardError> {
        let ppse = transport.transmit(&commands::select_ppse())?;

        if !ppse.is_success() {
            debug!(status = %ppse.status_string(), "PPSE not available, trying known AIDs");
            return self.direct_selection(transport);
        }

        let directory = decode(&ppse.data)?;
        let mut applications = Vec::new();
        collect_applications(&directory, &mut applications);

        let chosen = applications
            .iter()
            .min_by_key(|app| app.priority.unwrap_or(u8::MAX))
            .ok_or(CardError::NoApplication)?;

        info!(
            aid = %hex::encode_upper(&chosen.aid),
            label = chosen.label.as_deref().unwrap_or(""),
            "selecting application"
        );

        let response = expect_success(transport.transmit(&commands::select(&chosen.aid))?)?;
        decode(&response.data).map_err(Into::into)
    }

    fn direct_selection(
        &self,
        transport: &mut dyn ApduTransport,
    ) -> Result<Vec<Tlv>, CardError> {
        for aid in KNOWN_AIDS {
            let response = transport.transmit(&commands::select(aid))?;
            if response.is_success() {
                info!(aid = %hex::encode_upper(aid), "application found via direct selection");
                return decode(&response.data).map_err(Into::into);
            }
            debug!(
                aid = %hex::encode_upper(aid),
                status = %response.status_string(),
                "direct selection rejected"
            );
        }

        Err(CardError::NoApplication)
    }

    /// GET PROCESSING OPTIONS with the PDOL answer; fills the database with
    /// the response tags and returns the AFL entries to read
    fn processing_options(
        &self,
        transport: &mut dyn ApduTransport,
        fci: &[Tlv],
        db: &mut TagsDb,
    ) -> Result<Vec<AflEntry>, CardError> {
        let pdol_data = match find_first(fci, tags::PDOL) {
            Some(pdol) => {
                let dol = parse_dol(&pdol.value)?;
                self.terminal.build_pdol_data(&self.transaction, &dol)
            }
            None => Vec::new(),
        };

        let response =
            expect_success(transport.transmit(&commands::get_processing_options(&pdol_data))?)?;
        let tlvs = decode(&response.data)?;

        if let Some(template) = find_first(&tlvs, tags::RESPONSE_TEMPLATE_FORMAT_2) {
            // Format 2: a constructed template with AIP, AFL and friends
            db.extend(template.children.iter().cloned());

            return match find_first(&template.children, tags::AFL) {
                Some(afl) => parse_afl(&afl.value),
                None => Ok(Vec::new()),
            };
        }

        if let Some(template) = find_first(&tlvs, tags::RESPONSE_TEMPLATE_FORMAT_1) {
            // Format 1: primitive value, 2-byte AIP then AFL quartets
            if template.value.len() < 2 {
                return Err(CardError::Malformed(
                    "format 1 GPO response shorter than an AIP".to_string(),
                ));
            }

            let (aip, afl) = template.value.split_at(2);
            db.push(Tlv::primitive(tags::AIP, aip.to_vec()));
            db.push(Tlv::primitive(tags::AFL, afl.to_vec()));

            return parse_afl(afl);
        }

        Err(CardError::MissingTag(tags::RESPONSE_TEMPLATE_FORMAT_2))
    }

    fn read_afl_records(
        &self,
        transport: &mut dyn ApduTransport,
        afl: &[AflEntry],
        db: &mut TagsDb,
    ) -> Result<(), CardError> {
        for entry in afl {
            let first = entry.first_record.max(1);

            for record in first..=entry.last_record {
                let response =
                    expect_success(transport.transmit(&commands::read_record(record, entry.sfi))?)?;

                let tlvs = decode(&response.data)?;
                let template = find_first(&tlvs, tags::RECORD_TEMPLATE)
                    .ok_or(CardError::MissingTag(tags::RECORD_TEMPLATE))?;

                debug!(sfi = entry.sfi, record, "record read");
                db.extend(template.children.iter().cloned());
            }
        }

        Ok(())
    }

    /// Cards that return no AFL sometimes still expose record 1 of SFI 0;
    /// a rejection here is not a flow failure
    fn read_fallback_record(
        &self,
        transport: &mut dyn ApduTransport,
        db: &mut TagsDb,
    ) -> Result<(), CardError> {
        let response = transport.transmit(&commands::read_record(1, 0))?;
        if !response.is_success() {
            debug!(status = %response.status_string(), "fallback record read rejected");
            return Ok(());
        }

        let tlvs = decode(&response.data)?;
        if let Some(template) = find_first(&tlvs, tags::RECORD_TEMPLATE) {
            db.extend(template.children.iter().cloned());
        }

        Ok(())
    }
}

impl Kernel for UniversalKernel {
    fn process(&mut self, transport: &mut dyn ApduTransport) -> Result<TagsDb, CardError> {
        let mut db = TagsDb::default();

        let fci = self.select_application(transport)?;

        if let Some(adf_name) = find_first(&fci, tags::ADF_NAME) {
            db.push(adf_name.clone());
        }
        if let Some(label) = find_first(&fci, tags::APPLICATION_LABEL) {
            db.push(label.clone());
        }

        let afl = self.processing_options(transport, &fci, &mut db)?;

        if afl.is_empty() {
            self.read_fallback_record(transport, &mut db)?;
        } else {
            self.read_afl_records(transport, &afl, &mut db)?;
        }

        Ok(db)
    }
}

/// Walk the PPSE directory for application templates (tag 61)
fn collect_applications(nodes: &[Tlv], out: &mut Vec<ApplicationInfo>) {
    for node in nodes {
        if node.tag == tags::APPLICATION_TEMPLATE {
            let aid = find_first(&node.children, tags::APPLICATION_IDENTIFIER)
                .map(|t| t.value.clone())
                .unwrap_or_default();

            if !aid.is_empty() {
                out.push(ApplicationInfo {
                    aid,
                    label: find_first(&node.children, tags::APPLICATION_LABEL)
                        .map(|t| t.ascii_value()),
                    priority: find_first(&node.children, tags::APPLICATION_PRIORITY)
                        .and_then(|t| t.value.first().copied()),
                });
            }
        }

        collect_applications(&node.children, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apdu::{ApduCommand, ApduResponse};
    use tap_emv::encode;

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

    fn status(sw1: u8, sw2: u8) -> ApduResponse {
        ApduResponse {
            data: vec![],
            sw1,
            sw2,
        }
    }

    // SELECT 2PAY.SYS.DDF01 response from a Visa card
    const PPSE_FCI: &str =
        "6F30840E325041592E5359532E4444463031A51EBF0C1B61194F07A0000000031010500B564953412043524544495487 0101";

    fn ppse_fci() -> Vec<u8> {
        hex::decode(PPSE_FCI.replace(' ', "")).unwrap()
    }

    fn visa_fci() -> Vec<u8> {
        let fci = Tlv::constructed(
            "6F",
            vec![
                Tlv::primitive("84", hex::decode("A0000000031010").unwrap()),
                Tlv::constructed(
                    "A5",
                    vec![
                        Tlv::primitive("50", b"VISA CREDIT".to_vec()),
                        Tlv::primitive("9F38", hex::decode("9F66049F0206").unwrap()),
                    ],
                ),
            ],
        );
        encode(&[fci]).unwrap()
    }

    fn gpo_format2() -> Vec<u8> {
        let template = Tlv::constructed(
            "77",
            vec![
                Tlv::primitive("82", vec![0x80, 0x00]),
                Tlv::primitive("94", vec![0x08, 0x01, 0x01, 0x00]),
                Tlv::primitive("5F20", b"CARDHOLDER/VISA".to_vec()),
                Tlv::primitive("9F36", vec![0x00, 0x69]),
            ],
        );
        encode(&[template]).unwrap()
    }

    fn record() -> Vec<u8> {
        let template = Tlv::constructed(
            "70",
            vec![
                Tlv::primitive("5A", hex::decode("4147202500716749").unwrap()),
                Tlv::primitive("5F24", hex::decode("260731").unwrap()),
            ],
        );
        encode(&[template]).unwrap()
    }

    fn kernel() -> UniversalKernel {
        UniversalKernel::new(Terminal::new(), Transaction::purchase(1234))
    }

    #[test]
    fn test_ppse_flow() {
        let mut card = ScriptedCard::new(vec![
            ok(ppse_fci()),
            ok(visa_fci()),
            ok(gpo_format2()),
            ok(record()),
        ]);

        let db = kernel().process(&mut card).unwrap();

        // PPSE select, AID select, GPO, one AFL record
        assert_eq!(card.sent.len(), 4);
        assert_eq!(&card.sent[0].data, b"2PAY.SYS.DDF01");
        assert_eq!(card.sent[1].data, hex::decode("A0000000031010").unwrap());
        // GPO carries the PDOL answer wrapped in the 83 template
        assert_eq!(card.sent[2].data[..2], [0x83, 0x0A]);
        assert_eq!(card.sent[3].to_bytes(), vec![0x00, 0xB2, 0x01, 0x0C, 0x00]);

        let harvested: Vec<&str> = db.tags().iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(
            harvested,
            vec!["84", "50", "82", "94", "5F20", "9F36", "5A", "5F24"]
        );

        assert_eq!(db.find("5F20").unwrap().ascii_value(), "CARDHOLDER/VISA");
        assert_eq!(db.find("9F36").unwrap().hex_value(), "0069");

        let aip = Aip::parse(&db.find("82").unwrap().value).unwrap();
        assert!(aip.offline_data_authentication);
        assert!(!aip.cardholder_verification);
    }

    #[test]
    fn test_direct_selection_fallback_and_format1() {
        let fci = Tlv::constructed(
            "6F",
            vec![
                Tlv::primitive("84", FTDC_AID.to_vec()),
                Tlv::primitive("50", b"FTDC".to_vec()),
            ],
        );

        // Format 1: AIP 2000 then one AFL quartet for record 1 / SFI 1
        let format1 = Tlv::primitive("80", vec![0x20, 0x00, 0x08, 0x01, 0x01, 0x00]);

        let mut card = ScriptedCard::new(vec![
            status(0x6A, 0x82), // PPSE not found
            ok(encode(&[fci]).unwrap()),
            ok(encode(&[format1]).unwrap()),
            ok(record()),
        ]);

        let db = kernel().process(&mut card).unwrap();

        // the first known AID answered, so only one direct SELECT was sent
        assert_eq!(card.sent[1].data, FTDC_AID.to_vec());

        // 82 and 94 are synthesized from the format 1 payload
        assert_eq!(db.find("82").unwrap().value, vec![0x20, 0x00]);
        assert_eq!(db.find("94").unwrap().value, vec![0x08, 0x01, 0x01, 0x00]);
        assert!(db.find("5A").is_some());

        let aip = Aip::parse(&db.find("82").unwrap().value).unwrap();
        assert!(aip.terminal_risk_management);
        assert!(!aip.offline_data_authentication);
    }

    #[test]
    fn test_no_application_anywhere() {
        let mut card = ScriptedCard::new(vec![
            status(0x6A, 0x82), // PPSE
            status(0x6A, 0x82), // each known AID rejected
            status(0x6A, 0x82),
            status(0x6A, 0x82),
        ]);

        let err = kernel().process(&mut card).unwrap_err();
        assert!(matches!(err, CardError::NoApplication));
    }

    #[test]
    fn test_gpo_failure_surfaces_status_description() {
        let mut card = ScriptedCard::new(vec![
            ok(ppse_fci()),
            ok(visa_fci()),
            status(0x69, 0x85),
        ]);

        let err = kernel().process(&mut card).unwrap_err();
        assert_eq!(
            err.to_string(),
            "card returned 6985 - Conditions Not Satisfied: Conditions of use not satisfied"
        );
    }

    #[test]
    fn test_afl_parse_rejects_ragged_input() {
        assert!(parse_afl(&[0x08, 0x01, 0x01]).is_err());
        assert_eq!(parse_afl(&[]).unwrap().len(), 0);

        let entries = parse_afl(&[0x10, 0x01, 0x03, 0x00]).unwrap();
        assert_eq!(entries[0].sfi, 2);
        assert_eq!(entries[0].first_record, 1);
        assert_eq!(entries[0].last_record, 3);
    }

    #[test]
    fn test_aip_parse_needs_two_bytes() {
        assert!(Aip::parse(&[0x80]).is_err());
    }
}
