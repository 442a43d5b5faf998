//! APDU (Application Protocol Data Unit) command handling

use crate::error::CardError;

/// APDU response containing data and status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    /// Response data (without status word)
    pub data: Vec<u8>,
    /// Status word SW1
    pub sw1: u8,
    /// Status word SW2
    pub sw2: u8,
}

impl ApduResponse {
    /// Parse a raw card response; the last two bytes are the status word
    pub fn parse(raw: &[u8]) -> Result<Self, CardError> {
        if raw.len() < 2 {
            return Err(CardError::ShortResponse);
        }

        Ok(Self {
            data: raw[..raw.len() - 2].to_vec(),
            sw1: raw[raw.len() - 2],
            sw2: raw[raw.len() - 1],
        })
    }

    /// Check if the response indicates success (9000)
    pub fn is_success(&self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// Get the full status word as a 16-bit value
    pub fn status_word(&self) -> u16 {
        ((self.sw1 as u16) << 8) | (self.sw2 as u16)
    }

    /// Get status word as hex string (e.g., "9000")
    pub fn status_string(&self) -> String {
        format!("{:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// APDU command builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
    pub le: Option<u8>,
}

impl ApduCommand {
    /// Create a new APDU command
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Vec::new(),
            le: None,
        }
    }

    /// Set command data
    pub fn data(mut self, data: Vec<u8>) -> Self {
        self.data = data;
        self
    }

    /// Set expected response length
    pub fn le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Build the APDU command bytes
    ///
    /// Lc is prepended when data is present, Le appended when set.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut apdu = vec![self.cla, self.ins, self.p1, self.p2];

        if !self.data.is_empty() {
            apdu.push(self.data.len() as u8);
            apdu.extend_from_slice(&self.data);
        }

        if let Some(le) = self.le {
            apdu.push(le);
        }

        apdu
    }

    /// Parse command bytes produced by [`ApduCommand::to_bytes`]
    pub fn parse(raw: &[u8]) -> Result<Self, CardError> {
        if raw.len() < 4 {
            return Err(CardError::ShortResponse);
        }

        let mut cmd = Self::new(raw[0], raw[1], raw[2], raw[3]);
        let body = &raw[4..];

        match body.len() {
            0 => Ok(cmd),
            1 => Ok(cmd.le(body[0])),
            _ => {
                let lc = body[0] as usize;
                if body.len() == 1 + lc {
                    Ok(cmd.data(body[1..].to_vec()))
                } else if body.len() == 1 + lc + 1 {
                    cmd = cmd.data(body[1..1 + lc].to_vec());
                    Ok(cmd.le(body[1 + lc]))
                } else {
                    Err(CardError::ShortResponse)
                }
            }
        }
    }
}

/// Common EMV APDU commands
pub mod commands {
    use super::ApduCommand;

    /// PPSE (Proximity Payment System Environment) directory name
    pub const PPSE: &[u8] = b"2PAY.SYS.DDF01";

    /// SELECT command (by DF name / AID)
    pub fn select(aid: &[u8]) -> ApduCommand {
        ApduCommand::new(0x00, 0xA4, 0x04, 0x00)
            .data(aid.to_vec())
            .le(0x00)
    }

    /// SELECT command for the contactless payment directory
    pub fn select_ppse() -> ApduCommand {
        select(PPSE)
    }

    /// GET PROCESSING OPTIONS command
    ///
    /// The PDOL data built by the terminal is wrapped in the command
    /// template `83 <len> <data>`; an empty PDOL becomes `83 00`.
    pub fn get_processing_options(pdol_data: &[u8]) -> ApduCommand {
        let mut wrapped = vec![0x83, pdol_data.len() as u8];
        wrapped.extend_from_slice(pdol_data);

        ApduCommand::new(0x80, 0xA8, 0x00, 0x00).data(wrapped).le(0x00)
    }

    /// READ RECORD command; P2 = (SFI << 3) | 4
    pub fn read_record(record_number: u8, sfi: u8) -> ApduCommand {
        let p2 = (sfi << 3) | 0x04;
        ApduCommand::new(0x00, 0xB2, record_number, p2).le(0x00)
    }

    /// PUT DATA command for writing a data object during personalization
    pub fn put_data(tag: &[u8], value: &[u8]) -> ApduCommand {
        let (p1, p2) = match tag {
            [single] => (0x00, *single),
            [first, second, ..] => (*first, *second),
            [] => (0x00, 0x00),
        };
        ApduCommand::new(0x80, 0xDA, p1, p2).data(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apdu_response_is_success() {
        let success = ApduResponse {
            data: vec![],
            sw1: 0x90,
            sw2: 0x00,
        };
        assert!(success.is_success());

        let failure = ApduResponse {
            data: vec![],
            sw1: 0x6A,
            sw2: 0x82,
        };
        assert!(!failure.is_success());
    }

    #[test]
    fn test_apdu_response_status_word() {
        let response = ApduResponse {
            data: vec![],
            sw1: 0x90,
            sw2: 0x00,
        };
        assert_eq!(response.status_word(), 0x9000);

        let error = ApduResponse {
            data: vec![],
            sw1: 0x6A,
            sw2: 0x82,
        };
        assert_eq!(error.status_word(), 0x6A82);
        assert_eq!(error.status_string(), "6A82");
    }

    #[test]
    fn test_apdu_response_parse() {
        let response = ApduResponse::parse(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert_eq!(response.data, vec![0x01, 0x02]);
        assert!(response.is_success());

        let bare = ApduResponse::parse(&[0x6A, 0x82]).unwrap();
        assert!(bare.data.is_empty());
        assert_eq!(bare.status_word(), 0x6A82);
    }

    #[test]
    fn test_apdu_response_parse_too_short() {
        assert!(ApduResponse::parse(&[0x90]).is_err());
        assert!(ApduResponse::parse(&[]).is_err());
    }

    #[test]
    fn test_apdu_command_new() {
        let cmd = ApduCommand::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.to_bytes(), vec![0x00, 0xA4, 0x04, 0x00]);
    }

    #[test]
    fn test_apdu_command_with_data() {
        let cmd = ApduCommand::new(0x00, 0xA4, 0x04, 0x00).data(vec![0xA0, 0x00, 0x00, 0x00, 0x04]);

        assert_eq!(
            cmd.to_bytes(),
            vec![
                0x00, 0xA4, 0x04, 0x00, // Header
                0x05, // Lc = 5 bytes
                0xA0, 0x00, 0x00, 0x00, 0x04, // Data
            ]
        );
    }

    #[test]
    fn test_apdu_command_with_data_and_le() {
        let cmd = ApduCommand::new(0x00, 0xA4, 0x04, 0x00)
            .data(vec![0xA0, 0x00, 0x00, 0x00, 0x04])
            .le(0x00);

        assert_eq!(
            cmd.to_bytes(),
            vec![
                0x00, 0xA4, 0x04, 0x00, // Header
                0x05, // Lc = 5 bytes
                0xA0, 0x00, 0x00, 0x00, 0x04, // Data
                0x00, // Le
            ]
        );
    }

    #[test]
    fn test_apdu_command_roundtrip() {
        let cases = vec![
            ApduCommand::new(0x00, 0xB2, 0x01, 0x0C),
            ApduCommand::new(0x00, 0xB2, 0x01, 0x0C).le(0x00),
            ApduCommand::new(0x00, 0xA4, 0x04, 0x00).data(vec![0xA0, 0x00, 0x00, 0x00, 0x02]),
            ApduCommand::new(0x80, 0xA8, 0x00, 0x00)
                .data(vec![0x83, 0x00])
                .le(0x00),
        ];

        for cmd in cases {
            assert_eq!(ApduCommand::parse(&cmd.to_bytes()).unwrap(), cmd);
        }
    }

    #[test]
    fn test_commands_select() {
        let aid = vec![0xA0, 0x00, 0x00, 0x00, 0x02, 0x03, 0x04, 0x05];
        let cmd = commands::select(&aid);

        assert_eq!(
            cmd.to_bytes(),
            vec![
                0x00, 0xA4, 0x04, 0x00, // SELECT command
                0x08, // Lc = 8 bytes
                0xA0, 0x00, 0x00, 0x00, 0x02, 0x03, 0x04, 0x05, // AID
                0x00, // Le
            ]
        );
    }

    #[test]
    fn test_commands_select_ppse() {
        let bytes = commands::select_ppse().to_bytes();
        assert_eq!(bytes[4], 14);
        assert_eq!(&bytes[5..19], b"2PAY.SYS.DDF01");
    }

    #[test]
    fn test_commands_get_processing_options_empty() {
        let cmd = commands::get_processing_options(&[]);

        assert_eq!(
            cmd.to_bytes(),
            vec![
                0x80, 0xA8, 0x00, 0x00, // GPO command
                0x02, // Lc = 2 bytes
                0x83, 0x00, // empty command template
                0x00, // Le
            ]
        );
    }

    #[test]
    fn test_commands_read_record() {
        // Read record 1 from SFI 1: P2 = (1 << 3) | 0x04 = 0x0C
        let cmd = commands::read_record(1, 1);
        assert_eq!(cmd.to_bytes(), vec![0x00, 0xB2, 0x01, 0x0C, 0x00]);

        // Read record 3 from SFI 5: P2 = (5 << 3) | 0x04 = 0x2C
        let cmd = commands::read_record(3, 5);
        assert_eq!(cmd.to_bytes(), vec![0x00, 0xB2, 0x03, 0x2C, 0x00]);
    }
}
