//! Status word taxonomy for APDU responses
//!
//! Every response ends with a 2-byte status word. The taxonomy below maps
//! each code to a category and a human-readable description; codes with a
//! variable low byte (61XX, 6CXX, 63CX) compute their description from it.

use std::fmt;

/// Broad classification of a status word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwCategory {
    Success,
    Warning,
    Error,
    Security,
}

/// A 2-byte APDU status word (SW1 << 8 | SW2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord(pub u16);

impl StatusWord {
    pub const SUCCESS: StatusWord = StatusWord(0x9000);

    pub fn from_parts(sw1: u8, sw2: u8) -> Self {
        Self(((sw1 as u16) << 8) | sw2 as u16)
    }

    pub fn is_success(&self) -> bool {
        self.0 == 0x9000
    }

    pub fn category(&self) -> SwCategory {
        match self.0 {
            0x9000 => SwCategory::Success,
            0x6100..=0x61FF => SwCategory::Warning,
            0x6200 | 0x6281..=0x6284 | 0x9100 => SwCategory::Warning,
            0x6300 | 0x63C0..=0x63CF => SwCategory::Security,
            0x6600 | 0x6882 | 0x6982..=0x6984 | 0x6987 | 0x6988 => SwCategory::Security,
            0x9101 | 0x9110 | 0x9210 | 0x9220 => SwCategory::Security,
            _ => SwCategory::Error,
        }
    }

    pub fn name(&self) -> &'static str {
        match self.0 {
            0x9000 => "Success",
            0x6100..=0x61FF => "More Data Available",
            0x6200 => "Warning - No Info",
            0x6281 => "Part of Data Corrupted",
            0x6282 => "EOF Before Reading",
            0x6283 => "Selected File Deactivated",
            0x6284 => "File Control Info Error",
            0x6300 => "Authentication Failed",
            0x63C0..=0x63CF => "PIN Verification Failed",
            0x6400 => "Execution Error",
            0x6500 => "Memory Failure",
            0x6600 => "Security Issue",
            0x6700..=0x67FF => "Wrong Length",
            0x6800 => "Unsupported Function",
            0x6881 => "Logical Channel Not Supported",
            0x6882 => "Secure Messaging Not Supported",
            0x6900 => "Command Not Allowed",
            0x6981 => "Command Incompatible",
            0x6982 => "Security Status Not Satisfied",
            0x6983 => "Authentication Method Blocked",
            0x6984 => "Reference Data Not Usable",
            0x6985 => "Conditions Not Satisfied",
            0x6986 => "Command Not Allowed",
            0x6987 => "Expected Secure Messaging",
            0x6988 => "Incorrect Secure Messaging",
            0x6A00 => "Wrong Parameters",
            0x6A80 => "Incorrect Data",
            0x6A81 => "Function Not Supported",
            0x6A82 => "File Not Found",
            0x6A83 => "Record Not Found",
            0x6A84 => "Not Enough Memory",
            0x6A85 => "Incorrect TLV",
            0x6A86 => "Incorrect P1-P2",
            0x6A87 => "Lc Inconsistent with P1-P2",
            0x6A88 => "Referenced Data Not Found",
            0x6A89 => "File Already Exists",
            0x6A8A => "DF Name Already Exists",
            0x6B00 => "Wrong Parameters",
            0x6C00..=0x6CFF => "Wrong Le Field",
            0x6D00 => "Instruction Not Supported",
            0x6E00 => "Class Not Supported",
            0x6F00 => "No Precise Diagnosis",
            0x9100 => "Terminal Risk Management",
            0x9101 => "Issuer Authentication Failed",
            0x9102 => "Script Processing Failed",
            0x9110 => "PIN Try Limit Exceeded",
            0x9202 => "Service Not Allowed",
            0x9210 => "PIN Required",
            0x9220 => "PIN Block Format Error",
            0x9900 => "Terminal Application Error",
            _ => "Unknown Status",
        }
    }

    pub fn description(&self) -> String {
        match self.0 {
            0x9000 => "Command completed successfully".into(),
            0x6100..=0x61FF => format!(
                "More data available, {} bytes can be read with GET RESPONSE",
                self.0 & 0xFF
            ),
            0x6200 => "Warning condition, no information given".into(),
            0x6281 => "Part of returned data may be corrupted".into(),
            0x6282 => "End of file reached before reading expected number of bytes".into(),
            0x6283 => "Selected file is deactivated".into(),
            0x6284 => "File control information not formatted according to standard".into(),
            0x6300 => "Authentication failed".into(),
            0x63C0..=0x63CF => {
                format!("PIN verification failed, {} tries left", self.0 & 0x0F)
            }
            0x6400 => "Execution error, no information given".into(),
            0x6500 => "Execution error, memory failure".into(),
            0x6600 => "Execution error, security issue".into(),
            0x6700..=0x67FF => "Wrong length in Lc field".into(),
            0x6800 => "Function not supported in CLA".into(),
            0x6881 => "Logical channel not supported".into(),
            0x6882 => "Secure messaging not supported".into(),
            0x6900 => "Command not allowed, no information given".into(),
            0x6981 => "Command incompatible with file structure".into(),
            0x6982 => "Security status not satisfied".into(),
            0x6983 => "Authentication method blocked".into(),
            0x6984 => "Reference data not usable".into(),
            0x6985 => "Conditions of use not satisfied".into(),
            0x6986 => "Command not allowed (no current EF)".into(),
            0x6987 => "Expected secure messaging data objects missing".into(),
            0x6988 => "Incorrect secure messaging data objects".into(),
            0x6A00 => "Wrong parameters P1-P2".into(),
            0x6A80 => "Incorrect parameters in command data field".into(),
            0x6A81 => "Function not supported".into(),
            0x6A82 => "File or application not found".into(),
            0x6A83 => "Record not found".into(),
            0x6A84 => "Not enough memory space in the file".into(),
            0x6A85 => "Nc inconsistent with TLV structure".into(),
            0x6A86 => "Incorrect parameters P1-P2".into(),
            0x6A87 => "Nc inconsistent with parameters P1-P2".into(),
            0x6A88 => "Referenced data or reference data not found".into(),
            0x6A89 => "File already exists".into(),
            0x6A8A => "DF name already exists".into(),
            0x6B00 => "Wrong parameters P1-P2".into(),
            0x6C00..=0x6CFF => format!(
                "Wrong Le field, exact length expected is {}",
                self.0 & 0xFF
            ),
            0x6D00 => "Instruction code not supported or invalid".into(),
            0x6E00 => "Class not supported".into(),
            0x6F00 => "No precise diagnosis".into(),
            0x9100 => "Terminal risk management was performed".into(),
            0x9101 => "Issuer authentication failed".into(),
            0x9102 => "Script processing failed".into(),
            0x9110 => "PIN try limit exceeded".into(),
            0x9202 => "Service not allowed for card product".into(),
            0x9210 => "PIN required".into(),
            0x9220 => "PIN block format error".into(),
            0x9900 => "Terminal application error".into(),
            _ => format!("Unknown status word: {:04X}", self.0),
        }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} - {}: {}", self.0, self.name(), self.description())
    }
}
