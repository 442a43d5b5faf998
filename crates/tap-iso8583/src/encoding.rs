//! Field-level encodings
//!
//! Values are held as strings in the message and converted at the wire
//! boundary. Lengths in the specification always count characters; the
//! byte cost per character depends on the encoding.

use crate::error::Iso8583Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Raw text, one byte per character
    Ascii,
    /// Two decimal digits per byte, high nibble first; odd-length values
    /// are left-zero-padded to make them even
    Bcd,
    /// One byte per two ASCII hex characters
    BytesToAsciiHex,
}

impl Encoding {
    /// Number of wire bytes needed for `chars` characters
    pub fn byte_len(&self, chars: usize) -> usize {
        match self {
            Encoding::Ascii => chars,
            Encoding::Bcd => chars.div_ceil(2),
            Encoding::BytesToAsciiHex => chars / 2,
        }
    }

    pub fn encode(&self, value: &str) -> Result<Vec<u8>, Iso8583Error> {
        match self {
            Encoding::Ascii => {
                if !value.is_ascii() {
                    return Err(invalid(value, "not ASCII"));
                }
                Ok(value.as_bytes().to_vec())
            }
            Encoding::Bcd => {
                if !value.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid(value, "BCD needs decimal digits"));
                }
                let padded = if value.len() % 2 == 0 {
                    value.to_string()
                } else {
                    format!("0{value}")
                };
                hex::decode(&padded).map_err(|_| invalid(value, "BCD pack failed"))
            }
            Encoding::BytesToAsciiHex => {
                hex::decode(value).map_err(|_| invalid(value, "not hex"))
            }
        }
    }

    /// Decode `chars` characters worth of wire bytes back into a value
    pub fn decode(&self, bytes: &[u8], chars: usize) -> Result<String, Iso8583Error> {
        match self {
            Encoding::Ascii => String::from_utf8(bytes.to_vec())
                .map_err(|_| invalid_bytes(bytes, "not ASCII")),
            Encoding::Bcd => {
                let digits = hex::encode(bytes);
                if !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid_bytes(bytes, "BCD holds non-digit nibbles"));
                }
                // drop the pad nibble for odd-length values
                Ok(digits[digits.len() - chars..].to_string())
            }
            Encoding::BytesToAsciiHex => Ok(hex::encode_upper(bytes)),
        }
    }
}

fn invalid(value: &str, reason: &str) -> Iso8583Error {
    Iso8583Error::Field {
        field: 0,
        name: "value",
        reason: format!("{reason}: {value:?}"),
    }
}

fn invalid_bytes(bytes: &[u8], reason: &str) -> Iso8583Error {
    Iso8583Error::Field {
        field: 0,
        name: "value",
        reason: format!("{reason}: {}", hex::encode_upper(bytes)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_roundtrip() {
        let enc = Encoding::Ascii;
        let bytes = enc.encode("0100").unwrap();
        assert_eq!(bytes, b"0100");
        assert_eq!(enc.decode(&bytes, 4).unwrap(), "0100");
    }

    #[test]
    fn test_bcd_even() {
        let enc = Encoding::Bcd;
        let bytes = enc.encode("1234").unwrap();
        assert_eq!(bytes, vec![0x12, 0x34]);
        assert_eq!(enc.decode(&bytes, 4).unwrap(), "1234");
    }

    #[test]
    fn test_bcd_odd_left_padded() {
        let enc = Encoding::Bcd;
        let bytes = enc.encode("123").unwrap();
        assert_eq!(bytes, vec![0x01, 0x23]);
        assert_eq!(enc.decode(&bytes, 3).unwrap(), "123");
    }

    #[test]
    fn test_bcd_rejects_letters() {
        assert!(Encoding::Bcd.encode("12A4").is_err());
    }

    #[test]
    fn test_hex_roundtrip() {
        let enc = Encoding::BytesToAsciiHex;
        let bytes = enc.encode("A1B2").unwrap();
        assert_eq!(bytes, vec![0xA1, 0xB2]);
        assert_eq!(enc.decode(&bytes, 4).unwrap(), "A1B2");
    }

    #[test]
    fn test_byte_len() {
        assert_eq!(Encoding::Ascii.byte_len(6), 6);
        assert_eq!(Encoding::Bcd.byte_len(6), 3);
        assert_eq!(Encoding::Bcd.byte_len(5), 3);
        assert_eq!(Encoding::BytesToAsciiHex.byte_len(16), 8);
    }
}
