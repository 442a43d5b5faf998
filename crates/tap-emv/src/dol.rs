//! Data Object List parsing
//!
//! A DOL is the card's shopping list: an ordered sequence of tag/length
//! pairs with no values. The terminal answers it by concatenating exactly
//! `length` bytes per entry (see the PDOL builder in tap-card).

use crate::tlv::{read_tag, TlvError};

/// One requested tag and the number of bytes the card expects for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DolEntry {
    /// Canonical uppercase hex tag
    pub tag: String,
    pub length: usize,
}

/// Parse a DOL byte stream into its ordered entries
///
/// Tags follow the BER-TLV tag rules; each entry has a single length byte.
pub fn parse_dol(data: &[u8]) -> Result<Vec<DolEntry>, TlvError> {
    let mut entries = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let (tag, tag_len) = read_tag(&data[pos..])?;
        pos += tag_len;

        let length = *data.get(pos).ok_or(TlvError::Truncated)? as usize;
        pos += 1;

        entries.push(DolEntry {
            tag: hex::encode_upper(&tag),
            length,
        });
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_visa_pdol() {
        // PDOL as requested by a Visa contactless card
        let data = hex::decode("9F66049F02069F03069F1A0295055F2A029A039C019F3704").unwrap();
        let entries = parse_dol(&data).unwrap();

        let expected = [
            ("9F66", 4),
            ("9F02", 6),
            ("9F03", 6),
            ("9F1A", 2),
            ("95", 5),
            ("5F2A", 2),
            ("9A", 3),
            ("9C", 1),
            ("9F37", 4),
        ];

        assert_eq!(entries.len(), expected.len());
        for (entry, (tag, length)) in entries.iter().zip(expected) {
            assert_eq!(entry.tag, tag);
            assert_eq!(entry.length, length);
        }
    }

    #[test]
    fn test_parse_preserves_order() {
        let data = [0x9C, 0x01, 0x9A, 0x03];
        let entries = parse_dol(&data).unwrap();
        assert_eq!(entries[0].tag, "9C");
        assert_eq!(entries[1].tag, "9A");
    }

    #[test]
    fn test_parse_truncated_length() {
        // tag present, length byte missing
        let data = [0x9F, 0x66];
        assert_eq!(parse_dol(&data), Err(TlvError::Truncated));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_dol(&[]).unwrap(), Vec::new());
    }
}
