//! Message specification - the numbered field dictionary
//!
//! Packing and unpacking are driven entirely by this dictionary; the codec
//! itself knows nothing about authorization semantics.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use crate::encoding::Encoding;

/// How a field announces its length on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthPrefix {
    /// No prefix; the value occupies exactly `length` characters
    Fixed,
    /// Two ASCII decimal digits (00..99)
    LL,
    /// Three ASCII decimal digits (000..999)
    LLL,
}

/// Descriptor of a single field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub description: &'static str,
    /// Exact length for Fixed fields, maximum length for LL/LLL
    pub length: usize,
    pub encoding: Encoding,
    pub prefix: LengthPrefix,
    /// Left padding applied on pack and stripped on unpack
    pub pad: Option<char>,
    pub composite: Option<CompositeSpec>,
}

/// Subfield dictionary for a composite field
#[derive(Debug, Clone)]
pub struct CompositeSpec {
    /// ASCII characters per subfield tag
    pub tag_length: usize,
    /// Keyed by tag; iteration order (numeric-ascending for zero-padded
    /// tags) is the wire order
    pub subfields: BTreeMap<&'static str, FieldSpec>,
}

impl FieldSpec {
    pub fn fixed(description: &'static str, length: usize, encoding: Encoding) -> Self {
        Self {
            description,
            length,
            encoding,
            prefix: LengthPrefix::Fixed,
            pad: None,
            composite: None,
        }
    }

    pub fn ll(description: &'static str, length: usize, encoding: Encoding) -> Self {
        Self {
            prefix: LengthPrefix::LL,
            ..Self::fixed(description, length, encoding)
        }
    }

    pub fn lll(description: &'static str, length: usize, encoding: Encoding) -> Self {
        Self {
            prefix: LengthPrefix::LLL,
            ..Self::fixed(description, length, encoding)
        }
    }

    pub fn left_padded(mut self, pad: char) -> Self {
        self.pad = Some(pad);
        self
    }
}

/// A complete numbered dictionary
#[derive(Debug, Clone)]
pub struct MessageSpec {
    pub name: &'static str,
    pub fields: BTreeMap<u64, FieldSpec>,
}

impl MessageSpec {
    pub fn field(&self, number: u64) -> Option<&FieldSpec> {
        self.fields.get(&number)
    }
}

/// Field numbers of the authorization dictionary
///
/// Fields 0 (MTI, 4 ASCII characters) and 1 (bitmap, 8 raw big-endian
/// bytes) are structural: pack/unpack write them directly, so the
/// dictionary starts at field 2.
pub mod fields {
    pub const PAN: u64 = 2;
    pub const AMOUNT: u64 = 3;
    pub const PROCESSING_DATETIME: u64 = 4;
    pub const APPROVAL_CODE: u64 = 5;
    pub const AUTHORIZATION_CODE: u64 = 6;
    pub const CURRENCY: u64 = 7;
    pub const CVV: u64 = 8;
    pub const EXPIRATION: u64 = 9;
    pub const ACCEPTOR_INFO: u64 = 10;
    pub const STAN: u64 = 11;

    pub mod acceptor {
        pub const MERCHANT_NAME: &str = "01";
        pub const MCC: &str = "02";
        pub const POSTAL_CODE: &str = "03";
        pub const MERCHANT_URL: &str = "04";
    }
}

/// The authorization message specification shared by acquirer and issuer
pub fn auth_spec() -> &'static MessageSpec {
    static SPEC: OnceLock<MessageSpec> = OnceLock::new();
    SPEC.get_or_init(build_auth_spec)
}

fn build_auth_spec() -> MessageSpec {
    let mut fields = BTreeMap::new();

    fields.insert(
        fields::PAN,
        FieldSpec::fixed("Primary Account Number", 16, Encoding::Ascii),
    );
    fields.insert(
        fields::AMOUNT,
        FieldSpec::fixed("Amount", 6, Encoding::Ascii).left_padded('0'),
    );
    fields.insert(
        fields::PROCESSING_DATETIME,
        FieldSpec::fixed("Processing date time", 20, Encoding::Ascii),
    );
    fields.insert(
        fields::APPROVAL_CODE,
        FieldSpec::fixed("Approval Code", 2, Encoding::Ascii),
    );
    fields.insert(
        fields::AUTHORIZATION_CODE,
        FieldSpec::fixed("Authorization Code", 6, Encoding::Ascii),
    );
    fields.insert(
        fields::CURRENCY,
        FieldSpec::fixed("Currency Code", 3, Encoding::Ascii),
    );
    fields.insert(
        fields::CVV,
        FieldSpec::fixed("Card Verification Value", 4, Encoding::Ascii),
    );
    fields.insert(
        fields::EXPIRATION,
        FieldSpec::fixed("Expiration Date", 4, Encoding::Ascii),
    );

    let mut acceptor = BTreeMap::new();
    acceptor.insert(
        fields::acceptor::MERCHANT_NAME,
        FieldSpec::ll("Merchant Name", 99, Encoding::Ascii),
    );
    acceptor.insert(
        fields::acceptor::MCC,
        FieldSpec::fixed("MCC", 4, Encoding::Ascii),
    );
    acceptor.insert(
        fields::acceptor::POSTAL_CODE,
        FieldSpec::ll("Postal Code", 10, Encoding::Ascii),
    );
    acceptor.insert(
        fields::acceptor::MERCHANT_URL,
        FieldSpec::lll("Merchant URL", 299, Encoding::Ascii),
    );

    fields.insert(
        fields::ACCEPTOR_INFO,
        FieldSpec {
            description: "Acceptor Information",
            length: 999,
            encoding: Encoding::Ascii,
            prefix: LengthPrefix::LLL,
            pad: None,
            composite: Some(CompositeSpec {
                tag_length: 2,
                subfields: acceptor,
            }),
        },
    );

    fields.insert(
        fields::STAN,
        FieldSpec::fixed("System Trace Audit Number (STAN)", 6, Encoding::Ascii),
    );

    MessageSpec {
        name: "Tap-to-auth ISO 8583 Specification",
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_spec_shape() {
        let spec = auth_spec();
        assert_eq!(spec.field(fields::PAN).unwrap().length, 16);
        assert_eq!(spec.field(fields::AMOUNT).unwrap().pad, Some('0'));
        assert!(spec.field(12).is_none());

        // MTI and bitmap are structural, not dictionary entries
        assert!(spec.field(0).is_none());
        assert!(spec.field(1).is_none());

        let acceptor = spec
            .field(fields::ACCEPTOR_INFO)
            .unwrap()
            .composite
            .as_ref()
            .unwrap();
        assert_eq!(acceptor.tag_length, 2);

        // wire order is numeric-ascending
        let tags: Vec<&str> = acceptor.subfields.keys().copied().collect();
        assert_eq!(tags, vec!["01", "02", "03", "04"]);
    }
}
