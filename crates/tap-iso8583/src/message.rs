//! Message packing and unpacking
//!
//! A message is an MTI plus a sparse map of populated fields. Bitmaps are
//! computed from the populated set on pack and verified on unpack; they are
//! never stored in the map.

use std::collections::BTreeMap;

use crate::error::Iso8583Error;
use crate::spec::{FieldSpec, LengthPrefix, MessageSpec};

/// Value of one populated field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Text(String),
    /// Subfield tag -> value for composite fields
    Composite(BTreeMap<String, String>),
}

/// A sparse ISO 8583 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub mti: String,
    fields: BTreeMap<u64, FieldValue>,
}

impl Message {
    pub fn new(mti: &str) -> Self {
        Self {
            mti: mti.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Populate a simple field
    pub fn set(&mut self, number: u64, value: impl Into<String>) -> &mut Self {
        self.fields.insert(number, FieldValue::Text(value.into()));
        self
    }

    /// Populate one subfield of a composite field
    pub fn set_subfield(
        &mut self,
        number: u64,
        tag: &str,
        value: impl Into<String>,
    ) -> &mut Self {
        let entry = self
            .fields
            .entry(number)
            .or_insert_with(|| FieldValue::Composite(BTreeMap::new()));

        if let FieldValue::Composite(map) = entry {
            map.insert(tag.to_string(), value.into());
        }
        self
    }

    /// Value of a simple field, if populated
    pub fn get(&self, number: u64) -> Option<&str> {
        match self.fields.get(&number) {
            Some(FieldValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    /// Value of a composite subfield, if populated
    pub fn subfield(&self, number: u64, tag: &str) -> Option<&str> {
        match self.fields.get(&number) {
            Some(FieldValue::Composite(map)) => map.get(tag).map(String::as_str),
            _ => None,
        }
    }

    /// Numbers of the populated fields, ascending
    pub fn field_numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.fields.keys().copied()
    }

    /// Compute the primary (and, when needed, secondary) bitmap
    pub(crate) fn bitmaps(&self) -> ([u8; 8], Option<[u8; 8]>) {
        let mut primary = [0u8; 8];
        let mut secondary = [0u8; 8];
        let mut has_secondary = false;

        for &number in self.fields.keys() {
            if (2..=64).contains(&number) {
                set_bit(&mut primary, number);
            } else if (65..=128).contains(&number) {
                set_bit(&mut secondary, number - 64);
                has_secondary = true;
            }
        }

        if has_secondary {
            set_bit(&mut primary, 1);
        }

        (primary, has_secondary.then_some(secondary))
    }

    /// Serialize per the specification
    pub fn pack(&self, spec: &MessageSpec) -> Result<Vec<u8>, Iso8583Error> {
        if self.mti.len() != 4 || !self.mti.is_ascii() {
            return Err(Iso8583Error::InvalidMti(self.mti.clone()));
        }

        let mut out = Vec::new();
        out.extend_from_slice(self.mti.as_bytes());

        let (primary, secondary) = self.bitmaps();
        out.extend_from_slice(&primary);
        if let Some(secondary) = secondary {
            out.extend_from_slice(&secondary);
        }

        for (&number, value) in &self.fields {
            if !(2..=128).contains(&number) {
                return Err(Iso8583Error::UnknownField(number));
            }
            let field_spec = spec
                .field(number)
                .ok_or(Iso8583Error::UnknownField(number))?;
            pack_field(&mut out, number, field_spec, value)?;
        }

        Ok(out)
    }

    /// Parse bytes produced by [`Message::pack`]
    pub fn unpack(data: &[u8], spec: &MessageSpec) -> Result<Self, Iso8583Error> {
        let mut cursor = Cursor::new(data);

        let mti = String::from_utf8(cursor.take(4, "MTI")?.to_vec())
            .map_err(|_| Iso8583Error::InvalidMti(String::new()))?;

        let primary: Vec<u8> = cursor.take(8, "primary bitmap")?.to_vec();
        let mut numbers = bits_of(&primary, 0);

        if primary[0] & 0x80 != 0 {
            let secondary = cursor.take(8, "secondary bitmap")?.to_vec();
            numbers.extend(bits_of(&secondary, 64));
        }

        let mut message = Message::new(&mti);

        for number in numbers {
            let field_spec = spec
                .field(number)
                .ok_or(Iso8583Error::UnknownField(number))?;
            let value = unpack_field(&mut cursor, number, field_spec)?;
            message.fields.insert(number, value);
        }

        if !cursor.is_empty() {
            return Err(Iso8583Error::Field {
                field: 0,
                name: "message",
                reason: format!("{} trailing bytes after the last field", cursor.remaining()),
            });
        }

        Ok(message)
    }
}

fn set_bit(bitmap: &mut [u8; 8], bit: u64) {
    bitmap[((bit - 1) / 8) as usize] |= 0x80 >> ((bit - 1) % 8);
}

/// Field numbers announced by a bitmap; bit 1 of the primary bitmap is the
/// secondary-bitmap indicator, not a field
fn bits_of(bitmap: &[u8], offset: u64) -> Vec<u64> {
    let mut numbers = Vec::new();
    for (byte_index, byte) in bitmap.iter().enumerate() {
        for bit_index in 0..8 {
            if byte & (0x80 >> bit_index) != 0 {
                let bit = byte_index as u64 * 8 + bit_index as u64 + 1;
                if offset == 0 && bit == 1 {
                    continue;
                }
                numbers.push(offset + bit);
            }
        }
    }
    numbers
}

fn pack_field(
    out: &mut Vec<u8>,
    number: u64,
    field_spec: &FieldSpec,
    value: &FieldValue,
) -> Result<(), Iso8583Error> {
    match (&field_spec.composite, value) {
        (Some(composite), FieldValue::Composite(map)) => {
            for tag in map.keys() {
                if !composite.subfields.contains_key(tag.as_str()) {
                    return Err(Iso8583Error::UnknownSubfield(tag.clone()));
                }
            }

            let mut content = Vec::new();
            for (tag, sub_spec) in &composite.subfields {
                if let Some(sub_value) = map.get(*tag) {
                    content.extend_from_slice(tag.as_bytes());
                    pack_simple(&mut content, number, sub_spec, sub_value)?;
                }
            }

            write_prefix(out, number, field_spec, content.len())?;
            out.extend_from_slice(&content);
            Ok(())
        }
        (None, FieldValue::Text(text)) => pack_simple(out, number, field_spec, text),
        _ => Err(Iso8583Error::Field {
            field: number,
            name: field_spec.description,
            reason: "value shape does not match the specification".to_string(),
        }),
    }
}

fn pack_simple(
    out: &mut Vec<u8>,
    number: u64,
    field_spec: &FieldSpec,
    value: &str,
) -> Result<(), Iso8583Error> {
    let padded = match (field_spec.prefix, field_spec.pad) {
        (LengthPrefix::Fixed, Some(pad)) if value.len() < field_spec.length => {
            let fill: String = std::iter::repeat(pad)
                .take(field_spec.length - value.len())
                .collect();
            format!("{fill}{value}")
        }
        _ => value.to_string(),
    };

    match field_spec.prefix {
        LengthPrefix::Fixed if padded.len() != field_spec.length => {
            return Err(Iso8583Error::Field {
                field: number,
                name: field_spec.description,
                reason: format!(
                    "needs exactly {} characters, got {}",
                    field_spec.length,
                    padded.len()
                ),
            });
        }
        LengthPrefix::LL | LengthPrefix::LLL if padded.len() > field_spec.length => {
            return Err(Iso8583Error::Field {
                field: number,
                name: field_spec.description,
                reason: format!(
                    "at most {} characters, got {}",
                    field_spec.length,
                    padded.len()
                ),
            });
        }
        _ => {}
    }

    let encoded = field_spec.encoding.encode(&padded).map_err(|err| match err {
        Iso8583Error::Field { reason, .. } => Iso8583Error::Field {
            field: number,
            name: field_spec.description,
            reason,
        },
        other => other,
    })?;

    write_prefix(out, number, field_spec, encoded.len())?;
    out.extend_from_slice(&encoded);
    Ok(())
}

fn write_prefix(
    out: &mut Vec<u8>,
    number: u64,
    field_spec: &FieldSpec,
    byte_len: usize,
) -> Result<(), Iso8583Error> {
    let (digits, max) = match field_spec.prefix {
        LengthPrefix::Fixed => return Ok(()),
        LengthPrefix::LL => (2, 99),
        LengthPrefix::LLL => (3, 999),
    };

    if byte_len > max {
        return Err(Iso8583Error::Field {
            field: number,
            name: field_spec.description,
            reason: format!("{byte_len} bytes does not fit an {digits}-digit prefix"),
        });
    }

    out.extend_from_slice(format!("{byte_len:0digits$}").as_bytes());
    Ok(())
}

fn unpack_field(
    cursor: &mut Cursor,
    number: u64,
    field_spec: &FieldSpec,
) -> Result<FieldValue, Iso8583Error> {
    match &field_spec.composite {
        Some(composite) => {
            let content_len = read_prefix(cursor, field_spec)?;
            let content = cursor.take(content_len, field_spec.description)?.to_vec();
            let mut inner = Cursor::new(&content);

            let mut map = BTreeMap::new();
            while !inner.is_empty() {
                let tag = String::from_utf8(
                    inner.take(composite.tag_length, "composite tag")?.to_vec(),
                )
                .map_err(|_| Iso8583Error::UnknownSubfield("<non-ascii>".to_string()))?;

                let sub_spec = composite
                    .subfields
                    .get(tag.as_str())
                    .ok_or_else(|| Iso8583Error::UnknownSubfield(tag.clone()))?;

                let value = unpack_simple(&mut inner, number, sub_spec)?;
                map.insert(tag, value);
            }

            Ok(FieldValue::Composite(map))
        }
        None => Ok(FieldValue::Text(unpack_simple(cursor, number, field_spec)?)),
    }
}

fn unpack_simple(
    cursor: &mut Cursor,
    number: u64,
    field_spec: &FieldSpec,
) -> Result<String, Iso8583Error> {
    let byte_len = match field_spec.prefix {
        LengthPrefix::Fixed => field_spec.encoding.byte_len(field_spec.length),
        _ => read_prefix(cursor, field_spec)?,
    };

    let chars = match field_spec.prefix {
        LengthPrefix::Fixed => field_spec.length,
        // variable fields in this dictionary are ASCII: bytes == chars
        _ => byte_len,
    };

    let bytes = cursor.take(byte_len, field_spec.description)?;
    let value = field_spec.encoding.decode(bytes, chars).map_err(|err| {
        match err {
            Iso8583Error::Field { reason, .. } => Iso8583Error::Field {
                field: number,
                name: field_spec.description,
                reason,
            },
            other => other,
        }
    })?;

    Ok(strip_padding(value, field_spec.pad))
}

fn read_prefix(cursor: &mut Cursor, field_spec: &FieldSpec) -> Result<usize, Iso8583Error> {
    let digits = match field_spec.prefix {
        LengthPrefix::Fixed => return Ok(field_spec.length),
        LengthPrefix::LL => 2,
        LengthPrefix::LLL => 3,
    };

    let raw = cursor.take(digits, "length prefix")?;
    let text = std::str::from_utf8(raw).map_err(|_| Iso8583Error::Truncated("length prefix"))?;
    text.parse()
        .map_err(|_| Iso8583Error::Truncated("length prefix"))
}

fn strip_padding(value: String, pad: Option<char>) -> String {
    match pad {
        Some(pad) => {
            let stripped = value.trim_start_matches(pad);
            if stripped.is_empty() {
                value.chars().last().map(String::from).unwrap_or_default()
            } else {
                stripped.to_string()
            }
        }
        None => value,
    }
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, count: usize, what: &'static str) -> Result<&'a [u8], Iso8583Error> {
        if self.pos + count > self.data.len() {
            return Err(Iso8583Error::Truncated(what));
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}
