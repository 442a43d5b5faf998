//! BER-TLV tree codec
//!
//! Decodes a byte stream into a tree of tag-length-value nodes and encodes
//! it back. Tags are kept as canonical uppercase hex strings so callers can
//! search with the familiar EMV spelling ("9F38", "5A", ...). A node is
//! constructed when bit 6 of its first tag byte is set; its value is then
//! recursively decoded into children.

use thiserror::Error;

/// Errors produced while decoding or encoding a TLV stream
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TlvError {
    /// The stream ended in the middle of a tag, length or value
    #[error("unexpected end of TLV stream")]
    Truncated,

    /// Tag or length uses a form we do not support (tags longer than three
    /// bytes, indefinite lengths)
    #[error("reserved tag or length form near {0}")]
    ReservedForm(String),

    /// A long-form length does not fit in the stream
    #[error("length {0} overflows the stream")]
    LengthOverflow(usize),

    /// A tag string could not be interpreted as hex bytes
    #[error("invalid tag {0}")]
    InvalidTag(String),
}

/// A single TLV node
///
/// Primitive nodes carry their payload in `value` and have no children.
/// Constructed nodes carry their decoded payload in `children`; `value`
/// stays empty and is recomputed on encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    /// Canonical uppercase hex tag, e.g. "84" or "9F38"
    pub tag: String,
    pub value: Vec<u8>,
    pub children: Vec<Tlv>,
}

impl Tlv {
    /// Create a primitive node
    pub fn primitive(tag: &str, value: Vec<u8>) -> Self {
        Self {
            tag: tag.to_uppercase(),
            value,
            children: Vec::new(),
        }
    }

    /// Create a constructed node from its children
    pub fn constructed(tag: &str, children: Vec<Tlv>) -> Self {
        Self {
            tag: tag.to_uppercase(),
            value: Vec::new(),
            children,
        }
    }

    /// Whether the tag marks this node as constructed (bit 6 of the first
    /// tag byte)
    pub fn is_constructed(&self) -> bool {
        tag_is_constructed(&self.tag)
    }

    /// Value interpreted as ASCII text, for tags like 50 and 5F20
    pub fn ascii_value(&self) -> String {
        String::from_utf8_lossy(&self.value).to_string()
    }

    /// Value as uppercase hex, for tags like 5A and 5F24
    pub fn hex_value(&self) -> String {
        hex::encode_upper(&self.value)
    }
}

fn tag_is_constructed(tag: &str) -> bool {
    u8::from_str_radix(&tag[..2.min(tag.len())], 16)
        .map(|b| b & 0x20 != 0)
        .unwrap_or(false)
}

/// Decode a complete TLV stream into a list of sibling nodes
///
/// Empty input yields an empty list. Constructed values are decoded
/// recursively.
pub fn decode(data: &[u8]) -> Result<Vec<Tlv>, TlvError> {
    let mut nodes = Vec::new();
    let mut pos = 0;

    while pos < data.len() {
        let (node, used) = decode_node(&data[pos..])?;
        nodes.push(node);
        pos += used;
    }

    Ok(nodes)
}

fn decode_node(data: &[u8]) -> Result<(Tlv, usize), TlvError> {
    let (tag, tag_len) = read_tag(data)?;
    let (value_len, len_len) = read_length(&data[tag_len..])?;

    let value_start = tag_len + len_len;
    let value_end = value_start + value_len;
    if value_end > data.len() {
        return Err(TlvError::Truncated);
    }

    let raw_value = &data[value_start..value_end];
    let tag_hex = hex::encode_upper(&tag);

    let node = if tag[0] & 0x20 != 0 {
        Tlv {
            tag: tag_hex,
            value: Vec::new(),
            children: decode(raw_value)?,
        }
    } else {
        Tlv {
            tag: tag_hex,
            value: raw_value.to_vec(),
            children: Vec::new(),
        }
    };

    Ok((node, value_end))
}

/// Read a 1-3 byte tag from the head of `data`
///
/// Multi-byte form: the low 5 bits of the first byte are all set, and
/// subsequent bytes continue while bit 8 of the previous byte is set.
pub(crate) fn read_tag(data: &[u8]) -> Result<(Vec<u8>, usize), TlvError> {
    let first = *data.first().ok_or(TlvError::Truncated)?;
    let mut tag = vec![first];

    if first & 0x1F == 0x1F {
        loop {
            let next = *data.get(tag.len()).ok_or(TlvError::Truncated)?;
            tag.push(next);

            if next & 0x80 == 0 {
                break;
            }
            if tag.len() >= 3 {
                return Err(TlvError::ReservedForm(hex::encode_upper(&tag)));
            }
        }
    }

    let len = tag.len();
    Ok((tag, len))
}

fn read_length(data: &[u8]) -> Result<(usize, usize), TlvError> {
    let first = *data.first().ok_or(TlvError::Truncated)?;

    if first & 0x80 == 0 {
        return Ok((first as usize, 1));
    }

    let count = (first & 0x7F) as usize;
    if count == 0 {
        // indefinite length is not part of EMV BER-TLV
        return Err(TlvError::ReservedForm(format!("{first:02X}")));
    }
    if count > 4 {
        return Err(TlvError::LengthOverflow(count));
    }
    if 1 + count > data.len() {
        return Err(TlvError::Truncated);
    }

    let mut value_len = 0usize;
    for &b in &data[1..1 + count] {
        value_len = (value_len << 8) | b as usize;
    }

    Ok((value_len, 1 + count))
}

/// Encode a list of nodes back to bytes, recomputing all lengths
pub fn encode(nodes: &[Tlv]) -> Result<Vec<u8>, TlvError> {
    let mut out = Vec::new();

    for node in nodes {
        let tag =
            hex::decode(&node.tag).map_err(|_| TlvError::InvalidTag(node.tag.clone()))?;
        if tag.is_empty() || tag.len() > 3 {
            return Err(TlvError::InvalidTag(node.tag.clone()));
        }

        let value = if node.is_constructed() {
            encode(&node.children)?
        } else {
            node.value.clone()
        };

        out.extend_from_slice(&tag);
        write_length(&mut out, value.len());
        out.extend_from_slice(&value);
    }

    Ok(out)
}

fn write_length(out: &mut Vec<u8>, len: usize) {
    if len < 0x80 {
        out.push(len as u8);
        return;
    }

    let bytes = len.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count();
    let significant = &bytes[skip..];
    out.push(0x80 | significant.len() as u8);
    out.extend_from_slice(significant);
}

/// Find the first node with the given tag, depth first
pub fn find_first<'a>(nodes: &'a [Tlv], tag: &str) -> Option<&'a Tlv> {
    for node in nodes {
        if node.tag == tag {
            return Some(node);
        }
        if let Some(found) = find_first(&node.children, tag) {
            return Some(found);
        }
    }
    None
}

/// Copy the nodes matching `tags`, preserving encounter order
///
/// Primitive matches are copied by value. A constructed node that does not
/// itself match is reconstructed only when one of its descendants matches.
pub fn copy_tags(nodes: &[Tlv], tags: &[&str]) -> Vec<Tlv> {
    let mut out = Vec::new();

    for node in nodes {
        if tags.contains(&node.tag.as_str()) {
            out.push(node.clone());
            continue;
        }

        if !node.children.is_empty() {
            let kept = copy_tags(&node.children, tags);
            if !kept.is_empty() {
                out.push(Tlv::constructed(&node.tag, kept));
            }
        }
    }

    out
}

/// Render a tree for log output
pub fn pretty_print(nodes: &[Tlv]) -> String {
    let mut out = String::new();
    render(nodes, 0, &mut out);
    out
}

fn render(nodes: &[Tlv], depth: usize, out: &mut String) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        let name = crate::tags::tag_name(&node.tag);
        if node.children.is_empty() {
            out.push_str(&format!(
                "{indent}{} ({name}): {}\n",
                node.tag,
                hex::encode_upper(&node.value)
            ));
        } else {
            out.push_str(&format!("{indent}{} ({name})\n", node.tag));
            render(&node.children, depth + 1, out);
        }
    }
}
