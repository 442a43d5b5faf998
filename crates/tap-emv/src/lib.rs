//! tap-emv - BER-TLV codec and shared EMV data structures
//!
//! Everything that crosses the card, the terminal and the acquirer is
//! BER-TLV encoded. This crate owns the tree codec, the Data Object List
//! parser and the tag dictionary used by the rest of the workspace.

mod dol;
mod tlv;

pub mod tags;

pub use dol::{parse_dol, DolEntry};
pub use tlv::{copy_tags, decode, encode, find_first, pretty_print, Tlv, TlvError};
