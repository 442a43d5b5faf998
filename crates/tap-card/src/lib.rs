//! tap-card - card-facing half of the payment pipeline
//!
//! Frames ISO 7816 APDUs, talks to PC/SC readers, and drives the EMV
//! contactless kernels that turn a tap into an ordered set of TLV tags.

pub mod apdu;
pub mod kernel;
pub mod reader;
pub mod status;
pub mod terminal;

mod error;

pub use apdu::{ApduCommand, ApduResponse};
pub use error::CardError;
pub use kernel::{ApduTransport, Kernel, KernelKind, TagsDb};
pub use reader::{CardReader, WaitOutcome};
pub use status::{StatusWord, SwCategory};
pub use terminal::{Terminal, Transaction};
