//! EMV contactless kernels
//!
//! A kernel drives the SELECT / GPO / READ RECORD conversation with a card
//! and fills a [`TagsDb`] with the harvested TLVs, in card-response order.
//! Two variants share the same contract: the FTDC kernel for the workshop
//! card profile and the universal kernel for real contactless cards.

mod ftdc;
mod universal;

pub use ftdc::FtdcKernel;
pub use universal::{Aip, ApplicationInfo, UniversalKernel};

use crate::apdu::{ApduCommand, ApduResponse};
use crate::error::CardError;
use crate::status::StatusWord;
use tap_emv::Tlv;

/// Anything that can carry an APDU exchange: a PC/SC reader in production,
/// a scripted channel in tests
pub trait ApduTransport {
    fn transmit(&mut self, command: &ApduCommand) -> Result<ApduResponse, CardError>;
}

/// Ordered collection of tags harvested during one card flow
#[derive(Debug, Default, Clone)]
pub struct TagsDb {
    tags: Vec<Tlv>,
}

impl TagsDb {
    pub fn push(&mut self, tlv: Tlv) {
        self.tags.push(tlv);
    }

    pub fn extend(&mut self, tlvs: impl IntoIterator<Item = Tlv>) {
        self.tags.extend(tlvs);
    }

    /// First harvested node with this tag, in encounter order
    pub fn find(&self, tag: &str) -> Option<&Tlv> {
        tap_emv::find_first(&self.tags, tag)
    }

    pub fn tags(&self) -> &[Tlv] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Common contract of the contactless kernels
pub trait Kernel {
    /// Run the full flow against a card, returning the harvested tags
    fn process(&mut self, transport: &mut dyn ApduTransport) -> Result<TagsDb, CardError>;
}

/// Which kernel variant a terminal is configured to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelKind {
    #[default]
    Ftdc,
    Universal,
}

impl std::str::FromStr for KernelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ftdc" => Ok(Self::Ftdc),
            "universal" => Ok(Self::Universal),
            other => Err(format!("unknown kernel {other:?}, expected ftdc or universal")),
        }
    }
}

/// Turn a non-9000 response into an error carrying the status description
pub(crate) fn expect_success(response: ApduResponse) -> Result<ApduResponse, CardError> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(CardError::Status(StatusWord(response.status_word())))
    }
}
