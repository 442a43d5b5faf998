use thiserror::Error;

use crate::status::StatusWord;

/// Errors surfaced by the card-facing components
#[derive(Debug, Error)]
pub enum CardError {
    /// PC/SC transport failure; propagated unchanged
    #[error("transport failure: {0}")]
    Transport(#[from] pcsc::Error),

    /// The card answered with a non-9000 status word
    #[error("card returned {0}")]
    Status(StatusWord),

    #[error(transparent)]
    Tlv(#[from] tap_emv::TlvError),

    /// A response shorter than a status word, or a malformed command frame
    #[error("response shorter than a status word")]
    ShortResponse,

    /// A template or tag the flow depends on is absent from the response
    #[error("tag {0} not found in card response")]
    MissingTag(&'static str),

    /// None of the candidate applications could be selected
    #[error("no supported application found on card")]
    NoApplication,

    /// Malformed card data outside the TLV layer (AFL quartets, AIP length)
    #[error("malformed card data: {0}")]
    Malformed(String),

    #[error("no card reader selected")]
    NoReaderSelected,

    #[error("timed out waiting for card")]
    Timeout,
}
