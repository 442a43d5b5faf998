//! tap-iso8583 - authorization wire protocol
//!
//! A spec-driven ISO 8583 codec plus the length-prefixed TCP transport the
//! acquirer and issuer speak over. The message dictionary is fixed (see
//! [`spec::auth_spec`]); packing and unpacking are pure functions of it.

mod client;
mod encoding;
mod error;
mod message;
mod server;

pub mod spec;

pub use client::Client;
pub use encoding::Encoding;
pub use error::Iso8583Error;
pub use message::{FieldValue, Message};
pub use server::{LengthPrefixedCodec, MessageHandler, Server};

/// MTI of an authorization request
pub const MTI_AUTHORIZATION_REQUEST: &str = "0100";
/// MTI of an authorization response
pub const MTI_AUTHORIZATION_RESPONSE: &str = "0110";

/// Approval code values carried in field 5
pub mod approval {
    pub const APPROVED: &str = "00";
    pub const INVALID_CARD: &str = "14";
    pub const INSUFFICIENT_FUNDS: &str = "51";
}

/// Currency codes as they appear in field 7
pub mod currency {
    /// ISO 4217 alphabetic code to the numeric code used on the wire
    pub fn numeric(alpha: &str) -> Option<&'static str> {
        match alpha {
            "USD" => Some("840"),
            "EUR" => Some("978"),
            "GBP" => Some("826"),
            _ => None,
        }
    }

    /// Numeric wire code back to the alphabetic code
    pub fn alpha(numeric: &str) -> Option<&'static str> {
        match numeric {
            "840" => Some("USD"),
            "978" => Some("EUR"),
            "826" => Some("GBP"),
            _ => None,
        }
    }

}
