use thiserror::Error;

/// Errors raised by the codec and the framed transport
#[derive(Debug, Error)]
pub enum Iso8583Error {
    #[error("message ended while reading {0}")]
    Truncated(&'static str),

    /// A bitmap bit is set for a field the specification does not define
    #[error("field {0} is set in the bitmap but not defined in the specification")]
    UnknownField(u64),

    #[error("composite tag {0:?} is not defined in the specification")]
    UnknownSubfield(String),

    #[error("field {field} ({name}): {reason}")]
    Field {
        field: u64,
        name: &'static str,
        reason: String,
    },

    #[error("MTI must be 4 ASCII characters, got {0:?}")]
    InvalidMti(String),

    #[error("frame of {0} bytes does not fit a 2-byte length prefix")]
    FrameTooLarge(usize),

    #[error("connection closed before a reply arrived")]
    ConnectionClosed,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// An upstream handler refused the request; the connection is closed
    #[error("handler failed: {0}")]
    Handler(String),
}
