//! Error types for oscwire.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Main error type for all OSC operations.
#[derive(Debug, Error)]
pub enum OscError {
    /// I/O error during socket operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Input ended before a complete element was read.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// A padded string was not valid UTF-8.
    #[error("invalid UTF-8 in string: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// The argument block did not start with a `,` type tag string.
    #[error("missing type tag string")]
    MissingTypeTags,

    /// A type tag the codec does not know how to read.
    #[error("unknown type tag '{0}'")]
    UnknownTypeTag(char),

    /// The leading byte is neither a bundle marker nor an address.
    #[error("unsupported package type (leading byte 0x{0:02X})")]
    UnsupportedPackage(u8),

    /// Message address is empty or does not start with `/`.
    #[error("invalid OSC address: {0:?}")]
    InvalidAddress(String),

    /// A string to encode contains an interior NUL byte.
    #[error("string contains a NUL byte")]
    InvalidString,

    /// Structural inconsistency in the encoded package.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Encoded package does not fit in a single datagram.
    #[error("package of {size} bytes exceeds limit of {limit} bytes")]
    PackageTooLarge { size: usize, limit: usize },

    /// A datagram was received but could not be decoded.
    #[error("malformed package from {peer}: {source}")]
    Malformed {
        peer: SocketAddr,
        #[source]
        source: Box<OscError>,
    },

    /// An address string did not resolve to any socket address.
    #[error("could not resolve address {0:?}")]
    AddressResolution(String),

    /// Client handler pattern is not a valid regular expression.
    #[error("invalid address pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// No reply arrived before the call deadline.
    #[error("no reply on {address} within {timeout:?}")]
    CallTimeout { address: String, timeout: Duration },

    /// A later call to the same address took over the pending slot.
    #[error("pending call on {0} was superseded by a newer call")]
    CallSuperseded(String),

    /// Transport closed or receive loop stopped.
    #[error("connection closed")]
    ConnectionClosed,
}

impl OscError {
    /// Whether a receive loop may keep running after this error.
    ///
    /// Only undecodable datagrams are recoverable; everything else means the
    /// transport itself is gone.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, OscError::Malformed { .. })
    }

    pub(crate) fn malformed(peer: SocketAddr, source: OscError) -> Self {
        OscError::Malformed {
            peer,
            source: Box::new(source),
        }
    }
}

/// Result type alias using OscError.
pub type Result<T> = std::result::Result<T, OscError>;
