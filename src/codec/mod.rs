//! Codec module - byte-exact OSC encoding and decoding.
//!
//! The building blocks live in two halves:
//!
//! - [`writer`]: `write_padded_string`, `write_arguments`, `write_message`,
//!   `write_bundle`, `write_package` (append to any `BufMut`)
//! - [`reader`]: the matching `read_*` functions (consume from any `Buf`)
//!
//! [`OscCodec`] wraps them for the common "whole package to/from bytes" case.
//!
//! # Example
//!
//! ```
//! use oscwire::codec::OscCodec;
//! use oscwire::protocol::{Message, Package};
//!
//! let msg = Message::new("/mixer/gain").arg(0.5f32).arg("main");
//! let bytes = OscCodec::encode(&msg.clone().into()).unwrap();
//! assert_eq!(bytes.len() % 4, 0);
//!
//! let decoded = OscCodec::decode(&bytes).unwrap();
//! assert_eq!(decoded, Package::Message(msg));
//! ```

pub mod reader;
pub mod writer;

use bytes::{Bytes, BytesMut};

use crate::error::Result;
use crate::protocol::Package;

pub use reader::{
    read_arguments, read_bundle, read_message, read_package, read_padded_string,
};
pub use writer::{
    write_arguments, write_bundle, write_message, write_package, write_padded_string,
};

/// Whole-package codec.
///
/// A marker struct with static methods, like the per-field functions it wraps.
pub struct OscCodec;

impl OscCodec {
    /// Encode a package into a fresh buffer.
    pub fn encode(package: &Package) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(64);
        write_package(&mut buf, package)?;
        Ok(buf.freeze())
    }

    /// Encode a package, appending to `buf`.
    #[inline]
    pub fn encode_into(package: &Package, buf: &mut BytesMut) -> Result<()> {
        write_package(buf, package)
    }

    /// Decode exactly one package from the front of `bytes`.
    ///
    /// Bytes after a complete message are ignored.
    #[inline]
    pub fn decode(bytes: &[u8]) -> Result<Package> {
        let mut input = bytes;
        read_package(&mut input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OscError;
    use crate::protocol::{Bundle, Message, Timetag};

    #[test]
    fn test_message_round_trip() {
        let msg = Message::new("/info").arg(1.0f32).arg("Test").arg(2i32);
        let pkg = Package::from(msg);
        let bytes = OscCodec::encode(&pkg).unwrap();
        assert_eq!(OscCodec::decode(&bytes).unwrap(), pkg);
    }

    #[test]
    fn test_bundle_round_trip() {
        let pkg = Package::from(
            Bundle::new(Timetag(99))
                .with_name("TestName")
                .message(Message::new("/info"))
                .bundle(Bundle::new(Timetag(100)).message(Message::new("/deep").arg(3i32))),
        );
        let bytes = OscCodec::encode(&pkg).unwrap();
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(OscCodec::decode(&bytes).unwrap(), pkg);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes_after_message() {
        let pkg = Package::from(Message::new("/x").arg(5i32));
        let mut bytes = BytesMut::new();
        OscCodec::encode_into(&pkg, &mut bytes).unwrap();
        bytes.extend_from_slice(&[0xAA; 7]);
        assert_eq!(OscCodec::decode(&bytes).unwrap(), pkg);
    }

    #[test]
    fn test_encode_into_appends() {
        let mut buf = BytesMut::from(&b"keep"[..]);
        OscCodec::encode_into(&Message::new("/a").into(), &mut buf).unwrap();
        assert_eq!(&buf[..4], b"keep");
        assert_eq!(&buf[4..8], b"/a\0\0");
    }

    #[test]
    fn test_encode_rejects_bad_address() {
        let err = OscCodec::encode(&Message::new("").into()).unwrap_err();
        assert!(matches!(err, OscError::InvalidAddress(_)));
    }
}
