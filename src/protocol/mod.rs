//! Protocol module - package model and wire constants.
//!
//! This module defines the data moved by the codec and transports:
//! - [`Package`]: a [`Message`] or a [`Bundle`]
//! - [`Argument`]: one typed message argument
//! - [`Timetag`]: the opaque 64-bit bundle timestamp
//! - wire constants (bundle marker, type tags, alignment)

mod bundle;
mod message;
mod package;
mod timetag;
mod wire_format;

pub use bundle::Bundle;
pub use message::{Argument, Message};
pub use package::{Package, PackageType};
pub use timetag::Timetag;
pub use wire_format::{
    pad_len, padded_string_len, tags, ADDRESS_PREFIX, ALIGNMENT, BUNDLE_MARKER, BUNDLE_PREFIX,
    MAX_BUNDLE_DEPTH, MAX_DATAGRAM_SIZE, TYPE_TAG_PREFIX,
};
