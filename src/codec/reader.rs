//! Decoding side of the OSC binary format.
//!
//! Every function consumes from a [`Buf`] and fails on the first structural
//! problem; nothing is recovered from a partially valid package.

use bytes::Buf;

use crate::error::{OscError, Result};
use crate::protocol::{
    pad_len, tags, Argument, Bundle, Message, Package, Timetag, ADDRESS_PREFIX, BUNDLE_MARKER,
    BUNDLE_PREFIX, MAX_BUNDLE_DEPTH, TYPE_TAG_PREFIX,
};

#[inline]
fn ensure<B: Buf>(buf: &B, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(OscError::UnexpectedEof);
    }
    Ok(())
}

#[inline]
fn peek_u8<B: Buf>(buf: &B) -> Result<u8> {
    buf.chunk().first().copied().ok_or(OscError::UnexpectedEof)
}

fn read_padded_bytes<B: Buf>(buf: &mut B) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    loop {
        if !buf.has_remaining() {
            return Err(OscError::UnexpectedEof);
        }
        match buf.get_u8() {
            0 => break,
            b => bytes.push(b),
        }
    }
    let pad = pad_len(bytes.len() + 1);
    ensure(buf, pad)?;
    buf.advance(pad);
    Ok(bytes)
}

/// Read a NUL-terminated string and skip its padding.
///
/// Fails with [`OscError::UnexpectedEof`] if the input ends before the
/// terminator or inside the padding.
pub fn read_padded_string<B: Buf>(buf: &mut B) -> Result<String> {
    Ok(String::from_utf8(read_padded_bytes(buf)?)?)
}

fn read_argument<B: Buf>(buf: &mut B, tag: u8) -> Result<Argument> {
    let arg = match tag {
        tags::INT => {
            ensure(buf, 4)?;
            Argument::Int(buf.get_i32())
        }
        tags::FLOAT => {
            ensure(buf, 4)?;
            Argument::Float(buf.get_f32())
        }
        tags::STRING => Argument::String(read_padded_string(buf)?),
        tags::BLOB => {
            ensure(buf, 4)?;
            let len = buf.get_u32() as usize;
            let pad = pad_len(len);
            ensure(buf, len + pad)?;
            let blob = buf.copy_to_bytes(len);
            buf.advance(pad);
            Argument::Blob(blob)
        }
        tags::LONG => {
            ensure(buf, 8)?;
            Argument::Long(buf.get_i64())
        }
        tags::DOUBLE => {
            ensure(buf, 8)?;
            Argument::Double(buf.get_f64())
        }
        tags::TIMETAG => {
            ensure(buf, 8)?;
            Argument::Timetag(Timetag(buf.get_u64()))
        }
        tags::CHAR => {
            ensure(buf, 4)?;
            let code = buf.get_u32();
            let c = char::from_u32(code).ok_or_else(|| {
                OscError::Protocol(format!("invalid char code point 0x{:X}", code))
            })?;
            Argument::Char(c)
        }
        tags::TRUE => Argument::Bool(true),
        tags::FALSE => Argument::Bool(false),
        tags::NIL => Argument::Nil,
        tags::IMPULSE => Argument::Impulse,
        other => return Err(OscError::UnknownTypeTag(other as char)),
    };
    Ok(arg)
}

/// Read the type tag string, then one argument per tag.
pub fn read_arguments<B: Buf>(buf: &mut B) -> Result<Vec<Argument>> {
    let type_tags = read_padded_bytes(buf)?;
    let (&prefix, tag_chars) = type_tags.split_first().ok_or(OscError::MissingTypeTags)?;
    if prefix != TYPE_TAG_PREFIX {
        return Err(OscError::MissingTypeTags);
    }

    tag_chars
        .iter()
        .map(|&tag| read_argument(buf, tag))
        .collect()
}

/// Read a message: padded address, then the argument block.
pub fn read_message<B: Buf>(buf: &mut B) -> Result<Message> {
    let address = read_padded_string(buf)?;
    if !address.starts_with(ADDRESS_PREFIX as char) {
        return Err(OscError::InvalidAddress(address));
    }
    let arguments = read_arguments(buf)?;
    Ok(Message { address, arguments })
}

/// Read a bundle and all of its elements, recursively.
///
/// Elements are read until fewer than 4 bytes remain. Each element must be
/// consumed exactly by its declared size. Bundles nested deeper than
/// [`MAX_BUNDLE_DEPTH`] are rejected with [`OscError::Protocol`].
pub fn read_bundle<B: Buf>(buf: &mut B) -> Result<Bundle> {
    read_bundle_at(buf, 1)
}

fn read_bundle_at<B: Buf>(buf: &mut B, depth: usize) -> Result<Bundle> {
    if depth > MAX_BUNDLE_DEPTH {
        return Err(OscError::Protocol(format!(
            "bundles nested deeper than {} levels",
            MAX_BUNDLE_DEPTH
        )));
    }

    ensure(buf, BUNDLE_MARKER.len() + 8)?;
    let mut marker = [0u8; 8];
    buf.copy_to_slice(&mut marker);
    if &marker != BUNDLE_MARKER {
        return Err(OscError::Protocol("missing #bundle marker".to_string()));
    }
    let timetag = Timetag(buf.get_u64());
    let name = read_padded_string(buf)?;

    let mut bundle = Bundle {
        timetag,
        name,
        ..Default::default()
    };

    while buf.remaining() >= 4 {
        let len = buf.get_u32() as usize;
        ensure(buf, len)?;
        let mut element = buf.copy_to_bytes(len);
        match read_package_at(&mut element, depth)? {
            Package::Message(message) => bundle.messages.push(message),
            Package::Bundle(nested) => bundle.bundles.push(nested),
        }
        if element.has_remaining() {
            return Err(OscError::Protocol(format!(
                "bundle element declared {} bytes but left {} unread",
                len,
                element.remaining()
            )));
        }
    }
    Ok(bundle)
}

/// Read either kind of package, chosen by its leading byte.
pub fn read_package<B: Buf>(buf: &mut B) -> Result<Package> {
    read_package_at(buf, 0)
}

// `depth` is the number of bundles already enclosing this package.
fn read_package_at<B: Buf>(buf: &mut B, depth: usize) -> Result<Package> {
    match peek_u8(buf)? {
        BUNDLE_PREFIX => Ok(Package::Bundle(read_bundle_at(buf, depth + 1)?)),
        ADDRESS_PREFIX => Ok(Package::Message(read_message(buf)?)),
        other => Err(OscError::UnsupportedPackage(other)),
    }
}
