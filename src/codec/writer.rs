//! Encoding side of the OSC binary format.
//!
//! Every function appends to a [`BufMut`]. Use a growable buffer
//! (`BytesMut`, `Vec<u8>`); fixed slices panic when they run out of room.

use bytes::{BufMut, BytesMut};

use crate::error::{OscError, Result};
use crate::protocol::{
    pad_len, padded_string_len, Argument, Bundle, Message, Package, ADDRESS_PREFIX,
    BUNDLE_MARKER, TYPE_TAG_PREFIX,
};

/// Write `s` plus one to four NUL bytes so the total length is a multiple of 4.
///
/// Fails with [`OscError::InvalidString`] if `s` contains a NUL byte, since it
/// would not survive decoding.
pub fn write_padded_string<B: BufMut>(buf: &mut B, s: &str) -> Result<()> {
    if s.as_bytes().contains(&0) {
        return Err(OscError::InvalidString);
    }
    write_padded_bytes(buf, s.as_bytes());
    Ok(())
}

fn write_padded_bytes<B: BufMut>(buf: &mut B, bytes: &[u8]) {
    buf.put_slice(bytes);
    buf.put_bytes(0, padded_string_len(bytes.len()) - bytes.len());
}

fn write_blob<B: BufMut>(buf: &mut B, blob: &[u8]) -> Result<()> {
    let len = u32::try_from(blob.len())
        .map_err(|_| OscError::Protocol(format!("blob of {} bytes is too long", blob.len())))?;
    buf.put_u32(len);
    buf.put_slice(blob);
    buf.put_bytes(0, pad_len(blob.len()));
    Ok(())
}

/// Write the type tag string followed by every argument payload.
///
/// An empty argument list still writes the 4-byte tag string `",\0\0\0"`.
pub fn write_arguments<B: BufMut>(buf: &mut B, args: &[Argument]) -> Result<()> {
    let mut type_tags = Vec::with_capacity(args.len() + 1);
    type_tags.push(TYPE_TAG_PREFIX);
    type_tags.extend(args.iter().map(|arg| arg.tag() as u8));
    write_padded_bytes(buf, &type_tags);

    for arg in args {
        match arg {
            Argument::Int(v) => buf.put_i32(*v),
            Argument::Float(v) => buf.put_f32(*v),
            Argument::String(v) => write_padded_string(buf, v)?,
            Argument::Blob(v) => write_blob(buf, v)?,
            Argument::Long(v) => buf.put_i64(*v),
            Argument::Double(v) => buf.put_f64(*v),
            Argument::Timetag(v) => buf.put_u64(v.0),
            Argument::Char(v) => buf.put_u32(*v as u32),
            Argument::Bool(_) | Argument::Nil | Argument::Impulse => {}
        }
    }
    Ok(())
}

/// Write a message: padded address, then the argument block.
pub fn write_message<B: BufMut>(buf: &mut B, message: &Message) -> Result<()> {
    if !message.address.starts_with(ADDRESS_PREFIX as char) {
        return Err(OscError::InvalidAddress(message.address.clone()));
    }
    write_padded_string(buf, &message.address)?;
    write_arguments(buf, &message.arguments)
}

/// Write a bundle: marker, timetag, name, then size-prefixed elements.
///
/// Messages are written before nested bundles.
pub fn write_bundle<B: BufMut>(buf: &mut B, bundle: &Bundle) -> Result<()> {
    buf.put_slice(BUNDLE_MARKER);
    buf.put_u64(bundle.timetag.0);
    write_padded_string(buf, &bundle.name)?;

    let mut element = BytesMut::new();
    for message in &bundle.messages {
        element.clear();
        write_message(&mut element, message)?;
        write_element(buf, &element)?;
    }
    for nested in &bundle.bundles {
        element.clear();
        write_bundle(&mut element, nested)?;
        write_element(buf, &element)?;
    }
    Ok(())
}

fn write_element<B: BufMut>(buf: &mut B, element: &[u8]) -> Result<()> {
    let len = u32::try_from(element.len()).map_err(|_| {
        OscError::Protocol(format!("bundle element of {} bytes is too long", element.len()))
    })?;
    buf.put_u32(len);
    buf.put_slice(element);
    Ok(())
}

/// Write either kind of package.
pub fn write_package<B: BufMut>(buf: &mut B, package: &Package) -> Result<()> {
    match package {
        Package::Message(message) => write_message(buf, message),
        Package::Bundle(bundle) => write_bundle(buf, bundle),
    }
}
