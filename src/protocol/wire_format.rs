//! Wire format constants and padding rules.
//!
//! OSC data is a sequence of 4-byte aligned fields:
//! ```text
//! Message: ┌───────────────┬──────────────────┬───────────────────┐
//!          │ address + pad │ ",tags" + pad    │ argument payloads │
//!          └───────────────┴──────────────────┴───────────────────┘
//!
//! Bundle:  ┌────────────┬──────────┬────────────┬──────────┬─────────┬───┐
//!          │ "#bundle\0"│ timetag  │ name + pad │ size (4) │ element │...│
//!          │ 8 bytes    │ u64 BE   │            │ u32 BE   │         │   │
//!          └────────────┴──────────┴────────────┴──────────┴─────────┴───┘
//! ```
//!
//! All multi-byte integers are Big Endian. The bundle name is an extension
//! to OSC 1.0; a bundle carrying it is not readable by other implementations.

/// Marker that starts every encoded bundle, NUL terminator included.
pub const BUNDLE_MARKER: &[u8; 8] = b"#bundle\0";

/// First byte of an encoded bundle.
pub const BUNDLE_PREFIX: u8 = b'#';

/// First byte of an encoded message (the address).
pub const ADDRESS_PREFIX: u8 = b'/';

/// First byte of a type tag string.
pub const TYPE_TAG_PREFIX: u8 = b',';

/// Field alignment in bytes.
pub const ALIGNMENT: usize = 4;

/// Largest payload a single UDP datagram can carry over IPv4.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

/// Deepest bundle nesting the decoder accepts; the outermost bundle is level 1.
pub const MAX_BUNDLE_DEPTH: usize = 32;

/// Type tag characters understood by the codec.
pub mod tags {
    pub const INT: u8 = b'i';
    pub const FLOAT: u8 = b'f';
    pub const STRING: u8 = b's';
    pub const BLOB: u8 = b'b';
    pub const LONG: u8 = b'h';
    pub const DOUBLE: u8 = b'd';
    pub const TIMETAG: u8 = b't';
    pub const CHAR: u8 = b'c';
    pub const TRUE: u8 = b'T';
    pub const FALSE: u8 = b'F';
    pub const NIL: u8 = b'N';
    pub const IMPULSE: u8 = b'I';
}

/// Number of zero bytes needed after `len` bytes to reach the next boundary.
#[inline]
pub fn pad_len(len: usize) -> usize {
    (ALIGNMENT - len % ALIGNMENT) % ALIGNMENT
}

/// Encoded size of a padded string holding `len` bytes of text.
///
/// Always at least one NUL terminator, rounded up to a multiple of 4.
#[inline]
pub fn padded_string_len(len: usize) -> usize {
    let with_nul = len + 1;
    with_nul + pad_len(with_nul)
}
