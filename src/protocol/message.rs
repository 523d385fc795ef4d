//! OSC message and its typed arguments.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::timetag::Timetag;
use super::wire_format::tags;

/// A single typed OSC argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Argument {
    /// `i`: 32-bit signed integer.
    Int(i32),
    /// `f`: 32-bit IEEE-754 float.
    Float(f32),
    /// `s`: padded string.
    String(String),
    /// `b`: length-prefixed byte blob.
    Blob(Bytes),
    /// `h`: 64-bit signed integer.
    Long(i64),
    /// `d`: 64-bit IEEE-754 float.
    Double(f64),
    /// `t`: timetag.
    Timetag(Timetag),
    /// `c`: character sent as a 32-bit code point.
    Char(char),
    /// `T` / `F`: boolean with no payload bytes.
    Bool(bool),
    /// `N`: nil.
    Nil,
    /// `I`: impulse ("infinitum").
    Impulse,
}

impl Argument {
    /// The type tag character written for this argument.
    pub fn tag(&self) -> char {
        let tag = match self {
            Argument::Int(_) => tags::INT,
            Argument::Float(_) => tags::FLOAT,
            Argument::String(_) => tags::STRING,
            Argument::Blob(_) => tags::BLOB,
            Argument::Long(_) => tags::LONG,
            Argument::Double(_) => tags::DOUBLE,
            Argument::Timetag(_) => tags::TIMETAG,
            Argument::Char(_) => tags::CHAR,
            Argument::Bool(true) => tags::TRUE,
            Argument::Bool(false) => tags::FALSE,
            Argument::Nil => tags::NIL,
            Argument::Impulse => tags::IMPULSE,
        };
        tag as char
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Argument::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Argument::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Argument::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Argument::Blob(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Argument::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Argument::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Argument::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i32> for Argument {
    fn from(value: i32) -> Self {
        Argument::Int(value)
    }
}

impl From<f32> for Argument {
    fn from(value: f32) -> Self {
        Argument::Float(value)
    }
}

impl From<&str> for Argument {
    fn from(value: &str) -> Self {
        Argument::String(value.to_string())
    }
}

impl From<String> for Argument {
    fn from(value: String) -> Self {
        Argument::String(value)
    }
}

impl From<Bytes> for Argument {
    fn from(value: Bytes) -> Self {
        Argument::Blob(value)
    }
}

impl From<Vec<u8>> for Argument {
    fn from(value: Vec<u8>) -> Self {
        Argument::Blob(Bytes::from(value))
    }
}

impl From<i64> for Argument {
    fn from(value: i64) -> Self {
        Argument::Long(value)
    }
}

impl From<f64> for Argument {
    fn from(value: f64) -> Self {
        Argument::Double(value)
    }
}

impl From<Timetag> for Argument {
    fn from(value: Timetag) -> Self {
        Argument::Timetag(value)
    }
}

impl From<char> for Argument {
    fn from(value: char) -> Self {
        Argument::Char(value)
    }
}

impl From<bool> for Argument {
    fn from(value: bool) -> Self {
        Argument::Bool(value)
    }
}

/// An address plus an ordered list of typed arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// OSC address, starts with `/`.
    pub address: String,
    /// Arguments in wire order.
    pub arguments: Vec<Argument>,
}

impl Message {
    /// Create a message with no arguments.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            arguments: Vec::new(),
        }
    }

    /// Create a message with the given arguments.
    pub fn with_args<I, A>(address: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Argument>,
    {
        Self {
            address: address.into(),
            arguments: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Append an argument, builder style.
    pub fn arg(mut self, arg: impl Into<Argument>) -> Self {
        self.arguments.push(arg.into());
        self
    }

    /// Append an argument in place.
    pub fn push_arg(&mut self, arg: impl Into<Argument>) {
        self.arguments.push(arg.into());
    }

    /// The type tag string as it appears on the wire, without padding.
    pub fn type_tags(&self) -> String {
        std::iter::once(',')
            .chain(self.arguments.iter().map(Argument::tag))
            .collect()
    }
}
