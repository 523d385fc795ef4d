//! The unit moved by the codec and transports: a message or a bundle.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::bundle::Bundle;
use super::message::Message;

/// Discriminator for a [`Package`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageType {
    Message,
    Bundle,
}

impl fmt::Display for PackageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageType::Message => f.write_str("message"),
            PackageType::Bundle => f.write_str("bundle"),
        }
    }
}

/// Either a [`Message`] or a [`Bundle`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Package {
    Message(Message),
    Bundle(Bundle),
}

impl Package {
    #[inline]
    pub fn package_type(&self) -> PackageType {
        match self {
            Package::Message(_) => PackageType::Message,
            Package::Bundle(_) => PackageType::Bundle,
        }
    }

    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Package::Message(m) => Some(m),
            Package::Bundle(_) => None,
        }
    }

    pub fn as_bundle(&self) -> Option<&Bundle> {
        match self {
            Package::Bundle(b) => Some(b),
            Package::Message(_) => None,
        }
    }

    pub fn into_message(self) -> Option<Message> {
        match self {
            Package::Message(m) => Some(m),
            Package::Bundle(_) => None,
        }
    }

    pub fn into_bundle(self) -> Option<Bundle> {
        match self {
            Package::Bundle(b) => Some(b),
            Package::Message(_) => None,
        }
    }
}

impl From<Message> for Package {
    fn from(message: Message) -> Self {
        Package::Message(message)
    }
}

impl From<Bundle> for Package {
    fn from(bundle: Bundle) -> Self {
        Package::Bundle(bundle)
    }
}
