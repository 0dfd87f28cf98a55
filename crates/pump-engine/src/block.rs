//! Items flowing through the pump.

use std::str::FromStr;
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

use crate::BoxError;

/// Content address of a block.
///
/// Opaque to the engine: it is only printed and used to correlate a block
/// across stages. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(Arc<str>);

/// Reason a string was rejected by [`Identifier::parse`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidIdentifier {
    #[error("empty identifier")]
    Empty,

    #[error("invalid character {ch:?} in identifier {value:?}")]
    InvalidChar { value: String, ch: char },
}

impl Identifier {
    /// Wrap a value without validating it.
    pub fn new(value: impl Into<Arc<str>>) -> Self {
        Self(value.into())
    }

    /// Validate and wrap a value.
    ///
    /// Accepts printable ASCII except path separators, which keeps an
    /// identifier usable as a file name or URL query value.
    pub fn parse(value: &str) -> Result<Self, InvalidIdentifier> {
        if value.is_empty() {
            return Err(InvalidIdentifier::Empty);
        }
        if let Some(ch) = value
            .chars()
            .find(|c| !c.is_ascii_graphic() || *c == '/' || *c == '\\')
        {
            return Err(InvalidIdentifier::InvalidChar {
                value: value.to_string(),
                ch,
            });
        }
        Ok(Self::new(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Identifier {
    type Err = InvalidIdentifier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An enumerated identifier.
///
/// `error` is set when the enumerator could not resolve this item. Such
/// records are counted and logged by the relay, never collected.
#[derive(Debug)]
pub struct IdentifierRecord {
    pub id: Identifier,
    pub error: Option<BoxError>,
}

impl IdentifierRecord {
    pub fn ok(id: Identifier) -> Self {
        Self { id, error: None }
    }

    pub fn failed(id: Identifier, error: impl Into<BoxError>) -> Self {
        Self {
            id,
            error: Some(error.into()),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

/// A retrieved block.
///
/// `error` is set when retrieval failed, in which case `data` is empty and
/// the block is never handed to a drain.
#[derive(Debug)]
pub struct Block {
    pub id: Identifier,
    pub data: Bytes,
    pub error: Option<BoxError>,
}

impl Block {
    pub fn new(id: Identifier, data: impl Into<Bytes>) -> Self {
        Self {
            id,
            data: data.into(),
            error: None,
        }
    }

    pub fn failed(id: Identifier, error: impl Into<BoxError>) -> Self {
        Self {
            id,
            data: Bytes::new(),
            error: Some(error.into()),
        }
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
