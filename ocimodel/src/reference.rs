use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::digest::{DigestError, OciDigest};

const MAX_TAG_LEN: usize = 128;

/// Error type for manifest reference parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error(transparent)]
    InvalidDigest(#[from] DigestError),
}

/// The `{reference}` part of a manifest path: either a tag or a digest
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reference {
    Tag(String),
    Digest(OciDigest),
}

impl Reference {
    /// Create a tag reference, validating the tag grammar
    pub fn tag(tag: impl Into<String>) -> Result<Self, ReferenceError> {
        let tag = tag.into();
        if is_valid_tag(&tag) {
            Ok(Reference::Tag(tag))
        } else {
            Err(ReferenceError::InvalidTag(tag))
        }
    }

    pub fn as_digest(&self) -> Option<&OciDigest> {
        match self {
            Reference::Digest(digest) => Some(digest),
            Reference::Tag(_) => None,
        }
    }
}

// [A-Za-z0-9_][A-Za-z0-9._-]{0,127}
fn is_valid_tag(tag: &str) -> bool {
    let mut chars = tag.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    tag.len() <= MAX_TAG_LEN
        && (first.is_ascii_alphanumeric() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

impl From<OciDigest> for Reference {
    fn from(digest: OciDigest) -> Self {
        Reference::Digest(digest)
    }
}

impl FromStr for Reference {
    type Err = ReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Tags cannot contain ':', so anything with one must be a digest
        if s.contains(':') {
            Ok(Reference::Digest(s.parse()?))
        } else {
            Reference::tag(s)
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reference::Tag(tag) => f.write_str(tag),
            Reference::Digest(digest) => write!(f, "{digest}"),
        }
    }
}
