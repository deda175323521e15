//! Object model for the git-height object store.
//!
//! Objects are never materialized as full structures here. The crate knows
//! the four object types, the `"<type> <size>\0"` header, how to pull the
//! tree and parent ids out of a commit, and how to look up a single name in
//! a tree. Object bytes are consumed through the [`ObjectRead`] stream trait
//! so that loose, packed, and delta-reconstructed objects look the same.

pub mod header;
mod commit;
pub mod tree;
pub mod stream;

pub use commit::Commit;
pub use stream::{BufferedObject, ObjectRead};
pub use tree::{TreeEntry, TreeEntryReader};

use bstr::BString;
use git_hash::HashError;

/// Errors produced by object operations.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    #[error("invalid object type: {0}")]
    InvalidType(BString),

    #[error("invalid object header: {0}")]
    InvalidHeader(String),

    #[error("invalid tree entry at offset {offset}: {reason}")]
    InvalidTreeEntry { offset: u64, reason: String },

    #[error("invalid commit: missing '{field}' header")]
    MissingCommitField { field: &'static str },

    #[error("object type mismatch: expected {expected}, found {actual}")]
    TypeMismatch {
        expected: ObjectType,
        actual: ObjectType,
    },

    #[error(transparent)]
    Hash(#[from] HashError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The four types of git objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    /// Parse from the type string in object headers.
    pub fn from_bytes(s: &[u8]) -> Result<Self, ObjectError> {
        match s {
            b"blob" => Ok(Self::Blob),
            b"tree" => Ok(Self::Tree),
            b"commit" => Ok(Self::Commit),
            b"tag" => Ok(Self::Tag),
            _ => Err(ObjectError::InvalidType(BString::from(s))),
        }
    }

    /// The canonical byte representation.
    pub fn as_bytes(&self) -> &'static [u8] {
        self.as_str().as_bytes()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Fail with [`ObjectError::TypeMismatch`] unless `self` is `expected`.
    pub fn expect(self, expected: ObjectType) -> Result<(), ObjectError> {
        if self == expected {
            Ok(())
        } else {
            Err(ObjectError::TypeMismatch {
                expected,
                actual: self,
            })
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObjectType {
    type Err = ObjectError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
    }
}
