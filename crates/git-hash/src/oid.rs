use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::hex;
use crate::HashError;

/// A git object identifier: the SHA-1 of an object's header and content.
///
/// Equality and hashing are over the raw 20 bytes, so ids read from loose
/// storage and from packs are interchangeable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl Hash for ObjectId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&self.0);
    }
}

impl ObjectId {
    /// Length of the raw digest in bytes.
    pub const LEN: usize = 20;
    /// Length of the hex form.
    pub const HEX_LEN: usize = 40;
    /// The empty id (all zeros), used for "no such entry".
    pub const NULL: Self = Self([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Create an ObjectId from exactly 20 raw bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| HashError::InvalidHashLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Create an ObjectId from a 40-character hex string.
    pub fn from_hex(text: &str) -> Result<Self, HashError> {
        Self::from_hex_bytes(text.as_bytes())
    }

    /// Create an ObjectId from 40 ASCII hex bytes, as found in refs and commits.
    pub fn from_hex_bytes(digits: &[u8]) -> Result<Self, HashError> {
        let mut bytes = [0u8; 20];
        hex::decode(digits, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Get the raw bytes of the hash.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Copy the raw bytes into the front of `dest`.
    pub fn copy_to(&self, dest: &mut [u8]) -> Result<(), HashError> {
        if dest.len() < Self::LEN {
            return Err(HashError::InvalidHashLength {
                expected: Self::LEN,
                actual: dest.len(),
            });
        }
        dest[..Self::LEN].copy_from_slice(&self.0);
        Ok(())
    }

    /// Check if this is the null (all-zeros) OID.
    pub fn is_null(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    /// Get the hex string representation (lowercase).
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Get the first byte of the hash (for fan-out table indexing).
    pub fn first_byte(&self) -> u8 {
        self.0[0]
    }

    /// Get the loose object path component: `"xx/xxxx..."`.
    pub fn loose_path(&self) -> String {
        let hex = self.to_hex();
        format!("{}/{}", &hex[..2], &hex[2..])
    }
}

impl From<[u8; 20]> for ObjectId {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for ObjectId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", &self.to_hex()[..8])
    }
}

impl FromStr for ObjectId {
    type Err = HashError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
