//! ObjectId-keyed collections.
//!
//! Ids are already uniformly distributed digests, so the maps here hash by
//! taking the leading bytes of the id instead of running SipHash over all 20.

use std::hash::{BuildHasherDefault, Hasher};

mod oid_map;
mod oid_set;

pub use oid_map::OidMap;
pub use oid_set::OidSet;

/// Hasher that folds the first 8 bytes of each write into its state.
#[derive(Default, Clone, Copy)]
pub struct OidHasher(u64);

impl Hasher for OidHasher {
    fn write(&mut self, bytes: &[u8]) {
        let mut buf = [0u8; 8];
        let n = bytes.len().min(8);
        buf[..n].copy_from_slice(&bytes[..n]);
        self.0 = self.0.rotate_left(7) ^ u64::from_le_bytes(buf);
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

pub type OidBuildHasher = BuildHasherDefault<OidHasher>;
