use std::collections::HashSet;

use super::OidBuildHasher;
use crate::ObjectId;

/// Membership set of object ids.
#[derive(Debug, Clone, Default)]
pub struct OidSet(HashSet<ObjectId, OidBuildHasher>);

impl OidSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `oid` was already present.
    pub fn insert(&mut self, oid: ObjectId) -> bool {
        self.0.insert(oid)
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.0.contains(oid)
    }

    pub fn clear(&mut self) {
        self.0.clear()
    }
}

impl FromIterator<ObjectId> for OidSet {
    fn from_iter<I: IntoIterator<Item = ObjectId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
