use std::collections::HashMap;

use super::OidBuildHasher;
use crate::ObjectId;

/// Per-object values, such as commit heights or pack offsets.
#[derive(Debug, Clone)]
pub struct OidMap<V>(HashMap<ObjectId, V, OidBuildHasher>);

impl<V> OidMap<V> {
    pub fn new() -> Self {
        Self(HashMap::default())
    }

    pub fn insert(&mut self, oid: ObjectId, value: V) -> Option<V> {
        self.0.insert(oid, value)
    }

    pub fn get(&self, oid: &ObjectId) -> Option<&V> {
        self.0.get(oid)
    }

    pub fn contains_key(&self, oid: &ObjectId) -> bool {
        self.0.contains_key(oid)
    }

    /// Forget every entry, keeping the allocation.
    pub fn clear(&mut self) {
        self.0.clear()
    }
}

impl<V> Default for OidMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> FromIterator<(ObjectId, V)> for OidMap<V> {
    fn from_iter<I: IntoIterator<Item = (ObjectId, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
