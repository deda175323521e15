//! Object ids for fixtures, computed the way git names objects.

use git_hash::ObjectId;
use sha1::{Digest, Sha1};

/// SHA-1 of `data`.
pub fn digest(data: &[u8]) -> ObjectId {
    let mut bytes = [0u8; ObjectId::LEN];
    bytes.copy_from_slice(&Sha1::digest(data));
    ObjectId::new(bytes)
}

/// Id of an object with this type and content: `"{kind} {len}\0{content}"`.
pub fn hash_object(kind: &str, content: &[u8]) -> ObjectId {
    let mut h = Sha1::new();
    h.update(format!("{} {}\0", kind, content.len()).as_bytes());
    h.update(content);
    let mut bytes = [0u8; ObjectId::LEN];
    bytes.copy_from_slice(&h.finalize());
    ObjectId::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digests() {
        assert_eq!(digest(b"").to_hex(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(
            digest(b"hello world").to_hex(),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
    }

    #[test]
    fn empty_blob_and_tree_ids() {
        assert_eq!(
            hash_object("blob", b"").to_hex(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
        assert_eq!(
            hash_object("tree", b"").to_hex(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
    }
}
