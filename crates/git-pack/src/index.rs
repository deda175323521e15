//! Pack index (v2) reading and lookup.
//!
//! The pack index provides fast OID → offset mapping using a fan-out table
//! and binary search. Format:
//!
//! ```text
//! Header:  \xff tOc (4 bytes) | version (4 bytes = 2)
//! Fanout:  256 × 4-byte big-endian cumulative counts
//! OIDs:    N × 20-byte sorted OIDs
//! CRC32:   N × 4-byte CRC32 values
//! Offsets: N × 4-byte offsets (high bit = 1 → use 64-bit table)
//! 64-bit:  M × 8-byte offsets (for packs > 2GB)
//! Trailer: 20-byte pack checksum | 20-byte index checksum
//! ```

use std::cmp::Ordering;
use std::fs::File;
use std::path::{Path, PathBuf};

use git_hash::fanout::{FanoutTable, FANOUT_BYTES};
use git_hash::ObjectId;
use memmap2::Mmap;
use tracing::trace;

use crate::{PackError, IDX_SIGNATURE, IDX_VERSION};

const HEADER_LEN: usize = 8;
const TRAILER_LEN: usize = 2 * ObjectId::LEN;

/// Pack index (v2) providing OID → offset mapping.
pub struct PackIndex {
    data: Mmap,
    fanout: FanoutTable,
    num_objects: usize,
    /// Byte offset where sorted OIDs start.
    oid_offset: usize,
    /// Byte offset where 32-bit offsets start.
    offset32_offset: usize,
    /// Byte offset where 64-bit offsets start (if any).
    offset64_offset: usize,
    idx_path: PathBuf,
}

impl PackIndex {
    /// Open and validate a pack index file.
    pub fn open(idx_path: impl AsRef<Path>) -> Result<Self, PackError> {
        let idx_path = idx_path.as_ref().to_path_buf();
        let file = File::open(&idx_path)?;
        // SAFETY: pack indexes are never modified in place; git replaces
        // them by rename.
        let data = unsafe { Mmap::map(&file)? };

        if data.len() < HEADER_LEN + FANOUT_BYTES + TRAILER_LEN {
            return Err(PackError::InvalidIndex("file too small".into()));
        }
        if data[0..4] != IDX_SIGNATURE {
            return Err(PackError::InvalidIndex("bad signature".into()));
        }
        let version = u32::from_be_bytes([data[4], data[5], data[6], data[7]]);
        if version != IDX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let fanout = FanoutTable::from_bytes(&data[HEADER_LEN..HEADER_LEN + FANOUT_BYTES])
            .map_err(|e| PackError::InvalidIndex(e.to_string()))?;
        let n = fanout.total() as usize;
        let oid_offset = HEADER_LEN + FANOUT_BYTES;
        let crc_offset = oid_offset + n * ObjectId::LEN;
        let offset32_offset = crc_offset + n * 4;
        let offset64_offset = offset32_offset + n * 4;

        // The 64-bit table is variable length; each use is bounds checked.
        let min_size = offset64_offset + TRAILER_LEN;
        if data.len() < min_size {
            return Err(PackError::InvalidIndex(format!(
                "file too small: {} < {min_size}",
                data.len()
            )));
        }

        trace!(path = %idx_path.display(), objects = n, "opened pack index");
        Ok(Self {
            data,
            fanout,
            num_objects: n,
            oid_offset,
            offset32_offset,
            offset64_offset,
            idx_path,
        })
    }

    /// Look up an OID, returning its offset in the pack file.
    pub fn lookup(&self, oid: &ObjectId) -> Result<Option<u64>, PackError> {
        let range = self.fanout.range(oid.first_byte());
        if range.end > self.num_objects {
            return Err(PackError::InvalidIndex("fanout exceeds object count".into()));
        }
        let target = oid.as_bytes().as_slice();

        // The interval [low, high) strictly shrinks every iteration.
        let mut low = range.start;
        let mut high = range.end;
        while low < high {
            let mid = low + (high - low) / 2;
            match self.oid_bytes_at(mid).cmp(target) {
                Ordering::Less => low = mid + 1,
                Ordering::Greater => high = mid,
                Ordering::Equal => return self.offset_at(mid).map(Some),
            }
        }
        Ok(None)
    }

    /// The OID at the given sorted index position.
    pub fn oid_at(&self, index: usize) -> Result<ObjectId, PackError> {
        if index >= self.num_objects {
            return Err(PackError::InvalidIndex(format!("no entry {index}")));
        }
        Ok(ObjectId::from_bytes(self.oid_bytes_at(index))?)
    }

    /// The pack file offset at the given sorted index position.
    pub fn offset_at(&self, index: usize) -> Result<u64, PackError> {
        if index >= self.num_objects {
            return Err(PackError::InvalidIndex(format!("no entry {index}")));
        }
        let pos = self.offset32_offset + index * 4;
        let val = read_u32(&self.data[pos..pos + 4]);
        if val & 0x8000_0000 == 0 {
            return Ok(u64::from(val));
        }

        // High bit set: the low 31 bits index the 64-bit table.
        let pos64 = self.offset64_offset + (val & 0x7fff_ffff) as usize * 8;
        let table_end = self.data.len() - TRAILER_LEN;
        if pos64 + 8 > table_end {
            return Err(PackError::InvalidIndex(format!(
                "64-bit offset entry {} out of range",
                val & 0x7fff_ffff
            )));
        }
        let mut be = [0u8; 8];
        be.copy_from_slice(&self.data[pos64..pos64 + 8]);
        Ok(u64::from_be_bytes(be))
    }

    /// Total number of objects in this index.
    pub fn num_objects(&self) -> usize {
        self.num_objects
    }

    /// Path to the .idx file.
    pub fn path(&self) -> &Path {
        &self.idx_path
    }

    fn oid_bytes_at(&self, index: usize) -> &[u8] {
        let start = self.oid_offset + index * ObjectId::LEN;
        &self.data[start..start + ObjectId::LEN]
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use git_testtools::PackBuilder;
    use std::fs;

    fn write_index(dir: &Path, contents: &[&[u8]], large: bool) -> (PathBuf, Vec<ObjectId>, Vec<u64>) {
        let mut builder = PackBuilder::new().large_offsets(large);
        for c in contents {
            builder.add("blob", c);
        }
        let written = builder.write(dir, "pack-test");
        (written.idx_path, written.ids, written.offsets)
    }

    #[test]
    fn finds_every_object() {
        let dir = tempfile::tempdir().unwrap();
        let contents: Vec<Vec<u8>> = (0..50).map(|i| format!("blob {i}").into_bytes()).collect();
        let refs: Vec<&[u8]> = contents.iter().map(Vec::as_slice).collect();
        let (path, ids, offsets) = write_index(dir.path(), &refs, false);

        let index = PackIndex::open(&path).unwrap();
        assert_eq!(index.num_objects(), 50);
        for (id, offset) in ids.iter().zip(&offsets) {
            assert_eq!(index.lookup(id).unwrap(), Some(*offset));
        }
    }

    #[test]
    fn sorted_accessors() {
        let dir = tempfile::tempdir().unwrap();
        let (path, mut ids, _) = write_index(dir.path(), &[b"one", b"two", b"three"], false);
        let index = PackIndex::open(path).unwrap();
        ids.sort();
        for (i, id) in ids.iter().enumerate() {
            assert_eq!(index.oid_at(i).unwrap(), *id);
        }
        assert!(index.oid_at(3).is_err());
        assert!(index.offset_at(3).is_err());
    }

    #[test]
    fn large_offset_indirection() {
        let dir = tempfile::tempdir().unwrap();
        let (path, ids, offsets) = write_index(dir.path(), &[b"a", b"b", b"c"], true);
        let index = PackIndex::open(&path).unwrap();
        for (id, offset) in ids.iter().zip(&offsets) {
            assert_eq!(index.lookup(id).unwrap(), Some(*offset));
        }
    }

    #[test]
    fn absent_ids_at_the_edges() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _, _) = write_index(dir.path(), &[b"x", b"y"], false);
        let index = PackIndex::open(&path).unwrap();
        assert_eq!(index.lookup(&ObjectId::NULL).unwrap(), None);
        assert_eq!(index.lookup(&ObjectId::new([0xff; 20])).unwrap(), None);
        assert_eq!(index.lookup(&ObjectId::new([0x80; 20])).unwrap(), None);
    }

    #[test]
    fn empty_index() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _, _) = write_index(dir.path(), &[], false);
        let index = PackIndex::open(&path).unwrap();
        assert_eq!(index.num_objects(), 0);
        assert_eq!(index.lookup(&ObjectId::new([7; 20])).unwrap(), None);
    }

    #[test]
    fn rejects_other_versions() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = PackBuilder::new().versions(2, 3);
        builder.add("blob", b"v3");
        let written = builder.write(dir.path(), "pack-v3");
        assert!(matches!(
            PackIndex::open(written.idx_path),
            Err(PackError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn rejects_bad_signature_and_truncation() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _, _) = write_index(dir.path(), &[b"a"], false);
        let mut bytes = fs::read(&path).unwrap();

        bytes[0] = 0;
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(PackIndex::open(&path), Err(PackError::InvalidIndex(_))));

        bytes[0] = 0xff;
        bytes.truncate(HEADER_LEN + FANOUT_BYTES + 10);
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(PackIndex::open(&path), Err(PackError::InvalidIndex(_))));
    }

    #[test]
    fn rejects_decreasing_fanout() {
        let dir = tempfile::tempdir().unwrap();
        let (path, _, _) = write_index(dir.path(), &[b"a", b"b"], false);
        let mut bytes = fs::read(&path).unwrap();
        // Entry 0 claims more objects than entry 1.
        bytes[HEADER_LEN..HEADER_LEN + 4].copy_from_slice(&9u32.to_be_bytes());
        fs::write(&path, &bytes).unwrap();
        assert!(matches!(PackIndex::open(&path), Err(PackError::InvalidIndex(_))));
    }
}
