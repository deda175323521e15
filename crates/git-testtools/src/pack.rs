//! Pack and pack index (v2) writer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use git_hash::fanout::FanoutTable;
use git_hash::ObjectId;

use crate::hash::{digest, hash_object};
use crate::{pack_type_number, zlib};

enum Body {
    Full,
    OfsDelta { base: usize, delta: Vec<u8> },
    RefDelta { base: ObjectId, delta: Vec<u8> },
}

struct Entry {
    kind: &'static str,
    content: Vec<u8>,
    body: Body,
}

/// Accumulates entries and writes a `.pack` + `.idx` pair.
///
/// Each object id is stored once: adding content that is already present
/// returns the existing entry number.
pub struct PackBuilder {
    entries: Vec<Entry>,
    by_id: HashMap<ObjectId, usize>,
    large_offsets: bool,
    version: u32,
    index_version: u32,
}

/// Paths and ids of a written pack.
pub struct WrittenPack {
    pub pack_path: PathBuf,
    pub idx_path: PathBuf,
    /// Id of each entry, in insertion order.
    pub ids: Vec<ObjectId>,
    /// Pack offset of each entry, in insertion order.
    pub offsets: Vec<u64>,
}

impl PackBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            by_id: HashMap::new(),
            large_offsets: false,
            version: 2,
            index_version: 2,
        }
    }

    /// Route every offset through the 64-bit extended table.
    pub fn large_offsets(mut self, yes: bool) -> Self {
        self.large_offsets = yes;
        self
    }

    /// Override the version fields, for testing rejection.
    pub fn versions(mut self, pack: u32, index: u32) -> Self {
        self.version = pack;
        self.index_version = index;
        self
    }

    /// Add a whole object. Returns its entry number.
    pub fn add(&mut self, kind: &'static str, content: &[u8]) -> usize {
        self.push(Entry {
            kind,
            content: content.to_vec(),
            body: Body::Full,
        })
    }

    /// Add `target` as an OFS_DELTA against entry `base`.
    pub fn add_ofs_delta(&mut self, base: usize, target: &[u8]) -> usize {
        let delta = crate::delta::diff(&self.entries[base].content, target);
        self.add_ofs_delta_raw(base, target, delta)
    }

    /// Add an OFS_DELTA with a hand-built delta stream. `target` is what the
    /// delta is expected to produce and determines the entry's id.
    pub fn add_ofs_delta_raw(&mut self, base: usize, target: &[u8], delta: Vec<u8>) -> usize {
        let kind = self.entries[base].kind;
        self.push(Entry {
            kind,
            content: target.to_vec(),
            body: Body::OfsDelta { base, delta },
        })
    }

    /// Add `target` as a REF_DELTA against an object that may live elsewhere.
    pub fn add_ref_delta(
        &mut self,
        base_kind: &'static str,
        base_content: &[u8],
        target: &[u8],
    ) -> usize {
        let base = hash_object(base_kind, base_content);
        let delta = crate::delta::diff(base_content, target);
        self.push(Entry {
            kind: base_kind,
            content: target.to_vec(),
            body: Body::RefDelta { base, delta },
        })
    }

    fn push(&mut self, entry: Entry) -> usize {
        let id = hash_object(entry.kind, &entry.content);
        if let Some(&existing) = self.by_id.get(&id) {
            return existing;
        }
        self.entries.push(entry);
        self.by_id.insert(id, self.entries.len() - 1);
        self.entries.len() - 1
    }

    /// Id of entry `n`.
    pub fn id(&self, n: usize) -> ObjectId {
        let e = &self.entries[n];
        hash_object(e.kind, &e.content)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `<dir>/<name>.pack` and `<dir>/<name>.idx`.
    pub fn write(&self, dir: &Path, name: &str) -> WrittenPack {
        fs::create_dir_all(dir).expect("create pack dir");

        let mut pack = Vec::new();
        pack.extend_from_slice(b"PACK");
        pack.extend_from_slice(&self.version.to_be_bytes());
        pack.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        let mut offsets = Vec::with_capacity(self.entries.len());
        let mut crcs = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let offset = pack.len() as u64;
            let start = pack.len();
            match &entry.body {
                Body::Full => {
                    pack.extend(entry_header(pack_type_number(entry.kind), entry.content.len() as u64));
                    pack.extend(zlib(&entry.content));
                }
                Body::OfsDelta { base, delta } => {
                    pack.extend(entry_header(6, delta.len() as u64));
                    pack.extend(ofs_delta_distance(offset - offsets[*base]));
                    pack.extend(zlib(delta));
                }
                Body::RefDelta { base, delta } => {
                    pack.extend(entry_header(7, delta.len() as u64));
                    pack.extend_from_slice(base.as_bytes());
                    pack.extend(zlib(delta));
                }
            }
            crcs.push(crc32fast::hash(&pack[start..]));
            offsets.push(offset);
        }
        let pack_checksum = digest(&pack);
        pack.extend_from_slice(pack_checksum.as_bytes());

        let ids: Vec<ObjectId> = (0..self.entries.len()).map(|n| self.id(n)).collect();
        let idx = self.index_bytes(&ids, &offsets, &crcs, &pack_checksum);

        let pack_path = dir.join(format!("{name}.pack"));
        let idx_path = dir.join(format!("{name}.idx"));
        fs::write(&pack_path, &pack).expect("write pack");
        fs::write(&idx_path, &idx).expect("write idx");

        WrittenPack {
            pack_path,
            idx_path,
            ids,
            offsets,
        }
    }

    fn index_bytes(
        &self,
        ids: &[ObjectId],
        offsets: &[u64],
        crcs: &[u32],
        pack_checksum: &ObjectId,
    ) -> Vec<u8> {
        let mut order: Vec<usize> = (0..ids.len()).collect();
        order.sort_by_key(|&i| ids[i]);
        let sorted: Vec<ObjectId> = order.iter().map(|&i| ids[i]).collect();

        let mut buf = vec![0xff, 0x74, 0x4f, 0x63];
        buf.extend_from_slice(&self.index_version.to_be_bytes());
        buf.extend_from_slice(&FanoutTable::build(&sorted).to_bytes());
        for id in &sorted {
            buf.extend_from_slice(id.as_bytes());
        }
        for &i in &order {
            buf.extend_from_slice(&crcs[i].to_be_bytes());
        }
        let mut large = Vec::new();
        for &i in &order {
            let offset = offsets[i];
            if self.large_offsets || offset > 0x7fff_ffff {
                buf.extend_from_slice(&(0x8000_0000 | large.len() as u32).to_be_bytes());
                large.push(offset);
            } else {
                buf.extend_from_slice(&(offset as u32).to_be_bytes());
            }
        }
        for offset in large {
            buf.extend_from_slice(&offset.to_be_bytes());
        }
        buf.extend_from_slice(pack_checksum.as_bytes());
        let idx_checksum = digest(&buf);
        buf.extend_from_slice(idx_checksum.as_bytes());
        buf
    }
}

/// Type and size header of a pack entry.
pub fn entry_header(type_num: u8, size: u64) -> Vec<u8> {
    let mut out = Vec::new();
    let mut c = (type_num << 4) | (size & 0x0f) as u8;
    let mut rest = size >> 4;
    while rest > 0 {
        out.push(c | 0x80);
        c = (rest & 0x7f) as u8;
        rest >>= 7;
    }
    out.push(c);
    out
}

/// Encoded distance from an OFS_DELTA entry back to its base.
pub fn ofs_delta_distance(mut distance: u64) -> Vec<u8> {
    let mut out = vec![(distance & 0x7f) as u8];
    distance >>= 7;
    while distance > 0 {
        distance -= 1;
        out.push(0x80 | (distance & 0x7f) as u8);
        distance >>= 7;
    }
    out.reverse();
    out
}
