//! Fixture writers for git-height tests.
//!
//! Everything here writes the on-disk formats independently of the reader
//! crates, so reader tests check against a second implementation rather
//! than against themselves.

#![allow(clippy::new_without_default)]

pub mod delta;
pub mod hash;
pub mod pack;
mod repo;

pub use pack::{PackBuilder, WrittenPack};
pub use repo::{Item, TestRepo};

use std::fs;
use std::io::Write;
use std::path::Path;

use flate2::write::ZlibEncoder;
use flate2::Compression;
use crate::hash::hash_object;
use git_hash::ObjectId;

/// Zlib-compress `data` at the default level.
pub fn zlib(data: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(data).expect("write to Vec");
    enc.finish().expect("finish zlib stream")
}

/// Write a loose object under `objects_dir` and return its id.
pub fn write_loose_object(objects_dir: &Path, kind: &str, content: &[u8]) -> ObjectId {
    let oid = hash_object(kind, content);
    let path = objects_dir.join(oid.loose_path());
    fs::create_dir_all(path.parent().expect("loose path has a parent")).expect("create fan-out dir");
    let mut raw = format!("{} {}\0", kind, content.len()).into_bytes();
    raw.extend_from_slice(content);
    fs::write(&path, zlib(&raw)).expect("write loose object");
    oid
}

/// Type number used in pack entry headers.
pub fn pack_type_number(kind: &str) -> u8 {
    match kind {
        "commit" => 1,
        "tree" => 2,
        "blob" => 3,
        "tag" => 4,
        other => panic!("not an object type: {other}"),
    }
}
