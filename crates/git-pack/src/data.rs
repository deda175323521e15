//! The memory-mapped `.pack` file.

use std::fs::File;
use std::io::{self, BufRead, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use memmap2::Mmap;

use crate::{PackError, PACK_HEADER_SIZE, PACK_SIGNATURE, PACK_VERSION};

/// A validated, memory-mapped pack file.
pub struct PackData {
    map: Arc<Mmap>,
    path: PathBuf,
    num_objects: u32,
}

impl PackData {
    /// Map `path` and check the `PACK` header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PackError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        // SAFETY: pack files are immutable once written.
        let map = unsafe { Mmap::map(&file)? };

        if map.len() < PACK_HEADER_SIZE {
            return Err(PackError::InvalidHeader("file too small".into()));
        }
        if &map[0..4] != PACK_SIGNATURE {
            return Err(PackError::InvalidHeader("bad PACK signature".into()));
        }
        let version = u32::from_be_bytes([map[4], map[5], map[6], map[7]]);
        if version != PACK_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }
        let num_objects = u32::from_be_bytes([map[8], map[9], map[10], map[11]]);

        Ok(Self {
            map: Arc::new(map),
            path,
            num_objects,
        })
    }

    /// Object count from the pack header.
    pub fn num_objects(&self) -> u32 {
        self.num_objects
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes from `offset` to the end of the file.
    pub fn bytes_from(&self, offset: u64) -> Result<&[u8], PackError> {
        let start = self.check_offset(offset)?;
        Ok(&self.map[start..])
    }

    /// An owned reader starting at `offset`.
    pub fn cursor(&self, offset: u64) -> Result<PackCursor, PackError> {
        let pos = self.check_offset(offset)?;
        Ok(PackCursor {
            map: Arc::clone(&self.map),
            pos,
        })
    }

    fn check_offset(&self, offset: u64) -> Result<usize, PackError> {
        match usize::try_from(offset) {
            Ok(pos) if pos >= PACK_HEADER_SIZE && pos < self.map.len() => Ok(pos),
            _ => Err(PackError::CorruptEntry(offset)),
        }
    }
}

/// Reader over the mapped pack that keeps the mapping alive on its own, so
/// streams built on it can outlive any borrow of the [`PackData`].
pub struct PackCursor {
    map: Arc<Mmap>,
    pos: usize,
}

impl Read for PackCursor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.fill_buf()?;
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.consume(n);
        Ok(n)
    }
}

impl BufRead for PackCursor {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        Ok(&self.map[self.pos.min(self.map.len())..])
    }

    fn consume(&mut self, amt: usize) {
        self.pos = (self.pos + amt).min(self.map.len());
    }
}
