//! Tree lookups.
//!
//! Trees are flat sequences of `<mode> <name>\0<20-byte id>` entries. The
//! resolver only ever needs the id bound to one name, so nothing here builds
//! a full tree structure: [`find_entry`] scans a buffered tree and
//! [`TreeEntryReader`] scans one incrementally from any reader.

use std::io::{self, Read};

use bstr::{BStr, BString, ByteSlice};
use git_hash::ObjectId;

use crate::ObjectError;

/// Bytes pulled from the underlying reader per refill.
const READ_CHUNK: usize = 8 * 1024;

/// Longest mode git writes (`100644`).
const MAX_MODE_LEN: usize = 6;

/// A single entry in a git tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Mode as stored, parsed from octal (`0o40000` for subtrees).
    pub mode: u32,
    pub name: BString,
    pub oid: ObjectId,
}

impl TreeEntry {
    /// Is this a tree (directory) entry?
    pub fn is_tree(&self) -> bool {
        self.mode & 0o170000 == 0o040000
    }

    pub fn name(&self) -> &BStr {
        self.name.as_bstr()
    }
}

/// Find the id bound to `name` in buffered tree content.
///
/// Returns [`ObjectId::NULL`] when no entry has exactly that name.
pub fn find_entry(content: &[u8], name: &[u8]) -> Result<ObjectId, ObjectError> {
    let mut pos = 0;
    while pos < content.len() {
        let (entry, used) = parse_entry(&content[pos..], pos as u64)?.ok_or_else(|| {
            ObjectError::InvalidTreeEntry {
                offset: pos as u64,
                reason: "truncated entry".into(),
            }
        })?;
        if entry.name == name {
            return Ok(entry.oid);
        }
        pos += used;
    }
    Ok(ObjectId::NULL)
}

/// Incremental tree scanner over an arbitrary reader.
///
/// Entries may straddle read boundaries; a partial entry stays buffered until
/// the rest of it arrives.
pub struct TreeEntryReader<R> {
    reader: R,
    buf: Vec<u8>,
    pos: usize,
    /// Offset of `buf[pos]` within the tree content.
    consumed: u64,
    eof: bool,
}

impl<R: Read> TreeEntryReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            pos: 0,
            consumed: 0,
            eof: false,
        }
    }

    /// Decode the next entry, or `None` once the content is exhausted.
    pub fn next_entry(&mut self) -> Result<Option<TreeEntry>, ObjectError> {
        loop {
            if let Some((entry, used)) = parse_entry(&self.buf[self.pos..], self.consumed)? {
                self.pos += used;
                self.consumed += used as u64;
                return Ok(Some(entry));
            }
            if self.eof {
                if self.pos == self.buf.len() {
                    return Ok(None);
                }
                return Err(ObjectError::InvalidTreeEntry {
                    offset: self.consumed,
                    reason: "truncated entry".into(),
                });
            }
            self.fill()?;
        }
    }

    /// Scan for `name`, returning [`ObjectId::NULL`] if it is not present.
    pub fn find(mut self, name: &[u8]) -> Result<ObjectId, ObjectError> {
        while let Some(entry) = self.next_entry()? {
            if entry.name == name {
                return Ok(entry.oid);
            }
        }
        Ok(ObjectId::NULL)
    }

    fn fill(&mut self) -> io::Result<()> {
        self.buf.drain(..self.pos);
        self.pos = 0;
        let filled = self.buf.len();
        self.buf.resize(filled + READ_CHUNK, 0);
        let n = loop {
            match self.reader.read(&mut self.buf[filled..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.truncate(filled);
                    return Err(e);
                }
            }
        };
        self.buf.truncate(filled + n);
        self.eof = n == 0;
        Ok(())
    }
}

impl<R: Read> Iterator for TreeEntryReader<R> {
    type Item = Result<TreeEntry, ObjectError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().transpose()
    }
}

/// Parse one entry from the front of `data`.
///
/// `Ok(None)` means `data` holds only a prefix of an entry. `offset` is the
/// position of `data[0]` in the tree and is used for error reporting only.
fn parse_entry(data: &[u8], offset: u64) -> Result<Option<(TreeEntry, usize)>, ObjectError> {
    let invalid = |at: usize, reason: &str| ObjectError::InvalidTreeEntry {
        offset: offset + at as u64,
        reason: reason.into(),
    };

    let Some(space_pos) = data.iter().take(MAX_MODE_LEN + 1).position(|&b| b == b' ') else {
        if data.len() > MAX_MODE_LEN {
            return Err(invalid(0, "missing space after mode"));
        }
        return Ok(None);
    };
    let mode = parse_octal(&data[..space_pos]).ok_or_else(|| invalid(0, "invalid mode"))?;

    let name_start = space_pos + 1;
    let Some(nul) = data[name_start..].find_byte(0) else {
        return Ok(None);
    };
    let name_end = name_start + nul;
    if name_end == name_start {
        return Err(invalid(name_start, "empty name"));
    }

    let oid_start = name_end + 1;
    let oid_end = oid_start + ObjectId::LEN;
    if data.len() < oid_end {
        return Ok(None);
    }
    let oid = ObjectId::from_bytes(&data[oid_start..oid_end])?;

    let entry = TreeEntry {
        mode,
        name: BString::from(&data[name_start..name_end]),
        oid,
    };
    Ok(Some((entry, oid_end)))
}

/// Parse an octal ASCII string to u32.
fn parse_octal(s: &[u8]) -> Option<u32> {
    if s.is_empty() {
        return None;
    }
    s.iter().try_fold(0u32, |acc, &b| match b {
        b'0'..=b'7' => acc.checked_mul(8)?.checked_add(u32::from(b - b'0')),
        _ => None,
    })
}
