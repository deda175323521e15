use std::io::BufRead;

use git_hash::ObjectId;

use crate::ObjectError;

/// The graph-relevant part of a commit: its root tree and parents.
///
/// Only the leading `tree` line and the `parent` lines that follow it are
/// decoded; author, committer and message are never read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// OID of the root tree.
    pub tree: ObjectId,
    /// Parent commit OIDs (empty for root commit).
    pub parents: Vec<ObjectId>,
}

impl Commit {
    /// Parse commit content from raw bytes (no object header).
    pub fn parse(content: &[u8]) -> Result<Self, ObjectError> {
        let mut reader = content;
        Self::read_from(&mut reader)
    }

    /// Decode from a stream positioned at the start of the commit content.
    ///
    /// Reading stops at the first line that is not a `parent` line.
    pub fn read_from<R: BufRead + ?Sized>(reader: &mut R) -> Result<Self, ObjectError> {
        let mut line = Vec::with_capacity(48);
        reader.read_until(b'\n', &mut line)?;
        let tree = header_oid(&line, b"tree ")?
            .ok_or(ObjectError::MissingCommitField { field: "tree" })?;

        let mut parents = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            match header_oid(&line, b"parent ")? {
                Some(parent) => parents.push(parent),
                None => break,
            }
        }

        Ok(Self { tree, parents })
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }
}

/// Returns the id on a `"<key> <hex>\n"` line, or `None` if the line has a
/// different key.
fn header_oid(line: &[u8], key: &[u8]) -> Result<Option<ObjectId>, ObjectError> {
    let Some(value) = line.strip_prefix(key) else {
        return Ok(None);
    };
    let hex = value.strip_suffix(b"\n").unwrap_or(value);
    Ok(Some(ObjectId::from_hex_bytes(hex)?))
}
