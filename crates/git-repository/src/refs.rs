//! Read-only ref resolution over the files backend.
//!
//! Loose ref files hold either `<40-hex>\n` or `ref: <target>\n`. A name with
//! no loose file falls back to `packed-refs`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;
use git_hash::ObjectId;
use tracing::trace;

use crate::RepoError;

/// Maximum number of symbolic hops followed before giving up.
pub const MAX_SYMREF_DEPTH: usize = 5;

/// Contents of one loose ref file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    Direct(ObjectId),
    Symbolic(String),
}

/// Where refs live: per-worktree names (`HEAD`) under `git_dir`, shared
/// ones under `common_dir`.
#[derive(Debug, Clone)]
pub(crate) struct RefStore {
    git_dir: PathBuf,
    common_dir: PathBuf,
}

impl RefStore {
    pub(crate) fn new(git_dir: PathBuf, common_dir: PathBuf) -> Self {
        Self { git_dir, common_dir }
    }

    /// Follow `name` to an object id.
    pub(crate) fn resolve(&self, name: &str) -> Result<ObjectId, RepoError> {
        let mut current = name.to_string();
        for _ in 0..=MAX_SYMREF_DEPTH {
            match self.read_loose(&current)? {
                Some(RefTarget::Direct(oid)) => {
                    trace!(name, %oid, "resolved ref");
                    return Ok(oid);
                }
                Some(RefTarget::Symbolic(target)) => {
                    trace!(from = %current, to = %target, "following symbolic ref");
                    current = target;
                }
                None => {
                    return self
                        .read_packed(&current)?
                        .ok_or(RepoError::RefNotFound(current));
                }
            }
        }
        Err(RepoError::SymrefLoop(name.to_string()))
    }

    /// Read a loose ref file, `None` if it does not exist.
    pub(crate) fn read_loose(&self, name: &str) -> Result<Option<RefTarget>, RepoError> {
        let path = self.loose_path(name)?;
        let contents = match fs::read(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            // `refs/heads` itself, say
            Err(_) if path.is_dir() => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        parse_loose(name, contents.trim()).map(Some)
    }

    /// Look `name` up in `packed-refs`.
    pub(crate) fn read_packed(&self, name: &str) -> Result<Option<ObjectId>, RepoError> {
        let data = match fs::read(self.common_dir.join("packed-refs")) {
            Ok(d) => d,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        find_packed(&data, name)
    }

    fn loose_path(&self, name: &str) -> Result<PathBuf, RepoError> {
        check_name(name)?;
        let base: &Path = if name.starts_with("refs/") {
            &self.common_dir
        } else {
            &self.git_dir
        };
        Ok(base.join(name))
    }
}

fn parse_loose(name: &str, contents: &[u8]) -> Result<RefTarget, RepoError> {
    if let Some(target) = contents.strip_prefix(b"ref: ") {
        let target = target.trim().to_str().map_err(|_| RepoError::InvalidRef {
            name: name.to_string(),
            reason: "symbolic target is not UTF-8".into(),
        })?;
        return Ok(RefTarget::Symbolic(target.to_string()));
    }
    if contents.len() != ObjectId::HEX_LEN {
        return Err(RepoError::InvalidRef {
            name: name.to_string(),
            reason: format!("expected {} hex digits, found {} bytes", ObjectId::HEX_LEN, contents.len()),
        });
    }
    Ok(RefTarget::Direct(ObjectId::from_hex_bytes(contents)?))
}

/// Scan packed-refs text for `name`.
///
/// Format: a `#` header, `<hex> <refname>` lines, and `^<hex>` peel lines
/// attached to the preceding tag.
fn find_packed(data: &[u8], name: &str) -> Result<Option<ObjectId>, RepoError> {
    for line in data.lines() {
        if line.is_empty() || line.starts_with(b"#") || line.starts_with(b"^") {
            continue;
        }
        let space = line.find_byte(b' ').ok_or_else(|| RepoError::InvalidRef {
            name: name.to_string(),
            reason: "malformed packed-refs line".into(),
        })?;
        if line[space + 1..].trim_end() == name.as_bytes() {
            return Ok(Some(ObjectId::from_hex_bytes(&line[..space])?));
        }
    }
    Ok(None)
}

/// Reject names that would escape the git directory.
fn check_name(name: &str) -> Result<(), RepoError> {
    let bad = name.is_empty()
        || name.starts_with('/')
        || name.contains('\\')
        || name.split('/').any(|c| c.is_empty() || c == "." || c == "..");
    if bad {
        return Err(RepoError::InvalidRef {
            name: name.to_string(),
            reason: "not a valid ref name".into(),
        });
    }
    Ok(())
}
