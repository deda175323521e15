//! Loose object storage and zlib object decoding.
//!
//! Each loose object lives at `.git/objects/XX/YYYY...` where `XX` is the first
//! byte of the OID in hex and `YYYY...` is the rest. The file content is
//! zlib-compressed `"<type> <size>\0<content>"`.
//!
//! The zlib layer ([`ZlibStream`]) is shared with the pack reader, whose
//! entries are zlib streams without the loose header.

mod stream;
mod zlib;

pub use stream::{LooseObjectStream, ObjectDecodeStream};
pub use zlib::{is_zlib_header, ZlibStream};

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use git_hash::ObjectId;
use git_object::ObjectRead;
use tracing::trace;

/// Interface to the loose object directory (`.git/objects/`).
#[derive(Debug, Clone)]
pub struct LooseObjectStore {
    /// Path to the objects directory.
    objects_dir: PathBuf,
}

impl LooseObjectStore {
    /// Open the loose object store at the given path.
    pub fn open(objects_dir: impl AsRef<Path>) -> Self {
        Self {
            objects_dir: objects_dir.as_ref().to_path_buf(),
        }
    }

    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Get the file path for a given OID.
    pub fn object_path(&self, oid: &ObjectId) -> PathBuf {
        self.objects_dir.join(oid.loose_path())
    }

    /// Check if a loose object exists.
    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.object_path(oid).is_file()
    }

    /// Open a streaming reader for a loose object.
    ///
    /// Returns `Ok(None)` if the object does not exist. The header is parsed
    /// immediately; content bytes are inflated on demand.
    pub fn stream(&self, oid: &ObjectId) -> Result<Option<LooseObjectStream>, LooseError> {
        let path = self.object_path(oid);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(LooseError::Io(e)),
        };
        let stream = ObjectDecodeStream::open(BufReader::new(file))?;
        trace!(%oid, kind = %stream.object_type(), size = stream.size(), "opened loose object");
        Ok(Some(stream))
    }
}

/// Errors from loose object operations.
#[derive(Debug, thiserror::Error)]
pub enum LooseError {
    #[error("invalid zlib header {:02x} {:02x}", .0[0], .0[1])]
    InvalidZlibHeader([u8; 2]),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("object parse error: {0}")]
    Object(#[from] git_object::ObjectError),
}
