//! Object database for the git-height object store.
//!
//! Provides a single interface to read objects across loose storage,
//! packfiles, and alternate object databases. Objects come back as
//! [`ObjectRead`] streams regardless of where they were found.

pub mod alternates;
mod search;

use std::cell::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};

use git_hash::ObjectId;
use git_loose::LooseObjectStore;
use git_object::{ObjectRead, ObjectType};
use git_pack::{CacheKind, Pack};
use tracing::debug;

pub use error::OdbError;

mod error {
    use std::path::PathBuf;

    use git_hash::ObjectId;

    #[derive(Debug, thiserror::Error)]
    pub enum OdbError {
        #[error("object not found: {0}")]
        NotFound(ObjectId),

        #[error("alternates error: {0}")]
        Alternates(String),

        #[error("circular alternates chain detected at {0}")]
        CircularAlternates(PathBuf),

        #[error(transparent)]
        Loose(#[from] git_loose::LooseError),

        #[error(transparent)]
        Pack(#[from] git_pack::PackError),

        #[error(transparent)]
        Object(#[from] git_object::ObjectError),

        #[error(transparent)]
        Io(#[from] std::io::Error),
    }
}

/// Tunables for an [`ObjectDatabase`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OdbOptions {
    /// Cache given to each pack.
    pub cache: CacheKind,
}

/// Object database rooted at one objects directory.
///
/// Search order is loose, then packs, then alternates. Packs are discovered
/// on the first lookup that reaches them and their files are opened lazily.
pub struct ObjectDatabase {
    objects_dir: PathBuf,
    loose: LooseObjectStore,
    packs: OnceCell<Vec<Pack>>,
    alternates: Vec<ObjectDatabase>,
    options: OdbOptions,
}

impl ObjectDatabase {
    /// Open the object database at the given objects directory.
    pub fn open(objects_dir: impl AsRef<Path>) -> Result<Self, OdbError> {
        Self::open_with_options(objects_dir, OdbOptions::default())
    }

    pub fn open_with_options(
        objects_dir: impl AsRef<Path>,
        options: OdbOptions,
    ) -> Result<Self, OdbError> {
        let objects_dir = objects_dir.as_ref().to_path_buf();
        let alternates = alternates::load_alternates(&objects_dir, &options)?;
        Ok(Self::with_alternates(objects_dir, options, alternates))
    }

    fn with_alternates(objects_dir: PathBuf, options: OdbOptions, alternates: Vec<Self>) -> Self {
        Self {
            loose: LooseObjectStore::open(&objects_dir),
            objects_dir,
            packs: OnceCell::new(),
            alternates,
            options,
        }
    }

    /// Find an object of any type.
    pub fn find_object(&self, oid: &ObjectId) -> Result<Option<Box<dyn ObjectRead>>, OdbError> {
        search::find_object(self, oid)
    }

    /// Read an object that must exist and be an `expected`.
    pub fn get_object(
        &self,
        oid: &ObjectId,
        expected: ObjectType,
    ) -> Result<Box<dyn ObjectRead>, OdbError> {
        let obj = self.find_object(oid)?.ok_or(OdbError::NotFound(*oid))?;
        obj.object_type().expect(expected)?;
        Ok(obj)
    }

    /// Check if an object exists without decoding it.
    pub fn contains(&self, oid: &ObjectId) -> Result<bool, OdbError> {
        search::contains(self, oid)
    }

    /// Get the path to the objects directory.
    pub fn objects_dir(&self) -> &Path {
        &self.objects_dir
    }

    /// Alternate databases, in file order.
    pub fn alternates(&self) -> &[ObjectDatabase] {
        &self.alternates
    }

    pub fn options(&self) -> &OdbOptions {
        &self.options
    }

    /// Packs in this objects directory, discovered on first call.
    pub fn packs(&self) -> Result<&[Pack], OdbError> {
        if let Some(packs) = self.packs.get() {
            return Ok(packs);
        }
        let packs = discover_packs(&self.objects_dir, &self.options.cache)?;
        Ok(self.packs.get_or_init(|| packs))
    }
}

/// Find `pack/*.idx` files with a matching `.pack`, newest first.
fn discover_packs(objects_dir: &Path, cache: &CacheKind) -> Result<Vec<Pack>, OdbError> {
    let pack_dir = objects_dir.join("pack");
    if !pack_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut entries: Vec<_> = fs::read_dir(&pack_dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "idx"))
        .collect();

    // Sort by modification time (newest first) to match C git behavior
    entries.sort_by(|a, b| {
        let a_time = fs::metadata(a).and_then(|m| m.modified()).ok();
        let b_time = fs::metadata(b).and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time).then_with(|| a.cmp(b))
    });

    let mut packs = Vec::with_capacity(entries.len());
    for idx in entries {
        if !idx.with_extension("pack").is_file() {
            debug!(idx = %idx.display(), "skipping index without pack");
            continue;
        }
        packs.push(Pack::new(idx, cache));
    }
    debug!(dir = %pack_dir.display(), count = packs.len(), "discovered packs");
    Ok(packs)
}
