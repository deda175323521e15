//! Repository discovery, ref resolution, and typed object access.

mod discover;
mod error;
pub mod refs;

pub use discover::{is_git_dir, parse_gitdir_file};
pub use error::RepoError;

use std::io::BufReader;
use std::path::{Path, PathBuf};

use git_hash::ObjectId;
use git_object::{Commit, ObjectRead, ObjectType, TreeEntryReader};
use git_odb::{ObjectDatabase, OdbOptions};

use crate::refs::RefStore;

/// Type of repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepositoryKind {
    /// Normal repo with a working tree.
    Normal,
    /// Bare repo (no working tree).
    Bare,
    /// Linked worktree sharing objects/refs with a main repo.
    LinkedWorktree,
}

/// Result of repository discovery before full opening.
#[derive(Debug)]
pub struct DiscoveredRepo {
    pub git_dir: PathBuf,
    pub work_tree: Option<PathBuf>,
    pub common_dir: PathBuf,
    pub kind: RepositoryKind,
}

/// An opened repository: its directories, refs, and object database.
pub struct Repository {
    git_dir: PathBuf,
    work_tree: Option<PathBuf>,
    common_dir: PathBuf,
    kind: RepositoryKind,
    refs: RefStore,
    odb: ObjectDatabase,
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("git_dir", &self.git_dir)
            .field("work_tree", &self.work_tree)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Open an existing repository at the given path.
    ///
    /// `path` should point to either the `.git` directory, a bare
    /// repository, or the working tree root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepoError> {
        Self::open_with_options(path, OdbOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: OdbOptions) -> Result<Self, RepoError> {
        let discovered = discover::open_path(path.as_ref())?;
        Self::from_discovered(discovered, options)
    }

    /// Discover a repository starting from the given directory, walking up.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, RepoError> {
        Self::discover_with_options(start, OdbOptions::default())
    }

    pub fn discover_with_options(
        start: impl AsRef<Path>,
        options: OdbOptions,
    ) -> Result<Self, RepoError> {
        let discovered = discover::discover_git_dir(start.as_ref())?;
        Self::from_discovered(discovered, options)
    }

    fn from_discovered(discovered: DiscoveredRepo, options: OdbOptions) -> Result<Self, RepoError> {
        let DiscoveredRepo {
            git_dir,
            work_tree,
            common_dir,
            kind,
        } = discovered;
        let odb = ObjectDatabase::open_with_options(common_dir.join("objects"), options)?;
        Ok(Self {
            refs: RefStore::new(git_dir.clone(), common_dir.clone()),
            git_dir,
            work_tree,
            common_dir,
            kind,
            odb,
        })
    }

    /// Path to the git directory.
    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    /// Path to the working tree (None for bare repos).
    pub fn work_tree(&self) -> Option<&Path> {
        self.work_tree.as_deref()
    }

    pub fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    pub fn kind(&self) -> RepositoryKind {
        self.kind
    }

    pub fn is_bare(&self) -> bool {
        self.kind == RepositoryKind::Bare
    }

    pub fn odb(&self) -> &ObjectDatabase {
        &self.odb
    }

    /// The commit HEAD points at, following symbolic refs.
    pub fn head_commit_id(&self) -> Result<ObjectId, RepoError> {
        self.refs.resolve("HEAD")
    }

    /// Resolve a full ref name such as `refs/heads/main`.
    pub fn resolve_reference(&self, name: &str) -> Result<ObjectId, RepoError> {
        self.refs.resolve(name)
    }

    /// Read an object that must exist and have type `expected`.
    pub fn get_object(
        &self,
        oid: &ObjectId,
        expected: ObjectType,
    ) -> Result<Box<dyn ObjectRead>, RepoError> {
        Ok(self.odb.get_object(oid, expected)?)
    }

    /// Decode the tree and parents of a commit.
    pub fn get_commit(&self, oid: &ObjectId) -> Result<Commit, RepoError> {
        let obj = self.get_object(oid, ObjectType::Commit)?;
        Ok(Commit::read_from(&mut BufReader::new(obj))?)
    }

    /// Id bound to `name` in tree `tree`, or [`ObjectId::NULL`] if absent.
    pub fn get_tree_entry(&self, tree: &ObjectId, name: &[u8]) -> Result<ObjectId, RepoError> {
        let obj = self.get_object(tree, ObjectType::Tree)?;
        Ok(TreeEntryReader::new(obj).find(name)?)
    }
}
