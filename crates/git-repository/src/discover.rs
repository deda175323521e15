use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{DiscoveredRepo, RepoError, RepositoryKind};

/// Discover a git repository by walking up from `start`.
///
/// At each level, in order:
/// 1. a `.git/` directory marks a work tree root
/// 2. a `.git` file redirects with `gitdir: <path>`
/// 3. the directory itself may be a bare git dir (HEAD, objects/, refs/)
pub fn discover_git_dir(start: &Path) -> Result<DiscoveredRepo, RepoError> {
    let start = fs::canonicalize(start).map_err(|_| RepoError::NotFound(start.to_path_buf()))?;

    let mut current = start.clone();
    loop {
        if let Some(found) = inspect_dir(&current)? {
            debug!(git_dir = %found.git_dir.display(), "discovered repository");
            return Ok(found);
        }
        match current.parent() {
            Some(parent) if parent != current => current = parent.to_path_buf(),
            _ => return Err(RepoError::NotFound(start)),
        }
    }
}

/// Open `path` as either a work tree root or a git directory, without
/// walking up.
pub fn open_path(path: &Path) -> Result<DiscoveredRepo, RepoError> {
    let path = fs::canonicalize(path).map_err(|_| RepoError::NotFound(path.to_path_buf()))?;
    inspect_dir(&path)?.ok_or(RepoError::NotFound(path))
}

fn inspect_dir(dir: &Path) -> Result<Option<DiscoveredRepo>, RepoError> {
    let dot_git = dir.join(".git");

    if dot_git.is_dir() {
        return Ok(Some(DiscoveredRepo {
            common_dir: resolve_common_dir(&dot_git),
            git_dir: dot_git,
            work_tree: Some(dir.to_path_buf()),
            kind: RepositoryKind::Normal,
        }));
    }

    if dot_git.is_file() {
        let target = parse_gitdir_file(&dot_git)?;
        let target = if target.is_absolute() { target } else { dir.join(target) };
        let git_dir = fs::canonicalize(&target).map_err(|e| RepoError::InvalidGitDir {
            path: dot_git.clone(),
            reason: format!("cannot resolve gitdir target: {e}"),
        })?;
        if !is_git_dir(&git_dir) {
            return Err(RepoError::InvalidGitDir {
                path: git_dir,
                reason: "missing HEAD, objects/, or refs/".to_string(),
            });
        }
        let kind = if git_dir.join("commondir").is_file() {
            RepositoryKind::LinkedWorktree
        } else {
            RepositoryKind::Normal
        };
        return Ok(Some(DiscoveredRepo {
            common_dir: resolve_common_dir(&git_dir),
            git_dir,
            work_tree: Some(dir.to_path_buf()),
            kind,
        }));
    }

    if is_git_dir(dir) {
        return Ok(Some(open_git_dir(dir)));
    }

    Ok(None)
}

/// Classify a directory already known to be a git dir.
fn open_git_dir(git_dir: &Path) -> DiscoveredRepo {
    let common_dir = resolve_common_dir(git_dir);

    // `<work tree>/.git` opened directly
    if git_dir.file_name().is_some_and(|n| n == ".git") {
        if let Some(parent) = git_dir.parent() {
            return DiscoveredRepo {
                git_dir: git_dir.to_path_buf(),
                work_tree: Some(parent.to_path_buf()),
                common_dir,
                kind: RepositoryKind::Normal,
            };
        }
    }

    DiscoveredRepo {
        git_dir: git_dir.to_path_buf(),
        work_tree: None,
        common_dir,
        kind: RepositoryKind::Bare,
    }
}

/// Check if a directory looks like a git dir (has HEAD, objects/, refs/).
pub fn is_git_dir(path: &Path) -> bool {
    if !path.join("HEAD").is_file() {
        return false;
    }
    if path.join("commondir").is_file() {
        return resolve_common_dir(path).join("objects").is_dir();
    }
    path.join("objects").is_dir() && path.join("refs").is_dir()
}

/// Parse a `.git` file containing `gitdir: <path>`.
pub fn parse_gitdir_file(path: &Path) -> Result<PathBuf, RepoError> {
    let content = fs::read_to_string(path).map_err(|e| RepoError::InvalidGitDir {
        path: path.to_path_buf(),
        reason: format!("cannot read .git file: {e}"),
    })?;
    let content = content.trim();
    let target = content
        .strip_prefix("gitdir: ")
        .ok_or_else(|| RepoError::InvalidGitDir {
            path: path.to_path_buf(),
            reason: format!("expected 'gitdir: <path>', got: {content}"),
        })?;
    Ok(PathBuf::from(target))
}

/// The directory holding shared objects and refs.
///
/// Linked worktree git dirs carry a `commondir` file pointing at it;
/// otherwise it is the git dir itself.
fn resolve_common_dir(git_dir: &Path) -> PathBuf {
    let commondir_file = git_dir.join("commondir");
    if let Ok(content) = fs::read_to_string(&commondir_file) {
        let resolved = git_dir.join(content.trim());
        return fs::canonicalize(&resolved).unwrap_or(resolved);
    }
    git_dir.to_path_buf()
}
