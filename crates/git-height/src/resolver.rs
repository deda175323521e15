//! Height resolution over the commit graph.
//!
//! The walk uses an explicit stack so deep histories never recurse. A commit
//! is decoded once: on first visit its tracked file is compared against the
//! baseline, and if unchanged its parents are remembered in the frame until
//! all of their heights are known.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use git_hash::collections::{OidMap, OidSet};
use git_hash::ObjectId;
use git_object::ObjectType;
use git_repository::Repository;
use tracing::{debug, info};

use crate::format::format_version;
use crate::version_file;
use crate::HeightError;

pub const DEFAULT_VERSION_FILE: &str = "version.json";

/// Whether trees already proven unchanged are skipped on later commits.
///
/// Both settings give the same heights; `Disabled` re-reads every tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TreeMemo {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// Tracked file, relative to the work tree root. `/` and `\` both
    /// separate components.
    pub version_file: PathBuf,
    pub tree_memo: TreeMemo,
    /// Checked between commits; once set the walk stops with
    /// [`HeightError::Cancelled`].
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            version_file: PathBuf::from(DEFAULT_VERSION_FILE),
            tree_memo: TreeMemo::default(),
            cancel: None,
        }
    }
}

/// Outcome of one resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub head: ObjectId,
    /// Baseline version from the working copy.
    pub version: String,
    pub height: u32,
    pub formatted: String,
}

struct Frame {
    commit: ObjectId,
    /// Set once the commit has been decoded and found unchanged.
    parents: Option<Vec<ObjectId>>,
}

/// Computes version heights for one repository.
///
/// Heights and the tree memo persist across calls made with the same
/// baseline; a call with a different baseline starts from empty tables.
pub struct HeightResolver<'r> {
    repo: &'r Repository,
    options: ResolverOptions,
    components: Vec<String>,
    /// Baseline the tables below were computed against.
    memo_baseline: Option<String>,
    heights: OidMap<u32>,
    /// Ids proven to lead to an unchanged version, indexed by path depth.
    known_trees: Vec<OidSet>,
}

impl<'r> HeightResolver<'r> {
    pub fn new(repo: &'r Repository, options: ResolverOptions) -> Result<Self, HeightError> {
        let components = path_components(&options.version_file)?;
        let known_trees = vec![OidSet::new(); components.len() + 1];
        Ok(Self {
            repo,
            options,
            components,
            memo_baseline: None,
            heights: OidMap::new(),
            known_trees,
        })
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    /// Resolve HEAD against the working copy's version file.
    pub fn resolve(&mut self) -> Result<Resolution, HeightError> {
        info!(
            version_file = %self.options.version_file.display(),
            git_dir = %self.repo.git_dir().display(),
            "determining version"
        );
        let head = self.repo.head_commit_id()?;
        let version = self.baseline(&head)?;
        info!(%version, "current version");

        let height = self.height_of(head, &version)?;
        let formatted = format_version(&version, height);
        info!(%head, height, %formatted, "resolved version");
        Ok(Resolution {
            head,
            version,
            height,
            formatted,
        })
    }

    /// Height of `head` relative to `baseline`.
    ///
    /// A commit whose tracked file is absent or differs from `baseline` has
    /// height 0; any other commit is one more than its highest parent, and a
    /// root commit that matches is 0.
    pub fn height_of(&mut self, head: ObjectId, baseline: &str) -> Result<u32, HeightError> {
        self.use_baseline(baseline);
        let mut stack = vec![Frame {
            commit: head,
            parents: None,
        }];

        while let Some(frame) = stack.last_mut() {
            self.check_cancelled()?;
            let commit = frame.commit;
            if self.heights.contains_key(&commit) {
                stack.pop();
                continue;
            }

            let parents = match frame.parents.take() {
                Some(parents) => parents,
                None => {
                    debug!(%commit, pending = stack.len(), "analyzing commit");
                    let decoded = self.repo.get_commit(&commit)?;
                    if self.version_changed(&commit, decoded.tree, baseline)? {
                        self.heights.insert(commit, 0);
                        stack.pop();
                        continue;
                    }
                    decoded.parents
                }
            };

            let mut height = 0;
            let mut unknown = Vec::new();
            for parent in &parents {
                match self.heights.get(parent) {
                    Some(&h) => height = height.max(h + 1),
                    None => unknown.push(*parent),
                }
            }

            if unknown.is_empty() {
                debug!(%commit, height, "commit resolved");
                self.heights.insert(commit, height);
                stack.pop();
            } else {
                if let Some(frame) = stack.last_mut() {
                    frame.parents = Some(parents);
                }
                stack.extend(unknown.into_iter().map(|parent| Frame {
                    commit: parent,
                    parents: None,
                }));
            }
        }

        // the stack only empties once `head` itself is resolved
        Ok(self.known_height(&head).unwrap_or_default())
    }

    fn use_baseline(&mut self, baseline: &str) {
        if self.memo_baseline.as_deref() == Some(baseline) {
            return;
        }
        if self.memo_baseline.is_some() {
            debug!(from = ?self.memo_baseline, to = %baseline, "baseline changed, clearing memo");
        }
        self.heights.clear();
        for known in &mut self.known_trees {
            known.clear();
        }
        self.memo_baseline = Some(baseline.to_string());
    }

    /// Height already computed for `commit` against the most recent
    /// baseline, if any.
    pub fn known_height(&self, commit: &ObjectId) -> Option<u32> {
        self.heights.get(commit).copied()
    }

    /// Walk the tracked path through `tree` and report whether the version
    /// differs from `baseline`.
    fn version_changed(
        &mut self,
        commit: &ObjectId,
        tree: ObjectId,
        baseline: &str,
    ) -> Result<bool, HeightError> {
        let memo = self.options.tree_memo == TreeMemo::Enabled;
        let mut visited = Vec::with_capacity(self.components.len() + 1);
        let mut current = tree;

        for depth in 0..=self.components.len() {
            if current.is_null() {
                let missing = self.component(depth.saturating_sub(1));
                debug!(%commit, component = missing, "version file absent");
                return Ok(true);
            }
            if memo && self.known_trees[depth].contains(&current) {
                debug!(%commit, depth, id = %current, "tree unchanged, not inspecting");
                break;
            }
            visited.push(current);

            if depth == self.components.len() {
                let blob = self.repo.get_object(&current, ObjectType::Blob)?;
                let version = version_file::read_version(blob)?;
                debug!(%commit, version = ?version, "version in commit");
                if version.as_deref() != Some(baseline) {
                    info!(
                        from = %baseline,
                        to = ?version,
                        %commit,
                        "version changed, using commit as baseline"
                    );
                    return Ok(true);
                }
            } else {
                let name = self.components[depth].as_bytes();
                current = self.repo.get_tree_entry(&current, name)?;
                debug!(%commit, component = %self.component(depth), id = %current, "tree step");
            }
        }

        if memo {
            for (depth, id) in visited.into_iter().enumerate() {
                self.known_trees[depth].insert(id);
            }
        }
        Ok(false)
    }

    /// The baseline version: the working copy's file, or HEAD's copy in a
    /// bare repository.
    fn baseline(&self, head: &ObjectId) -> Result<String, HeightError> {
        let (version, source) = match self.repo.work_tree() {
            Some(work_tree) => {
                let path = work_tree.join(self.components.iter().collect::<PathBuf>());
                (version_file::read_version_file(&path)?, path)
            }
            None => (self.committed_version(head)?, self.options.version_file.clone()),
        };
        version.ok_or(HeightError::MissingVersion(source))
    }

    fn committed_version(&self, commit: &ObjectId) -> Result<Option<String>, HeightError> {
        let mut current = self.repo.get_commit(commit)?.tree;
        for component in &self.components {
            current = self.repo.get_tree_entry(&current, component.as_bytes())?;
            if current.is_null() {
                return Err(HeightError::MissingVersionFile(
                    self.options.version_file.clone(),
                ));
            }
        }
        let blob = self.repo.get_object(&current, ObjectType::Blob)?;
        version_file::read_version(blob)
    }

    fn component(&self, depth: usize) -> &str {
        self.components.get(depth).map_or("", String::as_str)
    }

    fn check_cancelled(&self) -> Result<(), HeightError> {
        match &self.options.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(HeightError::Cancelled),
            _ => Ok(()),
        }
    }
}

/// Split a relative path on `/` and `\`, dropping empty and `.` components.
fn path_components(path: &Path) -> Result<Vec<String>, HeightError> {
    let invalid = || HeightError::InvalidVersionPath(path.to_path_buf());
    let text = path.to_str().ok_or_else(invalid)?;
    if path.has_root() {
        return Err(invalid());
    }
    let mut components = Vec::new();
    for part in text.split(|c| c == '/' || c == '\\') {
        match part {
            "" | "." => continue,
            ".." => return Err(invalid()),
            _ => components.push(part.to_string()),
        }
    }
    if components.is_empty() {
        return Err(invalid());
    }
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components_split_on_both_separators() {
        assert_eq!(
            path_components(Path::new("src\\app/version.json")).unwrap(),
            vec!["src", "app", "version.json"]
        );
        assert_eq!(
            path_components(Path::new("./version.json")).unwrap(),
            vec!["version.json"]
        );
    }

    #[test]
    fn escaping_or_empty_paths_are_rejected() {
        for bad in ["", ".", "../version.json", "/etc/version.json"] {
            assert!(
                matches!(path_components(Path::new(bad)), Err(HeightError::InvalidVersionPath(_))),
                "{bad:?} accepted"
            );
        }
    }

    #[test]
    fn default_options() {
        let options = ResolverOptions::default();
        assert_eq!(options.version_file, PathBuf::from("version.json"));
        assert_eq!(options.tree_memo, TreeMemo::Enabled);
        assert!(options.cancel.is_none());
    }
}
