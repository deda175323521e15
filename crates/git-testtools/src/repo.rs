use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::hash::hash_object;
use git_hash::ObjectId;
use tempfile::TempDir;

use crate::pack::{PackBuilder, WrittenPack};
use crate::write_loose_object;

/// A tree entry target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item {
    File(ObjectId),
    Dir(ObjectId),
}

struct PendingPack {
    builder: PackBuilder,
    deltify: bool,
    last_blob: Option<usize>,
}

/// A scratch repository in a temporary directory.
///
/// Objects are written loose unless a pack is being collected, see
/// [`TestRepo::begin_pack`].
pub struct TestRepo {
    dir: TempDir,
    bare: bool,
    commits: u32,
    pack: Option<PendingPack>,
    packs_written: usize,
}

impl TestRepo {
    /// A repository with a work tree and `HEAD -> refs/heads/main`.
    pub fn new() -> Self {
        Self::init(false)
    }

    /// A bare repository: the directory itself is the git dir.
    pub fn bare() -> Self {
        Self::init(true)
    }

    fn init(bare: bool) -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let repo = Self {
            dir,
            bare,
            commits: 0,
            pack: None,
            packs_written: 0,
        };
        fs::create_dir_all(repo.objects_dir().join("pack")).expect("create objects dir");
        fs::create_dir_all(repo.git_dir().join("refs/heads")).expect("create refs dir");
        fs::write(repo.git_dir().join("HEAD"), "ref: refs/heads/main\n").expect("write HEAD");
        repo
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn git_dir(&self) -> PathBuf {
        if self.bare {
            self.root().to_path_buf()
        } else {
            self.root().join(".git")
        }
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.git_dir().join("objects")
    }

    /// Store an object, loose or into the pending pack.
    pub fn write_object(&mut self, kind: &'static str, content: &[u8]) -> ObjectId {
        let Some(pending) = self.pack.as_mut() else {
            return write_loose_object(&self.objects_dir(), kind, content);
        };
        let n = match (kind, pending.last_blob) {
            ("blob", Some(base)) if pending.deltify => {
                pending.builder.add_ofs_delta(base, content)
            }
            _ => pending.builder.add(kind, content),
        };
        if kind == "blob" {
            pending.last_blob = Some(n);
        }
        hash_object(kind, content)
    }

    pub fn blob(&mut self, content: &[u8]) -> ObjectId {
        self.write_object("blob", content)
    }

    /// Write a tree from `(name, item)` pairs, sorted the way git sorts them.
    pub fn tree(&mut self, entries: &[(&str, Item)]) -> ObjectId {
        let mut sorted: Vec<(Vec<u8>, &str, Item)> = entries
            .iter()
            .map(|&(name, item)| {
                let mut key = name.as_bytes().to_vec();
                if matches!(item, Item::Dir(_)) {
                    key.push(b'/');
                }
                (key, name, item)
            })
            .collect();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));

        let mut content = Vec::new();
        for (_, name, item) in sorted {
            let (mode, id) = match item {
                Item::File(id) => ("100644", id),
                Item::Dir(id) => ("40000", id),
            };
            content.extend_from_slice(mode.as_bytes());
            content.push(b' ');
            content.extend_from_slice(name.as_bytes());
            content.push(0);
            content.extend_from_slice(id.as_bytes());
        }
        self.write_object("tree", &content)
    }

    /// Write a commit. Each call gets a distinct timestamp and message so
    /// identical trees and parents still give distinct ids.
    pub fn commit(&mut self, tree: ObjectId, parents: &[ObjectId]) -> ObjectId {
        self.commits += 1;
        let when = 1_700_000_000 + u64::from(self.commits) * 60;
        let mut text = format!("tree {tree}\n");
        for parent in parents {
            text.push_str(&format!("parent {parent}\n"));
        }
        text.push_str(&format!(
            "author A U Thor <author@example.com> {when} +0000\n\
             committer C O Mitter <committer@example.com> {when} +0000\n\
             \n\
             commit {}\n",
            self.commits
        ));
        self.write_object("commit", text.as_bytes())
    }

    /// Write blobs and nested trees for `files` (paths use `/`) and commit them.
    pub fn commit_files(&mut self, files: &[(&str, &[u8])], parents: &[ObjectId]) -> ObjectId {
        let owned = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.to_vec()))
            .collect();
        let tree = self.write_dir(owned);
        self.commit(tree, parents)
    }

    fn write_dir(&mut self, files: Vec<(String, Vec<u8>)>) -> ObjectId {
        let mut entries: Vec<(String, Item)> = Vec::new();
        let mut subdirs: BTreeMap<String, Vec<(String, Vec<u8>)>> = BTreeMap::new();
        for (path, content) in files {
            match path.split_once('/') {
                Some((dir, rest)) => subdirs
                    .entry(dir.to_string())
                    .or_default()
                    .push((rest.to_string(), content)),
                None => {
                    let id = self.blob(&content);
                    entries.push((path, Item::File(id)));
                }
            }
        }
        for (dir, files) in subdirs {
            let id = self.write_dir(files);
            entries.push((dir, Item::Dir(id)));
        }
        let borrowed: Vec<(&str, Item)> = entries.iter().map(|(n, i)| (n.as_str(), *i)).collect();
        self.tree(&borrowed)
    }

    /// Point `refs/heads/<name>` at `oid`.
    pub fn set_branch(&self, name: &str, oid: ObjectId) {
        let path = self.git_dir().join("refs/heads").join(name);
        fs::create_dir_all(path.parent().expect("ref has a parent")).expect("create ref dir");
        fs::write(path, format!("{oid}\n")).expect("write ref");
    }

    /// Replace HEAD's contents verbatim.
    pub fn set_head(&self, contents: &str) {
        fs::write(self.git_dir().join("HEAD"), contents).expect("write HEAD");
    }

    pub fn set_head_detached(&self, oid: ObjectId) {
        self.set_head(&format!("{oid}\n"));
    }

    /// Write `packed-refs` with the given `(refname, id)` lines.
    pub fn write_packed_refs(&self, refs: &[(&str, ObjectId)]) {
        let mut text = String::from("# pack-refs with: peeled fully-peeled sorted\n");
        for (name, oid) in refs {
            text.push_str(&format!("{oid} {name}\n"));
        }
        fs::write(self.git_dir().join("packed-refs"), text).expect("write packed-refs");
    }

    /// Write `objects/info/alternates` with one line per entry.
    pub fn set_alternates(&self, lines: &[&str]) {
        let info = self.objects_dir().join("info");
        fs::create_dir_all(&info).expect("create info dir");
        let mut text = lines.join("\n");
        text.push('\n');
        fs::write(info.join("alternates"), text).expect("write alternates");
    }

    /// Write a file relative to the work tree root.
    pub fn write_file(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(&path, content).expect("write work tree file");
        path
    }

    /// Collect subsequent objects into a pack instead of writing them loose.
    /// With `deltify`, each blob after the first is stored as an OFS_DELTA
    /// against the previous blob.
    pub fn begin_pack(&mut self, deltify: bool) {
        assert!(self.pack.is_none(), "pack already in progress");
        self.pack = Some(PendingPack {
            builder: PackBuilder::new(),
            deltify,
            last_blob: None,
        });
    }

    /// Write the pending pack into `objects/pack` and go back to loose writes.
    pub fn finish_pack(&mut self) -> WrittenPack {
        let pending = self.pack.take().expect("no pack in progress");
        self.packs_written += 1;
        let name = format!("pack-{:040x}", self.packs_written);
        pending.builder.write(&self.objects_dir().join("pack"), &name)
    }
}
