//! Tests for the Repository struct: open, discover, refs, and object access.

use std::fs;

use git_hash::ObjectId;
use git_object::{ObjectError, ObjectRead, ObjectType};
use git_odb::OdbError;
use git_repository::{RepoError, Repository, RepositoryKind};
use git_testtools::{Item, TestRepo};

fn canonical_root(repo: &TestRepo) -> std::path::PathBuf {
    fs::canonicalize(repo.root()).unwrap()
}

#[test]
fn open_from_work_tree() {
    let repo = TestRepo::new();
    let root = canonical_root(&repo);
    let opened = Repository::open(repo.root()).unwrap();

    assert_eq!(opened.kind(), RepositoryKind::Normal);
    assert!(!opened.is_bare());
    assert_eq!(opened.work_tree().unwrap(), root);
    assert_eq!(opened.git_dir(), root.join(".git"));
    assert_eq!(opened.odb().objects_dir(), root.join(".git/objects"));
}

#[test]
fn open_from_git_dir() {
    let repo = TestRepo::new();
    let root = canonical_root(&repo);
    let opened = Repository::open(repo.git_dir()).unwrap();

    assert_eq!(opened.kind(), RepositoryKind::Normal);
    assert_eq!(opened.work_tree().unwrap(), root);
}

#[test]
fn open_bare() {
    let repo = TestRepo::bare();
    let opened = Repository::open(repo.root()).unwrap();

    assert!(opened.is_bare());
    assert!(opened.work_tree().is_none());
    assert_eq!(opened.git_dir(), canonical_root(&repo));
}

#[test]
fn open_does_not_walk_up() {
    let repo = TestRepo::new();
    let sub = repo.root().join("src");
    fs::create_dir_all(&sub).unwrap();
    assert!(matches!(Repository::open(&sub), Err(RepoError::NotFound(_))));
}

#[test]
fn discover_from_subdirectory() {
    let repo = TestRepo::new();
    repo.write_file("src/deep/lib.rs", b"fn main() {}\n");
    let found = Repository::discover(repo.root().join("src/deep")).unwrap();
    assert_eq!(found.work_tree().unwrap(), canonical_root(&repo));
}

#[test]
fn gitdir_file_redirects() {
    let repo = TestRepo::new();
    let elsewhere = tempfile::tempdir().unwrap();
    fs::write(
        elsewhere.path().join(".git"),
        format!("gitdir: {}\n", repo.git_dir().display()),
    )
    .unwrap();

    let opened = Repository::open(elsewhere.path()).unwrap();
    assert_eq!(opened.git_dir(), canonical_root(&repo).join(".git"));
    assert_eq!(
        opened.work_tree().unwrap(),
        fs::canonicalize(elsewhere.path()).unwrap()
    );
}

#[test]
fn head_follows_branch() {
    let mut repo = TestRepo::new();
    let commit = repo.commit_files(&[("version.json", b"{}")], &[]);
    repo.set_branch("main", commit);

    let opened = Repository::open(repo.root()).unwrap();
    assert_eq!(opened.head_commit_id().unwrap(), commit);
    assert_eq!(opened.resolve_reference("refs/heads/main").unwrap(), commit);
}

#[test]
fn detached_head() {
    let mut repo = TestRepo::new();
    let commit = repo.commit_files(&[("a", b"a")], &[]);
    repo.set_head_detached(commit);

    let opened = Repository::open(repo.root()).unwrap();
    assert_eq!(opened.head_commit_id().unwrap(), commit);
}

#[test]
fn packed_refs_fallback() {
    let mut repo = TestRepo::new();
    let commit = repo.commit_files(&[("a", b"a")], &[]);
    repo.write_packed_refs(&[("refs/heads/main", commit)]);

    let opened = Repository::open(repo.root()).unwrap();
    assert_eq!(opened.head_commit_id().unwrap(), commit);
}

#[test]
fn loose_ref_wins_over_packed() {
    let mut repo = TestRepo::new();
    let old = repo.commit_files(&[("a", b"a")], &[]);
    let new = repo.commit_files(&[("a", b"b")], &[old]);
    repo.write_packed_refs(&[("refs/heads/main", old)]);
    repo.set_branch("main", new);

    let opened = Repository::open(repo.root()).unwrap();
    assert_eq!(opened.head_commit_id().unwrap(), new);
}

#[test]
fn unborn_head_is_ref_not_found() {
    let repo = TestRepo::new();
    let opened = Repository::open(repo.root()).unwrap();
    assert!(matches!(
        opened.head_commit_id(),
        Err(RepoError::RefNotFound(name)) if name == "refs/heads/main"
    ));
}

#[test]
fn garbage_head_is_invalid() {
    let repo = TestRepo::new();
    repo.set_head("not a ref\n");
    let opened = Repository::open(repo.root()).unwrap();
    assert!(matches!(
        opened.head_commit_id(),
        Err(RepoError::InvalidRef { .. })
    ));
}

#[test]
fn commit_and_tree_access() {
    let mut repo = TestRepo::new();
    let first = repo.commit_files(&[("version.json", b"{\"version\":\"1.0\"}")], &[]);
    let blob = repo.blob(b"{\"version\":\"1.1\"}");
    let config = repo.tree(&[("version.json", Item::File(blob))]);
    let root = repo.tree(&[("config", Item::Dir(config))]);
    let second = repo.commit(root, &[first]);

    let opened = Repository::open(repo.root()).unwrap();
    let commit = opened.get_commit(&second).unwrap();
    assert_eq!(commit.tree, root);
    assert_eq!(commit.parents, vec![first]);
    assert!(opened.get_commit(&first).unwrap().is_root());

    assert_eq!(opened.get_tree_entry(&root, b"config").unwrap(), config);
    assert_eq!(opened.get_tree_entry(&config, b"version.json").unwrap(), blob);
    assert_eq!(opened.get_tree_entry(&root, b"missing").unwrap(), ObjectId::NULL);
}

#[test]
fn packed_history_is_readable() {
    let mut repo = TestRepo::new();
    repo.begin_pack(true);
    let first = repo.commit_files(&[("version.json", b"{\"version\":\"2.0\"}")], &[]);
    let second = repo.commit_files(&[("version.json", b"{\"version\":\"2.1\"}")], &[first]);
    repo.finish_pack();
    repo.set_branch("main", second);

    let opened = Repository::open(repo.root()).unwrap();
    let head = opened.head_commit_id().unwrap();
    let commit = opened.get_commit(&head).unwrap();
    assert_eq!(commit.parents, vec![first]);
    let blob = opened.get_tree_entry(&commit.tree, b"version.json").unwrap();
    let content = opened
        .get_object(&blob, ObjectType::Blob)
        .unwrap()
        .read_content()
        .unwrap();
    assert_eq!(content, b"{\"version\":\"2.1\"}");
}

#[test]
fn wrong_type_is_reported() {
    let mut repo = TestRepo::new();
    let blob = repo.blob(b"just text");
    let opened = Repository::open(repo.root()).unwrap();
    assert!(matches!(
        opened.get_commit(&blob),
        Err(RepoError::Odb(OdbError::Object(ObjectError::TypeMismatch {
            expected: ObjectType::Commit,
            actual: ObjectType::Blob,
        })))
    ));
}
