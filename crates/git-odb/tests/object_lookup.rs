use std::fs;

use git_testtools::hash::hash_object;
use git_hash::ObjectId;
use git_object::{ObjectError, ObjectRead, ObjectType};
use git_odb::{ObjectDatabase, OdbError, OdbOptions};
use git_pack::CacheKind;
use git_testtools::{write_loose_object, PackBuilder, TestRepo};

fn content(odb: &ObjectDatabase, oid: &ObjectId) -> Vec<u8> {
    odb.find_object(oid).unwrap().unwrap().read_content().unwrap()
}

#[test]
fn loose_objects_are_found() {
    let mut repo = TestRepo::new();
    let blob = repo.blob(b"hello\n");
    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    assert_eq!(content(&odb, &blob), b"hello\n");
    assert!(odb.contains(&blob).unwrap());
}

#[test]
fn packed_objects_are_found() {
    let mut repo = TestRepo::new();
    repo.begin_pack(true);
    let a = repo.blob(b"{\"version\": \"1.0\"}");
    let b = repo.blob(b"{\"version\": \"1.1\"}");
    repo.finish_pack();

    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    assert_eq!(odb.packs().unwrap().len(), 1);
    assert_eq!(content(&odb, &a), b"{\"version\": \"1.0\"}");
    assert_eq!(content(&odb, &b), b"{\"version\": \"1.1\"}");
    assert!(odb.contains(&b).unwrap());
}

#[test]
fn missing_object_is_not_found() {
    let repo = TestRepo::new();
    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    let oid = ObjectId::new([0x5a; 20]);
    assert!(odb.find_object(&oid).unwrap().is_none());
    assert!(!odb.contains(&oid).unwrap());
    assert!(matches!(
        odb.get_object(&oid, ObjectType::Blob),
        Err(OdbError::NotFound(id)) if id == oid
    ));
}

#[test]
fn type_mismatch_is_reported() {
    let mut repo = TestRepo::new();
    let blob = repo.blob(b"not a tree");
    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    assert!(odb.get_object(&blob, ObjectType::Blob).is_ok());
    assert!(matches!(
        odb.get_object(&blob, ObjectType::Tree),
        Err(OdbError::Object(ObjectError::TypeMismatch {
            expected: ObjectType::Tree,
            actual: ObjectType::Blob
        }))
    ));
}

#[test]
fn every_pack_is_searched() {
    let mut repo = TestRepo::new();
    repo.begin_pack(false);
    let first = repo.blob(b"in first pack");
    repo.finish_pack();
    repo.begin_pack(false);
    let second = repo.blob(b"in second pack");
    repo.finish_pack();

    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    assert_eq!(odb.packs().unwrap().len(), 2);
    assert_eq!(content(&odb, &first), b"in first pack");
    assert_eq!(content(&odb, &second), b"in second pack");
}

#[test]
fn ref_delta_base_in_loose_storage() {
    let repo = TestRepo::new();
    let base = write_loose_object(&repo.objects_dir(), "blob", b"shared base text");
    let mut builder = PackBuilder::new();
    let t = builder.add_ref_delta("blob", b"shared base text", b"shared base text, extended");
    let written = builder.write(&repo.objects_dir().join("pack"), "pack-thin");

    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    assert_eq!(content(&odb, &written.ids[t]), b"shared base text, extended");
    assert_eq!(content(&odb, &base), b"shared base text");
}

#[test]
fn ref_delta_base_in_another_pack() {
    let repo = TestRepo::new();
    let pack_dir = repo.objects_dir().join("pack");

    let mut bases = PackBuilder::new();
    bases.add("blob", b"base living in pack one");
    bases.write(&pack_dir, "pack-one");

    let mut thin = PackBuilder::new();
    let t = thin.add_ref_delta("blob", b"base living in pack one", b"base living in pack two");
    let written = thin.write(&pack_dir, "pack-two");

    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    assert_eq!(content(&odb, &written.ids[t]), b"base living in pack two");
}

#[test]
fn missing_ref_delta_base_is_an_error() {
    let repo = TestRepo::new();
    let mut thin = PackBuilder::new();
    let t = thin.add_ref_delta("blob", b"nowhere", b"nowhere else");
    let written = thin.write(&repo.objects_dir().join("pack"), "pack-thin");

    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    let missing = hash_object("blob", b"nowhere");
    match odb.find_object(&written.ids[t]) {
        Err(OdbError::Pack(git_pack::PackError::MissingBase(id))) => assert_eq!(id, missing),
        other => panic!("unexpected: {:?}", other.err()),
    }
}

#[test]
fn alternates_are_searched_after_local_storage() {
    let mut shared = TestRepo::bare();
    let only_shared = shared.blob(b"shared only");
    shared.begin_pack(false);
    let packed_shared = shared.blob(b"packed in shared");
    shared.finish_pack();

    let mut repo = TestRepo::new();
    let local = repo.blob(b"local");
    let shared_dir = shared.objects_dir().display().to_string();
    repo.set_alternates(&["# borrowed objects", shared_dir.as_str()]);

    let odb = ObjectDatabase::open(repo.objects_dir()).unwrap();
    assert_eq!(odb.alternates().len(), 1);
    assert_eq!(content(&odb, &local), b"local");
    assert_eq!(content(&odb, &only_shared), b"shared only");
    assert_eq!(content(&odb, &packed_shared), b"packed in shared");
    assert!(odb.contains(&packed_shared).unwrap());
}

#[test]
fn relative_alternates_resolve_against_objects_dir() {
    let root = tempfile::tempdir().unwrap();
    let main = root.path().join("main/objects");
    let other = root.path().join("other/objects");
    fs::create_dir_all(&main).unwrap();
    let blob = write_loose_object(&other, "blob", b"relative");
    fs::create_dir_all(main.join("info")).unwrap();
    fs::write(main.join("info/alternates"), "../../other/objects\n").unwrap();

    let odb = ObjectDatabase::open(&main).unwrap();
    assert_eq!(content(&odb, &blob), b"relative");
}

#[test]
fn disk_cache_option_reaches_packs() {
    let spill = tempfile::tempdir().unwrap();
    let mut repo = TestRepo::new();
    repo.begin_pack(true);
    repo.blob(b"first revision");
    let second = repo.blob(b"second revision");
    repo.finish_pack();

    let options = OdbOptions {
        cache: CacheKind::Disk {
            dir: spill.path().to_path_buf(),
        },
    };
    let odb = ObjectDatabase::open_with_options(repo.objects_dir(), options).unwrap();
    assert_eq!(content(&odb, &second), b"second revision");
    let spilled = fs::read_dir(spill.path()).unwrap().count();
    assert_eq!(spilled, 2);
}
