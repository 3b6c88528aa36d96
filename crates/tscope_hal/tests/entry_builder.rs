use std::fs;

use proptest::prelude::*;
use tscope_hal::{
    build_entry, parse_permission_string, permission_string, FileKind, HalError, IdentityLookup, IdentityResolver,
};

struct NoLookup;

impl IdentityLookup for NoLookup {
    fn lookup_user(&self, _uid: u32) -> Option<String> {
        None
    }

    fn lookup_group(&self, _gid: u32) -> Option<String> {
        None
    }
}

fn resolver() -> IdentityResolver {
    IdentityResolver::new(Box::new(NoLookup))
}

proptest! {
    #[test]
    fn permission_string_round_trips(mode in 0u32..0o1_000_000) {
        let rendered = permission_string(mode);
        prop_assert_eq!(rendered.len(), 9);
        prop_assert_eq!(parse_permission_string(&rendered), Some(mode & 0o777));
    }
}

#[test]
fn regular_file_entry() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

    let entry = build_entry(dir.path(), "notes.txt", &resolver()).unwrap();
    assert_eq!(entry.name, "notes.txt");
    assert_eq!(entry.full_path, dir.path().join("notes.txt"));
    assert_eq!(entry.kind, FileKind::Regular);
    assert_eq!(entry.size, 5);
    assert!(entry.mtime.is_some());
    assert!(entry.symlink_target.is_none());
    assert!(!entry.owner_name.is_empty());
}

#[test]
fn directory_entry_has_slash_suffix() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();

    let entry = build_entry(dir.path(), "sub", &resolver()).unwrap();
    assert!(entry.is_directory());
    assert_eq!(entry.classify_suffix(), Some('/'));
    assert!(entry.mode_string().starts_with('d'));
    assert_eq!(entry.mode_string().len(), 10);
}

#[test]
fn names_must_be_single_components() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub/inner"), b"").unwrap();

    for name in ["", "sub/inner", "/etc"] {
        let err = build_entry(dir.path(), name, &resolver()).unwrap_err();
        assert!(matches!(err, HalError::Invalid(_)), "{name:?} gave {err}");
        assert!(!err.is_not_found());
    }
    assert!(build_entry(dir.path(), ".", &resolver()).unwrap().is_directory());
}

#[test]
fn missing_entry_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = build_entry(dir.path(), "ghost", &resolver()).unwrap_err();
    assert!(err.is_not_found());
}

#[cfg(unix)]
mod unix {
    use super::*;
    use std::os::unix::fs::{symlink, PermissionsExt};

    #[test]
    fn dangling_symlink_reports_link_not_target() {
        let dir = tempfile::tempdir().unwrap();
        symlink("nowhere", dir.path().join("dangling")).unwrap();

        let entry = build_entry(dir.path(), "dangling", &resolver()).unwrap();
        assert!(entry.is_symlink());
        assert_eq!(entry.classify_suffix(), Some('@'));
        assert_eq!(entry.symlink_target.as_deref(), Some(std::path::Path::new("nowhere")));
        assert!(entry.mode_string().starts_with('l'));
    }

    #[test]
    fn executable_file_gets_star() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.sh");
        fs::write(&path, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o750)).unwrap();

        let entry = build_entry(dir.path(), "run.sh", &resolver()).unwrap();
        assert_eq!(entry.mode_string(), "-rwxr-x---");
        assert_eq!(entry.classify_suffix(), Some('*'));
    }

    #[test]
    fn owner_comes_from_seeded_cache() {
        use std::os::unix::fs::MetadataExt;

        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("f"), b"").unwrap();
        let md = fs::metadata(dir.path().join("f")).unwrap();

        let ids = resolver();
        ids.seed_user(md.uid(), "owner-name");
        ids.seed_group(md.gid(), "group-name");
        let entry = build_entry(dir.path(), "f", &ids).unwrap();
        assert_eq!(entry.owner_name, "owner-name");
        assert_eq!(entry.group_name, "group-name");
    }
}
