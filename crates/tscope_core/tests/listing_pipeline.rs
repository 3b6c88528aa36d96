use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use proptest::prelude::*;
use tscope_core::{
    human_size, list_directory, sort_entries, DirectoryTracker, IdentityLookup, IdentityResolver, ListingOptions,
    ScopeConfig,
};
use tscope_parser::{parse_ls_options, PathResolver};

#[derive(Clone, Default)]
struct CountingLookup {
    calls: Arc<AtomicUsize>,
}

impl IdentityLookup for CountingLookup {
    fn lookup_user(&self, _uid: u32) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        None
    }

    fn lookup_group(&self, _gid: u32) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        None
    }
}

fn populate(dir: &Path) {
    fs::write(dir.join("small.log"), vec![b'x'; 10]).unwrap();
    fs::write(dir.join("large.log"), vec![b'x'; 50_000]).unwrap();
    fs::write(dir.join(".profile"), b"").unwrap();
    fs::create_dir(dir.join("bin")).unwrap();
}

#[test]
fn ls_line_drives_a_full_listing() {
    let dir = tempfile::tempdir().unwrap();
    populate(dir.path());

    let options = parse_ls_options("ls -lASh");
    let lookup = CountingLookup::default();
    let calls = lookup.calls.clone();
    let identity = IdentityResolver::new(Box::new(lookup));
    let listing = list_directory(dir.path(), &options, &identity, &ScopeConfig::default()).unwrap();

    let names: Vec<_> = listing.names().collect();
    assert_eq!(names[0], "large.log");
    assert!(names.contains(&".profile"));
    assert!(!names.contains(&"."));

    let rows = listing.long_rows(SystemTime::now());
    assert_eq!(rows[0].size, "49K");
    assert!(rows.iter().all(|row| row.mode.len() == 10));

    // every entry shares one owner and one group, each looked up at most once
    assert!(calls.load(Ordering::SeqCst) <= 2);
}

#[test]
fn tracked_directory_feeds_the_listing() {
    let root = tempfile::tempdir().unwrap();
    let project = root.path().join("project");
    fs::create_dir(&project).unwrap();
    populate(&project);

    let mut tracker = DirectoryTracker::new(PathResolver::new(None), &ScopeConfig::default())
        .with_current_dir(root.path());
    tracker.on_command_finished("cd project", 0);
    let parsed = tracker.on_command_finished("ls -F", 0);
    assert!(!parsed.is_unknown());

    let cwd: PathBuf = tracker.current_dir().unwrap().to_path_buf();
    assert_eq!(cwd, project);

    let options = *tracker.last_listing().unwrap();
    let identity = IdentityResolver::new(Box::new(CountingLookup::default()));
    let listing = list_directory(&cwd, &options, &identity, &ScopeConfig::default()).unwrap();
    assert_eq!(listing.display_names(), ["bin/", "large.log", "small.log"]);
    assert_eq!(listing.highlight("*.{log,txt}"), [false, true, true]);
}

#[test]
fn listing_a_vanished_directory_reports_not_found() {
    let root = tempfile::tempdir().unwrap();
    let gone = root.path().join("gone");
    let identity = IdentityResolver::new(Box::new(CountingLookup::default()));
    let err = list_directory(&gone, &ListingOptions::default(), &identity, &ScopeConfig::default()).unwrap_err();
    assert!(err.is_not_found());
}

proptest! {
    #[test]
    fn human_sizes_stay_narrow(bytes in any::<u64>()) {
        let rendered = human_size(bytes, true);
        prop_assert!(rendered.len() <= 5, "{} rendered as {}", bytes, rendered);
        prop_assert!(rendered.starts_with(|c: char| c.is_ascii_digit()));
    }

    #[test]
    fn name_sort_is_idempotent(names in proptest::collection::vec("[.a-zA-Z0-9]{1,8}", 0..20)) {
        let identity = IdentityResolver::new(Box::new(CountingLookup::default()));
        let dir = tempfile::tempdir().unwrap();
        let mut entries = Vec::new();
        for name in &names {
            if name == "." || name == ".." || entries.iter().any(|e: &tscope_core::DirectoryEntry| &e.name == name) {
                continue;
            }
            fs::write(dir.path().join(name), b"").unwrap();
            entries.push(tscope_hal::build_entry(dir.path(), name, &identity).unwrap());
        }
        let options = ListingOptions::default();
        sort_entries(&mut entries, &options);
        let once: Vec<_> = entries.iter().map(|e| e.name.clone()).collect();
        sort_entries(&mut entries, &options);
        let twice: Vec<_> = entries.iter().map(|e| e.name.clone()).collect();
        prop_assert_eq!(once, twice);
    }
}
