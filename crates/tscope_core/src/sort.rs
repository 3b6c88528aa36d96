//! Listing order.

use std::cmp::Ordering;
use std::time::UNIX_EPOCH;

use tscope_hal::DirectoryEntry;
use tscope_parser::{ListingOptions, SortKey};

/// Comparison key for name ordering: `.` first, `..` second, and every other
/// name compared with one leading dot removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameKey<'a> {
    rank: u8,
    stem: &'a str,
}

impl<'a> NameKey<'a> {
    pub fn new(name: &'a str) -> Self {
        match name {
            "." => Self { rank: 0, stem: "" },
            ".." => Self { rank: 1, stem: "" },
            _ => Self {
                rank: 2,
                stem: name.strip_prefix('.').unwrap_or(name),
            },
        }
    }
}

impl Ord for NameKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| fold_cmp(self.stem, other.stem))
            .then_with(|| self.stem.as_bytes().cmp(other.stem.as_bytes()))
    }
}

impl PartialOrd for NameKey<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn fold_cmp(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// Compare two names the way a name-sorted listing does.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    NameKey::new(a).cmp(&NameKey::new(b))
}

/// Order `entries` in place. The sort is stable, so equal keys keep their
/// enumeration order; `reverse` is applied last.
pub fn sort_entries(entries: &mut [DirectoryEntry], options: &ListingOptions) {
    match options.sort_key {
        SortKey::None => {}
        SortKey::Name => entries.sort_by(|a, b| compare_names(&a.name, &b.name)),
        SortKey::Time => entries.sort_by(|a, b| {
            let a = a.mtime.unwrap_or(UNIX_EPOCH);
            let b = b.mtime.unwrap_or(UNIX_EPOCH);
            b.cmp(&a)
        }),
        SortKey::Size => entries.sort_by(|a, b| b.size.cmp(&a.size)),
    }
    if options.reverse {
        entries.reverse();
    }
}
