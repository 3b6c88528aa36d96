//! Directory listing pipeline: enumerate, stat, sort.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};

use tscope_hal::{build_entry, DirectoryEntry, IdentityResolver};
use tscope_parser::ListingOptions;

use crate::config::ScopeConfig;
use crate::error::{ScopeError, ScopeResult};
use crate::format::{display_name, LongRow};
use crate::glob::GlobMatcher;
use crate::sort::sort_entries;

/// The sorted result of one listing request.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub directory: PathBuf,
    pub options: ListingOptions,
    pub entries: Vec<DirectoryEntry>,
}

impl Listing {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name.as_str())
    }

    /// Match flags for `pattern`, aligned with `entries`.
    pub fn highlight(&self, pattern: &str) -> Vec<bool> {
        let matcher = GlobMatcher::new(pattern);
        self.entries.iter().map(|e| matcher.is_match(&e.name)).collect()
    }

    pub fn display_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| display_name(e, &self.options)).collect()
    }

    pub fn long_rows(&self, now: SystemTime) -> Vec<LongRow> {
        self.entries
            .iter()
            .map(|e| LongRow::from_entry(e, &self.options, now))
            .collect()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// List `dir` the way `ls` would with `options`.
///
/// Entries that cannot be stat'd are logged and left out; only failures on
/// the directory itself (including its own `.` entry) are returned as errors.
pub fn list_directory(
    dir: impl AsRef<Path>,
    options: &ListingOptions,
    identity: &IdentityResolver,
    config: &ScopeConfig,
) -> ScopeResult<Listing> {
    let dir = dir.as_ref();
    let metadata = std::fs::metadata(dir).map_err(|e| ScopeError::from_io("stat", dir, e))?;
    if !metadata.is_dir() {
        return Err(ScopeError::NotADirectory(dir.to_path_buf()));
    }

    // `.` is the directory itself, so failing to stat it fails the listing
    let dot = if options.includes_dot_entries() {
        Some(build_entry(dir, ".", identity)?)
    } else {
        None
    };
    let names = enumerate(dir, options)?;
    debug!(dir = %dir.display(), count = names.len(), "enumerated directory");

    let build = |name: &String| match build_entry(dir, name, identity) {
        Ok(entry) => Some(entry),
        Err(err) => {
            warn!(dir = %dir.display(), name = %name, error = %err, "dropping entry");
            None
        }
    };

    let mut entries: Vec<DirectoryEntry> = match rayon::ThreadPoolBuilder::new()
        .num_threads(config.stat_fan_out.max(1))
        .thread_name(|i| format!("tscope-stat-{i}"))
        .build()
    {
        Ok(pool) => pool.install(|| names.par_iter().filter_map(build).collect()),
        Err(err) => {
            warn!(error = %err, "stat pool unavailable, listing sequentially");
            names.iter().filter_map(build).collect()
        }
    };

    if let Some(dot) = dot {
        entries.insert(0, dot);
    }
    sort_entries(&mut entries, options);

    Ok(Listing {
        directory: dir.to_path_buf(),
        options: *options,
        entries,
    })
}

/// Names to stat, in enumeration order, with `..` first when shown.
fn enumerate(dir: &Path, options: &ListingOptions) -> ScopeResult<Vec<String>> {
    let mut names = Vec::new();
    if options.includes_dot_entries() {
        names.push("..".to_string());
    }

    let read = std::fs::read_dir(dir).map_err(|e| ScopeError::from_io("read_dir", dir, e))?;
    for entry in read {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(dir = %dir.display(), error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(dir = %dir.display(), name = ?raw, "skipping non-UTF-8 file name");
                continue;
            }
        };
        if !options.show_hidden && name.starts_with('.') {
            continue;
        }
        names.push(name);
    }
    Ok(names)
}
