//! TermScope core: `ls`-compatible listings of the directory an observed
//! shell is in.
//!
//! The pipeline is enumerate → stat ([`tscope_hal`]) → [`sort`] → [`format`],
//! with [`glob`] computing highlight flags alongside. [`tracker`] keeps the
//! best-known working directory from command lines or raw terminal output
//! classified by [`tscope_parser`].

pub mod config;
pub mod error;
pub mod format;
pub mod glob;
pub mod listing;
pub mod logging;
pub mod sort;
pub mod tracker;

pub use config::ScopeConfig;
pub use error::{ScopeError, ScopeResult};
pub use format::{display_name, format_date, format_date_at, human_size, permission_string, LongRow};
pub use glob::{expand_braces, matches, GlobMatcher};
pub use listing::{list_directory, Listing};
pub use logging::{LogFormat, LoggingConfig};
pub use sort::{compare_names, sort_entries};
pub use tracker::DirectoryTracker;

pub use tscope_hal::{DirectoryEntry, FileKind, IdentityLookup, IdentityResolver};
pub use tscope_parser::{ListingOptions, ParsedCommand, SortKey};

/// Build the process-wide identity resolver and load the system registries.
pub fn initialize(config: &ScopeConfig) -> IdentityResolver {
    let resolver = IdentityResolver::system(config.identity_timeout());
    let loaded = resolver.initialize();
    tracing::info!(loaded, "identity resolver ready");
    resolver
}
