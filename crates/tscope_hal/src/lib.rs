//! TermScope Hardware Abstraction Layer (HAL)
//!
//! Isolates the platform-facing parts of a listing: `lstat`-based entry
//! construction and owner/group name resolution. Everything above this
//! crate works on plain [`DirectoryEntry`] values.

pub mod error;
pub mod fs;
pub mod identity;

pub use error::{HalError, HalResult};
pub use fs::{
    build_entry, classify_suffix, parse_permission_string, permission_string, DirectoryEntry, FileKind,
    PermissionBits,
};
pub use identity::{GetentLookup, IdentityLookup, IdentityResolver};
