//! Directory entry construction
//!
//! Turns one filesystem entry and its `lstat` metadata into a
//! [`DirectoryEntry`] ready for display. Symlinks are reported as symlinks,
//! never as their targets.

use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::trace;

use crate::error::{HalError, HalResult};
use crate::identity::IdentityResolver;

const S_IFMT: u32 = 0o170000;
const S_IFSOCK: u32 = 0o140000;
const S_IFLNK: u32 = 0o120000;
const S_IFREG: u32 = 0o100000;
const S_IFBLK: u32 = 0o060000;
const S_IFDIR: u32 = 0o040000;
const S_IFCHR: u32 = 0o020000;
const S_IFIFO: u32 = 0o010000;

/// File type of an entry. Exactly one kind applies to every entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    Fifo,
    Socket,
    CharDevice,
    BlockDevice,
}

impl FileKind {
    /// Decode the POSIX file-type bits of a mode word. Unknown types display
    /// like regular files.
    pub fn from_mode(mode: u32) -> Self {
        match mode & S_IFMT {
            S_IFDIR => FileKind::Directory,
            S_IFLNK => FileKind::Symlink,
            S_IFIFO => FileKind::Fifo,
            S_IFSOCK => FileKind::Socket,
            S_IFCHR => FileKind::CharDevice,
            S_IFBLK => FileKind::BlockDevice,
            S_IFREG => FileKind::Regular,
            _ => FileKind::Regular,
        }
    }

    /// First character of an `ls -l` mode string.
    pub fn type_char(self) -> char {
        match self {
            FileKind::Regular => '-',
            FileKind::Directory => 'd',
            FileKind::Symlink => 'l',
            FileKind::Fifo => 'p',
            FileKind::Socket => 's',
            FileKind::CharDevice => 'c',
            FileKind::BlockDevice => 'b',
        }
    }
}

/// Raw mode word plus accessors for the nine rwx bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermissionBits {
    pub mode: u32,
}

impl PermissionBits {
    pub fn new(mode: u32) -> Self {
        Self { mode }
    }

    /// The user/group/other rwx bits only.
    pub fn bits(&self) -> u32 {
        self.mode & 0o777
    }

    pub fn any_execute(&self) -> bool {
        self.mode & 0o111 != 0
    }

    /// Nine `r`/`w`/`x`/`-` characters.
    pub fn to_rwx(&self) -> String {
        permission_string(self.mode)
    }
}

/// Render the nine permission characters for `mode`, owner first.
pub fn permission_string(mode: u32) -> String {
    const FLAGS: [(u32, char); 9] = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];
    FLAGS
        .iter()
        .map(|&(bit, ch)| if mode & bit != 0 { ch } else { '-' })
        .collect()
}

/// Inverse of [`permission_string`]. Returns `None` unless the input is nine
/// characters drawn from the expected alphabet at each position.
pub fn parse_permission_string(perms: &str) -> Option<u32> {
    let chars: Vec<char> = perms.chars().collect();
    if chars.len() != 9 {
        return None;
    }
    let mut mode = 0;
    for (i, ch) in chars.iter().enumerate() {
        let expected = ['r', 'w', 'x'][i % 3];
        let bit = 1 << (8 - i);
        match *ch {
            c if c == expected => mode |= bit,
            '-' => {}
            _ => return None,
        }
    }
    Some(mode)
}

/// One listed filesystem entry. Built fresh per listing and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub full_path: PathBuf,
    pub kind: FileKind,
    pub permissions: PermissionBits,
    pub size: u64,
    pub mtime: Option<SystemTime>,
    pub atime: Option<SystemTime>,
    pub ctime: Option<SystemTime>,
    pub uid: u32,
    pub gid: u32,
    pub owner_name: String,
    pub group_name: String,
    pub symlink_target: Option<PathBuf>,
}

impl DirectoryEntry {
    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    pub fn is_symlink(&self) -> bool {
        self.kind == FileKind::Symlink
    }

    /// The ten-character `ls -l` mode string, e.g. `drwxr-xr-x`.
    pub fn mode_string(&self) -> String {
        let mut out = String::with_capacity(10);
        out.push(self.kind.type_char());
        out.push_str(&self.permissions.to_rwx());
        out
    }

    /// `ls -F` indicator, derived from the type and execute bits.
    pub fn classify_suffix(&self) -> Option<char> {
        classify_suffix(self.kind, self.permissions.mode)
    }
}

pub fn classify_suffix(kind: FileKind, mode: u32) -> Option<char> {
    match kind {
        FileKind::Directory => Some('/'),
        FileKind::Symlink => Some('@'),
        FileKind::Socket => Some('='),
        FileKind::Fifo => Some('|'),
        FileKind::Regular if mode & 0o111 != 0 => Some('*'),
        _ => None,
    }
}

/// Stat `parent/name` without following symlinks and build its entry.
///
/// `name` must be a single path component (`.` and `..` included).
pub fn build_entry(parent: &Path, name: &str, identity: &IdentityResolver) -> HalResult<DirectoryEntry> {
    if name.is_empty() || name.contains('/') {
        return Err(HalError::invalid(format!("not a single entry name: {name:?}")));
    }
    let full_path = parent.join(name);
    let metadata = fs::symlink_metadata(&full_path)
        .map_err(|e| HalError::io_error("lstat", &full_path, e))?;
    let raw = RawMetadata::from_metadata(&metadata);
    let kind = FileKind::from_mode(raw.mode);

    let symlink_target = if kind == FileKind::Symlink {
        match fs::read_link(&full_path) {
            Ok(target) => Some(target),
            Err(e) => {
                trace!(path = %full_path.display(), error = %e, "readlink failed");
                None
            }
        }
    } else {
        None
    };

    Ok(DirectoryEntry {
        name: name.to_string(),
        full_path,
        kind,
        permissions: PermissionBits::new(raw.mode),
        size: raw.size,
        mtime: raw.mtime,
        atime: raw.atime,
        ctime: raw.ctime,
        uid: raw.uid,
        gid: raw.gid,
        owner_name: identity.resolve_user(raw.uid),
        group_name: identity.resolve_group(raw.gid),
        symlink_target,
    })
}

struct RawMetadata {
    mode: u32,
    size: u64,
    uid: u32,
    gid: u32,
    mtime: Option<SystemTime>,
    atime: Option<SystemTime>,
    ctime: Option<SystemTime>,
}

impl RawMetadata {
    #[cfg(unix)]
    fn from_metadata(md: &Metadata) -> Self {
        use std::os::unix::fs::MetadataExt;
        Self {
            mode: md.mode(),
            size: md.size(),
            uid: md.uid(),
            gid: md.gid(),
            mtime: Some(epoch_offset(md.mtime(), md.mtime_nsec())),
            atime: Some(epoch_offset(md.atime(), md.atime_nsec())),
            ctime: Some(epoch_offset(md.ctime(), md.ctime_nsec())),
        }
    }

    #[cfg(not(unix))]
    fn from_metadata(md: &Metadata) -> Self {
        let ft = md.file_type();
        let (type_bits, perm) = if ft.is_dir() {
            (S_IFDIR, 0o755)
        } else if ft.is_symlink() {
            (S_IFLNK, 0o777)
        } else if md.permissions().readonly() {
            (S_IFREG, 0o444)
        } else {
            (S_IFREG, 0o644)
        };
        Self {
            mode: type_bits | perm,
            size: md.len(),
            uid: 0,
            gid: 0,
            mtime: md.modified().ok(),
            atime: md.accessed().ok(),
            ctime: md.created().ok(),
        }
    }
}

#[cfg(unix)]
fn epoch_offset(secs: i64, nsec: i64) -> SystemTime {
    let nanos = nsec.clamp(0, 999_999_999) as u32;
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nanos)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + Duration::from_nanos(nanos as u64)
    }
}
