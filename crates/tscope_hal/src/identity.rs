//! Owner/group id to name resolution with a cache-once policy.
//!
//! The resolver is seeded from the system registries (`/etc/passwd`,
//! `/etc/group`) and falls back to a bounded-time external lookup for ids
//! the registries do not list. Whatever that lookup yields, including the
//! decimal id when it fails or times out, is cached and never re-queried.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use wait_timeout::ChildExt;

use crate::error::{HalError, HalResult};

pub const DEFAULT_PASSWD_PATH: &str = "/etc/passwd";
pub const DEFAULT_GROUP_PATH: &str = "/etc/group";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(1);

/// Slow fallback used for ids missing from the registries.
pub trait IdentityLookup: Send + Sync {
    fn lookup_user(&self, uid: u32) -> Option<String>;
    fn lookup_group(&self, gid: u32) -> Option<String>;
}

/// Queries the system identity service through `getent`, killing the child
/// once `timeout` elapses.
#[derive(Debug, Clone)]
pub struct GetentLookup {
    timeout: Duration,
}

impl GetentLookup {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn query(&self, database: &str, id: u32) -> Option<String> {
        let mut child = match Command::new("getent")
            .arg(database)
            .arg(id.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                debug!(database, id, error = %e, "getent unavailable");
                return None;
            }
        };

        let status = match child.wait_timeout(self.timeout) {
            Ok(Some(status)) => status,
            Ok(None) => {
                warn!(database, id, timeout_ms = self.timeout.as_millis() as u64, "getent timed out");
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Err(e) => {
                warn!(database, id, error = %e, "getent wait failed");
                let _ = child.kill();
                return None;
            }
        };
        if !status.success() {
            debug!(database, id, code = ?status.code(), "getent found no entry");
            return None;
        }

        let mut out = String::new();
        child.stdout.take()?.read_to_string(&mut out).ok()?;
        out.lines()
            .next()
            .and_then(|line| line.split(':').next())
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

impl Default for GetentLookup {
    fn default() -> Self {
        Self::new(DEFAULT_LOOKUP_TIMEOUT)
    }
}

impl IdentityLookup for GetentLookup {
    fn lookup_user(&self, uid: u32) -> Option<String> {
        self.query("passwd", uid)
    }

    fn lookup_group(&self, gid: u32) -> Option<String> {
        self.query("group", gid)
    }
}

/// One slot per id. The shard lock only guards slot creation; the fallback
/// runs inside the slot's `OnceCell`, so it never blocks other ids.
type NameCache = DashMap<u32, Arc<OnceCell<String>>>;

/// Concurrent id→name caches for users and groups.
///
/// Cached reads never wait on a lookup in flight for another id. Concurrent
/// misses on the same id wait on one shared slot, so each id is looked up
/// at most once.
pub struct IdentityResolver {
    users: NameCache,
    groups: NameCache,
    lookup: Box<dyn IdentityLookup>,
}

impl IdentityResolver {
    pub fn new(lookup: Box<dyn IdentityLookup>) -> Self {
        Self {
            users: DashMap::new(),
            groups: DashMap::new(),
            lookup,
        }
    }

    /// Resolver backed by `getent` with the given timeout.
    pub fn system(timeout: Duration) -> Self {
        Self::new(Box::new(GetentLookup::new(timeout)))
    }

    /// Populate both caches from the system registries. Unreadable registries
    /// are logged and skipped; returns the number of names loaded.
    pub fn initialize(&self) -> usize {
        self.load_registries(Path::new(DEFAULT_PASSWD_PATH), Path::new(DEFAULT_GROUP_PATH))
    }

    pub fn load_registries(&self, passwd: &Path, group: &Path) -> usize {
        let mut loaded = 0;
        match parse_registry(passwd) {
            Ok(entries) => {
                for (uid, name) in entries {
                    self.users.entry(uid).or_insert_with(|| resolved(name));
                    loaded += 1;
                }
            }
            Err(e) => warn!(error = %e, "user registry unavailable"),
        }
        match parse_registry(group) {
            Ok(entries) => {
                for (gid, name) in entries {
                    self.groups.entry(gid).or_insert_with(|| resolved(name));
                    loaded += 1;
                }
            }
            Err(e) => warn!(error = %e, "group registry unavailable"),
        }
        debug!(loaded, "identity registries loaded");
        loaded
    }

    pub fn seed_user(&self, uid: u32, name: impl Into<String>) {
        self.users.insert(uid, resolved(name.into()));
    }

    pub fn seed_group(&self, gid: u32, name: impl Into<String>) {
        self.groups.insert(gid, resolved(name.into()));
    }

    pub fn resolve_user(&self, uid: u32) -> String {
        resolve_cached(&self.users, uid, |id| self.lookup.lookup_user(id))
    }

    pub fn resolve_group(&self, gid: u32) -> String {
        resolve_cached(&self.groups, gid, |id| self.lookup.lookup_group(id))
    }

    pub fn cached_users(&self) -> usize {
        self.users.len()
    }

    pub fn cached_groups(&self) -> usize {
        self.groups.len()
    }
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("users", &self.users.len())
            .field("groups", &self.groups.len())
            .finish_non_exhaustive()
    }
}

fn resolved(name: String) -> Arc<OnceCell<String>> {
    Arc::new(OnceCell::with_value(name))
}

fn resolve_cached(cache: &NameCache, id: u32, fallback: impl FnOnce(u32) -> Option<String>) -> String {
    let existing = cache.get(&id).map(|slot| Arc::clone(slot.value()));
    let slot = match existing {
        Some(slot) => slot,
        None => Arc::clone(cache.entry(id).or_default().value()),
    };
    // shard guards are released here; only this id's slot is contended
    slot.get_or_init(|| {
        let name = fallback(id).unwrap_or_else(|| id.to_string());
        debug!(id, name = %name, "identity fallback cached");
        name
    })
    .clone()
}

/// Parse `name:password:id:...` records. Malformed lines are skipped.
fn parse_registry(path: &Path) -> HalResult<Vec<(u32, String)>> {
    let text = fs::read_to_string(path).map_err(|e| HalError::io_error("read registry", path, e))?;
    let entries: Vec<(u32, String)> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with('#'))
        .filter_map(|line| {
            let mut fields = line.split(':');
            let name = fields.next()?.trim();
            let id = fields.nth(1)?.trim().parse::<u32>().ok()?;
            (!name.is_empty()).then(|| (id, name.to_string()))
        })
        .collect();
    if entries.is_empty() && !text.trim().is_empty() {
        return Err(HalError::identity("parse registry", format!("no records in {}", path.display())));
    }
    Ok(entries)
}
