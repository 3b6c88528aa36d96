//! Best-effort resolution of `cd`/`pushd` targets without running the shell.

use std::path::{Component, Path, PathBuf};

use crate::classifier::{extract_target, find_cd_invocation, CdKeyword};

/// Computes the directory a `cd`/`pushd` line leads to.
///
/// The resolver keeps no directory stack: `cd -`, bare `pushd` and `popd`
/// all resolve to `None`, meaning the caller must ask the terminal.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    home: Option<PathBuf>,
}

impl PathResolver {
    pub fn new(home: Option<PathBuf>) -> Self {
        Self { home }
    }

    /// Resolver using the current user's home directory.
    pub fn from_env() -> Self {
        Self::new(dirs::home_dir())
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn resolve_cd_target(&self, line: &str, current_dir: &Path) -> Option<PathBuf> {
        let invocation = find_cd_invocation(line)?;
        match extract_target(invocation.rest) {
            None => match invocation.keyword {
                CdKeyword::Cd => self.home.clone(),
                // bare pushd swaps the top of a stack we do not model
                CdKeyword::Pushd => None,
            },
            Some(target) => self.resolve_target(&target, current_dir),
        }
    }

    /// Resolve an already extracted argument against `current_dir`.
    pub fn resolve_target(&self, target: &str, current_dir: &Path) -> Option<PathBuf> {
        if target.is_empty() || target == "-" {
            return None;
        }
        if target == "~" {
            return self.home.clone();
        }
        if let Some(tail) = target.strip_prefix("~/") {
            return self.home.as_ref().map(|home| normalize(&home.join(tail)));
        }
        let path = Path::new(target);
        if path.is_absolute() {
            return Some(path.to_path_buf());
        }
        Some(normalize(&current_dir.join(path)))
    }
}

/// Collapse `.` and `..` lexically; `..` at the root stays at the root.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new(Some(PathBuf::from("/home/user")))
    }

    #[test]
    fn parent_directory() {
        assert_eq!(
            resolver().resolve_cd_target("cd ..", Path::new("/a/b/c")),
            Some(PathBuf::from("/a/b"))
        );
        assert_eq!(
            resolver().resolve_cd_target("cd ../../x/./y", Path::new("/a/b/c")),
            Some(PathBuf::from("/a/x/y"))
        );
    }

    #[test]
    fn bare_cd_goes_home() {
        let r = resolver();
        assert_eq!(r.resolve_cd_target("cd", Path::new("/a/b")), Some(PathBuf::from("/home/user")));
        assert_eq!(r.resolve_cd_target("cd && ls", Path::new("/a/b")), Some(PathBuf::from("/home/user")));
        assert_eq!(r.resolve_cd_target("cd; ls", Path::new("/a/b")), Some(PathBuf::from("/home/user")));
    }

    #[test]
    fn previous_directory_is_unknown() {
        assert_eq!(resolver().resolve_cd_target("cd -", Path::new("/a/b")), None);
        assert_eq!(resolver().resolve_cd_target("pushd", Path::new("/a/b")), None);
    }

    #[test]
    fn tilde_expansion() {
        let r = resolver();
        assert_eq!(r.resolve_cd_target("cd ~", Path::new("/")), Some(PathBuf::from("/home/user")));
        assert_eq!(
            r.resolve_cd_target("cd ~/src/app", Path::new("/")),
            Some(PathBuf::from("/home/user/src/app"))
        );
        let homeless = PathResolver::new(None);
        assert_eq!(homeless.resolve_cd_target("cd ~/src", Path::new("/")), None);
        assert_eq!(homeless.resolve_cd_target("cd", Path::new("/")), None);
    }

    #[test]
    fn absolute_and_quoted_targets() {
        let r = resolver();
        assert_eq!(r.resolve_cd_target("cd /etc", Path::new("/a")), Some(PathBuf::from("/etc")));
        assert_eq!(
            r.resolve_cd_target("pushd 'My Files'", Path::new("/data")),
            Some(PathBuf::from("/data/My Files"))
        );
        assert_eq!(
            r.resolve_cd_target("make && cd build", Path::new("/proj")),
            Some(PathBuf::from("/proj/build"))
        );
    }

    #[test]
    fn no_cd_pattern() {
        assert_eq!(resolver().resolve_cd_target("ls -la", Path::new("/a")), None);
        assert_eq!(resolver().resolve_cd_target("cdrom", Path::new("/a")), None);
    }

    #[test]
    fn normalize_stops_at_root() {
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
    }
}
