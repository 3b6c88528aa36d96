use std::path::PathBuf;
use std::time::SystemTime;

use serde::Serialize;

use crate::options::ListingOptions;

/// Structural kind of a recognised shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CommandKind {
    Cd { raw_target: Option<String> },
    Pushd { raw_target: Option<String> },
    Popd,
    Pwd,
    /// A `user@host:/path$` prompt announcing a new directory.
    Prompt,
    Ls { options: ListingOptions },
    Unknown,
}

impl CommandKind {
    /// True for commands that may move the shell to another directory.
    pub fn changes_directory(&self) -> bool {
        matches!(self, CommandKind::Cd { .. } | CommandKind::Pushd { .. } | CommandKind::Popd)
    }
}

/// A classified command plus the directory it was inferred to lead to, if
/// the classifier could tell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedCommand {
    pub kind: CommandKind,
    pub resolved_dir: Option<PathBuf>,
    pub timestamp: SystemTime,
}

impl ParsedCommand {
    pub fn new(kind: CommandKind) -> Self {
        Self {
            kind,
            resolved_dir: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn with_resolved_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.resolved_dir = dir;
        self
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == CommandKind::Unknown
    }
}
