//! Best-known working directory of an observed shell.
//!
//! Two sources feed the tracker. Completed command lines with exit codes
//! are the precise one. Raw terminal output is the fallback. A cwd reported
//! by shell integration overrides both.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use tscope_parser::{classify, CommandKind, ListingOptions, ParsedCommand, PathResolver, TerminalStreamParser};

use crate::config::ScopeConfig;

#[derive(Debug)]
pub struct DirectoryTracker {
    resolver: PathResolver,
    current_dir: Option<PathBuf>,
    /// Set once the host reports cwd through shell integration.
    integrated: bool,
    needs_requery: bool,
    last_listing: Option<ListingOptions>,
    history: VecDeque<ParsedCommand>,
    history_limit: usize,
    stream: TerminalStreamParser,
}

impl DirectoryTracker {
    pub fn new(resolver: PathResolver, config: &ScopeConfig) -> Self {
        let stream = TerminalStreamParser::new(resolver.home().map(Path::to_path_buf))
            .with_limits(config.stream_buffer_chars, config.history_limit);
        Self {
            resolver,
            current_dir: None,
            integrated: false,
            needs_requery: false,
            last_listing: None,
            history: VecDeque::new(),
            history_limit: config.history_limit.max(1),
            stream,
        }
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        self.stream.set_current_dir(Some(dir.clone()));
        self.current_dir = Some(dir);
        self
    }

    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// True when the tracked directory is no longer trustworthy and the
    /// host should ask the terminal for its real cwd.
    pub fn needs_requery(&self) -> bool {
        self.needs_requery
    }

    /// Options of the most recent `ls` seen, if any.
    pub fn last_listing(&self) -> Option<&ListingOptions> {
        self.last_listing.as_ref()
    }

    /// Oldest first.
    pub fn history(&self) -> &VecDeque<ParsedCommand> {
        &self.history
    }

    /// Record a command line reported by the shell after it finished.
    pub fn on_command_finished(&mut self, line: &str, exit_code: i32) -> ParsedCommand {
        let line = line.trim();
        let mut parsed = classify(line);

        if exit_code != 0 {
            debug!(line, exit_code, "ignoring failed command");
            self.record(parsed.clone());
            return parsed;
        }

        match parsed.kind {
            CommandKind::Cd { .. } | CommandKind::Pushd { .. } => {
                let base = self.current_dir.clone().unwrap_or_default();
                match self.resolver.resolve_cd_target(line, &base) {
                    // relative targets need a known base directory
                    Some(dir) if dir.is_absolute() => {
                        self.change_dir(dir.clone());
                        parsed = parsed.with_resolved_dir(Some(dir));
                    }
                    _ => self.mark_unknown(line),
                }
            }
            CommandKind::Popd => self.mark_unknown(line),
            CommandKind::Ls { options } => self.last_listing = Some(options),
            CommandKind::Pwd | CommandKind::Prompt | CommandKind::Unknown => {}
        }

        self.record(parsed.clone());
        parsed
    }

    /// Authoritative cwd from shell integration.
    pub fn set_shell_integration_cwd(&mut self, dir: impl Into<PathBuf>) {
        let dir = dir.into();
        self.integrated = true;
        self.needs_requery = false;
        if self.current_dir.as_deref() != Some(dir.as_path()) {
            info!(dir = %dir.display(), "shell integration reported cwd");
        }
        self.stream.set_current_dir(Some(dir.clone()));
        self.current_dir = Some(dir);
    }

    /// Feed raw terminal output. Directory changes it implies are adopted
    /// unless shell integration is active.
    pub fn on_terminal_output(&mut self, bytes: &[u8]) -> Vec<ParsedCommand> {
        let commands = self.stream.feed(bytes);

        for command in &commands {
            if let CommandKind::Ls { options } = command.kind {
                self.last_listing = Some(options);
            } else if !self.integrated {
                match &command.resolved_dir {
                    Some(dir) => {
                        self.current_dir = Some(dir.clone());
                        self.needs_requery = false;
                    }
                    None if command.kind.changes_directory() => self.needs_requery = true,
                    None => {}
                }
            }
            self.record(command.clone());
        }

        if self.integrated {
            // keep the heuristic parser anchored to the reported directory
            self.stream.set_current_dir(self.current_dir.clone());
        }
        commands
    }

    /// Drop history, buffered output and the known directory.
    pub fn clear(&mut self) {
        self.history.clear();
        self.stream.clear();
        self.current_dir = None;
        self.integrated = false;
        self.needs_requery = false;
        self.last_listing = None;
    }

    fn change_dir(&mut self, dir: PathBuf) {
        debug!(dir = %dir.display(), "directory changed");
        self.needs_requery = false;
        self.stream.set_current_dir(Some(dir.clone()));
        self.current_dir = Some(dir);
    }

    fn mark_unknown(&mut self, line: &str) {
        debug!(line, "directory change target unknown");
        self.needs_requery = true;
    }

    fn record(&mut self, command: ParsedCommand) {
        if self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tscope_parser::SortKey;

    fn tracker() -> DirectoryTracker {
        DirectoryTracker::new(PathResolver::new(Some(PathBuf::from("/home/u"))), &ScopeConfig::default())
            .with_current_dir("/home/u")
    }

    #[test]
    fn successful_cd_moves() {
        let mut t = tracker();
        let parsed = t.on_command_finished("cd projects/app", 0);
        assert_eq!(parsed.resolved_dir.as_deref(), Some(Path::new("/home/u/projects/app")));
        assert_eq!(t.current_dir(), Some(Path::new("/home/u/projects/app")));

        t.on_command_finished("cd ..", 0);
        assert_eq!(t.current_dir(), Some(Path::new("/home/u/projects")));
        assert!(!t.needs_requery());
    }

    #[test]
    fn failed_cd_is_ignored() {
        let mut t = tracker();
        t.on_command_finished("cd /does/not/exist", 1);
        assert_eq!(t.current_dir(), Some(Path::new("/home/u")));
        assert_eq!(t.history().len(), 1);
    }

    #[test]
    fn unknown_targets_request_requery() {
        let mut t = tracker();
        t.on_command_finished("cd -", 0);
        assert!(t.needs_requery());
        assert_eq!(t.current_dir(), Some(Path::new("/home/u")));

        t.set_shell_integration_cwd("/srv");
        assert!(!t.needs_requery());

        t.on_command_finished("popd", 0);
        assert!(t.needs_requery());
    }

    #[test]
    fn ls_options_are_remembered() {
        let mut t = tracker();
        t.on_command_finished("ls -lt", 0);
        let opts = t.last_listing().copied().unwrap();
        assert!(opts.long_format);
        assert_eq!(opts.sort_key, SortKey::Time);
    }

    #[test]
    fn terminal_output_moves_without_integration() {
        let mut t = tracker();
        t.on_terminal_output(b"u@box:~$ cd /etc\r\n");
        assert_eq!(t.current_dir(), Some(Path::new("/etc")));
    }

    #[test]
    fn unresolved_change_in_output_requests_requery() {
        let mut t = tracker();
        t.on_terminal_output(b"popd\r\n");
        assert!(t.needs_requery());
        assert_eq!(t.current_dir(), Some(Path::new("/home/u")));

        t.on_terminal_output(b"cd /tmp\r\n");
        assert!(!t.needs_requery());

        t.on_terminal_output(b"cd -\r\n");
        assert!(t.needs_requery());
    }

    #[test]
    fn integration_cwd_wins_over_terminal_output() {
        let mut t = tracker();
        t.set_shell_integration_cwd("/work");
        t.on_terminal_output(b"u@box:/work$ cd /etc\r\n");
        assert_eq!(t.current_dir(), Some(Path::new("/work")));
        assert!(!t.history().is_empty());
    }

    #[test]
    fn history_is_bounded() {
        let config = ScopeConfig {
            history_limit: 2,
            ..ScopeConfig::default()
        };
        let mut t = DirectoryTracker::new(PathResolver::new(None), &config);
        for line in ["pwd", "ls", "cd /"] {
            t.on_command_finished(line, 0);
        }
        let kinds: Vec<_> = t.history().iter().map(|c| c.kind.clone()).collect();
        assert!(matches!(kinds[0], CommandKind::Ls { .. }));
        assert!(matches!(kinds[1], CommandKind::Cd { .. }));
    }

    #[test]
    fn clear_resets_state() {
        let mut t = tracker();
        t.on_command_finished("ls", 0);
        t.clear();
        assert!(t.current_dir().is_none());
        assert!(t.history().is_empty());
        assert!(t.last_listing().is_none());
    }
}
