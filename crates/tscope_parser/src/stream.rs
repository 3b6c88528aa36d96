//! Directory inference straight from raw PTY output.
//!
//! Used when the host cannot report executed command lines. Confidence is
//! lower than [`classify`](crate::classifier::classify) on a real command
//! line: relative targets are resolved by plain string segment manipulation
//! against the last known directory, so symlinks or `CDPATH` can make the
//! inferred directory drift until the next `pwd` or prompt corrects it.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::bytes::Regex as BytesRegex;
use regex::Regex;
use tracing::{debug, trace};

use crate::classifier::classify;
use crate::command::{CommandKind, ParsedCommand};

pub const DEFAULT_BUFFER_CHARS: usize = 1000;
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Longest tail held back while waiting for an escape sequence to finish.
const MAX_PENDING_ESCAPE: usize = 256;

static ANSI_ESCAPE: Lazy<BytesRegex> = Lazy::new(|| {
    BytesRegex::new(concat!(
        r"\x1b\[[0-?]*[ -/]*[@-~]",        // CSI
        r"|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)", // OSC, BEL or ST terminated
        r"|\x1b[PX^_][^\x1b]*\x1b\\",       // DCS/SOS/PM/APC
        r"|\x1b[0-?@-OQ-WYZ\\`-~]",         // Fp/Fe/Fs, e.g. ESC = and ESC 7
        r"|\x1b[()][0-9A-Za-z]",            // charset selection
    ))
    .expect("ansi escape pattern")
});

static PROMPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\([^)]*\)\s*)?[\w.-]+@[\w.-]+:\s*(~[^\s$#]*|/[^\s$#]*)\s*[$#]\s?(.*)$")
        .expect("prompt pattern")
});

/// Remove ANSI escape sequences from a byte slice.
pub fn strip_ansi(bytes: &[u8]) -> Vec<u8> {
    ANSI_ESCAPE.replace_all(bytes, &b""[..]).into_owned()
}

/// Incremental parser over terminal output chunks.
#[derive(Debug)]
pub struct TerminalStreamParser {
    /// Cleaned text of the current, not yet terminated line.
    buffer: String,
    /// Raw bytes held back: an unfinished escape sequence or UTF-8 char.
    pending: Vec<u8>,
    max_buffer_chars: usize,
    history: VecDeque<ParsedCommand>,
    history_limit: usize,
    current_dir: Option<PathBuf>,
    home: Option<PathBuf>,
    awaiting_pwd_output: bool,
}

impl TerminalStreamParser {
    pub fn new(home: Option<PathBuf>) -> Self {
        Self {
            buffer: String::new(),
            pending: Vec::new(),
            max_buffer_chars: DEFAULT_BUFFER_CHARS,
            history: VecDeque::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            current_dir: None,
            home,
            awaiting_pwd_output: false,
        }
    }

    pub fn with_limits(mut self, max_buffer_chars: usize, history_limit: usize) -> Self {
        self.max_buffer_chars = max_buffer_chars.max(1);
        self.history_limit = history_limit.max(1);
        self
    }

    pub fn with_current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Overwrite the best-known directory, e.g. from shell integration.
    pub fn set_current_dir(&mut self, dir: Option<PathBuf>) {
        self.current_dir = dir;
    }

    /// Oldest first.
    pub fn history(&self) -> &VecDeque<ParsedCommand> {
        &self.history
    }

    /// Text of the unterminated line currently buffered.
    pub fn buffered(&self) -> &str {
        &self.buffer
    }

    /// Reset buffer, history and current directory.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.pending.clear();
        self.history.clear();
        self.current_dir = None;
        self.awaiting_pwd_output = false;
    }

    /// Feed one chunk of raw output; returns the commands it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<ParsedCommand> {
        let mut raw = std::mem::take(&mut self.pending);
        raw.extend_from_slice(chunk);
        let held = split_incomplete_tail(&raw);
        self.pending = raw[held..].to_vec();

        let cleaned = strip_ansi(&raw[..held]);
        self.buffer.push_str(&String::from_utf8_lossy(&cleaned));

        let mut emitted = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            self.process_line(&render_line(&line), &mut emitted);
        }

        // a prompt sits unterminated until the user presses enter
        let partial = render_line(&self.buffer);
        if let Some(dir) = self.prompt_dir(&partial) {
            self.adopt(CommandKind::Prompt, dir, &mut emitted);
        }

        self.trim_buffer();
        for command in &emitted {
            self.record(command.clone());
        }
        emitted
    }

    fn process_line(&mut self, line: &str, emitted: &mut Vec<ParsedCommand>) {
        if std::mem::take(&mut self.awaiting_pwd_output) {
            let candidate = line.trim();
            if candidate.starts_with('/') && !PROMPT.is_match(candidate) {
                self.adopt(CommandKind::Pwd, PathBuf::from(candidate), emitted);
                return;
            }
        }

        let command_text = match PROMPT.captures(line) {
            Some(caps) => {
                if let Some(dir) = caps.get(1).and_then(|m| self.expand_prompt_dir(m.as_str())) {
                    self.adopt(CommandKind::Prompt, dir, emitted);
                }
                caps.get(2).map_or("", |m| m.as_str()).trim().to_string()
            }
            None => line.trim().to_string(),
        };
        if command_text.is_empty() {
            return;
        }

        let parsed = classify(&command_text);
        match &parsed.kind {
            CommandKind::Cd { raw_target } | CommandKind::Pushd { raw_target } => {
                let resolved = match raw_target.as_deref() {
                    Some(target) => self.resolve_segments(target),
                    // bare pushd rotates a stack that is not modelled
                    None if matches!(parsed.kind, CommandKind::Pushd { .. }) => None,
                    None => self.home.clone(),
                };
                if let Some(dir) = &resolved {
                    self.current_dir = Some(dir.clone());
                }
                debug!(target = ?raw_target, resolved = ?resolved, "directory change seen in output");
                emitted.push(parsed.clone().with_resolved_dir(resolved));
            }
            CommandKind::Popd | CommandKind::Ls { .. } => emitted.push(parsed.clone()),
            CommandKind::Pwd => self.awaiting_pwd_output = true,
            CommandKind::Prompt | CommandKind::Unknown => {}
        }
    }

    fn prompt_dir(&self, line: &str) -> Option<PathBuf> {
        let caps = PROMPT.captures(line)?;
        self.expand_prompt_dir(caps.get(1)?.as_str())
    }

    fn expand_prompt_dir(&self, raw: &str) -> Option<PathBuf> {
        match raw.strip_prefix('~') {
            Some("") => self.home.clone(),
            Some(tail) if tail.starts_with('/') => {
                let home = self.home.as_ref()?;
                Some(PathBuf::from(format!("{}{}", home.to_string_lossy().trim_end_matches('/'), tail)))
            }
            Some(_) => None,
            None => Some(PathBuf::from(raw)),
        }
    }

    /// Emit `kind` only when `dir` differs from the best-known directory.
    fn adopt(&mut self, kind: CommandKind, dir: PathBuf, emitted: &mut Vec<ParsedCommand>) {
        if self.current_dir.as_deref() == Some(dir.as_path()) {
            return;
        }
        trace!(dir = %dir.display(), "directory detected in output");
        self.current_dir = Some(dir.clone());
        emitted.push(ParsedCommand::new(kind).with_resolved_dir(Some(dir)));
    }

    /// Resolve `target` by string segments against the current directory.
    fn resolve_segments(&self, target: &str) -> Option<PathBuf> {
        if target == "-" || target.is_empty() {
            return None;
        }
        let (base, rest) = if target == "~" {
            return self.home.clone();
        } else if let Some(tail) = target.strip_prefix("~/") {
            (self.home.as_ref()?.to_string_lossy().into_owned(), tail)
        } else if target.starts_with('/') {
            (String::from("/"), target)
        } else {
            (self.current_dir.as_ref()?.to_string_lossy().into_owned(), target)
        };

        let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
        for segment in rest.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        Some(PathBuf::from(format!("/{}", segments.join("/"))))
    }

    fn record(&mut self, command: ParsedCommand) {
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(command);
    }

    fn trim_buffer(&mut self) {
        let len = self.buffer.chars().count();
        if len > self.max_buffer_chars {
            if let Some((cut, _)) = self.buffer.char_indices().nth(len - self.max_buffer_chars) {
                self.buffer.drain(..cut);
            }
        }
    }
}

/// Length of the prefix of `raw` that can be decoded now. The remainder is
/// an unfinished escape sequence or a UTF-8 character split across chunks.
fn split_incomplete_tail(raw: &[u8]) -> usize {
    let mut held = raw.len();
    if let Some(start) = unterminated_string_sequence(raw) {
        if raw.len() - start < MAX_PENDING_ESCAPE {
            held = start;
        }
    } else if let Some(esc) = raw.iter().rposition(|&b| b == 0x1b) {
        let complete = ANSI_ESCAPE.find_at(raw, esc).is_some_and(|m| m.start() == esc);
        if !complete && raw.len() - esc < MAX_PENDING_ESCAPE {
            held = esc;
        }
    }
    match std::str::from_utf8(&raw[..held]) {
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        _ => held,
    }
}

/// Offset of the first OSC/DCS/SOS/PM/APC introducer whose terminator has
/// not arrived yet.
fn unterminated_string_sequence(raw: &[u8]) -> Option<usize> {
    let mut i = 0;
    while i + 1 < raw.len() {
        if raw[i] == 0x1b && matches!(raw[i + 1], b']' | b'P' | b'X' | b'^' | b'_') {
            let body = &raw[i + 2..];
            let st = body.windows(2).position(|w| w == b"\x1b\\");
            let end = match raw[i + 1] {
                b']' => match (body.iter().position(|&b| b == 0x07), st) {
                    (Some(bel), Some(st)) => Some(bel.min(st + 1)),
                    (bel, st) => bel.or(st.map(|p| p + 1)),
                },
                _ => st.map(|p| p + 1),
            };
            match end {
                Some(end) => i += 2 + end + 1,
                None => return Some(i),
            }
            continue;
        }
        i += 1;
    }
    None
}

/// Apply carriage returns and backspaces the way a terminal would show the
/// line, and drop the trailing newline.
fn render_line(line: &str) -> String {
    let line = line.trim_end_matches(['\n', '\r']);
    let visible = line.rsplit('\r').next().unwrap_or(line);
    let mut out = String::with_capacity(visible.len());
    for ch in visible.chars() {
        match ch {
            '\u{8}' => {
                out.pop();
            }
            c if c.is_control() && c != '\t' => {}
            c => out.push(c),
        }
    }
    out
}
