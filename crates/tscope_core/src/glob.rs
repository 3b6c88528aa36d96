//! Shell-glob matching with brace expansion, used for highlighting.
//!
//! A pattern is brace-expanded first (`{a,b}`, `{01..10}`, `{a..e}`), then
//! every expansion is compiled with `globset`. A name matches when any
//! expansion matches. Patterns without `/` are matched against the last path
//! segment only. Matching is case-sensitive and a leading dot is ordinary.

use std::collections::HashSet;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

/// Upper bound on expansions produced from one pattern.
pub const MAX_EXPANSIONS: usize = 4096;

/// Expand every brace group in `pattern`, depth first, removing duplicates.
///
/// Backslash escapes are preserved in the output. Brace groups that are
/// neither a list nor a range stay in the output as literal text.
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = expand(pattern);
    out.retain(|s| seen.insert(s.clone()));
    out
}

fn expand(pattern: &str) -> Vec<String> {
    let Some((open, close)) = find_group(pattern) else {
        return vec![pattern.to_string()];
    };
    let prefix = &pattern[..open];
    let body = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    let alternatives: Vec<String> = match split_alternatives(body) {
        Some(parts) => parts.into_iter().flat_map(expand).collect(),
        None => match expand_range(body) {
            Some(values) => values,
            None => expand(body).into_iter().map(|v| format!("{{{v}}}")).collect(),
        },
    };
    let tails = expand(suffix);

    let mut out = Vec::with_capacity(alternatives.len() * tails.len());
    for alt in &alternatives {
        for tail in &tails {
            if out.len() >= MAX_EXPANSIONS {
                warn!(pattern, limit = MAX_EXPANSIONS, "brace expansion truncated");
                return out;
            }
            out.push(format!("{prefix}{alt}{tail}"));
        }
    }
    out
}

/// Byte offsets of the first `{` that has a matching `}`.
fn find_group(pattern: &str) -> Option<(usize, usize)> {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => {
                if let Some(close) = matching_close(bytes, i) {
                    return Some((i, close));
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn matching_close(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split a group body on top-level commas; `None` when there are none.
fn split_alternatives(body: &str) -> Option<Vec<&str>> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                i += 2;
                continue;
            }
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if parts.is_empty() {
        return None;
    }
    parts.push(&body[start..]);
    Some(parts)
}

/// `start..end[..step]` over integers or single ASCII letters.
fn expand_range(body: &str) -> Option<Vec<String>> {
    let parts: Vec<&str> = body.split("..").collect();
    let (start, end, step) = match parts.as_slice() {
        [start, end] => (*start, *end, 1),
        [start, end, step] => (*start, *end, step.parse::<i64>().ok()?.unsigned_abs().max(1)),
        _ => return None,
    };

    if let (Ok(a), Ok(b)) = (start.parse::<i64>(), end.parse::<i64>()) {
        let width = if has_leading_zero(start) || has_leading_zero(end) {
            start.len().max(end.len())
        } else {
            0
        };
        return Some(stepped(a, b, step).into_iter().map(|n| format!("{n:0width$}")).collect());
    }

    let (a, b) = (single_letter(start)?, single_letter(end)?);
    Some(
        stepped(i64::from(a), i64::from(b), step)
            .into_iter()
            .map(|n| char::from(n as u8).to_string())
            .collect(),
    )
}

fn has_leading_zero(bound: &str) -> bool {
    let digits = bound.strip_prefix('-').unwrap_or(bound);
    digits.len() > 1 && digits.starts_with('0')
}

fn single_letter(bound: &str) -> Option<u8> {
    match bound.as_bytes() {
        [c] if c.is_ascii_alphabetic() => Some(*c),
        _ => None,
    }
}

fn stepped(start: i64, end: i64, step: u64) -> Vec<i64> {
    let step = i64::try_from(step).unwrap_or(i64::MAX);
    let ascending = start <= end;
    let mut values = Vec::new();
    let mut n = start;
    loop {
        values.push(n);
        if values.len() >= MAX_EXPANSIONS {
            break;
        }
        let next = if ascending { n.checked_add(step) } else { n.checked_sub(step) };
        match next {
            Some(v) if (ascending && v <= end) || (!ascending && v >= end) => n = v,
            _ => break,
        }
    }
    values
}

/// Escape any brace still present so globset treats it literally.
fn escape_braces(expansion: &str) -> String {
    let mut out = String::with_capacity(expansion.len() + 4);
    let mut chars = expansion.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}

fn unescape(expansion: &str) -> String {
    let mut out = String::with_capacity(expansion.len());
    let mut chars = expansion.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// A compiled, brace-expanded glob pattern.
#[derive(Debug, Clone)]
pub struct GlobMatcher {
    pattern: String,
    base_names: GlobSet,
    full_paths: GlobSet,
    /// Expansions globset rejected, compared verbatim.
    literals: Vec<String>,
}

impl GlobMatcher {
    pub fn new(pattern: &str) -> Self {
        let mut base_names = GlobSetBuilder::new();
        let mut full_paths = GlobSetBuilder::new();
        let mut literals = Vec::new();

        if !pattern.is_empty() {
            for expansion in expand_braces(pattern) {
                let has_separator = expansion.contains('/');
                let compiled = GlobBuilder::new(&escape_braces(&expansion))
                    .literal_separator(has_separator)
                    .backslash_escape(true)
                    .build();
                match compiled {
                    Ok(glob) if has_separator => {
                        full_paths.add(glob);
                    }
                    Ok(glob) => {
                        base_names.add(glob);
                    }
                    Err(err) => {
                        debug!(%expansion, error = %err, "invalid glob, matching literally");
                        literals.push(unescape(&expansion));
                    }
                }
            }
        }

        Self {
            pattern: pattern.to_string(),
            base_names: build_set(base_names),
            full_paths: build_set(full_paths),
            literals,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_match(&self, name: &str) -> bool {
        if self.pattern.is_empty() || name.is_empty() {
            return false;
        }
        let base = name.rsplit('/').next().unwrap_or(name);
        self.base_names.is_match(base)
            || self.full_paths.is_match(name)
            || self.literals.iter().any(|l| l == base || l == name)
    }
}

fn build_set(builder: GlobSetBuilder) -> GlobSet {
    builder.build().unwrap_or_else(|err| {
        warn!(error = %err, "failed to build glob set");
        GlobSet::empty()
    })
}

/// One-shot form of [`GlobMatcher::is_match`].
pub fn matches(filename: &str, pattern: &str) -> bool {
    GlobMatcher::new(pattern).is_match(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_lists() {
        assert_eq!(expand_braces("file{1,2,3}.txt"), ["file1.txt", "file2.txt", "file3.txt"]);
        assert_eq!(expand_braces("a{,b}"), ["a", "ab"]);
        assert_eq!(expand_braces("{x,y}{1,2}"), ["x1", "x2", "y1", "y2"]);
    }

    #[test]
    fn nested_groups_expand_depth_first() {
        assert_eq!(expand_braces("{a,b{1,2}}c"), ["ac", "b1c", "b2c"]);
    }

    #[test]
    fn numeric_ranges() {
        assert_eq!(expand_braces("{1..3}"), ["1", "2", "3"]);
        assert_eq!(expand_braces("{3..1}"), ["3", "2", "1"]);
        assert_eq!(expand_braces("{0..10..5}"), ["0", "5", "10"]);
        assert_eq!(expand_braces("{10..0..4}"), ["10", "6", "2"]);
        assert_eq!(expand_braces("{-1..1}"), ["-1", "0", "1"]);
    }

    #[test]
    fn zero_padding_follows_the_padded_bound() {
        let padded = expand_braces("img{01..10}.png");
        assert_eq!(padded.len(), 10);
        assert_eq!(padded[0], "img01.png");
        assert_eq!(padded[4], "img05.png");
        assert_eq!(padded[9], "img10.png");
        assert_eq!(expand_braces("{8..010..2}"), ["008", "010"]);
        assert_eq!(expand_braces("{9..10}"), ["9", "10"]);
    }

    #[test]
    fn alpha_ranges() {
        assert_eq!(expand_braces("{a..e..2}"), ["a", "c", "e"]);
        assert_eq!(expand_braces("{C..A}"), ["C", "B", "A"]);
    }

    #[test]
    fn unrecognized_bodies_stay_literal() {
        assert_eq!(expand_braces("{foo}"), ["{foo}"]);
        assert_eq!(expand_braces("{}"), ["{}"]);
        assert_eq!(expand_braces("a{b"), ["a{b"]);
        assert_eq!(expand_braces("{1..z}"), ["{1..z}"]);
        assert_eq!(expand_braces("a{b{1,2}"), ["a{b1", "a{b2"]);
    }

    #[test]
    fn escaped_braces_do_not_expand() {
        assert_eq!(expand_braces(r"\{a,b\}"), [r"\{a,b\}"]);
    }

    #[test]
    fn duplicates_are_removed() {
        assert_eq!(expand_braces("{a,a,b}"), ["a", "b"]);
    }

    #[test]
    fn expansion_is_bounded() {
        assert_eq!(expand_braces("{1..100000}").len(), MAX_EXPANSIONS);
    }

    #[test]
    fn matching_basics() {
        assert!(matches("file2.txt", "file{1,2,3}.txt"));
        assert!(!matches("file4.txt", "file{1,2,3}.txt"));
        assert!(matches("img05.png", "img{01..10}.png"));
        assert!(!matches("img5.png", "img{01..10}.png"));
    }

    #[test]
    fn empty_pattern_matches_nothing() {
        assert!(!matches("anything", ""));
        assert!(!matches("", ""));
    }

    #[test]
    fn dotfiles_and_case() {
        assert!(matches(".bashrc", "*rc"));
        assert!(matches(".env", "*"));
        assert!(!matches("README.md", "readme.md"));
        assert!(matches("main.rs", "*.[rc]s"));
        assert!(matches("a.c", "?.c"));
    }

    #[test]
    fn base_name_matching() {
        assert!(matches("src/lib/mod.rs", "*.rs"));
        assert!(matches("src/mod.rs", "src/*.rs"));
        assert!(!matches("src/deep/mod.rs", "src/*.rs"));
    }

    #[test]
    fn literal_braces_and_invalid_globs() {
        assert!(matches("{foo}", "{foo}"));
        assert!(matches("a[b", "a[b"));
        assert!(matches("x{y", "x{y"));
    }
}
