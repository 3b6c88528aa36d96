//! Classification of completed shell command lines.
//!
//! [`classify`] walks [`RULES`] in order and returns the first structural
//! match. Each rule is also reachable on its own through the `is_*`
//! predicates so it can be tested in isolation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::command::{CommandKind, ParsedCommand};
use crate::options::parse_ls_options;

static CD_AT_START: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(cd|pushd)(?:[\s;&|]|$)").expect("cd start pattern"));
static CD_CHAINED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:&&|;)\s*(cd|pushd)(?:[\s;&|]|$)").expect("chained cd pattern"));
static POPD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|&&|;)\s*popd(?:[\s;&|]|$)").expect("popd pattern"));
static LS_AT_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"^ls(?:\s|$)").expect("ls pattern"));

/// Keyword of a directory-changing invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CdKeyword {
    Cd,
    Pushd,
}

/// A located `cd`/`pushd` invocation: which keyword, and the text after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CdInvocation<'a> {
    pub keyword: CdKeyword,
    pub rest: &'a str,
}

/// Find the first `cd`/`pushd` invocation, either leading the line or
/// chained after `&&`/`;`.
pub fn find_cd_invocation(line: &str) -> Option<CdInvocation<'_>> {
    let line = line.trim();
    let caps = CD_AT_START.captures(line).or_else(|| CD_CHAINED.captures(line))?;
    let word = caps.get(1)?;
    let keyword = if word.as_str() == "pushd" { CdKeyword::Pushd } else { CdKeyword::Cd };
    Some(CdInvocation {
        keyword,
        rest: &line[word.end()..],
    })
}

/// Pull the target argument out of the text following `cd`/`pushd`.
///
/// Skips `-L`/`-P`, stops at command separators, and strips one matching
/// pair of surrounding quotes. `None` means no argument was given.
pub fn extract_target(rest: &str) -> Option<String> {
    let mut rest = rest.trim_start();
    loop {
        let flag = ["-L", "-P"].iter().find(|flag| {
            rest.strip_prefix(**flag)
                .is_some_and(|tail| tail.is_empty() || tail.starts_with(char::is_whitespace))
        });
        match flag {
            Some(flag) => rest = rest[flag.len()..].trim_start(),
            None => break,
        }
    }

    let first = rest.chars().next()?;
    if matches!(first, ';' | '&' | '|') {
        return None;
    }
    if first == '"' || first == '\'' {
        let body = &rest[1..];
        return Some(match body.find(first) {
            Some(end) => body[..end].to_string(),
            None => body.to_string(),
        });
    }
    let end = rest
        .find(|c: char| c.is_whitespace() || matches!(c, ';' | '&' | '|'))
        .unwrap_or(rest.len());
    Some(rest[..end].to_string())
}

/// True iff the line is exactly `pwd` modulo surrounding whitespace.
pub fn is_pwd(line: &str) -> bool {
    line.trim() == "pwd"
}

pub fn is_cd(line: &str) -> bool {
    find_cd_invocation(line).is_some()
}

pub fn is_popd(line: &str) -> bool {
    POPD.is_match(line.trim())
}

pub fn is_ls(line: &str) -> bool {
    LS_AT_START.is_match(line.trim())
}

/// One classification rule.
pub struct Rule {
    pub name: &'static str,
    pub apply: fn(&str) -> Option<CommandKind>,
}

fn pwd_rule(line: &str) -> Option<CommandKind> {
    is_pwd(line).then_some(CommandKind::Pwd)
}

fn popd_rule(line: &str) -> Option<CommandKind> {
    is_popd(line).then_some(CommandKind::Popd)
}

fn cd_rule(line: &str) -> Option<CommandKind> {
    let invocation = find_cd_invocation(line)?;
    let raw_target = extract_target(invocation.rest);
    Some(match invocation.keyword {
        CdKeyword::Cd => CommandKind::Cd { raw_target },
        CdKeyword::Pushd => CommandKind::Pushd { raw_target },
    })
}

fn ls_rule(line: &str) -> Option<CommandKind> {
    let line = line.trim();
    is_ls(line).then(|| CommandKind::Ls {
        options: parse_ls_options(&line[2..]),
    })
}

/// Rules in priority order; the first match wins.
pub static RULES: &[Rule] = &[
    Rule { name: "pwd", apply: pwd_rule },
    Rule { name: "popd", apply: popd_rule },
    Rule { name: "cd", apply: cd_rule },
    Rule { name: "ls", apply: ls_rule },
];

/// Classify a completed command line. Never fails; unmatched lines are
/// [`CommandKind::Unknown`].
pub fn classify(line: &str) -> ParsedCommand {
    let kind = RULES
        .iter()
        .find_map(|rule| {
            let kind = (rule.apply)(line)?;
            tracing::trace!(rule = rule.name, line, "command classified");
            Some(kind)
        })
        .unwrap_or(CommandKind::Unknown);
    ParsedCommand::new(kind)
}
