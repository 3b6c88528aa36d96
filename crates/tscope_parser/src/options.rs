//! `ls` option extraction.
//!
//! Every `-xyz` token is scanned one character at a time against a fixed
//! table, so a squashed token only sets the flags its letters name.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Time,
    Size,
    None,
}

/// Options of a single listing request.
///
/// `almost_all` implies `show_hidden`; construct through the setters or
/// [`parse_ls_options`] to keep that true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ListingOptions {
    pub show_hidden: bool,
    pub almost_all: bool,
    pub long_format: bool,
    pub sort_key: SortKey,
    pub reverse: bool,
    pub human_readable_sizes: bool,
    pub classify: bool,
}

impl ListingOptions {
    pub fn with_all(mut self) -> Self {
        self.show_hidden = true;
        self
    }

    pub fn with_almost_all(mut self) -> Self {
        self.show_hidden = true;
        self.almost_all = true;
        self
    }

    pub fn with_long_format(mut self) -> Self {
        self.long_format = true;
        self
    }

    pub fn with_sort(mut self, key: SortKey) -> Self {
        self.sort_key = key;
        self
    }

    pub fn with_reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn with_human_readable(mut self) -> Self {
        self.human_readable_sizes = true;
        self
    }

    pub fn with_classify(mut self) -> Self {
        self.classify = true;
        self
    }

    /// Whether the synthetic `.` and `..` entries belong in the listing.
    pub fn includes_dot_entries(&self) -> bool {
        self.show_hidden && !self.almost_all
    }
}

#[derive(Debug, Clone, Copy)]
enum Effect {
    All,
    AlmostAll,
    Long,
    Sort(SortKey),
    Reverse,
    Human,
    Classify,
}

const SHORT_FLAGS: &[(char, Effect)] = &[
    ('a', Effect::All),
    ('A', Effect::AlmostAll),
    ('l', Effect::Long),
    ('t', Effect::Sort(SortKey::Time)),
    ('S', Effect::Sort(SortKey::Size)),
    ('U', Effect::Sort(SortKey::None)),
    ('r', Effect::Reverse),
    ('h', Effect::Human),
    ('F', Effect::Classify),
];

const LONG_FLAGS: &[(&str, Effect)] = &[
    ("--all", Effect::All),
    ("--almost-all", Effect::AlmostAll),
    ("--reverse", Effect::Reverse),
    ("--human-readable", Effect::Human),
    ("--classify", Effect::Classify),
    ("--sort=name", Effect::Sort(SortKey::Name)),
    ("--sort=time", Effect::Sort(SortKey::Time)),
    ("--sort=size", Effect::Sort(SortKey::Size)),
    ("--sort=none", Effect::Sort(SortKey::None)),
];

/// Tokens that end the `ls` invocation inside a larger command line.
const SEPARATORS: &[&str] = &["|", "||", "&&", ";", "&"];

impl Effect {
    fn apply(self, options: &mut ListingOptions) {
        match self {
            Effect::All => options.show_hidden = true,
            Effect::AlmostAll => {
                options.show_hidden = true;
                options.almost_all = true;
            }
            Effect::Long => options.long_format = true,
            // last sort flag wins
            Effect::Sort(key) => options.sort_key = key,
            Effect::Reverse => options.reverse = true,
            Effect::Human => options.human_readable_sizes = true,
            Effect::Classify => options.classify = true,
        }
    }
}

/// Extract the effective option set from an `ls` line or bare argument list.
/// Unknown flags are ignored.
pub fn parse_ls_options(line: &str) -> ListingOptions {
    let mut options = ListingOptions::default();
    for token in line.split_whitespace() {
        if SEPARATORS.contains(&token) {
            break;
        }
        if let Some(long) = token.strip_prefix("--") {
            if long.is_empty() {
                continue;
            }
            if let Some((_, effect)) = LONG_FLAGS.iter().find(|(name, _)| *name == token) {
                effect.apply(&mut options);
            }
        } else if let Some(short) = token.strip_prefix('-') {
            for ch in short.chars() {
                if let Some((_, effect)) = SHORT_FLAGS.iter().find(|(flag, _)| *flag == ch) {
                    effect.apply(&mut options);
                }
            }
        }
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn squashed_long_listing() {
        let opts = parse_ls_options("ls -lAht");
        assert!(opts.long_format);
        assert!(opts.show_hidden);
        assert!(opts.almost_all);
        assert!(opts.human_readable_sizes);
        assert_eq!(opts.sort_key, SortKey::Time);
        assert!(!opts.reverse);
        assert!(!opts.classify);
    }

    #[test]
    fn bare_flags_without_command_word() {
        let opts = parse_ls_options("-lAht");
        assert_eq!(
            opts,
            ListingOptions::default()
                .with_long_format()
                .with_almost_all()
                .with_human_readable()
                .with_sort(SortKey::Time)
        );
    }

    #[test]
    fn plain_all_does_not_set_almost_all() {
        let opts = parse_ls_options("ls -a");
        assert!(opts.show_hidden);
        assert!(!opts.almost_all);
        assert!(opts.includes_dot_entries());

        let opts = parse_ls_options("ls --all");
        assert!(opts.show_hidden && !opts.almost_all);
    }

    #[test]
    fn long_aliases() {
        let opts = parse_ls_options("ls --almost-all --reverse --human-readable --classify");
        assert!(opts.show_hidden && opts.almost_all);
        assert!(opts.reverse && opts.human_readable_sizes && opts.classify);
        assert!(!opts.includes_dot_entries());
    }

    #[test]
    fn last_sort_flag_wins() {
        assert_eq!(parse_ls_options("ls -t -S").sort_key, SortKey::Size);
        assert_eq!(parse_ls_options("ls -S -t").sort_key, SortKey::Time);
        assert_eq!(parse_ls_options("ls -tU").sort_key, SortKey::None);
        assert_eq!(parse_ls_options("ls -U --sort=name").sort_key, SortKey::Name);
    }

    #[test]
    fn unrelated_letters_do_not_cross_match() {
        let opts = parse_ls_options("ls -U");
        assert_eq!(opts, ListingOptions::default().with_sort(SortKey::None));
        // `--color` contains letters of real flags but is not a known long option
        assert_eq!(parse_ls_options("ls --color=auto"), ListingOptions::default());
    }

    #[test]
    fn paths_and_trailing_commands_ignored() {
        let opts = parse_ls_options("ls -l src/ | grep -a foo");
        assert!(opts.long_format);
        assert!(!opts.show_hidden);
        assert_eq!(parse_ls_options("ls && rm -rf x"), ListingOptions::default());
    }

    #[test]
    fn unknown_flags_are_ignored() {
        assert_eq!(parse_ls_options("ls -1 --group-directories-first"), ListingOptions::default());
    }
}
