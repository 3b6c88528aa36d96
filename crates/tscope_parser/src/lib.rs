#![doc = "Classification of shell command lines and raw terminal output into directory-state facts."]

pub mod classifier;
pub mod command;
pub mod options;
pub mod resolver;
pub mod stream;

pub use classifier::{classify, is_cd, is_ls, is_popd, is_pwd, RULES};
pub use command::{CommandKind, ParsedCommand};
pub use options::{parse_ls_options, ListingOptions, SortKey};
pub use resolver::PathResolver;
pub use stream::{strip_ansi, TerminalStreamParser};
