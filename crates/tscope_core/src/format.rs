//! `ls`-compatible rendering of sizes, dates and names.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use tscope_hal::DirectoryEntry;
use tscope_parser::ListingOptions;

pub use tscope_hal::permission_string;

const UNITS: [&str; 7] = ["", "K", "M", "G", "T", "P", "E"];

/// Entries newer than this (in either direction) show a time instead of a year.
pub const RECENT_WINDOW: Duration = Duration::from_secs(180 * 24 * 60 * 60);

/// Render a byte count, humanized with base-1024 units when `human_readable`.
///
/// Scaled values round up like GNU `ls -h` rather than to nearest: one
/// decimal below 10 unless the value is whole, none otherwise, and a result
/// that rounds up to 1024 moves to the next unit. So 1025 bytes is `1.1K`
/// (not `1.0K`) and 1048575 is `1M` (not `1024K`). Byte-scale values carry no
/// unit suffix.
pub fn human_size(bytes: u64, human_readable: bool) -> String {
    if !human_readable || bytes < 1024 {
        return bytes.to_string();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if value < 10.0 {
        let tenths = (value * 10.0).ceil() / 10.0;
        if tenths < 10.0 {
            return if tenths.fract() == 0.0 {
                format!("{}{}", tenths as u64, UNITS[unit])
            } else {
                format!("{:.1}{}", tenths, UNITS[unit])
            };
        }
        value = tenths;
    }

    let mut whole = value.ceil();
    if whole >= 1024.0 && unit < UNITS.len() - 1 {
        // 1024K is shown as 1M
        whole = 1.0;
        unit += 1;
    }
    format!("{}{}", whole as u64, UNITS[unit])
}

/// Format a timestamp the way `ls -l` does, relative to the current time.
pub fn format_date(timestamp: SystemTime) -> String {
    format_date_at(timestamp, SystemTime::now(), &Local)
}

/// Format `timestamp` relative to `now` in the given time zone.
pub fn format_date_at<Tz>(timestamp: SystemTime, now: SystemTime, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let age = match now.duration_since(timestamp) {
        Ok(age) => age,
        Err(err) => err.duration(),
    };
    let local = DateTime::<Utc>::from(timestamp).with_timezone(tz);
    if age < RECENT_WINDOW {
        local.format("%b %e %H:%M").to_string()
    } else {
        local.format("%b %e  %Y").to_string()
    }
}

/// The entry's name with its `-F` suffix when `classify` is requested.
pub fn display_name(entry: &DirectoryEntry, options: &ListingOptions) -> String {
    match entry.classify_suffix() {
        Some(suffix) if options.classify => format!("{}{}", entry.name, suffix),
        _ => entry.name.clone(),
    }
}

/// Pre-formatted columns of one `ls -l` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LongRow {
    pub mode: String,
    pub owner: String,
    pub group: String,
    pub size: String,
    pub modified: String,
    pub name: String,
    pub target: Option<String>,
}

impl LongRow {
    pub fn from_entry(entry: &DirectoryEntry, options: &ListingOptions, now: SystemTime) -> Self {
        Self::from_entry_in(entry, options, now, &Local)
    }

    pub fn from_entry_in<Tz>(entry: &DirectoryEntry, options: &ListingOptions, now: SystemTime, tz: &Tz) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Self {
            mode: entry.mode_string(),
            owner: entry.owner_name.clone(),
            group: entry.group_name.clone(),
            size: human_size(entry.size, options.human_readable_sizes),
            modified: format_date_at(entry.mtime.unwrap_or(UNIX_EPOCH), now, tz),
            name: display_name(entry, options),
            target: entry
                .symlink_target
                .as_ref()
                .map(|target| target.display().to_string()),
        }
    }
}

impl fmt::Display for LongRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {} {} {}",
            self.mode, self.owner, self.group, self.size, self.modified, self.name
        )?;
        if let Some(target) = &self.target {
            write!(f, " -> {target}")?;
        }
        Ok(())
    }
}
