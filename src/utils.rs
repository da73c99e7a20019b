//! General utility functions for chatlog
//!
//! Escaping and formatting helpers for display, plus file collection for
//! batch commands.

use anyhow::{Context, Result};
use chrono::DateTime;
use globset::{Glob, GlobMatcher};
use std::fs;
use std::path::{Path, PathBuf};

/// Default pattern used when a directory is given instead of a file
pub const DEFAULT_LOG_PATTERN: &str = "*.log";

/// Format a file size in human-readable form (B, KB, MB, GB)
pub fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} B", size)
    }
}

/// Render a log timestamp as `YYYY-MM-DD HH:MM:SS` (UTC)
pub fn format_timestamp(time: u32) -> String {
    match DateTime::from_timestamp(i64::from(time), 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => time.to_string(),
    }
}

/// Make a byte string safe to print on a terminal
///
/// Valid UTF-8 is kept, except control characters and backslashes which are
/// escaped. Invalid bytes are written as `\xNN`.
pub fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;

    while !rest.is_empty() {
        let (valid, invalid) = match std::str::from_utf8(rest) {
            Ok(s) => (s, &[][..]),
            Err(e) => {
                let (good, bad) = rest.split_at(e.valid_up_to());
                let bad_len = e.error_len().unwrap_or(bad.len());
                // `good` was just validated
                let good = std::str::from_utf8(good).unwrap_or_default();
                rest = &bad[bad_len..];
                (good, &bad[..bad_len])
            }
        };

        for c in valid.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
                c => out.push(c),
            }
        }
        for b in invalid {
            out.push_str(&format!("\\x{:02x}", b));
        }

        if invalid.is_empty() {
            break;
        }
    }

    out
}

/// Create a glob matcher from a pattern string
///
/// Patterns without a path separator (`*.log`, `0000*.log`, `00000001.log`)
/// get a `**/` prefix so they match a file name in any directory.
pub fn create_glob_matcher(pattern: &str) -> Result<GlobMatcher> {
    let pattern = if !pattern.contains('/') {
        format!("**/{}", pattern)
    } else {
        pattern.to_string()
    };

    let glob = Glob::new(&pattern).with_context(|| format!("Invalid pattern: {}", pattern))?;
    Ok(glob.compile_matcher())
}

/// Expand command-line inputs into a sorted list of log files
///
/// Files are taken as given. Directories are searched recursively for files
/// whose path relative to that directory matches `pattern`.
pub fn collect_log_files(inputs: &[PathBuf], pattern: &str) -> Result<Vec<PathBuf>> {
    let matcher = create_glob_matcher(pattern)?;
    let mut files = Vec::new();

    for input in inputs {
        if input.is_dir() {
            let mut found = Vec::new();
            collect_files_recursive(input, &mut found)
                .with_context(|| format!("Failed to read directory {}", input.display()))?;
            found.retain(|path| {
                let relative = path.strip_prefix(input).unwrap_or(path);
                matcher.is_match(relative)
            });
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }

    Ok(files)
}

/// Helper function for recursive file collection
fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files_recursive(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}
