//! Chat log batch operations
//!
//! This module contains the functions behind the command-line tool: reading
//! log files, dumping their lines, summarizing them and exporting filtered
//! copies.

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::{
    utils::{escape_bytes, format_size, format_timestamp},
    ChannelFilter, ChannelTag, Container, FormatError, Message,
};

/// What to do when one file of a batch fails to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchPolicy {
    /// Stop at the first failing file
    #[default]
    Abort,
    /// Log the failure and continue with the next file
    Skip,
}

/// Output format for exported logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    /// One escaped line per record, same as `dump`
    #[default]
    Text,
    /// One JSON object per record
    JsonLines,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::JsonLines => "jsonl",
        }
    }
}

/// Options for rendering records as text
#[derive(Debug, Clone, Copy, Default)]
pub struct DumpOptions {
    /// Print timestamps as raw seconds instead of a date
    pub raw_time: bool,
}

/// Counters for a batch run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files: usize,
    pub failed: usize,
    pub records: usize,
}

/// Read a file and decode it as a chat log
pub fn read_container(path: &Path) -> crate::Result<Container> {
    let data = fs::read(path)?;
    Ok(Container::load(data)?)
}

/// [`read_container`] with the file name attached to the error
pub fn read_log(path: &Path) -> Result<Container> {
    read_container(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Render one record as a display line
///
/// `[time] channel name: text`, with the time and channel replaced by `-`
/// for records without metadata and the name part omitted when empty.
pub fn format_message(message: &Message<'_>, options: DumpOptions) -> String {
    let mut line = match message.meta {
        Some(meta) => {
            let time = if options.raw_time {
                meta.time.to_string()
            } else {
                format_timestamp(meta.time)
            };
            format!("[{}] {}", time, meta.channel)
        }
        None => "[-] -".to_string(),
    };

    line.push(' ');
    if !message.name.is_empty() {
        line.push_str(&escape_bytes(message.name));
        line.push_str(": ");
    }
    line.push_str(&escape_bytes(message.text));
    line
}

/// JSON form of a record. Name and text are escaped like the text output, so
/// bytes that are not valid UTF-8 survive as `\xNN`.
#[derive(Serialize)]
struct JsonMessage {
    time: Option<u32>,
    channel: Option<String>,
    channel_byte: Option<u8>,
    unknown: Option<u8>,
    name: String,
    text: String,
}

impl From<&Message<'_>> for JsonMessage {
    fn from(message: &Message<'_>) -> Self {
        JsonMessage {
            time: message.time(),
            channel: message.channel().map(|c| c.to_string()),
            channel_byte: message.channel().map(ChannelTag::byte),
            unknown: message.meta.map(|m| m.unknown),
            name: escape_bytes(message.name),
            text: escape_bytes(message.text),
        }
    }
}

/// Write the records of `container` admitted by `filter`, returning how many
/// were written
pub fn write_records<W: Write>(
    out: &mut W,
    container: &Container,
    filter: ChannelFilter,
    format: ExportFormat,
    options: DumpOptions,
) -> Result<usize> {
    let mut written = 0;
    write_records_counted(out, container, filter, format, options, &mut written)?;
    Ok(written)
}

/// [`write_records`] that leaves the number of records already written in
/// `written` when a malformed record stops it
fn write_records_counted<W: Write>(
    out: &mut W,
    container: &Container,
    filter: ChannelFilter,
    format: ExportFormat,
    options: DumpOptions,
    written: &mut usize,
) -> Result<()> {
    for message in container.records(filter) {
        let message = message?;
        match format {
            ExportFormat::Text => writeln!(out, "{}", format_message(&message, options))?,
            ExportFormat::JsonLines => {
                serde_json::to_writer(&mut *out, &JsonMessage::from(&message))?;
                writeln!(out)?;
            }
        }
        *written += 1;
    }

    Ok(())
}

fn record_failure(
    policy: BatchPolicy,
    path: &Path,
    err: anyhow::Error,
    summary: &mut BatchSummary,
) -> Result<()> {
    match policy {
        BatchPolicy::Abort => Err(err),
        BatchPolicy::Skip => {
            tracing::warn!("Skipping {}: {:#}", path.display(), err);
            summary.failed += 1;
            Ok(())
        }
    }
}

/// Print the admitted records of each file
pub fn dump_logs<W: Write>(
    out: &mut W,
    files: &[PathBuf],
    filter: ChannelFilter,
    options: DumpOptions,
    policy: BatchPolicy,
) -> Result<BatchSummary> {
    let mut summary = BatchSummary::default();

    for path in files {
        summary.files += 1;
        let mut written = 0;
        let result = read_log(path).and_then(|container| {
            tracing::debug!("Dumping {} ({} records)", path.display(), container.len());
            write_records_counted(
                out,
                &container,
                filter,
                ExportFormat::Text,
                options,
                &mut written,
            )
            .with_context(|| format!("Failed to dump {}", path.display()))
        });

        // Lines printed before a malformed record still count
        summary.records += written;
        if let Err(e) = result {
            record_failure(policy, path, e, &mut summary)?;
        }
    }

    Ok(summary)
}

/// Per-file statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogStats {
    pub records: usize,
    pub pool_len: usize,
    pub without_meta: usize,
    pub unknown_tags: usize,
    pub first_time: Option<u32>,
    pub last_time: Option<u32>,
    pub by_channel: BTreeMap<ChannelTag, usize>,
}

impl LogStats {
    /// Walk every record of a container
    pub fn collect(container: &Container) -> std::result::Result<Self, FormatError> {
        let mut stats = LogStats {
            pool_len: container.pool().len(),
            ..Default::default()
        };

        for message in container.messages() {
            let message = message?;
            stats.records += 1;

            let Some(meta) = message.meta else {
                stats.without_meta += 1;
                continue;
            };
            if !meta.channel.is_named() {
                stats.unknown_tags += 1;
            }
            *stats.by_channel.entry(meta.channel).or_default() += 1;
            stats.first_time = Some(stats.first_time.map_or(meta.time, |t| t.min(meta.time)));
            stats.last_time = Some(stats.last_time.map_or(meta.time, |t| t.max(meta.time)));
        }

        Ok(stats)
    }
}

/// Show statistics for each file
///
/// Files are decoded in parallel; output follows input order.
pub fn show_info(files: &[PathBuf], policy: BatchPolicy) -> Result<BatchSummary> {
    let results: Vec<Result<LogStats>> = files
        .par_iter()
        .map(|path| {
            let container = read_log(path)?;
            LogStats::collect(&container)
                .with_context(|| format!("Failed to decode {}", path.display()))
        })
        .collect();

    let mut summary = BatchSummary::default();

    for (path, result) in files.iter().zip(results) {
        summary.files += 1;
        let stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                record_failure(policy, path, e, &mut summary)?;
                continue;
            }
        };
        summary.records += stats.records;
        print_stats(path, &stats);
    }

    Ok(summary)
}

fn print_stats(path: &Path, stats: &LogStats) {
    println!("{}", path.display());
    println!("  Records: {}", stats.records);
    println!("  Pool size: {}", format_size(stats.pool_len as u64));
    println!("  Without metadata: {}", stats.without_meta);
    println!("  Unknown channels: {}", stats.unknown_tags);
    if let (Some(first), Some(last)) = (stats.first_time, stats.last_time) {
        println!(
            "  Time range: {} .. {}",
            format_timestamp(first),
            format_timestamp(last)
        );
    }
    if !stats.by_channel.is_empty() {
        println!("  Channels:");
        for (tag, count) in &stats.by_channel {
            println!("    {:<16} {:>8}", tag.to_string(), count);
        }
    }
    println!();
}

/// Output path for an exported log
pub fn export_path(input: &Path, output_dir: &Path, format: ExportFormat) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chatlog".to_string());
    output_dir.join(format!("{}.{}", stem, format.extension()))
}

/// Export the admitted records of each file into `output_dir`
///
/// Each input produces one output file. A file that fails to decode leaves
/// no output behind.
pub fn export_logs(
    files: &[PathBuf],
    filter: ChannelFilter,
    output_dir: &Path,
    format: ExportFormat,
    policy: BatchPolicy,
) -> Result<BatchSummary> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )?);

    let mut summary = BatchSummary::default();

    for path in files {
        summary.files += 1;
        pb.set_message(path.display().to_string());

        let target = export_path(path, output_dir, format);
        let result = read_log(path).and_then(|container| {
            let mut buffer = Vec::new();
            let count = write_records(
                &mut buffer,
                &container,
                filter,
                format,
                DumpOptions::default(),
            )
            .with_context(|| format!("Failed to decode {}", path.display()))?;
            fs::write(&target, buffer)
                .with_context(|| format!("Failed to write {}", target.display()))?;
            Ok(count)
        });

        match result {
            Ok(count) => summary.records += count,
            Err(e) => {
                if policy == BatchPolicy::Abort {
                    pb.abandon();
                }
                record_failure(policy, path, e, &mut summary)?;
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");

    Ok(summary)
}

/// Print the named channel table
pub fn list_channels() {
    for tag in ChannelTag::NAMED {
        if let Some(name) = tag.name() {
            println!("0x{:02x}  {}", tag.byte(), name);
        }
    }
}
