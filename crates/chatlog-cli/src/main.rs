//! chatlog - A tool for reading binary game chat logs
//!
//! Usage:
//!   chatlog <log_file>                          - Print every line of a log
//!   chatlog dump <files|dirs>... [-c channel]   - Print lines, optionally by channel
//!   chatlog info <files|dirs>...                - Show per-file statistics
//!   chatlog export <files|dirs>... -o <dir>     - Write filtered copies as text or JSON lines
//!   chatlog channels                            - List known channel names

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;

use chatlog::log_utils::{
    dump_logs, export_logs, list_channels, show_info, BatchPolicy, BatchSummary, DumpOptions,
    ExportFormat,
};
use chatlog::utils::DEFAULT_LOG_PATTERN;
use chatlog::{collect_log_files, ChannelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "chatlog")]
#[command(version)]
#[command(about = "Dump and export binary game chat logs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log file to print (quick mode)
    log_file: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); overrides RUST_LOG
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Input selection shared by the batch commands
#[derive(Args)]
struct Inputs {
    /// Log files or directories containing log files
    #[arg(required = true, num_args = 1..)]
    inputs: Vec<PathBuf>,

    /// File pattern used when searching directories
    #[arg(long, default_value = DEFAULT_LOG_PATTERN)]
    pattern: String,

    /// Skip files that fail to decode instead of stopping
    #[arg(short = 'k', long)]
    keep_going: bool,
}

impl Inputs {
    fn files(&self) -> Result<Vec<PathBuf>> {
        collect_log_files(&self.inputs, &self.pattern)
    }

    fn policy(&self) -> BatchPolicy {
        if self.keep_going {
            BatchPolicy::Skip
        } else {
            BatchPolicy::Abort
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Jsonl,
}

impl From<Format> for ExportFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => ExportFormat::Text,
            Format::Jsonl => ExportFormat::JsonLines,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print log lines
    Dump {
        #[command(flatten)]
        inputs: Inputs,
        /// Only show these channels (repeatable, see `chatlog channels`)
        #[arg(short, long = "channel")]
        channels: Vec<String>,
        /// Print timestamps as raw seconds
        #[arg(long)]
        raw_time: bool,
    },
    /// Show statistics for each log
    Info {
        #[command(flatten)]
        inputs: Inputs,
    },
    /// Export filtered logs, one output file per input
    Export {
        #[command(flatten)]
        inputs: Inputs,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// Only export these channels (repeatable)
        #[arg(short, long = "channel")]
        channels: Vec<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },
    /// List known channel names
    Channels,
}

/// Level forced by `-v`, `None` to leave it to RUST_LOG
fn verbosity_level(verbose: u8) -> Option<tracing::Level> {
    match verbose {
        0 => None,
        1 => Some(tracing::Level::INFO),
        2 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbosity_level(verbose) {
        Some(level) => EnvFilter::from_default_env().add_directive(level.into()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();
}

fn report(summary: BatchSummary) {
    tracing::info!(
        files = summary.files,
        records = summary.records,
        failed = summary.failed,
        "Finished"
    );
    if summary.failed > 0 {
        eprintln!(
            "{} of {} files could not be decoded",
            summary.failed, summary.files
        );
        std::process::exit(1);
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Some(Commands::Dump {
            inputs,
            channels,
            raw_time,
        }) => {
            let filter = ChannelFilter::from_names(&channels)?;
            let files = inputs.files()?;
            let mut out = io::stdout().lock();
            let summary = dump_logs(
                &mut out,
                &files,
                filter,
                DumpOptions { raw_time },
                inputs.policy(),
            )?;
            report(summary);
        }
        Some(Commands::Info { inputs }) => {
            let summary = show_info(&inputs.files()?, inputs.policy())?;
            report(summary);
        }
        Some(Commands::Export {
            inputs,
            output,
            channels,
            format,
        }) => {
            let filter = ChannelFilter::from_names(&channels)?;
            let summary = export_logs(
                &inputs.files()?,
                filter,
                &output,
                format.into(),
                inputs.policy(),
            )?;
            println!(
                "Exported {} records from {} files to {}",
                summary.records,
                summary.files - summary.failed,
                output.display()
            );
            report(summary);
        }
        Some(Commands::Channels) => list_channels(),
        None => {
            if let Some(log_file) = cli.log_file {
                let mut out = io::stdout().lock();
                dump_logs(
                    &mut out,
                    &[log_file],
                    ChannelFilter::new(),
                    DumpOptions::default(),
                    BatchPolicy::Abort,
                )?;
            } else {
                eprintln!("Usage: chatlog <log_file>");
                eprintln!("       chatlog dump <files|dirs>... [-c channel]... [--raw-time] [-k]");
                eprintln!("       chatlog info <files|dirs>... [-k]");
                eprintln!("       chatlog export <files|dirs>... -o <dir> [-c channel]... [-f text|jsonl] [-k]");
                eprintln!("       chatlog channels");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_level() {
        assert_eq!(verbosity_level(0), None);
        assert_eq!(verbosity_level(1), Some(tracing::Level::INFO));
        assert_eq!(verbosity_level(2), Some(tracing::Level::DEBUG));
        assert_eq!(verbosity_level(5), Some(tracing::Level::TRACE));
    }

    #[test]
    fn test_channel_names_build_filter() {
        let cli = Cli::parse_from(["chatlog", "dump", "a.log", "-c", "say", "--channel", "party"]);
        let Some(Commands::Dump { channels, .. }) = cli.command else {
            panic!("expected dump");
        };
        let filter = ChannelFilter::from_names(&channels).unwrap();
        assert!(filter.is_enabled(chatlog::ChannelTag::Say));
        assert!(filter.is_enabled(chatlog::ChannelTag::Party));

        let err = ChannelFilter::from_names(["whisper"]).unwrap_err();
        assert!(matches!(err, chatlog::Error::UnknownChannel(name) if name == "whisper"));
    }
}
