//! # chatlog
//!
//! A Rust library for reading the binary chat log files written by the game
//! client.
//!
//! ## Overview
//!
//! A log file holds an offset table and a pool of records. Each record is a
//! speaker name and a message text, optionally preceded by an 8-byte metadata
//! block with a timestamp and a channel tag. This library provides:
//!
//! - Validating and slicing a log file buffer ([`Container`])
//! - Zero-copy iteration over its records ([`Records`], [`Message`])
//! - Channel tags with a fallback for unrecognized bytes ([`ChannelTag`])
//! - Channel-based filtering during iteration ([`ChannelFilter`])
//! - Dump, summary and export helpers for batches of files ([`log_utils`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use chatlog::{ChannelFilter, ChannelTag, Container};
//!
//! fn main() -> anyhow::Result<()> {
//!     let data = std::fs::read("00000001.log")?;
//!     let log = Container::load(data)?;
//!
//!     let party: ChannelFilter = [ChannelTag::Party].into_iter().collect();
//!     for message in log.records(party) {
//!         let message = message?;
//!         println!("{}: {}", String::from_utf8_lossy(message.name),
//!             String::from_utf8_lossy(message.text));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod container;
pub mod error;
pub mod filter;
pub mod log_utils;
pub mod record;
pub mod utils;

pub use channel::ChannelTag;
pub use container::{Container, LogHeader};
pub use error::{Error, FormatError, Result};
pub use filter::ChannelFilter;
pub use record::{Message, Metadata, Records};
pub use utils::{collect_log_files, escape_bytes, format_timestamp};
