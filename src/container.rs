//! Chat log container decoding
//!
//! A chat log file is a small header, an offset table and a string pool:
//!
//! ```text
//! [0:4)           u32  body
//! [4:8)           u32  total          count = total - body
//! [8:8+count*4)   u32  offsets[count] end of each record within the pool
//! [8+count*4:EOF)      pool           records back to back
//! ```
//!
//! All integers are little-endian. Each offset is the exclusive end of one
//! record; the previous record's end is the next record's start. Bytes past
//! the last offset are unused.

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use std::io::Cursor;
use std::ops::Range;

use crate::error::FormatError;
use crate::filter::ChannelFilter;
use crate::record::Records;

/// Size of the fixed header in bytes
pub const HEADER_SIZE: usize = 8;

/// Size of one offset table entry in bytes
const OFFSET_SIZE: usize = 4;

/// The two header words
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    pub body: u32,
    pub total: u32,
}

impl LogHeader {
    /// Parse the header from the start of a buffer
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        if data.len() < HEADER_SIZE {
            return Err(FormatError::Truncated {
                needed: HEADER_SIZE,
                actual: data.len(),
            });
        }

        let mut cursor = Cursor::new(data);
        let body = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| truncated(HEADER_SIZE, data.len()))?;
        let total = cursor
            .read_u32::<LittleEndian>()
            .map_err(|_| truncated(HEADER_SIZE, data.len()))?;

        Ok(LogHeader { body, total })
    }

    /// Number of offset table entries
    pub fn record_count(&self) -> Result<usize, FormatError> {
        self.total
            .checked_sub(self.body)
            .map(|count| count as usize)
            .ok_or(FormatError::InvalidHeader {
                body: self.body,
                total: self.total,
            })
    }

    /// Byte length of header plus offset table, `None` on overflow
    fn table_end(count: usize) -> Option<usize> {
        count.checked_mul(OFFSET_SIZE)?.checked_add(HEADER_SIZE)
    }
}

fn truncated(needed: usize, actual: usize) -> FormatError {
    FormatError::Truncated { needed, actual }
}

/// A decoded chat log
///
/// Owns the file buffer. The offset table and the pool are views into it, so
/// every [`Message`](crate::Message) produced from a container borrows the
/// container and cannot outlive it.
#[derive(Debug, Clone)]
pub struct Container {
    data: Vec<u8>,
    header: LogHeader,
    count: usize,
}

impl Container {
    /// Quick check whether a buffer looks like a chat log
    ///
    /// Only the header and the size of the offset table are checked; the
    /// offsets themselves are validated by [`Container::load`].
    pub fn is_chatlog(data: &[u8]) -> bool {
        let Ok(header) = LogHeader::parse(data) else {
            return false;
        };
        header
            .record_count()
            .ok()
            .and_then(LogHeader::table_end)
            .is_some_and(|end| end <= data.len())
    }

    /// Validate a buffer and take ownership of it
    pub fn load(data: Vec<u8>) -> Result<Self, FormatError> {
        let header = LogHeader::parse(&data)?;
        let count = header.record_count()?;

        let table_end = LogHeader::table_end(count).ok_or(FormatError::Truncated {
            needed: usize::MAX,
            actual: data.len(),
        })?;
        if table_end > data.len() {
            return Err(truncated(table_end, data.len()));
        }

        let container = Container {
            data,
            header,
            count,
        };
        container.validate_offsets()?;

        tracing::debug!(
            records = container.count,
            pool_len = container.pool().len(),
            "Loaded chat log"
        );

        Ok(container)
    }

    fn validate_offsets(&self) -> Result<(), FormatError> {
        let pool_len = self.pool().len();
        let mut previous = 0u32;

        for (index, offset) in self.offsets().enumerate() {
            if offset < previous || offset as usize > pool_len {
                return Err(FormatError::InvalidOffsets {
                    index,
                    offset,
                    previous,
                    pool_len,
                });
            }
            previous = offset;
        }

        Ok(())
    }

    pub fn header(&self) -> LogHeader {
        self.header
    }

    /// Number of records in the offset table
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    fn table_range(&self) -> Range<usize> {
        HEADER_SIZE..HEADER_SIZE + self.count * OFFSET_SIZE
    }

    /// Raw offset table bytes
    fn offset_table(&self) -> &[u8] {
        &self.data[self.table_range()]
    }

    /// End offset of record `index` within the pool
    pub fn offset(&self, index: usize) -> Option<u32> {
        if index >= self.count {
            return None;
        }
        let at = index * OFFSET_SIZE;
        Some(LittleEndian::read_u32(&self.offset_table()[at..at + OFFSET_SIZE]))
    }

    /// All end offsets in table order
    pub fn offsets(&self) -> impl Iterator<Item = u32> + '_ {
        self.offset_table()
            .chunks_exact(OFFSET_SIZE)
            .map(LittleEndian::read_u32)
    }

    /// The string pool
    pub fn pool(&self) -> &[u8] {
        &self.data[self.table_range().end..]
    }

    /// Raw bytes of record `index` (metadata, name and text with separators)
    pub fn record_bytes(&self, index: usize) -> Option<&[u8]> {
        let end = self.offset(index)? as usize;
        let start = match index {
            0 => 0,
            _ => self.offset(index - 1)? as usize,
        };
        self.pool().get(start..end)
    }

    /// Iterate over the records admitted by `filter`
    pub fn records(&self, filter: ChannelFilter) -> Records<'_> {
        Records::new(self, filter)
    }

    /// Iterate over every record
    pub fn messages(&self) -> Records<'_> {
        self.records(ChannelFilter::new())
    }

    /// Release the container, returning the original buffer
    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}
