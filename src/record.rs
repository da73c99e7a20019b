//! Record decoding and iteration
//!
//! Each record in the pool is three fields separated by the ASCII unit
//! separator (`0x1F`): a metadata blob, the speaker name and the message text.
//! The metadata blob is either empty-ish (system lines, shorter than 8 bytes)
//! or an 8-byte block:
//!
//! | offset | size | field   |
//! |--------|------|---------|
//! | 0      | 4    | time (u32 LE, Unix seconds) |
//! | 4      | 1    | channel tag |
//! | 5      | 1    | unknown |
//! | 6      | 2    | padding |

use byteorder::{ByteOrder, LittleEndian};
use std::iter::FusedIterator;

use crate::channel::ChannelTag;
use crate::container::Container;
use crate::error::FormatError;
use crate::filter::ChannelFilter;

/// Field separator inside a record
pub const UNIT_SEPARATOR: u8 = 0x1F;

/// Size of the metadata block
pub const METADATA_SIZE: usize = 8;

/// Decoded metadata block of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    /// Unix timestamp in seconds
    pub time: u32,
    pub channel: ChannelTag,
    /// Reserved byte, kept verbatim
    pub unknown: u8,
}

impl Metadata {
    /// Decode a metadata blob; `None` when it is shorter than 8 bytes
    pub fn decode(blob: &[u8]) -> Option<Self> {
        if blob.len() < METADATA_SIZE {
            return None;
        }
        Some(Metadata {
            time: LittleEndian::read_u32(&blob[0..4]),
            channel: ChannelTag::from(blob[4]),
            unknown: blob[5],
        })
    }
}

/// One log line, borrowing its name and text from the container's pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message<'a> {
    pub meta: Option<Metadata>,
    pub name: &'a [u8],
    pub text: &'a [u8],
}

impl<'a> Message<'a> {
    /// Split a raw record into its three fields and decode the metadata
    ///
    /// `index` is only used for error reporting.
    pub fn parse(index: usize, raw: &'a [u8]) -> Result<Self, FormatError> {
        let mut fields = raw.split(|&b| b == UNIT_SEPARATOR);
        match (fields.next(), fields.next(), fields.next(), fields.next()) {
            (Some(meta), Some(name), Some(text), None) => Ok(Message {
                meta: Metadata::decode(meta),
                name,
                text,
            }),
            _ => Err(FormatError::MalformedRecord {
                index,
                fields: raw.iter().filter(|&&b| b == UNIT_SEPARATOR).count() + 1,
            }),
        }
    }

    pub fn time(&self) -> Option<u32> {
        self.meta.map(|m| m.time)
    }

    pub fn channel(&self) -> Option<ChannelTag> {
        self.meta.map(|m| m.channel)
    }
}

/// Forward-only cursor over the records of a [`Container`]
///
/// Yields the records admitted by its filter, in table order. A malformed
/// record is yielded as an error once and ends the iteration. To scan again,
/// create a new cursor with [`Container::records`].
#[derive(Debug, Clone)]
pub struct Records<'a> {
    container: &'a Container,
    filter: ChannelFilter,
    index: usize,
    region_start: usize,
    done: bool,
}

impl<'a> Records<'a> {
    pub(crate) fn new(container: &'a Container, filter: ChannelFilter) -> Self {
        Records {
            container,
            filter,
            index: 0,
            region_start: 0,
            done: false,
        }
    }

    /// Index of the next offset table entry to be read
    pub fn position(&self) -> usize {
        self.index
    }

    pub fn filter(&self) -> &ChannelFilter {
        &self.filter
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Message<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let pool = self.container.pool();
        while let Some(end) = self.container.offset(self.index) {
            let index = self.index;
            let end = end as usize;
            let raw = &pool[self.region_start..end];
            self.region_start = end;
            self.index += 1;

            match Message::parse(index, raw) {
                Ok(message) if self.filter.admits_meta(message.meta.as_ref()) => {
                    return Some(Ok(message));
                }
                Ok(_) => continue,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        self.done = true;
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.container.len() - self.index))
        }
    }
}

impl FusedIterator for Records<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta_bytes(time: u32, channel: u8, unknown: u8) -> Vec<u8> {
        let mut blob = time.to_le_bytes().to_vec();
        blob.extend_from_slice(&[channel, unknown, 0, 0]);
        blob
    }

    /// Build a container from raw record triples
    fn container(records: &[Vec<u8>]) -> Container {
        let mut pool = Vec::new();
        let mut offsets = Vec::new();
        for record in records {
            pool.extend_from_slice(record);
            offsets.push(pool.len() as u32);
        }

        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&(offsets.len() as u32).to_le_bytes());
        for offset in &offsets {
            data.extend_from_slice(&offset.to_le_bytes());
        }
        data.extend_from_slice(&pool);
        Container::load(data).unwrap()
    }

    fn triple(meta: &[u8], name: &[u8], text: &[u8]) -> Vec<u8> {
        let mut record = meta.to_vec();
        record.push(UNIT_SEPARATOR);
        record.extend_from_slice(name);
        record.push(UNIT_SEPARATOR);
        record.extend_from_slice(text);
        record
    }

    fn sample() -> Container {
        container(&[
            triple(&meta_bytes(100, 0x0a, 0), b"bob", b"hello"),
            triple(b"", b"", b"You joined the party."),
            triple(&meta_bytes(101, 0x0e, 7), b"carol", b"pull now"),
            triple(&meta_bytes(102, 0xee, 0), b"dave", b"???"),
            triple(&meta_bytes(103, 0x0a, 0), b"erin", b"hi bob"),
        ])
    }

    #[test]
    fn test_end_to_end_pair() {
        let mut data = Vec::new();
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&2u32.to_le_bytes());
        data.extend_from_slice(&15u32.to_le_bytes());
        data.extend_from_slice(&24u32.to_le_bytes());
        data.extend_from_slice(&[1, 0, 0, 0, 0x0a, 0, 0, 0]);
        data.extend_from_slice(b"\x1Fbob\x1Fhi");
        data.extend_from_slice(b"\x1Falice\x1Fyo");
        let container = Container::load(data).unwrap();

        let all: Vec<_> = container.messages().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            all,
            vec![
                Message {
                    meta: Some(Metadata {
                        time: 1,
                        channel: ChannelTag::Say,
                        unknown: 0,
                    }),
                    name: b"bob",
                    text: b"hi",
                },
                Message {
                    meta: None,
                    name: b"alice",
                    text: b"yo",
                },
            ]
        );

        let say: ChannelFilter = [ChannelTag::Say].into_iter().collect();
        let filtered: Vec<_> = container.records(say).collect::<Result<_, _>>().unwrap();
        assert_eq!(filtered, all[..1].to_vec());
    }

    #[test]
    fn test_unfiltered_yields_every_record() {
        let container = sample();
        let messages: Vec<_> = container.messages().collect::<Result<_, _>>().unwrap();
        assert_eq!(messages.len(), container.len());
        assert_eq!(messages[1].meta, None);
        assert_eq!(messages[1].text, b"You joined the party.");
        assert_eq!(messages[2].meta.unwrap().unknown, 7);
        assert_eq!(messages[3].channel(), Some(ChannelTag::Unknown(0xee)));
    }

    #[test]
    fn test_single_channel_filter() {
        let container = sample();
        let filter: ChannelFilter = [ChannelTag::Say].into_iter().collect();
        let names: Vec<_> = container
            .records(filter)
            .map(|m| m.unwrap().name)
            .collect();
        assert_eq!(names, vec![&b"bob"[..], &b"erin"[..]]);
    }

    #[test]
    fn test_filter_excludes_unknown_and_system_lines() {
        let container = sample();
        let filter: ChannelFilter = [ChannelTag::Party, ChannelTag::Shout].into_iter().collect();
        let times: Vec<_> = container
            .records(filter)
            .map(|m| m.unwrap().time())
            .collect();
        assert_eq!(times, vec![Some(101)]);
    }

    #[test]
    fn test_short_meta_has_no_metadata() {
        let container = container(&[triple(&[1, 2, 3, 4, 5, 6, 7], b"n", b"t")]);
        let message = container.messages().next().unwrap().unwrap();
        assert_eq!(message.meta, None);
    }

    #[test]
    fn test_long_meta_uses_first_eight_bytes() {
        let mut blob = meta_bytes(5, 0x39, 1);
        blob.extend_from_slice(b"extra");
        let container = container(&[triple(&blob, b"", b"text")]);
        let message = container.messages().next().unwrap().unwrap();
        assert_eq!(message.time(), Some(5));
        assert_eq!(message.channel(), Some(ChannelTag::System));
    }

    #[test]
    fn test_two_fields_is_malformed() {
        let container = container(&[
            triple(b"", b"ok", b"first"),
            b"meta\x1Fonly-two".to_vec(),
            triple(b"", b"never", b"reached"),
        ]);
        let mut records = container.messages();
        assert!(records.next().unwrap().is_ok());
        assert_eq!(
            records.next().unwrap().unwrap_err(),
            FormatError::MalformedRecord { index: 1, fields: 2 }
        );
        assert!(records.next().is_none());
        assert!(records.next().is_none());
    }

    #[test]
    fn test_four_fields_is_malformed() {
        let container = container(&[b"a\x1Fb\x1Fc\x1Fd".to_vec()]);
        let err = container.messages().next().unwrap().unwrap_err();
        assert_eq!(err, FormatError::MalformedRecord { index: 0, fields: 4 });
    }

    #[test]
    fn test_malformed_record_aborts_even_when_filtered_out() {
        let container = container(&[b"x".to_vec()]);
        let filter: ChannelFilter = [ChannelTag::Say].into_iter().collect();
        let results: Vec<_> = container.records(filter).collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_fresh_cursor_rescans() {
        let container = sample();
        let mut first = container.messages();
        first.by_ref().take(2).for_each(drop);
        assert_eq!(first.position(), 2);
        assert_eq!(first.count(), 3);
        assert_eq!(container.messages().count(), 5);
    }

    #[test]
    fn test_size_hint_bounds_remaining() {
        let container = sample();
        let mut records = container.messages();
        assert_eq!(records.size_hint(), (0, Some(5)));
        records.next();
        assert_eq!(records.size_hint(), (0, Some(4)));
    }

    #[test]
    fn test_name_and_text_borrow_from_pool() {
        let container = sample();
        let message = container.messages().next().unwrap().unwrap();
        let pool = container.pool().as_ptr_range();
        assert!(pool.contains(&message.name.as_ptr()));
        assert!(pool.contains(&message.text.as_ptr()));
    }
}
