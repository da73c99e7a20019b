//! Channel inclusion filter

use crate::channel::{ChannelTag, NAMED_CHANNEL_COUNT};
use crate::error::{Error, Result};
use crate::record::Metadata;

/// Per-channel inclusion flags
///
/// One flag per named [`ChannelTag`], indexed by [`ChannelTag::slot`]. A filter
/// with no flag set is disabled and admits every record, including records
/// without metadata and records with unknown tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFilter {
    flags: [bool; NAMED_CHANNEL_COUNT],
}

impl Default for ChannelFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelFilter {
    /// A disabled filter (admits everything)
    pub const fn new() -> Self {
        ChannelFilter {
            flags: [false; NAMED_CHANNEL_COUNT],
        }
    }

    /// Build a filter from channel names as given on the command line
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::new();
        for name in names {
            let name = name.as_ref();
            let tag = ChannelTag::from_name(name)
                .ok_or_else(|| Error::UnknownChannel(name.to_string()))?;
            filter.allow(tag);
        }
        Ok(filter)
    }

    /// Enable a channel. Unknown tags have no slot and are ignored.
    pub fn allow(&mut self, tag: ChannelTag) -> &mut Self {
        self.set(tag, true)
    }

    pub fn set(&mut self, tag: ChannelTag, enabled: bool) -> &mut Self {
        if let Some(slot) = tag.slot() {
            self.flags[slot] = enabled;
        }
        self
    }

    pub fn is_enabled(&self, tag: ChannelTag) -> bool {
        tag.slot().is_some_and(|slot| self.flags[slot])
    }

    /// True when no flag is set
    pub fn is_disabled(&self) -> bool {
        !self.flags.iter().any(|&f| f)
    }

    /// Whether a record tagged `tag` passes
    pub fn admits(&self, tag: ChannelTag) -> bool {
        self.is_disabled() || self.is_enabled(tag)
    }

    /// Whether a record with the given (possibly absent) metadata passes
    ///
    /// Records without metadata have no channel, so only a disabled filter
    /// lets them through.
    pub fn admits_meta(&self, meta: Option<&Metadata>) -> bool {
        match meta {
            Some(meta) => self.admits(meta.channel),
            None => self.is_disabled(),
        }
    }

    /// Enabled channels in slot order
    pub fn enabled(&self) -> impl Iterator<Item = ChannelTag> + '_ {
        ChannelTag::NAMED
            .iter()
            .zip(self.flags.iter())
            .filter(|(_, on)| **on)
            .map(|(&tag, _)| tag)
    }
}

impl FromIterator<ChannelTag> for ChannelFilter {
    fn from_iter<T: IntoIterator<Item = ChannelTag>>(iter: T) -> Self {
        let mut filter = Self::new();
        for tag in iter {
            filter.allow(tag);
        }
        filter
    }
}
