//! Channel tags
//!
//! Every log line carries a one-byte channel tag in its metadata. The client
//! uses a known set of values (say, party, linkshells, system messages, ...)
//! but new ones appear between client patches, so any byte outside the named
//! set decodes to [`ChannelTag::Unknown`] instead of being rejected.
//!
//! The enum, the byte mapping, the CLI names and the filter slot table are
//! all generated from the single `channel_tags!` list below.

use std::fmt;

macro_rules! channel_tags {
    ($( $(#[$attr:meta])* $variant:ident = $byte:literal => $name:literal, )*) => {
        /// Channel a log line was posted to
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ChannelTag {
            $( $(#[$attr])* $variant, )*
            /// Byte outside the named set, carried as-is
            Unknown(u8),
        }

        impl ChannelTag {
            /// All named tags in slot order
            pub const NAMED: &'static [ChannelTag] = &[ $( ChannelTag::$variant, )* ];

            /// Raw tag byte as stored in the metadata block
            pub const fn byte(self) -> u8 {
                match self {
                    $( ChannelTag::$variant => $byte, )*
                    ChannelTag::Unknown(b) => b,
                }
            }

            /// Stable lowercase name, `None` for unknown tags
            pub const fn name(self) -> Option<&'static str> {
                match self {
                    $( ChannelTag::$variant => Some($name), )*
                    ChannelTag::Unknown(_) => None,
                }
            }
        }

        impl From<u8> for ChannelTag {
            fn from(value: u8) -> Self {
                match value {
                    $( $byte => ChannelTag::$variant, )*
                    other => ChannelTag::Unknown(other),
                }
            }
        }
    };
}

channel_tags! {
    Say = 0x0a => "say",
    Shout = 0x0b => "shout",
    /// Tell sent by the local player
    TellSent = 0x0c => "tell-sent",
    /// Tell received from another player
    TellReceived = 0x0d => "tell-received",
    Party = 0x0e => "party",
    Alliance = 0x0f => "alliance",
    Linkshell1 = 0x10 => "ls1",
    Linkshell2 = 0x11 => "ls2",
    Linkshell3 = 0x12 => "ls3",
    Linkshell4 = 0x13 => "ls4",
    Linkshell5 = 0x14 => "ls5",
    Linkshell6 = 0x15 => "ls6",
    Linkshell7 = 0x16 => "ls7",
    Linkshell8 = 0x17 => "ls8",
    FreeCompany = 0x18 => "fc",
    NoviceNetwork = 0x1b => "novice",
    CustomEmote = 0x1c => "custom-emote",
    StandardEmote = 0x1d => "emote",
    Yell = 0x1e => "yell",
    CrossParty = 0x20 => "cross-party",
    PvpTeam = 0x24 => "pvp-team",
    CrossLinkshell1 = 0x25 => "cwls1",
    Echo = 0x38 => "echo",
    System = 0x39 => "system",
    BattleSystem = 0x3a => "battle-system",
    ErrorMessage = 0x3c => "error",
    NpcDialogue = 0x3d => "npc",
    LootNotice = 0x3e => "loot",
    Progress = 0x40 => "progress",
    LootRoll = 0x41 => "loot-roll",
    Crafting = 0x42 => "crafting",
    Gathering = 0x43 => "gathering",
    NpcAnnouncement = 0x44 => "npc-announce",
    CrossLinkshell2 = 0x65 => "cwls2",
    CrossLinkshell3 = 0x66 => "cwls3",
    CrossLinkshell4 = 0x67 => "cwls4",
    CrossLinkshell5 = 0x68 => "cwls5",
    CrossLinkshell6 = 0x69 => "cwls6",
    CrossLinkshell7 = 0x6a => "cwls7",
    CrossLinkshell8 = 0x6b => "cwls8",
}

/// Number of named tags, i.e. the number of filter slots
pub const NAMED_CHANNEL_COUNT: usize = ChannelTag::NAMED.len();

const NO_SLOT: u8 = u8::MAX;

/// Slot index of each byte value, `NO_SLOT` for bytes outside the named set
static SLOT_BY_BYTE: [u8; 256] = {
    let mut table = [NO_SLOT; 256];
    let mut i = 0;
    while i < NAMED_CHANNEL_COUNT {
        table[ChannelTag::NAMED[i].byte() as usize] = i as u8;
        i += 1;
    }
    table
};

impl ChannelTag {
    /// Whether this is one of the named tags
    pub fn is_named(self) -> bool {
        self.slot().is_some()
    }

    /// Position of the tag in [`ChannelTag::NAMED`]
    ///
    /// `Unknown` always returns `None`, even when constructed by hand with a
    /// byte that belongs to a named tag.
    pub fn slot(self) -> Option<usize> {
        match self {
            ChannelTag::Unknown(_) => None,
            named => match SLOT_BY_BYTE[named.byte() as usize] {
                NO_SLOT => None,
                slot => Some(slot as usize),
            },
        }
    }

    /// Look up a named tag by its name (case-insensitive)
    pub fn from_name(name: &str) -> Option<ChannelTag> {
        Self::NAMED
            .iter()
            .copied()
            .find(|tag| tag.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
    }
}

impl fmt::Display for ChannelTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "unknown(0x{:02x})", self.byte()),
        }
    }
}
