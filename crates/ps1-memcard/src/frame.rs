//! Directory frames: the 128-byte descriptors in block 0 of a card.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use crate::checksum::{seal_frame, verify_frame, CHECKSUM_OFFSET};
use crate::error::DirectoryFault;

pub const FRAME_SIZE: usize = 128;

/// Bit of the state code that marks a save as deleted.
pub const DELETED_MASK: u8 = 0x4;

/// Link value meaning "no further block".
pub const NO_LINK: u16 = 0xFFFF;

const SIZE_OFFSET: usize = 0x04;
const LINK_OFFSET: usize = 0x08;
const NAME_OFFSET: usize = 0x0A;

const STATE_FREE: u8 = 0xA0;
const STATE_IN_USE: u8 = 0x50;
const STATE_DELETED: u8 = 0xA0;

/// Where a block sits in its save's chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChainPosition {
    #[default]
    Free = 0,
    Initial = 1,
    Middle = 2,
    End = 3,
}

/// Allocation state of one directory frame.
///
/// On disk this is a single byte where the high nibble mixes occupancy with
/// deletion; here the chain position and the deleted flag are kept apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotState {
    pub position: ChainPosition,
    pub deleted: bool,
}

impl SlotState {
    pub const FREE: SlotState = SlotState {
        position: ChainPosition::Free,
        deleted: false,
    };

    pub const fn in_use(position: ChainPosition) -> Self {
        Self {
            position,
            deleted: false,
        }
    }

    pub fn is_free(self) -> bool {
        self.position == ChainPosition::Free
    }

    /// Compact code: chain position in the low bits, [`DELETED_MASK`] on top.
    pub fn code(self) -> u8 {
        let deleted = if self.deleted { DELETED_MASK } else { 0 };
        self.position as u8 | deleted
    }

    pub fn from_byte(byte: u8) -> Result<Self, DirectoryFault> {
        let position = match byte & 0x0F {
            0 if byte == STATE_FREE => return Ok(Self::FREE),
            1 => ChainPosition::Initial,
            2 => ChainPosition::Middle,
            3 => ChainPosition::End,
            _ => return Err(DirectoryFault::BadState(byte)),
        };
        match byte & 0xF0 {
            STATE_IN_USE => Ok(Self {
                position,
                deleted: false,
            }),
            STATE_DELETED => Ok(Self {
                position,
                deleted: true,
            }),
            _ => Err(DirectoryFault::BadState(byte)),
        }
    }

    /// The legacy on-disk byte. A free frame has no deleted form on disk.
    pub fn to_byte(self) -> u8 {
        match self.position {
            ChainPosition::Free => STATE_FREE,
            position if self.deleted => STATE_DELETED | position as u8,
            position => STATE_IN_USE | position as u8,
        }
    }
}

/// True when a state code hides its slot from listings.
pub fn is_deleted(code: u8) -> bool {
    code == 0 || code & DELETED_MASK != 0
}

/// The 20-byte product name stored in a head frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct SaveName {
    pub region: [u8; 2],
    pub product_code: [u8; 10],
    pub identifier: [u8; 8],
}

impl SaveName {
    pub const LEN: usize = 20;

    pub fn from_bytes(bytes: &[u8; Self::LEN]) -> Self {
        let mut name = Self::default();
        name.region.copy_from_slice(&bytes[0..2]);
        name.product_code.copy_from_slice(&bytes[2..12]);
        name.identifier.copy_from_slice(&bytes[12..20]);
        name
    }

    /// Reads a name from the start of `bytes`; missing bytes count as NUL.
    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut raw = [0u8; Self::LEN];
        let len = bytes.len().min(Self::LEN);
        raw[..len].copy_from_slice(&bytes[..len]);
        Self::from_bytes(&raw)
    }

    pub fn to_bytes(&self) -> [u8; Self::LEN] {
        let mut raw = [0u8; Self::LEN];
        raw[0..2].copy_from_slice(&self.region);
        raw[2..12].copy_from_slice(&self.product_code);
        raw[12..20].copy_from_slice(&self.identifier);
        raw
    }

    /// Builds a name from text such as `BISLUS-00594GAME0001`.
    ///
    /// Characters outside Latin-1 become `_`; anything past 20 characters is
    /// dropped.
    pub fn parse(text: &str) -> Self {
        let bytes: Vec<u8> = text
            .chars()
            .take(Self::LEN)
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'_'))
            .collect();
        Self::from_slice(&bytes)
    }

    pub fn is_empty(&self) -> bool {
        self.to_bytes().iter().all(|&b| b == 0)
    }
}

impl fmt::Display for SaveName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for field in [&self.region[..], &self.product_code, &self.identifier] {
            let end = field.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
            for &byte in &field[..end] {
                write!(f, "{}", char::from(byte))?;
            }
        }
        Ok(())
    }
}

/// One slot descriptor, frames 1 to 15 of the directory block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryFrame {
    pub state: SlotState,
    /// Save size in bytes; only meaningful on the head frame.
    pub size: u32,
    /// Slot index of the next block in the chain.
    pub link: Option<usize>,
    pub name: SaveName,
    // Bytes of the original frame not covered by the fields above.
    raw: [u8; FRAME_SIZE],
}

impl Default for DirectoryFrame {
    fn default() -> Self {
        Self::free()
    }
}

impl DirectoryFrame {
    pub fn free() -> Self {
        Self {
            state: SlotState::FREE,
            size: 0,
            link: None,
            name: SaveName::default(),
            raw: [0; FRAME_SIZE],
        }
    }

    /// Frame describing a single-block head; used by the mcs save header.
    pub fn head(name: SaveName, size: u32) -> Self {
        Self {
            state: SlotState::in_use(ChainPosition::Initial),
            size,
            name,
            ..Self::free()
        }
    }

    /// Parses a frame without looking at its checksum.
    pub fn parse(raw: &[u8; FRAME_SIZE]) -> Result<Self, DirectoryFault> {
        let state = SlotState::from_byte(raw[0])?;
        let link = match LittleEndian::read_u16(&raw[LINK_OFFSET..]) {
            NO_LINK => None,
            value if usize::from(value) < crate::SLOT_COUNT => Some(usize::from(value)),
            value => return Err(DirectoryFault::BadLink(value)),
        };
        let mut name = [0u8; SaveName::LEN];
        name.copy_from_slice(&raw[NAME_OFFSET..NAME_OFFSET + SaveName::LEN]);

        let mut rest = *raw;
        rest[0] = 0;
        rest[SIZE_OFFSET..NAME_OFFSET + SaveName::LEN].fill(0);
        rest[CHECKSUM_OFFSET] = 0;

        Ok(Self {
            state,
            size: LittleEndian::read_u32(&raw[SIZE_OFFSET..]),
            link,
            name: SaveName::from_bytes(&name),
            raw: rest,
        })
    }

    pub fn is_sealed(raw: &[u8; FRAME_SIZE]) -> bool {
        verify_frame(raw)
    }

    /// Serialized frame with a freshly computed checksum.
    pub fn to_bytes(&self) -> [u8; FRAME_SIZE] {
        let mut raw = self.raw;
        raw[0] = self.state.to_byte();
        LittleEndian::write_u32(&mut raw[SIZE_OFFSET..], self.size);
        let link = self.link.map_or(NO_LINK, |index| index as u16);
        LittleEndian::write_u16(&mut raw[LINK_OFFSET..], link);
        raw[NAME_OFFSET..NAME_OFFSET + SaveName::LEN].copy_from_slice(&self.name.to_bytes());
        seal_frame(&mut raw);
        raw
    }
}
