//! Single-save file formats.
//!
//! Every format carries the save's payload (whole 8 KiB blocks) plus, except
//! for `raw`, the 20-byte product name that becomes the slot's display name.
//! Encoded files are zero-padded to a whole number of blocks; decoding accepts
//! files with or without that padding.

mod action_replay;
mod mcs;
mod psv;
mod raw;

use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::card::BLOCK_SIZE;
use crate::error::{ContractError, DecodeError};
use crate::frame::SaveName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveFormat {
    ActionReplay,
    Mcs,
    Raw,
    Ps3,
}

const SAVE_FORMATS: [(&str, SaveFormat); 4] = [
    ("actionreplay", SaveFormat::ActionReplay),
    ("mcs", SaveFormat::Mcs),
    ("raw", SaveFormat::Raw),
    ("ps3", SaveFormat::Ps3),
];

impl SaveFormat {
    pub const ALL: [SaveFormat; 4] = [
        SaveFormat::ActionReplay,
        SaveFormat::Mcs,
        SaveFormat::Raw,
        SaveFormat::Ps3,
    ];

    pub fn name(self) -> &'static str {
        SAVE_FORMATS
            .iter()
            .find(|(_, format)| *format == self)
            .map_or("raw", |(name, _)| name)
    }

    /// Conventional file extension; raw saves are named after the save itself.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            SaveFormat::ActionReplay => Some("psx"),
            SaveFormat::Mcs => Some("mcs"),
            SaveFormat::Raw => None,
            SaveFormat::Ps3 => Some("psv"),
        }
    }

    /// Recognizes a save file by its leading bytes.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if psv::matches(bytes) {
            Some(SaveFormat::Ps3)
        } else if mcs::matches(bytes) {
            Some(SaveFormat::Mcs)
        } else if raw::matches(bytes) {
            Some(SaveFormat::Raw)
        } else if action_replay::matches(bytes) {
            Some(SaveFormat::ActionReplay)
        } else {
            None
        }
    }

    pub fn names() -> String {
        SAVE_FORMATS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for SaveFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SaveFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SAVE_FORMATS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, format)| *format)
            .ok_or_else(|| ContractError::UnknownFormat {
                kind: "save",
                name: s.to_string(),
                supported: Self::names(),
            })
    }
}

/// A save detached from any card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveFile {
    pub name: SaveName,
    pub payload: Vec<u8>,
}

impl SaveFile {
    /// Blocks the payload occupies on a card, never less than one.
    pub fn required_blocks(&self) -> usize {
        self.payload.len().div_ceil(BLOCK_SIZE).max(1)
    }

    pub fn display_name(&self) -> String {
        self.name.to_string()
    }

    // Payload zero-padded to whole blocks.
    fn block_payload(&self) -> Vec<u8> {
        let mut payload = self.payload.clone();
        payload.resize(self.required_blocks() * BLOCK_SIZE, 0);
        payload
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSave {
    pub save: SaveFile,
    /// Card blocks the payload needs; may exceed what a card can hold.
    pub required_blocks: usize,
}

impl DecodedSave {
    fn new(save: SaveFile) -> Self {
        let required_blocks = save.required_blocks();
        Self {
            save,
            required_blocks,
        }
    }
}

/// Decodes `bytes` as `format`. `name_hint` names headerless raw saves.
pub fn decode(
    format: SaveFormat,
    bytes: &[u8],
    name_hint: Option<&str>,
) -> Result<DecodedSave, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let save = match format {
        SaveFormat::Raw => raw::decode(bytes, name_hint),
        SaveFormat::Mcs => mcs::decode(bytes)?,
        SaveFormat::ActionReplay => action_replay::decode(bytes)?,
        SaveFormat::Ps3 => psv::decode(bytes)?,
    };
    if save.payload.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(DecodedSave::new(save))
}

/// Detects the format first, then decodes.
pub fn decode_detect(
    bytes: &[u8],
    name_hint: Option<&str>,
) -> Result<(SaveFormat, DecodedSave), DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let format = SaveFormat::detect(bytes).ok_or(DecodeError::UnknownFormat)?;
    debug!("detected {format} save file");
    Ok((format, decode(format, bytes, name_hint)?))
}

/// Encodes `save`; the result is always a multiple of [`BLOCK_SIZE`] bytes.
pub fn encode(format: SaveFormat, save: &SaveFile) -> Vec<u8> {
    let mut bytes = match format {
        SaveFormat::Raw => raw::encode(save),
        SaveFormat::Mcs => mcs::encode(save),
        SaveFormat::ActionReplay => action_replay::encode(save),
        SaveFormat::Ps3 => psv::encode(save),
    };
    bytes.resize(bytes.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE, 0);
    bytes
}

// Drops a zero tail past the last whole block, the padding `encode` adds.
fn trim_padding(payload: &[u8]) -> &[u8] {
    let whole = payload.len() / BLOCK_SIZE * BLOCK_SIZE;
    if whole > 0 && payload[whole..].iter().all(|&b| b == 0) {
        &payload[..whole]
    } else {
        payload
    }
}

fn ensure_len(bytes: &[u8], expected: usize) -> Result<(), DecodeError> {
    if bytes.len() < expected {
        Err(DecodeError::Truncated {
            expected,
            actual: bytes.len(),
        })
    } else {
        Ok(())
    }
}
