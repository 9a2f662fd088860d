use thiserror::Error;

use crate::save::SaveFormat;

/// Misuse by the caller, rejected before any data is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    #[error("slot index {0} is out of range (0-14)")]
    SlotIndex(usize),

    #[error("unknown {kind} format: {name} (supported: {supported})")]
    UnknownFormat {
        kind: &'static str,
        name: String,
        supported: String,
    },

    #[error("mcx containers need an encryption key and IV")]
    MissingKeys,
}

/// Why a directory frame or chain was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DirectoryFault {
    #[error("unknown block state 0x{0:02X}")]
    BadState(u8),

    #[error("link 0x{0:04X} points outside the card")]
    BadLink(u16),

    #[error("link to slot {0}, which is not a continuation block")]
    BrokenLink(usize),

    #[error("slot {0} is claimed by more than one save")]
    SharedBlock(usize),

    #[error("link to slot {0}, whose deleted flag differs from the save")]
    MixedDeletion(usize),

    #[error("chain ends without an end block")]
    Unterminated,

    #[error("end block still links onward")]
    LinkPastEnd,

    #[error("continuation block does not belong to any save")]
    Orphaned,
}

/// Failure to turn container bytes into a [`crate::CardImage`].
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("unrecognized card header")]
    BadMagic,

    #[error("unexpected card size: expected {expected} bytes, found {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("directory frame {frame} checksum mismatch")]
    ChecksumMismatch { frame: usize },

    #[error("container digest mismatch")]
    DigestMismatch,

    #[error("corrupt directory entry for slot {slot}: {fault}")]
    CorruptDirectory { slot: usize, fault: DirectoryFault },

    #[error(transparent)]
    Contract(#[from] ContractError),
}

/// A single save file that cannot be read in the requested format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("save file is empty")]
    Empty,

    #[error("save file is truncated: expected at least {expected} bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unrecognized save file format")]
    UnknownFormat,

    #[error("not a valid {0} save file")]
    BadMagic(SaveFormat),

    #[error("{0} header checksum mismatch")]
    ChecksumMismatch(SaveFormat),
}

/// Failures of the slot operations on an open card.
#[derive(Debug, Error)]
pub enum SlotError {
    #[error("could not find save {0}")]
    NotFound(String),

    #[error("not enough space (slots required: {required})")]
    InsufficientSpace { required: usize },

    #[error("slot {0} is not free")]
    InUse(usize),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Contract(#[from] ContractError),
}
