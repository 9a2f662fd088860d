//! PSP virtual memory card images (`.vmp`).
//!
//! The 128-byte header has room for a salt seed and a SHA-1 signature. Both
//! are written as zeros and ignored on read, so images written here open in
//! emulators and editors but are not console-loadable: a PSP rejects the
//! unsigned header.

use byteorder::{ByteOrder, LittleEndian};

use super::split_header;
use crate::error::OpenError;
use crate::CARD_SIZE;

const MAGIC: &[u8; 4] = b"\0PMV";
const HEADER_SIZE: usize = 0x80;

pub(super) const ENCODED_LEN: usize = HEADER_SIZE + CARD_SIZE;

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}

pub(super) fn unwrap(bytes: &[u8]) -> Result<&[u8], OpenError> {
    if !matches(bytes) || bytes.len() < 8 {
        return Err(OpenError::BadMagic);
    }
    let header_len = LittleEndian::read_u32(&bytes[4..8]) as usize;
    if header_len != HEADER_SIZE {
        return Err(OpenError::BadMagic);
    }
    split_header(bytes, HEADER_SIZE)
}

pub(super) fn wrap(image: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[..MAGIC.len()].copy_from_slice(MAGIC);
    LittleEndian::write_u32(&mut bytes[4..8], HEADER_SIZE as u32);
    bytes.extend_from_slice(image);
    bytes
}
