//! PS3 virtual memory card saves (`.psv`).
//!
//! The salt seed and signature fields are written as zeros: the console checks
//! them, but tools that read the format do not. Files written here are
//! therefore not console-loadable on a PS3.

use byteorder::{ByteOrder, LittleEndian};

use super::{ensure_len, SaveFile, SaveFormat};
use crate::error::DecodeError;
use crate::frame::SaveName;

const MAGIC: &[u8; 8] = b"\0VSP\0\0\0\0";
const HEADER_SIZE: usize = 0x84;

const TYPE_OFFSET: usize = 0x38;
const SIZE_OFFSET: usize = 0x40;
const DATA_OFFSET: usize = 0x44;
const BLOCK_SIZE_OFFSET: usize = 0x48;
const NAME_OFFSET: usize = 0x64;

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC[..4])
}

pub(super) fn decode(bytes: &[u8]) -> Result<SaveFile, DecodeError> {
    ensure_len(bytes, HEADER_SIZE)?;
    if !matches(bytes) {
        return Err(DecodeError::BadMagic(SaveFormat::Ps3));
    }

    let size = LittleEndian::read_u32(&bytes[SIZE_OFFSET..]) as usize;
    let start = LittleEndian::read_u32(&bytes[DATA_OFFSET..]) as usize;
    if start < HEADER_SIZE {
        return Err(DecodeError::BadMagic(SaveFormat::Ps3));
    }
    let end = start.saturating_add(size);
    ensure_len(bytes, end)?;

    Ok(SaveFile {
        name: SaveName::from_slice(&bytes[NAME_OFFSET..NAME_OFFSET + SaveName::LEN]),
        payload: bytes[start..end].to_vec(),
    })
}

pub(super) fn encode(save: &SaveFile) -> Vec<u8> {
    let payload = save.block_payload();
    let mut header = [0u8; HEADER_SIZE];
    header[..MAGIC.len()].copy_from_slice(MAGIC);
    LittleEndian::write_u32(&mut header[TYPE_OFFSET..], 0x14);
    LittleEndian::write_u32(&mut header[TYPE_OFFSET + 4..], 1);
    LittleEndian::write_u32(&mut header[SIZE_OFFSET..], payload.len() as u32);
    LittleEndian::write_u32(&mut header[DATA_OFFSET..], HEADER_SIZE as u32);
    LittleEndian::write_u32(&mut header[BLOCK_SIZE_OFFSET..], 0x200);
    header[NAME_OFFSET..NAME_OFFSET + SaveName::LEN].copy_from_slice(&save.name.to_bytes());

    let mut bytes = header.to_vec();
    bytes.extend_from_slice(&payload);
    bytes
}
