//! Action Replay / GameShark saves: a 54-byte header holding the product name.

use super::{ensure_len, trim_padding, SaveFile, SaveFormat};
use crate::error::DecodeError;
use crate::frame::SaveName;

const HEADER_SIZE: usize = 0x36;
const TITLE_MAGIC: &[u8; 2] = b"SC";

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.len() > HEADER_SIZE + TITLE_MAGIC.len()
        && &bytes[HEADER_SIZE..HEADER_SIZE + TITLE_MAGIC.len()] == TITLE_MAGIC
}

pub(super) fn decode(bytes: &[u8]) -> Result<SaveFile, DecodeError> {
    ensure_len(bytes, HEADER_SIZE + 1)?;
    if !matches(bytes) {
        return Err(DecodeError::BadMagic(SaveFormat::ActionReplay));
    }
    Ok(SaveFile {
        name: SaveName::from_slice(&bytes[..SaveName::LEN]),
        payload: trim_padding(&bytes[HEADER_SIZE..]).to_vec(),
    })
}

pub(super) fn encode(save: &SaveFile) -> Vec<u8> {
    let payload = save.block_payload();
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[..SaveName::LEN].copy_from_slice(&save.name.to_bytes());
    bytes.extend_from_slice(&payload);
    bytes
}
