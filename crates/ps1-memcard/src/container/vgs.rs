//! Connectix Virtual Game Station images (`.mem`, `.vgs`): 64-byte header.

use super::split_header;
use crate::error::OpenError;
use crate::CARD_SIZE;

const MAGIC: &[u8; 4] = b"VgsM";
const HEADER_SIZE: usize = 64;

pub(super) const ENCODED_LEN: usize = HEADER_SIZE + CARD_SIZE;

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}

pub(super) fn unwrap(bytes: &[u8]) -> Result<&[u8], OpenError> {
    if !matches(bytes) {
        return Err(OpenError::BadMagic);
    }
    split_header(bytes, HEADER_SIZE)
}

pub(super) fn wrap(image: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[..MAGIC.len()].copy_from_slice(MAGIC);
    bytes[4] = 0x01;
    bytes[8] = 0x01;
    bytes[12] = 0x01;
    bytes[17] = 0x02;
    bytes.extend_from_slice(image);
    bytes
}
