//! Plain images (`.mcr`, `.mcd`, `.bin`, `.ddf`): the card byte for byte.

use crate::error::OpenError;
use crate::CARD_SIZE;

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.len() == CARD_SIZE && bytes.starts_with(b"MC")
}

pub(super) fn unwrap(bytes: &[u8]) -> Result<&[u8], OpenError> {
    if bytes.len() != CARD_SIZE {
        return Err(OpenError::BadLength {
            expected: CARD_SIZE,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}
