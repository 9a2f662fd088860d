//! DexDrive images (`.gme`).
//!
//! A 3904-byte header precedes the image. It repeats each slot's state byte and
//! link, and reserves a 256-byte comment per slot.

use super::split_header;
use crate::error::OpenError;
use crate::frame::FRAME_SIZE;
use crate::{CARD_SIZE, SLOT_COUNT};

const MAGIC: &[u8; 11] = b"123-456-STD";
const HEADER_SIZE: usize = 0xF40;
const STATE_COPY_OFFSET: usize = 22;
const LINK_COPY_OFFSET: usize = 38;
const COMMENT_OFFSET: usize = 64;
const COMMENT_SIZE: usize = 256;

pub(super) const ENCODED_LEN: usize = HEADER_SIZE + CARD_SIZE;

const _: () = assert!(COMMENT_OFFSET + SLOT_COUNT * COMMENT_SIZE == HEADER_SIZE);

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.starts_with(MAGIC)
}

pub(super) fn unwrap(bytes: &[u8]) -> Result<&[u8], OpenError> {
    if !matches(bytes) {
        return Err(OpenError::BadMagic);
    }
    // Comments are not part of the card; they are dropped here.
    split_header(bytes, HEADER_SIZE)
}

pub(super) fn wrap(image: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; HEADER_SIZE];
    bytes[..MAGIC.len()].copy_from_slice(MAGIC);
    bytes[18] = 0x01;
    bytes[20] = 0x01;
    bytes[21] = b'M';
    for frame in 1..=SLOT_COUNT {
        bytes[STATE_COPY_OFFSET + frame] = image[frame * FRAME_SIZE];
        bytes[LINK_COPY_OFFSET + frame] = image[frame * FRAME_SIZE + 8];
    }
    bytes.extend_from_slice(image);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardImage;

    #[test]
    fn header_mirrors_directory_states() {
        let image = CardImage::new().to_bytes();
        let bytes = wrap(&image);
        assert_eq!(bytes.len(), ENCODED_LEN);
        assert_eq!(&bytes[..11], b"123-456-STD");
        assert_eq!(bytes[21], b'M');
        for frame in 1..=SLOT_COUNT {
            assert_eq!(bytes[STATE_COPY_OFFSET + frame], 0xA0);
            assert_eq!(bytes[LINK_COPY_OFFSET + frame], 0xFF);
        }
        assert!(bytes[COMMENT_OFFSET..HEADER_SIZE].iter().all(|&b| b == 0));
    }
}
