//! Integrity helpers for directory frames and container digests.

use sha2::{Digest, Sha256};

use crate::frame::FRAME_SIZE;

/// Offset of the trailing checksum byte inside a frame.
pub const CHECKSUM_OFFSET: usize = FRAME_SIZE - 1;

pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, byte| acc ^ byte)
}

/// Checksum of the first 127 bytes of a frame.
pub fn frame_checksum(frame: &[u8; FRAME_SIZE]) -> u8 {
    xor_checksum(&frame[..CHECKSUM_OFFSET])
}

pub fn verify_frame(frame: &[u8; FRAME_SIZE]) -> bool {
    frame[CHECKSUM_OFFSET] == frame_checksum(frame)
}

/// Rewrites the trailing byte so the frame verifies.
pub fn seal_frame(frame: &mut [u8; FRAME_SIZE]) {
    frame[CHECKSUM_OFFSET] = frame_checksum(frame);
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    Sha256::digest(bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_frame_checksum_matches_known_value() {
        let mut frame = [0u8; FRAME_SIZE];
        frame[0] = b'M';
        frame[1] = b'C';
        seal_frame(&mut frame);
        assert_eq!(frame[CHECKSUM_OFFSET], 0x0E);
        assert!(verify_frame(&frame));
    }

    #[test]
    fn any_single_bit_flip_breaks_the_frame() {
        let mut frame = [0u8; FRAME_SIZE];
        frame[0] = 0x51;
        frame[10..14].copy_from_slice(b"BISL");
        seal_frame(&mut frame);

        for byte in 0..CHECKSUM_OFFSET {
            for bit in 0..8 {
                let mut mutated = frame;
                mutated[byte] ^= 1 << bit;
                assert!(!verify_frame(&mutated), "flip at {byte}:{bit} went unnoticed");
            }
        }
    }
}
