//! MCS saves (also `.psx`/`.ps1` from PSXGameEdit and Memory Juggler): a copy
//! of the head directory frame followed by the payload.

use super::{ensure_len, trim_padding, SaveFile, SaveFormat};
use crate::error::DecodeError;
use crate::frame::{ChainPosition, DirectoryFrame, FRAME_SIZE};

// State byte of an in-use head frame, 'Q'.
const HEAD_STATE: u8 = 0x51;

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.len() > FRAME_SIZE && bytes[0] == HEAD_STATE
}

pub(super) fn decode(bytes: &[u8]) -> Result<SaveFile, DecodeError> {
    ensure_len(bytes, FRAME_SIZE + 1)?;
    let mut raw = [0u8; FRAME_SIZE];
    raw.copy_from_slice(&bytes[..FRAME_SIZE]);

    if !DirectoryFrame::is_sealed(&raw) {
        return Err(DecodeError::ChecksumMismatch(SaveFormat::Mcs));
    }
    let frame = DirectoryFrame::parse(&raw).map_err(|_| DecodeError::BadMagic(SaveFormat::Mcs))?;
    if frame.state.position != ChainPosition::Initial {
        return Err(DecodeError::BadMagic(SaveFormat::Mcs));
    }

    let available = &bytes[FRAME_SIZE..];
    let payload = match frame.size as usize {
        0 => trim_padding(available),
        size => &available[..size.min(available.len())],
    };
    Ok(SaveFile {
        name: frame.name,
        payload: payload.to_vec(),
    })
}

pub(super) fn encode(save: &SaveFile) -> Vec<u8> {
    let payload = save.block_payload();
    let frame = DirectoryFrame::head(save.name, payload.len() as u32);

    let mut bytes = Vec::with_capacity(FRAME_SIZE + payload.len());
    bytes.extend_from_slice(&frame.to_bytes());
    bytes.extend_from_slice(&payload);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::SaveName;
    use crate::BLOCK_SIZE;

    #[test]
    fn header_is_a_sealed_head_frame() {
        let save = SaveFile {
            name: SaveName::parse("BESLES-01234ABC"),
            payload: vec![7; BLOCK_SIZE],
        };
        let bytes = encode(&save);
        assert_eq!(bytes.len(), FRAME_SIZE + BLOCK_SIZE);
        assert_eq!(decode(&bytes).unwrap(), save);
        assert_eq!(bytes[0], HEAD_STATE);
        assert_eq!(&bytes[0x0A..0x0C], b"BE");
        assert_eq!(&bytes[0x08..0x0A], &[0xFF, 0xFF]);
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), BLOCK_SIZE as u32);
    }

    #[test]
    fn tampered_header_is_rejected() {
        let save = SaveFile {
            name: SaveName::parse("BESLES-01234ABC"),
            payload: vec![7; BLOCK_SIZE],
        };
        let mut bytes = encode(&save);
        bytes[0x10] ^= 1;
        assert_eq!(
            decode(&bytes),
            Err(DecodeError::ChecksumMismatch(SaveFormat::Mcs))
        );
    }
}
