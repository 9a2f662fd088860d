//! MCX images: an encrypted card with a SHA-256 digest.
//!
//! Plaintext is a zeroed 128-byte header, the image, and the SHA-256 of both.
//! The whole buffer is AES-128-CBC encrypted without padding. Key and IV are
//! supplied by the caller.

use cbc::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use log::warn;

use crate::checksum::sha256;
use crate::error::OpenError;
use crate::CARD_SIZE;

type Encryptor = cbc::Encryptor<aes::Aes128>;
type Decryptor = cbc::Decryptor<aes::Aes128>;

const HEADER_SIZE: usize = 0x80;
const DIGEST_SIZE: usize = 32;

pub(super) const ENCODED_LEN: usize = HEADER_SIZE + CARD_SIZE + DIGEST_SIZE;

/// AES-128 key and CBC initialization vector for mcx containers.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct McxKeys {
    pub key: [u8; 16],
    pub iv: [u8; 16],
}

impl std::fmt::Debug for McxKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str("McxKeys { .. }")
    }
}

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.len() == ENCODED_LEN
}

pub(super) fn unwrap(bytes: &[u8], keys: &McxKeys, repair: bool) -> Result<Vec<u8>, OpenError> {
    let bad_length = || OpenError::BadLength {
        expected: ENCODED_LEN,
        actual: bytes.len(),
    };
    if bytes.len() != ENCODED_LEN {
        return Err(bad_length());
    }

    let plain = Decryptor::new(&keys.key.into(), &keys.iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(bytes)
        .map_err(|_| bad_length())?;
    let (body, digest) = plain.split_at(HEADER_SIZE + CARD_SIZE);
    if sha256(body)[..] != digest[..] {
        if !repair {
            return Err(OpenError::DigestMismatch);
        }
        warn!("mcx digest mismatch, ignoring");
    }
    Ok(body[HEADER_SIZE..].to_vec())
}

pub(super) fn wrap(image: &[u8], keys: &McxKeys) -> Vec<u8> {
    let mut plain = vec![0u8; HEADER_SIZE];
    plain.extend_from_slice(image);
    let digest = sha256(&plain);
    plain.extend_from_slice(&digest);

    Encryptor::new(&keys.key.into(), &keys.iv.into()).encrypt_padded_vec_mut::<NoPadding>(&plain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardImage;

    fn keys() -> McxKeys {
        McxKeys {
            key: [0x11; 16],
            iv: [0x22; 16],
        }
    }

    #[test]
    fn ciphertext_hides_the_image() {
        let image = CardImage::new().to_bytes();
        let bytes = wrap(&image, &keys());
        assert_eq!(bytes.len(), ENCODED_LEN);
        assert_ne!(&bytes[HEADER_SIZE..HEADER_SIZE + 2], b"MC");
        assert_eq!(unwrap(&bytes, &keys(), false).unwrap(), image);
    }

    #[test]
    fn wrong_key_fails_the_digest() {
        let image = CardImage::new().to_bytes();
        let bytes = wrap(&image, &keys());
        let other = McxKeys {
            key: [0x33; 16],
            iv: [0x22; 16],
        };
        assert!(matches!(
            unwrap(&bytes, &other, false),
            Err(OpenError::DigestMismatch)
        ));
    }
}
