//! Headerless saves: the block payload and nothing else.

use super::SaveFile;
use crate::frame::SaveName;

// Every save starts with a title frame tagged "SC".
const TITLE_MAGIC: &[u8; 2] = b"SC";

pub(super) fn matches(bytes: &[u8]) -> bool {
    bytes.starts_with(TITLE_MAGIC)
}

pub(super) fn decode(bytes: &[u8], name_hint: Option<&str>) -> SaveFile {
    SaveFile {
        name: name_hint.map(SaveName::parse).unwrap_or_default(),
        payload: bytes.to_vec(),
    }
}

pub(super) fn encode(save: &SaveFile) -> Vec<u8> {
    save.block_payload()
}
