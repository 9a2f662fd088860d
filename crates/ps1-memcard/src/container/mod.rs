//! Whole-card container formats.
//!
//! Each format wraps the same 131072-byte image; unwrapping yields the raw
//! image and [`CardImage::open`] takes it from there.

mod gme;
mod mcx;
mod raw;
mod vgs;
mod vmp;

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::card::{CardImage, OpenOptions};
use crate::error::{ContractError, OpenError};

pub use mcx::McxKeys;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerFormat {
    Raw,
    Gme,
    Vgs,
    Vmp,
    Mcx,
}

const CONTAINER_FORMATS: [(&str, ContainerFormat); 5] = [
    ("raw", ContainerFormat::Raw),
    ("gme", ContainerFormat::Gme),
    ("vgs", ContainerFormat::Vgs),
    ("vmp", ContainerFormat::Vmp),
    ("mcx", ContainerFormat::Mcx),
];

impl ContainerFormat {
    pub const ALL: [ContainerFormat; 5] = [
        ContainerFormat::Raw,
        ContainerFormat::Gme,
        ContainerFormat::Vgs,
        ContainerFormat::Vmp,
        ContainerFormat::Mcx,
    ];

    pub fn name(self) -> &'static str {
        CONTAINER_FORMATS
            .iter()
            .find(|(_, format)| *format == self)
            .map_or("raw", |(name, _)| name)
    }

    pub fn names() -> String {
        CONTAINER_FORMATS
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn extension(self) -> &'static str {
        match self {
            ContainerFormat::Raw => "mcr",
            ContainerFormat::Gme => "gme",
            ContainerFormat::Vgs => "mem",
            ContainerFormat::Vmp => "vmp",
            ContainerFormat::Mcx => "mcx",
        }
    }

    /// Guess from a file extension, for containers without a magic number.
    pub fn from_extension(extension: &str) -> Option<Self> {
        const EXTENSIONS: [(&str, ContainerFormat); 11] = [
            ("mcr", ContainerFormat::Raw),
            ("mcd", ContainerFormat::Raw),
            ("mc", ContainerFormat::Raw),
            ("bin", ContainerFormat::Raw),
            ("ddf", ContainerFormat::Raw),
            ("srm", ContainerFormat::Raw),
            ("gme", ContainerFormat::Gme),
            ("mem", ContainerFormat::Vgs),
            ("vgs", ContainerFormat::Vgs),
            ("vmp", ContainerFormat::Vmp),
            ("mcx", ContainerFormat::Mcx),
        ];
        EXTENSIONS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(extension))
            .map(|(_, format)| *format)
    }

    /// Recognizes a container by its header, or by size for `mcx`.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if raw::matches(bytes) {
            Some(ContainerFormat::Raw)
        } else if gme::matches(bytes) {
            Some(ContainerFormat::Gme)
        } else if vgs::matches(bytes) {
            Some(ContainerFormat::Vgs)
        } else if vmp::matches(bytes) {
            Some(ContainerFormat::Vmp)
        } else if mcx::matches(bytes) {
            Some(ContainerFormat::Mcx)
        } else {
            None
        }
    }

    /// Size of an encoded container in bytes.
    pub fn encoded_len(self) -> usize {
        match self {
            ContainerFormat::Raw => crate::CARD_SIZE,
            ContainerFormat::Gme => gme::ENCODED_LEN,
            ContainerFormat::Vgs => vgs::ENCODED_LEN,
            ContainerFormat::Vmp => vmp::ENCODED_LEN,
            ContainerFormat::Mcx => mcx::ENCODED_LEN,
        }
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ContainerFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CONTAINER_FORMATS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, format)| *format)
            .ok_or_else(|| ContractError::UnknownFormat {
                kind: "card",
                name: s.to_string(),
                supported: Self::names(),
            })
    }
}

/// Decode and encode settings shared by every container format.
#[derive(Debug, Clone, Default)]
pub struct ContainerCodec {
    pub options: OpenOptions,
    pub mcx_keys: Option<McxKeys>,
}

impl ContainerCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.options.repair = repair;
        self
    }

    pub fn with_mcx_keys(mut self, keys: McxKeys) -> Self {
        self.mcx_keys = Some(keys);
        self
    }

    fn mcx_keys(&self) -> Result<&McxKeys, ContractError> {
        self.mcx_keys.as_ref().ok_or(ContractError::MissingKeys)
    }

    pub fn decode(&self, format: ContainerFormat, bytes: &[u8]) -> Result<CardImage, OpenError> {
        let image: Cow<'_, [u8]> = match format {
            ContainerFormat::Raw => Cow::Borrowed(raw::unwrap(bytes)?),
            ContainerFormat::Gme => Cow::Borrowed(gme::unwrap(bytes)?),
            ContainerFormat::Vgs => Cow::Borrowed(vgs::unwrap(bytes)?),
            ContainerFormat::Vmp => Cow::Borrowed(vmp::unwrap(bytes)?),
            ContainerFormat::Mcx => {
                Cow::Owned(mcx::unwrap(bytes, self.mcx_keys()?, self.options.repair)?)
            }
        };
        CardImage::open(&image, self.options)
    }

    /// Decodes with the format sniffed from the bytes, falling back to `hint`.
    pub fn decode_detect(
        &self,
        bytes: &[u8],
        hint: Option<ContainerFormat>,
    ) -> Result<(ContainerFormat, CardImage), OpenError> {
        let format = ContainerFormat::detect(bytes)
            .or(hint)
            .ok_or(OpenError::BadMagic)?;
        debug!("decoding {} byte card as {format}", bytes.len());
        Ok((format, self.decode(format, bytes)?))
    }

    pub fn encode(
        &self,
        format: ContainerFormat,
        image: &CardImage,
    ) -> Result<Vec<u8>, ContractError> {
        let raw = image.to_bytes();
        Ok(match format {
            ContainerFormat::Raw => raw,
            ContainerFormat::Gme => gme::wrap(&raw),
            ContainerFormat::Vgs => vgs::wrap(&raw),
            ContainerFormat::Vmp => vmp::wrap(&raw),
            ContainerFormat::Mcx => mcx::wrap(&raw, self.mcx_keys()?),
        })
    }
}

// Header-plus-image containers share the same length check.
fn split_header(bytes: &[u8], header_len: usize) -> Result<&[u8], OpenError> {
    let expected = header_len + crate::CARD_SIZE;
    if bytes.len() != expected {
        return Err(OpenError::BadLength {
            expected,
            actual: bytes.len(),
        });
    }
    Ok(&bytes[header_len..])
}
