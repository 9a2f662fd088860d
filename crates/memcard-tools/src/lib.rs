//! Memory card management over files: create cards, convert between container
//! formats and move single saves in and out of slots.

use std::path::{Path, PathBuf};

use log::{debug, info};
use ps1_memcard::save::{self, SaveFormat};
use ps1_memcard::{CardImage, ContainerFormat, ContractError, OpenError, SlotError};

mod config;
mod io;

pub use config::{load_config, Config, CONFIG_FILE_NAME};

/// An open card and where it came from.
#[derive(Debug, Clone)]
pub struct MemoryCard {
    pub image: CardImage,
    pub format: ContainerFormat,
    pub path: PathBuf,
}

/// One card being edited. Changes stay in memory until [`Session::save`].
#[derive(Debug)]
pub struct Session {
    card: MemoryCard,
    config: Config,
    changed: bool,
}

impl Session {
    /// Writes a freshly formatted card to `path` and opens it. Without a
    /// `format` the configured card format is used.
    pub fn new_card(
        path: &Path,
        format: Option<ContainerFormat>,
        config: Config,
    ) -> Result<Self, Error> {
        let format = format.unwrap_or(config.card_format);
        let image = CardImage::new();
        let bytes = config.codec().encode(format, &image)?;
        io::write_atomic(path, &bytes)?;
        info!("created {format} card {}", path.display());
        Ok(Self {
            card: MemoryCard {
                image,
                format,
                path: path.to_path_buf(),
            },
            config,
            changed: false,
        })
    }

    pub fn open(path: &Path, config: Config) -> Result<Self, Error> {
        let (format, image) = open_container(path, &config)?;
        Ok(Self {
            card: MemoryCard {
                image,
                format,
                path: path.to_path_buf(),
            },
            config,
            changed: false,
        })
    }

    pub fn card(&self) -> &MemoryCard {
        &self.card
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Visible saves as `(index, name)`, ascending.
    pub fn list_slots(&self) -> Vec<(usize, String)> {
        self.card.image.list()
    }

    pub fn resolve_slot(&self, token: &str) -> Result<usize, Error> {
        Ok(self.card.image.resolve_slot(token)?)
    }

    /// Writes the save headed at `index` to `path`, or to a file named after
    /// the save in the current directory. Returns the path written.
    pub fn export_slot(
        &self,
        index: usize,
        path: Option<&Path>,
        format: Option<SaveFormat>,
    ) -> Result<PathBuf, Error> {
        let format = format.unwrap_or(self.config.save_format);
        let save = self.card.image.save_file(index)?;
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => self.export_file_name(index, Some(format))?,
        };
        io::write_atomic(&path, &save::encode(format, &save))?;
        info!("exported slot {index} as {format} to {}", path.display());
        Ok(path)
    }

    /// File name [`Session::export_slot`] uses when given no path: the save's
    /// name plus the format's extension.
    pub fn export_file_name(
        &self,
        index: usize,
        format: Option<SaveFormat>,
    ) -> Result<PathBuf, Error> {
        let format = format.unwrap_or(self.config.save_format);
        let name = self.card.image.slot_name(index)?;
        Ok(default_export_path(&name, index, format))
    }

    /// Replaces whatever occupies `index` with the save stored at `path`.
    ///
    /// The card is left exactly as it was if anything fails.
    pub fn import_slot(&mut self, index: usize, path: &Path) -> Result<(), Error> {
        let snapshot = self.card.image.clone();
        match self.try_import(index, path) {
            Ok(()) => {
                self.changed = true;
                Ok(())
            }
            Err(err) => {
                self.card.image = snapshot;
                Err(err)
            }
        }
    }

    fn try_import(&mut self, index: usize, path: &Path) -> Result<(), Error> {
        self.card.image.format_slot(index)?;
        let bytes = io::read(path)?;
        let hint = path.file_stem().and_then(|stem| stem.to_str());
        let import_error = |source: SlotError| Error::Import {
            path: path.to_path_buf(),
            source,
        };
        let (format, decoded) =
            save::decode_detect(&bytes, hint).map_err(|err| import_error(err.into()))?;
        debug!("read {} as a {format} save", path.display());
        self.card
            .image
            .import_slot(index, &decoded.save)
            .map_err(import_error)?;
        info!("imported {} into slot {index}", decoded.save.name);
        Ok(())
    }

    /// Toggles the deleted flag of a live save.
    pub fn delete_slot(&mut self, index: usize) -> Result<(), Error> {
        let slot = self.card.image.find_slot(index)?;
        if slot.is_deleted() {
            return Err(SlotError::NotFound(index.to_string()).into());
        }
        self.card.image.toggle_deleted(index)?;
        self.changed = true;
        Ok(())
    }

    /// Frees the slot and its chain whatever state it is in.
    pub fn erase_slot(&mut self, index: usize) -> Result<(), Error> {
        self.card.image.format_slot(index)?;
        self.changed = true;
        Ok(())
    }

    /// Writes the card back to its file in its original format. Returns
    /// whether anything was written.
    pub fn save(&mut self) -> Result<bool, Error> {
        if !self.changed {
            debug!("{} unchanged, not saving", self.card.path.display());
            return Ok(false);
        }
        write_container(&self.card.image, &self.card.path, self.card.format, &self.config)?;
        self.changed = false;
        Ok(true)
    }
}

/// Reads and decodes a card, detecting the container from its contents and
/// falling back to the file extension.
pub fn open_container(path: &Path, config: &Config) -> Result<(ContainerFormat, CardImage), Error> {
    let bytes = io::read(path)?;
    let hint = path
        .extension()
        .and_then(|extension| extension.to_str())
        .and_then(ContainerFormat::from_extension);
    config
        .codec()
        .decode_detect(&bytes, hint)
        .map_err(|source| Error::Open {
            path: path.to_path_buf(),
            source,
        })
}

pub fn write_container(
    image: &CardImage,
    path: &Path,
    format: ContainerFormat,
    config: &Config,
) -> Result<(), Error> {
    let bytes = config.codec().encode(format, image)?;
    io::write_atomic(path, &bytes)
}

/// Re-encodes the card at `src` as `format`, or the configured card format,
/// at `dest`.
pub fn convert_container(
    src: &Path,
    dest: &Path,
    format: Option<ContainerFormat>,
    config: &Config,
) -> Result<(), Error> {
    let format = format.unwrap_or(config.card_format);
    let (source_format, image) = open_container(src, config)?;
    write_container(&image, dest, format, config)?;
    info!(
        "converted {} ({source_format}) to {} ({format})",
        src.display(),
        dest.display()
    );
    Ok(())
}

fn default_export_path(name: &str, index: usize, format: SaveFormat) -> PathBuf {
    let stem: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    let stem = if stem.is_empty() {
        format!("slot{index}")
    } else {
        stem
    };
    match format.extension() {
        Some(extension) => PathBuf::from(format!("{stem}.{extension}")),
        None => PathBuf::from(stem),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to open {}: {source}", path.display())]
    Open { path: PathBuf, source: OpenError },

    #[error("failed to import {}: {source}", path.display())]
    Import { path: PathBuf, source: SlotError },

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("{0}")]
    Config(String),
}
