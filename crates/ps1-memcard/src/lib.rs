//! PlayStation memory card images and the saves stored on them.
//!
//! A card is 16 blocks of 8 KiB. Block 0 holds the directory, blocks 1 to 15
//! hold save data and are addressed here as slots 0 to 14. [`CardImage`] is the
//! canonical in-memory form; the [`container`] module wraps and unwraps it for
//! the emulator and adapter file formats, and the [`save`] module does the same
//! for single saves.

pub mod card;
pub mod checksum;
pub mod container;
pub mod error;
pub mod frame;
pub mod save;

pub use card::{
    CardImage, OpenOptions, Occupancy, Slot, BLOCK_COUNT, BLOCK_SIZE, CARD_SIZE, MAX_SAVE_BLOCKS,
    SLOT_COUNT,
};
pub use container::{ContainerCodec, ContainerFormat, McxKeys};
pub use error::{ContractError, DecodeError, DirectoryFault, OpenError, SlotError};
pub use frame::{is_deleted, ChainPosition, DirectoryFrame, SaveName, SlotState, DELETED_MASK};
pub use save::{DecodedSave, SaveFile, SaveFormat};
