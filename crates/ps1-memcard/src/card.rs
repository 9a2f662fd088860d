//! The canonical 128 KiB card image and the slot operations on it.

use log::{debug, warn};

use crate::checksum::seal_frame;
use crate::error::{ContractError, DirectoryFault, OpenError, SlotError};
use crate::frame::{ChainPosition, DirectoryFrame, SaveName, SlotState, FRAME_SIZE, NO_LINK};
use crate::save::SaveFile;

pub const BLOCK_SIZE: usize = 0x2000;
pub const BLOCK_COUNT: usize = 16;
pub const SLOT_COUNT: usize = BLOCK_COUNT - 1;
pub const CARD_SIZE: usize = BLOCK_SIZE * BLOCK_COUNT;

/// Largest save, in blocks, that can be imported onto a card.
pub const MAX_SAVE_BLOCKS: usize = 3;

const FRAMES_PER_BLOCK: usize = BLOCK_SIZE / FRAME_SIZE;
const CARD_MAGIC: &[u8; 2] = b"MC";

// Frames 16..36 list broken sectors; frame 63 is the write-test frame.
const BROKEN_SECTOR_FRAMES: std::ops::Range<usize> = 16..36;
const WRITE_TEST_FRAME: usize = FRAMES_PER_BLOCK - 1;
const RESERVED_START: usize = (SLOT_COUNT + 1) * FRAME_SIZE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenOptions {
    /// Recompute bad checksums and cut malformed chains instead of failing.
    pub repair: bool,
}

impl OpenOptions {
    pub fn repair() -> Self {
        Self { repair: true }
    }
}

/// How a slot index is used by the directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupancy {
    Free,
    /// First block of a save.
    Head,
    /// Continuation block owned by the save starting at `head`.
    Linked { head: usize },
}

/// Read-only view of one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    pub index: usize,
    pub state: SlotState,
    pub occupancy: Occupancy,
    pub name: SaveName,
    /// Slot indices of the owning save, head first. Empty for free slots.
    pub chain: Vec<usize>,
}

impl Slot {
    pub fn is_free(&self) -> bool {
        self.occupancy == Occupancy::Free
    }

    pub fn is_deleted(&self) -> bool {
        crate::frame::is_deleted(self.state.code())
    }

    /// Shown in listings: any block whose state code is not deleted,
    /// continuation blocks included.
    pub fn is_visible(&self) -> bool {
        !self.is_deleted()
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub fn display_name(&self) -> String {
        self.name.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImage {
    header: [u8; FRAME_SIZE],
    frames: Vec<DirectoryFrame>,
    // Directory frames 16..64, kept byte for byte.
    reserved: Vec<u8>,
    data: Vec<u8>,
}

impl Default for CardImage {
    fn default() -> Self {
        Self::new()
    }
}

impl CardImage {
    /// A freshly formatted card with every slot free.
    pub fn new() -> Self {
        let mut header = [0u8; FRAME_SIZE];
        header[..CARD_MAGIC.len()].copy_from_slice(CARD_MAGIC);
        seal_frame(&mut header);

        let mut reserved = vec![0u8; BLOCK_SIZE - RESERVED_START];
        let mut broken_sector = [0u8; FRAME_SIZE];
        broken_sector[0..4].fill(0xFF);
        broken_sector[8..10].copy_from_slice(&NO_LINK.to_le_bytes());
        seal_frame(&mut broken_sector);
        for frame in BROKEN_SECTOR_FRAMES {
            let offset = frame * FRAME_SIZE - RESERVED_START;
            reserved[offset..offset + FRAME_SIZE].copy_from_slice(&broken_sector);
        }
        let offset = WRITE_TEST_FRAME * FRAME_SIZE - RESERVED_START;
        reserved[offset..offset + FRAME_SIZE].copy_from_slice(&header);

        Self {
            header,
            frames: vec![DirectoryFrame::free(); SLOT_COUNT],
            reserved,
            data: vec![0; SLOT_COUNT * BLOCK_SIZE],
        }
    }

    /// Parses a raw 131072-byte image.
    pub fn open(bytes: &[u8], options: OpenOptions) -> Result<Self, OpenError> {
        if bytes.len() != CARD_SIZE {
            return Err(OpenError::BadLength {
                expected: CARD_SIZE,
                actual: bytes.len(),
            });
        }
        let mut header = frame_at(bytes, 0);
        if !header.starts_with(CARD_MAGIC) {
            let mut restored = header;
            restored[..CARD_MAGIC.len()].copy_from_slice(CARD_MAGIC);
            // Only a damaged magic whose checksum still vouches for "MC".
            if !options.repair || !DirectoryFrame::is_sealed(&restored) {
                return Err(OpenError::BadMagic);
            }
            warn!("card header magic damaged, restoring");
            header = restored;
        }

        if !DirectoryFrame::is_sealed(&header) {
            if !options.repair {
                return Err(OpenError::ChecksumMismatch { frame: 0 });
            }
            warn!("card header checksum mismatch, recomputing");
        }

        let mut frames = Vec::with_capacity(SLOT_COUNT);
        for slot in 0..SLOT_COUNT {
            let raw = frame_at(bytes, slot + 1);
            if !DirectoryFrame::is_sealed(&raw) {
                if !options.repair {
                    return Err(OpenError::ChecksumMismatch { frame: slot + 1 });
                }
                warn!("slot {slot}: directory checksum mismatch, recomputing");
            }
            let frame = match DirectoryFrame::parse(&raw) {
                Ok(frame) => frame,
                Err(fault) if options.repair => {
                    warn!("slot {slot}: {fault}, resetting to free");
                    DirectoryFrame::free()
                }
                Err(fault) => return Err(OpenError::CorruptDirectory { slot, fault }),
            };
            frames.push(frame);
        }

        let mut card = Self {
            header,
            frames,
            reserved: bytes[RESERVED_START..BLOCK_SIZE].to_vec(),
            data: bytes[BLOCK_SIZE..].to_vec(),
        };
        card.check_chains(options.repair)?;
        Ok(card)
    }

    /// Serializes the card, resealing every directory frame.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(CARD_SIZE);
        let mut header = self.header;
        seal_frame(&mut header);
        bytes.extend_from_slice(&header);
        for frame in &self.frames {
            bytes.extend_from_slice(&frame.to_bytes());
        }
        bytes.extend_from_slice(&self.reserved);
        bytes.extend_from_slice(&self.data);
        bytes
    }

    // Walks every chain from its head, enforcing the ownership invariants.
    fn check_chains(&mut self, repair: bool) -> Result<(), OpenError> {
        let mut owner: [Option<usize>; SLOT_COUNT] = [None; SLOT_COUNT];
        let heads: Vec<usize> = (0..SLOT_COUNT)
            .filter(|&i| self.frames[i].state.position == ChainPosition::Initial)
            .collect();
        for &head in &heads {
            owner[head] = Some(head);
        }

        for &head in &heads {
            let deleted = self.frames[head].state.deleted;
            let mut current = head;
            while let Some(next) = self.frames[current].link {
                let fault = if current != head
                    && self.frames[current].state.position == ChainPosition::End
                {
                    Some(DirectoryFault::LinkPastEnd)
                } else if owner[next].is_some() {
                    Some(DirectoryFault::SharedBlock(next))
                } else if !matches!(
                    self.frames[next].state.position,
                    ChainPosition::Middle | ChainPosition::End
                ) {
                    Some(DirectoryFault::BrokenLink(next))
                } else if self.frames[next].state.deleted != deleted {
                    Some(DirectoryFault::MixedDeletion(next))
                } else {
                    None
                };

                if let Some(fault) = fault {
                    if !repair {
                        return Err(OpenError::CorruptDirectory { slot: head, fault });
                    }
                    warn!("slot {head}: {fault}, terminating chain at slot {current}");
                    self.frames[current].link = None;
                    break;
                }
                owner[next] = Some(head);
                current = next;
            }

            if current != head && self.frames[current].state.position != ChainPosition::End {
                if !repair {
                    return Err(OpenError::CorruptDirectory {
                        slot: head,
                        fault: DirectoryFault::Unterminated,
                    });
                }
                warn!("slot {head}: chain ends without an end block, marking slot {current}");
                self.frames[current].state.position = ChainPosition::End;
            }
        }

        for slot in 0..SLOT_COUNT {
            if self.frames[slot].state.is_free() || owner[slot].is_some() {
                continue;
            }
            if !repair {
                return Err(OpenError::CorruptDirectory {
                    slot,
                    fault: DirectoryFault::Orphaned,
                });
            }
            warn!("slot {slot}: orphaned continuation block, freeing");
            self.frames[slot] = DirectoryFrame::free();
        }
        Ok(())
    }

    fn check_index(index: usize) -> Result<(), ContractError> {
        if index < SLOT_COUNT {
            Ok(())
        } else {
            Err(ContractError::SlotIndex(index))
        }
    }

    pub fn frame(&self, index: usize) -> Result<&DirectoryFrame, ContractError> {
        Self::check_index(index)?;
        Ok(&self.frames[index])
    }

    /// Chain starting at `head`, following links.
    fn chain_from(&self, head: usize) -> Vec<usize> {
        let mut chain = vec![head];
        let mut current = head;
        while let Some(next) = self.frames[current].link {
            if chain.len() == SLOT_COUNT || chain.contains(&next) {
                break;
            }
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Head of the save that owns `index`, if any.
    fn owner_of(&self, index: usize) -> Option<usize> {
        match self.frames[index].state.position {
            ChainPosition::Free => None,
            ChainPosition::Initial => Some(index),
            ChainPosition::Middle | ChainPosition::End => (0..SLOT_COUNT)
                .filter(|&i| self.frames[i].state.position == ChainPosition::Initial)
                .find(|&head| self.chain_from(head).contains(&index)),
        }
    }

    pub fn find_slot(&self, index: usize) -> Result<Slot, ContractError> {
        Self::check_index(index)?;
        let frame = &self.frames[index];
        let (occupancy, chain, name) = match self.owner_of(index) {
            None => (Occupancy::Free, Vec::new(), frame.name),
            Some(head) if head == index => (Occupancy::Head, self.chain_from(head), frame.name),
            Some(head) => (
                Occupancy::Linked { head },
                self.chain_from(head),
                self.frames[head].name,
            ),
        };
        Ok(Slot {
            index,
            state: frame.state,
            occupancy,
            name,
            chain,
        })
    }

    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        (0..SLOT_COUNT).filter_map(|index| self.find_slot(index).ok())
    }

    /// Every undeleted block as `(index, name)`, ascending. Continuation
    /// blocks carry their own, normally empty, name.
    pub fn list(&self) -> Vec<(usize, String)> {
        self.slots()
            .filter(Slot::is_visible)
            .map(|slot| (slot.index, self.frames[slot.index].name.to_string()))
            .collect()
    }

    /// Name stored in the frame at `index`; empty for free and continuation
    /// blocks.
    pub fn slot_name(&self, index: usize) -> Result<String, ContractError> {
        Self::check_index(index)?;
        Ok(self.frames[index].name.to_string())
    }

    pub fn free_blocks(&self) -> Vec<usize> {
        (0..SLOT_COUNT)
            .filter(|&i| self.frames[i].state.is_free())
            .collect()
    }

    /// Resolves a slot by index, or by the case-insensitive display name of
    /// a visible save.
    pub fn resolve_slot(&self, token: &str) -> Result<usize, SlotError> {
        if let Ok(index) = token.parse::<usize>() {
            return if index < SLOT_COUNT {
                Ok(index)
            } else {
                Err(SlotError::NotFound(token.to_string()))
            };
        }
        self.slots()
            .filter(|slot| slot.is_visible() && slot.occupancy == Occupancy::Head)
            .find(|slot| slot.display_name().eq_ignore_ascii_case(token))
            .map(|slot| slot.index)
            .ok_or_else(|| SlotError::NotFound(token.to_string()))
    }

    fn block(&self, index: usize) -> &[u8] {
        &self.data[index * BLOCK_SIZE..(index + 1) * BLOCK_SIZE]
    }

    fn block_mut(&mut self, index: usize) -> &mut [u8] {
        &mut self.data[index * BLOCK_SIZE..(index + 1) * BLOCK_SIZE]
    }

    /// Frees the save owning `index` and zeroes its blocks.
    pub fn format_slot(&mut self, index: usize) -> Result<(), ContractError> {
        Self::check_index(index)?;
        let chain = match self.owner_of(index) {
            Some(head) => self.chain_from(head),
            None => vec![index],
        };
        for block in chain {
            self.frames[block] = DirectoryFrame::free();
            self.block_mut(block).fill(0);
        }
        Ok(())
    }

    /// Flips the deleted flag on every frame of the save owning `index`.
    pub fn toggle_deleted(&mut self, index: usize) -> Result<(), ContractError> {
        Self::check_index(index)?;
        let chain = match self.owner_of(index) {
            Some(head) => self.chain_from(head),
            None => vec![index],
        };
        for block in chain {
            let state = &mut self.frames[block].state;
            state.deleted = !state.deleted;
        }
        Ok(())
    }

    // First fit from just after `index`, wrapping around.
    fn allocate(&self, index: usize, required: usize) -> Option<Vec<usize>> {
        let mut chain = vec![index];
        chain.extend(
            (index + 1..SLOT_COUNT)
                .chain(0..index)
                .filter(|&i| self.frames[i].state.is_free())
                .take(required - 1),
        );
        (chain.len() == required).then_some(chain)
    }

    /// Writes `save` with its head at `index`. Nothing changes on failure.
    pub fn import_slot(&mut self, index: usize, save: &SaveFile) -> Result<(), SlotError> {
        Self::check_index(index)?;
        let required = save.required_blocks();
        if required > MAX_SAVE_BLOCKS {
            return Err(SlotError::InsufficientSpace { required });
        }
        if !self.frames[index].state.is_free() {
            return Err(SlotError::InUse(index));
        }
        let chain = self
            .allocate(index, required)
            .ok_or(SlotError::InsufficientSpace { required })?;
        debug!("importing {} into slots {chain:?}", save.name);

        for (position, &block) in chain.iter().enumerate() {
            let start = (position * BLOCK_SIZE).min(save.payload.len());
            let end = ((position + 1) * BLOCK_SIZE).min(save.payload.len());
            let target = self.block_mut(block);
            target.fill(0);
            target[..end - start].copy_from_slice(&save.payload[start..end]);

            let mut frame = DirectoryFrame::free();
            frame.state = SlotState::in_use(match position {
                0 => ChainPosition::Initial,
                p if p + 1 == chain.len() => ChainPosition::End,
                _ => ChainPosition::Middle,
            });
            frame.link = chain.get(position + 1).copied();
            if position == 0 {
                frame.size = (required * BLOCK_SIZE) as u32;
                frame.name = save.name;
            }
            self.frames[block] = frame;
        }
        Ok(())
    }

    /// Payload of the save headed at `index`, `chain_len * BLOCK_SIZE` bytes.
    pub fn export_slot(&self, index: usize) -> Result<Vec<u8>, SlotError> {
        Self::check_index(index)?;
        if self.frames[index].state.position != ChainPosition::Initial {
            return Err(SlotError::NotFound(index.to_string()));
        }
        Ok(self
            .chain_from(index)
            .into_iter()
            .flat_map(|block| self.block(block).iter().copied())
            .collect())
    }

    /// Name and payload of the save headed at `index`, ready for a save codec.
    pub fn save_file(&self, index: usize) -> Result<SaveFile, SlotError> {
        let payload = self.export_slot(index)?;
        Ok(SaveFile {
            name: self.frames[index].name,
            payload,
        })
    }
}

fn frame_at(bytes: &[u8], frame: usize) -> [u8; FRAME_SIZE] {
    let mut raw = [0u8; FRAME_SIZE];
    raw.copy_from_slice(&bytes[frame * FRAME_SIZE..(frame + 1) * FRAME_SIZE]);
    raw
}
