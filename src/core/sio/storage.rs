// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Memory card storage
//!
//! The serial controllers never own card contents. They talk to a
//! [`McdStorage`] implementation through a narrow read/save/erase/CRC
//! interface addressed by (port, slot). [`CardBank`] is the in-crate
//! implementation: raw card images held in memory, optionally backed by a
//! file they were loaded from.
//!
//! # Image formats
//!
//! | Size                 | Kind | Geometry                                  |
//! |----------------------|------|-------------------------------------------|
//! | 131072 bytes         | PS1  | 1024 sectors of 128 bytes                 |
//! | N × 528 bytes        | PS2  | 512-byte sectors + 16 ECC bytes each      |

use super::{PORTS, SLOTS};
use crate::core::error::{CardError, Result, SioError};
use std::fs;
use std::path::{Path, PathBuf};

/// PS1 card image size
pub const PS1_CARD_SIZE: usize = 128 * 1024;

/// PS1 sector size
pub const PS1_SECTOR_SIZE: usize = 128;

/// PS1 sector count
pub const PS1_SECTOR_COUNT: u32 = 1024;

/// PS2 sector data size
pub const PS2_SECTOR_SIZE: u16 = 512;

/// PS2 erase block size, in sectors
pub const PS2_ERASE_BLOCK_SECTORS: u16 = 16;

/// PS2 sector count of a standard 8 MB card
pub const PS2_CARD_SECTORS: u32 = 16384;

/// ECC bytes trailing each sector of the given size
#[inline]
pub fn ecc_size(sector_size: u16) -> u32 {
    u32::from(sector_size) / 32
}

/// Card geometry reported by GetSpecs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McdSizeInfo {
    pub sector_size: u16,
    pub erase_block_size_in_sectors: u16,
    pub mc_size_in_sectors: u32,
    pub xor: u8,
}

impl McdSizeInfo {
    /// Build size info, deriving the XOR constant from the other fields
    ///
    /// The constant is the XOR of every byte of the three fields in
    /// little-endian order, exactly as they go out on the wire.
    pub fn new(sector_size: u16, erase_block_size_in_sectors: u16, mc_size_in_sectors: u32) -> Self {
        let xor = sector_size
            .to_le_bytes()
            .iter()
            .chain(erase_block_size_in_sectors.to_le_bytes().iter())
            .chain(mc_size_in_sectors.to_le_bytes().iter())
            .fold(0u8, |acc, b| acc ^ b);

        Self {
            sector_size,
            erase_block_size_in_sectors,
            mc_size_in_sectors,
            xor,
        }
    }

    /// Bytes per sector including ECC
    #[inline]
    pub fn raw_sector_size(&self) -> u32 {
        u32::from(self.sector_size) + ecc_size(self.sector_size)
    }

    /// Reject sectors past the end of the card
    pub fn check_sector(&self, sector: u32) -> std::result::Result<u32, CardError> {
        if sector < self.mc_size_in_sectors {
            Ok(sector)
        } else {
            Err(CardError::SectorOutOfRange {
                sector,
                sectors: self.mc_size_in_sectors,
            })
        }
    }
}

impl Default for McdSizeInfo {
    fn default() -> Self {
        Self::new(PS2_SECTOR_SIZE, PS2_ERASE_BLOCK_SECTORS, PS2_CARD_SECTORS)
    }
}

/// Card storage consumed by the memory card protocols
///
/// Failures are reported as `false`, never as errors: the bus has no way
/// to tell the guest that a host write failed.
pub trait McdStorage {
    /// Whether a card is inserted
    fn is_present(&self, port: usize, slot: usize) -> bool;

    /// Whether the inserted card is a PS1 card
    fn is_psx(&self, port: usize, slot: usize) -> bool;

    /// Geometry of the inserted card
    fn size_info(&self, port: usize, slot: usize) -> McdSizeInfo;

    /// Read `dest.len()` bytes at `addr`
    fn read(&mut self, port: usize, slot: usize, dest: &mut [u8], addr: u32) -> bool;

    /// Write `src` at `addr`
    fn save(&mut self, port: usize, slot: usize, src: &[u8], addr: u32) -> bool;

    /// Erase the block starting at `addr`
    fn erase_block(&mut self, port: usize, slot: usize, addr: u32) -> bool;

    /// Checksum of the whole card, 0 when absent
    fn crc(&self, port: usize, slot: usize) -> u64;
}

/// Kind of card held by an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardKind {
    Ps1,
    Ps2,
}

/// Raw memory card image
#[derive(Debug, Clone)]
pub struct MemoryCardImage {
    kind: CardKind,
    data: Vec<u8>,
    path: Option<PathBuf>,
}

impl MemoryCardImage {
    /// Blank PS1 card
    pub fn new_ps1() -> Self {
        Self {
            kind: CardKind::Ps1,
            data: vec![0; PS1_CARD_SIZE],
            path: None,
        }
    }

    /// Blank, fully erased 8 MB PS2 card
    pub fn new_ps2() -> Self {
        Self::new_ps2_with_sectors(PS2_CARD_SECTORS)
    }

    /// Blank PS2 card with a custom sector count
    pub fn new_ps2_with_sectors(sectors: u32) -> Self {
        let raw = McdSizeInfo::default().raw_sector_size() as usize;
        Self {
            kind: CardKind::Ps2,
            data: vec![0xFF; raw * sectors as usize],
            path: None,
        }
    }

    /// Wrap raw image bytes, detecting the card kind from the size
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let raw = McdSizeInfo::default().raw_sector_size() as usize;
        let kind = if data.len() == PS1_CARD_SIZE {
            CardKind::Ps1
        } else if !data.is_empty() && data.len() % raw == 0 {
            CardKind::Ps2
        } else {
            return Err(CardError::InvalidImageSize { size: data.len() }.into());
        };

        Ok(Self {
            kind,
            data,
            path: None,
        })
    }

    /// Load an image from disk
    ///
    /// The image remembers its path so [`MemoryCardImage::flush`] can
    /// write it back.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut image = Self::from_bytes(fs::read(path)?)?;
        image.path = Some(path.to_path_buf());
        log::info!(
            "Loaded {:?} memory card image: {} ({} bytes)",
            image.kind,
            path.display(),
            image.data.len()
        );
        Ok(image)
    }

    /// Write the image back to the file it was loaded from
    pub fn flush(&self) -> Result<()> {
        if let Some(path) = &self.path {
            fs::write(path, &self.data)?;
            log::debug!("Flushed memory card image to {}", path.display());
        }
        Ok(())
    }

    /// Write the image to a new file
    pub fn save_as<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        fs::write(path.as_ref(), &self.data)?;
        self.path = Some(path.as_ref().to_path_buf());
        Ok(())
    }

    #[inline]
    pub fn kind(&self) -> CardKind {
        self.kind
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Card geometry
    pub fn size_info(&self) -> McdSizeInfo {
        match self.kind {
            CardKind::Ps1 => McdSizeInfo::new(PS1_SECTOR_SIZE as u16, 1, PS1_SECTOR_COUNT),
            CardKind::Ps2 => {
                let raw = McdSizeInfo::default().raw_sector_size() as usize;
                McdSizeInfo::new(
                    PS2_SECTOR_SIZE,
                    PS2_ERASE_BLOCK_SECTORS,
                    (self.data.len() / raw) as u32,
                )
            }
        }
    }

    /// XOR-fold of the image as little-endian 64-bit words
    pub fn crc(&self) -> u64 {
        let mut chunks = self.data.chunks_exact(8);
        let mut crc = chunks.by_ref().fold(0u64, |acc, chunk| {
            let mut word = [0u8; 8];
            word.copy_from_slice(chunk);
            acc ^ u64::from_le_bytes(word)
        });

        let rest = chunks.remainder();
        if !rest.is_empty() {
            let mut word = [0u8; 8];
            word[..rest.len()].copy_from_slice(rest);
            crc ^= u64::from_le_bytes(word);
        }

        crc
    }

    fn range(&self, addr: u32, len: usize) -> Option<std::ops::Range<usize>> {
        let start = addr as usize;
        let end = start.checked_add(len)?;
        (end <= self.data.len()).then_some(start..end)
    }

    fn read(&self, dest: &mut [u8], addr: u32) -> bool {
        match self.range(addr, dest.len()) {
            Some(range) => {
                dest.copy_from_slice(&self.data[range]);
                true
            }
            None => false,
        }
    }

    fn write(&mut self, src: &[u8], addr: u32) -> bool {
        match self.range(addr, src.len()) {
            Some(range) => {
                self.data[range].copy_from_slice(src);
                true
            }
            None => false,
        }
    }

    fn erase_block(&mut self, addr: u32) -> bool {
        let info = self.size_info();
        let len = info.raw_sector_size() as usize * usize::from(info.erase_block_size_in_sectors);
        match self.range(addr, len) {
            Some(range) => {
                self.data[range].fill(0xFF);
                true
            }
            None => false,
        }
    }
}

/// Card images for every (port, slot)
#[derive(Debug, Clone, Default)]
pub struct CardBank {
    cards: [[Option<MemoryCardImage>; SLOTS]; PORTS],
}

impl CardBank {
    /// Empty bank, no cards inserted
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a card, returning the one it replaces
    pub fn insert(
        &mut self,
        port: usize,
        slot: usize,
        image: MemoryCardImage,
    ) -> Result<Option<MemoryCardImage>> {
        let entry = self.entry_mut(port, slot)?;
        Ok(entry.replace(image))
    }

    /// Remove a card
    pub fn eject(&mut self, port: usize, slot: usize) -> Result<Option<MemoryCardImage>> {
        Ok(self.entry_mut(port, slot)?.take())
    }

    /// Load an image file into (port, slot)
    pub fn load_image<P: AsRef<Path>>(&mut self, port: usize, slot: usize, path: P) -> Result<()> {
        let image = MemoryCardImage::load(path)?;
        self.insert(port, slot, image)?;
        Ok(())
    }

    /// Write every file-backed card back to disk
    pub fn flush_all(&self) -> Result<()> {
        for image in self.cards.iter().flatten().flatten() {
            image.flush()?;
        }
        Ok(())
    }

    /// Card at (port, slot)
    pub fn card(&self, port: usize, slot: usize) -> Option<&MemoryCardImage> {
        self.cards.get(port)?.get(slot)?.as_ref()
    }

    fn card_mut(&mut self, port: usize, slot: usize) -> Option<&mut MemoryCardImage> {
        self.cards.get_mut(port)?.get_mut(slot)?.as_mut()
    }

    fn entry_mut(&mut self, port: usize, slot: usize) -> Result<&mut Option<MemoryCardImage>> {
        self.cards
            .get_mut(port)
            .and_then(|p| p.get_mut(slot))
            .ok_or(SioError::InvalidSlot { port, slot })
    }
}

impl McdStorage for CardBank {
    fn is_present(&self, port: usize, slot: usize) -> bool {
        self.card(port, slot).is_some()
    }

    fn is_psx(&self, port: usize, slot: usize) -> bool {
        self.card(port, slot)
            .is_some_and(|card| card.kind() == CardKind::Ps1)
    }

    fn size_info(&self, port: usize, slot: usize) -> McdSizeInfo {
        self.card(port, slot)
            .map(MemoryCardImage::size_info)
            .unwrap_or_default()
    }

    fn read(&mut self, port: usize, slot: usize, dest: &mut [u8], addr: u32) -> bool {
        let ok = self
            .card(port, slot)
            .is_some_and(|card| card.read(dest, addr));
        if !ok {
            log::warn!(
                "Memory card read failed: port {} slot {} addr 0x{:08X} len {}",
                port,
                slot,
                addr,
                dest.len()
            );
        }
        ok
    }

    fn save(&mut self, port: usize, slot: usize, src: &[u8], addr: u32) -> bool {
        let ok = self
            .card_mut(port, slot)
            .is_some_and(|card| card.write(src, addr));
        if !ok {
            log::warn!(
                "Memory card save dropped: port {} slot {} addr 0x{:08X} len {}",
                port,
                slot,
                addr,
                src.len()
            );
        }
        ok
    }

    fn erase_block(&mut self, port: usize, slot: usize, addr: u32) -> bool {
        let ok = self
            .card_mut(port, slot)
            .is_some_and(|card| card.erase_block(addr));
        if !ok {
            log::warn!(
                "Memory card erase failed: port {} slot {} addr 0x{:08X}",
                port,
                slot,
                addr
            );
        }
        ok
    }

    fn crc(&self, port: usize, slot: usize) -> u64 {
        self.card(port, slot).map_or(0, MemoryCardImage::crc)
    }
}
