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

//! Per-(port, slot) memory card state
//!
//! The card contents live in [`McdStorage`]; a slot only tracks what the
//! card itself would latch between commands: the terminator byte, the FLAG
//! byte, and where the next transfer lands.

use super::storage::{McdStorage, PS1_SECTOR_SIZE};

/// Terminator byte after reset
pub const DEFAULT_TERMINATOR: u8 = 0x55;

/// FLAG byte after reset
pub const DEFAULT_FLAG: u8 = 0x08;

/// FLAG bit 3: directory not yet read since insertion
pub const FLAG_DIRECTORY_UNREAD: u8 = 0x08;

/// Memory card slot state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryCardSlot {
    pub port: usize,
    pub slot: usize,

    /// Terminator appended to most PS2 replies
    pub term: u8,

    /// Status byte sent in every preamble
    pub flag: u8,

    pub sector_addr: u32,

    /// Byte offset of the next read/write, derived from `sector_addr`
    pub transfer_addr: u32,

    /// Whether the last sector address passed its checks
    pub good_sector: bool,

    /// Remaining accesses during which the card plays dead
    pub auto_eject_ticks: u32,
}

impl MemoryCardSlot {
    pub fn new(port: usize, slot: usize) -> Self {
        Self {
            port,
            slot,
            term: DEFAULT_TERMINATOR,
            flag: DEFAULT_FLAG,
            sector_addr: 0,
            transfer_addr: 0,
            good_sector: false,
            auto_eject_ticks: 0,
        }
    }

    /// Return to power-on state, keeping (port, slot)
    pub fn reset(&mut self) {
        *self = Self::new(self.port, self.slot);
    }

    /// Latch a PS2 sector address
    ///
    /// The transfer address always follows, even for a sector rejected by
    /// its checksum.
    pub fn set_sector<S: McdStorage>(&mut self, storage: &S, sector: u32, good: bool) {
        let info = storage.size_info(self.port, self.slot);
        self.sector_addr = sector;
        self.good_sector = good;
        self.transfer_addr = info.raw_sector_size().wrapping_mul(sector);
    }

    /// Latch a PS1 sector address
    pub fn set_ps1_sector(&mut self, sector: u32) {
        self.sector_addr = sector;
        self.good_sector = sector <= 0x3FF;
        self.transfer_addr = PS1_SECTOR_SIZE as u32 * sector;
    }

    /// Read at the transfer address, then advance it
    ///
    /// A failed read leaves `dest` zeroed.
    pub fn read<S: McdStorage>(&mut self, storage: &mut S, dest: &mut [u8]) {
        if !storage.read(self.port, self.slot, dest, self.transfer_addr) {
            dest.fill(0);
        }
        self.transfer_addr = self.transfer_addr.wrapping_add(dest.len() as u32);
    }

    /// Write at the transfer address, then advance it
    pub fn write<S: McdStorage>(&mut self, storage: &mut S, src: &[u8]) {
        storage.save(self.port, self.slot, src, self.transfer_addr);
        self.transfer_addr = self.transfer_addr.wrapping_add(src.len() as u32);
    }

    /// Erase the block at the transfer address
    pub fn erase_block<S: McdStorage>(&mut self, storage: &mut S) {
        storage.erase_block(self.port, self.slot, self.transfer_addr);
    }

    /// Whether the card is currently playing dead
    #[inline]
    pub fn is_ejected(&self) -> bool {
        self.auto_eject_ticks > 0
    }

    /// Burn one auto-eject tick
    ///
    /// Returns true when the access must be answered with dead air.
    pub fn consume_auto_eject(&mut self) -> bool {
        if self.auto_eject_ticks == 0 {
            return false;
        }

        self.auto_eject_ticks -= 1;
        if self.auto_eject_ticks == 0 {
            log::info!(
                "Memory card port {} slot {} reinserted after auto-eject",
                self.port,
                self.slot
            );
        }
        true
    }
}
