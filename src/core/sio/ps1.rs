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

//! PS1 memory card protocol
//!
//! Unlike the PS2 commands, the PS1 protocol is positional: what a byte
//! means depends only on how many bytes came before it. Position 0 is the
//! 0x81 mode byte and position 1 the command, both answered by the
//! controller, so a transaction starts at position 2.
//!
//! # Read (0x52)
//!
//! ```text
//! Pos     | Host sends | Card replies
//! --------|------------|--------------------------
//! 2       | 0x00       | 0x5A
//! 3       | 0x00       | 0x5D
//! 4       | MSB        | 0x00
//! 5       | LSB        | MSB (previous byte)
//! 6       | 0x00       | 0x5C
//! 7       | 0x00       | 0x5D
//! 8       | 0x00       | MSB
//! 9       | 0x00       | LSB
//! 10..137 | 0x00       | sector data
//! 138     | 0x00       | checksum
//! 139     | 0x00       | 0x47 (no ACK)
//! ```
//!
//! # Write (0x57)
//!
//! ```text
//! Pos     | Host sends | Card replies
//! --------|------------|--------------------------
//! 2..5    | as Read    | as Read
//! 6..133  | data       | previous byte
//! 134     | checksum   | previous byte
//! 135     | 0x00       | 0x5C
//! 136     | 0x00       | 0x5D
//! 137     | 0x00       | 0x47 / 0x4E / 0xFF (no ACK)
//! ```
//!
//! The checksum is the XOR of both address bytes and all 128 data bytes.

use super::memcard::{MemoryCardSlot, FLAG_DIRECTORY_UNREAD};
use super::storage::{McdStorage, PS1_SECTOR_SIZE};
use crate::core::save_state::{Ps1TransactionState, StateSave};

/// Position of the first byte after mode and command
pub const FIRST_POSITION: u16 = 2;

/// Write completed
pub const WRITE_GOOD: u8 = 0x47;

/// Write checksum mismatch
pub const WRITE_BAD_CHECKSUM: u8 = 0x4E;

/// Write to an out-of-range sector
pub const WRITE_BAD_SECTOR: u8 = 0xFF;

/// PS1 memory card commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ps1Command {
    Read,
    State,
    Write,
    Pocketstation,
}

impl Ps1Command {
    pub fn from_byte(value: u8) -> Option<Self> {
        match value {
            0x52 => Some(Self::Read),
            0x53 => Some(Self::State),
            0x57 => Some(Self::Write),
            0x58 => Some(Self::Pocketstation),
            _ => None,
        }
    }
}

/// Card answer to one PS1 byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ps1Reply {
    pub data: u8,
    /// Whether the card pulls /ACK after this byte
    pub ack: bool,
}

impl Ps1Reply {
    fn ack(data: u8) -> Self {
        Self { data, ack: true }
    }

    fn last(data: u8) -> Self {
        Self { data, ack: false }
    }
}

/// PS1 transaction in flight
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ps1Transaction {
    current_byte: u16,
    sector_addr_msb: u8,
    sector_addr_lsb: u8,
    checksum: u8,
    expected_checksum: u8,
    prev_byte: u8,
    buf: [u8; PS1_SECTOR_SIZE],
}

impl Ps1Transaction {
    pub fn new() -> Self {
        Self {
            current_byte: FIRST_POSITION,
            sector_addr_msb: 0,
            sector_addr_lsb: 0,
            checksum: 0,
            expected_checksum: 0,
            prev_byte: 0,
            buf: [0; PS1_SECTOR_SIZE],
        }
    }

    /// Forget the transaction; the next byte is position 2 again
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Position the next byte will be handled at
    #[inline]
    pub fn position(&self) -> u16 {
        self.current_byte
    }

    /// Exchange one byte of a latched command
    pub fn step<S: McdStorage>(
        &mut self,
        command: Ps1Command,
        mcd: &mut MemoryCardSlot,
        storage: &mut S,
        data: u8,
    ) -> Ps1Reply {
        let reply = match command {
            Ps1Command::Read => self.read(mcd, storage, data),
            Ps1Command::Write => self.write(mcd, storage, data),
            Ps1Command::State => Ps1Reply::last(0x00),
            Ps1Command::Pocketstation => Ps1Reply::last(0x00),
        };

        log::trace!(
            "PS1 MCD {:?} pos {}: 0x{:02X} -> 0x{:02X}{}",
            command,
            self.current_byte,
            data,
            reply.data,
            if reply.ack { "" } else { " (no ACK)" }
        );

        self.prev_byte = data;
        self.current_byte = self.current_byte.saturating_add(1);
        reply
    }

    /// Positions 2-5, shared by Read and Write
    fn address(&mut self, mcd: &mut MemoryCardSlot, data: u8) -> Option<Ps1Reply> {
        let reply = match self.current_byte {
            2 => 0x5A,
            3 => 0x5D,
            4 => {
                self.sector_addr_msb = data;
                0x00
            }
            5 => {
                self.sector_addr_lsb = data;
                let sector = (u32::from(self.sector_addr_msb) << 8) | u32::from(data);
                mcd.set_ps1_sector(sector);
                self.prev_byte
            }
            _ => return None,
        };
        Some(Ps1Reply::ack(reply))
    }

    #[inline]
    fn seed_checksum(&mut self) {
        self.checksum = self.sector_addr_msb ^ self.sector_addr_lsb;
    }

    fn read<S: McdStorage>(
        &mut self,
        mcd: &mut MemoryCardSlot,
        storage: &mut S,
        data: u8,
    ) -> Ps1Reply {
        if let Some(reply) = self.address(mcd, data) {
            return reply;
        }

        match self.current_byte {
            6 => Ps1Reply::ack(0x5C),
            7 => Ps1Reply::ack(0x5D),
            8 => Ps1Reply::ack(self.sector_addr_msb),
            9 => Ps1Reply::ack(self.sector_addr_lsb),
            pos @ 10..=137 => {
                if pos == 10 {
                    self.seed_checksum();
                    mcd.read(storage, &mut self.buf);
                }
                let byte = self.buf[usize::from(pos - 10)];
                self.checksum ^= byte;
                Ps1Reply::ack(byte)
            }
            138 => Ps1Reply::ack(self.checksum),
            139 => Ps1Reply::last(0x47),
            _ => Ps1Reply::last(0x00),
        }
    }

    fn write<S: McdStorage>(
        &mut self,
        mcd: &mut MemoryCardSlot,
        storage: &mut S,
        data: u8,
    ) -> Ps1Reply {
        if let Some(reply) = self.address(mcd, data) {
            return reply;
        }

        match self.current_byte {
            pos @ 6..=133 => {
                if pos == 6 {
                    self.seed_checksum();
                }
                self.buf[usize::from(pos - 6)] = data;
                self.checksum ^= data;
                Ps1Reply::ack(self.prev_byte)
            }
            134 => {
                self.expected_checksum = data;
                Ps1Reply::ack(self.prev_byte)
            }
            135 => Ps1Reply::ack(0x5C),
            136 => Ps1Reply::ack(0x5D),
            137 => Ps1Reply::last(self.commit(mcd, storage)),
            _ => Ps1Reply::last(0x00),
        }
    }

    fn commit<S: McdStorage>(&mut self, mcd: &mut MemoryCardSlot, storage: &mut S) -> u8 {
        if !mcd.good_sector {
            log::warn!("PS1 MCD write: sector 0x{:X} out of range", mcd.sector_addr);
            return WRITE_BAD_SECTOR;
        }

        if self.checksum != self.expected_checksum {
            log::warn!(
                "PS1 MCD write: checksum mismatch (expected 0x{:02X}, computed 0x{:02X})",
                self.expected_checksum,
                self.checksum
            );
            return WRITE_BAD_CHECKSUM;
        }

        mcd.write(storage, &self.buf);
        mcd.flag &= !FLAG_DIRECTORY_UNREAD;
        WRITE_GOOD
    }
}

impl Default for Ps1Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Ps1Transaction {
    type State = Ps1TransactionState;

    fn to_state(&self) -> Ps1TransactionState {
        Ps1TransactionState {
            current_byte: self.current_byte,
            sector_addr_msb: self.sector_addr_msb,
            sector_addr_lsb: self.sector_addr_lsb,
            checksum: self.checksum,
            expected_checksum: self.expected_checksum,
            prev_byte: self.prev_byte,
            buf: self.buf.to_vec(),
        }
    }

    fn restore_from_state(&mut self, state: &Ps1TransactionState) {
        self.current_byte = state.current_byte;
        self.sector_addr_msb = state.sector_addr_msb;
        self.sector_addr_lsb = state.sector_addr_lsb;
        self.checksum = state.checksum;
        self.expected_checksum = state.expected_checksum;
        self.prev_byte = state.prev_byte;
        self.buf = [0; PS1_SECTOR_SIZE];
        let len = state.buf.len().min(PS1_SECTOR_SIZE);
        self.buf[..len].copy_from_slice(&state.buf[..len]);
    }
}
