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

//! PS2 memory card command protocol
//!
//! Every PS2-native command runs over the SIO2 FIFOs: the command bytes sit
//! in `fifo_in`, and the reply is built in `fifo_out` one byte per input
//! byte. A reply always starts with the preamble `00 FLAG` (answering the
//! mode and command bytes) and most end with `2B term`.
//!
//! # Reply shapes
//!
//! ```text
//! Command            | Reply (after preamble)                  | Frame
//! -------------------|-----------------------------------------|------
//! Probe (0x11)       | 2B term                                 | 4
//! SetSector (0x2x)   | 00 00 00 00 00 2B term                  | 9
//! GetSpecs (0x26)    | 2B ss ss eb eb cc cc cc cc xor term     | 13
//! SetTerm (0x27)     | 00 2B old                               | 5
//! GetTerm (0x28)     | 2B term 55                              | 5
//! WriteData (0x42)   | 00 2B 00×len xor term                   | len+6
//! ReadData (0x43)    | 00 2B data×len xor term                 | len+6
//! ```
//!
//! Frame lengths count from the start of the preamble, so several
//! commands queued in one SEND3 chain each get their own frame.

use super::memcard::MemoryCardSlot;
use super::ps1::Ps1Command;
use super::sio2::Sio2Fifo;
use super::storage::McdStorage;

/// Memory card command bytes
pub mod commands {
    pub const PROBE: u8 = 0x11;
    pub const UNKNOWN_WRITE_DELETE_END: u8 = 0x12;
    pub const SET_ERASE_SECTOR: u8 = 0x21;
    pub const SET_WRITE_SECTOR: u8 = 0x22;
    pub const SET_READ_SECTOR: u8 = 0x23;
    pub const GET_SPECS: u8 = 0x26;
    pub const SET_TERMINATOR: u8 = 0x27;
    pub const GET_TERMINATOR: u8 = 0x28;
    pub const WRITE_DATA: u8 = 0x42;
    pub const READ_DATA: u8 = 0x43;
    pub const PS1_READ: u8 = 0x52;
    pub const PS1_STATE: u8 = 0x53;
    pub const PS1_WRITE: u8 = 0x57;
    pub const PS1_POCKETSTATION: u8 = 0x58;
    pub const READ_WRITE_END: u8 = 0x81;
    pub const ERASE_BLOCK: u8 = 0x82;
    pub const UNKNOWN_BOOT: u8 = 0xBF;
    pub const AUTH_XOR: u8 = 0xF0;
    pub const AUTH_F3: u8 = 0xF3;
    pub const AUTH_F7: u8 = 0xF7;
}

/// Decoded memory card command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McdCommand {
    Probe,
    UnknownWriteDeleteEnd,
    SetSector,
    GetSpecs,
    SetTerminator,
    GetTerminator,
    WriteData,
    ReadData,
    Ps1(Ps1Command),
    ReadWriteEnd,
    EraseBlock,
    UnknownBoot,
    AuthXor,
    AuthF3,
    AuthF7,
}

impl McdCommand {
    /// Decode a command byte
    pub fn from_byte(value: u8) -> Option<Self> {
        use commands::*;

        let command = match value {
            PROBE => Self::Probe,
            UNKNOWN_WRITE_DELETE_END => Self::UnknownWriteDeleteEnd,
            SET_ERASE_SECTOR | SET_WRITE_SECTOR | SET_READ_SECTOR => Self::SetSector,
            GET_SPECS => Self::GetSpecs,
            SET_TERMINATOR => Self::SetTerminator,
            GET_TERMINATOR => Self::GetTerminator,
            WRITE_DATA => Self::WriteData,
            READ_DATA => Self::ReadData,
            READ_WRITE_END => Self::ReadWriteEnd,
            ERASE_BLOCK => Self::EraseBlock,
            UNKNOWN_BOOT => Self::UnknownBoot,
            AUTH_XOR => Self::AuthXor,
            AUTH_F3 => Self::AuthF3,
            AUTH_F7 => Self::AuthF7,
            _ => Self::Ps1(Ps1Command::from_byte(value)?),
        };
        Some(command)
    }
}

/// Auth sub-modes answered with a long frame carrying the payload XOR
const AUTH_LONG_XOR: [u8; 6] = [0x01, 0x02, 0x04, 0x0F, 0x11, 0x13];

/// Auth sub-modes answered with a short frame
const AUTH_SHORT: [u8; 12] = [
    0x00, 0x03, 0x05, 0x08, 0x09, 0x0A, 0x0C, 0x0D, 0x0E, 0x10, 0x12, 0x14,
];

/// Auth sub-modes answered with a long frame, payload discarded
const AUTH_LONG: [u8; 3] = [0x06, 0x07, 0x0B];

/// One PS2 memory card command in flight
///
/// Borrows the addressed slot, the storage and the FIFOs for the length of
/// a single SIO2 command.
pub struct McdTransaction<'a, S> {
    mcd: &'a mut MemoryCardSlot,
    storage: &'a mut S,
    fifo: &'a mut Sio2Fifo,
    base: usize,
}

impl<'a, S: McdStorage> McdTransaction<'a, S> {
    /// Continue the frame that started at `fifo_out[base]`
    ///
    /// The `00 FLAG` preamble is expected to be queued already.
    pub fn new(
        mcd: &'a mut MemoryCardSlot,
        storage: &'a mut S,
        fifo: &'a mut Sio2Fifo,
        base: usize,
    ) -> Self {
        Self {
            mcd,
            storage,
            fifo,
            base,
        }
    }

    /// Zero-pad the frame to `length` bytes
    pub fn pad_frame(&mut self, length: usize, fill: u8) {
        self.fifo.pad_output(self.base + length, fill);
    }

    /// Run a PS2-native command
    ///
    /// PS1 commands are positional and driven by the caller instead.
    pub fn execute(&mut self, command: McdCommand) {
        log::debug!(
            "MCD port {} slot {}: {:?}",
            self.mcd.port,
            self.mcd.slot,
            command
        );

        match command {
            McdCommand::Probe => self.probe(),
            McdCommand::UnknownWriteDeleteEnd => self.unknown_write_delete_end(),
            McdCommand::SetSector => self.set_sector(),
            McdCommand::GetSpecs => self.get_specs(),
            McdCommand::SetTerminator => self.set_terminator(),
            McdCommand::GetTerminator => self.get_terminator(),
            McdCommand::WriteData => self.write_data(),
            McdCommand::ReadData => self.read_data(),
            McdCommand::ReadWriteEnd => self.read_write_end(),
            McdCommand::EraseBlock => self.erase_block(),
            McdCommand::UnknownBoot => self.unknown_boot(),
            McdCommand::AuthXor => self.auth_xor(),
            McdCommand::AuthF3 => self.auth_f3(),
            McdCommand::AuthF7 => self.auth_f7(),
            McdCommand::Ps1(ps1) => {
                log::warn!("MCD: {:?} is not a PS2 command", ps1);
            }
        }
    }

    /// Pad to `length - 2`, then `2B term`
    fn two_b_terminator(&mut self, length: usize) {
        self.pad_frame(length.saturating_sub(2), 0x00);
        self.fifo.output.push_back(0x2B);
        self.fifo.output.push_back(self.mcd.term);
    }

    pub fn probe(&mut self) {
        self.two_b_terminator(4);
    }

    pub fn unknown_write_delete_end(&mut self) {
        self.two_b_terminator(4);
    }

    /// Latch the sector address for the next erase/read/write
    pub fn set_sector(&mut self) {
        let bytes = [
            self.fifo.pop_input(),
            self.fifo.pop_input(),
            self.fifo.pop_input(),
            self.fifo.pop_input(),
        ];
        let expected = self.fifo.pop_input();
        let computed = bytes.iter().fold(0u8, |acc, b| acc ^ b);
        let sector = u32::from_le_bytes(bytes);

        let good = computed == expected;
        if !good {
            log::warn!(
                "MCD SetSector: checksum mismatch for sector 0x{:08X} (expected 0x{:02X}, computed 0x{:02X})",
                sector,
                expected,
                computed
            );
        }

        self.mcd.set_sector(&*self.storage, sector, good);
        log::trace!(
            "MCD SetSector: sector 0x{:08X} -> transfer addr 0x{:08X}",
            sector,
            self.mcd.transfer_addr
        );
        self.two_b_terminator(9);
    }

    pub fn get_specs(&mut self) {
        let info = self.storage.size_info(self.mcd.port, self.mcd.slot);

        let out = &mut self.fifo.output;
        out.push_back(0x2B);
        out.extend(info.sector_size.to_le_bytes());
        out.extend(info.erase_block_size_in_sectors.to_le_bytes());
        out.extend(info.mc_size_in_sectors.to_le_bytes());
        out.push_back(info.xor);
        out.push_back(self.mcd.term);
    }

    pub fn set_terminator(&mut self) {
        let old = self.mcd.term;
        self.mcd.term = self.fifo.pop_input();

        self.fifo.output.push_back(0x00);
        self.fifo.output.push_back(0x2B);
        self.fifo.output.push_back(old);
    }

    pub fn get_terminator(&mut self) {
        self.fifo.output.push_back(0x2B);
        self.fifo.output.push_back(self.mcd.term);
        self.fifo.output.push_back(0x55);
    }

    pub fn write_data(&mut self) {
        self.fifo.output.push_back(0x00);
        self.fifo.output.push_back(0x2B);

        let length = usize::from(self.fifo.pop_input());
        let mut buf = Vec::with_capacity(length);
        let mut checksum = 0u8;
        for _ in 0..length {
            let byte = self.fifo.pop_input();
            checksum ^= byte;
            buf.push(byte);
            self.fifo.output.push_back(0x00);
        }

        self.mcd.write(&mut *self.storage, &buf);
        self.fifo.output.push_back(checksum);
        self.fifo.output.push_back(self.mcd.term);
    }

    pub fn read_data(&mut self) {
        self.fifo.output.push_back(0x00);
        self.fifo.output.push_back(0x2B);

        let length = usize::from(self.fifo.pop_input());
        let mut buf = vec![0u8; length];
        self.mcd.read(&mut *self.storage, &mut buf);

        let checksum = buf.iter().fold(0u8, |acc, b| acc ^ b);
        self.fifo.output.extend(buf);
        self.fifo.output.push_back(checksum);
        self.fifo.output.push_back(self.mcd.term);
    }

    pub fn read_write_end(&mut self) {
        self.two_b_terminator(4);
    }

    pub fn erase_block(&mut self) {
        self.mcd.erase_block(&mut *self.storage);
        self.two_b_terminator(4);
    }

    pub fn unknown_boot(&mut self) {
        self.two_b_terminator(5);
    }

    /// Authentication handshake
    ///
    /// Only the frame shapes are reproduced; the XOR answers whatever the
    /// guest sent.
    pub fn auth_xor(&mut self) {
        let mode = self.fifo.pop_input();

        if AUTH_LONG_XOR.contains(&mode) {
            self.fifo.output.push_back(0x00);
            self.fifo.output.push_back(0x2B);

            let mut xor = 0u8;
            for _ in 0..8 {
                xor ^= self.fifo.pop_input();
                self.fifo.output.push_back(0x00);
            }

            self.fifo.output.push_back(xor);
            self.fifo.output.push_back(self.mcd.term);
        } else if AUTH_SHORT.contains(&mode) {
            self.fifo.output.push_back(0x00);
            self.fifo.output.push_back(0x2B);
            self.fifo.output.push_back(self.mcd.term);
        } else if AUTH_LONG.contains(&mode) {
            self.two_b_terminator(14);
        } else {
            log::warn!("MCD AuthXor: unknown sub-mode 0x{:02X}", mode);
        }
    }

    pub fn auth_f3(&mut self) {
        self.two_b_terminator(5);
    }

    pub fn auth_f7(&mut self) {
        self.two_b_terminator(5);
    }
}
