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

//! SIO2 controller
//!
//! SIO2 batches whole commands. The IOP fills a table of up to 16 SEND3
//! entries (port and command length each), then pushes command bytes into
//! DATA_IN either directly or through DMA channel 11. Once a command is
//! complete it is dispatched on its first byte, and the reply is queued for
//! DATA_OUT / DMA channel 12.
//!
//! # Register Map
//!
//! ```text
//! Address                 | Register
//! ------------------------|---------------------------------
//! 0x1F808200 - 0x1F80823C | SEND3[0..16]  port | length << 8
//! 0x1F808240 + 8n         | SEND1[n]
//! 0x1F808244 + 8n         | SEND2[n]
//! 0x1F808260              | DATA_IN  (byte write)
//! 0x1F808264              | DATA_OUT (byte read)
//! 0x1F808268              | CTRL
//! 0x1F80826C              | RECV1    (device presence)
//! 0x1F808270              | RECV2
//! 0x1F808274              | RECV3
//! 0x1F808278 / 0x1F80827C | unknown
//! 0x1F808280              | ISTAT
//! ```

use super::memcard::MemoryCardSlot;
use super::protocol::{McdCommand, McdTransaction};
use super::ps1::Ps1Command;
use super::storage::McdStorage;
use super::{sio_mode, SioDevices};
use crate::core::pad::PadPort;
use crate::core::save_state::{Sio2State, StateSave};
use std::collections::VecDeque;

/// SEND3 table size
pub const SEND3_ENTRIES: usize = 16;

/// SEND3 bit 0: physical port
pub const SEND3_PORT: u32 = 0x1;

/// SEND3 command length mask, after shifting right by 8
pub const SEND3_COMMAND_LENGTH_MASK: u32 = 0x1FF;

/// CTRL bit 0: start the queued transfer
pub const CTRL_START_TRANSFER: u32 = 0x1;

/// ISTAT bit set when a transfer was started
pub const ISTAT_TRANSFER: u32 = 0x1;

/// RECV1 values
pub mod recv1 {
    pub const CONNECTED: u32 = 0x0000_1100;
    pub const DISCONNECTED: u32 = 0x0001_D100;
}

/// Fixed RECV2 value
pub const RECV2_VALUE: u32 = 0xF;

/// Command and reply byte queues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sio2Fifo {
    /// Command bytes of the command being assembled
    pub input: VecDeque<u8>,

    /// Reply bytes waiting for DATA_OUT
    pub output: VecDeque<u8>,
}

impl Sio2Fifo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next command byte, 0x00 once the command is exhausted
    pub fn pop_input(&mut self) -> u8 {
        self.input.pop_front().unwrap_or_else(|| {
            log::trace!("SIO2: command shorter than expected, padding with 0x00");
            0x00
        })
    }

    /// Pad the reply queue up to `length` bytes
    pub fn pad_output(&mut self, length: usize, fill: u8) {
        if self.output.len() < length {
            self.output.resize(length, fill);
        }
    }

    pub fn clear(&mut self) {
        self.input.clear();
        self.output.clear();
    }
}

/// SIO2 controller
#[derive(Debug, Clone)]
pub struct Sio2 {
    ctrl: u32,
    send1: [u32; 4],
    send2: [u32; 4],
    send3: [u32; SEND3_ENTRIES],
    recv1: u32,
    recv2: u32,
    recv3: u32,
    unknown1: u32,
    unknown2: u32,
    istat: u32,

    port: usize,
    slot: usize,

    /// Whether the current SEND3 entry has been decoded
    send3_read: bool,
    send3_position: usize,
    command_length: usize,

    /// Nonzero while DMA channel 11 is feeding DATA_IN
    dma_block_size: usize,

    /// A zero-length SEND3 entry was reached
    send3_complete: bool,

    fifo: Sio2Fifo,
}

impl Sio2 {
    pub fn new() -> Self {
        Self {
            ctrl: 0,
            send1: [0; 4],
            send2: [0; 4],
            send3: [0; SEND3_ENTRIES],
            recv1: recv1::DISCONNECTED,
            recv2: RECV2_VALUE,
            recv3: 0,
            unknown1: 0,
            unknown2: 0,
            istat: 0,
            port: 0,
            slot: 0,
            send3_read: false,
            send3_position: 0,
            command_length: 0,
            dma_block_size: 0,
            send3_complete: false,
            fifo: Sio2Fifo::new(),
        }
    }

    /// Restart the SEND3 walk
    pub fn soft_reset(&mut self) {
        self.send3_read = false;
        self.send3_position = 0;
        self.command_length = 0;
        self.dma_block_size = 0;
        self.send3_complete = false;
        self.fifo.input.clear();
    }

    /// Power-on state
    pub fn full_reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn fifo(&self) -> &Sio2Fifo {
        &self.fifo
    }

    #[inline]
    pub fn port(&self) -> usize {
        self.port
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn command_length(&self) -> usize {
        self.command_length
    }

    #[inline]
    pub fn send3_position(&self) -> usize {
        self.send3_position
    }

    #[inline]
    pub fn is_send3_complete(&self) -> bool {
        self.send3_complete
    }

    pub fn read_send3(&self, index: usize) -> u32 {
        self.send3.get(index).copied().unwrap_or(0)
    }

    /// Write SEND3[index]
    ///
    /// Writing entry 0 starts a new command sequence.
    pub fn write_send3(&mut self, index: usize, value: u32) {
        if let Some(entry) = self.send3.get_mut(index) {
            *entry = value;
        }
        if index == 0 {
            self.soft_reset();
        }
    }

    pub fn read_send1(&self, index: usize) -> u32 {
        self.send1.get(index).copied().unwrap_or(0)
    }

    pub fn write_send1(&mut self, index: usize, value: u32) {
        if let Some(entry) = self.send1.get_mut(index) {
            *entry = value;
        }
    }

    pub fn read_send2(&self, index: usize) -> u32 {
        self.send2.get(index).copied().unwrap_or(0)
    }

    pub fn write_send2(&mut self, index: usize, value: u32) {
        if let Some(entry) = self.send2.get_mut(index) {
            *entry = value;
        }
    }

    #[inline]
    pub fn read_ctrl(&self) -> u32 {
        self.ctrl
    }

    /// Write CTRL
    ///
    /// Returns true when the write starts a transfer and the SIO2 interrupt
    /// must be raised.
    pub fn write_ctrl(&mut self, value: u32) -> bool {
        self.ctrl = value;
        if value & CTRL_START_TRANSFER != 0 {
            self.istat |= ISTAT_TRANSFER;
            return true;
        }
        false
    }

    #[inline]
    pub fn read_recv1(&self) -> u32 {
        self.recv1
    }

    #[inline]
    pub fn read_recv2(&self) -> u32 {
        self.recv2
    }

    #[inline]
    pub fn read_recv3(&self) -> u32 {
        self.recv3
    }

    pub fn read_unknown1(&self) -> u32 {
        self.unknown1
    }

    pub fn write_unknown1(&mut self, value: u32) {
        self.unknown1 = value;
    }

    pub fn read_unknown2(&self) -> u32 {
        self.unknown2
    }

    pub fn write_unknown2(&mut self, value: u32) {
        self.unknown2 = value;
    }

    #[inline]
    pub fn read_istat(&self) -> u32 {
        self.istat
    }

    pub fn write_istat(&mut self, value: u32) {
        self.istat = value;
    }

    /// Read DATA_OUT
    pub fn read_data_out(&mut self) -> u8 {
        match self.fifo.output.pop_front() {
            Some(value) => value,
            None => {
                log::warn!("SIO2: DATA_OUT read with empty fifo_out, returning 0xFF");
                0xFF
            }
        }
    }

    /// Set the DMA block size; 0 means direct DATA_IN writes
    pub fn set_dma_block_size(&mut self, size: usize) {
        self.dma_block_size = size;
    }

    /// Write DATA_IN
    pub fn write_data_in<S: McdStorage, P: PadPort>(
        &mut self,
        value: u8,
        devices: &mut SioDevices<S, P>,
    ) {
        if !self.send3_read {
            if self.send3_position >= SEND3_ENTRIES {
                log::warn!("SIO2: DATA_IN 0x{:02X} past the last SEND3 entry, ignored", value);
                return;
            }

            let send3 = self.send3[self.send3_position];
            self.port = (send3 & SEND3_PORT) as usize;
            self.command_length = ((send3 >> 8) & SEND3_COMMAND_LENGTH_MASK) as usize;
            self.send3_read = true;

            if self.command_length == 0 {
                log::trace!("SIO2: SEND3[{}] is empty, sequence complete", self.send3_position);
                self.send3_complete = true;
            }

            // Leftovers of the previous command never leak into this one
            self.fifo.input.clear();
        }

        if self.send3_complete {
            return;
        }

        self.fifo.input.push_back(value);

        let ready = if self.dma_block_size == 0 {
            self.fifo.input.len() == self.command_length
        } else {
            self.fifo.input.len() == self.dma_block_size
        };
        if !ready {
            return;
        }

        self.send3_read = false;
        self.send3_position += 1;
        self.dispatch(devices);

        if self.dma_block_size > 0 {
            let rem = self.fifo.output.len() % self.dma_block_size;
            if rem > 0 {
                let padded = self.fifo.output.len() + self.dma_block_size - rem;
                self.fifo.pad_output(padded, 0x00);
            }
        }
    }

    fn dispatch<S: McdStorage, P: PadPort>(&mut self, devices: &mut SioDevices<S, P>) {
        self.slot = devices.multitaps[self.port].current_slot();
        let base = self.fifo.output.len();
        let mode = self.fifo.input.front().copied().unwrap_or(0);

        log::trace!(
            "SIO2: command {:02X?} for port {} slot {}",
            self.fifo.input,
            self.port,
            self.slot
        );

        match mode {
            sio_mode::PAD => self.pad(devices),
            sio_mode::MULTITAP => self.multitap(devices, base),
            sio_mode::INFRARED => self.infrared(base),
            sio_mode::MEMCARD => self.memcard(devices, base),
            _ => {
                log::warn!("SIO2: unknown mode byte 0x{:02X}", mode);
                self.fifo.output.push_back(0x00);
                self.recv1 = recv1::DISCONNECTED;
            }
        }

        self.fifo.input.clear();
    }

    fn pad<S: McdStorage, P: PadPort>(&mut self, devices: &mut SioDevices<S, P>) {
        self.fifo.input.pop_front();
        let status = devices.pads.start_poll(self.port, self.slot);
        self.fifo.output.push_back(status);

        // Many titles refuse to poll again unless the pad always looks present
        self.recv1 = recv1::CONNECTED;

        while let Some(byte) = self.fifo.input.pop_front() {
            let reply = devices.pads.poll(byte);
            self.fifo.output.push_back(reply);
        }
    }

    fn multitap<S: McdStorage, P: PadPort>(&mut self, devices: &mut SioDevices<S, P>, base: usize) {
        self.fifo.input.pop_front();
        self.fifo.output.push_back(0x00);

        if devices.config.multitap_enabled(self.port) {
            self.recv1 = recv1::CONNECTED;
            devices.multitaps[self.port].execute(&mut self.fifo);
        } else {
            self.recv1 = recv1::DISCONNECTED;
            self.fifo.pad_output(base + self.command_length, 0x00);
        }
    }

    fn infrared(&mut self, base: usize) {
        self.recv1 = recv1::DISCONNECTED;
        self.fifo.input.pop_front();
        log::debug!("SIO2: infrared port is not emulated");
        self.fifo.pad_output(base + self.command_length, 0xFF);
    }

    fn memcard<S: McdStorage, P: PadPort>(&mut self, devices: &mut SioDevices<S, P>, base: usize) {
        let (port, slot) = (self.port, self.slot);
        let SioDevices {
            mcds,
            ps1,
            storage,
            ..
        } = devices;
        let mcd: &mut MemoryCardSlot = &mut mcds[port][slot];

        if mcd.consume_auto_eject() || !storage.is_present(port, slot) {
            self.recv1 = recv1::DISCONNECTED;
            let dead_air = self.fifo.input.len();
            self.fifo.pad_output(base + dead_air, 0x00);
            return;
        }

        self.recv1 = recv1::CONNECTED;
        self.fifo.input.pop_front();
        let command_byte = self.fifo.pop_input();
        let command = McdCommand::from_byte(command_byte);
        let is_psx = storage.is_psx(port, slot);

        self.fifo.output.push_back(0x00);
        self.fifo.output.push_back(mcd.flag);

        match command {
            Some(McdCommand::Ps1(Ps1Command::Pocketstation)) => {
                log::debug!("SIO2: Pocketstation probe, not connected");
                self.recv1 = recv1::DISCONNECTED;
                self.fifo.output.push_back(0x00);
            }
            Some(McdCommand::Ps1(ps1_command)) => {
                ps1.reset();
                while let Some(byte) = self.fifo.input.pop_front() {
                    let reply = ps1.step(ps1_command, mcd, storage, byte);
                    self.fifo.output.push_back(reply.data);
                }
                ps1.reset();
            }
            Some(_) if is_psx => {
                log::debug!(
                    "SIO2: PS2 command 0x{:02X} sent to a PS1 card in port {} slot {}",
                    command_byte,
                    port,
                    slot
                );
                self.fifo.pad_output(base + self.command_length, 0x00);
            }
            Some(command) => McdTransaction::new(mcd, storage, &mut self.fifo, base).execute(command),
            None => {
                log::warn!("SIO2: unknown memory card command 0x{:02X}", command_byte);
            }
        }
    }
}

impl Default for Sio2 {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Sio2 {
    type State = Sio2State;

    fn to_state(&self) -> Sio2State {
        Sio2State {
            ctrl: self.ctrl,
            send1: self.send1,
            send2: self.send2,
            send3: self.send3,
            recv1: self.recv1,
            recv2: self.recv2,
            recv3: self.recv3,
            unknown1: self.unknown1,
            unknown2: self.unknown2,
            istat: self.istat,
            port: self.port as u8,
            slot: self.slot as u8,
            send3_read: self.send3_read,
            send3_position: self.send3_position as u64,
            command_length: self.command_length as u64,
            dma_block_size: self.dma_block_size as u64,
            send3_complete: self.send3_complete,
            fifo_in: self.fifo.input.iter().copied().collect(),
            fifo_out: self.fifo.output.iter().copied().collect(),
        }
    }

    fn restore_from_state(&mut self, state: &Sio2State) {
        self.ctrl = state.ctrl;
        self.send1 = state.send1;
        self.send2 = state.send2;
        self.send3 = state.send3;
        self.recv1 = state.recv1;
        self.recv2 = state.recv2;
        self.recv3 = state.recv3;
        self.unknown1 = state.unknown1;
        self.unknown2 = state.unknown2;
        self.istat = state.istat;
        self.port = usize::from(state.port & 1);
        self.slot = usize::from(state.slot).min(super::SLOTS - 1);
        self.send3_read = state.send3_read;
        self.send3_position = state.send3_position as usize;
        self.command_length = state.command_length as usize;
        self.dma_block_size = state.dma_block_size as usize;
        self.send3_complete = state.send3_complete;
        self.fifo.input = state.fifo_in.iter().copied().collect();
        self.fifo.output = state.fifo_out.iter().copied().collect();
    }
}
