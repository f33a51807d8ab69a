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

//! SIO0 legacy controller/memory card interface
//!
//! One byte is exchanged per TX_DATA write. The first byte of a
//! transaction picks the device (pad or memory card), the second is the
//! command, and the rest are handled by the device until the BIOS clears
//! CTRL to end the transaction.
//!
//! # Register Map
//! - 0x1F801040: SIO0_DATA (TX on write, RX on read)
//! - 0x1F801044: SIO0_STAT (Status register)
//! - 0x1F801048: SIO0_MODE (Mode register)
//! - 0x1F80104A: SIO0_CTRL (Control register)
//! - 0x1F80104E: SIO0_BAUD (Baud rate)
//!
//! # Stages
//!
//! ```text
//! Idle --mode byte--> WaitingCommand --command--> Working
//!  ^                                                 |
//!  +------- CTRL = 0 / CTRL.RESET / bad byte --------+
//! ```

use super::ps1::Ps1Command;
use super::storage::McdStorage;
use super::{sio_mode, SioDevices};
use crate::core::pad::{is_pad_command, PadPort};
use crate::core::save_state::{Sio0State, StateSave};
use bitflags::bitflags;

bitflags! {
    /// SIO0_STAT bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sio0Stat: u32 {
        const TX_READY          = 1 << 0;
        const RX_FIFO_NOT_EMPTY = 1 << 1;
        const TX_EMPTY          = 1 << 2;
        const RX_PARITY_ERROR   = 1 << 3;
        const ACK               = 1 << 7;
        const IRQ               = 1 << 9;
    }
}

bitflags! {
    /// SIO0_CTRL bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Sio0Ctrl: u16 {
        const TX_ENABLE      = 1 << 0;
        const DTR            = 1 << 1;
        const RX_ENABLE      = 1 << 2;
        const ACK            = 1 << 4;
        const RESET          = 1 << 6;
        const TX_IRQ_ENABLE  = 1 << 10;
        const RX_IRQ_ENABLE  = 1 << 11;
        const ACK_IRQ_ENABLE = 1 << 12;
        const PORT           = 1 << 13;
    }
}

/// Transaction stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sio0Stage {
    Idle,
    WaitingCommand,
    Working,
}

impl Sio0Stage {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::WaitingCommand,
            2 => Self::Working,
            _ => Self::Idle,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::WaitingCommand => 1,
            Self::Working => 2,
        }
    }
}

/// Device selected by the transaction's first byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sio0Mode {
    NotSet,
    Pad,
    Memcard,
}

impl Sio0Mode {
    fn from_u8(value: u8) -> Self {
        match value {
            sio_mode::PAD => Self::Pad,
            sio_mode::MEMCARD => Self::Memcard,
            _ => Self::NotSet,
        }
    }

    fn to_u8(self) -> u8 {
        match self {
            Self::NotSet => 0,
            Self::Pad => sio_mode::PAD,
            Self::Memcard => sio_mode::MEMCARD,
        }
    }
}

/// SIO0 controller
#[derive(Debug, Clone)]
pub struct Sio0 {
    /// SIO0_STAT (0x1F801044)
    stat: Sio0Stat,

    /// SIO0_CTRL (0x1F80104A)
    ctrl: Sio0Ctrl,

    /// SIO0_MODE (0x1F801048)
    mode: u16,

    /// SIO0_BAUD (0x1F80104E)
    baud: u16,

    stage: Sio0Stage,
    sio_mode: Sio0Mode,

    /// Command byte latched in WaitingCommand
    command: u8,

    tx_data: u8,
    rx_data: u8,

    port: usize,
    slot: usize,
}

impl Sio0 {
    pub fn new() -> Self {
        Self {
            stat: Sio0Stat::TX_READY | Sio0Stat::TX_EMPTY,
            ctrl: Sio0Ctrl::empty(),
            mode: 0,
            baud: 0,
            stage: Sio0Stage::Idle,
            sio_mode: Sio0Mode::NotSet,
            command: 0,
            tx_data: 0,
            rx_data: 0,
            port: 0,
            slot: 0,
        }
    }

    /// Return to Idle, keeping registers
    pub fn soft_reset(&mut self) {
        self.stage = Sio0Stage::Idle;
        self.sio_mode = Sio0Mode::NotSet;
        self.command = 0;
    }

    /// Power-on state
    pub fn full_reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    pub fn stage(&self) -> Sio0Stage {
        self.stage
    }

    #[inline]
    pub fn port(&self) -> usize {
        self.port
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Status register without the read side effect
    #[inline]
    pub fn peek_stat(&self) -> Sio0Stat {
        self.stat
    }

    /// Read SIO0_STAT (0x1F801044)
    ///
    /// Reading acknowledges the device ACK.
    pub fn read_stat(&mut self) -> u32 {
        let value = self.stat.bits();
        self.stat.remove(Sio0Stat::ACK);
        value
    }

    /// Read RX_DATA (0x1F801040)
    pub fn read_rx_data(&mut self) -> u8 {
        self.stat.remove(Sio0Stat::RX_FIFO_NOT_EMPTY);
        self.rx_data
    }

    /// Write TX_DATA (0x1F801040)
    ///
    /// Steps the transaction by one byte. The reply lands in RX_DATA.
    pub fn write_tx_data<S: McdStorage, P: PadPort>(
        &mut self,
        value: u8,
        devices: &mut SioDevices<S, P>,
    ) {
        self.stat.insert(Sio0Stat::TX_READY | Sio0Stat::TX_EMPTY);

        // Nothing is shifted in, so RX keeps its old byte and stays empty
        if !self.ctrl.contains(Sio0Ctrl::TX_ENABLE) {
            log::warn!(
                "SIO0 TX 0x{:02X} with CTRL 0x{:04X}: transmitter disabled, ignored",
                value,
                self.ctrl.bits()
            );
            return;
        }

        self.stat.insert(Sio0Stat::RX_FIFO_NOT_EMPTY);

        self.tx_data = value;
        let reply = match self.stage {
            Sio0Stage::Idle => self.select_device(value, devices),
            Sio0Stage::WaitingCommand => self.latch_command(value, devices),
            Sio0Stage::Working => self.work(value, devices),
        };

        log::trace!(
            "SIO0 TX 0x{:02X} -> RX 0x{:02X} (stage {:?}, stat 0x{:03X})",
            value,
            reply,
            self.stage,
            self.stat.bits()
        );
        self.rx_data = reply;
    }

    fn select_device<S: McdStorage, P: PadPort>(
        &mut self,
        value: u8,
        devices: &mut SioDevices<S, P>,
    ) -> u8 {
        self.slot = devices.multitaps[self.port].current_slot();

        match value {
            sio_mode::PAD => {
                self.sio_mode = Sio0Mode::Pad;
                let reply = devices.pads.start_poll(self.port, self.slot);
                if reply != 0 {
                    self.stat.insert(Sio0Stat::ACK);
                }
                self.stage = Sio0Stage::WaitingCommand;
                reply
            }
            sio_mode::MEMCARD => {
                self.sio_mode = Sio0Mode::Memcard;
                let (port, slot) = (self.port, self.slot);

                if devices.mcds[port][slot].consume_auto_eject() {
                    return 0x00;
                }

                if !devices.storage.is_present(port, slot) || !devices.storage.is_psx(port, slot) {
                    log::trace!("SIO0: no PS1 card in port {} slot {}", port, slot);
                    return 0x00;
                }

                self.stat.insert(Sio0Stat::ACK);
                self.stage = Sio0Stage::WaitingCommand;
                0x00
            }
            _ => {
                log::warn!("SIO0: unknown device select byte 0x{:02X}", value);
                self.soft_reset();
                0xFF
            }
        }
    }

    fn latch_command<S: McdStorage, P: PadPort>(
        &mut self,
        value: u8,
        devices: &mut SioDevices<S, P>,
    ) -> u8 {
        match self.sio_mode {
            Sio0Mode::Pad if is_pad_command(value) => {
                self.command = value;
                let reply = devices.pads.poll(value);
                if !devices.pads.is_complete() {
                    self.stat.insert(Sio0Stat::ACK);
                }
                self.stage = Sio0Stage::Working;
                reply
            }
            Sio0Mode::Memcard => match Ps1Command::from_byte(value) {
                Some(Ps1Command::Pocketstation) => {
                    log::debug!("SIO0: Pocketstation probe, not connected");
                    self.soft_reset();
                    0x00
                }
                Some(command) => {
                    log::debug!("SIO0: PS1 memory card {:?}", command);
                    self.command = value;
                    self.stat.insert(Sio0Stat::ACK);
                    self.stage = Sio0Stage::Working;
                    devices.mcds[self.port][self.slot].flag
                }
                None => {
                    log::warn!("SIO0: unknown memory card command 0x{:02X}", value);
                    self.soft_reset();
                    0xFF
                }
            },
            _ => {
                log::warn!(
                    "SIO0: unexpected command 0x{:02X} for {:?}",
                    value,
                    self.sio_mode
                );
                self.soft_reset();
                0xFF
            }
        }
    }

    fn work<S: McdStorage, P: PadPort>(&mut self, value: u8, devices: &mut SioDevices<S, P>) -> u8 {
        match self.sio_mode {
            Sio0Mode::Pad => {
                let reply = devices.pads.poll(value);
                if !devices.pads.is_complete() {
                    self.stat.insert(Sio0Stat::ACK);
                }
                reply
            }
            Sio0Mode::Memcard => {
                let Some(command) = Ps1Command::from_byte(self.command) else {
                    self.soft_reset();
                    return 0xFF;
                };

                let mcd = &mut devices.mcds[self.port][self.slot];
                let reply = devices.ps1.step(command, mcd, &mut devices.storage, value);
                if reply.ack {
                    self.stat.insert(Sio0Stat::ACK);
                }
                reply.data
            }
            Sio0Mode::NotSet => {
                self.soft_reset();
                0xFF
            }
        }
    }

    /// Read SIO0_CTRL (0x1F80104A)
    #[inline]
    pub fn read_ctrl(&self) -> u16 {
        self.ctrl.bits()
    }

    /// Write SIO0_CTRL (0x1F80104A)
    ///
    /// Returns true when the write ended the transaction, so the caller can
    /// drop any PS1 state with it.
    pub fn write_ctrl(&mut self, value: u16) -> bool {
        self.ctrl = Sio0Ctrl::from_bits_retain(value);
        self.port = usize::from(self.ctrl.contains(Sio0Ctrl::PORT));

        let mut ended = false;

        // The BIOS clears CTRL between transactions
        if value == 0 {
            self.soft_reset();
            ended = true;
        }

        if self.ctrl.contains(Sio0Ctrl::ACK) {
            self.stat
                .remove(Sio0Stat::IRQ | Sio0Stat::ACK | Sio0Stat::RX_PARITY_ERROR);
        }

        if self.ctrl.contains(Sio0Ctrl::RESET) {
            log::debug!("SIO0: reset");
            self.full_reset();
            ended = true;
        }

        ended
    }

    /// Latch the transfer interrupt in STAT
    pub fn raise_irq(&mut self) {
        self.stat.insert(Sio0Stat::IRQ);
    }

    /// Read SIO0_MODE (0x1F801048)
    #[inline]
    pub fn read_mode(&self) -> u16 {
        self.mode
    }

    /// Write SIO0_MODE (0x1F801048)
    #[inline]
    pub fn write_mode(&mut self, value: u16) {
        self.mode = value;
    }

    /// Read SIO0_BAUD (0x1F80104E)
    #[inline]
    pub fn read_baud(&self) -> u16 {
        self.baud
    }

    /// Write SIO0_BAUD (0x1F80104E)
    #[inline]
    pub fn write_baud(&mut self, value: u16) {
        self.baud = value;
    }
}

impl Default for Sio0 {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Sio0 {
    type State = Sio0State;

    fn to_state(&self) -> Sio0State {
        Sio0State {
            stat: self.stat.bits(),
            ctrl: self.ctrl.bits(),
            mode: self.mode,
            baud: self.baud,
            stage: self.stage.to_u8(),
            sio_mode: self.sio_mode.to_u8(),
            command: self.command,
            tx_data: self.tx_data,
            rx_data: self.rx_data,
            port: self.port as u8,
            slot: self.slot as u8,
        }
    }

    fn restore_from_state(&mut self, state: &Sio0State) {
        self.stat = Sio0Stat::from_bits_retain(state.stat);
        self.ctrl = Sio0Ctrl::from_bits_retain(state.ctrl);
        self.mode = state.mode;
        self.baud = state.baud;
        self.stage = Sio0Stage::from_u8(state.stage);
        self.sio_mode = Sio0Mode::from_u8(state.sio_mode);
        self.command = state.command;
        self.tx_data = state.tx_data;
        self.rx_data = state.rx_data;
        self.port = usize::from(state.port & 1);
        self.slot = usize::from(state.slot).min(super::SLOTS - 1);
    }
}
