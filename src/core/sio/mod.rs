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

//! IOP serial I/O (SIO0 / SIO2)
//!
//! The PS2 reaches pads, memory cards and multitaps through two
//! controllers sharing the same devices:
//!
//! - **SIO0**: the PS1-compatible controller, one byte per register write.
//!   Used by PS1 software and the BIOS for PS1 memory cards.
//! - **SIO2**: the PS2 controller, which assembles whole commands from a
//!   SEND3 table and FIFOs, optionally fed by DMA.
//!
//! [`SioContext`] owns both controllers, the per-slot memory card state,
//! the multitaps, the pads, the card storage and the IOP interrupt lines
//! they drive. The VM owns one context and forwards register accesses to
//! [`SioContext::read32`] / [`SioContext::write32`] and friends.
//!
//! # Example
//!
//! ```
//! use ps2rx::core::sio::{SioContext, storage::MemoryCardImage};
//!
//! let mut sio = SioContext::new();
//! sio.storage_mut().insert(0, 0, MemoryCardImage::new_ps2()).unwrap();
//!
//! // One 5-byte command on port 0: GetTerminator
//! sio.write32(0x1F808200, 0x0000_0500).unwrap();
//! for byte in [0x81, 0x28, 0x00, 0x00, 0x00] {
//!     sio.write8(0x1F808260, byte).unwrap();
//! }
//!
//! let reply: Vec<u8> = (0..5).map(|_| sio.read8(0x1F808264).unwrap()).collect();
//! assert_eq!(reply, [0x00, 0x08, 0x2B, 0x55, 0x55]);
//! ```

pub mod auto_eject;
pub mod io_ports;
pub mod memcard;
pub mod multitap;
pub mod protocol;
pub mod ps1;
pub mod sio0;
pub mod sio2;
pub mod storage;

use crate::core::config::SioConfig;
use crate::core::error::Result;
use crate::core::interrupt::{interrupts, InterruptController};
use crate::core::pad::{PadPort, PadPorts};
use crate::core::save_state::{
    PadState, SaveStateMetadata, Section, SioSaveState, StateSave, SAVE_STATE_VERSION, SIO0_TAG,
    SIO2_TAG,
};
use crate::core::timing::{EventHandle, TickCount, TimingEventManager};

use auto_eject::AutoEject;
use memcard::MemoryCardSlot;
use multitap::MultitapPort;
use ps1::Ps1Transaction;
use sio0::{Sio0, Sio0Ctrl};
use sio2::Sio2;
use storage::{CardBank, McdStorage};

/// Physical ports
pub const PORTS: usize = 2;

/// Logical slots per port (reachable through a multitap)
pub const SLOTS: usize = 4;

/// IOP clock
pub const IOP_CLOCK_HZ: i32 = 36_864_000;

/// SIO0 shift clock
pub const SIO0_BAUD_HZ: i32 = 250_000;

/// IOP cycles between a TX write and the SIO0 interrupt
pub const SIO0_IRQ_DELAY: TickCount = IOP_CLOCK_HZ / SIO0_BAUD_HZ;

/// Transaction mode bytes (first byte of every transfer)
pub mod sio_mode {
    pub const PAD: u8 = 0x01;
    pub const MULTITAP: u8 = 0x21;
    pub const INFRARED: u8 = 0x61;
    pub const MEMCARD: u8 = 0x81;
}

/// Devices reachable from both controllers
#[derive(Debug, Clone)]
pub struct SioDevices<S, P> {
    pub mcds: [[MemoryCardSlot; SLOTS]; PORTS],
    pub multitaps: [MultitapPort; PORTS],
    pub ps1: Ps1Transaction,
    pub storage: S,
    pub pads: P,
    pub config: SioConfig,
}

impl<S, P> SioDevices<S, P> {
    fn new(config: SioConfig, storage: S, pads: P) -> Self {
        Self {
            mcds: std::array::from_fn(|port| {
                std::array::from_fn(|slot| MemoryCardSlot::new(port, slot))
            }),
            multitaps: [MultitapPort::new(); PORTS],
            ps1: Ps1Transaction::new(),
            storage,
            pads,
            config,
        }
    }

    fn reset(&mut self) {
        for mcd in self.mcds.iter_mut().flatten() {
            mcd.reset();
        }
        for multitap in &mut self.multitaps {
            multitap.reset();
        }
        self.ps1.reset();
    }
}

/// Serial I/O subsystem of one virtual machine
pub struct SioContext<S = CardBank, P = PadPorts> {
    sio0: Sio0,
    sio2: Sio2,
    devices: SioDevices<S, P>,
    intc: InterruptController,
    timing: TimingEventManager,
    sio0_event: EventHandle,
}

impl SioContext {
    /// Context with default config, no cards, and a pad in port 0
    pub fn new() -> Self {
        let config = SioConfig::default();
        let pads = PadPorts::new(config.pads);
        Self::with_parts(config, CardBank::new(), pads)
    }

    /// Context with the given config, no cards inserted
    pub fn with_config(config: SioConfig) -> Self {
        let pads = PadPorts::new(config.pads);
        Self::with_parts(config, CardBank::new(), pads)
    }
}

impl Default for SioContext {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: McdStorage, P: PadPort> SioContext<S, P> {
    /// Context over caller-provided storage and pads
    pub fn with_parts(config: SioConfig, storage: S, pads: P) -> Self {
        let mut timing = TimingEventManager::new();
        let sio0_event = timing.register_event("SIO0 IRQ");

        Self {
            sio0: Sio0::new(),
            sio2: Sio2::new(),
            devices: SioDevices::new(config, storage, pads),
            intc: InterruptController::new(),
            timing,
            sio0_event,
        }
    }

    /// VM reset
    ///
    /// Controllers, slots and multitaps return to power-on state. Storage,
    /// pads and config are left alone.
    pub fn reset(&mut self) {
        self.sio0.full_reset();
        self.sio2.full_reset();
        self.devices.reset();
        self.intc.reset();
        self.timing.reset();
        log::debug!("SIO: reset");
    }

    /// Advance time by `cycles` IOP cycles, firing due interrupts
    pub fn tick(&mut self, cycles: TickCount) {
        self.timing.add_pending_ticks(cycles);
        for handle in self.timing.run_events() {
            if handle == self.sio0_event {
                self.sio0.raise_irq();
                self.intc.request(interrupts::SIO0);
            }
        }
    }

    /// SIO0 TX_DATA write
    pub(crate) fn sio0_write_tx(&mut self, value: u8) {
        self.sio0.write_tx_data(value, &mut self.devices);
        self.timing.schedule(self.sio0_event, SIO0_IRQ_DELAY);
    }

    /// SIO0 CTRL write
    pub(crate) fn sio0_write_ctrl(&mut self, value: u16) {
        if self.sio0.write_ctrl(value) {
            self.devices.ps1.reset();
        }
        // A reset drops the byte in flight along with its interrupt
        if Sio0Ctrl::from_bits_retain(value).contains(Sio0Ctrl::RESET) {
            self.timing.deactivate(self.sio0_event);
        }
    }

    /// SIO2 DATA_IN write
    pub(crate) fn sio2_write_data_in(&mut self, value: u8) {
        self.sio2.write_data_in(value, &mut self.devices);
    }

    /// SIO2 CTRL write
    pub(crate) fn sio2_write_ctrl(&mut self, value: u32) {
        if self.sio2.write_ctrl(value) {
            self.intc.request(interrupts::SIO2);
        }
    }

    /// DMA channel 11: feed command bytes into DATA_IN in `block_size` blocks
    pub fn dma_write(&mut self, data: &[u8], block_size: usize) {
        log::trace!("SIO2 DMA write: {} bytes, block size {}", data.len(), block_size);
        self.sio2.set_dma_block_size(block_size);
        for &byte in data {
            self.sio2_write_data_in(byte);
        }
    }

    /// DMA channel 12: drain `len` reply bytes from DATA_OUT
    pub fn dma_read(&mut self, len: usize) -> Vec<u8> {
        (0..len).map(|_| self.sio2.read_data_out()).collect()
    }

    /// Auto-eject control
    pub fn auto_eject(&mut self) -> AutoEject<'_> {
        let enabled = self.devices.config.mcd_enable_ejection;
        AutoEject::new(&mut self.devices.mcds, enabled)
    }

    #[inline]
    pub fn sio0(&self) -> &Sio0 {
        &self.sio0
    }

    #[inline]
    pub fn sio2(&self) -> &Sio2 {
        &self.sio2
    }

    #[inline]
    pub fn config(&self) -> &SioConfig {
        &self.devices.config
    }

    /// Replace the configuration
    pub fn set_config(&mut self, config: SioConfig) {
        self.devices.config = config;
    }

    #[inline]
    pub fn interrupts(&self) -> &InterruptController {
        &self.intc
    }

    #[inline]
    pub fn interrupts_mut(&mut self) -> &mut InterruptController {
        &mut self.intc
    }

    #[inline]
    pub fn storage(&self) -> &S {
        &self.devices.storage
    }

    #[inline]
    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.devices.storage
    }

    #[inline]
    pub fn pads(&self) -> &P {
        &self.devices.pads
    }

    #[inline]
    pub fn pads_mut(&mut self) -> &mut P {
        &mut self.devices.pads
    }

    /// Memory card slot state at (port, slot)
    pub fn memory_card(&self, port: usize, slot: usize) -> Option<&MemoryCardSlot> {
        self.devices.mcds.get(port)?.get(slot)
    }

    /// Multitap slot currently addressed on `port`
    pub fn multitap_slot(&self, port: usize) -> Option<usize> {
        self.devices.multitaps.get(port).map(MultitapPort::current_slot)
    }

    fn card_crcs(&self) -> [[u64; SLOTS]; PORTS] {
        std::array::from_fn(|port| {
            std::array::from_fn(|slot| self.devices.storage.crc(port, slot))
        })
    }
}

impl<S, P> SioContext<S, P>
where
    S: McdStorage,
    P: PadPort + StateSave<State = Vec<PadState>>,
{
    /// Capture the whole subsystem
    pub fn save_state(&self) -> SioSaveState {
        SioSaveState {
            version: SAVE_STATE_VERSION,
            metadata: SaveStateMetadata::default(),
            sio0: Section::new(SIO0_TAG, self.sio0.to_state()),
            sio2: Section::new(SIO2_TAG, self.sio2.to_state()),
            ps1: self.devices.ps1.to_state(),
            multitap_slots: std::array::from_fn(|port| {
                self.devices.multitaps[port].current_slot() as u8
            }),
            pads: self.devices.pads.to_state(),
            pending_events: self.timing.pending_events(),
            mcd_crcs: self.card_crcs(),
        }
    }

    /// Restore a captured state
    ///
    /// If any card no longer matches the CRC recorded in the state, every
    /// card is auto-ejected so the guest rereads it.
    pub fn load_state(&mut self, state: &SioSaveState) -> Result<()> {
        let sio0 = state.sio0.expect_tag(SIO0_TAG)?;
        let sio2 = state.sio2.expect_tag(SIO2_TAG)?;

        self.sio0.restore_from_state(sio0);
        self.sio2.restore_from_state(sio2);
        self.devices.ps1.restore_from_state(&state.ps1);
        for (multitap, &slot) in self.devices.multitaps.iter_mut().zip(&state.multitap_slots) {
            multitap.set_current_slot(usize::from(slot));
        }
        self.devices.pads.restore_from_state(&state.pads);
        self.timing.restore_pending(&state.pending_events);

        let current = self.card_crcs();
        if current != state.mcd_crcs {
            log::info!("SIO: memory cards changed since the state was saved, auto-ejecting");
            self.auto_eject().set_all();
        }

        log::debug!("SIO: state loaded (saved {})", state.metadata.timestamp);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
