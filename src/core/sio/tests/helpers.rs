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

//! Test helpers for SIO tests

use super::super::io_ports::{SIO0_CTRL, SIO0_DATA, SIO0_STAT, SIO2_DATA_IN, SIO2_DATA_OUT, SIO2_SEND3};
use super::super::sio0::{Sio0Ctrl, Sio0Stat};
use super::super::storage::{CardBank, McdSizeInfo, McdStorage, MemoryCardImage, PS1_CARD_SIZE};
use super::super::SioContext;
use crate::core::config::SioConfig;
use crate::core::pad::PadPorts;

/// Sector count of the small PS2 cards used in tests
pub const TEST_PS2_SECTORS: u32 = 64;

/// One `save` call seen by [`RecordingStorage`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveCall {
    pub port: usize,
    pub slot: usize,
    pub addr: u32,
    pub data: Vec<u8>,
}

/// Storage that records every access before delegating to a [`CardBank`]
#[derive(Debug, Default)]
pub struct RecordingStorage {
    pub bank: CardBank,
    pub saves: Vec<SaveCall>,
    pub reads: usize,
    pub erases: usize,
}

impl McdStorage for RecordingStorage {
    fn is_present(&self, port: usize, slot: usize) -> bool {
        self.bank.is_present(port, slot)
    }

    fn is_psx(&self, port: usize, slot: usize) -> bool {
        self.bank.is_psx(port, slot)
    }

    fn size_info(&self, port: usize, slot: usize) -> McdSizeInfo {
        self.bank.size_info(port, slot)
    }

    fn read(&mut self, port: usize, slot: usize, dest: &mut [u8], addr: u32) -> bool {
        self.reads += 1;
        self.bank.read(port, slot, dest, addr)
    }

    fn save(&mut self, port: usize, slot: usize, src: &[u8], addr: u32) -> bool {
        self.saves.push(SaveCall {
            port,
            slot,
            addr,
            data: src.to_vec(),
        });
        self.bank.save(port, slot, src, addr)
    }

    fn erase_block(&mut self, port: usize, slot: usize, addr: u32) -> bool {
        self.erases += 1;
        self.bank.erase_block(port, slot, addr)
    }

    fn crc(&self, port: usize, slot: usize) -> u64 {
        self.bank.crc(port, slot)
    }
}

pub type TestContext = SioContext<RecordingStorage, PadPorts>;

/// Context without any card
pub fn context(config: SioConfig) -> TestContext {
    let pads = PadPorts::new(config.pads);
    SioContext::with_parts(config, RecordingStorage::default(), pads)
}

/// Context with a small PS2 card in port 0 slot 0
pub fn context_with_ps2_card() -> TestContext {
    let mut sio = context(SioConfig::default());
    sio.storage_mut()
        .bank
        .insert(0, 0, MemoryCardImage::new_ps2_with_sectors(TEST_PS2_SECTORS))
        .unwrap();
    sio
}

/// PS1 image filled with a recognizable pattern
pub fn patterned_ps1_image() -> MemoryCardImage {
    let data = (0..PS1_CARD_SIZE).map(|i| (i * 7 + 3) as u8).collect();
    MemoryCardImage::from_bytes(data).unwrap()
}

/// Context with a patterned PS1 card in port 0 slot 0
pub fn context_with_ps1_card() -> TestContext {
    let mut sio = context(SioConfig::default());
    sio.storage_mut()
        .bank
        .insert(0, 0, patterned_ps1_image())
        .unwrap();
    sio
}

/// Run one SIO2 command on `port` through the registers and drain the reply
pub fn sio2_command(sio: &mut TestContext, port: u32, bytes: &[u8]) -> Vec<u8> {
    sio.write32(SIO2_SEND3, port | ((bytes.len() as u32) << 8))
        .unwrap();
    sio.write32(SIO2_SEND3 + 4, 0).unwrap();
    for &byte in bytes {
        sio.write8(SIO2_DATA_IN, byte).unwrap();
    }
    drain_output(sio)
}

/// Read DATA_OUT until the reply queue is empty
pub fn drain_output(sio: &mut TestContext) -> Vec<u8> {
    let len = sio.sio2().fifo().output.len();
    (0..len).map(|_| sio.read8(SIO2_DATA_OUT).unwrap()).collect()
}

/// Enable SIO0 and address `port`
pub fn sio0_select(sio: &mut TestContext, port: usize) {
    let mut ctrl = Sio0Ctrl::TX_ENABLE | Sio0Ctrl::DTR;
    if port == 1 {
        ctrl |= Sio0Ctrl::PORT;
    }
    sio.write16(SIO0_CTRL, ctrl.bits()).unwrap();
}

/// Send bytes over SIO0, returning each reply with its ACK bit
pub fn sio0_exchange(sio: &mut TestContext, bytes: &[u8]) -> Vec<(u8, bool)> {
    bytes
        .iter()
        .map(|&byte| {
            sio.write8(SIO0_DATA, byte).unwrap();
            let stat = Sio0Stat::from_bits_retain(sio.read32(SIO0_STAT).unwrap());
            let rx = sio.read8(SIO0_DATA).unwrap();
            (rx, stat.contains(Sio0Stat::ACK))
        })
        .collect()
}

/// Reply bytes only
pub fn replies(exchange: &[(u8, bool)]) -> Vec<u8> {
    exchange.iter().map(|&(data, _)| data).collect()
}
