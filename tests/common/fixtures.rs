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

//! Test fixtures for common bus scenarios

use ps2rx::core::config::SioConfig;
use ps2rx::core::sio::io_ports::{
    SIO0_CTRL, SIO0_DATA, SIO2_DATA_IN, SIO2_DATA_OUT, SIO2_SEND3,
};
use ps2rx::core::sio::storage::MemoryCardImage;
use ps2rx::core::sio::SioContext;

/// Sector count of the small PS2 cards used in integration tests
#[allow(dead_code)]
pub const SMALL_CARD_SECTORS: u32 = 32;

/// Create a context with a small blank PS2 card in port 0 slot 0
#[allow(dead_code)]
pub fn create_context_with_ps2_card() -> SioContext {
    let mut sio = SioContext::new();
    sio.storage_mut()
        .insert(0, 0, MemoryCardImage::new_ps2_with_sectors(SMALL_CARD_SECTORS))
        .expect("Failed to insert card");
    sio
}

/// Create a context from TOML configuration text
#[allow(dead_code)]
pub fn create_context_from_toml(text: &str) -> SioContext {
    let config = SioConfig::from_toml_str(text).expect("Failed to parse config");
    SioContext::with_config(config)
}

/// Queue the whole SEND3 table, one entry per command, then write all
/// command bytes through DATA_IN and drain DATA_OUT
#[allow(dead_code)]
pub fn sio2_chain(sio: &mut SioContext, port: u32, commands: &[&[u8]]) -> Vec<u8> {
    for (index, command) in commands.iter().enumerate() {
        sio.write32(
            SIO2_SEND3 + 4 * index as u32,
            port | ((command.len() as u32) << 8),
        )
        .expect("Failed to write SEND3");
    }
    if commands.len() < 16 {
        sio.write32(SIO2_SEND3 + 4 * commands.len() as u32, 0)
            .expect("Failed to write SEND3");
    }

    for &byte in commands.iter().flat_map(|c| c.iter()) {
        sio.write8(SIO2_DATA_IN, byte)
            .expect("Failed to write DATA_IN");
    }

    let len = sio.sio2().fifo().output.len();
    (0..len)
        .map(|_| sio.read8(SIO2_DATA_OUT).expect("Failed to read DATA_OUT"))
        .collect()
}

/// Run a single SIO2 command
#[allow(dead_code)]
pub fn sio2_command(sio: &mut SioContext, port: u32, command: &[u8]) -> Vec<u8> {
    sio2_chain(sio, port, &[command])
}

/// SetSector command bytes with a correct checksum
#[allow(dead_code)]
pub fn set_sector_command(command: u8, sector: u32) -> Vec<u8> {
    let bytes = sector.to_le_bytes();
    let xor = bytes.iter().fold(0u8, |acc, b| acc ^ b);
    let mut out = vec![0x81, command];
    out.extend(bytes);
    out.extend([xor, 0x00, 0x00]);
    out
}

/// One full SIO0 transaction on `port`, ending with CTRL = 0
#[allow(dead_code)]
pub fn sio0_transaction(sio: &mut SioContext, port: usize, bytes: &[u8]) -> Vec<u8> {
    let ctrl: u16 = 0x0003 | if port == 1 { 0x2000 } else { 0 };
    sio.write16(SIO0_CTRL, ctrl).expect("Failed to write CTRL");

    let rx = bytes
        .iter()
        .map(|&byte| {
            sio.write8(SIO0_DATA, byte).expect("Failed to write TX");
            sio.read8(SIO0_DATA).expect("Failed to read RX")
        })
        .collect();

    sio.write16(SIO0_CTRL, 0).expect("Failed to write CTRL");
    rx
}
