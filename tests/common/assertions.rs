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

//! Custom assertions for bus-level testing

use ps2rx::core::sio::io_ports::SIO2_RECV1;
use ps2rx::core::sio::SioContext;

/// Assert a reply matches byte for byte, printing both in hex
#[allow(dead_code)]
pub fn assert_reply(actual: &[u8], expected: &[u8]) {
    assert_eq!(
        actual, expected,
        "Reply mismatch: expected {:02X?}, got {:02X?}",
        expected, actual
    );
}

/// Assert RECV1 reports the expected presence value
#[allow(dead_code)]
pub fn assert_recv1(sio: &mut SioContext, expected: u32) {
    let actual = sio.read32(SIO2_RECV1).expect("Failed to read RECV1");
    assert_eq!(
        actual, expected,
        "RECV1 mismatch: expected 0x{:05X}, got 0x{:05X}",
        expected, actual
    );
}

/// Assert a card image holds `expected` at `addr`
#[allow(dead_code)]
pub fn assert_card_bytes(sio: &SioContext, port: usize, slot: usize, addr: usize, expected: &[u8]) {
    let card = sio.storage().card(port, slot).expect("No card inserted");
    let actual = &card.data()[addr..addr + expected.len()];
    assert_eq!(
        actual, expected,
        "Card ({}, {}) at 0x{:X} mismatch",
        port, slot, addr
    );
}
