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

use super::helpers::*;
use crate::core::config::SioConfig;
use crate::core::interrupt::interrupts;
use crate::core::pad::buttons;
use crate::core::sio::io_ports::*;
use crate::core::sio::storage::McdStorage;
use crate::core::sio::sio2::{recv1, ISTAT_TRANSFER, RECV2_VALUE};

#[test]
fn test_get_terminator_end_to_end() {
    let mut sio = context_with_ps2_card();

    let reply = sio2_command(&mut sio, 0, &[0x81, 0x28, 0x00, 0x00, 0x00]);

    assert_eq!(reply, [0x00, 0x08, 0x2B, 0x55, 0x55]);
    assert_eq!(sio.read32(SIO2_RECV1).unwrap(), recv1::CONNECTED);
    assert!(sio.sio2().fifo().input.is_empty());
}

#[test]
fn test_digital_pad_read() {
    let mut sio = context(SioConfig::default());

    let reply = sio2_command(&mut sio, 0, &[0x01, 0x42, 0x00, 0x00, 0x00]);

    assert_eq!(reply, [0xFF, 0x41, 0x5A, 0xFF, 0xFF]);
    assert_eq!(sio.read32(SIO2_RECV1).unwrap(), recv1::CONNECTED);
}

#[test]
fn test_pad_buttons_reach_reply() {
    let mut sio = context(SioConfig::default());
    sio.pads_mut()
        .pad_mut(0, 0)
        .unwrap()
        .press_button(buttons::CROSS);

    let reply = sio2_command(&mut sio, 0, &[0x01, 0x42, 0x00, 0x00, 0x00]);

    let state = u16::from_le_bytes([reply[3], reply[4]]);
    assert_eq!(state & buttons::CROSS, 0);
    assert_ne!(state & buttons::CIRCLE, 0);
}

#[test]
fn test_absent_pad_still_reports_connected() {
    let mut sio = context(SioConfig::default());

    // Port 1 has no pad
    let reply = sio2_command(&mut sio, 1, &[0x01, 0x42, 0x00]);

    assert_eq!(reply, [0x00, 0xFF, 0xFF]);
    assert_eq!(sio.read32(SIO2_RECV1).unwrap(), recv1::CONNECTED);
    assert_eq!(sio.sio2().port(), 1);
}

#[test]
fn test_unknown_mode_byte() {
    let mut sio = context_with_ps2_card();

    let reply = sio2_command(&mut sio, 0, &[0x42, 0x00, 0x00]);

    assert_eq!(reply, [0x00]);
    assert_eq!(sio.read32(SIO2_RECV1).unwrap(), recv1::DISCONNECTED);
    assert!(sio.sio2().fifo().input.is_empty());
}

#[test]
fn test_infrared_replies_ff() {
    let mut sio = context(SioConfig::default());

    let reply = sio2_command(&mut sio, 0, &[0x61, 0x00, 0x00, 0x00]);

    assert_eq!(reply, [0xFF; 4]);
    assert_eq!(sio.read32(SIO2_RECV1).unwrap(), recv1::DISCONNECTED);
}

#[test]
fn test_zero_length_entry_ends_sequence() {
    let mut sio = context_with_ps2_card();

    sio.write32(SIO2_SEND3, 0x0000_0500).unwrap();
    for byte in [0x81, 0x28, 0x00, 0x00, 0x00] {
        sio.write8(SIO2_DATA_IN, byte).unwrap();
    }
    assert_eq!(sio.sio2().send3_position(), 1);
    assert!(!sio.sio2().is_send3_complete());

    // SEND3[1] is zero: further bytes are swallowed
    sio.write8(SIO2_DATA_IN, 0x81).unwrap();
    assert!(sio.sio2().is_send3_complete());
    assert!(sio.sio2().fifo().input.is_empty());
    assert_eq!(drain_output(&mut sio).len(), 5);
}

#[test]
fn test_chained_commands_get_own_frames() {
    let mut sio = context_with_ps2_card();

    sio.write32(SIO2_SEND3, 0x0000_0500).unwrap();
    sio.write32(SIO2_SEND3 + 4, 0x0000_0400).unwrap();
    for byte in [0x81, 0x28, 0x00, 0x00, 0x00, 0x81, 0x11, 0x00, 0x00] {
        sio.write8(SIO2_DATA_IN, byte).unwrap();
    }

    let reply = drain_output(&mut sio);
    assert_eq!(
        reply,
        [0x00, 0x08, 0x2B, 0x55, 0x55, 0x00, 0x08, 0x2B, 0x55]
    );
}

#[test]
fn test_send3_entry0_write_restarts_walk() {
    let mut sio = context_with_ps2_card();

    sio.write32(SIO2_SEND3, 0x0000_0500).unwrap();
    sio.write8(SIO2_DATA_IN, 0x81).unwrap();
    sio.write8(SIO2_DATA_IN, 0x28).unwrap();
    assert_eq!(sio.sio2().fifo().input.len(), 2);

    sio.write32(SIO2_SEND3, 0x0000_0500).unwrap();
    assert!(sio.sio2().fifo().input.is_empty());
    assert_eq!(sio.sio2().send3_position(), 0);

    let reply = sio2_command(&mut sio, 0, &[0x81, 0x28, 0x00, 0x00, 0x00]);
    assert_eq!(reply, [0x00, 0x08, 0x2B, 0x55, 0x55]);
}

#[test]
fn test_data_out_underflow() {
    let mut sio = context(SioConfig::default());

    assert_eq!(sio.read8(SIO2_DATA_OUT).unwrap(), 0xFF);
    assert_eq!(sio.read32(SIO2_DATA_OUT).unwrap(), 0xFF);
}

#[test]
fn test_ctrl_start_raises_interrupt() {
    let mut sio = context(SioConfig::default());

    sio.write32(SIO2_CTRL, 0x0000_03BC).unwrap();
    assert!(!sio.interrupts().is_requested(interrupts::SIO2));

    sio.write32(SIO2_CTRL, 0x0000_03BD).unwrap();
    assert!(sio.interrupts().is_requested(interrupts::SIO2));
    assert_eq!(sio.read32(SIO2_CTRL).unwrap(), 0x0000_03BD);
    assert_ne!(sio.read32(SIO2_ISTAT).unwrap() & ISTAT_TRANSFER, 0);
}

#[test]
fn test_dma_pads_reply_to_block_multiple() {
    let mut sio = context_with_ps2_card();

    sio.write32(SIO2_SEND3, 0x0000_0500).unwrap();
    let mut block = vec![0x81, 0x28, 0x00, 0x00, 0x00];
    block.resize(8, 0x00);
    sio.dma_write(&block, 8);

    assert_eq!(sio.sio2().fifo().output.len(), 8);
    let reply = sio.dma_read(8);
    assert_eq!(reply, [0x00, 0x08, 0x2B, 0x55, 0x55, 0x00, 0x00, 0x00]);
}

#[test]
fn test_recv2_is_fixed() {
    let mut sio = context(SioConfig::default());

    assert_eq!(sio.read32(SIO2_RECV2).unwrap(), RECV2_VALUE);
    sio.write32(SIO2_RECV2, 0x1234).unwrap();
    assert_eq!(sio.read32(SIO2_RECV2).unwrap(), RECV2_VALUE);
}

#[test]
fn test_bytes_past_last_entry_ignored() {
    let mut sio = context_with_ps2_card();

    sio.write32(SIO2_SEND3, 0x0000_0100).unwrap();
    for index in 1..16 {
        sio.write32(SIO2_SEND3 + 4 * index, 0x0000_0100).unwrap();
    }

    // Sixteen 1-byte commands with an unknown mode, then one byte too many
    for _ in 0..16 {
        sio.write8(SIO2_DATA_IN, 0x42).unwrap();
    }
    assert_eq!(sio.sio2().send3_position(), 16);
    assert_eq!(sio.sio2().fifo().output.len(), 16);

    sio.write8(SIO2_DATA_IN, 0x42).unwrap();
    assert_eq!(sio.sio2().fifo().output.len(), 16);
    assert!(sio.sio2().fifo().input.is_empty());
}

#[test]
fn test_reset_restores_power_on_state() {
    let mut sio = context_with_ps2_card();
    sio.write32(SIO2_SEND3, 0x0000_0500).unwrap();
    sio.write8(SIO2_DATA_IN, 0x81).unwrap();
    sio.write32(SIO2_CTRL, 1).unwrap();

    sio.reset();

    assert_eq!(sio.read32(SIO2_SEND3).unwrap(), 0);
    assert_eq!(sio.read32(SIO2_CTRL).unwrap(), 0);
    assert_eq!(sio.read32(SIO2_RECV1).unwrap(), recv1::DISCONNECTED);
    assert!(sio.sio2().fifo().input.is_empty());
    assert!(!sio.interrupts().is_requested(interrupts::SIO2));
    assert!(sio.storage().bank.is_present(0, 0));
}
