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
use crate::core::error::{SaveStateError, SioError};
use crate::core::interrupt::interrupts;
use crate::core::pad::buttons;
use crate::core::save_state::{SioSaveState, SAVE_STATE_VERSION};
use crate::core::sio::io_ports::*;
use crate::core::sio::sio0::Sio0Stage;
use crate::core::sio::SIO0_IRQ_DELAY;
use tempfile::tempdir;

#[test]
fn test_resume_mid_command() {
    let mut sio = context_with_ps2_card();
    sio.write32(SIO2_SEND3, 0x0000_0500).unwrap();
    sio.write8(SIO2_DATA_IN, 0x81).unwrap();
    sio.write8(SIO2_DATA_IN, 0x28).unwrap();
    let state = sio.save_state();

    let mut restored = context_with_ps2_card();
    restored.load_state(&state).unwrap();
    for byte in [0x00, 0x00, 0x00] {
        restored.write8(SIO2_DATA_IN, byte).unwrap();
    }

    assert_eq!(drain_output(&mut restored), [0x00, 0x08, 0x2B, 0x55, 0x55]);
}

#[test]
fn test_pending_reply_survives() {
    let mut sio = context_with_ps2_card();
    sio2_command(&mut sio, 0, &[0x81, 0x27, 0x33, 0x00, 0x00]);
    sio.write32(SIO2_SEND3, 0x0000_0500).unwrap();
    for byte in [0x81, 0x28, 0x00, 0x00, 0x00] {
        sio.write8(SIO2_DATA_IN, byte).unwrap();
    }
    sio.write32(SIO2_SEND1, 0x1234_5678).unwrap();
    let state = sio.save_state();

    let mut restored = context_with_ps2_card();
    restored.load_state(&state).unwrap();

    assert_eq!(restored.read32(SIO2_SEND1).unwrap(), 0x1234_5678);
    assert_eq!(restored.read32(SIO2_SEND3).unwrap(), 0x0000_0500);
    assert_eq!(drain_output(&mut restored), [0x00, 0x08, 0x2B, 0x33, 0x55]);
}

#[test]
fn test_sio0_transaction_survives() {
    let mut sio = context_with_ps1_card();
    sio0_select(&mut sio, 0);
    sio0_exchange(&mut sio, &[0x81, 0x52, 0x00, 0x00]);
    let state = sio.save_state();

    let mut restored = context_with_ps1_card();
    restored.load_state(&state).unwrap();

    assert_eq!(restored.sio0().stage(), Sio0Stage::Working);
    let rx = replies(&sio0_exchange(&mut restored, &[0x00, 0x05]));
    assert_eq!(rx, [0x00, 0x00]);
    assert_eq!(restored.memory_card(0, 0).unwrap().sector_addr, 0x0005);
}

#[test]
fn test_pending_irq_survives() {
    let mut sio = context(SioConfig::default());
    sio0_select(&mut sio, 0);
    sio.write8(SIO0_DATA, 0x01).unwrap();
    sio.tick(SIO0_IRQ_DELAY / 2);
    let state = sio.save_state();

    let mut restored = context(SioConfig::default());
    restored.load_state(&state).unwrap();
    restored.tick(SIO0_IRQ_DELAY - SIO0_IRQ_DELAY / 2 - 1);
    assert!(!restored.interrupts().is_requested(interrupts::SIO0));

    restored.tick(1);
    assert!(restored.interrupts().is_requested(interrupts::SIO0));
}

#[test]
fn test_pads_and_multitap_survive() {
    let config = SioConfig {
        multitap: [true, false],
        ..SioConfig::default()
    };
    let mut sio = context(config.clone());
    sio.pads_mut()
        .pad_mut(0, 0)
        .unwrap()
        .press_button(buttons::TRIANGLE);
    sio2_command(&mut sio, 0, &[0x21, 0x21, 0x03, 0x00, 0x00, 0x00]);
    let state = sio.save_state();

    let mut restored = context(config);
    restored.load_state(&state).unwrap();

    assert_eq!(restored.multitap_slot(0), Some(3));
    let state = restored.pads().pad(0, 0).unwrap().get_buttons();
    assert_eq!(state & buttons::TRIANGLE, 0);
}

#[test]
fn test_tag_mismatch_rejected() {
    let mut sio = context_with_ps2_card();
    let mut state = sio.save_state();
    state.sio2.tag = "sio0".to_string();

    let err = sio.load_state(&state).unwrap_err();

    assert!(matches!(
        err,
        SioError::SaveState(SaveStateError::TagMismatch { .. })
    ));
}

#[test]
fn test_bytes_round_trip() {
    let mut sio = context_with_ps2_card();
    sio2_command(&mut sio, 0, &[0x81, 0x27, 0x77, 0x00, 0x00]);
    let state = sio.save_state();

    let bytes = state.to_bytes().unwrap();
    let decoded = SioSaveState::from_bytes(&bytes).unwrap();

    assert_eq!(decoded.version, SAVE_STATE_VERSION);
    assert_eq!(decoded.sio2.body, state.sio2.body);
    assert_eq!(decoded.mcd_crcs, state.mcd_crcs);
    assert_eq!(decoded.metadata.timestamp, state.metadata.timestamp);
}

#[test]
fn test_version_mismatch_rejected() {
    let sio = context(SioConfig::default());
    let mut state = sio.save_state();
    state.version = SAVE_STATE_VERSION + 1;
    let bytes = state.to_bytes().unwrap();

    let err = SioSaveState::from_bytes(&bytes).unwrap_err();

    assert!(matches!(
        err,
        SioError::SaveState(SaveStateError::VersionMismatch { .. })
    ));
}

#[test]
fn test_garbage_rejected() {
    assert!(SioSaveState::from_bytes(&[0xFF, 0xFF, 0xFF]).is_err());
}

#[test]
fn test_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sio.state");
    let mut sio = context_with_ps2_card();
    sio.write32(SIO2_SEND3 + 8, 0x0000_0401).unwrap();
    let state = sio.save_state();

    state.save_to_file(&path).unwrap();
    let loaded = SioSaveState::load_from_file(&path).unwrap();

    let mut restored = context_with_ps2_card();
    restored.load_state(&loaded).unwrap();
    assert_eq!(restored.read32(SIO2_SEND3 + 8).unwrap(), 0x0000_0401);
}
