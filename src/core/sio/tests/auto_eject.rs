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
use crate::core::sio::auto_eject::AUTO_EJECT_TICKS;
use crate::core::sio::io_ports::SIO2_RECV1;
use crate::core::sio::sio2::recv1;
use crate::core::sio::{PORTS, SLOTS};

const GET_TERM: [u8; 5] = [0x81, 0x28, 0x00, 0x00, 0x00];

#[test]
fn test_countdown_then_reinsert() {
    let mut sio = context_with_ps2_card();
    sio.auto_eject().set(0, 0);

    for _ in 0..AUTO_EJECT_TICKS {
        assert!(sio.memory_card(0, 0).unwrap().is_ejected());
        assert_eq!(sio2_command(&mut sio, 0, &GET_TERM), [0x00; 5]);
        assert_eq!(sio.read32(SIO2_RECV1).unwrap(), recv1::DISCONNECTED);
    }

    assert!(!sio.memory_card(0, 0).unwrap().is_ejected());
    assert_eq!(
        sio2_command(&mut sio, 0, &GET_TERM),
        [0x00, 0x08, 0x2B, 0x55, 0x55]
    );
    assert_eq!(sio.read32(SIO2_RECV1).unwrap(), recv1::CONNECTED);
}

#[test]
fn test_disabled_by_config() {
    let mut sio = context(SioConfig {
        mcd_enable_ejection: false,
        ..SioConfig::default()
    });

    sio.auto_eject().set(0, 0);
    sio.auto_eject().set_all();

    for port in 0..PORTS {
        for slot in 0..SLOTS {
            assert!(!sio.memory_card(port, slot).unwrap().is_ejected());
        }
    }
}

#[test]
fn test_clear() {
    let mut sio = context_with_ps2_card();
    sio.auto_eject().set(0, 0);
    sio.auto_eject().set(1, 2);

    sio.auto_eject().clear(0, 0);

    assert!(!sio.memory_card(0, 0).unwrap().is_ejected());
    assert!(sio.memory_card(1, 2).unwrap().is_ejected());
    assert_eq!(
        sio2_command(&mut sio, 0, &GET_TERM),
        [0x00, 0x08, 0x2B, 0x55, 0x55]
    );

    sio.auto_eject().clear_all();
    assert!(!sio.memory_card(1, 2).unwrap().is_ejected());
}

#[test]
fn test_out_of_range_slot_ignored() {
    let mut sio = context_with_ps2_card();

    sio.auto_eject().set(2, 0);
    sio.auto_eject().set(0, 4);

    assert!(sio.memory_card(2, 0).is_none());
    assert!(!sio.memory_card(0, 0).unwrap().is_ejected());
}

#[test]
fn test_sio0_select_burns_tick() {
    let mut sio = context_with_ps1_card();
    sio.auto_eject().set(0, 0);
    sio0_select(&mut sio, 0);

    let exchange = sio0_exchange(&mut sio, &[0x81]);

    assert_eq!(exchange, [(0x00, false)]);
    assert_eq!(
        sio.memory_card(0, 0).unwrap().auto_eject_ticks,
        AUTO_EJECT_TICKS - 1
    );
}

#[test]
fn test_load_state_with_unchanged_cards() {
    let mut sio = context_with_ps2_card();
    let state = sio.save_state();

    sio.load_state(&state).unwrap();

    assert!(!sio.memory_card(0, 0).unwrap().is_ejected());
}

#[test]
fn test_load_state_with_changed_card() {
    let mut sio = context_with_ps2_card();
    let state = sio.save_state();

    // Overwrite one byte of sector 0
    sio2_command(&mut sio, 0, &[0x81, 0x21, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
    sio2_command(&mut sio, 0, &[0x81, 0x42, 0x01, 0x00, 0x00, 0x00]);
    sio.load_state(&state).unwrap();

    for port in 0..PORTS {
        for slot in 0..SLOTS {
            let mcd = sio.memory_card(port, slot).unwrap();
            assert_eq!(mcd.auto_eject_ticks, AUTO_EJECT_TICKS);
        }
    }
}
