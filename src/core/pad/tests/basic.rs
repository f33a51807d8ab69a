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

//! Basic pad functionality tests

use super::super::*;

#[test]
fn test_pad_initialization() {
    let pad = Pad::new();

    // All buttons should be released initially (0xFFFF - active low)
    assert_eq!(pad.get_buttons(), 0xFFFF);
    assert_eq!(pad.state, SerialState::Idle);
    assert_eq!(pad.mode(), PadMode::Digital);
    assert!(!pad.in_config());
}

#[test]
fn test_toggle_analog() {
    let mut pad = Pad::new();

    pad.toggle_analog();
    assert_eq!(pad.mode(), PadMode::Analog);

    pad.toggle_analog();
    assert_eq!(pad.mode(), PadMode::Digital);
}

#[test]
fn test_pad_command_range() {
    assert!(is_pad_command(0x40));
    assert!(is_pad_command(0x42));
    assert!(is_pad_command(0x4F));
    assert!(!is_pad_command(0x3F));
    assert!(!is_pad_command(0x50));
    assert!(!is_pad_command(0x81));
}

#[test]
fn test_state_round_trip() {
    let mut pad = Pad::new();
    pad.press_button(buttons::CIRCLE);
    pad.toggle_analog();

    let state = pad.to_state();
    let mut restored = Pad::new();
    restored.restore_from_state(&state);

    assert_eq!(restored.get_buttons(), pad.get_buttons());
    assert_eq!(restored.mode(), PadMode::Analog);
}
