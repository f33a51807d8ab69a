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

//! DualShock2 controller emulation
//!
//! Pads answer the serial controllers one byte at a time. A poll always
//! starts with the mode byte (0x01, answered by [`PadPort::start_poll`]),
//! followed by the command byte (answered with the pad's mode ID) and a
//! 0x5A marker, after which the command payload is exchanged.
//!
//! # Transfer layout
//!
//! ```text
//! Position | Host sends      | Pad replies
//! ---------|-----------------|---------------------------
//! 0        | 0x01            | 0xFF
//! 1        | command         | mode ID (0x41/0x73/0x79/0xF3)
//! 2        | 0x00            | 0x5A
//! 3..      | command params  | command payload
//! ```
//!
//! # Modes
//!
//! | ID   | Mode       | Payload                                    |
//! |------|------------|--------------------------------------------|
//! | 0x41 | Digital    | 2 button bytes                             |
//! | 0x73 | Analog     | buttons + 4 stick bytes                    |
//! | 0x79 | DualShock2 | buttons + sticks + 12 pressure bytes       |
//! | 0xF3 | Config     | 6 bytes, command specific                  |
//!
//! ## References
//!
//! - [PSX-SPX: Controllers](http://problemkaputt.de/psx-spx.htm#controllersandmemorycards)

use crate::core::save_state::{PadState, StateSave};
use crate::core::sio::{PORTS, SLOTS};

#[cfg(test)]
mod tests;

/// Button bit masks (active low in the transferred data)
pub mod buttons {
    pub const SELECT: u16 = 1 << 0;
    pub const L3: u16 = 1 << 1;
    pub const R3: u16 = 1 << 2;
    pub const START: u16 = 1 << 3;
    pub const UP: u16 = 1 << 4;
    pub const RIGHT: u16 = 1 << 5;
    pub const DOWN: u16 = 1 << 6;
    pub const LEFT: u16 = 1 << 7;
    pub const L2: u16 = 1 << 8;
    pub const R2: u16 = 1 << 9;
    pub const L1: u16 = 1 << 10;
    pub const R1: u16 = 1 << 11;
    pub const TRIANGLE: u16 = 1 << 12;
    pub const CIRCLE: u16 = 1 << 13;
    pub const CROSS: u16 = 1 << 14;
    pub const SQUARE: u16 = 1 << 15;
}

/// Pad command bytes (position 1)
pub mod commands {
    pub const SET_VREF_PARAM: u8 = 0x40;
    pub const QUERY_MASKED_MODE: u8 = 0x41;
    pub const READ_DATA: u8 = 0x42;
    pub const CONFIG_MODE: u8 = 0x43;
    pub const SET_MODE_AND_LOCK: u8 = 0x44;
    pub const QUERY_MODEL_AND_MODE: u8 = 0x45;
    pub const QUERY_ACT: u8 = 0x46;
    pub const QUERY_COMB: u8 = 0x47;
    pub const QUERY_MODE: u8 = 0x4C;
    pub const VIBRATION_MAP: u8 = 0x4D;
    pub const RESPONSE_BYTES: u8 = 0x4F;
}

/// Mode ID reported while the pad is in config mode
const CONFIG_MODE_ID: u8 = 0xF3;

/// Vibration table value for an unmapped slot
const MOTOR_UNMAPPED: u8 = 0xFF;

/// Pad operating mode, encoded as the ID the pad reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadMode {
    Digital = 0x41,
    Analog = 0x73,
    DualShock2 = 0x79,
}

impl PadMode {
    /// Decode a persisted mode ID, falling back to digital
    pub fn from_id(id: u8) -> Self {
        match id {
            0x73 => PadMode::Analog,
            0x79 => PadMode::DualShock2,
            _ => PadMode::Digital,
        }
    }
}

/// Serial communication state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialState {
    /// Not addressed
    Idle,
    /// Addressed by the host, exchanging bytes
    Selected,
}

/// Whether a byte is a pad command the serial controllers forward
#[inline]
pub fn is_pad_command(value: u8) -> bool {
    (0x40..=0x4F).contains(&value)
}

/// A single DualShock2 pad
#[derive(Debug, Clone)]
pub struct Pad {
    /// Button state, 1 = released
    buttons: u16,

    /// Stick positions: right X, right Y, left X, left Y (0x80 = centre)
    analog: [u8; 4],

    mode: PadMode,
    mode_lock: bool,
    config: bool,

    /// Vibration map set by command 0x4D: table index -> motor
    vibration: [u8; 6],
    small_motor_index: u8,
    large_motor_index: u8,

    /// Response mask set by command 0x4F
    analog_mask: [u8; 3],

    /// Last motor values sent by the host
    small_motor: bool,
    large_motor: u8,

    pub(super) state: SerialState,
    command: u8,
    position: usize,
    pub(super) tx_buffer: Vec<u8>,
}

impl Pad {
    /// Create a released, centred, digital pad
    pub fn new() -> Self {
        Self {
            buttons: 0xFFFF,
            analog: [0x80; 4],
            mode: PadMode::Digital,
            mode_lock: false,
            config: false,
            vibration: [MOTOR_UNMAPPED; 6],
            small_motor_index: MOTOR_UNMAPPED,
            large_motor_index: MOTOR_UNMAPPED,
            analog_mask: [0xFF, 0xFF, 0x03],
            small_motor: false,
            large_motor: 0,
            state: SerialState::Idle,
            command: 0,
            position: 0,
            tx_buffer: Vec::new(),
        }
    }

    /// Press a button
    pub fn press_button(&mut self, button: u16) {
        self.buttons &= !button;
    }

    /// Release a button
    pub fn release_button(&mut self, button: u16) {
        self.buttons |= button;
    }

    /// Set a button's state
    pub fn set_button_state(&mut self, button: u16, pressed: bool) {
        if pressed {
            self.press_button(button);
        } else {
            self.release_button(button);
        }
    }

    /// Current button word (active low)
    #[inline]
    pub fn get_buttons(&self) -> u16 {
        self.buttons
    }

    /// Set stick positions (right X, right Y, left X, left Y)
    pub fn set_analog(&mut self, sticks: [u8; 4]) {
        self.analog = sticks;
    }

    /// Current operating mode
    #[inline]
    pub fn mode(&self) -> PadMode {
        self.mode
    }

    /// Whether the pad is in config mode
    #[inline]
    pub fn in_config(&self) -> bool {
        self.config
    }

    /// Whether the mode has been locked by command 0x44
    #[inline]
    pub fn mode_locked(&self) -> bool {
        self.mode_lock
    }

    /// The ANALOG button: toggles digital/analog unless locked
    pub fn toggle_analog(&mut self) {
        if self.mode_lock {
            log::debug!("Pad: analog toggle ignored, mode locked");
            return;
        }
        self.mode = match self.mode {
            PadMode::Digital => PadMode::Analog,
            PadMode::Analog | PadMode::DualShock2 => PadMode::Digital,
        };
    }

    /// Last motor values: (small motor on, large motor strength)
    pub fn motors(&self) -> (bool, u8) {
        (self.small_motor, self.large_motor)
    }

    /// Begin a transfer (mode byte exchanged)
    ///
    /// Returns the reply to the mode byte.
    pub fn select(&mut self) -> u8 {
        self.state = SerialState::Selected;
        self.command = 0;
        self.position = 1;
        self.tx_buffer.clear();
        self.tx_buffer.push(0xFF);
        0xFF
    }

    /// End the current transfer
    pub fn deselect(&mut self) {
        self.state = SerialState::Idle;
        self.tx_buffer.clear();
        self.position = 0;
    }

    /// Exchange one byte with the pad
    pub fn transfer(&mut self, value: u8) -> u8 {
        if self.state != SerialState::Selected {
            return 0xFF;
        }

        let position = self.position;
        self.position += 1;

        if position == 1 {
            return self.begin_command(value);
        }

        let reply = self.tx_buffer.get(position).copied().unwrap_or(0xFF);
        if position >= 3 {
            self.handle_parameter(position - 3, value);
        }

        if self.is_complete() {
            self.state = SerialState::Idle;
        }

        reply
    }

    /// Whether every reply byte of the current command has been sent
    pub fn is_complete(&self) -> bool {
        self.state != SerialState::Selected || self.position >= self.tx_buffer.len()
    }

    fn mode_id(&self) -> u8 {
        if self.config {
            CONFIG_MODE_ID
        } else {
            self.mode as u8
        }
    }

    /// Position 1: latch the command and lay out the reply
    fn begin_command(&mut self, command: u8) -> u8 {
        let valid = if self.config {
            is_pad_command(command)
        } else {
            matches!(command, commands::READ_DATA | commands::CONFIG_MODE)
        };

        if !valid {
            log::debug!("Pad: unsupported command 0x{:02X} (config={})", command, self.config);
            self.deselect();
            return 0xFF;
        }

        self.command = command;
        let id = self.mode_id();
        self.tx_buffer.push(id);
        self.tx_buffer.push(0x5A);

        let payload = self.payload(command);
        self.tx_buffer.extend_from_slice(&payload);

        log::trace!("Pad: command 0x{:02X}, id 0x{:02X}", command, id);
        id
    }

    fn payload(&self, command: u8) -> Vec<u8> {
        if !self.config {
            return self.input_report();
        }

        match command {
            commands::SET_VREF_PARAM => vec![0x00, 0x00, 0x02, 0x00, 0x00, 0x5A],
            commands::QUERY_MASKED_MODE => match self.mode {
                PadMode::Digital => vec![0x00; 6],
                _ => {
                    let [m0, m1, m2] = self.analog_mask;
                    vec![m0, m1, m2, 0x00, 0x00, 0x5A]
                }
            },
            commands::READ_DATA => self.input_report_padded(),
            commands::QUERY_MODEL_AND_MODE => {
                let analog = u8::from(self.mode != PadMode::Digital);
                vec![0x03, 0x02, analog, 0x02, 0x01, 0x00]
            }
            commands::QUERY_ACT => vec![0x00, 0x00, 0x01, 0x02, 0x00, 0x0A],
            commands::QUERY_COMB => vec![0x00, 0x00, 0x02, 0x00, 0x01, 0x00],
            commands::QUERY_MODE => vec![0x00, 0x00, 0x00, 0x04, 0x00, 0x00],
            commands::VIBRATION_MAP => self.vibration.to_vec(),
            commands::RESPONSE_BYTES => vec![0x00, 0x00, 0x00, 0x00, 0x00, 0x5A],
            _ => vec![0x00; 6],
        }
    }

    /// Button/stick/pressure report for the current mode
    fn input_report(&self) -> Vec<u8> {
        let mut report = vec![self.buttons as u8, (self.buttons >> 8) as u8];

        if self.mode == PadMode::Digital {
            return report;
        }
        report.extend_from_slice(&self.analog);

        if self.mode == PadMode::DualShock2 {
            const PRESSURE_ORDER: [u16; 12] = [
                buttons::RIGHT,
                buttons::LEFT,
                buttons::UP,
                buttons::DOWN,
                buttons::TRIANGLE,
                buttons::CIRCLE,
                buttons::CROSS,
                buttons::SQUARE,
                buttons::L1,
                buttons::R1,
                buttons::L2,
                buttons::R2,
            ];
            report.extend(PRESSURE_ORDER.iter().map(|&b| {
                if self.buttons & b == 0 {
                    0xFF
                } else {
                    0x00
                }
            }));
        }
        report
    }

    /// In config mode the reply is always six bytes long
    fn input_report_padded(&self) -> Vec<u8> {
        let mut report = self.input_report();
        report.resize(6, 0x00);
        report.truncate(6);
        report
    }

    /// Handle the host byte at payload index `index`
    fn handle_parameter(&mut self, index: usize, value: u8) {
        match self.command {
            commands::READ_DATA => self.drive_motor(index, value),
            commands::CONFIG_MODE if index == 0 => {
                let enter = value == 0x01;
                if enter != self.config {
                    log::debug!("Pad: {} config mode", if enter { "enter" } else { "exit" });
                }
                self.config = enter;
            }
            commands::SET_MODE_AND_LOCK if self.config => match index {
                0 => {
                    self.mode = if value == 0x01 {
                        PadMode::Analog
                    } else {
                        PadMode::Digital
                    };
                }
                1 => self.mode_lock = value == 0x03,
                _ => {}
            },
            commands::QUERY_ACT if index == 0 && value == 0x01 => {
                self.tx_buffer[4..9].copy_from_slice(&[0x00, 0x01, 0x01, 0x01, 0x14]);
            }
            commands::QUERY_MODE if index == 0 && value == 0x01 => {
                self.tx_buffer[6] = 0x07;
            }
            commands::VIBRATION_MAP => {
                if let Some(slot) = self.vibration.get_mut(index) {
                    *slot = value;
                }
                if index == 5 {
                    self.remap_motors();
                }
            }
            commands::RESPONSE_BYTES => {
                if let Some(mask) = self.analog_mask.get_mut(index) {
                    *mask = value;
                }
                if index == 0 {
                    self.mode = PadMode::DualShock2;
                }
            }
            _ => {}
        }
    }

    fn drive_motor(&mut self, index: usize, value: u8) {
        let index = index as u8;
        if index == self.small_motor_index {
            self.small_motor = value & 0x01 != 0;
        } else if index == self.large_motor_index {
            self.large_motor = value;
        }
    }

    fn remap_motors(&mut self) {
        self.small_motor_index = MOTOR_UNMAPPED;
        self.large_motor_index = MOTOR_UNMAPPED;
        for (i, &motor) in self.vibration.iter().enumerate() {
            match motor {
                0x00 => self.small_motor_index = i as u8,
                0x01 => self.large_motor_index = i as u8,
                _ => {}
            }
        }
    }
}

impl Default for Pad {
    fn default() -> Self {
        Self::new()
    }
}

impl StateSave for Pad {
    type State = PadState;

    fn to_state(&self) -> PadState {
        PadState {
            buttons: self.buttons,
            analog: self.analog,
            mode: self.mode as u8,
            mode_lock: self.mode_lock,
            config: self.config,
            vibration: self.vibration,
            small_motor_index: self.small_motor_index,
            large_motor_index: self.large_motor_index,
            analog_mask: self.analog_mask,
        }
    }

    fn restore_from_state(&mut self, state: &PadState) {
        self.buttons = state.buttons;
        self.analog = state.analog;
        self.mode = PadMode::from_id(state.mode);
        self.mode_lock = state.mode_lock;
        self.config = state.config;
        self.vibration = state.vibration;
        self.small_motor_index = state.small_motor_index;
        self.large_motor_index = state.large_motor_index;
        self.analog_mask = state.analog_mask;
        self.deselect();
    }
}

/// Pad collaborator interface consumed by the serial controllers
///
/// One poll sequence is `start_poll`, then `poll` per byte until
/// `is_complete` reports true.
pub trait PadPort {
    /// Address the pad at (port, slot) and answer the mode byte
    ///
    /// A nonzero reply means something answered on the bus.
    fn start_poll(&mut self, port: usize, slot: usize) -> u8;

    /// Exchange one byte with the addressed pad
    fn poll(&mut self, data: u8) -> u8;

    /// Whether the addressed pad has nothing more to send
    fn is_complete(&self) -> bool;
}

/// All pads reachable from the two physical ports (with multitaps)
#[derive(Debug, Clone)]
pub struct PadPorts {
    pads: [[Pad; SLOTS]; PORTS],
    connected: [[bool; SLOTS]; PORTS],
    active: Option<(usize, usize)>,
}

impl PadPorts {
    /// Create pad ports with the given connections
    pub fn new(connected: [[bool; SLOTS]; PORTS]) -> Self {
        Self {
            pads: Default::default(),
            connected,
            active: None,
        }
    }

    /// Pad at (port, slot), whether connected or not
    pub fn pad(&self, port: usize, slot: usize) -> Option<&Pad> {
        self.pads.get(port).and_then(|p| p.get(slot))
    }

    /// Mutable pad at (port, slot)
    pub fn pad_mut(&mut self, port: usize, slot: usize) -> Option<&mut Pad> {
        self.pads.get_mut(port).and_then(|p| p.get_mut(slot))
    }

    /// Whether a pad is plugged in at (port, slot)
    pub fn is_connected(&self, port: usize, slot: usize) -> bool {
        self.connected
            .get(port)
            .and_then(|p| p.get(slot))
            .copied()
            .unwrap_or(false)
    }

    /// Plug or unplug a pad
    pub fn set_connected(&mut self, port: usize, slot: usize, connected: bool) {
        if let Some(c) = self.connected.get_mut(port).and_then(|p| p.get_mut(slot)) {
            *c = connected;
        }
    }

    /// Persistable state of every pad, port-major
    pub fn states(&self) -> Vec<PadState> {
        self.pads.iter().flatten().map(|pad| pad.to_state()).collect()
    }

    /// Restore pads from `states()` output
    pub fn restore_states(&mut self, states: &[PadState]) {
        for (pad, state) in self.pads.iter_mut().flatten().zip(states) {
            pad.restore_from_state(state);
        }
        self.active = None;
    }

    fn active_pad(&mut self) -> Option<&mut Pad> {
        let (port, slot) = self.active?;
        self.pad_mut(port, slot)
    }
}

impl Default for PadPorts {
    fn default() -> Self {
        let mut connected = [[false; SLOTS]; PORTS];
        connected[0][0] = true;
        Self::new(connected)
    }
}

impl StateSave for PadPorts {
    type State = Vec<PadState>;

    fn to_state(&self) -> Vec<PadState> {
        self.states()
    }

    fn restore_from_state(&mut self, state: &Vec<PadState>) {
        self.restore_states(state);
    }
}

impl PadPort for PadPorts {
    fn start_poll(&mut self, port: usize, slot: usize) -> u8 {
        if let Some(pad) = self.active_pad() {
            pad.deselect();
        }

        if !self.is_connected(port, slot) {
            log::trace!("Pad: nothing connected at port {} slot {}", port, slot);
            self.active = None;
            return 0x00;
        }

        self.active = Some((port, slot));
        self.active_pad().map_or(0x00, Pad::select)
    }

    fn poll(&mut self, data: u8) -> u8 {
        self.active_pad().map_or(0xFF, |pad| pad.transfer(data))
    }

    fn is_complete(&self) -> bool {
        match self.active {
            Some((port, slot)) => self.pads[port][slot].is_complete(),
            None => true,
        }
    }
}
