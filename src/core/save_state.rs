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

//! Save state serialization for the serial subsystem
//!
//! # Save State Format
//!
//! Save states are serialized using bincode. The state includes:
//! - Metadata (timestamp)
//! - A tagged SIO0 register section
//! - A tagged SIO2 register section, including both FIFOs (length-prefixed)
//! - Per-pad state (mode, lock, vibration map, masks)
//! - Multitap slot selection
//! - Any scheduled SIO0 interrupt
//! - A CRC per (port, slot) memory card
//!
//! Memory card contents are never embedded: the CRC table only lets a load
//! detect that the cards changed underneath the guest, in which case every
//! slot is auto-ejected.
//!
//! # Example
//!
//! ```no_run
//! use ps2rx::core::save_state::SioSaveState;
//! use ps2rx::core::sio::SioContext;
//!
//! let mut sio = SioContext::new();
//! let state = sio.save_state();
//! state.save_to_file("sio.state").unwrap();
//!
//! let loaded = SioSaveState::load_from_file("sio.state").unwrap();
//! sio.load_state(&loaded).unwrap();
//! ```

use crate::core::error::{Result, SaveStateError};
use crate::core::sio::{PORTS, SLOTS};
use crate::core::timing::PendingEvent;
use bincode::{config, Decode, Encode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Save state version for compatibility checking
pub const SAVE_STATE_VERSION: u32 = 1;

/// Section tag of the SIO0 register block
pub const SIO0_TAG: &str = "sio0";

/// Section tag of the SIO2 register block
pub const SIO2_TAG: &str = "sio2";

/// Complete serial subsystem save state
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct SioSaveState {
    /// Version number for compatibility checking
    pub version: u32,

    /// Save state metadata
    pub metadata: SaveStateMetadata,

    /// SIO0 registers and stage machine
    pub sio0: Section<Sio0State>,

    /// SIO2 registers, SEND3 cursor and FIFOs
    pub sio2: Section<Sio2State>,

    /// PS1 memory card transaction in flight
    pub ps1: Ps1TransactionState,

    /// Current multitap slot per physical port
    pub multitap_slots: [u8; PORTS],

    /// Pad states, port-major
    pub pads: Vec<PadState>,

    /// Scheduled timing events
    pub pending_events: Vec<PendingEvent>,

    /// Memory card CRCs at save time
    pub mcd_crcs: [[u64; SLOTS]; PORTS],
}

/// Save state metadata
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
#[bincode(encode_bounds = "", decode_bounds = "")]
pub struct SaveStateMetadata {
    /// Timestamp when the save state was created
    #[bincode(with_serde)]
    pub timestamp: DateTime<Utc>,
}

impl Default for SaveStateMetadata {
    fn default() -> Self {
        Self {
            timestamp: Utc::now(),
        }
    }
}

/// A tagged state section
///
/// The tag is checked on load so a misordered or foreign block is rejected
/// instead of silently restored into the wrong registers.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct Section<T> {
    pub tag: String,
    pub body: T,
}

impl<T> Section<T> {
    /// Wrap a state body with its tag
    pub fn new(tag: &str, body: T) -> Self {
        Self {
            tag: tag.to_string(),
            body,
        }
    }

    /// Borrow the body if the tag matches
    pub fn expect_tag(&self, tag: &str) -> std::result::Result<&T, SaveStateError> {
        if self.tag == tag {
            Ok(&self.body)
        } else {
            Err(SaveStateError::TagMismatch {
                expected: tag.to_string(),
                got: self.tag.clone(),
            })
        }
    }
}

/// SIO0 register state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Sio0State {
    pub stat: u32,
    pub ctrl: u16,
    pub mode: u16,
    pub baud: u16,
    pub stage: u8,
    pub sio_mode: u8,
    pub command: u8,
    pub tx_data: u8,
    pub rx_data: u8,
    pub port: u8,
    pub slot: u8,
}

/// SIO2 register state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Sio2State {
    pub ctrl: u32,
    pub send1: [u32; 4],
    pub send2: [u32; 4],
    pub send3: [u32; 16],
    pub recv1: u32,
    pub recv2: u32,
    pub recv3: u32,
    pub unknown1: u32,
    pub unknown2: u32,
    pub istat: u32,
    pub port: u8,
    pub slot: u8,
    pub send3_read: bool,
    pub send3_position: u64,
    pub command_length: u64,
    pub dma_block_size: u64,
    pub send3_complete: bool,
    pub fifo_in: Vec<u8>,
    pub fifo_out: Vec<u8>,
}

/// PS1 memory card transaction state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct Ps1TransactionState {
    pub current_byte: u16,
    pub sector_addr_msb: u8,
    pub sector_addr_lsb: u8,
    pub checksum: u8,
    pub expected_checksum: u8,
    pub prev_byte: u8,
    pub buf: Vec<u8>,
}

/// Pad state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Encode, Decode)]
pub struct PadState {
    pub buttons: u16,
    pub analog: [u8; 4],
    pub mode: u8,
    pub mode_lock: bool,
    pub config: bool,
    pub vibration: [u8; 6],
    pub small_motor_index: u8,
    pub large_motor_index: u8,
    pub analog_mask: [u8; 3],
}

impl SioSaveState {
    /// Encode to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let encoded =
            bincode::encode_to_vec(self, config::standard()).map_err(SaveStateError::from)?;
        Ok(encoded)
    }

    /// Decode from bytes and verify version compatibility
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (state, _): (SioSaveState, usize) =
            bincode::decode_from_slice(bytes, config::standard()).map_err(SaveStateError::from)?;

        if state.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::VersionMismatch {
                expected: SAVE_STATE_VERSION,
                got: state.version,
            }
            .into());
        }

        Ok(state)
    }

    /// Save state to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let encoded = self.to_bytes()?;
        let mut file = File::create(path)?;
        file.write_all(&encoded)?;
        Ok(())
    }

    /// Load state from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)?;
        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        Self::from_bytes(&buffer)
    }
}

/// Trait for components that can be saved and restored
pub trait StateSave {
    /// The state type for this component
    type State: Serialize + for<'de> Deserialize<'de>;

    /// Convert this component to a saveable state
    fn to_state(&self) -> Self::State;

    /// Restore this component from a saved state
    fn restore_from_state(&mut self, state: &Self::State);
}
