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

//! Multitap protocol
//!
//! A multitap turns one physical port into four slots. The guest probes it
//! with a support check and then selects which slot the following PAD and
//! MEMCARD commands on that port reach.
//!
//! ```text
//! Command      | Reply (after the 0x00 framing byte)
//! -------------|------------------------------------
//! 0x12 / 0x13  | 5A 04 00 5A
//! 0x21 / 0x22  | 5A 00 00 slot 5A  (slot < 4)
//!              | 5A 00 00 FF 66    (otherwise)
//! ```

use super::sio2::Sio2Fifo;
use super::SLOTS;

/// Multitap command bytes
pub mod commands {
    pub const PAD_SUPPORT_CHECK: u8 = 0x12;
    pub const MEMCARD_SUPPORT_CHECK: u8 = 0x13;
    pub const SELECT_PAD: u8 = 0x21;
    pub const SELECT_MEMCARD: u8 = 0x22;
}

/// Reply byte closing a rejected select
pub const SELECT_FAILED: u8 = 0x66;

/// Multitap on one physical port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultitapPort {
    current_slot: usize,
}

impl MultitapPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot addressed by PAD and MEMCARD commands on this port
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.current_slot
    }

    /// Force the addressed slot, ignoring out-of-range values
    pub fn set_current_slot(&mut self, slot: usize) {
        if slot < SLOTS {
            self.current_slot = slot;
        }
    }

    pub fn reset(&mut self) {
        self.current_slot = 0;
    }

    /// Handle one multitap command from `fifo_in`
    pub fn execute(&mut self, fifo: &mut Sio2Fifo) {
        let command = fifo.pop_input();

        match command {
            commands::PAD_SUPPORT_CHECK | commands::MEMCARD_SUPPORT_CHECK => {
                self.support_check(fifo)
            }
            commands::SELECT_PAD | commands::SELECT_MEMCARD => self.select(fifo),
            _ => log::warn!("Multitap: unknown command 0x{:02X}", command),
        }
    }

    fn support_check(&self, fifo: &mut Sio2Fifo) {
        fifo.output.extend([0x5A, 0x04, 0x00, 0x5A]);
    }

    fn select(&mut self, fifo: &mut Sio2Fifo) {
        let requested = fifo.pop_input();
        let in_bounds = usize::from(requested) < SLOTS;

        if in_bounds {
            self.current_slot = usize::from(requested);
            log::debug!("Multitap: slot {} selected", requested);
        } else {
            log::warn!("Multitap: slot {} out of range, keeping {}", requested, self.current_slot);
        }

        fifo.output.extend([0x5A, 0x00, 0x00]);
        if in_bounds {
            fifo.output.extend([requested, 0x5A]);
        } else {
            fifo.output.extend([0xFF, SELECT_FAILED]);
        }
    }
}
