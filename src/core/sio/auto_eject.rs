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

//! Memory card auto-eject
//!
//! Games cache memory card contents. When the card under them changes (a
//! save state from another session is loaded, or the game serial changes),
//! the card is made to look unplugged for a fixed number of accesses so the
//! game notices a "new" card and rereads it.

use super::memcard::MemoryCardSlot;
use super::{PORTS, SLOTS};

/// Accesses a card stays unplugged after being ejected
pub const AUTO_EJECT_TICKS: u32 = 60;

/// Auto-eject control over every card slot
///
/// # Example
///
/// ```
/// use ps2rx::core::sio::SioContext;
///
/// let mut sio = SioContext::new();
/// sio.auto_eject().set(0, 0);
/// assert!(sio.memory_card(0, 0).unwrap().is_ejected());
///
/// sio.auto_eject().clear_all();
/// assert!(!sio.memory_card(0, 0).unwrap().is_ejected());
/// ```
pub struct AutoEject<'a> {
    mcds: &'a mut [[MemoryCardSlot; SLOTS]; PORTS],
    enabled: bool,
}

impl<'a> AutoEject<'a> {
    pub(super) fn new(mcds: &'a mut [[MemoryCardSlot; SLOTS]; PORTS], enabled: bool) -> Self {
        Self { mcds, enabled }
    }

    /// Eject one card, if ejection is enabled
    pub fn set(&mut self, port: usize, slot: usize) {
        if !self.enabled {
            return;
        }

        if let Some(mcd) = self.mcds.get_mut(port).and_then(|p| p.get_mut(slot)) {
            mcd.auto_eject_ticks = AUTO_EJECT_TICKS;
            log::info!("Auto-ejecting memory card port {} slot {}", port, slot);
        }
    }

    /// Reinsert one card immediately
    pub fn clear(&mut self, port: usize, slot: usize) {
        if let Some(mcd) = self.mcds.get_mut(port).and_then(|p| p.get_mut(slot)) {
            mcd.auto_eject_ticks = 0;
        }
    }

    pub fn set_all(&mut self) {
        for port in 0..PORTS {
            for slot in 0..SLOTS {
                self.set(port, slot);
            }
        }
    }

    pub fn clear_all(&mut self) {
        for mcd in self.mcds.iter_mut().flatten() {
            mcd.auto_eject_ticks = 0;
        }
    }
}
