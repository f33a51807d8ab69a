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

//! IOP Interrupt Controller Implementation
//!
//! The IOP interrupt controller collects interrupt requests from the IOP-side
//! peripherals and signals the IOP CPU when an unmasked one is pending. Only
//! the lines driven by the serial controllers are named here; the remaining
//! bits are still stored so the CPU side sees a faithful register.
//!
//! ## Registers
//!
//! - **I_STAT** (0x1F801070): Interrupt status register (R/W)
//!   - Reading returns current interrupt flags
//!   - Writing 0 to a bit acknowledges that interrupt (clears the bit)
//!   - Writing 1 to a bit has no effect
//!
//! - **I_MASK** (0x1F801074): Interrupt mask register (R/W)
//!   - 1 = interrupt enabled, 0 = interrupt masked
//!
//! ## Serial Interrupt Sources
//!
//! ```text
//! Bit  | Source        | Description
//! -----|---------------|----------------------------------
//! 7    | SIO0          | Legacy controller/memory card port
//! 8    | SIO1          | Legacy serial port (unused here)
//! 17   | SIO2          | PS2 controller/memory card port
//! ```

/// Interrupt source bit flags
pub mod interrupts {
    /// SIO0 transfer interrupt (bit 7)
    pub const SIO0: u32 = 1 << 7;

    /// SIO1 serial port interrupt (bit 8)
    pub const SIO1: u32 = 1 << 8;

    /// SIO2 transfer interrupt (bit 17)
    pub const SIO2: u32 = 1 << 17;
}

/// IOP Interrupt Controller
///
/// # Example
///
/// ```
/// use ps2rx::core::interrupt::{InterruptController, interrupts};
///
/// let mut ic = InterruptController::new();
///
/// ic.request(interrupts::SIO2);
/// ic.write_mask(interrupts::SIO2);
/// assert!(ic.is_pending());
///
/// // Acknowledge by writing 0 to the bit
/// ic.write_status(!interrupts::SIO2);
/// assert!(!ic.is_pending());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InterruptController {
    /// I_STAT - one bit per pending interrupt source
    status: u32,

    /// I_MASK - 1 = interrupt enabled
    mask: u32,
}

impl InterruptController {
    /// Create a new interrupt controller with all interrupts cleared and masked
    pub fn new() -> Self {
        Self { status: 0, mask: 0 }
    }

    /// Request an interrupt
    ///
    /// Sets the specified interrupt bit(s) in the status register.
    /// Called by the serial controllers when they need to signal the IOP.
    ///
    /// # Arguments
    ///
    /// * `interrupt` - Interrupt bit(s) to set (can be multiple ORed together)
    pub fn request(&mut self, interrupt: u32) {
        self.status |= interrupt;
        log::trace!(
            "IOP IRQ requested: 0x{:08X}, status=0x{:08X}",
            interrupt,
            self.status
        );
    }

    /// Check if any interrupt is pending for the IOP CPU
    ///
    /// # Returns
    ///
    /// true if (status & mask) != 0
    pub fn is_pending(&self) -> bool {
        (self.status & self.mask) != 0
    }

    /// Check whether a specific source has been raised, ignoring the mask
    pub fn is_requested(&self, interrupt: u32) -> bool {
        (self.status & interrupt) != 0
    }

    /// Read I_STAT register
    pub fn read_status(&self) -> u32 {
        self.status
    }

    /// Write I_STAT register (acknowledge)
    ///
    /// Bits written as 0 are cleared, bits written as 1 are left unchanged.
    pub fn write_status(&mut self, value: u32) {
        self.status &= value;
        log::trace!("IOP IRQ acknowledged, status=0x{:08X}", self.status);
    }

    /// Read I_MASK register
    pub fn read_mask(&self) -> u32 {
        self.mask
    }

    /// Write I_MASK register
    pub fn write_mask(&mut self, value: u32) {
        self.mask = value;
        log::debug!("IOP IRQ mask set: 0x{:08X}", self.mask);
    }

    /// Clear all pending interrupts and masks
    pub fn reset(&mut self) {
        self.status = 0;
        self.mask = 0;
    }
}

#[cfg(test)]
mod tests;
