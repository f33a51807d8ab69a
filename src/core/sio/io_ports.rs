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

//! SIO register access
//!
//! All register accesses go through 8, 16 and 32-bit read/write methods
//! that route to SIO0 or SIO2 based on the physical address. Byte-wide
//! data registers accept byte and word accesses; the SIO0 halfword
//! registers accept halfword and word accesses; SIO2 control registers are
//! word-only.

use super::storage::McdStorage;
use super::SioContext;
use crate::core::error::{Result, SioError};
use crate::core::pad::PadPort;

/// SIO0 data register (TX on write, RX on read)
pub const SIO0_DATA: u32 = 0x1F80_1040;
pub const SIO0_STAT: u32 = 0x1F80_1044;
pub const SIO0_MODE: u32 = 0x1F80_1048;
pub const SIO0_CTRL: u32 = 0x1F80_104A;
pub const SIO0_BAUD: u32 = 0x1F80_104E;

/// First SEND3 entry; entries are 4 bytes apart
pub const SIO2_SEND3: u32 = 0x1F80_8200;
pub const SIO2_SEND3_END: u32 = 0x1F80_823C;

/// SEND1[0]; SEND1[n] and SEND2[n] interleave 8 bytes apart
pub const SIO2_SEND1: u32 = 0x1F80_8240;
pub const SIO2_SEND2: u32 = 0x1F80_8244;
pub const SIO2_SEND12_END: u32 = 0x1F80_825C;

pub const SIO2_DATA_IN: u32 = 0x1F80_8260;
pub const SIO2_DATA_OUT: u32 = 0x1F80_8264;
pub const SIO2_CTRL: u32 = 0x1F80_8268;
pub const SIO2_RECV1: u32 = 0x1F80_826C;
pub const SIO2_RECV2: u32 = 0x1F80_8270;
pub const SIO2_RECV3: u32 = 0x1F80_8274;
pub const SIO2_UNKNOWN1: u32 = 0x1F80_8278;
pub const SIO2_UNKNOWN2: u32 = 0x1F80_827C;
pub const SIO2_ISTAT: u32 = 0x1F80_8280;

impl<S: McdStorage, P: PadPort> SioContext<S, P> {
    /// Read a 32-bit register
    ///
    /// # Arguments
    ///
    /// * `paddr` - Physical address of the register
    pub fn read32(&mut self, paddr: u32) -> Result<u32> {
        let value = match paddr {
            SIO0_DATA => u32::from(self.sio0.read_rx_data()),
            SIO0_STAT => self.sio0.read_stat(),
            SIO0_MODE => u32::from(self.sio0.read_mode()),
            SIO0_CTRL => u32::from(self.sio0.read_ctrl()),
            SIO0_BAUD => u32::from(self.sio0.read_baud()),

            SIO2_SEND3..=SIO2_SEND3_END if paddr % 4 == 0 => {
                self.sio2.read_send3(((paddr - SIO2_SEND3) / 4) as usize)
            }
            SIO2_SEND1..=SIO2_SEND12_END if paddr % 4 == 0 => {
                let index = ((paddr - SIO2_SEND1) / 8) as usize;
                if (paddr - SIO2_SEND1) % 8 == 0 {
                    self.sio2.read_send1(index)
                } else {
                    self.sio2.read_send2(index)
                }
            }

            SIO2_DATA_OUT => u32::from(self.sio2.read_data_out()),
            SIO2_CTRL => self.sio2.read_ctrl(),
            SIO2_RECV1 => self.sio2.read_recv1(),
            SIO2_RECV2 => self.sio2.read_recv2(),
            SIO2_RECV3 => self.sio2.read_recv3(),
            SIO2_UNKNOWN1 => self.sio2.read_unknown1(),
            SIO2_UNKNOWN2 => self.sio2.read_unknown2(),
            SIO2_ISTAT => self.sio2.read_istat(),

            SIO2_DATA_IN => {
                return Err(SioError::UnsupportedAccessWidth {
                    address: paddr,
                    size: 4,
                })
            }
            _ => return Err(SioError::InvalidMemoryAccess { address: paddr }),
        };

        log::trace!("SIO read32 0x{:08X} -> 0x{:08X}", paddr, value);
        Ok(value)
    }

    /// Write a 32-bit register
    pub fn write32(&mut self, paddr: u32, value: u32) -> Result<()> {
        log::trace!("SIO write32 0x{:08X} <- 0x{:08X}", paddr, value);

        match paddr {
            SIO0_DATA => self.sio0_write_tx(value as u8),
            SIO0_MODE => self.sio0.write_mode(value as u16),
            SIO0_CTRL => self.sio0_write_ctrl(value as u16),
            SIO0_BAUD => self.sio0.write_baud(value as u16),
            SIO0_STAT => log::debug!("SIO0_STAT is read-only, write ignored"),

            SIO2_SEND3..=SIO2_SEND3_END if paddr % 4 == 0 => {
                self.sio2
                    .write_send3(((paddr - SIO2_SEND3) / 4) as usize, value);
            }
            SIO2_SEND1..=SIO2_SEND12_END if paddr % 4 == 0 => {
                let index = ((paddr - SIO2_SEND1) / 8) as usize;
                if (paddr - SIO2_SEND1) % 8 == 0 {
                    self.sio2.write_send1(index, value);
                } else {
                    self.sio2.write_send2(index, value);
                }
            }

            SIO2_DATA_IN => self.sio2_write_data_in(value as u8),
            SIO2_CTRL => self.sio2_write_ctrl(value),
            SIO2_UNKNOWN1 => self.sio2.write_unknown1(value),
            SIO2_UNKNOWN2 => self.sio2.write_unknown2(value),
            SIO2_ISTAT => self.sio2.write_istat(value),
            SIO2_RECV1 | SIO2_RECV2 | SIO2_RECV3 => {
                log::debug!("SIO2 RECV register 0x{:08X} is read-only, write ignored", paddr);
            }
            SIO2_DATA_OUT => {
                return Err(SioError::UnsupportedAccessWidth {
                    address: paddr,
                    size: 4,
                })
            }
            _ => return Err(SioError::InvalidMemoryAccess { address: paddr }),
        }

        Ok(())
    }

    /// Read a 16-bit register
    pub fn read16(&mut self, paddr: u32) -> Result<u16> {
        match paddr {
            SIO0_DATA => Ok(u16::from(self.sio0.read_rx_data())),
            SIO0_STAT => Ok(self.sio0.read_stat() as u16),
            SIO0_MODE => Ok(self.sio0.read_mode()),
            SIO0_CTRL => Ok(self.sio0.read_ctrl()),
            SIO0_BAUD => Ok(self.sio0.read_baud()),
            _ => Err(narrow_access_error(paddr, 2)),
        }
    }

    /// Write a 16-bit register
    pub fn write16(&mut self, paddr: u32, value: u16) -> Result<()> {
        log::trace!("SIO write16 0x{:08X} <- 0x{:04X}", paddr, value);

        match paddr {
            SIO0_DATA => self.sio0_write_tx(value as u8),
            SIO0_MODE => self.sio0.write_mode(value),
            SIO0_CTRL => self.sio0_write_ctrl(value),
            SIO0_BAUD => self.sio0.write_baud(value),
            SIO0_STAT => log::debug!("SIO0_STAT is read-only, write ignored"),
            _ => return Err(narrow_access_error(paddr, 2)),
        }
        Ok(())
    }

    /// Read an 8-bit register
    pub fn read8(&mut self, paddr: u32) -> Result<u8> {
        match paddr {
            SIO0_DATA => Ok(self.sio0.read_rx_data()),
            SIO2_DATA_OUT => Ok(self.sio2.read_data_out()),
            _ => Err(narrow_access_error(paddr, 1)),
        }
    }

    /// Write an 8-bit register
    pub fn write8(&mut self, paddr: u32, value: u8) -> Result<()> {
        match paddr {
            SIO0_DATA => self.sio0_write_tx(value),
            SIO2_DATA_IN => self.sio2_write_data_in(value),
            _ => return Err(narrow_access_error(paddr, 1)),
        }
        Ok(())
    }
}

fn narrow_access_error(paddr: u32, size: u8) -> SioError {
    if is_mapped(paddr) {
        SioError::UnsupportedAccessWidth {
            address: paddr,
            size,
        }
    } else {
        SioError::InvalidMemoryAccess { address: paddr }
    }
}

/// Whether `paddr` is an SIO register
pub fn is_mapped(paddr: u32) -> bool {
    matches!(
        paddr,
        SIO0_DATA | SIO0_STAT | SIO0_MODE | SIO0_CTRL | SIO0_BAUD
    ) || ((SIO2_SEND3..=SIO2_ISTAT).contains(&paddr) && paddr % 4 == 0)
}
