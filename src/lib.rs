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

//! PlayStation 2 IOP serial I/O emulation library
//!
//! This library emulates the two serial controllers hanging off the PS2's
//! I/O processor: the PS1-compatible SIO0 and the PS2-native SIO2. Together
//! they carry controller polling, memory card traffic (PS2-native and
//! legacy PS1 commands) and multitap routing.
//!
//! # Example
//!
//! ```
//! use ps2rx::core::sio::{storage::MemoryCardImage, SioContext};
//!
//! let mut sio = SioContext::new();
//! sio.storage_mut().insert(0, 0, MemoryCardImage::new_ps2()).unwrap();
//!
//! // SEND3[0]: port 0, 5 byte command
//! sio.write32(0x1F808200, 0x0000_0500).unwrap();
//!
//! // GET_TERMINATOR on the memory card in port 0
//! for byte in [0x81, 0x28, 0x00, 0x00, 0x00] {
//!     sio.write8(0x1F808260, byte).unwrap();
//! }
//!
//! // Reply: preamble 00 FLAG, then 2B, terminator, 55
//! let reply = sio.dma_read(5);
//! assert_eq!(reply, [0x00, 0x08, 0x2B, 0x55, 0x55]);
//! ```

pub mod core;
