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

//! SIO module tests
//!
//! This module organizes SIO tests into logical categories:
//! - `helpers`: Shared fixtures (recording storage, bus exchanges)
//! - `sio0`: Legacy controller stage machine, STAT/CTRL and IRQ timing
//! - `sio2`: SEND3 walk, FIFOs, DMA padding and mode dispatch
//! - `mcd_protocol`: PS2 memory card commands
//! - `ps1`: Nested PS1 memory card protocol over both controllers
//! - `multitap`: Multitap probe and slot selection
//! - `auto_eject`: Auto-eject countdown and CRC checks on state load
//! - `save_state`: Save/load of the whole subsystem
//! - `io_ports`: Register map and access widths

mod auto_eject;
mod helpers;
mod save_state;
mod sio2;
