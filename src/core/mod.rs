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

//! Core emulation components
//!
//! This module contains the IOP serial bus and everything hanging off it:
//! - SIO0 (legacy PS1 controller port)
//! - SIO2 (PS2 controller/memory card port)
//! - Memory card protocols and storage
//! - Pads (DualShock2)
//! - Interrupt controller and timing events
//! - Configuration and save states

pub mod config;
pub mod error;
pub mod interrupt;
pub mod pad;
pub mod save_state;
pub mod sio;
pub mod timing;

// Re-export commonly used types
pub use config::SioConfig;
pub use error::{Result, SioError};
pub use interrupt::InterruptController;
pub use pad::{Pad, PadPort, PadPorts};
pub use sio::SioContext;
