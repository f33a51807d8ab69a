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

//! Serial bus configuration
//!
//! User-facing settings that change what the guest sees on the bus:
//! whether a multitap is plugged into each physical port, whether memory
//! cards get auto-ejected, and which pads are connected.
//!
//! # Example
//!
//! ```
//! use ps2rx::core::config::SioConfig;
//!
//! let config = SioConfig::from_toml_str(
//!     r#"
//!     multitap = [true, false]
//!     mcd_enable_ejection = false
//!     "#,
//! )
//! .unwrap();
//!
//! assert!(config.multitap_enabled(0));
//! assert!(!config.multitap_enabled(1));
//! ```

use crate::core::error::Result;
use crate::core::sio::{PORTS, SLOTS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// SIO configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SioConfig {
    /// Multitap plugged into physical port 0 / 1
    pub multitap: [bool; PORTS],

    /// Arm the auto-eject countdown when a card changes under the guest
    pub mcd_enable_ejection: bool,

    /// Pads connected per (port, slot). Slots 1-3 are only reachable
    /// through a multitap.
    pub pads: [[bool; SLOTS]; PORTS],
}

impl SioConfig {
    /// Parse configuration from TOML text
    ///
    /// Missing keys fall back to [`SioConfig::default`].
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Whether a multitap is configured on the given physical port
    #[inline]
    pub fn multitap_enabled(&self, port: usize) -> bool {
        self.multitap.get(port).copied().unwrap_or(false)
    }
}

impl Default for SioConfig {
    fn default() -> Self {
        Self {
            multitap: [false; PORTS],
            mcd_enable_ejection: true,
            pads: [[true, false, false, false], [false; SLOTS]],
        }
    }
}
