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

/// Emulator error types
///
/// Guest-visible protocol problems are never errors: the serial bus answers
/// them with dead bytes the same way the hardware does. These variants only
/// cover host-side failures (bad register address, files, config, states).
use thiserror::Error;

/// Result type for SIO operations
pub type Result<T> = std::result::Result<T, SioError>;

/// Main error type for the SIO subsystem
#[derive(Error, Debug)]
pub enum SioError {
    #[error("Invalid I/O register access at 0x{address:08X}")]
    InvalidMemoryAccess { address: u32 },

    #[error("Unsupported {size}-byte access at 0x{address:08X}")]
    UnsupportedAccessWidth { address: u32, size: u8 },

    #[error("Invalid port/slot: port {port}, slot {slot}")]
    InvalidSlot { port: usize, slot: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Memory card error: {0}")]
    MemoryCard(#[from] CardError),

    #[error("Save state error: {0}")]
    SaveState(#[from] SaveStateError),
}

/// Memory card image errors
#[derive(Error, Debug)]
pub enum CardError {
    #[error("Unrecognized memory card image size: {size} bytes")]
    InvalidImageSize { size: usize },

    #[error("No card inserted in port {port}, slot {slot}")]
    NoCard { port: usize, slot: usize },

    #[error("Sector {sector} is beyond the card's {sectors} sectors")]
    SectorOutOfRange { sector: u32, sectors: u32 },
}

/// Save state errors
#[derive(Error, Debug)]
pub enum SaveStateError {
    #[error("Incompatible save state version: expected {expected}, got {got}")]
    VersionMismatch { expected: u32, got: u32 },

    #[error("Save state section tag mismatch: expected '{expected}', got '{got}'")]
    TagMismatch { expected: String, got: String },

    #[error("Encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("Decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}
