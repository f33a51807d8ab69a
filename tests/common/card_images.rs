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

//! Card image builders

use ps2rx::core::sio::storage::{MemoryCardImage, PS1_CARD_SIZE};
use std::path::{Path, PathBuf};

/// PS1 image where byte `i` is `i * 7 + 3`
#[allow(dead_code)]
pub fn patterned_ps1_image() -> MemoryCardImage {
    let data = (0..PS1_CARD_SIZE).map(|i| (i * 7 + 3) as u8).collect();
    MemoryCardImage::from_bytes(data).expect("Failed to build PS1 image")
}

/// PS2 image where every raw sector is filled with its own index
#[allow(dead_code)]
pub fn indexed_ps2_image(sectors: u32) -> MemoryCardImage {
    let data = (0..sectors)
        .flat_map(|sector| std::iter::repeat(sector as u8).take(528))
        .collect();
    MemoryCardImage::from_bytes(data).expect("Failed to build PS2 image")
}

/// Blank PS2 image with the first byte cleared
#[allow(dead_code)]
pub fn marked_ps2_image(sectors: u32) -> MemoryCardImage {
    let mut data = MemoryCardImage::new_ps2_with_sectors(sectors).data().to_vec();
    data[0] = 0x00;
    MemoryCardImage::from_bytes(data).expect("Failed to build PS2 image")
}

/// Write raw image bytes to `dir/name`
#[allow(dead_code)]
pub fn write_image_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).expect("Failed to write image file");
    path
}
