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

//! Memory card inspector
//!
//! Loads a card image into a virtual port and talks to it over the same
//! register interface the IOP uses: GetSpecs and sector reads over SIO2
//! for PS2 cards, the legacy read command over SIO0 for PS1 cards.

use clap::Parser;
use log::{error, info, warn};
use ps2rx::core::config::SioConfig;
use ps2rx::core::error::{CardError, Result};
use ps2rx::core::sio::io_ports::{
    SIO0_CTRL, SIO0_DATA, SIO2_DATA_IN, SIO2_DATA_OUT, SIO2_RECV1, SIO2_SEND3,
};
use ps2rx::core::sio::sio0::Sio0Ctrl;
use ps2rx::core::sio::sio2::recv1;
use ps2rx::core::sio::storage::{CardKind, McdStorage, PS1_SECTOR_SIZE};
use ps2rx::core::sio::SioContext;
use serde::Serialize;
use std::path::PathBuf;

/// PS2 memory card inspector
#[derive(Parser)]
#[command(name = "ps2rx-sio")]
#[command(about = "Inspect a PS2/PS1 memory card image through emulated SIO", long_about = None)]
struct Args {
    /// Path to the memory card image (.ps2 / .mcd)
    card: PathBuf,

    /// Physical port to insert the card into
    #[arg(short = 'p', long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..2))]
    port: u8,

    /// Multitap slot (1-3 enable a multitap on the port)
    #[arg(short = 's', long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..4))]
    slot: u8,

    /// Sector to read
    #[arg(short = 'n', long, default_value = "0")]
    sector: u32,

    /// SIO configuration file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct CardReport {
    port: u8,
    slot: u8,
    kind: &'static str,
    sector_size: u16,
    erase_block_sectors: u16,
    sectors: u32,
    sector: u32,
    checksum_ok: bool,
    data: String,
}

fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("ps2rx-sio v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SioConfig::load_from_file(path)?,
        None => SioConfig::default(),
    };
    if args.slot > 0 {
        config.multitap[usize::from(args.port)] = true;
    }

    let mut sio = SioContext::with_config(config);
    let (port, slot) = (usize::from(args.port), usize::from(args.slot));
    sio.storage_mut().load_image(port, slot, &args.card)?;

    if args.slot > 0 {
        select_multitap_slot(&mut sio, args.port, args.slot)?;
    }

    let kind = sio
        .storage()
        .card(port, slot)
        .map(|card| card.kind())
        .ok_or(CardError::NoCard { port, slot })?;

    let report = match kind {
        CardKind::Ps2 => inspect_ps2(&mut sio, &args)?,
        CardKind::Ps1 => inspect_ps1(&mut sio, &args)?,
    };

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize report: {}", e),
        }
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Run one SIO2 command and drain its reply
fn sio2_exchange(sio: &mut SioContext, port: u8, bytes: &[u8]) -> Result<Vec<u8>> {
    sio.write32(SIO2_SEND3, u32::from(port) | ((bytes.len() as u32) << 8))?;
    sio.write32(SIO2_SEND3 + 4, 0)?;
    for &byte in bytes {
        sio.write8(SIO2_DATA_IN, byte)?;
    }

    let len = sio.sio2().fifo().output.len();
    (0..len).map(|_| sio.read8(SIO2_DATA_OUT)).collect()
}

fn select_multitap_slot(sio: &mut SioContext, port: u8, slot: u8) -> Result<()> {
    let reply = sio2_exchange(sio, port, &[0x21, 0x22, slot, 0x00, 0x00, 0x00])?;
    if reply.get(4) != Some(&slot) {
        warn!("Multitap did not accept slot {} (reply {:02X?})", slot, reply);
    }
    Ok(())
}

fn inspect_ps2(sio: &mut SioContext, args: &Args) -> Result<CardReport> {
    let mut get_specs = vec![0x81, 0x26];
    get_specs.resize(13, 0x00);
    let specs = sio2_exchange(sio, args.port, &get_specs)?;
    if sio.read32(SIO2_RECV1)? != recv1::CONNECTED {
        return Err(CardError::NoCard {
            port: usize::from(args.port),
            slot: usize::from(args.slot),
        }
        .into());
    }

    let info = sio
        .storage()
        .size_info(usize::from(args.port), usize::from(args.slot));
    info!(
        "GetSpecs: {:02X?} ({} byte sectors, {} sectors per block, {} sectors)",
        specs, info.sector_size, info.erase_block_size_in_sectors, info.mc_size_in_sectors
    );

    let sector = info.check_sector(args.sector)?.to_le_bytes();
    let xor = sector.iter().fold(0u8, |acc, b| acc ^ b);
    let mut set_sector = vec![0x81, 0x23];
    set_sector.extend(sector);
    set_sector.extend([xor, 0x00, 0x00]);
    sio2_exchange(sio, args.port, &set_sector)?;

    // ReadData moves at most 128 bytes per command
    let mut data = Vec::with_capacity(usize::from(info.sector_size));
    let mut checksum_ok = true;
    while data.len() < usize::from(info.sector_size) {
        let chunk = (usize::from(info.sector_size) - data.len()).min(128);
        let reply = sio2_exchange(sio, args.port, &[0x81, 0x43, chunk as u8])?;
        let Some(payload) = reply.get(4..4 + chunk) else {
            warn!("Short ReadData reply: {} bytes", reply.len());
            checksum_ok = false;
            break;
        };

        let expected = payload.iter().fold(0u8, |acc, b| acc ^ b);
        checksum_ok &= reply.get(4 + chunk) == Some(&expected);
        data.extend_from_slice(payload);
    }

    Ok(CardReport {
        port: args.port,
        slot: args.slot,
        kind: "PS2",
        sector_size: info.sector_size,
        erase_block_sectors: info.erase_block_size_in_sectors,
        sectors: info.mc_size_in_sectors,
        sector: args.sector,
        checksum_ok,
        data: hex(&data),
    })
}

fn inspect_ps1(sio: &mut SioContext, args: &Args) -> Result<CardReport> {
    let info = sio
        .storage()
        .size_info(usize::from(args.port), usize::from(args.slot));
    let sector = info.check_sector(args.sector)?;

    let mut ctrl = Sio0Ctrl::TX_ENABLE | Sio0Ctrl::DTR;
    if args.port == 1 {
        ctrl |= Sio0Ctrl::PORT;
    }
    sio.write16(SIO0_CTRL, ctrl.bits())?;

    let [_, _, msb, lsb] = sector.to_be_bytes();
    let mut command = vec![0x81, 0x52, 0x00, 0x00, msb, lsb];
    command.resize(140, 0x00);

    let mut rx = Vec::with_capacity(command.len());
    for byte in command {
        sio.write8(SIO0_DATA, byte)?;
        rx.push(sio.read8(SIO0_DATA)?);
    }
    sio.write16(SIO0_CTRL, 0)?;

    let data = &rx[10..10 + PS1_SECTOR_SIZE];
    let expected = data.iter().fold(msb ^ lsb, |acc, b| acc ^ b);
    let checksum_ok = rx[138] == expected && rx[139] == 0x47;
    if !checksum_ok {
        warn!(
            "PS1 read of sector 0x{:03X} ended with {:02X} {:02X}",
            args.sector, rx[138], rx[139]
        );
    }

    Ok(CardReport {
        port: args.port,
        slot: args.slot,
        kind: "PS1",
        sector_size: info.sector_size,
        erase_block_sectors: info.erase_block_size_in_sectors,
        sectors: info.mc_size_in_sectors,
        sector: args.sector,
        checksum_ok,
        data: hex(data),
    })
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02X}", b)).collect()
}

fn print_report(report: &CardReport) {
    println!(
        "{} card in port {} slot {}: {} sectors of {} bytes, {} sectors per erase block",
        report.kind,
        report.port,
        report.slot,
        report.sectors,
        report.sector_size,
        report.erase_block_sectors
    );
    println!(
        "Sector {} (checksum {}):",
        report.sector,
        if report.checksum_ok { "ok" } else { "BAD" }
    );
    for line in report.data.as_bytes().chunks(64) {
        println!("  {}", String::from_utf8_lossy(line));
    }
}
