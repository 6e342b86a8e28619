/*
    test_snapshot: tests for the ZXBUS library.
    Copyright (C) 2023  Rafal Michalski

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU General Public License as published by
    the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU General Public License for more details.

    You should have received a copy of the GNU General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
//! Tests the save-state record: capture, restore and serialization
//! round-trips through a human readable and a binary format.
#![cfg(feature = "snapshot")]
use rand::prelude::*;
use rand::rngs::SmallRng;

use zxbus::bus::{Bus, NullIoHandler};
use zxbus::clock::FrameClock;
use zxbus::paging::HardwareModel;
use zxbus::snapshot::{BusSnapshot, SnapshotError};

fn scrambled_bus(model: HardwareModel, seed: u64) -> Bus<FrameClock> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut bus = Bus::new(model, FrameClock::new());
    for bank in 0..bus.memory().ram_bank_count() {
        rng.fill(bus.memory_mut().ram_bank_mut(bank));
    }
    bus
}

#[test]
fn capture_restore_is_bit_exact() {
    let mut io = NullIoHandler;
    let mut bus = scrambled_bus(HardwareModel::Spectrum128, 42);
    bus.write_port(0x7FFD, 0b0001_1110, &mut io);
    let snap = bus.capture();

    let mut target = Bus::new(HardwareModel::Spectrum128, FrameClock::new());
    target.restore(&snap).unwrap();
    assert_eq!(target.capture(), snap);
    assert_eq!(target.pager(), bus.pager());
    assert_eq!(target.memory(), bus.memory());
    assert_eq!(&target.clone_full_memory()[..],
               &bus.clone_full_memory()[..]);
}

#[test]
fn restore_does_not_alias_the_snapshot() {
    let mut bus = scrambled_bus(HardwareModel::Spectrum48, 7);
    let snap = bus.capture();
    bus.write(0x5000, bus.read_no_contention(0x5000).wrapping_add(1));
    // mutating the machine leaves the captured record alone
    assert_ne!(bus.capture(), snap);
    bus.restore(&snap).unwrap();
    assert_eq!(bus.capture(), snap);
}

#[test]
fn json_roundtrip() {
    let mut io = NullIoHandler;
    let mut bus = scrambled_bus(HardwareModel::SpectrumP3, 99);
    bus.write_port(0x1FFD, 0b0000_0011, &mut io);
    let snap = bus.capture();
    let json = serde_json::to_string(&snap).unwrap();
    // banks serialize as base64 strings in human readable formats
    assert!(json.contains("\"ram_banks\":[\""));
    let back: BusSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}

#[test]
fn bincode_roundtrip() {
    let mut io = NullIoHandler;
    let mut bus = scrambled_bus(HardwareModel::SpectrumNext, 1234);
    bus.page_in_8k(6, 13);
    bus.write_port(0x7FFD, 0b0010_0001, &mut io);
    let snap = bus.capture();
    let encoded = bincode::serialize(&snap).unwrap();
    let back: BusSnapshot = bincode::deserialize(&encoded).unwrap();
    assert_eq!(back, snap);

    let mut target = Bus::new(HardwareModel::SpectrumNext, FrameClock::new());
    target.restore(&back).unwrap();
    assert_eq!(target.capture(), snap);
}

#[test]
fn serialized_snapshot_refuses_the_wrong_machine() {
    let bus = scrambled_bus(HardwareModel::Spectrum128, 5);
    let json = serde_json::to_string(&bus.capture()).unwrap();
    let snap: BusSnapshot = serde_json::from_str(&json).unwrap();
    let mut bus48 = Bus::new(HardwareModel::Spectrum48, FrameClock::new());
    assert_eq!(bus48.restore(&snap), Err(SnapshotError::ModelMismatch));
}
