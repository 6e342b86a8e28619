/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of ZXBUS, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Save-state capture and restore.
use core::fmt;

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use crate::bus::Bus;
use crate::clock::CpuClock;
use crate::paging::{HardwareModel, Pager};

#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SnapshotError {
    /// The snapshot was captured under a different hardware model.
    ModelMismatch,
    /// The snapshot's bank counts or sizes differ from the live machine.
    GeometryMismatch,
}

impl std::error::Error for SnapshotError {}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            SnapshotError::ModelMismatch =>
                "the snapshot was captured under a different hardware model",
            SnapshotError::GeometryMismatch =>
                "the snapshot's bank layout differs from the live machine"
        })
    }
}

/// A plain data record of the full bus state: the paging registers and every
/// bank's contents.
///
/// With the `snapshot` feature the record serializes with `serde`; bank
/// contents become base64 strings in human readable formats and raw byte
/// sequences in binary ones.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BusSnapshot {
    pub model: HardwareModel,
    pub rom_index: u8,
    pub slots16: [u8; 4],
    pub slots8: [u8; 8],
    pub last_slot3: u8,
    pub special_all_ram: bool,
    pub eight_k_mode: bool,
    pub locked: bool,
    pub shadow_screen: bool,
    #[cfg_attr(feature = "snapshot", serde(
        serialize_with = "crate::memory::serde::serialize_banks",
        deserialize_with = "crate::memory::serde::deserialize_banks"))]
    pub roms: Vec<Box<[u8]>>,
    #[cfg_attr(feature = "snapshot", serde(
        serialize_with = "crate::memory::serde::serialize_banks",
        deserialize_with = "crate::memory::serde::deserialize_banks"))]
    pub ram_banks: Vec<Box<[u8]>>,
}

impl<C: CpuClock> Bus<C> {
    /// Captures the paging registers and a deep copy of every bank.
    pub fn capture(&self) -> BusSnapshot {
        let pager = self.pager();
        BusSnapshot {
            model: pager.model(),
            rom_index: pager.rom_index() as u8,
            slots16: pager.slots16(),
            slots8: pager.slots8(),
            last_slot3: pager.last_slot3(),
            special_all_ram: pager.is_special_all_ram(),
            eight_k_mode: pager.is_in_8k_mode(),
            locked: pager.is_locked(),
            shadow_screen: pager.uses_shadow_screen(),
            roms: self.memory().roms_ref().to_vec(),
            ram_banks: self.memory().ram_banks_ref().to_vec(),
        }
    }

    /// Atomically replaces the paging registers and all bank contents with
    /// the captured state.
    ///
    /// Restoring a snapshot captured under a different model or bank layout
    /// is refused and leaves the live state untouched.
    pub fn restore(&mut self, snapshot: &BusSnapshot) -> Result<(), SnapshotError> {
        if snapshot.model != self.model() {
            return Err(SnapshotError::ModelMismatch);
        }
        let memory = self.memory();
        if snapshot.roms.len() != memory.rom_count()
            || snapshot.ram_banks.len() != memory.ram_bank_count()
            || snapshot.roms.iter().any(|rom| rom.len() != memory.rom_size())
            || snapshot.ram_banks.iter().any(|bank| bank.len() != memory.bank_size())
        {
            return Err(SnapshotError::GeometryMismatch);
        }
        self.pager_mut().restore_registers(snapshot);
        self.memory_mut().replace_banks(&snapshot.roms, &snapshot.ram_banks);
        Ok(())
    }
}

impl Pager {
    pub(crate) fn restore_registers(&mut self, snapshot: &BusSnapshot) {
        self.set_registers(
            snapshot.rom_index,
            snapshot.slots16,
            snapshot.slots8,
            snapshot.last_slot3,
            snapshot.special_all_ram,
            snapshot.eight_k_mode,
            snapshot.locked,
            snapshot.shadow_screen
        );
    }
}
