/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of ZXBUS, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Banked memory: ROM pages and RAM banks behind the 64Kb address space.
use core::fmt;
use std::io::{self, Read};

#[cfg(feature = "snapshot")] pub mod serde;

pub const MEM8K_SIZE : usize = 0x2000;
pub const MEM16K_SIZE: usize = 0x4000;
pub const MEM48K_SIZE: usize = 3 * MEM16K_SIZE;
pub const MEM64K_SIZE: usize = 4 * MEM16K_SIZE;

#[non_exhaustive]
#[derive(Debug)]
pub enum MemoryError {
    InvalidRomIndex,
    InvalidBankIndex,
    RomSizeMismatch,
    Io(io::Error)
}

impl std::error::Error for MemoryError {}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", match self {
            MemoryError::InvalidRomIndex => "ROM bank index is out of range",
            MemoryError::InvalidBankIndex => "RAM bank index is out of range",
            MemoryError::RomSizeMismatch => "ROM data size differs from the ROM bank size",
            MemoryError::Io(err) => return err.fmt(f)
        })
    }
}

impl From<MemoryError> for io::Error {
    fn from(err: MemoryError) -> Self {
        match err {
            MemoryError::Io(err) => err,
            e => io::Error::new(io::ErrorKind::InvalidInput, e)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MemoryKind {
    Rom,
    Ram
}

/// The physical location a 16-bit address resolves to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemoryLocation {
    /// Whether the address is backed by a ROM page or a RAM bank.
    pub kind: MemoryKind,
    /// ROM page or RAM bank index.
    pub bank: usize,
    /// An offset into the bank, always less than the bank size.
    pub offset: u16
}

/// Owns the ROM pages and RAM banks of an emulated machine.
///
/// Bank counts and sizes are fixed at construction and never change during
/// the object's lifetime. The struct performs no address translation of its
/// own; it reads and writes [MemoryLocation]s resolved by the pager.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BankedMemory {
    roms: Vec<Box<[u8]>>,
    ram_banks: Vec<Box<[u8]>>,
    rom_size: usize,
    bank_size: usize,
}

impl BankedMemory {
    /// Allocates the given number of ROM pages and RAM banks, all zeroed.
    ///
    /// # Panics
    /// Panics when either count or size is zero.
    pub fn new(
            rom_count: usize,
            rom_size: usize,
            ram_bank_count: usize,
            bank_size: usize
        ) -> Self
    {
        assert!(rom_count >= 1 && ram_bank_count >= 1,
                "at least one ROM page and one RAM bank is required");
        assert!(rom_size != 0 && bank_size != 0, "bank sizes must not be zero");
        let roms = (0..rom_count).map(|_|
                        vec![0u8; rom_size].into_boxed_slice()
                    ).collect();
        let ram_banks = (0..ram_bank_count).map(|_|
                        vec![0u8; bank_size].into_boxed_slice()
                    ).collect();
        BankedMemory { roms, ram_banks, rom_size, bank_size }
    }

    pub fn rom_count(&self) -> usize {
        self.roms.len()
    }

    pub fn ram_bank_count(&self) -> usize {
        self.ram_banks.len()
    }

    pub fn rom_size(&self) -> usize {
        self.rom_size
    }

    pub fn bank_size(&self) -> usize {
        self.bank_size
    }

    /// Fills all RAM banks with `0xFF`, the way the real hardware powers up.
    /// ROM contents are left alone.
    pub fn reset(&mut self) {
        for bank in self.ram_banks.iter_mut() {
            for byte in bank.iter_mut() {
                *byte = u8::max_value();
            }
        }
    }

    /// A reference to the ROM page with the given index, clamped into range.
    pub fn rom_bank_ref(&self, index: usize) -> &[u8] {
        &self.roms[index.min(self.roms.len() - 1)]
    }

    /// A reference to the RAM bank with the given index, clamped into range.
    pub fn ram_bank_ref(&self, index: usize) -> &[u8] {
        &self.ram_banks[index.min(self.ram_banks.len() - 1)]
    }

    /// A mutable reference to the RAM bank with the given index, clamped
    /// into range.
    pub fn ram_bank_mut(&mut self, index: usize) -> &mut [u8] {
        let index = index.min(self.ram_banks.len() - 1);
        &mut self.ram_banks[index]
    }

    /// Fills the ROM page with the given index from a reader.
    ///
    /// The reader must provide exactly the ROM page size of data.
    pub fn load_into_rom_bank<R: Read>(
            &mut self,
            index: usize,
            mut rd: R
        ) -> Result<(), MemoryError>
    {
        let rom = self.roms.get_mut(index)
                           .ok_or(MemoryError::InvalidRomIndex)?;
        rd.read_exact(rom).map_err(MemoryError::Io)?;
        match rd.read(&mut [0u8])  {
            Ok(0) => Ok(()),
            Ok(_) => Err(MemoryError::RomSizeMismatch),
            Err(e) => Err(MemoryError::Io(e))
        }
    }

    /// Reads a byte from a resolved location.
    #[inline]
    pub fn read_loc(&self, loc: MemoryLocation) -> u8 {
        let bank = match loc.kind {
            MemoryKind::Rom => &self.roms[loc.bank.min(self.roms.len() - 1)],
            MemoryKind::Ram => &self.ram_banks[loc.bank.min(self.ram_banks.len() - 1)]
        };
        bank[loc.offset as usize]
    }

    /// Writes a byte to a resolved location.
    ///
    /// ROM locations silently discard the write; returns whether the byte
    /// was stored.
    #[inline]
    pub fn write_loc(&mut self, loc: MemoryLocation, value: u8) -> bool {
        match loc.kind {
            MemoryKind::Rom => false,
            MemoryKind::Ram => {
                let index = loc.bank.min(self.ram_banks.len() - 1);
                self.ram_banks[index][loc.offset as usize] = value;
                true
            }
        }
    }

    pub(crate) fn roms_ref(&self) -> &[Box<[u8]>] {
        &self.roms
    }

    pub(crate) fn ram_banks_ref(&self) -> &[Box<[u8]>] {
        &self.ram_banks
    }

    pub(crate) fn replace_banks(
            &mut self,
            roms: &[Box<[u8]>],
            ram_banks: &[Box<[u8]>]
        )
    {
        for (dst, src) in self.roms.iter_mut().zip(roms.iter()) {
            dst.copy_from_slice(src);
        }
        for (dst, src) in self.ram_banks.iter_mut().zip(ram_banks.iter()) {
            dst.copy_from_slice(src);
        }
    }
}
