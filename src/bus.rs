/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of ZXBUS, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! The contended memory and I/O bus façade.
use std::io::Read;

use crate::clock::{ContentionClock, CpuClock};
use crate::memory::{MEM64K_SIZE, BankedMemory, MemoryError, MemoryLocation};
use crate::paging::{BankGranularity, HardwareModel, Pager};
use crate::video::ScreenGeometry;

/// The peripheral side of port I/O.
///
/// Keyboard, beeper, AY sound and the like are external collaborators; the
/// bus applies the I/O cycle timing and the paging port decoding, then
/// delegates the transfer here.
pub trait IoHandler {
    /// Reads a byte from a peripheral port. `None` when no peripheral
    /// responds; the bus then yields the floating bus default `0xFF`.
    fn read_io(&mut self, port: u16) -> Option<u8>;
    /// Writes a byte to a peripheral port. Returns whether any peripheral
    /// accepted the write.
    fn write_io(&mut self, port: u16, data: u8) -> bool;
}

/// An [IoHandler] with no peripherals attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullIoHandler;

impl IoHandler for NullIoHandler {
    fn read_io(&mut self, _port: u16) -> Option<u8> {
        None
    }

    fn write_io(&mut self, _port: u16, _data: u8) -> bool {
        false
    }
}

/// The bus the CPU driver talks to for every memory and I/O cycle.
///
/// Owns the banked memory, the paging state machine and the contention
/// tables; borrows the CPU's tact counter through the [CpuClock] it was
/// constructed with. Every access applies the model's contention delay to
/// the clock before the transfer.
#[derive(Debug)]
pub struct Bus<C: CpuClock> {
    clock: C,
    memory: BankedMemory,
    pager: Pager,
    contention: ContentionClock,
}

impl<C: CpuClock> Bus<C> {
    /// Creates a bus for the given hardware model with the model's stock
    /// frame geometry.
    pub fn new(model: HardwareModel, clock: C) -> Self {
        Bus::with_geometry(model, &model.geometry(), clock)
    }

    /// Creates a bus for the given hardware model with a custom frame
    /// geometry.
    pub fn with_geometry(
            model: HardwareModel,
            geometry: &ScreenGeometry,
            clock: C
        ) -> Self
    {
        let cfg = model.config();
        let memory = BankedMemory::new(cfg.rom_count, cfg.rom_size,
                                       cfg.ram_bank_count, cfg.bank_size);
        Bus {
            clock,
            memory,
            pager: Pager::new(model),
            contention: ContentionClock::new(geometry),
        }
    }

    pub fn model(&self) -> HardwareModel {
        self.pager.model()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn memory(&self) -> &BankedMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut BankedMemory {
        &mut self.memory
    }

    pub fn pager(&self) -> &Pager {
        &self.pager
    }

    pub(crate) fn pager_mut(&mut self) -> &mut Pager {
        &mut self.pager
    }

    pub fn contention(&self) -> &ContentionClock {
        &self.contention
    }

    /// Restores the default paging state and fills RAM with `0xFF`.
    pub fn reset(&mut self) {
        self.pager.reset();
        self.memory.reset();
    }

    /// Reads a byte, delaying the clock first when the address is contended.
    pub fn read(&mut self, addr: u16) -> u8 {
        self.memory_contention(addr);
        self.memory.read_loc(self.pager.locate(addr))
    }

    /// Reads a byte without applying contention, for non-CPU "shadow" reads
    /// such as tape-loading fast paths or debugger views.
    pub fn read_no_contention(&self, addr: u16) -> u8 {
        self.memory.read_loc(self.pager.locate(addr))
    }

    /// Reads a little-endian word with two contended accesses.
    pub fn read16(&mut self, addr: u16) -> u16 {
        let lo = self.read(addr);
        let hi = self.read(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    /// Writes a byte, delaying the clock first when the address is
    /// contended. The contention check happens at the tact of the write
    /// request. Writes to ROM are silently discarded.
    pub fn write(&mut self, addr: u16, value: u8) {
        self.memory_contention(addr);
        self.memory.write_loc(self.pager.locate(addr), value);
    }

    /// Writes a byte without applying contention.
    pub fn write_no_contention(&mut self, addr: u16, value: u8) {
        self.memory.write_loc(self.pager.locate(addr), value);
    }

    /// Writes a little-endian word with two contended accesses.
    pub fn write16(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    /// Performs a 4-tact port read cycle: I/O contention timing first, then
    /// the transfer, delegated to the handler.
    pub fn read_port<H: IoHandler>(&mut self, port: u16, handler: &mut H) -> u8 {
        self.io_contention(port);
        handler.read_io(port).unwrap_or(u8::max_value())
    }

    /// Performs a 4-tact port write cycle: I/O contention timing first, then
    /// paging control decoding, then the transfer, delegated to the handler.
    ///
    /// Writes decoded as memory control writes drive the pager and are not
    /// forwarded to the handler.
    pub fn write_port<H: IoHandler>(&mut self, port: u16, data: u8, handler: &mut H) {
        self.io_contention(port);
        if self.pager.write_mem_port(port, data) {
            return;
        }
        handler.write_io(port, data);
    }

    /// See [Pager::select_rom].
    pub fn select_rom(&mut self, rom_index: usize) {
        self.pager.select_rom(rom_index);
    }

    /// See [Pager::rom_index].
    pub fn rom_index(&self) -> usize {
        self.pager.rom_index()
    }

    /// See [Pager::page_in].
    pub fn page_in(&mut self, slot: usize, bank: usize) {
        self.pager.page_in(slot, bank);
    }

    /// See [Pager::page_in_8k].
    pub fn page_in_8k(&mut self, slot: usize, page: usize) {
        self.pager.page_in_8k(slot, page);
    }

    /// See [Pager::selected_bank].
    pub fn selected_bank(&self, slot: usize, granularity: BankGranularity) -> usize {
        self.pager.selected_bank(slot, granularity)
    }

    /// See [Pager::is_ram_bank_paged_in].
    pub fn is_ram_bank_paged_in(&self, bank: usize) -> Option<u16> {
        self.pager.is_ram_bank_paged_in(bank)
    }

    /// See [Pager::locate]. Used by debuggers; never delays the clock.
    pub fn locate(&self, addr: u16) -> MemoryLocation {
        self.pager.locate(addr)
    }

    /// See [BankedMemory::load_into_rom_bank].
    pub fn load_into_rom_bank<R: Read>(
            &mut self,
            index: usize,
            rd: R
        ) -> Result<(), MemoryError>
    {
        self.memory.load_into_rom_bank(index, rd)
    }

    /// Flattens the current bank mapping into one contiguous 64Kb image.
    pub fn clone_full_memory(&self) -> Box<[u8; MEM64K_SIZE]> {
        let mut image = Box::new([0u8; MEM64K_SIZE]);
        // copy in 8K slices, the finest mapping granularity of any model
        for (n, chunk) in image.chunks_mut(0x2000).enumerate() {
            let loc = self.pager.locate((n * 0x2000) as u16);
            let bank = match loc.kind {
                crate::memory::MemoryKind::Rom =>
                    self.memory.rom_bank_ref(loc.bank),
                crate::memory::MemoryKind::Ram =>
                    self.memory.ram_bank_ref(loc.bank),
            };
            let offset = loc.offset as usize;
            chunk.copy_from_slice(&bank[offset..offset + 0x2000]);
        }
        image
    }

    fn memory_contention(&mut self, addr: u16) {
        if self.pager.is_contended_address(addr) {
            let frame_tact = self.contention.frame_tact(self.clock.current_tact());
            let delay = self.contention.memory_delay(frame_tact);
            self.clock.delay(delay.into());
        }
    }

    // The 4-tact I/O cycle. Contended ports sample the contention table
    // before each ULA-visible tact; the table lookups see the clock as it
    // advances.
    fn io_contention(&mut self, port: u16) {
        if self.pager.is_contended_address(port) {
            if port & 1 == 1 {
                // C:1, C:1, C:1, C:1
                for _ in 0..4 {
                    self.port_contention();
                    self.clock.delay(1);
                }
            }
            else {
                // C:1, C:3
                self.port_contention();
                self.clock.delay(1);
                self.port_contention();
                self.clock.delay(3);
            }
        }
        else {
            // no ULA-dependent component
            self.clock.delay(4);
        }
    }

    fn port_contention(&mut self) {
        let frame_tact = self.contention.frame_tact(self.clock.current_tact());
        let delay = self.contention.memory_delay(frame_tact);
        self.clock.delay(delay.into());
    }
}
