/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of ZXBUS, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! The per-model paging state machine and the memory control port decoding.
use bitflags::bitflags;
use log::{debug, trace};

#[cfg(feature = "snapshot")]
use serde::{Serialize, Deserialize};

use crate::memory::{MEM8K_SIZE, MEM16K_SIZE, MEM48K_SIZE, MemoryKind, MemoryLocation};
use crate::video::ScreenGeometry;

/// The slot entry value marking "ROM paged in here" in the 8K slot table.
pub const ROM_PAGE_8K: u8 = 0xFF;

/// The emulated hardware model.
///
/// Selects bank counts, slot-mapping rules, the contended-bank predicate and
/// the frame geometry; all model-specific behavior dispatches on this value.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HardwareModel {
    /// 48k: one ROM, one unbanked 48K RAM region.
    Spectrum48,
    /// 128k/+2: two ROMs, 8 RAM banks, port `0x7FFD` paging.
    Spectrum128,
    /// +2A/+3: four ROMs, 8 RAM banks, ports `0x7FFD` and `0x1FFD`,
    /// special all-RAM layouts.
    SpectrumP3,
    /// Next: two ROMs, 16 8K RAM pages, additional 8K-granular paging.
    SpectrumNext
}

/// Static per-model bank layout descriptor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ModelConfig {
    pub rom_count: usize,
    pub rom_size: usize,
    pub ram_bank_count: usize,
    pub bank_size: usize,
    /// RAM is organized as 8K pages; 16K paging maps page pairs.
    pub eight_k_pages: bool,
}

impl ModelConfig {
    /// Number of 16K RAM banks addressable by 16K-granular paging.
    pub fn bank16_count(&self) -> usize {
        if self.eight_k_pages {
            self.ram_bank_count / 2
        }
        else {
            self.ram_bank_count
        }
    }

    /// Number of 8K RAM pages the 8K slot table can refer to.
    pub fn page8_count(&self) -> usize {
        if self.eight_k_pages {
            self.ram_bank_count
        }
        else {
            self.ram_bank_count * 2
        }
    }
}

impl HardwareModel {
    pub fn config(self) -> ModelConfig {
        match self {
            HardwareModel::Spectrum48 => ModelConfig {
                rom_count: 1, rom_size: MEM16K_SIZE,
                ram_bank_count: 1, bank_size: MEM48K_SIZE,
                eight_k_pages: false
            },
            HardwareModel::Spectrum128 => ModelConfig {
                rom_count: 2, rom_size: MEM16K_SIZE,
                ram_bank_count: 8, bank_size: MEM16K_SIZE,
                eight_k_pages: false
            },
            HardwareModel::SpectrumP3 => ModelConfig {
                rom_count: 4, rom_size: MEM16K_SIZE,
                ram_bank_count: 8, bank_size: MEM16K_SIZE,
                eight_k_pages: false
            },
            HardwareModel::SpectrumNext => ModelConfig {
                rom_count: 2, rom_size: MEM16K_SIZE,
                ram_bank_count: 16, bank_size: MEM8K_SIZE,
                eight_k_pages: true
            }
        }
    }

    /// Whether accesses to the given 16K RAM bank contend with the ULA.
    pub fn is_bank_contended(self, bank: usize) -> bool {
        match self {
            HardwareModel::Spectrum48 => false,
            HardwareModel::Spectrum128 => bank & 1 == 1,
            // banks 4, 5, 6 and 7 live in the contended RAM chips
            HardwareModel::SpectrumP3|
            HardwareModel::SpectrumNext => bank >= 4
        }
    }

    /// The frame geometry of the stock machine.
    pub fn geometry(self) -> ScreenGeometry {
        match self {
            HardwareModel::Spectrum48 => ScreenGeometry::spectrum_48_pal(),
            HardwareModel::Spectrum128|
            HardwareModel::SpectrumP3|
            HardwareModel::SpectrumNext => ScreenGeometry::spectrum_128_pal()
        }
    }

    /// Whether the model decodes writes to the given port as a paging
    /// control write.
    pub fn decodes_mem_port(self, port: u16) -> bool {
        match self {
            HardwareModel::Spectrum48 => false,
            HardwareModel::Spectrum128 => is_port_7ffd(port),
            HardwareModel::SpectrumP3|
            HardwareModel::SpectrumNext => is_port_7ffd(port) || is_port_1ffd(port)
        }
    }
}

/// Port `0x7FFD`: bit 14 set, bits 15 and 1 reset.
#[inline]
pub fn is_port_7ffd(port: u16) -> bool {
    port & 0xC002 == 0x4000
}

/// Port `0x1FFD`: bit 12 set, bits 13, 14, 15 and 1 reset.
#[inline]
pub fn is_port_1ffd(port: u16) -> bool {
    port & 0xF002 == 0x1000
}

bitflags! {
    /// Memory control flags of port `0x7FFD`.
    ///
    /// | Dir | b7  | b6  | b5  | b4  | b3  | b2  | b1  | b0  |
    /// |-----|-----|-----|-----|-----|-----|-----|-----|-----|
    /// | OUT |     |     | LCK | ROL | SCR | RB2 | RB1 | RB0 |
    ///
    /// RAM bank paged into the last slot: `RB2 * 4 + RB1 * 2 + RB0`.
    #[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
    pub struct Mem128Flags: u8 {
        const RAM_BANK0   = 0b00_0001;
        const RAM_BANK1   = 0b00_0010;
        const RAM_BANK2   = 0b00_0100;
        const SCREEN_BANK = 0b00_1000;
        const ROM_BANK    = 0b01_0000;
        const LOCK_MMU    = 0b10_0000;
    }
}

impl Mem128Flags {
    pub const RAM_BANK_MASK: Self = Self::from_bits_retain(0b00_0111);

    /// Create flags from raw bits in `data` by truncating unused bits.
    #[inline]
    pub fn from_data(data: u8) -> Self {
        Mem128Flags::from_bits_retain(data) & Mem128Flags::all()
    }

    /// The RAM bank index for the last 16K slot.
    pub fn ram_bank(self) -> usize {
        (self & Mem128Flags::RAM_BANK_MASK).bits().into()
    }

    /// The low bit of the ROM selection.
    pub fn rom_bank_low(self) -> usize {
        self.intersects(Mem128Flags::ROM_BANK).into()
    }

    /// Returns `true` if the shadow screen bank (RAM 7) is selected.
    pub fn is_shadow_screen(self) -> bool {
        self.intersects(Mem128Flags::SCREEN_BANK)
    }

    /// Returns `true` if this write sets the one-way paging lock.
    pub fn is_locking_mmu(self) -> bool {
        self.intersects(Mem128Flags::LOCK_MMU)
    }
}

bitflags! {
    /// Secondary memory control flags of port `0x1FFD` (+2A/+3).
    ///
    /// | Dir | b7  | b6  | b5  | b4  | b3  | b2  | b1  | b0  |
    /// |-----|-----|-----|-----|-----|-----|-----|-----|-----|
    /// | OUT |     |     |     | PRT | DSK | ROH |     |  0  |
    /// | OUT |     |     |     | PRT | DSK | PL1 | PL0 |  1  |
    ///
    /// With bit 0 reset `ROH` is the high bit of the ROM selection; with bit
    /// 0 set bits 1-2 select one of the special all-RAM [layouts][SpecialLayout].
    #[derive(Default, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
    pub struct Plus3Flags: u8 {
        const EXT_PAGING     = 0b0_0001;
        const PAGE_LAYOUT1   = 0b0_0010;
        const ROM_BANK_HI    = 0b0_0100;
        const DISC_MOTOR     = 0b0_1000;
        const PRINTER_STROBE = 0b1_0000;
    }
}

impl Plus3Flags {
    pub const PAGE_LAYOUT2: Self = Self::ROM_BANK_HI;
    pub const PAGE_LAYOUT_MASK: Self = Self::from_bits_retain(0b0_0110);

    /// Create flags from raw bits in `data` by truncating unused bits.
    #[inline]
    pub fn from_data(data: u8) -> Self {
        Plus3Flags::from_bits_retain(data) & Plus3Flags::all()
    }

    /// Returns `true` if this write selects special all-RAM paging.
    pub fn is_special_paging(self) -> bool {
        self.intersects(Plus3Flags::EXT_PAGING)
    }

    /// The special all-RAM layout selected by bits 1-2.
    pub fn special_layout(self) -> SpecialLayout {
        match (self & Plus3Flags::PAGE_LAYOUT_MASK).bits() >> 1 {
            0 => SpecialLayout::Banks0123,
            1 => SpecialLayout::Banks4567,
            2 => SpecialLayout::Banks4563,
            _ => SpecialLayout::Banks4763
        }
    }

    /// The high bit of the ROM selection.
    pub fn rom_bank_high(self) -> usize {
        self.intersects(Plus3Flags::ROM_BANK_HI).into()
    }

    /// Returns `true` if the floppy drive motor bit is set.
    pub fn is_disc_motor_on(self) -> bool {
        self.intersects(Plus3Flags::DISC_MOTOR)
    }

    /// Returns `true` if the printer port strobe bit is set.
    pub fn is_printer_strobe_on(self) -> bool {
        self.intersects(Plus3Flags::PRINTER_STROBE)
    }
}

/// A selection of the +2A/+3 special all-RAM slot layout.
#[cfg_attr(feature = "snapshot", derive(Serialize, Deserialize))]
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy)]
#[repr(u8)]
pub enum SpecialLayout {
    /// RAM0, RAM1, RAM2, RAM3
    Banks0123 = 0,
    /// RAM4, RAM5, RAM6, RAM7
    Banks4567 = 1,
    /// RAM4, RAM5, RAM6, RAM3
    Banks4563 = 2,
    /// RAM4, RAM7, RAM6, RAM3
    Banks4763 = 3
}

impl SpecialLayout {
    /// The RAM banks mapped into slots 0 to 3 by this layout.
    pub fn ram_banks(self) -> [u8; 4] {
        match self {
            SpecialLayout::Banks0123 => [0, 1, 2, 3],
            SpecialLayout::Banks4567 => [4, 5, 6, 7],
            SpecialLayout::Banks4563 => [4, 5, 6, 3],
            SpecialLayout::Banks4763 => [4, 7, 6, 3]
        }
    }
}

/// Bank paging granularity selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BankGranularity {
    /// Classic 16K banks.
    Bank16k,
    /// Next-style 8K pages.
    Page8k
}

/// The paging state machine.
///
/// Holds the live slot-to-bank mapping and the paging registers, decodes
/// memory control port writes into paging commands and resolves addresses to
/// physical [MemoryLocation]s. All selector inputs clamp into range instead
/// of failing, matching the partial-decode behavior of the real hardware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pager {
    model: HardwareModel,
    rom_low: u8,
    rom_high: u8,
    slots16: [u8; 4],
    slots8: [u8; 8],
    last_slot3: u8,
    special_all_ram: bool,
    eight_k_mode: bool,
    locked: bool,
    shadow_screen: bool,
}

impl Pager {
    pub fn new(model: HardwareModel) -> Self {
        let mut pager = Pager {
            model,
            rom_low: 0,
            rom_high: 0,
            slots16: [0; 4],
            slots8: [0; 8],
            last_slot3: 0,
            special_all_ram: false,
            eight_k_mode: false,
            locked: false,
            shadow_screen: false,
        };
        pager.reset();
        pager
    }

    pub fn model(&self) -> HardwareModel {
        self.model
    }

    /// Restores the hardware-defined default mapping and unlocks paging.
    /// Idempotent.
    pub fn reset(&mut self) {
        self.rom_low = 0;
        self.rom_high = 0;
        self.slots16 = match self.model {
            HardwareModel::Spectrum48 => [0, 0, 0, 0],
            _ => [0, 5, 2, 0]
        };
        // the 8K table mirrors the 16K map as page pairs, ROM at slot 0;
        // on the 128-class defaults this reads [FF, FF, 10, 11, 4, 5, 0, 1]
        self.slots8[0] = ROM_PAGE_8K;
        self.slots8[1] = ROM_PAGE_8K;
        for slot in 2..8 {
            self.slots8[slot] = self.slots16[slot >> 1] * 2 + (slot as u8 & 1);
        }
        self.last_slot3 = 0;
        self.special_all_ram = false;
        self.eight_k_mode = false;
        self.locked = false;
        self.shadow_screen = false;
    }

    /// The currently selected ROM index.
    pub fn rom_index(&self) -> usize {
        usize::from(self.rom_high << 1 | self.rom_low)
    }

    /// Returns `true` while no ROM is visible anywhere in the address space.
    pub fn is_special_all_ram(&self) -> bool {
        self.special_all_ram
    }

    /// Returns `true` while the Next 8K-granular slot table is active.
    pub fn is_in_8k_mode(&self) -> bool {
        self.eight_k_mode
    }

    /// Returns `true` once the one-way paging lock latch has been set.
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Returns `true` if the shadow screen bank (RAM 7) is selected.
    pub fn uses_shadow_screen(&self) -> bool {
        self.shadow_screen
    }

    /// The live 16K slot-to-bank map.
    pub fn slots16(&self) -> [u8; 4] {
        self.slots16
    }

    /// The live 8K slot-to-page map; [ROM_PAGE_8K] entries mark ROM.
    pub fn slots8(&self) -> [u8; 8] {
        self.slots8
    }

    /// The last slot 3 bank selected through port `0x7FFD`.
    pub fn last_slot3(&self) -> u8 {
        self.last_slot3
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn set_registers(
            &mut self,
            rom_index: u8,
            slots16: [u8; 4],
            slots8: [u8; 8],
            last_slot3: u8,
            special_all_ram: bool,
            eight_k_mode: bool,
            locked: bool,
            shadow_screen: bool
        )
    {
        let cfg = self.model.config();
        let rom_index = usize::from(rom_index).min(cfg.rom_count - 1);
        self.rom_low = (rom_index & 1) as u8;
        self.rom_high = (rom_index >> 1) as u8;
        self.slots16 = slots16;
        for bank in self.slots16.iter_mut() {
            *bank = (*bank).min((cfg.bank16_count() - 1) as u8);
        }
        self.slots8 = slots8;
        for page in self.slots8.iter_mut() {
            if *page != ROM_PAGE_8K {
                *page = (*page).min((cfg.page8_count() - 1) as u8);
            }
        }
        self.last_slot3 = last_slot3 & 7;
        self.special_all_ram = special_all_ram;
        self.eight_k_mode = eight_k_mode;
        self.locked = locked;
        self.shadow_screen = shadow_screen;
    }

    /// Selects the visible ROM, clamping the index into range.
    ///
    /// Selecting a ROM always re-asserts normal paging mode; ROM selection
    /// and special paging share control bits on the real hardware.
    pub fn select_rom(&mut self, rom_index: usize) {
        let rom_index = rom_index.min(self.model.config().rom_count - 1);
        self.rom_low = (rom_index & 1) as u8;
        self.rom_high = (rom_index >> 1) as u8;
        self.special_all_ram = false;
    }

    /// Pages a 16K RAM bank into a 16K slot, clamping the bank into range.
    ///
    /// Paging any slot other than slot 3 enters special all-RAM mode. Inert
    /// on the unbanked 48k model.
    pub fn page_in(&mut self, slot: usize, bank: usize) {
        if let HardwareModel::Spectrum48 = self.model {
            return;
        }
        let slot = slot & 3;
        let bank = bank.min(self.model.config().bank16_count() - 1);
        self.slots16[slot] = bank as u8;
        if slot != 3 {
            self.special_all_ram = true;
        }
        if self.model.config().eight_k_pages {
            self.eight_k_mode = false;
            self.slots8[slot * 2] = (bank * 2) as u8;
            self.slots8[slot * 2 + 1] = (bank * 2 + 1) as u8;
        }
    }

    /// Pages an 8K RAM page into an 8K slot, clamping the page into range.
    ///
    /// Activates the 8K slot table. Inert on models without 8K pages.
    pub fn page_in_8k(&mut self, slot: usize, page: usize) {
        if !self.model.config().eight_k_pages {
            return;
        }
        let page = page.min(self.model.config().ram_bank_count - 1);
        self.slots8[slot & 7] = page as u8;
        self.eight_k_mode = true;
    }

    /// The bank currently paged into the given slot.
    ///
    /// With [BankGranularity::Page8k] the returned value is an 8K page
    /// index, [ROM_PAGE_8K] meaning a ROM page.
    pub fn selected_bank(&self, slot: usize, granularity: BankGranularity) -> usize {
        match granularity {
            BankGranularity::Bank16k => self.slots16[slot & 3].into(),
            BankGranularity::Page8k => {
                let slot = slot & 7;
                if self.model.config().eight_k_pages {
                    self.slots8[slot].into()
                }
                else {
                    usize::from(self.slots16[slot >> 1]) * 2 + (slot & 1)
                }
            }
        }
    }

    /// The base address the given RAM bank is currently visible at, if any.
    ///
    /// In 8K mode the index is an 8K page index.
    pub fn is_ram_bank_paged_in(&self, bank: usize) -> Option<u16> {
        if let HardwareModel::Spectrum48 = self.model {
            return if bank == 0 { Some(0x4000) } else { None };
        }
        if self.eight_k_mode && !self.special_all_ram {
            return (0..8).find(|&slot| usize::from(self.slots8[slot]) == bank)
                         .map(|slot| (slot * MEM8K_SIZE) as u16);
        }
        if self.special_all_ram && usize::from(self.slots16[0]) == bank {
            return Some(0x0000);
        }
        (1..4).find(|&slot| usize::from(self.slots16[slot]) == bank)
              .map(|slot| (slot * MEM16K_SIZE) as u16)
    }

    /// Translates a 16-bit address into the physical location backing it.
    ///
    /// Every address resolves; there is no invalid input.
    pub fn locate(&self, addr: u16) -> MemoryLocation {
        match self.model {
            HardwareModel::Spectrum48 => {
                if addr < 0x4000 {
                    MemoryLocation { kind: MemoryKind::Rom, bank: 0, offset: addr }
                }
                else {
                    MemoryLocation { kind: MemoryKind::Ram, bank: 0, offset: addr - 0x4000 }
                }
            }
            HardwareModel::SpectrumNext if self.eight_k_mode
                                        && !self.special_all_ram => {
                self.locate_8k(addr)
            }
            _ => self.locate_16k(addr)
        }
    }

    fn locate_16k(&self, addr: u16) -> MemoryLocation {
        let slot = (addr >> 14) as usize;
        if slot == 0 && !self.special_all_ram {
            return MemoryLocation {
                kind: MemoryKind::Rom,
                bank: self.rom_index(),
                offset: addr
            };
        }
        let bank = usize::from(self.slots16[slot]);
        if self.model.config().eight_k_pages {
            // 16K banks map onto pairs of 8K pages
            MemoryLocation {
                kind: MemoryKind::Ram,
                bank: bank * 2 + usize::from(addr >> 13 & 1),
                offset: addr & 0x1FFF
            }
        }
        else {
            MemoryLocation { kind: MemoryKind::Ram, bank, offset: addr & 0x3FFF }
        }
    }

    fn locate_8k(&self, addr: u16) -> MemoryLocation {
        let slot = (addr >> 13) as usize;
        match self.slots8[slot] {
            ROM_PAGE_8K => MemoryLocation {
                kind: MemoryKind::Rom,
                bank: self.rom_index(),
                offset: addr & 0x3FFF
            },
            page => MemoryLocation {
                kind: MemoryKind::Ram,
                bank: page.into(),
                offset: addr & 0x1FFF
            }
        }
    }

    /// Whether a memory or port access at the given address contends with
    /// the ULA.
    ///
    /// The `0x4000..=0x7FFF` region always does; the `0xC000..=0xFFFF`
    /// region does whenever the bank paged into slot 3 is one of the model's
    /// contended banks.
    pub fn is_contended_address(&self, addr: u16) -> bool {
        match addr & 0xC000 {
            0x4000 => true,
            0xC000 => self.model.is_bank_contended(self.slots16[3].into()),
            _ => false
        }
    }

    /// Decodes a port write as a memory control write.
    ///
    /// Returns `true` if the port matched one of the model's paging control
    /// ports, whether or not the write had any effect. While the lock latch
    /// is set, matching writes are swallowed until the next [Pager::reset].
    pub fn write_mem_port(&mut self, port: u16, data: u8) -> bool {
        if !self.model.decodes_mem_port(port) {
            return false;
        }
        if self.locked {
            debug!("paging locked, ignoring port {:#06x} write: {:#04x}", port, data);
            return true;
        }
        if is_port_7ffd(port) {
            self.write_port_7ffd(data);
        }
        else {
            self.write_port_1ffd(data);
        }
        true
    }

    fn write_port_7ffd(&mut self, data: u8) {
        let flags = Mem128Flags::from_data(data);
        trace!("port 0x7ffd write: {:?}", flags);
        let bank = flags.ram_bank();
        self.last_slot3 = bank as u8;
        self.page_in(3, bank);
        self.shadow_screen = flags.is_shadow_screen();
        self.rom_low = flags.rom_bank_low() as u8;
        self.apply_rom_selection();
        if flags.is_locking_mmu() {
            self.locked = true;
        }
    }

    fn write_port_1ffd(&mut self, data: u8) {
        let flags = Plus3Flags::from_data(data);
        trace!("port 0x1ffd write: {:?}", flags);
        self.rom_high = flags.rom_bank_high() as u8;
        if flags.is_special_paging() {
            let layout = flags.special_layout();
            for (slot, &bank) in layout.ram_banks().iter().enumerate() {
                self.page_in(slot, bank.into());
            }
        }
        else {
            self.page_in(1, 5);
            self.page_in(2, 2);
            self.page_in(3, self.last_slot3.into());
            self.apply_rom_selection();
        }
    }

    // composes the ROM index from the two port-supplied bits
    fn apply_rom_selection(&mut self) {
        self.select_rom(usize::from(self.rom_high << 1 | self.rom_low));
    }
}
