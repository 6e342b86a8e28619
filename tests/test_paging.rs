/*
    test_paging: tests for the ZXBUS library.
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
//! Tests the paging state machine end to end through the bus: memory control
//! port writes, bank visibility and the address translation they produce.
use zxbus::bus::{Bus, NullIoHandler};
use zxbus::clock::FrameClock;
use zxbus::memory::{MemoryKind, MemoryLocation};
use zxbus::paging::{BankGranularity, HardwareModel, ROM_PAGE_8K};

fn make_bus(model: HardwareModel) -> Bus<FrameClock> {
    let mut bus = Bus::new(model, FrameClock::new());
    // tag every RAM bank with its own index so paging is observable
    // through plain reads
    for bank in 0..bus.memory().ram_bank_count() {
        let tag = bank as u8;
        bus.memory_mut().ram_bank_mut(bank).iter_mut()
           .for_each(|byte| *byte = tag);
    }
    // tag every ROM page as 0xF0 + index
    for rom in 0..bus.memory().rom_count() {
        let tag = 0xF0 | rom as u8;
        let size = bus.memory().rom_size();
        bus.load_into_rom_bank(rom, &vec![tag; size][..]).unwrap();
    }
    bus
}

#[test]
fn every_address_resolves_in_every_mode() {
    let mut io = NullIoHandler;
    for &model in &[
        HardwareModel::Spectrum48,
        HardwareModel::Spectrum128,
        HardwareModel::SpectrumP3,
        HardwareModel::SpectrumNext,
    ] {
        let mut bus = make_bus(model);
        let check_all = |bus: &Bus<FrameClock>| {
            for addr in 0..=0xFFFFu16 {
                let MemoryLocation { kind, bank, offset } = bus.locate(addr);
                match kind {
                    MemoryKind::Rom => {
                        assert!(bank < bus.memory().rom_count());
                        assert!((offset as usize) < bus.memory().rom_size());
                    }
                    MemoryKind::Ram => {
                        assert!(bank < bus.memory().ram_bank_count());
                        assert!((offset as usize) < bus.memory().bank_size());
                    }
                }
                // reads hit the located bank
                let expected = match kind {
                    MemoryKind::Rom => 0xF0 | bank as u8,
                    MemoryKind::Ram => bank as u8
                };
                assert_eq!(bus.read_no_contention(addr), expected);
            }
        };
        check_all(&bus);
        bus.write_port(0x7FFD, 0b0001_0011, &mut io);
        check_all(&bus);
        bus.write_port(0x1FFD, 0b0000_0101, &mut io);
        check_all(&bus);
        if let HardwareModel::SpectrumNext = model {
            bus.page_in_8k(0, 7);
            bus.page_in_8k(7, 14);
            check_all(&bus);
        }
    }
}

#[test]
fn the_128k_paging_scenario() {
    let mut bus = make_bus(HardwareModel::Spectrum128);
    // default slot map [ROM0, RAM5, RAM2, RAM0]
    assert_eq!(bus.selected_bank(1, BankGranularity::Bank16k), 5);
    assert_eq!(bus.selected_bank(2, BankGranularity::Bank16k), 2);
    assert_eq!(bus.selected_bank(3, BankGranularity::Bank16k), 0);

    bus.page_in(3, 6);
    assert_eq!(bus.locate(0xC000),
               MemoryLocation { kind: MemoryKind::Ram, bank: 6, offset: 0 });
    assert!(!bus.pager().is_special_all_ram());

    bus.page_in(0, 3);
    assert!(bus.pager().is_special_all_ram());
    assert_eq!(bus.locate(0x0000),
               MemoryLocation { kind: MemoryKind::Ram, bank: 3, offset: 0 });
    assert_eq!(bus.read_no_contention(0x0000), 3);

    // ROM reselection clears special mode
    bus.select_rom(1);
    assert!(!bus.pager().is_special_all_ram());
    assert_eq!(bus.locate(0x0000),
               MemoryLocation { kind: MemoryKind::Rom, bank: 1, offset: 0 });
    assert_eq!(bus.read_no_contention(0x0000), 0xF1);
}

#[test]
fn lock_latch_is_one_way() {
    let mut io = NullIoHandler;
    let mut bus = make_bus(HardwareModel::Spectrum128);
    bus.write_port(0x7FFD, 0b0010_0011, &mut io);
    assert!(bus.pager().is_locked());
    assert_eq!(bus.read_no_contention(0xC000), 3);
    // writing the latch bit low does not unlock
    bus.write_port(0x7FFD, 0b0000_0110, &mut io);
    assert!(bus.pager().is_locked());
    assert_eq!(bus.read_no_contention(0xC000), 3);
    // only reset does
    bus.reset();
    assert!(!bus.pager().is_locked());
}

#[test]
fn plus3_lock_gates_both_ports() {
    let mut io = NullIoHandler;
    let mut bus = make_bus(HardwareModel::SpectrumP3);
    bus.write_port(0x7FFD, 0b0010_0000, &mut io);
    assert!(bus.pager().is_locked());
    bus.write_port(0x1FFD, 0b0000_0001, &mut io);
    assert!(!bus.pager().is_special_all_ram());
    assert_eq!(bus.locate(0x0000).kind, MemoryKind::Rom);
}

#[test]
fn plus3_full_port_driven_walk() {
    let mut io = NullIoHandler;
    let mut bus = make_bus(HardwareModel::SpectrumP3);
    // ROM 3 = high bit from 0x1FFD + low bit from 0x7FFD
    bus.write_port(0x1FFD, 0b0000_0100, &mut io);
    bus.write_port(0x7FFD, 0b0001_0000, &mut io);
    assert_eq!(bus.read_no_contention(0x2000), 0xF3);
    // special layout 3: RAM 4, 7, 6, 3
    bus.write_port(0x1FFD, 0b0000_0111, &mut io);
    assert_eq!(bus.read_no_contention(0x0000), 4);
    assert_eq!(bus.read_no_contention(0x4000), 7);
    assert_eq!(bus.read_no_contention(0x8000), 6);
    assert_eq!(bus.read_no_contention(0xC000), 3);
    // ROM writes in all-RAM mode land in RAM
    bus.write(0x0000, 0x99);
    assert_eq!(bus.read_no_contention(0x0000), 0x99);
    // back to normal with ROM 1
    bus.write_port(0x1FFD, 0b0000_0000, &mut io);
    assert_eq!(bus.read_no_contention(0x0000), 0xF1);
    assert_eq!(bus.read_no_contention(0x4000), 5);
    assert_eq!(bus.read_no_contention(0x8000), 2);
    assert_eq!(bus.read_no_contention(0xC000), 0);
    // the write through the all-RAM window stuck in bank 4
    assert_eq!(bus.memory().ram_bank_ref(4)[0], 0x99);
}

#[test]
fn next_8k_paging_through_the_bus() {
    let mut bus = make_bus(HardwareModel::SpectrumNext);
    // the default map resolves like a 128-class machine
    assert_eq!(bus.read_no_contention(0x0000), 0xF0);
    assert_eq!(bus.read_no_contention(0x4000), 10);
    assert_eq!(bus.read_no_contention(0x6000), 11);
    assert_eq!(bus.read_no_contention(0xC000), 0);
    assert_eq!(bus.read_no_contention(0xE000), 1);

    bus.page_in_8k(6, 13);
    assert!(bus.pager().is_in_8k_mode());
    assert_eq!(bus.read_no_contention(0xC000), 13);
    assert_eq!(bus.read_no_contention(0xE000), 1);
    assert_eq!(bus.selected_bank(6, BankGranularity::Page8k), 13);
    // slot 0 still holds the ROM sentinel
    assert_eq!(bus.selected_bank(0, BankGranularity::Page8k),
               usize::from(ROM_PAGE_8K));
    assert_eq!(bus.read_no_contention(0x1000), 0xF0);

    // 16K paging leaves 8K mode
    bus.page_in(3, 7);
    assert!(!bus.pager().is_in_8k_mode());
    assert_eq!(bus.read_no_contention(0xC000), 14);
    assert_eq!(bus.read_no_contention(0xE000), 15);
}

#[test]
fn shadow_screen_flag_follows_the_port() {
    let mut io = NullIoHandler;
    let mut bus = make_bus(HardwareModel::Spectrum128);
    assert!(!bus.pager().uses_shadow_screen());
    bus.write_port(0x7FFD, 0b0000_1000, &mut io);
    assert!(bus.pager().uses_shadow_screen());
    bus.write_port(0x7FFD, 0b0000_0000, &mut io);
    assert!(!bus.pager().uses_shadow_screen());
}

#[test]
fn spectrum48_ignores_paging_entirely() {
    let mut io = NullIoHandler;
    let mut bus = make_bus(HardwareModel::Spectrum48);
    bus.write_port(0x7FFD, 0b0001_0111, &mut io);
    bus.write_port(0x1FFD, 0b0000_0001, &mut io);
    bus.page_in(0, 0);
    bus.select_rom(3);
    assert_eq!(bus.locate(0x0000),
               MemoryLocation { kind: MemoryKind::Rom, bank: 0, offset: 0 });
    assert_eq!(bus.locate(0xFFFF),
               MemoryLocation { kind: MemoryKind::Ram, bank: 0, offset: 0xBFFF });
    assert!(!bus.pager().is_special_all_ram());
}

#[test]
fn reset_twice_equals_reset_once() {
    let mut io = NullIoHandler;
    let mut bus = make_bus(HardwareModel::SpectrumP3);
    bus.write_port(0x1FFD, 0b0000_0011, &mut io);
    bus.write_port(0x7FFD, 0b0010_1110, &mut io);
    bus.reset();
    let once = bus.capture();
    bus.reset();
    assert_eq!(bus.capture(), once);
}
