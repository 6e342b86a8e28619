/*
    test_contention: tests for the ZXBUS library.
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
//! Tests the memory and I/O contention timing against the known hardware
//! delay patterns.
use zxbus::bus::{Bus, NullIoHandler};
use zxbus::clock::{ContentionClock, FTs, FrameClock};
use zxbus::paging::HardwareModel;
use zxbus::video::{ContentionTable, ScreenGeometry, CONTENTION_PATTERN};

const LINE_48: u32 = 224;
const FIRST_DISPLAY_LINE_48: u32 = 64;
const FIRST_PIXEL_TACT_48: u32 = 64;

fn delay_of_write_at(model: HardwareModel, tact: FTs, addr: u16) -> FTs {
    let mut bus = Bus::new(model, FrameClock::with_tacts(tact));
    bus.write(addr, 0);
    bus.clock().tacts() - tact
}

#[test]
fn contention_follows_the_ula_pattern_along_a_display_line() {
    let line_start = FTs::from(FIRST_DISPLAY_LINE_48 * LINE_48);
    let first_pixel = line_start + FTs::from(FIRST_PIXEL_TACT_48);
    // the whole blanking and border period of the line is free
    for tact in line_start..first_pixel {
        assert_eq!(delay_of_write_at(HardwareModel::Spectrum48, tact, 0x4000), 0,
                   "tact {}", tact);
    }
    // then the 128-tact display window repeats the 8-tact pattern shifted
    // by one: 0, 6, 5, 4, 3, 2, 1, 0, 0, 6, ...
    for pixel_tact in 0..128u32 {
        let expected = CONTENTION_PATTERN[(pixel_tact as usize + 7) & 7];
        assert_eq!(
            delay_of_write_at(HardwareModel::Spectrum48,
                              first_pixel + FTs::from(pixel_tact), 0x7FFF),
            FTs::from(expected),
            "pixel tact {}", pixel_tact);
    }
    // and the right border is free again
    for tact in first_pixel + 128..line_start + FTs::from(LINE_48) {
        assert_eq!(delay_of_write_at(HardwareModel::Spectrum48, tact, 0x4000), 0);
    }
}

#[test]
fn the_two_normative_corner_tacts() {
    // the top-left corner tact of the display adds no delay
    let corner = FTs::from(FIRST_DISPLAY_LINE_48 * LINE_48);
    assert_eq!(delay_of_write_at(HardwareModel::Spectrum48, corner, 0x4000), 0);
    // 3 tacts past the left display edge adds exactly 4
    let tact = corner + FTs::from(FIRST_PIXEL_TACT_48) + 3;
    assert_eq!(delay_of_write_at(HardwareModel::Spectrum48, tact, 0x4000), 4);
}

#[test]
fn no_contention_above_and_below_the_display() {
    let geometry = ScreenGeometry::spectrum_48_pal();
    let table = ContentionTable::new(&geometry);
    let first = geometry.first_display_line() * geometry.screen_line_time();
    let last = (geometry.last_display_line() + 1) * geometry.screen_line_time();
    for tact in 0..first {
        assert_eq!(table.delay_at(tact), 0);
    }
    for tact in last..geometry.frame_tact_count() {
        assert_eq!(table.delay_at(tact), 0);
    }
}

#[test]
fn memory_contention_only_in_contended_regions() {
    let tact = FTs::from(FIRST_DISPLAY_LINE_48 * LINE_48 + FIRST_PIXEL_TACT_48) + 1;
    // 48k: only 0x4000..=0x7FFF contends, slot 3 never does
    assert_eq!(delay_of_write_at(HardwareModel::Spectrum48, tact, 0x0000), 0);
    assert_eq!(delay_of_write_at(HardwareModel::Spectrum48, tact, 0x4000), 6);
    assert_eq!(delay_of_write_at(HardwareModel::Spectrum48, tact, 0x8000), 0);
    assert_eq!(delay_of_write_at(HardwareModel::Spectrum48, tact, 0xC000), 0);
}

#[test]
fn io_contention_port_classes_stepped_by_the_bus() {
    let geometry = ScreenGeometry::spectrum_48_pal();
    let contention = ContentionClock::new(&geometry);
    let mut io = NullIoHandler;
    // cross-check the bus's stepped I/O cycle against the pure helper at
    // every tact of a display line straddling the contended window
    let line_start = FIRST_DISPLAY_LINE_48 * LINE_48;
    for tact_in_line in 0..LINE_48 {
        let tact = FTs::from(line_start + tact_in_line);
        for &(port, contended) in &[
            (0x40FEu16, true),   // contended, ULA responds
            (0x40FF, true),      // contended, every tact sampled
            (0x00FE, false),     // uncontended
            (0x00FF, false),
        ] {
            let mut bus = Bus::new(HardwareModel::Spectrum48,
                                   FrameClock::with_tacts(tact));
            bus.write_port(port, 0, &mut io);
            let expected = 4 + contention.io_delay(
                contention.frame_tact(tact), port, contended);
            assert_eq!(bus.clock().tacts() - tact, FTs::from(expected),
                       "port {:#06x} at tact {}", port, tact);
        }
    }
}

#[test]
fn contended_port_through_slot3_bank() {
    // on the 128k the port address range 0xC000..=0xFFFF contends only
    // while a contended bank occupies slot 3
    let geometry = ScreenGeometry::spectrum_128_pal();
    let tact = FTs::from((geometry.first_display_line()
                          * geometry.screen_line_time()
                          + geometry.first_pixel_tact_in_line()) + 1);
    let mut io = NullIoHandler;

    let mut bus = Bus::new(HardwareModel::Spectrum128,
                           FrameClock::with_tacts(tact));
    bus.write_port(0xFFFD, 0, &mut io);
    assert_eq!(bus.clock().tacts(), tact + 4);

    let mut bus = Bus::new(HardwareModel::Spectrum128,
                           FrameClock::with_tacts(tact));
    bus.page_in(3, 1);
    bus.write_port(0xFFFD, 0, &mut io);
    // C:1 x4 with delays 6 at the 1st and 3rd step
    assert_eq!(bus.clock().tacts(), tact + 4 + 12);
}

#[test]
fn frame_wraps_around() {
    let geometry = ScreenGeometry::spectrum_48_pal();
    let frame = FTs::from(geometry.frame_tact_count());
    let tact_in_frame = FTs::from(FIRST_DISPLAY_LINE_48 * LINE_48
                                  + FIRST_PIXEL_TACT_48) + 3;
    // the same frame position delays identically in any later frame
    for n in 0..3 {
        assert_eq!(
            delay_of_write_at(HardwareModel::Spectrum48,
                              n * frame + tact_in_frame, 0x4000),
            4);
    }
}
