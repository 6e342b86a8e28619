/*
    Copyright (C) 2023  Rafal Michalski

    ZXBUS is free software: you can redistribute it and/or modify it under
    the terms of the GNU Lesser General Public License (LGPL) as published
    by the Free Software Foundation, either version 3 of the License, or
    (at your option) any later version.

    ZXBUS is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Lesser General Public License for more details.

    You should have received a copy of the GNU Lesser General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

    Author contact information: see Cargo.toml file, section [package.authors].
*/
//! **ZXBUS** emulates the contended memory and I/O bus of the ZX Spectrum
//! computer series.
//!
//! The ZX Spectrum's CPU shares its memory bus with the video chip (ULA).
//! Whenever the ULA fetches pixel data, a CPU access to the shared region is
//! delayed by a tact-dependent amount. Software written against the real
//! hardware relies on those delays, so an emulator has to reproduce them
//! exactly.
//!
//! This library provides the three tightly coupled pieces that make this
//! work, for the 48k, 128k/+2, +2A/+3 and Next line of machines:
//!
//! * a tact-indexed contention model ([video::ContentionTable] and
//!   [clock::ContentionClock]) that maps the current position within the
//!   video frame to an access delay,
//! * a banked memory model ([memory::BankedMemory]) with the per-model
//!   address translation and the paging state machine ([paging::Pager])
//!   driven by the `0x7FFD`/`0x1FFD` control ports,
//! * a bus façade ([bus::Bus]) that the CPU driver calls for every memory
//!   and I/O cycle, applying the correct delay before each transfer.
//!
//! The CPU itself is not part of this crate. The driver supplies a
//! [clock::CpuClock] implementation - the bus reads the current tact from it
//! and tells it to burn extra tacts; "waiting" is always counter arithmetic,
//! never blocking. Everything here is single threaded and deterministic:
//! replaying the same sequence of accesses from the same state produces the
//! same delays and the same final memory contents.
//!
//! Save-state support lives in [snapshot]: a plain data record of the bank
//! contents and paging registers that round-trips exactly, with `serde`
//! support behind the `snapshot` feature.
pub mod bus;
pub mod clock;
pub mod memory;
pub mod paging;
pub mod snapshot;
pub mod video;
