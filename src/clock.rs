/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of ZXBUS, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Tact counters and the frame-position contention lookup.
use crate::video::{ContentionTable, ScreenGeometry};

/// A timestamp type in Z80 clock tacts.
pub type FTs = i64;

/// The capability the bus needs from the CPU driver.
///
/// The bus reads the current tact position from the clock and tells it to
/// burn extra tacts. "Waiting" is always counter advancement, never blocking,
/// so calling [CpuClock::delay] must be cheap and side-effect free beyond the
/// counter itself.
pub trait CpuClock {
    /// The total number of tacts elapsed since the counter epoch.
    fn current_tact(&self) -> FTs;
    /// Advances the counter by the given number of tacts.
    fn delay(&mut self, tacts: u32);
}

/// A plain tact counter implementing [CpuClock].
///
/// Suitable for tests and hosts that do not keep a clock of their own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameClock {
    tacts: FTs
}

impl FrameClock {
    pub fn new() -> Self {
        FrameClock::default()
    }

    /// Creates a counter pre-advanced to the given tact.
    pub fn with_tacts(tacts: FTs) -> Self {
        FrameClock { tacts }
    }

    pub fn tacts(&self) -> FTs {
        self.tacts
    }

    pub fn set_tacts(&mut self, tacts: FTs) {
        self.tacts = tacts;
    }
}

impl CpuClock for FrameClock {
    #[inline]
    fn current_tact(&self) -> FTs {
        self.tacts
    }

    #[inline]
    fn delay(&mut self, tacts: u32) {
        self.tacts += FTs::from(tacts);
    }
}

impl<C: CpuClock + ?Sized> CpuClock for &mut C {
    fn current_tact(&self) -> FTs {
        (**self).current_tact()
    }

    fn delay(&mut self, tacts: u32) {
        (**self).delay(tacts)
    }
}

/// Maps total elapsed tacts to a position within the running video frame and
/// that position to a contention delay.
///
/// Pure: lookups never mutate state; applying the returned delay is the
/// caller's job.
#[derive(Clone, Debug)]
pub struct ContentionClock {
    table: ContentionTable,
    frame_tacts: u32,
}

impl ContentionClock {
    pub fn new(geometry: &ScreenGeometry) -> Self {
        ContentionClock {
            table: ContentionTable::new(geometry),
            frame_tacts: geometry.frame_tact_count(),
        }
    }

    /// Total tacts of one video frame.
    pub fn frame_tact_count(&self) -> u32 {
        self.frame_tacts
    }

    /// The position within the running frame for a total tact count.
    ///
    /// Euclidean remainder, so timestamps before the counter epoch still map
    /// into the frame.
    #[inline]
    pub fn frame_tact(&self, total_tacts: FTs) -> u32 {
        total_tacts.rem_euclid(FTs::from(self.frame_tacts)) as u32
    }

    /// The extra tacts a contended memory access at this frame tact costs.
    #[inline]
    pub fn memory_delay(&self, frame_tact: u32) -> u8 {
        self.table.delay_at(frame_tact)
    }

    /// The contention table the clock was built with.
    pub fn table(&self) -> &ContentionTable {
        &self.table
    }

    /// The summed extra delay of a whole 4-tact I/O cycle starting at the
    /// given frame tact, beyond the four fixed tacts.
    ///
    /// The cycle is stepped tact by tact the way the bus applies it: each
    /// intermediate delay shifts the frame position seen by the next lookup.
    /// Contended ports with the low address bit set sample the table before
    /// each of the four tacts; contended ports with an even address sample it
    /// before the first and the second tact, with the remaining three tacts
    /// owned by the ULA response. Uncontended ports cost exactly the four
    /// fixed tacts, with no ULA-dependent component.
    pub fn io_delay(&self, frame_tact: u32, port: u16, port_contended: bool) -> u32 {
        if !port_contended {
            return 0;
        }
        let mut tact = frame_tact;
        let mut total = 0u32;
        let mut step = |fixed: u32| {
            let delay = u32::from(self.memory_delay(tact % self.frame_tacts));
            total += delay;
            tact += delay + fixed;
        };
        if port & 1 == 1 {
            for _ in 0..4 {
                step(1);
            }
        }
        else {
            step(1);
            step(3);
        }
        total
    }
}
