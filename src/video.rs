/*
    Copyright (C) 2023  Rafal Michalski

    This file is part of ZXBUS, a Rust library for building emulators.

    For the full copyright notice, see the lib.rs file.
*/
//! Video frame geometry and the ULA contention table.
use core::fmt;

/// The 8-tact repeating delay pattern of the ULA memory fetch cycle.
///
/// While the ULA reads pixel and attribute data the CPU gets held off the bus
/// for up to 6 tacts, depending on where within the 8-tact cycle the access
/// falls.
pub const CONTENTION_PATTERN: [u8; 8] = [6, 5, 4, 3, 2, 1, 0, 0];

/// The base timing parameters of a video frame.
///
/// All times are given in Z80 clock tacts, all vertical values in raster
/// lines. Use one of the stock constructors of [ScreenGeometry] unless you
/// need a custom machine definition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenGeometryParams {
    /// Screen refresh rate in frames per second.
    pub refresh_rate: u32,
    /// Number of frames after which the FLASH attribute state flips.
    pub flash_toggle_frames: u32,
    /// Number of lines used for vertical sync.
    pub vertical_sync_lines: u32,
    /// Number of top border lines that are never visible.
    pub nonvisible_border_top_lines: u32,
    /// Number of visible top border lines.
    pub border_top_lines: u32,
    /// Number of display lines.
    pub display_lines: u32,
    /// Number of visible bottom border lines.
    pub border_bottom_lines: u32,
    /// Number of bottom border lines that are never visible.
    pub nonvisible_border_bottom_lines: u32,
    /// Horizontal blanking period at the start of each line.
    pub horizontal_blanking_time: u32,
    /// Time of displaying the left part of the border.
    pub border_left_time: u32,
    /// Time of displaying the 256 pixels of a display line.
    pub display_line_time: u32,
    /// Time of displaying the right part of the border.
    pub border_right_time: u32,
    /// Horizontal retrace time at the end of each line.
    pub nonvisible_border_right_time: u32,
    /// Tacts before the left display edge at which the ULA prefetches pixel data.
    pub pixel_data_prefetch_time: u32,
    /// Tacts before the left display edge at which the ULA prefetches attribute data.
    pub attribute_data_prefetch_time: u32,
}

/// Video frame geometry with all the derived frame constants.
///
/// Built once per machine configuration, never mutated afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScreenGeometry {
    params: ScreenGeometryParams,
    first_display_line: u32,
    last_display_line: u32,
    first_pixel_tact_in_line: u32,
    screen_line_time: u32,
    total_lines: u32,
    frame_tact_count: u32,
    first_display_pixel_tact: u32,
    first_screen_pixel_tact: u32,
}

impl ScreenGeometry {
    /// Builds the geometry from the base parameters, computing all derived
    /// frame constants.
    ///
    /// # Panics
    /// Panics when the parameters describe a degenerate frame (a zero-sized
    /// display area, a zero-length line or a prefetch margin reaching before
    /// the line start). A half-configured machine is a caller defect, not a
    /// runtime condition.
    pub fn new(params: ScreenGeometryParams) -> Self {
        assert!(params.display_lines != 0, "display area must not be empty");
        assert!(params.display_line_time != 0, "display line time must not be zero");
        assert!(params.refresh_rate != 0, "refresh rate must not be zero");
        let first_display_line = params.vertical_sync_lines
                               + params.nonvisible_border_top_lines
                               + params.border_top_lines;
        let last_display_line = first_display_line + params.display_lines - 1;
        let first_pixel_tact_in_line = params.horizontal_blanking_time
                                     + params.border_left_time;
        assert!(params.pixel_data_prefetch_time <= first_pixel_tact_in_line,
                "pixel data prefetch must not reach before the line start");
        let screen_line_time = first_pixel_tact_in_line
                             + params.display_line_time
                             + params.border_right_time
                             + params.nonvisible_border_right_time;
        let total_lines = last_display_line + 1
                        + params.border_bottom_lines
                        + params.nonvisible_border_bottom_lines;
        let frame_tact_count = total_lines * screen_line_time;
        let first_display_pixel_tact = first_display_line * screen_line_time
                                     + first_pixel_tact_in_line;
        let first_screen_pixel_tact = (params.vertical_sync_lines
                                     + params.nonvisible_border_top_lines) * screen_line_time
                                     + params.horizontal_blanking_time;
        ScreenGeometry {
            params,
            first_display_line,
            last_display_line,
            first_pixel_tact_in_line,
            screen_line_time,
            total_lines,
            frame_tact_count,
            first_display_pixel_tact,
            first_screen_pixel_tact,
        }
    }

    /// The standard 48k PAL geometry: 224 tacts per line, 312 lines,
    /// 69888 tacts per frame.
    pub fn spectrum_48_pal() -> Self {
        ScreenGeometry::new(ScreenGeometryParams {
            refresh_rate: 50,
            flash_toggle_frames: 25,
            vertical_sync_lines: 8,
            nonvisible_border_top_lines: 8,
            border_top_lines: 48,
            display_lines: 192,
            border_bottom_lines: 48,
            nonvisible_border_bottom_lines: 8,
            horizontal_blanking_time: 40,
            border_left_time: 24,
            display_line_time: 128,
            border_right_time: 24,
            nonvisible_border_right_time: 8,
            pixel_data_prefetch_time: 2,
            attribute_data_prefetch_time: 1,
        })
    }

    /// The standard 128k PAL geometry: 228 tacts per line, 311 lines,
    /// 70908 tacts per frame. Also used by the +2A/+3 machines.
    pub fn spectrum_128_pal() -> Self {
        ScreenGeometry::new(ScreenGeometryParams {
            refresh_rate: 50,
            flash_toggle_frames: 25,
            vertical_sync_lines: 7,
            nonvisible_border_top_lines: 8,
            border_top_lines: 48,
            display_lines: 192,
            border_bottom_lines: 48,
            nonvisible_border_bottom_lines: 8,
            horizontal_blanking_time: 44,
            border_left_time: 24,
            display_line_time: 128,
            border_right_time: 24,
            nonvisible_border_right_time: 8,
            pixel_data_prefetch_time: 2,
            attribute_data_prefetch_time: 1,
        })
    }

    /// The base parameters this geometry was built from.
    pub fn params(&self) -> &ScreenGeometryParams {
        &self.params
    }

    /// First raster line of the display area.
    pub fn first_display_line(&self) -> u32 {
        self.first_display_line
    }

    /// Last raster line of the display area.
    pub fn last_display_line(&self) -> u32 {
        self.last_display_line
    }

    /// Tact within a line at which the leftmost display pixel starts.
    pub fn first_pixel_tact_in_line(&self) -> u32 {
        self.first_pixel_tact_in_line
    }

    /// Total tacts of one raster line.
    pub fn screen_line_time(&self) -> u32 {
        self.screen_line_time
    }

    /// Total raster lines of one frame.
    pub fn total_lines(&self) -> u32 {
        self.total_lines
    }

    /// Total tacts of one complete video frame.
    pub fn frame_tact_count(&self) -> u32 {
        self.frame_tact_count
    }

    /// Frame tact of the top-left display pixel.
    pub fn first_display_pixel_tact(&self) -> u32 {
        self.first_display_pixel_tact
    }

    /// Frame tact of the top-left visible (border) pixel.
    pub fn first_screen_pixel_tact(&self) -> u32 {
        self.first_screen_pixel_tact
    }

    /// Width of the visible screen area in pixels, border included.
    pub fn screen_width(&self) -> u32 {
        2 * (self.params.border_left_time
             + self.params.display_line_time
             + self.params.border_right_time)
    }

    /// Height of the visible screen area in lines, border included.
    pub fn screen_lines(&self) -> u32 {
        self.params.border_top_lines
        + self.params.display_lines
        + self.params.border_bottom_lines
    }

    /// Returns `true` if the given line and tact within that line produce
    /// a visible pixel (display or border).
    pub fn is_tact_visible(&self, line: u32, tact_in_line: u32) -> bool {
        let first_visible_line = self.params.vertical_sync_lines
                               + self.params.nonvisible_border_top_lines;
        let last_visible_line = self.total_lines
                              - self.params.nonvisible_border_bottom_lines;
        line >= first_visible_line && line < last_visible_line
            && tact_in_line >= self.params.horizontal_blanking_time
            && tact_in_line < self.screen_line_time
                              - self.params.nonvisible_border_right_time
    }

    /// Returns `true` if the given line and tact within that line fall into
    /// the display area proper.
    pub fn is_tact_in_display_area(&self, line: u32, tact_in_line: u32) -> bool {
        line >= self.first_display_line && line <= self.last_display_line
            && tact_in_line >= self.first_pixel_tact_in_line
            && tact_in_line < self.first_pixel_tact_in_line
                              + self.params.display_line_time
    }

    /// Returns `true` if the given line and tact within that line fall into
    /// the border area.
    ///
    /// The pixel-prefetch margin just before the left display edge counts as
    /// neither border nor display.
    pub fn is_tact_in_border_area(&self, line: u32, tact_in_line: u32) -> bool {
        self.is_tact_visible(line, tact_in_line)
            && !self.is_tact_in_display_area(line, tact_in_line)
            && !(line >= self.first_display_line && line <= self.last_display_line
                 && tact_in_line >= self.first_pixel_tact_in_line
                                    - self.params.pixel_data_prefetch_time
                 && tact_in_line < self.first_pixel_tact_in_line)
    }
}

/// A precomputed per-frame-tact memory contention table.
///
/// One entry per tact of the video frame; the entry is the number of extra
/// tacts a contended memory access at that frame tact costs. Built once from
/// a [ScreenGeometry], read-only afterwards.
#[derive(Clone)]
pub struct ContentionTable {
    delays: Box<[u8]>,
    first_display_line: u32,
    last_display_line: u32,
    first_pixel_tact_in_line: u32,
    display_line_time: u32,
    screen_line_time: u32,
}

impl ContentionTable {
    /// Builds the table for the given frame geometry.
    ///
    /// Delays are nonzero only within the display fetch window of display
    /// lines, where they follow [CONTENTION_PATTERN] phase-locked to the
    /// leftmost display pixel: the first pixel tact itself costs 0 extra
    /// tacts, the following one costs 6, then 5, 4, 3, 2, 1, 0, 0 and over
    /// again for the whole 128-tact display window.
    pub fn new(geometry: &ScreenGeometry) -> Self {
        let mut delays = vec![0u8; geometry.frame_tact_count() as usize]
                             .into_boxed_slice();
        let first_pixel = geometry.first_pixel_tact_in_line();
        let display_time = geometry.params().display_line_time;
        for line in geometry.first_display_line()..=geometry.last_display_line() {
            let line_start = line * geometry.screen_line_time();
            for pixel_tact in 0..display_time {
                let tact = (line_start + first_pixel + pixel_tact) as usize;
                delays[tact] = CONTENTION_PATTERN[
                    (pixel_tact as usize).wrapping_add(7) & 7];
            }
        }
        ContentionTable {
            delays,
            first_display_line: geometry.first_display_line(),
            last_display_line: geometry.last_display_line(),
            first_pixel_tact_in_line: first_pixel,
            display_line_time: display_time,
            screen_line_time: geometry.screen_line_time(),
        }
    }

    /// Number of entries, equal to the frame tact count of the geometry the
    /// table was built from.
    pub fn len(&self) -> u32 {
        self.delays.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.delays.is_empty()
    }

    /// The contention delay at the given frame tact. Zero for tacts past the
    /// end of the table.
    #[inline]
    pub fn delay_at(&self, frame_tact: u32) -> u8 {
        self.delays.get(frame_tact as usize).copied().unwrap_or(0)
    }

    /// Returns `true` if the given frame tact falls within the display fetch
    /// window, regardless of the delay value at that tact.
    pub fn is_contended_tact(&self, frame_tact: u32) -> bool {
        let line = frame_tact / self.screen_line_time;
        let tact_in_line = frame_tact % self.screen_line_time;
        line >= self.first_display_line && line <= self.last_display_line
            && tact_in_line >= self.first_pixel_tact_in_line
            && tact_in_line < self.first_pixel_tact_in_line + self.display_line_time
    }
}

impl fmt::Debug for ContentionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentionTable")
         .field("len", &self.delays.len())
         .finish()
    }
}
