// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! RGBA8888 source images for exercising the RGA.
//!
//! The test pattern is asymmetric on both axes so that rotations and flips
//! are obvious when the output is inspected.  [`to_nv21`] turns any of
//! them into the camera-style YUV source the color conversion path reads.

use core::fmt;

/// An RGBA color, 8 bits per channel.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(0xff, 0x00, 0x00);
    pub const GREEN: Color = Color::rgb(0x00, 0xff, 0x00);
    pub const BLUE: Color = Color::rgb(0x00, 0x00, 0xff);
    pub const YELLOW: Color = Color::rgb(0xff, 0xff, 0x00);
    pub const CYAN: Color = Color::rgb(0x00, 0xff, 0xff);
    pub const MAGENTA: Color = Color::rgb(0xff, 0x00, 0xff);
    pub const GRAY: Color = Color::rgb(0x88, 0x88, 0x88);
    pub const DKGRAY: Color = Color::rgb(0x44, 0x44, 0x44);
    pub const LTGRAY: Color = Color::rgb(0xcc, 0xcc, 0xcc);
    pub const WHITE: Color = Color::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Color = Color::rgb(0x00, 0x00, 0x00);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Memory order of an RGBA8888 pixel.
    pub const fn to_bytes(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// The value passed to color fill.  librga takes the 32-bit word an
    /// RGBA8888 pixel occupies in little-endian memory.
    pub const fn packed(self) -> u32 {
        u32::from_le_bytes(self.to_bytes())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

/// Grid colors, row major.
pub const GRID: [Color; 9] = [
    Color::RED,
    Color::GREEN,
    Color::BLUE,
    Color::YELLOW,
    Color::CYAN,
    Color::MAGENTA,
    Color::GRAY,
    Color::DKGRAY,
    Color::LTGRAY,
];

const STROKE: i64 = 8;

/// A `width` x `height` RGBA8888 image filled with `color`.
pub fn solid(width: u32, height: u32, color: Color) -> Vec<u8> {
    color
        .to_bytes()
        .repeat(width as usize * height as usize)
}

/// The standard test pattern.
///
/// A white image carrying a 3x3 grid of [`GRID`] colors, a thick black L
/// along the top and left edges of the top-left quadrant and a black arrow
/// pointing right in the bottom-right quadrant.  Columns and rows left over
/// when the size is not a multiple of three stay white.
pub fn test_pattern(width: u32, height: u32) -> Vec<u8> {
    let mut canvas = Canvas::new(width, height, Color::WHITE);
    let (w, h) = (width as i64, height as i64);

    let (cw, ch) = (w / 3, h / 3);
    for (i, color) in GRID.iter().enumerate() {
        let (row, col) = (i as i64 / 3, i as i64 % 3);
        canvas.fill_rect(col * cw, row * ch, (col + 1) * cw, (row + 1) * ch, *color);
    }

    let (qw, qh) = (w / 2, h / 2);
    canvas.line((10, 10), (qw - 10, 10), STROKE, Color::BLACK);
    canvas.line((10, 10), (10, qh - 10), STROKE, Color::BLACK);

    let y = h / 2 + qh / 2;
    let (x0, x1) = (w / 2 + 20, w - 20);
    canvas.line((x0, y), (x1, y), STROKE, Color::BLACK);
    canvas.line((x1, y), (x1 - 15, y - 10), STROKE, Color::BLACK);
    canvas.line((x1, y), (x1 - 15, y + 10), STROKE, Color::BLACK);

    canvas.pixels
}

/// Encodes an RGBA8888 image as NV21 with BT.601 limited range.
///
/// The Y plane is followed by interleaved V/U samples, one pair per 2x2
/// block, taken from the mean of the block.  Alpha is ignored.  Width and
/// height must be even.
pub fn to_nv21(rgba: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as usize, height as usize);
    debug_assert!(w % 2 == 0 && h % 2 == 0);
    debug_assert_eq!(rgba.len(), w * h * 4);

    let mut out = Vec::with_capacity(w * h * 3 / 2);
    for p in rgba.chunks_exact(4) {
        let (r, g, b) = (p[0] as i32, p[1] as i32, p[2] as i32);
        out.push((((66 * r + 129 * g + 25 * b + 128) >> 8) + 16) as u8);
    }

    for y in (0..h).step_by(2) {
        for x in (0..w).step_by(2) {
            let mut sum = [0i32; 3];
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let offset = ((y + dy) * w + x + dx) * 4;
                for (c, total) in sum.iter_mut().enumerate() {
                    *total += rgba[offset + c] as i32;
                }
            }
            let [r, g, b] = sum.map(|total| (total + 2) / 4);
            let u = ((-38 * r - 74 * g + 112 * b + 128) >> 8) + 128;
            let v = ((112 * r - 94 * g - 18 * b + 128) >> 8) + 128;
            out.push(v.clamp(0, 255) as u8);
            out.push(u.clamp(0, 255) as u8);
        }
    }
    out
}

struct Canvas {
    width: i64,
    height: i64,
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(width: u32, height: u32, background: Color) -> Self {
        Self {
            width: width as i64,
            height: height as i64,
            pixels: solid(width, height, background),
        }
    }

    fn put(&mut self, x: i64, y: i64, color: Color) {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return;
        }
        let offset = ((y * self.width + x) * 4) as usize;
        self.pixels[offset..offset + 4].copy_from_slice(&color.to_bytes());
    }

    /// Fills `[x0, x1) x [y0, y1)`.
    fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Color) {
        for y in y0.max(0)..y1.min(self.height) {
            for x in x0.max(0)..x1.min(self.width) {
                self.put(x, y, color);
            }
        }
    }

    /// Butt-capped segment `stroke` pixels wide.
    fn line(&mut self, from: (i64, i64), to: (i64, i64), stroke: i64, color: Color) {
        let (dx, dy) = ((to.0 - from.0) as f64, (to.1 - from.1) as f64);
        let len2 = dx * dx + dy * dy;
        let half = stroke as f64 / 2.0;
        let pad = stroke / 2 + 1;
        for y in from.1.min(to.1) - pad..=from.1.max(to.1) + pad {
            for x in from.0.min(to.0) - pad..=from.0.max(to.0) + pad {
                let (px, py) = ((x - from.0) as f64 + 0.5, (y - from.1) as f64 + 0.5);
                let (along, dist) = if len2 == 0.0 {
                    (0.0, (px * px + py * py).sqrt())
                } else {
                    let t = (px * dx + py * dy) / len2;
                    let cross = (px * dy - py * dx).abs() / len2.sqrt();
                    (t, cross)
                };
                if (0.0..=1.0).contains(&along) && dist <= half {
                    self.put(x, y, color);
                }
            }
        }
    }
}
