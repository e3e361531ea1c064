// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Functional test cases for the RGA.
//!
//! Each [`TestCase`] pushes the test pattern through one operation and
//! produces a [`Report`].  Where the expected result can be computed on the
//! CPU the output is compared pixel for pixel, or within a tolerance when
//! the result went through YUV.

use crate::{
    buffer::Buffer,
    error::{Error, Status},
    image::{encode_jpeg, Format, Image, Rect},
    pattern::{solid, test_pattern, to_nv21, Color, GRID},
    rga::{BlendMode, Flip, ImageManager, Rotation},
};
use core::fmt;
use dma_heap::HeapKind;
use std::{
    error::Error as StdError,
    fs,
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{debug, info_span, instrument, warn};

type BoxResult<T> = Result<T, Box<dyn StdError>>;

const RESIZE_FACTOR: f64 = 0.7;
const CROP: Rect = Rect::new(100, 100, 200, 150);
const TRANSLATE: (i32, i32) = (80, 80);
const FILL: Rect = Rect::new(50, 50, 100, 100);
const FILL_BLOCK: u32 = 16;
/// Per-channel slack for colors that went through NV21.
const YUV_TOLERANCE: u8 = 24;

#[derive(clap::ValueEnum, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TestCase {
    Copy,
    Resize,
    Crop,
    Rotate,
    Flip,
    Translate,
    Blend,
    Convert,
    Fill,
    FillResize,
    Job,
    Nv21,
}

impl TestCase {
    pub const ALL: [TestCase; 12] = [
        TestCase::Copy,
        TestCase::Resize,
        TestCase::Crop,
        TestCase::Rotate,
        TestCase::Flip,
        TestCase::Translate,
        TestCase::Blend,
        TestCase::Convert,
        TestCase::Fill,
        TestCase::FillResize,
        TestCase::Job,
        TestCase::Nv21,
    ];

    /// Name used in reports.
    pub fn name(&self) -> &'static str {
        match self {
            TestCase::Copy => "Copy",
            TestCase::Resize => "Resize",
            TestCase::Crop => "Crop",
            TestCase::Rotate => "Rotate",
            TestCase::Flip => "Flip",
            TestCase::Translate => "Translate",
            TestCase::Blend => "Blend",
            TestCase::Convert => "Color conversion",
            TestCase::Fill => "Fill",
            TestCase::FillResize => "Fill-via-Resize",
            TestCase::Job => "Job",
            TestCase::Nv21 => "NV21 to RGBA",
        }
    }

    fn file_stem(&self) -> &'static str {
        match self {
            TestCase::Copy => "copy",
            TestCase::Resize => "resize",
            TestCase::Crop => "crop",
            TestCase::Rotate => "rotate",
            TestCase::Flip => "flip",
            TestCase::Translate => "translate",
            TestCase::Blend => "blend",
            TestCase::Convert => "convert",
            TestCase::Fill => "fill",
            TestCase::FillResize => "fill_resize",
            TestCase::Job => "job",
            TestCase::Nv21 => "nv21",
        }
    }
}

/// Memory backing the test images.
#[derive(clap::ValueEnum, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MemoryKind {
    /// Contiguous DMA heap
    #[default]
    Cma,
    /// Scatter-gather DMA heap
    System,
    /// Host memory passed by virtual address
    Virtual,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub width: u32,
    pub height: u32,
    pub memory: MemoryKind,
    /// Destination format of the color conversion test.
    pub convert_format: Format,
    /// Where result images are written as JPEG, if anywhere.
    pub output_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: 400,
            height: 400,
            memory: MemoryKind::Cma,
            convert_format: Format::Bgra8888,
            output_dir: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success(Option<String>),
    /// The library returned an error status.
    Failed(Status),
    /// The operation succeeded but the output is wrong.
    Mismatch(String),
    Error(String),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    fn success(detail: impl Into<String>) -> Self {
        Outcome::Success(Some(detail.into()))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success(None) => write!(f, "SUCCESS"),
            Outcome::Success(Some(detail)) => write!(f, "SUCCESS ({detail})"),
            Outcome::Failed(status) => write!(f, "FAILED (result: {})", status.raw()),
            Outcome::Mismatch(detail) => write!(f, "MISMATCH ({detail})"),
            Outcome::Error(msg) => write!(f, "ERROR - {msg}"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Report {
    pub case: TestCase,
    pub outcome: Outcome,
    pub elapsed: Duration,
    pub output: Option<PathBuf>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} test: {}", self.case.name(), self.outcome)
    }
}

/// Image under test, either a DMA buffer or plain host memory.
enum Surface {
    Dma(Image),
    Host {
        data: Vec<u8>,
        width: u32,
        height: u32,
        format: Format,
    },
}

impl MemoryKind {
    /// The DMA heap to allocate from, `None` for host memory.
    fn heap(self) -> Option<HeapKind> {
        match self {
            MemoryKind::Cma => Some(HeapKind::Cma),
            MemoryKind::System => Some(HeapKind::System),
            MemoryKind::Virtual => None,
        }
    }
}

impl Surface {
    fn alloc(memory: MemoryKind, width: u32, height: u32, format: Format) -> BoxResult<Self> {
        match memory.heap() {
            Some(heap) => Ok(Surface::Dma(Image::new_in(heap, width, height, format)?)),
            None => {
                format.check_dimensions(width, height)?;
                Ok(Surface::Host {
                    data: vec![0; format.buffer_size(width, height)],
                    width,
                    height,
                    format,
                })
            }
        }
    }

    /// An RGBA8888 surface holding `pixels`.
    fn rgba(memory: MemoryKind, width: u32, height: u32, pixels: &[u8]) -> BoxResult<Self> {
        Self::load(memory, width, height, Format::Rgba8888, pixels)
    }

    /// An NV21 surface holding the frame `nv21`.
    fn nv21(memory: MemoryKind, width: u32, height: u32, nv21: &[u8]) -> BoxResult<Self> {
        Self::load(memory, width, height, Format::Nv21, nv21)
    }

    fn load(
        memory: MemoryKind,
        width: u32,
        height: u32,
        format: Format,
        pixels: &[u8],
    ) -> BoxResult<Self> {
        let mut surface = Self::alloc(memory, width, height, format)?;
        match &mut surface {
            Surface::Dma(img) if format == Format::Nv21 => img.upload_nv21(pixels)?,
            Surface::Dma(img) => img.upload(pixels)?,
            Surface::Host { data, .. } => {
                if pixels.len() != data.len() {
                    return Err(Box::from("pixel data does not match surface size"));
                }
                data.copy_from_slice(pixels)
            }
        }
        Ok(surface)
    }

    fn buffer(&mut self) -> BoxResult<Buffer<'_>> {
        let buffer = match self {
            Surface::Dma(img) => Buffer::try_from(&*img)?,
            Surface::Host {
                data,
                width,
                height,
                format,
            } => Buffer::from_slice_mut(data, *width, *height, *format)?,
        };
        Ok(buffer)
    }

    fn width(&self) -> u32 {
        match self {
            Surface::Dma(img) => img.width(),
            Surface::Host { width, .. } => *width,
        }
    }

    fn height(&self) -> u32 {
        match self {
            Surface::Dma(img) => img.height(),
            Surface::Host { height, .. } => *height,
        }
    }

    fn format(&self) -> Format {
        match self {
            Surface::Dma(img) => img.format(),
            Surface::Host { format, .. } => *format,
        }
    }

    fn pixels(&self) -> BoxResult<Vec<u8>> {
        match self {
            Surface::Dma(img) => img.download(),
            Surface::Host { data, .. } => Ok(data.clone()),
        }
    }

    fn jpeg(&self) -> BoxResult<Vec<u8>> {
        let jpeg = match self {
            Surface::Dma(img) => img.encode_jpeg()?,
            Surface::Host {
                data,
                width,
                height,
                format,
            } => encode_jpeg(data, *width, *height, *format)?,
        };
        Ok(jpeg.to_vec())
    }
}

/// Runs test cases against one [`ImageManager`].
pub struct Harness {
    imgmgr: ImageManager,
    settings: Settings,
    pattern: Vec<u8>,
}

impl Harness {
    pub fn new(imgmgr: ImageManager, settings: Settings) -> Self {
        let pattern = test_pattern(settings.width, settings.height);
        Self {
            imgmgr,
            settings,
            pattern,
        }
    }

    pub fn imgmgr(&self) -> &ImageManager {
        &self.imgmgr
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Runs one test case.  Never fails; errors become the report outcome.
    #[instrument(skip(self), fields(memory = ?self.settings.memory))]
    pub fn run(&self, case: TestCase) -> Report {
        let start = Instant::now();
        let result = match case {
            TestCase::Copy => self.copy(),
            TestCase::Resize => self.resize(),
            TestCase::Crop => self.crop(),
            TestCase::Rotate => self.rotate(),
            TestCase::Flip => self.flip(),
            TestCase::Translate => self.translate(),
            TestCase::Blend => self.blend(),
            TestCase::Convert => self.convert(),
            TestCase::Fill => self.fill(),
            TestCase::FillResize => self.fill_resize(),
            TestCase::Job => self.job(),
            TestCase::Nv21 => self.nv21(),
        };
        let elapsed = start.elapsed();

        let (outcome, output) = match result {
            Ok((outcome, surface)) => {
                let output = if outcome.is_success() {
                    self.save(case, &surface)
                } else {
                    None
                };
                (outcome, output)
            }
            Err(e) => (classify(e.as_ref()), None),
        };
        debug!("{} test finished in {:?}: {}", case.name(), elapsed, outcome);
        Report {
            case,
            outcome,
            elapsed,
            output,
        }
    }

    fn save(&self, case: TestCase, surface: &Surface) -> Option<PathBuf> {
        let dir = self.settings.output_dir.as_ref()?;
        let _span = info_span!("save", case = case.file_stem()).entered();
        let path = dir.join(format!("{}.jpg", case.file_stem()));
        let result = surface
            .jpeg()
            .and_then(|jpeg| fs::write(&path, jpeg).map_err(Box::from));
        match result {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("could not save {} result: {}", case.name(), e);
                None
            }
        }
    }

    fn source(&self) -> BoxResult<Surface> {
        Surface::rgba(
            self.settings.memory,
            self.settings.width,
            self.settings.height,
            &self.pattern,
        )
    }

    fn target(&self, width: u32, height: u32, format: Format) -> BoxResult<Surface> {
        Surface::alloc(self.settings.memory, width, height, format)
    }

    /// A same-sized RGBA8888 target cleared to `color`.
    fn cleared(&self, color: Color) -> BoxResult<Surface> {
        let (width, height) = (self.settings.width, self.settings.height);
        Surface::rgba(self.settings.memory, width, height, &solid(width, height, color))
    }

    fn copy(&self) -> BoxResult<(Outcome, Surface)> {
        let mut src = self.source()?;
        let mut dst = self.target(src.width(), src.height(), Format::Rgba8888)?;
        self.imgmgr.copy(&src.buffer()?, &mut dst.buffer()?)?;

        let outcome = match compare(&self.pattern, &dst.pixels()?, 4) {
            None => Outcome::Success(None),
            Some(m) => Outcome::Mismatch(m),
        };
        Ok((outcome, dst))
    }

    fn resize(&self) -> BoxResult<(Outcome, Surface)> {
        let mut src = self.source()?;
        // truncated the same way the factor check truncates
        let width = (src.width() as f64 * RESIZE_FACTOR) as u32;
        let height = (src.height() as f64 * RESIZE_FACTOR) as u32;
        let mut dst = self.target(width, height, Format::Rgba8888)?;
        self.imgmgr.resize(
            &src.buffer()?,
            &mut dst.buffer()?,
            RESIZE_FACTOR,
            RESIZE_FACTOR,
        )?;

        let detail = format!("{}x{} -> {}x{}", src.width(), src.height(), width, height);
        Ok((Outcome::success(detail), dst))
    }

    fn crop(&self) -> BoxResult<(Outcome, Surface)> {
        let mut src = self.source()?;
        let mut dst = self.target(CROP.width as u32, CROP.height as u32, Format::Rgba8888)?;
        self.imgmgr.crop(&src.buffer()?, &mut dst.buffer()?, CROP)?;

        let expected = crop_rgba(&self.pattern, src.width(), CROP);
        let outcome = match compare(&expected, &dst.pixels()?, 4) {
            None => Outcome::success(format!("cropped {CROP}")),
            Some(m) => Outcome::Mismatch(m),
        };
        Ok((outcome, dst))
    }

    fn rotate(&self) -> BoxResult<(Outcome, Surface)> {
        let mut src = self.source()?;
        let mut dst = self.target(src.height(), src.width(), Format::Rgba8888)?;
        self.imgmgr
            .rotate(&src.buffer()?, &mut dst.buffer()?, Rotation::Rotate90)?;
        Ok((Outcome::Success(None), dst))
    }

    fn flip(&self) -> BoxResult<(Outcome, Surface)> {
        let mut src = self.source()?;
        let mut dst = self.target(src.width(), src.height(), Format::Rgba8888)?;
        self.imgmgr
            .flip(&src.buffer()?, &mut dst.buffer()?, Flip::Horizontal)?;

        let expected = mirror_rgba(&self.pattern, src.width());
        let outcome = match compare(&expected, &dst.pixels()?, 4) {
            None => Outcome::Success(None),
            Some(m) => Outcome::Mismatch(m),
        };
        Ok((outcome, dst))
    }

    fn translate(&self) -> BoxResult<(Outcome, Surface)> {
        let mut src = self.source()?;
        let mut dst = self.cleared(Color::WHITE)?;
        let (x, y) = TRANSLATE;
        self.imgmgr
            .translate(&src.buffer()?, &mut dst.buffer()?, x, y)?;
        Ok((Outcome::success(format!("translated {x},{y}")), dst))
    }

    fn blend(&self) -> BoxResult<(Outcome, Surface)> {
        let (width, height) = (self.settings.width, self.settings.height);
        let mut background = self.source()?;
        let overlay = solid(width, height, Color::RED.with_alpha(0x80));
        let mut foreground = Surface::rgba(self.settings.memory, width, height, &overlay)?;
        let mut dst = self.target(width, height, Format::Rgba8888)?;
        self.imgmgr.composite(
            &foreground.buffer()?,
            &background.buffer()?,
            &mut dst.buffer()?,
            BlendMode::SrcOver,
        )?;
        Ok((Outcome::Success(None), dst))
    }

    fn convert(&self) -> BoxResult<(Outcome, Surface)> {
        let format = self.settings.convert_format;
        let mut src = self.source()?;
        let mut dst = self.target(src.width(), src.height(), format)?;
        self.imgmgr.convert_color(
            &src.buffer()?,
            &mut dst.buffer()?,
            Format::Rgba8888,
            format,
        )?;

        let detail = format!("{} -> {}", src.format(), dst.format());
        if format != Format::Bgra8888 {
            return Ok((Outcome::success(detail), dst));
        }
        let expected = swap_red_blue(&self.pattern);
        let outcome = match compare(&expected, &dst.pixels()?, 4) {
            None => Outcome::success(detail),
            Some(m) => Outcome::Mismatch(m),
        };
        Ok((outcome, dst))
    }

    fn fill(&self) -> BoxResult<(Outcome, Surface)> {
        let (width, height) = (self.settings.width, self.settings.height);
        let mut dst = self.cleared(Color::WHITE)?;
        {
            let mut buffer = dst.buffer()?;
            let whole = Rect::new(0, 0, width as i32, height as i32);
            self.imgmgr.fill(&mut buffer, whole, Color::RED.packed())?;
            self.imgmgr.fill(&mut buffer, FILL, Color::BLUE.packed())?;
        }

        let outcome = match check_fill(&dst.pixels()?, width, FILL, Color::BLUE, Color::RED) {
            None => Outcome::success(format!("red with blue {FILL}")),
            Some(m) => Outcome::Mismatch(m),
        };
        Ok((outcome, dst))
    }

    /// Color fill by scaling a small solid block, for cores without fill.
    fn fill_resize(&self) -> BoxResult<(Outcome, Surface)> {
        let block = solid(FILL_BLOCK, FILL_BLOCK, Color::GREEN);
        let mut src = Surface::rgba(self.settings.memory, FILL_BLOCK, FILL_BLOCK, &block)?;
        let mut dst = self.cleared(Color::WHITE)?;
        self.imgmgr
            .resize(&src.buffer()?, &mut dst.buffer()?, 0.0, 0.0)?;
        Ok((Outcome::Success(None), dst))
    }

    fn job(&self) -> BoxResult<(Outcome, Surface)> {
        let (width, height) = (self.settings.width, self.settings.height);
        let mut src = self.source()?;
        let mut copied = self.target(width, height, Format::Rgba8888)?;
        let mut flipped = self.target(width, height, Format::Rgba8888)?;
        let mut filled = self.cleared(Color::WHITE)?;

        let tasks = {
            let src = src.buffer()?;
            let mut job = self.imgmgr.begin_job()?;
            job.copy(&src, &mut copied.buffer()?)?
                .flip(&src, &mut flipped.buffer()?, Flip::Horizontal)?
                .fill(&mut filled.buffer()?, FILL, Color::BLUE.packed())?;
            let tasks = job.len();
            job.submit()?;
            tasks
        };

        let mut discarded = self.cleared(Color::WHITE)?;
        {
            let src = src.buffer()?;
            let mut job = self.imgmgr.begin_job()?;
            job.copy(&src, &mut discarded.buffer()?)?;
            job.cancel()?;
        }

        let outcome = match compare(&self.pattern, &copied.pixels()?, 4) {
            None => Outcome::success(format!("{tasks} tasks submitted, 1 cancelled")),
            Some(m) => Outcome::Mismatch(format!("copy task: {m}")),
        };
        Ok((outcome, flipped))
    }

    /// Camera path: an NV21 frame converted to RGBA8888, then a region of
    /// it cropped into a new RGBA8888 image.
    fn nv21(&self) -> BoxResult<(Outcome, Surface)> {
        let (width, height) = (self.settings.width, self.settings.height);
        let frame = to_nv21(&self.pattern, width, height);
        let mut src = Surface::nv21(self.settings.memory, width, height, &frame)?;
        let mut rgba = self.target(width, height, Format::Rgba8888)?;
        self.imgmgr
            .nv21_to_rgba(&src.buffer()?, &mut rgba.buffer()?)?;

        let converted = rgba.pixels()?;
        if let Some(m) = check_grid(&converted, width, height) {
            return Ok((Outcome::Mismatch(m), rgba));
        }

        let cropped = self.imgmgr.crop_to_rgba(&src.buffer()?, CROP)?;
        let expected = crop_rgba(&converted, width, CROP);
        let outcome = match compare_within(&expected, &cropped, YUV_TOLERANCE) {
            None => Outcome::success(format!(
                "{} -> {}, cropped {CROP}",
                Format::Nv21,
                Format::Rgba8888
            )),
            Some(m) => Outcome::Mismatch(format!("crop: {m}")),
        };
        let surface = Surface::Host {
            data: cropped,
            width: CROP.width as u32,
            height: CROP.height as u32,
            format: Format::Rgba8888,
        };
        Ok((outcome, surface))
    }
}

/// Maps a failed test to its outcome.
fn classify(err: &(dyn StdError + 'static)) -> Outcome {
    match err.downcast_ref::<Error>() {
        Some(Error::Status { status, .. }) => Outcome::Failed(*status),
        _ => Outcome::Error(err.to_string()),
    }
}

/// First differing pixel, if any.
fn compare(expected: &[u8], actual: &[u8], bpp: usize) -> Option<String> {
    if actual.len() < expected.len() {
        return Some(format!(
            "expected {} bytes, got {}",
            expected.len(),
            actual.len()
        ));
    }
    let index = expected
        .chunks(bpp)
        .zip(actual.chunks(bpp))
        .position(|(e, a)| e != a)?;
    let offset = index * bpp;
    Some(format!(
        "pixel {} is {:02x?}, expected {:02x?}",
        index,
        &actual[offset..offset + bpp],
        &expected[offset..offset + bpp]
    ))
}

/// First RGBA pixel with a color channel further than `tolerance` from
/// the expected one.  Alpha is not compared.
fn compare_within(expected: &[u8], actual: &[u8], tolerance: u8) -> Option<String> {
    if actual.len() != expected.len() {
        return Some(format!(
            "expected {} bytes, got {}",
            expected.len(),
            actual.len()
        ));
    }
    let index = expected
        .chunks(4)
        .zip(actual.chunks(4))
        .position(|(e, a)| !within(e, a, tolerance))?;
    let offset = index * 4;
    Some(format!(
        "pixel {} is {:02x?}, expected {:02x?}",
        index,
        &actual[offset..offset + 4],
        &expected[offset..offset + 4]
    ))
}

fn within(expected: &[u8], actual: &[u8], tolerance: u8) -> bool {
    expected[..3]
        .iter()
        .zip(&actual[..3])
        .all(|(e, a)| e.abs_diff(*a) <= tolerance)
}

/// Checks the center of every pattern grid cell against its color.
fn check_grid(pixels: &[u8], width: u32, height: u32) -> Option<String> {
    let (cw, ch) = (width / 3, height / 3);
    GRID.iter().enumerate().find_map(|(i, color)| {
        let (row, col) = (i as u32 / 3, i as u32 % 3);
        let (x, y) = (col * cw + cw / 2, row * ch + ch / 2);
        let offset = (y as usize * width as usize + x as usize) * 4;
        let p = pixels.get(offset..offset + 4)?;
        (!within(&color.to_bytes(), p, YUV_TOLERANCE))
            .then(|| format!("cell {i} at {x},{y} is {p:02x?}, expected {color}"))
    })
}

fn crop_rgba(pixels: &[u8], width: u32, rect: Rect) -> Vec<u8> {
    let stride = width as usize * 4;
    let (x, w) = (rect.x as usize * 4, rect.width as usize * 4);
    pixels
        .chunks(stride)
        .skip(rect.y as usize)
        .take(rect.height as usize)
        .flat_map(|row| row[x..x + w].iter().copied())
        .collect()
}

fn mirror_rgba(pixels: &[u8], width: u32) -> Vec<u8> {
    pixels
        .chunks(width as usize * 4)
        .flat_map(|row| row.chunks(4).rev().flatten().copied())
        .collect()
}

fn swap_red_blue(pixels: &[u8]) -> Vec<u8> {
    pixels
        .chunks(4)
        .flat_map(|p| [p[2], p[1], p[0], p[3]])
        .collect()
}

/// Checks `inside` within `rect` and `outside` everywhere else.
fn check_fill(pixels: &[u8], width: u32, rect: Rect, inside: Color, outside: Color) -> Option<String> {
    let width = width as usize;
    pixels.chunks(4).enumerate().find_map(|(i, p)| {
        let (x, y) = ((i % width) as i32, (i / width) as i32);
        let within = x >= rect.x
            && y >= rect.y
            && x < rect.x + rect.width
            && y < rect.y + rect.height;
        let expected = if within { inside } else { outside };
        (p != expected.to_bytes()).then(|| {
            format!("pixel {x},{y} is {p:02x?}, expected {}", expected)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_strings() {
        let report = Report {
            case: TestCase::Copy,
            outcome: Outcome::Success(None),
            elapsed: Duration::ZERO,
            output: None,
        };
        assert_eq!(report.to_string(), "Copy test: SUCCESS");

        let report = Report {
            case: TestCase::Resize,
            outcome: Outcome::success("400x400 -> 280x280"),
            ..report
        };
        assert_eq!(report.to_string(), "Resize test: SUCCESS (400x400 -> 280x280)");

        let report = Report {
            case: TestCase::Convert,
            outcome: Outcome::Failed(Status::InvalidParam),
            ..report
        };
        assert_eq!(report.to_string(), "Color conversion test: FAILED (result: -3)");

        let report = Report {
            case: TestCase::Fill,
            outcome: Outcome::Error("no heap".to_string()),
            ..report
        };
        assert_eq!(report.to_string(), "Fill test: ERROR - no heap");
    }

    #[test]
    fn test_classify() {
        let err = Error::Status {
            operation: "improcess",
            status: Status::NotSupported,
            detail: String::new(),
        };
        assert_eq!(classify(&err), Outcome::Failed(Status::NotSupported));
        assert_eq!(
            classify(&Error::ReadOnly),
            Outcome::Error("destination buffer is read-only".to_string())
        );
    }

    #[test]
    fn test_compare() {
        let a = solid(4, 4, Color::RED);
        let mut b = a.clone();
        assert_eq!(compare(&a, &b, 4), None);
        b[4 * 5] = 0;
        let msg = compare(&a, &b, 4).unwrap();
        assert!(msg.starts_with("pixel 5 "), "{msg}");
        assert!(compare(&a, &b[..8], 4).is_some());
    }

    #[test]
    fn test_crop_and_mirror() {
        // 3x2 image, pixel value encodes its index
        let pixels: Vec<u8> = (0..6u8).flat_map(|i| [i; 4]).collect();
        assert_eq!(
            crop_rgba(&pixels, 3, Rect::new(1, 1, 2, 1)),
            [[4u8; 4], [5; 4]].concat()
        );
        assert_eq!(
            mirror_rgba(&pixels, 3),
            [[2u8; 4], [1; 4], [0; 4], [5; 4], [4; 4], [3; 4]].concat()
        );
    }

    #[test]
    fn test_swap_red_blue() {
        assert_eq!(
            swap_red_blue(&[1, 2, 3, 4, 5, 6, 7, 8]),
            [3u8, 2, 1, 4, 7, 6, 5, 8]
        );
    }

    #[test]
    fn test_check_fill() {
        let (width, height) = (8, 8);
        let rect = Rect::new(2, 2, 3, 3);
        let mut pixels = solid(width, height, Color::RED);
        assert!(check_fill(&pixels, width, rect, Color::BLUE, Color::RED).is_some());
        for y in 2..5 {
            for x in 2..5 {
                let offset = (y * width as usize + x) * 4;
                pixels[offset..offset + 4].copy_from_slice(&Color::BLUE.to_bytes());
            }
        }
        assert_eq!(check_fill(&pixels, width, rect, Color::BLUE, Color::RED), None);
    }

    #[test]
    fn test_compare_within() {
        let a = solid(4, 4, Color::GRAY);
        let mut b = solid(4, 4, Color::rgba(0x88 + 24, 0x88 - 24, 0x88, 0));
        assert_eq!(compare_within(&a, &b, 24), None);
        b[4 * 3 + 2] = 0x88 + 25;
        let msg = compare_within(&a, &b, 24).unwrap();
        assert!(msg.starts_with("pixel 3 "), "{msg}");
        assert!(compare_within(&a, &b[..8], 24).is_some());
    }

    #[test]
    fn test_check_grid() {
        let (width, height) = (300, 300);
        let mut pixels = test_pattern(width, height);
        assert_eq!(check_grid(&pixels, width, height), None);
        // center of the magenta cell
        let offset = (150 * width as usize + 250) * 4;
        pixels[offset..offset + 4].copy_from_slice(&Color::WHITE.to_bytes());
        let msg = check_grid(&pixels, width, height).unwrap();
        assert!(msg.starts_with("cell 5 at 250,150"), "{msg}");
    }

    #[test]
    fn test_nv21_surface() -> BoxResult<()> {
        let frame = to_nv21(&test_pattern(32, 16), 32, 16);
        let mut surface = Surface::nv21(MemoryKind::Virtual, 32, 16, &frame)?;
        assert_eq!(surface.format(), Format::Nv21);
        assert_eq!(surface.pixels()?, frame);
        assert_eq!(surface.buffer()?.format(), Format::Nv21);
        assert!(Surface::nv21(MemoryKind::Virtual, 32, 16, &frame[1..]).is_err());
        Ok(())
    }

    #[test]
    fn test_virtual_surface() -> BoxResult<()> {
        let pixels = test_pattern(32, 16);
        let mut surface = Surface::rgba(MemoryKind::Virtual, 32, 16, &pixels)?;
        assert_eq!(surface.pixels()?, pixels);
        assert_eq!(surface.format(), Format::Rgba8888);
        let buffer = surface.buffer()?;
        assert!(buffer.is_writable());
        assert_eq!((buffer.width(), buffer.height()), (32, 16));
        assert!(surface.jpeg()?.starts_with(&[0xff, 0xd8]));
        Ok(())
    }

    #[test]
    fn test_all_cases_named() {
        let stems: std::collections::HashSet<_> =
            TestCase::ALL.iter().map(|c| c.file_stem()).collect();
        assert_eq!(stems.len(), TestCase::ALL.len());
    }
}
