// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use crate::{
    buffer::{Buffer, ImportedBuffer},
    error::{Error, Result, Status},
    image::{Format, Rect},
};
use core::fmt;
use rga_sys::{
    guess_version, im_opt_t, im_rect, rga as rga_library, rga_buffer_t, Version,
    IM_ALPHA_BLEND_DST, IM_ALPHA_BLEND_DST_ATOP, IM_ALPHA_BLEND_DST_IN, IM_ALPHA_BLEND_DST_OUT,
    IM_ALPHA_BLEND_DST_OVER, IM_ALPHA_BLEND_SRC, IM_ALPHA_BLEND_SRC_ATOP, IM_ALPHA_BLEND_SRC_IN,
    IM_ALPHA_BLEND_SRC_OUT, IM_ALPHA_BLEND_SRC_OVER, IM_ALPHA_BLEND_XOR, IM_COLOR_FILL,
    IM_CONFIG_CHECK, IM_CONFIG_PRIORITY, IM_CONFIG_SCHEDULER_CORE, IM_HAL_TRANSFORM_FLIP_H,
    IM_HAL_TRANSFORM_FLIP_H_V, IM_HAL_TRANSFORM_FLIP_V, IM_HAL_TRANSFORM_ROT_180,
    IM_HAL_TRANSFORM_ROT_270, IM_HAL_TRANSFORM_ROT_90, IM_SCHEDULER_RGA2_CORE0,
    IM_SCHEDULER_RGA2_CORE1, IM_SCHEDULER_RGA3_CORE0, IM_SCHEDULER_RGA3_CORE1, IM_STATUS, IM_SYNC, RGA_ALL, RGA_BYTE_STRIDE, RGA_EXPECTED,
    RGA_FEATURE, RGA_INPUT_FORMAT, RGA_MAX_INPUT, RGA_MAX_OUTPUT, RGA_OUTPUT_FORMAT,
    RGA_SCALE_LIMIT, RGA_VENDOR, RGA_VERSION,
};
use std::{
    ffi::{c_int, CStr, OsStr},
    ops::BitOr,
    os::fd::BorrowedFd,
    ptr::null_mut,
};
use tracing::{debug, trace};

/// Default soname of the Rockchip RGA library.
pub const LIBRARY_NAME: &str = "librga.so";

/// First librga release with the job/task and buffer import APIs.
pub const JOB_API_VERSION: Version = Version::new(1, 9, 0);

/// Assumed when the library cannot report its own version.
const RGA_1_9_0: Version = JOB_API_VERSION;

/// Image rotation angles supported by the RGA, clockwise.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rotation {
    Rotate90 = IM_HAL_TRANSFORM_ROT_90 as isize,
    Rotate180 = IM_HAL_TRANSFORM_ROT_180 as isize,
    Rotate270 = IM_HAL_TRANSFORM_ROT_270 as isize,
}

/// Mirroring modes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Flip {
    /// Left-right
    Horizontal = IM_HAL_TRANSFORM_FLIP_H as isize,
    /// Top-bottom
    Vertical = IM_HAL_TRANSFORM_FLIP_V as isize,
    /// Both axes
    Both = IM_HAL_TRANSFORM_FLIP_H_V as isize,
}

/// Porter-Duff blend modes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    SrcOver = IM_ALPHA_BLEND_SRC_OVER as isize,
    Src = IM_ALPHA_BLEND_SRC as isize,
    Dst = IM_ALPHA_BLEND_DST as isize,
    SrcIn = IM_ALPHA_BLEND_SRC_IN as isize,
    DstIn = IM_ALPHA_BLEND_DST_IN as isize,
    SrcOut = IM_ALPHA_BLEND_SRC_OUT as isize,
    DstOut = IM_ALPHA_BLEND_DST_OUT as isize,
    DstOver = IM_ALPHA_BLEND_DST_OVER as isize,
    SrcAtop = IM_ALPHA_BLEND_SRC_ATOP as isize,
    DstAtop = IM_ALPHA_BLEND_DST_ATOP as isize,
    Xor = IM_ALPHA_BLEND_XOR as isize,
}

/// Set of hardware cores the scheduler may dispatch to.
///
/// RK3588 carries two RGA3 cores and one RGA2 core.  RGA3 handles any
/// address through its IOMMU but supports fewer operations (no color fill),
/// RGA2 is limited to 32-bit physical addresses.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Core(u32);

impl Core {
    /// Let the driver choose.
    pub const DEFAULT: Core = Core(0);
    pub const RGA3_CORE0: Core = Core(IM_SCHEDULER_RGA3_CORE0);
    pub const RGA3_CORE1: Core = Core(IM_SCHEDULER_RGA3_CORE1);
    pub const RGA2_CORE0: Core = Core(IM_SCHEDULER_RGA2_CORE0);
    pub const RGA2_CORE1: Core = Core(IM_SCHEDULER_RGA2_CORE1);
    pub const RGA3: Core = Core(IM_SCHEDULER_RGA3_CORE0 | IM_SCHEDULER_RGA3_CORE1);
    pub const RGA2: Core = Core(IM_SCHEDULER_RGA2_CORE0 | IM_SCHEDULER_RGA2_CORE1);

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_default(&self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Core {
    type Output = Core;

    fn bitor(self, rhs: Core) -> Core {
        Core(self.0 | rhs.0)
    }
}

impl fmt::Display for Core {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_default() {
            return f.write_str("default");
        }
        let names = [
            (Core::RGA3_CORE0, "rga3_core0"),
            (Core::RGA3_CORE1, "rga3_core1"),
            (Core::RGA2_CORE0, "rga2_core0"),
            (Core::RGA2_CORE1, "rga2_core1"),
        ];
        let mut first = true;
        for (core, name) in names {
            if self.0 & core.0 != 0 {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Library information exposed by `querystring`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Info {
    Vendor = RGA_VENDOR as isize,
    Version = RGA_VERSION as isize,
    MaxInput = RGA_MAX_INPUT as isize,
    MaxOutput = RGA_MAX_OUTPUT as isize,
    ByteStride = RGA_BYTE_STRIDE as isize,
    ScaleLimit = RGA_SCALE_LIMIT as isize,
    InputFormat = RGA_INPUT_FORMAT as isize,
    OutputFormat = RGA_OUTPUT_FORMAT as isize,
    Feature = RGA_FEATURE as isize,
    Expected = RGA_EXPECTED as isize,
    All = RGA_ALL as isize,
}

/// Thread-local defaults applied with `imconfig`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Config {
    /// Cores used by jobs created on the calling thread
    SchedulerCore(Core),
    /// Scheduling priority, 0 (lowest) to 6
    Priority(u8),
    /// Enable or disable parameter checking inside the library
    Check(bool),
}

/// Highest priority accepted by the driver.
pub const MAX_PRIORITY: u8 = 6;

/// Manager for Rockchip RGA hardware accelerator operations.
///
/// `ImageManager` owns the dynamically loaded `librga` and marshals
/// [`Buffer`] descriptors into the im2d API.  Every operation here is
/// submitted synchronously and returns once the hardware has finished; use
/// [`ImageManager::begin_job`] to batch several operations into one
/// submission.
///
/// The manager holds no per-call state and can be shared between threads.
///
/// # Example
///
/// ```no_run
/// use edgefirst_rga::{
///     buffer::Buffer,
///     image::{Format, Image},
///     rga::{Core, ImageManager},
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut imgmgr = ImageManager::new()?;
/// imgmgr.set_core(Core::RGA3);
///
/// let src = Image::new(1920, 1080, Format::Nv12)?;
/// let dst = Image::new(640, 480, Format::Rgba8888)?;
///
/// imgmgr.resize(&Buffer::try_from(&src)?, &mut Buffer::try_from(&dst)?, 0.0, 0.0)?;
/// # Ok(())
/// # }
/// ```
pub struct ImageManager {
    lib: rga_library,
    version: Version,
    core: Core,
    priority: Option<u8>,
}

impl ImageManager {
    /// Loads `librga.so` from the default search path.
    ///
    /// # Errors
    ///
    /// Returns an error if the library cannot be opened or lacks the
    /// single-operation entry points.
    pub fn new() -> Result<Self> {
        Self::with_library(LIBRARY_NAME)
    }

    /// Loads librga from an explicit path or soname.
    pub fn with_library<P: AsRef<OsStr>>(path: P) -> Result<Self> {
        let lib = unsafe { rga_library::new(path) }?;
        let version = guess_version(&lib).unwrap_or(RGA_1_9_0);
        debug!("librga {} loaded", version);
        Ok(Self {
            lib,
            version,
            core: Core::DEFAULT,
            priority: None,
        })
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn core(&self) -> Core {
        self.core
    }

    /// Cores used by subsequent operations and jobs of this manager.
    pub fn set_core(&mut self, core: Core) {
        self.core = core;
    }

    pub fn priority(&self) -> Option<u8> {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Option<u8>) -> Result<()> {
        if let Some(p) = priority {
            if p > MAX_PRIORITY {
                return Err(Error::invalid(format!(
                    "priority {p} above maximum {MAX_PRIORITY}"
                )));
            }
        }
        self.priority = priority;
        Ok(())
    }

    pub(crate) fn lib(&self) -> &rga_library {
        &self.lib
    }

    /// Text the library reports for `info`.
    pub fn query(&self, info: Info) -> Result<String> {
        let ptr = unsafe { self.lib.querystring(info as c_int) };
        if ptr.is_null() {
            return Err(Error::invalid(format!("no information for {info:?}")));
        }
        Ok(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    /// Applies a thread-local default with `imconfig`.
    pub fn configure(&self, config: Config) -> Result<()> {
        let (name, value) = match config {
            Config::SchedulerCore(core) => (IM_CONFIG_SCHEDULER_CORE, core.bits() as u64),
            Config::Priority(p) if p > MAX_PRIORITY => {
                return Err(Error::invalid(format!(
                    "priority {p} above maximum {MAX_PRIORITY}"
                )))
            }
            Config::Priority(p) => (IM_CONFIG_PRIORITY, p as u64),
            Config::Check(enable) => (IM_CONFIG_CHECK, enable as u64),
        };
        let status = unsafe { self.lib.imconfig(name, value) };
        self.check_status("imconfig", status)
    }

    /// Imports a dma-buf into the driver so it can be referenced by handle.
    pub fn import_fd<'a>(
        &'a self,
        fd: BorrowedFd<'a>,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<ImportedBuffer<'a>> {
        ImportedBuffer::import(self, fd, width, height, format)
    }

    /// Asks the library whether it would accept an operation.
    pub fn check(
        &self,
        src: &Buffer,
        dst: &Buffer,
        src_rect: Option<Rect>,
        dst_rect: Option<Rect>,
    ) -> Result<()> {
        let status = unsafe {
            self.lib.imcheck_t(
                src.raw(),
                dst.raw(),
                rga_buffer_t::default(),
                src_rect.map(im_rect::from).unwrap_or_default(),
                dst_rect.map(im_rect::from).unwrap_or_default(),
                im_rect::default(),
                0,
            )
        };
        self.check_status("imcheck", status)
    }

    /// Copies `src` to `dst`.  Formats may differ; sizes should match.
    pub fn copy(&self, src: &Buffer, dst: &mut Buffer) -> Result<()> {
        self.process("imcopy", src, dst, None, Process::default())
    }

    /// Scales the whole of `src` onto the whole of `dst`.
    ///
    /// When `fx` and `fy` are positive the destination must already have
    /// the scaled size, truncated to whole pixels.
    pub fn resize(&self, src: &Buffer, dst: &mut Buffer, fx: f64, fy: f64) -> Result<()> {
        let process = Process::resize(src, dst, fx, fy)?;
        self.process("imresize", src, dst, None, process)
    }

    /// Scales `src` by `fx`, `fy` into the top-left corner of `dst`.
    pub fn rescale(&self, src: &Buffer, dst: &mut Buffer, fx: f64, fy: f64) -> Result<()> {
        let process = Process::rescale(src, dst, fx, fy)?;
        self.process("imrescale", src, dst, None, process)
    }

    /// Scales the `rect` region of `src` onto the whole of `dst`.
    pub fn crop(&self, src: &Buffer, dst: &mut Buffer, rect: Rect) -> Result<()> {
        let process = Process::crop(src, rect)?;
        self.process("imcrop", src, dst, None, process)
    }

    pub fn rotate(&self, src: &Buffer, dst: &mut Buffer, rotation: Rotation) -> Result<()> {
        self.process("imrotate", src, dst, None, Process::usage(rotation as c_int))
    }

    pub fn flip(&self, src: &Buffer, dst: &mut Buffer, mode: Flip) -> Result<()> {
        self.process("imflip", src, dst, None, Process::usage(mode as c_int))
    }

    /// Moves the content of `src` by `x`, `y` pixels right and down.
    ///
    /// The region `{0, 0, w - x, h - y}` of `src` lands at `{x, y}` in
    /// `dst`; destination pixels above and left of the offset are left
    /// untouched.  This is how librga's translate task behaves.  It does
    /// not crop `src` from `x, y` and scale it over the whole of `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParam`] for negative offsets, offsets at or
    /// beyond the source size, or a destination too small for the moved
    /// region.
    pub fn translate(&self, src: &Buffer, dst: &mut Buffer, x: i32, y: i32) -> Result<()> {
        let process = Process::translate(src, dst, x, y)?;
        self.process("imtranslate", src, dst, None, process)
    }

    /// Blends `fg` over `bg`, writing the result into `bg`.
    pub fn blend(&self, fg: &Buffer, bg: &mut Buffer, mode: BlendMode) -> Result<()> {
        self.process("imblend", fg, bg, None, Process::usage(mode as c_int))
    }

    /// Blends `a` (foreground) over `b` (background) into `dst`.
    pub fn composite(
        &self,
        a: &Buffer,
        b: &Buffer,
        dst: &mut Buffer,
        mode: BlendMode,
    ) -> Result<()> {
        self.process("imcomposite", a, dst, Some(b), Process::usage(mode as c_int))
    }

    /// Converts pixel formats, treating `src` as `src_format` and `dst` as
    /// `dst_format`.
    pub fn convert_color(
        &self,
        src: &Buffer,
        dst: &mut Buffer,
        src_format: Format,
        dst_format: Format,
    ) -> Result<()> {
        let src = src.reformatted(src_format)?;
        let mut dst = dst.reformatted(dst_format)?;
        self.process("imcvtcolor", &src, &mut dst, None, Process::default())
    }

    /// Converts a YUV camera frame, usually NV21, to RGBA8888.
    ///
    /// The source is read in its own format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParam`] unless `src` is YUV and `dst` is
    /// RGBA8888.
    pub fn nv21_to_rgba(&self, src: &Buffer, dst: &mut Buffer) -> Result<()> {
        check_nv21_to_rgba(src, dst)?;
        self.convert_color(src, dst, src.format(), Format::Rgba8888)
    }

    /// Crops `rect` out of `src` into a newly allocated RGBA8888 image of
    /// the same size, converting from the source format on the way.
    ///
    /// The returned pixels are tightly packed, `rect.width * 4` bytes per
    /// row.
    pub fn crop_to_rgba(&self, src: &Buffer, rect: Rect) -> Result<Vec<u8>> {
        // Rejects negative sizes before they reach the allocation.
        Process::crop(src, rect)?;
        let (width, height) = (rect.width as u32, rect.height as u32);
        let mut pixels = vec![0u8; Format::Rgba8888.buffer_size(width, height)];
        let mut dst = Buffer::from_slice_mut(&mut pixels, width, height, Format::Rgba8888)?;
        self.crop(src, &mut dst, rect)?;
        Ok(pixels)
    }

    /// Fills `rect` of `dst` with `color`.
    ///
    /// The color is the packed 32-bit value the hardware stores for an
    /// RGBA8888 pixel, see [`crate::pattern::Color::packed`].  Color fill is
    /// implemented by RGA2 only.
    pub fn fill(&self, dst: &mut Buffer, rect: Rect, color: u32) -> Result<()> {
        let process = Process::fill(dst, rect, color)?;
        self.process("imfill", &Buffer::empty(), dst, None, process)
    }

    /// Options carrying the manager's core mask and priority.
    pub(crate) fn options(&self, process: &Process) -> im_opt_t {
        im_opt_t {
            core: self.core.bits() as c_int,
            priority: self.priority.unwrap_or(0) as c_int,
            color: process.color,
            ..Default::default()
        }
    }

    fn process(
        &self,
        operation: &'static str,
        src: &Buffer,
        dst: &mut Buffer,
        pattern: Option<&Buffer>,
        process: Process,
    ) -> Result<()> {
        if !dst.is_writable() {
            return Err(Error::ReadOnly);
        }
        let mut opt = self.options(&process);
        let usage = process.usage | IM_SYNC;
        trace!(
            operation,
            usage = format_args!("{:#x}", usage),
            ?opt,
            "improcess"
        );

        let status = unsafe {
            self.lib.improcess(
                src.raw(),
                dst.raw(),
                pattern.map(Buffer::raw).unwrap_or_default(),
                process.src_rect.into(),
                process.dst_rect.into(),
                im_rect::default(),
                -1,
                null_mut(),
                &mut opt,
                usage,
            )
        };
        self.check_status(operation, status)
    }

    pub(crate) fn check_status(&self, operation: &'static str, status: IM_STATUS) -> Result<()> {
        if Status::from_raw(status).is_ok() {
            Ok(())
        } else {
            Err(self.status_error(operation, status))
        }
    }

    pub(crate) fn status_error(&self, operation: &'static str, status: IM_STATUS) -> Error {
        let detail = unsafe { self.lib.imStrError_t(status) };
        let detail = if detail.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(detail) }
                .to_string_lossy()
                .trim()
                .to_string()
        };
        Error::Status {
            operation,
            status: Status::from_raw(status),
            detail,
        }
    }
}

/// Rects, usage bits and fill color of one `improcess` or `improcessTask`
/// call.  Single operations and job tasks build theirs the same way.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Process {
    pub(crate) src_rect: Rect,
    pub(crate) dst_rect: Rect,
    pub(crate) usage: c_int,
    pub(crate) color: c_int,
}

impl Process {
    /// Whole source onto whole destination with the given usage bits.
    pub(crate) fn usage(usage: c_int) -> Self {
        Process {
            usage,
            ..Default::default()
        }
    }

    pub(crate) fn resize(src: &Buffer, dst: &Buffer, fx: f64, fy: f64) -> Result<Self> {
        check_resize(src, dst, fx, fy)?;
        Ok(Process::default())
    }

    pub(crate) fn rescale(src: &Buffer, dst: &Buffer, fx: f64, fy: f64) -> Result<Self> {
        let (src_rect, dst_rect) = rescale_rects(src, dst, fx, fy)?;
        Ok(Process {
            src_rect,
            dst_rect,
            ..Default::default()
        })
    }

    pub(crate) fn crop(src: &Buffer, rect: Rect) -> Result<Self> {
        check_rect("crop", rect, src)?;
        Ok(Process {
            src_rect: rect,
            ..Default::default()
        })
    }

    pub(crate) fn translate(src: &Buffer, dst: &Buffer, x: i32, y: i32) -> Result<Self> {
        let (src_rect, dst_rect) = translate_rects(src, dst, x, y)?;
        Ok(Process {
            src_rect,
            dst_rect,
            ..Default::default()
        })
    }

    pub(crate) fn fill(dst: &Buffer, rect: Rect, color: u32) -> Result<Self> {
        check_rect("fill", rect, dst)?;
        Ok(Process {
            dst_rect: rect,
            usage: IM_COLOR_FILL,
            color: color as c_int,
            ..Default::default()
        })
    }
}

pub(crate) fn check_rect(operation: &str, rect: Rect, buffer: &Buffer) -> Result<()> {
    if rect.fits_within(buffer.width(), buffer.height()) {
        Ok(())
    } else {
        Err(Error::invalid(format!(
            "{} rect {} outside {}x{} image",
            operation,
            rect,
            buffer.width(),
            buffer.height()
        )))
    }
}

pub(crate) fn check_resize(src: &Buffer, dst: &Buffer, fx: f64, fy: f64) -> Result<()> {
    if fx > 0.0 && fy > 0.0 {
        let width = (src.width() as f64 * fx) as u32;
        let height = (src.height() as f64 * fy) as u32;
        if width != dst.width() || height != dst.height() {
            return Err(Error::invalid(format!(
                "resize by {}x{} gives {}x{} but destination is {}x{}",
                fx,
                fy,
                width,
                height,
                dst.width(),
                dst.height()
            )));
        }
    } else if fx != 0.0 || fy != 0.0 {
        return Err(Error::invalid(format!(
            "resize factors must both be positive or both zero, got {fx}x{fy}"
        )));
    }
    Ok(())
}

/// Source and destination rects for a rescale by `fx`, `fy`.
pub(crate) fn rescale_rects(
    src: &Buffer,
    dst: &Buffer,
    fx: f64,
    fy: f64,
) -> Result<(Rect, Rect)> {
    if !(fx > 0.0 && fy > 0.0) {
        return Err(Error::invalid(format!(
            "rescale factors must be positive, got {fx}x{fy}"
        )));
    }
    let srect = Rect::new(0, 0, src.width() as i32, src.height() as i32);
    let drect = Rect::new(
        0,
        0,
        (src.width() as f64 * fx) as i32,
        (src.height() as f64 * fy) as i32,
    );
    check_rect("rescale", drect, dst)?;
    Ok((srect, drect))
}

/// Source and destination rects for a translation by `x`, `y`.
pub(crate) fn translate_rects(src: &Buffer, dst: &Buffer, x: i32, y: i32) -> Result<(Rect, Rect)> {
    let (width, height) = (src.width() as i32, src.height() as i32);
    if x < 0 || y < 0 || x >= width || y >= height {
        return Err(Error::invalid(format!(
            "translation {x},{y} outside {width}x{height} image"
        )));
    }
    let srect = Rect::new(0, 0, width - x, height - y);
    let drect = Rect::new(x, y, width - x, height - y);
    check_rect("translate", drect, dst)?;
    Ok((srect, drect))
}

pub(crate) fn check_nv21_to_rgba(src: &Buffer, dst: &Buffer) -> Result<()> {
    if !src.format().is_yuv() {
        return Err(Error::invalid(format!(
            "source must be YUV, got {}",
            src.format()
        )));
    }
    if dst.format() != Format::Rgba8888 {
        return Err(Error::invalid(format!(
            "destination must be RGBA8888, got {}",
            dst.format()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgba(data: &[u8], width: u32, height: u32) -> Buffer<'_> {
        Buffer::from_slice(data, width, height, Format::Rgba8888).unwrap()
    }

    #[test]
    fn test_translate_rects() -> Result<()> {
        let data = vec![0u8; 400 * 400 * 4];
        let src = rgba(&data, 400, 400);
        let dst = rgba(&data, 400, 400);
        let (srect, drect) = translate_rects(&src, &dst, 80, 80)?;
        assert_eq!(srect, Rect::new(0, 0, 320, 320));
        assert_eq!(drect, Rect::new(80, 80, 320, 320));

        assert!(translate_rects(&src, &dst, -1, 0).is_err());
        assert!(translate_rects(&src, &dst, 0, -1).is_err());
        assert!(translate_rects(&src, &dst, 0, 0).is_ok());
        Ok(())
    }

    #[test]
    fn test_translate_offset_at_edge() -> Result<()> {
        let data = vec![0u8; 400 * 300 * 4];
        let src = rgba(&data, 400, 300);
        let dst = rgba(&data, 400, 300);
        assert!(translate_rects(&src, &dst, 400, 0).is_err());
        assert!(translate_rects(&src, &dst, 0, 300).is_err());

        let (srect, drect) = translate_rects(&src, &dst, 399, 299)?;
        assert_eq!(srect, Rect::new(0, 0, 1, 1));
        assert_eq!(drect, Rect::new(399, 299, 1, 1));
        Ok(())
    }

    #[test]
    fn test_translate_into_smaller_destination() {
        let data = vec![0u8; 400 * 400 * 4];
        let src = rgba(&data, 400, 400);
        let dst = rgba(&data, 200, 200);
        assert!(translate_rects(&src, &dst, 80, 80).is_err());
    }

    #[test]
    fn test_rescale_rects() -> Result<()> {
        let data = vec![0u8; 400 * 400 * 4];
        let src = rgba(&data, 400, 400);
        let dst = rgba(&data, 400, 400);
        let (srect, drect) = rescale_rects(&src, &dst, 0.7, 0.5)?;
        assert_eq!(srect, Rect::new(0, 0, 400, 400));
        assert_eq!(drect, Rect::new(0, 0, 280, 200));

        let (_, drect) = rescale_rects(&src, &dst, 1.0, 1.0)?;
        assert_eq!(drect, Rect::new(0, 0, 400, 400));
        Ok(())
    }

    #[test]
    fn test_rescale_rects_invalid_factors() {
        let data = vec![0u8; 400 * 400 * 4];
        let src = rgba(&data, 400, 400);
        let dst = rgba(&data, 400, 400);
        assert!(rescale_rects(&src, &dst, 0.0, 0.0).is_err());
        assert!(rescale_rects(&src, &dst, 0.0, 1.0).is_err());
        assert!(rescale_rects(&src, &dst, -0.5, 0.5).is_err());
        assert!(rescale_rects(&src, &dst, 1.5, 1.0).is_err());
        assert!(rescale_rects(&src, &dst, f64::NAN, 1.0).is_err());
        // Scales to nothing.
        assert!(rescale_rects(&src, &dst, 0.001, 0.5).is_err());
    }

    #[test]
    fn test_check_resize() {
        let data = vec![0u8; 400 * 400 * 4];
        let src = rgba(&data, 400, 400);
        let dst = rgba(&data, 280, 280);
        assert!(check_resize(&src, &dst, 0.7, 0.7).is_ok());
        assert!(check_resize(&src, &dst, 0.0, 0.0).is_ok());
        assert!(check_resize(&src, &dst, 0.5, 0.5).is_err());
        assert!(check_resize(&src, &dst, 0.7, 0.0).is_err());
        assert!(check_resize(&src, &dst, 0.0, 0.7).is_err());
        assert!(check_resize(&src, &dst, -0.7, -0.7).is_err());
        assert!(check_resize(&src, &dst, 2.0, 2.0).is_err());
    }

    #[test]
    fn test_check_resize_truncates() {
        // 333 * 0.7 = 233.1
        let data = vec![0u8; 333 * 333 * 4];
        let src = rgba(&data, 333, 333);
        let dst = rgba(&data, 233, 233);
        assert!(check_resize(&src, &dst, 0.7, 0.7).is_ok());
        let dst = rgba(&data, 234, 234);
        assert!(check_resize(&src, &dst, 0.7, 0.7).is_err());
    }

    #[test]
    fn test_process_builders() -> Result<()> {
        let data = vec![0u8; 400 * 400 * 4];
        let src = rgba(&data, 400, 400);
        let dst = rgba(&data, 400, 400);

        assert_eq!(Process::resize(&src, &dst, 0.0, 0.0)?, Process::default());
        assert_eq!(
            Process::usage(Flip::Vertical as c_int).usage,
            IM_HAL_TRANSFORM_FLIP_V
        );

        let crop = Process::crop(&src, Rect::new(100, 100, 200, 150))?;
        assert_eq!(crop.src_rect, Rect::new(100, 100, 200, 150));
        assert!(crop.dst_rect.is_empty());
        assert_eq!(crop.usage, 0);

        let translate = Process::translate(&src, &dst, 80, 40)?;
        assert_eq!(translate.src_rect, Rect::new(0, 0, 320, 360));
        assert_eq!(translate.dst_rect, Rect::new(80, 40, 320, 360));

        let fill = Process::fill(&dst, Rect::new(50, 50, 100, 100), 0xff00_00ff)?;
        assert_eq!(fill.usage, IM_COLOR_FILL);
        assert_eq!(fill.color, 0xff00_00ffu32 as c_int);
        assert_eq!(fill.dst_rect, Rect::new(50, 50, 100, 100));
        assert!(fill.src_rect.is_empty());

        assert!(Process::fill(&dst, Rect::new(350, 0, 100, 100), 0).is_err());
        assert!(Process::crop(&src, Rect::new(0, 0, -1, 10)).is_err());
        Ok(())
    }

    #[test]
    fn test_check_nv21_to_rgba() -> Result<()> {
        let yuv = vec![0u8; 64 * 64 * 3 / 2];
        let pixels = vec![0u8; 64 * 64 * 4];
        let nv21 = Buffer::from_nv21(&yuv, 64, 64)?;
        let rgba = rgba(&pixels, 64, 64);
        let bgra = Buffer::from_slice(&pixels, 64, 64, Format::Bgra8888)?;

        assert!(check_nv21_to_rgba(&nv21, &rgba).is_ok());
        assert!(matches!(
            check_nv21_to_rgba(&nv21, &bgra),
            Err(Error::InvalidParam(_))
        ));
        assert!(check_nv21_to_rgba(&rgba, &rgba).is_err());
        Ok(())
    }

    #[test]
    fn test_check_rect() {
        let data = vec![0u8; 400 * 400 * 4];
        let buffer = rgba(&data, 400, 400);
        assert!(check_rect("crop", Rect::new(100, 100, 200, 150), &buffer).is_ok());
        assert!(check_rect("crop", Rect::new(300, 300, 200, 150), &buffer).is_err());
        assert!(check_rect("fill", Rect::default(), &buffer).is_err());
    }

    #[test]
    fn test_core_mask() {
        assert_eq!(Core::RGA3.bits(), 0b0011);
        assert_eq!(Core::RGA2.bits(), 0b1100);
        assert_eq!((Core::RGA3_CORE0 | Core::RGA2_CORE0).bits(), 0b0101);
        assert_eq!(Core::RGA3.to_string(), "rga3_core0|rga3_core1");
        assert_eq!(Core::DEFAULT.to_string(), "default");
    }

    #[test]
    fn test_usage_bits() {
        assert_eq!(Rotation::Rotate90 as c_int, 1);
        assert_eq!(Flip::Horizontal as c_int, 1 << 3);
        assert_eq!(BlendMode::default() as c_int, 1 << 6);
        assert_eq!(BlendMode::Xor as c_int, 1 << 16);
    }
}
