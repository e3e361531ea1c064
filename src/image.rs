// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use core::fmt;
use dma_buf::DmaBuf;
use dma_heap::{Heap, HeapKind};
use rga_sys::{
    im_rect, RK_FORMAT_BGRA_8888, RK_FORMAT_BGR_888, RK_FORMAT_RGBA_4444, RK_FORMAT_RGBA_5551,
    RK_FORMAT_RGBA_8888, RK_FORMAT_RGBX_8888, RK_FORMAT_RGB_565, RK_FORMAT_RGB_888,
    RK_FORMAT_YCbCr_420_P, RK_FORMAT_YCbCr_420_SP, RK_FORMAT_YCbCr_422_P,
    RK_FORMAT_YCbCr_422_SP, RK_FORMAT_YCrCb_420_P, RK_FORMAT_YCrCb_420_SP,
    RK_FORMAT_YCrCb_422_P, RK_FORMAT_YCrCb_422_SP,
};
use std::{
    error::Error,
    ffi::c_int,
    io,
    os::{
        fd::{AsFd, BorrowedFd},
        unix::io::OwnedFd,
    },
    str::FromStr,
};
use tracing::debug;
use turbojpeg::OwnedBuf;

/// Pixel formats understood by the RGA.
///
/// YUV names follow the usual FourCC conventions: `Nv12` is
/// `YCbCr_420_SP`, `Nv21` is `YCrCb_420_SP`, the usual camera output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Format {
    Rgba8888,
    Rgbx8888,
    Rgb888,
    Bgra8888,
    Rgb565,
    Rgba5551,
    Rgba4444,
    Bgr888,
    /// YCbCr 4:2:2 semi-planar
    Nv16,
    /// YCbCr 4:2:2 planar
    I422,
    /// YCbCr 4:2:0 semi-planar
    Nv12,
    /// YCbCr 4:2:0 planar
    I420,
    /// YCrCb 4:2:2 semi-planar
    Nv61,
    /// YCrCb 4:2:2 planar
    Yv16,
    /// YCrCb 4:2:0 semi-planar
    Nv21,
    /// YCrCb 4:2:0 planar
    Yv12,
}

impl Format {
    pub const ALL: [Format; 16] = [
        Format::Rgba8888,
        Format::Rgbx8888,
        Format::Rgb888,
        Format::Bgra8888,
        Format::Rgb565,
        Format::Rgba5551,
        Format::Rgba4444,
        Format::Bgr888,
        Format::Nv16,
        Format::I422,
        Format::Nv12,
        Format::I420,
        Format::Nv61,
        Format::Yv16,
        Format::Nv21,
        Format::Yv12,
    ];

    /// The `RK_FORMAT_*` value passed in descriptors.
    pub const fn raw(&self) -> c_int {
        match self {
            Format::Rgba8888 => RK_FORMAT_RGBA_8888,
            Format::Rgbx8888 => RK_FORMAT_RGBX_8888,
            Format::Rgb888 => RK_FORMAT_RGB_888,
            Format::Bgra8888 => RK_FORMAT_BGRA_8888,
            Format::Rgb565 => RK_FORMAT_RGB_565,
            Format::Rgba5551 => RK_FORMAT_RGBA_5551,
            Format::Rgba4444 => RK_FORMAT_RGBA_4444,
            Format::Bgr888 => RK_FORMAT_BGR_888,
            Format::Nv16 => RK_FORMAT_YCbCr_422_SP,
            Format::I422 => RK_FORMAT_YCbCr_422_P,
            Format::Nv12 => RK_FORMAT_YCbCr_420_SP,
            Format::I420 => RK_FORMAT_YCbCr_420_P,
            Format::Nv61 => RK_FORMAT_YCrCb_422_SP,
            Format::Yv16 => RK_FORMAT_YCrCb_422_P,
            Format::Nv21 => RK_FORMAT_YCrCb_420_SP,
            Format::Yv12 => RK_FORMAT_YCrCb_420_P,
        }
    }

    pub fn from_raw(raw: c_int) -> Option<Self> {
        Self::ALL.into_iter().find(|fmt| fmt.raw() == raw)
    }

    pub const fn bits_per_pixel(&self) -> usize {
        match self {
            Format::Rgba8888 | Format::Rgbx8888 | Format::Bgra8888 => 32,
            Format::Rgb888 | Format::Bgr888 => 24,
            Format::Rgb565 | Format::Rgba5551 | Format::Rgba4444 => 16,
            Format::Nv16 | Format::I422 | Format::Nv61 | Format::Yv16 => 16,
            Format::Nv12 | Format::I420 | Format::Nv21 | Format::Yv12 => 12,
        }
    }

    pub const fn is_yuv(&self) -> bool {
        !matches!(
            self,
            Format::Rgba8888
                | Format::Rgbx8888
                | Format::Rgb888
                | Format::Bgra8888
                | Format::Rgb565
                | Format::Rgba5551
                | Format::Rgba4444
                | Format::Bgr888
        )
    }

    /// 4:2:0 formats subsample chroma vertically as well as horizontally.
    pub const fn is_yuv420(&self) -> bool {
        matches!(
            self,
            Format::Nv12 | Format::I420 | Format::Nv21 | Format::Yv12
        )
    }

    /// Bytes occupied by an image with the given strides.
    pub const fn buffer_size(&self, wstride: u32, hstride: u32) -> usize {
        wstride as usize * hstride as usize * self.bits_per_pixel() / 8
    }

    /// Bytes per row of the luma or packed plane.
    pub const fn row_bytes(&self, wstride: u32) -> usize {
        if self.is_yuv() {
            wstride as usize
        } else {
            wstride as usize * self.bits_per_pixel() / 8
        }
    }

    /// Checks that the dimensions suit the chroma subsampling of the format.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), String> {
        if width == 0 || height == 0 {
            return Err(format!("{self} image must not be empty ({width}x{height})"));
        }
        if self.is_yuv() && width % 2 != 0 {
            return Err(format!("{self} requires an even width, got {width}"));
        }
        if self.is_yuv420() && height % 2 != 0 {
            return Err(format!("{self} requires an even height, got {height}"));
        }
        Ok(())
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Format::Rgba8888 => "RGBA8888",
            Format::Rgbx8888 => "RGBX8888",
            Format::Rgb888 => "RGB888",
            Format::Bgra8888 => "BGRA8888",
            Format::Rgb565 => "RGB565",
            Format::Rgba5551 => "RGBA5551",
            Format::Rgba4444 => "RGBA4444",
            Format::Bgr888 => "BGR888",
            Format::Nv16 => "NV16",
            Format::I422 => "I422",
            Format::Nv12 => "NV12",
            Format::I420 => "I420",
            Format::Nv61 => "NV61",
            Format::Yv16 => "YV16",
            Format::Nv21 => "NV21",
            Format::Yv12 => "YV12",
        };
        f.write_str(name)
    }
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|fmt| fmt.to_string().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown pixel format '{s}'"))
    }
}

/// Rectangle specification for crop, fill and translate operations.
///
/// An empty rectangle stands for the whole image when handed to the RGA.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    /// X coordinate of top-left corner
    pub x: i32,
    /// Y coordinate of top-left corner
    pub y: i32,
    /// Width of the rectangle in pixels
    pub width: i32,
    /// Height of the rectangle in pixels
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// True when the rectangle is non-empty and lies inside a
    /// `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        !self.is_empty()
            && self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.width as i64 <= width as i64
            && self.y as i64 + self.height as i64 <= height as i64
    }
}

impl From<Rect> for im_rect {
    fn from(r: Rect) -> Self {
        im_rect {
            x: r.x,
            y: r.y,
            width: r.width,
            height: r.height,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{} {}x{}", self.x, self.y, self.width, self.height)
    }
}

/// DMA-backed image buffer for zero-copy RGA operations.
///
/// `Image` represents an image buffer allocated from a DMA heap.  The RGA
/// reads and writes it through its file descriptor; the CPU reaches it
/// through a cache-synchronized dma-buf mapping.  The buffer is freed when
/// the `Image` is dropped.
///
/// RGA2 cores can only address the first 4GB of memory, so the CMA heap is
/// the safe default.  RGA3 cores sit behind an IOMMU and accept any heap.
///
/// # Example
///
/// ```no_run
/// use edgefirst_rga::image::{Format, Image};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let img = Image::new(1920, 1080, Format::Nv12)?;
///
/// assert_eq!(img.width(), 1920);
/// assert_eq!(img.height(), 1080);
/// assert_eq!(img.size(), 3110400);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Image {
    fd: OwnedFd,
    width: u32,
    height: u32,
    format: Format,
}

impl Image {
    /// Allocates a new image from the CMA heap.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The dimensions do not suit the format
    /// - DMA heap allocation fails (out of memory)
    /// - The DMA heap device is not accessible
    pub fn new(width: u32, height: u32, format: Format) -> Result<Self, Box<dyn Error>> {
        Self::new_in(HeapKind::Cma, width, height, format)
    }

    /// Allocates a new image from the given DMA heap.
    pub fn new_in(
        heap: HeapKind,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<Self, Box<dyn Error>> {
        format.check_dimensions(width, height)?;
        let heap = Heap::new(heap)?;
        let fd = heap.allocate(format.buffer_size(width, height))?;
        debug!("DMA image {}x{} {} alloc'd", width, height, format);
        Ok(Self {
            fd,
            width,
            height,
            format,
        })
    }

    pub fn fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }

    pub fn dmabuf(&self) -> io::Result<DmaBuf> {
        Ok(DmaBuf::from(self.fd.try_clone()?))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn size(&self) -> usize {
        self.format.buffer_size(self.width, self.height)
    }

    /// Copies `pixels` into the buffer through a CPU mapping.
    pub fn upload(&self, pixels: &[u8]) -> Result<(), Box<dyn Error>> {
        if pixels.len() < self.size() {
            return Err(Box::new(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} bytes provided for a {} byte image", pixels.len(), self.size()),
            )));
        }
        let size = self.size();
        let mut mem = self.dmabuf()?.memory_map()?;
        mem.write(
            |buf: &mut [u8], _: Option<()>| {
                let len = size.min(buf.len());
                buf[..len].copy_from_slice(&pixels[..len]);
                Ok(())
            },
            None,
        )?;
        Ok(())
    }

    /// Writes an NV21 camera frame into this image, which must have been
    /// allocated as [`Format::Nv21`] with the frame's dimensions.
    pub fn upload_nv21(&self, nv21: &[u8]) -> Result<(), Box<dyn Error>> {
        if self.format != Format::Nv21 {
            return Err(Box::from(format!(
                "cannot load NV21 data into a {} image",
                self.format
            )));
        }
        if nv21.len() != self.size() {
            return Err(Box::from(format!(
                "{} bytes of NV21 data for a {}x{} image of {} bytes",
                nv21.len(),
                self.width,
                self.height,
                self.size()
            )));
        }
        self.upload(nv21)
    }

    /// Copies the buffer contents out through a CPU mapping.
    pub fn download(&self) -> Result<Vec<u8>, Box<dyn Error>> {
        let size = self.size();
        let mem = self.dmabuf()?.memory_map()?;
        let pixels = mem.read(
            |buf: &[u8], _: Option<()>| Ok(buf[..size.min(buf.len())].to_vec()),
            None,
        )?;
        Ok(pixels)
    }

    /// Encodes the buffer contents as JPEG.
    pub fn encode_jpeg(&self) -> Result<OwnedBuf, Box<dyn Error>> {
        let mem = self.dmabuf()?.memory_map()?;
        let jpeg = mem.read(
            |buf: &[u8], img: Option<&Image>| match img {
                Some(img) => encode_jpeg(buf, img.width(), img.height(), img.format()),
                None => Err(Box::from("no image provided")),
            },
            Some(self),
        )?;
        Ok(jpeg)
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}x{} {} fd:{:?}",
            self.width, self.height, self.format, self.fd
        )
    }
}

/// Encodes packed RGB pixels to JPEG using turbojpeg.
///
/// Only the packed 24 and 32-bit formats can be encoded directly; YUV and
/// 16-bit results should be converted to RGBA with the RGA first.
///
/// # Errors
///
/// Returns an error if:
/// - The format has no turbojpeg equivalent
/// - The pixel data is smaller than the image
/// - JPEG compression fails
pub fn encode_jpeg(
    pix: &[u8],
    width: u32,
    height: u32,
    format: Format,
) -> Result<OwnedBuf, Box<dyn Error>> {
    let pixel_format = match format {
        Format::Rgba8888 => turbojpeg::PixelFormat::RGBA,
        Format::Rgbx8888 => turbojpeg::PixelFormat::RGBX,
        Format::Bgra8888 => turbojpeg::PixelFormat::BGRA,
        Format::Rgb888 => turbojpeg::PixelFormat::RGB,
        Format::Bgr888 => turbojpeg::PixelFormat::BGR,
        other => {
            return Err(Box::new(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("cannot encode {other} as JPEG"),
            )));
        }
    };

    let pitch = format.row_bytes(width);
    if pix.len() < pitch * height as usize {
        return Err(Box::new(io::Error::new(
            io::ErrorKind::InvalidInput,
            "pixel buffer smaller than image",
        )));
    }

    let img = turbojpeg::Image {
        width: width as usize,
        height: height as usize,
        format: pixel_format,
        pixels: pix,
        pitch,
    };

    let res = turbojpeg::compress(img, 95, turbojpeg::Subsamp::Sub2x2);
    match res {
        Ok(buf) => Ok(buf),
        Err(e) => Err(Box::new(e)),
    }
}
