// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Marshalling of image memory into `rga_buffer_t` descriptors.
//!
//! A [`Buffer`] borrows the memory it describes for its whole lifetime so
//! the descriptor can never outlive the pixels handed to the hardware.

use crate::{
    error::{Error, Result},
    image::{Format, Image},
    rga::ImageManager,
};
use rga_sys::{im_handle_param_t, rga_buffer_handle_t, rga_buffer_t};
use std::{
    ffi::c_void,
    fmt, io,
    marker::PhantomData,
    os::fd::{AsRawFd, BorrowedFd},
};
use tracing::{debug, warn};

/// Where the pixels of a [`Buffer`] live, and how many bytes are there.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Memory {
    /// dma-buf file descriptor
    Fd { len: usize },
    /// Process virtual address
    Virtual { len: usize },
    /// Handle imported with `importbuffer_fd`
    Handle { len: usize },
}

impl Memory {
    /// Bytes available behind the descriptor.
    pub fn size(&self) -> usize {
        match *self {
            Memory::Fd { len } | Memory::Virtual { len } | Memory::Handle { len } => len,
        }
    }
}

/// Image descriptor handed to the RGA.
pub struct Buffer<'a> {
    raw: rga_buffer_t,
    memory: Memory,
    writable: bool,
    _borrow: PhantomData<&'a [u8]>,
}

impl<'a> Buffer<'a> {
    fn new(memory: Memory, width: u32, height: u32, format: Format) -> Result<Self> {
        format.check_dimensions(width, height).map_err(Error::InvalidParam)?;
        let (width, height) = (to_c_int(width)?, to_c_int(height)?);
        let raw = rga_buffer_t {
            width,
            height,
            wstride: width,
            hstride: height,
            format: format.raw(),
            ..Default::default()
        };
        let buffer = Self {
            raw,
            memory,
            writable: true,
            _borrow: PhantomData,
        };
        buffer.check_len()?;
        Ok(buffer)
    }

    /// Describes a dma-buf.  The RGA may write through any fd descriptor.
    ///
    /// The size of the dma-buf is read once here, and every later format
    /// or stride change is checked against it.
    pub fn from_fd(fd: BorrowedFd<'a>, width: u32, height: u32, format: Format) -> Result<Self> {
        let len = fd_size(fd)?;
        let mut buffer = Self::new(Memory::Fd { len }, width, height, format)?;
        buffer.raw.fd = fd.as_raw_fd();
        Ok(buffer)
    }

    /// Describes host memory the RGA will only read from.
    pub fn from_slice(data: &'a [u8], width: u32, height: u32, format: Format) -> Result<Self> {
        let mut buffer = Self::new(Memory::Virtual { len: data.len() }, width, height, format)?;
        buffer.raw.vir_addr = data.as_ptr() as *mut c_void;
        buffer.writable = false;
        Ok(buffer)
    }

    /// Describes host memory the RGA may write to.
    pub fn from_slice_mut(
        data: &'a mut [u8],
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<Self> {
        let mut buffer = Self::new(Memory::Virtual { len: data.len() }, width, height, format)?;
        buffer.raw.vir_addr = data.as_mut_ptr() as *mut c_void;
        Ok(buffer)
    }

    /// Describes an NV21 (YCrCb 4:2:0 semi-planar) frame in host memory,
    /// the layout camera preview callbacks deliver.
    pub fn from_nv21(data: &'a [u8], width: u32, height: u32) -> Result<Self> {
        Self::from_slice(data, width, height, Format::Nv21)
    }

    /// Describes a buffer previously imported into the driver.
    pub fn from_handle(imported: &'a ImportedBuffer<'_>) -> Result<Self> {
        let mut buffer = Self::new(
            Memory::Handle { len: imported.len },
            imported.width,
            imported.height,
            imported.format,
        )?;
        buffer.raw.handle = imported.handle;
        Ok(buffer)
    }

    /// Sets row and column strides in pixels.
    pub fn with_stride(mut self, wstride: u32, hstride: u32) -> Result<Self> {
        if wstride < self.width() || hstride < self.height() {
            return Err(Error::invalid(format!(
                "stride {}x{} smaller than image {}x{}",
                wstride,
                hstride,
                self.width(),
                self.height()
            )));
        }
        if self.format().is_yuv() && wstride % 2 != 0 {
            return Err(Error::invalid(format!(
                "{} requires an even stride, got {}",
                self.format(),
                wstride
            )));
        }
        self.raw.wstride = to_c_int(wstride)?;
        self.raw.hstride = to_c_int(hstride)?;
        self.check_len()?;
        Ok(self)
    }

    /// Plane alpha applied when blending, 0xff is opaque.
    pub fn with_global_alpha(mut self, alpha: u8) -> Self {
        self.raw.global_alpha = alpha as i32;
        self
    }

    /// A copy of this descriptor retyped to `format`, as used by color
    /// conversion.  The memory is re-checked against the new size.
    pub fn reformatted(&self, format: Format) -> Result<Buffer<'a>> {
        format
            .check_dimensions(self.width(), self.height())
            .map_err(Error::InvalidParam)?;
        let mut raw = self.raw;
        raw.format = format.raw();
        let buffer = Buffer {
            raw,
            memory: self.memory,
            writable: self.writable,
            _borrow: PhantomData,
        };
        buffer.check_len()?;
        Ok(buffer)
    }

    fn check_len(&self) -> Result<()> {
        check_size(
            self.memory.size(),
            self.wstride(),
            self.hstride(),
            self.format(),
        )
    }

    pub fn width(&self) -> u32 {
        self.raw.width as u32
    }

    pub fn height(&self) -> u32 {
        self.raw.height as u32
    }

    pub fn wstride(&self) -> u32 {
        self.raw.wstride as u32
    }

    pub fn hstride(&self) -> u32 {
        self.raw.hstride as u32
    }

    pub fn format(&self) -> Format {
        // Only constructed from a `Format`, see `Buffer::new`.
        Format::from_raw(self.raw.format).unwrap_or(Format::Rgba8888)
    }

    pub fn memory(&self) -> Memory {
        self.memory
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn raw(&self) -> rga_buffer_t {
        self.raw
    }
}

impl Buffer<'static> {
    /// Descriptor with no memory, the source of a color fill.
    pub(crate) fn empty() -> Self {
        Buffer {
            raw: rga_buffer_t::default(),
            memory: Memory::Fd { len: 0 },
            writable: false,
            _borrow: PhantomData,
        }
    }
}

impl<'a> TryFrom<&'a Image> for Buffer<'a> {
    type Error = Error;

    fn try_from(img: &'a Image) -> Result<Self> {
        Buffer::from_fd(img.fd(), img.width(), img.height(), img.format())
    }
}

impl fmt::Debug for Buffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("width", &self.raw.width)
            .field("height", &self.raw.height)
            .field("wstride", &self.raw.wstride)
            .field("hstride", &self.raw.hstride)
            .field("format", &self.format())
            .field("memory", &self.memory)
            .field("writable", &self.writable)
            .finish()
    }
}

fn to_c_int(value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::invalid(format!("dimension {value} out of range")))
}

fn check_size(len: usize, wstride: u32, hstride: u32, format: Format) -> Result<()> {
    let required = format.buffer_size(wstride, hstride);
    if len < required {
        return Err(Error::invalid(format!(
            "{len} byte buffer too small for {wstride}x{hstride} {format} (needs {required} bytes)"
        )));
    }
    Ok(())
}

/// Size of the buffer behind `fd`.  dma-bufs report it through
/// `lseek(SEEK_END)`.
fn fd_size(fd: BorrowedFd<'_>) -> Result<usize> {
    let end = unsafe { libc::lseek(fd.as_raw_fd(), 0, libc::SEEK_END) };
    if end < 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    unsafe { libc::lseek(fd.as_raw_fd(), 0, libc::SEEK_SET) };
    usize::try_from(end).map_err(|_| Error::invalid(format!("buffer size {end} out of range")))
}

/// dma-buf imported into the RGA driver's buffer table.
///
/// Importing once and reusing the handle avoids the per-call mapping cost
/// of fd descriptors.  The handle is released when dropped.
pub struct ImportedBuffer<'a> {
    handle: rga_buffer_handle_t,
    len: usize,
    width: u32,
    height: u32,
    format: Format,
    imgmgr: &'a ImageManager,
    _fd: PhantomData<BorrowedFd<'a>>,
}

impl<'a> ImportedBuffer<'a> {
    pub(crate) fn import(
        imgmgr: &'a ImageManager,
        fd: BorrowedFd<'a>,
        width: u32,
        height: u32,
        format: Format,
    ) -> Result<Self> {
        format.check_dimensions(width, height).map_err(Error::InvalidParam)?;
        let len = fd_size(fd)?;
        check_size(len, width, height, format)?;
        let mut param = im_handle_param_t {
            width,
            height,
            format: format.raw() as u32,
        };
        let handle = unsafe { imgmgr.lib().importbuffer_fd(fd.as_raw_fd(), &mut param) }
            .ok_or(Error::Unsupported {
                feature: "buffer import",
                required: crate::rga::JOB_API_VERSION,
            })?;
        if handle <= 0 {
            return Err(imgmgr.status_error("importbuffer_fd", rga_sys::IM_STATUS_FAILED));
        }
        debug!("RGA buffer handle {} imported", handle);
        Ok(Self {
            handle,
            len,
            width,
            height,
            format,
            imgmgr,
            _fd: PhantomData,
        })
    }

    pub fn handle(&self) -> rga_buffer_handle_t {
        self.handle
    }

    pub fn buffer(&self) -> Result<Buffer<'_>> {
        Buffer::from_handle(self)
    }
}

impl Drop for ImportedBuffer<'_> {
    fn drop(&mut self) {
        let status = unsafe { self.imgmgr.lib().releasebuffer_handle(self.handle) };
        match status {
            Some(status) if crate::error::Status::from_raw(status).is_ok() => {
                debug!("RGA buffer handle {} released", self.handle)
            }
            other => warn!("release of RGA buffer handle {} failed: {:?}", self.handle, other),
        }
    }
}
