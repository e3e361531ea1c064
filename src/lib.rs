// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! # EdgeFirst RGA Library
//!
//! Safe access to the Rockchip RGA 2D accelerator through the vendor's
//! `librga` im2d API, plus the functional test harness used to validate the
//! accelerator on a target.
//!
//! ## Features
//!
//! - **Runtime Loading**: `librga.so` is opened with `libloading`, so the
//!   same binary runs against any vendor release and reports missing
//!   features instead of failing to link.
//! - **Image Operations**: copy, resize, crop, rotate, flip, translate,
//!   blend, composite, color conversion and color fill, each submitted
//!   synchronously.
//! - **Jobs**: batch several operations into one submission, optionally
//!   waiting on a release fence.
//! - **Camera Frames**: NV21 sources converted to RGBA8888 and cropped into
//!   new RGBA8888 images.
//! - **Bounds Checks**: every descriptor is checked against the size of the
//!   memory behind it, dma-bufs included.
//! - **DMA Buffers**: images allocated from the CMA or system DMA heaps and
//!   mapped for CPU access with cache synchronization.
//!
//! ## Example
//!
//! ```no_run
//! use edgefirst_rga::{
//!     buffer::Buffer,
//!     image::{Format, Image, Rect},
//!     pattern::{test_pattern, Color},
//!     rga::ImageManager,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let imgmgr = ImageManager::new()?;
//!
//! let src = Image::new(400, 400, Format::Rgba8888)?;
//! src.upload(&test_pattern(400, 400))?;
//! let dst = Image::new(400, 400, Format::Bgra8888)?;
//!
//! let mut dst_buf = Buffer::try_from(&dst)?;
//! imgmgr.copy(&Buffer::try_from(&src)?, &mut dst_buf)?;
//! imgmgr.fill(&mut dst_buf, Rect::new(50, 50, 100, 100), Color::BLUE.packed())?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Platform Requirements
//!
//! - **Linux**: Rockchip kernel with the `rga` or `rga_multi` driver and DMA
//!   heap support
//! - **librga**: 1.9.0 or newer for jobs and buffer import; older releases
//!   support the single operations only
//!
//! ## Safety
//!
//! The FFI layer lives in the `rga-sys` crate.  Descriptors built here
//! borrow the memory they point to, so the hardware is never handed a
//! buffer that has already been freed.  Jobs and the fences of
//! asynchronous submissions keep those borrows until the hardware is done.

pub mod buffer;
pub mod error;
pub mod harness;
pub mod image;
pub mod job;
pub mod pattern;
pub mod rga;
