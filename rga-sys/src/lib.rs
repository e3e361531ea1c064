// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Low-level bindings for the Rockchip RGA "im2d" C API.
//!
//! The library is loaded at runtime (see [`rga::new`]) so that binaries can
//! be built and started on hosts without `librga.so`.  Structures mirror the
//! vendor headers and are passed by value across the boundary exactly as the
//! C API expects.

#![allow(non_camel_case_types, non_snake_case, non_upper_case_globals)]

mod bindings;

use std::{
    ffi::{c_int, c_void, CStr},
    fmt,
    ptr::null_mut,
};

pub use bindings::rga;
pub use libloading::Error as LoadError;

pub type IM_STATUS = c_int;
pub type IM_CONFIG_NAME = c_int;
pub type IM_INFORMATION = c_int;
pub type im_job_handle_t = u32;
pub type rga_buffer_handle_t = c_int;

pub const IM_STATUS_NOERROR: IM_STATUS = 2;
pub const IM_STATUS_SUCCESS: IM_STATUS = 1;
pub const IM_STATUS_FAILED: IM_STATUS = 0;
pub const IM_STATUS_NOT_SUPPORTED: IM_STATUS = -1;
pub const IM_STATUS_OUT_OF_MEMORY: IM_STATUS = -2;
pub const IM_STATUS_INVALID_PARAM: IM_STATUS = -3;
pub const IM_STATUS_ILLEGAL_PARAM: IM_STATUS = -4;
pub const IM_STATUS_ERROR_VERSION: IM_STATUS = -5;
pub const IM_STATUS_NO_SESSION: IM_STATUS = -6;

pub const IM_HAL_TRANSFORM_ROT_90: c_int = 1 << 0;
pub const IM_HAL_TRANSFORM_ROT_180: c_int = 1 << 1;
pub const IM_HAL_TRANSFORM_ROT_270: c_int = 1 << 2;
pub const IM_HAL_TRANSFORM_FLIP_H: c_int = 1 << 3;
pub const IM_HAL_TRANSFORM_FLIP_V: c_int = 1 << 4;
pub const IM_HAL_TRANSFORM_FLIP_H_V: c_int = 1 << 5;
pub const IM_HAL_TRANSFORM_MASK: c_int = 0x3f;

pub const IM_ALPHA_BLEND_SRC_OVER: c_int = 1 << 6;
pub const IM_ALPHA_BLEND_SRC: c_int = 1 << 7;
pub const IM_ALPHA_BLEND_DST: c_int = 1 << 8;
pub const IM_ALPHA_BLEND_SRC_IN: c_int = 1 << 9;
pub const IM_ALPHA_BLEND_DST_IN: c_int = 1 << 10;
pub const IM_ALPHA_BLEND_SRC_OUT: c_int = 1 << 11;
pub const IM_ALPHA_BLEND_DST_OUT: c_int = 1 << 12;
pub const IM_ALPHA_BLEND_DST_OVER: c_int = 1 << 13;
pub const IM_ALPHA_BLEND_SRC_ATOP: c_int = 1 << 14;
pub const IM_ALPHA_BLEND_DST_ATOP: c_int = 1 << 15;
pub const IM_ALPHA_BLEND_XOR: c_int = 1 << 16;
pub const IM_ALPHA_BLEND_MASK: c_int = 0x1ffc0;

pub const IM_SYNC: c_int = 1 << 19;
pub const IM_COLOR_FILL: c_int = 1 << 21;
pub const IM_ASYNC: c_int = 1 << 26;

pub const IM_CONFIG_SCHEDULER_CORE: IM_CONFIG_NAME = 0;
pub const IM_CONFIG_PRIORITY: IM_CONFIG_NAME = 1;
pub const IM_CONFIG_CHECK: IM_CONFIG_NAME = 2;

pub const IM_SCHEDULER_DEFAULT: u32 = 0;
pub const IM_SCHEDULER_RGA3_CORE0: u32 = 1 << 0;
pub const IM_SCHEDULER_RGA3_CORE1: u32 = 1 << 1;
pub const IM_SCHEDULER_RGA2_CORE0: u32 = 1 << 2;
pub const IM_SCHEDULER_RGA2_CORE1: u32 = 1 << 3;

pub const RGA_VENDOR: IM_INFORMATION = 0;
pub const RGA_VERSION: IM_INFORMATION = 1;
pub const RGA_MAX_INPUT: IM_INFORMATION = 2;
pub const RGA_MAX_OUTPUT: IM_INFORMATION = 3;
pub const RGA_BYTE_STRIDE: IM_INFORMATION = 4;
pub const RGA_SCALE_LIMIT: IM_INFORMATION = 5;
pub const RGA_INPUT_FORMAT: IM_INFORMATION = 6;
pub const RGA_OUTPUT_FORMAT: IM_INFORMATION = 7;
pub const RGA_FEATURE: IM_INFORMATION = 8;
pub const RGA_EXPECTED: IM_INFORMATION = 9;
pub const RGA_ALL: IM_INFORMATION = 10;

pub const IM_INTERP_DEFAULT: c_int = 0;
pub const IM_INTERP_LINEAR: c_int = 1;
pub const IM_INTERP_CUBIC: c_int = 2;

pub const RK_FORMAT_RGBA_8888: c_int = 0x0 << 8;
pub const RK_FORMAT_RGBX_8888: c_int = 0x1 << 8;
pub const RK_FORMAT_RGB_888: c_int = 0x2 << 8;
pub const RK_FORMAT_BGRA_8888: c_int = 0x3 << 8;
pub const RK_FORMAT_RGB_565: c_int = 0x4 << 8;
pub const RK_FORMAT_RGBA_5551: c_int = 0x5 << 8;
pub const RK_FORMAT_RGBA_4444: c_int = 0x6 << 8;
pub const RK_FORMAT_BGR_888: c_int = 0x7 << 8;
pub const RK_FORMAT_YCbCr_422_SP: c_int = 0x8 << 8;
pub const RK_FORMAT_YCbCr_422_P: c_int = 0x9 << 8;
pub const RK_FORMAT_YCbCr_420_SP: c_int = 0xa << 8;
pub const RK_FORMAT_YCbCr_420_P: c_int = 0xb << 8;
pub const RK_FORMAT_YCrCb_422_SP: c_int = 0xc << 8;
pub const RK_FORMAT_YCrCb_422_P: c_int = 0xd << 8;
pub const RK_FORMAT_YCrCb_420_SP: c_int = 0xe << 8;
pub const RK_FORMAT_YCrCb_420_P: c_int = 0xf << 8;

pub const RGA_API_MAJOR_VERSION: u32 = 1;
pub const RGA_API_MINOR_VERSION: u32 = 10;
pub const RGA_API_REVISION_VERSION: u32 = 1;
pub const RGA_API_BUILD_VERSION: u32 = 0;

/// Header version the option structures below were written against, encoded
/// the way `im_opt_t::version` expects it.
pub const RGA_CURRENT_API_HEADER_VERSION: c_int = ((RGA_API_MAJOR_VERSION & 0xff) << 24
    | (RGA_API_MINOR_VERSION & 0xff) << 16
    | (RGA_API_REVISION_VERSION & 0xff) << 8
    | (RGA_API_BUILD_VERSION & 0xff)) as c_int;

/// Size of the opaque tail of `im_opt_t` (OSD, pre-interpolation and
/// reserved members).  Larger than any released header; the library only
/// reads the members its version knows about.
pub const IM_OPT_TAIL_SIZE: usize = 1024;

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct im_rect {
    pub x: c_int,
    pub y: c_int,
    pub width: c_int,
    pub height: c_int,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct im_colorkey_range {
    pub max: c_int,
    pub min: c_int,
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct im_nn_t {
    pub scale_r: c_int,
    pub scale_g: c_int,
    pub scale_b: c_int,
    pub offset_r: c_int,
    pub offset_g: c_int,
    pub offset_b: c_int,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct rga_buffer_t {
    pub vir_addr: *mut c_void,
    pub phy_addr: *mut c_void,
    pub fd: c_int,
    pub width: c_int,
    pub height: c_int,
    pub wstride: c_int,
    pub hstride: c_int,
    pub format: c_int,
    pub color_space_mode: c_int,
    pub global_alpha: c_int,
    pub rd_mode: c_int,
    pub color: c_int,
    pub colorkey_range: im_colorkey_range,
    pub nn: im_nn_t,
    pub rop_code: c_int,
    pub handle: rga_buffer_handle_t,
}

impl Default for rga_buffer_t {
    fn default() -> Self {
        Self {
            vir_addr: null_mut(),
            phy_addr: null_mut(),
            fd: 0,
            width: 0,
            height: 0,
            wstride: 0,
            hstride: 0,
            format: 0,
            color_space_mode: 0,
            global_alpha: 0,
            rd_mode: 0,
            color: 0,
            colorkey_range: im_colorkey_range::default(),
            nn: im_nn_t::default(),
            rop_code: 0,
            handle: 0,
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone)]
pub struct im_opt_t {
    pub version: c_int,
    pub color: c_int,
    pub colorkey_range: im_colorkey_range,
    pub nn: im_nn_t,
    pub rop_code: c_int,
    pub priority: c_int,
    pub core: c_int,
    pub mosaic_mode: c_int,
    pub tail: [u8; IM_OPT_TAIL_SIZE],
}

impl Default for im_opt_t {
    fn default() -> Self {
        Self {
            version: RGA_CURRENT_API_HEADER_VERSION,
            color: 0,
            colorkey_range: im_colorkey_range::default(),
            nn: im_nn_t::default(),
            rop_code: 0,
            priority: 0,
            core: 0,
            mosaic_mode: 0,
            tail: [0; IM_OPT_TAIL_SIZE],
        }
    }
}

impl fmt::Debug for im_opt_t {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("im_opt_t")
            .field("version", &format_args!("{:#010x}", self.version))
            .field("color", &format_args!("{:#010x}", self.color))
            .field("priority", &self.priority)
            .field("core", &self.core)
            .finish_non_exhaustive()
    }
}

#[repr(C)]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct im_handle_param_t {
    pub width: u32,
    pub height: u32,
    pub format: u32,
}

/// librga API version as reported by `querystring(RGA_VERSION)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub num: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            num: (major & 0xff) << 16 | (minor & 0xff) << 8 | (patch & 0xff),
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Parses the API version out of the text returned by
/// `querystring(RGA_VERSION)`, e.g. `"RGA_api version : v1.10.1_[0]"`.
pub fn parse_version(text: &str) -> Option<Version> {
    let line = text
        .lines()
        .find(|line| line.to_ascii_lowercase().contains("api version"))?;
    let (_, value) = line.split_once(':')?;
    let value = value.trim().trim_start_matches(['v', 'V']);
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(value.len());

    let mut parts = value[..end].split('.').map(str::parse::<u32>);
    let major = parts.next()?.ok()?;
    let minor = parts.next()?.ok()?;
    let patch = parts.next().and_then(Result::ok).unwrap_or(0);
    Some(Version::new(major, minor, patch))
}

/// Queries the loaded library for its API version.
pub fn guess_version(lib: &rga) -> Option<Version> {
    let ptr = unsafe { lib.querystring(RGA_VERSION) };
    if ptr.is_null() {
        return None;
    }
    let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy();
    parse_version(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_parse_version() {
        let text = "RGA_api version       : v1.10.1_[0]\nRGA_driver version    : 1.3.1\n";
        let version = parse_version(text).unwrap();
        assert_eq!(version, Version::new(1, 10, 1));
        assert_eq!(version.to_string(), "1.10.1");

        assert_eq!(
            parse_version("rga_api version: 1.9"),
            Some(Version::new(1, 9, 0))
        );
        assert_eq!(parse_version("vendor: Rockchip"), None);
        assert_eq!(parse_version("RGA_api version : unknown"), None);
    }

    #[test]
    fn test_version_order() {
        assert!(Version::new(1, 10, 1) > Version::new(1, 9, 0));
        assert!(Version::new(1, 9, 0) > Version::new(1, 8, 5));
        assert!(Version::new(2, 0, 0) > Version::new(1, 10, 1));
    }

    #[test]
    fn test_layout() {
        assert_eq!(size_of::<im_rect>(), 16);
        assert_eq!(offset_of!(im_opt_t, core), 48);
        assert_eq!(offset_of!(rga_buffer_t, fd), 2 * size_of::<*mut c_void>());
        assert_eq!(
            size_of::<rga_buffer_t>() - offset_of!(rga_buffer_t, handle),
            size_of::<c_int>()
        );
    }

    #[test]
    fn test_header_version() {
        assert_eq!(RGA_CURRENT_API_HEADER_VERSION, 0x010a_0100);
        assert_eq!(im_opt_t::default().version, RGA_CURRENT_API_HEADER_VERSION);
    }
}
