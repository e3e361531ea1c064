// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! These tests drive real RGA hardware and need librga plus access to the
//! DMA heaps.  Run them on a Rockchip target with `cargo test -- --ignored`.

use edgefirst_rga::{
    buffer::Buffer,
    error::Error as RgaError,
    harness::{Harness, MemoryKind, Settings, TestCase},
    image::{Format, Image, Rect},
    pattern::{solid, test_pattern, to_nv21, Color, GRID},
    rga::{BlendMode, Config, Flip, ImageManager, Info, Rotation},
};
use serial_test::serial;
use std::{error::Error, time::Duration};

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_info() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    println!("librga {}", imgmgr.version());
    let info = imgmgr.query(Info::All)?;
    println!("{info}");
    assert!(!info.is_empty());
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_copy_dma() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let pattern = test_pattern(640, 480);
    let src = Image::new(640, 480, Format::Rgba8888)?;
    src.upload(&pattern)?;
    let dst = Image::new(640, 480, Format::Rgba8888)?;

    imgmgr.copy(&Buffer::try_from(&src)?, &mut Buffer::try_from(&dst)?)?;
    assert_eq!(dst.download()?, pattern);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_copy_virtual() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let pattern = test_pattern(320, 240);
    let mut out = vec![0u8; pattern.len()];

    let src = Buffer::from_slice(&pattern, 320, 240, Format::Rgba8888)?;
    imgmgr.copy(&src, &mut Buffer::from_slice_mut(&mut out, 320, 240, Format::Rgba8888)?)?;
    assert_eq!(out, pattern);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_read_only_destination() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let pattern = test_pattern(64, 64);
    let out = vec![0u8; pattern.len()];

    let src = Buffer::from_slice(&pattern, 64, 64, Format::Rgba8888)?;
    let mut dst = Buffer::from_slice(&out, 64, 64, Format::Rgba8888)?;
    let err = imgmgr.copy(&src, &mut dst).unwrap_err();
    assert!(matches!(err, RgaError::ReadOnly));
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_rotate_and_back() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let pattern = test_pattern(320, 240);
    let mut rotated = vec![0u8; pattern.len()];
    let mut restored = vec![0u8; pattern.len()];

    let src = Buffer::from_slice(&pattern, 320, 240, Format::Rgba8888)?;
    let mut dst = Buffer::from_slice_mut(&mut rotated, 240, 320, Format::Rgba8888)?;
    imgmgr.rotate(&src, &mut dst, Rotation::Rotate90)?;

    let src = Buffer::from_slice(&rotated, 240, 320, Format::Rgba8888)?;
    let mut dst = Buffer::from_slice_mut(&mut restored, 320, 240, Format::Rgba8888)?;
    imgmgr.rotate(&src, &mut dst, Rotation::Rotate270)?;
    assert_eq!(restored, pattern);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_fill() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let mut out = solid(128, 128, Color::WHITE);
    {
        let mut dst = Buffer::from_slice_mut(&mut out, 128, 128, Format::Rgba8888)?;
        imgmgr.fill(&mut dst, Rect::new(0, 0, 128, 128), Color::MAGENTA.packed())?;
    }
    assert_eq!(out, solid(128, 128, Color::MAGENTA));
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_fill_outside_image() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let mut out = solid(64, 64, Color::WHITE);
    let mut dst = Buffer::from_slice_mut(&mut out, 64, 64, Format::Rgba8888)?;
    let err = imgmgr
        .fill(&mut dst, Rect::new(50, 50, 100, 100), Color::RED.packed())
        .unwrap_err();
    assert!(matches!(err, RgaError::InvalidParam(_)));
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_nv12_round_trip() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let src = Image::new(1920, 1080, Format::Rgba8888)?;
    src.upload(&test_pattern(1920, 1080))?;
    let nv12 = Image::new(1920, 1080, Format::Nv12)?;
    let rgba = Image::new(1920, 1080, Format::Rgba8888)?;

    imgmgr.convert_color(
        &Buffer::try_from(&src)?,
        &mut Buffer::try_from(&nv12)?,
        Format::Rgba8888,
        Format::Nv12,
    )?;
    imgmgr.convert_color(
        &Buffer::try_from(&nv12)?,
        &mut Buffer::try_from(&rgba)?,
        Format::Nv12,
        Format::Rgba8888,
    )?;
    assert!(!rgba.encode_jpeg()?.is_empty());
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_job_async() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let pattern = test_pattern(640, 480);
    let src = Image::new(640, 480, Format::Rgba8888)?;
    src.upload(&pattern)?;
    let small = Image::new(320, 240, Format::Rgba8888)?;
    let mirrored = Image::new(640, 480, Format::Rgba8888)?;

    let src_buf = Buffer::try_from(&src)?;
    let mut job = imgmgr.begin_job()?;
    job.resize(&src_buf, &mut Buffer::try_from(&small)?, 0.5, 0.5)?
    .flip(&src_buf, &mut Buffer::try_from(&mirrored)?, Flip::Vertical)?;
    assert_eq!(job.len(), 2);

    let fence = job.submit_async()?;
    fence.wait(Some(Duration::from_secs(1)))?;

    let upside_down: Vec<u8> = pattern.chunks(640 * 4).rev().flatten().copied().collect();
    assert_eq!(mirrored.download()?, upside_down);
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_job_cancel_leaves_target() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let pattern = test_pattern(128, 128);
    let mut out = solid(128, 128, Color::BLACK);
    {
        let src = Buffer::from_slice(&pattern, 128, 128, Format::Rgba8888)?;
        let mut job = imgmgr.begin_job()?;
        job.copy(
            &src,
            &mut Buffer::from_slice_mut(&mut out, 128, 128, Format::Rgba8888)?,
        )?;
        job.cancel()?;
    }
    assert_eq!(out, solid(128, 128, Color::BLACK));
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_imported_buffer() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let src = Image::new(640, 480, Format::Rgba8888)?;
    src.upload(&solid(640, 480, Color::CYAN))?;
    let dst = Image::new(640, 480, Format::Rgba8888)?;

    let imported_src = imgmgr.import_fd(src.fd(), 640, 480, Format::Rgba8888)?;
    let imported_dst = imgmgr.import_fd(dst.fd(), 640, 480, Format::Rgba8888)?;
    imgmgr.copy(&imported_src.buffer()?, &mut imported_dst.buffer()?)?;
    assert_eq!(dst.download()?, solid(640, 480, Color::CYAN));
    Ok(())
}

fn pixel(data: &[u8], width: u32, x: u32, y: u32) -> [u8; 4] {
    let offset = ((y * width + x) * 4) as usize;
    [data[offset], data[offset + 1], data[offset + 2], data[offset + 3]]
}

fn near(actual: [u8; 4], expected: Color, tolerance: u8) -> bool {
    actual[..3]
        .iter()
        .zip(&expected.to_bytes()[..3])
        .all(|(a, e)| a.abs_diff(*e) <= tolerance)
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_resize_factor() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let src = solid(320, 240, Color::GREEN);
    let src = Buffer::from_slice(&src, 320, 240, Format::Rgba8888)?;

    // 0.7 scales 320x240 to 224x168
    let mut out = solid(224, 168, Color::BLACK);
    imgmgr.resize(
        &src,
        &mut Buffer::from_slice_mut(&mut out, 224, 168, Format::Rgba8888)?,
        0.7,
        0.7,
    )?;
    assert_eq!(out, solid(224, 168, Color::GREEN));

    let mut wrong = solid(225, 168, Color::BLACK);
    let err = imgmgr
        .resize(
            &src,
            &mut Buffer::from_slice_mut(&mut wrong, 225, 168, Format::Rgba8888)?,
            0.7,
            0.7,
        )
        .unwrap_err();
    assert!(matches!(err, RgaError::InvalidParam(_)));
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_rescale() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let src = solid(64, 64, Color::BLUE);
    let mut out = solid(128, 128, Color::WHITE);
    imgmgr.rescale(
        &Buffer::from_slice(&src, 64, 64, Format::Rgba8888)?,
        &mut Buffer::from_slice_mut(&mut out, 128, 128, Format::Rgba8888)?,
        0.5,
        0.5,
    )?;
    for y in 0..128 {
        for x in 0..128 {
            let expected = if x < 32 && y < 32 { Color::BLUE } else { Color::WHITE };
            assert_eq!(pixel(&out, 128, x, y), expected.to_bytes(), "pixel {x},{y}");
        }
    }
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_blend_global_alpha() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let fg = solid(64, 64, Color::RED);
    let mut bg = solid(64, 64, Color::WHITE);
    imgmgr.blend(
        &Buffer::from_slice(&fg, 64, 64, Format::Rgba8888)?.with_global_alpha(0x80),
        &mut Buffer::from_slice_mut(&mut bg, 64, 64, Format::Rgba8888)?,
        BlendMode::SrcOver,
    )?;
    // half transparent red over white is pink
    for p in bg.chunks(4) {
        assert!(p[0] >= 0xf0, "{p:02x?}");
        assert!((0x60..=0xa0).contains(&p[1]), "{p:02x?}");
        assert!((0x60..=0xa0).contains(&p[2]), "{p:02x?}");
    }
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_check() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let data = solid(64, 64, Color::GRAY);
    let src = Buffer::from_slice(&data, 64, 64, Format::Rgba8888)?;
    let dst = Buffer::from_slice(&data, 64, 64, Format::Rgba8888)?;

    imgmgr.check(&src, &dst, None, None)?;
    imgmgr.check(&src, &dst, Some(Rect::new(0, 0, 32, 32)), Some(Rect::new(32, 32, 32, 32)))?;
    let err = imgmgr
        .check(&src, &dst, Some(Rect::new(48, 48, 32, 32)), None)
        .unwrap_err();
    assert!(matches!(err, RgaError::Status { .. }), "{err}");
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_configure() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    imgmgr.configure(Config::Check(true))?;
    imgmgr.configure(Config::Priority(3))?;
    let err = imgmgr.configure(Config::Priority(7)).unwrap_err();
    assert!(matches!(err, RgaError::InvalidParam(_)));
    imgmgr.configure(Config::Priority(0))?;
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_job_tasks() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let pattern = test_pattern(128, 128);
    let overlay = solid(128, 128, Color::BLUE);
    let mut cropped = solid(64, 64, Color::BLACK);
    let mut translated = solid(128, 128, Color::WHITE);
    let mut composited = solid(128, 128, Color::BLACK);
    let mut converted = solid(128, 128, Color::BLACK);
    let mut rescaled = solid(128, 128, Color::WHITE);

    let src = Buffer::from_slice(&pattern, 128, 128, Format::Rgba8888)?;
    let overlay = Buffer::from_slice(&overlay, 128, 128, Format::Rgba8888)?;
    let mut job = imgmgr.begin_job()?;
    job.crop(
        &src,
        &mut Buffer::from_slice_mut(&mut cropped, 64, 64, Format::Rgba8888)?,
        Rect::new(32, 32, 64, 64),
    )?
    .translate(
        &src,
        &mut Buffer::from_slice_mut(&mut translated, 128, 128, Format::Rgba8888)?,
        16,
        16,
    )?
    .composite(
        &overlay,
        &src,
        &mut Buffer::from_slice_mut(&mut composited, 128, 128, Format::Rgba8888)?,
        BlendMode::SrcOver,
    )?
    .convert_color(
        &src,
        &mut Buffer::from_slice_mut(&mut converted, 128, 128, Format::Rgba8888)?,
        Format::Rgba8888,
        Format::Bgra8888,
    )?
    .rescale(
        &src,
        &mut Buffer::from_slice_mut(&mut rescaled, 128, 128, Format::Rgba8888)?,
        0.5,
        0.5,
    )?;
    assert_eq!(job.len(), 5);
    job.submit()?;

    let expected: Vec<u8> = pattern
        .chunks(128 * 4)
        .skip(32)
        .take(64)
        .flat_map(|row| row[32 * 4..96 * 4].iter().copied())
        .collect();
    assert_eq!(cropped, expected);

    assert_eq!(pixel(&translated, 128, 0, 0), Color::WHITE.to_bytes());
    assert_eq!(pixel(&translated, 128, 16, 16), pixel(&pattern, 128, 0, 0));
    assert_eq!(pixel(&translated, 128, 127, 127), pixel(&pattern, 128, 111, 111));

    // opaque overlay hides the background entirely
    assert_eq!(composited, solid(128, 128, Color::BLUE));

    let swapped: Vec<u8> = pattern
        .chunks(4)
        .flat_map(|p| [p[2], p[1], p[0], p[3]])
        .collect();
    assert_eq!(converted, swapped);

    assert_eq!(pixel(&rescaled, 128, 64, 64), Color::WHITE.to_bytes());
    assert_eq!(pixel(&rescaled, 128, 127, 0), Color::WHITE.to_bytes());
    assert_ne!(pixel(&rescaled, 128, 21, 21), Color::WHITE.to_bytes());
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_nv21_pipeline() -> Result<(), Box<dyn Error>> {
    let imgmgr = ImageManager::new()?;
    let frame = to_nv21(&test_pattern(300, 300), 300, 300);
    let src = Buffer::from_nv21(&frame, 300, 300)?;

    let mut rgba = vec![0u8; 300 * 300 * 4];
    imgmgr.nv21_to_rgba(
        &src,
        &mut Buffer::from_slice_mut(&mut rgba, 300, 300, Format::Rgba8888)?,
    )?;
    for (i, color) in GRID.iter().enumerate() {
        let (x, y) = (50 + 100 * (i as u32 % 3), 50 + 100 * (i as u32 / 3));
        let p = pixel(&rgba, 300, x, y);
        assert!(near(p, *color, 24), "cell {i} is {p:02x?}, expected {color}");
    }

    let cropped = imgmgr.crop_to_rgba(&src, Rect::new(100, 100, 100, 50))?;
    assert_eq!(cropped.len(), 100 * 50 * 4);
    // the crop sits inside the cyan cell
    assert!(near(pixel(&cropped, 100, 50, 25), Color::CYAN, 24));

    let mut bgra = vec![0u8; 300 * 300 * 4];
    let err = imgmgr
        .nv21_to_rgba(
            &src,
            &mut Buffer::from_slice_mut(&mut bgra, 300, 300, Format::Bgra8888)?,
        )
        .unwrap_err();
    assert!(matches!(err, RgaError::InvalidParam(_)));
    Ok(())
}

#[test]
#[serial]
#[ignore = "requires RGA hardware"]
fn test_harness_all() -> Result<(), Box<dyn Error>> {
    for memory in [MemoryKind::Cma, MemoryKind::Virtual] {
        let settings = Settings {
            memory,
            ..Default::default()
        };
        let harness = Harness::new(ImageManager::new()?, settings);
        for case in TestCase::ALL {
            let report = harness.run(case);
            println!("{report} [{:?}]", report.elapsed);
            assert!(report.outcome.is_success(), "{report}");
        }
    }
    Ok(())
}
