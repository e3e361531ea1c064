// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use clap::Parser;
use edgefirst_rga::{
    harness::{MemoryKind, Settings, TestCase},
    image::Format,
    rga::{Core, LIBRARY_NAME},
};
use std::path::PathBuf;

/// Scheduler core selection.
///
/// RK3588 has two RGA3 cores and one RGA2 core.  RGA3 does not implement
/// color fill, so the fill tests need `rga2` or `auto` there.
#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Copy)]
pub enum CoreSetting {
    /// Let the driver choose
    Auto,
    /// Either RGA3 core
    Rga3,
    /// First RGA3 core
    Rga3Core0,
    /// Second RGA3 core
    Rga3Core1,
    /// Any RGA2 core
    Rga2,
}

impl From<CoreSetting> for Core {
    fn from(setting: CoreSetting) -> Self {
        match setting {
            CoreSetting::Auto => Core::DEFAULT,
            CoreSetting::Rga3 => Core::RGA3,
            CoreSetting::Rga3Core0 => Core::RGA3_CORE0,
            CoreSetting::Rga3Core1 => Core::RGA3_CORE1,
            CoreSetting::Rga2 => Core::RGA2,
        }
    }
}

/// Command-line arguments for the EdgeFirst RGA test harness.
///
/// Every option can also be given through the environment variable named
/// in its help text.
///
/// # Example
///
/// ```bash
/// # Run the copy and fill tests from system heap memory on RGA2
/// edgefirst-rga --tests copy fill --memory system --core rga2
///
/// # Via environment variables
/// export TESTS="copy fill"
/// export OUTPUT_DIR=/tmp/rga
/// edgefirst-rga
/// ```
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Test cases to run, all when empty
    #[arg(long, env = "TESTS", value_delimiter = ' ', num_args = 1..)]
    pub tests: Vec<TestCase>,

    /// Path or soname of the RGA library
    #[arg(long, env = "RGA_LIBRARY", default_value = LIBRARY_NAME)]
    pub library: String,

    /// Test image size in pixels (width height)
    #[arg(
        long,
        env = "IMAGE_SIZE",
        default_value = "400 400",
        value_delimiter = ' ',
        num_args = 2
    )]
    pub image_size: Vec<u32>,

    /// Memory backing the test images
    #[arg(long, env = "MEMORY", default_value = "cma", value_enum)]
    pub memory: MemoryKind,

    /// Hardware cores the scheduler may use
    #[arg(long, env = "CORE", default_value = "auto", value_enum)]
    pub core: CoreSetting,

    /// Job priority, 0 (lowest) to 6
    #[arg(long, env = "PRIORITY", value_parser = clap::value_parser!(u8).range(0..=6))]
    pub priority: Option<u8>,

    /// Destination format of the color conversion test
    #[arg(long, env = "CONVERT_FORMAT", default_value = "BGRA8888")]
    pub convert_format: Format,

    /// Delay between sequential tests in milliseconds
    #[arg(long, env = "DELAY_MS", default_value = "100")]
    pub delay_ms: u64,

    /// Run the tests concurrently
    #[arg(long, env = "PARALLEL")]
    pub parallel: bool,

    /// Directory receiving a JPEG of each result
    #[arg(long, env = "OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Write a JSON summary of the run to this file
    #[arg(long, env = "REPORT")]
    pub report: Option<PathBuf>,

    /// Print the library information and exit
    #[arg(long)]
    pub info: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Enable Tokio async runtime console for debugging
    #[arg(long, env = "TOKIO_CONSOLE")]
    pub tokio_console: bool,

    /// Enable Tracy profiler for performance analysis
    #[arg(long, env = "TRACY")]
    pub tracy: bool,
}

impl Args {
    /// Selected tests in execution order.
    pub fn test_cases(&self) -> Vec<TestCase> {
        if self.tests.is_empty() {
            TestCase::ALL.to_vec()
        } else {
            self.tests.clone()
        }
    }
}

impl From<&Args> for Settings {
    fn from(args: &Args) -> Self {
        Settings {
            width: args.image_size[0],
            height: args.image_size[1],
            memory: args.memory,
            convert_format: args.convert_format,
            output_dir: args.output_dir.clone(),
        }
    }
}
