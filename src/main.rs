// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod args;

use args::Args;
use clap::Parser;
use edgefirst_rga::{
    harness::{Harness, Report, Settings},
    rga::{ImageManager, Info},
};
use kanal::AsyncReceiver;
use serde_json::json;
use std::{error::Error, fs, sync::Arc, time::Duration};
use tokio::{runtime::Builder, task::JoinSet, time::sleep};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, Layer as _, Registry};

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(&args)?;

    let mut imgmgr = ImageManager::with_library(&args.library)?;
    imgmgr.set_core(args.core.into());
    imgmgr.set_priority(args.priority)?;
    info!(
        "librga {} loaded from {} (core: {}, priority: {:?})",
        imgmgr.version(),
        args.library,
        imgmgr.core(),
        imgmgr.priority()
    );

    if args.info {
        println!("{}", imgmgr.query(Info::All)?);
        return Ok(());
    }

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir)?;
    }

    let rt = Builder::new_multi_thread().enable_all().build()?;
    rt.block_on(run(args, imgmgr))
}

fn init_tracing(args: &Args) -> Result<(), Box<dyn Error>> {
    let level = if args.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let stdout_log = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_filter(level);

    let journald = match tracing_journald::layer() {
        Ok(journald) => Some(journald.with_filter(level)),
        Err(_) => None,
    };

    let console = if args.tokio_console {
        Some(console_subscriber::spawn())
    } else {
        None
    };

    let tracy = if args.tracy {
        tracy_client::Client::start();
        Some(
            tracing_tracy::TracyLayer::new(tracing_tracy::DefaultConfig::default())
                .with_filter(level),
        )
    } else {
        None
    };

    let subscriber = Registry::default()
        .with(stdout_log)
        .with(journald)
        .with(console)
        .with(tracy);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

async fn run(args: Args, imgmgr: ImageManager) -> Result<(), Box<dyn Error>> {
    let cases = args.test_cases();
    let total = cases.len();
    let harness = Arc::new(Harness::new(imgmgr, Settings::from(&args)));
    info!(
        "running {} tests on {}x{} {:?} images",
        total,
        harness.settings().width,
        harness.settings().height,
        harness.settings().memory
    );

    let (tx, rx) = kanal::unbounded_async();
    let reporter = tokio::spawn(reporter(rx));

    if args.parallel {
        let mut tasks = JoinSet::new();
        for case in cases {
            let harness = harness.clone();
            let tx = tx.clone().to_sync();
            tasks.spawn_blocking(move || tx.send(harness.run(case)));
        }
        while let Some(sent) = tasks.join_next().await {
            sent??;
        }
    } else {
        for (i, case) in cases.into_iter().enumerate() {
            if i > 0 && args.delay_ms > 0 {
                sleep(Duration::from_millis(args.delay_ms)).await;
            }
            let harness = harness.clone();
            let report = tokio::task::spawn_blocking(move || harness.run(case)).await?;
            tx.send(report).await?;
        }
    }
    drop(tx);

    let reports = reporter.await?;
    let failed = reports.iter().filter(|r| !r.outcome.is_success()).count();
    info!("{} of {} tests passed", total - failed, total);

    if let Some(path) = &args.report {
        let summary = summarize(harness.imgmgr(), &reports);
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        info!("report written to {}", path.display());
    }

    if failed > 0 {
        return Err(Box::from(format!("{failed} of {total} tests failed")));
    }
    Ok(())
}

async fn reporter(rx: AsyncReceiver<Report>) -> Vec<Report> {
    let mut reports = Vec::new();
    while let Ok(report) = rx.recv().await {
        if report.outcome.is_success() {
            info!(elapsed = ?report.elapsed, "{}", report);
        } else {
            warn!(elapsed = ?report.elapsed, "{}", report);
        }
        if let Some(output) = &report.output {
            info!("{} result saved to {}", report.case.name(), output.display());
        }
        if let Some(client) = tracy_client::Client::running() {
            client.frame_mark();
        }
        reports.push(report);
    }
    reports
}

fn summarize(imgmgr: &ImageManager, reports: &[Report]) -> serde_json::Value {
    let tests: Vec<_> = reports
        .iter()
        .map(|r| {
            json!({
                "name": r.case.name(),
                "success": r.outcome.is_success(),
                "result": r.to_string(),
                "elapsed_ms": r.elapsed.as_secs_f64() * 1000.0,
                "output": r.output,
            })
        })
        .collect();
    json!({
        "library": imgmgr.version().to_string(),
        "core": imgmgr.core().to_string(),
        "passed": reports.iter().filter(|r| r.outcome.is_success()).count(),
        "failed": reports.iter().filter(|r| !r.outcome.is_success()).count(),
        "tests": tests,
    })
}
