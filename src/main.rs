use std::env;
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, anyhow, bail};
use tracing::error;

use quadrant_curator::{
    config::EngineConfig,
    observability::Telemetry,
    replay::{ReplayConfig, replay_dataset},
};

fn main() -> Result<()> {
    std::panic::set_hook(Box::new(|panic_info| {
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .copied()
            .or_else(|| {
                panic_info
                    .payload()
                    .downcast_ref::<String>()
                    .map(String::as_str)
            })
            .unwrap_or("unknown panic payload");

        if let Some(location) = panic_info.location() {
            error!(
                file = location.file(),
                line = location.line(),
                message,
                "panic occurred"
            );
        } else {
            error!(message, "panic occurred without location information");
        }
    }));

    let telemetry = Telemetry::new().context("failed to initialize telemetry")?;
    let config = parse_args()?;
    let engine = EngineConfig::from_env().context("failed to load configuration")?;

    let report = replay_dataset(&config, engine, &telemetry)?;
    let rendered =
        serde_json::to_string_pretty(&report).context("failed to serialize replay report")?;
    println!("{rendered}");
    Ok(())
}

fn parse_args() -> Result<ReplayConfig> {
    let mut dataset = None;
    let mut pool = false;
    let mut metrics = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dataset" => {
                let value = args.next().context("--dataset requires a path argument")?;
                dataset = Some(PathBuf::from(value));
            }
            "--pool" => {
                pool = true;
            }
            "--metrics" => {
                metrics = true;
            }
            "--help" => {
                print_usage();
                process::exit(0);
            }
            _ => {
                bail!("unknown argument: {}", arg);
            }
        }
    }

    let dataset = dataset.ok_or_else(|| anyhow!("--dataset is required"))?;

    Ok(ReplayConfig {
        dataset,
        pool,
        metrics,
    })
}

fn print_usage() {
    eprintln!("Usage: quadrant-replay --dataset <file.json> [--pool] [--metrics]");
}
