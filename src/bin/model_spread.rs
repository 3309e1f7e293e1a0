//! Per-model spread of simulated values over a date range.
//!
//! Every known model plus `default` is sampled at offset 0 for each day of
//! the range, then summarised. Higher-noise models should show a wider
//! p5..p95 band and a larger standard deviation.

use anyhow::{Context, Result, bail};
use clap::Parser;
use rayon::prelude::*;

use airsight::analysis::SeriesStats;
use airsight::{DateKey, EngineConfig};
use airsight::simulator::PointSimulator;

#[derive(Parser)]
#[command(name = "model_spread", about = "Empirical spread of simulated AQI per model")]
struct Args {
    /// First date of the range, YYYY-MM-DD
    #[arg(default_value = "2024-01-01")]
    start: String,

    /// Number of days to sample
    #[arg(short, long, default_value_t = 365)]
    days: u32,

    /// Hour offset applied to every sample
    #[arg(short, long, default_value_t = 0)]
    offset: u32,

    /// TOML overrides for the engine constants
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    if args.days == 0 {
        bail!("--days must be positive");
    }

    let config = match &args.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::canonical(),
    };
    let start = DateKey::parse(&args.start)?;
    let simulator = PointSimulator::new(&config);

    let mut models: Vec<String> = simulator.profiles().model_names().map(str::to_string).collect();
    if !simulator.profiles().is_known(&config.default_model) {
        models.push(config.default_model.clone());
    }

    let rows: Vec<(String, Option<SeriesStats>)> = models
        .par_iter()
        .map(|model| -> Result<_> {
            let values = (0..i64::from(args.days))
                .map(|i| {
                    let date = start.offset_days(i).context("date range overflows the calendar")?;
                    Ok(simulator.simulate_raw(date, args.offset, model)?)
                })
                .collect::<Result<Vec<f64>>>()?;
            Ok((model.clone(), SeriesStats::from_values(&values)))
        })
        .collect::<Result<_>>()?;

    println!("\n=== Model spread ({} days from {start}, offset {}h) ===", args.days, args.offset);
    println!(
        "{:<10} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7} | {:>7}",
        "Model", "min", "p5", "p50", "p95", "max", "mean", "stddev"
    );
    println!("{}", "-".repeat(10 + 7 * 10 + 3));
    for (model, stats) in rows {
        let Some(s) = stats else { continue };
        println!(
            "{:<10} | {:>7.1} | {:>7.1} | {:>7.1} | {:>7.1} | {:>7.1} | {:>7.1} | {:>7.2}",
            model, s.min, s.p5, s.p50, s.p95, s.max, s.mean, s.std_dev,
        );
    }
    Ok(())
}
