use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use airsight::advice::{self, Recommendation};
use airsight::analysis::{self, SeriesStats, SeriesViolation};
use airsight::category::{AqiCategory, categorize};
use airsight::performance::ModelPerformance;
use airsight::pollutants::{self, HighestDay, Reading};
use airsight::{DateKey, EngineConfig, Series, SeriesGenerator, SeriesKind, Source};

#[derive(Parser)]
#[command(name = "airsight")]
#[command(about = "Deterministic AQI values and chart series", long_about = None)]
#[command(version)]
struct Cli {
    /// TOML file overriding the canonical engine constants
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Suppress the stderr summary
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// One value for a date, offset and model
    Point {
        /// YYYY-MM-DD
        date: String,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        /// Model name; empty selects the default profile
        #[arg(short, long, default_value = "")]
        model: String,
        /// Also emit the value for the following day
        #[arg(long)]
        next_day: bool,
    },

    /// A chart series anchored at a date
    Series {
        #[arg(value_enum)]
        kind: KindArg,
        /// Anchor date, YYYY-MM-DD
        date: String,
        /// Model for the trend-week series
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Per-day values and main pollutant for a month
    Calendar { year: i32, month: u32 },

    /// Pollutant breakdown for a date
    Pollutants {
        date: String,
        /// AQI to scale concentrations by; defaults to the current value
        #[arg(long)]
        aqi: Option<u32>,
    },

    /// Health advice for an AQI value
    Recommend { aqi: u32 },

    /// Known models with their variance profile and accuracy metrics
    Models,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Daily,
    Weekly,
    Hourly,
    Trend,
    MonthDays,
    MonthWeeks,
}

impl KindArg {
    fn into_kind(self, model: Option<String>, default_model: &str) -> SeriesKind {
        match self {
            KindArg::Daily => SeriesKind::DailyYear,
            KindArg::Weekly => SeriesKind::WeeklyYear,
            KindArg::Hourly => SeriesKind::HourlyDay,
            KindArg::Trend => SeriesKind::TrendWeek { model: model.unwrap_or_else(|| default_model.to_string()) },
            KindArg::MonthDays => SeriesKind::MonthDays,
            KindArg::MonthWeeks => SeriesKind::MonthWeeks,
        }
    }
}

#[derive(Serialize)]
struct PointRecord<'a> {
    date: DateKey,
    offset_hours: u32,
    model: &'a str,
    aqi: u32,
    source: Source,
    category: AqiCategory,
}

#[derive(Serialize)]
struct SeriesRecord<'a> {
    kind: &'static str,
    index: usize,
    label: &'a str,
    aqi: u32,
    source: Source,
    anchor: bool,
}

#[derive(Serialize)]
struct PollutantReport {
    date: DateKey,
    aqi: u32,
    main_pollutant: &'static str,
    concentrations: Vec<Reading>,
    forecast: Vec<Reading>,
    highest_days: Vec<HighestDay>,
}

#[derive(Serialize)]
struct RecommendRecord {
    aqi: u32,
    category: AqiCategory,
    recommendations: &'static [Recommendation],
}

#[derive(Serialize)]
struct ModelRecord<'a> {
    model: &'a str,
    /// Strategy tried first for this model.
    prediction_source: Source,
    bias_offset: f64,
    noise_std_dev: f64,
    performance: Option<ModelPerformance>,
    accuracy_percentage: Option<f64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "airsight=debug" } else { "airsight=warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr).without_time())
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => EngineConfig::canonical(),
    };
    let generator = SeriesGenerator::new(&config);
    let arbiter = generator.arbiter();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    match cli.command {
        Commands::Point { date, offset, model, next_day } => {
            let date = DateKey::parse(&date)?;
            let canonical = arbiter.simulator().profiles().canonical_name(&model);
            let mut records = vec![(date, offset, arbiter.value_for(date, offset, &model))];
            if next_day {
                let next = arbiter.next_day_value(date, &model);
                records.push((date.offset_days(1).unwrap_or(date), 0, next));
            }
            for (date, offset_hours, value) in records {
                write_line(
                    &mut out,
                    &PointRecord {
                        date,
                        offset_hours,
                        model: &canonical,
                        aqi: value.aqi,
                        source: value.source,
                        category: categorize(value.aqi),
                    },
                )?;
            }
        }

        Commands::Series { kind, date, model } => {
            let kind = kind.into_kind(model, arbiter.default_model());
            let series = generator.generate_str(&kind, &date)?;
            write_series(&mut out, &series)?;
            if !cli.quiet {
                let bounds = match kind {
                    SeriesKind::HourlyDay => generator.hourly_bounds(),
                    _ => arbiter.simulator().bounds(),
                };
                let model = match &kind {
                    SeriesKind::TrendWeek { model } => model.as_str(),
                    _ => arbiter.default_model(),
                };
                let current = arbiter.value_for(series.anchor_date, 0, model);
                print_summary(&series, &analysis::verify_series(&series, current, bounds));
            }
        }

        Commands::Calendar { year, month } => {
            for day in pollutants::month_calendar(arbiter, year, month)? {
                write_line(&mut out, &day)?;
            }
        }

        Commands::Pollutants { date, aqi } => {
            let date = DateKey::parse(&date)?;
            let aqi = aqi.unwrap_or_else(|| arbiter.current_value(date).aqi);
            let report = PollutantReport {
                date,
                aqi,
                main_pollutant: pollutants::main_pollutant(date),
                concentrations: pollutants::concentrations(date, aqi),
                forecast: pollutants::forecast(date),
                highest_days: pollutants::highest_concentration_days(date.year(), date.month())?,
            };
            write_line(&mut out, &report)?;
        }

        Commands::Recommend { aqi } => {
            write_line(
                &mut out,
                &RecommendRecord { aqi, category: categorize(aqi), recommendations: advice::recommendations(aqi) },
            )?;
        }

        Commands::Models => {
            let profiles = arbiter.simulator().profiles();
            for model in profiles.model_names() {
                let profile = profiles.profile(model);
                let performance = arbiter.performance(model);
                write_line(
                    &mut out,
                    &ModelRecord {
                        model,
                        prediction_source: arbiter.prediction_source(),
                        bias_offset: profile.bias_offset,
                        noise_std_dev: profile.noise_std_dev,
                        performance,
                        accuracy_percentage: performance.map(|p| p.accuracy_percentage()),
                    },
                )?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn write_line<W: Write, T: Serialize>(out: &mut W, record: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, record)?;
    writeln!(out)?;
    Ok(())
}

fn write_series<W: Write>(out: &mut W, series: &Series) -> Result<()> {
    let rows = series.labels.iter().zip(&series.values).zip(&series.sources).enumerate();
    for (index, ((label, &aqi), &source)) in rows {
        let record = SeriesRecord {
            kind: series.kind.name(),
            index,
            label,
            aqi,
            source,
            anchor: series.anchor_index == Some(index),
        };
        write_line(out, &record)?;
    }
    Ok(())
}

fn print_summary(series: &Series, violations: &[SeriesViolation]) {
    let inv = |variant: fn(&SeriesViolation) -> bool| {
        if violations.iter().any(variant) { "FAIL" } else { "PASS" }
    };

    eprintln!("\n=== {} @ {} ===", series.kind.name(), series.anchor_date);
    eprintln!("  [1] Length:               {}", inv(|v| matches!(v, SeriesViolation::WrongLength { .. })));
    eprintln!("  [2] Columns aligned:      {}", inv(|v| matches!(v, SeriesViolation::RaggedColumns { .. })));
    eprintln!("  [3] Within bounds:        {}", inv(|v| matches!(v, SeriesViolation::OutOfBounds { .. })));
    eprintln!(
        "  [4] Anchor consistent:    {}",
        inv(|v| matches!(v, SeriesViolation::AnchorMismatch { .. } | SeriesViolation::AnchorOutOfRange { .. }))
    );

    if violations.is_empty() {
        eprintln!("  All series invariants: PASS");
    } else {
        eprintln!("\n  {} violation(s):", violations.len());
        for v in violations {
            eprintln!("    {v}");
        }
    }

    if let Some(SeriesStats { n, min, p50, max, mean, std_dev, .. }) = series.stats() {
        eprintln!(
            "\n  n={n} anchor={:?} min={min:.0} p50={p50:.1} max={max:.0} mean={mean:.1} sd={std_dev:.2}",
            series.anchor_index
        );
    }
}
