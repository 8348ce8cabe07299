use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{error, warn};

use trainload::aggregation::DateWindow;
use trainload::config::{parse_utc_offset, AppConfig};
use trainload::engine::{AthleteRequest, LoadRequest, ReadinessRequest, TrainingLoadEngine, TrainingLoadReport};
use trainload::error::ErrorSeverity;
use trainload::import::ImportManager;
use trainload::logging::{init_logging, LogLevel};
use trainload::models::WorkoutRecord;
use trainload::pmc::TrainingStatus;
use trainload::zones::{ZoneRequest, ZoneScheme};

/// trainload - training load and readiness from workout history
///
/// Reads workout exports (JSON or CSV) and reports fitness, fatigue and form,
/// personalised heart rate zones, and same-day readiness.
#[derive(Parser)]
#[command(name = "trainload")]
#[command(version)]
#[command(about = "Training load, zones and readiness CLI", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Athlete UTC offset, e.g. +02:00 (overrides the config file)
    #[arg(long, global = true, allow_hyphen_values = true)]
    timezone: Option<String>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Daily load series and PMC metrics
    Load {
        /// Workout file (.json or .csv)
        #[arg(short, long)]
        file: PathBuf,

        /// Window length in days, ending today or on --to
        #[arg(short, long, default_value = "90")]
        days: u32,

        /// Window start (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Window end (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Print a table instead of JSON
        #[arg(short, long)]
        table: bool,
    },

    /// Heart rate zones and threshold estimates
    Zones {
        #[arg(short, long)]
        file: PathBuf,

        /// Zone scheme (five_zone, three_zone, power_based)
        #[arg(short, long)]
        scheme: Option<ZoneScheme>,

        /// Manual maximum heart rate
        #[arg(long)]
        max_hr: Option<u16>,

        /// Skip alternative zone models
        #[arg(long)]
        no_alternatives: bool,
    },

    /// Same-day readiness score
    Readiness {
        #[arg(short, long)]
        file: PathBuf,

        /// Assessment instant (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<DateTime<FixedOffset>>,

        /// Weekly stress target
        #[arg(long)]
        target: Option<Decimal>,
    },

    /// Evaluate several athletes at once, one file per athlete
    Batch {
        /// Workout files; the file stem is used as athlete id
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(short, long, default_value = "42")]
        days: u32,
    },

    /// Show or create the configuration file
    Config {
        /// Write the default configuration if no file exists
        #[arg(long)]
        init: bool,

        /// Print the configuration file path
        #[arg(long)]
        path: bool,
    },
}

#[derive(Tabled)]
struct LoadRow {
    #[tabled(rename = "Date")]
    date: String,
    #[tabled(rename = "Load")]
    load: String,
    #[tabled(rename = "Fitness")]
    chronic: String,
    #[tabled(rename = "Fatigue")]
    acute: String,
    #[tabled(rename = "Form")]
    form: String,
    #[tabled(rename = "Ramp")]
    ramp: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(AppConfig::default_config_path);
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::load_or_default(),
    };

    config.logging.level = match cli.verbose {
        0 => config.logging.level,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    init_logging(&config.logging)?;

    let timezone = match &cli.timezone {
        Some(value) => parse_utc_offset(value)?,
        None => config.athlete.timezone_offset()?,
    };
    let engine = TrainingLoadEngine::new(config.engine.clone());
    let overrides = config.athlete.overrides.clone();

    match cli.command {
        Commands::Load {
            file,
            days,
            from,
            to,
            table,
        } => {
            let workouts = read_workouts(&file, &timezone)?;
            let today = now_in(&timezone).date_naive();
            let window = match (from, to) {
                (Some(from), Some(to)) => DateWindow::new(from, to),
                (Some(from), None) => DateWindow::new(from, today),
                (None, to) => DateWindow::ending_on(to.unwrap_or(today), days),
            };

            let report = engine.training_load(
                &workouts,
                &LoadRequest {
                    window,
                    timezone,
                    overrides,
                },
            );

            if table {
                print_load_table(&report);
            } else {
                print_json(&report)?;
            }
        }

        Commands::Zones {
            file,
            scheme,
            max_hr,
            no_alternatives,
        } => {
            let workouts = read_workouts(&file, &timezone)?;
            let mut request = ZoneRequest::new(now_in(&timezone));
            request.overrides = overrides;
            if max_hr.is_some() {
                request.overrides.max_heart_rate = max_hr;
            }
            request.scheme = scheme;
            request.include_alternatives = !no_alternatives;

            print_json(&engine.analyze_zones(&workouts, &request))?;
        }

        Commands::Readiness { file, now, target } => {
            let workouts = read_workouts(&file, &timezone)?;
            let request = ReadinessRequest {
                now: now.unwrap_or_else(|| now_in(&timezone)),
                timezone,
                weekly_target: target.or(config.athlete.weekly_stress_target),
                overrides,
            };

            print_json(&engine.readiness(&workouts, &request))?;
        }

        Commands::Batch { files, days } => {
            let mut athletes: BTreeMap<String, Vec<WorkoutRecord>> = BTreeMap::new();
            for file in &files {
                let athlete_id = file
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string());
                athletes.insert(athlete_id, read_workouts(file, &timezone)?);
            }

            let request = AthleteRequest {
                now: now_in(&timezone),
                timezone,
                window_days: days,
                weekly_target: config.athlete.weekly_stress_target,
                overrides,
                scheme: None,
            };

            print_json(&engine.evaluate_athletes(&athletes, &request))?;
        }

        Commands::Config { init, path } => {
            if path {
                println!("{}", config_path.display());
            } else if init {
                if config_path.exists() {
                    eprintln!(
                        "{}",
                        format!("Config already exists: {}", config_path.display()).yellow()
                    );
                } else {
                    AppConfig::default().save_to_file(&config_path)?;
                    eprintln!("{}", format!("✓ Wrote {}", config_path.display()).green());
                }
            } else {
                print!(
                    "{}",
                    toml::to_string_pretty(&config).context("Failed to render configuration")?
                );
            }
        }
    }

    Ok(())
}

fn now_in(timezone: &FixedOffset) -> DateTime<FixedOffset> {
    Utc::now().with_timezone(timezone)
}

fn read_workouts(file: &Path, timezone: &FixedOffset) -> Result<Vec<WorkoutRecord>> {
    let outcome = match ImportManager::new().import_file(file, timezone) {
        Ok(outcome) => outcome,
        Err(err) => {
            match err.severity() {
                ErrorSeverity::Warning => warn!(path = %file.display(), error = %err, "Import failed"),
                ErrorSeverity::Error | ErrorSeverity::Critical => {
                    error!(path = %file.display(), error = %err, "Import failed")
                }
            }
            return Err(anyhow::anyhow!(err.user_message()))
                .with_context(|| format!("Failed to import {}", file.display()));
        }
    };

    if !outcome.summary.skipped.is_empty() {
        eprintln!(
            "{}",
            format!(
                "Skipped {} of {} records in {}",
                outcome.summary.skipped.len(),
                outcome.summary.total,
                file.display()
            )
            .yellow()
        );
    }

    Ok(outcome.workouts)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_load_table(report: &TrainingLoadReport) {
    let rows: Vec<LoadRow> = report
        .series
        .iter()
        .map(|m| LoadRow {
            date: m.date.to_string(),
            load: m.daily_load.round_dp(0).to_string(),
            chronic: m.chronic.round_dp(1).to_string(),
            acute: m.acute.round_dp(1).to_string(),
            form: m.form.round_dp(1).to_string(),
            ramp: m.ramp_rate.round_dp(1).to_string(),
            status: m.status.to_string(),
        })
        .collect();

    println!("{}", Table::new(rows).with(Style::rounded()));
    println!();
    println!(
        "{} {}  {} {}  {} {}",
        "Fitness".bold(),
        report.current.chronic.round_dp(1),
        "Fatigue".bold(),
        report.current.acute.round_dp(1),
        "Form".bold(),
        report.current.form.round_dp(1)
    );
    println!("{} {}", "Status:".bold(), colored_status(report.current.status));
    for recommendation in &report.recommendations {
        println!("  • {}", recommendation);
    }
}

fn colored_status(status: TrainingStatus) -> ColoredString {
    let label = status.to_string();
    match status {
        TrainingStatus::Build => label.green().bold(),
        TrainingStatus::Peak => label.yellow().bold(),
        TrainingStatus::Maintain => label.blue().bold(),
        TrainingStatus::Recover => label.cyan().bold(),
    }
}
