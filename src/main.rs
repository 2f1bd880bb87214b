use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use tabled::{settings::Style, Table, Tabled};
use tracing::warn;

use atdsrs::batch::{self, BatchSummary};
use atdsrs::config::AppConfig;
use atdsrs::engine::AtdsEngine;
use atdsrs::error::ErrorSeverity;
use atdsrs::export::{self, ExportFormat};
use atdsrs::import::{self, ImportFormat, ImportManager};
use atdsrs::logging::{init_logging, LogConfig, LogLevel};
use atdsrs::models::{AthleteProfile, FilterMode, Gender, SampleOutput, Sport};
use atdsrs::physio;
use atdsrs::stats::{self, HrvStatistics};

/// atdsrs - RR-interval analysis CLI
///
/// Converts heartbeat interval recordings into a derived breathing signal,
/// HRV amplitude and training intensity states, either per-file in batch or
/// by replaying a recording through the live engine.
#[derive(Parser)]
#[command(name = "atdsrs")]
#[command(author = "atdsrs contributors")]
#[command(version = "0.1.0")]
#[command(about = "RR-interval breathing and training-state analysis", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (pretty, json, compact)
    #[arg(long, default_value = "compact", value_name = "FORMAT")]
    log_format: String,

    /// Also write JSON logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Batch-analyze recordings (files or directories)
    Analyze {
        /// Input files or directories (defaults to the configured data dir)
        paths: Vec<PathBuf>,

        /// Output format (table, json, csv)
        #[arg(short = 'f', long, default_value = "table")]
        format: String,

        /// Write results to this file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Include time-domain HRV statistics
        #[arg(long)]
        stats: bool,

        /// Include VO2max estimate and classifications
        #[arg(long)]
        physio: bool,
    },

    /// Replay a recording through the live engine
    Stream {
        /// Recording or captured device log to replay
        file: PathBuf,

        /// Smoother band dynamics (rest, exercise)
        #[arg(short, long)]
        mode: Option<String>,

        /// Sport practiced during the recording
        #[arg(short, long)]
        sport: Option<String>,

        /// Externally measured aerobic threshold, beats/min
        #[arg(long, value_name = "BPM")]
        at: Option<u16>,

        /// Print a status line every N accepted samples (0 disables)
        #[arg(long, value_name = "N")]
        every: Option<usize>,

        /// Export the per-sample series as CSV
        #[arg(short, long, value_name = "FILE")]
        export: Option<PathBuf>,
    },

    /// Estimate VO2max and classify fitness
    Physio {
        /// Age in years (defaults to the configured athlete)
        #[arg(short, long)]
        age: Option<u8>,

        /// Gender (male, female; defaults to the configured athlete)
        #[arg(short, long)]
        gender: Option<String>,

        /// Resting heart rate, beats/min
        #[arg(short, long, value_name = "BPM")]
        resting_hr: Option<f64>,

        /// Recording to derive the resting heart rate and report from
        file: Option<PathBuf>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a fresh default config file
    Init,
    /// Print the active configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = LogConfig {
        level: LogLevel::from_verbosity(cli.verbose),
        format: cli.log_format.parse().map_err(anyhow::Error::msg)?,
        file_path: cli.log_file.clone(),
        ..LogConfig::default()
    };
    init_logging(&log_config)?;

    match cli.command {
        Commands::Config { action } => cmd_config(action, cli.config.as_deref()),
        Commands::Analyze {
            paths,
            format,
            output,
            stats,
            physio,
        } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_analyze(&config, paths, &format, output, stats, physio)
        }
        Commands::Stream {
            file,
            mode,
            sport,
            at,
            every,
            export,
        } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_stream(&config, file, mode, sport, at, every, export)
        }
        Commands::Physio {
            age,
            gender,
            resting_hr,
            file,
        } => {
            let config = load_config(cli.config.as_deref())?;
            cmd_physio(&config, age, gender, resting_hr, file)
        }
    }
}

fn load_config(override_path: Option<&Path>) -> Result<AppConfig> {
    match override_path {
        Some(path) => AppConfig::load_from_file(path),
        None => Ok(AppConfig::load_or_default()),
    }
}

/// One analyzed recording, kept with its raw samples so the optional
/// statistics and physiology sections can be derived from the same data.
struct AnalysisEntry {
    name: String,
    profile: AthleteProfile,
    samples: Vec<u16>,
    summary: BatchSummary,
}

#[derive(Serialize)]
struct AnalysisRecord {
    file: String,
    summary: BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    hrv_stats: Option<HrvStatistics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    physio: Option<PhysioRecord>,
}

#[derive(Serialize)]
struct PhysioRecord {
    age: u8,
    gender: Gender,
    resting_hr_bpm: f64,
    vo2max: Option<f64>,
    fitness_class: Option<String>,
    hrv_class: String,
    breath_class: String,
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Samples")]
    samples: usize,
    #[tabled(rename = "HR (bpm)")]
    heart_rate: u16,
    #[tabled(rename = "Ti/Te")]
    ti_te: String,
    #[tabled(rename = "Breaths/min")]
    breath_rate: u16,
    #[tabled(rename = "HRV (ms)")]
    hrv_amplitude: u16,
}

impl SummaryRow {
    fn from_entry(entry: &AnalysisEntry) -> Self {
        Self {
            file: entry.name.clone(),
            samples: entry.summary.smoothed.len(),
            heart_rate: entry.summary.avg_heart_rate,
            ti_te: format!("{:.2}", entry.summary.ti_te),
            breath_rate: entry.summary.breath_rate,
            hrv_amplitude: entry.summary.hrv_amplitude,
        }
    }
}

#[derive(Tabled)]
struct StatsRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Mean RR (ms)")]
    mean_rr: String,
    #[tabled(rename = "SDNN (ms)")]
    sdnn: String,
    #[tabled(rename = "RMSSD (ms)")]
    rmssd: String,
    #[tabled(rename = "pNN50 (%)")]
    pnn50: String,
    #[tabled(rename = "SD1/SD2 (ms)")]
    poincare: String,
}

impl StatsRow {
    fn from_entry(entry: &AnalysisEntry) -> Option<Self> {
        let stats = stats::hrv_statistics(&entry.samples)?;
        Some(Self {
            file: entry.name.clone(),
            mean_rr: format!("{:.1}", stats.mean_rr_ms),
            sdnn: format!("{:.1}", stats.sdnn_ms),
            rmssd: format!("{:.1}", stats.rmssd_ms),
            pnn50: format!("{:.1}", stats.pnn50_pct),
            poincare: format!("{:.1} / {:.1}", stats.sd1_ms, stats.sd2_ms),
        })
    }
}

#[derive(Tabled)]
struct PhysioRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Resting HR")]
    resting_hr: String,
    #[tabled(rename = "VO2max")]
    vo2max: String,
    #[tabled(rename = "Fitness")]
    fitness: String,
    #[tabled(rename = "HRV")]
    hrv: String,
    #[tabled(rename = "Breathing")]
    breathing: String,
}

impl PhysioRow {
    fn from_entry(entry: &AnalysisEntry) -> Option<Self> {
        let record = physio_record(&entry.profile, &entry.samples, &entry.summary)?;
        Some(Self {
            file: entry.name.clone(),
            resting_hr: format!("{:.0} bpm", record.resting_hr_bpm),
            vo2max: record
                .vo2max
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "--".to_string()),
            fitness: record.fitness_class.unwrap_or_else(|| "--".to_string()),
            hrv: record.hrv_class,
            breathing: record.breath_class,
        })
    }
}

fn cmd_analyze(
    config: &AppConfig,
    paths: Vec<PathBuf>,
    format: &str,
    output: Option<PathBuf>,
    with_stats: bool,
    with_physio: bool,
) -> Result<()> {
    let manager = ImportManager::new();

    let paths = if paths.is_empty() {
        let data_dir = config.settings.data_dir.clone();
        eprintln!(
            "{}",
            format!("No input given, scanning {}", data_dir.display()).dimmed()
        );
        vec![data_dir]
    } else {
        paths
    };

    let mut recordings: Vec<(PathBuf, Vec<u16>)> = Vec::new();
    for path in &paths {
        if path.is_dir() {
            recordings.extend(manager.import_directory(path)?);
        } else {
            match manager.import_file(path) {
                Ok(samples) => recordings.push((path.clone(), samples)),
                // A missing or empty recording should not sink the whole run
                Err(err) if err.severity() == ErrorSeverity::Warning => {
                    eprintln!("{} {}", "skipped:".yellow(), err.user_message());
                }
                Err(err) => {
                    return Err(err)
                        .with_context(|| format!("failed to import {}", path.display()));
                }
            }
        }
    }

    let mut entries = Vec::new();
    for (path, samples) in recordings {
        match batch::analyze(&samples) {
            Some(summary) => entries.push(AnalysisEntry {
                name: display_name(&path),
                profile: profile_for(&path, config),
                samples,
                summary,
            }),
            None => eprintln!(
                "{} {} has fewer than 10 valid intervals",
                "skipped:".yellow(),
                path.display()
            ),
        }
    }

    if entries.is_empty() {
        bail!("no analyzable recordings found");
    }

    match format {
        "table" => {
            let rendered = render_tables(&entries, with_stats, with_physio);
            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("{} {}", "✓ Results written to".green(), path.display());
                }
                None => print!("{}", rendered),
            }
        }
        "json" => {
            let records: Vec<AnalysisRecord> = entries
                .iter()
                .map(|entry| AnalysisRecord {
                    file: entry.name.clone(),
                    summary: entry.summary.clone(),
                    hrv_stats: if with_stats {
                        stats::hrv_statistics(&entry.samples)
                    } else {
                        None
                    },
                    physio: if with_physio {
                        physio_record(&entry.profile, &entry.samples, &entry.summary)
                    } else {
                        None
                    },
                })
                .collect();
            match output {
                Some(path) => {
                    export::json::export_json(&records, &path)?;
                    println!("{} {}", "✓ Results written to".green(), path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&records)?),
            }
        }
        "csv" => {
            if with_stats || with_physio {
                eprintln!(
                    "{}",
                    "note: --stats and --physio are omitted from csv output".dimmed()
                );
            }
            let rows: Vec<(String, BatchSummary)> = entries
                .iter()
                .map(|entry| (entry.name.clone(), entry.summary.clone()))
                .collect();
            match output {
                Some(path) => {
                    export::csv::export_batch_summaries(&rows, &path)?;
                    println!("{} {}", "✓ Results written to".green(), path.display());
                }
                None => {
                    println!("file,samples,avg_heart_rate,ti_te,breath_rate,hrv_amplitude");
                    for (name, summary) in &rows {
                        println!(
                            "{},{},{},{:.2},{},{}",
                            name,
                            summary.smoothed.len(),
                            summary.avg_heart_rate,
                            summary.ti_te,
                            summary.breath_rate,
                            summary.hrv_amplitude,
                        );
                    }
                }
            }
        }
        other => bail!("unknown output format: {} (expected table|json|csv)", other),
    }

    Ok(())
}

fn render_tables(entries: &[AnalysisEntry], with_stats: bool, with_physio: bool) -> String {
    let mut out = String::new();

    let rows: Vec<SummaryRow> = entries.iter().map(SummaryRow::from_entry).collect();
    out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
    out.push('\n');

    if with_stats {
        let rows: Vec<StatsRow> = entries.iter().filter_map(StatsRow::from_entry).collect();
        if !rows.is_empty() {
            out.push('\n');
            out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
            out.push('\n');
        }
    }

    if with_physio {
        let rows: Vec<PhysioRow> = entries.iter().filter_map(PhysioRow::from_entry).collect();
        if !rows.is_empty() {
            out.push('\n');
            out.push_str(&Table::new(rows).with(Style::rounded()).to_string());
            out.push('\n');
        }
    }

    out
}

fn cmd_stream(
    config: &AppConfig,
    file: PathBuf,
    mode: Option<String>,
    sport: Option<String>,
    at: Option<u16>,
    every: Option<usize>,
    export_path: Option<PathBuf>,
) -> Result<()> {
    let mode: FilterMode = match mode {
        Some(m) => m.parse().map_err(anyhow::Error::msg)?,
        None => config.engine.filter_mode,
    };
    let sport: Sport = match sport {
        Some(s) => s.parse().map_err(anyhow::Error::msg)?,
        None => config.settings.default_sport.unwrap_or_default(),
    };
    let at = at.or(config.engine.external_at);
    let every = every.unwrap_or(config.engine.report_every);

    // Recordings go through the regular importers; anything else is treated
    // as a captured device transport log.
    let manager = ImportManager::new();
    let samples = if manager.can_import_file(&file) {
        manager.import_file(&file)?
    } else {
        import::stream::read_replay(&file)?
    };

    println!(
        "{}",
        format!(
            "Replaying {} ({} samples, {} mode, sport {})",
            file.display(),
            samples.len(),
            mode,
            sport
        )
        .cyan()
        .bold()
    );

    let (tx, rx) = mpsc::channel::<u16>();
    let feeder = thread::spawn(move || {
        for rr in samples {
            if tx.send(rr).is_err() {
                break;
            }
        }
    });

    let mut engine = AtdsEngine::new(sport, mode);
    if at.is_some() {
        engine.set_external_at(at);
    }

    let mut outputs: Vec<SampleOutput> = Vec::new();
    let mut dropped = 0usize;
    let mut last_zone = engine.zone();
    let mut anchored = engine.at();

    for rr in rx {
        let out = match engine.process(rr) {
            Some(out) => out,
            None => {
                dropped += 1;
                continue;
            }
        };

        if anchored.is_none() {
            if let Some(at_bpm) = out.at {
                anchored = Some(at_bpm);
                println!(
                    "{} aerobic threshold anchored at {} bpm ({:.1} min)",
                    "AT".green().bold(),
                    at_bpm,
                    minutes(out.timebase_ms)
                );
            }
        }

        if out.zone != last_zone {
            println!(
                "{} {} -> {} ({:.1} min, {} bpm)",
                "zone".cyan().bold(),
                last_zone,
                out.zone,
                minutes(out.timebase_ms),
                out.heart_rate
            );
            last_zone = out.zone;
        }

        if every > 0 && (outputs.len() + 1) % every == 0 {
            println!(
                "{:>6}  rr {:>4}  filtered {:>4}  wave {:>3}  {:<6}  {:>3} bpm  {}",
                outputs.len() + 1,
                out.rr_ms,
                out.filtered_ms,
                out.waveform,
                out.phase.to_string(),
                out.heart_rate,
                out.zone
            );
        }

        outputs.push(out);
    }

    if feeder.join().is_err() {
        warn!("replay feeder thread panicked");
    }

    match outputs.last() {
        Some(last) => {
            println!();
            println!("{}", "Replay summary".green().bold());
            println!("  Samples: {} accepted, {} dropped", outputs.len(), dropped);
            println!("  Duration: {:.1} min", minutes(last.timebase_ms));
            println!("  Heart rate: {} bpm", last.heart_rate);
            println!("  Breath rate: {:.1} breaths/min", last.breath_rate);
            match last.hrv_amplitude {
                Some(amp) => println!("  HRV amplitude: {:.1} ms", amp),
                None => println!("  HRV amplitude: n/a"),
            }
            match last.ti_te {
                Some(ratio) => println!("  Ti/Te: {:.2}", ratio),
                None => println!("  Ti/Te: n/a"),
            }
            println!("  Zone: {} ({}%)", last.zone, last.zone_progress);
            match last.at {
                Some(bpm) => println!("  AT: {} bpm", bpm),
                None => println!("  AT: not anchored"),
            }
        }
        None => println!("{}", "No samples survived the spike filter".yellow()),
    }

    if let Some(path) = export_path {
        match ExportFormat::from_path(&path) {
            Some(ExportFormat::Json) => export::json::export_json(&outputs, &path)?,
            Some(ExportFormat::Text) => {
                let series: Vec<u16> = outputs.iter().map(|o| o.filtered_ms).collect();
                export::text::export_rr_series(&series, &path)?;
            }
            _ => export::csv::export_sample_series(&outputs, &path)?,
        }
        println!("{} {}", "✓ Sample series written to".green(), path.display());
    }

    Ok(())
}

fn cmd_physio(
    config: &AppConfig,
    age: Option<u8>,
    gender: Option<String>,
    resting_hr: Option<f64>,
    file: Option<PathBuf>,
) -> Result<()> {
    let profile = match file.as_deref() {
        Some(path) => profile_for(path, config),
        None => config.athlete.clone(),
    };
    let age = age.unwrap_or(profile.age);
    let gender: Gender = match gender {
        Some(g) => g.parse().map_err(anyhow::Error::msg)?,
        None => profile.gender,
    };

    match file {
        Some(path) => {
            let samples = ImportManager::new()
                .import_file(&path)
                .with_context(|| format!("failed to import {}", path.display()))?;
            let resting = match resting_hr {
                Some(bpm) => bpm,
                None => physio::resting_hr_from_series(&samples)
                    .ok_or_else(|| anyhow!("{} holds no usable intervals", path.display()))?,
            };
            let summary = batch::analyze(&samples)
                .ok_or_else(|| anyhow!("{} has fewer than 10 valid intervals", path.display()))?;
            let vo2 = physio::estimate_vo2max(age, gender, resting)
                .map(|v| (v, physio::classify_vo2max(v, age, gender)));

            print!("{}", export::text::render_report(&summary, vo2));
            println!(
                "HRV: {}   Breathing: {}",
                physio::classify_hrv_amplitude(f64::from(summary.hrv_amplitude), age),
                physio::classify_breath_rate(f64::from(summary.breath_rate))
            );
        }
        None => {
            let resting =
                resting_hr.ok_or_else(|| anyhow!("provide --resting-hr or a recording file"))?;
            let vo2 = physio::estimate_vo2max(age, gender, resting)
                .ok_or_else(|| anyhow!("resting heart rate must be positive"))?;
            let class = physio::classify_vo2max(vo2, age, gender);

            println!("{}", "VO2max estimate".green().bold());
            println!("  Age: {}  Gender: {:?}", age, gender);
            println!("  Resting HR: {:.0} bpm", resting);
            println!("  VO2max: {:.1} ml/kg/min ({})", vo2, class);
        }
    }

    Ok(())
}

fn cmd_config(action: ConfigAction, override_path: Option<&Path>) -> Result<()> {
    let path = override_path
        .map(Path::to_path_buf)
        .unwrap_or_else(AppConfig::default_config_path);

    match action {
        ConfigAction::Init => {
            let mut config = AppConfig::default();
            config.save_to_file(&path)?;
            println!("{} {}", "✓ Wrote".green(), path.display());
        }
        ConfigAction::Show => {
            let config = if path.is_file() {
                AppConfig::load_from_file(&path)?
            } else {
                AppConfig::default()
            };
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", path.display());
        }
    }

    Ok(())
}

fn physio_record(
    profile: &AthleteProfile,
    samples: &[u16],
    summary: &BatchSummary,
) -> Option<PhysioRecord> {
    let resting = physio::resting_hr_from_series(samples)?;
    let vo2 = physio::estimate_vo2max(profile.age, profile.gender, resting);
    Some(PhysioRecord {
        age: profile.age,
        gender: profile.gender,
        resting_hr_bpm: resting,
        vo2max: vo2,
        fitness_class: vo2
            .map(|v| physio::classify_vo2max(v, profile.age, profile.gender).to_string()),
        hrv_class: physio::classify_hrv_amplitude(f64::from(summary.hrv_amplitude), profile.age)
            .to_string(),
        breath_class: physio::classify_breath_rate(f64::from(summary.breath_rate)).to_string(),
    })
}

/// Athlete context for a recording: session files carry their own profile,
/// everything else analyzes against the configured athlete.
fn profile_for(path: &Path, config: &AppConfig) -> AthleteProfile {
    let atds = import::atds::AtdsImporter::new();
    if atds.can_import(path) {
        if let Ok(file) = import::atds::load_session(path) {
            return file.profile;
        }
    }
    config.athlete.clone()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn minutes(timebase_ms: u64) -> f64 {
    timebase_ms as f64 / 60_000.0
}
