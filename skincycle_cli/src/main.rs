mod style;

use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use skincycle_core::cycle::derive_cycle_state;
use skincycle_core::registry::load_rule_book;
use skincycle_core::weather::derive_weather_context;
use skincycle_core::*;
use std::path::{Path, PathBuf};

const ROUTINE_FILES: [&str; 2] = ["routine.json", "routine.csv"];
const RULES_DIR: &str = "rules";
const SNAPSHOT_LOG: &str = "snapshots.wal";
const EXPORT_FILE: &str = "snapshots.csv";

#[derive(Parser)]
#[command(name = "skincycle")]
#[command(about = "Cycle and weather aware skincare routine planner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's adapted routine (default)
    Snapshot {
        /// Plan for this date (YYYY-MM-DD) instead of today
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,

        /// Append the snapshot to the snapshot log
        #[arg(long)]
        log: bool,
    },

    /// Show cycle day, phase and phase progress
    Phase {
        /// Date to look up (YYYY-MM-DD) instead of today
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Show the weather context for the stored reading
    Weather {
        #[command(subcommand)]
        action: Option<WeatherAction>,
    },

    /// Save the cycle profile
    Profile {
        /// First day of the most recent period (YYYY-MM-DD)
        #[arg(long)]
        last_period: NaiveDate,

        /// Average cycle length in days
        #[arg(long, default_value_t = 28)]
        cycle_length: i32,

        /// Period length in days
        #[arg(long, default_value_t = 5)]
        period_length: i32,
    },

    /// Manage rule sets
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },

    /// Export the snapshot log to CSV
    Export {
        /// CSV file to write (defaults to snapshots.csv in the data directory)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum WeatherAction {
    /// Store a new reading, timestamped now
    Record {
        #[arg(long)]
        uv: u32,

        /// Relative humidity in percent
        #[arg(long)]
        humidity: f64,

        /// Wind speed in km/h
        #[arg(long, default_value_t = 0.0)]
        wind: f64,

        /// Temperature in °C
        #[arg(long, allow_negative_numbers = true)]
        temperature: f64,

        #[arg(long)]
        snow: bool,

        #[arg(long)]
        condition: Option<String>,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// Validate the built-in rules and any rule files in the data directory
    Validate,
}

fn main() -> Result<()> {
    skincycle_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    tracing::debug!("Using data directory {:?}", data_dir);

    match cli.command {
        Some(Commands::Snapshot { date, json, log }) => {
            cmd_snapshot(&data_dir, &config, date, json, log)
        }
        Some(Commands::Phase { date }) => cmd_phase(&data_dir, date),
        Some(Commands::Weather { action: None }) => cmd_weather(&data_dir, &config),
        Some(Commands::Weather {
            action:
                Some(WeatherAction::Record {
                    uv,
                    humidity,
                    wind,
                    temperature,
                    snow,
                    condition,
                }),
        }) => {
            let reading = WeatherReading {
                uv_index: uv,
                humidity,
                wind_speed_kmh: wind,
                temperature_c: temperature,
                has_snow: snow,
                timestamp: Utc::now(),
                condition,
            };
            cmd_weather_record(&data_dir, &config, reading)
        }
        Some(Commands::Profile {
            last_period,
            cycle_length,
            period_length,
        }) => {
            let profile = CycleProfile {
                last_period_start_date: last_period,
                average_cycle_length: cycle_length,
                period_length,
            };
            cmd_profile(&data_dir, profile)
        }
        Some(Commands::Rules {
            action: RulesAction::Validate,
        }) => cmd_rules_validate(&data_dir),
        Some(Commands::Export { out }) => cmd_export(&data_dir, out),
        None => cmd_snapshot(&data_dir, &config, None, false, false),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn find_routine(data_dir: &Path) -> Result<PathBuf> {
    ROUTINE_FILES
        .iter()
        .map(|name| data_dir.join(name))
        .find(|path| path.exists())
        .ok_or_else(|| {
            Error::Routine(format!(
                "No routine found in {}; add routine.json or routine.csv",
                data_dir.display()
            ))
        })
}

fn cmd_snapshot(
    data_dir: &Path,
    config: &Config,
    date: Option<NaiveDate>,
    json: bool,
    log: bool,
) -> Result<()> {
    let routine = load_routine(&find_routine(data_dir)?)?;

    let registry = RuleSetRegistry::default();
    if let Err(e) = registry.reload_from_dir(&data_dir.join(RULES_DIR)) {
        tracing::warn!("Ignoring rule files, using built-in rules: {}", e);
        eprintln!("⚠ Rule files ignored ({}); run `skincycle rules validate`", e);
    }

    let store = ProfileStore::new(data_dir);
    let planner = DailyPlanner {
        cycle: &store,
        weather: &store,
        attachments: &store,
        registry: &registry,
        settings: PlannerSettings::from(config),
    };

    let now = Utc::now();
    let plan = planner.plan(&routine, date.unwrap_or_else(today), now);

    if json {
        println!("{}", serde_json::to_string_pretty(&plan.snapshot)?);
    } else {
        display_plan(&routine, &plan);
    }

    if log {
        let mut sink = JsonlSink::new(data_dir.join(SNAPSHOT_LOG));
        sink.append(&SnapshotRecord::new(plan.snapshot, now))?;
        if !json {
            println!("\n✓ Snapshot logged");
        }
    }

    Ok(())
}

fn cmd_phase(data_dir: &Path, date: Option<NaiveDate>) -> Result<()> {
    let store = ProfileStore::new(data_dir);
    let profile = store.load_profile()?.ok_or_else(|| {
        Error::Profile("No cycle profile saved; run `skincycle profile` first".into())
    })?;

    let date = date.unwrap_or_else(today);
    let state = derive_cycle_state(&profile, date);

    println!(
        "{} Day {} of {} ({})",
        style::phase_glyph(state.phase),
        state.day_in_cycle,
        profile.effective_cycle_length(),
        date
    );
    println!("  Phase: {}", state.phase);
    println!("  Progress: {}", style::progress_bar(state.progress, 20));
    Ok(())
}

fn cmd_weather(data_dir: &Path, config: &Config) -> Result<()> {
    let store = ProfileStore::new(data_dir);
    let Some(reading) = store.load_weather()? else {
        println!("No weather reading stored.");
        return Ok(());
    };

    let ctx = derive_weather_context(&reading, Utc::now(), config.weather.stale_after_seconds);

    println!(
        "UV {} ({}), {:.0}% humidity, {:.0} km/h wind, {:.1}°C",
        reading.uv_index,
        style::uv_label(ctx.uv_level),
        reading.humidity,
        reading.wind_speed_kmh,
        reading.temperature_c
    );
    if let Some(ref condition) = reading.condition {
        println!("  {}", condition);
    }
    if ctx.is_stale {
        println!(
            "  ⚠ Reading is stale (taken {})",
            reading.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M")
        );
    }

    let tokens: Vec<&str> = ctx.tokens.iter().map(|t| t.as_str()).collect();
    println!("  Contexts: {}", tokens.join(", "));
    println!();

    let rec = &ctx.recommendation;
    println!("  Sunscreen: {}", rec.spf_level);
    if let Some(ref texture) = rec.texture_adjustment {
        println!("  Texture: {}", texture);
    }
    for warning in &rec.warnings {
        println!("  ⚠ {}", warning);
    }
    for tip in &rec.tips {
        println!("  → {}", tip);
    }
    Ok(())
}

fn cmd_weather_record(data_dir: &Path, config: &Config, reading: WeatherReading) -> Result<()> {
    let store = ProfileStore::new(data_dir);
    store.save_weather(&reading)?;
    println!("✓ Weather reading saved");
    cmd_weather(data_dir, config)
}

fn cmd_profile(data_dir: &Path, profile: CycleProfile) -> Result<()> {
    let store = ProfileStore::new(data_dir);
    store.save_profile(&profile)?;

    let state = derive_cycle_state(&profile, today());
    println!("✓ Cycle profile saved");
    println!("  Today is day {} ({})", state.day_in_cycle, state.phase);
    Ok(())
}

fn cmd_rules_validate(data_dir: &Path) -> Result<()> {
    let rules_dir = data_dir.join(RULES_DIR);
    let book = load_rule_book(&rules_dir)?;

    for set in book.sets.values() {
        println!(
            "  {} v{}: {} rules, {} briefings",
            set.adaptation_type,
            set.version,
            set.rules.len(),
            set.briefings.len()
        );
    }

    let errors = book.validate();
    if !errors.is_empty() {
        eprintln!("Rule set validation errors:");
        for error in &errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::RuleSetValidation(format!(
            "{} problem(s) found",
            errors.len()
        )));
    }

    println!("✓ Rule sets are valid");
    Ok(())
}

fn cmd_export(data_dir: &Path, out: Option<PathBuf>) -> Result<()> {
    let log_path = data_dir.join(SNAPSHOT_LOG);
    let csv_path = out.unwrap_or_else(|| data_dir.join(EXPORT_FILE));

    if !log_path.exists() {
        println!("No snapshot log found - nothing to export.");
        return Ok(());
    }

    let rows = export_csv(&log_path, &csv_path)?;
    println!("✓ Exported {} rows to CSV", rows);
    println!("  CSV: {}", csv_path.display());
    Ok(())
}

fn display_plan(routine: &BaseRoutine, plan: &DailyPlan) {
    let snapshot = &plan.snapshot;

    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {} · {}", routine.name, snapshot.date);
    println!("╰─────────────────────────────────────────╯");

    if let Some(state) = plan.cycle {
        println!(
            "  {} Day {} · {}",
            style::phase_glyph(state.phase),
            state.day_in_cycle,
            state.phase
        );
    }
    if let Some(ref weather) = plan.weather {
        let stale = if weather.is_stale { " (stale)" } else { "" };
        println!(
            "  ☀ UV {} · {}{}",
            style::uv_label(weather.uv_level),
            weather.recommendation.spf_level,
            stale
        );
    }

    if let Some(ref briefing) = snapshot.briefing {
        println!();
        println!("  {}", briefing.title);
        if !briefing.summary.is_empty() {
            println!("  {}", briefing.summary);
        }
        for tip in &briefing.tips {
            println!("  → {}", tip);
        }
    }

    for time_of_day in [TimeOfDay::Morning, TimeOfDay::Evening, TimeOfDay::Weekly] {
        let steps = snapshot.section(time_of_day);
        if steps.is_empty() {
            continue;
        }
        println!();
        println!("  {}", time_of_day.to_string().to_uppercase());
        for step in steps {
            let look = style::emphasis_style(step.emphasis);
            if look.label.is_empty() {
                println!("  {} {}", look.glyph, step.guidance_text);
            } else {
                println!("  {} {} ({})", look.glyph, step.guidance_text, look.label);
            }
            for warning in &step.warnings {
                println!("      ⚠ {}", warning);
            }
        }
    }
    println!();
}
