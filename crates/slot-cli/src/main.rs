//! `slots` CLI: show the open slots of a calendar, flagged against plan calendars.
//!
//! ## Usage
//!
//! ```sh
//! # Use ~/.config/open-slots/config.toml
//! slots show
//!
//! # Everything from flags
//! slots show --primary open.ics --plan work.ics --tz Europe/Berlin
//!
//! # Only lunch and dinner slots, as JSON
//! slots show --topic lunch --topic dinner --json
//!
//! # Pin "now" for reproducible output
//! slots show --now 2026-06-01T06:00:00Z --day 2026-06-04
//!
//! # List topic names
//! slots topics
//! ```

mod config;
mod ics;
mod render;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand};
use slot_engine::{compute_schedule, RawEvent, ScheduleRequest, SourceResult, TopicRegistry};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Show open calendar slots and what they collide with"
)]
struct Cli {
    /// Config file (default: <config dir>/open-slots/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the day strip and the occurrences of the horizon
    Show(ShowArgs),
    /// List the topic names accepted by --topic
    Topics,
}

#[derive(Args)]
struct ShowArgs {
    /// Primary calendar (.ics)
    #[arg(long)]
    primary: Option<PathBuf>,
    /// Plan calendar (.ics); repeatable
    #[arg(long = "plan")]
    plans: Vec<PathBuf>,
    /// Name shown in the header
    #[arg(long)]
    name: Option<String>,
    /// Viewer's IANA time zone
    #[arg(long)]
    tz: Option<String>,
    /// Horizon length in weeks
    #[arg(long)]
    weeks: Option<u32>,
    /// Active topic; repeatable, OR-combined
    #[arg(long = "topic")]
    topics: Vec<String>,
    /// Only list this day (YYYY-MM-DD)
    #[arg(long)]
    day: Option<NaiveDate>,
    /// Evaluate as of this instant (RFC 3339) instead of the clock
    #[arg(long)]
    now: Option<DateTime<Utc>>,
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

impl ShowArgs {
    fn overrides(&self) -> Config {
        Config {
            name: self.name.clone(),
            primary: self.primary.clone(),
            plans: self.plans.clone(),
            timezone: self.tz.clone(),
            horizon_weeks: self.weeks,
            topics: self.topics.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Topics => {
            for name in TopicRegistry::standard().names() {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Show(args) => {
            let config = Config::load(cli.config.as_deref())?.merge(args.overrides());
            show(&config, &args)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn show(config: &Config, args: &ShowArgs) -> Result<()> {
    let tz = config.resolve_timezone()?;
    let Some(primary_path) = config.primary.as_deref() else {
        bail!("No primary calendar: pass --primary or set `primary` in the config file");
    };

    let primary = load_source(primary_path, &tz);
    let plans: Vec<SourceResult> = config.plans.iter().map(|p| load_source(p, &tz)).collect();

    let mut request = ScheduleRequest::new(args.now.unwrap_or_else(Utc::now), tz);
    request.horizon_weeks = config.horizon_weeks();
    request.topics = config.topics.clone();
    request.selected_day = args.day;

    let schedule = compute_schedule(&primary, &plans, &request, &TopicRegistry::standard())
        .context("Failed to compute schedule")?;

    if args.json {
        let report = render::Report {
            name: config.name.as_deref(),
            timezone: tz.name(),
            schedule: &schedule,
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize JSON")?;
        println!("{}", json);
    } else {
        println!("{}", render::header(config.name.as_deref()));
        println!();
        println!("{}", render::day_strip(&schedule));
        println!();
        if schedule.ready {
            print!("{}", render::occurrences(&schedule, args.day.and(schedule.selected_day)));
        } else {
            println!("Calendar unavailable.");
        }
    }

    for error in &schedule.source_errors {
        eprintln!("error: {} calendar: {}", error.source, error.message);
    }
    for skipped in &schedule.skipped {
        eprintln!("note: skipped {}: {}", skipped.uid, skipped.reason);
    }

    if let Some(message) = primary.error() {
        bail!("Primary calendar could not be loaded: {}", message);
    }
    Ok(())
}

/// Read and parse one calendar file; failures become a failed source.
fn load_source(path: &Path, tz: &Tz) -> SourceResult {
    match read_events(path, tz) {
        Ok(events) => {
            debug!(path = %path.display(), events = events.len(), "loaded calendar");
            SourceResult::from_events(events)
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "calendar source failed");
            SourceResult::Failed(format!("{:#}", e))
        }
    }
}

fn read_events(path: &Path, tz: &Tz) -> Result<Vec<RawEvent>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    ics::parse_events(&content, tz).with_context(|| format!("Failed to parse {}", path.display()))
}
