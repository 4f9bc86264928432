mod cache;
mod config;
mod render;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use routeboard_core::period::{day_range, month_range, DateRange};
use routeboard_core::{
    build_timeline, calculate_efficiency_stats, route_points, CsvSource, EfficiencyReport,
    SqliteSource, VisitRecord, VisitSource,
};
use serde::Serialize;

use crate::cache::{fetch_cached, FetchCache};
use crate::config::Settings;

const DEFAULT_TIMELINE_WIDTH: u16 = 56;

#[derive(Parser)]
#[command(name = "routeboard")]
#[command(author, version, about = "Field technician route efficiency dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    data: DataArgs,

    #[arg(long, global = true, help = "Enable debug logging")]
    debug: bool,
}

#[derive(Args)]
struct DataArgs {
    #[arg(
        long,
        global = true,
        value_parser = parse_date,
        help = "Day to report on (YYYY-MM-DD, default: today)"
    )]
    date: Option<NaiveDate>,

    #[arg(long, global = true, help = "SQLite database to query")]
    db: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        conflicts_with = "db",
        help = "Read visits from a CSV export instead of the database"
    )]
    input: Option<PathBuf>,

    #[arg(long, global = true, help = "Bypass the fetch cache")]
    no_cache: bool,

    #[arg(long, global = true, help = "Disable spinner")]
    no_spinner: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Show efficiency per technician for one day")]
    Daily {
        #[arg(long, help = "Output as JSON")]
        json: bool,
        #[arg(long, help = "Show processing time")]
        benchmark: bool,
        #[arg(long, help = "List the fetched visit rows instead of the report")]
        raw: bool,
    },
    #[command(about = "Show efficiency per technician for the month containing --date")]
    Monthly {
        #[arg(long, help = "Output as JSON")]
        json: bool,
        #[arg(long, help = "Show processing time")]
        benchmark: bool,
        #[arg(long, help = "List the fetched visit rows instead of the report")]
        raw: bool,
    },
    #[command(about = "Show the activity timeline for one day")]
    Timeline {
        #[arg(long, help = "Output as JSON")]
        json: bool,
        #[arg(long, help = "Follow the data instead of the display window")]
        no_clip: bool,
        #[arg(
            long,
            default_value_t = DEFAULT_TIMELINE_WIDTH,
            value_parser = clap::value_parser!(u16).range(10..=240),
            help = "Timeline width in columns"
        )]
        width: u16,
    },
    #[command(about = "List visit locations in route order for one day")]
    Route {
        #[arg(long, help = "Output as JSON")]
        json: bool,
    },
    #[command(about = "Test the database connection")]
    Check,
}

fn parse_date(value: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{value}' (expected YYYY-MM-DD)"))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let settings = Settings::load()?;
    let date = cli.data.date.unwrap_or_else(|| Local::now().date_naive());

    match cli.command {
        Some(Commands::Daily {
            json,
            benchmark,
            raw,
        }) => {
            let range = day_range(date);
            if raw {
                run_raw(&settings, &cli.data, range, json)
            } else {
                run_period_report(&settings, &cli.data, range, json, benchmark)
            }
        }
        Some(Commands::Monthly {
            json,
            benchmark,
            raw,
        }) => {
            let range = month_range(date);
            if raw {
                run_raw(&settings, &cli.data, range, json)
            } else {
                run_period_report(&settings, &cli.data, range, json, benchmark)
            }
        }
        Some(Commands::Timeline {
            json,
            no_clip,
            width,
        }) => run_timeline(&settings, &cli.data, date, json, no_clip, width),
        Some(Commands::Route { json }) => run_route(&settings, &cli.data, date, json),
        Some(Commands::Check) => run_check(&settings, &cli.data),
        None => run_dashboard(&settings, &cli.data, date),
    }
}

fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

enum DataSource {
    Csv(CsvSource),
    Database(SqliteSource),
}

impl DataSource {
    fn as_source(&self) -> &dyn VisitSource {
        match self {
            DataSource::Csv(source) => source as &dyn VisitSource,
            DataSource::Database(source) => source as &dyn VisitSource,
        }
    }
}

fn database_path(settings: &Settings, data: &DataArgs) -> Result<PathBuf> {
    data.db
        .clone()
        .or_else(|| settings.database.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No database configured; pass --db or set ROUTEBOARD_DATABASE")
        })
}

fn build_source(settings: &Settings, data: &DataArgs) -> Result<DataSource> {
    if let Some(path) = &data.input {
        return Ok(DataSource::Csv(CsvSource::new(path.clone())));
    }
    let database = database_path(settings, data)?;
    let query = settings.timeline_query()?;
    Ok(DataSource::Database(SqliteSource::new(database, query)))
}

fn spinner(no_spinner: bool, message: String) -> Option<ProgressBar> {
    if no_spinner {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner());
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Some(pb)
}

/// Fetch the visits for `range`. Only database fetches go through the cache;
/// CSV exports are re-read every time.
fn load_visits(
    settings: &Settings,
    data: &DataArgs,
    range: DateRange,
) -> Result<Vec<VisitRecord>> {
    let source = build_source(settings, data)?;
    let cache = match source {
        DataSource::Database(_) if !data.no_cache => FetchCache::default_location(),
        _ => None,
    };

    let pb = spinner(data.no_spinner, format!("Fetching visits for {range}..."));
    let result = fetch_cached(source.as_source(), range, cache.as_ref());
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let visits = result?;
    tracing::debug!(rows = visits.len(), %range, "fetched visits");
    Ok(visits)
}

fn compute_report(
    settings: &Settings,
    data: &DataArgs,
    range: DateRange,
) -> Result<(Vec<VisitRecord>, EfficiencyReport)> {
    let config = settings.efficiency_config()?;
    let visits = load_visits(settings, data, range)?;
    let report = calculate_efficiency_stats(&visits, &config)?;
    Ok((visits, report))
}

fn run_period_report(
    settings: &Settings,
    data: &DataArgs,
    range: DateRange,
    json: bool,
    benchmark: bool,
) -> Result<()> {
    let start = Instant::now();
    let (_, report) = compute_report(settings, data, range)?;
    let processing_time_ms = start.elapsed().as_millis();

    if json {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct PeriodReportJson<'a> {
            start: NaiveDate,
            end: NaiveDate,
            global: routeboard_core::GlobalPercentages,
            technicians: &'a [routeboard_core::TechnicianStat],
            daily: &'a [routeboard_core::DailyStat],
        }

        let output = PeriodReportJson {
            start: range.start,
            end: range.end,
            global: report.global,
            technicians: &report.technicians,
            daily: &report.daily,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let heading = if range.days() == 1 {
        format!("Daily Summary - {}", range.start)
    } else {
        format!("Performance Summary - {}", range.start.format("%B %Y"))
    };

    if report.is_empty() {
        println!("\n  {}", heading.bold());
        println!("{}", format!("  No data for {range}").yellow());
    } else {
        render::print_summary_cards(&heading, &report.global);
        println!("\n{}", render::technician_table(&report.technicians));
    }

    if benchmark {
        println!(
            "{}",
            format!("  Processing time: {processing_time_ms}ms").bright_black()
        );
    }
    Ok(())
}

fn run_raw(settings: &Settings, data: &DataArgs, range: DateRange, json: bool) -> Result<()> {
    let visits = load_visits(settings, data, range)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&visits)?);
        return Ok(());
    }

    println!("\n  {}", format!("Raw Data - {range}").bold());
    if visits.is_empty() {
        println!("{}", format!("  No data for {range}").yellow());
    } else {
        println!("{}", render::visit_table(&visits));
        println!("{}", format!("  {} rows", visits.len()).bright_black());
    }
    Ok(())
}

fn run_timeline(
    settings: &Settings,
    data: &DataArgs,
    date: NaiveDate,
    json: bool,
    no_clip: bool,
    width: u16,
) -> Result<()> {
    let mut display = settings.display_window()?;
    if no_clip {
        display.clip = false;
    }
    let (_, report) = compute_report(settings, data, day_range(date))?;
    let timeline = build_timeline(&report.intervals, date, &display);

    if json {
        println!("{}", serde_json::to_string_pretty(&timeline)?);
        return Ok(());
    }

    println!("\n  {}", format!("Timeline - {date}").bold());
    match timeline {
        Some(timeline) => render::print_timeline(&timeline, usize::from(width)),
        None => println!("{}", format!("  No activity to display for {date}").yellow()),
    }
    Ok(())
}

fn run_route(settings: &Settings, data: &DataArgs, date: NaiveDate, json: bool) -> Result<()> {
    let (visits, report) = compute_report(settings, data, day_range(date))?;
    let points = route_points(&visits, &report.valid_technicians);

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    println!("\n  {}", format!("Routes - {date}").bold());
    if points.is_empty() {
        println!("{}", format!("  No locations available for {date}").yellow());
    } else {
        println!("{}", render::route_table(&points));
    }
    Ok(())
}

fn run_check(settings: &Settings, data: &DataArgs) -> Result<()> {
    let database = database_path(settings, data)?;
    println!("  Testing database connection...");

    let rows = routeboard_core::source::check_connection(&database, settings.test_query())
        .context("Database connection failed")?;

    println!(
        "{}",
        format!("  ✓ Connected to {} ({} rows)", database.display(), rows.len()).green()
    );
    if let Some(first) = rows.first() {
        println!("{}", format!("  {}", first.join(" | ")).bright_black());
    }
    Ok(())
}

fn run_dashboard(settings: &Settings, data: &DataArgs, date: NaiveDate) -> Result<()> {
    let display = settings.display_window()?;

    println!("\n  {}", settings.title.bold().underline());

    let month = month_range(date);
    let (_, monthly) = compute_report(settings, data, month)?;
    let heading = format!("Performance Summary - {}", date.format("%B %Y"));
    if monthly.is_empty() {
        println!("\n  {}", heading.bold());
        println!("{}", "  No monthly data available for this period.".yellow());
    } else {
        render::print_summary_cards(&heading, &monthly.global);
    }

    let (visits, daily) = compute_report(settings, data, day_range(date))?;
    let heading = format!("Daily Summary - {date}");
    if daily.is_empty() {
        println!("\n  {}", heading.bold());
        println!("{}", format!("  No daily data for {date}").yellow());
        return Ok(());
    }
    render::print_summary_cards(&heading, &daily.global);

    if let Some(timeline) = build_timeline(&daily.intervals, date, &display) {
        println!("\n  {}", "Timeline".bold());
        render::print_timeline(&timeline, usize::from(DEFAULT_TIMELINE_WIDTH));
    }

    println!("\n  {}", "Optimizable Time by Technician".bold());
    println!("{}", render::technician_table(&daily.technicians));

    let points = route_points(&visits, &daily.valid_technicians);
    if !points.is_empty() {
        println!("\n  {}", "Routes".bold());
        println!("{}", render::route_table(&points));
    }
    Ok(())
}
