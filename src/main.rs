use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::path::PathBuf;
use tabled::{settings::Style, Table, Tabled};

use wavecycle::aggregation::{insights, CycleSummary, Insight};
use wavecycle::config::{AppConfig, StorageBackend};
use wavecycle::error::{ErrorSeverity, PlannerError};
use wavecycle::export::{self, ExportFormat};
use wavecycle::logging::{self, LogConfig};
use wavecycle::planner::{current_recommendation, CycleBuilder, CyclePlanner};
use wavecycle::storage::{CycleStore, JsonFileStore, SqliteStore};
use wavecycle::{Aggressiveness, CycleStatus, CycleWeek, Goal, Phase, Recommendation, TrainingCycle};

/// WaveCycle - Fatigue Wave Training Planner
///
/// Plans periodized training cycles as a wave of target fatigue levels and
/// adapts the plan from weekly completion and wellbeing reports.
#[derive(Parser)]
#[command(name = "wavecycle")]
#[command(author = "WaveCycle Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Fatigue wave training planner", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Cycle parameters shared by `new` and `preview`; unset values come from config
#[derive(clap::Args)]
struct CycleArgs {
    /// Training goal (strength, mass, endurance, peak-form)
    #[arg(short, long)]
    goal: Option<Goal>,

    /// Cycle length in weeks
    #[arg(short, long)]
    weeks: Option<u32>,

    /// Aggressiveness (conservative, moderate, aggressive)
    #[arg(short, long)]
    aggressiveness: Option<Aggressiveness>,

    /// Starting freshness, 0.0 (exhausted) to 1.0 (fully fresh)
    #[arg(short, long)]
    freshness: Option<f64>,

    /// Start date (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    start: Option<String>,

    /// Target date for peak form (YYYY-MM-DD)
    #[arg(long)]
    peak_date: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusFilter {
    Active,
    Completed,
    Upcoming,
}

#[derive(Subcommand)]
enum Commands {
    /// Create and save a new cycle
    New(CycleArgs),

    /// Show the wave a new cycle would get without saving it
    Preview(CycleArgs),

    /// List saved cycles
    List {
        /// Only show cycles with this status
        #[arg(short, long, value_enum)]
        status: Option<StatusFilter>,
    },

    /// Show a cycle's weeks
    Show {
        /// Cycle id or unique id prefix
        id: String,
    },

    /// Log a week's plan completion and wellbeing
    Log {
        /// Cycle id or unique id prefix
        id: String,

        /// Week number (1-based)
        #[arg(short, long)]
        week: u32,

        /// Percent of the plan completed (0-100)
        #[arg(short, long)]
        completion: f64,

        /// Wellbeing (1-5)
        #[arg(short = 'b', long)]
        wellbeing: u8,
    },

    /// Summarize logged weeks per cycle and draw insights across finished cycles
    Analyze,

    /// Recommendation for the current week
    Recommend {
        /// Cycle id or prefix; defaults to the active cycle
        id: Option<String>,
    },

    /// Export a cycle
    Export {
        /// Cycle id or unique id prefix
        id: String,

        /// Output file path
        #[arg(short, long)]
        output: PathBuf,

        /// Export format (csv, json)
        #[arg(short = 'f', long, default_value = "csv")]
        format: String,
    },

    /// Delete a cycle
    Delete {
        /// Cycle id or unique id prefix
        id: String,
    },

    /// Back up the cycle file
    Backup,

    /// Restore cycles from a backup file
    Restore {
        /// Backup file path
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(cli.config.as_deref())?;

    let log_config = LogConfig {
        level: config.logging.level.raised_by(cli.verbose),
        ..config.logging.clone()
    };
    logging::init_logging(&log_config)?;

    if cli.verbose > 0 {
        eprintln!("{}", format!("Log level: {:?}", log_config.level).dimmed());
    }

    let store: Box<dyn CycleStore> = match config.storage.backend {
        StorageBackend::Json => Box::new(JsonFileStore::new(config.storage.json_path())),
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(&config.storage.data_dir).with_context(|| {
                format!("Failed to create {}", config.storage.data_dir.display())
            })?;
            Box::new(SqliteStore::open(config.storage.sqlite_path())?)
        }
    };
    let mut planner = CyclePlanner::load(store)?;

    if let Err(e) = run(&mut planner, &config, cli.command) {
        if let Some(planner_error) = e.downcast_ref::<PlannerError>() {
            match planner_error.severity() {
                ErrorSeverity::Warning => tracing::warn!(error = %planner_error, "command rejected"),
                ErrorSeverity::Error => tracing::error!(error = %planner_error, "command failed"),
            }
            eprintln!("{} {}", "✗".red(), planner_error.user_message());
            std::process::exit(1);
        }
        return Err(e);
    }

    Ok(())
}

fn json_store(config: &AppConfig) -> Result<JsonFileStore> {
    if config.storage.backend != StorageBackend::Json {
        bail!("Backup and restore work on the json storage backend only");
    }
    Ok(JsonFileStore::new(config.storage.json_path()))
}

fn run<S: CycleStore>(
    planner: &mut CyclePlanner<S>,
    config: &AppConfig,
    command: Commands,
) -> Result<()> {
    let now = Utc::now();

    match command {
        Commands::Preview(args) => {
            let builder = builder_from_args(config, &args)?;
            let weeks = builder.preview()?;
            println!(
                "{}",
                format!("{} wave, {} weeks", builder.goal, weeks.len()).cyan().bold()
            );
            print_weeks(&weeks);
        }

        Commands::New(args) => {
            let cycle = builder_from_args(config, &args)?.build()?;
            println!("{}", "Creating training cycle...".green().bold());
            print_cycle_summary(&cycle, now);
            print_weeks(cycle.weeks());
            let id = planner.add_cycle(cycle)?;
            println!("{} {}", "✓ Cycle saved:".green(), id);
        }

        Commands::List { status } => {
            let cycles: Vec<&TrainingCycle> = match status {
                None => planner.cycles().iter().collect(),
                Some(StatusFilter::Active) => planner.active_cycles(now),
                Some(StatusFilter::Completed) => planner.completed_cycles(now),
                Some(StatusFilter::Upcoming) => planner.upcoming_cycles(now),
            };
            if cycles.is_empty() {
                println!("{}", "No cycles found".yellow());
                return Ok(());
            }
            let rows: Vec<CycleRow> = cycles.iter().map(|c| CycleRow::new(c, now)).collect();
            println!("{}", Table::new(rows).with(Style::rounded()));
        }

        Commands::Show { id } => {
            let cycle = planner.find(&id)?;
            print_cycle_summary(cycle, now);
            print_weeks(cycle.weeks());
        }

        Commands::Log {
            id,
            week,
            completion,
            wellbeing,
        } => {
            let cycle_id = planner.find(&id)?.id;
            let week_index = week
                .checked_sub(1)
                .context("Week numbers start at 1")? as usize;
            let outcome = planner.log_week(cycle_id, week_index, completion, wellbeing)?;

            println!("{}", format!("✓ Week {} logged", week).green().bold());
            println!("  Actual fatigue: {:.3}", outcome.actual_fatigue);
            if let Some(next) = outcome.next_target {
                println!("  Next week target: {:.3}", next);
            }
            if let Some(cycle) = planner.get(cycle_id) {
                let Some(current) = cycle.week(week_index) else {
                    return Ok(());
                };
                let previous = week_index.checked_sub(1).and_then(|i| cycle.week(i));
                let recommendation = wavecycle::recommend(
                    current,
                    previous,
                    current.plan_completion,
                    current.wellbeing,
                );
                print_recommendation(&recommendation);
            }
        }

        Commands::Recommend { id } => {
            let cycle = match id {
                Some(id) => planner.find(&id)?,
                None => match planner.active_cycle(now) {
                    Some(cycle) => cycle,
                    None => {
                        println!("{}", "No active cycle".yellow());
                        return Ok(());
                    }
                },
            };
            print_recommendation(&current_recommendation(cycle, now));
        }

        Commands::Analyze => {
            if planner.cycles().is_empty() {
                println!("{}", "No cycles found".yellow());
                return Ok(());
            }
            let rows: Vec<SummaryRow> = planner
                .cycles()
                .iter()
                .map(|c| SummaryRow::from(CycleSummary::of(c)))
                .collect();
            println!("{}", Table::new(rows).with(Style::rounded()));

            println!("{}", "Insights".cyan().bold());
            for insight in insights(planner.cycles(), now) {
                let text = format!("  • {}", insight);
                match insight {
                    Insight::ConsecutiveDeloads { .. } => println!("{}", text.yellow()),
                    Insight::ConsistentCompletion { .. } => println!("{}", text.green()),
                    Insight::NeedMoreCycles { .. } | Insight::KeepTraining => {
                        println!("{}", text.dimmed())
                    }
                }
            }
        }

        Commands::Export { id, output, format } => {
            let format: ExportFormat = format.parse()?;
            let cycle = planner.find(&id)?;
            export::export_cycle(cycle, format, &output)?;
            println!("{} {}", "✓ Exported to".yellow(), output.display());
        }

        Commands::Delete { id } => {
            let cycle_id = planner.find(&id)?.id;
            planner.delete_cycle(cycle_id)?;
            println!("{} {}", "✓ Deleted".green(), cycle_id);
        }

        Commands::Backup => {
            let store = json_store(config)?;
            match store.create_backup(&config.storage.backup_dir)? {
                Some(path) => println!("{} {}", "✓ Backup written to".green(), path.display()),
                None => println!("{}", "Nothing to back up".yellow()),
            }
        }

        Commands::Restore { file } => {
            let mut store = json_store(config)?;
            let count = store.restore_from_backup(&file)?;
            planner.reload()?;
            println!("{}", format!("✓ Restored {} cycles", count).green());
        }
    }

    Ok(())
}

fn builder_from_args(config: &AppConfig, args: &CycleArgs) -> Result<CycleBuilder> {
    let mut builder = config.defaults.builder();
    if let Some(goal) = args.goal {
        builder = builder.goal(goal);
    }
    if let Some(weeks) = args.weeks {
        builder = builder.weeks(weeks);
    }
    if let Some(aggressiveness) = args.aggressiveness {
        builder = builder.aggressiveness(aggressiveness);
    }
    if let Some(freshness) = args.freshness {
        builder = builder.initial_freshness(freshness);
    }
    if let Some(start) = &args.start {
        builder = builder.start_date(parse_date(start)?);
    }
    if let Some(peak) = &args.peak_date {
        builder = builder.peak_form_date(Some(parse_date(peak)?));
    }
    Ok(builder)
}

fn parse_date(value: &str) -> Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", value))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .with_context(|| format!("Invalid date '{}'", value))?;
    Ok(Utc.from_utc_datetime(&midnight))
}

fn print_cycle_summary(cycle: &TrainingCycle, now: DateTime<Utc>) {
    println!("  Id: {}", cycle.id);
    println!("  Goal: {}", cycle.goal.display_name());
    println!("  Duration: {}", cycle.duration());
    println!("  Aggressiveness: {}", cycle.aggressiveness);
    let end = cycle
        .end_date()
        .map_or_else(|_| "-".to_string(), |end| end.format("%Y-%m-%d").to_string());
    println!("  Dates: {} - {}", cycle.start_date.format("%Y-%m-%d"), end);
    let status = match cycle.status_at(now) {
        CycleStatus::Active => "Active".green(),
        CycleStatus::Upcoming => "Upcoming".blue(),
        CycleStatus::Completed => "Completed".dimmed(),
    };
    println!("  Status: {}", status);
    if let Some(week) = cycle.current_week_at(now) {
        println!("  Current week: {}", week);
    }
}

fn print_weeks(weeks: &[CycleWeek]) {
    let rows: Vec<WeekRow> = weeks.iter().map(WeekRow::from).collect();
    println!("{}", Table::new(rows).with(Style::rounded()));
}

fn print_recommendation(recommendation: &Recommendation) {
    let text = recommendation.to_string();
    let styled = match recommendation {
        Recommendation::WaveBreaking => text.red().bold(),
        Recommendation::MonitorRecovery => text.yellow(),
        Recommendation::Excellent => text.green(),
        Recommendation::Deload { .. } => text.blue(),
        Recommendation::PeakLoad { .. } => text.magenta(),
        Recommendation::NotStarted | Recommendation::CompleteWeekFirst => text.dimmed(),
    };
    println!("{}", styled);
}

fn optional<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

#[derive(Tabled)]
struct CycleRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Goal")]
    goal: String,
    #[tabled(rename = "Weeks")]
    weeks: u32,
    #[tabled(rename = "Start")]
    start: String,
    #[tabled(rename = "Status")]
    status: CycleStatus,
    #[tabled(rename = "Current")]
    current_week: String,
}

impl CycleRow {
    fn new(cycle: &TrainingCycle, now: DateTime<Utc>) -> Self {
        let id = cycle.id.to_string();
        Self {
            id: id.chars().take(8).collect(),
            goal: cycle.goal.display_name().to_string(),
            weeks: cycle.duration().weeks(),
            start: cycle.start_date.format("%Y-%m-%d").to_string(),
            status: cycle.status_at(now),
            current_week: optional(cycle.current_week_at(now)),
        }
    }
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Goal")]
    goal: String,
    #[tabled(rename = "Logged")]
    logged: String,
    #[tabled(rename = "Avg completion %")]
    completion: String,
    #[tabled(rename = "Avg wellbeing")]
    wellbeing: String,
    #[tabled(rename = "Mean target")]
    target: String,
    #[tabled(rename = "Mean actual")]
    actual: String,
}

impl From<CycleSummary> for SummaryRow {
    fn from(summary: CycleSummary) -> Self {
        Self {
            id: summary.cycle_id.to_string().chars().take(8).collect(),
            goal: summary.goal.display_name().to_string(),
            logged: format!("{}/{}", summary.logged_weeks, summary.weeks),
            completion: optional(summary.average_completion.map(|c| format!("{:.1}", c))),
            wellbeing: optional(summary.average_wellbeing.map(|w| format!("{:.1}", w))),
            target: format!("{:.3}", summary.mean_target_fatigue),
            actual: optional(summary.mean_actual_fatigue.map(|f| format!("{:.3}", f))),
        }
    }
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: u32,
    #[tabled(rename = "Phase")]
    phase: Phase,
    #[tabled(rename = "Target")]
    target: String,
    #[tabled(rename = "Actual")]
    actual: String,
    #[tabled(rename = "Completion %")]
    completion: String,
    #[tabled(rename = "Wellbeing")]
    wellbeing: String,
    #[tabled(rename = "Volume")]
    volume: String,
}

impl From<&CycleWeek> for WeekRow {
    fn from(week: &CycleWeek) -> Self {
        Self {
            week: week.week_number,
            phase: week.phase,
            target: format!("{:.3}", week.target_fatigue),
            actual: optional(week.actual_fatigue.map(|f| format!("{:.3}", f))),
            completion: optional(week.plan_completion.map(|c| format!("{:.0}", c))),
            wellbeing: optional(week.wellbeing),
            volume: optional(week.metrics.total_volume.map(|v| format!("{:.0}", v))),
        }
    }
}
