use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use peptide_core::*;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "peptide")]
#[command(about = "Peptide cycle scheduler and dose reminders", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pin the clock to an RFC 3339 timestamp (e.g. 2026-01-05T08:00:00Z)
    #[arg(long, global = true)]
    now: Option<DateTime<Utc>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a schedule line without saving it
    Parse {
        /// e.g. "GHK-Cu 1mg daily for 6 weeks"
        text: String,
    },

    /// Start a new cycle from a schedule line
    Add {
        /// User the cycle belongs to
        #[arg(long)]
        user: i64,

        /// e.g. "BPC-157 500mcg twice weekly for 8 weeks"
        text: String,
    },

    /// Show schedules with remaining days and next dose
    Status {
        /// Only this user's schedules
        #[arg(long)]
        user: Option<i64>,
    },

    /// Send today's reminders, catching up any missed days first
    Run,

    /// Roll up the reminder log to CSV
    Rollup {
        /// Clean up processed logs after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    peptide_core::logging::init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());

    let clock: Box<dyn Clock> = match cli.now {
        Some(now) => Box::new(FixedClock(now)),
        None => Box::new(SystemClock),
    };

    match cli.command {
        Commands::Parse { text } => cmd_parse(&text),
        Commands::Add { user, text } => cmd_add(&data_dir, user, &text, clock.as_ref()),
        Commands::Status { user } => cmd_status(&data_dir, user, clock.as_ref()),
        Commands::Run => cmd_run(&data_dir, &config, clock.as_ref()),
        Commands::Rollup { cleanup } => cmd_rollup(&data_dir, cleanup),
    }
}

/// Parse or explain why not
fn parse_or_help(text: &str) -> Result<ScheduleIntent> {
    parse_schedule_line(text).map_err(|failure| {
        println!("{}", message::parse_help(&failure));
        Error::Parse(failure)
    })
}

fn cmd_parse(text: &str) -> Result<()> {
    let intent = parse_or_help(text)?;

    println!("Peptide:   {}", intent.peptide_name);
    println!("Dosage:    {}", intent.dosage);
    println!("Frequency: {}", intent.frequency);
    println!("Cycle:     {} days", intent.duration_days);
    Ok(())
}

fn cmd_add(data_dir: &Path, user: i64, text: &str, clock: &dyn Clock) -> Result<()> {
    let intent = parse_or_help(text)?;

    let mut store = JsonFileStore::new(data_dir);
    let schedule = store.save(&Schedule::from_intent(intent, user, clock.now()))?;

    tracing::info!(
        "Created schedule {} for user {}: {}",
        schedule.id,
        user,
        schedule.peptide_name
    );
    println!("{}", message::schedule_created(&schedule));
    Ok(())
}

fn cmd_status(data_dir: &Path, user: Option<i64>, clock: &dyn Clock) -> Result<()> {
    let store = JsonFileStore::new(data_dir);
    let today = clock.today();

    let schedules: Vec<_> = store
        .load_schedules()?
        .into_iter()
        .filter(|s| user.map_or(true, |id| s.owner_id == id))
        .collect();

    if schedules.is_empty() {
        println!("No schedules.");
        return Ok(());
    }

    for schedule in &schedules {
        println!(
            "{} {} {} (user {})",
            schedule.peptide_name, schedule.dosage, schedule.frequency, schedule.owner_id
        );
        println!(
            "  Cycle: {} days from {}, {} doses",
            schedule.duration_days,
            schedule.start_date,
            cycle::total_doses(schedule)
        );

        match schedule.completed_at {
            Some(completed) => {
                println!("  Completed on {}", completed);
                if let Some(restart) = cycle::next_restart_date(schedule) {
                    println!("  Suggested restart: {} or later", restart);
                }
            }
            None => {
                println!(
                    "  Days remaining: {}",
                    days_remaining(schedule, today)
                );
                match next_dose_from(schedule, today) {
                    Some(next) if next == today => println!("  Next dose: today"),
                    Some(next) => println!("  Next dose: {}", next),
                    None => println!("  Next dose: none, cycle ends {}", cycle::end_date(schedule)),
                }
            }
        }
        println!();
    }

    Ok(())
}

fn cmd_run(data_dir: &Path, config: &Config, clock: &dyn Clock) -> Result<()> {
    let mut store = JsonFileStore::new(data_dir);
    let log_path = data_dir.join("reminders.wal");
    let mut messenger = ConsoleMessenger;
    let mut sink = JsonlSink::new(&log_path);

    let now = clock.now();
    let max_attempts = config.reminders.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        let state = resolve_checkpoint(store.load_worker_state()?, now);
        let records = wal::read_records(&log_path)?;
        let delivered = wal::delivered_keys(&records);
        let owed = wal::owed_keys(&records, config.reminders.delivery_attempts as usize);

        let result = Dispatcher::new(&mut store, &mut messenger, &mut sink)
            .with_delivered(delivered)
            .with_owed(owed)
            .run_catch_up(state, now, config.reminders.interval());

        match result {
            Ok((state, reports)) => {
                print_summary(&reports);
                tracing::info!("Checkpoint now {}", state.last_run_at);
                return Ok(());
            }
            Err(e) if attempt < max_attempts && is_transient(&e) => {
                let wait = config.reminders.retry_backoff_secs * u64::from(attempt);
                tracing::warn!(
                    "Attempt {} of {} failed: {}. Retrying in {}s",
                    attempt,
                    max_attempts,
                    e,
                    wait
                );
                std::thread::sleep(std::time::Duration::from_secs(wait));
            }
            Err(e) => {
                tracing::error!("Reminder run failed after {} attempt(s): {}", attempt, e);
                return Err(e);
            }
        }
    }

    Ok(())
}

/// Failures worth another attempt in the same wake-up
fn is_transient(error: &Error) -> bool {
    matches!(error, Error::Io(_) | Error::Delivery(_))
}

fn print_summary(reports: &[PassReport]) {
    let doses: usize = reports.iter().map(|r| r.doses_sent).sum();
    let completions: usize = reports.iter().map(|r| r.completions).sum();
    let skipped: usize = reports.iter().map(|r| r.skipped).sum();
    let failed: usize = reports.iter().map(|r| r.failed).sum();

    let days: Vec<String> = reports
        .iter()
        .filter_map(|r| r.day)
        .map(|d| d.to_string())
        .collect();

    println!("✓ Evaluated {} day(s): {}", days.len(), days.join(", "));
    println!("  Dose reminders sent: {}", doses);
    println!("  Completions: {}", completions);
    if skipped > 0 {
        println!("  Already sent earlier: {}", skipped);
    }
    if failed > 0 {
        println!("  Not delivered (will retry): {}", failed);
    }
}

fn cmd_rollup(data_dir: &Path, cleanup: bool) -> Result<()> {
    let log_path = data_dir.join("reminders.wal");
    let csv_path = data_dir.join("reminders.csv");

    if !log_path.exists() {
        println!("No reminder log found - nothing to roll up.");
        return Ok(());
    }

    let count = csv_rollup::log_to_csv_and_archive(&log_path, &csv_path)?;

    println!("✓ Rolled up {} reminders to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        let cleaned = csv_rollup::cleanup_processed_logs(data_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed logs", cleaned);
        }
    }

    Ok(())
}
