#![forbid(unsafe_code)]

mod cmd;
mod output;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use tally_core::config;
use tally_core::engine::{Engine, EngineOptions};
use tally_core::lock::DataDirLock;
use tally_core::publish::LogPublisher;
use tally_core::store::SqliteStore;
use tally_core::{ErrorCode, SystemClock};

use output::OutputMode;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "tally: daily puzzle streak and achievement tracker",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Override the data directory.
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Lifecycle",
        about = "Initialize the tally data directory",
        after_help = "EXAMPLES:\n    # Initialize with defaults\n    tally init\n\n    # Initialize somewhere specific\n    tally --data-dir ~/puzzles init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Record",
        about = "Record a puzzle result",
        long_about = "Record one completion event. Validation and duplicate \
                      detection run before anything is stored.",
        after_help = "EXAMPLES:\n    # A gridword solved in 4 guesses\n    tally submit gridword --score 4 --puzzle 1234\n\n    # A hard sudoku, no hints, played yesterday\n    tally submit sudoku --score 0 --max-attempts 3 --puzzle 55 --difficulty hard --date 2026-08-05\n\n    # A failed attempt (breaks the streak)\n    tally submit gridword --failed --puzzle 1235"
    )]
    Submit(cmd::submit::SubmitArgs),

    #[command(next_help_heading = "Read", about = "Show streaks per game")]
    Stats(cmd::stats::StatsArgs),

    #[command(next_help_heading = "Read", about = "Show achievement progress")]
    Achievements(cmd::achievements::AchievementsArgs),

    #[command(
        next_help_heading = "Bulk",
        about = "Import events from a JSON export",
        long_about = "Import completion events in bulk. Invalid rows are \
                      skipped, duplicates are counted, and every aggregate is \
                      rebuilt from the merged log afterwards."
    )]
    Import(cmd::import::ImportArgs),

    #[command(next_help_heading = "Bulk", about = "Export the event log as JSON")]
    Export(cmd::export::ExportArgs),

    #[command(
        next_help_heading = "Bulk",
        about = "Delete one event by id",
        long_about = "Delete a completion event. The event log is replayed \
                      afterwards, so streaks and achievement counters reflect \
                      the deletion (unlocked tiers stay unlocked)."
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Rebuild every projection from the event log"
    )]
    Rebuild,

    #[command(
        next_help_heading = "Maintenance",
        about = "Break streaks that went stale while the app was closed"
    )]
    Normalize,

    #[command(next_help_heading = "Misc", about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("TALLY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "info" } else { "warn" }));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let mode = cli.output_mode();

    let user = config::load_user_config().unwrap_or_default();
    let data_dir = config::resolve_data_dir(cli.data_dir.clone(), &user);

    match cli.command {
        Commands::Init(ref args) => cmd::init::run_init(args, &data_dir),
        Commands::Submit(ref args) => with_engine(&data_dir, |engine| {
            cmd::submit::run_submit(args, mode, engine)
        }),
        Commands::Stats(ref args) => with_engine(&data_dir, |engine| {
            cmd::stats::run_stats(args, mode, engine)
        }),
        Commands::Achievements(ref args) => with_engine(&data_dir, |engine| {
            cmd::achievements::run_achievements(args, mode, engine)
        }),
        Commands::Import(ref args) => with_engine(&data_dir, |engine| {
            cmd::import::run_import(args, mode, engine)
        }),
        Commands::Export(ref args) => {
            with_engine(&data_dir, |engine| cmd::export::run_export(args, engine))
        }
        Commands::Delete(ref args) => {
            with_engine(&data_dir, |engine| cmd::delete::run_delete(args, engine))
        }
        Commands::Rebuild => with_engine(&data_dir, cmd::rebuild::run_rebuild),
        Commands::Normalize => with_engine(&data_dir, cmd::normalize::run_normalize),
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "tally", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Open the engine against the data directory, run one command, then drain
/// the background write queue.
///
/// The data-dir lock is held for the whole command: one writer per
/// directory, across processes.
fn with_engine<F>(data_dir: &Path, f: F) -> Result<()>
where
    F: FnOnce(&mut Engine<SystemClock>) -> Result<()>,
{
    if !data_dir.exists() {
        let code = ErrorCode::NotInitialized;
        anyhow::bail!(
            "{}: {}. {}",
            code,
            code.message(),
            code.hint().unwrap_or_default()
        );
    }

    let tracker = config::load_tracker_config(data_dir)?;
    let _lock = DataDirLock::acquire(data_dir, Duration::from_secs(5))?;
    let store = SqliteStore::open(&data_dir.join(&tracker.store.db_file))?;
    let mut engine = Engine::open(
        store,
        SystemClock,
        LogPublisher,
        EngineOptions {
            publish_cooldown_secs: tracker.publish.cooldown_secs,
            publish_enabled: tracker.publish.enabled,
        },
    )?;
    tracing::debug!(data_dir = %data_dir.display(), "engine ready");

    let result = f(&mut engine);
    engine.shutdown();
    result
}
