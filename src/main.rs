//! Skillpath - skill progression for poker training
//!
//! CLI entry point with global panic handler.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use skillpath::cli::onboard::{OnboardCommand, OnboardOptions};
use skillpath::cli::progress::{ProgressCommand, ProgressOptions};
use skillpath::cli::replay::{ReplayCommand, ReplayOptions};
use skillpath::cli::skills::{SkillsCommand, SkillsOptions};
use skillpath::config::{crash_log_path, Config};
use skillpath::core::ExperienceLevel;
use skillpath::engine::Engine;
use skillpath::error::exit_codes;
use skillpath::storage::{FileProgressStore, MemoryProgressStore};

// =============================================================================
// CLI Definition
// =============================================================================

/// Skillpath - skill progression and coaching for poker training
#[derive(Parser)]
#[command(name = "skillpath")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run recorded decisions (JSON array or JSON lines) through one session
    Replay {
        /// File of {decision, action} records
        file: PathBuf,
        /// Session ID to replay under
        #[arg(long)]
        session_id: Option<String>,
        /// Keep progress in memory instead of saving it
        #[arg(long)]
        dry_run: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Show a player's gates, skill states and coaching modes
    Progress {
        /// Player ID
        player: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Seed a new player from a self-reported experience level
    Onboard {
        /// Player ID
        player: String,
        /// Self-reported experience
        #[arg(long, value_enum)]
        level: LevelArg,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// List the curriculum in use
    Skills {
        /// Only validate the curriculum file
        #[arg(long)]
        check: bool,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

/// Experience levels accepted by `onboard`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LevelArg {
    Beginner,
    Intermediate,
    Advanced,
}

impl From<LevelArg> for ExperienceLevel {
    fn from(arg: LevelArg) -> Self {
        match arg {
            LevelArg::Beginner => ExperienceLevel::Beginner,
            LevelArg::Intermediate => ExperienceLevel::Intermediate,
            LevelArg::Advanced => ExperienceLevel::Advanced,
        }
    }
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    setup_panic_handler();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("skillpath error: {}", e);
            ExitCode::from(exit_codes::ERROR as u8)
        }
    }
}

/// Set up the global panic handler.
///
/// On panic, logs to ~/.skillpath/crash.log and exits with code 3.
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        eprintln!("skillpath panic: {}", info);

        if let Some(crash_log) = crash_log_path() {
            if let Some(parent) = crash_log.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            if let Ok(mut file) = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&crash_log)
            {
                let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
                let _ = writeln!(file, "[{}] {}", timestamp, info);
            }
        }

        std::process::exit(exit_codes::CRASH);
    }));
}

/// Install the stderr subscriber. `SKILLPATH_LOG` wins over `logging.level`.
fn init_logging(config: &Config) {
    let filter = EnvFilter::try_from_env("SKILLPATH_LOG")
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = Config::load();
    init_logging(&config);

    match cli.command {
        Commands::Replay {
            file,
            session_id,
            dry_run,
            json,
            quiet,
        } => run_replay(&file, session_id, dry_run, json, quiet, config),
        Commands::Progress {
            player,
            json,
            quiet,
        } => run_progress(&player, json, quiet, config),
        Commands::Onboard {
            player,
            level,
            json,
            quiet,
        } => run_onboard(&player, level.into(), json, quiet, config),
        Commands::Skills { check, json, quiet } => run_skills(check, json, quiet, config),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

/// Convert a success boolean to an exit code.
fn success_to_exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::from(exit_codes::SUCCESS as u8)
    } else {
        ExitCode::from(exit_codes::ERROR as u8)
    }
}

fn print_formatted(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted);
    }
}

fn run_replay(
    file: &Path,
    session_id: Option<String>,
    dry_run: bool,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let options = ReplayOptions {
        json,
        quiet,
        session_id,
    };

    let success = if dry_run {
        let engine = Engine::from_config(Arc::new(MemoryProgressStore::new()), config);
        let cmd = ReplayCommand::new(engine);
        let output = cmd.run(file, &options);
        print_formatted(&cmd.format_output(&output, &options));
        output.success
    } else {
        let engine = Engine::from_config(FileProgressStore::new()?, config);
        let cmd = ReplayCommand::new(engine);
        let output = cmd.run(file, &options);
        print_formatted(&cmd.format_output(&output, &options));
        output.success
    };

    Ok(success_to_exit_code(success))
}

fn run_progress(
    player: &str,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let engine = Engine::from_config(FileProgressStore::new()?, config);
    let cmd = ProgressCommand::new(engine);
    let options = ProgressOptions { json, quiet };

    let output = cmd.run(player, &options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_onboard(
    player: &str,
    level: ExperienceLevel,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let engine = Engine::from_config(FileProgressStore::new()?, config);
    let cmd = OnboardCommand::new(engine);
    let options = OnboardOptions { json, quiet };

    let output = cmd.run(player, level);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

fn run_skills(
    check: bool,
    json: bool,
    quiet: bool,
    config: Config,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cmd = SkillsCommand::new(config);
    let options = SkillsOptions { json, quiet, check };

    let output = cmd.run(&options);
    print_formatted(&cmd.format_output(&output, &options));

    Ok(success_to_exit_code(output.success))
}

// =============================================================================
// Tests
// =============================================================================
