//! gridfuzz CLI entrypoint.

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use std::path::PathBuf;
use std::process::ExitCode;

use gridfuzz::{
    ColumnMode, Config, CorpusCommand, FuzzOptions, FuzzSummary, GeneratorKind, GridFuzzDuration,
    Outcome, ReplayOptions, RunResult,
};

#[derive(Debug, Parser)]
#[command(name = "gridfuzz")]
#[command(about = "black-box structural fuzzing for grid map + action targets")]
struct Cli {
    /// Path to config file. Missing configs are treated as "defaults".
    #[arg(long, global = true, default_value = "gridfuzz.toml")]
    config: PathBuf,

    /// Working directory for execution.
    #[arg(long, global = true)]
    cwd: Option<PathBuf>,

    /// Log level.
    #[arg(long, global = true, default_value = "info")]
    log: String,

    /// Machine-readable output to stdout (JSON).
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Mutate seed maps, run the target on them and archive abnormal runs
    Fuzz {
        /// Seed for the session RNG (random when omitted).
        #[arg(long)]
        seed: Option<u64>,

        /// Iteration cap.
        #[arg(long)]
        runs: Option<u64>,

        /// Wall-clock budget for the whole session.
        #[arg(long)]
        time: Option<GridFuzzDuration>,

        /// Per-run target timeout.
        #[arg(long)]
        timeout: Option<GridFuzzDuration>,

        #[arg(long)]
        max_actions: Option<usize>,

        /// Seed map directory.
        #[arg(long)]
        corpus: Option<PathBuf>,

        #[arg(long)]
        generator: Option<GeneratorKind>,

        #[arg(long)]
        column_mode: Option<ColumnMode>,

        /// Target launch prefix, e.g. `-- java -jar jpacman.jar`.
        #[arg(last = true)]
        target: Vec<String>,
    },

    /// Run the target once on an archived map
    Replay {
        map: PathBuf,

        #[arg(default_value = "")]
        actions: String,

        #[arg(long)]
        timeout: Option<GridFuzzDuration>,

        #[arg(last = true)]
        target: Vec<String>,
    },

    /// Inspect seed corpora
    Corpus {
        #[command(subcommand)]
        command: CorpusCommand,
    },

    /// Print version and build info
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_tracing(&cli.log) {
        eprintln!("warning: failed to init tracing: {err:#}");
    }

    if let Some(cwd) = &cli.cwd
        && let Err(err) = std::env::set_current_dir(cwd)
    {
        return print_error_and_exit(
            &cli,
            anyhow::anyhow!(err).context(format!("failed to set cwd to {}", cwd.display())),
        );
    }

    let config = Config::load_optional(&cli.config);

    match run_command(&cli, &config) {
        Ok(code) => code,
        Err(err) => print_error_and_exit(&cli, err),
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

fn run_command(cli: &Cli, config: &Config) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Fuzz {
            seed,
            runs,
            time,
            timeout,
            max_actions,
            corpus,
            generator,
            column_mode,
            target,
        } => {
            let summary = gridfuzz::fuzz(
                config,
                &FuzzOptions {
                    seed: *seed,
                    max_iterations: *runs,
                    max_time: time.map(|d| d.0),
                    target_timeout: timeout.map(|d| d.0),
                    max_actions: *max_actions,
                    corpus_dir: corpus.clone(),
                    generator: *generator,
                    column_mode: *column_mode,
                    target: (!target.is_empty()).then(|| target.clone()),
                },
            )
            .context("fuzzing session failed")?;
            print_fuzz_summary(cli, &summary)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Replay {
            map,
            actions,
            timeout,
            target,
        } => {
            let result = gridfuzz::replay(
                config,
                map,
                actions,
                &ReplayOptions {
                    target_timeout: timeout.map(|d| d.0),
                    target: (!target.is_empty()).then(|| target.clone()),
                },
            )?;
            print_run_result(cli, &result)?;
            Ok(match Outcome::classify(&result) {
                Outcome::Normal => ExitCode::SUCCESS,
                Outcome::Abnormal => ExitCode::from(1),
            })
        }

        Command::Corpus { command } => {
            let out = gridfuzz::corpus_command(config, command)?;
            print_json_or_text(cli, &out)?;
            Ok(ExitCode::SUCCESS)
        }

        Command::Version => {
            let info = gridfuzz::version_info();
            print_json_or_text(cli, &info)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_fuzz_summary(cli: &Cli, summary: &FuzzSummary) -> anyhow::Result<()> {
    if cli.json {
        print_json_or_text(cli, summary)?;
    } else {
        println!("{}", summary.pretty());
    }
    Ok(())
}

fn print_run_result(cli: &Cli, result: &RunResult) -> anyhow::Result<()> {
    if cli.json {
        print_json_or_text(cli, result)?;
    } else {
        println!("stdout: {}", result.stdout);
        println!("stderr: {}", result.stderr);
        println!("return_code: {}", result.exit_code);
        if let Some(fault) = &result.fault {
            println!("fault: {}", fault.label());
        }
    }
    Ok(())
}

fn print_json_or_text<T: serde::Serialize>(cli: &Cli, value: &T) -> anyhow::Result<()> {
    if cli.json {
        println!("{}", serde_json::to_string(value)?);
    } else {
        println!("{}", serde_json::to_string_pretty(value)?);
    }
    Ok(())
}

fn print_error_and_exit(cli: &Cli, err: anyhow::Error) -> ExitCode {
    let msg = format!("{err:#}");
    if cli.json {
        let out = serde_json::json!({
            "status": "error",
            "message": msg,
        });
        println!("{out}");
    } else {
        eprintln!("{msg}");
    }
    ExitCode::from(2)
}
