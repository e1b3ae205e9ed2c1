//! The fuzzing session loop.
//!
//! Strictly sequential: each iteration generates one candidate and one action
//! sequence, runs the target to completion or timeout, classifies the result,
//! archives it when abnormal, and removes the candidate before the next
//! iteration starts. The loop stops at the top of an iteration once the
//! iteration cap or the wall-clock budget is reached.

use std::path::PathBuf;
use std::time::Duration;

use crate::{
    CandidateFile, CandidateGenerator, ColumnMode, Config, CrashArchiver, FuzzSummary,
    GeneratorKind, GridFuzzResult, MutationEngine, OpCounts, Outcome, OutcomeStats, SeedCorpus,
    Session, StopReason, TargetCommand, TargetRunner, TimeBudget, gen_seed, rng_from_seed,
    wall_time_iso_utc,
};

/// Per-invocation overrides; `None` falls back to the config value.
#[derive(Debug, Clone, Default)]
pub struct FuzzOptions {
    pub seed: Option<u64>,
    pub max_iterations: Option<u64>,
    pub max_time: Option<Duration>,
    pub target_timeout: Option<Duration>,
    pub max_actions: Option<usize>,
    pub corpus_dir: Option<PathBuf>,
    pub generator: Option<GeneratorKind>,
    pub column_mode: Option<ColumnMode>,
    pub target: Option<Vec<String>>,
}

pub fn fuzz(config: &Config, opt: &FuzzOptions) -> GridFuzzResult<FuzzSummary> {
    let seed = opt.seed.unwrap_or_else(gen_seed);
    let max_iterations = opt.max_iterations.unwrap_or(config.max_iterations);
    let max_time = opt.max_time.unwrap_or(config.max_time.0);
    let max_actions = opt.max_actions.unwrap_or(config.max_actions);

    let command = match &opt.target {
        Some(argv) => TargetCommand::from_argv(argv)?,
        None => config.target_command()?,
    };
    let runner = TargetRunner::new(
        command,
        opt.target_timeout.unwrap_or(config.target_timeout.0),
    );
    let actions = config.action_alphabet()?;
    let generator = build_generator(config, opt)?;

    let session = Session::create(&config.base_dir, &config.output_stem)?;
    let archiver = CrashArchiver::new(&session);
    let mut rng = rng_from_seed(seed);

    tracing::info!(
        "fuzzing `{}` with seed {seed} ({:?}, up to {max_iterations} iterations / {max_time:?})",
        runner.command().display(),
        generator.kind()
    );

    let started_at = wall_time_iso_utc();
    let budget = TimeBudget::start(max_time);
    let mut stats = OutcomeStats::default();
    let mut ops = OpCounts::default();
    let mut archived = Vec::new();

    let mut iteration = 0u64;
    let stop_reason = loop {
        if iteration >= max_iterations {
            tracing::info!("iteration limit reached, stopping fuzzing");
            break StopReason::IterationLimitReached;
        }
        if budget.exhausted() {
            tracing::info!("time limit reached, stopping fuzzing");
            break StopReason::TimeLimitReached;
        }

        tracing::info!("starting fuzzing iteration {iteration}");

        let candidate = generator.generate(&mut rng);
        ops.record(&candidate.steps);
        if let Some(seed_path) = &candidate.seed {
            tracing::debug!(seed = %seed_path.display(), steps = ?candidate.steps, "mutated seed");
        }
        let file = CandidateFile::write(session.candidate_path(iteration), &candidate.bytes)?;
        let fuzzed_actions = actions.generate(max_actions, &mut rng);

        let result = runner.run(file.path(), &fuzzed_actions);
        if stats.record(&result) == Outcome::Abnormal {
            match archiver.archive(file.path(), &fuzzed_actions, &result, iteration) {
                Ok(crash) => archived.push(crash),
                Err(err) => {
                    let kept = file.keep();
                    tracing::error!(
                        "archiving iteration {iteration} failed; candidate left at {}",
                        kept.display()
                    );
                    return Err(err);
                }
            }
        }
        file.cleanup()?;

        iteration += 1;
    };

    let summary = FuzzSummary {
        session_id: session.id.clone(),
        seed,
        generator: generator.kind(),
        target: runner.command().display(),
        started_at,
        finished_at: wall_time_iso_utc(),
        duration_ms: budget.elapsed_ms(),
        iterations: iteration,
        stop_reason,
        stats,
        ops,
        output_dir: session.output_dir.to_string_lossy().to_string(),
        log_path: session.log_path.to_string_lossy().to_string(),
        archived,
    };
    std::fs::write(session.report_path(), serde_json::to_vec_pretty(&summary)?)?;
    Ok(summary)
}

fn build_generator(config: &Config, opt: &FuzzOptions) -> GridFuzzResult<CandidateGenerator> {
    let cells = config.cell_alphabet()?;
    Ok(match opt.generator.unwrap_or(config.generator) {
        GeneratorKind::Mutation => {
            let dir = opt.corpus_dir.clone().unwrap_or_else(|| config.corpus_path());
            let corpus = SeedCorpus::load(&dir, config.corpus_glob.as_deref())?;
            let mode = opt.column_mode.unwrap_or(config.column_mode);
            CandidateGenerator::Mutation {
                corpus,
                engine: MutationEngine::new(cells, mode),
            }
        }
        GeneratorKind::RandomGrid => CandidateGenerator::RandomGrid {
            cells,
            max_file_size: config.max_file_size,
        },
        GeneratorKind::RandomBytes => CandidateGenerator::RandomBytes {
            max_file_size: config.max_file_size,
        },
    })
}
