//! Re-running an archived map for triage.

use std::path::Path;
use std::time::Duration;

use crate::{Config, GridFuzzError, GridFuzzResult, RunResult, TargetCommand, TargetRunner};

#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub target_timeout: Option<Duration>,
    pub target: Option<Vec<String>>,
}

/// Runs the target once on `map` without touching the file.
pub fn replay(config: &Config, map: &Path, actions: &str, opt: &ReplayOptions) -> GridFuzzResult<RunResult> {
    if !map.is_file() {
        return Err(GridFuzzError::InvalidArgument(format!(
            "map file not found: {}",
            map.display()
        )));
    }
    let command = match &opt.target {
        Some(argv) => TargetCommand::from_argv(argv)?,
        None => config.target_command()?,
    };
    let runner = TargetRunner::new(
        command,
        opt.target_timeout.unwrap_or(config.target_timeout.0),
    );
    tracing::info!("replaying {} with actions {actions:?}", map.display());
    Ok(runner.run(map, actions))
}
