//! Target process execution under a wall-clock timeout.

use serde::{Deserialize, Serialize};

use std::io::Read as _;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use crate::{Grid, GridFuzzError, GridFuzzResult};

/// Exit code recorded for timeouts and launch failures.
pub const SENTINEL_EXIT_CODE: i32 = -1;

pub const TIMEOUT_MESSAGE: &str = "Execution timed out";

const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Launch prefix; each run appends `<map path> <actions>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl TargetCommand {
    pub fn from_argv(argv: &[String]) -> GridFuzzResult<Self> {
        let Some((program, args)) = argv.split_first() else {
            return Err(GridFuzzError::InvalidArgument(
                "target command must not be empty".to_string(),
            ));
        };
        if program.trim().is_empty() {
            return Err(GridFuzzError::InvalidArgument(
                "target program must not be blank".to_string(),
            ));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Why a run did not end with an ordinary exit code. All of these share the
/// `-1` sentinel except `Signal`, which records `-signal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunFault {
    Timeout,
    Launch,
    Signal(i32),
}

impl RunFault {
    pub fn label(&self) -> String {
        match self {
            Self::Timeout => "timeout".to_string(),
            Self::Launch => "launch".to_string(),
            Self::Signal(sig) => format!("signal_{sig}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    pub stdout: String,
    pub stderr: String,
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<RunFault>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

impl RunResult {
    fn timed_out(started: Instant) -> Self {
        Self {
            stdout: String::new(),
            stderr: TIMEOUT_MESSAGE.to_string(),
            exit_code: SENTINEL_EXIT_CODE,
            fault: Some(RunFault::Timeout),
            duration_ms: elapsed_ms(started),
        }
    }

    fn launch_failed(started: Instant, msg: impl std::fmt::Display) -> Self {
        Self {
            stdout: String::new(),
            stderr: format!("Error: {msg}"),
            exit_code: SENTINEL_EXIT_CODE,
            fault: Some(RunFault::Launch),
            duration_ms: elapsed_ms(started),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TargetRunner {
    command: TargetCommand,
    timeout: Duration,
}

impl TargetRunner {
    pub fn new(command: TargetCommand, timeout: Duration) -> Self {
        Self { command, timeout }
    }

    pub fn command(&self) -> &TargetCommand {
        &self.command
    }

    /// Writes `grid` to `map_path` and runs the target on it.
    pub fn run_grid(&self, grid: &Grid, map_path: &Path, actions: &str) -> GridFuzzResult<RunResult> {
        std::fs::write(map_path, grid.serialize())?;
        Ok(self.run(map_path, actions))
    }

    /// Never fails: launch problems and timeouts become `-1` results. The deadline
    /// covers both the child's exit and the end of its output, so a descendant that
    /// keeps a pipe open after the child exits still counts as a timeout.
    pub fn run(&self, map_path: &Path, actions: &str) -> RunResult {
        let started = Instant::now();

        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .arg(map_path)
            .arg(actions)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt as _;
            // Own process group, so a timeout can take down the whole tree.
            cmd.process_group(0);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(err) => {
                tracing::warn!("failed to launch {}: {err}", self.command.program);
                return RunResult::launch_failed(started, err);
            }
        };

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            kill_tree(&mut child);
            return RunResult::launch_failed(started, "target output pipes unavailable");
        };
        let (tx, rx) = mpsc::channel();
        drain(stdout, Stream::Stdout, tx.clone());
        drain(stderr, Stream::Stderr, tx);

        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(err) => {
                    kill_tree(&mut child);
                    return RunResult::launch_failed(started, err);
                }
            }
            if started.elapsed() >= self.timeout {
                kill_tree(&mut child);
                tracing::debug!("target exceeded {:?}; killed", self.timeout);
                return RunResult::timed_out(started);
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let mut stdout = None;
        let mut stderr = None;
        while stdout.is_none() || stderr.is_none() {
            let remaining = self.timeout.saturating_sub(started.elapsed());
            match rx.recv_timeout(remaining) {
                Ok((Stream::Stdout, bytes)) => stdout = Some(bytes),
                Ok((Stream::Stderr, bytes)) => stderr = Some(bytes),
                Err(RecvTimeoutError::Timeout) => {
                    kill_tree(&mut child);
                    tracing::debug!(
                        "target output still open after {:?}; killed its process group",
                        self.timeout
                    );
                    return RunResult::timed_out(started);
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let (exit_code, fault) = exit_code_of(&status);
        RunResult {
            stdout: lossy(stdout),
            stderr: lossy(stderr),
            exit_code,
            fault,
            duration_ms: elapsed_ms(started),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Reads `pipe` to EOF on a helper thread and sends the bytes once.
fn drain(
    mut pipe: impl std::io::Read + Send + 'static,
    stream: Stream,
    tx: Sender<(Stream, Vec<u8>)>,
) {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        let _ = tx.send((stream, buf));
    });
}

fn lossy(bytes: Option<Vec<u8>>) -> String {
    String::from_utf8_lossy(&bytes.unwrap_or_default()).to_string()
}

/// SIGKILLs the child's process group, then reaps the child. Descendants lose
/// their pipe ends too, which lets the reader threads finish.
#[cfg(unix)]
fn kill_tree(child: &mut Child) {
    if let Ok(pgid) = libc::pid_t::try_from(child.id()) {
        // SAFETY: killpg only sends a signal; the group was created for this child.
        unsafe {
            libc::killpg(pgid, libc::SIGKILL);
        }
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn kill_tree(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn exit_code_of(status: &std::process::ExitStatus) -> (i32, Option<RunFault>) {
    use std::os::unix::process::ExitStatusExt as _;
    match (status.code(), status.signal()) {
        (Some(code), _) => (code, None),
        (None, Some(sig)) => (-sig, Some(RunFault::Signal(sig))),
        (None, None) => (SENTINEL_EXIT_CODE, Some(RunFault::Launch)),
    }
}

#[cfg(not(unix))]
fn exit_code_of(status: &std::process::ExitStatus) -> (i32, Option<RunFault>) {
    match status.code() {
        Some(code) => (code, None),
        None => (SENTINEL_EXIT_CODE, Some(RunFault::Launch)),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis().min(u128::from(u64::MAX)) as u64
}
