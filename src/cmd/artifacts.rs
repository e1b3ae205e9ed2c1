//! Session artifacts: the numbered archive directory, the crash log and the
//! per-iteration candidate files.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::{GridFuzzError, GridFuzzResult, RunResult, create_numbered_dir, remove_if_exists};

const LOG_RULE: &str = "=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// 1 for `<stem>`, 2 for `<stem>2`, ...
    pub number: u32,
    #[serde(rename = "baseDir")]
    pub base_dir: PathBuf,
    #[serde(rename = "outputDir")]
    pub output_dir: PathBuf,
    #[serde(rename = "logPath")]
    pub log_path: PathBuf,
}

impl Session {
    /// Claims the next free `<base>/<stem>{n}` and truncates `<base>/fuzzing{n}.log`.
    pub fn create(base_dir: &Path, stem: &str) -> GridFuzzResult<Self> {
        let (output_dir, number) = create_numbered_dir(base_dir, stem)?;
        let log_path = base_dir.join(format!("fuzzing{number}.log"));
        std::fs::File::create(&log_path)?;
        tracing::info!(
            "session {number}: archiving to {}, logging to {}",
            output_dir.display(),
            log_path.display()
        );
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            number,
            base_dir: base_dir.to_path_buf(),
            output_dir,
            log_path,
        })
    }

    /// Unique per session and iteration.
    pub fn candidate_path(&self, iteration: u64) -> PathBuf {
        self.base_dir
            .join(format!("fuzzed{}_{iteration}.map", self.number))
    }

    /// Kept next to the log so the archive directory holds only maps.
    pub fn report_path(&self) -> PathBuf {
        self.base_dir.join(format!("fuzzing{}.json", self.number))
    }
}

/// Archive file name for an iteration.
pub fn archive_file_name(iteration: u64) -> String {
    format!("fuzz_{iteration}.map")
}

/// An on-disk candidate owned by one iteration; removed on drop unless cleaned up first.
#[derive(Debug)]
pub struct CandidateFile {
    path: PathBuf,
    armed: bool,
}

impl CandidateFile {
    pub fn write(path: PathBuf, bytes: &[u8]) -> GridFuzzResult<Self> {
        let guard = Self { path, armed: true };
        std::fs::write(&guard.path, bytes)?;
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Deletes the file if it is still there (it is gone after archiving).
    pub fn cleanup(mut self) -> GridFuzzResult<bool> {
        self.armed = false;
        Ok(remove_if_exists(&self.path)?)
    }

    /// Leaves the file on disk, e.g. when archiving it failed.
    pub fn keep(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for CandidateFile {
    fn drop(&mut self) {
        if self.armed
            && let Err(err) = remove_if_exists(&self.path)
        {
            tracing::warn!("failed to remove candidate {}: {err}", self.path.display());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedCrash {
    pub iteration: u64,
    #[serde(rename = "fileName")]
    pub file_name: String,
    #[serde(rename = "exitCode")]
    pub exit_code: i32,
    pub actions: String,
}

#[derive(Debug, Clone)]
pub struct CrashArchiver {
    output_dir: PathBuf,
    log_path: PathBuf,
}

impl CrashArchiver {
    pub fn new(session: &Session) -> Self {
        Self {
            output_dir: session.output_dir.clone(),
            log_path: session.log_path.clone(),
        }
    }

    /// Moves the candidate into the archive and appends its log block. Both happen or
    /// neither does: if the log append fails the file is moved back before erroring.
    pub fn archive(
        &self,
        candidate: &Path,
        actions: &str,
        result: &RunResult,
        iteration: u64,
    ) -> GridFuzzResult<ArchivedCrash> {
        let file_name = archive_file_name(iteration);
        let dest = self.output_dir.join(&file_name);

        std::fs::rename(candidate, &dest).map_err(|e| {
            GridFuzzError::Archive(format!(
                "failed to move {} to {}: {e}",
                candidate.display(),
                dest.display()
            ))
        })?;

        let block = render_log_block(result, &file_name, actions);
        if let Err(err) = self.append(&block) {
            let rollback = std::fs::rename(&dest, candidate);
            return Err(GridFuzzError::Archive(format!(
                "failed to append to {} for {file_name}: {err}{}",
                self.log_path.display(),
                match rollback {
                    Ok(()) => String::new(),
                    Err(e) => format!(" (and failed to move it back: {e})"),
                }
            )));
        }

        tracing::info!(
            "archived iteration {iteration} as {file_name} (exit code {})",
            result.exit_code
        );
        Ok(ArchivedCrash {
            iteration,
            file_name,
            exit_code: result.exit_code,
            actions: actions.to_string(),
        })
    }

    fn append(&self, block: &str) -> std::io::Result<()> {
        let mut f = std::fs::OpenOptions::new()
            .append(true)
            .open(&self.log_path)?;
        f.write_all(block.as_bytes())?;
        f.sync_data()
    }
}

pub fn render_log_block(result: &RunResult, file_name: &str, actions: &str) -> String {
    format!(
        "\n{LOG_RULE}\nstdout: {}\nstderr: {}\nreturn_code: {}\nfuzzed filename: {file_name}\nfuzzed actions: {actions}\n{LOG_RULE}\n",
        result.stdout, result.stderr, result.exit_code
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_base() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gridfuzz-artifacts-tests-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    fn count_log_blocks(log: &str) -> usize {
        log.matches(&format!("\n{LOG_RULE}\nstdout: ")).count()
    }

    fn crash(code: i32) -> RunResult {
        RunResult {
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            exit_code: code,
            fault: None,
            duration_ms: 1,
        }
    }

    #[test]
    fn sessions_number_dirs_and_logs() {
        let base = temp_base();
        let a = Session::create(&base, "fuzzed_maps").expect("first");
        let b = Session::create(&base, "fuzzed_maps").expect("second");
        assert_eq!(a.output_dir, base.join("fuzzed_maps"));
        assert_eq!(a.log_path, base.join("fuzzing1.log"));
        assert_eq!(b.output_dir, base.join("fuzzed_maps2"));
        assert_eq!(b.log_path, base.join("fuzzing2.log"));
        assert_eq!(b.candidate_path(7), base.join("fuzzed2_7.map"));
    }

    #[test]
    fn archive_moves_file_and_writes_one_block() {
        let base = temp_base();
        let session = Session::create(&base, "fuzzed_maps").expect("session");
        let archiver = CrashArchiver::new(&session);

        let cand = CandidateFile::write(session.candidate_path(4), b"0F\n").expect("write");
        let archived = archiver
            .archive(cand.path(), "EWS", &crash(2), 4)
            .expect("archive");
        assert_eq!(archived.file_name, "fuzz_4.map");
        assert!(!cand.path().exists());
        assert!(!cand.cleanup().expect("cleanup"));

        let kept = std::fs::read_to_string(session.output_dir.join("fuzz_4.map")).expect("read");
        assert_eq!(kept, "0F\n");

        let log = std::fs::read_to_string(&session.log_path).expect("log");
        assert_eq!(count_log_blocks(&log), 1);
        assert!(log.contains("stdout: out\n"));
        assert!(log.contains("stderr: err\n"));
        assert!(log.contains("return_code: 2\n"));
        assert!(log.contains("fuzzed filename: fuzz_4.map\n"));
        assert!(log.contains("fuzzed actions: EWS\n"));
    }

    #[test]
    fn failed_log_append_moves_file_back() {
        let base = temp_base();
        let session = Session::create(&base, "fuzzed_maps").expect("session");
        std::fs::remove_file(&session.log_path).expect("drop log");
        std::fs::create_dir(&session.log_path).expect("block log path");

        let archiver = CrashArchiver::new(&session);
        let cand = CandidateFile::write(session.candidate_path(0), b"0\n").expect("write");
        let err = archiver
            .archive(cand.path(), "", &crash(1), 0)
            .expect_err("append must fail");
        assert!(matches!(err, GridFuzzError::Archive(_)));
        assert!(cand.path().exists());
        assert!(!session.output_dir.join("fuzz_0.map").exists());
    }

    #[test]
    fn dropped_candidate_is_removed() {
        let base = temp_base();
        let p = base.join("fuzzed1_0.map");
        {
            let _c = CandidateFile::write(p.clone(), b"x").expect("write");
            assert!(p.exists());
        }
        assert!(!p.exists());
    }
}
