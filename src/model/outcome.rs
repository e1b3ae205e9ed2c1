//! Run classification and session frequency tables.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::RunResult;

/// Characters of stdout kept as a readable sample per bucket.
pub const STDOUT_SAMPLE_CHARS: usize = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Normal,
    Abnormal,
}

impl Outcome {
    /// Exit code 0 is normal; everything else, the `-1` sentinel included, is abnormal.
    pub fn classify(result: &RunResult) -> Self {
        if result.exit_code == 0 {
            Self::Normal
        } else {
            Self::Abnormal
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdoutBucket {
    pub count: u64,
    pub sample: String,
}

/// Counts for the end-of-session summary. Never used to skip archiving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeStats {
    pub normal: u64,
    pub abnormal: u64,
    #[serde(rename = "exitCodes")]
    pub exit_codes: BTreeMap<i32, u64>,
    /// Keyed by blake3 hex of the full stdout.
    pub stdout: BTreeMap<String, StdoutBucket>,
    pub faults: BTreeMap<String, u64>,
}

impl OutcomeStats {
    pub fn record(&mut self, result: &RunResult) -> Outcome {
        let outcome = Outcome::classify(result);
        match outcome {
            Outcome::Normal => self.normal += 1,
            Outcome::Abnormal => self.abnormal += 1,
        }
        *self.exit_codes.entry(result.exit_code).or_default() += 1;

        let key = blake3::hash(result.stdout.as_bytes()).to_hex().to_string();
        let bucket = self.stdout.entry(key).or_insert_with(|| StdoutBucket {
            count: 0,
            sample: result.stdout.chars().take(STDOUT_SAMPLE_CHARS).collect(),
        });
        bucket.count += 1;

        if let Some(fault) = &result.fault {
            *self.faults.entry(fault.label()).or_default() += 1;
        }
        outcome
    }

    pub fn total(&self) -> u64 {
        self.normal + self.abnormal
    }

    /// Stdout buckets, most frequent first.
    pub fn stdout_by_count(&self) -> Vec<(&String, &StdoutBucket)> {
        let mut out: Vec<_> = self.stdout.iter().collect();
        out.sort_by(|a, b| b.1.count.cmp(&a.1.count).then_with(|| a.0.cmp(b.0)));
        out
    }
}
