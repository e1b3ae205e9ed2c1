//! Session summary and its console rendering.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{ArchivedCrash, GeneratorKind, MutationOp, MutationStep, OutcomeStats};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    IterationLimitReached,
    TimeLimitReached,
}

/// How often each operator fired or no-op'd across a session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpCounts {
    pub applied: BTreeMap<MutationOp, u64>,
    pub noop: BTreeMap<MutationOp, u64>,
}

impl OpCounts {
    pub fn record(&mut self, steps: &[MutationStep]) {
        for step in steps {
            let table = if step.outcome.is_applied() {
                &mut self.applied
            } else {
                &mut self.noop
            };
            *table.entry(step.op).or_default() += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzSummary {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub seed: u64,
    pub generator: GeneratorKind,
    pub target: String,
    #[serde(rename = "startedAt")]
    pub started_at: String,
    #[serde(rename = "finishedAt")]
    pub finished_at: String,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    pub iterations: u64,
    #[serde(rename = "stopReason")]
    pub stop_reason: StopReason,
    pub stats: OutcomeStats,
    pub ops: OpCounts,
    #[serde(rename = "outputDir")]
    pub output_dir: String,
    #[serde(rename = "logPath")]
    pub log_path: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub archived: Vec<ArchivedCrash>,
}

impl FuzzSummary {
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        out.push_str(&"=".repeat(20));
        out.push('\n');
        out.push_str(&format!(
            "session={} seed={} generator={:?} stop={:?}\n",
            self.session_id, self.seed, self.generator, self.stop_reason
        ));
        out.push_str(&format!(
            "iterations={} abnormal={} durationMs={}\n",
            self.iterations, self.stats.abnormal, self.duration_ms
        ));
        out.push_str(&format!("archive={} log={}\n", self.output_dir, self.log_path));

        out.push_str("exit codes:\n");
        for (code, count) in &self.stats.exit_codes {
            out.push_str(&format!("  {count} occurrences of {code}\n"));
        }
        out.push_str("stdout:\n");
        for (hash, bucket) in self.stats.stdout_by_count() {
            out.push_str(&format!(
                "  {} occurrences of [{}] {:?}\n",
                bucket.count,
                &hash[..12.min(hash.len())],
                bucket.sample
            ));
        }
        if !self.stats.faults.is_empty() {
            out.push_str("faults:\n");
            for (fault, count) in &self.stats.faults {
                out.push_str(&format!("  {count} {fault}\n"));
            }
        }
        if !self.ops.applied.is_empty() || !self.ops.noop.is_empty() {
            out.push_str("operators (applied/noop):\n");
            for op in MutationOp::ALL {
                let applied = self.ops.applied.get(&op).copied().unwrap_or(0);
                let noop = self.ops.noop.get(&op).copied().unwrap_or(0);
                out.push_str(&format!("  {}: {applied}/{noop}\n", op.as_str()));
            }
        }
        out.trim_end().to_string()
    }
}
