//! `gridfuzz.toml` config loading.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    ActionAlphabet, CellAlphabet, ColumnMode, GeneratorKind, GridFuzzDuration, GridFuzzError,
    GridFuzzResult, TargetCommand,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Directory that holds the session archive, log and candidate files.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,

    /// Seed map directory, relative to `base_dir` unless absolute.
    #[serde(default = "default_corpus_dir")]
    pub corpus_dir: PathBuf,

    /// Optional file-name glob restricting which seed files are loaded.
    #[serde(default)]
    pub corpus_glob: Option<String>,

    /// Archive directory stem; sessions get `<stem>`, `<stem>2`, ...
    #[serde(default = "default_output_stem")]
    pub output_stem: String,

    /// Target launch prefix. The map path and action string are appended.
    #[serde(default = "default_target")]
    pub target: Vec<String>,

    #[serde(default = "default_target_timeout")]
    pub target_timeout: GridFuzzDuration,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,

    #[serde(default = "default_max_time")]
    pub max_time: GridFuzzDuration,

    /// Upper bound (inclusive) on generated action sequence length.
    #[serde(default = "default_max_actions")]
    pub max_actions: usize,

    /// Size knob for the random-grid and random-bytes generators.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Weighted cell alphabet; repeat a symbol to make it more likely.
    #[serde(default = "default_cells")]
    pub cells: String,

    #[serde(default = "default_actions")]
    pub actions: String,

    #[serde(default)]
    pub column_mode: ColumnMode,

    #[serde(default)]
    pub generator: GeneratorKind,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_corpus_dir() -> PathBuf {
    PathBuf::from("Example_maps")
}

fn default_output_stem() -> String {
    "fuzzed_maps".to_string()
}

fn default_target() -> Vec<String> {
    vec![
        "java".to_string(),
        "-jar".to_string(),
        "jpacman-3.0.1.jar".to_string(),
    ]
}

fn default_target_timeout() -> GridFuzzDuration {
    GridFuzzDuration(Duration::from_secs(10))
}

fn default_max_iterations() -> u64 {
    100_000
}

fn default_max_time() -> GridFuzzDuration {
    GridFuzzDuration(Duration::from_secs(600))
}

fn default_max_actions() -> usize {
    10
}

fn default_max_file_size() -> usize {
    1024
}

fn default_cells() -> String {
    "000FFFMMMWWWP".to_string()
}

fn default_actions() -> String {
    "ESUDQWLR".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            corpus_dir: default_corpus_dir(),
            corpus_glob: None,
            output_stem: default_output_stem(),
            target: default_target(),
            target_timeout: default_target_timeout(),
            max_iterations: default_max_iterations(),
            max_time: default_max_time(),
            max_actions: default_max_actions(),
            max_file_size: default_max_file_size(),
            cells: default_cells(),
            actions: default_actions(),
            column_mode: ColumnMode::default(),
            generator: GeneratorKind::default(),
        }
    }
}

impl Config {
    pub fn load_optional(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(s) => match toml::from_str::<Config>(&s) {
                Ok(cfg) => cfg,
                Err(err) => {
                    tracing::warn!("failed to parse config {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(err) => {
                tracing::warn!("failed to read config {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn corpus_path(&self) -> PathBuf {
        self.base_dir.join(&self.corpus_dir)
    }

    pub fn target_command(&self) -> GridFuzzResult<TargetCommand> {
        TargetCommand::from_argv(&self.target)
    }

    pub fn cell_alphabet(&self) -> GridFuzzResult<CellAlphabet> {
        CellAlphabet::new(&self.cells)
            .map_err(|e| GridFuzzError::Config(format!("cells: {e}")))
    }

    pub fn action_alphabet(&self) -> GridFuzzResult<ActionAlphabet> {
        ActionAlphabet::new(&self.actions)
            .map_err(|e| GridFuzzError::Config(format!("actions: {e}")))
    }
}
