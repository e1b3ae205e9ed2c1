//! Seed corpus loading and inspection.

use clap::Subcommand;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};

use crate::{Config, Grid, GridFuzzError, GridFuzzResult, list_regular_files, pick_index};

#[derive(Debug, Subcommand)]
pub enum CorpusCommand {
    /// List usable seed maps with their dimensions.
    List {
        /// Seed directory (defaults to `corpus_dir` from the config).
        dir: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct Seed {
    pub path: PathBuf,
    pub grid: Grid,
}

/// Seed maps loaded once at startup and only read afterwards.
#[derive(Debug, Clone)]
pub struct SeedCorpus {
    seeds: Vec<Seed>,
}

impl SeedCorpus {
    /// Fails with [`GridFuzzError::CorpusEmpty`] when `dir` is missing or holds no usable seed.
    pub fn load(dir: &Path, pattern: Option<&str>) -> GridFuzzResult<Self> {
        if !dir.is_dir() {
            return Err(GridFuzzError::CorpusEmpty {
                dir: dir.to_path_buf(),
            });
        }

        let mut seeds = Vec::new();
        for path in list_regular_files(dir, pattern)? {
            match read_seed(&path) {
                Ok(Some(grid)) => seeds.push(Seed { path, grid }),
                Ok(None) => tracing::warn!("skipping empty seed {}", path.display()),
                Err(err) => tracing::warn!("skipping unreadable seed {}: {err}", path.display()),
            }
        }

        if seeds.is_empty() {
            return Err(GridFuzzError::CorpusEmpty {
                dir: dir.to_path_buf(),
            });
        }
        tracing::info!("loaded {} seed maps from {}", seeds.len(), dir.display());
        Ok(Self { seeds })
    }

    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }

    pub fn seeds(&self) -> &[Seed] {
        &self.seeds
    }

    pub fn choose(&self, rng: &mut impl RngCore) -> &Seed {
        &self.seeds[pick_index(rng, self.seeds.len())]
    }
}

fn read_seed(path: &Path) -> std::io::Result<Option<Grid>> {
    let bytes = std::fs::read(path)?;
    let text = String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let grid = Grid::parse(&text);
    Ok((!grid.is_empty()).then_some(grid))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedInfo {
    pub path: String,
    pub rows: usize,
    #[serde(rename = "maxCols")]
    pub max_cols: usize,
    pub rectangular: bool,
}

pub fn corpus_list(dir: &Path, pattern: Option<&str>) -> GridFuzzResult<Vec<SeedInfo>> {
    let corpus = SeedCorpus::load(dir, pattern)?;
    Ok(corpus
        .seeds()
        .iter()
        .map(|s| SeedInfo {
            path: s.path.to_string_lossy().to_string(),
            rows: s.grid.height(),
            max_cols: s.grid.max_width(),
            rectangular: s.grid.is_rectangular(),
        })
        .collect())
}

pub fn corpus_command(config: &Config, command: &CorpusCommand) -> GridFuzzResult<serde_json::Value> {
    match command {
        CorpusCommand::List { dir } => {
            let dir = dir.clone().unwrap_or_else(|| config.corpus_path());
            let seeds = corpus_list(&dir, config.corpus_glob.as_deref())?;
            Ok(serde_json::to_value(seeds)?)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng_from_seed;
    use uuid::Uuid;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gridfuzz-corpus-tests-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    #[test]
    fn missing_or_empty_dir_is_corpus_empty() {
        let dir = temp_dir();
        let missing = dir.join("nope");
        assert!(matches!(
            SeedCorpus::load(&missing, None),
            Err(GridFuzzError::CorpusEmpty { .. })
        ));
        assert!(matches!(
            SeedCorpus::load(&dir, None),
            Err(GridFuzzError::CorpusEmpty { .. })
        ));
    }

    #[test]
    fn unusable_files_are_skipped() {
        let dir = temp_dir();
        std::fs::write(dir.join("empty.map"), "").expect("write");
        std::fs::write(dir.join("binary.map"), [0xFFu8, 0xFE, 0x00]).expect("write");
        assert!(matches!(
            SeedCorpus::load(&dir, None),
            Err(GridFuzzError::CorpusEmpty { .. })
        ));

        std::fs::write(dir.join("board.map"), "0000\n0F00\n000M\n").expect("write");
        let corpus = SeedCorpus::load(&dir, None).expect("load");
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.seeds()[0].grid.row_strings(), vec!["0000", "0F00", "000M"]);
    }

    #[test]
    fn serialized_grid_reloads_identically() {
        let dir = temp_dir();
        let g = Grid::from_rows(&["0000", "0F", "", "000M0"]);
        std::fs::write(dir.join("jagged.map"), g.serialize()).expect("write");
        let corpus = SeedCorpus::load(&dir, None).expect("load");
        assert_eq!(corpus.seeds()[0].grid, g);
    }

    #[test]
    fn choose_covers_every_seed() {
        let dir = temp_dir();
        for i in 0..3 {
            std::fs::write(dir.join(format!("s{i}.map")), format!("{i}\n")).expect("write");
        }
        let corpus = SeedCorpus::load(&dir, Some("*.map")).expect("load");
        let mut rng = rng_from_seed(8);
        let mut hits = [0usize; 3];
        for _ in 0..300 {
            let s = corpus.choose(&mut rng);
            let idx = corpus.seeds().iter().position(|x| x.path == s.path).expect("known seed");
            hits[idx] += 1;
        }
        assert!(hits.iter().all(|h| *h > 0), "{hits:?}");
    }

    #[test]
    fn list_reports_shape() {
        let dir = temp_dir();
        std::fs::write(dir.join("a.map"), "00\n0F0\n").expect("write");
        let infos = corpus_list(&dir, None).expect("list");
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].rows, 2);
        assert_eq!(infos[0].max_cols, 3);
        assert!(!infos[0].rectangular);
    }
}
