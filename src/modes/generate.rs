//! Candidate map generators.

use rand_core::RngCore;
use serde::{Deserialize, Serialize};

use std::path::PathBuf;

use crate::{CellAlphabet, Grid, MutationEngine, MutationStep, SeedCorpus, range_inclusive};

/// Rows written by the random-grid generator.
pub const RANDOM_GRID_ROWS: usize = 19;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorKind {
    /// Structural mutations of a seed map.
    #[default]
    Mutation,
    /// Rectangular grid of random cells; no seed needed.
    RandomGrid,
    /// Unstructured random bytes; no seed needed.
    RandomBytes,
}

impl clap::ValueEnum for GeneratorKind {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Mutation, Self::RandomGrid, Self::RandomBytes]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Mutation => clap::builder::PossibleValue::new("mutation"),
            Self::RandomGrid => clap::builder::PossibleValue::new("random-grid"),
            Self::RandomBytes => clap::builder::PossibleValue::new("random-bytes"),
        })
    }
}

/// One map file's worth of content, plus how it was produced.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub bytes: Vec<u8>,
    pub seed: Option<PathBuf>,
    pub steps: Vec<MutationStep>,
}

#[derive(Debug)]
pub enum CandidateGenerator {
    Mutation {
        corpus: SeedCorpus,
        engine: MutationEngine,
    },
    RandomGrid {
        cells: CellAlphabet,
        max_file_size: usize,
    },
    RandomBytes {
        max_file_size: usize,
    },
}

impl CandidateGenerator {
    pub fn kind(&self) -> GeneratorKind {
        match self {
            Self::Mutation { .. } => GeneratorKind::Mutation,
            Self::RandomGrid { .. } => GeneratorKind::RandomGrid,
            Self::RandomBytes { .. } => GeneratorKind::RandomBytes,
        }
    }

    pub fn generate(&self, rng: &mut impl RngCore) -> Candidate {
        match self {
            Self::Mutation { corpus, engine } => {
                let seed = corpus.choose(rng);
                let mutant = engine.mutate(&seed.grid, rng);
                Candidate {
                    bytes: mutant.grid.serialize().into_bytes(),
                    seed: Some(seed.path.clone()),
                    steps: mutant.steps,
                }
            }
            Self::RandomGrid {
                cells,
                max_file_size,
            } => {
                let width = range_inclusive(rng, 1, (max_file_size / 20).max(1));
                let grid = Grid {
                    rows: (0..RANDOM_GRID_ROWS).map(|_| cells.row(width, rng)).collect(),
                };
                Candidate {
                    bytes: grid.serialize().into_bytes(),
                    seed: None,
                    steps: Vec::new(),
                }
            }
            Self::RandomBytes { max_file_size } => {
                let n = range_inclusive(rng, 0, max_file_size / 8);
                let mut bytes = vec![0u8; n];
                rng.fill_bytes(&mut bytes);
                Candidate {
                    bytes,
                    seed: None,
                    steps: Vec::new(),
                }
            }
        }
    }
}
