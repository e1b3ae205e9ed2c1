//! Structural grid mutations.
//!
//! Operators reshape a seed map (rows and columns in, rows and columns out, cells
//! rewritten) without knowing what any cell means to the target. A candidate is a
//! clone of one seed with 1 to 3 operators applied in sequence. An operator whose
//! precondition fails reports [`MutationOutcome::NoOp`] instead of erroring, so a
//! composed sequence always yields a grid.

use rand_core::RngCore;
use serde::{Deserialize, Serialize};

use crate::{CellAlphabet, Grid, pick_index, range_inclusive};

/// Most operators composed onto one candidate.
pub const MAX_OPS_PER_CANDIDATE: usize = 3;

/// Longest row appended by `AddRow` when the grid is empty.
pub const MAX_FRESH_ROW_LEN: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOp {
    RemoveRow,
    ChangeRow,
    AddRow,
    AddColumn,
    RemoveColumn,
}

impl MutationOp {
    pub const ALL: [Self; 5] = [
        Self::RemoveRow,
        Self::ChangeRow,
        Self::AddRow,
        Self::AddColumn,
        Self::RemoveColumn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::RemoveRow => "remove_row",
            Self::ChangeRow => "change_row",
            Self::AddRow => "add_row",
            Self::AddColumn => "add_column",
            Self::RemoveColumn => "remove_column",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Row index for row operators, column index for column operators.
    Applied { index: usize },
    NoOp,
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationStep {
    pub op: MutationOp,
    pub outcome: MutationOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutant {
    pub grid: Grid,
    pub steps: Vec<MutationStep>,
}

/// How the column operators rewrite rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMode {
    /// Insert or excise exactly one cell per row.
    #[default]
    Fixed,
    /// Append a spliced copy of each row onto itself, so fuzz corpora produced by the
    /// older row-doubling operators can be regenerated.
    Legacy,
}

impl clap::ValueEnum for ColumnMode {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Fixed, Self::Legacy]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        Some(match self {
            Self::Fixed => clap::builder::PossibleValue::new("fixed"),
            Self::Legacy => clap::builder::PossibleValue::new("legacy"),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MutationEngine {
    cells: CellAlphabet,
    column_mode: ColumnMode,
}

impl MutationEngine {
    pub fn new(cells: CellAlphabet, column_mode: ColumnMode) -> Self {
        Self { cells, column_mode }
    }

    pub fn mutate(&self, seed: &Grid, rng: &mut impl RngCore) -> Mutant {
        let mut grid = seed.clone();
        let count = range_inclusive(rng, 1, MAX_OPS_PER_CANDIDATE);
        let mut steps = Vec::with_capacity(count);
        for _ in 0..count {
            let op = MutationOp::ALL[pick_index(rng, MutationOp::ALL.len())];
            let outcome = self.apply(op, &mut grid, rng);
            tracing::trace!(op = op.as_str(), ?outcome, "mutation step");
            steps.push(MutationStep { op, outcome });
        }
        Mutant { grid, steps }
    }

    pub fn apply(&self, op: MutationOp, grid: &mut Grid, rng: &mut impl RngCore) -> MutationOutcome {
        match op {
            MutationOp::RemoveRow => {
                if grid.is_empty() {
                    return MutationOutcome::NoOp;
                }
                let i = pick_index(rng, grid.height());
                remove_row_at(grid, i)
            }
            MutationOp::ChangeRow => {
                if grid.is_empty() || grid.first_row_len() == 0 {
                    return MutationOutcome::NoOp;
                }
                let i = pick_index(rng, grid.height());
                let fresh = self.cells.row(grid.first_row_len(), rng);
                change_row_at(grid, i, fresh)
            }
            MutationOp::AddRow => {
                if grid.is_empty() {
                    let len = range_inclusive(rng, 1, MAX_FRESH_ROW_LEN);
                    let row = self.cells.row(len, rng);
                    return insert_row_at(grid, 0, row);
                }
                let i = range_inclusive(rng, 0, grid.height());
                let row = self.cells.row(grid.first_row_len(), rng);
                insert_row_at(grid, i, row)
            }
            MutationOp::AddColumn => {
                if grid.is_empty() || grid.first_row_len() == 0 {
                    return MutationOutcome::NoOp;
                }
                let i = pick_index(rng, grid.first_row_len());
                add_column_at(grid, i, self.column_mode, || self.cells.sample(rng))
            }
            MutationOp::RemoveColumn => {
                if grid.is_empty() || grid.first_row_len() == 0 {
                    return MutationOutcome::NoOp;
                }
                let i = pick_index(rng, grid.first_row_len());
                remove_column_at(grid, i, self.column_mode)
            }
        }
    }
}

pub fn remove_row_at(grid: &mut Grid, index: usize) -> MutationOutcome {
    if index >= grid.height() {
        return MutationOutcome::NoOp;
    }
    grid.rows.remove(index);
    MutationOutcome::Applied { index }
}

pub fn change_row_at(grid: &mut Grid, index: usize, fresh: Vec<char>) -> MutationOutcome {
    match grid.rows.get_mut(index) {
        Some(row) => {
            *row = fresh;
            MutationOutcome::Applied { index }
        }
        None => MutationOutcome::NoOp,
    }
}

pub fn insert_row_at(grid: &mut Grid, index: usize, row: Vec<char>) -> MutationOutcome {
    if index > grid.height() {
        return MutationOutcome::NoOp;
    }
    grid.rows.insert(index, row);
    MutationOutcome::Applied { index }
}

/// `cell` is called once per row, so each row may receive a different symbol.
pub fn add_column_at(
    grid: &mut Grid,
    index: usize,
    mode: ColumnMode,
    mut cell: impl FnMut() -> char,
) -> MutationOutcome {
    if grid.is_empty() || index >= grid.first_row_len() {
        return MutationOutcome::NoOp;
    }
    for row in &mut grid.rows {
        let at = index.min(row.len());
        match mode {
            ColumnMode::Fixed => row.insert(at, cell()),
            ColumnMode::Legacy => {
                let mut spliced = Vec::with_capacity(row.len() + 1);
                spliced.extend_from_slice(&row[..at]);
                spliced.push(cell());
                spliced.extend_from_slice(&row[at..]);
                row.extend(spliced);
            }
        }
    }
    MutationOutcome::Applied { index }
}

pub fn remove_column_at(grid: &mut Grid, index: usize, mode: ColumnMode) -> MutationOutcome {
    if grid.is_empty() || index >= grid.first_row_len() {
        return MutationOutcome::NoOp;
    }
    for row in &mut grid.rows {
        match mode {
            ColumnMode::Fixed => {
                if index < row.len() {
                    row.remove(index);
                }
            }
            ColumnMode::Legacy => {
                // Head is `row[..index - 1]`, except that index 0 wraps around to
                // "everything but the last cell".
                let len = row.len();
                let head_end = match index.checked_sub(1) {
                    Some(h) => h.min(len),
                    None => len.saturating_sub(1),
                };
                let tail_start = index.min(len);
                let mut spliced = Vec::with_capacity(len);
                spliced.extend_from_slice(&row[..head_end]);
                spliced.extend_from_slice(&row[tail_start..]);
                row.extend(spliced);
            }
        }
    }
    MutationOutcome::Applied { index }
}
