//! Grid-structured map files and the symbol alphabets drawn from when fuzzing them.

use rand_core::RngCore;
use serde::{Deserialize, Serialize};

use crate::{GridFuzzError, GridFuzzResult, pick_index};

/// Rows of single-character cells. Rows may differ in length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: Vec<Vec<char>>,
}

impl Grid {
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Self {
        Self {
            rows: rows.iter().map(|r| r.as_ref().chars().collect()).collect(),
        }
    }

    /// Empty text is the empty grid; otherwise one trailing newline is dropped and the rest is
    /// split on `\n`, tolerating CRLF line endings.
    pub fn parse(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        let body = text.strip_suffix('\n').unwrap_or(text);
        let rows = body
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line).chars().collect())
            .collect();
        Self { rows }
    }

    /// Every row is newline-terminated, so `parse(serialize(g)) == g` even for
    /// jagged grids and empty rows.
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(self.rows.iter().map(|r| r.len() + 1).sum());
        for row in &self.rows {
            out.extend(row.iter());
            out.push('\n');
        }
        out
    }

    pub fn row_strings(&self) -> Vec<String> {
        self.rows.iter().map(|r| r.iter().collect()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Length of the first row; the column operators index by it.
    pub fn first_row_len(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn max_width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_rectangular(&self) -> bool {
        let w = self.first_row_len();
        self.rows.iter().all(|r| r.len() == w)
    }
}

/// Weighted cell symbols. Repeating a symbol makes it proportionally more likely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellAlphabet {
    symbols: Vec<char>,
}

impl CellAlphabet {
    pub fn new(weighted: &str) -> GridFuzzResult<Self> {
        let symbols: Vec<char> = weighted.chars().collect();
        if symbols.is_empty() {
            return Err(GridFuzzError::InvalidArgument(
                "cell alphabet must not be empty".to_string(),
            ));
        }
        if let Some(bad) = symbols.iter().find(|c| **c == '\n' || **c == '\r') {
            return Err(GridFuzzError::InvalidArgument(format!(
                "cell alphabet must not contain line breaks (found {bad:?})"
            )));
        }
        Ok(Self { symbols })
    }

    pub fn sample(&self, rng: &mut impl RngCore) -> char {
        self.symbols[pick_index(rng, self.symbols.len())]
    }

    pub fn row(&self, len: usize, rng: &mut impl RngCore) -> Vec<char> {
        (0..len).map(|_| self.sample(rng)).collect()
    }

    pub fn contains(&self, c: char) -> bool {
        self.symbols.contains(&c)
    }
}

impl Default for CellAlphabet {
    fn default() -> Self {
        Self {
            symbols: "000FFFMMMWWWP".chars().collect(),
        }
    }
}
