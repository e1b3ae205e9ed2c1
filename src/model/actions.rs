//! Random action sequences passed to the target as its second argument.

use rand_core::RngCore;

use crate::{GridFuzzError, GridFuzzResult, pick_index, range_inclusive};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionAlphabet {
    symbols: Vec<char>,
}

impl ActionAlphabet {
    pub fn new(symbols: &str) -> GridFuzzResult<Self> {
        let symbols: Vec<char> = symbols.chars().collect();
        if symbols.is_empty() {
            return Err(GridFuzzError::InvalidArgument(
                "action alphabet must not be empty".to_string(),
            ));
        }
        if symbols.iter().any(|c| c.is_whitespace()) {
            return Err(GridFuzzError::InvalidArgument(
                "action alphabet must not contain whitespace".to_string(),
            ));
        }
        Ok(Self { symbols })
    }

    /// Length is uniform in `[0, max_len]`; each symbol is drawn independently.
    pub fn generate(&self, max_len: usize, rng: &mut impl RngCore) -> String {
        let n = range_inclusive(rng, 0, max_len);
        (0..n)
            .map(|_| self.symbols[pick_index(rng, self.symbols.len())])
            .collect()
    }

    pub fn contains(&self, c: char) -> bool {
        self.symbols.contains(&c)
    }
}

impl Default for ActionAlphabet {
    fn default() -> Self {
        Self {
            symbols: vec!['E', 'S', 'U', 'D', 'Q', 'W', 'L', 'R'],
        }
    }
}
