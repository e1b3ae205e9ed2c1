//! Duration values for CLI flags and `gridfuzz.toml` (e.g. "250ms", "30s", "5m", "2h").

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::{GridFuzzError, GridFuzzResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GridFuzzDuration(pub Duration);

impl FromStr for GridFuzzDuration {
    type Err = GridFuzzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s).map(Self)
    }
}

impl TryFrom<String> for GridFuzzDuration {
    type Error = GridFuzzError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GridFuzzDuration> for String {
    fn from(value: GridFuzzDuration) -> Self {
        value.to_string()
    }
}

impl fmt::Display for GridFuzzDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0.as_millis();
        if ms % 1000 != 0 {
            write!(f, "{ms}ms")
        } else {
            write!(f, "{}s", ms / 1000)
        }
    }
}

pub fn parse_duration(input: &str) -> GridFuzzResult<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return Err(GridFuzzError::InvalidArgument("empty duration".to_string()));
    }

    let (num_part, unit_part) = split_num_unit(s)?;
    let value: u64 = num_part.parse().map_err(|_| {
        GridFuzzError::InvalidArgument(format!(
            "invalid duration number: {num_part} (from {input:?})"
        ))
    })?;

    let dur = match unit_part {
        "ms" => Duration::from_millis(value),
        "s" => Duration::from_secs(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(60 * 60)),
        _ => {
            return Err(GridFuzzError::InvalidArgument(format!(
                "invalid duration unit {unit_part:?} (expected ms|s|m|h)"
            )));
        }
    };

    Ok(dur)
}

fn split_num_unit(s: &str) -> GridFuzzResult<(&str, &str)> {
    let idx = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(i, _)| i)
        .unwrap_or(s.len());

    if idx == 0 {
        return Err(GridFuzzError::InvalidArgument(format!(
            "invalid duration {s:?} (missing number)"
        )));
    }

    if idx >= s.len() {
        return Err(GridFuzzError::InvalidArgument(format!(
            "invalid duration {s:?} (missing unit; expected ms|s|m|h)"
        )));
    }

    Ok((&s[..idx], &s[idx..]))
}
