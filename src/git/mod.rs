use std::fmt::Display;
use std::str::FromStr;

use crate::AppError;

/// Structured delta extraction and per-path patch building.
pub(crate) mod diff;

/// History walking, commit metadata, and content retrieval.
pub mod hist;

/// A content-similarity percentage used to classify a delete+add pair as a
/// rename or copy. Accepts `"40"` or `"40%"`, bounded to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Similarity(u16);

impl Similarity {
    pub fn percent(self) -> u16 {
        self.0
    }
}

impl Default for Similarity {
    fn default() -> Self {
        Similarity(1)
    }
}

impl Display for Similarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

impl FromStr for Similarity {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
        let value: u16 = digits
            .parse()
            .map_err(|_| AppError::Threshold(format!("'{}' is not a percentage", s)))?;
        if value > 100 {
            return Err(AppError::Threshold(format!(
                "'{}' is above 100%",
                s
            )));
        }
        Ok(Similarity(value))
    }
}

/// The rename and copy detection thresholds applied to every diff of a run,
/// so path identity is detected consistently between the commit-list walk
/// and per-commit resolution.
#[derive(Debug, Clone, Copy, Default)]
pub struct Thresholds {
    pub rename: Similarity,
    pub copy: Similarity,
}
