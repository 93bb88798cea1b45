//! Score - Trust score bounded to 0..=100

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScoreError {
    #[error("Score out of range (0..=100): {0}")]
    OutOfRange(u32),
}

/// An individual or blended trust score.
///
/// # Invariant
/// The inner value is always within `0..=100`. Arithmetic saturates at the
/// bounds instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Score(u8);

impl Score {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(100);

    /// Score given to every newly registered member.
    pub const INITIAL: Self = Self(50);

    pub fn new(value: u32) -> Result<Self, ScoreError> {
        if value > 100 {
            Err(ScoreError::OutOfRange(value))
        } else {
            Ok(Self(value as u8))
        }
    }

    /// Clamp any signed value into range.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, 100) as u8)
    }

    #[inline]
    pub const fn value(&self) -> u32 {
        self.0 as u32
    }

    /// Add a signed delta, saturating at 0 and 100.
    pub fn saturating_adjust(self, delta: i32) -> Self {
        Self::clamped(self.0 as i64 + delta as i64)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Score {
    type Error = ScoreError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Score> for u32 {
    fn from(score: Score) -> Self {
        score.value()
    }
}

impl Default for Score {
    fn default() -> Self {
        Self::INITIAL
    }
}
