use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use thiserror::Error;

/// A recorded result for one side of a pairing.
///
/// Scores only compare against scores of the same kind. `Points` rank
/// higher-is-better, `Time` ranks lower-is-better.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Score {
    Points(i64),
    Time(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScoreError {
    #[error("cannot compare a {left} score with a {right} score")]
    KindMismatch {
        left: &'static str,
        right: &'static str,
    },

    #[error("score overflow while adding {kind} scores")]
    Overflow { kind: &'static str },
}

impl Score {
    pub fn kind(&self) -> &'static str {
        match self {
            Score::Points(_) => "points",
            Score::Time(_) => "time",
        }
    }

    /// `Greater` means `self` is the better result.
    pub fn try_cmp(&self, other: &Score) -> Result<Ordering, ScoreError> {
        match (self, other) {
            (Score::Points(a), Score::Points(b)) => Ok(a.cmp(b)),
            (Score::Time(a), Score::Time(b)) => Ok(b.cmp(a)),
            _ => Err(self.mismatch(other)),
        }
    }

    pub fn checked_add(&self, other: &Score) -> Result<Score, ScoreError> {
        match (self, other) {
            (Score::Points(a), Score::Points(b)) => a
                .checked_add(*b)
                .map(Score::Points)
                .ok_or(ScoreError::Overflow { kind: "points" }),
            (Score::Time(a), Score::Time(b)) => a
                .checked_add(*b)
                .map(Score::Time)
                .ok_or(ScoreError::Overflow { kind: "time" }),
            _ => Err(self.mismatch(other)),
        }
    }

    /// Orders two optional scores. A missing score is worse than any score.
    pub fn compare(left: Option<&Score>, right: Option<&Score>) -> Result<Ordering, ScoreError> {
        match (left, right) {
            (Some(a), Some(b)) => a.try_cmp(b),
            (Some(_), None) => Ok(Ordering::Greater),
            (None, Some(_)) => Ok(Ordering::Less),
            (None, None) => Ok(Ordering::Equal),
        }
    }

    fn mismatch(&self, other: &Score) -> ScoreError {
        ScoreError::KindMismatch {
            left: self.kind(),
            right: other.kind(),
        }
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Score::Points(value) => write!(f, "{value}"),
            Score::Time(ms) => write!(f, "{}.{:03}s", ms / 1000, ms % 1000),
        }
    }
}
