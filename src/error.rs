use thiserror::Error;

use crate::score::ScoreError;

pub type Result<T> = std::result::Result<T, TournamentError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TournamentError {
    /// Bad caller input. The generator state is left untouched.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The supplied teams and rounds cannot be laid onto the bracket.
    #[error("invalid tournament state: {0}")]
    InvalidTournamentState(String),

    #[error("unsupported configuration: {0}")]
    Unsupported(String),

    #[error("generator has no loaded state")]
    NotInitialized,

    #[error("score error: {0}")]
    Score(#[from] ScoreError),
}

impl TournamentError {
    pub fn invalid_state(message: impl Into<String>) -> Self {
        TournamentError::InvalidTournamentState(message.into())
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, TournamentError::InvalidTournamentState(_))
    }

    /// Prefixes an invalid-state diagnosis with where in the history it happened.
    pub(crate) fn in_context(self, context: &str) -> Self {
        match self {
            TournamentError::InvalidTournamentState(msg) => {
                TournamentError::InvalidTournamentState(format!("{context}: {msg}"))
            }
            TournamentError::Score(err) => {
                TournamentError::InvalidTournamentState(format!("{context}: {err}"))
            }
            other => other,
        }
    }
}
