use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum RankingError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("User not found: {0}")]
    UserNotFound(Uuid),

    #[error("No bodyweight recorded for user: {0}")]
    BodyweightNotFound(Uuid),

    #[error("Exercise not found: {0}")]
    ExerciseNotFound(Uuid),

    #[error("Rank calculator balance exhausted")]
    InsufficientBalance,

    #[error("Operation exceeded its deadline")]
    Deadline,

    #[error("Persistence failure: {0}")]
    Persistence(String),

    #[error("Reference data unavailable: {0}")]
    ReferenceData(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RankingError {
    pub fn persistence(err: impl std::fmt::Display) -> Self {
        RankingError::Persistence(err.to_string())
    }

    pub fn reference(err: impl std::fmt::Display) -> Self {
        RankingError::ReferenceData(err.to_string())
    }
}
