pub mod catalog;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use domain::{
    AuditStatus,
    BodyweightEntry,
    CalculationAudit,
    CalculatorEntry,
    Exercise,
    ExerciseMuscle,
    ExerciseRef,
    ExerciseType,
    Gender,
    InterRank,
    LevelDefinition,
    Muscle,
    MuscleGroup,
    MuscleIntensity,
    PrType,
    Rank,
    RankBenchmark,
    RankRowUpdate,
    RankTier,
    RankUpdatePayload,
    RankingError,
    RankingResults,
    RankingSummary,
    ScoredSet,
    SetCalcUpdate,
    TierProgression,
    UserExercisePr,
    UserExerciseRank,
    UserMuscleGroupRank,
    UserMuscleRank,
    UserProfile,
    UserRank,
    WorkoutSet,
};

pub use ports::{ReferenceRepository, UserStateRepository};

pub use catalog::{CatalogKey, CatalogTable, ReferenceCatalog, DEFAULT_TTL};

pub use services::{
    aggregate, evaluate_prs, Aggregation, CalculatorConfig, CalculatorService, PrEvaluation,
    ReferenceContext, StoredRanks, WriteChannel,
};
