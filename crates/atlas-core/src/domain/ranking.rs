use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub gender: super::Gender,
    pub is_premium: bool,
    pub rank_calculator_balance: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyweightEntry {
    pub user_id: Uuid,
    pub weight_kg: f64,
    pub measured_at: DateTime<Utc>,
}

/// Which catalog an exercise reference points into. Custom exercises are
/// user-defined; they key PRs but are excluded from ranking and benchmark
/// lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ExerciseRef {
    Standard(Uuid),
    Custom(Uuid),
}

impl ExerciseRef {
    /// The standard-catalog id, if this reference is rankable.
    pub fn standard_id(&self) -> Option<Uuid> {
        match self {
            ExerciseRef::Standard(id) => Some(*id),
            ExerciseRef::Custom(_) => None,
        }
    }

    /// The id under which PRs are keyed, regardless of kind.
    pub fn key(&self) -> Uuid {
        match self {
            ExerciseRef::Standard(id) | ExerciseRef::Custom(id) => *id,
        }
    }
}

/// A single performed set. Sets created by workout finalization are persisted
/// upstream; sets synthesized by the manual calculator live only in memory
/// for the duration of one orchestrator call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: Uuid,
    pub session_id: Option<Uuid>,
    pub exercise: ExerciseRef,
    pub set_order: i32,
    pub reps: i32,
    pub weight_kg: f64,
    pub performed_at: DateTime<Utc>,
    pub calc_one_rep_max: Option<f64>,
    pub calc_swr: Option<f64>,
}

impl WorkoutSet {
    /// Build the in-memory set for a manual calculator entry.
    pub fn synthetic(exercise_id: Uuid, weight_kg: f64, reps: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: None,
            exercise: ExerciseRef::Standard(exercise_id),
            set_order: 1,
            reps,
            weight_kg,
            performed_at: Utc::now(),
            calc_one_rep_max: None,
            calc_swr: None,
        }
    }
}

/// A set together with its derived strength measures.
#[derive(Debug, Clone)]
pub struct ScoredSet {
    pub set: WorkoutSet,
    pub estimated_one_rep_max: f64,
    pub swr: f64,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
}

// The four entity tiers the pipeline updates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RankTier {
    Exercise,
    Muscle,
    MuscleGroup,
    Overall,
}

impl RankTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankTier::Exercise => "exercise",
            RankTier::Muscle => "muscle",
            RankTier::MuscleGroup => "muscle_group",
            RankTier::Overall => "overall",
        }
    }
}

impl std::fmt::Display for RankTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserExerciseRank {
    pub user_id: Uuid,
    pub exercise_id: Uuid,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
    pub locked: bool,
    pub leaderboard_score: f64,
    pub contributing_set_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMuscleRank {
    pub user_id: Uuid,
    pub muscle_id: Uuid,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
    pub locked: bool,
    pub leaderboard_score: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserMuscleGroupRank {
    pub user_id: Uuid,
    pub muscle_group_id: Uuid,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
    pub locked: bool,
    pub leaderboard_score: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRank {
    pub user_id: Uuid,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
    pub locked: bool,
    pub leaderboard_score: f64,
    pub updated_at: DateTime<Utc>,
}

/// One changed row in the update payload. `old_*` fields are None when the
/// row is being created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankRowUpdate {
    /// None for the overall (user) row.
    pub target_id: Option<Uuid>,
    pub old_score: Option<f64>,
    pub new_score: f64,
    pub old_rank_id: Option<i64>,
    pub new_rank_id: i64,
    pub old_inter_rank_id: Option<i64>,
    pub new_inter_rank_id: Option<i64>,
    pub new_leaderboard_score: f64,
    pub locked: bool,
    pub contributing_set_id: Option<Uuid>,
}

impl RankRowUpdate {
    /// A rank-up requires a stored rank to strictly exceed; fresh rows are
    /// initializations, not rank-ups.
    pub fn is_rank_up(&self) -> bool {
        self.old_rank_id
            .map(|old| self.new_rank_id > old)
            .unwrap_or(false)
    }
}

/// All rows changed by one pipeline run, applied as a single bulk mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankUpdatePayload {
    pub exercise_ranks: Vec<RankRowUpdate>,
    pub muscle_ranks: Vec<RankRowUpdate>,
    pub muscle_group_ranks: Vec<RankRowUpdate>,
    pub user_rank: Option<RankRowUpdate>,
}

impl RankUpdatePayload {
    pub fn is_empty(&self) -> bool {
        self.exercise_ranks.is_empty()
            && self.muscle_ranks.is_empty()
            && self.muscle_group_ranks.is_empty()
            && self.user_rank.is_none()
    }
}

// Personal record metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PrType {
    OneRepMax,
    MaxReps,
    MaxSwr,
}

impl PrType {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "one_rep_max" => Ok(Self::OneRepMax),
            "max_reps" => Ok(Self::MaxReps),
            "max_swr" => Ok(Self::MaxSwr),
            _ => Err(format!("Unknown PR type: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrType::OneRepMax => "one_rep_max",
            PrType::MaxReps => "max_reps",
            PrType::MaxSwr => "max_swr",
        }
    }
}

impl std::fmt::Display for PrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A personal record. `weight_kg` is the load the record was achieved at;
/// max-reps candidates must match or exceed it to beat the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserExercisePr {
    pub user_id: Uuid,
    pub exercise_key: Uuid,
    pub pr_type: PrType,
    pub value: f64,
    pub weight_kg: f64,
    pub bodyweight: Option<f64>,
    pub source_set_id: Option<Uuid>,
    pub achieved_at: DateTime<Utc>,
}

// Audit row lifecycle: processing -> success | failed. Terminal states are
// immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Processing,
    Success,
    Failed,
}

impl AuditStatus {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown audit status: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Processing => "processing",
            AuditStatus::Success => "success",
            AuditStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AuditStatus::Success | AuditStatus::Failed)
    }
}

impl std::fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One manual-calculator call, with its quota context and outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationAudit {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exercise_id: Uuid,
    pub weight_kg: f64,
    pub reps: i32,
    pub balance_before: Option<i64>,
    pub balance_after: Option<i64>,
    pub status: AuditStatus,
    pub rank_up: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CalculationAudit {
    pub fn processing(
        user_id: Uuid,
        exercise_id: Uuid,
        weight_kg: f64,
        reps: i32,
        balance_before: Option<i64>,
        balance_after: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            exercise_id,
            weight_kg,
            reps,
            balance_before,
            balance_after,
            status: AuditStatus::Processing,
            rank_up: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Write-back of derived measures onto a finalized set row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetCalcUpdate {
    pub set_id: Uuid,
    pub one_rep_max: f64,
    pub swr: f64,
}

/// Manual calculator input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculatorEntry {
    pub exercise_id: Uuid,
    pub weight_kg: f64,
    pub reps: i32,
}

/// Per-tier progression delta for UI feedback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierProgression {
    pub tier: RankTier,
    pub target_id: Option<Uuid>,
    pub old_score: Option<f64>,
    pub new_score: f64,
    pub old_rank_id: Option<i64>,
    pub new_rank_id: i64,
    pub old_inter_rank_id: Option<i64>,
    pub new_inter_rank_id: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingSummary {
    pub any_rank_up: bool,
    pub overall_rank_up: bool,
    pub muscle_group_rank_up_count: usize,
    pub muscle_rank_up_count: usize,
}

/// Everything one orchestrator call produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingResults {
    pub payload: RankUpdatePayload,
    pub progressions: Vec<TierProgression>,
    pub new_prs: Vec<UserExercisePr>,
    pub summary: RankingSummary,
}
