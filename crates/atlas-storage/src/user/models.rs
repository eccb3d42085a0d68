/// Database row types for user.db
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub id: Uuid,
    pub gender: String,
    pub is_premium: bool,
    pub rank_calculator_balance: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct BodyweightRow {
    pub user_id: Uuid,
    pub weight_kg: f64,
    pub measured_at: i64, // milliseconds since epoch
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionSetRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub exercise_id: Option<Uuid>,
    pub custom_exercise_id: Option<Uuid>,
    pub set_order: i64,
    pub reps: i64,
    pub weight_kg: f64,
    pub performed_at: i64,
    pub calc_one_rep_max: Option<f64>,
    pub calc_swr: Option<f64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExerciseRankRow {
    pub user_id: Uuid,
    pub exercise_id: Uuid,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
    pub locked: bool,
    pub leaderboard_score: f64,
    pub contributing_set_id: Option<Uuid>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct MuscleRankRow {
    pub user_id: Uuid,
    pub muscle_id: Uuid,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
    pub locked: bool,
    pub leaderboard_score: f64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct MuscleGroupRankRow {
    pub user_id: Uuid,
    pub muscle_group_id: Uuid,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
    pub locked: bool,
    pub leaderboard_score: f64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct UserRankRow {
    pub user_id: Uuid,
    pub score: f64,
    pub rank_id: i64,
    pub inter_rank_id: Option<i64>,
    pub locked: bool,
    pub leaderboard_score: f64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct PrRow {
    pub user_id: Uuid,
    pub exercise_key: Uuid,
    pub pr_type: String,
    pub value: f64,
    pub weight_kg: f64,
    pub bodyweight: Option<f64>,
    pub source_set_id: Option<Uuid>,
    pub achieved_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct AuditRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub exercise_id: Uuid,
    pub weight_kg: f64,
    pub reps: i64,
    pub balance_before: Option<i64>,
    pub balance_after: Option<i64>,
    pub status: String,
    pub rank_up: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}
