/// Database row types for reference.db
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ExerciseRow {
    pub id: Uuid,
    pub name: String,
    pub exercise_type: String,
    pub bilateral: bool,
    pub elite_swr_male: Option<f64>,
    pub elite_swr_female: Option<f64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct MuscleGroupRow {
    pub id: Uuid,
    pub name: String,
    pub overall_weight: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct MuscleRow {
    pub id: Uuid,
    pub name: String,
    pub muscle_group_id: Uuid,
    pub muscle_group_weight: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExerciseMuscleRow {
    pub exercise_id: Uuid,
    pub muscle_id: Uuid,
    pub intensity: String,
    pub weight: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct RankRow {
    pub id: i64,
    pub name: String,
    pub min_score: f64,
    pub max_score: f64,
}

#[derive(Debug, Clone, FromRow)]
pub struct InterRankRow {
    pub id: i64,
    pub rank_id: i64,
    pub name: String,
    pub min_score: f64,
    pub max_score: f64,
    pub sort_order: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct LevelDefinitionRow {
    pub level: i64,
    pub min_xp: i64,
    pub title: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct BenchmarkRow {
    pub gender: String,
    pub target_id: Option<Uuid>,
    pub min_threshold: f64,
    pub rank_id: i64,
}
