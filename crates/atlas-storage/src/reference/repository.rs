use super::models::{
    BenchmarkRow, ExerciseMuscleRow, ExerciseRow, InterRankRow, LevelDefinitionRow,
    MuscleGroupRow, MuscleRow, RankRow,
};
use async_trait::async_trait;
use atlas_core::{
    Exercise, ExerciseMuscle, Gender, InterRank, LevelDefinition, Muscle, MuscleGroup,
    MuscleIntensity, Rank, RankBenchmark, ReferenceRepository,
};
use sqlx::{query_as, SqlitePool};

pub struct SqliteReferenceRepository {
    pool: SqlitePool,
}

impl SqliteReferenceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn benchmark_from_row(row: BenchmarkRow) -> anyhow::Result<RankBenchmark> {
        Ok(RankBenchmark {
            gender: Gender::parse(&row.gender).map_err(|e| anyhow::anyhow!(e))?,
            target_id: row.target_id,
            min_threshold: row.min_threshold,
            rank_id: row.rank_id,
        })
    }
}

#[async_trait]
impl ReferenceRepository for SqliteReferenceRepository {
    async fn load_exercises(&self) -> anyhow::Result<Vec<Exercise>> {
        let rows = query_as::<_, ExerciseRow>(
            "SELECT id, name, exercise_type, bilateral, elite_swr_male, elite_swr_female
             FROM exercises
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Exercise {
                id: r.id,
                name: r.name,
                exercise_type: r.exercise_type.into(),
                bilateral: r.bilateral,
                elite_swr_male: r.elite_swr_male,
                elite_swr_female: r.elite_swr_female,
            })
            .collect())
    }

    async fn load_exercise_muscles(&self) -> anyhow::Result<Vec<ExerciseMuscle>> {
        let rows = query_as::<_, ExerciseMuscleRow>(
            "SELECT exercise_id, muscle_id, intensity, weight FROM exercise_muscles",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(ExerciseMuscle {
                    exercise_id: r.exercise_id,
                    muscle_id: r.muscle_id,
                    intensity: MuscleIntensity::parse(&r.intensity)
                        .map_err(|e| anyhow::anyhow!(e))?,
                    weight: r.weight,
                })
            })
            .collect()
    }

    async fn load_muscles(&self) -> anyhow::Result<Vec<Muscle>> {
        let rows = query_as::<_, MuscleRow>(
            "SELECT id, name, muscle_group_id, muscle_group_weight FROM muscles ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Muscle {
                id: r.id,
                name: r.name,
                muscle_group_id: r.muscle_group_id,
                muscle_group_weight: r.muscle_group_weight,
            })
            .collect())
    }

    async fn load_muscle_groups(&self) -> anyhow::Result<Vec<MuscleGroup>> {
        let rows = query_as::<_, MuscleGroupRow>(
            "SELECT id, name, overall_weight FROM muscle_groups ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| MuscleGroup {
                id: r.id,
                name: r.name,
                overall_weight: r.overall_weight,
            })
            .collect())
    }

    async fn load_ranks(&self) -> anyhow::Result<Vec<Rank>> {
        let rows = query_as::<_, RankRow>(
            "SELECT id, name, min_score, max_score FROM ranks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| Rank {
                id: r.id,
                name: r.name,
                min_score: r.min_score,
                max_score: r.max_score,
            })
            .collect())
    }

    async fn load_inter_ranks(&self) -> anyhow::Result<Vec<InterRank>> {
        let rows = query_as::<_, InterRankRow>(
            "SELECT id, rank_id, name, min_score, max_score, sort_order
             FROM inter_ranks
             ORDER BY rank_id, sort_order",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| InterRank {
                id: r.id,
                rank_id: r.rank_id,
                name: r.name,
                min_score: r.min_score,
                max_score: r.max_score,
                sort_order: r.sort_order,
            })
            .collect())
    }

    async fn load_level_definitions(&self) -> anyhow::Result<Vec<LevelDefinition>> {
        let rows = query_as::<_, LevelDefinitionRow>(
            "SELECT level, min_xp, title FROM level_definitions ORDER BY level",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| LevelDefinition {
                level: r.level,
                min_xp: r.min_xp,
                title: r.title,
            })
            .collect())
    }

    async fn load_exercise_benchmarks(&self, gender: Gender) -> anyhow::Result<Vec<RankBenchmark>> {
        let rows = query_as::<_, BenchmarkRow>(
            "SELECT gender, exercise_id AS target_id, min_threshold, rank_id
             FROM exercise_benchmarks
             WHERE gender = ?
             ORDER BY exercise_id, min_threshold",
        )
        .bind(gender.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::benchmark_from_row).collect()
    }

    async fn load_muscle_benchmarks(&self, gender: Gender) -> anyhow::Result<Vec<RankBenchmark>> {
        let rows = query_as::<_, BenchmarkRow>(
            "SELECT gender, muscle_id AS target_id, min_threshold, rank_id
             FROM muscle_benchmarks
             WHERE gender = ?
             ORDER BY muscle_id, min_threshold",
        )
        .bind(gender.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::benchmark_from_row).collect()
    }

    async fn load_muscle_group_benchmarks(
        &self,
        gender: Gender,
    ) -> anyhow::Result<Vec<RankBenchmark>> {
        let rows = query_as::<_, BenchmarkRow>(
            "SELECT gender, muscle_group_id AS target_id, min_threshold, rank_id
             FROM muscle_group_benchmarks
             WHERE gender = ?
             ORDER BY muscle_group_id, min_threshold",
        )
        .bind(gender.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::benchmark_from_row).collect()
    }

    async fn load_overall_benchmarks(&self, gender: Gender) -> anyhow::Result<Vec<RankBenchmark>> {
        let rows = query_as::<_, BenchmarkRow>(
            "SELECT gender, NULL AS target_id, min_threshold, rank_id
             FROM overall_benchmarks
             WHERE gender = ?
             ORDER BY min_threshold",
        )
        .bind(gender.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::benchmark_from_row).collect()
    }
}
