use crate::domain::{
    Exercise, ExerciseMuscle, Gender, InterRank, LevelDefinition, Muscle, MuscleGroup, Rank,
    RankBenchmark,
};
use async_trait::async_trait;

/// Read side of the immutable reference tables. Implementations load whole
/// tables; callers go through the `ReferenceCatalog` cache, not this trait.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn load_exercises(&self) -> anyhow::Result<Vec<Exercise>>;

    async fn load_exercise_muscles(&self) -> anyhow::Result<Vec<ExerciseMuscle>>;

    async fn load_muscles(&self) -> anyhow::Result<Vec<Muscle>>;

    async fn load_muscle_groups(&self) -> anyhow::Result<Vec<MuscleGroup>>;

    async fn load_ranks(&self) -> anyhow::Result<Vec<Rank>>;

    async fn load_inter_ranks(&self) -> anyhow::Result<Vec<InterRank>>;

    async fn load_level_definitions(&self) -> anyhow::Result<Vec<LevelDefinition>>;

    /// Benchmark ladder per exercise, for one gender.
    async fn load_exercise_benchmarks(&self, gender: Gender) -> anyhow::Result<Vec<RankBenchmark>>;

    /// Benchmark ladder per muscle, for one gender.
    async fn load_muscle_benchmarks(&self, gender: Gender) -> anyhow::Result<Vec<RankBenchmark>>;

    /// Benchmark ladder per muscle group, for one gender.
    async fn load_muscle_group_benchmarks(
        &self,
        gender: Gender,
    ) -> anyhow::Result<Vec<RankBenchmark>>;

    /// Overall (user-level) benchmark ladder for one gender; rows carry no
    /// target id.
    async fn load_overall_benchmarks(&self, gender: Gender) -> anyhow::Result<Vec<RankBenchmark>>;
}
