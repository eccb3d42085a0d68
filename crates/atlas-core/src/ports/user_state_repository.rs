use crate::domain::{
    AuditStatus, BodyweightEntry, CalculationAudit, RankUpdatePayload, SetCalcUpdate,
    UserExercisePr, UserExerciseRank, UserMuscleGroupRank, UserMuscleRank, UserProfile, UserRank,
    WorkoutSet,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Persistence gateway for all per-user mutable state: rank rows at the four
/// tiers, PRs, quota, audits and the finalized workout sets the pipeline
/// reads back.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserStateRepository: Send + Sync {
    async fn get_user_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>>;

    /// Most recent bodyweight measurement for the user.
    async fn get_latest_bodyweight(&self, user_id: Uuid)
        -> anyhow::Result<Option<BodyweightEntry>>;

    /// Sets of a finalized session, in set order. The rows were persisted by
    /// the upstream session flow.
    async fn get_session_sets(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> anyhow::Result<Vec<WorkoutSet>>;

    /// Stored exercise-rank rows for the given exercises.
    async fn get_exercise_ranks(
        &self,
        user_id: Uuid,
        exercise_ids: &[Uuid],
    ) -> anyhow::Result<Vec<UserExerciseRank>>;

    async fn get_muscle_ranks(&self, user_id: Uuid) -> anyhow::Result<Vec<UserMuscleRank>>;

    async fn get_muscle_group_ranks(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<UserMuscleGroupRank>>;

    async fn get_user_rank(&self, user_id: Uuid) -> anyhow::Result<Option<UserRank>>;

    /// Stored PRs for the given exercise keys (standard or custom ids).
    async fn get_exercise_prs(
        &self,
        user_id: Uuid,
        exercise_keys: &[Uuid],
    ) -> anyhow::Result<Vec<UserExercisePr>>;

    /// Apply one pipeline run as a single transaction: the four rank arrays,
    /// the PR upserts, the PR history appends and the set write-backs all
    /// move together or not at all.
    async fn apply_ranking_update(
        &self,
        user_id: Uuid,
        payload: &RankUpdatePayload,
        pr_upserts: &[UserExercisePr],
        pr_history: &[UserExercisePr],
        set_calcs: &[SetCalcUpdate],
    ) -> anyhow::Result<()>;

    async fn create_audit(&self, audit: &CalculationAudit) -> anyhow::Result<()>;

    /// Transition an audit row out of `processing`. Fails if the row is
    /// missing or already terminal.
    async fn finalize_audit(
        &self,
        audit_id: Uuid,
        status: AuditStatus,
        rank_up: Option<serde_json::Value>,
    ) -> anyhow::Result<()>;

    async fn get_audit(&self, audit_id: Uuid) -> anyhow::Result<Option<CalculationAudit>>;

    /// Conditionally spend one calculator credit. Returns the remaining
    /// balance, or None when the balance was already exhausted (no decrement
    /// happened).
    async fn decrement_calculator_balance(&self, user_id: Uuid) -> anyhow::Result<Option<i64>>;

    /// Compensation for a decrement whose bulk write failed.
    async fn restore_calculator_balance(&self, user_id: Uuid) -> anyhow::Result<()>;

    /// Mark `processing` audits older than the cutoff as failed. Returns the
    /// number of rows swept.
    async fn fail_stale_audits(&self, older_than: DateTime<Utc>) -> anyhow::Result<u64>;

    /// Zero the leaderboard channel on every rank row; invoked at epoch
    /// boundaries by an external scheduler.
    async fn reset_leaderboard_scores(&self) -> anyhow::Result<u64>;
}
