use super::models::{
    AuditRow, BodyweightRow, ExerciseRankRow, MuscleGroupRankRow, MuscleRankRow, PrRow,
    ProfileRow, SessionSetRow, UserRankRow,
};
use async_trait::async_trait;
use atlas_core::{
    AuditStatus, BodyweightEntry, CalculationAudit, ExerciseRef, Gender, PrType,
    RankRowUpdate, RankUpdatePayload, SetCalcUpdate, UserExercisePr, UserExerciseRank,
    UserMuscleGroupRank, UserMuscleRank, UserProfile, UserRank, UserStateRepository, WorkoutSet,
};
use chrono::{DateTime, Utc};
use sqlx::{query, query_as, QueryBuilder, Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

pub struct SqliteUserStateRepository {
    pool: SqlitePool,
}

fn timestamp(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
}

impl SqliteUserStateRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool for transaction creation
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================================================================
    // Upstream surface: rows the session and profile flows persist before
    // the ranking core runs
    // ========================================================================

    pub async fn upsert_user_profile(&self, profile: &UserProfile) -> anyhow::Result<()> {
        query(
            "INSERT INTO user_profiles (id, gender, is_premium, rank_calculator_balance)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                gender = excluded.gender,
                is_premium = excluded.is_premium,
                rank_calculator_balance = excluded.rank_calculator_balance",
        )
        .bind(profile.id)
        .bind(profile.gender.as_str())
        .bind(profile.is_premium)
        .bind(profile.rank_calculator_balance)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn insert_bodyweight(&self, entry: &BodyweightEntry) -> anyhow::Result<()> {
        query("INSERT INTO bodyweight_entries (user_id, weight_kg, measured_at) VALUES (?, ?, ?)")
            .bind(entry.user_id)
            .bind(entry.weight_kg)
            .bind(entry.measured_at.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn create_workout_session(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        started_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        query("INSERT INTO workout_sessions (id, user_id, started_at) VALUES (?, ?, ?)")
            .bind(session_id)
            .bind(user_id)
            .bind(started_at.timestamp_millis())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    pub async fn insert_session_set(&self, set: &WorkoutSet) -> anyhow::Result<()> {
        let session_id = set
            .session_id
            .ok_or_else(|| anyhow::anyhow!("set {} has no session", set.id))?;

        let (exercise_id, custom_exercise_id) = match set.exercise {
            ExerciseRef::Standard(id) => (Some(id), None),
            ExerciseRef::Custom(id) => (None, Some(id)),
        };

        query(
            "INSERT INTO workout_session_sets
             (id, session_id, exercise_id, custom_exercise_id, set_order, reps, weight_kg,
              performed_at, calc_one_rep_max, calc_swr)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(set.id)
        .bind(session_id)
        .bind(exercise_id)
        .bind(custom_exercise_id)
        .bind(set.set_order)
        .bind(set.reps)
        .bind(set.weight_kg)
        .bind(set.performed_at.timestamp_millis())
        .bind(set.calc_one_rep_max)
        .bind(set.calc_swr)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_calculator_balance(&self, user_id: Uuid) -> anyhow::Result<Option<i64>> {
        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT rank_calculator_balance FROM user_profiles WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(balance)
    }

    // ========================================================================
    // Transaction helpers for the bulk ranking write
    // ========================================================================

    /// Upsert one rank row. Locked rows never lose score; the leaderboard
    /// channel never drops within an epoch, even under concurrent writers.
    async fn upsert_exercise_rank_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        row: &RankRowUpdate,
        now_millis: i64,
    ) -> anyhow::Result<()> {
        let exercise_id = row
            .target_id
            .ok_or_else(|| anyhow::anyhow!("exercise rank update without target id"))?;

        query(
            "INSERT INTO user_exercise_ranks
             (user_id, exercise_id, score, rank_id, inter_rank_id, locked, leaderboard_score,
              contributing_set_id, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, exercise_id) DO UPDATE SET
                score = excluded.score,
                rank_id = excluded.rank_id,
                inter_rank_id = excluded.inter_rank_id,
                locked = excluded.locked,
                leaderboard_score = excluded.leaderboard_score,
                contributing_set_id = COALESCE(excluded.contributing_set_id,
                                               user_exercise_ranks.contributing_set_id),
                updated_at = excluded.updated_at
             WHERE user_exercise_ranks.locked = 0
                OR excluded.score > user_exercise_ranks.score
                OR excluded.leaderboard_score > user_exercise_ranks.leaderboard_score",
        )
        .bind(user_id)
        .bind(exercise_id)
        .bind(row.new_score)
        .bind(row.new_rank_id)
        .bind(row.new_inter_rank_id)
        .bind(row.locked)
        .bind(row.new_leaderboard_score)
        .bind(row.contributing_set_id)
        .bind(now_millis)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn upsert_muscle_rank_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        row: &RankRowUpdate,
        now_millis: i64,
    ) -> anyhow::Result<()> {
        let muscle_id = row
            .target_id
            .ok_or_else(|| anyhow::anyhow!("muscle rank update without target id"))?;

        query(
            "INSERT INTO user_muscle_ranks
             (user_id, muscle_id, score, rank_id, inter_rank_id, locked, leaderboard_score, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, muscle_id) DO UPDATE SET
                score = excluded.score,
                rank_id = excluded.rank_id,
                inter_rank_id = excluded.inter_rank_id,
                locked = excluded.locked,
                leaderboard_score = excluded.leaderboard_score,
                updated_at = excluded.updated_at
             WHERE user_muscle_ranks.locked = 0
                OR excluded.score > user_muscle_ranks.score
                OR excluded.leaderboard_score > user_muscle_ranks.leaderboard_score",
        )
        .bind(user_id)
        .bind(muscle_id)
        .bind(row.new_score)
        .bind(row.new_rank_id)
        .bind(row.new_inter_rank_id)
        .bind(row.locked)
        .bind(row.new_leaderboard_score)
        .bind(now_millis)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn upsert_muscle_group_rank_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        row: &RankRowUpdate,
        now_millis: i64,
    ) -> anyhow::Result<()> {
        let muscle_group_id = row
            .target_id
            .ok_or_else(|| anyhow::anyhow!("muscle group rank update without target id"))?;

        query(
            "INSERT INTO user_muscle_group_ranks
             (user_id, muscle_group_id, score, rank_id, inter_rank_id, locked, leaderboard_score, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, muscle_group_id) DO UPDATE SET
                score = excluded.score,
                rank_id = excluded.rank_id,
                inter_rank_id = excluded.inter_rank_id,
                locked = excluded.locked,
                leaderboard_score = excluded.leaderboard_score,
                updated_at = excluded.updated_at
             WHERE user_muscle_group_ranks.locked = 0
                OR excluded.score > user_muscle_group_ranks.score
                OR excluded.leaderboard_score > user_muscle_group_ranks.leaderboard_score",
        )
        .bind(user_id)
        .bind(muscle_group_id)
        .bind(row.new_score)
        .bind(row.new_rank_id)
        .bind(row.new_inter_rank_id)
        .bind(row.locked)
        .bind(row.new_leaderboard_score)
        .bind(now_millis)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn upsert_user_rank_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        user_id: Uuid,
        row: &RankRowUpdate,
        now_millis: i64,
    ) -> anyhow::Result<()> {
        query(
            "INSERT INTO user_ranks
             (user_id, score, rank_id, inter_rank_id, locked, leaderboard_score, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                score = excluded.score,
                rank_id = excluded.rank_id,
                inter_rank_id = excluded.inter_rank_id,
                locked = excluded.locked,
                leaderboard_score = excluded.leaderboard_score,
                updated_at = excluded.updated_at
             WHERE user_ranks.locked = 0
                OR excluded.score > user_ranks.score
                OR excluded.leaderboard_score > user_ranks.leaderboard_score",
        )
        .bind(user_id)
        .bind(row.new_score)
        .bind(row.new_rank_id)
        .bind(row.new_inter_rank_id)
        .bind(row.locked)
        .bind(row.new_leaderboard_score)
        .bind(now_millis)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Upsert a PR row; the guard keeps concurrent interleavings from ever
    /// lowering a stored record.
    async fn upsert_pr_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        pr: &UserExercisePr,
    ) -> anyhow::Result<()> {
        query(
            "INSERT INTO user_exercise_prs
             (user_id, exercise_key, pr_type, value, weight_kg, bodyweight, source_set_id, achieved_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(user_id, exercise_key, pr_type) DO UPDATE SET
                value = excluded.value,
                weight_kg = excluded.weight_kg,
                bodyweight = excluded.bodyweight,
                source_set_id = excluded.source_set_id,
                achieved_at = excluded.achieved_at
             WHERE excluded.value > user_exercise_prs.value",
        )
        .bind(pr.user_id)
        .bind(pr.exercise_key)
        .bind(pr.pr_type.as_str())
        .bind(pr.value)
        .bind(pr.weight_kg)
        .bind(pr.bodyweight)
        .bind(pr.source_set_id)
        .bind(pr.achieved_at.timestamp_millis())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn append_pr_history_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        pr: &UserExercisePr,
    ) -> anyhow::Result<()> {
        query(
            "INSERT INTO user_exercise_pr_history
             (user_id, exercise_key, pr_type, value, weight_kg, bodyweight, source_set_id, achieved_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(pr.user_id)
        .bind(pr.exercise_key)
        .bind(pr.pr_type.as_str())
        .bind(pr.value)
        .bind(pr.weight_kg)
        .bind(pr.bodyweight)
        .bind(pr.source_set_id)
        .bind(pr.achieved_at.timestamp_millis())
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    async fn write_set_calc_in_tx(
        tx: &mut Transaction<'_, Sqlite>,
        calc: &SetCalcUpdate,
    ) -> anyhow::Result<()> {
        query("UPDATE workout_session_sets SET calc_one_rep_max = ?, calc_swr = ? WHERE id = ?")
            .bind(calc.one_rep_max)
            .bind(calc.swr)
            .bind(calc.set_id)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    fn pr_from_row(row: PrRow) -> anyhow::Result<UserExercisePr> {
        Ok(UserExercisePr {
            user_id: row.user_id,
            exercise_key: row.exercise_key,
            pr_type: PrType::parse(&row.pr_type).map_err(|e| anyhow::anyhow!(e))?,
            value: row.value,
            weight_kg: row.weight_kg,
            bodyweight: row.bodyweight,
            source_set_id: row.source_set_id,
            achieved_at: timestamp(row.achieved_at),
        })
    }

    fn audit_from_row(row: AuditRow) -> anyhow::Result<CalculationAudit> {
        Ok(CalculationAudit {
            id: row.id,
            user_id: row.user_id,
            exercise_id: row.exercise_id,
            weight_kg: row.weight_kg,
            reps: row.reps as i32,
            balance_before: row.balance_before,
            balance_after: row.balance_after,
            status: AuditStatus::parse(&row.status).map_err(|e| anyhow::anyhow!(e))?,
            rank_up: row.rank_up.and_then(|s| serde_json::from_str(&s).ok()),
            created_at: timestamp(row.created_at),
            updated_at: timestamp(row.updated_at),
        })
    }
}

#[async_trait]
impl UserStateRepository for SqliteUserStateRepository {
    async fn get_user_profile(&self, user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        let row = query_as::<_, ProfileRow>(
            "SELECT id, gender, is_premium, rank_calculator_balance
             FROM user_profiles
             WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(UserProfile {
                id: r.id,
                gender: Gender::parse(&r.gender).map_err(|e| anyhow::anyhow!(e))?,
                is_premium: r.is_premium,
                rank_calculator_balance: r.rank_calculator_balance,
            })
        })
        .transpose()
    }

    async fn get_latest_bodyweight(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<BodyweightEntry>> {
        let row = query_as::<_, BodyweightRow>(
            "SELECT user_id, weight_kg, measured_at
             FROM bodyweight_entries
             WHERE user_id = ?
             ORDER BY measured_at DESC
             LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| BodyweightEntry {
            user_id: r.user_id,
            weight_kg: r.weight_kg,
            measured_at: timestamp(r.measured_at),
        }))
    }

    async fn get_session_sets(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> anyhow::Result<Vec<WorkoutSet>> {
        let rows = query_as::<_, SessionSetRow>(
            "SELECT s.id, s.session_id, s.exercise_id, s.custom_exercise_id, s.set_order,
                    s.reps, s.weight_kg, s.performed_at, s.calc_one_rep_max, s.calc_swr
             FROM workout_session_sets s
             JOIN workout_sessions ws ON ws.id = s.session_id
             WHERE ws.user_id = ? AND s.session_id = ?
             ORDER BY s.set_order ASC",
        )
        .bind(user_id)
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                let exercise = match (r.exercise_id, r.custom_exercise_id) {
                    (Some(id), None) => ExerciseRef::Standard(id),
                    (None, Some(id)) => ExerciseRef::Custom(id),
                    _ => anyhow::bail!("set {} has an ambiguous exercise reference", r.id),
                };
                Ok(WorkoutSet {
                    id: r.id,
                    session_id: Some(r.session_id),
                    exercise,
                    set_order: r.set_order as i32,
                    reps: r.reps as i32,
                    weight_kg: r.weight_kg,
                    performed_at: timestamp(r.performed_at),
                    calc_one_rep_max: r.calc_one_rep_max,
                    calc_swr: r.calc_swr,
                })
            })
            .collect()
    }

    async fn get_exercise_ranks(
        &self,
        user_id: Uuid,
        exercise_ids: &[Uuid],
    ) -> anyhow::Result<Vec<UserExerciseRank>> {
        if exercise_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut builder = QueryBuilder::new(
            "SELECT user_id, exercise_id, score, rank_id, inter_rank_id, locked,
                    leaderboard_score, contributing_set_id, updated_at
             FROM user_exercise_ranks
             WHERE user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(" AND exercise_id IN (");
        let mut separated = builder.separated(", ");
        for id in exercise_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<ExerciseRankRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserExerciseRank {
                user_id: r.user_id,
                exercise_id: r.exercise_id,
                score: r.score,
                rank_id: r.rank_id,
                inter_rank_id: r.inter_rank_id,
                locked: r.locked,
                leaderboard_score: r.leaderboard_score,
                contributing_set_id: r.contributing_set_id,
                updated_at: timestamp(r.updated_at),
            })
            .collect())
    }

    async fn get_muscle_ranks(&self, user_id: Uuid) -> anyhow::Result<Vec<UserMuscleRank>> {
        let rows = query_as::<_, MuscleRankRow>(
            "SELECT user_id, muscle_id, score, rank_id, inter_rank_id, locked,
                    leaderboard_score, updated_at
             FROM user_muscle_ranks
             WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserMuscleRank {
                user_id: r.user_id,
                muscle_id: r.muscle_id,
                score: r.score,
                rank_id: r.rank_id,
                inter_rank_id: r.inter_rank_id,
                locked: r.locked,
                leaderboard_score: r.leaderboard_score,
                updated_at: timestamp(r.updated_at),
            })
            .collect())
    }

    async fn get_muscle_group_ranks(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Vec<UserMuscleGroupRank>> {
        let rows = query_as::<_, MuscleGroupRankRow>(
            "SELECT user_id, muscle_group_id, score, rank_id, inter_rank_id, locked,
                    leaderboard_score, updated_at
             FROM user_muscle_group_ranks
             WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserMuscleGroupRank {
                user_id: r.user_id,
                muscle_group_id: r.muscle_group_id,
                score: r.score,
                rank_id: r.rank_id,
                inter_rank_id: r.inter_rank_id,
                locked: r.locked,
                leaderboard_score: r.leaderboard_score,
                updated_at: timestamp(r.updated_at),
            })
            .collect())
    }

    async fn get_user_rank(&self, user_id: Uuid) -> anyhow::Result<Option<UserRank>> {
        let row = query_as::<_, UserRankRow>(
            "SELECT user_id, score, rank_id, inter_rank_id, locked, leaderboard_score, updated_at
             FROM user_ranks
             WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserRank {
            user_id: r.user_id,
            score: r.score,
            rank_id: r.rank_id,
            inter_rank_id: r.inter_rank_id,
            locked: r.locked,
            leaderboard_score: r.leaderboard_score,
            updated_at: timestamp(r.updated_at),
        }))
    }

    async fn get_exercise_prs(
        &self,
        user_id: Uuid,
        exercise_keys: &[Uuid],
    ) -> anyhow::Result<Vec<UserExercisePr>> {
        if exercise_keys.is_empty() {
            return Ok(vec![]);
        }

        let mut builder = QueryBuilder::new(
            "SELECT user_id, exercise_key, pr_type, value, weight_kg, bodyweight,
                    source_set_id, achieved_at
             FROM user_exercise_prs
             WHERE user_id = ",
        );
        builder.push_bind(user_id);
        builder.push(" AND exercise_key IN (");
        let mut separated = builder.separated(", ");
        for key in exercise_keys {
            separated.push_bind(*key);
        }
        separated.push_unseparated(")");

        let rows = builder
            .build_query_as::<PrRow>()
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Self::pr_from_row).collect()
    }

    /// All writes of one pipeline run in a single transaction: either every
    /// row moves or none do.
    async fn apply_ranking_update(
        &self,
        user_id: Uuid,
        payload: &RankUpdatePayload,
        pr_upserts: &[UserExercisePr],
        pr_history: &[UserExercisePr],
        set_calcs: &[SetCalcUpdate],
    ) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        let now_millis = Utc::now().timestamp_millis();

        for row in &payload.exercise_ranks {
            Self::upsert_exercise_rank_in_tx(&mut tx, user_id, row, now_millis).await?;
        }
        for row in &payload.muscle_ranks {
            Self::upsert_muscle_rank_in_tx(&mut tx, user_id, row, now_millis).await?;
        }
        for row in &payload.muscle_group_ranks {
            Self::upsert_muscle_group_rank_in_tx(&mut tx, user_id, row, now_millis).await?;
        }
        if let Some(row) = &payload.user_rank {
            Self::upsert_user_rank_in_tx(&mut tx, user_id, row, now_millis).await?;
        }

        for pr in pr_upserts {
            Self::upsert_pr_in_tx(&mut tx, pr).await?;
        }
        for pr in pr_history {
            Self::append_pr_history_in_tx(&mut tx, pr).await?;
        }
        for calc in set_calcs {
            Self::write_set_calc_in_tx(&mut tx, calc).await?;
        }

        tx.commit().await?;

        tracing::debug!(
            %user_id,
            exercise_rows = payload.exercise_ranks.len(),
            muscle_rows = payload.muscle_ranks.len(),
            group_rows = payload.muscle_group_ranks.len(),
            prs = pr_upserts.len(),
            "ranking update applied"
        );

        Ok(())
    }

    async fn create_audit(&self, audit: &CalculationAudit) -> anyhow::Result<()> {
        let rank_up = audit
            .rank_up
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        query(
            "INSERT INTO calculation_audits
             (id, user_id, exercise_id, weight_kg, reps, balance_before, balance_after,
              status, rank_up, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(audit.id)
        .bind(audit.user_id)
        .bind(audit.exercise_id)
        .bind(audit.weight_kg)
        .bind(audit.reps)
        .bind(audit.balance_before)
        .bind(audit.balance_after)
        .bind(audit.status.as_str())
        .bind(rank_up)
        .bind(audit.created_at.timestamp_millis())
        .bind(audit.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn finalize_audit(
        &self,
        audit_id: Uuid,
        status: AuditStatus,
        rank_up: Option<serde_json::Value>,
    ) -> anyhow::Result<()> {
        if !status.is_terminal() {
            anyhow::bail!("audit {} cannot transition to {}", audit_id, status);
        }

        let rank_up = rank_up.as_ref().map(serde_json::to_string).transpose()?;

        // Terminal states are immutable: only a processing row may move
        let result = query(
            "UPDATE calculation_audits
             SET status = ?, rank_up = ?, updated_at = ?
             WHERE id = ? AND status = 'processing'",
        )
        .bind(status.as_str())
        .bind(rank_up)
        .bind(Utc::now().timestamp_millis())
        .bind(audit_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            anyhow::bail!("audit {} is missing or already terminal", audit_id);
        }

        Ok(())
    }

    async fn get_audit(&self, audit_id: Uuid) -> anyhow::Result<Option<CalculationAudit>> {
        let row = query_as::<_, AuditRow>(
            "SELECT id, user_id, exercise_id, weight_kg, reps, balance_before, balance_after,
                    status, rank_up, created_at, updated_at
             FROM calculation_audits
             WHERE id = ?",
        )
        .bind(audit_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::audit_from_row).transpose()
    }

    async fn decrement_calculator_balance(&self, user_id: Uuid) -> anyhow::Result<Option<i64>> {
        let result = query(
            "UPDATE user_profiles
             SET rank_calculator_balance = rank_calculator_balance - 1
             WHERE id = ? AND rank_calculator_balance > 0",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let balance = sqlx::query_scalar::<_, i64>(
            "SELECT rank_calculator_balance FROM user_profiles WHERE id = ?",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(balance))
    }

    async fn restore_calculator_balance(&self, user_id: Uuid) -> anyhow::Result<()> {
        query("UPDATE user_profiles SET rank_calculator_balance = rank_calculator_balance + 1 WHERE id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn fail_stale_audits(&self, older_than: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = query(
            "UPDATE calculation_audits
             SET status = 'failed', updated_at = ?
             WHERE status = 'processing' AND created_at < ?",
        )
        .bind(Utc::now().timestamp_millis())
        .bind(older_than.timestamp_millis())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn reset_leaderboard_scores(&self) -> anyhow::Result<u64> {
        let mut tx = self.pool.begin().await?;
        let mut total = 0u64;

        for table in [
            "user_exercise_ranks",
            "user_muscle_ranks",
            "user_muscle_group_ranks",
            "user_ranks",
        ] {
            let result = query(&format!(
                "UPDATE {} SET leaderboard_score = 0 WHERE leaderboard_score <> 0",
                table
            ))
            .execute(&mut *tx)
            .await?;
            total += result.rows_affected();
        }

        tx.commit().await?;

        Ok(total)
    }
}
