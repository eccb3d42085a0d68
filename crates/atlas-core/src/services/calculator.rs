use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::catalog::ReferenceCatalog;
use crate::domain::{
    AuditStatus, CalculationAudit, CalculatorEntry, Gender, PrType, RankingError, RankingResults,
    ScoredSet, SetCalcUpdate, UserExercisePr, UserProfile, WorkoutSet,
};
use crate::ports::UserStateRepository;
use crate::services::pr::evaluate_prs;
use crate::services::rank::{aggregate, ReferenceContext, StoredRanks, WriteChannel};
use crate::services::scoring;

#[derive(Debug, Clone)]
pub struct CalculatorConfig {
    /// Deadline for each datastore interaction, inherited from the request.
    pub request_deadline: Duration,
    /// Age after which a `processing` audit is swept to `failed`.
    pub stale_audit_timeout: Duration,
}

impl Default for CalculatorConfig {
    fn default() -> Self {
        Self {
            request_deadline: Duration::from_secs(10),
            stale_audit_timeout: Duration::from_secs(15 * 60),
        }
    }
}

/// Entry point for both upstream flows: workout finalization and the manual
/// rank calculator. Owns the quota and audit lifecycle and drives
/// Scorer -> PrEvaluator -> RankAggregator -> persistence.
pub struct CalculatorService {
    catalog: Arc<ReferenceCatalog>,
    user_repo: Arc<dyn UserStateRepository>,
    config: CalculatorConfig,
}

impl CalculatorService {
    pub fn new(catalog: Arc<ReferenceCatalog>, user_repo: Arc<dyn UserStateRepository>) -> Self {
        Self::with_config(catalog, user_repo, CalculatorConfig::default())
    }

    pub fn with_config(
        catalog: Arc<ReferenceCatalog>,
        user_repo: Arc<dyn UserStateRepository>,
        config: CalculatorConfig,
    ) -> Self {
        Self {
            catalog,
            user_repo,
            config,
        }
    }

    /// Workout finalization: rank every set of an already-persisted session.
    #[instrument(skip(self), fields(%user_id, %session_id))]
    pub async fn finalize_session(
        &self,
        user_id: Uuid,
        session_id: Uuid,
    ) -> Result<RankingResults, RankingError> {
        let profile = self
            .with_deadline(self.user_repo.get_user_profile(user_id))
            .await?
            .ok_or(RankingError::UserNotFound(user_id))?;

        let sets = self
            .with_deadline(self.user_repo.get_session_sets(user_id, session_id))
            .await?;

        if sets.is_empty() {
            debug!("session has no sets, nothing to rank");
            return Ok(RankingResults::default());
        }

        self.run_pipeline(&profile, sets, WriteChannel::Locked, true)
            .await
    }

    /// Manual calculator: rank a single synthetic set that never persists.
    /// Non-premium users spend one calculator credit per call.
    #[instrument(skip(self), fields(%user_id, exercise_id = %entry.exercise_id))]
    pub async fn calculate(
        &self,
        user_id: Uuid,
        entry: CalculatorEntry,
    ) -> Result<RankingResults, RankingError> {
        if entry.reps <= 0 {
            return Err(RankingError::Validation(
                "reps must be a positive integer".to_string(),
            ));
        }
        if entry.weight_kg < 0.0 {
            return Err(RankingError::Validation(
                "weight must be non-negative".to_string(),
            ));
        }

        let profile = self
            .with_deadline(self.user_repo.get_user_profile(user_id))
            .await?
            .ok_or(RankingError::UserNotFound(user_id))?;

        let exercises = self
            .catalog
            .exercises()
            .await
            .map_err(RankingError::reference)?;
        if !exercises.iter().any(|e| e.id == entry.exercise_id) {
            return Err(RankingError::ExerciseNotFound(entry.exercise_id));
        }

        // Quota: premium users are unmetered; everyone else spends a credit
        let (balance_before, balance_after, decremented) = if profile.is_premium {
            (None, None, false)
        } else {
            match self
                .with_deadline(self.user_repo.decrement_calculator_balance(user_id))
                .await?
            {
                Some(remaining) => (Some(remaining + 1), Some(remaining), true),
                None => return Err(RankingError::InsufficientBalance),
            }
        };

        let audit = CalculationAudit::processing(
            user_id,
            entry.exercise_id,
            entry.weight_kg,
            entry.reps,
            balance_before,
            balance_after,
        );
        if let Err(err) = self.with_deadline(self.user_repo.create_audit(&audit)).await {
            self.compensate(user_id, decremented).await;
            return Err(err);
        }

        let synthetic = WorkoutSet::synthetic(entry.exercise_id, entry.weight_kg, entry.reps);
        let outcome = self
            .run_pipeline(&profile, vec![synthetic], WriteChannel::Unlocked, false)
            .await;

        match outcome {
            Ok(results) => {
                let rank_up = serde_json::to_value(&results.progressions).ok();
                if let Err(err) = self
                    .user_repo
                    .finalize_audit(audit.id, AuditStatus::Success, rank_up)
                    .await
                {
                    warn!(audit_id = %audit.id, error = %format!("{err:#}"), "audit success write failed");
                }
                Ok(results)
            }
            Err(err) => {
                if let Err(audit_err) = self
                    .user_repo
                    .finalize_audit(audit.id, AuditStatus::Failed, None)
                    .await
                {
                    warn!(audit_id = %audit.id, error = %format!("{audit_err:#}"), "audit failure write failed");
                }
                self.compensate(user_id, decremented).await;
                Err(err)
            }
        }
    }

    /// Fail `processing` audits abandoned by cancelled calls.
    pub async fn sweep_stale_audits(&self) -> Result<u64, RankingError> {
        let stale = chrono::Duration::from_std(self.config.stale_audit_timeout)
            .unwrap_or_else(|_| chrono::Duration::minutes(15));
        let cutoff = Utc::now() - stale;
        self.with_deadline(self.user_repo.fail_stale_audits(cutoff))
            .await
    }

    /// Zero the leaderboard channel at an epoch boundary.
    pub async fn reset_leaderboard_epoch(&self) -> Result<u64, RankingError> {
        self.with_deadline(self.user_repo.reset_leaderboard_scores())
            .await
    }

    async fn run_pipeline(
        &self,
        profile: &UserProfile,
        sets: Vec<WorkoutSet>,
        channel: WriteChannel,
        persist_set_calcs: bool,
    ) -> Result<RankingResults, RankingError> {
        let refs = self.reference_context(profile.gender).await?;
        let user_id = profile.id;

        let mut exercise_keys: Vec<Uuid> = sets.iter().map(|s| s.exercise.key()).collect();
        exercise_keys.sort();
        exercise_keys.dedup();

        let mut standard_ids: Vec<Uuid> = sets
            .iter()
            .filter_map(|s| s.exercise.standard_id())
            .collect();
        standard_ids.sort();
        standard_ids.dedup();

        // Fan out the user-context reads, join before compute
        let (bodyweight, exercise_ranks, muscle_ranks, muscle_group_ranks, user_rank, prs) = self
            .with_deadline(async {
                tokio::try_join!(
                    self.user_repo.get_latest_bodyweight(user_id),
                    self.user_repo.get_exercise_ranks(user_id, &standard_ids),
                    self.user_repo.get_muscle_ranks(user_id),
                    self.user_repo.get_muscle_group_ranks(user_id),
                    self.user_repo.get_user_rank(user_id),
                    self.user_repo.get_exercise_prs(user_id, &exercise_keys),
                )
            })
            .await?;

        let bodyweight = bodyweight.ok_or(RankingError::BodyweightNotFound(user_id))?;

        let stored = StoredRanks {
            exercise: exercise_ranks
                .into_iter()
                .map(|row| (row.exercise_id, row))
                .collect(),
            muscle: muscle_ranks
                .into_iter()
                .map(|row| (row.muscle_id, row))
                .collect(),
            muscle_group: muscle_group_ranks
                .into_iter()
                .map(|row| (row.muscle_group_id, row))
                .collect(),
            overall: user_rank,
        };

        let pr_map: HashMap<(Uuid, PrType), UserExercisePr> = prs
            .into_iter()
            .map(|pr| ((pr.exercise_key, pr.pr_type), pr))
            .collect();

        // Compute phase: pure and in-memory
        let scored_sets = self.score_sets(&refs, bodyweight.weight_kg, &sets);
        let pr_eval = evaluate_prs(user_id, Some(bodyweight.weight_kg), &scored_sets, &pr_map);
        let aggregation = aggregate(&refs, &stored, &scored_sets, channel);

        let set_calcs: Vec<SetCalcUpdate> = if persist_set_calcs {
            scored_sets
                .iter()
                .filter(|s| s.set.session_id.is_some())
                .map(|s| SetCalcUpdate {
                    set_id: s.set.id,
                    one_rep_max: s.estimated_one_rep_max,
                    swr: s.swr,
                })
                .collect()
        } else {
            Vec::new()
        };

        if aggregation.payload.is_empty() && pr_eval.upserts.is_empty() && set_calcs.is_empty() {
            debug!("no rows changed, skipping bulk write");
            return Ok(RankingResults {
                payload: aggregation.payload,
                progressions: aggregation.progressions,
                new_prs: pr_eval.upserts,
                summary: aggregation.summary,
            });
        }

        self.with_deadline(self.user_repo.apply_ranking_update(
            user_id,
            &aggregation.payload,
            &pr_eval.upserts,
            &pr_eval.history,
            &set_calcs,
        ))
        .await?;

        Ok(RankingResults {
            payload: aggregation.payload,
            progressions: aggregation.progressions,
            new_prs: pr_eval.upserts,
            summary: aggregation.summary,
        })
    }

    fn score_sets(
        &self,
        refs: &ReferenceContext,
        bodyweight_kg: f64,
        sets: &[WorkoutSet],
    ) -> Vec<ScoredSet> {
        sets.iter()
            .map(|set| {
                match set.exercise.standard_id().and_then(|id| refs.exercise(id)) {
                    Some(exercise) => scoring::score_set(
                        set,
                        exercise,
                        refs.gender,
                        bodyweight_kg,
                        &refs.exercise_benchmarks,
                        &refs.ranks,
                        &refs.inter_ranks,
                    ),
                    None => {
                        // Custom or unrecognized exercises keep their PRs but
                        // are excluded from ranking
                        if set.exercise.standard_id().is_some() {
                            warn!(set_id = %set.id, "set references unknown exercise, excluded from ranking");
                        }
                        let estimated_one_rep_max =
                            scoring::estimate_one_rep_max(set.weight_kg, set.reps);
                        let swr = scoring::strength_to_weight_ratio(
                            estimated_one_rep_max,
                            bodyweight_kg,
                        );
                        ScoredSet {
                            set: set.clone(),
                            estimated_one_rep_max,
                            swr,
                            score: 0.0,
                            rank_id: scoring::lowest_rank_id(&refs.ranks),
                            inter_rank_id: None,
                        }
                    }
                }
            })
            .collect()
    }

    async fn reference_context(&self, gender: Gender) -> Result<ReferenceContext, RankingError> {
        let (
            exercises,
            exercise_muscles,
            muscles,
            muscle_groups,
            ranks,
            inter_ranks,
            exercise_benchmarks,
            muscle_benchmarks,
            muscle_group_benchmarks,
            overall_benchmarks,
        ) = tokio::try_join!(
            self.catalog.exercises(),
            self.catalog.exercise_muscles(),
            self.catalog.muscles(),
            self.catalog.muscle_groups(),
            self.catalog.ranks(),
            self.catalog.inter_ranks(),
            self.catalog.exercise_benchmarks(gender),
            self.catalog.muscle_benchmarks(gender),
            self.catalog.muscle_group_benchmarks(gender),
            self.catalog.overall_benchmarks(gender),
        )
        .map_err(RankingError::reference)?;

        Ok(ReferenceContext {
            gender,
            exercises,
            exercise_muscles,
            muscles,
            muscle_groups,
            ranks,
            inter_ranks,
            exercise_benchmarks,
            muscle_benchmarks,
            muscle_group_benchmarks,
            overall_benchmarks,
        })
    }

    async fn compensate(&self, user_id: Uuid, decremented: bool) {
        if !decremented {
            return;
        }
        if let Err(err) = self.user_repo.restore_calculator_balance(user_id).await {
            warn!(%user_id, error = %format!("{err:#}"), "balance compensation failed");
        }
    }

    async fn with_deadline<T, F>(&self, fut: F) -> Result<T, RankingError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.config.request_deadline, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(RankingError::Persistence(format!("{err:#}"))),
            Err(_) => Err(RankingError::Deadline),
        }
    }
}
