use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::catalog::ReferenceCatalog;
use crate::domain::{
    AuditStatus, BodyweightEntry, CalculationAudit, CalculatorEntry, RankUpdatePayload,
    RankingError, SetCalcUpdate, UserExercisePr, UserExerciseRank, UserMuscleGroupRank,
    UserMuscleRank, UserProfile, UserRank, WorkoutSet,
};
use crate::ports::UserStateRepository;
use crate::services::calculator::{CalculatorConfig, CalculatorService};
use crate::testing::fixtures::{self, BENCH_PRESS, USER};
use crate::testing::{MockReferenceRepository, MockUserStateRepository};

fn catalog() -> Arc<ReferenceCatalog> {
    let mut reference = MockReferenceRepository::new();
    fixtures::setup_reference_mock(&mut reference);
    Arc::new(ReferenceCatalog::new(Arc::new(reference)))
}

fn service(user_repo: MockUserStateRepository) -> CalculatorService {
    CalculatorService::new(catalog(), Arc::new(user_repo))
}

fn entry(weight_kg: f64, reps: i32) -> CalculatorEntry {
    CalculatorEntry {
        exercise_id: BENCH_PRESS,
        weight_kg,
        reps,
    }
}

fn expect_profile(mock: &mut MockUserStateRepository, profile: UserProfile) {
    mock.expect_get_user_profile()
        .returning(move |_| Ok(Some(profile.clone())));
}

/// Wire the context reads for a user with no prior ranks or PRs.
fn expect_fresh_context(mock: &mut MockUserStateRepository) {
    mock.expect_get_latest_bodyweight()
        .returning(|_| Ok(Some(fixtures::bodyweight(80.0))));
    mock.expect_get_exercise_ranks().returning(|_, _| Ok(vec![]));
    mock.expect_get_muscle_ranks().returning(|_| Ok(vec![]));
    mock.expect_get_muscle_group_ranks().returning(|_| Ok(vec![]));
    mock.expect_get_user_rank().returning(|_| Ok(None));
    mock.expect_get_exercise_prs().returning(|_, _| Ok(vec![]));
}

#[tokio::test]
async fn test_calculate_success_decrements_and_audits() {
    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::profile_with_balance(1));

    mock.expect_decrement_calculator_balance()
        .times(1)
        .returning(|_| Ok(Some(0)));

    mock.expect_create_audit()
        .times(1)
        .withf(|audit: &CalculationAudit| {
            audit.status == AuditStatus::Processing
                && audit.balance_before == Some(1)
                && audit.balance_after == Some(0)
        })
        .returning(|_| Ok(()));

    expect_fresh_context(&mut mock);

    mock.expect_apply_ranking_update()
        .times(1)
        .withf(
            |_user_id,
             payload: &RankUpdatePayload,
             upserts: &[UserExercisePr],
             _history,
             set_calcs: &[SetCalcUpdate]| {
                // Synthetic sets never persist: no set write-backs, unlocked rows
                payload.exercise_ranks.len() == 1
                    && !payload.exercise_ranks[0].locked
                    && upserts.len() == 3
                    && set_calcs.is_empty()
            },
        )
        .returning(|_, _, _, _, _| Ok(()));

    mock.expect_finalize_audit()
        .times(1)
        .withf(|_, status, _| *status == AuditStatus::Success)
        .returning(|_, _, _| Ok(()));

    let results = service(mock)
        .calculate(USER, entry(70.0, 3))
        .await
        .unwrap();

    // 70 * (1 + 3/30) / 80 = 0.9625
    let bench = &results.payload.exercise_ranks[0];
    assert!((bench.new_score - 0.9625).abs() < 1e-9);
    assert_eq!(bench.new_rank_id, 4);
    assert_eq!(results.new_prs.len(), 3);
}

#[tokio::test]
async fn test_calculate_insufficient_balance_is_side_effect_free() {
    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::profile_with_balance(0));

    mock.expect_decrement_calculator_balance()
        .times(1)
        .returning(|_| Ok(None));

    // No audit row, no pipeline, no writes
    mock.expect_create_audit().times(0);
    mock.expect_apply_ranking_update().times(0);

    let err = service(mock)
        .calculate(USER, entry(70.0, 3))
        .await
        .unwrap_err();

    assert!(matches!(err, RankingError::InsufficientBalance));
}

#[tokio::test]
async fn test_calculate_premium_skips_quota() {
    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::premium_profile());

    mock.expect_decrement_calculator_balance().times(0);

    mock.expect_create_audit()
        .times(1)
        .withf(|audit: &CalculationAudit| {
            audit.balance_before.is_none() && audit.balance_after.is_none()
        })
        .returning(|_| Ok(()));

    expect_fresh_context(&mut mock);
    mock.expect_apply_ranking_update()
        .returning(|_, _, _, _, _| Ok(()));
    mock.expect_finalize_audit()
        .withf(|_, status, _| *status == AuditStatus::Success)
        .returning(|_, _, _| Ok(()));

    let results = service(mock)
        .calculate(USER, entry(70.0, 3))
        .await
        .unwrap();
    assert!(!results.payload.is_empty());
}

#[tokio::test]
async fn test_calculate_bulk_failure_fails_audit_and_compensates() {
    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::profile_with_balance(1));

    mock.expect_decrement_calculator_balance()
        .times(1)
        .returning(|_| Ok(Some(0)));
    mock.expect_create_audit().times(1).returning(|_| Ok(()));

    expect_fresh_context(&mut mock);

    mock.expect_apply_ranking_update()
        .times(1)
        .returning(|_, _, _, _, _| Err(anyhow::anyhow!("bulk procedure rejected")));

    mock.expect_finalize_audit()
        .times(1)
        .withf(|_, status, _| *status == AuditStatus::Failed)
        .returning(|_, _, _| Ok(()));

    mock.expect_restore_calculator_balance()
        .times(1)
        .returning(|_| Ok(()));

    let err = service(mock)
        .calculate(USER, entry(70.0, 3))
        .await
        .unwrap_err();

    assert!(matches!(err, RankingError::Persistence(_)));
}

#[tokio::test]
async fn test_calculate_rejects_invalid_reps_without_side_effects() {
    // No expectations at all: any repository call would panic the mock
    let mock = MockUserStateRepository::new();

    let err = service(mock)
        .calculate(USER, entry(70.0, 0))
        .await
        .unwrap_err();

    assert!(matches!(err, RankingError::Validation(_)));
}

#[tokio::test]
async fn test_calculate_unknown_exercise() {
    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::profile_with_balance(1));
    mock.expect_decrement_calculator_balance().times(0);

    let err = service(mock)
        .calculate(
            USER,
            CalculatorEntry {
                exercise_id: Uuid::from_u128(0xFFFF),
                weight_kg: 70.0,
                reps: 3,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RankingError::ExerciseNotFound(_)));
}

#[tokio::test]
async fn test_calculate_user_not_found() {
    let mut mock = MockUserStateRepository::new();
    mock.expect_get_user_profile().returning(|_| Ok(None));

    let err = service(mock)
        .calculate(USER, entry(70.0, 3))
        .await
        .unwrap_err();

    assert!(matches!(err, RankingError::UserNotFound(_)));
}

#[tokio::test]
async fn test_calculate_missing_bodyweight_fails_before_write() {
    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::profile_with_balance(1));
    mock.expect_decrement_calculator_balance()
        .returning(|_| Ok(Some(0)));
    mock.expect_create_audit().returning(|_| Ok(()));

    mock.expect_get_latest_bodyweight().returning(|_| Ok(None));
    mock.expect_get_exercise_ranks().returning(|_, _| Ok(vec![]));
    mock.expect_get_muscle_ranks().returning(|_| Ok(vec![]));
    mock.expect_get_muscle_group_ranks().returning(|_| Ok(vec![]));
    mock.expect_get_user_rank().returning(|_| Ok(None));
    mock.expect_get_exercise_prs().returning(|_, _| Ok(vec![]));

    mock.expect_apply_ranking_update().times(0);
    mock.expect_finalize_audit()
        .times(1)
        .withf(|_, status, _| *status == AuditStatus::Failed)
        .returning(|_, _, _| Ok(()));
    mock.expect_restore_calculator_balance()
        .times(1)
        .returning(|_| Ok(()));

    let err = service(mock)
        .calculate(USER, entry(70.0, 3))
        .await
        .unwrap_err();

    assert!(matches!(err, RankingError::BodyweightNotFound(_)));
}

#[tokio::test]
async fn test_finalize_session_empty_is_noop() {
    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::profile_with_balance(0));
    mock.expect_get_session_sets().returning(|_, _| Ok(vec![]));
    mock.expect_apply_ranking_update().times(0);

    let results = service(mock)
        .finalize_session(USER, Uuid::from_u128(0xC0))
        .await
        .unwrap();

    assert!(results.payload.is_empty());
    assert!(results.new_prs.is_empty());
}

#[tokio::test]
async fn test_finalize_session_writes_locked_rows_and_set_calcs() {
    let session_id = Uuid::from_u128(0xC0);
    let set_id = Uuid::from_u128(0xC1);

    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::profile_with_balance(0));

    mock.expect_get_session_sets().returning(move |_, _| {
        Ok(vec![WorkoutSet {
            id: set_id,
            session_id: Some(session_id),
            exercise: crate::domain::ExerciseRef::Standard(BENCH_PRESS),
            set_order: 1,
            reps: 5,
            weight_kg: 60.0,
            performed_at: Utc::now(),
            calc_one_rep_max: None,
            calc_swr: None,
        }])
    });

    expect_fresh_context(&mut mock);

    mock.expect_apply_ranking_update()
        .times(1)
        .withf(
            move |_user_id,
                  payload: &RankUpdatePayload,
                  _upserts,
                  _history,
                  set_calcs: &[SetCalcUpdate]| {
                payload.exercise_ranks.len() == 1
                    && payload.exercise_ranks[0].locked
                    && payload.exercise_ranks[0].contributing_set_id == Some(set_id)
                    && set_calcs.len() == 1
                    && (set_calcs[0].one_rep_max - 70.0).abs() < 1e-9
            },
        )
        .returning(|_, _, _, _, _| Ok(()));

    let results = service(mock)
        .finalize_session(USER, session_id)
        .await
        .unwrap();

    assert_eq!(results.payload.muscle_ranks.len(), 3);
    assert!(results.payload.user_rank.is_some());
}

#[tokio::test]
async fn test_finalize_session_noop_skips_bulk_write() {
    let session_id = Uuid::from_u128(0xC0);

    let mut mock = MockUserStateRepository::new();
    expect_profile(&mut mock, fixtures::profile_with_balance(0));

    mock.expect_get_session_sets().returning(move |_, _| {
        Ok(vec![WorkoutSet {
            id: Uuid::new_v4(),
            session_id: None,
            exercise: crate::domain::ExerciseRef::Standard(BENCH_PRESS),
            set_order: 1,
            reps: 5,
            weight_kg: 55.0,
            performed_at: Utc::now(),
            calc_one_rep_max: None,
            calc_swr: None,
        }])
    });

    mock.expect_get_latest_bodyweight()
        .returning(|_| Ok(Some(fixtures::bodyweight(80.0))));
    mock.expect_get_exercise_ranks().returning(|_, _| {
        Ok(vec![fixtures::exercise_rank_row(BENCH_PRESS, 0.875, 3, true)])
    });
    // The full stored state the first bench workout produced
    mock.expect_get_muscle_ranks().returning(|_| {
        Ok(vec![
            stored_muscle(fixtures::CHEST, 0.875, 3),
            stored_muscle(fixtures::TRICEPS, 0.4375, 2),
            stored_muscle(fixtures::FRONT_DELT, 0.21875, 1),
        ])
    });
    mock.expect_get_muscle_group_ranks().returning(|_| {
        Ok(vec![UserMuscleGroupRank {
            user_id: USER,
            muscle_group_id: fixtures::UPPER_BODY,
            score: 0.6125,
            rank_id: 3,
            inter_rank_id: None,
            locked: true,
            leaderboard_score: 0.6125,
            updated_at: Utc::now(),
        }])
    });
    mock.expect_get_user_rank().returning(|_| {
        Ok(Some(UserRank {
            user_id: USER,
            score: 0.3675,
            rank_id: 2,
            inter_rank_id: None,
            locked: true,
            leaderboard_score: 0.3675,
            updated_at: Utc::now(),
        }))
    });
    mock.expect_get_exercise_prs().returning(|_, _| {
        // Saturated PRs so the weaker set produces nothing at all
        Ok(vec![
            saturated_pr(crate::domain::PrType::OneRepMax),
            saturated_pr(crate::domain::PrType::MaxReps),
            saturated_pr(crate::domain::PrType::MaxSwr),
        ])
    });

    mock.expect_apply_ranking_update().times(0);

    let results = service(mock)
        .finalize_session(USER, session_id)
        .await
        .unwrap();

    assert!(results.payload.is_empty());
}

fn stored_muscle(muscle_id: Uuid, score: f64, rank_id: i64) -> UserMuscleRank {
    UserMuscleRank {
        user_id: USER,
        muscle_id,
        score,
        rank_id,
        inter_rank_id: None,
        locked: true,
        leaderboard_score: score,
        updated_at: Utc::now(),
    }
}

fn saturated_pr(pr_type: crate::domain::PrType) -> UserExercisePr {
    UserExercisePr {
        user_id: USER,
        exercise_key: BENCH_PRESS,
        pr_type,
        value: 1_000.0,
        weight_kg: 60.0,
        bodyweight: Some(80.0),
        source_set_id: None,
        achieved_at: Utc::now(),
    }
}

// ============================================================================
// Deadline behavior, with a stub that outlives the configured deadline
// ============================================================================

struct SlowRepo;

#[async_trait::async_trait]
impl UserStateRepository for SlowRepo {
    async fn get_user_profile(&self, _user_id: Uuid) -> anyhow::Result<Option<UserProfile>> {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(Some(fixtures::profile_with_balance(1)))
    }

    async fn get_latest_bodyweight(
        &self,
        _user_id: Uuid,
    ) -> anyhow::Result<Option<BodyweightEntry>> {
        Ok(Some(fixtures::bodyweight(80.0)))
    }

    async fn get_session_sets(
        &self,
        _user_id: Uuid,
        _session_id: Uuid,
    ) -> anyhow::Result<Vec<WorkoutSet>> {
        Ok(vec![])
    }

    async fn get_exercise_ranks(
        &self,
        _user_id: Uuid,
        _exercise_ids: &[Uuid],
    ) -> anyhow::Result<Vec<UserExerciseRank>> {
        Ok(vec![])
    }

    async fn get_muscle_ranks(&self, _user_id: Uuid) -> anyhow::Result<Vec<UserMuscleRank>> {
        Ok(vec![])
    }

    async fn get_muscle_group_ranks(
        &self,
        _user_id: Uuid,
    ) -> anyhow::Result<Vec<UserMuscleGroupRank>> {
        Ok(vec![])
    }

    async fn get_user_rank(&self, _user_id: Uuid) -> anyhow::Result<Option<UserRank>> {
        Ok(None)
    }

    async fn get_exercise_prs(
        &self,
        _user_id: Uuid,
        _exercise_keys: &[Uuid],
    ) -> anyhow::Result<Vec<UserExercisePr>> {
        Ok(vec![])
    }

    async fn apply_ranking_update(
        &self,
        _user_id: Uuid,
        _payload: &RankUpdatePayload,
        _pr_upserts: &[UserExercisePr],
        _pr_history: &[UserExercisePr],
        _set_calcs: &[SetCalcUpdate],
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn create_audit(&self, _audit: &CalculationAudit) -> anyhow::Result<()> {
        Ok(())
    }

    async fn finalize_audit(
        &self,
        _audit_id: Uuid,
        _status: AuditStatus,
        _rank_up: Option<serde_json::Value>,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn get_audit(&self, _audit_id: Uuid) -> anyhow::Result<Option<CalculationAudit>> {
        Ok(None)
    }

    async fn decrement_calculator_balance(&self, _user_id: Uuid) -> anyhow::Result<Option<i64>> {
        Ok(Some(0))
    }

    async fn restore_calculator_balance(&self, _user_id: Uuid) -> anyhow::Result<()> {
        Ok(())
    }

    async fn fail_stale_audits(&self, _older_than: DateTime<Utc>) -> anyhow::Result<u64> {
        Ok(0)
    }

    async fn reset_leaderboard_scores(&self) -> anyhow::Result<u64> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_slow_datastore_hits_deadline() {
    let config = CalculatorConfig {
        request_deadline: Duration::from_millis(10),
        ..CalculatorConfig::default()
    };
    let service = CalculatorService::with_config(catalog(), Arc::new(SlowRepo), config);

    let err = service.calculate(USER, entry(70.0, 3)).await.unwrap_err();

    assert!(matches!(err, RankingError::Deadline));
}
