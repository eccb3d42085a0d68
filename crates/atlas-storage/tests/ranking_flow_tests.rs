//! End-to-end ranking flows over real SQLite state: workout finalization,
//! the manual calculator with its quota, and the monotone-rank guarantees.

use std::sync::Arc;

use atlas_core::{
    BodyweightEntry, CalculatorEntry, ExerciseRef, Gender, PrType, RankingError, ReferenceCatalog,
    UserProfile, UserStateRepository, WorkoutSet,
};
use atlas_storage::reference::test_data;
use atlas_storage::{
    init_test_reference_db, init_user_db, SqliteReferenceRepository, SqliteUserStateRepository,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tempfile::TempDir;
use uuid::Uuid;

use atlas_core::CalculatorService;

struct World {
    _dir: TempDir,
    repo: SqliteUserStateRepository,
    service: CalculatorService,
    user_pool: SqlitePool,
}

async fn world(balance: i64, is_premium: bool) -> World {
    let dir = TempDir::new().unwrap();

    let reference_path = dir.path().join("reference.db");
    let reference_pool = init_test_reference_db(reference_path.to_str().unwrap())
        .await
        .unwrap();
    let catalog = Arc::new(ReferenceCatalog::new(Arc::new(
        SqliteReferenceRepository::new(reference_pool),
    )));

    let user_path = dir.path().join("user.db");
    let user_pool = init_user_db(user_path.to_str().unwrap()).await.unwrap();
    let repo = SqliteUserStateRepository::new(user_pool.clone());

    repo.upsert_user_profile(&UserProfile {
        id: test_data::USER,
        gender: Gender::Male,
        is_premium,
        rank_calculator_balance: balance,
    })
    .await
    .unwrap();

    repo.insert_bodyweight(&BodyweightEntry {
        user_id: test_data::USER,
        weight_kg: 80.0,
        measured_at: Utc::now(),
    })
    .await
    .unwrap();

    let service = CalculatorService::new(
        catalog,
        Arc::new(SqliteUserStateRepository::new(user_pool.clone())),
    );

    World {
        _dir: dir,
        repo,
        service,
        user_pool,
    }
}

async fn persist_bench_session(world: &World, weight_kg: f64, reps: i32) -> Uuid {
    let session_id = Uuid::new_v4();
    world
        .repo
        .create_workout_session(session_id, test_data::USER, Utc::now())
        .await
        .unwrap();

    world
        .repo
        .insert_session_set(&WorkoutSet {
            id: Uuid::new_v4(),
            session_id: Some(session_id),
            exercise: ExerciseRef::Standard(test_data::BENCH_PRESS),
            set_order: 1,
            reps,
            weight_kg,
            performed_at: Utc::now(),
            calc_one_rep_max: None,
            calc_swr: None,
        })
        .await
        .unwrap();

    session_id
}

#[tokio::test]
async fn test_first_bench_workout_initializes_all_tiers() {
    let world = world(0, false).await;
    let session_id = persist_bench_session(&world, 60.0, 5).await;

    let results = world
        .service
        .finalize_session(test_data::USER, session_id)
        .await
        .unwrap();

    // 60 x 5 at 80 kg: e1RM 70, SWR 0.875, rank D on the sample ladder
    let bench = &results.payload.exercise_ranks[0];
    assert!((bench.new_score - 0.875).abs() < 1e-9);
    assert_eq!(bench.new_rank_id, 3);

    let stored = world
        .repo
        .get_exercise_ranks(test_data::USER, &[test_data::BENCH_PRESS])
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].locked);
    assert!((stored[0].leaderboard_score - 0.875).abs() < 1e-9);

    // Chest primary 1.0, triceps secondary 0.5, front delt accessory 0.25
    let muscles = world.repo.get_muscle_ranks(test_data::USER).await.unwrap();
    assert_eq!(muscles.len(), 3);
    let chest = muscles
        .iter()
        .find(|m| m.muscle_id == test_data::CHEST)
        .unwrap();
    assert!((chest.score - 0.875).abs() < 1e-9);

    let groups = world
        .repo
        .get_muscle_group_ranks(test_data::USER)
        .await
        .unwrap();
    assert_eq!(groups.len(), 1);
    assert!((groups[0].score - 0.6125).abs() < 1e-9);

    let overall = world
        .repo
        .get_user_rank(test_data::USER)
        .await
        .unwrap()
        .unwrap();
    assert!((overall.score - 0.3675).abs() < 1e-9);
    assert_eq!(overall.rank_id, 2);

    // All three PR types established
    assert_eq!(results.new_prs.len(), 3);
    let prs = world
        .repo
        .get_exercise_prs(test_data::USER, &[test_data::BENCH_PRESS])
        .await
        .unwrap();
    assert_eq!(prs.len(), 3);

    // The finalized set got its derived measures written back
    let calc: (Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT calc_one_rep_max, calc_swr FROM workout_session_sets WHERE session_id = ?",
    )
    .bind(session_id)
    .fetch_one(&world.user_pool)
    .await
    .unwrap();
    assert!((calc.0.unwrap() - 70.0).abs() < 1e-9);
    assert!((calc.1.unwrap() - 0.875).abs() < 1e-9);
}

#[tokio::test]
async fn test_second_workout_improves_and_ranks_up() {
    let world = world(0, false).await;
    let first = persist_bench_session(&world, 60.0, 5).await;
    world
        .service
        .finalize_session(test_data::USER, first)
        .await
        .unwrap();

    let second = persist_bench_session(&world, 62.5, 5).await;
    let results = world
        .service
        .finalize_session(test_data::USER, second)
        .await
        .unwrap();

    // 62.5 x 5: SWR 0.9114..., crossing the 0.9 threshold into rank C
    let bench = &results.payload.exercise_ranks[0];
    assert_eq!(bench.old_rank_id, Some(3));
    assert_eq!(bench.new_rank_id, 4);
    assert!(results.summary.any_rank_up);

    // A fresh one-rep-max PR was recorded
    assert!(results
        .new_prs
        .iter()
        .any(|pr| pr.pr_type == PrType::OneRepMax && (pr.value - 72.9166666666).abs() < 1e-6));

    // Reps stayed at five, so only the 1RM and SWR records moved
    assert_eq!(results.new_prs.len(), 2);

    // History keeps both generations of records
    let history_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM user_exercise_pr_history WHERE user_id = ?")
            .bind(test_data::USER)
            .fetch_one(&world.user_pool)
            .await
            .unwrap();
    assert_eq!(history_count, 5);
}

#[tokio::test]
async fn test_weaker_workout_leaves_ranks_and_prs_unchanged() {
    let world = world(0, false).await;
    let first = persist_bench_session(&world, 60.0, 5).await;
    world
        .service
        .finalize_session(test_data::USER, first)
        .await
        .unwrap();

    let weaker = persist_bench_session(&world, 55.0, 5).await;
    let results = world
        .service
        .finalize_session(test_data::USER, weaker)
        .await
        .unwrap();

    assert!(results.payload.is_empty());
    assert!(results.new_prs.is_empty());
    assert!(!results.summary.any_rank_up);

    let stored = world
        .repo
        .get_exercise_ranks(test_data::USER, &[test_data::BENCH_PRESS])
        .await
        .unwrap();
    assert!((stored[0].score - 0.875).abs() < 1e-9);
}

#[tokio::test]
async fn test_permanent_scores_are_monotone_across_sessions() {
    let world = world(0, false).await;
    let weights = [60.0, 55.0, 65.0, 50.0, 70.0, 62.5];

    let mut last_score = 0.0f64;
    let mut last_rank = 0i64;
    for weight in weights {
        let session = persist_bench_session(&world, weight, 5).await;
        world
            .service
            .finalize_session(test_data::USER, session)
            .await
            .unwrap();

        let stored = world
            .repo
            .get_exercise_ranks(test_data::USER, &[test_data::BENCH_PRESS])
            .await
            .unwrap();
        assert!(stored[0].score >= last_score, "permanent score regressed");
        assert!(stored[0].rank_id >= last_rank, "permanent rank regressed");
        last_score = stored[0].score;
        last_rank = stored[0].rank_id;
    }
}

#[tokio::test]
async fn test_manual_calculator_spends_quota_and_audits() {
    let world = world(1, false).await;

    let results = world
        .service
        .calculate(
            test_data::USER,
            CalculatorEntry {
                exercise_id: test_data::BENCH_PRESS,
                weight_kg: 70.0,
                reps: 3,
            },
        )
        .await
        .unwrap();

    // 70 x 3: e1RM 77, SWR 0.9625, rank C; rows are written unlocked
    let bench = &results.payload.exercise_ranks[0];
    assert!((bench.new_score - 0.9625).abs() < 1e-9);
    assert_eq!(bench.new_rank_id, 4);

    let stored = world
        .repo
        .get_exercise_ranks(test_data::USER, &[test_data::BENCH_PRESS])
        .await
        .unwrap();
    assert!(!stored[0].locked);

    // The credit is spent and the audit is terminal
    assert_eq!(
        world
            .repo
            .get_calculator_balance(test_data::USER)
            .await
            .unwrap(),
        Some(0)
    );
    let (status, balance_after): (String, Option<i64>) = sqlx::query_as(
        "SELECT status, balance_after FROM calculation_audits WHERE user_id = ?",
    )
    .bind(test_data::USER)
    .fetch_one(&world.user_pool)
    .await
    .unwrap();
    assert_eq!(status, "success");
    assert_eq!(balance_after, Some(0));

    // Next call is rejected without touching anything
    let err = world
        .service
        .calculate(
            test_data::USER,
            CalculatorEntry {
                exercise_id: test_data::BENCH_PRESS,
                weight_kg: 70.0,
                reps: 3,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RankingError::InsufficientBalance));

    let audit_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM calculation_audits WHERE user_id = ?")
            .bind(test_data::USER)
            .fetch_one(&world.user_pool)
            .await
            .unwrap();
    assert_eq!(audit_count, 1);
}

#[tokio::test]
async fn test_synthetic_sets_never_persist() {
    let world = world(0, true).await;

    world
        .service
        .calculate(
            test_data::USER,
            CalculatorEntry {
                exercise_id: test_data::BENCH_PRESS,
                weight_kg: 70.0,
                reps: 3,
            },
        )
        .await
        .unwrap();

    let session_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_sessions")
        .fetch_one(&world.user_pool)
        .await
        .unwrap();
    let set_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workout_session_sets")
        .fetch_one(&world.user_pool)
        .await
        .unwrap();
    assert_eq!(session_count, 0);
    assert_eq!(set_count, 0);
}

#[tokio::test]
async fn test_score_on_rank_boundary_promotes() {
    let world = world(0, true).await;

    // 72 kg single at 80 kg bodyweight: SWR exactly 0.9, the C threshold
    let results = world
        .service
        .calculate(
            test_data::USER,
            CalculatorEntry {
                exercise_id: test_data::BENCH_PRESS,
                weight_kg: 72.0,
                reps: 1,
            },
        )
        .await
        .unwrap();

    let bench = &results.payload.exercise_ranks[0];
    assert!((bench.new_score - 0.9).abs() < 1e-12);
    assert_eq!(bench.new_rank_id, 4);
}

#[tokio::test]
async fn test_workout_after_manual_entry_locks_the_rows() {
    let world = world(0, true).await;

    // Hypothetical entry first
    world
        .service
        .calculate(
            test_data::USER,
            CalculatorEntry {
                exercise_id: test_data::BENCH_PRESS,
                weight_kg: 70.0,
                reps: 3,
            },
        )
        .await
        .unwrap();

    // A real workout that beats it locks the row
    let session = persist_bench_session(&world, 85.0, 5).await;
    world
        .service
        .finalize_session(test_data::USER, session)
        .await
        .unwrap();

    let stored = world
        .repo
        .get_exercise_ranks(test_data::USER, &[test_data::BENCH_PRESS])
        .await
        .unwrap();
    assert!(stored[0].locked);
    assert!(stored[0].score > 0.9625);
}

#[tokio::test]
async fn test_calculate_for_unknown_user_fails() {
    let world = world(0, false).await;

    let err = world
        .service
        .calculate(
            Uuid::from_u128(0xBAD),
            CalculatorEntry {
                exercise_id: test_data::BENCH_PRESS,
                weight_kg: 70.0,
                reps: 3,
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, RankingError::UserNotFound(_)));
}
