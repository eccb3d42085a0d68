//! Deterministic reference world shared by unit and integration tests.
//!
//! The ladder, weights and exercises are chosen so the worked numbers stay
//! readable: bench 60 kg x 5 at 80 kg bodyweight gives an estimated 1RM of
//! 70 and an SWR of 0.875.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    BodyweightEntry, Exercise, ExerciseMuscle, ExerciseType, Gender, InterRank, LevelDefinition,
    Muscle, MuscleGroup, MuscleIntensity, Rank, RankBenchmark, UserExerciseRank, UserProfile,
};
use crate::ports::reference_repository::MockReferenceRepository;
use crate::services::rank::ReferenceContext;

// ============================================================================
// Identifiers
// ============================================================================

pub const USER: Uuid = Uuid::from_u128(0xA0);

pub const BENCH_PRESS: Uuid = Uuid::from_u128(0xE1);
pub const BACK_SQUAT: Uuid = Uuid::from_u128(0xE2);
pub const LEG_PRESS: Uuid = Uuid::from_u128(0xE3);

pub const CHEST: Uuid = Uuid::from_u128(0x31);
pub const TRICEPS: Uuid = Uuid::from_u128(0x32);
pub const FRONT_DELT: Uuid = Uuid::from_u128(0x33);
pub const QUADS: Uuid = Uuid::from_u128(0x34);
pub const GLUTES: Uuid = Uuid::from_u128(0x35);

pub const UPPER_BODY: Uuid = Uuid::from_u128(0x51);
pub const LOWER_BODY: Uuid = Uuid::from_u128(0x52);

/// Rank ladder thresholds: F, E, D, C, B, A, S, Elite.
pub const RANK_THRESHOLDS: [f64; 8] = [0.0, 0.25, 0.5, 0.9, 1.2, 1.5, 1.8, 2.2];
pub const RANK_NAMES: [&str; 8] = ["F", "E", "D", "C", "B", "A", "S", "Elite"];

// ============================================================================
// Reference tables
// ============================================================================

pub fn exercises() -> Vec<Exercise> {
    vec![
        Exercise {
            id: BENCH_PRESS,
            name: "Bench Press".to_string(),
            exercise_type: ExerciseType::Barbell,
            bilateral: true,
            elite_swr_male: Some(1.5),
            elite_swr_female: Some(1.1),
        },
        Exercise {
            id: BACK_SQUAT,
            name: "Back Squat".to_string(),
            exercise_type: ExerciseType::Barbell,
            bilateral: true,
            elite_swr_male: Some(2.2),
            elite_swr_female: Some(1.7),
        },
        Exercise {
            id: LEG_PRESS,
            name: "Leg Press".to_string(),
            exercise_type: ExerciseType::Machine,
            bilateral: true,
            elite_swr_male: Some(400.0),
            elite_swr_female: Some(280.0),
        },
    ]
}

pub fn muscle_groups() -> Vec<MuscleGroup> {
    vec![
        MuscleGroup {
            id: UPPER_BODY,
            name: "Upper Body".to_string(),
            overall_weight: 0.6,
        },
        MuscleGroup {
            id: LOWER_BODY,
            name: "Lower Body".to_string(),
            overall_weight: 0.4,
        },
    ]
}

pub fn muscles() -> Vec<Muscle> {
    vec![
        Muscle {
            id: CHEST,
            name: "Chest".to_string(),
            muscle_group_id: UPPER_BODY,
            muscle_group_weight: 0.5,
        },
        Muscle {
            id: TRICEPS,
            name: "Triceps".to_string(),
            muscle_group_id: UPPER_BODY,
            muscle_group_weight: 0.3,
        },
        Muscle {
            id: FRONT_DELT,
            name: "Front Delt".to_string(),
            muscle_group_id: UPPER_BODY,
            muscle_group_weight: 0.2,
        },
        Muscle {
            id: QUADS,
            name: "Quads".to_string(),
            muscle_group_id: LOWER_BODY,
            muscle_group_weight: 0.6,
        },
        Muscle {
            id: GLUTES,
            name: "Glutes".to_string(),
            muscle_group_id: LOWER_BODY,
            muscle_group_weight: 0.4,
        },
    ]
}

pub fn exercise_muscle_links() -> Vec<ExerciseMuscle> {
    let link = |exercise_id, muscle_id, intensity: MuscleIntensity| ExerciseMuscle {
        exercise_id,
        muscle_id,
        intensity,
        weight: intensity.default_weight(),
    };

    vec![
        link(BENCH_PRESS, CHEST, MuscleIntensity::Primary),
        link(BENCH_PRESS, TRICEPS, MuscleIntensity::Secondary),
        link(BENCH_PRESS, FRONT_DELT, MuscleIntensity::Accessory),
        link(BACK_SQUAT, QUADS, MuscleIntensity::Primary),
        link(BACK_SQUAT, GLUTES, MuscleIntensity::Secondary),
        link(LEG_PRESS, QUADS, MuscleIntensity::Primary),
    ]
}

pub fn rank_ladder() -> Vec<Rank> {
    RANK_THRESHOLDS
        .iter()
        .enumerate()
        .map(|(i, min)| Rank {
            id: i as i64 + 1,
            name: RANK_NAMES[i].to_string(),
            min_score: *min,
            max_score: RANK_THRESHOLDS.get(i + 1).copied().unwrap_or(3.0),
        })
        .collect()
}

/// Three bands per rank, ids rank_id * 10 + sort_order.
pub fn inter_rank_bands() -> Vec<InterRank> {
    let mut bands = Vec::new();
    for rank in rank_ladder() {
        let width = (rank.max_score - rank.min_score) / 3.0;
        for slot in 0..3i64 {
            bands.push(InterRank {
                id: rank.id * 10 + slot + 1,
                rank_id: rank.id,
                name: format!("{} {}", rank.name, ["III", "II", "I"][slot as usize]),
                min_score: rank.min_score + width * slot as f64,
                max_score: rank.min_score + width * (slot + 1) as f64,
                sort_order: slot + 1,
            });
        }
    }
    bands
}

pub fn level_definitions() -> Vec<LevelDefinition> {
    (1..=5)
        .map(|level| LevelDefinition {
            level,
            min_xp: (level - 1) * 1000,
            title: format!("Level {}", level),
        })
        .collect()
}

fn ladder_for(gender: Gender, target_id: Option<Uuid>) -> Vec<RankBenchmark> {
    RANK_THRESHOLDS
        .iter()
        .enumerate()
        .map(|(i, min)| RankBenchmark {
            gender,
            target_id,
            min_threshold: *min,
            rank_id: i as i64 + 1,
        })
        .collect()
}

pub fn exercise_benchmarks(gender: Gender) -> Vec<RankBenchmark> {
    exercises()
        .iter()
        .flat_map(|e| ladder_for(gender, Some(e.id)))
        .collect()
}

pub fn muscle_benchmarks(gender: Gender) -> Vec<RankBenchmark> {
    muscles()
        .iter()
        .flat_map(|m| ladder_for(gender, Some(m.id)))
        .collect()
}

pub fn muscle_group_benchmarks(gender: Gender) -> Vec<RankBenchmark> {
    muscle_groups()
        .iter()
        .flat_map(|g| ladder_for(gender, Some(g.id)))
        .collect()
}

pub fn overall_benchmarks(gender: Gender) -> Vec<RankBenchmark> {
    ladder_for(gender, None)
}

pub fn reference_context(gender: Gender) -> ReferenceContext {
    ReferenceContext {
        gender,
        exercises: Arc::new(exercises()),
        exercise_muscles: Arc::new(exercise_muscle_links()),
        muscles: Arc::new(muscles()),
        muscle_groups: Arc::new(muscle_groups()),
        ranks: Arc::new(rank_ladder()),
        inter_ranks: Arc::new(inter_rank_bands()),
        exercise_benchmarks: Arc::new(exercise_benchmarks(gender)),
        muscle_benchmarks: Arc::new(muscle_benchmarks(gender)),
        muscle_group_benchmarks: Arc::new(muscle_group_benchmarks(gender)),
        overall_benchmarks: Arc::new(overall_benchmarks(gender)),
    }
}

// ============================================================================
// User fixtures
// ============================================================================

pub fn profile_with_balance(balance: i64) -> UserProfile {
    UserProfile {
        id: USER,
        gender: Gender::Male,
        is_premium: false,
        rank_calculator_balance: balance,
    }
}

pub fn premium_profile() -> UserProfile {
    UserProfile {
        is_premium: true,
        ..profile_with_balance(0)
    }
}

pub fn bodyweight(weight_kg: f64) -> BodyweightEntry {
    BodyweightEntry {
        user_id: USER,
        weight_kg,
        measured_at: Utc::now(),
    }
}

pub fn exercise_rank_row(
    exercise_id: Uuid,
    score: f64,
    rank_id: i64,
    locked: bool,
) -> UserExerciseRank {
    UserExerciseRank {
        user_id: USER,
        exercise_id,
        score,
        rank_id,
        inter_rank_id: None,
        locked,
        leaderboard_score: score,
        contributing_set_id: None,
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Mock setup helpers
// ============================================================================

/// Wire every reference loader to the fixture tables.
pub fn setup_reference_mock(mock: &mut MockReferenceRepository) {
    mock.expect_load_exercises().returning(|| Ok(exercises()));
    mock.expect_load_exercise_muscles()
        .returning(|| Ok(exercise_muscle_links()));
    mock.expect_load_muscles().returning(|| Ok(muscles()));
    mock.expect_load_muscle_groups()
        .returning(|| Ok(muscle_groups()));
    mock.expect_load_ranks().returning(|| Ok(rank_ladder()));
    mock.expect_load_inter_ranks()
        .returning(|| Ok(inter_rank_bands()));
    mock.expect_load_level_definitions()
        .returning(|| Ok(level_definitions()));
    mock.expect_load_exercise_benchmarks()
        .returning(|gender| Ok(exercise_benchmarks(gender)));
    mock.expect_load_muscle_benchmarks()
        .returning(|gender| Ok(muscle_benchmarks(gender)));
    mock.expect_load_muscle_group_benchmarks()
        .returning(|gender| Ok(muscle_group_benchmarks(gender)));
    mock.expect_load_overall_benchmarks()
        .returning(|gender| Ok(overall_benchmarks(gender)));
}
