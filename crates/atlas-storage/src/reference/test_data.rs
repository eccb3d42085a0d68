//! Sample reference catalog for tests and local development.
//!
//! Mirrors the deterministic world used by the core test fixtures: a
//! three-exercise catalog over two muscle groups with an F-to-Elite ladder.

use anyhow::Result;
use sqlx::SqlitePool;
use uuid::Uuid;

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

pub const RANK_THRESHOLDS: [f64; 8] = [0.0, 0.25, 0.5, 0.9, 1.2, 1.5, 1.8, 2.2];
pub const RANK_NAMES: [&str; 8] = ["F", "E", "D", "C", "B", "A", "S", "Elite"];

/// Seed the full sample catalog. Idempotent on an empty database only.
pub async fn seed_sample_data(pool: &SqlitePool) -> Result<()> {
    seed_ranks(pool).await?;
    seed_muscle_map(pool).await?;
    seed_exercises(pool).await?;
    seed_benchmarks(pool).await?;
    seed_levels(pool).await?;
    Ok(())
}

async fn seed_ranks(pool: &SqlitePool) -> Result<()> {
    for (i, min) in RANK_THRESHOLDS.iter().enumerate() {
        let id = i as i64 + 1;
        let max = RANK_THRESHOLDS.get(i + 1).copied().unwrap_or(3.0);
        sqlx::query("INSERT INTO ranks (id, name, min_score, max_score) VALUES (?, ?, ?, ?)")
            .bind(id)
            .bind(RANK_NAMES[i])
            .bind(min)
            .bind(max)
            .execute(pool)
            .await?;

        // Three bands per rank, strongest band has the highest sort_order
        let width = (max - min) / 3.0;
        for slot in 0..3i64 {
            sqlx::query(
                "INSERT INTO inter_ranks (id, rank_id, name, min_score, max_score, sort_order)
                 VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(id * 10 + slot + 1)
            .bind(id)
            .bind(format!("{} {}", RANK_NAMES[i], ["III", "II", "I"][slot as usize]))
            .bind(min + width * slot as f64)
            .bind(min + width * (slot + 1) as f64)
            .bind(slot + 1)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

async fn seed_muscle_map(pool: &SqlitePool) -> Result<()> {
    let groups = [
        (UPPER_BODY, "Upper Body", 0.6),
        (LOWER_BODY, "Lower Body", 0.4),
    ];
    for (id, name, overall_weight) in groups {
        sqlx::query("INSERT INTO muscle_groups (id, name, overall_weight) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(overall_weight)
            .execute(pool)
            .await?;
    }

    let muscles = [
        (CHEST, "Chest", UPPER_BODY, 0.5),
        (TRICEPS, "Triceps", UPPER_BODY, 0.3),
        (FRONT_DELT, "Front Delt", UPPER_BODY, 0.2),
        (QUADS, "Quads", LOWER_BODY, 0.6),
        (GLUTES, "Glutes", LOWER_BODY, 0.4),
    ];
    for (id, name, group_id, weight) in muscles {
        sqlx::query(
            "INSERT INTO muscles (id, name, muscle_group_id, muscle_group_weight)
             VALUES (?, ?, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(group_id)
        .bind(weight)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn seed_exercises(pool: &SqlitePool) -> Result<()> {
    let exercises = [
        (BENCH_PRESS, "Bench Press", "barbell", Some(1.5), Some(1.1)),
        (BACK_SQUAT, "Back Squat", "barbell", Some(2.2), Some(1.7)),
        (LEG_PRESS, "Leg Press", "machine", Some(400.0), Some(280.0)),
    ];
    for (id, name, exercise_type, male, female) in exercises {
        sqlx::query(
            "INSERT INTO exercises (id, name, exercise_type, bilateral, elite_swr_male, elite_swr_female)
             VALUES (?, ?, ?, 1, ?, ?)",
        )
        .bind(id)
        .bind(name)
        .bind(exercise_type)
        .bind(male)
        .bind(female)
        .execute(pool)
        .await?;
    }

    let links = [
        (BENCH_PRESS, CHEST, "primary", 1.0),
        (BENCH_PRESS, TRICEPS, "secondary", 0.5),
        (BENCH_PRESS, FRONT_DELT, "accessory", 0.25),
        (BACK_SQUAT, QUADS, "primary", 1.0),
        (BACK_SQUAT, GLUTES, "secondary", 0.5),
        (LEG_PRESS, QUADS, "primary", 1.0),
    ];
    for (exercise_id, muscle_id, intensity, weight) in links {
        sqlx::query(
            "INSERT INTO exercise_muscles (exercise_id, muscle_id, intensity, weight)
             VALUES (?, ?, ?, ?)",
        )
        .bind(exercise_id)
        .bind(muscle_id)
        .bind(intensity)
        .bind(weight)
        .execute(pool)
        .await?;
    }
    Ok(())
}

async fn seed_benchmarks(pool: &SqlitePool) -> Result<()> {
    let genders = ["male", "female"];

    for gender in genders {
        for (i, min) in RANK_THRESHOLDS.iter().enumerate() {
            let rank_id = i as i64 + 1;

            for exercise_id in [BENCH_PRESS, BACK_SQUAT, LEG_PRESS] {
                sqlx::query(
                    "INSERT INTO exercise_benchmarks (gender, exercise_id, min_threshold, rank_id)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(gender)
                .bind(exercise_id)
                .bind(min)
                .bind(rank_id)
                .execute(pool)
                .await?;
            }

            for muscle_id in [CHEST, TRICEPS, FRONT_DELT, QUADS, GLUTES] {
                sqlx::query(
                    "INSERT INTO muscle_benchmarks (gender, muscle_id, min_threshold, rank_id)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(gender)
                .bind(muscle_id)
                .bind(min)
                .bind(rank_id)
                .execute(pool)
                .await?;
            }

            for group_id in [UPPER_BODY, LOWER_BODY] {
                sqlx::query(
                    "INSERT INTO muscle_group_benchmarks (gender, muscle_group_id, min_threshold, rank_id)
                     VALUES (?, ?, ?, ?)",
                )
                .bind(gender)
                .bind(group_id)
                .bind(min)
                .bind(rank_id)
                .execute(pool)
                .await?;
            }

            sqlx::query(
                "INSERT INTO overall_benchmarks (gender, min_threshold, rank_id)
                 VALUES (?, ?, ?)",
            )
            .bind(gender)
            .bind(min)
            .bind(rank_id)
            .execute(pool)
            .await?;
        }
    }
    Ok(())
}

async fn seed_levels(pool: &SqlitePool) -> Result<()> {
    for level in 1..=5i64 {
        sqlx::query("INSERT INTO level_definitions (level, min_xp, title) VALUES (?, ?, ?)")
            .bind(level)
            .bind((level - 1) * 1000)
            .bind(format!("Level {}", level))
            .execute(pool)
            .await?;
    }
    Ok(())
}
