use uuid::Uuid;

use crate::domain::{
    Exercise, Gender, InterRank, Rank, RankBenchmark, ScoredSet, WorkoutSet,
};

/// Tolerance for score comparisons at rank boundaries; ties promote to the
/// higher band.
pub const SCORE_EPSILON: f64 = 1e-9;

/// Epley estimated one-rep maximum.
pub fn estimate_one_rep_max(weight_kg: f64, reps: i32) -> f64 {
    if reps <= 0 || weight_kg <= 0.0 {
        return 0.0;
    }
    if reps == 1 {
        return weight_kg;
    }
    weight_kg * (1.0 + reps as f64 / 30.0)
}

/// Strength-to-weight ratio; zero when no bodyweight is known.
pub fn strength_to_weight_ratio(one_rep_max: f64, bodyweight_kg: f64) -> f64 {
    if bodyweight_kg > 0.0 {
        one_rep_max / bodyweight_kg
    } else {
        0.0
    }
}

/// Score for one exercise performance. Bodyweight-scaled types score as SWR;
/// machine, assisted and cardio movements are normalized against the
/// exercise's own per-gender elite target so the result stays comparable on
/// the benchmark ladders.
pub fn exercise_score(exercise: &Exercise, gender: Gender, one_rep_max: f64, swr: f64) -> f64 {
    if exercise.exercise_type.is_bodyweight_scaled() {
        return swr;
    }
    match exercise.elite_target(gender) {
        Some(target) if target > 0.0 => one_rep_max / target,
        _ => 0.0,
    }
}

/// Smallest rank id, the floor every lookup degrades to.
pub fn lowest_rank_id(ranks: &[Rank]) -> i64 {
    ranks.iter().map(|r| r.id).min().unwrap_or(0)
}

/// Resolve a score against a benchmark ladder: rows for the target, highest
/// crossed `min_threshold` wins, boundary equality promotes. Missing rows
/// degrade to the lowest rank.
pub fn rank_for_score(
    benchmarks: &[RankBenchmark],
    ranks: &[Rank],
    target_id: Option<Uuid>,
    score: f64,
) -> i64 {
    let mut ladder: Vec<&RankBenchmark> = benchmarks
        .iter()
        .filter(|b| b.target_id == target_id)
        .collect();
    ladder.sort_by(|a, b| {
        b.min_threshold
            .partial_cmp(&a.min_threshold)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    for row in ladder {
        if score + SCORE_EPSILON >= row.min_threshold {
            return row.rank_id;
        }
    }

    lowest_rank_id(ranks)
}

/// Resolve the sub-rank band within a rank. Bands are checked strongest
/// first so boundary equality promotes; a rank with no bands yields None.
pub fn sub_rank_for_score(inter_ranks: &[InterRank], rank_id: i64, score: f64) -> Option<i64> {
    let mut bands: Vec<&InterRank> = inter_ranks
        .iter()
        .filter(|ir| ir.rank_id == rank_id)
        .collect();
    bands.sort_by_key(|ir| std::cmp::Reverse(ir.sort_order));

    for band in &bands {
        if score + SCORE_EPSILON >= band.min_score {
            return Some(band.id);
        }
    }

    bands.last().map(|ir| ir.id)
}

/// Derive every per-set measure in one pass.
pub fn score_set(
    set: &WorkoutSet,
    exercise: &Exercise,
    gender: Gender,
    bodyweight_kg: f64,
    exercise_benchmarks: &[RankBenchmark],
    ranks: &[Rank],
    inter_ranks: &[InterRank],
) -> ScoredSet {
    let estimated_one_rep_max = estimate_one_rep_max(set.weight_kg, set.reps);
    let swr = strength_to_weight_ratio(estimated_one_rep_max, bodyweight_kg);
    let score = exercise_score(exercise, gender, estimated_one_rep_max, swr);
    let rank_id = rank_for_score(exercise_benchmarks, ranks, Some(exercise.id), score);
    let inter_rank_id = sub_rank_for_score(inter_ranks, rank_id, score);

    ScoredSet {
        set: set.clone(),
        estimated_one_rep_max,
        swr,
        score,
        rank_id,
        inter_rank_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExerciseType;
    use proptest::prelude::*;

    fn exercise(exercise_type: ExerciseType) -> Exercise {
        Exercise {
            id: Uuid::from_u128(1),
            name: "Bench Press".to_string(),
            exercise_type,
            bilateral: true,
            elite_swr_male: Some(1.5),
            elite_swr_female: Some(1.1),
        }
    }

    fn ladder() -> (Vec<RankBenchmark>, Vec<Rank>) {
        let thresholds = [0.0, 0.25, 0.5, 0.9, 1.2];
        let benchmarks = thresholds
            .iter()
            .enumerate()
            .map(|(i, min)| RankBenchmark {
                gender: Gender::Male,
                target_id: Some(Uuid::from_u128(1)),
                min_threshold: *min,
                rank_id: i as i64 + 1,
            })
            .collect();
        let ranks = thresholds
            .iter()
            .enumerate()
            .map(|(i, min)| Rank {
                id: i as i64 + 1,
                name: format!("R{}", i + 1),
                min_score: *min,
                max_score: min + 0.25,
            })
            .collect();
        (benchmarks, ranks)
    }

    #[test]
    fn test_epley_single_rep_equals_weight() {
        assert_eq!(estimate_one_rep_max(100.0, 1), 100.0);
    }

    #[test]
    fn test_epley_zero_reps_is_zero() {
        assert_eq!(estimate_one_rep_max(100.0, 0), 0.0);
        assert_eq!(estimate_one_rep_max(100.0, -3), 0.0);
    }

    #[test]
    fn test_epley_zero_weight_is_zero() {
        assert_eq!(estimate_one_rep_max(0.0, 5), 0.0);
        assert_eq!(estimate_one_rep_max(-20.0, 5), 0.0);
    }

    #[test]
    fn test_epley_bench_sixty_by_five() {
        // 60 * (1 + 5/30) = 70
        let e1rm = estimate_one_rep_max(60.0, 5);
        assert!((e1rm - 70.0).abs() < 1e-12);
    }

    #[test]
    fn test_swr_divides_by_bodyweight() {
        assert!((strength_to_weight_ratio(70.0, 80.0) - 0.875).abs() < 1e-12);
    }

    #[test]
    fn test_swr_without_bodyweight_is_zero() {
        assert_eq!(strength_to_weight_ratio(70.0, 0.0), 0.0);
        assert_eq!(strength_to_weight_ratio(70.0, -1.0), 0.0);
    }

    #[test]
    fn test_barbell_score_is_swr() {
        let ex = exercise(ExerciseType::Barbell);
        assert_eq!(exercise_score(&ex, Gender::Male, 70.0, 0.875), 0.875);
    }

    #[test]
    fn test_machine_score_normalizes_against_elite_target() {
        let mut ex = exercise(ExerciseType::Machine);
        ex.elite_swr_male = Some(200.0);
        // 150 / 200 = 0.75, independent of bodyweight
        assert!((exercise_score(&ex, Gender::Male, 150.0, 2.1) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_machine_score_without_target_is_zero() {
        let mut ex = exercise(ExerciseType::Machine);
        ex.elite_swr_male = None;
        assert_eq!(exercise_score(&ex, Gender::Male, 150.0, 2.1), 0.0);
    }

    #[test]
    fn test_rank_lookup_selects_highest_crossed_threshold() {
        let (benchmarks, ranks) = ladder();
        assert_eq!(
            rank_for_score(&benchmarks, &ranks, Some(Uuid::from_u128(1)), 0.875),
            3
        );
        assert_eq!(
            rank_for_score(&benchmarks, &ranks, Some(Uuid::from_u128(1)), 1.5),
            5
        );
    }

    #[test]
    fn test_rank_lookup_boundary_tie_promotes() {
        let (benchmarks, ranks) = ladder();
        assert_eq!(
            rank_for_score(&benchmarks, &ranks, Some(Uuid::from_u128(1)), 0.9),
            4
        );
    }

    #[test]
    fn test_rank_lookup_missing_target_degrades_to_lowest() {
        let (benchmarks, ranks) = ladder();
        assert_eq!(
            rank_for_score(&benchmarks, &ranks, Some(Uuid::from_u128(99)), 1.5),
            1
        );
    }

    #[test]
    fn test_sub_rank_boundary_tie_promotes() {
        let bands = vec![
            InterRank {
                id: 31,
                rank_id: 3,
                name: "III".to_string(),
                min_score: 0.5,
                max_score: 0.633,
                sort_order: 1,
            },
            InterRank {
                id: 32,
                rank_id: 3,
                name: "II".to_string(),
                min_score: 0.633,
                max_score: 0.767,
                sort_order: 2,
            },
            InterRank {
                id: 33,
                rank_id: 3,
                name: "I".to_string(),
                min_score: 0.767,
                max_score: 0.9,
                sort_order: 3,
            },
        ];

        assert_eq!(sub_rank_for_score(&bands, 3, 0.7), Some(32));
        // Exactly on a band boundary: higher band wins
        assert_eq!(sub_rank_for_score(&bands, 3, 0.767), Some(33));
        // Below every band: lowest band
        assert_eq!(sub_rank_for_score(&bands, 3, 0.1), Some(31));
    }

    #[test]
    fn test_sub_rank_missing_bands_is_none() {
        assert_eq!(sub_rank_for_score(&[], 3, 0.7), None);
    }

    proptest! {
        #[test]
        fn prop_epley_monotone_in_reps(weight in 1.0f64..500.0, reps in 1i32..30) {
            let lower = estimate_one_rep_max(weight, reps);
            let higher = estimate_one_rep_max(weight, reps + 1);
            prop_assert!(higher > lower);
        }

        #[test]
        fn prop_epley_monotone_in_weight(weight in 1.0f64..500.0, reps in 1i32..30) {
            let lower = estimate_one_rep_max(weight, reps);
            let higher = estimate_one_rep_max(weight + 2.5, reps);
            prop_assert!(higher > lower);
        }

        #[test]
        fn prop_rank_monotone_in_score(a in 0.0f64..3.0, b in 0.0f64..3.0) {
            let (benchmarks, ranks) = ladder();
            let target = Some(Uuid::from_u128(1));
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let rank_lo = rank_for_score(&benchmarks, &ranks, target, lo);
            let rank_hi = rank_for_score(&benchmarks, &ranks, target, hi);
            prop_assert!(rank_hi >= rank_lo);
        }
    }
}
