use std::collections::HashMap;

use uuid::Uuid;

use crate::domain::{PrType, ScoredSet, UserExercisePr};
use crate::services::scoring::SCORE_EPSILON;

/// Rows the persistence gateway must write for a batch of candidate sets:
/// the PR upserts and the history rows to append. The evaluator never
/// writes.
#[derive(Debug, Clone, Default)]
pub struct PrEvaluation {
    pub upserts: Vec<UserExercisePr>,
    pub history: Vec<UserExercisePr>,
}

/// Classify candidate sets against the stored PR map. Existing records are
/// replaced only on strict improvement; max-reps candidates must be achieved
/// at a load matching or exceeding the stored record's load.
pub fn evaluate_prs(
    user_id: Uuid,
    bodyweight_kg: Option<f64>,
    scored: &[ScoredSet],
    existing: &HashMap<(Uuid, PrType), UserExercisePr>,
) -> PrEvaluation {
    // Best candidate per (exercise, pr-type) within the batch
    let mut best: HashMap<(Uuid, PrType), UserExercisePr> = HashMap::new();

    for item in scored {
        let key = item.set.exercise.key();
        for pr_type in [PrType::OneRepMax, PrType::MaxReps, PrType::MaxSwr] {
            let value = match pr_type {
                PrType::OneRepMax => item.estimated_one_rep_max,
                PrType::MaxReps => item.set.reps as f64,
                PrType::MaxSwr => item.swr,
            };
            let candidate = UserExercisePr {
                user_id,
                exercise_key: key,
                pr_type,
                value,
                weight_kg: item.set.weight_kg,
                bodyweight: bodyweight_kg,
                source_set_id: Some(item.set.id),
                achieved_at: item.set.performed_at,
            };

            let current = best.get(&(key, pr_type));
            if beats(&candidate, current) {
                best.insert((key, pr_type), candidate);
            }
        }
    }

    let mut upserts: Vec<UserExercisePr> = best
        .into_values()
        .filter(|candidate| {
            beats(
                candidate,
                existing.get(&(candidate.exercise_key, candidate.pr_type)),
            )
        })
        .collect();
    upserts.sort_by(|a, b| {
        (a.exercise_key, a.pr_type.as_str()).cmp(&(b.exercise_key, b.pr_type.as_str()))
    });

    PrEvaluation {
        history: upserts.clone(),
        upserts,
    }
}

fn beats(candidate: &UserExercisePr, current: Option<&UserExercisePr>) -> bool {
    match current {
        None => match candidate.pr_type {
            PrType::MaxReps => candidate.value > 0.0 && candidate.weight_kg > 0.0,
            _ => candidate.value > 0.0,
        },
        Some(stored) => match candidate.pr_type {
            PrType::MaxReps => {
                candidate.value > stored.value
                    && candidate.weight_kg + SCORE_EPSILON >= stored.weight_kg
            }
            _ => candidate.value > stored.value,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExerciseRef, WorkoutSet};
    use chrono::Utc;
    use rstest::rstest;

    const USER: Uuid = Uuid::from_u128(10);
    const BENCH: Uuid = Uuid::from_u128(1);

    fn scored(weight_kg: f64, reps: i32, bodyweight: f64) -> ScoredSet {
        let e1rm = crate::services::scoring::estimate_one_rep_max(weight_kg, reps);
        let swr = crate::services::scoring::strength_to_weight_ratio(e1rm, bodyweight);
        ScoredSet {
            set: WorkoutSet {
                id: Uuid::new_v4(),
                session_id: None,
                exercise: ExerciseRef::Standard(BENCH),
                set_order: 1,
                reps,
                weight_kg,
                performed_at: Utc::now(),
                calc_one_rep_max: None,
                calc_swr: None,
            },
            estimated_one_rep_max: e1rm,
            swr,
            score: swr,
            rank_id: 1,
            inter_rank_id: None,
        }
    }

    fn stored(pr_type: PrType, value: f64, weight_kg: f64) -> ((Uuid, PrType), UserExercisePr) {
        (
            (BENCH, pr_type),
            UserExercisePr {
                user_id: USER,
                exercise_key: BENCH,
                pr_type,
                value,
                weight_kg,
                bodyweight: Some(80.0),
                source_set_id: None,
                achieved_at: Utc::now(),
            },
        )
    }

    #[test]
    fn test_first_set_creates_all_three_prs() {
        let result = evaluate_prs(USER, Some(80.0), &[scored(60.0, 5, 80.0)], &HashMap::new());

        assert_eq!(result.upserts.len(), 3);
        assert_eq!(result.history.len(), 3);

        let one_rm = result
            .upserts
            .iter()
            .find(|pr| pr.pr_type == PrType::OneRepMax)
            .unwrap();
        assert!((one_rm.value - 70.0).abs() < 1e-9);
        assert_eq!(one_rm.bodyweight, Some(80.0));
        assert!(one_rm.source_set_id.is_some());
    }

    #[test]
    fn test_strict_improvement_required() {
        let existing: HashMap<_, _> = [
            stored(PrType::OneRepMax, 70.0, 60.0),
            stored(PrType::MaxReps, 5.0, 60.0),
            stored(PrType::MaxSwr, 0.875, 60.0),
        ]
        .into_iter()
        .collect();

        // Identical performance: nothing beats anything
        let result = evaluate_prs(USER, Some(80.0), &[scored(60.0, 5, 80.0)], &existing);
        assert!(result.upserts.is_empty());
    }

    #[test]
    fn test_heavier_set_beats_one_rep_max() {
        let existing: HashMap<_, _> = [stored(PrType::OneRepMax, 70.0, 60.0)].into_iter().collect();

        let result = evaluate_prs(USER, Some(80.0), &[scored(62.5, 5, 80.0)], &existing);

        let one_rm = result
            .upserts
            .iter()
            .find(|pr| pr.pr_type == PrType::OneRepMax)
            .unwrap();
        assert!((one_rm.value - 72.917).abs() < 1e-3);
    }

    #[rstest]
    #[case(8, 55.0, false)] // more reps at a lighter load: not a rep PR
    #[case(6, 60.0, true)] // more reps at the stored load: rep PR
    #[case(6, 62.5, true)] // more reps at a heavier load: rep PR
    #[case(4, 62.5, false)] // fewer reps: never a rep PR
    fn test_max_reps_requires_stored_load(
        #[case] reps: i32,
        #[case] weight: f64,
        #[case] expect_pr: bool,
    ) {
        let existing: HashMap<_, _> = [
            stored(PrType::MaxReps, 5.0, 60.0),
            // Saturate the other types so only max_reps can fire
            stored(PrType::OneRepMax, 1000.0, 60.0),
            stored(PrType::MaxSwr, 100.0, 60.0),
        ]
        .into_iter()
        .collect();

        let result = evaluate_prs(USER, Some(80.0), &[scored(weight, reps, 80.0)], &existing);
        let rep_pr = result
            .upserts
            .iter()
            .find(|pr| pr.pr_type == PrType::MaxReps);
        assert_eq!(rep_pr.is_some(), expect_pr);
    }

    #[test]
    fn test_batch_keeps_best_candidate_per_type() {
        let sets = vec![
            scored(60.0, 5, 80.0),
            scored(62.5, 5, 80.0),
            scored(55.0, 5, 80.0),
        ];

        let result = evaluate_prs(USER, Some(80.0), &sets, &HashMap::new());

        let one_rm = result
            .upserts
            .iter()
            .find(|pr| pr.pr_type == PrType::OneRepMax)
            .unwrap();
        assert!((one_rm.value - 72.917).abs() < 1e-3);
    }

    #[test]
    fn test_zero_valued_candidates_create_nothing() {
        let result = evaluate_prs(USER, Some(80.0), &[scored(0.0, 5, 80.0)], &HashMap::new());
        assert!(result.upserts.is_empty());
    }
}
