use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::domain::{
    Exercise, ExerciseMuscle, Gender, InterRank, Muscle, MuscleGroup, Rank, RankBenchmark,
    RankRowUpdate, RankTier, RankUpdatePayload, RankingSummary, ScoredSet, TierProgression,
    UserExerciseRank, UserMuscleGroupRank, UserMuscleRank, UserRank,
};
use crate::services::scoring::{rank_for_score, sub_rank_for_score, SCORE_EPSILON};

/// Reference tables the aggregator needs, already resolved for one gender.
#[derive(Clone)]
pub struct ReferenceContext {
    pub gender: Gender,
    pub exercises: Arc<Vec<Exercise>>,
    pub exercise_muscles: Arc<Vec<ExerciseMuscle>>,
    pub muscles: Arc<Vec<Muscle>>,
    pub muscle_groups: Arc<Vec<MuscleGroup>>,
    pub ranks: Arc<Vec<Rank>>,
    pub inter_ranks: Arc<Vec<InterRank>>,
    pub exercise_benchmarks: Arc<Vec<RankBenchmark>>,
    pub muscle_benchmarks: Arc<Vec<RankBenchmark>>,
    pub muscle_group_benchmarks: Arc<Vec<RankBenchmark>>,
    pub overall_benchmarks: Arc<Vec<RankBenchmark>>,
}

impl ReferenceContext {
    pub fn exercise(&self, id: Uuid) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }
}

/// The user's stored rank rows, keyed for lookup during aggregation.
#[derive(Debug, Clone, Default)]
pub struct StoredRanks {
    pub exercise: HashMap<Uuid, UserExerciseRank>,
    pub muscle: HashMap<Uuid, UserMuscleRank>,
    pub muscle_group: HashMap<Uuid, UserMuscleGroupRank>,
    pub overall: Option<UserRank>,
}

/// Which write channel a batch runs on. Workout finalization locks the rows
/// it writes and never downgrades; the manual calculator writes unlocked
/// rows, which a later entry may freely replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteChannel {
    Locked,
    Unlocked,
}

/// Output of one aggregation run.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub payload: RankUpdatePayload,
    pub progressions: Vec<TierProgression>,
    pub summary: RankingSummary,
}

#[derive(Debug, Clone, Copy)]
struct StoredScore {
    score: f64,
    locked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PassPolicy {
    /// Permanent channel: locked rows and finalization writes only ever
    /// improve; unlocked rows are freely recalculated by the manual flow.
    Permanent(WriteChannel),
    /// Leaderboard channel: best-of-epoch, never decreases within an epoch.
    Leaderboard,
}

#[derive(Debug, Clone, Copy)]
struct PassOutcome {
    new_score: f64,
    changed: bool,
}

#[derive(Debug, Default)]
struct PassResult {
    exercise: HashMap<Uuid, PassOutcome>,
    muscle: HashMap<Uuid, PassOutcome>,
    muscle_group: HashMap<Uuid, PassOutcome>,
    overall: Option<PassOutcome>,
}

/// Run the tier pipeline: per-exercise bests, muscle scores via intensity
/// weights, muscle-group sums, overall sum, each tier re-ranked against its
/// per-gender benchmark ladder. The permanent and leaderboard channels run
/// as two passes of the same aggregation with different stored baselines;
/// the payload contains only rows on which either channel changed.
pub fn aggregate(
    refs: &ReferenceContext,
    stored: &StoredRanks,
    scored: &[ScoredSet],
    channel: WriteChannel,
) -> Aggregation {
    // Best new set per standard exercise across the batch
    let mut best_sets: HashMap<Uuid, &ScoredSet> = HashMap::new();
    for item in scored {
        let Some(exercise_id) = item.set.exercise.standard_id() else {
            continue;
        };
        if refs.exercise(exercise_id).is_none() {
            continue;
        }
        let entry = best_sets.entry(exercise_id).or_insert(item);
        if item.score > entry.score {
            *entry = item;
        }
    }

    if best_sets.is_empty() {
        return Aggregation::default();
    }

    let mut touched: Vec<(Uuid, &ScoredSet)> =
        best_sets.iter().map(|(id, set)| (*id, *set)).collect();
    touched.sort_by_key(|(id, _)| *id);

    let permanent = run_pass(
        refs,
        &stored_scores(stored, Baseline::Permanent),
        &touched,
        PassPolicy::Permanent(channel),
    );
    let leaderboard = run_pass(
        refs,
        &stored_scores(stored, Baseline::Leaderboard),
        &touched,
        PassPolicy::Leaderboard,
    );

    let mut payload = RankUpdatePayload::default();
    let mut progressions = Vec::new();

    for (exercise_id, best) in &touched {
        let perm = permanent.exercise[exercise_id];
        let lead = leaderboard.exercise[exercise_id];
        if let Some(mut update) = merge_row(
            refs,
            &refs.exercise_benchmarks,
            Some(*exercise_id),
            stored.exercise.get(exercise_id).map(|row| RowView {
                score: row.score,
                rank_id: row.rank_id,
                inter_rank_id: row.inter_rank_id,
                locked: row.locked,
            }),
            perm,
            lead,
            channel,
        ) {
            if perm.changed {
                update.contributing_set_id = Some(best.set.id);
                progressions.push(progression(RankTier::Exercise, &update));
            }
            payload.exercise_ranks.push(update);
        }
    }

    let mut muscle_ids: Vec<Uuid> = permanent.muscle.keys().copied().collect();
    muscle_ids.sort();
    for muscle_id in muscle_ids {
        let perm = permanent.muscle[&muscle_id];
        let lead = leaderboard.muscle[&muscle_id];
        if let Some(update) = merge_row(
            refs,
            &refs.muscle_benchmarks,
            Some(muscle_id),
            stored.muscle.get(&muscle_id).map(|row| RowView {
                score: row.score,
                rank_id: row.rank_id,
                inter_rank_id: row.inter_rank_id,
                locked: row.locked,
            }),
            perm,
            lead,
            channel,
        ) {
            if perm.changed {
                progressions.push(progression(RankTier::Muscle, &update));
            }
            payload.muscle_ranks.push(update);
        }
    }

    let mut group_ids: Vec<Uuid> = permanent.muscle_group.keys().copied().collect();
    group_ids.sort();
    for group_id in group_ids {
        let perm = permanent.muscle_group[&group_id];
        let lead = leaderboard.muscle_group[&group_id];
        if let Some(update) = merge_row(
            refs,
            &refs.muscle_group_benchmarks,
            Some(group_id),
            stored.muscle_group.get(&group_id).map(|row| RowView {
                score: row.score,
                rank_id: row.rank_id,
                inter_rank_id: row.inter_rank_id,
                locked: row.locked,
            }),
            perm,
            lead,
            channel,
        ) {
            if perm.changed {
                progressions.push(progression(RankTier::MuscleGroup, &update));
            }
            payload.muscle_group_ranks.push(update);
        }
    }

    if let (Some(perm), Some(lead)) = (permanent.overall, leaderboard.overall) {
        if let Some(update) = merge_row(
            refs,
            &refs.overall_benchmarks,
            None,
            stored.overall.as_ref().map(|row| RowView {
                score: row.score,
                rank_id: row.rank_id,
                inter_rank_id: row.inter_rank_id,
                locked: row.locked,
            }),
            perm,
            lead,
            channel,
        ) {
            if perm.changed {
                progressions.push(progression(RankTier::Overall, &update));
            }
            payload.user_rank = Some(update);
        }
    }

    let summary = summarize(&payload);
    debug!(
        exercise_rows = payload.exercise_ranks.len(),
        muscle_rows = payload.muscle_ranks.len(),
        group_rows = payload.muscle_group_ranks.len(),
        overall_row = payload.user_rank.is_some(),
        any_rank_up = summary.any_rank_up,
        "aggregation complete"
    );

    Aggregation {
        payload,
        progressions,
        summary,
    }
}

enum Baseline {
    Permanent,
    Leaderboard,
}

struct StoredScores {
    exercise: HashMap<Uuid, StoredScore>,
    muscle: HashMap<Uuid, StoredScore>,
    muscle_group: HashMap<Uuid, StoredScore>,
    overall: Option<StoredScore>,
}

fn stored_scores(stored: &StoredRanks, baseline: Baseline) -> StoredScores {
    let pick = |score: f64, leaderboard_score: f64| match baseline {
        Baseline::Permanent => score,
        Baseline::Leaderboard => leaderboard_score,
    };

    StoredScores {
        exercise: stored
            .exercise
            .iter()
            .map(|(id, row)| {
                (
                    *id,
                    StoredScore {
                        score: pick(row.score, row.leaderboard_score),
                        locked: row.locked,
                    },
                )
            })
            .collect(),
        muscle: stored
            .muscle
            .iter()
            .map(|(id, row)| {
                (
                    *id,
                    StoredScore {
                        score: pick(row.score, row.leaderboard_score),
                        locked: row.locked,
                    },
                )
            })
            .collect(),
        muscle_group: stored
            .muscle_group
            .iter()
            .map(|(id, row)| {
                (
                    *id,
                    StoredScore {
                        score: pick(row.score, row.leaderboard_score),
                        locked: row.locked,
                    },
                )
            })
            .collect(),
        overall: stored.overall.as_ref().map(|row| StoredScore {
            score: pick(row.score, row.leaderboard_score),
            locked: row.locked,
        }),
    }
}

/// One aggregation pass over the four tiers against a single stored
/// baseline.
fn run_pass(
    refs: &ReferenceContext,
    stored: &StoredScores,
    touched: &[(Uuid, &ScoredSet)],
    policy: PassPolicy,
) -> PassResult {
    let mut result = PassResult::default();

    // Step A: exercise tier
    let mut effective_exercise: HashMap<Uuid, f64> = HashMap::new();
    for (exercise_id, best) in touched {
        let outcome = resolve(stored.exercise.get(exercise_id).copied(), best.score, policy);
        effective_exercise.insert(*exercise_id, outcome.new_score);
        result.exercise.insert(*exercise_id, outcome);
    }

    // Step B: best weighted contribution per muscle
    let mut muscle_candidates: HashMap<Uuid, f64> = HashMap::new();
    for (exercise_id, effective) in &effective_exercise {
        for link in refs
            .exercise_muscles
            .iter()
            .filter(|l| l.exercise_id == *exercise_id)
        {
            let candidate = effective * link.effective_weight();
            let slot = muscle_candidates.entry(link.muscle_id).or_insert(candidate);
            if candidate > *slot {
                *slot = candidate;
            }
        }
    }

    let mut effective_muscle: HashMap<Uuid, f64> = HashMap::new();
    for (muscle_id, candidate) in &muscle_candidates {
        let outcome = resolve(stored.muscle.get(muscle_id).copied(), *candidate, policy);
        effective_muscle.insert(*muscle_id, outcome.new_score);
        result.muscle.insert(*muscle_id, outcome);
    }

    // Step C: weighted sum over each touched group's muscles
    let touched_groups: HashSet<Uuid> = effective_muscle
        .keys()
        .filter_map(|muscle_id| {
            refs.muscles
                .iter()
                .find(|m| m.id == *muscle_id)
                .map(|m| m.muscle_group_id)
        })
        .collect();

    let mut effective_group: HashMap<Uuid, f64> = HashMap::new();
    for group_id in &touched_groups {
        let candidate: f64 = refs
            .muscles
            .iter()
            .filter(|m| m.muscle_group_id == *group_id)
            .map(|muscle| {
                let score = effective_muscle.get(&muscle.id).copied().unwrap_or_else(|| {
                    stored
                        .muscle
                        .get(&muscle.id)
                        .map(|s| s.score)
                        .unwrap_or(0.0)
                });
                score * muscle.muscle_group_weight
            })
            .sum();

        let outcome = resolve(stored.muscle_group.get(group_id).copied(), candidate, policy);
        effective_group.insert(*group_id, outcome.new_score);
        result.muscle_group.insert(*group_id, outcome);
    }

    // Step D: overall sum across every group, stored fallback for the rest
    let overall_candidate: f64 = refs
        .muscle_groups
        .iter()
        .map(|group| {
            let score = effective_group.get(&group.id).copied().unwrap_or_else(|| {
                stored
                    .muscle_group
                    .get(&group.id)
                    .map(|s| s.score)
                    .unwrap_or(0.0)
            });
            score * group.overall_weight
        })
        .sum();

    result.overall = Some(resolve(stored.overall, overall_candidate, policy));

    result
}

fn resolve(stored: Option<StoredScore>, candidate: f64, policy: PassPolicy) -> PassOutcome {
    let replaced = match (policy, stored) {
        (_, None) => true,
        (PassPolicy::Permanent(channel), Some(view)) => {
            if view.locked || channel == WriteChannel::Locked {
                candidate > view.score + SCORE_EPSILON
            } else {
                true
            }
        }
        (PassPolicy::Leaderboard, Some(view)) => candidate > view.score + SCORE_EPSILON,
    };

    let new_score = if replaced {
        candidate
    } else {
        stored.map(|view| view.score).unwrap_or(candidate)
    };

    let changed = replaced
        && stored
            .map(|view| (candidate - view.score).abs() > SCORE_EPSILON)
            .unwrap_or(true);

    PassOutcome { new_score, changed }
}

struct RowView {
    score: f64,
    rank_id: i64,
    inter_rank_id: Option<i64>,
    locked: bool,
}

/// Combine the two channel outcomes for one row into an update, or None if
/// neither channel moved.
#[allow(clippy::too_many_arguments)]
fn merge_row(
    refs: &ReferenceContext,
    benchmarks: &[RankBenchmark],
    target_id: Option<Uuid>,
    stored: Option<RowView>,
    permanent: PassOutcome,
    leaderboard: PassOutcome,
    channel: WriteChannel,
) -> Option<RankRowUpdate> {
    if !permanent.changed && !leaderboard.changed {
        return None;
    }

    let (new_score, new_rank_id, new_inter_rank_id, locked) = if permanent.changed {
        let rank_id = rank_for_score(benchmarks, &refs.ranks, target_id, permanent.new_score);
        let inter_rank_id = sub_rank_for_score(&refs.inter_ranks, rank_id, permanent.new_score);
        (
            permanent.new_score,
            rank_id,
            inter_rank_id,
            channel == WriteChannel::Locked,
        )
    } else {
        // Leaderboard-only movement: the permanent channel keeps its stored
        // score, rank and lock state
        match stored.as_ref() {
            Some(view) => (view.score, view.rank_id, view.inter_rank_id, view.locked),
            None => {
                let rank_id =
                    rank_for_score(benchmarks, &refs.ranks, target_id, permanent.new_score);
                let inter_rank_id =
                    sub_rank_for_score(&refs.inter_ranks, rank_id, permanent.new_score);
                (
                    permanent.new_score,
                    rank_id,
                    inter_rank_id,
                    channel == WriteChannel::Locked,
                )
            }
        }
    };

    Some(RankRowUpdate {
        target_id,
        old_score: stored.as_ref().map(|view| view.score),
        new_score,
        old_rank_id: stored.as_ref().map(|view| view.rank_id),
        new_rank_id,
        old_inter_rank_id: stored.as_ref().and_then(|view| view.inter_rank_id),
        new_inter_rank_id,
        new_leaderboard_score: leaderboard.new_score,
        locked,
        contributing_set_id: None,
    })
}

fn progression(tier: RankTier, update: &RankRowUpdate) -> TierProgression {
    TierProgression {
        tier,
        target_id: update.target_id,
        old_score: update.old_score,
        new_score: update.new_score,
        old_rank_id: update.old_rank_id,
        new_rank_id: update.new_rank_id,
        old_inter_rank_id: update.old_inter_rank_id,
        new_inter_rank_id: update.new_inter_rank_id,
    }
}

fn summarize(payload: &RankUpdatePayload) -> RankingSummary {
    let muscle_rank_up_count = payload
        .muscle_ranks
        .iter()
        .filter(|row| row.is_rank_up())
        .count();
    let muscle_group_rank_up_count = payload
        .muscle_group_ranks
        .iter()
        .filter(|row| row.is_rank_up())
        .count();
    let exercise_rank_up = payload.exercise_ranks.iter().any(|row| row.is_rank_up());
    let overall_rank_up = payload
        .user_rank
        .as_ref()
        .map(|row| row.is_rank_up())
        .unwrap_or(false);

    RankingSummary {
        any_rank_up: exercise_rank_up
            || muscle_rank_up_count > 0
            || muscle_group_rank_up_count > 0
            || overall_rank_up,
        overall_rank_up,
        muscle_group_rank_up_count,
        muscle_rank_up_count,
    }
}
