use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Gender variants used for benchmark selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err(format!("Unknown gender: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Exercise load types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseType {
    Barbell,
    FreeWeights,
    BodyWeight,
    WeightedBodyWeight,
    AssistedBodyWeight,
    Calisthenics,
    Machine,
    Cardio,
    NotApplicable,
}

impl From<String> for ExerciseType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "barbell" => ExerciseType::Barbell,
            "free_weights" => ExerciseType::FreeWeights,
            "body_weight" => ExerciseType::BodyWeight,
            "weighted_body_weight" => ExerciseType::WeightedBodyWeight,
            "assisted_body_weight" => ExerciseType::AssistedBodyWeight,
            "calisthenics" => ExerciseType::Calisthenics,
            "machine" => ExerciseType::Machine,
            "cardio" => ExerciseType::Cardio,
            _ => ExerciseType::NotApplicable,
        }
    }
}

impl ExerciseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExerciseType::Barbell => "barbell",
            ExerciseType::FreeWeights => "free_weights",
            ExerciseType::BodyWeight => "body_weight",
            ExerciseType::WeightedBodyWeight => "weighted_body_weight",
            ExerciseType::AssistedBodyWeight => "assisted_body_weight",
            ExerciseType::Calisthenics => "calisthenics",
            ExerciseType::Machine => "machine",
            ExerciseType::Cardio => "cardio",
            ExerciseType::NotApplicable => "n/a",
        }
    }

    /// Whether the score for this type is the bodyweight-normalized SWR.
    /// Machine, assisted and cardio movements are normalized against the
    /// exercise's own elite target instead.
    pub fn is_bodyweight_scaled(&self) -> bool {
        matches!(
            self,
            ExerciseType::Barbell
                | ExerciseType::FreeWeights
                | ExerciseType::BodyWeight
                | ExerciseType::WeightedBodyWeight
                | ExerciseType::Calisthenics
        )
    }
}

impl std::fmt::Display for ExerciseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A rankable exercise from the reference catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub exercise_type: ExerciseType,
    pub bilateral: bool,
    pub elite_swr_male: Option<f64>,
    pub elite_swr_female: Option<f64>,
}

impl Exercise {
    pub fn elite_target(&self, gender: Gender) -> Option<f64> {
        match gender {
            Gender::Male => self.elite_swr_male,
            Gender::Female => self.elite_swr_female,
        }
    }
}

/// A muscle, weighted within its muscle group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Muscle {
    pub id: Uuid,
    pub name: String,
    pub muscle_group_id: Uuid,
    /// Contribution of this muscle to its group score, in (0, 1].
    /// Weights within a group need not sum to 1.
    pub muscle_group_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuscleGroup {
    pub id: Uuid,
    pub name: String,
    /// Contribution of this group to the overall user score, in (0, 1].
    pub overall_weight: f64,
}

// How strongly an exercise recruits a muscle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MuscleIntensity {
    Primary,
    Secondary,
    Accessory,
}

impl MuscleIntensity {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s {
            "primary" => Ok(Self::Primary),
            "secondary" => Ok(Self::Secondary),
            "accessory" => Ok(Self::Accessory),
            _ => Err(format!("Unknown muscle intensity: {}", s)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MuscleIntensity::Primary => "primary",
            MuscleIntensity::Secondary => "secondary",
            MuscleIntensity::Accessory => "accessory",
        }
    }

    /// Default score weight when the link row carries none.
    pub fn default_weight(&self) -> f64 {
        match self {
            MuscleIntensity::Primary => 1.0,
            MuscleIntensity::Secondary => 0.5,
            MuscleIntensity::Accessory => 0.25,
        }
    }
}

impl std::fmt::Display for MuscleIntensity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Exercise-to-muscle link with its score weight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseMuscle {
    pub exercise_id: Uuid,
    pub muscle_id: Uuid,
    pub intensity: MuscleIntensity,
    pub weight: f64,
}

impl ExerciseMuscle {
    /// Effective weight for score propagation; falls back to the intensity
    /// default when the link row carries a non-positive weight.
    pub fn effective_weight(&self) -> f64 {
        if self.weight > 0.0 {
            self.weight
        } else {
            self.intensity.default_weight()
        }
    }
}

/// Discrete strength tier. `id` strictly increases with strength.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rank {
    pub id: i64,
    pub name: String,
    pub min_score: f64,
    pub max_score: f64,
}

/// Sub-tier within a rank; bands form a disjoint cover of the rank's score
/// band, ordered by `sort_order` (higher sort_order = stronger band).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterRank {
    pub id: i64,
    pub rank_id: i64,
    pub name: String,
    pub min_score: f64,
    pub max_score: f64,
    pub sort_order: i64,
}

/// One row of a benchmark ladder. For a given (gender, target) the rows form
/// a monotone ladder on `min_threshold`; the highest crossed threshold wins.
/// `target_id` is None for the overall (user-level) ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankBenchmark {
    pub gender: Gender,
    pub target_id: Option<Uuid>,
    pub min_threshold: f64,
    pub rank_id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelDefinition {
    pub level: i64,
    pub min_xp: i64,
    pub title: String,
}
