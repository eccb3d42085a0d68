use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::OnceCell;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{
    Exercise, ExerciseMuscle, Gender, InterRank, LevelDefinition, Muscle, MuscleGroup, Rank,
    RankBenchmark,
};
use crate::ports::ReferenceRepository;

/// Default time-to-live for a cached reference table.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Cache key for one reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CatalogKey {
    Exercises,
    ExerciseMuscles,
    Muscles,
    MuscleGroups,
    Ranks,
    InterRanks,
    LevelDefinitions,
    ExerciseBenchmarks(Gender),
    MuscleBenchmarks(Gender),
    MuscleGroupBenchmarks(Gender),
    OverallBenchmarks(Gender),
}

impl CatalogKey {
    /// Every recognized key, used by prewarm.
    pub fn all() -> Vec<CatalogKey> {
        let mut keys = vec![
            CatalogKey::Exercises,
            CatalogKey::ExerciseMuscles,
            CatalogKey::Muscles,
            CatalogKey::MuscleGroups,
            CatalogKey::Ranks,
            CatalogKey::InterRanks,
            CatalogKey::LevelDefinitions,
        ];
        for gender in [Gender::Male, Gender::Female] {
            keys.push(CatalogKey::ExerciseBenchmarks(gender));
            keys.push(CatalogKey::MuscleBenchmarks(gender));
            keys.push(CatalogKey::MuscleGroupBenchmarks(gender));
            keys.push(CatalogKey::OverallBenchmarks(gender));
        }
        keys
    }
}

/// One loaded reference table, shared between callers.
#[derive(Clone)]
pub enum CatalogTable {
    Exercises(Arc<Vec<Exercise>>),
    ExerciseMuscles(Arc<Vec<ExerciseMuscle>>),
    Muscles(Arc<Vec<Muscle>>),
    MuscleGroups(Arc<Vec<MuscleGroup>>),
    Ranks(Arc<Vec<Rank>>),
    InterRanks(Arc<Vec<InterRank>>),
    LevelDefinitions(Arc<Vec<LevelDefinition>>),
    Benchmarks(Arc<Vec<RankBenchmark>>),
}

struct CatalogEntry {
    created_at: Instant,
    cell: Arc<OnceCell<CatalogTable>>,
}

/// Process-wide cache over the reference repository.
///
/// Entries are loaded on first access and served from memory until the TTL
/// elapses or the entry is refreshed. Concurrent misses for the same key
/// coalesce onto a single loader run; loader errors propagate to every
/// waiter and are not cached.
pub struct ReferenceCatalog {
    repo: Arc<dyn ReferenceRepository>,
    ttl: Duration,
    entries: Mutex<HashMap<CatalogKey, CatalogEntry>>,
}

impl ReferenceCatalog {
    pub fn new(repo: Arc<dyn ReferenceRepository>) -> Self {
        Self::with_ttl(repo, DEFAULT_TTL)
    }

    pub fn with_ttl(repo: Arc<dyn ReferenceRepository>, ttl: Duration) -> Self {
        Self {
            repo,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch one table, loading it if absent or expired.
    pub async fn get(&self, key: CatalogKey) -> anyhow::Result<CatalogTable> {
        let cell = self.entry_cell(key);
        let table = cell.get_or_try_init(|| self.load_table(key)).await?;
        Ok(table.clone())
    }

    /// Drop one entry so the next access reloads it.
    pub fn refresh(&self, key: CatalogKey) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(&key);
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
    }

    /// Load every recognized key in parallel. Individual failures are logged
    /// and do not abort startup.
    pub async fn prewarm(self: Arc<Self>) {
        let mut tasks = JoinSet::new();
        for key in CatalogKey::all() {
            let catalog = Arc::clone(&self);
            tasks.spawn(async move { (key, catalog.get(key).await.map(|_| ())) });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((key, Ok(()))) => debug!(?key, "reference table prewarmed"),
                Ok((key, Err(err))) => {
                    warn!(?key, error = %format!("{err:#}"), "reference table prewarm failed")
                }
                Err(err) => warn!(error = %err, "prewarm task panicked"),
            }
        }
    }

    fn entry_cell(&self, key: CatalogKey) -> Arc<OnceCell<CatalogTable>> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let expired = entries
            .get(&key)
            .map(|entry| entry.created_at.elapsed() >= self.ttl)
            .unwrap_or(true);

        if expired {
            entries.insert(
                key,
                CatalogEntry {
                    created_at: Instant::now(),
                    cell: Arc::new(OnceCell::new()),
                },
            );
        }

        entries
            .get(&key)
            .map(|entry| entry.cell.clone())
            .unwrap_or_else(|| Arc::new(OnceCell::new()))
    }

    async fn load_table(&self, key: CatalogKey) -> anyhow::Result<CatalogTable> {
        let table = match key {
            CatalogKey::Exercises => {
                CatalogTable::Exercises(Arc::new(self.repo.load_exercises().await?))
            }
            CatalogKey::ExerciseMuscles => {
                CatalogTable::ExerciseMuscles(Arc::new(self.repo.load_exercise_muscles().await?))
            }
            CatalogKey::Muscles => CatalogTable::Muscles(Arc::new(self.repo.load_muscles().await?)),
            CatalogKey::MuscleGroups => {
                CatalogTable::MuscleGroups(Arc::new(self.repo.load_muscle_groups().await?))
            }
            CatalogKey::Ranks => CatalogTable::Ranks(Arc::new(self.repo.load_ranks().await?)),
            CatalogKey::InterRanks => {
                CatalogTable::InterRanks(Arc::new(self.repo.load_inter_ranks().await?))
            }
            CatalogKey::LevelDefinitions => {
                CatalogTable::LevelDefinitions(Arc::new(self.repo.load_level_definitions().await?))
            }
            CatalogKey::ExerciseBenchmarks(gender) => CatalogTable::Benchmarks(Arc::new(
                self.repo.load_exercise_benchmarks(gender).await?,
            )),
            CatalogKey::MuscleBenchmarks(gender) => {
                CatalogTable::Benchmarks(Arc::new(self.repo.load_muscle_benchmarks(gender).await?))
            }
            CatalogKey::MuscleGroupBenchmarks(gender) => CatalogTable::Benchmarks(Arc::new(
                self.repo.load_muscle_group_benchmarks(gender).await?,
            )),
            CatalogKey::OverallBenchmarks(gender) => {
                CatalogTable::Benchmarks(Arc::new(self.repo.load_overall_benchmarks(gender).await?))
            }
        };

        debug!(?key, "reference table loaded");
        Ok(table)
    }

    pub async fn exercises(&self) -> anyhow::Result<Arc<Vec<Exercise>>> {
        match self.get(CatalogKey::Exercises).await? {
            CatalogTable::Exercises(table) => Ok(table),
            _ => Err(anyhow::anyhow!("catalog returned wrong table for exercises")),
        }
    }

    pub async fn exercise_muscles(&self) -> anyhow::Result<Arc<Vec<ExerciseMuscle>>> {
        match self.get(CatalogKey::ExerciseMuscles).await? {
            CatalogTable::ExerciseMuscles(table) => Ok(table),
            _ => Err(anyhow::anyhow!(
                "catalog returned wrong table for exercise muscles"
            )),
        }
    }

    pub async fn muscles(&self) -> anyhow::Result<Arc<Vec<Muscle>>> {
        match self.get(CatalogKey::Muscles).await? {
            CatalogTable::Muscles(table) => Ok(table),
            _ => Err(anyhow::anyhow!("catalog returned wrong table for muscles")),
        }
    }

    pub async fn muscle_groups(&self) -> anyhow::Result<Arc<Vec<MuscleGroup>>> {
        match self.get(CatalogKey::MuscleGroups).await? {
            CatalogTable::MuscleGroups(table) => Ok(table),
            _ => Err(anyhow::anyhow!(
                "catalog returned wrong table for muscle groups"
            )),
        }
    }

    pub async fn ranks(&self) -> anyhow::Result<Arc<Vec<Rank>>> {
        match self.get(CatalogKey::Ranks).await? {
            CatalogTable::Ranks(table) => Ok(table),
            _ => Err(anyhow::anyhow!("catalog returned wrong table for ranks")),
        }
    }

    pub async fn inter_ranks(&self) -> anyhow::Result<Arc<Vec<InterRank>>> {
        match self.get(CatalogKey::InterRanks).await? {
            CatalogTable::InterRanks(table) => Ok(table),
            _ => Err(anyhow::anyhow!(
                "catalog returned wrong table for inter ranks"
            )),
        }
    }

    pub async fn level_definitions(&self) -> anyhow::Result<Arc<Vec<LevelDefinition>>> {
        match self.get(CatalogKey::LevelDefinitions).await? {
            CatalogTable::LevelDefinitions(table) => Ok(table),
            _ => Err(anyhow::anyhow!(
                "catalog returned wrong table for level definitions"
            )),
        }
    }

    pub async fn exercise_benchmarks(
        &self,
        gender: Gender,
    ) -> anyhow::Result<Arc<Vec<RankBenchmark>>> {
        self.benchmarks(CatalogKey::ExerciseBenchmarks(gender)).await
    }

    pub async fn muscle_benchmarks(
        &self,
        gender: Gender,
    ) -> anyhow::Result<Arc<Vec<RankBenchmark>>> {
        self.benchmarks(CatalogKey::MuscleBenchmarks(gender)).await
    }

    pub async fn muscle_group_benchmarks(
        &self,
        gender: Gender,
    ) -> anyhow::Result<Arc<Vec<RankBenchmark>>> {
        self.benchmarks(CatalogKey::MuscleGroupBenchmarks(gender))
            .await
    }

    pub async fn overall_benchmarks(
        &self,
        gender: Gender,
    ) -> anyhow::Result<Arc<Vec<RankBenchmark>>> {
        self.benchmarks(CatalogKey::OverallBenchmarks(gender)).await
    }

    async fn benchmarks(&self, key: CatalogKey) -> anyhow::Result<Arc<Vec<RankBenchmark>>> {
        match self.get(key).await? {
            CatalogTable::Benchmarks(table) => Ok(table),
            _ => Err(anyhow::anyhow!(
                "catalog returned wrong table for benchmarks"
            )),
        }
    }
}
