//! Performance store: where finished sessions and per-exercise history live.
//!
//! The controller reads history when seeding a session from a template and
//! hands completed workouts and derived records over at completion. What
//! happens to them afterwards is the store's business.

use crate::wal::WorkoutJournal;
use crate::{CompletedWorkout, PerformanceBook, PerformanceRecord, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Storage collaborator consumed by the session controller
pub trait PerformanceStore {
    /// Most recent record for an exercise, if any
    fn last_performance(&self, exercise_id: &str) -> Option<PerformanceRecord>;

    /// Persist a finished session
    fn save_workout(&mut self, workout: &CompletedWorkout) -> Result<()>;

    /// Persist or replace the record for `record.exercise_id`
    fn save_performance(&mut self, record: &PerformanceRecord) -> Result<()>;
}

/// In-process store with no persistence
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    pub workouts: Vec<CompletedWorkout>,
    pub records: HashMap<String, PerformanceRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(mut self, record: PerformanceRecord) -> Self {
        self.records.insert(record.exercise_id.clone(), record);
        self
    }
}

impl PerformanceStore for MemoryStore {
    fn last_performance(&self, exercise_id: &str) -> Option<PerformanceRecord> {
        self.records.get(exercise_id).cloned()
    }

    fn save_workout(&mut self, workout: &CompletedWorkout) -> Result<()> {
        self.workouts.push(workout.clone());
        Ok(())
    }

    fn save_performance(&mut self, record: &PerformanceRecord) -> Result<()> {
        self.records
            .insert(record.exercise_id.clone(), record.clone());
        Ok(())
    }
}

/// File-backed store under a data directory
///
/// Layout:
/// - `wal/workouts.wal`: one completed workout per line
/// - `wal/performance.json`: the performance book
#[derive(Debug)]
pub struct FileStore {
    journal: WorkoutJournal,
    performance_path: PathBuf,
    book: PerformanceBook,
}

impl FileStore {
    pub fn open(data_dir: &Path) -> Result<Self> {
        let wal_dir = data_dir.join("wal");
        std::fs::create_dir_all(&wal_dir)?;

        let performance_path = wal_dir.join("performance.json");
        let book = PerformanceBook::load(&performance_path);

        Ok(Self {
            journal: WorkoutJournal::new(Self::wal_path(data_dir)),
            performance_path,
            book,
        })
    }

    pub fn wal_path(data_dir: &Path) -> PathBuf {
        data_dir.join("wal").join("workouts.wal")
    }

    pub fn csv_path(data_dir: &Path) -> PathBuf {
        data_dir.join("workouts.csv")
    }

    pub fn records(&self) -> impl Iterator<Item = &PerformanceRecord> {
        self.book.records.values()
    }
}

impl PerformanceStore for FileStore {
    fn last_performance(&self, exercise_id: &str) -> Option<PerformanceRecord> {
        self.book.records.get(exercise_id).cloned()
    }

    fn save_workout(&mut self, workout: &CompletedWorkout) -> Result<()> {
        self.journal.append(workout)
    }

    fn save_performance(&mut self, record: &PerformanceRecord) -> Result<()> {
        // Re-read so records written by another process survive
        let book = PerformanceBook::update(&self.performance_path, |book| {
            book.records
                .insert(record.exercise_id.clone(), record.clone());
            Ok(())
        })?;
        self.book = book;
        Ok(())
    }
}
