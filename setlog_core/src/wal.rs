//! Journal of completed workouts.
//!
//! One JSON object per line. An append holds an exclusive lock for a single
//! write of the whole line; a scan holds a shared lock, so another `setlog`
//! process never observes half a workout.

use crate::{CompletedWorkout, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Advisory lock on an open file, released on drop (early returns included)
pub(crate) struct FileLock<'a> {
    file: &'a File,
}

impl<'a> FileLock<'a> {
    pub(crate) fn shared(file: &'a File) -> std::io::Result<Self> {
        FileExt::lock_shared(file)?;
        Ok(Self { file })
    }

    pub(crate) fn exclusive(file: &'a File) -> std::io::Result<Self> {
        FileExt::lock_exclusive(file)?;
        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(self.file) {
            tracing::warn!("Failed to release file lock: {}", e);
        }
    }
}

/// Append-only JSONL file of `CompletedWorkout`s
#[derive(Clone, Debug)]
pub struct WorkoutJournal {
    path: PathBuf,
}

impl WorkoutJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, workout: &CompletedWorkout) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut line = serde_json::to_vec(workout)?;
        line.push(b'\n');

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        {
            let _lock = FileLock::exclusive(&file)?;
            (&file).write_all(&line)?;
            (&file).flush()?;
        }

        tracing::debug!("Journaled workout {} ({} bytes)", workout.id, line.len());
        Ok(())
    }

    /// Every readable workout in file order
    ///
    /// A missing journal reads as empty. Lines that don't parse are logged
    /// and skipped.
    pub fn read_all(&self) -> Result<Vec<CompletedWorkout>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let _lock = FileLock::shared(&file)?;

        let mut workouts = Vec::new();
        let mut skipped = 0;
        for (index, line) in BufReader::new(&file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<CompletedWorkout>(&line) {
                Ok(workout) => workouts.push(workout),
                Err(e) => {
                    skipped += 1;
                    tracing::warn!("{:?} line {}: {}", self.path, index + 1, e);
                }
            }
        }

        tracing::debug!(
            "Read {} workouts from {:?} ({} skipped)",
            workouts.len(),
            self.path,
            skipped
        );
        Ok(workouts)
    }
}

/// Shorthand for reading a journal at `path`
pub fn read_workouts(path: &Path) -> Result<Vec<CompletedWorkout>> {
    WorkoutJournal::new(path).read_all()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    pub(crate) fn create_test_workout(name: &str, days_ago: i64) -> CompletedWorkout {
        let completed_at = Utc::now() - Duration::days(days_ago);
        CompletedWorkout {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            name: name.into(),
            started_at: completed_at - Duration::minutes(45),
            completed_at,
            duration_seconds: 45 * 60,
            exercises: vec![],
            notes: None,
            template_id: None,
        }
    }

    #[test]
    fn test_appends_keep_file_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = WorkoutJournal::new(temp_dir.path().join("nested/workouts.wal"));

        journal.append(&create_test_workout("Push", 2)).unwrap();
        journal.append(&create_test_workout("Pull", 1)).unwrap();

        let names: Vec<_> = journal
            .read_all()
            .unwrap()
            .into_iter()
            .map(|w| w.name)
            .collect();
        assert_eq!(names, vec!["Push", "Pull"]);
    }

    #[test]
    fn test_torn_line_is_skipped() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("workouts.wal");
        let journal = WorkoutJournal::new(&path);

        journal.append(&create_test_workout("Pull", 0)).unwrap();
        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            writeln!(file, "{{\"id\": \"half").unwrap();
        }
        journal.append(&create_test_workout("Legs", 0)).unwrap();

        let workouts = read_workouts(&path).unwrap();
        assert_eq!(workouts.len(), 2);
        assert_eq!(workouts[1].name, "Legs");
    }

    #[test]
    fn test_missing_journal_reads_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let journal = WorkoutJournal::new(temp_dir.path().join("nonexistent.wal"));

        assert!(journal.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_lock_released_after_append() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("workouts.wal");
        WorkoutJournal::new(&path)
            .append(&create_test_workout("Push", 0))
            .unwrap();

        let file = File::open(&path).unwrap();
        assert!(FileExt::try_lock_exclusive(&file).is_ok());
    }
}
