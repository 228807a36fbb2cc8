//! CSV rollup for archiving the workout WAL.
//!
//! Completed workouts are flattened into one summary row each; the
//! per-set detail stays in the archived WAL.

use crate::{CompletedWorkout, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub(crate) struct CsvRow {
    pub(crate) id: String,
    pub(crate) session_id: String,
    pub(crate) name: String,
    pub(crate) started_at: String,
    pub(crate) completed_at: String,
    pub(crate) duration_seconds: u64,
    pub(crate) exercise_count: usize,
    pub(crate) completed_sets: usize,
    pub(crate) total_volume: f64,
    pub(crate) template_id: Option<String>,
    pub(crate) notes: Option<String>,
}

impl From<&CompletedWorkout> for CsvRow {
    fn from(workout: &CompletedWorkout) -> Self {
        CsvRow {
            id: workout.id.to_string(),
            session_id: workout.session_id.to_string(),
            name: workout.name.clone(),
            started_at: workout.started_at.to_rfc3339(),
            completed_at: workout.completed_at.to_rfc3339(),
            duration_seconds: workout.duration_seconds,
            exercise_count: workout.exercises.len(),
            completed_sets: workout.completed_set_count(),
            total_volume: workout.total_volume(),
            template_id: workout.template_id.clone(),
            notes: workout.notes.clone(),
        }
    }
}

/// Roll up WAL workouts into CSV and archive the WAL
///
/// The CSV is fsynced before the WAL is renamed to `.wal.processed`, so a
/// crash in between leaves the workouts in both places rather than neither.
/// Returns the number of workouts processed.
pub fn wal_to_csv_and_archive(wal_path: &Path, csv_path: &Path) -> Result<usize> {
    let workouts = crate::wal::read_workouts(wal_path)?;

    if workouts.is_empty() {
        tracing::info!("No workouts in WAL to roll up");
        return Ok(0);
    }

    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(csv_path)?;

    // Only a fresh file gets a header row
    let needs_headers = file.metadata()?.len() == 0;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(needs_headers)
        .from_writer(file);

    for workout in &workouts {
        writer.serialize(CsvRow::from(workout))?;
    }

    writer.flush()?;
    let file = writer
        .into_inner()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    file.sync_all()?;

    tracing::info!("Wrote {} workouts to CSV", workouts.len());

    let processed_path = wal_path.with_extension("wal.processed");
    std::fs::rename(wal_path, &processed_path)?;

    tracing::info!("Archived WAL to {:?}", processed_path);

    Ok(workouts.len())
}

/// Remove all `.processed` files in the given directory
pub fn cleanup_processed_wals(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }

    let mut count = 0;
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();

        if path.extension().is_some_and(|ext| ext == "processed") {
            std::fs::remove_file(&path)?;
            tracing::debug!("Removed processed WAL: {:?}", path);
            count += 1;
        }
    }

    if count > 0 {
        tracing::info!("Cleaned up {} processed WAL files", count);
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wal::tests::create_test_workout;
    use crate::wal::WorkoutJournal;
    use std::fs::File;

    #[test]
    fn test_wal_to_csv_creates_file_and_archives() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        let sink = WorkoutJournal::new(&wal_path);
        for i in 0..3 {
            sink.append(&create_test_workout(&format!("Day {}", i), 0))
                .unwrap();
        }

        let count = wal_to_csv_and_archive(&wal_path, &csv_path).unwrap();
        assert_eq!(count, 3);

        assert!(csv_path.exists());
        assert!(!wal_path.exists());
        assert!(wal_path.with_extension("wal.processed").exists());

        let header = std::fs::read_to_string(&csv_path).unwrap();
        assert!(header.starts_with("id,session_id,name,"));
    }

    #[test]
    fn test_wal_to_csv_appends_without_second_header() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("workouts.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        let sink = WorkoutJournal::new(&wal_path);
        sink.append(&create_test_workout("Push", 1)).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        let sink = WorkoutJournal::new(&wal_path);
        sink.append(&create_test_workout("Pull", 0)).unwrap();
        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 1);

        let reader = csv::Reader::from_path(&csv_path).unwrap();
        assert_eq!(reader.into_records().count(), 2);
    }

    #[test]
    fn test_empty_wal() {
        let temp_dir = tempfile::tempdir().unwrap();
        let wal_path = temp_dir.path().join("empty.wal");
        let csv_path = temp_dir.path().join("workouts.csv");

        File::create(&wal_path).unwrap();

        assert_eq!(wal_to_csv_and_archive(&wal_path, &csv_path).unwrap(), 0);
        assert!(!csv_path.exists());
    }

    #[test]
    fn test_cleanup_processed_wals() {
        let temp_dir = tempfile::tempdir().unwrap();

        File::create(temp_dir.path().join("w1.wal.processed")).unwrap();
        File::create(temp_dir.path().join("w2.wal.processed")).unwrap();
        File::create(temp_dir.path().join("keep.wal")).unwrap();

        assert_eq!(cleanup_processed_wals(temp_dir.path()).unwrap(), 2);
        assert!(temp_dir.path().join("keep.wal").exists());
    }
}
