//! Workout history loading.
//!
//! Recent workouts come from both the live WAL and the CSV archive it is
//! rolled up into. The archive only keeps summaries, so history is
//! expressed as `WorkoutSummary` regardless of source.

use crate::csv_rollup::CsvRow;
use crate::{CompletedWorkout, Error, Result};
use chrono::{DateTime, Duration, Utc};
use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use uuid::Uuid;

/// One line of workout history
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkoutSummary {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub exercise_count: usize,
    pub completed_sets: usize,
    pub total_volume: f64,
    pub template_id: Option<String>,
    pub notes: Option<String>,
}

impl From<&CompletedWorkout> for WorkoutSummary {
    fn from(workout: &CompletedWorkout) -> Self {
        Self {
            id: workout.id,
            session_id: workout.session_id,
            name: workout.name.clone(),
            started_at: workout.started_at,
            completed_at: workout.completed_at,
            duration_seconds: workout.duration_seconds,
            exercise_count: workout.exercises.len(),
            completed_sets: workout.completed_set_count(),
            total_volume: workout.total_volume(),
            template_id: workout.template_id.clone(),
            notes: workout.notes.clone(),
        }
    }
}

impl TryFrom<CsvRow> for WorkoutSummary {
    type Error = Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let uuid = |s: &str| {
            Uuid::parse_str(s).map_err(|e| Error::Other(format!("Invalid UUID: {}", e)))
        };

        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::Other(format!("Invalid date: {}", e)))
        };

        Ok(WorkoutSummary {
            id: uuid(&row.id)?,
            session_id: uuid(&row.session_id)?,
            name: row.name,
            started_at: parse(&row.started_at)?,
            completed_at: parse(&row.completed_at)?,
            duration_seconds: row.duration_seconds,
            exercise_count: row.exercise_count,
            completed_sets: row.completed_sets,
            total_volume: row.total_volume,
            template_id: row.template_id,
            notes: row.notes,
        })
    }
}

/// Load workouts completed in the last N days from both WAL and CSV
///
/// Returns summaries sorted by completion time (newest first), with
/// workouts present in both sources counted once.
pub fn load_recent_workouts(
    wal_path: &Path,
    csv_path: &Path,
    days: i64,
) -> Result<Vec<WorkoutSummary>> {
    let cutoff = Utc::now() - Duration::days(days);
    let mut workouts = Vec::new();
    let mut seen_ids = HashSet::new();

    if wal_path.exists() {
        for workout in crate::wal::read_workouts(wal_path)? {
            if workout.completed_at >= cutoff && seen_ids.insert(workout.id) {
                workouts.push(WorkoutSummary::from(&workout));
            }
        }
        tracing::debug!("Loaded {} workouts from WAL", workouts.len());
    }

    if csv_path.exists() {
        let mut csv_count = 0;
        for summary in load_summaries_from_csv(csv_path)? {
            if summary.completed_at >= cutoff && seen_ids.insert(summary.id) {
                workouts.push(summary);
                csv_count += 1;
            }
        }
        tracing::debug!("Loaded {} workouts from CSV", csv_count);
    }

    workouts.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    tracing::info!(
        "Loaded {} total workouts from last {} days",
        workouts.len(),
        days
    );

    Ok(workouts)
}

fn load_summaries_from_csv(path: &Path) -> Result<Vec<WorkoutSummary>> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut summaries = Vec::new();
    for result in reader.deserialize::<CsvRow>() {
        match result.map_err(Error::from).and_then(WorkoutSummary::try_from) {
            Ok(summary) => summaries.push(summary),
            Err(e) => tracing::warn!("Skipping CSV row: {}", e),
        }
    }

    Ok(summaries)
}
