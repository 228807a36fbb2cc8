//! Core domain types for the setlog system.
//!
//! This module defines the records passed between the session controller,
//! the presentation layer and the performance store:
//! - Exercises and templates (reference data)
//! - Sets and workout exercises (mutated during a live session)
//! - Completed workouts and performance records (persisted)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

// ============================================================================
// Exercise Types
// ============================================================================

/// Broad classification of an exercise, used to decide which set fields apply
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseCategory {
    Strength,
    Bodyweight,
    Timed,
    Distance,
}

/// Muscle groups an exercise works
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MuscleGroup {
    Chest,
    Back,
    Shoulders,
    Biceps,
    Triceps,
    Quads,
    Hamstrings,
    Glutes,
    Calves,
    Core,
    FullBody,
}

/// A movement definition (e.g., "Bench Press")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub category: ExerciseCategory,
    pub muscle_groups: Vec<MuscleGroup>,
    pub equipment: Option<String>,
}

// ============================================================================
// Live Session Types
// ============================================================================

/// One performed unit of an exercise
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseSet {
    pub id: Uuid,
    pub reps: Option<u32>,
    pub weight: Option<f64>,
    pub duration_seconds: Option<u32>,
    pub distance_meters: Option<f64>,
    #[serde(default)]
    pub completed: bool,
}

impl ExerciseSet {
    /// Create an incomplete set with the given reps and weight
    pub fn new(reps: Option<u32>, weight: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            reps,
            weight,
            duration_seconds: None,
            distance_meters: None,
            completed: false,
        }
    }

    /// reps x weight, zero when either is missing
    pub fn volume(&self) -> f64 {
        match (self.reps, self.weight) {
            (Some(reps), Some(weight)) => reps as f64 * weight,
            _ => 0.0,
        }
    }
}

/// An exercise paired with the sets performed for it in one session
///
/// `id` identifies this entry in the session and is distinct from
/// `exercise.id`; the same exercise may appear more than once.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutExercise {
    pub id: Uuid,
    pub exercise: Exercise,
    pub sets: Vec<ExerciseSet>,
    pub notes: Option<String>,
}

impl WorkoutExercise {
    pub fn new(exercise: Exercise, sets: Vec<ExerciseSet>) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise,
            sets,
            notes: None,
        }
    }

    pub fn completed_sets(&self) -> impl Iterator<Item = &ExerciseSet> {
        self.sets.iter().filter(|s| s.completed)
    }

    /// Total volume across completed sets
    pub fn volume(&self) -> f64 {
        self.completed_sets().map(ExerciseSet::volume).sum()
    }
}

/// The live, mutable aggregate owned by the session controller
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub id: Uuid,
    /// Monotonic per controller; the first session is 1
    pub sequence: u64,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub paused: bool,
    pub exercises: Vec<WorkoutExercise>,
    pub template_id: Option<String>,
    pub notes: Option<String>,
}

impl Session {
    pub fn exercise(&self, exercise_ref: Uuid) -> Option<&WorkoutExercise> {
        self.exercises.iter().find(|e| e.id == exercise_ref)
    }

    pub(crate) fn exercise_mut(&mut self, exercise_ref: Uuid) -> Option<&mut WorkoutExercise> {
        self.exercises.iter_mut().find(|e| e.id == exercise_ref)
    }

    pub(crate) fn set_mut(&mut self, exercise_ref: Uuid, index: usize) -> Option<&mut ExerciseSet> {
        self.exercise_mut(exercise_ref)
            .and_then(|e| e.sets.get_mut(index))
    }
}

// ============================================================================
// Template Types
// ============================================================================

/// One exercise in a template, with its targets
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TemplateExercise {
    pub exercise: Exercise,
    pub target_sets: u32,
    pub target_reps: Option<u32>,
    pub target_weight: Option<f64>,
}

/// A reusable plan used to seed a new session
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub exercises: Vec<TemplateExercise>,
}

// ============================================================================
// Persisted Types
// ============================================================================

/// Immutable record produced when a session completes
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CompletedWorkout {
    pub id: Uuid,
    pub session_id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: u64,
    pub exercises: Vec<WorkoutExercise>,
    pub notes: Option<String>,
    pub template_id: Option<String>,
}

impl CompletedWorkout {
    pub fn completed_set_count(&self) -> usize {
        self.exercises
            .iter()
            .map(|e| e.completed_sets().count())
            .sum()
    }

    pub fn total_volume(&self) -> f64 {
        self.exercises.iter().map(WorkoutExercise::volume).sum()
    }
}

/// Per-exercise memory of recent performance, used to pre-fill sessions
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PerformanceRecord {
    pub exercise_id: String,
    pub last_used_reps: Option<u32>,
    pub last_used_weight: Option<f64>,
    pub average_reps: f64,
    pub average_weight: Option<f64>,
    /// Reps per set position; `None` where the set was not completed
    pub set_reps: Vec<Option<u32>>,
    /// Weight per set position; `None` where the set was not completed
    pub set_weights: Vec<Option<f64>>,
    pub last_performed: DateTime<Utc>,
}

impl PerformanceRecord {
    /// Derive a record from the completed sets among `sets`
    ///
    /// Returns `None` when no set is completed. Averages only count sets
    /// that carry the field; `last_used_*` comes from the final completed set.
    /// Per-set values keep their original position so a skipped set does
    /// not shift the ones after it.
    pub fn from_completed_sets(
        exercise_id: &str,
        sets: &[ExerciseSet],
        performed_at: DateTime<Utc>,
    ) -> Option<Self> {
        let completed: Vec<&ExerciseSet> = sets.iter().filter(|s| s.completed).collect();
        let last = completed.last()?;

        let reps: Vec<u32> = completed.iter().filter_map(|s| s.reps).collect();
        let weights: Vec<f64> = completed.iter().filter_map(|s| s.weight).collect();

        let average_reps = if reps.is_empty() {
            0.0
        } else {
            reps.iter().map(|&r| r as f64).sum::<f64>() / reps.len() as f64
        };
        let average_weight = if weights.is_empty() {
            None
        } else {
            Some(weights.iter().sum::<f64>() / weights.len() as f64)
        };

        Some(Self {
            exercise_id: exercise_id.to_string(),
            last_used_reps: last.reps,
            last_used_weight: last.weight,
            average_reps,
            average_weight,
            set_reps: sets
                .iter()
                .map(|s| s.reps.filter(|_| s.completed))
                .collect(),
            set_weights: sets
                .iter()
                .map(|s| s.weight.filter(|_| s.completed))
                .collect(),
            last_performed: performed_at,
        })
    }

    /// Reps to pre-fill for the set at `index`
    pub fn reps_for_set(&self, index: usize) -> Option<u32> {
        self.set_reps
            .get(index)
            .copied()
            .flatten()
            .or(self.last_used_reps)
    }

    /// Weight to pre-fill for the set at `index`
    pub fn weight_for_set(&self, index: usize) -> Option<f64> {
        self.set_weights
            .get(index)
            .copied()
            .flatten()
            .or(self.last_used_weight)
    }
}

/// Every exercise's latest performance record, keyed by exercise id
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct PerformanceBook {
    pub records: HashMap<String, PerformanceRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(reps: u32, weight: f64) -> ExerciseSet {
        ExerciseSet {
            completed: true,
            ..ExerciseSet::new(Some(reps), Some(weight))
        }
    }

    #[test]
    fn test_record_ignores_incomplete_sets() {
        let sets = vec![
            completed(10, 100.0),
            ExerciseSet::new(Some(3), Some(200.0)),
            completed(8, 90.0),
        ];

        let record = PerformanceRecord::from_completed_sets("squat", &sets, Utc::now()).unwrap();
        assert_eq!(record.last_used_reps, Some(8));
        assert_eq!(record.last_used_weight, Some(90.0));
        assert_eq!(record.average_reps, 9.0);
        assert_eq!(record.average_weight, Some(95.0));
        assert_eq!(record.set_weights, vec![Some(100.0), None, Some(90.0)]);
        assert_eq!(record.set_reps, vec![Some(10), None, Some(8)]);
    }

    #[test]
    fn test_skipped_set_keeps_later_positions() {
        let sets = vec![
            ExerciseSet::new(Some(8), Some(80.0)),
            completed(8, 100.0),
            completed(6, 95.0),
        ];
        let record = PerformanceRecord::from_completed_sets("bench", &sets, Utc::now()).unwrap();

        assert_eq!(record.weight_for_set(1), Some(100.0));
        assert_eq!(record.weight_for_set(2), Some(95.0));
        // The skipped first set falls back to the last set actually done
        assert_eq!(record.weight_for_set(0), Some(95.0));
        assert_eq!(record.reps_for_set(0), Some(6));
    }

    #[test]
    fn test_record_requires_a_completed_set() {
        let sets = vec![ExerciseSet::new(Some(10), None)];
        assert!(PerformanceRecord::from_completed_sets("squat", &sets, Utc::now()).is_none());
    }

    #[test]
    fn test_per_set_lookup_falls_back_to_last_used() {
        let sets = vec![completed(10, 100.0), completed(6, 110.0)];
        let record = PerformanceRecord::from_completed_sets("bench", &sets, Utc::now()).unwrap();

        assert_eq!(record.weight_for_set(0), Some(100.0));
        assert_eq!(record.weight_for_set(1), Some(110.0));
        // Beyond recorded sets, reuse the final set
        assert_eq!(record.weight_for_set(4), Some(110.0));
        assert_eq!(record.reps_for_set(4), Some(6));
    }

    #[test]
    fn test_completed_workout_volume() {
        let bench = Exercise {
            id: "bench".into(),
            name: "Bench Press".into(),
            category: ExerciseCategory::Strength,
            muscle_groups: vec![MuscleGroup::Chest],
            equipment: Some("barbell".into()),
        };
        let workout = CompletedWorkout {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            name: "Push".into(),
            started_at: Utc::now(),
            completed_at: Utc::now(),
            duration_seconds: 60,
            exercises: vec![WorkoutExercise::new(
                bench,
                vec![completed(5, 100.0), ExerciseSet::new(Some(5), Some(100.0))],
            )],
            notes: None,
            template_id: None,
        };

        assert_eq!(workout.completed_set_count(), 1);
        assert_eq!(workout.total_volume(), 500.0);
    }
}
