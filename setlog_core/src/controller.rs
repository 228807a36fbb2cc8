//! The active workout session controller.
//!
//! Owns at most one live `Session` and is the only thing allowed to mutate
//! it. Phases move `Idle -> Running <-> Paused -> Terminating -> Idle`.
//!
//! Elapsed time is accumulated from wall-clock deltas between samples
//! (ticks, pauses, lifecycle signals) rather than by counting ticks, so a
//! late or missing tick never loses time.
//!
//! Requests that make no sense in the current state (pausing an idle
//! controller, editing a set that was just deleted) are ignored rather than
//! reported: they come from UI races and the caller can't act on them.

use crate::clock::{delta_between, Clock, SystemClock};
use crate::config::{Config, SessionConfig};
use crate::events::{EventBus, SessionEvent, SessionOutcome};
use crate::heart_rate::HeartRateSimulator;
use crate::store::PerformanceStore;
use crate::{
    CompletedWorkout, Exercise, ExerciseSet, PerformanceRecord, Session, Template,
    TemplateExercise, WorkoutExercise,
};
use chrono::{DateTime, Utc};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Name given to sessions not started from a template
pub const DEFAULT_SESSION_NAME: &str = "Workout";

/// A controller shared between the front end, the ticker and the lifecycle
/// adapter. The mutex is the single serialization point for every mutation.
pub type SharedController = Arc<Mutex<SessionController>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
    Paused,
    /// Completion or cancellation in progress; never observable between calls
    Terminating,
}

pub struct SessionController {
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    resting_bpm: u32,
    phase: SessionPhase,
    session: Option<Session>,
    /// Wall-clock time up to which `session.elapsed` is accounted for.
    /// Only set while running.
    last_sample: Option<DateTime<Utc>>,
    sequence: u64,
    heart_rate: HeartRateSimulator,
    events: EventBus,
}

impl SessionController {
    /// Controller driven by the system clock
    pub fn new(config: &Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(config, clock, HeartRateSimulator::new(&config.heart_rate))
    }

    pub fn with_parts(
        config: &Config,
        clock: Arc<dyn Clock>,
        heart_rate: HeartRateSimulator,
    ) -> Self {
        Self {
            clock,
            config: config.session.clone(),
            resting_bpm: config.heart_rate.resting_bpm,
            phase: SessionPhase::Idle,
            session: None,
            last_sample: None,
            sequence: 0,
            heart_rate,
            events: EventBus::new(),
        }
    }

    pub fn into_shared(self) -> SharedController {
        Arc::new(Mutex::new(self))
    }

    /// Receive `Changed` after every successful mutation and `Terminated`
    /// once per finished session
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, SessionPhase::Running | SessionPhase::Paused)
    }

    pub fn is_paused(&self) -> bool {
        self.phase == SessionPhase::Paused
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Accounted elapsed time; zero when idle
    pub fn elapsed(&self) -> Duration {
        self.session
            .as_ref()
            .map(|s| s.elapsed)
            .unwrap_or(Duration::ZERO)
    }

    /// Simulated heart rate while a session is active
    pub fn heart_rate(&self) -> Option<u32> {
        self.is_active().then(|| self.heart_rate.bpm())
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // ------------------------------------------------------------------------
    // Lifecycle of a session
    // ------------------------------------------------------------------------

    /// Begin a new session, optionally seeded from a template
    ///
    /// Ignored (returns `None`) while a session is already active. Template
    /// sets are pre-filled from `store` history per set index, then from the
    /// template targets, then from the configured defaults.
    pub fn start(
        &mut self,
        template: Option<&Template>,
        store: &dyn PerformanceStore,
    ) -> Option<Uuid> {
        if self.is_active() {
            tracing::debug!("Ignoring start: session already active");
            return None;
        }

        let now = self.clock.now();
        self.sequence += 1;

        let exercises = template
            .map(|t| {
                t.exercises
                    .iter()
                    .map(|te| seed_from_template(te, store, &self.config))
                    .collect()
            })
            .unwrap_or_default();

        let session = Session {
            id: Uuid::new_v4(),
            sequence: self.sequence,
            name: template
                .map(|t| t.name.clone())
                .unwrap_or_else(|| DEFAULT_SESSION_NAME.to_string()),
            started_at: now,
            elapsed: Duration::ZERO,
            paused: false,
            exercises,
            template_id: template.map(|t| t.id.clone()),
            notes: None,
        };
        let id = session.id;

        tracing::info!(
            "Started session {} (#{}) with {} exercises",
            id,
            session.sequence,
            session.exercises.len()
        );

        self.session = Some(session);
        self.phase = SessionPhase::Running;
        self.last_sample = Some(now);
        self.heart_rate.reset(self.resting_bpm);
        self.events.emit(SessionEvent::Changed);
        Some(id)
    }

    /// Finish the session and hand it to `store`
    ///
    /// The snapshot includes incomplete sets. A performance record is
    /// derived for every exercise with at least one completed set. Store
    /// failures are logged; the controller is idle afterwards either way.
    pub fn complete(&mut self, store: &mut dyn PerformanceStore) -> Option<CompletedWorkout> {
        let session = self.begin_termination()?;
        let completed_at = self.clock.now();

        let workout = CompletedWorkout {
            id: Uuid::new_v4(),
            session_id: session.id,
            name: session.name,
            started_at: session.started_at,
            completed_at,
            duration_seconds: session.elapsed.as_secs(),
            exercises: session.exercises,
            notes: session.notes,
            template_id: session.template_id,
        };

        if let Err(e) = store.save_workout(&workout) {
            tracing::warn!("Failed to save workout {}: {}", workout.id, e);
        }

        for exercise in &workout.exercises {
            let Some(record) = PerformanceRecord::from_completed_sets(
                &exercise.exercise.id,
                &exercise.sets,
                completed_at,
            ) else {
                continue;
            };
            if let Err(e) = store.save_performance(&record) {
                tracing::warn!(
                    "Failed to save performance for {}: {}",
                    record.exercise_id,
                    e
                );
            }
        }

        tracing::info!(
            "Completed session {} after {}s ({} sets done)",
            workout.session_id,
            workout.duration_seconds,
            workout.completed_set_count()
        );

        self.finish_termination(workout.session_id, SessionOutcome::Completed);
        Some(workout)
    }

    /// Discard the session without persisting anything
    pub fn cancel(&mut self) -> bool {
        let Some(session) = self.begin_termination() else {
            return false;
        };

        tracing::info!(
            "Cancelled session {} after {}s",
            session.id,
            session.elapsed.as_secs()
        );

        self.finish_termination(session.id, SessionOutcome::Cancelled);
        true
    }

    /// Freeze the clock and take the session out, or `None` when idle
    fn begin_termination(&mut self) -> Option<Session> {
        if !self.is_active() {
            tracing::debug!("Ignoring termination: no active session");
            return None;
        }
        self.accumulate();
        self.phase = SessionPhase::Terminating;
        self.last_sample = None;
        self.session.take()
    }

    fn finish_termination(&mut self, session_id: Uuid, outcome: SessionOutcome) {
        self.phase = SessionPhase::Idle;
        self.heart_rate.reset(self.resting_bpm);
        self.events
            .emit(SessionEvent::Terminated { session_id, outcome });
    }

    // ------------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------------

    pub fn pause(&mut self) -> bool {
        if self.phase != SessionPhase::Running {
            tracing::debug!("Ignoring pause in phase {:?}", self.phase);
            return false;
        }
        self.accumulate();
        self.phase = SessionPhase::Paused;
        self.last_sample = None;
        if let Some(session) = self.session.as_mut() {
            session.paused = true;
        }
        self.events.emit(SessionEvent::Changed);
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.phase != SessionPhase::Paused {
            tracing::debug!("Ignoring resume in phase {:?}", self.phase);
            return false;
        }
        self.phase = SessionPhase::Running;
        self.last_sample = Some(self.clock.now());
        if let Some(session) = self.session.as_mut() {
            session.paused = false;
        }
        self.events.emit(SessionEvent::Changed);
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        match self.phase {
            SessionPhase::Running => self.pause(),
            SessionPhase::Paused => self.resume(),
            _ => false,
        }
    }

    /// Periodic clock sample
    pub fn tick(&mut self) -> bool {
        if self.phase != SessionPhase::Running {
            return false;
        }
        self.accumulate();
        self.events.emit(SessionEvent::Changed);
        true
    }

    /// Host is about to stop running us: account for time up to now
    pub fn mark_suspended(&mut self) -> bool {
        if !self.is_active() {
            return false;
        }
        if self.phase == SessionPhase::Running {
            self.accumulate();
            self.events.emit(SessionEvent::Changed);
        }
        true
    }

    /// Host is running us again: credit the time spent suspended
    ///
    /// Only depends on the last sample taken, so it is correct even if the
    /// suspend-time accounting never happened. A paused session gains nothing.
    pub fn mark_resumed(&mut self) -> bool {
        if self.phase != SessionPhase::Running {
            return false;
        }
        if let Some(last) = self.last_sample {
            tracing::debug!(
                "Resumed {}s after the last clock sample",
                delta_between(last, self.clock.now()).as_secs()
            );
        }
        self.accumulate();
        self.events.emit(SessionEvent::Changed);
        true
    }

    /// Advance the cosmetic heart-rate walk
    pub fn sample_heart_rate(&mut self) -> Option<u32> {
        if !self.is_active() {
            return None;
        }
        Some(self.heart_rate.sample())
    }

    fn accumulate(&mut self) {
        if self.phase != SessionPhase::Running {
            return;
        }
        let now = self.clock.now();
        if let (Some(session), Some(last)) = (self.session.as_mut(), self.last_sample) {
            session.elapsed += delta_between(last, now);
        }
        self.last_sample = Some(now);
    }

    // ------------------------------------------------------------------------
    // Exercise and set mutations
    // ------------------------------------------------------------------------

    /// Append an exercise with the default sets; duplicates are allowed
    pub fn add_exercise(&mut self, exercise: Exercise) -> Option<Uuid> {
        let mut added = None;
        self.mutate("add_exercise", |session, config| {
            let sets = (0..config.default_set_count)
                .map(|_| ExerciseSet::new(Some(config.default_reps), None))
                .collect();
            let entry = WorkoutExercise::new(exercise, sets);
            added = Some(entry.id);
            session.exercises.push(entry);
            true
        });
        added
    }

    pub fn remove_exercise(&mut self, exercise_ref: Uuid) -> bool {
        self.mutate("remove_exercise", |session, _| {
            let before = session.exercises.len();
            session.exercises.retain(|e| e.id != exercise_ref);
            session.exercises.len() != before
        })
    }

    /// Append a set pre-filled from the exercise's current last set
    pub fn add_set(&mut self, exercise_ref: Uuid) -> bool {
        self.mutate("add_set", |session, config| {
            let Some(exercise) = session.exercise_mut(exercise_ref) else {
                return false;
            };
            let set = match exercise.sets.last() {
                Some(last) => ExerciseSet {
                    duration_seconds: last.duration_seconds,
                    distance_meters: last.distance_meters,
                    ..ExerciseSet::new(last.reps, last.weight)
                },
                None => ExerciseSet::new(Some(config.default_reps), None),
            };
            exercise.sets.push(set);
            true
        })
    }

    pub fn delete_set(&mut self, exercise_ref: Uuid, index: usize) -> bool {
        self.mutate("delete_set", |session, _| {
            match session.exercise_mut(exercise_ref) {
                Some(exercise) if index < exercise.sets.len() => {
                    exercise.sets.remove(index);
                    true
                }
                _ => false,
            }
        })
    }

    pub fn toggle_set_completion(
        &mut self,
        exercise_ref: Uuid,
        index: usize,
        completed: bool,
    ) -> bool {
        self.mutate("toggle_set_completion", |session, _| {
            session
                .set_mut(exercise_ref, index)
                .map(|set| set.completed = completed)
                .is_some()
        })
    }

    /// Set or clear the weight; negative or non-finite weights are ignored
    pub fn update_weight(
        &mut self,
        exercise_ref: Uuid,
        index: usize,
        weight: Option<f64>,
    ) -> bool {
        if weight.is_some_and(|w| !w.is_finite() || w < 0.0) {
            tracing::debug!("Ignoring invalid weight {:?}", weight);
            return false;
        }
        self.mutate("update_weight", |session, _| {
            session
                .set_mut(exercise_ref, index)
                .map(|set| set.weight = weight)
                .is_some()
        })
    }

    pub fn update_reps(&mut self, exercise_ref: Uuid, index: usize, reps: Option<u32>) -> bool {
        self.mutate("update_reps", |session, _| {
            session
                .set_mut(exercise_ref, index)
                .map(|set| set.reps = reps)
                .is_some()
        })
    }

    /// Set or clear the duration of a timed set
    pub fn update_duration(
        &mut self,
        exercise_ref: Uuid,
        index: usize,
        seconds: Option<u32>,
    ) -> bool {
        self.mutate("update_duration", |session, _| {
            session
                .set_mut(exercise_ref, index)
                .map(|set| set.duration_seconds = seconds)
                .is_some()
        })
    }

    /// Set or clear the distance; negative or non-finite distances are ignored
    pub fn update_distance(
        &mut self,
        exercise_ref: Uuid,
        index: usize,
        meters: Option<f64>,
    ) -> bool {
        if meters.is_some_and(|m| !m.is_finite() || m < 0.0) {
            tracing::debug!("Ignoring invalid distance {:?}", meters);
            return false;
        }
        self.mutate("update_distance", |session, _| {
            session
                .set_mut(exercise_ref, index)
                .map(|set| set.distance_meters = meters)
                .is_some()
        })
    }

    pub fn rename(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.trim().is_empty() {
            return false;
        }
        self.mutate("rename", |session, _| {
            session.name = name;
            true
        })
    }

    pub fn set_notes(&mut self, notes: Option<String>) -> bool {
        self.mutate("set_notes", |session, _| {
            session.notes = notes;
            true
        })
    }

    /// Apply `op` to the live session and notify on success
    fn mutate<F>(&mut self, name: &str, op: F) -> bool
    where
        F: FnOnce(&mut Session, &SessionConfig) -> bool,
    {
        let active = self.is_active();
        let applied = match self.session.as_mut() {
            Some(session) if active => op(session, &self.config),
            _ => false,
        };
        if applied {
            self.events.emit(SessionEvent::Changed);
        } else {
            tracing::debug!("Ignoring {}: target not found or no active session", name);
        }
        applied
    }
}

/// Build the sets for one template exercise
///
/// Per set index: history for that set, then the record's last-used value,
/// then the template target, then the configured default.
fn seed_from_template(
    template_exercise: &TemplateExercise,
    store: &dyn PerformanceStore,
    config: &SessionConfig,
) -> WorkoutExercise {
    let history = store.last_performance(&template_exercise.exercise.id);
    let count = template_exercise.target_sets.max(1) as usize;

    let sets = (0..count)
        .map(|i| {
            let reps = history
                .as_ref()
                .and_then(|h| h.reps_for_set(i))
                .or(template_exercise.target_reps)
                .unwrap_or(config.default_reps);
            let weight = history
                .as_ref()
                .and_then(|h| h.weight_for_set(i))
                .or(template_exercise.target_weight);
            ExerciseSet::new(Some(reps), weight)
        })
        .collect();

    WorkoutExercise::new(template_exercise.exercise.clone(), sets)
}
