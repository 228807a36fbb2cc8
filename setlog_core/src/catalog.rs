//! Default catalog of exercises and workout templates.
//!
//! This module provides the built-in reference data the front end offers
//! when adding exercises or starting from a template.

use crate::types::*;
use once_cell::sync::Lazy;

/// The complete catalog of exercises and templates
#[derive(Clone, Debug)]
pub struct Catalog {
    pub exercises: Vec<Exercise>,
    pub templates: Vec<Template>,
}

/// Cached default catalog - built once and reused across all operations
static DEFAULT_CATALOG: Lazy<Catalog> = Lazy::new(build_default_catalog);

/// Get a reference to the cached default catalog
pub fn get_default_catalog() -> &'static Catalog {
    &DEFAULT_CATALOG
}

fn exercise(
    id: &str,
    name: &str,
    category: ExerciseCategory,
    muscle_groups: &[MuscleGroup],
    equipment: Option<&str>,
) -> Exercise {
    Exercise {
        id: id.into(),
        name: name.into(),
        category,
        muscle_groups: muscle_groups.to_vec(),
        equipment: equipment.map(Into::into),
    }
}

/// Builds the default catalog with built-in exercises and templates
pub fn build_default_catalog() -> Catalog {
    use ExerciseCategory::*;
    use MuscleGroup::*;

    let exercises = vec![
        exercise(
            "bench_press",
            "Bench Press",
            Strength,
            &[Chest, Triceps, Shoulders],
            Some("barbell"),
        ),
        exercise(
            "overhead_press",
            "Overhead Press",
            Strength,
            &[Shoulders, Triceps],
            Some("barbell"),
        ),
        exercise(
            "incline_db_press",
            "Incline Dumbbell Press",
            Strength,
            &[Chest, Shoulders],
            Some("dumbbell"),
        ),
        exercise("squat", "Back Squat", Strength, &[Quads, Glutes], Some("barbell")),
        exercise("deadlift", "Deadlift", Strength, &[Hamstrings, Glutes, Back], Some("barbell")),
        exercise(
            "romanian_deadlift",
            "Romanian Deadlift",
            Strength,
            &[Hamstrings, Glutes],
            Some("barbell"),
        ),
        exercise("barbell_row", "Barbell Row", Strength, &[Back, Biceps], Some("barbell")),
        exercise("pull_up", "Pull-up", Bodyweight, &[Back, Biceps], Some("pullup_bar")),
        exercise("push_up", "Push-up", Bodyweight, &[Chest, Triceps], None),
        exercise("bicep_curl", "Bicep Curl", Strength, &[Biceps], Some("dumbbell")),
        exercise("calf_raise", "Calf Raise", Strength, &[Calves], Some("machine")),
        exercise("plank", "Plank", Timed, &[Core], None),
        exercise("rowing", "Rowing", Distance, &[FullBody], Some("rower")),
    ];

    let find = |id: &str| {
        exercises
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .unwrap_or_else(|| exercise(id, id, Strength, &[], None))
    };
    let target = |id: &str, sets: u32, reps: Option<u32>| TemplateExercise {
        exercise: find(id),
        target_sets: sets,
        target_reps: reps,
        target_weight: None,
    };

    let templates = vec![
        Template {
            id: "push".into(),
            name: "Push Day".into(),
            exercises: vec![
                target("bench_press", 3, Some(8)),
                target("overhead_press", 3, Some(8)),
                target("incline_db_press", 3, Some(10)),
                target("push_up", 2, Some(15)),
            ],
        },
        Template {
            id: "pull".into(),
            name: "Pull Day".into(),
            exercises: vec![
                target("deadlift", 3, Some(5)),
                target("barbell_row", 3, Some(8)),
                target("pull_up", 3, Some(8)),
                target("bicep_curl", 3, Some(12)),
            ],
        },
        Template {
            id: "legs".into(),
            name: "Leg Day".into(),
            exercises: vec![
                target("squat", 5, Some(5)),
                target("romanian_deadlift", 3, Some(10)),
                target("calf_raise", 4, Some(15)),
                target("plank", 3, None),
            ],
        },
    ];

    Catalog {
        exercises,
        templates,
    }
}

impl Catalog {
    pub fn find_exercise(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn find_template(&self, id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Validate the catalog for consistency
    ///
    /// Returns a list of validation errors (empty if valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for (i, exercise) in self.exercises.iter().enumerate() {
            if self.exercises[..i].iter().any(|e| e.id == exercise.id) {
                errors.push(format!("Duplicate exercise id: {}", exercise.id));
            }
        }

        for template in &self.templates {
            if template.exercises.is_empty() {
                errors.push(format!("Template {} has no exercises", template.id));
            }
            for entry in &template.exercises {
                if self.find_exercise(&entry.exercise.id).is_none() {
                    errors.push(format!(
                        "Template {} references unknown exercise {}",
                        template.id, entry.exercise.id
                    ));
                }
                if entry.target_sets == 0 {
                    errors.push(format!(
                        "Template {} has zero target sets for {}",
                        template.id, entry.exercise.id
                    ));
                }
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_validates() {
        let catalog = build_default_catalog();
        let errors = catalog.validate();
        assert!(
            errors.is_empty(),
            "Default catalog has validation errors: {:?}",
            errors
        );
    }

    #[test]
    fn test_lookup_by_id() {
        let catalog = get_default_catalog();
        assert_eq!(catalog.find_exercise("squat").unwrap().name, "Back Squat");
        assert_eq!(catalog.find_template("legs").unwrap().exercises.len(), 4);
        assert!(catalog.find_exercise("underwater_basket").is_none());
    }

    #[test]
    fn test_unknown_template_exercise_is_reported() {
        let mut catalog = build_default_catalog();
        catalog.templates[0].exercises[0].exercise.id = "mystery".into();
        catalog.templates[1].exercises[0].target_sets = 0;

        let errors = catalog.validate();
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors[0].contains("mystery"));
    }
}
