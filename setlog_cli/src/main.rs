use clap::{Parser, Subcommand};
use setlog_core::*;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "setlog")]
#[command(about = "Workout session logger", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and read session commands from stdin (default)
    Start {
        /// Template to seed the session from
        #[arg(long)]
        template: Option<String>,

        /// Session name
        #[arg(long)]
        name: Option<String>,

        /// Dry run - run the session without saving anything
        #[arg(long)]
        dry_run: bool,
    },

    /// List built-in exercises
    Exercises,

    /// List built-in templates
    Templates,

    /// Show recently completed workouts
    History {
        /// How many days back to look
        #[arg(long, default_value_t = 7)]
        days: i64,
    },

    /// Show the stored performance record for an exercise
    Last {
        exercise_id: String,
    },

    /// Roll up WAL workouts to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

fn main() -> Result<()> {
    setlog_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());

    match cli.command {
        Some(Commands::Start {
            template,
            name,
            dry_run,
        }) => cmd_start(&data_dir, template, name, dry_run, &config),
        Some(Commands::Exercises) => cmd_exercises(),
        Some(Commands::Templates) => cmd_templates(),
        Some(Commands::History { days }) => cmd_history(&data_dir, days),
        Some(Commands::Last { exercise_id }) => cmd_last(&data_dir, &exercise_id),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&data_dir, cleanup),
        None => cmd_start(&data_dir, None, None, false, &config),
    }
}

fn cmd_start(
    data_dir: &Path,
    template_id: Option<String>,
    name: Option<String>,
    dry_run: bool,
    config: &Config,
) -> Result<()> {
    let catalog = get_default_catalog();
    let errors = catalog.validate();
    if !errors.is_empty() {
        eprintln!("Catalog validation errors:");
        for error in errors {
            eprintln!("  - {}", error);
        }
        return Err(Error::CatalogValidation("Invalid catalog".into()));
    }

    let template = template_id.as_deref().and_then(|id| {
        let found = catalog.find_template(id);
        if found.is_none() {
            eprintln!("Unknown template: {}. Starting an empty session.", id);
        }
        found
    });

    let mut store: Box<dyn PerformanceStore> = if dry_run {
        Box::new(MemoryStore::new())
    } else {
        Box::new(FileStore::open(data_dir)?)
    };

    let mut controller = SessionController::new(config);
    let events = controller.subscribe();
    controller.start(template, store.as_ref());
    if let Some(name) = name {
        controller.rename(name);
    }

    let shared = controller.into_shared();
    let mut ticker = Ticker::spawn(shared.clone(), &config.session);
    let mut lifecycle = LifecycleAdapter::new(
        shared.clone(),
        LoggingGraceScheduler::new(config.session.grace_period()),
    );

    if let Ok(ctl) = shared.lock() {
        print_session(&ctl);
    }
    print_help();

    let stdin = io::stdin();
    let mut outcome = None;

    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{}", message);
                continue;
            }
        };

        tracing::debug!("Session command: {:?}", command);
        match command {
            SessionCommand::Suspend => lifecycle.about_to_suspend(),
            SessionCommand::Background => lifecycle.entered_background(),
            SessionCommand::Wake => lifecycle.resumed(),
            SessionCommand::Help => print_help(),
            other => {
                let mut ctl = shared
                    .lock()
                    .map_err(|_| Error::Other("session controller lock poisoned".into()))?;
                apply(&mut ctl, other, store.as_mut());
            }
        }

        outcome = events.try_iter().find_map(|event| match event {
            SessionEvent::Terminated { outcome, .. } => Some(outcome),
            SessionEvent::Changed => None,
        });
        if outcome.is_some() {
            break;
        }
    }

    ticker.stop();
    tracing::info!("Session loop finished: {:?}", outcome);

    if outcome.is_none() {
        if let Ok(mut ctl) = shared.lock() {
            ctl.cancel();
        }
        println!("\nInput closed - session cancelled.");
    } else if dry_run {
        println!("\n[Dry run - workout not saved]");
    }

    Ok(())
}

#[derive(Debug, PartialEq)]
enum SessionCommand {
    Add(String),
    Drop(usize),
    AddSet(usize),
    DeleteSet(usize, usize),
    Weight(usize, usize, Option<f64>),
    Reps(usize, usize, Option<u32>),
    Time(usize, usize, Option<u32>),
    Distance(usize, usize, Option<f64>),
    Done(usize, usize),
    Undo(usize, usize),
    Pause,
    Resume,
    Toggle,
    Rename(String),
    Note(String),
    Suspend,
    Background,
    Wake,
    Status,
    Complete,
    Cancel,
    Help,
}

/// Parse one line of session input; exercise and set numbers are 1-based
fn parse_command(line: &str) -> std::result::Result<SessionCommand, String> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default().to_lowercase();
    let args: Vec<&str> = parts.collect();

    let number = |i: usize| -> std::result::Result<usize, String> {
        args.get(i)
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|&n| n > 0)
            .ok_or_else(|| format!("{}: expected a number (from 1) as argument {}", verb, i + 1))
    };
    let rest = || args.join(" ");

    let command = match verb.as_str() {
        "add" if !args.is_empty() => SessionCommand::Add(args[0].to_string()),
        "drop" => SessionCommand::Drop(number(0)?),
        "set" => SessionCommand::AddSet(number(0)?),
        "del" => SessionCommand::DeleteSet(number(0)?, number(1)?),
        "weight" => {
            let value = set_value(&verb, args.get(2).copied())?;
            SessionCommand::Weight(number(0)?, number(1)?, value)
        }
        "reps" => {
            let value = set_value(&verb, args.get(2).copied())?;
            SessionCommand::Reps(number(0)?, number(1)?, value)
        }
        "time" => {
            let value = set_value(&verb, args.get(2).copied())?;
            SessionCommand::Time(number(0)?, number(1)?, value)
        }
        "dist" => {
            let value = set_value(&verb, args.get(2).copied())?;
            SessionCommand::Distance(number(0)?, number(1)?, value)
        }
        "done" => SessionCommand::Done(number(0)?, number(1)?),
        "undo" => SessionCommand::Undo(number(0)?, number(1)?),
        "pause" => SessionCommand::Pause,
        "resume" => SessionCommand::Resume,
        "toggle" => SessionCommand::Toggle,
        "rename" if !args.is_empty() => SessionCommand::Rename(rest()),
        "note" => SessionCommand::Note(rest()),
        "suspend" => SessionCommand::Suspend,
        "background" => SessionCommand::Background,
        "wake" => SessionCommand::Wake,
        "status" => SessionCommand::Status,
        "complete" | "finish" => SessionCommand::Complete,
        "cancel" => SessionCommand::Cancel,
        "help" | "?" => SessionCommand::Help,
        _ => return Err(format!("Unknown command: {}. Type 'help' for commands.", line)),
    };
    Ok(command)
}

/// Third argument of a set edit: a value, or `-` to clear it
fn set_value<T: FromStr>(
    verb: &str,
    arg: Option<&str>,
) -> std::result::Result<Option<T>, String> {
    match arg {
        Some("-") => Ok(None),
        Some(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{}: invalid value '{}'", verb, v)),
        None => Err(format!("{}: usage is '{} EX SET VALUE|-'", verb, verb)),
    }
}

fn apply(
    ctl: &mut SessionController,
    command: SessionCommand,
    store: &mut dyn PerformanceStore,
) {
    let changed = match command {
        SessionCommand::Add(id) => match get_default_catalog().find_exercise(&id) {
            Some(exercise) => ctl.add_exercise(exercise.clone()).is_some(),
            None => {
                eprintln!("Unknown exercise: {}. See 'setlog exercises'.", id);
                return;
            }
        },
        SessionCommand::Drop(ex) => {
            let r = exercise_ref(ctl, ex);
            ctl.remove_exercise(r)
        }
        SessionCommand::AddSet(ex) => {
            let r = exercise_ref(ctl, ex);
            ctl.add_set(r)
        }
        SessionCommand::DeleteSet(ex, set) => {
            let r = exercise_ref(ctl, ex);
            ctl.delete_set(r, set - 1)
        }
        SessionCommand::Weight(ex, set, value) => {
            let r = exercise_ref(ctl, ex);
            ctl.update_weight(r, set - 1, value)
        }
        SessionCommand::Reps(ex, set, value) => {
            let r = exercise_ref(ctl, ex);
            ctl.update_reps(r, set - 1, value)
        }
        SessionCommand::Time(ex, set, value) => {
            let r = exercise_ref(ctl, ex);
            ctl.update_duration(r, set - 1, value)
        }
        SessionCommand::Distance(ex, set, value) => {
            let r = exercise_ref(ctl, ex);
            ctl.update_distance(r, set - 1, value)
        }
        SessionCommand::Done(ex, set) => {
            let r = exercise_ref(ctl, ex);
            ctl.toggle_set_completion(r, set - 1, true)
        }
        SessionCommand::Undo(ex, set) => {
            let r = exercise_ref(ctl, ex);
            ctl.toggle_set_completion(r, set - 1, false)
        }
        SessionCommand::Pause => ctl.pause(),
        SessionCommand::Resume => ctl.resume(),
        SessionCommand::Toggle => ctl.toggle_pause(),
        SessionCommand::Rename(name) => ctl.rename(name),
        SessionCommand::Note(text) => ctl.set_notes((!text.is_empty()).then_some(text)),
        SessionCommand::Status => {
            print_session(ctl);
            return;
        }
        SessionCommand::Complete => {
            match ctl.complete(store) {
                Some(workout) => {
                    println!(
                        "\n✓ Workout saved: {} ({} sets completed, {})",
                        workout.name,
                        workout.completed_set_count(),
                        format_duration(Duration::from_secs(workout.duration_seconds))
                    );
                }
                None => println!("No active session."),
            }
            return;
        }
        SessionCommand::Cancel => {
            if ctl.cancel() {
                println!("\n✗ Session cancelled - nothing saved.");
            } else {
                println!("No active session.");
            }
            return;
        }
        SessionCommand::Suspend
        | SessionCommand::Background
        | SessionCommand::Wake
        | SessionCommand::Help => return,
    };

    if changed {
        print_session(ctl);
    } else {
        println!("Nothing to change.");
    }
}

// Unknown positions resolve to an id no exercise has; the controller ignores it
fn exercise_ref(ctl: &SessionController, n: usize) -> Uuid {
    ctl.session()
        .and_then(|s| s.exercises.get(n - 1))
        .map(|e| e.id)
        .unwrap_or_else(Uuid::nil)
}

fn print_session(ctl: &SessionController) {
    let Some(session) = ctl.session() else {
        println!("No active session.");
        return;
    };

    let state = if ctl.is_paused() { "paused" } else { "running" };
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", session.name);
    println!("╰─────────────────────────────────────────╯");
    print!("  {}  [{}]", format_duration(session.elapsed), state);
    if let Some(bpm) = ctl.heart_rate() {
        print!("  ♥ {}", bpm);
    }
    println!();

    for (i, entry) in session.exercises.iter().enumerate() {
        println!();
        println!("  {}. {}", i + 1, entry.exercise.name);
        for (j, set) in entry.sets.iter().enumerate() {
            let mark = if set.completed { "  ✓" } else { "" };
            println!(
                "     {}) {}{}",
                j + 1,
                describe_set(&entry.exercise.category, set),
                mark
            );
        }
    }

    if let Some(ref notes) = session.notes {
        println!();
        println!("  ℹ {}", notes);
    }
    let _ = io::stdout().flush();
}

fn describe_set(category: &ExerciseCategory, set: &ExerciseSet) -> String {
    let seconds = set.duration_seconds.map(|s| format!("{} s", s));
    match category {
        ExerciseCategory::Timed => seconds.unwrap_or_else(|| "- s".into()),
        ExerciseCategory::Distance => {
            let meters = set
                .distance_meters
                .map(|m| format!("{} m", m))
                .unwrap_or_else(|| "- m".into());
            match seconds {
                Some(seconds) => format!("{} in {}", meters, seconds),
                None => meters,
            }
        }
        ExerciseCategory::Strength | ExerciseCategory::Bodyweight => {
            let reps = set
                .reps
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".into());
            let weight = set
                .weight
                .map(|w| format!(" x {} kg", w))
                .unwrap_or_default();
            format!("{} reps{}", reps, weight)
        }
    }
}

fn print_help() {
    println!("─────────────────────────────────────────");
    println!("  add EXERCISE_ID      drop EX      set EX      del EX SET");
    println!("  weight EX SET KG|-   reps EX SET N|-   done EX SET   undo EX SET");
    println!("  time EX SET SECS|-   dist EX SET M|-");
    println!("  pause  resume  toggle  rename NAME  note TEXT  status");
    println!("  suspend  background  wake");
    println!("  complete  cancel");
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}

fn cmd_exercises() -> Result<()> {
    for exercise in &get_default_catalog().exercises {
        let muscles: Vec<String> = exercise
            .muscle_groups
            .iter()
            .map(|m| format!("{:?}", m).to_lowercase())
            .collect();
        println!("{:<20} {:<24} {}", exercise.id, exercise.name, muscles.join(", "));
    }
    Ok(())
}

fn cmd_templates() -> Result<()> {
    for template in &get_default_catalog().templates {
        println!("{} - {}", template.id, template.name);
        for entry in &template.exercises {
            let reps = entry
                .target_reps
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".into());
            println!("    {} x {}  {}", entry.target_sets, reps, entry.exercise.name);
        }
    }
    Ok(())
}

fn cmd_history(data_dir: &Path, days: i64) -> Result<()> {
    let workouts = load_recent_workouts(
        &FileStore::wal_path(data_dir),
        &FileStore::csv_path(data_dir),
        days,
    )?;

    if workouts.is_empty() {
        println!("No workouts in the last {} days.", days);
        return Ok(());
    }

    for workout in workouts {
        println!(
            "{}  {:<20} {}  {} sets  {:.0} kg",
            workout
                .completed_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M"),
            workout.name,
            format_duration(Duration::from_secs(workout.duration_seconds)),
            workout.completed_sets,
            workout.total_volume
        );
    }
    Ok(())
}

fn cmd_last(data_dir: &Path, exercise_id: &str) -> Result<()> {
    let store = FileStore::open(data_dir)?;
    let Some(record) = store.last_performance(exercise_id) else {
        println!("No history for {}.", exercise_id);
        return Ok(());
    };

    println!("{} (last {})", exercise_id, record.last_performed.format("%Y-%m-%d"));
    for (i, reps) in record.set_reps.iter().enumerate() {
        let reps = reps.map(|r| r.to_string()).unwrap_or_else(|| "-".into());
        let weight = record
            .set_weights
            .get(i)
            .copied()
            .flatten()
            .map(|w| format!(" x {} kg", w))
            .unwrap_or_default();
        println!("  {}) {} reps{}", i + 1, reps, weight);
    }
    println!("  average: {:.1} reps", record.average_reps);
    Ok(())
}

fn cmd_rollup(data_dir: &Path, cleanup: bool) -> Result<()> {
    let wal_path = FileStore::wal_path(data_dir);
    let csv_path = FileStore::csv_path(data_dir);

    if !wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = setlog_core::csv_rollup::wal_to_csv_and_archive(&wal_path, &csv_path)?;

    println!("✓ Rolled up {} workouts to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        let wal_dir = data_dir.join("wal");
        let cleaned = setlog_core::csv_rollup::cleanup_processed_wals(&wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_set_commands() {
        assert_eq!(
            parse_command("weight 1 2 62.5").unwrap(),
            SessionCommand::Weight(1, 2, Some(62.5))
        );
        assert_eq!(
            parse_command("reps 2 1 -").unwrap(),
            SessionCommand::Reps(2, 1, None)
        );
        assert_eq!(parse_command("DONE 1 3").unwrap(), SessionCommand::Done(1, 3));
        assert_eq!(
            parse_command("rename Heavy legs").unwrap(),
            SessionCommand::Rename("Heavy legs".into())
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_command("del 0 1").is_err());
        assert!(parse_command("weight 1 1 heavy").is_err());
        assert!(parse_command("jump").is_err());
        assert!(parse_command("add").is_err());
    }

    #[test]
    fn test_parse_timed_and_distance_commands() {
        assert_eq!(
            parse_command("time 1 1 60").unwrap(),
            SessionCommand::Time(1, 1, Some(60))
        );
        assert_eq!(
            parse_command("dist 2 3 1500.5").unwrap(),
            SessionCommand::Distance(2, 3, Some(1500.5))
        );
        assert_eq!(
            parse_command("dist 2 3 -").unwrap(),
            SessionCommand::Distance(2, 3, None)
        );
        assert!(parse_command("time 1 1 -5").is_err());
        assert!(parse_command("dist 1 1").is_err());
    }

    #[test]
    fn test_sets_described_by_category() {
        let mut set = ExerciseSet::new(Some(10), None);
        assert_eq!(describe_set(&ExerciseCategory::Timed, &set), "- s");
        assert_eq!(describe_set(&ExerciseCategory::Bodyweight, &set), "10 reps");

        set.duration_seconds = Some(90);
        set.distance_meters = Some(500.0);
        assert_eq!(describe_set(&ExerciseCategory::Timed, &set), "90 s");
        assert_eq!(
            describe_set(&ExerciseCategory::Distance, &set),
            "500 m in 90 s"
        );
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(3725)), "01:02:05");
    }
}
