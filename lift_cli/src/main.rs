use clap::{Parser, Subcommand};
use lift_core::*;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};

#[derive(Parser)]
#[command(name = "lift")]
#[command(about = "Guided strength workout sessions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the user id from the config file
    #[arg(long, global = true)]
    user: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workout session (default)
    Start {
        /// Workout id from workouts.json; omit for the demo plan
        workout_id: Option<String>,

        /// Show the resolved plan without starting
        #[arg(long)]
        dry_run: bool,

        /// Auto-complete (for testing) - finish every set, skipping all rest
        #[arg(long)]
        auto_complete: bool,
    },

    /// Manage per-exercise starting weight and reps
    Defaults {
        #[command(subcommand)]
        action: DefaultsAction,
    },

    /// Roll up WAL records to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },
}

#[derive(Subcommand)]
enum DefaultsAction {
    /// Set defaults for an exercise
    Set {
        exercise_id: String,

        /// Starting weight in kg
        #[arg(long)]
        weight: Option<f64>,

        /// Starting reps
        #[arg(long)]
        reps: Option<u32>,
    },

    /// Show defaults for one exercise or all of them
    Show { exercise_id: Option<String> },
}

/// Files under the data directory
struct DataPaths {
    templates: PathBuf,
    defaults: PathBuf,
    wal_dir: PathBuf,
    wal: PathBuf,
    csv: PathBuf,
}

impl DataPaths {
    fn new(data_dir: &Path) -> Self {
        let wal_dir = data_dir.join("wal");
        Self {
            templates: data_dir.join("workouts.json"),
            defaults: data_dir.join("defaults.json"),
            wal: wal_dir.join("completions.wal"),
            wal_dir,
            csv: data_dir.join("sessions.csv"),
        }
    }
}

fn main() -> Result<()> {
    lift_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data_dir = cli
        .data_dir
        .unwrap_or_else(|| config.data.data_dir.clone());
    let user_id = cli.user.unwrap_or_else(|| config.user.id.clone());
    let paths = DataPaths::new(&data_dir);

    tracing::debug!("Using data dir {:?} for user {}", data_dir, user_id);

    match cli.command {
        Some(Commands::Start {
            workout_id,
            dry_run,
            auto_complete,
        }) => cmd_start(&paths, &user_id, workout_id, dry_run, auto_complete, &config),
        Some(Commands::Defaults { action }) => cmd_defaults(&paths, &user_id, action),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&paths, cleanup),
        None => cmd_start(&paths, &user_id, None, false, false, &config),
    }
}

fn cmd_start(
    paths: &DataPaths,
    user_id: &str,
    workout_id: Option<String>,
    dry_run: bool,
    auto_complete: bool,
    config: &Config,
) -> Result<()> {
    let templates = TemplateStore::new(&paths.templates);
    let defaults = UserDefaultsState::load(&paths.defaults)?;
    // History only seeds starting weights; a session can start without it
    let history = match SessionHistory::load(&paths.wal, &paths.csv) {
        Ok(history) => history,
        Err(e) => {
            tracing::warn!(
                "Unable to read workout history from {:?}: {}. Continuing without it.",
                paths.wal,
                e
            );
            SessionHistory::default()
        }
    };

    let workout = WorkoutRef::from(workout_id);
    let plan = PlanLoader::new(&templates, &defaults, &history)
        .with_default_rest(config.session.default_rest_seconds)
        .load(&workout, user_id)
        .map_err(|e| {
            eprintln!("✗ {}", e);
            e
        })?;

    display_plan(&plan);

    if dry_run {
        println!("\n[Dry run - session not started]");
        return Ok(());
    }

    let session = WorkoutSession::start(plan)?;
    let mut sink = JsonlSink::new(&paths.wal);
    let (tx, rx) = channel();

    let end = if auto_complete {
        // Two presses per set covers finishing it and skipping its rest
        let presses: usize = session.slots().iter().map(|s| s.sets.len() * 2).sum();
        for _ in 0..presses {
            let _ = tx.send(SessionMessage::Event(SessionEvent::PrimaryAction));
        }
        drop(tx);

        SessionRunner::new(session, &mut sink, SystemClock).run(rx, Ticking::Virtual, |s, outcome| {
            report_outcome(s, outcome)
        })
    } else {
        display_controls(config.session.rest_adjust_step);
        render_current(&session.view());
        spawn_input_reader(tx.clone(), config.session.rest_adjust_step);

        SessionRunner::new(session, &mut sink, SystemClock).run(
            rx,
            Ticking::WallClock(tx),
            |s, outcome| report_outcome(s, outcome),
        )
    };

    match end {
        SessionEnd::Completed { record, delivery } => {
            display_summary(&record);
            match delivery {
                Delivery::Saved => {
                    println!("\n✓ Workout logged!");
                    println!("  WAL: {}", sink.path().display());
                }
                Delivery::Failed(e) => {
                    println!("\n⚠ Workout complete, but it could not be saved.");
                    eprintln!("  {}", e);
                }
            }
        }
        SessionEnd::Abandoned { elapsed } | SessionEnd::Disconnected { elapsed } => {
            println!(
                "\nWorkout abandoned after {} - nothing logged.",
                format_clock(elapsed)
            );
        }
    }

    Ok(())
}

fn cmd_defaults(paths: &DataPaths, user_id: &str, action: DefaultsAction) -> Result<()> {
    match action {
        DefaultsAction::Set {
            exercise_id,
            weight,
            reps,
        } => {
            if let Some(w) = weight {
                if !w.is_finite() || w < 0.0 {
                    return Err(Error::Other(format!("Invalid weight: {}", w)));
                }
            }

            if weight.is_none() && reps.is_none() {
                return Err(Error::Other("Nothing to set: pass --weight and/or --reps".into()));
            }

            // Fields not given keep their stored value
            let state = UserDefaultsState::update(&paths.defaults, |state| {
                let mut defaults = state.get(user_id, &exercise_id).cloned().unwrap_or_default();
                if weight.is_some() {
                    defaults.default_weight_kg = weight;
                }
                if reps.is_some() {
                    defaults.default_reps = reps;
                }
                state.set(user_id, &exercise_id, defaults);
                Ok(())
            })?;

            println!("✓ Defaults saved for {}", exercise_id);
            if let Some(d) = state.get(user_id, &exercise_id) {
                print_defaults(&exercise_id, d.default_weight_kg, d.default_reps);
            }
        }
        DefaultsAction::Show { exercise_id } => {
            let state = UserDefaultsState::load(&paths.defaults)?;
            let Some(exercises) = state.users.get(user_id) else {
                println!("No defaults set for {}", user_id);
                return Ok(());
            };

            let mut ids: Vec<&String> = exercises
                .keys()
                .filter(|id| exercise_id.as_ref().map_or(true, |want| *id == want))
                .collect();
            ids.sort();

            if ids.is_empty() {
                println!("No defaults set for {}", user_id);
            }
            for id in ids {
                let d = &exercises[id];
                print_defaults(id, d.default_weight_kg, d.default_reps);
            }
        }
    }

    Ok(())
}

fn cmd_rollup(paths: &DataPaths, cleanup: bool) -> Result<()> {
    if !paths.wal.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = lift_core::csv_rollup::wal_to_csv_and_archive(&paths.wal, &paths.csv)?;

    println!("✓ Rolled up {} workouts to CSV", count);
    println!("  CSV: {}", paths.csv.display());

    if cleanup {
        let cleaned = lift_core::csv_rollup::cleanup_processed_wals(&paths.wal_dir)?;
        if cleaned > 0 {
            println!("✓ Cleaned up {} processed WAL files", cleaned);
        }
    }

    Ok(())
}

/// Forward stdin lines to the session as messages
///
/// End of input abandons the session.
fn spawn_input_reader(tx: Sender<SessionMessage>, adjust_step: u32) {
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_command(&line, adjust_step) {
                Some(message) => {
                    if tx.send(message).is_err() {
                        return;
                    }
                }
                None => println!("  ? unknown command '{}'", line.trim()),
            }
        }
        let _ = tx.send(SessionMessage::Abandon);
    });
}

fn parse_command(line: &str, adjust_step: u32) -> Option<SessionMessage> {
    let step = adjust_step as i32;
    let mut parts = line.split_whitespace();
    let event = match (parts.next(), parts.next()) {
        (None, _) => SessionEvent::PrimaryAction,
        (Some("+"), None) => SessionEvent::AdjustRest(step),
        (Some("-"), None) => SessionEvent::AdjustRest(-step),
        (Some("w"), Some(value)) => SessionEvent::EditActiveSet(SetField::Weight(value.parse().ok()?)),
        (Some("r"), Some(value)) => SessionEvent::EditActiveSet(SetField::Reps(value.parse().ok()?)),
        (Some("j"), Some(value)) => {
            let number: usize = value.parse().ok()?;
            SessionEvent::JumpToExercise(number.checked_sub(1)?)
        }
        (Some("q"), None) => return Some(SessionMessage::Abandon),
        _ => return None,
    };
    Some(SessionMessage::Event(event))
}

fn report_outcome(session: &WorkoutSession, outcome: &Outcome) {
    match outcome {
        Outcome::Ignored | Outcome::ElapsedTicked { .. } => {}
        Outcome::RestTicked { remaining } => {
            if remaining % 10 == 0 || *remaining <= 3 {
                println!("  resting... {}", format_clock(u64::from(*remaining)));
            }
        }
        Outcome::RestStarted {
            set_index, seconds, ..
        } => {
            println!(
                "\n✓ Set {} done. Rest {}",
                set_index + 1,
                format_clock(u64::from(*seconds))
            );
        }
        Outcome::RestEnded { skipped } => {
            println!("{}", if *skipped { "  Rest skipped" } else { "  Rest over" });
            render_current(&session.view());
        }
        Outcome::ExerciseAdvanced { completed_index, .. } => {
            let slot = &session.slots()[*completed_index];
            println!(
                "\n✓ {} complete! ({} of {} sets)",
                slot.name,
                slot.completed_count(),
                slot.sets.len()
            );
            render_current(&session.view());
        }
        Outcome::RestAdjusted { remaining } => {
            println!("  Rest: {}", format_clock(u64::from(*remaining)));
        }
        Outcome::SetEdited { .. } | Outcome::Jumped { .. } => render_current(&session.view()),
        Outcome::Finished(_) => {
            println!("\n★ WORKOUT COMPLETE! ★");
        }
    }
}

fn display_plan(plan: &SessionPlan) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", plan.workout_name);
    println!("╰─────────────────────────────────────────╯");
    println!();

    for (idx, slot) in plan.slots.iter().enumerate() {
        let first = &slot.sets[0];
        println!(
            "  {}. {} - {} x {} @ {}kg (rest {}s)",
            idx + 1,
            slot.name,
            slot.target_sets,
            first.reps,
            first.weight,
            slot.rest_seconds
        );
    }
}

fn display_controls(adjust_step: u32) {
    println!("─────────────────────────────────────────");
    println!("Enter        finish set / skip rest");
    println!("+ / -        rest +/-{}s", adjust_step);
    println!("w <kg>       set weight    r <n>  set reps");
    println!("j <n>        jump to exercise n");
    println!("q            abandon workout");
}

fn render_current(view: &SessionView) {
    println!();
    println!(
        "  [{}]  {} - Set {} of {}",
        format_clock(view.elapsed),
        view.exercise_name,
        view.set_number,
        view.target_sets
    );
    println!(
        "  {}kg • Target: {} reps • This set: {} reps",
        view.weight, view.target_reps, view.reps
    );
    if let Some(remaining) = view.phase.rest_remaining() {
        println!(
            "  Resting {} of {}",
            format_clock(u64::from(remaining)),
            format_clock(u64::from(view.rest_baseline))
        );
    }

    let queue: Vec<String> = view
        .queue
        .iter()
        .map(|entry| {
            let marker = match entry.status {
                session::QueueStatus::Active => "▶",
                session::QueueStatus::Done => "✓",
                session::QueueStatus::Pending => " ",
            };
            let dots: String = entry
                .sets_done
                .iter()
                .map(|done| if *done { '●' } else { '○' })
                .collect();
            format!("{}{}. {} {}", marker, entry.index + 1, entry.name, dots)
        })
        .collect();
    println!("  Up next: {}", queue.join("  "));
}

fn display_summary(record: &CompletionRecord) {
    println!();
    println!(
        "  {} - {} sets in {}",
        record.workout_name,
        record.entries.len(),
        format_clock(record.duration_seconds)
    );
    for entry in &record.entries {
        println!(
            "    {} #{}: {} x {}kg",
            entry.exercise_id, entry.set_number, entry.reps, entry.weight
        );
    }
}

fn print_defaults(exercise_id: &str, weight: Option<f64>, reps: Option<u32>) {
    let weight = weight.map_or("-".to_string(), |w| format!("{}kg", w));
    let reps = reps.map_or("-".to_string(), |r| r.to_string());
    println!("  {}: weight {}, reps {}", exercise_id, weight, reps);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command("", 10),
            Some(SessionMessage::Event(SessionEvent::PrimaryAction))
        );
        assert_eq!(
            parse_command("-", 15),
            Some(SessionMessage::Event(SessionEvent::AdjustRest(-15)))
        );
        assert_eq!(
            parse_command("w 82.5", 10),
            Some(SessionMessage::Event(SessionEvent::EditActiveSet(
                SetField::Weight(82.5)
            )))
        );
        assert_eq!(
            parse_command("j 2", 10),
            Some(SessionMessage::Event(SessionEvent::JumpToExercise(1)))
        );
        assert_eq!(parse_command("q", 10), Some(SessionMessage::Abandon));
        assert_eq!(parse_command("j 0", 10), None);
        assert_eq!(parse_command("r lots", 10), None);
        assert_eq!(parse_command("dance", 10), None);
    }
}
