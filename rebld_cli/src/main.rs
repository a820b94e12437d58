use chrono::Utc;
use clap::{Parser, Subcommand};
use rebld_core::config::{DataConfig, TimerConfig};
use rebld_core::records::personal_records;
use rebld_core::ticker::FrameTicker;
use rebld_core::timer::CountdownOutcome;
use rebld_core::*;
use std::io::{self, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

type Input = Lines<BufReader<Stdin>>;

#[derive(Parser)]
#[command(name = "rebld")]
#[command(about = "Workout session runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a workout set by set
    Run {
        /// Day description (JSON) to run
        #[arg(long, conflicts_with = "quick", required_unless_present = "quick")]
        plan: Option<PathBuf>,

        /// Quick-start routine id (see `rebld quick`)
        #[arg(long)]
        quick: Option<String>,

        /// Auto-complete (for testing) - fill every set from history or targets, skip rests
        #[arg(long)]
        auto_complete: bool,
    },

    /// Print the canonical session for a day description
    Normalize {
        /// Day description (JSON)
        file: PathBuf,
    },

    /// Show personal records
    Prs,

    /// Show recent performances of an exercise
    History {
        exercise: String,

        #[arg(long, default_value_t = 5)]
        limit: usize,
    },

    /// Roll up WAL logs to CSV
    Rollup {
        /// Clean up processed WAL files after rollup
        #[arg(long)]
        cleanup: bool,
    },

    /// List quick-start routines (default)
    Quick,
}

#[tokio::main]
async fn main() -> Result<()> {
    rebld_core::logging::init();

    let cli = Cli::parse();

    let config = Config::load()?;
    let data = DataConfig {
        data_dir: cli
            .data_dir
            .unwrap_or_else(|| config.data.data_dir.clone()),
    };

    match cli.command {
        Some(Commands::Run {
            plan,
            quick,
            auto_complete,
        }) => cmd_run(&data, &config, plan, quick, auto_complete).await,
        Some(Commands::Normalize { file }) => cmd_normalize(&file),
        Some(Commands::Prs) => cmd_prs(&data),
        Some(Commands::History { exercise, limit }) => cmd_history(&data, &exercise, limit),
        Some(Commands::Rollup { cleanup }) => cmd_rollup(&data, cleanup),
        Some(Commands::Quick) | None => cmd_quick(),
    }
}

fn read_day(path: &Path) -> Result<DayDescription> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn load_day(plan: Option<PathBuf>, quick: Option<String>) -> Result<DayDescription> {
    match (plan, quick) {
        (Some(path), _) => read_day(&path),
        (None, Some(id)) => Ok(get_default_catalog().routine(&id)?.to_day()),
        (None, None) => Err(Error::Config("Either --plan or --quick is required".into())),
    }
}

/// One user decision while in a block
enum Action {
    Log(Vec<SetInput>),
    Skip,
    Select(usize),
    Rest(u32),
    StartAmrap,
    PauseAmrap,
    CompleteAmrap,
    Quit,
}

async fn cmd_run(
    data: &DataConfig,
    config: &Config,
    plan: Option<PathBuf>,
    quick: Option<String>,
    auto_complete: bool,
) -> Result<()> {
    let session = normalize(&load_day(plan, quick)?)?;
    tracing::debug!(
        "Running '{}' ({} blocks, auto-complete: {})",
        session.focus,
        session.blocks.len(),
        auto_complete
    );
    let history = HistoryIndex::from_logs(load_history(&data.wal_path(), &data.csv_path())?);

    let mut controller = SessionController::new(
        session,
        history,
        config.session,
        MonotonicClock::shared(),
    );
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    print_session_header(controller.session());

    let quit = loop {
        controller.tick();
        print_events(&mut controller);

        let action = match controller.state() {
            SessionState::Complete => break false,
            SessionState::Resting { .. } if auto_complete => {
                if let Err(rejection) = controller.skip_rest() {
                    println!("  ✗ {}", rejection);
                }
                continue;
            }
            SessionState::Resting { .. } => {
                run_rest(&mut controller, &mut input, &config.timer).await?;
                continue;
            }
            SessionState::InBlock { .. } if auto_complete => auto_action(&controller),
            SessionState::InBlock { .. } => prompt_action(&controller, &mut input).await?,
        };

        let result = match action {
            Action::Log(inputs) => controller.log_set(&inputs),
            Action::Skip => controller.skip(),
            Action::Select(index) => controller.select_block(index),
            Action::Rest(seconds) => controller.start_rest(seconds),
            Action::StartAmrap => controller.start_amrap(),
            Action::PauseAmrap => controller.pause_amrap(),
            Action::CompleteAmrap => controller.complete_amrap(),
            Action::Quit => break true,
        };
        if let Err(rejection) = result {
            println!("  ✗ {}", rejection);
        }
    };
    print_events(&mut controller);

    if quit && controller.logged_exercises().is_empty() {
        controller.cancel();
        println!("\nWorkout discarded - nothing was logged.");
        return Ok(());
    }

    let finished = match controller.finish(Utc::now()) {
        Ok(finished) => finished,
        Err(controller) => controller.end_early(Utc::now()),
    };
    print_summary(finished.log());

    let mut sink = JsonlSink::new(data.wal_path());
    loop {
        match finished.persist(&mut sink) {
            Ok(()) => {
                println!("\n✓ Workout logged!");
                return Ok(());
            }
            Err(e) => {
                eprintln!("\n✗ Failed to save workout: {}", e);
                if auto_complete || !confirm_retry(&mut input).await? {
                    return Err(e);
                }
            }
        }
    }
}

/// Live rest countdown; '+' adds time, anything else skips
async fn run_rest(
    controller: &mut SessionController,
    input: &mut Input,
    timer: &TimerConfig,
) -> Result<()> {
    println!(
        "  ('+' + Enter adds {}s, Enter skips)",
        timer.add_time_step_s
    );

    loop {
        let ticker = FrameTicker::new(timer.frame_interval());

        tokio::select! {
            ended = ticker.run(|_| match controller.tick() {
                SessionState::Resting { remaining, .. } => {
                    render_rest(remaining);
                    ControlFlow::Continue(())
                }
                _ => ControlFlow::Break(()),
            }) => {
                if ended.is_some() {
                    println!();
                    return Ok(());
                }
            }
            line = input.next_line() => {
                match line?.as_deref().map(str::trim) {
                    Some("+") => {
                        if let Err(rejection) = controller.add_rest_time(timer.add_time_step_s) {
                            println!("\n  ✗ {}", rejection);
                        }
                    }
                    _ => {
                        println!();
                        if let Err(rejection) = controller.skip_rest() {
                            println!("  ✗ {}", rejection);
                        }
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn render_rest(remaining: Duration) {
    print!("\r  Rest {:>6.1}s ", remaining.as_secs_f64());
    let _ = io::stdout().flush();
}

async fn confirm_retry(input: &mut Input) -> Result<bool> {
    print!("Retry saving? [Y/n] ");
    io::stdout().flush()?;
    Ok(match input.next_line().await? {
        Some(answer) => !answer.trim().eq_ignore_ascii_case("n"),
        None => false,
    })
}

/// Pre-filled entry for an exercise: last performance first, then targets
fn prefill(controller: &SessionController, exercise: &Exercise) -> SetInput {
    match exercise.metrics.input_kind() {
        InputKind::WeightReps => {
            let last = controller.last_performance(&exercise.name);
            SetInput::weight_reps(
                last.map(|p| p.weight).unwrap_or(0.0),
                last.map(|p| p.reps)
                    .or_else(|| exercise.metrics.target_reps_floor())
                    .unwrap_or(10),
            )
        }
        InputKind::Duration => SetInput::duration(
            exercise
                .metrics
                .target_duration_s()
                .filter(|s| *s > 0)
                .unwrap_or(30),
        ),
    }
}

fn auto_action(controller: &SessionController) -> Action {
    let Some(block) = controller.current_block() else {
        return Action::Skip;
    };
    if block.is_amrap() && controller.amrap_rounds() > 0 {
        return Action::CompleteAmrap;
    }
    Action::Log(
        block
            .exercises
            .iter()
            .map(|e| prefill(controller, e))
            .collect(),
    )
}

async fn prompt_action(controller: &SessionController, input: &mut Input) -> Result<Action> {
    let Some(block) = controller.current_block() else {
        return Ok(Action::Skip);
    };
    let progress = controller.progress();

    println!("─────────────────────────────────────────");
    if block.is_amrap() {
        println!(
            "  AMRAP | round {} | {} left",
            controller.amrap_rounds() + 1,
            format_duration(controller.amrap_remaining().unwrap_or_default())
        );
        println!("  'go' start, 'p' pause, 'done' finish block");
    } else {
        println!(
            "  Set {}/{} of {}",
            progress.set_number, progress.target_sets, block.label()
        );
    }
    println!("  's' skip block, 'b <n>' go to block, 'r <secs>' rest, 'q' end workout");

    let mut inputs = Vec::with_capacity(block.exercises.len());
    for exercise in &block.exercises {
        let default = prefill(controller, exercise);
        print!("  {} [{}] > ", exercise.name, describe_input(&default));
        io::stdout().flush()?;

        let Some(line) = input.next_line().await? else {
            return Ok(Action::Quit);
        };
        let line = line.trim();

        let command = match line.split_whitespace().collect::<Vec<_>>().as_slice() {
            ["q"] => Some(Action::Quit),
            ["s"] => Some(Action::Skip),
            ["go"] => Some(Action::StartAmrap),
            ["p"] => Some(Action::PauseAmrap),
            ["done"] => Some(Action::CompleteAmrap),
            // Blocks are shown 1-based
            ["b", n] => n
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .map(Action::Select),
            ["r", secs] => secs.parse().ok().map(Action::Rest),
            _ => None,
        };
        if let Some(command) = command {
            return Ok(command);
        }

        inputs.push(if line.is_empty() {
            default
        } else {
            parse_entry(line, exercise.metrics.input_kind())
        });
    }

    Ok(Action::Log(inputs))
}

/// Parse `<weight> <reps> [rpe]` or `<seconds>`; unparseable fields stay empty
fn parse_entry(line: &str, kind: InputKind) -> SetInput {
    let mut parts = line.split_whitespace();
    match kind {
        InputKind::WeightReps => SetInput::WeightReps {
            weight: parts.next().and_then(|w| w.parse().ok()),
            reps: parts.next().and_then(|r| r.parse().ok()),
            rpe: parts.next().and_then(|r| r.parse().ok()),
        },
        InputKind::Duration => SetInput::Duration {
            seconds: parts.next().and_then(|s| s.parse().ok()),
        },
    }
}

fn describe_input(input: &SetInput) -> String {
    match input {
        SetInput::WeightReps {
            weight: Some(w),
            reps: Some(r),
            ..
        } => format!("{} kg × {}", w, r),
        SetInput::Duration { seconds: Some(s) } => format!("{}s", s),
        _ => "-".into(),
    }
}

fn describe_set(set: &LoggedSet) -> String {
    match set {
        LoggedSet::Srw {
            weight,
            reps,
            rpe: Some(rpe),
            ..
        } => format!("{} kg × {} @ RPE {}", weight, reps, rpe),
        LoggedSet::Srw { weight, reps, .. } => format!("{} kg × {}", weight, reps),
        LoggedSet::Duration { duration_s, .. } => format!("{}s", duration_s),
    }
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}", secs / 60, secs % 60)
}

fn print_session_header(session: &Session) {
    println!("\n╭─────────────────────────────────────────╮");
    println!("│  {}", session.focus);
    println!("╰─────────────────────────────────────────╯");
    if let Some(notes) = &session.notes {
        println!("  {}", notes);
    }
    for (i, block) in session.blocks.iter().enumerate() {
        println!("  {}. {} ({} exercises)", i + 1, block.label(), block.exercises.len());
    }
    println!();
}

fn print_events(controller: &mut SessionController) {
    for event in controller.drain_events() {
        match event {
            SessionEvent::SetLogged {
                exercise_name, set, ..
            } => println!(
                "  ✓ {} set {}: {}",
                exercise_name,
                set.set_number(),
                describe_set(&set)
            ),
            SessionEvent::PersonalRecord(pr) => {
                println!("  🏆 {}", pr);
                if let Some(previous) = pr.previous_best {
                    println!(
                        "     previous best {} kg × {} on {}",
                        previous.weight,
                        previous.reps,
                        previous.date.format("%Y-%m-%d")
                    );
                }
            }
            SessionEvent::RestStarted { seconds } => println!("  Rest {}s", seconds),
            SessionEvent::RestFinished {
                outcome: CountdownOutcome::Completed,
                alert,
            } => {
                if alert.is_some_and(|a| a.sound) {
                    print!("\x07");
                }
                println!("  Rest over");
            }
            SessionEvent::RestFinished { .. } => {}
            SessionEvent::BlockAdvanced { to, .. } => {
                if let Some(block) = controller.session().blocks.get(to) {
                    println!("\n▶ Block {}: {}", to + 1, block.label());
                }
            }
            SessionEvent::AmrapStarted { remaining } => {
                println!("  AMRAP running, {} left", format_duration(remaining))
            }
            SessionEvent::AmrapPaused { remaining } => {
                println!("  AMRAP paused, {} left", format_duration(remaining))
            }
            SessionEvent::AmrapTimeUp { rounds } => {
                println!("  ⏰ Time! {} rounds - type 'done' to move on", rounds)
            }
            SessionEvent::SessionComplete => println!("\n✓ All blocks done!"),
        }
    }
}

fn print_summary(log: &WorkoutLog) {
    println!("\n{} | {} min", log.focus, log.duration_minutes);
    for exercise in &log.exercises {
        println!("  {} ({} sets)", exercise.name, exercise.sets.len());
    }
}

fn cmd_normalize(file: &Path) -> Result<()> {
    let session = normalize(&read_day(file)?)?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    Ok(())
}

fn cmd_prs(data: &DataConfig) -> Result<()> {
    let logs = load_history(&data.wal_path(), &data.csv_path())?;
    let records = personal_records(&logs);

    if records.is_empty() {
        println!("No personal records yet.");
        return Ok(());
    }

    for record in records {
        print!(
            "  {:<28} {} kg × {}  ({})",
            record.exercise_name,
            record.weight,
            record.reps,
            record.date.format("%Y-%m-%d")
        );
        match record.previous_best {
            Some(previous) => println!("  prev {} kg × {}", previous.weight, previous.reps),
            None => println!(),
        }
    }
    Ok(())
}

fn cmd_history(data: &DataConfig, exercise: &str, limit: usize) -> Result<()> {
    let index = HistoryIndex::from_logs(load_history(&data.wal_path(), &data.csv_path())?);
    let recent = index.recent_performances(exercise, limit);

    if recent.is_empty() {
        println!("No history for {}.", exercise);
        return Ok(());
    }

    println!("{}", exercise);
    for performance in recent {
        println!(
            "  {}  {} kg × {}  {} sets  volume {}",
            performance.date.format("%Y-%m-%d"),
            performance.weight,
            performance.reps,
            performance.sets,
            performance.volume
        );
    }
    Ok(())
}

fn cmd_rollup(data: &DataConfig, cleanup: bool) -> Result<()> {
    let wal_path = data.wal_path();
    let csv_path = data.csv_path();

    if !wal_path.exists() {
        println!("No WAL file found - nothing to roll up.");
        return Ok(());
    }

    let count = rebld_core::rollup::rollup_to_csv(&wal_path, &csv_path)?;

    println!("✓ Rolled up {} workouts to CSV", count);
    println!("  CSV: {}", csv_path.display());

    if cleanup {
        if let Some(wal_dir) = wal_path.parent() {
            let cleaned = rebld_core::rollup::cleanup_processed_wals(wal_dir)?;
            if cleaned > 0 {
                println!("✓ Cleaned up {} processed WAL files", cleaned);
            }
        }
    }

    Ok(())
}

fn cmd_quick() -> Result<()> {
    println!("Quick-start routines:");
    for routine in get_default_catalog().routines.values() {
        println!(
            "  {:<20} {} ({} exercises)",
            routine.id,
            routine.name,
            routine.day.exercises.len()
        );
    }
    println!("\nStart one with: rebld run --quick <id>");
    Ok(())
}
