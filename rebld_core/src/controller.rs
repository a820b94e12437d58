//! Session progression state machine.
//!
//! A [`SessionController`] exclusively owns the canonical [`Session`] for the
//! length of a workout. It walks blocks and sets, owns the live countdown
//! (rest between sets or an AMRAP window), checks logged sets for PRs against
//! history and finally hands the accumulated sets to the finalizer.
//!
//! Every transition is synchronous. Transitions whose preconditions do not
//! hold return a [`Rejection`] and leave the controller untouched. Anything
//! the presentation layer may want to show (PRs, rest start/finish, block
//! changes) is queued as a [`SessionEvent`] and read with
//! [`SessionController::drain_events`].

use crate::clock::SharedClock;
use crate::config::SessionSettings;
use crate::finalize::{finalize, FinishedSession};
use crate::history::{HistoryIndex, Performance};
use crate::records::{detect_pr, should_track_pr, PrNotification};
use crate::timer::{Countdown, CountdownOutcome, Tick};
use crate::{Block, BlockKind, InputKind, LoggedExercise, LoggedSet, Session};
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;

/// What the user entered for one exercise of the current block
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SetInput {
    WeightReps {
        weight: Option<f64>,
        reps: Option<u32>,
        rpe: Option<f32>,
    },
    Duration {
        seconds: Option<u32>,
    },
}

impl SetInput {
    pub fn weight_reps(weight: f64, reps: u32) -> Self {
        SetInput::WeightReps {
            weight: Some(weight),
            reps: Some(reps),
            rpe: None,
        }
    }

    pub fn duration(seconds: u32) -> Self {
        SetInput::Duration {
            seconds: Some(seconds),
        }
    }

    /// The logged set, if the input is complete and fits the exercise
    fn to_logged(self, set: u32, kind: InputKind) -> Option<LoggedSet> {
        match (self, kind) {
            (
                SetInput::WeightReps {
                    weight: Some(weight),
                    reps: Some(reps),
                    rpe,
                },
                InputKind::WeightReps,
            ) if weight.is_finite() && weight >= 0.0 && reps > 0 => Some(LoggedSet::Srw {
                set,
                weight,
                reps,
                rpe: rpe.filter(|r| r.is_finite()),
            }),
            (
                SetInput::Duration {
                    seconds: Some(duration_s),
                },
                InputKind::Duration,
            ) if duration_s > 0 => Some(LoggedSet::Duration { set, duration_s }),
            _ => None,
        }
    }
}

/// A transition whose precondition did not hold; nothing was changed
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("Inputs incomplete: {0}")]
    InputsIncomplete(String),

    #[error("Not in a block")]
    NotInBlock,

    #[error("Not resting")]
    NotResting,

    #[error("No block {index} (session has {block_count})")]
    NoSuchBlock { index: usize, block_count: usize },

    #[error("Current block is not an AMRAP")]
    NotAmrap,

    #[error("Session is already complete")]
    SessionComplete,
}

/// Observable state of a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    InBlock {
        block_index: usize,
        set_number: u32,
    },
    Resting {
        block_index: usize,
        /// Set that resumes once rest is over
        resume_set: u32,
        remaining: Duration,
    },
    Complete,
}

/// Sound / vibration cues to play when rest runs out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestAlert {
    pub sound: bool,
    pub vibration: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    SetLogged {
        block_index: usize,
        exercise_name: String,
        set: LoggedSet,
    },
    PersonalRecord(PrNotification),
    RestStarted {
        seconds: u32,
    },
    RestFinished {
        outcome: CountdownOutcome,
        alert: Option<RestAlert>,
    },
    BlockAdvanced {
        from: usize,
        to: usize,
    },
    AmrapStarted {
        remaining: Duration,
    },
    AmrapPaused {
        remaining: Duration,
    },
    AmrapTimeUp {
        rounds: u32,
    },
    SessionComplete,
}

/// Where the session stands, for progress displays
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Progress {
    pub block_index: usize,
    pub block_count: usize,
    pub set_number: u32,
    pub target_sets: u32,
    pub exercises_done: usize,
    pub exercise_total: usize,
}

impl Progress {
    /// Share of exercises in finished blocks, 0.0 to 1.0
    pub fn fraction(&self) -> f64 {
        if self.exercise_total == 0 {
            return 0.0;
        }
        self.exercises_done as f64 / self.exercise_total as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    InBlock { block_index: usize, set_number: u32 },
    Resting { block_index: usize, resume_set: u32 },
    Complete,
}

pub struct SessionController {
    session: Session,
    history: HistoryIndex,
    settings: SessionSettings,
    clock: SharedClock,
    phase: Phase,
    rest: Option<Countdown>,
    amrap: Option<Countdown>,
    amrap_rounds: u32,
    logged: Vec<LoggedExercise>,
    celebrated_prs: HashSet<String>,
    events: VecDeque<SessionEvent>,
    started_at: DateTime<Utc>,
}

impl SessionController {
    /// Take ownership of a normalized session and start at its first block
    pub fn new(
        session: Session,
        history: HistoryIndex,
        settings: SessionSettings,
        clock: SharedClock,
    ) -> Self {
        let mut controller = Self {
            session,
            history,
            settings,
            clock,
            phase: Phase::Complete,
            rest: None,
            amrap: None,
            amrap_rounds: 0,
            logged: Vec::new(),
            celebrated_prs: HashSet::new(),
            events: VecDeque::new(),
            started_at: Utc::now(),
        };

        if controller.session.blocks.is_empty() {
            tracing::warn!("Session '{}' has no blocks", controller.session.focus);
        } else {
            controller.enter_block(0);
        }
        tracing::debug!(
            "Started session '{}' with {} blocks",
            controller.session.focus,
            controller.session.blocks.len()
        );
        controller
    }

    /// Override the recorded start time
    pub fn with_start_time(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub fn update_settings(&mut self, settings: SessionSettings) {
        self.settings = settings;
    }

    pub fn state(&self) -> SessionState {
        match self.phase {
            Phase::InBlock {
                block_index,
                set_number,
            } => SessionState::InBlock {
                block_index,
                set_number,
            },
            Phase::Resting {
                block_index,
                resume_set,
            } => SessionState::Resting {
                block_index,
                resume_set,
                remaining: self
                    .rest
                    .as_ref()
                    .map(Countdown::remaining)
                    .unwrap_or(Duration::ZERO),
            },
            Phase::Complete => SessionState::Complete,
        }
    }

    pub fn current_block(&self) -> Option<&Block> {
        match self.phase {
            Phase::InBlock { block_index, .. } | Phase::Resting { block_index, .. } => {
                self.session.blocks.get(block_index)
            }
            Phase::Complete => None,
        }
    }

    pub fn last_performance(&self, exercise_name: &str) -> Option<Performance> {
        self.history.last_performance(exercise_name)
    }

    pub fn history(&self) -> &HistoryIndex {
        &self.history
    }

    /// Sets logged so far, grouped per exercise in first-logged order
    pub fn logged_exercises(&self) -> &[LoggedExercise] {
        &self.logged
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    pub fn progress(&self) -> Progress {
        let block_count = self.session.blocks.len();
        let exercise_total = self.session.exercise_count();
        let (block_index, set_number) = match self.phase {
            Phase::InBlock {
                block_index,
                set_number,
            } => (block_index, set_number),
            Phase::Resting {
                block_index,
                resume_set,
            } => (block_index, resume_set),
            Phase::Complete => (block_count, 0),
        };

        Progress {
            block_index,
            block_count,
            set_number,
            target_sets: self
                .session
                .blocks
                .get(block_index)
                .map(Block::total_sets)
                .unwrap_or(0),
            exercises_done: self.session.blocks[..block_index.min(block_count)]
                .iter()
                .map(|b| b.exercises.len())
                .sum(),
            exercise_total,
        }
    }

    /// Log one set for every exercise in the current block.
    ///
    /// `inputs` lines up with the block's exercises. In an AMRAP block this
    /// records a round and stays put; otherwise it rests, moves to the next
    /// set, or advances to the next block.
    pub fn log_set(&mut self, inputs: &[SetInput]) -> Result<SessionState, Rejection> {
        let (block_index, set_number) = match self.phase {
            Phase::InBlock {
                block_index,
                set_number,
            } => (block_index, set_number),
            Phase::Resting { .. } => return Err(Rejection::NotInBlock),
            Phase::Complete => return Err(Rejection::SessionComplete),
        };
        let block = &self.session.blocks[block_index];

        if inputs.len() != block.exercises.len() {
            return Err(Rejection::InputsIncomplete(format!(
                "expected {} entries, got {}",
                block.exercises.len(),
                inputs.len()
            )));
        }

        // Validate everything before touching any state
        let mut new_sets = Vec::with_capacity(inputs.len());
        for (exercise, input) in block.exercises.iter().zip(inputs) {
            let number = self.next_set_number(&exercise.name, set_number);
            match input.to_logged(number, exercise.metrics.input_kind()) {
                Some(set) => new_sets.push((exercise.name.clone(), set)),
                None => {
                    return Err(Rejection::InputsIncomplete(format!(
                        "missing or invalid entry for {}",
                        exercise.name
                    )))
                }
            }
        }

        let total_sets = block.total_sets();
        let rest_s = block.rest_period_s();
        let is_amrap = block.is_amrap();

        for (name, set) in new_sets {
            self.check_pr(&name, &set);
            self.record(block_index, name, set);
        }

        if is_amrap {
            self.amrap_rounds += 1;
            self.phase = Phase::InBlock {
                block_index,
                set_number: set_number + 1,
            };
            tracing::debug!("AMRAP round {} logged", self.amrap_rounds);
            return Ok(self.state());
        }

        let rest_applies = rest_s > 0 && set_number < total_sets;
        if rest_applies && self.settings.auto_start_rest {
            self.begin_rest(block_index, set_number + 1, rest_s);
        } else if set_number >= total_sets {
            self.advance_to(block_index + 1);
        } else {
            self.phase = Phase::InBlock {
                block_index,
                set_number: set_number + 1,
            };
        }

        tracing::debug!("Logged set {} of block {}", set_number, block_index);
        Ok(self.state())
    }

    /// Abandon the rest of the current block without logging
    pub fn skip(&mut self) -> Result<SessionState, Rejection> {
        let block_index = match self.phase {
            Phase::InBlock { block_index, .. } | Phase::Resting { block_index, .. } => block_index,
            Phase::Complete => return Err(Rejection::SessionComplete),
        };
        tracing::debug!("Skipping block {}", block_index);
        self.advance_to(block_index + 1);
        Ok(self.state())
    }

    /// Rest ran out; resume at the pending set
    pub fn rest_finished(&mut self) -> Result<SessionState, Rejection> {
        if !matches!(self.phase, Phase::Resting { .. }) {
            return Err(Rejection::NotResting);
        }
        if let Some(rest) = self.rest.as_mut() {
            rest.cancel();
        }
        self.end_rest(CountdownOutcome::Completed);
        Ok(self.state())
    }

    /// Cut rest short, even when no time is left on it
    pub fn skip_rest(&mut self) -> Result<SessionState, Rejection> {
        if !matches!(self.phase, Phase::Resting { .. }) {
            return Err(Rejection::NotResting);
        }
        if let Some(rest) = self.rest.as_mut() {
            rest.skip();
        }
        self.end_rest(CountdownOutcome::Skipped);
        Ok(self.state())
    }

    pub fn add_rest_time(&mut self, seconds: u32) -> Result<SessionState, Rejection> {
        match (self.phase, self.rest.as_mut()) {
            (Phase::Resting { .. }, Some(rest)) => {
                rest.add_time(seconds);
                Ok(self.state())
            }
            _ => Err(Rejection::NotResting),
        }
    }

    /// Start a rest by hand. Any running rest is replaced.
    pub fn start_rest(&mut self, seconds: u32) -> Result<SessionState, Rejection> {
        let (block_index, resume_set) = match self.phase {
            Phase::InBlock {
                block_index,
                set_number,
            } => (block_index, set_number),
            Phase::Resting {
                block_index,
                resume_set,
            } => (block_index, resume_set),
            Phase::Complete => return Err(Rejection::SessionComplete),
        };
        self.begin_rest(block_index, resume_set, seconds);
        Ok(self.state())
    }

    /// Jump to a block, starting it from its first set
    pub fn select_block(&mut self, index: usize) -> Result<SessionState, Rejection> {
        let from = match self.phase {
            Phase::InBlock { block_index, .. } | Phase::Resting { block_index, .. } => block_index,
            Phase::Complete => return Err(Rejection::SessionComplete),
        };

        let block_count = self.session.blocks.len();
        if index >= block_count {
            return Err(Rejection::NoSuchBlock { index, block_count });
        }

        self.cancel_rest();
        self.enter_block(index);
        self.events
            .push_back(SessionEvent::BlockAdvanced { from, to: index });
        tracing::debug!("Selected block {}", index);
        Ok(self.state())
    }

    /// Wake the live countdown up; call once per frame
    pub fn tick(&mut self) -> SessionState {
        match self.phase {
            Phase::Resting { .. } => {
                if let Some(Tick::Finished(outcome)) = self.rest.as_mut().map(Countdown::tick) {
                    self.end_rest(outcome);
                }
            }
            Phase::InBlock { .. } => {
                if let Some(Tick::Finished(_)) = self.amrap.as_mut().map(Countdown::tick) {
                    tracing::info!("AMRAP time up after {} rounds", self.amrap_rounds);
                    self.events.push_back(SessionEvent::AmrapTimeUp {
                        rounds: self.amrap_rounds,
                    });
                }
            }
            Phase::Complete => {}
        }
        self.state()
    }

    pub fn start_amrap(&mut self) -> Result<SessionState, Rejection> {
        let amrap = self.live_amrap()?;
        if amrap.resume() {
            let remaining = amrap.remaining();
            self.events
                .push_back(SessionEvent::AmrapStarted { remaining });
        }
        Ok(self.state())
    }

    pub fn pause_amrap(&mut self) -> Result<SessionState, Rejection> {
        let amrap = self.live_amrap()?;
        if amrap.pause() {
            let remaining = amrap.remaining();
            self.events.push_back(SessionEvent::AmrapPaused { remaining });
        }
        Ok(self.state())
    }

    pub fn amrap_remaining(&self) -> Option<Duration> {
        match self.phase {
            Phase::InBlock { .. } => self.amrap.as_ref().map(Countdown::remaining),
            _ => None,
        }
    }

    pub fn amrap_rounds(&self) -> u32 {
        self.amrap_rounds
    }

    /// Leave the AMRAP block; timer expiry alone never does this
    pub fn complete_amrap(&mut self) -> Result<SessionState, Rejection> {
        let block_index = match self.phase {
            Phase::InBlock { block_index, .. } => block_index,
            Phase::Resting { .. } => return Err(Rejection::NotInBlock),
            Phase::Complete => return Err(Rejection::SessionComplete),
        };
        if self.amrap.is_none() {
            return Err(Rejection::NotAmrap);
        }
        tracing::info!("AMRAP block done with {} rounds", self.amrap_rounds);
        self.advance_to(block_index + 1);
        Ok(self.state())
    }

    /// Finalize a completed session; hands the controller back otherwise
    pub fn finish(self, finished_at: DateTime<Utc>) -> Result<FinishedSession, Self> {
        if self.phase == Phase::Complete {
            Ok(self.finalize(finished_at))
        } else {
            Err(self)
        }
    }

    /// Finalize wherever the session stands
    pub fn end_early(self, finished_at: DateTime<Utc>) -> FinishedSession {
        if self.phase != Phase::Complete {
            tracing::info!("Ending '{}' early", self.session.focus);
        }
        self.finalize(finished_at)
    }

    /// Discard the session without producing a log
    pub fn cancel(mut self) {
        self.cancel_rest();
        if let Some(mut amrap) = self.amrap.take() {
            amrap.cancel();
        }
        tracing::info!("Session '{}' cancelled", self.session.focus);
    }

    fn finalize(mut self, finished_at: DateTime<Utc>) -> FinishedSession {
        self.cancel_rest();
        let log = finalize(
            &self.session.focus,
            std::mem::take(&mut self.logged),
            self.started_at,
            finished_at,
        );
        FinishedSession::new(log)
    }

    fn live_amrap(&mut self) -> Result<&mut Countdown, Rejection> {
        match self.phase {
            Phase::InBlock { .. } => self.amrap.as_mut().ok_or(Rejection::NotAmrap),
            Phase::Resting { .. } => Err(Rejection::NotInBlock),
            Phase::Complete => Err(Rejection::SessionComplete),
        }
    }

    /// Set numbers per exercise keep increasing, even across block jumps
    fn next_set_number(&self, exercise_name: &str, set_number: u32) -> u32 {
        let after_last = self
            .logged
            .iter()
            .find(|e| e.name == exercise_name)
            .and_then(|e| e.sets.last())
            .map(|s| s.set_number() + 1)
            .unwrap_or(1);
        set_number.max(after_last)
    }

    fn record(&mut self, block_index: usize, name: String, set: LoggedSet) {
        self.events.push_back(SessionEvent::SetLogged {
            block_index,
            exercise_name: name.clone(),
            set: set.clone(),
        });
        match self.logged.iter_mut().find(|e| e.name == name) {
            Some(exercise) => exercise.sets.push(set),
            None => self.logged.push(LoggedExercise {
                name,
                sets: vec![set],
            }),
        }
    }

    fn check_pr(&mut self, name: &str, set: &LoggedSet) {
        let Some((weight, reps)) = set.weight_reps() else {
            return;
        };
        if !should_track_pr(name) {
            return;
        }

        let pr = match self.history.exercise(name) {
            Some(history) => detect_pr(name, weight, reps, history),
            None => detect_pr(name, weight, reps, &Default::default()),
        };
        if let Some(pr) = pr {
            let key = format!("{}_{}_{}", name, weight, reps);
            if self.celebrated_prs.insert(key) {
                tracing::info!("{}", pr);
                self.events.push_back(SessionEvent::PersonalRecord(pr));
            }
        }
    }

    fn begin_rest(&mut self, block_index: usize, resume_set: u32, seconds: u32) {
        self.cancel_rest();
        self.rest = Some(Countdown::start(self.clock.clone(), seconds));
        self.phase = Phase::Resting {
            block_index,
            resume_set,
        };
        self.events.push_back(SessionEvent::RestStarted { seconds });
        tracing::debug!("Resting {}s before set {}", seconds, resume_set);
    }

    fn end_rest(&mut self, outcome: CountdownOutcome) {
        let Phase::Resting {
            block_index,
            resume_set,
        } = self.phase
        else {
            return;
        };
        self.rest = None;
        self.phase = Phase::InBlock {
            block_index,
            set_number: resume_set,
        };

        let alert = match outcome {
            CountdownOutcome::Completed
                if self.settings.rest_sound || self.settings.rest_vibration =>
            {
                Some(RestAlert {
                    sound: self.settings.rest_sound,
                    vibration: self.settings.rest_vibration,
                })
            }
            _ => None,
        };
        self.events
            .push_back(SessionEvent::RestFinished { outcome, alert });
        tracing::debug!("Rest finished ({:?})", outcome);
    }

    fn cancel_rest(&mut self) {
        if let Some(mut rest) = self.rest.take() {
            rest.cancel();
        }
    }

    fn enter_block(&mut self, index: usize) {
        if let Some(mut amrap) = self.amrap.take() {
            amrap.cancel();
        }
        self.amrap_rounds = 0;

        if let Some(BlockKind::Amrap { duration_minutes }) =
            self.session.blocks.get(index).map(|b| &b.kind)
        {
            let seconds = (*duration_minutes).max(1).saturating_mul(60);
            self.amrap = Some(Countdown::paused(self.clock.clone(), seconds));
        }
        self.phase = Phase::InBlock {
            block_index: index,
            set_number: 1,
        };
    }

    fn advance_to(&mut self, next: usize) {
        let from = match self.phase {
            Phase::InBlock { block_index, .. } | Phase::Resting { block_index, .. } => block_index,
            Phase::Complete => return,
        };
        self.cancel_rest();

        if next >= self.session.blocks.len() {
            if let Some(mut amrap) = self.amrap.take() {
                amrap.cancel();
            }
            self.phase = Phase::Complete;
            self.events.push_back(SessionEvent::SessionComplete);
            tracing::info!("Session '{}' complete", self.session.focus);
            return;
        }

        self.enter_block(next);
        self.events
            .push_back(SessionEvent::BlockAdvanced { from, to: next });
        tracing::info!("Block {} done, moving to block {}", from, next);
    }
}

impl std::fmt::Debug for SessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionController")
            .field("focus", &self.session.focus)
            .field("state", &self.state())
            .field("logged", &self.logged.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::records::PrKind;
    use crate::{Exercise, LoggedExercise, MetricsTemplate, WorkoutLog};
    use uuid::Uuid;

    fn lift(name: &str, sets: Option<u32>, rest: Option<u32>) -> Exercise {
        Exercise {
            name: name.into(),
            metrics: MetricsTemplate::SetsRepsWeight {
                target_sets: sets,
                target_reps: Some("5".into()),
                rest_period_s: rest,
                one_rep_max_percentage: None,
            },
            rpe: None,
            notes: None,
        }
    }

    fn hold(name: &str) -> Exercise {
        Exercise {
            name: name.into(),
            metrics: MetricsTemplate::SetsDuration {
                target_sets: Some(1),
                target_duration_s: Some(30),
                rest_period_s: None,
            },
            rpe: None,
            notes: None,
        }
    }

    fn block(kind: BlockKind, exercises: Vec<Exercise>) -> Block {
        Block {
            kind,
            title: None,
            notes: None,
            exercises,
        }
    }

    fn session(blocks: Vec<Block>) -> Session {
        Session {
            focus: "Test Day".into(),
            notes: None,
            blocks,
        }
    }

    fn controller(session: Session, clock: &ManualClock) -> SessionController {
        SessionController::new(
            session,
            HistoryIndex::default(),
            SessionSettings::default(),
            clock.shared(),
        )
    }

    fn in_block(block_index: usize, set_number: u32) -> SessionState {
        SessionState::InBlock {
            block_index,
            set_number,
        }
    }

    fn squat_history(weight: f64, reps: u32) -> HistoryIndex {
        HistoryIndex::from_logs(vec![WorkoutLog {
            id: Uuid::new_v4(),
            date: Utc::now() - chrono::Duration::days(3),
            focus: "Legs".into(),
            exercises: vec![LoggedExercise {
                name: "Squat".into(),
                sets: vec![LoggedSet::Srw {
                    set: 1,
                    weight,
                    reps,
                    rpe: None,
                }],
            }],
            duration_minutes: 50,
        }])
    }

    #[test]
    fn test_three_sets_rest_twice_then_advance() {
        crate::logging::init_test();
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![
                block(BlockKind::Single, vec![lift("Squat", Some(3), Some(60))]),
                block(BlockKind::Single, vec![lift("Row", Some(1), None)]),
            ]),
            &clock,
        );
        assert_eq!(c.state(), in_block(0, 1));

        let input = [SetInput::weight_reps(100.0, 5)];
        let mut rests = 0;
        for _ in 0..2 {
            let state = c.log_set(&input).unwrap();
            assert!(matches!(state, SessionState::Resting { .. }));
            rests += 1;
            clock.advance(Duration::from_secs(60));
            c.tick();
        }
        assert_eq!(c.state(), in_block(0, 3));

        // Final set advances straight to the next block
        assert_eq!(c.log_set(&input).unwrap(), in_block(1, 1));
        assert_eq!(rests, 2);

        let events = c.drain_events();
        let rest_starts = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::RestStarted { seconds: 60 }))
            .count();
        assert_eq!(rest_starts, 2);
        assert!(events.contains(&SessionEvent::BlockAdvanced { from: 0, to: 1 }));
    }

    #[test]
    fn test_fewer_sets_increment_in_place_without_auto_rest() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![block(
                BlockKind::Single,
                vec![lift("Squat", Some(3), Some(60))],
            )]),
            &clock,
        );
        c.update_settings(SessionSettings {
            auto_start_rest: false,
            ..SessionSettings::default()
        });

        let input = [SetInput::weight_reps(100.0, 5)];
        assert_eq!(c.log_set(&input).unwrap(), in_block(0, 2));
        assert_eq!(c.log_set(&input).unwrap(), in_block(0, 3));
        assert_eq!(c.log_set(&input).unwrap(), SessionState::Complete);
    }

    #[test]
    fn test_missing_target_sets_defaults_to_one() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![
                block(BlockKind::Single, vec![lift("Curl", None, Some(60))]),
                block(BlockKind::Single, vec![lift("Row", Some(2), None)]),
            ]),
            &clock,
        );

        // One set and no rest after it
        assert_eq!(
            c.log_set(&[SetInput::weight_reps(20.0, 12)]).unwrap(),
            in_block(1, 1)
        );
    }

    #[test]
    fn test_incomplete_inputs_are_rejected_without_change() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![block(
                BlockKind::Superset { rounds: 2 },
                vec![lift("Bench", Some(2), None), hold("Plank")],
            )]),
            &clock,
        );

        let partial = [
            SetInput::WeightReps {
                weight: Some(60.0),
                reps: None,
                rpe: None,
            },
            SetInput::duration(30),
        ];
        assert!(matches!(
            c.log_set(&partial),
            Err(Rejection::InputsIncomplete(_))
        ));
        assert!(matches!(
            c.log_set(&[SetInput::weight_reps(60.0, 8)]),
            Err(Rejection::InputsIncomplete(_))
        ));
        // Wrong kind for a timed exercise
        assert!(matches!(
            c.log_set(&[
                SetInput::weight_reps(60.0, 8),
                SetInput::weight_reps(0.0, 1)
            ]),
            Err(Rejection::InputsIncomplete(_))
        ));

        assert_eq!(c.state(), in_block(0, 1));
        assert!(c.logged_exercises().is_empty());
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn test_superset_uses_rounds_and_trailing_rest() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![block(
                BlockKind::Superset { rounds: 2 },
                vec![lift("Bench", Some(5), None), lift("Row", Some(5), Some(90))],
            )]),
            &clock,
        );
        let inputs = [
            SetInput::weight_reps(60.0, 8),
            SetInput::weight_reps(50.0, 10),
        ];

        let state = c.log_set(&inputs).unwrap();
        assert_eq!(
            state,
            SessionState::Resting {
                block_index: 0,
                resume_set: 2,
                remaining: Duration::from_secs(90),
            }
        );
        c.skip_rest().unwrap();
        assert_eq!(c.log_set(&inputs).unwrap(), SessionState::Complete);
        assert_eq!(c.logged_exercises().len(), 2);
        assert_eq!(c.logged_exercises()[1].sets.len(), 2);
    }

    #[test]
    fn test_rest_add_time_and_skip_at_zero() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![block(
                BlockKind::Single,
                vec![lift("Squat", Some(2), Some(90))],
            )]),
            &clock,
        );
        c.log_set(&[SetInput::weight_reps(100.0, 5)]).unwrap();

        clock.advance(Duration::from_secs(30));
        let before = c.state();
        let after = c.add_rest_time(15).unwrap();
        let remaining = |s: SessionState| match s {
            SessionState::Resting { remaining, .. } => remaining,
            other => panic!("expected rest, got {:?}", other),
        };
        assert_eq!(remaining(after), remaining(before) + Duration::from_secs(15));

        // Remaining hits zero before any tick notices
        clock.advance(Duration::from_secs(200));
        assert_eq!(remaining(c.state()), Duration::ZERO);
        assert_eq!(c.skip_rest().unwrap(), in_block(0, 2));

        let events = c.drain_events();
        assert!(events.contains(&SessionEvent::RestFinished {
            outcome: CountdownOutcome::Skipped,
            alert: None,
        }));
        assert_eq!(c.skip_rest(), Err(Rejection::NotResting));
    }

    #[test]
    fn test_natural_rest_end_carries_alert_settings() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![block(
                BlockKind::Single,
                vec![lift("Squat", Some(2), Some(10))],
            )]),
            &clock,
        );
        c.update_settings(SessionSettings {
            auto_start_rest: true,
            rest_sound: false,
            rest_vibration: true,
        });
        c.log_set(&[SetInput::weight_reps(100.0, 5)]).unwrap();
        c.drain_events();

        clock.advance(Duration::from_secs(10));
        assert_eq!(c.tick(), in_block(0, 2));
        assert_eq!(
            c.drain_events(),
            vec![SessionEvent::RestFinished {
                outcome: CountdownOutcome::Completed,
                alert: Some(RestAlert {
                    sound: false,
                    vibration: true,
                }),
            }]
        );

        // Finished exactly once
        clock.advance(Duration::from_secs(10));
        c.tick();
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn test_rest_finished_and_manual_rest() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![block(
                BlockKind::Single,
                vec![lift("Squat", Some(3), None)],
            )]),
            &clock,
        );
        assert_eq!(c.rest_finished(), Err(Rejection::NotResting));

        c.start_rest(120).unwrap();
        // A second rest replaces the first
        let state = c.start_rest(30).unwrap();
        assert_eq!(
            state,
            SessionState::Resting {
                block_index: 0,
                resume_set: 1,
                remaining: Duration::from_secs(30),
            }
        );
        assert_eq!(c.log_set(&[SetInput::weight_reps(1.0, 1)]), Err(Rejection::NotInBlock));
        assert_eq!(c.rest_finished().unwrap(), in_block(0, 1));
    }

    #[test]
    fn test_skip_and_select_block() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![
                block(BlockKind::Single, vec![lift("A", Some(3), Some(60))]),
                block(BlockKind::Single, vec![lift("B", Some(3), Some(60))]),
                block(BlockKind::Single, vec![lift("C", Some(3), Some(60))]),
            ]),
            &clock,
        );

        c.log_set(&[SetInput::weight_reps(10.0, 10)]).unwrap();
        // Skip works while resting too
        assert_eq!(c.skip().unwrap(), in_block(1, 1));
        assert_eq!(c.select_block(2).unwrap(), in_block(2, 1));
        assert_eq!(
            c.select_block(3),
            Err(Rejection::NoSuchBlock {
                index: 3,
                block_count: 3
            })
        );

        c.select_block(0).unwrap();
        c.log_set(&[SetInput::weight_reps(10.0, 10)]).unwrap();
        c.skip_rest().unwrap();
        c.select_block(0).unwrap();
        c.log_set(&[SetInput::weight_reps(10.0, 10)]).unwrap();

        // Set numbers keep climbing after re-entering the block
        let sets: Vec<u32> = c.logged_exercises()[0]
            .sets
            .iter()
            .map(LoggedSet::set_number)
            .collect();
        assert_eq!(sets, [1, 2, 3]);

        c.skip().unwrap();
        c.skip().unwrap();
        assert_eq!(c.skip().unwrap(), SessionState::Complete);
        assert_eq!(c.skip(), Err(Rejection::SessionComplete));
    }

    #[test]
    fn test_complete_session_cannot_be_reentered() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![block(BlockKind::Single, vec![lift("A", Some(1), Some(60))])]),
            &clock,
        );

        assert_eq!(
            c.log_set(&[SetInput::weight_reps(50.0, 5)]).unwrap(),
            SessionState::Complete
        );
        c.drain_events();

        assert_eq!(c.select_block(0), Err(Rejection::SessionComplete));
        assert_eq!(c.state(), SessionState::Complete);
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn test_amrap_protocol() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![
                block(
                    BlockKind::Amrap {
                        duration_minutes: 2,
                    },
                    vec![lift("Swing", None, Some(30)), hold("Plank")],
                ),
                block(BlockKind::Single, vec![lift("Row", Some(1), None)]),
            ]),
            &clock,
        );
        assert_eq!(c.amrap_remaining(), Some(Duration::from_secs(120)));

        // Nothing counts down until started
        clock.advance(Duration::from_secs(30));
        assert_eq!(c.amrap_remaining(), Some(Duration::from_secs(120)));

        c.start_amrap().unwrap();
        clock.advance(Duration::from_secs(20));
        c.pause_amrap().unwrap();
        clock.advance(Duration::from_secs(60));
        assert_eq!(c.amrap_remaining(), Some(Duration::from_secs(100)));

        let round = [SetInput::weight_reps(24.0, 15), SetInput::duration(30)];
        assert_eq!(c.log_set(&round).unwrap(), in_block(0, 2));
        assert_eq!(c.log_set(&round).unwrap(), in_block(0, 3));

        c.start_amrap().unwrap();
        clock.advance(Duration::from_secs(100));
        // Time up does not advance on its own
        assert_eq!(c.tick(), in_block(0, 3));
        assert!(c
            .drain_events()
            .contains(&SessionEvent::AmrapTimeUp { rounds: 2 }));

        assert_eq!(c.complete_amrap().unwrap(), in_block(1, 1));
        assert_eq!(c.amrap_remaining(), None);
        assert_eq!(c.start_amrap(), Err(Rejection::NotAmrap));
        assert_eq!(c.complete_amrap(), Err(Rejection::NotAmrap));
    }

    #[test]
    fn test_prs_against_history_once_per_combination() {
        let clock = ManualClock::new();
        let mut c = SessionController::new(
            session(vec![block(
                BlockKind::Single,
                vec![lift("Squat", Some(4), None)],
            )]),
            squat_history(100.0, 5),
            SessionSettings::default(),
            clock.shared(),
        );

        let prs = |c: &mut SessionController| -> Vec<PrNotification> {
            c.drain_events()
                .into_iter()
                .filter_map(|e| match e {
                    SessionEvent::PersonalRecord(pr) => Some(pr),
                    _ => None,
                })
                .collect()
        };

        c.log_set(&[SetInput::weight_reps(100.0, 5)]).unwrap();
        assert!(prs(&mut c).is_empty());

        c.log_set(&[SetInput::weight_reps(100.0, 6)]).unwrap();
        let found = prs(&mut c);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, PrKind::RepRecord);
        assert_eq!(found[0].previous_best.map(|p| p.reps), Some(5));

        // Same combination again is not celebrated twice
        c.log_set(&[SetInput::weight_reps(100.0, 6)]).unwrap();
        assert!(prs(&mut c).is_empty());

        c.log_set(&[SetInput::weight_reps(90.0, 20)]).unwrap();
        assert!(prs(&mut c).is_empty());
    }

    #[test]
    fn test_untracked_exercises_raise_no_prs() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![block(
                BlockKind::Single,
                vec![lift("Farmer's Walk", Some(1), None)],
            )]),
            &clock,
        );
        c.log_set(&[SetInput::weight_reps(40.0, 1)]).unwrap();
        assert!(!c
            .drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::PersonalRecord(_))));
    }

    #[test]
    fn test_progress() {
        let clock = ManualClock::new();
        let mut c = controller(
            session(vec![
                block(
                    BlockKind::Superset { rounds: 3 },
                    vec![lift("A", None, None), lift("B", None, None)],
                ),
                block(BlockKind::Single, vec![lift("C", Some(2), None)]),
            ]),
            &clock,
        );

        let progress = c.progress();
        assert_eq!(progress.block_count, 2);
        assert_eq!(progress.target_sets, 3);
        assert_eq!(progress.exercise_total, 3);
        assert_eq!(progress.fraction(), 0.0);

        c.skip().unwrap();
        let progress = c.progress();
        assert_eq!(progress.block_index, 1);
        assert_eq!(progress.target_sets, 2);
        assert!((progress.fraction() - 2.0 / 3.0).abs() < 1e-9);

        c.skip().unwrap();
        assert_eq!(c.progress().fraction(), 1.0);
    }

    #[test]
    fn test_finish_only_when_complete() {
        let clock = ManualClock::new();
        let start = Utc::now();
        let c = controller(
            session(vec![block(
                BlockKind::Single,
                vec![lift("Squat", Some(1), None), lift("Unused", Some(1), None)],
            )]),
            &clock,
        )
        .with_start_time(start);

        let mut c = match c.finish(start) {
            Ok(_) => panic!("finished an incomplete session"),
            Err(c) => c,
        };

        c.log_set(&[
            SetInput::weight_reps(100.0, 5),
            SetInput::weight_reps(10.0, 5),
        ])
        .unwrap();
        let finished = c
            .finish(start + chrono::Duration::milliseconds(125_000))
            .unwrap();

        let log = finished.log();
        assert_eq!(log.focus, "Test Day");
        assert_eq!(log.duration_minutes, 2);
        assert_eq!(log.exercises.len(), 2);
    }

    #[test]
    fn test_end_early_keeps_logged_sets_only() {
        let clock = ManualClock::new();
        let start = Utc::now();
        let mut c = controller(
            session(vec![
                block(BlockKind::Single, vec![lift("Squat", Some(3), None)]),
                block(BlockKind::Single, vec![lift("Row", Some(3), None)]),
            ]),
            &clock,
        )
        .with_start_time(start);
        c.log_set(&[SetInput::weight_reps(100.0, 5)]).unwrap();

        let log = c.end_early(start - chrono::Duration::minutes(1)).into_log();
        assert_eq!(log.exercises.len(), 1);
        assert_eq!(log.exercises[0].name, "Squat");
        assert_eq!(log.duration_minutes, 0);
    }
}
