use serde::Serialize;

use crate::name_entry::NameEntry;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum StateKind {
    Idle,
    NameEntry,
    ReadyToGo,
    Timing,
    JustFinished,
    NewRecord,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FinishedRun {
    pub runner: String,
    pub duration_s: f64,
    pub penalties: u32,
    pub penalty_unit_s: f64,
}

impl FinishedRun {
    pub fn total_s(&self) -> f64 {
        self.duration_s + f64::from(self.penalties) * self.penalty_unit_s
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum GameState {
    /// `last` keeps the previous result on the display until the next runner.
    Idle { last: Option<FinishedRun> },
    NameEntry { entry: NameEntry },
    ReadyToGo { runner: String },
    Timing { runner: String, started_at: f64 },
    JustFinished { result: FinishedRun },
    NewRecord {
        result: FinishedRun,
        flash_on: bool,
        next_flash_at: f64,
    },
}

impl Default for GameState {
    fn default() -> Self {
        GameState::Idle { last: None }
    }
}

impl GameState {
    pub fn kind(&self) -> StateKind {
        match self {
            GameState::Idle { .. } => StateKind::Idle,
            GameState::NameEntry { .. } => StateKind::NameEntry,
            GameState::ReadyToGo { .. } => StateKind::ReadyToGo,
            GameState::Timing { .. } => StateKind::Timing,
            GameState::JustFinished { .. } => StateKind::JustFinished,
            GameState::NewRecord { .. } => StateKind::NewRecord,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    NameButton,
    NameSubmitted(String),
    TimerButton,
    Recorded { new_best: bool },
    FlashElapsed,
}

/// Values a transition may need besides the current state.
#[derive(Clone, Copy, Debug)]
pub struct TransitionCtx {
    pub now: f64,
    pub penalties: u32,
    pub penalty_unit_s: f64,
    pub flash_period_s: f64,
}

/// Returns the next state, or `None` when the event means nothing in `state`.
pub fn transition(state: &GameState, event: &Event, ctx: &TransitionCtx) -> Option<GameState> {
    use GameState as S;

    match (state, event) {
        (S::Idle { .. } | S::JustFinished { .. } | S::NewRecord { .. }, Event::NameButton) => {
            Some(S::NameEntry {
                entry: NameEntry::new(),
            })
        }
        (S::NameEntry { .. }, Event::NameSubmitted(name)) => Some(S::ReadyToGo {
            runner: name.clone(),
        }),
        (S::ReadyToGo { runner }, Event::TimerButton) => Some(S::Timing {
            runner: runner.clone(),
            started_at: ctx.now,
        }),
        (S::Timing { runner, started_at }, Event::TimerButton) => Some(S::JustFinished {
            result: FinishedRun {
                runner: runner.clone(),
                duration_s: (ctx.now - started_at).max(0.0),
                penalties: ctx.penalties,
                penalty_unit_s: ctx.penalty_unit_s,
            },
        }),
        (S::JustFinished { result }, Event::Recorded { new_best: true }) => Some(S::NewRecord {
            result: result.clone(),
            flash_on: true,
            next_flash_at: ctx.now + ctx.flash_period_s,
        }),
        (S::JustFinished { result }, Event::Recorded { new_best: false }) => Some(S::Idle {
            last: Some(result.clone()),
        }),
        (
            S::NewRecord {
                result, flash_on, ..
            },
            Event::FlashElapsed,
        ) => Some(S::NewRecord {
            result: result.clone(),
            flash_on: !flash_on,
            next_flash_at: ctx.now + ctx.flash_period_s,
        }),
        _ => None,
    }
}
