use beams::{evaluate, BeamConfig, BeamTick, PenaltyTracker};
use chrono::NaiveDateTime;
use log::{debug, info};
use records::RunRecord;

use crate::display::{render, Screen, View};
use crate::name_entry::KeyOutcome;
use crate::settings::{PenaltyWindow, Settings};
use crate::state::{transition, Event, GameState, StateKind, TransitionCtx};

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub beam_count: usize,
    pub beams: BeamConfig,
    pub penalty_unit_s: f64,
    pub penalty_window: PenaltyWindow,
    pub flash_period_s: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for GameConfig {
    fn from(s: &Settings) -> Self {
        Self {
            beam_count: s.beams.count,
            beams: s.beams.config(),
            penalty_unit_s: s.timing.penalty_unit_s,
            penalty_window: s.timing.penalty_window,
            flash_period_s: s.timing.flash_period_s,
        }
    }
}

/// Everything the poll loop gathered since the previous tick.
#[derive(Clone, Debug)]
pub struct TickInput<'a> {
    /// Monotonic seconds, never decreasing between ticks.
    pub now: f64,
    /// Stamped on a finished run's record.
    pub wall_clock: NaiveDateTime,
    pub readings: &'a [f64],
    pub timer_pressed: bool,
    pub name_pressed: bool,
    pub keys: &'a [char],
}

#[derive(Clone, Debug)]
pub struct TickOutput {
    pub state: StateKind,
    pub buzzer: bool,
    pub broken: Vec<bool>,
    pub penalties: u32,
    pub screen: Screen,
    /// Set on the tick a run ends; the caller persists it.
    pub finished: Option<RunRecord>,
    pub transitions: Vec<(StateKind, StateKind)>,
}

pub struct Game {
    cfg: GameConfig,
    state: GameState,
    tracker: Option<PenaltyTracker>,
    best_s: Option<f64>,
}

impl Game {
    /// `best_s` is the best penalized total on record, if any.
    pub fn new(cfg: GameConfig, best_s: Option<f64>) -> Self {
        Self {
            cfg,
            state: GameState::default(),
            tracker: None,
            best_s,
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn best_s(&self) -> Option<f64> {
        self.best_s
    }

    pub fn penalties(&self) -> u32 {
        self.tracker.as_ref().map_or(0, |t| t.penalties())
    }

    /// Threshold and cooldown may be retuned live; the penalty state is kept.
    pub fn set_beam_config(&mut self, beams: BeamConfig) {
        self.cfg.beams = beams;
    }

    fn evaluate_beams(&mut self, readings: &[f64], now: f64) -> BeamTick {
        match self.tracker.as_mut() {
            Some(tracker) => {
                let out = tracker.tick(&self.cfg.beams, readings, now);
                for i in &out.tripped {
                    info!("beam {i} tripped, {} penalties", out.penalties);
                }
                out
            }
            // outside the penalty window the beams only drive the buzzer
            None => evaluate(&self.cfg.beams, &vec![now; readings.len()], readings, 0, now),
        }
    }

    fn fire(&mut self, event: Event, now: f64, transitions: &mut Vec<(StateKind, StateKind)>) {
        let ctx = TransitionCtx {
            now,
            penalties: self.penalties(),
            penalty_unit_s: self.cfg.penalty_unit_s,
            flash_period_s: self.cfg.flash_period_s,
        };
        let Some(next) = transition(&self.state, &event, &ctx) else {
            debug!("{:?} ignored in {:?}", event, self.state.kind());
            return;
        };

        let from = self.state.kind();
        let to = next.kind();
        if from != to {
            info!("{from:?} -> {to:?}");
            transitions.push((from, to));
            self.enter(to, now);
        }
        self.state = next;
    }

    fn enter(&mut self, to: StateKind, now: f64) {
        let n = self.cfg.beam_count;
        match (to, self.cfg.penalty_window) {
            (StateKind::ReadyToGo, PenaltyWindow::Armed) => {
                self.tracker = Some(PenaltyTracker::new(n, now));
            }
            (StateKind::Timing, PenaltyWindow::Timing) => {
                self.tracker = Some(PenaltyTracker::new(n, now));
            }
            (StateKind::Timing, PenaltyWindow::Armed) => {
                if self.tracker.is_none() {
                    self.tracker = Some(PenaltyTracker::new(n, now));
                }
            }
            _ => self.tracker = None,
        }
    }

    /// Advance the game by one poll.
    ///
    /// Panics if `input.readings` does not hold one reading per configured beam.
    pub fn tick(&mut self, input: &TickInput<'_>) -> TickOutput {
        assert_eq!(
            input.readings.len(),
            self.cfg.beam_count,
            "one reading is required per configured beam"
        );
        let now = input.now;
        let mut transitions = Vec::new();
        let mut finished = None;

        let beams = self.evaluate_beams(input.readings, now);

        if input.name_pressed {
            self.fire(Event::NameButton, now, &mut transitions);
        }
        if input.timer_pressed {
            self.fire(Event::TimerButton, now, &mut transitions);
        }

        let mut submitted = None;
        if let GameState::NameEntry { entry } = &mut self.state {
            for key in input.keys {
                if let KeyOutcome::Submitted(name) = entry.push(*key) {
                    submitted = Some(name);
                    break;
                }
            }
        }
        if let Some(name) = submitted {
            self.fire(Event::NameSubmitted(name), now, &mut transitions);
        }

        // penalties are read from the tracker before the run state is dropped
        let penalties = match &self.state {
            GameState::JustFinished { result } => result.penalties,
            _ => self.penalties(),
        };

        if let GameState::JustFinished { result } = &self.state {
            let total = result.total_s();
            let new_best = self.best_s.map_or(true, |best| total < best);
            if new_best {
                info!("new best time {total:.2}s by {:?}", result.runner);
                self.best_s = Some(total);
            }
            finished = Some(RunRecord {
                timestamp: input.wall_clock,
                runner: result.runner.clone(),
                duration_s: result.duration_s,
                penalties: Some(result.penalties),
                penalty_unit_s: Some(result.penalty_unit_s),
            });
            self.fire(Event::Recorded { new_best }, now, &mut transitions);
        }

        if let GameState::NewRecord { next_flash_at, .. } = &self.state {
            if now >= *next_flash_at {
                self.fire(Event::FlashElapsed, now, &mut transitions);
            }
        }

        let any_broken = beams.any_broken();
        let screen = render(
            &self.state,
            &View {
                now,
                any_broken,
                penalties,
                best_s: self.best_s,
            },
        );

        TickOutput {
            state: self.state.kind(),
            buzzer: any_broken,
            broken: beams.broken,
            penalties,
            screen,
            finished,
            transitions,
        }
    }
}
