use chrono::NaiveDateTime;

use crate::display::Screen;
use crate::game::{Game, TickInput, TickOutput};
use crate::latch::ButtonLatch;

/// Light-dependent resistors along the beam path.
pub trait LightSensors {
    fn count(&self) -> usize;
    /// One reading in [0, 1] per sensor, lower meaning darker.
    fn read(&mut self, now: f64) -> Vec<f64>;
}

pub trait Display {
    fn show(&mut self, screen: &Screen);
}

pub trait Buzzer {
    fn set(&mut self, on: bool);
}

/// The physical prop: a game wired to its sensors, screen and buzzer.
///
/// Buttons are latched from whatever thread sees them and consumed once per
/// `poll`. The display and buzzer are only written when their value changes.
pub struct Prop<S, D, B> {
    game: Game,
    sensors: S,
    display: D,
    buzzer: B,
    timer: ButtonLatch,
    name: ButtonLatch,
    shown: Option<Screen>,
    buzzing: bool,
}

impl<S: LightSensors, D: Display, B: Buzzer> Prop<S, D, B> {
    pub fn new(game: Game, sensors: S, display: D, buzzer: B) -> Self {
        Self {
            game,
            sensors,
            display,
            buzzer,
            timer: ButtonLatch::new(),
            name: ButtonLatch::new(),
            shown: None,
            buzzing: false,
        }
    }

    pub fn timer_button(&self) -> ButtonLatch {
        self.timer.clone()
    }

    pub fn name_button(&self) -> ButtonLatch {
        self.name.clone()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn game_mut(&mut self) -> &mut Game {
        &mut self.game
    }

    pub fn sensors_mut(&mut self) -> &mut S {
        &mut self.sensors
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn buzzer(&self) -> &B {
        &self.buzzer
    }

    pub fn poll(&mut self, now: f64, wall_clock: NaiveDateTime, keys: &[char]) -> TickOutput {
        let readings = self.sensors.read(now);
        let out = self.game.tick(&TickInput {
            now,
            wall_clock,
            readings: &readings,
            timer_pressed: self.timer.take(),
            name_pressed: self.name.take(),
            keys,
        });

        if self.shown.as_ref() != Some(&out.screen) {
            self.display.show(&out.screen);
            self.shown = Some(out.screen.clone());
        }
        if out.buzzer != self.buzzing {
            self.buzzer.set(out.buzzer);
            self.buzzing = out.buzzer;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::GameConfig;
    use crate::state::StateKind;
    use chrono::NaiveDate;

    struct FixedSensors(Vec<f64>);

    impl LightSensors for FixedSensors {
        fn count(&self) -> usize {
            self.0.len()
        }

        fn read(&mut self, _now: f64) -> Vec<f64> {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct Frames(Vec<Screen>);

    impl Display for Frames {
        fn show(&mut self, screen: &Screen) {
            self.0.push(screen.clone());
        }
    }

    #[derive(Default)]
    struct Edges(Vec<bool>);

    impl Buzzer for Edges {
        fn set(&mut self, on: bool) {
            self.0.push(on);
        }
    }

    fn wall() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn prop() -> Prop<FixedSensors, Frames, Edges> {
        let cfg = GameConfig {
            beam_count: 2,
            ..GameConfig::default()
        };
        Prop::new(
            Game::new(cfg, None),
            FixedSensors(vec![0.9, 0.9]),
            Frames::default(),
            Edges::default(),
        )
    }

    #[test]
    fn unchanged_screen_is_written_once() {
        let mut p = prop();
        for i in 0..5 {
            p.poll(i as f64 * 0.02, wall(), &[]);
        }
        assert_eq!(p.display().0.len(), 1);
        assert!(p.buzzer().0.is_empty());
    }

    #[test]
    fn buzzer_follows_beam_edges() {
        let mut p = prop();
        p.poll(0.0, wall(), &[]);
        p.sensors_mut().0[1] = 0.05;
        p.poll(0.1, wall(), &[]);
        p.poll(0.2, wall(), &[]);
        p.sensors_mut().0[1] = 0.9;
        p.poll(0.3, wall(), &[]);
        assert_eq!(p.buzzer().0, vec![true, false]);
    }

    #[test]
    fn latched_presses_are_consumed_by_one_poll() {
        let mut p = prop();
        let name = p.name_button();
        name.press();
        let out = p.poll(0.0, wall(), &[]);
        assert_eq!(out.state, StateKind::NameEntry);
        assert!(!name.take());

        let out = p.poll(0.1, wall(), &['j', 'o', '\r']);
        assert_eq!(out.state, StateKind::ReadyToGo);

        let timer = p.timer_button();
        timer.press();
        let out = p.poll(0.2, wall(), &[]);
        assert_eq!(out.state, StateKind::Timing);
        let out = p.poll(0.3, wall(), &[]);
        assert_eq!(out.state, StateKind::Timing);
    }
}
