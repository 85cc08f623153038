use crate::state::{FinishedRun, GameState};

pub const LCD_COLS: usize = 16;
const BADGE_COL: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backlight {
    White,
    Yellow,
    Green,
    Red,
    Purple,
    Blue,
}

impl Backlight {
    /// On/off per RGB channel, as the plate's backlight takes it.
    pub fn rgb(self) -> (u8, u8, u8) {
        match self {
            Backlight::White => (1, 1, 1),
            Backlight::Yellow => (1, 1, 0),
            Backlight::Green => (0, 1, 0),
            Backlight::Red => (1, 0, 0),
            Backlight::Purple => (1, 0, 1),
            Backlight::Blue => (0, 0, 1),
        }
    }
}

/// One frame of the 16x2 character display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screen {
    pub rows: [String; 2],
    pub backlight: Backlight,
}

impl Screen {
    pub fn new(top: &str, bottom: &str, backlight: Backlight) -> Self {
        Self {
            rows: [fit(top), fit(bottom)],
            backlight,
        }
    }

    pub fn top(&self) -> &str {
        &self.rows[0]
    }

    pub fn bottom(&self) -> &str {
        &self.rows[1]
    }
}

fn fit(text: &str) -> String {
    let mut row: String = text.chars().take(LCD_COLS).collect();
    let len = row.chars().count();
    row.extend(std::iter::repeat(' ').take(LCD_COLS - len));
    row
}

/// Writes `text` over `row` starting at column `col`.
fn overlay(row: &str, col: usize, text: &str) -> String {
    let mut cells: Vec<char> = fit(row).chars().collect();
    for (i, c) in text.chars().enumerate() {
        if let Some(cell) = cells.get_mut(col + i) {
            *cell = c;
        }
    }
    cells.into_iter().collect()
}

/// `MM:SS.d` with tenths truncated; hours are dropped like the prop's display.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "00:00.0".to_string();
    }
    let tenths = (seconds * 10.0).floor() as u64;
    let minutes = (tenths / 600) % 60;
    let secs = (tenths / 10) % 60;
    format!("{:02}:{:02}.{}", minutes, secs, tenths % 10)
}

/// Everything besides the state that shows up on screen.
#[derive(Clone, Copy, Debug)]
pub struct View {
    pub now: f64,
    pub any_broken: bool,
    pub penalties: u32,
    pub best_s: Option<f64>,
}

fn result_screen(result: &FinishedRun, backlight: Backlight) -> Screen {
    Screen::new(&format_time(result.total_s()), &result.runner, backlight)
}

pub fn render(state: &GameState, view: &View) -> Screen {
    let alarm = |normal: Backlight| if view.any_broken { Backlight::Red } else { normal };

    match state {
        GameState::Idle { last: Some(result) } => result_screen(result, Backlight::White),
        GameState::Idle { last: None } => {
            let best = view
                .best_s
                .map(|b| format!("BEST {}", format_time(b)))
                .unwrap_or_default();
            Screen::new("READY FOR RUNNER", &best, Backlight::White)
        }
        GameState::NameEntry { entry } => Screen::new("NAME?", entry.name(), Backlight::White),
        GameState::ReadyToGo { runner } => {
            Screen::new(&format_time(0.0), runner, alarm(Backlight::Yellow))
        }
        GameState::Timing { runner, started_at } => {
            let mut top = format_time(view.now - started_at);
            if view.penalties > 0 {
                top.push_str(&format!(" +{}", view.penalties));
            }
            Screen::new(&top, runner, alarm(Backlight::Green))
        }
        GameState::JustFinished { result } => result_screen(result, Backlight::White),
        GameState::NewRecord {
            result, flash_on, ..
        } => {
            let base = result_screen(result, Backlight::Purple);
            Screen {
                rows: [
                    overlay(base.top(), BADGE_COL, "NEW"),
                    overlay(base.bottom(), BADGE_COL, "RECORD"),
                ],
                backlight: if *flash_on {
                    Backlight::Purple
                } else {
                    Backlight::Blue
                },
            }
        }
    }
}
