//! Game logic for the laser escape prop: state machine, screen, buttons and
//! the poll loop that ties them to the hardware.

pub mod display;
pub mod game;
pub mod latch;
pub mod name_entry;
pub mod prop;
pub mod settings;
pub mod state;

pub use display::{format_time, render, Backlight, Screen, View, LCD_COLS};
pub use game::{Game, GameConfig, TickInput, TickOutput};
pub use latch::ButtonLatch;
pub use name_entry::{KeyOutcome, NameEntry};
pub use prop::{Buzzer, Display, LightSensors, Prop};
pub use settings::{PenaltyWindow, Settings, SettingsError, DEFAULT_CONFIG_FILE};
pub use state::{transition, Event, FinishedRun, GameState, StateKind, TransitionCtx};
