use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use controller::{ButtonLatch, Buzzer, Display, Game, GameConfig, Prop, Screen, Settings};
use log::{error, info, warn};
use records::ResultsStore;
use sim::SensorArray;

enum Line {
    Beam(usize),
    Text(String),
    Quit,
}

struct Terminal;

impl Display for Terminal {
    fn show(&mut self, screen: &Screen) {
        crate::print_screen(screen);
    }
}

struct LogBuzzer;

impl Buzzer for LogBuzzer {
    fn set(&mut self, on: bool) {
        info!("buzzer {}", if on { "ON" } else { "off" });
    }
}

/// Button lines go straight to the latches; everything else is queued for
/// the poll loop.
fn spawn_stdin(timer: ButtonLatch, name: ButtonLatch) -> Receiver<Line> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let msg = match line.trim() {
                "t" => {
                    timer.press();
                    continue;
                }
                "n" => {
                    name.press();
                    continue;
                }
                "q" => Line::Quit,
                cmd if cmd.starts_with('b') && cmd.len() > 1 => match cmd[1..].parse() {
                    Ok(i) => Line::Beam(i),
                    Err(_) => Line::Text(line.clone()),
                },
                _ => Line::Text(line.clone()),
            };
            if tx.send(msg).is_err() {
                return;
            }
        }
        let _ = tx.send(Line::Quit);
    });
    rx
}

pub fn run(settings: &Settings, store: &ResultsStore, seed: u64) -> Result<()> {
    let best = crate::load_best(store)?.map(|r| r.total_s());
    let game = Game::new(GameConfig::from(settings), best);
    let sensors = SensorArray::new(settings.beams.count, seed);
    let mut prop = Prop::new(game, sensors, Terminal, LogBuzzer);

    let rx = spawn_stdin(prop.timer_button(), prop.name_button());
    let tick = Duration::from_millis(settings.timing.tick_ms);
    let start = Instant::now();

    println!("n = name button, t = timer button, b<i> = toggle beam i, q = quit");

    loop {
        let mut keys = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(Line::Beam(i)) => match prop.sensors_mut().toggle(i) {
                    Some(blocked) => info!("beam {i} {}", if blocked { "blocked" } else { "clear" }),
                    None => warn!("no beam {i}"),
                },
                Ok(Line::Text(text)) => {
                    keys.extend(text.chars());
                    keys.push('\r');
                }
                Ok(Line::Quit) | Err(TryRecvError::Disconnected) => return Ok(()),
                Err(TryRecvError::Empty) => break,
            }
        }

        let now = start.elapsed().as_secs_f64();
        let out = prop.poll(now, chrono::Local::now().naive_local(), &keys);

        if let Some(record) = out.finished {
            if let Err(e) = store.append(&record) {
                error!("failed to save run for {:?}: {e}", record.runner);
            }
        }

        thread::sleep(tick);
    }
}
