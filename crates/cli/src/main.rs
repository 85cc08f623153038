use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use controller::{
    format_time, Game, GameConfig, LightSensors, Screen, Settings, StateKind, TickInput,
    DEFAULT_CONFIG_FILE,
};
use records::{leaderboard, ResultsStore, RunRecord};
use sim::{Scenario, SensorArray};

mod play;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ScenarioArg {
    Clean,
    Clumsy,
    Lingering,
    Flicker,
}

impl From<ScenarioArg> for Scenario {
    fn from(s: ScenarioArg) -> Self {
        match s {
            ScenarioArg::Clean => Scenario::Clean,
            ScenarioArg::Clumsy => Scenario::Clumsy,
            ScenarioArg::Lingering => Scenario::Lingering,
            ScenarioArg::Flicker => Scenario::Flicker,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "laser-escape",
    version,
    about = "Run timer and beam-penalty controller for the laser escape prop"
)]
struct Args {
    /// Settings file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Drive a scripted run against simulated sensors and print a JSONL trace
    Simulate {
        #[arg(value_enum, long, default_value = "clumsy")]
        scenario: ScenarioArg,

        /// Length of the timed run in seconds
        #[arg(long, default_value_t = 30.0)]
        seconds: f64,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 20)]
        dt_ms: u64,

        #[arg(long, default_value = "SIM")]
        runner: String,

        /// RNG seed for deterministic sensor noise
        #[arg(long, default_value_t = 12345)]
        seed: u64,

        /// Append the finished run to the results file
        #[arg(long)]
        record: bool,
    },
    /// Interactive prop on the terminal: n = name button, t = timer button,
    /// b<i> = toggle beam i, q = quit; other lines are typed as the name
    Play {
        #[arg(long, default_value_t = 12345)]
        seed: u64,
    },
    /// Show the best run on record
    Best,
    /// Show the fastest runs on record
    History {
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(serde::Serialize)]
struct TraceRow<'a> {
    t_s: f64,
    state: StateKind,
    readings: &'a [f64],
    broken: &'a [bool],
    penalties: u32,
    buzzer: bool,
    top: &'a str,
    bottom: &'a str,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::load(&args.config);
    settings.validate().context("invalid settings")?;
    let store = ResultsStore::new(&settings.results_file);

    match args.command {
        Command::Simulate {
            scenario,
            seconds,
            dt_ms,
            runner,
            seed,
            record,
        } => simulate(
            &settings,
            &store,
            scenario.into(),
            seconds,
            dt_ms,
            &runner,
            seed,
            record,
        ),
        Command::Play { seed } => play::run(&settings, &store, seed),
        Command::Best => {
            match load_best(&store)? {
                Some(r) => println!("{}", describe(&r)),
                None => println!("no record yet"),
            }
            Ok(())
        }
        Command::History { top } => {
            let all = store
                .load()
                .with_context(|| format!("reading {}", store.path().display()))?;
            for (i, r) in leaderboard(&all, top).into_iter().enumerate() {
                println!("{:>2}. {}", i + 1, describe(r));
            }
            Ok(())
        }
    }
}

/// Malformed rows abort startup instead of silently hiding a record.
pub(crate) fn load_best(store: &ResultsStore) -> Result<Option<RunRecord>> {
    store
        .best()
        .with_context(|| format!("reading best record from {}", store.path().display()))
}

fn describe(r: &RunRecord) -> String {
    let mut line = format!(
        "{}  {:<16} {}",
        r.timestamp.format(records::TIMESTAMP_FORMAT),
        r.runner,
        format_time(r.total_s())
    );
    if let (Some(n), Some(unit)) = (r.penalties, r.penalty_unit_s) {
        line.push_str(&format!("  ({} + {n} x {unit}s)", format_time(r.duration_s)));
    }
    line
}

pub(crate) fn print_screen(screen: &Screen) {
    println!("+----------------+ {:?}", screen.backlight);
    println!("|{}|", screen.top());
    println!("|{}|", screen.bottom());
    println!("+----------------+");
}

#[allow(clippy::too_many_arguments)]
fn simulate(
    settings: &Settings,
    store: &ResultsStore,
    scenario: Scenario,
    seconds: f64,
    dt_ms: u64,
    runner: &str,
    seed: u64,
    record: bool,
) -> Result<()> {
    anyhow::ensure!(dt_ms > 0, "--dt-ms must be > 0");
    anyhow::ensure!(seconds > 0.0, "--seconds must be > 0");

    let dt_s = (dt_ms as f64) / 1000.0;
    let start_at = 1.0;
    let stop_at = start_at + seconds;
    let steps = ((stop_at + 1.0) / dt_s).ceil() as u64;

    let best = load_best(store)?.map(|r| r.total_s());
    let mut game = Game::new(GameConfig::from(settings), best);

    let mut sensors = SensorArray::new(settings.beams.count, seed);
    scenario.apply(&mut sensors, start_at);
    log::info!(
        "simulating {:?} with {} beams for {seconds}s",
        scenario,
        sensors.count()
    );

    let name_keys: Vec<char> = runner.chars().chain(std::iter::once('\r')).collect();
    let mut started = false;
    let mut stopped = false;

    for k in 0..steps {
        let t_s = (k as f64) * dt_s;
        let readings = sensors.read(t_s);

        let timer_pressed = if !started && t_s >= start_at {
            started = true;
            true
        } else if started && !stopped && t_s >= stop_at {
            stopped = true;
            true
        } else {
            false
        };

        let out = game.tick(&TickInput {
            now: t_s,
            wall_clock: chrono::Local::now().naive_local(),
            readings: &readings,
            timer_pressed,
            name_pressed: k == 0,
            keys: if k == 1 { &name_keys[..] } else { &[] },
        });

        let row = TraceRow {
            t_s,
            state: out.state,
            readings: &readings,
            broken: &out.broken,
            penalties: out.penalties,
            buzzer: out.buzzer,
            top: out.screen.top(),
            bottom: out.screen.bottom(),
        };
        println!("{}", serde_json::to_string(&row)?);

        if let Some(finished) = out.finished {
            log::info!("finished: {}", describe(&finished));
            if record {
                store
                    .append(&finished)
                    .with_context(|| format!("writing {}", store.path().display()))?;
            }
            // stop early for clarity
            break;
        }
    }

    Ok(())
}
