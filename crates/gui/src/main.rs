use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

use beams::BeamConfig;
use controller::{
    Backlight, Buzzer, Display, Game, GameConfig, Prop, Screen, Settings, TickOutput,
    DEFAULT_CONFIG_FILE,
};
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};
use records::ResultsStore;
use serde::Deserialize;
use sim::{Scenario, SensorArray};

/// Seconds of live history kept for the plot.
const LIVE_WINDOW_S: f64 = 120.0;

#[derive(Clone, Debug, PartialEq)]
struct Sample {
    t: f64,
    penalties: u32,
    broken: usize,
}

/// Appends `sample` and drops everything older than `window_s` before it.
fn push_windowed(samples: &mut VecDeque<Sample>, sample: Sample, window_s: f64) {
    let cutoff = sample.t - window_s;
    samples.push_back(sample);
    while samples.front().is_some_and(|s| s.t < cutoff) {
        samples.pop_front();
    }
}

/// One line of `laser-escape simulate` output.
#[derive(Debug, Deserialize)]
struct CliLine {
    t_s: f64,
    state: String,
    broken: Vec<bool>,
    penalties: u32,
    buzzer: bool,
    top: String,
    bottom: String,
}

#[derive(Clone, Debug)]
struct ReplayFrame {
    sample: Sample,
    state: String,
    buzzer: bool,
    top: String,
    bottom: String,
    broken: Vec<bool>,
}

#[derive(Default)]
struct PanelDisplay {
    screen: Option<Screen>,
}

impl Display for PanelDisplay {
    fn show(&mut self, screen: &Screen) {
        self.screen = Some(screen.clone());
    }
}

#[derive(Default)]
struct PanelBuzzer {
    on: bool,
}

impl Buzzer for PanelBuzzer {
    fn set(&mut self, on: bool) {
        self.on = on;
    }
}

type PanelProp = Prop<SensorArray, PanelDisplay, PanelBuzzer>;

struct App {
    // Settings
    settings: Settings,
    threshold: f64,
    cooldown_s: f64,
    scenario: Scenario,
    seed: u64,

    // Live prop
    prop: PanelProp,
    store: ResultsStore,
    clock: Instant,
    name_text: String,
    pending_keys: Vec<char>,
    last: Option<TickOutput>,

    // Data shown in plots
    samples: VecDeque<Sample>,

    // Replay
    replay_loaded: bool,
    replay_path: String,
    replay_all: Vec<ReplayFrame>,
    replay_pos: usize,
    replay_playing: bool,
    replay_speed: usize, // frames per repaint
    last_error: Option<String>,
}

fn build_prop(settings: &Settings, best_s: Option<f64>, seed: u64) -> PanelProp {
    Prop::new(
        Game::new(GameConfig::from(settings), best_s),
        SensorArray::new(settings.beams.count, seed),
        PanelDisplay::default(),
        PanelBuzzer::default(),
    )
}

impl App {
    fn new(settings: Settings) -> Self {
        let store = ResultsStore::new(&settings.results_file);
        let seed = 12345;

        // a broken results file should not keep the panel from starting
        let (best, last_error) = match store.best() {
            Ok(best) => (best.map(|r| r.total_s()), None),
            Err(e) => {
                log::error!("{e}");
                (None, Some(format!("Results file unreadable: {e}")))
            }
        };

        Self {
            threshold: settings.beams.threshold,
            cooldown_s: settings.beams.cooldown_s,
            scenario: Scenario::Clean,
            seed,
            prop: build_prop(&settings, best, seed),
            settings,
            store,
            clock: Instant::now(),
            name_text: String::new(),
            pending_keys: Vec::new(),
            last: None,
            samples: VecDeque::new(),
            replay_loaded: false,
            replay_path: "out/demo_clumsy.jsonl".to_string(),
            replay_all: Vec::new(),
            replay_pos: 0,
            replay_playing: false,
            replay_speed: 5,
            last_error,
        }
    }

    fn now(&self) -> f64 {
        self.clock.elapsed().as_secs_f64()
    }

    fn clear_replay(&mut self) {
        self.replay_loaded = false;
        self.replay_all.clear();
        self.replay_pos = 0;
        self.replay_playing = false;
    }

    fn reset_live(&mut self) {
        let best = self.prop.game().best_s();
        self.prop = build_prop(&self.settings, best, self.seed);
        self.apply_beam_config();
        self.clock = Instant::now();
        self.samples.clear();
        self.pending_keys.clear();
        self.last = None;
    }

    fn apply_beam_config(&mut self) {
        self.prop.game_mut().set_beam_config(BeamConfig {
            threshold: self.threshold,
            cooldown_s: self.cooldown_s,
        });
    }

    fn apply_scenario(&mut self) {
        let now = self.now();
        self.scenario.apply(self.prop.sensors_mut(), now);
    }

    fn poll_live(&mut self) {
        let keys = std::mem::take(&mut self.pending_keys);
        let now = self.now();
        let out = self
            .prop
            .poll(now, chrono::Local::now().naive_local(), &keys);

        if let Some(record) = &out.finished {
            if let Err(e) = self.store.append(record) {
                self.last_error = Some(format!("Failed to save run: {e}"));
            }
        }

        push_windowed(
            &mut self.samples,
            Sample {
                t: now,
                penalties: out.penalties,
                broken: out.broken.iter().filter(|b| **b).count(),
            },
            LIVE_WINDOW_S,
        );
        self.last = Some(out);
    }

    fn load_jsonl(&mut self, path: &str) {
        self.last_error = None;

        let text = match fs::read_to_string(path) {
            Ok(t) => t,
            Err(e) => {
                self.last_error = Some(format!("Failed to read {path}: {e}"));
                return;
            }
        };

        let mut loaded = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let row: CliLine = match serde_json::from_str(line) {
                Ok(v) => v,
                Err(e) => {
                    self.last_error = Some(format!("JSON parse error at line {}: {}", i + 1, e));
                    return;
                }
            };

            loaded.push(ReplayFrame {
                sample: Sample {
                    t: row.t_s,
                    penalties: row.penalties,
                    broken: row.broken.iter().filter(|b| **b).count(),
                },
                state: row.state,
                buzzer: row.buzzer,
                top: row.top,
                bottom: row.bottom,
                broken: row.broken,
            });
        }

        if loaded.is_empty() {
            self.last_error = Some(format!("No frames found in {path}"));
            return;
        }

        self.clear_replay();
        self.replay_loaded = true;
        self.replay_all = loaded;
        self.samples.clear();
        self.do_step_replay();
    }

    fn do_step_replay(&mut self) {
        if self.replay_pos >= self.replay_all.len() {
            self.replay_playing = false;
            return;
        }
        self.samples
            .push_back(self.replay_all[self.replay_pos].sample.clone());
        self.replay_pos += 1;
    }

    fn replay_tick(&mut self) {
        if !(self.replay_loaded && self.replay_playing) {
            return;
        }
        for _ in 0..self.replay_speed.max(1) {
            self.do_step_replay();
        }
    }

    fn replay_frame(&self) -> Option<&ReplayFrame> {
        self.replay_pos
            .checked_sub(1)
            .and_then(|i| self.replay_all.get(i))
    }
}

fn tint(backlight: Backlight) -> egui::Color32 {
    let (r, g, b) = backlight.rgb();
    egui::Color32::from_rgb(50 + 170 * r, 50 + 170 * g, 50 + 170 * b)
}

fn lcd(ui: &mut egui::Ui, top: &str, bottom: &str, backlight: Backlight) {
    egui::Frame::none()
        .fill(tint(backlight))
        .inner_margin(10.0)
        .rounding(4.0)
        .show(ui, |ui| {
            for row in [top, bottom] {
                ui.label(
                    egui::RichText::new(row)
                        .monospace()
                        .size(26.0)
                        .color(egui::Color32::BLACK),
                );
            }
        });
}

fn replay_backlight(frame: &ReplayFrame) -> Backlight {
    match frame.state.as_str() {
        "ReadyToGo" | "Timing" if frame.buzzer => Backlight::Red,
        "ReadyToGo" => Backlight::Yellow,
        "Timing" => Backlight::Green,
        "NewRecord" => Backlight::Purple,
        _ => Backlight::White,
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.replay_loaded {
            self.replay_tick();
            if self.replay_playing {
                ctx.request_repaint();
            }
        } else {
            self.poll_live();
            ctx.request_repaint_after(Duration::from_millis(self.settings.timing.tick_ms));
        }

        let mode_txt = if self.replay_loaded { "REPLAY" } else { "LIVE" };
        let (buzzer, state_txt, penalties) = match (self.replay_loaded, &self.last) {
            (true, _) => self
                .replay_frame()
                .map(|f| (f.buzzer, f.state.clone(), f.sample.penalties))
                .unwrap_or((false, "-".to_string(), 0)),
            (false, Some(out)) => (out.buzzer, format!("{:?}", out.state), out.penalties),
            (false, None) => (false, "-".to_string(), 0),
        };

        egui::TopBottomPanel::top("top").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Laser Escape Panel");
                ui.separator();
                ui.label(format!("MODE: {mode_txt}"));
                ui.separator();
                ui.label(format!("STATE: {state_txt}"));
                ui.separator();

                let (label, color) = if buzzer {
                    ("BUZZER: ON", egui::Color32::RED)
                } else {
                    ("BUZZER: off", egui::Color32::GREEN)
                };
                ui.colored_label(color, label);
                ui.separator();
                ui.label(format!("penalties = {penalties}"));

                if let Some(best) = self.prop.game().best_s() {
                    ui.separator();
                    ui.label(format!("best = {}", controller::format_time(best)));
                }
            });
        });

        egui::SidePanel::left("left")
            .resizable(false)
            .show(ctx, |ui| {
                let live_enabled = !self.replay_loaded;

                ui.label("Buttons");
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(live_enabled, egui::Button::new("NAME"))
                        .clicked()
                    {
                        self.prop.name_button().press();
                    }
                    if ui
                        .add_enabled(live_enabled, egui::Button::new("TIMER"))
                        .clicked()
                    {
                        self.prop.timer_button().press();
                    }
                });

                ui.horizontal(|ui| {
                    ui.label("name:");
                    let resp = ui.add_enabled(
                        live_enabled,
                        egui::TextEdit::singleline(&mut self.name_text).desired_width(120.0),
                    );
                    let submitted =
                        resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if (ui.button("Enter").clicked() || submitted) && live_enabled {
                        self.pending_keys.extend(self.name_text.drain(..));
                        self.pending_keys.push('\r');
                    }
                });

                ui.separator();
                ui.label("Beams (click to block)");
                let blocked_now: Vec<bool> = match (&self.last, self.replay_frame()) {
                    (_, Some(f)) if self.replay_loaded => f.broken.clone(),
                    (Some(out), _) => out.broken.clone(),
                    _ => Vec::new(),
                };
                ui.horizontal_wrapped(|ui| {
                    for i in 0..self.settings.beams.count {
                        let broken = blocked_now.get(i).copied().unwrap_or(false);
                        let fill = if broken {
                            egui::Color32::DARK_RED
                        } else {
                            egui::Color32::DARK_GREEN
                        };
                        let btn = egui::Button::new(format!("{i}")).fill(fill);
                        if ui.add_enabled(live_enabled, btn).clicked() {
                            self.prop.sensors_mut().toggle(i);
                        }
                    }
                });

                ui.separator();
                ui.label("Scenario");
                let mut scenario_new = self.scenario;
                egui::ComboBox::from_id_salt("scenario")
                    .selected_text(self.scenario.label())
                    .show_ui(ui, |ui| {
                        for s in Scenario::ALL {
                            ui.selectable_value(&mut scenario_new, s, s.label());
                        }
                    });
                if scenario_new != self.scenario {
                    self.scenario = scenario_new;
                }
                if ui
                    .add_enabled(live_enabled, egui::Button::new("Apply scenario now"))
                    .clicked()
                {
                    self.apply_scenario();
                }

                ui.separator();
                ui.label("Beam settings");
                let t = ui.add_enabled(
                    live_enabled,
                    egui::Slider::new(&mut self.threshold, 0.0..=1.0).text("threshold"),
                );
                let c = ui.add_enabled(
                    live_enabled,
                    egui::Slider::new(&mut self.cooldown_s, 0.5..=15.0).text("cooldown (s)"),
                );
                if t.changed() || c.changed() {
                    self.apply_beam_config();
                }
                ui.add_enabled(
                    live_enabled,
                    egui::DragValue::new(&mut self.seed).prefix("seed: "),
                );

                ui.horizontal(|ui| {
                    if ui.button("Reset").clicked() {
                        self.clear_replay();
                        self.reset_live();
                    }
                });

                ui.separator();
                ui.label("Replay (JSONL)");
                ui.horizontal(|ui| {
                    ui.label("path:");
                    ui.text_edit_singleline(&mut self.replay_path);
                });

                ui.horizontal(|ui| {
                    if ui.button("Load").clicked() {
                        let p = self.replay_path.clone();
                        self.load_jsonl(&p);
                    }

                    if ui
                        .button(if self.replay_playing {
                            "Pause replay"
                        } else {
                            "Play replay"
                        })
                        .clicked()
                        && self.replay_loaded
                    {
                        self.replay_playing = !self.replay_playing;
                        ctx.request_repaint();
                    }

                    if ui.button("Step replay").clicked() && self.replay_loaded {
                        self.do_step_replay();
                    }
                });

                ui.add(
                    egui::Slider::new(&mut self.replay_speed, 1..=100)
                        .text("replay speed (frames/repaint)"),
                );

                if self.replay_loaded {
                    ui.small(format!(
                        "Loaded: {}/{} frames",
                        self.replay_pos,
                        self.replay_all.len()
                    ));
                    if ui.button("Back to live").clicked() {
                        self.clear_replay();
                        self.reset_live();
                    }
                } else {
                    ui.small("No replay loaded.");
                }

                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(egui::Color32::RED, err);
                }

                ui.separator();
                ui.small("Tip: laser-escape simulate > out/demo_clumsy.jsonl, then Load.");
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            match (self.replay_loaded, self.replay_frame(), &self.prop.display().screen) {
                (true, Some(f), _) => lcd(ui, &f.top, &f.bottom, replay_backlight(f)),
                (false, _, Some(screen)) => {
                    lcd(ui, screen.top(), screen.bottom(), screen.backlight)
                }
                _ => {
                    ui.label("No screen yet.");
                }
            }

            ui.separator();
            if self.samples.is_empty() {
                ui.label("No data yet.");
                return;
            }

            let penalty_points: PlotPoints = self
                .samples
                .iter()
                .map(|s| [s.t, s.penalties as f64])
                .collect();
            let broken_points: PlotPoints = self
                .samples
                .iter()
                .map(|s| [s.t, s.broken as f64])
                .collect();

            ui.heading("Beams");
            Plot::new("beam_plot").height(240.0).show(ui, |plot_ui| {
                plot_ui.line(Line::new(penalty_points).name("Penalties"));
                plot_ui.line(Line::new(broken_points).name("Beams broken"));
            });
        });
    }
}

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::load(Path::new(DEFAULT_CONFIG_FILE));
    if let Err(e) = settings.validate() {
        log::error!("invalid settings: {e}");
        std::process::exit(1);
    }

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "Laser Escape Panel",
        native_options,
        Box::new(|_cc| Ok(Box::new(App::new(settings)))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64) -> Sample {
        Sample {
            t,
            penalties: 0,
            broken: 0,
        }
    }

    #[test]
    fn live_history_keeps_only_the_window() {
        let mut samples = VecDeque::new();
        for k in 0..1000 {
            push_windowed(&mut samples, sample(k as f64 * 0.5), 10.0);
        }
        // last push at 499.5, so 489.5..=499.5 survives
        assert_eq!(samples.len(), 21);
        assert_eq!(samples.front().map(|s| s.t), Some(489.5));
        assert_eq!(samples.back().map(|s| s.t), Some(499.5));
    }

    #[test]
    fn short_history_is_untouched() {
        let mut samples = VecDeque::new();
        push_windowed(&mut samples, sample(1.0), 10.0);
        push_windowed(&mut samples, sample(2.0), 10.0);
        assert_eq!(samples, VecDeque::from(vec![sample(1.0), sample(2.0)]));
    }
}
