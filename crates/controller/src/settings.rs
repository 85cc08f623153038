use std::io;
use std::path::{Path, PathBuf};

use beams::BeamConfig;
use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_FILE: &str = "laser-escape.toml";

#[derive(Debug, Error, PartialEq)]
pub enum SettingsError {
    #[error("beams.count must be > 0")]
    NoBeams,
    #[error("beams.threshold must be within [0, 1], got {0}")]
    Threshold(f64),
    #[error("beams.cooldown_s must be > 0, got {0}")]
    Cooldown(f64),
    #[error("timing.penalty_unit_s must be >= 0, got {0}")]
    PenaltyUnit(f64),
    #[error("timing.tick_ms must be > 0")]
    Tick,
    #[error("timing.flash_period_s must be > 0, got {0}")]
    FlashPeriod(f64),
}

/// When beam trips start costing the runner time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PenaltyWindow {
    /// Only while the clock runs.
    #[default]
    Timing,
    /// From the moment the runner is armed, carried into the timed run.
    Armed,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BeamSettings {
    pub count: usize,
    pub threshold: f64,
    pub cooldown_s: f64,
}

impl Default for BeamSettings {
    fn default() -> Self {
        let cfg = BeamConfig::default();
        Self {
            count: 9,
            threshold: cfg.threshold,
            cooldown_s: cfg.cooldown_s,
        }
    }
}

impl BeamSettings {
    pub fn config(&self) -> BeamConfig {
        BeamConfig {
            threshold: self.threshold,
            cooldown_s: self.cooldown_s,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub tick_ms: u64,
    /// Seconds added to the final time per counted trip.
    pub penalty_unit_s: f64,
    pub penalty_window: PenaltyWindow,
    pub flash_period_s: f64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            tick_ms: 20,
            penalty_unit_s: 5.0,
            penalty_window: PenaltyWindow::Timing,
            flash_period_s: 0.25,
        }
    }
}

/// Top-level settings, loaded from `laser-escape.toml`.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub results_file: PathBuf,
    pub beams: BeamSettings,
    pub timing: TimingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            results_file: PathBuf::from("times.csv"),
            beams: BeamSettings::default(),
            timing: TimingSettings::default(),
        }
    }
}

impl Settings {
    /// Load from `path` if it exists, then apply environment overrides.
    pub fn load(path: &Path) -> Self {
        let mut settings = match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str::<Settings>(&content) {
                Ok(s) => {
                    info!("loaded settings from {}", path.display());
                    s
                }
                Err(e) => {
                    warn!("failed to parse {}: {e}, using defaults", path.display());
                    Settings::default()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no {} found, using defaults", path.display());
                Settings::default()
            }
            Err(e) => {
                warn!("failed to read {}: {e}, using defaults", path.display());
                Settings::default()
            }
        };
        settings.apply_env_overrides(|key| std::env::var(key).ok());
        settings
    }

    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("LASER_ESCAPE_RESULTS").filter(|p| !p.is_empty()) {
            self.results_file = PathBuf::from(path);
        }
        if let Some(v) = lookup("LASER_ESCAPE_THRESHOLD").and_then(|v| v.parse().ok()) {
            self.beams.threshold = v;
        }
        if let Some(v) = lookup("LASER_ESCAPE_COOLDOWN").and_then(|v| v.parse().ok()) {
            self.beams.cooldown_s = v;
        }
        if let Some(v) = lookup("LASER_ESCAPE_PENALTY_UNIT").and_then(|v| v.parse().ok()) {
            self.timing.penalty_unit_s = v;
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.beams.count == 0 {
            return Err(SettingsError::NoBeams);
        }
        if !(0.0..=1.0).contains(&self.beams.threshold) {
            return Err(SettingsError::Threshold(self.beams.threshold));
        }
        if !(self.beams.cooldown_s > 0.0) {
            return Err(SettingsError::Cooldown(self.beams.cooldown_s));
        }
        if !(self.timing.penalty_unit_s >= 0.0) {
            return Err(SettingsError::PenaltyUnit(self.timing.penalty_unit_s));
        }
        if self.timing.tick_ms == 0 {
            return Err(SettingsError::Tick);
        }
        if !(self.timing.flash_period_s > 0.0) {
            return Err(SettingsError::FlashPeriod(self.timing.flash_period_s));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_prop() {
        let s = Settings::default();
        assert_eq!(s.beams.count, 9);
        assert_eq!(s.beams.config(), BeamConfig::default());
        assert_eq!(s.timing.penalty_window, PenaltyWindow::Timing);
        assert_eq!(s.results_file, PathBuf::from("times.csv"));
        assert_eq!(s.validate(), Ok(()));
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
results_file = "/var/lib/laser/times.csv"

[beams]
count = 4
cooldown_s = 3.0

[timing]
penalty_window = "armed"
"#;
        let s: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(s.results_file, PathBuf::from("/var/lib/laser/times.csv"));
        assert_eq!(s.beams.count, 4);
        assert_eq!(s.beams.threshold, 0.2);
        assert_eq!(s.beams.cooldown_s, 3.0);
        assert_eq!(s.timing.penalty_window, PenaltyWindow::Armed);
        assert_eq!(s.timing.tick_ms, 20);
    }

    #[test]
    fn env_overrides_win() {
        let mut s = Settings::default();
        s.apply_env_overrides(|key| match key {
            "LASER_ESCAPE_RESULTS" => Some("runs.csv".into()),
            "LASER_ESCAPE_THRESHOLD" => Some("0.25".into()),
            "LASER_ESCAPE_COOLDOWN" => Some("not a number".into()),
            _ => None,
        });
        assert_eq!(s.results_file, PathBuf::from("runs.csv"));
        assert_eq!(s.beams.threshold, 0.25);
        assert_eq!(s.beams.cooldown_s, 5.0);
    }

    #[test]
    fn validate_rejects_nonsense() {
        let mut s = Settings::default();
        s.beams.count = 0;
        assert_eq!(s.validate(), Err(SettingsError::NoBeams));

        let mut s = Settings::default();
        s.beams.threshold = 1.5;
        assert_eq!(s.validate(), Err(SettingsError::Threshold(1.5)));

        let mut s = Settings::default();
        s.beams.cooldown_s = 0.0;
        assert_eq!(s.validate(), Err(SettingsError::Cooldown(0.0)));

        let mut s = Settings::default();
        s.timing.tick_ms = 0;
        assert_eq!(s.validate(), Err(SettingsError::Tick));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let s = Settings::load(Path::new("/nonexistent/laser-escape.toml"));
        assert_eq!(s.beams, BeamSettings::default());
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!(
            "laser-escape-settings-{}-{}.toml",
            std::process::id(),
            line!()
        ));
        std::fs::write(&path, "[beams]\ncount = \"lots\"\n").unwrap();
        let s = Settings::load(&path);
        assert_eq!(s.beams.count, 9);
        assert_eq!(s.timing, TimingSettings::default());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn unreadable_path_falls_back_to_defaults() {
        // a directory exists but cannot be read as a file
        let s = Settings::load(&std::env::temp_dir());
        assert_eq!(s.beams.count, 9);
    }
}
