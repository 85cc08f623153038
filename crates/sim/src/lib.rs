use controller::LightSensors;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

/// Reading an LDR gives with the laser fully blocked.
const SHADOW: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Obstruction {
    None,
    Blocked,
    /// Blocked for `from_s <= t < until_s`.
    Window { from_s: f64, until_s: f64 },
    /// Blocked for the first `duty` fraction of every `period_s`.
    Periodic { period_s: f64, duty: f64 },
    Stuck { value: f64 },
}

#[derive(Clone, Debug)]
pub struct LightSensor {
    /// Reading with the laser hitting the sensor.
    pub ambient: f64,
    pub noise_std: f64,
    pub obstruction: Obstruction,
    rng: StdRng,
}

impl LightSensor {
    pub fn new(seed: u64) -> Self {
        Self {
            ambient: 0.85,
            noise_std: 0.02,
            obstruction: Obstruction::None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn blocked_at(&self, t: f64) -> bool {
        match self.obstruction {
            Obstruction::None | Obstruction::Stuck { .. } => false,
            Obstruction::Blocked => true,
            Obstruction::Window { from_s, until_s } => t >= from_s && t < until_s,
            Obstruction::Periodic { period_s, duty } => {
                period_s > 0.0 && (t.rem_euclid(period_s) / period_s) < duty
            }
        }
    }

    pub fn read(&mut self, t: f64) -> f64 {
        let mut v = match self.obstruction {
            Obstruction::Stuck { value } => return value.clamp(0.0, 1.0),
            _ if self.blocked_at(t) => SHADOW,
            _ => self.ambient,
        };

        if self.noise_std > 0.0 {
            if let Ok(normal) = Normal::new(0.0, self.noise_std) {
                v += normal.sample(&mut self.rng);
            }
        }

        v.clamp(0.0, 1.0)
    }
}

/// A row of simulated sensors standing in for the prop's LDR array.
#[derive(Clone, Debug)]
pub struct SensorArray {
    pub sensors: Vec<LightSensor>,
}

impl SensorArray {
    pub fn new(count: usize, seed: u64) -> Self {
        Self {
            sensors: (0..count as u64)
                .map(|i| LightSensor::new(seed ^ (0xA1 + i * 0x11)))
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        for s in &mut self.sensors {
            s.obstruction = Obstruction::None;
        }
    }

    /// Flip a beam between blocked and clear; out-of-range indices are ignored.
    pub fn toggle(&mut self, i: usize) -> Option<bool> {
        let s = self.sensors.get_mut(i)?;
        s.obstruction = match s.obstruction {
            Obstruction::Blocked => Obstruction::None,
            _ => Obstruction::Blocked,
        };
        Some(s.obstruction == Obstruction::Blocked)
    }

    pub fn is_blocked(&self, i: usize) -> bool {
        self.sensors
            .get(i)
            .is_some_and(|s| s.obstruction == Obstruction::Blocked)
    }
}

impl LightSensors for SensorArray {
    fn count(&self) -> usize {
        self.sensors.len()
    }

    fn read(&mut self, now: f64) -> Vec<f64> {
        self.sensors.iter_mut().map(|s| s.read(now)).collect()
    }
}

/// Scripted runner behaviour for demos and tests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scenario {
    /// Never touches a beam.
    Clean,
    /// Brushes a few beams briefly on the way through.
    Clumsy,
    /// Stands in one beam for a long stretch.
    Lingering,
    /// One beam flickers faster than the cooldown.
    Flicker,
}

impl Scenario {
    pub fn label(self) -> &'static str {
        match self {
            Scenario::Clean => "Clean run",
            Scenario::Clumsy => "Clumsy (brief brushes)",
            Scenario::Lingering => "Lingering (stands in a beam)",
            Scenario::Flicker => "Flicker (fast on/off)",
        }
    }

    pub const ALL: [Scenario; 4] = [
        Scenario::Clean,
        Scenario::Clumsy,
        Scenario::Lingering,
        Scenario::Flicker,
    ];

    /// Program the array's obstructions relative to the run start.
    pub fn apply(self, array: &mut SensorArray, run_start_s: f64) {
        array.clear();
        let n = array.sensors.len();
        if n == 0 {
            return;
        }
        let at = |offset: f64, len: f64| Obstruction::Window {
            from_s: run_start_s + offset,
            until_s: run_start_s + offset + len,
        };

        match self {
            Scenario::Clean => {}
            Scenario::Clumsy => {
                for (k, i) in (0..n).step_by(3).enumerate() {
                    array.sensors[i].obstruction = at(6.0 + 7.0 * k as f64, 0.3);
                }
            }
            Scenario::Lingering => {
                array.sensors[n / 2].obstruction = at(2.0, 14.0);
            }
            Scenario::Flicker => {
                array.sensors[0].obstruction = Obstruction::Periodic {
                    period_s: 0.5,
                    duty: 0.5,
                };
            }
        }
    }
}
