#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeamConfig {
    /// Readings at or below this level count as a broken beam.
    pub threshold: f64,
    /// Seconds a beam stays "already charged" after a counted trip.
    pub cooldown_s: f64,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            cooldown_s: 5.0,
        }
    }
}

/// Result of one evaluation tick.
#[derive(Clone, Debug, PartialEq)]
pub struct BeamTick {
    /// Instantaneous beam state, not debounced.
    pub broken: Vec<bool>,
    pub penalties: u32,
    pub triptimes: Vec<f64>,
    /// Beams charged on this tick.
    pub tripped: Vec<usize>,
}

impl BeamTick {
    pub fn any_broken(&self) -> bool {
        self.broken.iter().any(|b| *b)
    }
}

fn is_broken(cfg: &BeamConfig, reading: f64) -> bool {
    reading <= cfg.threshold
}

/// Decide which beams are broken and charge the ones whose cooldown has run out.
///
/// A broken beam inside its cooldown window still reports `broken = true` so the
/// buzzer keeps sounding, but it neither adds a penalty nor moves its timestamp.
/// Clearing and re-breaking a beam does not restart the window early.
/// The count saturates at `u32::MAX`.
///
/// Panics if `triptimes` and `sensors` differ in length.
pub fn evaluate(
    cfg: &BeamConfig,
    triptimes: &[f64],
    sensors: &[f64],
    penalties: u32,
    now: f64,
) -> BeamTick {
    assert_eq!(
        triptimes.len(),
        sensors.len(),
        "one trip timestamp is required per sensor"
    );

    let broken: Vec<bool> = sensors.iter().map(|v| is_broken(cfg, *v)).collect();
    let mut next_times = triptimes.to_vec();
    let mut tripped = Vec::new();

    for (i, b) in broken.iter().enumerate() {
        if *b && (now - triptimes[i]) >= cfg.cooldown_s {
            next_times[i] = now;
            tripped.push(i);
        }
    }

    let charged = u32::try_from(tripped.len()).unwrap_or(u32::MAX);
    BeamTick {
        broken,
        penalties: penalties.saturating_add(charged),
        triptimes: next_times,
        tripped,
    }
}

/// Owns the per-run penalty state and feeds it back into [`evaluate`].
#[derive(Clone, Debug)]
pub struct PenaltyTracker {
    triptimes: Vec<f64>,
    penalties: u32,
}

impl PenaltyTracker {
    /// Every timestamp starts at `start`, so nothing is charged during the
    /// first cooldown window.
    pub fn new(beam_count: usize, start: f64) -> Self {
        Self {
            triptimes: vec![start; beam_count],
            penalties: 0,
        }
    }

    pub fn tick(&mut self, cfg: &BeamConfig, sensors: &[f64], now: f64) -> BeamTick {
        let out = evaluate(cfg, &self.triptimes, sensors, self.penalties, now);
        self.triptimes.clone_from(&out.triptimes);
        self.penalties = out.penalties;
        out
    }

    pub fn penalties(&self) -> u32 {
        self.penalties
    }

    pub fn triptimes(&self) -> &[f64] {
        &self.triptimes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEAR: f64 = 0.85;
    const DARK: f64 = 0.05;

    fn cfg() -> BeamConfig {
        BeamConfig::default()
    }

    #[test]
    fn clear_sensors_leave_everything_untouched() {
        let out = evaluate(&cfg(), &[10.0, 10.0, 10.0], &[CLEAR, CLEAR, CLEAR], 0, 11.0);
        assert_eq!(out.broken, vec![false, false, false]);
        assert_eq!(out.penalties, 0);
        assert_eq!(out.triptimes, vec![10.0, 10.0, 10.0]);
        assert!(!out.any_broken());
    }

    #[test]
    fn broken_beam_past_cooldown_is_charged_once() {
        let out = evaluate(&cfg(), &[10.0, 10.0, 10.0], &[CLEAR, CLEAR, DARK], 0, 17.0);
        assert_eq!(out.broken, vec![false, false, true]);
        assert_eq!(out.penalties, 1);
        assert_eq!(out.triptimes, vec![10.0, 10.0, 17.0]);
        assert_eq!(out.tripped, vec![2]);
    }

    #[test]
    fn still_broken_inside_cooldown_only_reports() {
        let mut times = vec![10.0, 10.0, 17.0];
        for now in [18.0, 19.0, 20.0] {
            let out = evaluate(&cfg(), &times, &[CLEAR, CLEAR, DARK], 1, now);
            assert_eq!(out.broken, vec![false, false, true]);
            assert_eq!(out.penalties, 1);
            assert_eq!(out.triptimes, vec![10.0, 10.0, 17.0]);
            times = out.triptimes;
        }
    }

    #[test]
    fn reading_at_threshold_counts_as_broken() {
        let out = evaluate(&cfg(), &[0.0], &[0.2], 0, 5.0);
        assert_eq!(out.broken, vec![true]);
        assert_eq!(out.penalties, 1);
    }

    #[test]
    fn cooldown_boundary_is_inclusive() {
        let out = evaluate(&cfg(), &[10.0], &[DARK], 3, 15.0);
        assert_eq!(out.penalties, 4);
        assert_eq!(out.triptimes, vec![15.0]);
    }

    #[test]
    fn flicker_inside_window_does_not_reset_cooldown() {
        let mut tracker = PenaltyTracker::new(1, 0.0);
        tracker.tick(&cfg(), &[DARK], 6.0);
        tracker.tick(&cfg(), &[CLEAR], 7.0);
        let out = tracker.tick(&cfg(), &[DARK], 8.0);
        assert!(out.any_broken());
        assert_eq!(tracker.penalties(), 1);
        assert_eq!(tracker.triptimes(), &[6.0]);
    }

    #[test]
    fn sustained_obstruction_retrips_once_per_window() {
        let mut tracker = PenaltyTracker::new(2, 0.0);
        let mut t = 0.0;
        while t <= 20.0 {
            tracker.tick(&cfg(), &[DARK, CLEAR], t);
            t += 0.5;
        }
        // charged at 5, 10, 15 and 20
        assert_eq!(tracker.penalties(), 4);
        assert_eq!(tracker.triptimes(), &[20.0, 0.0]);
    }

    #[test]
    fn fresh_tracker_ignores_first_window() {
        let mut tracker = PenaltyTracker::new(3, 100.0);
        let out = tracker.tick(&cfg(), &[DARK, DARK, DARK], 101.0);
        assert_eq!(out.broken, vec![true, true, true]);
        assert_eq!(tracker.penalties(), 0);
    }

    #[test]
    fn same_inputs_same_outputs() {
        let a = evaluate(&cfg(), &[0.0, 3.0], &[DARK, DARK], 2, 6.0);
        let b = evaluate(&cfg(), &[0.0, 3.0], &[DARK, DARK], 2, 6.0);
        assert_eq!(a, b);
        assert_eq!(a.penalties, 3);
    }

    #[test]
    fn penalty_count_saturates() {
        let out = evaluate(&cfg(), &[0.0, 0.0], &[DARK, DARK], u32::MAX - 1, 10.0);
        assert_eq!(out.penalties, u32::MAX);
        assert_eq!(out.tripped, vec![0, 1]);
    }

    #[test]
    fn zero_cooldown_reports_a_charge_at_the_same_instant() {
        let zero = BeamConfig {
            cooldown_s: 0.0,
            ..cfg()
        };
        let out = evaluate(&zero, &[4.0, 4.0], &[DARK, CLEAR], 0, 4.0);
        assert_eq!(out.penalties, 1);
        assert_eq!(out.triptimes, vec![4.0, 4.0]);
        assert_eq!(out.tripped, vec![0]);
    }

    #[test]
    #[should_panic(expected = "one trip timestamp is required per sensor")]
    fn mismatched_lengths_fail_fast() {
        evaluate(&cfg(), &[0.0, 0.0], &[CLEAR], 0, 1.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn clear_readings_are_a_no_op(
                readings in proptest::collection::vec(0.21f64..=1.0, 1..12),
                start in 0.0f64..1000.0,
                penalties in 0u32..100,
                dt in 0.0f64..100.0,
            ) {
                let times = vec![start; readings.len()];
                let out = evaluate(&cfg(), &times, &readings, penalties, start + dt);
                prop_assert!(out.broken.iter().all(|b| !b));
                prop_assert_eq!(out.penalties, penalties);
                prop_assert_eq!(out.triptimes, times);
            }

            #[test]
            fn timestamps_never_move_backwards(
                readings in proptest::collection::vec(0.0f64..=1.0, 1..12),
                now in 0.0f64..1000.0,
            ) {
                let times: Vec<f64> = (0..readings.len()).map(|i| i as f64).collect();
                let out = evaluate(&cfg(), &times, &readings, 0, now.max(times.len() as f64));
                for (after, before) in out.triptimes.iter().zip(&times) {
                    prop_assert!(after >= before);
                }
                let charged = out.tripped.len() as u32;
                prop_assert_eq!(out.penalties, charged);
            }
        }
    }
}
