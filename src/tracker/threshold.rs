use std::collections::VecDeque;

const INITIAL_WINDOW_SECS: f64 = 1.0;
const INITIAL_RANGE_MULTIPLIER: f64 = 0.75;
const MIN_RANGE_MULTIPLIER: f64 = 0.5;
const MAX_RANGE_MULTIPLIER: f64 = 0.9;
const RANGE_MULTIPLIER_STEP: f64 = 0.01;
/// Tempo band in which the estimate is trusted to size the window.
const PLAUSIBLE_BPM: (f64, f64) = (50.0, 200.0);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergySample {
    pub amplitude: f64,
    pub timestamp: f64,
}

/// Sliding-window min/max threshold over recent low-band energy.
#[derive(Clone, Debug)]
pub struct AdaptiveThreshold {
    window: VecDeque<EnergySample>,
    window_duration: f64,
    range_multiplier: f64,
    min: f64,
    max: f64,
    best: f64,
}

impl Default for AdaptiveThreshold {
    fn default() -> Self {
        Self {
            window: VecDeque::new(),
            window_duration: INITIAL_WINDOW_SECS,
            range_multiplier: INITIAL_RANGE_MULTIPLIER,
            min: f64::INFINITY,
            max: 0.0,
            best: 0.0,
        }
    }
}

impl AdaptiveThreshold {
    /// Feed one frame of energy. `bpm` is the current tempo estimate, 0 when unknown.
    pub fn update(&mut self, amplitude: f64, time: f64, bpm: f64) {
        self.window.push_back(EnergySample {
            amplitude,
            timestamp: time,
        });

        if (PLAUSIBLE_BPM.0..=PLAUSIBLE_BPM.1).contains(&bpm) {
            self.window_duration = bpm / 30.0;
        }

        while let Some(front) = self.window.front() {
            if time - front.timestamp > self.window_duration {
                self.window.pop_front();
            } else {
                break;
            }
        }

        if let Some((min, max)) = self.bounds() {
            self.min = min;
            self.max = max;
            self.best = self.min + self.range_multiplier * (self.max - self.min);
        }

        if bpm < PLAUSIBLE_BPM.0 {
            self.range_multiplier =
                (self.range_multiplier - RANGE_MULTIPLIER_STEP).max(MIN_RANGE_MULTIPLIER);
        } else if bpm > PLAUSIBLE_BPM.1 {
            self.range_multiplier =
                (self.range_multiplier + RANGE_MULTIPLIER_STEP).min(MAX_RANGE_MULTIPLIER);
        }
    }

    fn bounds(&self) -> Option<(f64, f64)> {
        if self.window.is_empty() {
            return None;
        }
        let min = self
            .window
            .iter()
            .map(|s| s.amplitude)
            .fold(f64::INFINITY, f64::min);
        let max = self
            .window
            .iter()
            .map(|s| s.amplitude)
            .fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    #[cfg(test)]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[cfg(test)]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[cfg(test)]
    pub fn range_multiplier(&self) -> f64 {
        self.range_multiplier
    }

    #[cfg(test)]
    pub fn window_duration(&self) -> f64 {
        self.window_duration
    }

    #[cfg(test)]
    pub fn window(&self) -> impl Iterator<Item = &EnergySample> {
        self.window.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(threshold: &mut AdaptiveThreshold, samples: &[(f64, f64)], bpm: f64) {
        for &(amplitude, time) in samples {
            threshold.update(amplitude, time, bpm);
        }
    }

    #[test]
    fn best_lies_between_min_and_max() {
        let mut threshold = AdaptiveThreshold::default();
        let mut t = 0.0;
        for i in 0..300 {
            let amplitude = ((i * 37) % 101) as f64 + 10.0;
            threshold.update(amplitude, t, 0.0);
            assert!(threshold.min() <= threshold.best());
            assert!(threshold.best() <= threshold.max());
            t += 1.0 / 60.0;
        }
    }

    #[test]
    fn best_uses_range_multiplier() {
        let mut threshold = AdaptiveThreshold::default();
        feed(&mut threshold, &[(10.0, 0.0), (110.0, 0.1)], 120.0);
        // bpm in range: multiplier untouched at 0.75
        assert!((threshold.best() - 85.0).abs() < 1e-9);
    }

    #[test]
    fn evicts_samples_older_than_window() {
        let mut threshold = AdaptiveThreshold::default();
        feed(&mut threshold, &[(200.0, 0.0), (50.0, 0.5), (60.0, 1.2)], 100.0);
        // window sized by bpm 100 -> 3.33s, nothing evicted yet
        assert_eq!(threshold.max(), 200.0);

        let mut threshold = AdaptiveThreshold::default();
        feed(&mut threshold, &[(200.0, 0.0), (50.0, 0.5), (60.0, 1.2)], 0.0);
        // default 1s window drops the first sample
        assert_eq!(threshold.max(), 60.0);
        assert_eq!(threshold.min(), 50.0);
        assert_eq!(threshold.window().count(), 2);
    }

    #[test]
    fn window_tracks_plausible_tempo() {
        let mut threshold = AdaptiveThreshold::default();
        threshold.update(1.0, 0.0, 150.0);
        assert!((threshold.window_duration() - 5.0).abs() < 1e-9);
        threshold.update(1.0, 0.1, 250.0);
        assert!((threshold.window_duration() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn multiplier_drifts_within_bounds() {
        let mut threshold = AdaptiveThreshold::default();
        for i in 0..100 {
            threshold.update(1.0, i as f64 * 0.01, 0.0);
        }
        assert!((threshold.range_multiplier() - 0.5).abs() < 1e-9);

        for i in 0..100 {
            threshold.update(1.0, 1.0 + i as f64 * 0.01, 240.0);
        }
        assert!((threshold.range_multiplier() - 0.9).abs() < 1e-9);
    }
}
