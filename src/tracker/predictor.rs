use super::history::BeatHistory;
use super::regularity::{mean_interval, Regularity, SEARCH_WINDOW};

/// Prediction errors below this (absolute, seconds) count toward locking on.
pub const LOW_ERROR_LIMIT: f64 = 0.2;
/// Consecutive low-error onsets needed before switching to predictive mode.
pub const LOW_ERRORS_TO_LOCK: u32 = 3;
/// Plausible beat period range used to octave-correct the locked interval.
pub const MIN_PERIOD: f64 = 0.33;
pub const MAX_PERIOD: f64 = 0.92;

/// Next-beat prediction with a running bias correction.
#[derive(Clone, Debug)]
pub struct BeatPredictor {
    predicted_time: f64,
    pending: bool,
    error: f64,
    consecutive_low_errors: u32,
}

impl Default for BeatPredictor {
    fn default() -> Self {
        Self {
            predicted_time: f64::INFINITY,
            pending: false,
            error: 0.0,
            consecutive_low_errors: 0,
        }
    }
}

/// Last timestamp of the subset plus its mean gap. `None` for fewer than two
/// timestamps.
pub fn predict_next_beat(regularity: &Regularity) -> Option<f64> {
    let skip = regularity.times.len().saturating_sub(SEARCH_WINDOW);
    let times = &regularity.times[skip..];
    let interval = mean_interval(times)?;
    times.last().map(|last| last + interval)
}

/// Fold `interval` by octaves until it lies within [`MIN_PERIOD`, `MAX_PERIOD`].
pub fn octave_correct(interval: f64) -> f64 {
    if interval <= 0.0 || !interval.is_finite() {
        return interval;
    }
    let mut interval = interval;
    while interval < MIN_PERIOD {
        interval *= 2.0;
    }
    while interval > MAX_PERIOD {
        interval /= 2.0;
    }
    interval
}

impl BeatPredictor {
    /// Accept a regularity found at `now`. Issues a bias-corrected prediction
    /// and returns true once enough consecutive low-error onsets have been
    /// seen to lock on.
    pub fn observe(&mut self, regularity: &Regularity, now: f64) -> bool {
        if let Some(predicted) = predict_next_beat(regularity) {
            let predicted = predicted + self.error;
            self.predicted_time = predicted;
            if predicted > now {
                log::debug!("Predicted next beat at {:.3}s", predicted);
                self.pending = true;
            }
        }

        if self.error.abs() < LOW_ERROR_LIMIT {
            self.consecutive_low_errors += 1;
            self.consecutive_low_errors >= LOW_ERRORS_TO_LOCK
        } else {
            self.consecutive_low_errors = 0;
            false
        }
    }

    /// Once a pending prediction has elapsed, measure how far it was from the
    /// nearer of the two latest onsets and adopt that signed offset as the
    /// new bias.
    pub fn settle(&mut self, history: &BeatHistory, now: f64) {
        if !self.pending || self.predicted_time > now {
            return;
        }
        self.pending = false;

        if history.len() < 3 {
            return;
        }
        let recent = history.tail(2);
        let before = recent[0] - self.predicted_time;
        let latest = recent[1] - self.predicted_time;
        self.error = if latest.abs() < before.abs() { latest } else { before };
        log::debug!("Prediction error now {:+.3}s", self.error);
    }

    /// A new prediction may only be issued once the last one has elapsed.
    pub fn can_predict(&self) -> bool {
        !self.pending
    }

    pub fn clear_streak(&mut self) {
        self.consecutive_low_errors = 0;
    }

    #[cfg(test)]
    pub fn error(&self) -> f64 {
        self.error
    }

    #[cfg(test)]
    pub fn predicted_time(&self) -> f64 {
        self.predicted_time
    }

    #[cfg(test)]
    pub fn consecutive_low_errors(&self) -> u32 {
        self.consecutive_low_errors
    }

    #[cfg(test)]
    pub(crate) fn set_error(&mut self, error: f64) {
        self.error = error;
    }
}
