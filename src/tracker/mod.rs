//! Online beat tracking over a stream of byte spectra.
//!
//! Each display frame runs one [`BeatTracker::process_frame`]: low-band energy
//! feeds an adaptive threshold, threshold crossings become onsets, recent
//! onsets are searched for a regular pattern, and once predictions have been
//! accurate for long enough the tracker hands beat generation to a
//! fixed-period scheduler until the music stops agreeing with it.

pub mod energy;
pub mod history;
pub mod onset;
pub mod predictor;
pub mod regularity;
pub mod scheduler;
pub mod tempo;
pub mod threshold;

use serde::Serialize;

use crate::audio::clock::AudioClock;
use energy::LowBandEnergyExtractor;
use history::BeatHistory;
use onset::OnsetDetector;
use predictor::{octave_correct, BeatPredictor};
use regularity::find_regularity;
use scheduler::{CancellationToken, PredictiveScheduler, Tick};
use threshold::AdaptiveThreshold;

/// Onsets for which predictive mode stays off after falling back.
pub const COLD_START_COOLDOWN: i32 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// Beats come from threshold crossings.
    Reactive,
    /// Beats come from the fixed-period scheduler.
    Predictive,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BeatEvent {
    Pulse { time: f64, source: TrackingMode },
    TempoLocked { time: f64, bpm: f64 },
    ModeChanged { time: f64, mode: TrackingMode },
}

/// Output of one tracker step.
#[derive(Clone, Debug)]
pub struct FrameReport {
    pub time: f64,
    pub running: bool,
    pub amplitude: f64,
    pub threshold: f64,
    /// Current tempo estimate; 0 means not enough history.
    pub bpm: f64,
    pub mode: TrackingMode,
    pub events: Vec<BeatEvent>,
}

/// All mutable tracking state for one playback session.
#[derive(Debug)]
pub struct TrackerState {
    pub mode: TrackingMode,
    pub threshold: AdaptiveThreshold,
    pub onset: OnsetDetector,
    pub predictor: BeatPredictor,
    pub scheduler: Option<PredictiveScheduler>,
    /// Cancels the running scheduler, if any.
    pub scheduler_token: CancellationToken,
    pub history: BeatHistory,
    pub cold_start_cooldown: i32,
    pub last_amplitude: f64,
}

impl Default for TrackerState {
    fn default() -> Self {
        Self {
            mode: TrackingMode::Reactive,
            threshold: AdaptiveThreshold::default(),
            onset: OnsetDetector::default(),
            predictor: BeatPredictor::default(),
            scheduler: None,
            scheduler_token: CancellationToken::new(),
            history: BeatHistory::default(),
            cold_start_cooldown: 0,
            last_amplitude: 0.0,
        }
    }
}

pub struct BeatTracker {
    extractor: LowBandEnergyExtractor,
    state: TrackerState,
}

impl BeatTracker {
    pub fn new(bin_count: usize) -> Self {
        let extractor = LowBandEnergyExtractor::new(bin_count);
        let (lo, hi) = extractor.band();
        log::debug!("Tracking energy over bins {}..={}", lo, hi);
        Self {
            extractor,
            state: TrackerState::default(),
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn bpm(&self) -> f64 {
        tempo::estimate_bpm(&self.state.history)
    }

    /// Forget everything; used when a new audio source is loaded.
    #[cfg(test)]
    pub fn reset(&mut self) {
        self.state.scheduler_token.cancel();
        self.state = TrackerState::default();
    }

    /// Run one frame. Nothing is updated while `clock` is paused.
    pub fn process_frame(
        &mut self,
        spectrum: &[u8],
        clock: &AudioClock,
        host_time: f64,
    ) -> FrameReport {
        let now = clock.elapsed(host_time);
        if !clock.is_running() {
            return FrameReport {
                time: now,
                running: false,
                amplitude: self.state.last_amplitude,
                threshold: self.state.threshold.best(),
                bpm: self.bpm(),
                mode: self.state.mode,
                events: Vec::new(),
            };
        }

        let amplitude = self.extractor.extract(spectrum);
        let mut events = Vec::new();
        step(&mut self.state, amplitude, now, &mut events);

        FrameReport {
            time: now,
            running: true,
            amplitude,
            threshold: self.state.threshold.best(),
            bpm: self.bpm(),
            mode: self.state.mode,
            events,
        }
    }
}

/// One detection step on the low-band `amplitude` at audio time `now`.
pub fn step(state: &mut TrackerState, amplitude: f64, now: f64, events: &mut Vec<BeatEvent>) {
    state.last_amplitude = amplitude;

    let bpm = tempo::estimate_bpm(&state.history);
    state.threshold.update(amplitude, now, bpm);
    let threshold = state.threshold.best();

    let reactive = state.mode == TrackingMode::Reactive;
    if state.onset.process(amplitude, threshold, reactive) {
        on_onset(state, now, events);
    }

    tick_scheduler(state, amplitude, threshold, now, events);
}

fn on_onset(state: &mut TrackerState, now: f64, events: &mut Vec<BeatEvent>) {
    events.push(BeatEvent::Pulse {
        time: now,
        source: TrackingMode::Reactive,
    });
    state.cold_start_cooldown = state.cold_start_cooldown.saturating_sub(1);
    state.history.push(now);

    let regularity = find_regularity(&state.history);
    if regularity.len() > 2 && state.predictor.can_predict() && state.cold_start_cooldown <= 0 {
        log::debug!(
            "Regular onsets at {:?} ({} of last {})",
            regularity.indices,
            regularity.len(),
            regularity::SEARCH_WINDOW
        );
        events.push(BeatEvent::TempoLocked {
            time: now,
            bpm: tempo::estimate_bpm(&state.history),
        });

        let lock = state.predictor.observe(&regularity, now);
        if lock && state.mode == TrackingMode::Reactive {
            if let Some(interval) = regularity.mean_interval() {
                enter_predictive(state, octave_correct(interval), now, events);
            }
        }
    }

    state.predictor.settle(&state.history, now);
}

fn enter_predictive(state: &mut TrackerState, interval: f64, now: f64, events: &mut Vec<BeatEvent>) {
    log::info!(
        "{:.2}s: switching to predictive tracking, period {:.3}s ({:.1} BPM)",
        now,
        interval,
        60.0 / interval
    );
    state.mode = TrackingMode::Predictive;
    state.scheduler_token = CancellationToken::new();
    state.scheduler = Some(PredictiveScheduler::new(
        interval,
        state.scheduler_token.clone(),
    ));
    events.push(BeatEvent::ModeChanged {
        time: now,
        mode: TrackingMode::Predictive,
    });
}

fn tick_scheduler(
    state: &mut TrackerState,
    amplitude: f64,
    threshold: f64,
    now: f64,
    events: &mut Vec<BeatEvent>,
) {
    let Some(scheduler) = state.scheduler.as_mut() else {
        return;
    };

    match scheduler.tick(now, amplitude, threshold) {
        Tick::Idle => {}
        Tick::Beat => {
            events.push(BeatEvent::Pulse {
                time: now,
                source: TrackingMode::Predictive,
            });
            state.history.push(now);
        }
        Tick::Release => {
            log::info!("{:.2}s: scheduled beats went quiet, back to reactive tracking", now);
            state.scheduler_token.cancel();
            state.mode = TrackingMode::Reactive;
            state.cold_start_cooldown = COLD_START_COOLDOWN;
            state.predictor.clear_streak();
            events.push(BeatEvent::ModeChanged {
                time: now,
                mode: TrackingMode::Reactive,
            });
        }
    }

    if state
        .scheduler
        .as_ref()
        .is_some_and(PredictiveScheduler::is_cancelled)
    {
        state.scheduler = None;
    }
}
