use std::cell::Cell;
use std::rc::Rc;

/// Scheduled beats in a row that must fall at or below the threshold before
/// predictive mode is abandoned.
pub const LOW_BEATS_TO_RELEASE: u32 = 3;

/// Cancel flag shared between the tracker and a running scheduler. The
/// tracker keeps one clone and cancels it when predictive mode ends.
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Rc<Cell<bool>>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.set(true);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.get()
    }
}

/// What a scheduler tick decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Not yet time for the next beat.
    Idle,
    /// A beat is due and should be emitted.
    Beat,
    /// Too many silent scheduled beats; fall back to reactive tracking.
    Release,
}

/// Fixed-period beat clock used while tracking is predictive.
#[derive(Debug)]
pub struct PredictiveScheduler {
    interval: f64,
    last_beat: Option<f64>,
    consecutive_low_beats: u32,
    token: CancellationToken,
}

impl PredictiveScheduler {
    pub fn new(interval: f64, token: CancellationToken) -> Self {
        Self {
            interval,
            last_beat: None,
            consecutive_low_beats: 0,
            token,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Advance the clock to `now`. `amplitude` and `threshold` are this
    /// frame's energy and detection threshold.
    pub fn tick(&mut self, now: f64, amplitude: f64, threshold: f64) -> Tick {
        if self.token.is_cancelled() {
            return Tick::Idle;
        }
        let last = *self.last_beat.get_or_insert(now);
        if now < last + self.interval {
            return Tick::Idle;
        }

        if amplitude <= threshold {
            self.consecutive_low_beats += 1;
            if self.consecutive_low_beats >= LOW_BEATS_TO_RELEASE {
                self.consecutive_low_beats = 0;
                return Tick::Release;
            }
        } else {
            self.consecutive_low_beats = 0;
        }

        self.last_beat = Some(now);
        Tick::Beat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(scheduler: &mut PredictiveScheduler, frames: &[(f64, f64)]) -> Vec<Tick> {
        frames
            .iter()
            .map(|&(t, amplitude)| scheduler.tick(t, amplitude, 10.0))
            .collect()
    }

    #[test]
    fn first_tick_starts_the_clock() {
        let mut scheduler = PredictiveScheduler::new(0.5, CancellationToken::new());
        let ticks = run(&mut scheduler, &[(1.0, 20.0), (1.3, 20.0), (1.5, 20.0), (1.6, 20.0)]);
        assert_eq!(ticks, vec![Tick::Idle, Tick::Idle, Tick::Beat, Tick::Idle]);
    }

    #[test]
    fn beat_period_restarts_from_emitted_beat() {
        let mut scheduler = PredictiveScheduler::new(0.5, CancellationToken::new());
        let ticks = run(&mut scheduler, &[(0.0, 20.0), (0.52, 20.0), (1.0, 20.0), (1.03, 20.0)]);
        assert_eq!(ticks, vec![Tick::Idle, Tick::Beat, Tick::Idle, Tick::Beat]);
    }

    #[test]
    fn releases_after_three_quiet_beats() {
        let token = CancellationToken::new();
        let mut scheduler = PredictiveScheduler::new(0.5, token.clone());
        let ticks = run(
            &mut scheduler,
            &[(0.0, 0.0), (0.5, 5.0), (1.0, 5.0), (1.5, 5.0), (2.0, 20.0)],
        );
        assert_eq!(
            ticks,
            vec![Tick::Idle, Tick::Beat, Tick::Beat, Tick::Release, Tick::Beat]
        );
        // releasing leaves cancellation to the owner of the token
        assert!(!scheduler.is_cancelled());
        token.cancel();
        assert!(scheduler.is_cancelled());
        assert_eq!(scheduler.tick(3.0, 20.0, 10.0), Tick::Idle);
    }

    #[test]
    fn loud_beat_resets_quiet_streak() {
        let mut scheduler = PredictiveScheduler::new(0.5, CancellationToken::new());
        let ticks = run(
            &mut scheduler,
            &[(0.0, 0.0), (0.5, 5.0), (1.0, 5.0), (1.5, 50.0), (2.0, 5.0), (2.5, 5.0)],
        );
        assert!(!ticks.contains(&Tick::Release));
        assert_eq!(ticks.iter().filter(|&&t| t == Tick::Beat).count(), 5);
    }

    #[test]
    fn cancelled_scheduler_is_inert() {
        let token = CancellationToken::new();
        let mut scheduler = PredictiveScheduler::new(0.5, token.clone());
        token.cancel();
        assert_eq!(scheduler.tick(0.0, 20.0, 10.0), Tick::Idle);
        assert_eq!(scheduler.tick(5.0, 20.0, 10.0), Tick::Idle);
    }
}
