/// Playback clock that freezes while paused.
///
/// All tracker timestamps are read from here rather than from the host
/// (display) clock, so a pause never shows up as elapsed audio time.
#[derive(Clone, Debug, Default)]
pub struct AudioClock {
    started_at: Option<f64>,
    paused_at: Option<f64>,
    paused_total: f64,
}

impl AudioClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, host_time: f64) {
        self.started_at = Some(host_time);
        self.paused_at = None;
        self.paused_total = 0.0;
    }

    pub fn pause(&mut self, host_time: f64) {
        if self.is_running() {
            self.paused_at = Some(host_time);
        }
    }

    pub fn resume(&mut self, host_time: f64) {
        if let Some(paused_at) = self.paused_at.take() {
            self.paused_total += (host_time - paused_at).max(0.0);
        }
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some() && self.paused_at.is_none()
    }

    /// Seconds of audio played as of `host_time`.
    pub fn elapsed(&self, host_time: f64) -> f64 {
        let Some(started_at) = self.started_at else {
            return 0.0;
        };
        let now = self.paused_at.unwrap_or(host_time);
        (now - started_at - self.paused_total).max(0.0)
    }
}

/// Host-time pauses to apply during a session: `(at, duration)` pairs.
#[derive(Clone, Debug, Default)]
pub struct PauseSchedule {
    pauses: Vec<(f64, f64)>,
}

impl PauseSchedule {
    pub fn new(mut pauses: Vec<(f64, f64)>) -> Self {
        pauses.retain(|&(at, duration)| at >= 0.0 && duration > 0.0);
        pauses.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { pauses }
    }

    pub fn is_empty(&self) -> bool {
        self.pauses.is_empty()
    }

    /// Whether the clock should be paused at `host_time`.
    pub fn is_paused_at(&self, host_time: f64) -> bool {
        self.pauses
            .iter()
            .any(|&(at, duration)| host_time >= at && host_time < at + duration)
    }

    /// Total paused host time across the schedule.
    pub fn total_duration(&self) -> f64 {
        self.pauses.iter().map(|&(_, d)| d).sum()
    }

    /// Bring `clock` in line with the schedule at `host_time`.
    pub fn apply(&self, clock: &mut AudioClock, host_time: f64) {
        let should_pause = self.is_paused_at(host_time);
        if should_pause && clock.is_running() {
            log::info!("Playback paused at {:.2}s", clock.elapsed(host_time));
            clock.pause(host_time);
        } else if !should_pause && !clock.is_running() {
            clock.resume(host_time);
            log::info!("Playback resumed at {:.2}s", clock.elapsed(host_time));
        }
    }
}

/// Parse a `AT:DURATION` pause argument (seconds).
pub fn parse_pause(arg: &str) -> Result<(f64, f64), String> {
    let (at, duration) = arg
        .split_once(':')
        .ok_or_else(|| format!("expected AT:DURATION, got '{}'", arg))?;
    let at: f64 = at
        .trim()
        .parse()
        .map_err(|_| format!("invalid pause start '{}'", at))?;
    let duration: f64 = duration
        .trim()
        .parse()
        .map_err(|_| format!("invalid pause duration '{}'", duration))?;
    if at < 0.0 || duration <= 0.0 {
        return Err(format!("pause '{}' must have AT >= 0 and DURATION > 0", arg));
    }
    Ok((at, duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_freezes_while_paused() {
        let mut clock = AudioClock::new();
        clock.start(10.0);
        assert!((clock.elapsed(12.0) - 2.0).abs() < 1e-9);

        clock.pause(12.0);
        assert!(!clock.is_running());
        assert!((clock.elapsed(15.0) - 2.0).abs() < 1e-9);

        clock.resume(15.0);
        assert!((clock.elapsed(16.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn unstarted_clock_reads_zero() {
        let clock = AudioClock::new();
        assert_eq!(clock.elapsed(100.0), 0.0);
        assert!(!clock.is_running());
    }

    #[test]
    fn double_pause_keeps_first() {
        let mut clock = AudioClock::new();
        clock.start(0.0);
        clock.pause(1.0);
        clock.pause(2.0);
        clock.resume(3.0);
        assert!((clock.elapsed(4.0) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn schedule_drives_clock() {
        let schedule = PauseSchedule::new(vec![(1.0, 0.5)]);
        let mut clock = AudioClock::new();
        clock.start(0.0);
        let mut readings = Vec::new();
        for i in 0..20 {
            let host = i as f64 * 0.1;
            schedule.apply(&mut clock, host);
            readings.push(clock.elapsed(host));
        }
        // frozen across host 1.0..1.5
        assert!((readings[10] - 1.0).abs() < 1e-9);
        assert!((readings[14] - 1.0).abs() < 1e-9);
        assert!((readings[15] - 1.0).abs() < 1e-9);
        assert!((readings[19] - 1.4).abs() < 1e-9);
    }

    #[test]
    fn parses_pause_arguments() {
        assert_eq!(parse_pause("12:3.5"), Ok((12.0, 3.5)));
        assert!(parse_pause("12").is_err());
        assert!(parse_pause("x:1").is_err());
        assert!(parse_pause("1:0").is_err());
    }
}
