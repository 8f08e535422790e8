use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::audio::clock::{AudioClock, PauseSchedule};
use crate::audio::spectrum::SpectralFrameSource;
use crate::encode::ffmpeg::FfmpegEncoder;
use crate::render::canvas::Canvas;
use crate::render::palette::DisplayState;
use crate::render::pulse::PulseAnimation;
use crate::render::text::TextOverlay;
use crate::tracker::{BeatEvent, BeatTracker, FrameReport, TrackingMode};

/// Receives every tracker event in order.
pub trait EventSink {
    fn record(&mut self, event: &BeatEvent) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// One JSON object per line.
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl JsonlSink<BufWriter<File>> {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log: {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> EventSink for JsonlSink<W> {
    fn record(&mut self, event: &BeatEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, event).context("Failed to serialise event")?;
        self.writer.write_all(b"\n").context("Failed to write event log")?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush event log")
    }
}

/// Pulse visual rendered frame by frame into ffmpeg.
pub struct VideoOutput {
    canvas: Canvas,
    overlay: Option<TextOverlay>,
    encoder: FfmpegEncoder,
}

impl VideoOutput {
    pub fn new(width: u32, height: u32, overlay: Option<TextOverlay>, encoder: FfmpegEncoder) -> Self {
        Self {
            canvas: Canvas::new(width, height),
            overlay,
            encoder,
        }
    }

    fn render(&mut self, display: &DisplayState, scale: f32) -> Result<()> {
        let label = display.bpm_label();
        self.canvas
            .draw(display.palette(), scale, label.as_deref(), self.overlay.as_ref());
        self.encoder.write_frame(self.canvas.pixels())
    }
}

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub fps: u32,
    /// Length of the audio in seconds.
    pub duration: f64,
    pub pauses: PauseSchedule,
    pub show_progress: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SessionSummary {
    pub frames: usize,
    pub paused_frames: usize,
    pub reactive_pulses: usize,
    pub predictive_pulses: usize,
    pub tempo_locks: usize,
    pub mode_switches: usize,
    pub final_bpm: f64,
    pub final_mode: TrackingMode,
    pub final_threshold: f64,
}

impl Default for SessionSummary {
    fn default() -> Self {
        Self {
            frames: 0,
            paused_frames: 0,
            reactive_pulses: 0,
            predictive_pulses: 0,
            tempo_locks: 0,
            mode_switches: 0,
            final_bpm: 0.0,
            final_mode: TrackingMode::Reactive,
            final_threshold: 0.0,
        }
    }
}

impl SessionSummary {
    fn record(&mut self, event: &BeatEvent) {
        match event {
            BeatEvent::Pulse {
                source: TrackingMode::Reactive,
                ..
            } => self.reactive_pulses += 1,
            BeatEvent::Pulse {
                source: TrackingMode::Predictive,
                ..
            } => self.predictive_pulses += 1,
            BeatEvent::TempoLocked { .. } => self.tempo_locks += 1,
            BeatEvent::ModeChanged { .. } => self.mode_switches += 1,
        }
    }
}

/// Drives the tracker over a whole source at a fixed display frame rate.
pub struct Session<S: SpectralFrameSource> {
    source: S,
    tracker: BeatTracker,
    display: DisplayState,
    pulse: PulseAnimation,
    sinks: Vec<Box<dyn EventSink>>,
    video: Option<VideoOutput>,
    options: SessionOptions,
}

impl<S: SpectralFrameSource> Session<S> {
    pub fn new(source: S, display: DisplayState, options: SessionOptions) -> Self {
        let tracker = BeatTracker::new(source.bin_count());
        Self {
            source,
            tracker,
            display,
            pulse: PulseAnimation::default(),
            sinks: Vec::new(),
            video: None,
            options,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn set_video(&mut self, video: VideoOutput) {
        self.video = Some(video);
    }

    /// Number of display frames: the audio plus every scheduled pause.
    pub fn frame_count(&self) -> usize {
        let host_duration = self.options.duration + self.options.pauses.total_duration();
        (host_duration * self.options.fps as f64).ceil().max(0.0) as usize
    }

    pub fn run(mut self) -> Result<SessionSummary> {
        let total_frames = self.frame_count();
        let fps = self.options.fps as f64;

        let pb = if self.options.show_progress {
            let pb = ProgressBar::new(total_frames as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
                    .context("Invalid progress bar template")?
                    .progress_chars("=>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut summary = SessionSummary::default();
        let mut clock = AudioClock::new();
        clock.start(0.0);

        for frame_idx in 0..total_frames {
            let host = frame_idx as f64 / fps;
            self.options.pauses.apply(&mut clock, host);

            let report = self.step(&clock, host);
            if !report.running {
                summary.paused_frames += 1;
            }
            if !report.events.is_empty() {
                log::debug!(
                    "{:.3}s: {} event(s), {:?}, energy {:.1} / threshold {:.1}, {:.1} BPM",
                    report.time,
                    report.events.len(),
                    report.mode,
                    report.amplitude,
                    report.threshold,
                    report.bpm
                );
            }

            for event in &report.events {
                summary.record(event);
                for sink in &mut self.sinks {
                    sink.record(event)?;
                }
                match event {
                    BeatEvent::Pulse { .. } => self.pulse.trigger(host),
                    BeatEvent::TempoLocked { bpm, .. } => self.display.apply_tempo(*bpm),
                    BeatEvent::ModeChanged { .. } => {}
                }
            }

            if let Some(video) = self.video.as_mut() {
                video.render(&self.display, self.pulse.scale(host))?;
            }

            summary.frames += 1;
            pb.set_position(frame_idx as u64 + 1);
        }

        pb.finish_with_message("Tracking complete");

        for sink in &mut self.sinks {
            sink.finish()?;
        }
        if let Some(video) = self.video.take() {
            video.encoder.finish()?;
        }

        summary.final_bpm = self.tracker.bpm();
        summary.final_mode = self.tracker.state().mode;
        summary.final_threshold = self.tracker.state().threshold.best();
        log::info!(
            "Session: {} frames ({} paused), {} reactive + {} predictive pulses, {} tempo locks, {} mode switches, final {:.1} BPM ({:?}, threshold {:.1})",
            summary.frames,
            summary.paused_frames,
            summary.reactive_pulses,
            summary.predictive_pulses,
            summary.tempo_locks,
            summary.mode_switches,
            summary.final_bpm,
            summary.final_mode,
            summary.final_threshold
        );
        Ok(summary)
    }

    fn step(&mut self, clock: &AudioClock, host: f64) -> FrameReport {
        if !clock.is_running() {
            return self.tracker.process_frame(&[], clock, host);
        }
        let spectrum = self.source.frame_at(clock.elapsed(host));
        self.tracker.process_frame(spectrum, clock, host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::palette::Tonality;
    use std::cell::RefCell;
    use std::rc::Rc;

    const FPS: u32 = 60;

    /// Kicks of three frames every half second from 0.25 s.
    struct KickSource {
        frame: Vec<u8>,
        kicks_until: f64,
    }

    impl SpectralFrameSource for KickSource {
        fn bin_count(&self) -> usize {
            256
        }

        fn frame_at(&mut self, position: f64) -> &[u8] {
            let frame = (position * FPS as f64).round() as usize;
            let kick = position >= 0.25 && position < self.kicks_until && (frame - 15) % 30 < 3;
            self.frame.fill(if kick { 200 } else { 20 });
            &self.frame
        }
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<BeatEvent>>>);

    impl EventSink for Recorder {
        fn record(&mut self, event: &BeatEvent) -> Result<()> {
            self.0.borrow_mut().push(event.clone());
            Ok(())
        }
    }

    fn session(duration: f64, pauses: Vec<(f64, f64)>, kicks_until: f64) -> Session<KickSource> {
        let source = KickSource {
            frame: vec![0; 256],
            kicks_until,
        };
        Session::new(
            source,
            DisplayState::new(Tonality::Major, true, true),
            SessionOptions {
                fps: FPS,
                duration,
                pauses: PauseSchedule::new(pauses),
                show_progress: false,
            },
        )
    }

    #[test]
    fn frame_count_includes_pauses() {
        assert_eq!(session(8.0, vec![], f64::MAX).frame_count(), 480);
        assert_eq!(session(8.0, vec![(1.0, 0.5)], f64::MAX).frame_count(), 510);
    }

    #[test]
    fn tracks_steady_kicks_to_lock() {
        let recorder = Recorder::default();
        let mut session = session(8.0, vec![], f64::MAX);
        session.add_sink(Box::new(recorder.clone()));
        let summary = session.run().unwrap();

        assert_eq!(summary.frames, 480);
        assert_eq!(summary.paused_frames, 0);
        // onsets 0.25 .. 6.25, the last one triggering predictive mode
        assert_eq!(summary.reactive_pulses, 13);
        assert_eq!(summary.tempo_locks, 3);
        assert_eq!(summary.mode_switches, 1);
        assert!(summary.predictive_pulses >= 2);
        assert!((summary.final_bpm - 120.0).abs() < 1.0);
        assert_eq!(summary.final_mode, TrackingMode::Predictive);
        assert!(summary.final_threshold > 20.0 && summary.final_threshold < 200.0);

        let events = recorder.0.borrow();
        assert_eq!(
            events.len(),
            summary.reactive_pulses
                + summary.predictive_pulses
                + summary.tempo_locks
                + summary.mode_switches
        );
    }

    #[test]
    fn pause_counts_frozen_frames() {
        let summary = session(3.0, vec![(1.0, 0.5)], f64::MAX).run().unwrap();
        assert_eq!(summary.frames, 210);
        assert_eq!(summary.paused_frames, 30);
        // audio time resumes where it stopped, so all kicks are still heard
        assert_eq!(summary.reactive_pulses, 6);
    }

    #[test]
    fn silence_produces_no_events() {
        let recorder = Recorder::default();
        let mut session = session(2.0, vec![], 0.0);
        session.add_sink(Box::new(recorder.clone()));
        let summary = session.run().unwrap();
        assert_eq!(summary.reactive_pulses, 0);
        assert_eq!(summary.final_bpm, 0.0);
        assert_eq!(summary.final_mode, TrackingMode::Reactive);
        assert_eq!(summary.final_threshold, 20.0);
        assert!(recorder.0.borrow().is_empty());
    }

    #[test]
    fn jsonl_sink_writes_one_event_per_line() {
        let mut sink = JsonlSink::new(Vec::new());
        sink.record(&BeatEvent::Pulse {
            time: 0.25,
            source: TrackingMode::Reactive,
        })
        .unwrap();
        sink.record(&BeatEvent::TempoLocked {
            time: 4.25,
            bpm: 120.0,
        })
        .unwrap();
        sink.finish().unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "pulse");
        assert_eq!(first["source"], "reactive");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "tempo_locked");
        assert_eq!(second["bpm"], 120.0);
    }
}
