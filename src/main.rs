mod audio;
mod cli;
mod config;
mod encode;
mod render;
mod session;
mod tracker;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use audio::clock::PauseSchedule;
use audio::spectrum::{AnalyserSettings, ByteSpectrumAnalyser};
use cli::Cli;
use encode::ffmpeg::FfmpegEncoder;
use render::palette::{DisplayState, TonalityRule};
use render::text::TextOverlay;
use session::{JsonlSink, Session, SessionOptions, VideoOutput};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();
    let mut analyser = AnalyserSettings {
        fft_size: cli.fft_size,
        smoothing: cli.smoothing,
        ..AnalyserSettings::default()
    };

    let config_path = cli.config.clone().or_else(config::discover_config);
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.fps == config::default_fps() { cli.fps = cfg.display.fps; }
            if cli.width == config::default_width() { cli.width = cfg.display.width; }
            if cli.height == config::default_height() { cli.height = cfg.display.height; }
            if !cli.no_bpm { cli.no_bpm = !cfg.display.display_bpm; }
            if !cli.fixed_colors { cli.fixed_colors = !cfg.display.change_colors; }
            if cli.font.is_none() { cli.font = cfg.display.font; }
            if cli.tonality == config::default_rule() { cli.tonality = cfg.tonality.rule; }
            let from_config = cfg.analyser.settings();
            if cli.fft_size == config::default_fft_size() { analyser.fft_size = from_config.fft_size; }
            if cli.smoothing == config::default_smoothing() { analyser.smoothing = from_config.smoothing; }
            analyser.min_db = from_config.min_db;
            analyser.max_db = from_config.max_db;
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }

    config::validate(&analyser, cli.fps)?;

    let rule = TonalityRule::parse(&cli.tonality).unwrap_or_else(|| {
        log::warn!("Unknown tonality rule '{}', using filename", cli.tonality);
        TonalityRule::FileNameParity
    });

    let input = &cli.input;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("beatpulse - beat tracker");
    log::info!("Input: {}", input.display());

    log::info!("Decoding audio...");
    let audio_data = audio::decode::decode_audio(input)?;

    let tonality = rule.classify(input);
    log::info!("Tonality: {:?}", tonality);
    let display = DisplayState::new(tonality, !cli.fixed_colors, !cli.no_bpm);

    let pauses = PauseSchedule::new(cli.pauses.clone());
    let source = ByteSpectrumAnalyser::new(&audio_data, analyser);
    let mut session = Session::new(
        source,
        display,
        SessionOptions {
            fps: cli.fps,
            duration: audio_data.duration(),
            pauses: pauses.clone(),
            show_progress: true,
        },
    );

    match cli.events.as_deref() {
        Some(path) if path.as_os_str() == "-" => {
            session.add_sink(Box::new(JsonlSink::new(std::io::stdout())));
        }
        Some(path) => {
            log::info!("Event log: {}", path.display());
            session.add_sink(Box::new(JsonlSink::create(path)?));
        }
        None => {}
    }

    if let Some(ref output) = cli.output {
        log::info!("Video: {} ({}x{} @ {}fps)", output.display(), cli.width, cli.height, cli.fps);
        let overlay = load_overlay(cli.font.clone(), cli.width, cli.height, !cli.no_bpm);

        // A paused session no longer lines up with the source audio.
        let audio = pauses.is_empty().then_some(input.as_path());
        if audio.is_none() {
            log::warn!("Pause schedule active, writing video without audio");
        }
        let encoder = FfmpegEncoder::new(output, audio, cli.width, cli.height, cli.fps)
            .context("Failed to start video output")?;
        session.set_video(VideoOutput::new(cli.width, cli.height, overlay, encoder));
    }

    let summary = session.run()?;
    log::info!("Done! Final tempo {:.1} BPM", summary.final_bpm);
    Ok(())
}

fn load_overlay(font: Option<PathBuf>, width: u32, height: u32, display_bpm: bool) -> Option<TextOverlay> {
    if !display_bpm {
        return None;
    }
    let Some(path) = font else {
        log::warn!("No --font given, BPM readout will not be drawn");
        return None;
    };
    let shorter = width.min(height) as f32;
    let font_size = (shorter * 0.046).max(24.0);
    match TextOverlay::from_file(&path, font_size) {
        Ok(overlay) => Some(overlay),
        Err(err) => {
            log::warn!("{:#}", err);
            None
        }
    }
}
