use clap::Parser;
use std::path::PathBuf;

use crate::audio::clock::parse_pause;

#[derive(Parser, Debug)]
#[command(name = "beatpulse", about = "Real-time style beat tracker and pulse visualiser")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG)
    pub input: PathBuf,

    /// Write beat events as JSON Lines to this file ("-" for stdout)
    #[arg(short, long)]
    pub events: Option<PathBuf>,

    /// Render the pulse visual to this video file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Display frames per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Video width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Video height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Analyser FFT size (power of two)
    #[arg(long, default_value_t = 512)]
    pub fft_size: usize,

    /// Analyser time smoothing (0.0-1.0)
    #[arg(long, default_value_t = 0.8)]
    pub smoothing: f32,

    /// Hide the BPM readout
    #[arg(long)]
    pub no_bpm: bool,

    /// Keep the initial colours instead of following the tempo
    #[arg(long)]
    pub fixed_colors: bool,

    /// Colour scheme rule: filename, minor or major
    #[arg(long, default_value = "filename")]
    pub tonality: String,

    /// Pause playback at AT seconds for DURATION seconds (repeatable)
    #[arg(long = "pause", value_name = "AT:DURATION", value_parser = parse_pause)]
    pub pauses: Vec<(f64, f64)>,

    /// TTF/OTF font for the BPM readout
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Config file (defaults to beatpulse.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
