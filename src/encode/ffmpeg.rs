use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

const VIDEO_CODEC: &str = "libx264";
const PIXEL_FORMAT: &str = "yuv420p";
const CRF: u32 = 18;

pub struct FfmpegEncoder {
    child: Child,
    frames_written: u64,
}

impl FfmpegEncoder {
    /// Start ffmpeg reading raw RGBA frames from stdin. When `audio` is given
    /// it is muxed into the output.
    pub fn new(
        output_path: &Path,
        audio: Option<&Path>,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Self> {
        let args = build_args(output_path, audio, width, height, fps);

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn ffmpeg. Is ffmpeg installed?")?;

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, audio={}",
            width,
            height,
            fps,
            audio.is_some()
        );

        Ok(Self {
            child,
            frames_written: 0,
        })
    }

    pub fn write_frame(&mut self, rgba_pixels: &[u8]) -> Result<()> {
        let stdin = self.child.stdin.as_mut().context("FFmpeg stdin not available")?;
        stdin.write_all(rgba_pixels).context("Failed to write frame to ffmpeg")?;
        self.frames_written += 1;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        drop(self.child.stdin.take());

        let output = self.child.wait_with_output().context("Failed to wait for ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("FFmpeg exited with error:\n{}", stderr);
        }

        log::info!("FFmpeg encoding complete ({} frames)", self.frames_written);
        Ok(())
    }
}

fn build_args(
    output_path: &Path,
    audio: Option<&Path>,
    width: u32,
    height: u32,
    fps: u32,
) -> Vec<String> {
    let mut args = vec![
        "-y".to_string(),
        // stderr is only read after the last frame
        "-nostats".into(),
        "-loglevel".into(), "error".into(),
        "-f".into(), "rawvideo".into(),
        "-pixel_format".into(), "rgba".into(),
        "-video_size".into(), format!("{}x{}", width, height),
        "-framerate".into(), fps.to_string(),
        "-i".into(), "pipe:0".into(),
    ];

    if let Some(audio) = audio {
        args.extend(["-i".to_string(), audio.to_string_lossy().into_owned()]);
    }

    args.extend([
        "-c:v".into(), VIDEO_CODEC.to_string(),
        "-pix_fmt".into(), PIXEL_FORMAT.to_string(),
        "-crf".into(), CRF.to_string(),
        "-preset".into(), "medium".into(),
    ]);

    if audio.is_some() {
        args.extend([
            "-c:a".to_string(), "aac".into(),
            "-b:a".into(), "192k".into(),
            "-shortest".into(),
        ]);
    }

    args.push(output_path.to_string_lossy().into_owned());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn muxes_audio_when_given() {
        let args = build_args(
            Path::new("out.mp4"),
            Some(Path::new("song.wav")),
            640,
            480,
            60,
        );
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "song.wav"));
        assert!(args.contains(&"-shortest".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        assert!(args.contains(&"640x480".to_string()));
    }

    #[test]
    fn keeps_stderr_quiet() {
        let args = build_args(Path::new("out.mp4"), None, 320, 240, 30);
        assert!(args.contains(&"-nostats".to_string()));
        assert!(args.windows(2).any(|w| w[0] == "-loglevel" && w[1] == "error"));
    }

    #[test]
    fn video_only_without_audio() {
        let args = build_args(Path::new("out.mp4"), None, 320, 240, 30);
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert!(!args.contains(&"aac".to_string()));
    }
}
