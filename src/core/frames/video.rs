//! Video Frame Extraction
//!
//! Bursts a video container into a numbered image sequence by driving
//! an external FFmpeg binary, then serves the extracted directory as a
//! [`FrameSource`]. Extraction reports progress over a channel and
//! signals completion exactly once, at process exit.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::{FrameData, FrameSource, DEFAULT_IMAGE_EXT};
use crate::core::{CoreError, CoreResult, FrameNumber};

/// Environment variable overriding FFmpeg binary discovery
pub const FFMPEG_ENV: &str = "ANNOTRACK_FFMPEG";

/// Environment variable overriding FFprobe binary discovery
pub const FFPROBE_ENV: &str = "ANNOTRACK_FFPROBE";

// =============================================================================
// Extraction Config
// =============================================================================

/// Settings for bursting a video into a frame sequence
#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    /// Sampling rate: frames extracted per second of video
    pub fps: f64,
    /// File extension for extracted images (with leading dot)
    pub image_ext: String,
    /// JPEG quality scale passed to `-q:v` (2 is near-lossless)
    pub quality: u8,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            fps: 30.0,
            image_ext: DEFAULT_IMAGE_EXT.to_string(),
            quality: 2,
        }
    }
}

/// Progress report emitted while extraction runs
#[derive(Clone, Copy, Debug)]
pub struct ExtractionProgress {
    /// Frames written so far
    pub frames_done: u64,
    /// Estimated completion fraction (0.0 - 1.0), when duration is known
    pub fraction: Option<f32>,
}

// =============================================================================
// Binary Discovery
// =============================================================================

/// Finds an FFmpeg-family binary: env override first, then system PATH
fn locate_binary(env_var: &str, name: &str) -> CoreResult<PathBuf> {
    if let Ok(path) = std::env::var(env_var) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    #[cfg(target_os = "windows")]
    let finder = "where";
    #[cfg(not(target_os = "windows"))]
    let finder = "which";

    let output = std::process::Command::new(finder)
        .arg(name)
        .output()
        .map_err(|_| CoreError::FFmpegNotFound)?;

    if output.status.success() {
        let stdout = String::from_utf8_lossy(&output.stdout);
        if let Some(first_line) = stdout.lines().next() {
            let path = PathBuf::from(first_line.trim());
            if path.exists() {
                return Ok(path);
            }
        }
    }

    Err(CoreError::FFmpegNotFound)
}

/// Parses a `frame=N` line from FFmpeg `-progress pipe:1` output
fn parse_frame_count(line: &str) -> Option<u64> {
    line.strip_prefix("frame=")?.trim().parse().ok()
}

// =============================================================================
// Video Frame Extractor
// =============================================================================

/// Drives FFmpeg to extract a video's frames into a directory
pub struct VideoFrameExtractor {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
    config: ExtractionConfig,
}

impl VideoFrameExtractor {
    /// Creates an extractor by discovering FFmpeg and FFprobe
    pub fn new(config: ExtractionConfig) -> CoreResult<Self> {
        Ok(Self {
            ffmpeg_path: locate_binary(FFMPEG_ENV, "ffmpeg")?,
            ffprobe_path: locate_binary(FFPROBE_ENV, "ffprobe")?,
            config,
        })
    }

    /// Creates an extractor with explicit binary paths
    pub fn with_paths(ffmpeg_path: PathBuf, ffprobe_path: PathBuf, config: ExtractionConfig) -> Self {
        Self {
            ffmpeg_path,
            ffprobe_path,
            config,
        }
    }

    /// Probes the input's duration in seconds
    async fn probe_duration(&self, input: &Path) -> CoreResult<f64> {
        let output = tokio::process::Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
                &input.to_string_lossy(),
            ])
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::FFmpegFailed(format!("ffprobe: {}", stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        stdout
            .trim()
            .parse()
            .map_err(|_| CoreError::FFmpegFailed(format!("unparsable duration: {}", stdout.trim())))
    }

    /// Extracts the frame sequence of `input` into `output_dir`
    ///
    /// Frame `n` lands as `{output_dir}/{n}{ext}`. Progress reports are
    /// sent over `progress_tx` while FFmpeg runs; the returned
    /// [`DirFrameSource`] serves the extracted sequence. Resolves once,
    /// when the FFmpeg process exits.
    pub async fn extract(
        &self,
        input: &Path,
        output_dir: &Path,
        progress_tx: Option<mpsc::Sender<ExtractionProgress>>,
    ) -> CoreResult<DirFrameSource> {
        if !input.exists() {
            return Err(CoreError::InvalidInput(format!(
                "input file does not exist: {}",
                input.display()
            )));
        }
        std::fs::create_dir_all(output_dir)?;

        let duration_sec = self.probe_duration(input).await?;
        let estimated_total = (duration_sec * self.config.fps).ceil().max(1.0);

        let pattern = output_dir.join(format!("%d{}", self.config.image_ext));
        info!(
            input = %input.display(),
            fps = self.config.fps,
            "extracting frame sequence"
        );

        let mut child = tokio::process::Command::new(&self.ffmpeg_path)
            .args([
                "-i",
                &input.to_string_lossy(),
                "-vf",
                &format!("fps={}", self.config.fps),
                "-q:v",
                &self.config.quality.to_string(),
                "-start_number",
                "0",
                "-progress",
                "pipe:1",
                "-nostats",
                "-loglevel",
                "error",
                "-y",
                &pattern.to_string_lossy(),
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(stdout) = child.stdout.take() {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(frames_done) = parse_frame_count(&line) else {
                    continue;
                };
                if let Some(ref tx) = progress_tx {
                    let fraction = (frames_done as f64 / estimated_total).min(1.0) as f32;
                    let _ = tx
                        .send(ExtractionProgress {
                            frames_done,
                            fraction: Some(fraction),
                        })
                        .await;
                }
            }
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CoreError::FFmpegFailed(format!(
                "frame extraction failed: {}",
                stderr
            )));
        }

        DirFrameSource::open(output_dir, &self.config.image_ext)
    }
}

// =============================================================================
// Directory Frame Source
// =============================================================================

/// Frame provider backed by a directory of numbered images
#[derive(Debug)]
pub struct DirFrameSource {
    dir: PathBuf,
    image_ext: String,
    total: u32,
}

impl DirFrameSource {
    /// Opens a directory of `{n}{ext}` frames, counting consecutive
    /// names from 0
    pub fn open(dir: &Path, image_ext: &str) -> CoreResult<Self> {
        let mut total: u32 = 0;
        while dir.join(format!("{}{}", total, image_ext)).exists() {
            total += 1;
        }

        debug!(dir = %dir.display(), total, "opened frame directory");

        Ok(Self {
            dir: dir.to_path_buf(),
            image_ext: image_ext.to_string(),
            total,
        })
    }

    /// Path of a single frame image
    fn frame_path(&self, frame_number: FrameNumber) -> PathBuf {
        self.dir
            .join(format!("{}{}", frame_number, self.image_ext))
    }
}

#[async_trait]
impl FrameSource for DirFrameSource {
    fn total_frames(&self) -> u32 {
        self.total
    }

    async fn get_frame(&self, frame_number: FrameNumber) -> CoreResult<FrameData> {
        if frame_number >= self.total {
            return Err(CoreError::FrameOutOfRange {
                frame: frame_number,
                total: self.total,
            });
        }

        let bytes = tokio::fs::read(self.frame_path(frame_number)).await?;
        Ok(FrameData {
            frame_number,
            bytes,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
