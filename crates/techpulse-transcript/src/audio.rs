//! Shared audio acquisition for the two download-based fallback methods
//! (§4.9 steps 3–4): shell out to a command-line extractor, probe the
//! result's duration and bitrate, and split oversized files into chunks.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, TranscriptError};

/// Methods built on audio download refuse videos longer than this (§4.9
/// step 3's "limit to ≤2h duration").
pub const MAX_DURATION_SECONDS: f64 = 2.0 * 3600.0;

/// Audio exceeding this size is split into chunks before transcription
/// (§4.9 step 3).
pub const SPLIT_THRESHOLD_BYTES: u64 = 25 * 1024 * 1024;

/// Each chunk produced by a split stays under this size.
pub const MAX_CHUNK_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AudioExtractorConfig {
    /// Path to the audio-extraction binary (e.g. `yt-dlp`).
    pub extractor_binary: String,
    /// Path to the media-probing binary (e.g. `ffprobe`).
    pub probe_binary: String,
    /// Path to the media-splitting binary (e.g. `ffmpeg`).
    pub split_binary: String,
    pub work_dir: PathBuf,
}

pub struct AudioClip {
    pub path: PathBuf,
    pub duration_seconds: f64,
    pub size_bytes: u64,
    pub bitrate_bps: u64,
}

pub struct AudioChunk {
    pub path: PathBuf,
    pub offset_seconds: f64,
}

pub struct AudioExtractor {
    config: AudioExtractorConfig,
}

impl AudioExtractor {
    pub fn new(config: AudioExtractorConfig) -> Self {
        Self { config }
    }

    /// Downloads the video's audio track and probes its duration/bitrate.
    /// Age-restricted, private, or 403-blocked sources surface as
    /// [`TranscriptError::AccessBlocked`] so the pipeline short-circuits
    /// the remaining audio-based methods.
    pub async fn download(&self, video_id: &str) -> Result<AudioClip> {
        let out_path = self.config.work_dir.join(format!("{video_id}.m4a"));
        let output = Command::new(&self.config.extractor_binary)
            .arg("--extract-audio")
            .arg("--output")
            .arg(&out_path)
            .arg(video_id)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| TranscriptError::Extraction(format!("failed to spawn extractor: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains("Sign in to confirm your age")
                || stderr.contains("Private video")
                || stderr.contains("HTTP Error 403")
            {
                return Err(TranscriptError::AccessBlocked(stderr.trim().to_string()));
            }
            return Err(TranscriptError::Extraction(stderr.trim().to_string()));
        }

        let (duration_seconds, bitrate_bps) = self.probe(&out_path).await?;
        if duration_seconds > MAX_DURATION_SECONDS {
            warn!(video_id, duration_seconds, "audio exceeds the 2h duration limit");
        }
        let size_bytes = tokio::fs::metadata(&out_path).await?.len();

        Ok(AudioClip { path: out_path, duration_seconds, size_bytes, bitrate_bps })
    }

    async fn probe(&self, path: &Path) -> Result<(f64, u64)> {
        let output = Command::new(&self.config.probe_binary)
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration,bit_rate",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .await
            .map_err(|e| TranscriptError::Extraction(format!("failed to spawn probe: {e}")))?;

        if !output.status.success() {
            return Err(TranscriptError::Extraction(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut lines = stdout.lines();
        let duration: f64 = lines.next().and_then(|l| l.trim().parse().ok()).unwrap_or(0.0);
        let bitrate: u64 = lines.next().and_then(|l| l.trim().parse().ok()).unwrap_or(0);
        Ok((duration, bitrate))
    }

    /// Splits `clip` into chunks no larger than [`MAX_CHUNK_BYTES`] when it
    /// exceeds [`SPLIT_THRESHOLD_BYTES`], computing each chunk's duration
    /// from the probed bitrate. Returns a single chunk spanning the whole
    /// clip when splitting isn't required.
    pub async fn split_into_chunks(&self, clip: &AudioClip) -> Result<Vec<AudioChunk>> {
        if clip.size_bytes <= SPLIT_THRESHOLD_BYTES || clip.bitrate_bps == 0 {
            return Ok(vec![AudioChunk { path: clip.path.clone(), offset_seconds: 0.0 }]);
        }

        let chunk_duration_seconds = (MAX_CHUNK_BYTES as f64 * 8.0) / clip.bitrate_bps as f64;
        let chunk_count = (clip.duration_seconds / chunk_duration_seconds).ceil().max(1.0) as usize;
        debug!(chunk_count, chunk_duration_seconds, "splitting oversized audio clip");

        let mut chunks = Vec::with_capacity(chunk_count);
        for i in 0..chunk_count {
            let offset_seconds = i as f64 * chunk_duration_seconds;
            let chunk_path = self.config.work_dir.join(format!(
                "{}-chunk{i}.m4a",
                clip.path.file_stem().and_then(|s| s.to_str()).unwrap_or("clip")
            ));
            let output = Command::new(&self.config.split_binary)
                .args(["-y", "-i"])
                .arg(&clip.path)
                .args(["-ss", &offset_seconds.to_string(), "-t", &chunk_duration_seconds.to_string()])
                .arg(&chunk_path)
                .output()
                .await
                .map_err(|e| TranscriptError::Extraction(format!("failed to spawn splitter: {e}")))?;

            if !output.status.success() {
                return Err(TranscriptError::Extraction(
                    String::from_utf8_lossy(&output.stderr).trim().to_string(),
                ));
            }
            chunks.push(AudioChunk { path: chunk_path, offset_seconds });
        }
        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_duration_is_derived_from_bitrate() {
        // 128kbps audio, 20MB max chunk => ~1250s per chunk.
        let bitrate_bps = 128_000u64;
        let expected = (MAX_CHUNK_BYTES as f64 * 8.0) / bitrate_bps as f64;
        assert!((expected - 1250.0).abs() < 1.0);
    }
}
