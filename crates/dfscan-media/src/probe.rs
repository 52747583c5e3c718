//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::{MediaError, MediaResult};

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Total frame count, when the container reports it
    pub frame_count: Option<u64>,
    /// Whether the container has an audio stream
    pub has_audio: bool,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    // Absent when only stream entries were requested.
    #[serde(default)]
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    #[serde(default)]
    codec_type: String,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    nb_read_frames: Option<String>,
}

/// Probe a video file for information.
///
/// Fails with `SourceNotFound` when the path does not exist and
/// `SourceUnreadable` when the container cannot be opened.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::SourceNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::unreadable(format!(
            "ffprobe failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    // A video stream is required; audio is optional.
    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::unreadable("No video stream found"))?;

    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .or(video_stream.r_frame_rate.as_ref())
        .and_then(|r| parse_frame_rate(r))
        .unwrap_or(30.0);

    let frame_count = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|&n| n > 0);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        frame_count,
        has_audio,
    })
}

/// Count frames by fully decoding the video stream once.
///
/// Fallback for containers that do not report `nb_frames`. This decodes the
/// whole stream and is proportionally slow on long inputs.
pub async fn count_frames(path: impl AsRef<Path>) -> MediaResult<u64> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::SourceNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-select_streams",
            "v:0",
            "-count_frames",
            "-show_entries",
            "stream=nb_read_frames",
            "-print_format",
            "json",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::unreadable(format!(
            "ffprobe -count_frames failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;

    Ok(probe
        .streams
        .first()
        .and_then(|s| s.nb_read_frames.as_ref())
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0))
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[tokio::test]
    async fn test_probe_missing_file() {
        let err = probe_video("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::SourceNotFound(_)));
    }

    #[tokio::test]
    async fn test_count_frames_missing_file() {
        let err = count_frames("/nonexistent/clip.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::SourceNotFound(_)));
    }

    #[test]
    fn test_probe_json_parsing() {
        let json = r#"{
            "format": {"duration": "3.04"},
            "streams": [
                {"codec_type": "video", "width": 1280, "height": 720,
                 "avg_frame_rate": "30/1", "nb_frames": "91"},
                {"codec_type": "audio"}
            ]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(probe.streams.len(), 2);
        assert_eq!(probe.streams[0].nb_frames.as_deref(), Some("91"));
        let format = probe.format.unwrap();
        assert_eq!(format.duration.as_deref(), Some("3.04"));
    }

    #[test]
    fn test_count_frames_json_parsing() {
        // `-show_entries stream=nb_read_frames` emits neither a format
        // section nor codec_type fields.
        let json = r#"{"streams": [{"nb_read_frames": "91"}]}"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        assert_eq!(probe.streams[0].nb_read_frames.as_deref(), Some("91"));
        assert!(probe.format.is_none());
    }
}
