//! Compressed audio decoding through the `ffmpeg` binary.

use super::TrainingError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

const F32_BYTES: usize = 4;

/// Check if ffmpeg is available.
pub async fn check_ffmpeg_available() -> Result<(), TrainingError> {
    let status = Command::new("ffmpeg")
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match status {
        Ok(status) if status.success() => Ok(()),
        _ => Err(TrainingError::Decode {
            path: "ffmpeg".into(),
            message: "ffmpeg not found or not working".to_string(),
        }),
    }
}

/// Decodes any format ffmpeg understands into mono f32 samples at `sample_rate`.
pub async fn decode_mono(path: &Path, sample_rate: u32) -> Result<Vec<f32>, TrainingError> {
    let output = Command::new("ffmpeg")
        .args(["-v", "error", "-nostdin", "-i"])
        .arg(path)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-ac",
            "1",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| TrainingError::Decode {
            path: path.to_path_buf(),
            message: format!("failed to run ffmpeg: {}", e),
        })?;

    if !output.status.success() {
        return Err(TrainingError::Decode {
            path: path.to_path_buf(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(parse_f32le(&output.stdout))
}

/// A trailing partial sample is dropped.
fn parse_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(F32_BYTES)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
