use anyhow::{anyhow, Context, Result};
use std::process::Command;

/// Opaque "decode + lossy encode" capability supplied by the host platform.
///
/// `quality` is in [0.0, 1.0]; what it maps to is the implementation's
/// business. The pipeline treats the returned bytes as an opaque payload.
pub trait ImageCodec: Send + Sync {
    fn transcode(&self, source: &[u8], quality: f32) -> Result<Vec<u8>>;
}

/// Production codec: validates and decodes the source with the `image`
/// crate, then encodes HEIC through the `heif-enc` CLI (libheif) via
/// scratch files. The `image` crate has no HEIC encoder, so the external
/// tool fills the gap.
pub struct HeifEncCodec;

/// Check whether `heif-enc` is available on the system.
pub fn is_heif_enc_available() -> bool {
    Command::new("heif-enc")
        .arg("--version")
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Map the [0.0, 1.0] quality parameter onto heif-enc's 0-100 scale.
fn quality_to_percent(quality: f32) -> u8 {
    (quality.clamp(0.0, 1.0) * 100.0).round() as u8
}

impl ImageCodec for HeifEncCodec {
    fn transcode(&self, source: &[u8], quality: f32) -> Result<Vec<u8>> {
        let img = image::load_from_memory(source).context("failed to decode source image")?;

        // Unique scratch files keep parallel workers from clobbering each
        // other; both are cleaned up on drop.
        let input = tempfile::Builder::new()
            .prefix("heicify_in_")
            .suffix(".png")
            .tempfile()
            .context("failed to create temporary input file")?;
        let output = tempfile::Builder::new()
            .prefix("heicify_out_")
            .suffix(".heic")
            .tempfile()
            .context("failed to create temporary output file")?;

        img.save(input.path())
            .context("failed to stage decoded image for encoding")?;

        let result = Command::new("heif-enc")
            .arg("-q")
            .arg(quality_to_percent(quality).to_string())
            .arg("-o")
            .arg(output.path())
            .arg(input.path())
            .output()
            .context("failed to run heif-enc")?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(anyhow!("heif-enc failed: {}", stderr.trim()));
        }

        let bytes = std::fs::read(output.path()).context("failed to read encoded image")?;
        if bytes.is_empty() {
            return Err(anyhow!("heif-enc produced no output"));
        }
        Ok(bytes)
    }
}
