use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use image::{ImageFormat, RgbaImage};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::gesture::ColorFrame;

/// Writes the camera frame as a PNG into `dir` and returns its path.
pub fn save_evidence(frame: &ColorFrame, dir: &Path, at: DateTime<Utc>) -> Result<PathBuf> {
    let expected = frame.width as usize * frame.height as usize * 4;
    if frame.width == 0 || frame.height == 0 || frame.bgra.len() != expected {
        bail!(
            "color frame {}x{} has {} bytes, expected {}",
            frame.width,
            frame.height,
            frame.bgra.len(),
            expected
        );
    }

    let mut rgba = frame.bgra.clone();
    for pixel in rgba.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }

    let image = RgbaImage::from_raw(frame.width, frame.height, rgba)
        .ok_or_else(|| anyhow!("color frame buffer does not match its dimensions"))?;

    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create evidence directory {}", dir.display()))?;
    let path = dir.join(format!("alert-{}.png", at.format("%Y%m%d-%H%M%S%.3f")));
    image
        .save_with_format(&path, ImageFormat::Png)
        .with_context(|| format!("failed to write evidence to {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        std::env::temp_dir().join(format!("gesturelock-evidence-{}", uuid::Uuid::new_v4()))
    }

    #[test]
    fn writes_png_with_swapped_channels() {
        let dir = temp_dir();
        // One blue pixel and one red pixel, BGRA.
        let frame = ColorFrame {
            width: 2,
            height: 1,
            bgra: vec![255, 0, 0, 255, 0, 0, 255, 255],
        };
        let path = save_evidence(&frame, &dir, Utc::now()).unwrap();
        assert!(path.extension().map(|ext| ext == "png").unwrap_or(false));

        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [0, 0, 255, 255]);
        assert_eq!(decoded.get_pixel(1, 0).0, [255, 0, 0, 255]);

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn rejects_truncated_frames() {
        let frame = ColorFrame {
            width: 4,
            height: 4,
            bgra: vec![0; 10],
        };
        assert!(save_evidence(&frame, &temp_dir(), Utc::now()).is_err());
    }
}
