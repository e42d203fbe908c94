//! Screen-change metrics for consecutive captures.
//!
//! A metric compares two artifacts and decides whether the screen changed
//! between them. [`TransitionMetric::FileSize`] is the default: compressed
//! screenshots of materially different content tend to differ materially in
//! size. [`TransitionMetric::PixelDiff`] decodes both images and compares
//! grayscale pixels instead.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::artifact::Artifact;

/// How two consecutive captures are compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionMetric {
    /// Absolute file-size delta strictly greater than `threshold_bytes`.
    FileSize { threshold_bytes: u64 },
    /// Mean absolute grayscale difference, normalized to `[0, 1]`, strictly
    /// greater than `threshold`. Images of different dimensions always count
    /// as a change.
    PixelDiff { threshold: f64 },
}

impl Default for TransitionMetric {
    fn default() -> Self {
        TransitionMetric::FileSize {
            threshold_bytes: 50_000,
        }
    }
}

/// Result of comparing one pair of consecutive captures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub from: String,
    pub to: String,
    /// Byte delta for [`TransitionMetric::FileSize`], normalized pixel
    /// difference for [`TransitionMetric::PixelDiff`]. `None` when either
    /// side could not be measured.
    pub score: Option<f64>,
    pub changed: bool,
}

impl TransitionMetric {
    pub fn name(&self) -> &'static str {
        match self {
            TransitionMetric::FileSize { .. } => "file_size",
            TransitionMetric::PixelDiff { .. } => "pixel_diff",
        }
    }

    /// Compares two captures. Never fails: an unmeasurable pair is reported
    /// with `score = None` and counts as no change.
    pub fn compare(&self, prev: &Artifact, next: &Artifact) -> Comparison {
        let score = match self {
            TransitionMetric::FileSize { .. } => match (prev.size_on_disk(), next.size_on_disk()) {
                (Some(a), Some(b)) => Some(a.abs_diff(b) as f64),
                _ => None,
            },
            TransitionMetric::PixelDiff { .. } => pixel_difference(prev, next),
        };

        let changed = match (self, score) {
            (TransitionMetric::FileSize { threshold_bytes }, Some(delta)) => delta > *threshold_bytes as f64,
            (TransitionMetric::PixelDiff { threshold }, Some(diff)) => diff > *threshold,
            (_, None) => false,
        };

        Comparison {
            from: prev.file_name().to_string(),
            to: next.file_name().to_string(),
            score,
            changed,
        }
    }
}

fn load_gray(artifact: &Artifact) -> Option<GrayImage> {
    match image::open(&artifact.path) {
        Ok(img) => Some(img.to_luma8()),
        Err(e) => {
            warn!(path = %artifact.path.display(), error = %e, "could not decode capture");
            None
        }
    }
}

fn pixel_difference(prev: &Artifact, next: &Artifact) -> Option<f64> {
    let a = load_gray(prev)?;
    let b = load_gray(next)?;

    if a.dimensions() != b.dimensions() {
        return Some(1.0);
    }
    let pixels = a.as_raw().len();
    if pixels == 0 {
        return Some(0.0);
    }

    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| u64::from(x.abs_diff(*y)))
        .sum();
    Some(total as f64 / (pixels as f64 * 255.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use std::path::Path;

    fn write_bytes(dir: &Path, name: &str, len: usize) -> Artifact {
        let path = dir.join(name);
        std::fs::write(&path, vec![0u8; len]).unwrap();
        Artifact::new(path)
    }

    fn write_gray(dir: &Path, name: &str, w: u32, h: u32, value: u8) -> Artifact {
        let path = dir.join(name);
        GrayImage::from_pixel(w, h, Luma([value])).save(&path).unwrap();
        Artifact::new(path)
    }

    #[test]
    fn file_size_delta_must_exceed_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_bytes(dir.path(), "01_a.png", 100_000);
        let b = write_bytes(dir.path(), "02_b.png", 150_000);
        let c = write_bytes(dir.path(), "03_c.png", 200_001);

        let metric = TransitionMetric::default();
        let exact = metric.compare(&a, &b);
        assert_eq!(exact.score, Some(50_000.0));
        assert!(!exact.changed, "a delta equal to the threshold is not a change");

        let over = metric.compare(&b, &c);
        assert!(over.changed);
        assert_eq!(over.from, "02_b.png");
        assert_eq!(over.to, "03_c.png");
    }

    #[test]
    fn file_size_delta_is_symmetric() {
        let dir = tempfile::tempdir().unwrap();
        let big = write_bytes(dir.path(), "01_big.png", 200_000);
        let small = write_bytes(dir.path(), "02_small.png", 90_000);

        let metric = TransitionMetric::default();
        assert!(metric.compare(&big, &small).changed);
        assert!(metric.compare(&small, &big).changed);
    }

    #[test]
    fn missing_file_is_not_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_bytes(dir.path(), "01_a.png", 10);
        let gone = Artifact::new(dir.path().join("02_gone.png"));

        let cmp = TransitionMetric::default().compare(&a, &gone);
        assert_eq!(cmp.score, None);
        assert!(!cmp.changed);
    }

    #[test]
    fn pixel_diff_detects_content_change() {
        let dir = tempfile::tempdir().unwrap();
        let black = write_gray(dir.path(), "01_black.png", 8, 8, 0);
        let white = write_gray(dir.path(), "02_white.png", 8, 8, 255);
        let black_again = write_gray(dir.path(), "03_black.png", 8, 8, 0);

        let metric = TransitionMetric::PixelDiff { threshold: 0.05 };
        let cmp = metric.compare(&black, &white);
        assert_eq!(cmp.score, Some(1.0));
        assert!(cmp.changed);

        let same = metric.compare(&black, &black_again);
        assert_eq!(same.score, Some(0.0));
        assert!(!same.changed);
    }

    #[test]
    fn pixel_diff_dimension_mismatch_is_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let small = write_gray(dir.path(), "01_small.png", 4, 4, 10);
        let large = write_gray(dir.path(), "02_large.png", 8, 4, 10);

        assert!(TransitionMetric::PixelDiff { threshold: 0.5 }.compare(&small, &large).changed);
    }

    #[test]
    fn pixel_diff_undecodable_is_not_a_change() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = write_bytes(dir.path(), "01_garbage.png", 64);
        let img = write_gray(dir.path(), "02_img.png", 4, 4, 200);

        let cmp = TransitionMetric::PixelDiff { threshold: 0.0 }.compare(&garbage, &img);
        assert_eq!(cmp.score, None);
        assert!(!cmp.changed);
    }

    #[test]
    fn metric_serializes_with_kind_tag() {
        let json = serde_json::to_string(&TransitionMetric::default()).unwrap();
        assert_eq!(json, r#"{"kind":"file_size","threshold_bytes":50000}"#);

        let parsed: TransitionMetric =
            serde_json::from_str(r#"{"kind":"pixel_diff","threshold":0.1}"#).unwrap();
        assert_eq!(parsed, TransitionMetric::PixelDiff { threshold: 0.1 });
    }
}
