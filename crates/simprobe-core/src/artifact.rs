//! Screenshot artifacts and their naming convention.
//!
//! Every capture is written as `<ordinal>_<label>[_<variant>].png`, where the
//! ordinal is the two-digit number of the probe step that produced it. The
//! analyzer relies on this convention to recover capture order from file
//! names alone.

use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// File extension used for every capture.
pub const EXTENSION: &str = "png";

/// Parsed form of an artifact file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactName {
    /// Step number, rendered as two digits.
    pub ordinal: u8,
    /// Semantic label, e.g. `profile_tab_tapped`.
    pub label: String,
    /// 1-based attempt number within the step, if the step has several.
    pub variant: Option<u32>,
}

impl ArtifactName {
    pub fn new(ordinal: u8, label: impl Into<String>, variant: Option<u32>) -> Self {
        Self {
            ordinal,
            label: label.into(),
            variant,
        }
    }

    /// Renders the file name, including the `.png` extension.
    pub fn file_name(&self) -> String {
        match self.variant {
            Some(v) => format!("{:02}_{}_{}.{}", self.ordinal, self.label, v, EXTENSION),
            None => format!("{:02}_{}.{}", self.ordinal, self.label, EXTENSION),
        }
    }

    /// Parses a file name produced by [`file_name`](Self::file_name).
    ///
    /// Returns `None` for names without a numeric ordinal prefix or without
    /// the `.png` extension. A trailing `_<digits>` segment is read as the
    /// variant.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".png")?;
        let (ordinal, rest) = stem.split_once('_')?;
        if ordinal.is_empty() || !ordinal.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let ordinal: u8 = ordinal.parse().ok()?;
        if rest.is_empty() {
            return None;
        }

        let (label, variant) = match rest.rsplit_once('_') {
            Some((label, v)) if !label.is_empty() && !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()) => {
                (label, v.parse().ok())
            }
            _ => (rest, None),
        };

        Some(Self::new(ordinal, label, variant))
    }
}

impl fmt::Display for ArtifactName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.file_name())
    }
}

/// A captured screenshot on stable storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Full path of the image file.
    pub path: PathBuf,
    /// Parsed name, if the file name follows the ordinal convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<ArtifactName>,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(ArtifactName::parse);
        Self { path, name }
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }

    /// Size on disk, or `None` if the file is missing or unreadable.
    pub fn size_on_disk(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

/// Orders artifacts by ordinal prefix, then label, then variant, with file
/// name as the final tie-break.
///
/// Plain string order would misplace `_10` after `_1`, so variants are
/// compared numerically. Files outside the naming convention sort after all
/// conventional ones, by file name.
pub fn capture_order(a: &Artifact, b: &Artifact) -> Ordering {
    let by_name = match (&a.name, &b.name) {
        (Some(x), Some(y)) => x
            .ordinal
            .cmp(&y.ordinal)
            .then_with(|| x.label.cmp(&y.label))
            .then_with(|| x.variant.cmp(&y.variant)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_name.then_with(|| a.file_name().cmp(b.file_name()))
}

/// Resolves an artifact name inside a directory.
pub fn artifact_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}
