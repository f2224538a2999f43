//! Sample enumeration over the MVTec-AD folder layout:
//!
//! ```text
//! root/<category>/train/good/*.png
//! root/<category>/test/<label>/*.png
//! root/<category>/ground_truth/<label>/<stem>_mask.png
//! ```
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::InspectError;

/// Label of defect-free samples.
pub const GOOD_LABEL: &str = "good";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Test,
}

impl Split {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Test => "test",
        }
    }
}

impl std::fmt::Display for Split {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled input image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub image_path: PathBuf,
    pub mask_path: Option<PathBuf>,
    pub category: String,
    pub split: Split,
    pub label: String,
}

impl Sample {
    pub fn is_good(&self) -> bool {
        self.label == GOOD_LABEL
    }

    /// Identifier used for artifacts and results.
    ///
    /// MVTec reuses file names across label folders (`000.png` exists under
    /// every defect type), so the label is prefixed to keep ids unique.
    pub fn image_id(&self) -> String {
        let stem = self
            .image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("{}_{}", self.label, stem)
    }
}

fn sorted_natural(mut paths: Vec<PathBuf>) -> Vec<PathBuf> {
    paths.sort_by(|a, b| natord::compare(&a.to_string_lossy(), &b.to_string_lossy()));
    paths
}

fn list_pngs(dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("*");
    let pattern = pattern.to_string_lossy();
    let paths = glob::glob(&pattern)
        .with_context(|| format!("Bad glob pattern: {pattern}"))?
        .filter_map(|entry| entry.ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.extension()
                .map(|e| e.eq_ignore_ascii_case("png"))
                .unwrap_or(false)
        })
        .collect();
    Ok(sorted_natural(paths))
}

/// Enumerates the samples of one category split.
///
/// Label folders and files come back in natural order. Test samples of a
/// defect label get a ground-truth mask path when the mask file exists.
pub fn mvtec_samples(root: &Path, category: &str, split: Split) -> Result<Vec<Sample>> {
    let base = root.join(category).join(split.as_str());
    if !base.is_dir() {
        return Err(InspectError::MissingSplit(base).into());
    }

    let label_dirs: Vec<PathBuf> = std::fs::read_dir(&base)
        .with_context(|| format!("Failed to read {}", base.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();

    let mut samples = Vec::new();
    for label_dir in sorted_natural(label_dirs) {
        let label = label_dir
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        for image_path in list_pngs(&label_dir)? {
            let mask_path = if split == Split::Test && label != GOOD_LABEL {
                image_path.file_stem().and_then(|stem| {
                    let candidate = root
                        .join(category)
                        .join("ground_truth")
                        .join(&label)
                        .join(format!("{}_mask.png", stem.to_string_lossy()));
                    candidate.is_file().then_some(candidate)
                })
            } else {
                None
            };
            samples.push(Sample {
                image_path,
                mask_path,
                category: category.to_string(),
                split,
                label: label.clone(),
            });
        }
    }
    log::debug!(
        "Found {} {} sample(s) for {} under {}",
        samples.len(),
        split,
        category,
        root.display()
    );

    Ok(samples)
}

/// Decodes an image file and converts it to 8-bit RGB.
pub fn load_image_rgb(path: &Path) -> Result<RgbImage> {
    let image = image::ImageReader::open(path)
        .with_context(|| format!("Failed to open image {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("Failed to decode image {}", path.display()))?;
    Ok(image.to_rgb8())
}
