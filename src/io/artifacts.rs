use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::DynamicImage;
use ndarray::Array2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Normalized heatmap, 8-bit grayscale.
    Heatmap,
    /// Binary mask, 0/255.
    Mask,
    /// Heatmap blended over the input image.
    Overlay,
}

impl ArtifactKind {
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Heatmap => "heatmaps",
            Self::Mask => "masks",
            Self::Overlay => "overlays",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Heatmap => "hm",
            Self::Mask => "mask",
            Self::Overlay => "overlay",
        }
    }
}

/// Where per-image artifacts go. Returns the location written to.
pub trait ArtifactSink: Send + Sync {
    fn write_image(&self, kind: ArtifactKind, image_id: &str, image: &DynamicImage) -> Result<String>;

    fn write_raw_heatmap(&self, image_id: &str, heatmap: &Array2<f32>) -> Result<String>;
}

/// Writes PNG artifacts under `<root>/<kind>/<image_id>_<suffix>.png`.
#[derive(Debug, Clone)]
pub struct PngArtifactSink {
    root: PathBuf,
}

impl PngArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, kind: ArtifactKind, image_id: &str) -> PathBuf {
        self.root
            .join(kind.dir_name())
            .join(format!("{image_id}_{}.png", kind.suffix()))
    }

    fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        Ok(())
    }
}

impl ArtifactSink for PngArtifactSink {
    fn write_image(&self, kind: ArtifactKind, image_id: &str, image: &DynamicImage) -> Result<String> {
        let path = self.path_for(kind, image_id);
        Self::ensure_parent(&path)?;
        image
            .save_with_format(&path, image::ImageFormat::Png)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn write_raw_heatmap(&self, image_id: &str, heatmap: &Array2<f32>) -> Result<String> {
        let path = self.root.join("raw").join(format!("{image_id}_hm.npy"));
        Self::ensure_parent(&path)?;
        ndarray_npy::write_npy(&path, heatmap)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path.to_string_lossy().into_owned())
    }
}
