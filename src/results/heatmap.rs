use anyhow::Result;
use image::{GrayImage, Luma};
use ndarray::Array2;

/// Heatmap: per-pixel deviation magnitudes, `[height, width]`.
#[derive(Default, Clone, PartialEq)]
pub struct Heatmap {
    map: Array2<f32>,
}

impl std::fmt::Debug for Heatmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heatmap")
            .field("dimensions", &self.dimensions())
            .field("min", &self.min())
            .field("max", &self.max())
            .finish()
    }
}

impl From<Array2<f32>> for Heatmap {
    fn from(map: Array2<f32>) -> Self {
        Self { map }
    }
}

impl Heatmap {
    /// Builds a heatmap from row-major values.
    pub fn new(values: &[f32], width: u32, height: u32) -> Result<Self> {
        let map = Array2::from_shape_vec((height as usize, width as usize), values.to_vec())
            .map_err(|err| anyhow::anyhow!("Failed to build heatmap: {err}"))?;

        Ok(Self { map })
    }

    pub fn map(&self) -> &Array2<f32> {
        &self.map
    }

    pub fn into_inner(self) -> Array2<f32> {
        self.map
    }

    pub fn height(&self) -> u32 {
        self.map.nrows() as u32
    }

    pub fn width(&self) -> u32 {
        self.map.ncols() as u32
    }

    /// `(width, height)`, matching `image` conventions.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn min(&self) -> Option<f32> {
        self.map.iter().copied().reduce(f32::min)
    }

    pub fn max(&self) -> Option<f32> {
        self.map.iter().copied().reduce(f32::max)
    }

    /// 8-bit rendering of a normalized heatmap: `v * 255`, clipped, truncated.
    pub fn to_gray(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width(), self.height());
        for (y, row) in self.map.outer_iter().enumerate() {
            for (x, &v) in row.iter().enumerate() {
                gray.put_pixel(x as u32, y as u32, Luma([(v * 255.0).clamp(0.0, 255.0) as u8]));
            }
        }
        gray
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_from_row_major_values() {
        let hm = Heatmap::new(&[0.0, 1.0, 2.0, 3.0, 4.0, 5.0], 3, 2).unwrap();
        assert_eq!(hm.dimensions(), (3, 2));
        assert_eq!(hm.map()[[1, 0]], 3.0);
        assert_eq!(hm.max(), Some(5.0));
        assert_eq!(hm.min(), Some(0.0));
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(Heatmap::new(&[0.0; 5], 3, 2).is_err());
    }

    #[test]
    fn gray_rendering_clips() {
        let hm = Heatmap::new(&[-1.0, 0.5, 1.0, 2.0], 2, 2).unwrap();
        let gray = hm.to_gray();
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
        assert_eq!(gray.get_pixel(1, 0)[0], 127);
        assert_eq!(gray.get_pixel(0, 1)[0], 255);
        assert_eq!(gray.get_pixel(1, 1)[0], 255);
    }

    #[test]
    fn empty_heatmap_has_no_extrema() {
        let hm = Heatmap::default();
        assert!(hm.is_empty());
        assert_eq!(hm.max(), None);
    }
}
