use image::{GrayImage, Luma};
use ndarray::Array2;

/// Binary anomaly mask, `[height, width]`, values 0 or 1.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Mask {
    map: Array2<u8>,
}

impl From<Array2<u8>> for Mask {
    /// Any non-zero value is treated as foreground.
    fn from(map: Array2<u8>) -> Self {
        Self {
            map: map.mapv(|v| u8::from(v > 0)),
        }
    }
}

impl Mask {
    pub fn map(&self) -> &Array2<u8> {
        &self.map
    }

    pub fn height(&self) -> u32 {
        self.map.nrows() as u32
    }

    pub fn width(&self) -> u32 {
        self.map.ncols() as u32
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn foreground_count(&self) -> usize {
        self.map.iter().filter(|&&v| v > 0).count()
    }

    /// Fraction of pixels set; 0 for an empty mask.
    pub fn ratio(&self) -> f32 {
        if self.map.is_empty() {
            return 0.0;
        }
        self.foreground_count() as f32 / self.map.len() as f32
    }

    /// 0/255 rendering.
    pub fn to_gray(&self) -> GrayImage {
        let mut gray = GrayImage::new(self.width(), self.height());
        for ((y, x), &v) in self.map.indexed_iter() {
            gray.put_pixel(x as u32, y as u32, Luma([v * 255]));
        }
        gray
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn counts_and_ratio() {
        let mask = Mask::from(array![[0u8, 1], [1, 0]]);
        assert_eq!(mask.foreground_count(), 2);
        assert_eq!(mask.ratio(), 0.5);
        assert_eq!(Mask::default().ratio(), 0.0);
    }

    #[test]
    fn non_zero_values_collapse_to_one() {
        let mask = Mask::from(array![[0u8, 7], [255, 0]]);
        assert_eq!(mask.map(), &array![[0u8, 1], [1, 0]]);
        let gray = mask.to_gray();
        assert_eq!(gray.get_pixel(1, 0)[0], 255);
        assert_eq!(gray.get_pixel(0, 0)[0], 0);
    }
}
