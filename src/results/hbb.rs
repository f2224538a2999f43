use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates.
///
/// `x_max` and `y_max` are exclusive: a box covering a single pixel at `(3, 4)`
/// is `[3, 4, 4, 5]`. Serialized as `[x_min, y_min, x_max, y_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 4]", into = "[u32; 4]")]
pub struct BoundingBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

impl BoundingBox {
    pub fn new(x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Self {
        Self {
            x_min,
            y_min,
            x_max,
            y_max,
        }
    }

    pub fn width(&self) -> u32 {
        self.x_max.saturating_sub(self.x_min)
    }

    pub fn height(&self) -> u32 {
        self.y_max.saturating_sub(self.y_min)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x_min && x < self.x_max && y >= self.y_min && y < self.y_max
    }

    pub fn xyxy(&self) -> [u32; 4] {
        [self.x_min, self.y_min, self.x_max, self.y_max]
    }
}

impl From<[u32; 4]> for BoundingBox {
    fn from([x_min, y_min, x_max, y_max]: [u32; 4]) -> Self {
        Self::new(x_min, y_min, x_max, y_max)
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        b.xyxy()
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.x_min, self.y_min, self.x_max, self.y_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exclusive_extents() {
        let b = BoundingBox::new(3, 4, 4, 5);
        assert_eq!(b.area(), 1);
        assert!(b.contains(3, 4));
        assert!(!b.contains(4, 4));
    }

    #[test]
    fn serializes_as_array() {
        let b = BoundingBox::new(1, 2, 10, 20);
        assert_eq!(serde_json::to_string(&b).unwrap(), "[1,2,10,20]");
        let back: BoundingBox = serde_json::from_str("[1,2,10,20]").unwrap();
        assert_eq!(back, b);
        assert_eq!(b.to_string(), "[1, 2, 10, 20]");
    }
}
