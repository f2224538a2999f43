use std::collections::BTreeMap;

use image::Luma;
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::{BoundingBox, Mask};

/// Pixels touching diagonally belong to the same region.
pub const REGION_CONNECTIVITY: Connectivity = Connectivity::Eight;

#[derive(Debug, Clone, Copy)]
struct Extent {
    x_min: u32,
    y_min: u32,
    x_max: u32,
    y_max: u32,
    area: usize,
}

impl Extent {
    fn new(x: u32, y: u32) -> Self {
        Self {
            x_min: x,
            y_min: y,
            x_max: x,
            y_max: y,
            area: 0,
        }
    }

    fn add(&mut self, x: u32, y: u32) {
        self.x_min = self.x_min.min(x);
        self.y_min = self.y_min.min(y);
        self.x_max = self.x_max.max(x);
        self.y_max = self.y_max.max(y);
        self.area += 1;
    }

    fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.x_min, self.y_min, self.x_max + 1, self.y_max + 1)
    }
}

/// Bounding boxes of the 8-connected foreground regions of `mask` with at
/// least `min_area` pixels, ordered by `(y_min, x_min)`.
///
/// Regions below `min_area` are dropped entirely. An empty mask yields no boxes.
pub fn extract_regions(mask: &Mask, min_area: usize) -> Vec<BoundingBox> {
    if mask.foreground_count() == 0 {
        return Vec::new();
    }

    let labelled = connected_components(&mask.to_gray(), REGION_CONNECTIVITY, Luma([0u8]));

    let mut extents: BTreeMap<u32, Extent> = BTreeMap::new();
    for (x, y, p) in labelled.enumerate_pixels() {
        let id = p[0];
        if id == 0 {
            continue;
        }
        extents
            .entry(id)
            .or_insert_with(|| Extent::new(x, y))
            .add(x, y);
    }

    let n_regions = extents.len();
    let mut boxes: Vec<BoundingBox> = extents
        .into_values()
        .filter(|e| e.area >= min_area)
        .map(|e| e.bbox())
        .collect();
    boxes.sort_by_key(|b| (b.y_min, b.x_min));
    log::debug!(
        "Regions: {} found, {} kept (min_area={})",
        n_regions,
        boxes.len(),
        min_area
    );

    boxes
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn mask_with(h: usize, w: usize, pixels: &[(usize, usize)]) -> Mask {
        let mut m = Array2::<u8>::zeros((h, w));
        for &(y, x) in pixels {
            m[[y, x]] = 1;
        }
        Mask::from(m)
    }

    #[test]
    fn empty_mask_has_no_regions() {
        let mask = Mask::from(Array2::<u8>::zeros((5, 5)));
        assert!(extract_regions(&mask, 0).is_empty());
    }

    #[test]
    fn solid_square_box() {
        let pixels: Vec<_> = (2..5).flat_map(|y| (3..7).map(move |x| (y, x))).collect();
        let mask = mask_with(10, 10, &pixels);
        let boxes = extract_regions(&mask, 1);
        assert_eq!(boxes, vec![BoundingBox::new(3, 2, 7, 5)]);
        assert_eq!(boxes[0].area() as usize, mask.foreground_count());
    }

    #[test]
    fn diagonal_pixels_join() {
        let mask = Mask::from(array![[1u8, 0, 0], [0, 1, 0], [0, 0, 1]]);
        let boxes = extract_regions(&mask, 1);
        assert_eq!(boxes, vec![BoundingBox::new(0, 0, 3, 3)]);
    }

    #[test]
    fn small_regions_are_dropped() {
        let mut pixels: Vec<_> = (0..3).flat_map(|y| (0..3).map(move |x| (y, x))).collect();
        pixels.push((8, 8));
        pixels.extend([(6, 1), (6, 2)]);
        let mask = mask_with(10, 10, &pixels);

        let all = extract_regions(&mask, 1);
        assert_eq!(all.len(), 3);

        let kept = extract_regions(&mask, 2);
        assert_eq!(
            kept,
            vec![BoundingBox::new(0, 0, 3, 3), BoundingBox::new(1, 6, 3, 7)]
        );

        let kept = extract_regions(&mask, 9);
        assert_eq!(kept, vec![BoundingBox::new(0, 0, 3, 3)]);
        assert!(extract_regions(&mask, 10).is_empty());
    }

    #[test]
    fn l_shaped_region_is_enclosed() {
        let mut pixels: Vec<_> = (1..6).map(|y| (y, 1)).collect();
        pixels.extend((2..6).map(|x| (5, x)));
        let mask = mask_with(8, 8, &pixels);
        assert_eq!(mask.foreground_count(), 9);

        let boxes = extract_regions(&mask, 9);
        assert_eq!(boxes, vec![BoundingBox::new(1, 1, 6, 6)]);
        assert!(pixels
            .iter()
            .all(|&(y, x)| boxes[0].contains(x as u32, y as u32)));
        // the box covers the empty corner of the L as well
        assert!(boxes[0].area() as usize > mask.foreground_count());

        assert!(extract_regions(&mask, 10).is_empty());
    }

    #[test]
    fn separate_regions_are_ordered_top_to_bottom() {
        let mask = mask_with(6, 6, &[(4, 0), (0, 5), (0, 1)]);
        let boxes = extract_regions(&mask, 1);
        assert_eq!(
            boxes,
            vec![
                BoundingBox::new(1, 0, 2, 1),
                BoundingBox::new(5, 0, 6, 1),
                BoundingBox::new(0, 4, 1, 5),
            ]
        );
    }
}
