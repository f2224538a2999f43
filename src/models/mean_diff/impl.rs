//! Implementation of the MeanDiff reference model: fitting and inference.
use image::RgbImage;
use log::{debug, info};
use ndarray::{Array3, ArrayView3, Axis, Zip};

use crate::{elapsed_module, Heatmap, InspectError, InspectResult, Shape};

/// Added to the per-pixel std so constant channels do not divide by zero.
pub const DEFAULT_EPS: f32 = 1e-6;

#[derive(Debug, Clone)]
struct Reference {
    mean: Array3<f32>,
    std: Array3<f32>,
}

/// Per-pixel statistical reference fitted on known-good images.
///
/// The heatmap of a test image is `|x - mean| / (std + eps)` averaged over
/// channels, and its anomaly score is the heatmap maximum: one strongly
/// deviant region is enough to flag the image.
///
/// `fit` replaces any previous state; `infer` takes `&self`, so a fitted
/// model can be shared read-only across threads.
#[derive(Debug, Clone)]
pub struct MeanDiff {
    eps: f32,
    reference: Option<Reference>,
}

impl Default for MeanDiff {
    fn default() -> Self {
        Self {
            eps: DEFAULT_EPS,
            reference: None,
        }
    }
}

impl MeanDiff {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_eps(mut self, eps: f32) -> Self {
        self.eps = eps;
        self
    }

    pub fn eps(&self) -> f32 {
        self.eps
    }

    pub fn is_fitted(&self) -> bool {
        self.reference.is_some()
    }

    /// `(height, width, channels)` of the fitted reference.
    pub fn shape(&self) -> Option<Shape> {
        self.reference.as_ref().map(|r| r.mean.dim())
    }

    pub fn mean(&self) -> Option<&Array3<f32>> {
        self.reference.as_ref().map(|r| &r.mean)
    }

    pub fn std(&self) -> Option<&Array3<f32>> {
        self.reference.as_ref().map(|r| &r.std)
    }

    /// Fits per-pixel mean and population std over `images`.
    pub fn fit(&mut self, images: &[RgbImage]) -> InspectResult<()> {
        let first = images.first().ok_or(InspectError::EmptyTrainingSet)?;
        let shape = shape_of(first);
        if let Some(actual) = images.iter().map(shape_of).find(|s| *s != shape) {
            return Err(InspectError::ShapeMismatch {
                expected: shape,
                actual,
            });
        }

        let reference = elapsed_module!("MEANDIFF", "fit", {
            let n = images.len() as f64;

            // f64 accumulation; 8-bit sums over many images lose precision in f32
            let mut sum = Array3::<f64>::zeros(shape);
            for image in images {
                sum += &as_view(image)?.mapv(f64::from);
            }
            let mean = sum / n;

            let mut var = Array3::<f64>::zeros(shape);
            for image in images {
                let d = as_view(image)?.mapv(f64::from) - &mean;
                var += &(&d * &d);
            }
            let std = (var / n).mapv(f64::sqrt);

            Reference {
                mean: mean.mapv(|v| v as f32),
                std: std.mapv(|v| v as f32),
            }
        });

        info!(
            "Fitted MeanDiff reference on {} image(s) of shape {:?}",
            images.len(),
            shape
        );
        self.reference = Some(reference);

        Ok(())
    }

    /// Scores `image` against the reference, returning `(score, heatmap)`.
    pub fn infer(&self, image: &RgbImage) -> InspectResult<(f32, Heatmap)> {
        let reference = self.reference.as_ref().ok_or(InspectError::ModelNotFitted)?;
        let expected = reference.mean.dim();
        let actual = shape_of(image);
        if actual != expected {
            return Err(InspectError::ShapeMismatch { expected, actual });
        }

        let x = as_view(image)?;
        let eps = self.eps;
        let mut z = Array3::<f32>::zeros(expected);
        Zip::from(&mut z)
            .and(&x)
            .and(&reference.mean)
            .and(&reference.std)
            .for_each(|z, &x, &m, &s| *z = (f32::from(x) - m).abs() / (s + eps));

        let (h, w, _) = expected;
        let map = z
            .mean_axis(Axis(2))
            .unwrap_or_else(|| ndarray::Array2::zeros((h, w)));
        let score = map.iter().copied().fold(0.0, f32::max);
        debug!("MeanDiff score: {:.4}", score);

        Ok((score, Heatmap::from(map)))
    }
}

fn shape_of(image: &RgbImage) -> Shape {
    (image.height() as usize, image.width() as usize, 3)
}

fn as_view(image: &RgbImage) -> InspectResult<ArrayView3<'_, u8>> {
    Ok(ArrayView3::from_shape(shape_of(image), image.as_raw().as_slice())?)
}
