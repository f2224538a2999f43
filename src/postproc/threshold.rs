use serde::{Deserialize, Serialize};

use crate::{Heatmap, InspectError, Mask};

/// How the mask threshold is chosen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ThresholdMethod {
    /// Use the configured value directly.
    #[default]
    Fixed,
    /// Use a percentile of the heatmap's own values.
    Percentile,
}

impl ThresholdMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fixed => "fixed",
            Self::Percentile => "percentile",
        }
    }
}

impl std::str::FromStr for ThresholdMethod {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fixed" => Ok(Self::Fixed),
            "percentile" => Ok(Self::Percentile),
            _ => Err(InspectError::unknown_method("threshold", s)),
        }
    }
}

impl TryFrom<String> for ThresholdMethod {
    type Error = InspectError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for ThresholdMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `q`-th percentile (0..=100) with linear interpolation between closest ranks.
pub fn percentile(values: &[f32], q: f32) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f32::total_cmp);

    let rank = (q.clamp(0.0, 100.0) as f64 / 100.0) * (sorted.len() - 1) as f64;
    let (lo, hi) = (rank.floor() as usize, rank.ceil() as usize);
    let frac = (rank - lo as f64) as f32;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Resolves the threshold a heatmap would be cut at.
pub fn resolve_threshold(
    heatmap: &Heatmap,
    method: ThresholdMethod,
    value: f32,
    percentile_q: f32,
) -> f32 {
    match method {
        ThresholdMethod::Fixed => value,
        ThresholdMethod::Percentile => {
            let values: Vec<f32> = heatmap.map().iter().copied().collect();
            percentile(&values, percentile_q).unwrap_or(value)
        }
    }
}

/// Binary mask of pixels with `heatmap >= threshold`.
pub fn threshold_heatmap(
    heatmap: &Heatmap,
    method: ThresholdMethod,
    value: f32,
    percentile_q: f32,
) -> Mask {
    let t = resolve_threshold(heatmap, method, value, percentile_q);
    log::debug!("Mask threshold ({method}): {t:.4}");
    Mask::from(heatmap.map().mapv(|v| u8::from(v >= t)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn fixed_threshold_is_inclusive() {
        let hm = Heatmap::from(array![[0.2f32, 0.6], [0.9, 0.1]]);
        let mask = threshold_heatmap(&hm, ThresholdMethod::Fixed, 0.5, 99.5);
        assert_eq!(mask.map(), &array![[0u8, 1], [1, 0]]);

        let at = threshold_heatmap(&hm, ThresholdMethod::Fixed, 0.6, 0.0);
        assert_eq!(at.map(), &array![[0u8, 1], [1, 0]]);
    }

    #[test]
    fn percentile_interpolates() {
        let xs = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&xs, 50.0), Some(3.0));
        assert_eq!(percentile(&xs, 0.0), Some(1.0));
        assert_eq!(percentile(&xs, 100.0), Some(5.0));
        assert!((percentile(&xs, 90.0).unwrap() - 4.6).abs() < 1e-5);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn percentile_threshold_adapts_per_image() {
        let values: Vec<f32> = (0..100).map(|v| v as f32 / 100.0).collect();
        let hm = Heatmap::from(Array2::from_shape_vec((10, 10), values).unwrap());
        let mask = threshold_heatmap(&hm, ThresholdMethod::Percentile, 0.5, 95.0);
        // values 0.9405 and up: 0.95..=0.99
        assert_eq!(mask.foreground_count(), 5);
        assert_eq!(mask.map()[[9, 9]], 1);
    }

    #[test]
    fn parses_names() {
        assert_eq!("Percentile".parse::<ThresholdMethod>().unwrap(), ThresholdMethod::Percentile);
        assert!(matches!(
            "otsu".parse::<ThresholdMethod>(),
            Err(InspectError::UnknownMethod { kind: "threshold", .. })
        ));
    }
}
