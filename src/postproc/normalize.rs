use serde::{Deserialize, Serialize};

use crate::{Heatmap, InspectError};

/// Heatmaps whose value range is below this are treated as flat.
pub const FLAT_RANGE_EPS: f32 = 1e-12;

/// How a raw heatmap is rescaled to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum NormalizeMethod {
    /// Linear rescale with the heatmap's own min and max.
    #[default]
    MinMax,
}

impl NormalizeMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MinMax => "minmax",
        }
    }
}

impl std::str::FromStr for NormalizeMethod {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minmax" => Ok(Self::MinMax),
            _ => Err(InspectError::unknown_method("normalize", s)),
        }
    }
}

impl TryFrom<String> for NormalizeMethod {
    type Error = InspectError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for NormalizeMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rescales `heatmap` into `[0, 1]`.
///
/// A flat heatmap (`max - min < 1e-12`) maps to all zeros rather than being
/// divided by a near-zero range.
pub fn normalize_heatmap(heatmap: &Heatmap, method: NormalizeMethod) -> Heatmap {
    match method {
        NormalizeMethod::MinMax => {
            let (Some(lo), Some(hi)) = (heatmap.min(), heatmap.max()) else {
                return heatmap.clone();
            };
            let range = hi - lo;
            if range < FLAT_RANGE_EPS {
                return Heatmap::from(ndarray::Array2::zeros(heatmap.map().raw_dim()));
            }
            Heatmap::from(heatmap.map().mapv(|v| ((v - lo) / range).clamp(0.0, 1.0)))
        }
    }
}
