use serde::{Deserialize, Serialize};

use crate::InspectError;

/// Rule for fusing the anomaly-model and labeler confidences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum CombineMethod {
    /// The weaker of the two signals.
    #[default]
    Min,
    /// Arithmetic mean.
    Mean,
}

impl CombineMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Mean => "mean",
        }
    }
}

impl std::str::FromStr for CombineMethod {
    type Err = InspectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "min" => Ok(Self::Min),
            "mean" => Ok(Self::Mean),
            _ => Err(InspectError::unknown_method("combine", s)),
        }
    }
}

impl TryFrom<String> for CombineMethod {
    type Error = InspectError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl std::fmt::Display for CombineMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn combine_confidence(anomaly: f32, label: f32, method: CombineMethod) -> f32 {
    match method {
        CombineMethod::Min => anomaly.min(label),
        CombineMethod::Mean => (anomaly + label) / 2.0,
    }
}
