//! Pipeline configuration.
//!
//! Loaded from a JSON document with one section per concern:
//!
//! ```json
//! {
//!   "data": { "root": "datasets/mvtec", "category": "bottle" },
//!   "paths": { "artifacts": "runs/artifacts", "outputs": "runs", "results_json": "results.json" },
//!   "postproc": { "heatmap_normalize": "minmax", "threshold_method": "fixed",
//!                 "threshold_value": 0.5, "threshold_percentile": 99.5,
//!                 "min_area": 20, "image_threshold": 3.0 },
//!   "labels": { "labels": { "bottle": ["broken_large", "broken_small", "contamination"] },
//!               "unknown_label": "UNKNOWN" },
//!   "risk": { "rpm": [], "risk_to_action": { "REVIEW_REQUIRED": "HOLD_FOR_REVIEW" } },
//!   "uncertainty": { "combine_method": "min", "review_threshold": 0.6 }
//! }
//! ```
//!
//! Method names are parsed into enums while loading, so an unknown method
//! fails before any image is touched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use aksr::Builder;
use serde::{Deserialize, Serialize};

use crate::{
    CombineMethod, InspectError, InspectResult, NormalizeMethod, RpmTable, ThresholdMethod,
    REVIEW_REQUIRED,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub postproc: PostprocConfig,
    pub labels: LabelsConfig,
    pub risk: RiskConfig,
    #[serde(default)]
    pub uncertainty: UncertaintyConfig,
    #[serde(default)]
    pub vlm: Option<VlmConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Dataset root in MVTec-AD layout.
    pub root: PathBuf,
    pub category: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub artifacts: PathBuf,
    pub outputs: PathBuf,
    pub results_json: String,
    /// Also write heatmap overlays on the input image.
    pub save_overlays: bool,
    /// Also write the raw (unnormalized) heatmap as `.npy`.
    pub save_raw_heatmaps: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            artifacts: PathBuf::from("runs/artifacts"),
            outputs: PathBuf::from("runs"),
            results_json: "results.json".to_string(),
            save_overlays: false,
            save_raw_heatmaps: false,
        }
    }
}

impl PathsConfig {
    pub fn results_path(&self) -> PathBuf {
        self.outputs.join(&self.results_json)
    }
}

#[derive(Builder, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostprocConfig {
    pub heatmap_normalize: NormalizeMethod,
    pub threshold_method: ThresholdMethod,
    pub threshold_value: f32,
    /// Percentile in `0..=100`, used by [`ThresholdMethod::Percentile`].
    pub threshold_percentile: f32,
    pub min_area: usize,
    /// Raw anomaly score at or above which an image is anomalous.
    pub image_threshold: f32,
}

impl Default for PostprocConfig {
    fn default() -> Self {
        Self {
            heatmap_normalize: NormalizeMethod::MinMax,
            threshold_method: ThresholdMethod::Fixed,
            threshold_value: 0.5,
            threshold_percentile: 99.5,
            min_area: 20,
            image_threshold: 3.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelsConfig {
    /// Defect vocabulary per category.
    pub labels: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_unknown_label")]
    pub unknown_label: String,
}

fn default_unknown_label() -> String {
    "UNKNOWN".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub rpm: RpmTable,
    pub risk_to_action: BTreeMap<String, String>,
    /// Externally supplied scoring inputs; not derived from the image.
    #[serde(default)]
    pub severity: Option<i64>,
    #[serde(default)]
    pub occurrence: Option<i64>,
    #[serde(default)]
    pub detection: Option<i64>,
}

#[derive(Builder, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UncertaintyConfig {
    pub combine_method: CombineMethod,
    pub review_threshold: f32,
}

impl Default for UncertaintyConfig {
    fn default() -> Self {
        Self {
            combine_method: CombineMethod::Min,
            review_threshold: 0.6,
        }
    }
}

/// Vision-language model backend for semantic labeling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlmConfig {
    #[serde(default)]
    pub enabled: bool,
    /// OpenAI-compatible chat completions URL.
    pub endpoint: String,
    pub model_id: String,
    #[serde(default = "default_device")]
    pub device: String,
    /// Environment variable holding a bearer token, if the endpoint needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_device() -> String {
    "remote".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_tokens() -> u32 {
    256
}

impl Config {
    pub fn from_json_str(s: &str) -> InspectResult<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> InspectResult<Self> {
        let s = std::fs::read_to_string(path)?;
        Self::from_json_str(&s)
    }

    /// Defect vocabulary of the configured category; empty if none is set.
    pub fn label_set(&self) -> &[String] {
        self.labels
            .labels
            .get(&self.data.category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn validate(&self) -> InspectResult<()> {
        if self.data.category.trim().is_empty() {
            return Err(InspectError::invalid_config("data.category is empty"));
        }

        let p = &self.postproc;
        if !p.threshold_value.is_finite() {
            return Err(InspectError::invalid_config(
                "postproc.threshold_value must be finite",
            ));
        }
        if !(0.0..=100.0).contains(&p.threshold_percentile) {
            return Err(InspectError::invalid_config(format!(
                "postproc.threshold_percentile must be in [0, 100], got {}",
                p.threshold_percentile
            )));
        }
        if !p.image_threshold.is_finite() || p.image_threshold < 0.0 {
            return Err(InspectError::invalid_config(format!(
                "postproc.image_threshold must be >= 0, got {}",
                p.image_threshold
            )));
        }

        let u = &self.uncertainty;
        if !(0.0..=1.0).contains(&u.review_threshold) {
            return Err(InspectError::invalid_config(format!(
                "uncertainty.review_threshold must be in [0, 1], got {}",
                u.review_threshold
            )));
        }

        if self.labels.unknown_label.trim().is_empty() {
            return Err(InspectError::invalid_config("labels.unknown_label is empty"));
        }
        for (category, labels) in &self.labels.labels {
            if labels.iter().any(|l| l == &self.labels.unknown_label) {
                return Err(InspectError::invalid_config(format!(
                    "labels.labels.{category} contains the unknown label {:?}",
                    self.labels.unknown_label
                )));
            }
        }
        if !self.risk.risk_to_action.contains_key(REVIEW_REQUIRED) {
            return Err(InspectError::MissingFallbackAction(REVIEW_REQUIRED));
        }

        if let Some(vlm) = self.vlm.as_ref().filter(|v| v.enabled) {
            if vlm.endpoint.trim().is_empty() || vlm.model_id.trim().is_empty() {
                return Err(InspectError::invalid_config(
                    "vlm.endpoint and vlm.model_id are required when vlm.enabled",
                ));
            }
        }

        Ok(())
    }
}
