//! Semantic defect labeling.
//!
//! A [`SemanticLabeler`] picks one defect label from a fixed per-category
//! vocabulary, or the unknown sentinel, and never anything else. Two
//! implementations exist: [`VlmLabeler`] asks a vision-language model through
//! a [`VlmBackend`], and [`HeuristicLabeler`] decides from region geometry
//! alone. [`build_labeler`] picks one once, at construction.

mod backend;
mod cache;
mod heuristic;
mod vlm;

pub use backend::*;
pub use cache::*;
pub use heuristic::*;
pub use vlm::*;

use std::sync::Arc;

use image::RgbImage;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::Config;

/// At most this many evidence strings are kept per label.
pub const MAX_EVIDENCE: usize = 3;

/// Everything a labeler may look at for one image.
#[derive(Debug, Clone, Copy)]
pub struct LabelRequest<'a> {
    pub category: &'a str,
    pub label_set: &'a [String],
    pub unknown_label: &'a str,
    /// Short description of the detected regions.
    pub roi_note: &'a str,
    pub image: Option<&'a RgbImage>,
    /// Anomaly confidence in `[0, 1]`.
    pub anomaly_score: f32,
    pub bbox_count: usize,
    pub mask_ratio: f32,
}

impl LabelRequest<'_> {
    /// Whether `label` may be emitted for this request.
    pub fn accepts(&self, label: &str) -> bool {
        label == self.unknown_label || self.label_set.iter().any(|l| l == label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelResult {
    pub defect_label: String,
    pub evidence: Vec<String>,
    pub confidence: f32,
}

impl LabelResult {
    /// Builds a result, clamping confidence to `[0, 1]` (NaN becomes 0) and
    /// keeping the first [`MAX_EVIDENCE`] evidence strings.
    pub fn new(defect_label: &str, mut evidence: Vec<String>, confidence: f32) -> Self {
        evidence.truncate(MAX_EVIDENCE);
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            defect_label: defect_label.to_string(),
            evidence,
            confidence,
        }
    }

    /// The unknown sentinel with zero confidence.
    pub fn unknown(unknown_label: &str, evidence: Vec<String>) -> Self {
        Self::new(unknown_label, evidence, 0.0)
    }
}

pub trait SemanticLabeler: Send + Sync {
    fn name(&self) -> &str;

    fn label(&self, request: &LabelRequest<'_>) -> LabelResult;
}

/// Picks the labeler for `config`.
///
/// The model-backed labeler is used only when `vlm.enabled` is set and the
/// backend server is reachable; otherwise the heuristic labeler is returned.
/// Backends are shared through `cache` by `(model_id, device)`.
pub fn build_labeler(config: &Config, cache: &mut BackendCache) -> Box<dyn SemanticLabeler> {
    let Some(vlm) = config.vlm.as_ref().filter(|v| v.enabled) else {
        info!("Semantic labeler: heuristic (no vision model configured)");
        return Box::new(HeuristicLabeler);
    };

    let key = BackendKey::new(&vlm.model_id, &vlm.device);
    let connect = || -> anyhow::Result<Arc<dyn VlmBackend>> {
        let backend: Arc<dyn VlmBackend> = Arc::new(HttpVlmBackend::connect(vlm)?);
        Ok(backend)
    };
    match cache.get_or_try_insert_with(key, connect) {
        Ok(backend) => {
            info!(
                "Semantic labeler: vision model {} on {}",
                backend.model_id(),
                backend.device()
            );
            Box::new(VlmLabeler::new(backend))
        }
        Err(err) => {
            warn!("Vision model backend unavailable ({err:#}); using heuristic labeler");
            Box::new(HeuristicLabeler)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_is_clamped_and_truncated() {
        let r = LabelResult::new(
            "crack",
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            1.7,
        );
        assert_eq!(r.confidence, 1.0);
        assert_eq!(r.evidence, vec!["a", "b", "c"]);
        assert_eq!(LabelResult::new("crack", vec![], f32::NAN).confidence, 0.0);
        assert_eq!(LabelResult::new("crack", vec![], -0.2).confidence, 0.0);
    }

    #[test]
    fn request_vocabulary() {
        let labels = vec!["crack".to_string(), "scratch".to_string()];
        let req = LabelRequest {
            category: "tile",
            label_set: &labels,
            unknown_label: "UNKNOWN",
            roi_note: "",
            image: None,
            anomaly_score: 0.0,
            bbox_count: 0,
            mask_ratio: 0.0,
        };
        assert!(req.accepts("crack"));
        assert!(req.accepts("UNKNOWN"));
        assert!(!req.accepts("Crack"));
        assert!(!req.accepts("dent"));
    }

    fn config(vlm: serde_json::Value) -> Config {
        let json = serde_json::json!({
            "data": { "root": "unused", "category": "bottle" },
            "labels": { "labels": { "bottle": ["broken_large"] } },
            "risk": { "rpm": [], "risk_to_action": { "REVIEW_REQUIRED": "HOLD_FOR_REVIEW" } },
            "vlm": vlm
        });
        Config::from_json_str(&json.to_string()).unwrap()
    }

    #[test]
    fn unreachable_backend_falls_back_to_heuristic() {
        let cfg = config(serde_json::json!({
            "enabled": true,
            "endpoint": "http://127.0.0.1:9/v1/chat/completions",
            "model_id": "qwen2-vl-7b",
            "timeout_secs": 2
        }));
        let mut cache = BackendCache::new();
        let labeler = build_labeler(&cfg, &mut cache);
        assert_eq!(labeler.name(), "heuristic");
        assert!(cache.is_empty());
    }

    #[test]
    fn disabled_backend_is_not_contacted() {
        let cfg = config(serde_json::json!({
            "enabled": false,
            "endpoint": "http://127.0.0.1:9/v1/chat/completions",
            "model_id": "qwen2-vl-7b"
        }));
        let mut cache = BackendCache::new();
        assert_eq!(build_labeler(&cfg, &mut cache).name(), "heuristic");
        assert!(cache.is_empty());
    }
}
