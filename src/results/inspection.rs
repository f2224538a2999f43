use serde::{Deserialize, Serialize};

use crate::BoundingBox;

/// Image-level verdict from comparing the raw anomaly score to the image threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDecision {
    Anomalous,
    Normal,
}

impl ImageDecision {
    /// `Anomalous` iff `score >= threshold`.
    pub fn from_score(score: f32, threshold: f32) -> Self {
        if score >= threshold {
            Self::Anomalous
        } else {
            Self::Normal
        }
    }

    pub fn is_anomalous(&self) -> bool {
        matches!(self, Self::Anomalous)
    }
}

/// Result for one inspected image.
///
/// Always fully populated: the risk class and action may be the
/// review-required fallback and the label may be the unknown sentinel, but
/// no field is left unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InspectionResult {
    pub image_id: String,
    pub category: String,
    pub image_decision: ImageDecision,
    pub anomaly_score: f32,
    pub anomaly_heatmap_path: String,
    pub anomaly_mask_path: String,
    pub bboxes: Vec<BoundingBox>,
    pub defect_label: String,
    pub evidence: Vec<String>,
    pub risk_score: Option<i64>,
    pub risk_class: String,
    pub action: String,
    pub confidence: f32,
    pub human_review_required: bool,
}

/// A test sample that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSample {
    pub image_path: String,
    pub reason: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub anomalous: usize,
    pub normal: usize,
    pub review_required: usize,
    pub skipped: usize,
}

/// Output of a batch run over one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub category: String,
    pub generated_at: String,
    pub summary: Summary,
    pub results: Vec<InspectionResult>,
    pub skipped: Vec<SkippedSample>,
}

impl Report {
    pub fn new(category: &str, results: Vec<InspectionResult>, skipped: Vec<SkippedSample>) -> Self {
        let anomalous = results
            .iter()
            .filter(|r| r.image_decision.is_anomalous())
            .count();
        let summary = Summary {
            total: results.len() + skipped.len(),
            anomalous,
            normal: results.len() - anomalous,
            review_required: results.iter().filter(|r| r.human_review_required).count(),
            skipped: skipped.len(),
        };

        Self {
            category: category.to_string(),
            generated_at: chrono::Local::now().to_rfc3339(),
            summary,
            results,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(decision: ImageDecision, review: bool) -> InspectionResult {
        InspectionResult {
            image_id: "broken_large_000".into(),
            category: "bottle".into(),
            image_decision: decision,
            anomaly_score: 12.5,
            anomaly_heatmap_path: "artifacts/heatmaps/broken_large_000_hm.png".into(),
            anomaly_mask_path: "artifacts/masks/broken_large_000_mask.png".into(),
            bboxes: vec![BoundingBox::new(1, 2, 3, 4)],
            defect_label: "broken_large".into(),
            evidence: vec!["crack along the rim".into()],
            risk_score: None,
            risk_class: "REVIEW_REQUIRED".into(),
            action: "HOLD_FOR_REVIEW".into(),
            confidence: 0.7,
            human_review_required: review,
        }
    }

    #[test]
    fn decision_is_inclusive_at_threshold() {
        assert_eq!(ImageDecision::from_score(3.0, 3.0), ImageDecision::Anomalous);
        assert_eq!(ImageDecision::from_score(2.99, 3.0), ImageDecision::Normal);
    }

    #[test]
    fn result_json_fields() {
        let v = serde_json::to_value(result(ImageDecision::Anomalous, true)).unwrap();
        assert_eq!(v["image_decision"], "anomalous");
        assert_eq!(v["bboxes"][0], serde_json::json!([1, 2, 3, 4]));
        assert!(v["risk_score"].is_null());
        assert_eq!(v.as_object().unwrap().len(), 14);
    }

    #[test]
    fn report_summary() {
        let report = Report::new(
            "bottle",
            vec![
                result(ImageDecision::Anomalous, true),
                result(ImageDecision::Normal, false),
            ],
            vec![SkippedSample {
                image_path: "x.png".into(),
                reason: "unreadable".into(),
            }],
        );
        assert_eq!(
            report.summary,
            Summary {
                total: 3,
                anomalous: 1,
                normal: 1,
                review_required: 1,
                skipped: 1,
            }
        );
    }
}
