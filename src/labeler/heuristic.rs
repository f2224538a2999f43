use crate::{LabelRequest, LabelResult, SemanticLabeler};

const CONTAMINATION_HINTS: &[&str] = &["contamination", "stain"];
const SMALL_HINTS: &[&str] = &["small", "scratch"];
const LARGE_HINTS: &[&str] = &["large", "crack"];

/// Below this anomaly score, and with no regions, nothing is labeled.
pub const NO_ANOMALY_SCORE: f32 = 0.15;

/// Deterministic labeler driven by region geometry.
///
/// - many regions (>= 3) covering >= 5% of the image: contamination/stain
/// - at most one region covering < 2%: small/scratch
/// - anything else: large/crack
///
/// Within each rule the first label of the sorted vocabulary containing one
/// of the hint words (case-insensitive) is chosen, or the first label overall
/// when none does.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicLabeler;

impl HeuristicLabeler {
    pub fn confidence(anomaly_score: f32, mask_ratio: f32) -> f32 {
        (0.45 + 0.35 * anomaly_score.min(1.0) + 0.15 * (mask_ratio * 5.0).min(1.0)).clamp(0.3, 0.85)
    }

    fn hints(bbox_count: usize, mask_ratio: f32) -> &'static [&'static str] {
        if bbox_count >= 3 && mask_ratio >= 0.05 {
            CONTAMINATION_HINTS
        } else if bbox_count <= 1 && mask_ratio < 0.02 {
            SMALL_HINTS
        } else {
            LARGE_HINTS
        }
    }
}

fn pick<'a>(sorted: &[&'a String], hints: &[&str]) -> &'a str {
    sorted
        .iter()
        .copied()
        .find(|label| {
            let lower = label.to_lowercase();
            hints.iter().any(|h| lower.contains(*h))
        })
        .or_else(|| sorted.first().copied())
        .map_or("", |label| label.as_str())
}

impl SemanticLabeler for HeuristicLabeler {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn label(&self, req: &LabelRequest<'_>) -> LabelResult {
        let stats = format!(
            "anomaly score {:.3}, {} region(s), mask ratio {:.4}",
            req.anomaly_score, req.bbox_count, req.mask_ratio
        );

        if req.label_set.is_empty() {
            return LabelResult::unknown(
                req.unknown_label,
                vec![format!("no defect vocabulary configured for {}", req.category)],
            );
        }
        if req.anomaly_score < NO_ANOMALY_SCORE && req.bbox_count == 0 {
            return LabelResult::new(
                req.unknown_label,
                vec!["no clear anomaly regions".to_string(), stats],
                0.25,
            );
        }

        let mut sorted: Vec<&String> = req.label_set.iter().collect();
        sorted.sort();
        let label = pick(&sorted, Self::hints(req.bbox_count, req.mask_ratio));

        LabelResult::new(
            label,
            vec![
                "geometry heuristic (no vision model)".to_string(),
                stats,
                format!("roi: {}", req.roi_note),
            ],
            Self::confidence(req.anomaly_score, req.mask_ratio),
        )
    }
}
