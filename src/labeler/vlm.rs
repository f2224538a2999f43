use std::sync::Arc;

use base64ct::{Base64, Encoding};
use image::RgbImage;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::{elapsed_module, LabelRequest, LabelResult, SemanticLabeler, VlmBackend};

static JSON_OBJECT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid regex"));

/// Labeler backed by a vision-language model.
///
/// The model is asked for exactly one label from the category vocabulary.
/// Whatever comes back is checked against that vocabulary; an unusable
/// answer (no image, backend error, malformed JSON, unknown label) yields
/// the unknown label with zero confidence and a note saying why.
pub struct VlmLabeler {
    backend: Arc<dyn VlmBackend>,
}

impl std::fmt::Debug for VlmLabeler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VlmLabeler")
            .field("model_id", &self.backend.model_id())
            .field("device", &self.backend.device())
            .finish()
    }
}

impl VlmLabeler {
    pub fn new(backend: Arc<dyn VlmBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn VlmBackend> {
        &self.backend
    }
}

impl SemanticLabeler for VlmLabeler {
    fn name(&self) -> &str {
        "vlm"
    }

    fn label(&self, req: &LabelRequest<'_>) -> LabelResult {
        let Some(image) = req.image else {
            return degraded(req, "no image supplied to the vision model".to_string());
        };
        let image_b64 = match encode_png_base64(image) {
            Ok(s) => s,
            Err(err) => return degraded(req, format!("image encoding failed: {err}")),
        };

        let prompt = build_prompt(req);
        let answer = elapsed_module!(
            "VLM",
            "complete",
            self.backend.complete(&prompt, &image_b64)
        );
        match answer {
            Ok(raw) => {
                debug!("VLM answer: {}", raw);
                parse_answer(&raw, req)
            }
            Err(err) => {
                warn!("Vision model call failed: {err:#}");
                degraded(req, format!("vision model call failed: {err}"))
            }
        }
    }
}

fn degraded(req: &LabelRequest<'_>, reason: String) -> LabelResult {
    LabelResult::unknown(req.unknown_label, vec![reason, format!("roi: {}", req.roi_note)])
}

pub fn encode_png_base64(image: &RgbImage) -> anyhow::Result<String> {
    let mut bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    Ok(Base64::encode_string(&bytes))
}

/// Prompt constraining the model to the request's vocabulary and a JSON answer.
pub fn build_prompt(req: &LabelRequest<'_>) -> String {
    let choices = req
        .label_set
        .iter()
        .map(|l| format!("\"{l}\""))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are inspecting a product image of category \"{category}\" for manufacturing defects.\n\
         An anomaly detector reported: anomaly confidence {score:.3}, {boxes} region(s), \
         {ratio:.2}% of the image flagged.\n\
         Region note: {roi}\n\
         Choose exactly one defect label from: [{choices}]. \
         If none of them fits or you are unsure, answer \"{unknown}\".\n\
         Reply with only a JSON object: \
         {{\"defect_label\": \"<label>\", \"evidence\": [\"<short observation>\"], \"confidence\": <0..1>}} \
         with at most 3 evidence items.",
        category = req.category,
        score = req.anomaly_score,
        boxes = req.bbox_count,
        ratio = req.mask_ratio * 100.0,
        roi = req.roi_note,
        unknown = req.unknown_label,
    )
}

/// The vocabulary entry (or unknown sentinel) equal to `label`, compared exactly.
fn canonical_label<'a>(label: &str, req: &LabelRequest<'a>) -> Option<&'a str> {
    if label == req.unknown_label {
        return Some(req.unknown_label);
    }
    req.label_set
        .iter()
        .find(|l| l.as_str() == label)
        .map(String::as_str)
}

/// Parses a model answer into a label result restricted to the vocabulary.
pub fn parse_answer(raw: &str, req: &LabelRequest<'_>) -> LabelResult {
    let Some(object) = JSON_OBJECT.find(raw) else {
        return degraded(req, "vision model answer has no JSON object".to_string());
    };
    let value: Value = match serde_json::from_str(object.as_str()) {
        Ok(v) => v,
        Err(err) => return degraded(req, format!("unparsable vision model answer: {err}")),
    };

    let Some(label) = value
        .get("defect_label")
        .or_else(|| value.get("label"))
        .and_then(Value::as_str)
        .map(str::trim)
    else {
        return degraded(req, "vision model answer has no defect_label".to_string());
    };
    let Some(label) = canonical_label(label, req) else {
        warn!("Vision model label {label:?} is outside the vocabulary");
        return degraded(req, format!("vision model label {label:?} is outside the vocabulary"));
    };

    let evidence = match value.get("evidence") {
        Some(Value::Array(xs)) => xs
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_owned()],
        _ => Vec::new(),
    };
    let confidence = match value.get("confidence") {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .unwrap_or(0.0);

    LabelResult::new(label, evidence, confidence as f32)
}
