/// Whether a result needs a human in the loop.
///
/// An unresolved label always does, whatever the confidence; otherwise
/// review is required when `confidence < threshold`.
pub fn requires_review(confidence: f32, label: &str, unknown_label: &str, threshold: f32) -> bool {
    if label == unknown_label {
        return true;
    }
    confidence < threshold
}
