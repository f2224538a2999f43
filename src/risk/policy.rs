use std::collections::BTreeMap;

use crate::{InspectError, InspectResult, REVIEW_REQUIRED};

/// Maps a risk class to the recommended action.
///
/// Unknown or missing classes resolve to the `REVIEW_REQUIRED` action, so
/// every result gets an action that sends doubtful cases to a human.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPolicy {
    mapping: BTreeMap<String, String>,
}

impl ActionPolicy {
    /// Fails if `mapping` has no `REVIEW_REQUIRED` entry to fall back on.
    pub fn new(mapping: BTreeMap<String, String>) -> InspectResult<Self> {
        if !mapping.contains_key(REVIEW_REQUIRED) {
            return Err(InspectError::MissingFallbackAction(REVIEW_REQUIRED));
        }
        Ok(Self { mapping })
    }

    pub fn mapping(&self) -> &BTreeMap<String, String> {
        &self.mapping
    }

    pub fn fallback(&self) -> &str {
        &self.mapping[REVIEW_REQUIRED]
    }

    pub fn resolve(&self, risk_class: Option<&str>) -> &str {
        risk_class
            .and_then(|class| self.mapping.get(class))
            .map_or_else(|| self.fallback(), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ActionPolicy {
        ActionPolicy::new(BTreeMap::from([
            ("HIGH".to_string(), "STOP_LINE".to_string()),
            ("LOW".to_string(), "LOG_ONLY".to_string()),
            (REVIEW_REQUIRED.to_string(), "HOLD_FOR_REVIEW".to_string()),
        ]))
        .unwrap()
    }

    #[test]
    fn known_class() {
        assert_eq!(policy().resolve(Some("HIGH")), "STOP_LINE");
    }

    #[test]
    fn none_and_unknown_fall_back() {
        let p = policy();
        assert_eq!(p.resolve(None), "HOLD_FOR_REVIEW");
        assert_eq!(p.resolve(Some("NONEXISTENT_CLASS")), "HOLD_FOR_REVIEW");
        assert_eq!(p.resolve(Some(REVIEW_REQUIRED)), "HOLD_FOR_REVIEW");
    }

    #[test]
    fn mapping_needs_fallback() {
        let err = ActionPolicy::new(BTreeMap::from([("HIGH".to_string(), "STOP".to_string())]));
        assert!(matches!(err, Err(InspectError::MissingFallbackAction(_))));
    }
}
