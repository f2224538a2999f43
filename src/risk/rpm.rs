use serde::{Deserialize, Serialize};

/// Risk class used when risk cannot be resolved from the matrix.
pub const REVIEW_REQUIRED: &str = "REVIEW_REQUIRED";

/// One row of the risk priority matrix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpmRow {
    pub severity: i64,
    pub occurrence: i64,
    pub detection: i64,
    pub risk_score: i64,
    pub risk_class: String,
}

impl RpmRow {
    fn matches(&self, severity: i64, occurrence: i64, detection: i64) -> bool {
        self.severity == severity && self.occurrence == occurrence && self.detection == detection
    }
}

/// Risk score and class attached to a result; the score is `None` when the
/// class is the review-required fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub risk_score: Option<i64>,
    pub risk_class: String,
}

impl RiskAssessment {
    pub fn review_required() -> Self {
        Self {
            risk_score: None,
            risk_class: REVIEW_REQUIRED.to_string(),
        }
    }
}

/// Risk priority matrix: `(severity, occurrence, detection) -> (score, class)`.
///
/// Rows are expected to be unique per key triple; when they are not, the
/// first matching row wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RpmTable {
    rows: Vec<RpmRow>,
}

impl From<Vec<RpmRow>> for RpmTable {
    fn from(rows: Vec<RpmRow>) -> Self {
        Self { rows }
    }
}

impl RpmTable {
    pub fn rows(&self) -> &[RpmRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Exact-match lookup.
    ///
    /// Returns `(None, None)` both when any key is absent (risk not
    /// computable) and when no row matches.
    pub fn lookup(
        &self,
        severity: Option<i64>,
        occurrence: Option<i64>,
        detection: Option<i64>,
    ) -> (Option<i64>, Option<&str>) {
        let (Some(s), Some(o), Some(d)) = (severity, occurrence, detection) else {
            return (None, None);
        };
        self.rows
            .iter()
            .find(|row| row.matches(s, o, d))
            .map_or((None, None), |row| {
                (Some(row.risk_score), Some(row.risk_class.as_str()))
            })
    }

    /// Like [`RpmTable::lookup`], but absent keys and unmatched rows both
    /// resolve to [`REVIEW_REQUIRED`] with no score.
    pub fn lookup_strict(
        &self,
        severity: Option<i64>,
        occurrence: Option<i64>,
        detection: Option<i64>,
    ) -> RiskAssessment {
        match self.lookup(severity, occurrence, detection) {
            (risk_score, Some(class)) => RiskAssessment {
                risk_score,
                risk_class: class.to_string(),
            },
            (_, None) => {
                log::debug!(
                    "RPM unresolved for (s={:?}, o={:?}, d={:?}), using {}",
                    severity,
                    occurrence,
                    detection,
                    REVIEW_REQUIRED
                );
                RiskAssessment::review_required()
            }
        }
    }
}
