//! Result types returned by the extraction pipeline.

use crate::error::ClassificationError;
use crate::taxonomy::Category;
use serde::{Deserialize, Serialize};

/// An order line in the target schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineCreate {
    pub position_description: String,
    pub unit_price: f64,
    pub amount: f64,
    pub unit: String,
    pub total_price: f64,
}

/// The procurement record handed back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedData {
    pub vendor_name: String,
    pub vat_id: Option<String>,
    pub requestor_name: Option<String>,
    pub requestor_department: Option<String>,
    pub title: Option<String>,
    pub order_lines: Vec<OrderLineCreate>,
    pub total_cost: f64,
    /// ISO currency code, `EUR` when the document does not state one.
    pub currency: String,
    /// Final confidence, always within `[0, 1]`.
    pub confidence: f64,
    /// Leaf commodity group ID, unset when classification failed.
    pub commodity_group: Option<u32>,
}

/// Outcome of the category step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryClassification {
    pub category: Category,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

/// A resolved leaf commodity group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommodityClassification {
    pub commodity_group_id: u32,
    /// `"<category> - <name>"`.
    pub commodity_group_name: String,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

/// Classification is a soft stage: either a group or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationOutcome {
    Classified(CommodityClassification),
    Unclassified { reason: ClassificationError },
    /// Classification was turned off in the configuration.
    Skipped,
}

impl ClassificationOutcome {
    pub fn group_id(&self) -> Option<u32> {
        match self {
            ClassificationOutcome::Classified(c) => Some(c.commodity_group_id),
            _ => None,
        }
    }
}

impl From<Result<CommodityClassification, ClassificationError>> for ClassificationOutcome {
    fn from(result: Result<CommodityClassification, ClassificationError>) -> Self {
        match result {
            Ok(c) => ClassificationOutcome::Classified(c),
            Err(reason) => ClassificationOutcome::Unclassified { reason },
        }
    }
}

/// Per-check breakdown of the structural confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StructuralChecks {
    pub vendor_name: f64,
    pub vat_id: f64,
    pub has_order_lines: f64,
    pub positive_total: f64,
    pub line_sum: f64,
}

impl StructuralChecks {
    /// Unweighted mean of all checks.
    pub fn mean(&self) -> f64 {
        let factors = [
            self.vendor_name,
            self.vat_id,
            self.has_order_lines,
            self.positive_total,
            self.line_sum,
        ];
        factors.iter().sum::<f64>() / factors.len() as f64
    }
}

/// How the final confidence was reached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub checks: StructuralChecks,
    pub structural: f64,
    pub oracle: f64,
    pub vat_fallback_used: bool,
    pub final_confidence: f64,
}

/// Timing and size figures for one extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub page_count: usize,
    pub has_images: bool,
    pub text_chars: usize,
    pub image_text_chars: usize,
    pub oracle_calls: usize,
    pub raw_duration_ms: u64,
    pub extraction_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Full result of a successful extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionOutput {
    pub data: ExtractedData,
    pub classification: ClassificationOutcome,
    pub confidence: ConfidenceReport,
    pub stats: ExtractionStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_mean_is_unweighted() {
        let checks = StructuralChecks {
            vendor_name: 1.0,
            vat_id: 0.7,
            has_order_lines: 1.0,
            positive_total: 1.0,
            line_sum: 0.8,
        };
        assert!((checks.mean() - 0.9).abs() < 1e-9);
    }

    #[test]
    fn outcome_from_result() {
        let err: Result<CommodityClassification, _> =
            Err(ClassificationError::UnknownCategory("Gardening".into()));
        let outcome = ClassificationOutcome::from(err);
        assert_eq!(outcome.group_id(), None);
        assert!(matches!(outcome, ClassificationOutcome::Unclassified { .. }));
    }

    #[test]
    fn outcome_serialises_with_status_tag() {
        let json = serde_json::to_value(ClassificationOutcome::Skipped).unwrap();
        assert_eq!(json["status"], "skipped");
    }
}
