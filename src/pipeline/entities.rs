//! Structured entity extraction: one structured-output oracle call, then
//! validation of everything the oracle claims.
//!
//! The oracle's JSON is untrusted. A response that does not deserialise into
//! [`FullDocumentStructure`], or that breaks a data-model invariant (a
//! non-positive price, no positive total), is a contract violation. A
//! response without an entity tagged `vendor` is [`ExtractionError::VendorNotFound`].
//! Both are fatal: no partial record is ever produced.

use crate::document::{EntityRole, FullDocumentStructure, RawContent};
use crate::error::ExtractionError;
use crate::oracle::OracleSession;
use crate::pipeline::postprocess;
use tracing::{debug, info};

/// Run the structured-output call over the combined text and validate the answer.
pub async fn extract_entities(
    raw: &RawContent,
    session: &OracleSession<'_>,
) -> Result<FullDocumentStructure, ExtractionError> {
    let combined = raw.combined_text();
    debug!("Structured extraction over {} chars", combined.len());

    let answer = session
        .structured(&combined)
        .await
        .map_err(ExtractionError::OracleFailed)?;

    let structure = parse_structure(&answer)?;
    info!(
        "Extracted vendor '{}', {} order lines",
        structure.vendor.as_ref().map(|v| v.name.as_str()).unwrap_or_default(),
        structure.order_lines.len()
    );
    Ok(structure)
}

/// Parse and validate a structured-output answer.
pub fn parse_structure(answer: &str) -> Result<FullDocumentStructure, ExtractionError> {
    let json = postprocess::strip_code_fences(answer);
    let mut structure: FullDocumentStructure =
        serde_json::from_str(&json).map_err(|e| ExtractionError::ContractViolation {
            detail: format!("response is not a document structure: {e}"),
        })?;

    validate(&mut structure)?;
    Ok(structure)
}

fn validate(structure: &mut FullDocumentStructure) -> Result<(), ExtractionError> {
    match structure.vendor {
        Some(ref vendor) if vendor.role == EntityRole::Vendor && !vendor.name.trim().is_empty() => {}
        Some(ref vendor) => {
            return Err(ExtractionError::VendorNotFound {
                found_role: Some(vendor.role.as_str().to_string()),
            })
        }
        None => return Err(ExtractionError::VendorNotFound { found_role: None }),
    }

    for (i, line) in structure.order_lines.iter().enumerate() {
        let checks = [
            ("unit_price", line.unit_price),
            ("quantity", line.quantity),
            ("total_price", line.total_price),
        ];
        for (field, value) in checks {
            if !(value.is_finite() && value > 0.0) {
                return Err(ExtractionError::ContractViolation {
                    detail: format!(
                        "order line {} ('{}') has non-positive {field}: {value}",
                        i + 1,
                        line.description
                    ),
                });
            }
        }
    }

    match structure.totals.total_cost() {
        Some(total) if total.is_finite() && total > 0.0 => {}
        other => {
            return Err(ExtractionError::ContractViolation {
                detail: format!("document total must be positive, got {other:?}"),
            })
        }
    }

    if !structure.confidence.is_finite() {
        return Err(ExtractionError::ContractViolation {
            detail: "confidence is not a number".into(),
        });
    }
    structure.confidence = structure.confidence.clamp(0.0, 1.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn offer() -> serde_json::Value {
        json!({
            "document": {"type": "offer", "title": "Moos-Wand mit Logo", "number": "A0492/23"},
            "vendor": {"name": "Gärtner Gregg GmbH", "vat_id": "DE198570491", "role": "vendor"},
            "requestor": {"name": "Lio Technologies GmbH", "contact_person": "Max Mustermann",
                          "department": "Marketing", "role": "requestor"},
            "order_lines": [
                {"description": "1.1 Moos-Wand", "unit_price": 1438.0, "quantity": 1, "unit": "Stk", "total_price": 1438.0},
                {"description": "1.1a Alternative zu Pos. 1.1: Moos-Wand XL", "unit_price": 1926.0, "quantity": 1, "unit": "Stk", "total_price": 1926.0},
                {"description": "2 Montage", "unit_price": 320.0, "quantity": 1, "unit": "psch", "total_price": 320.0}
            ],
            "currency": "EUR",
            "totals": {"net": 1758.0, "tax": 334.02, "gross": 2092.02},
            "confidence": 0.93
        })
    }

    #[test]
    fn alternative_lines_stay_separate() {
        let s = parse_structure(&offer().to_string()).unwrap();
        assert_eq!(s.order_lines.len(), 3);
        assert_eq!(s.order_lines[0].total_price, 1438.0);
        assert_eq!(s.order_lines[1].total_price, 1926.0);
    }

    #[test]
    fn fenced_json_is_accepted() {
        let fenced = format!("```json\n{}\n```", offer());
        assert!(parse_structure(&fenced).is_ok());
    }

    #[test]
    fn zero_net_placeholder_uses_gross() {
        let mut v = offer();
        v["totals"] = json!({"net": 0.0, "gross": 11.9});
        let s = parse_structure(&v.to_string()).unwrap();
        assert_eq!(s.totals.total_cost(), Some(11.9));
    }

    #[test]
    fn missing_vendor_is_fatal() {
        let mut v = offer();
        v.as_object_mut().unwrap().remove("vendor");
        assert!(matches!(
            parse_structure(&v.to_string()),
            Err(ExtractionError::VendorNotFound { found_role: None })
        ));
    }

    #[test]
    fn vendor_with_wrong_role_is_fatal() {
        let mut v = offer();
        v["vendor"]["role"] = json!("requestor");
        match parse_structure(&v.to_string()) {
            Err(ExtractionError::VendorNotFound { found_role }) => {
                assert_eq!(found_role.as_deref(), Some("requestor"))
            }
            other => panic!("expected VendorNotFound, got {other:?}"),
        }
    }

    #[test]
    fn zero_price_line_is_a_contract_violation() {
        let mut v = offer();
        v["order_lines"][2]["unit_price"] = json!(0.0);
        let err = parse_structure(&v.to_string()).unwrap_err();
        assert!(err.to_string().contains("unit_price"), "{err}");
    }

    #[test]
    fn missing_total_is_a_contract_violation() {
        let mut v = offer();
        v["totals"] = json!({});
        assert!(matches!(
            parse_structure(&v.to_string()),
            Err(ExtractionError::ContractViolation { .. })
        ));
    }

    #[test]
    fn prose_is_a_contract_violation() {
        assert!(matches!(
            parse_structure("I could not read this document."),
            Err(ExtractionError::ContractViolation { .. })
        ));
    }

    #[test]
    fn oracle_confidence_is_clamped() {
        let mut v = offer();
        v["confidence"] = json!(1.7);
        assert_eq!(parse_structure(&v.to_string()).unwrap().confidence, 1.0);
    }
}
