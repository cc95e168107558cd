//! Confidence scoring and the VAT-ID vision fallback.
//!
//! The oracle's self-reported confidence is never taken on its own. Five
//! structural checks are computed from the projected record, averaged, and
//! the final confidence is the lower of that mean and the oracle's value.
//! A VAT ID that had to be read off rendered pages costs an extra
//! [`VAT_FALLBACK_PENALTY`].

use crate::error::OracleError;
use crate::oracle::OracleSession;
use crate::output::{ConfidenceReport, ExtractedData, StructuralChecks};
use crate::pipeline::{encode, postprocess};
use crate::prompts::{vat_fallback_prompt, VAT_NOT_FOUND};
use image::DynamicImage;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// German VAT identification number: `DE` followed by nine digits.
pub static VAT_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^DE[0-9]{9}$").unwrap());

/// Relative deviation of line sum vs. declared total below which the sum check scores 1.0.
pub const LINE_SUM_EXACT_TOLERANCE: f64 = 0.01;

/// Relative deviation below which the sum check scores [`LINE_SUM_CLOSE_SCORE`].
pub const LINE_SUM_CLOSE_TOLERANCE: f64 = 0.05;

pub const LINE_SUM_CLOSE_SCORE: f64 = 0.8;

/// Score of the sum check for larger deviations or a non-positive total.
pub const LINE_SUM_FAR_SCORE: f64 = 0.5;

/// Score of a VAT ID that is present but malformed.
pub const VAT_MALFORMED_SCORE: f64 = 0.5;

/// Score of a missing VAT ID.
pub const VAT_ABSENT_SCORE: f64 = 0.7;

/// Vendor names this short or shorter fail the name check.
pub const MIN_VENDOR_NAME_CHARS: usize = 2;

/// Multiplier applied when the VAT ID came from the vision fallback.
pub const VAT_FALLBACK_PENALTY: f64 = 0.95;

/// Strip spaces and dots and upper-case, so `de 198.570.491` becomes `DE198570491`.
pub fn normalize_vat_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '.')
        .collect::<String>()
        .to_uppercase()
}

pub fn is_valid_vat_id(vat_id: &str) -> bool {
    VAT_ID_PATTERN.is_match(vat_id)
}

/// Normalised VAT ID if it passes the pattern.
pub fn valid_vat_id(raw: Option<&str>) -> Option<String> {
    raw.map(normalize_vat_id).filter(|v| is_valid_vat_id(v))
}

fn vat_score(vat_id: Option<&str>) -> f64 {
    match vat_id.map(normalize_vat_id) {
        Some(v) if is_valid_vat_id(&v) => 1.0,
        Some(v) if !v.is_empty() => VAT_MALFORMED_SCORE,
        _ => VAT_ABSENT_SCORE,
    }
}

/// Score for how well the line totals add up to `declared_total`.
pub fn line_sum_score(line_sum: f64, declared_total: f64) -> f64 {
    if !(declared_total > 0.0) {
        return LINE_SUM_FAR_SCORE;
    }
    let deviation = (line_sum - declared_total).abs() / declared_total;
    if deviation < LINE_SUM_EXACT_TOLERANCE {
        1.0
    } else if deviation < LINE_SUM_CLOSE_TOLERANCE {
        LINE_SUM_CLOSE_SCORE
    } else {
        LINE_SUM_FAR_SCORE
    }
}

fn pass(ok: bool) -> f64 {
    if ok {
        1.0
    } else {
        0.0
    }
}

/// The five structural checks for `data`, scoring `vat_id` as its VAT ID.
pub fn structural_checks(data: &ExtractedData, vat_id: Option<&str>) -> StructuralChecks {
    let line_sum: f64 = data.order_lines.iter().map(|l| l.total_price).sum();
    StructuralChecks {
        vendor_name: pass(data.vendor_name.trim().chars().count() > MIN_VENDOR_NAME_CHARS),
        vat_id: vat_score(vat_id),
        has_order_lines: pass(!data.order_lines.is_empty()),
        positive_total: pass(data.total_cost > 0.0),
        line_sum: line_sum_score(line_sum, data.total_cost),
    }
}

/// Combine structural checks with the oracle's confidence.
pub fn score(checks: StructuralChecks, oracle: f64, vat_fallback_used: bool) -> ConfidenceReport {
    let structural = checks.mean();
    let mut final_confidence = structural.min(oracle);
    if vat_fallback_used {
        final_confidence *= VAT_FALLBACK_PENALTY;
    }
    ConfidenceReport {
        checks,
        structural,
        oracle,
        vat_fallback_used,
        final_confidence: final_confidence.clamp(0.0, 1.0),
    }
}

/// Ask the vision oracle for the issuer's VAT ID on the rendered pages.
///
/// `Ok(None)` when the oracle reports the sentinel or answers with something
/// that does not validate.
pub async fn vat_fallback(
    pages: &[DynamicImage],
    session: &OracleSession<'_>,
) -> Result<Option<String>, OracleError> {
    let images: Vec<_> = pages
        .iter()
        .filter_map(|page| match encode::encode_png(page) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to encode page for VAT fallback: {}", e);
                None
            }
        })
        .collect();
    if images.is_empty() {
        return Ok(None);
    }

    let answer = session.vision(images, &vat_fallback_prompt()).await?;
    Ok(parse_vat_answer(&answer))
}

/// Validate a VAT fallback answer.
pub fn parse_vat_answer(answer: &str) -> Option<String> {
    let answer = postprocess::strip_code_fences(answer);
    let answer = answer.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
    if answer.eq_ignore_ascii_case(VAT_NOT_FOUND) {
        debug!("VAT fallback: oracle found no VAT ID");
        return None;
    }
    let candidate = normalize_vat_id(answer);
    if is_valid_vat_id(&candidate) {
        Some(candidate)
    } else {
        debug!("VAT fallback answer '{}' does not validate", answer);
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OrderLineCreate;

    fn line(total: f64) -> OrderLineCreate {
        OrderLineCreate {
            position_description: "Pos".into(),
            unit_price: total,
            amount: 1.0,
            unit: "Stk".into(),
            total_price: total,
        }
    }

    fn data(vat_id: Option<&str>, total: f64, lines: &[f64]) -> ExtractedData {
        ExtractedData {
            vendor_name: "Gärtner Gregg GmbH".into(),
            vat_id: vat_id.map(str::to_string),
            requestor_name: None,
            requestor_department: None,
            title: None,
            order_lines: lines.iter().copied().map(line).collect(),
            total_cost: total,
            currency: "EUR".into(),
            confidence: 0.9,
            commodity_group: None,
        }
    }

    #[test]
    fn exact_line_sum_scores_full() {
        let checks = structural_checks(&data(Some("DE198570491"), 1758.0, &[1438.0, 320.0]), Some("DE198570491"));
        assert_eq!(checks.line_sum, 1.0);
        assert_eq!(checks.mean(), 1.0);
    }

    #[test]
    fn line_sum_buckets() {
        assert_eq!(line_sum_score(1000.0, 1000.0), 1.0);
        assert_eq!(line_sum_score(1030.0, 1000.0), LINE_SUM_CLOSE_SCORE);
        assert_eq!(line_sum_score(1100.0, 1000.0), LINE_SUM_FAR_SCORE);
        assert_eq!(line_sum_score(100.0, 0.0), LINE_SUM_FAR_SCORE);
    }

    #[test]
    fn vat_branches() {
        assert_eq!(vat_score(Some("DE 198 570 491")), 1.0);
        assert_eq!(vat_score(Some("ATU12345678")), VAT_MALFORMED_SCORE);
        assert_eq!(vat_score(Some("  ")), VAT_ABSENT_SCORE);
        assert_eq!(vat_score(None), VAT_ABSENT_SCORE);
    }

    #[test]
    fn short_vendor_name_fails() {
        let mut d = data(None, 10.0, &[10.0]);
        d.vendor_name = "AB".into();
        assert_eq!(structural_checks(&d, None).vendor_name, 0.0);
    }

    #[test]
    fn final_is_minimum_of_structural_and_oracle() {
        let checks = structural_checks(&data(None, 1758.0, &[1438.0, 320.0]), None);
        let report = score(checks, 0.99, false);
        assert!((report.structural - 0.94).abs() < 1e-9);
        assert!((report.final_confidence - 0.94).abs() < 1e-9);

        let report = score(checks, 0.5, false);
        assert_eq!(report.final_confidence, 0.5);
    }

    #[test]
    fn fallback_applies_penalty() {
        let checks = structural_checks(&data(None, 1758.0, &[1438.0, 320.0]), Some("DE198570491"));
        let report = score(checks, 0.9, true);
        assert!((report.final_confidence - 0.9 * VAT_FALLBACK_PENALTY).abs() < 1e-9);
        assert!(report.vat_fallback_used);
    }

    #[test]
    fn vat_answers() {
        assert_eq!(parse_vat_answer("DE198570491"), Some("DE198570491".into()));
        assert_eq!(parse_vat_answer("`de 198.570.491`\n"), Some("DE198570491".into()));
        assert_eq!(parse_vat_answer(VAT_NOT_FOUND), None);
        assert_eq!(parse_vat_answer("The VAT ID is DE198570491"), None);
    }

    #[test]
    fn valid_vat_id_normalises() {
        assert_eq!(valid_vat_id(Some("de198570491")), Some("DE198570491".into()));
        assert_eq!(valid_vat_id(Some("DE19857049")), None);
        assert_eq!(valid_vat_id(None), None);
    }

    #[test]
    fn vat_digits_must_be_ascii() {
        let arabic_indic = "DE\u{0661}\u{0662}\u{0663}\u{0664}\u{0665}\u{0666}\u{0667}\u{0668}\u{0669}";
        assert!(!is_valid_vat_id(arabic_indic));
        assert_eq!(valid_vat_id(Some(arabic_indic)), None);
        assert_eq!(parse_vat_answer(arabic_indic), None);
        assert_eq!(vat_score(Some(arabic_indic)), VAT_MALFORMED_SCORE);
    }
}
