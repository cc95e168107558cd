//! Commodity classification against the fixed taxonomy.
//!
//! Order lines are classified in two oracle steps: first one of the seven
//! categories, then one leaf inside that category. Free text is classified
//! in a single step against all fifty leaves. Each step answers in labelled
//! lines (`Category:` or `ID:`, then `Confidence:` and `Reasoning:`), and
//! an answer that names anything outside the offered choices fails the step.
//!
//! Failures here are soft: callers get a [`ClassificationError`] to record,
//! never a fatal error.

use crate::error::{ClassificationError, ClassificationStep};
use crate::oracle::OracleSession;
use crate::output::{CategoryClassification, CommodityClassification};
use crate::pipeline::postprocess::{leading_number, parse_labelled_lines};
use crate::prompts::{category_prompt, leaf_prompt, text_classification_prompt};
use crate::taxonomy::{self, Category};
use std::collections::HashMap;
use tracing::{debug, info};

/// Classify order-line descriptions: category step, then leaf step.
pub async fn classify_descriptions(
    session: &OracleSession<'_>,
    descriptions: &[String],
) -> Result<CommodityClassification, ClassificationError> {
    let descriptions: Vec<String> = descriptions
        .iter()
        .map(|d| d.trim())
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();
    if descriptions.is_empty() {
        return Err(ClassificationError::NoDescriptions);
    }

    // ── Step 1: category ─────────────────────────────────────────────────
    let answer = session
        .vision(Vec::new(), &category_prompt(&descriptions))
        .await
        .map_err(|source| ClassificationError::Oracle {
            step: ClassificationStep::Category,
            source,
        })?;
    let category = parse_category_answer(&answer)?;
    debug!(
        "Category step: {} ({:.2})",
        category.category, category.confidence
    );

    // ── Step 2: leaf within the category ────────────────────────────────
    let answer = session
        .vision(Vec::new(), &leaf_prompt(category.category, &descriptions))
        .await
        .map_err(|source| ClassificationError::Oracle {
            step: ClassificationStep::Leaf,
            source,
        })?;
    let leaf = parse_leaf_answer(&answer, Some(category.category), ClassificationStep::Leaf)?;

    info!(
        "Classified as {} ({}) with confidence {:.2}",
        leaf.commodity_group_name, leaf.commodity_group_id, leaf.confidence
    );
    Ok(leaf)
}

/// Classify an arbitrary description against the flat leaf table.
pub async fn classify_text(
    session: &OracleSession<'_>,
    text: &str,
) -> Result<CommodityClassification, ClassificationError> {
    if text.trim().is_empty() {
        return Err(ClassificationError::NoDescriptions);
    }
    let answer = session
        .vision(Vec::new(), &text_classification_prompt(text))
        .await
        .map_err(|source| ClassificationError::Oracle {
            step: ClassificationStep::Text,
            source,
        })?;
    parse_leaf_answer(&answer, None, ClassificationStep::Text)
}

fn required<'a>(
    fields: &'a HashMap<String, String>,
    key: &str,
    step: ClassificationStep,
) -> Result<&'a str, ClassificationError> {
    fields
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ClassificationError::Unparseable {
            step,
            detail: format!("missing '{key}' line"),
        })
}

fn confidence(fields: &HashMap<String, String>, step: ClassificationStep) -> Result<f64, ClassificationError> {
    let raw = required(fields, "confidence", step)?;
    leading_number(raw)
        .map(|c| c.clamp(0.0, 1.0))
        .ok_or_else(|| ClassificationError::Unparseable {
            step,
            detail: format!("confidence '{raw}' is not a number"),
        })
}

fn reasoning(fields: &HashMap<String, String>) -> Option<String> {
    fields.get("reasoning").filter(|r| !r.is_empty()).cloned()
}

/// Parse a category-step answer.
pub fn parse_category_answer(answer: &str) -> Result<CategoryClassification, ClassificationError> {
    let step = ClassificationStep::Category;
    let fields = parse_labelled_lines(answer);
    let name = required(&fields, "category", step)?;
    let category =
        Category::from_name(name).ok_or_else(|| ClassificationError::UnknownCategory(name.to_string()))?;
    Ok(CategoryClassification {
        category,
        confidence: confidence(&fields, step)?,
        reasoning: reasoning(&fields),
    })
}

/// Parse a leaf answer, restricted to `within` when a category was chosen.
pub fn parse_leaf_answer(
    answer: &str,
    within: Option<Category>,
    step: ClassificationStep,
) -> Result<CommodityClassification, ClassificationError> {
    let fields = parse_labelled_lines(answer);
    let raw_id = required(&fields, "id", step)?;
    let id = leading_number(raw_id)
        .filter(|n| n.fract() == 0.0 && *n >= 0.0 && *n <= u32::MAX as f64)
        .map(|n| n as u32)
        .ok_or_else(|| ClassificationError::Unparseable {
            step,
            detail: format!("ID '{raw_id}' is not a group number"),
        })?;

    let group = match within {
        Some(category) if !category.contains(id) => {
            return Err(ClassificationError::LeafOutsideCategory {
                id,
                category: category.name().to_string(),
            })
        }
        _ => taxonomy::group(id).ok_or(ClassificationError::UnknownGroup(id))?,
    };

    Ok(CommodityClassification {
        commodity_group_id: group.id,
        commodity_group_name: group.display_name(),
        confidence: confidence(&fields, step)?,
        reasoning: reasoning(&fields),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OracleError;
    use crate::oracle::DocumentOracle;
    use async_trait::async_trait;
    use edgequake_llm::ImageData;
    use std::sync::Mutex;

    struct Scripted {
        answers: Mutex<Vec<Result<String, OracleError>>>,
    }

    impl Scripted {
        fn new(answers: Vec<Result<&str, OracleError>>) -> Self {
            let mut answers: Vec<_> = answers.into_iter().map(|a| a.map(str::to_string)).collect();
            answers.reverse();
            Self {
                answers: Mutex::new(answers),
            }
        }
    }

    #[async_trait]
    impl DocumentOracle for Scripted {
        async fn structured(&self, _text: &str) -> Result<String, OracleError> {
            Err(OracleError::EmptyResponse)
        }

        async fn vision(&self, images: Vec<ImageData>, _instruction: &str) -> Result<String, OracleError> {
            assert!(images.is_empty());
            self.answers.lock().unwrap().pop().unwrap_or(Err(OracleError::EmptyResponse))
        }
    }

    fn descriptions() -> Vec<String> {
        vec!["MacBook Air 13\"".into(), "  ".into(), "USB-C Hub".into()]
    }

    #[tokio::test]
    async fn two_step_classification() {
        let oracle = Scripted::new(vec![
            Ok("Category: Information Technology\nConfidence: 0.95\nReasoning: laptops"),
            Ok("ID: 29\nConfidence: 0.9\nReasoning: computer hardware"),
        ]);
        let session = OracleSession::new(&oracle, 5);
        let result = classify_descriptions(&session, &descriptions()).await.unwrap();
        assert_eq!(result.commodity_group_id, 29);
        assert_eq!(result.commodity_group_name, "Information Technology - Hardware");
        assert_eq!(result.confidence, 0.9);
        assert_eq!(session.calls(), 2);
    }

    #[tokio::test]
    async fn leaf_outside_category_fails() {
        let oracle = Scripted::new(vec![
            Ok("Category: Logistics\nConfidence: 0.8\nReasoning: shipping"),
            Ok("ID: 29\nConfidence: 0.9\nReasoning: hardware"),
        ]);
        let session = OracleSession::new(&oracle, 5);
        let err = classify_descriptions(&session, &descriptions()).await.unwrap_err();
        assert_eq!(
            err,
            ClassificationError::LeafOutsideCategory {
                id: 29,
                category: "Logistics".into()
            }
        );
    }

    #[tokio::test]
    async fn unknown_category_stops_before_leaf_step() {
        let oracle = Scripted::new(vec![Ok("Category: Gardening\nConfidence: 0.6\nReasoning: plants")]);
        let session = OracleSession::new(&oracle, 5);
        let err = classify_descriptions(&session, &descriptions()).await.unwrap_err();
        assert_eq!(err, ClassificationError::UnknownCategory("Gardening".into()));
        assert_eq!(session.calls(), 1);
    }

    #[tokio::test]
    async fn oracle_failure_names_the_step() {
        let oracle = Scripted::new(vec![
            Ok("Category: Information Technology\nConfidence: 0.95"),
            Err(OracleError::Timeout { secs: 60 }),
        ]);
        let session = OracleSession::new(&oracle, 5);
        let err = classify_descriptions(&session, &descriptions()).await.unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::Oracle {
                step: ClassificationStep::Leaf,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn nothing_to_classify() {
        let oracle = Scripted::new(vec![]);
        let session = OracleSession::new(&oracle, 5);
        let err = classify_descriptions(&session, &["   ".to_string()]).await.unwrap_err();
        assert_eq!(err, ClassificationError::NoDescriptions);
        assert_eq!(session.calls(), 0);
    }

    #[tokio::test]
    async fn free_text_uses_flat_table() {
        let oracle = Scripted::new(vec![Ok("ID: 36\nConfidence: 0.7\nReasoning: branded item")]);
        let session = OracleSession::new(&oracle, 5);
        let result = classify_text(&session, "moss wall with company logo").await.unwrap();
        assert_eq!(result.commodity_group_id, 36);
        assert!(result.commodity_group_name.starts_with("Marketing & Advertising - "));
    }

    #[test]
    fn text_step_rejects_unknown_id() {
        let err = parse_leaf_answer("ID: 51\nConfidence: 0.5", None, ClassificationStep::Text).unwrap_err();
        assert_eq!(err, ClassificationError::UnknownGroup(51));
    }

    #[test]
    fn missing_confidence_is_unparseable() {
        let err = parse_category_answer("Category: Logistics").unwrap_err();
        assert!(matches!(err, ClassificationError::Unparseable { .. }));
    }

    #[test]
    fn category_answer_is_lenient_about_formatting() {
        let c = parse_category_answer("**Category:** marketing and advertising\n**Confidence:** 1.3").unwrap();
        assert_eq!(c.category, Category::MarketingAdvertising);
        assert_eq!(c.confidence, 1.0);
        assert_eq!(c.reasoning, None);
    }

    #[test]
    fn negative_leaf_id_is_unparseable() {
        let err = parse_leaf_answer(
            "ID: -29\nConfidence: 0.9",
            Some(Category::InformationTechnology),
            ClassificationStep::Leaf,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ClassificationError::Unparseable {
                step: ClassificationStep::Leaf,
                ..
            }
        ));
    }

    #[test]
    fn percent_confidence_is_a_fraction() {
        let leaf = parse_leaf_answer(
            "ID: 29\nConfidence: 85%",
            Some(Category::InformationTechnology),
            ClassificationStep::Leaf,
        )
        .unwrap();
        assert!((leaf.confidence - 0.85).abs() < 1e-9);

        let c = parse_category_answer("Category: Logistics\nConfidence: 60 %").unwrap();
        assert!((c.confidence - 0.6).abs() < 1e-9);
    }
}
