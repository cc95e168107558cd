//! Deterministic stand-ins for the oracle and the page renderer.

#![allow(dead_code)]

use async_trait::async_trait;
use edgequake_llm::ImageData;
use image::{DynamicImage, RgbImage};
use procure_extract::prompts::{vat_fallback_prompt, IMAGE_TEXT_RECOVERY_PROMPT};
use procure_extract::{DocumentOracle, ExtractionError, OracleError, PageRenderer};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded oracle call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Structured,
    FooterText { images: usize },
    VatFallback { images: usize },
    Category,
    Leaf,
    Text,
}

/// Oracle answering each call shape from a fixed script.
pub struct ScriptedOracle {
    pub structure: Result<String, OracleError>,
    pub structured_delay: Option<Duration>,
    pub footer_text: Result<String, OracleError>,
    pub vat_answer: Result<String, OracleError>,
    pub category_answer: Result<String, OracleError>,
    pub leaf_answer: Result<String, OracleError>,
    pub text_answer: Result<String, OracleError>,
    pub calls: Mutex<Vec<Call>>,
}

impl ScriptedOracle {
    pub fn new(structure: Value) -> Self {
        Self {
            structure: Ok(structure.to_string()),
            structured_delay: None,
            footer_text: Ok(String::new()),
            vat_answer: Ok("NOT_FOUND".into()),
            category_answer: Ok("Category: Marketing & Advertising\nConfidence: 0.9\nReasoning: decorative branded wall".into()),
            leaf_answer: Ok("ID: 43\nConfidence: 0.8\nReasoning: branded decoration".into()),
            text_answer: Ok("ID: 43\nConfidence: 0.7\nReasoning: branded decoration".into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl DocumentOracle for ScriptedOracle {
    async fn structured(&self, _document_text: &str) -> Result<String, OracleError> {
        self.record(Call::Structured);
        if let Some(delay) = self.structured_delay {
            tokio::time::sleep(delay).await;
        }
        self.structure.clone()
    }

    async fn vision(&self, images: Vec<ImageData>, instruction: &str) -> Result<String, OracleError> {
        let images = images.len();
        if instruction == IMAGE_TEXT_RECOVERY_PROMPT {
            self.record(Call::FooterText { images });
            self.footer_text.clone()
        } else if instruction == vat_fallback_prompt() {
            self.record(Call::VatFallback { images });
            self.vat_answer.clone()
        } else if instruction.contains("Categories:") {
            self.record(Call::Category);
            self.category_answer.clone()
        } else if instruction.contains("belong to the category") {
            self.record(Call::Leaf);
            self.leaf_answer.clone()
        } else {
            self.record(Call::Text);
            self.text_answer.clone()
        }
    }
}

/// Renderer producing blank pages.
pub struct BlankPages {
    pub pages: usize,
    pub requested: Mutex<Vec<usize>>,
}

impl BlankPages {
    pub fn new(pages: usize) -> Self {
        Self {
            pages,
            requested: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PageRenderer for BlankPages {
    async fn render_leading_pages(&self, count: usize) -> Result<Vec<DynamicImage>, ExtractionError> {
        self.requested.lock().unwrap().push(count);
        Ok((0..self.pages.min(count))
            .map(|_| DynamicImage::ImageRgb8(RgbImage::new(60, 80)))
            .collect())
    }
}

/// Renderer that always fails.
pub struct BrokenRenderer;

#[async_trait]
impl PageRenderer for BrokenRenderer {
    async fn render_leading_pages(&self, _count: usize) -> Result<Vec<DynamicImage>, ExtractionError> {
        Err(ExtractionError::RasterisationFailed {
            page: 1,
            detail: "stub".into(),
        })
    }
}

/// The moss-wall offer: two priced positions adding up to the net total.
pub fn moss_wall_offer() -> Value {
    json!({
        "document": {"type": "offer", "title": "Moosbild mit Logo", "date": "2023-05-10", "number": "A0492/23"},
        "vendor": {
            "name": "Gärtner Gregg",
            "vat_id": "DE198570491",
            "address": "Gartenweg 1, 10115 Berlin",
            "contact_person": "Jana Gregg",
            "role": "vendor"
        },
        "requestor": {
            "name": "Lio Technologies GmbH",
            "contact_person": "Max Mustermann",
            "department": "Marketing",
            "role": "requestor"
        },
        "order_lines": [
            {"description": "1.1 Moosbild mit Logo, 200x100 cm", "unit_price": 1438.0, "quantity": 1, "unit": "Stk", "total_price": 1438.0},
            {"description": "2 Transport und Montage", "unit_price": 320.0, "quantity": 1, "unit": "psch", "total_price": 320.0}
        ],
        "currency": "EUR",
        "totals": {"net": 1758.0, "tax": 334.02, "gross": 2092.02},
        "confidence": 0.92
    })
}
