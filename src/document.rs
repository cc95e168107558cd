//! Intermediate document types: what the raw-content stage recovers and what
//! the structured-extraction oracle must return.
//!
//! [`FullDocumentStructure`] mirrors the JSON contract of the oracle's
//! structured-output mode field for field, so deserialising it *is* the shape
//! validation. Semantic validation (vendor role, positive prices) happens in
//! [`crate::pipeline::entities`].

use serde::{Deserialize, Serialize};

/// Delimiter placed between page text and image-recovered text.
pub const IMAGE_TEXT_MARKER: &str = "=== TEXT RECOVERED FROM EMBEDDED IMAGES ===";

/// Plain text and image-derived text recovered from one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawContent {
    /// Page text in document order, pages separated by newlines.
    pub text: String,
    /// Text the vision oracle read from footer bands of large images.
    pub image_recovered_text: String,
    /// True iff at least one embedded image survived region selection.
    pub has_images: bool,
    pub page_count: usize,
}

impl RawContent {
    /// Text handed to the structured extractor.
    ///
    /// Image-recovered text, when present, is appended after
    /// [`IMAGE_TEXT_MARKER`] so the oracle can tell the two sources apart.
    pub fn combined_text(&self) -> String {
        let recovered = self.image_recovered_text.trim();
        if recovered.is_empty() {
            return self.text.clone();
        }
        format!("{}\n\n{}\n{}\n", self.text.trim_end(), IMAGE_TEXT_MARKER, recovered)
    }
}

/// Role of a company entity within the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityRole {
    Vendor,
    Requestor,
    #[default]
    #[serde(other)]
    Unknown,
}

impl EntityRole {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityRole::Vendor => "vendor",
            EntityRole::Requestor => "requestor",
            EntityRole::Unknown => "unknown",
        }
    }
}

/// A party named in the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyEntity {
    pub name: String,
    #[serde(default)]
    pub vat_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: EntityRole,
}

/// One priced position of the offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineDetailed {
    pub description: String,
    pub unit_price: f64,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
    pub total_price: f64,
}

/// Descriptive metadata of the document itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInfo {
    #[serde(default, rename = "type")]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
}

/// Net, tax and gross totals as printed on the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    #[serde(default)]
    pub net: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub gross: Option<f64>,
}

impl Totals {
    /// The declared order total: net when stated and positive, otherwise gross.
    ///
    /// Order-line prices are net, so the net total is the one they must
    /// add up to. A zero net is a placeholder, not a total.
    pub fn total_cost(&self) -> Option<f64> {
        self.net.filter(|n| *n > 0.0).or(self.gross)
    }
}

/// Everything the structured-extraction oracle reports about a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullDocumentStructure {
    #[serde(default)]
    pub document: DocumentInfo,
    #[serde(default)]
    pub vendor: Option<CompanyEntity>,
    #[serde(default)]
    pub requestor: Option<CompanyEntity>,
    #[serde(default)]
    pub order_lines: Vec<OrderLineDetailed>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub totals: Totals,
    /// The oracle's confidence in its own output, 0.0–1.0.
    pub confidence: f64,
}
