//! Instructions sent to the document-understanding oracle.
//!
//! Every prompt lives here so the wording can change without touching parsing
//! or validation code, and so tests can check that the contract-bearing parts
//! (role rules, response line formats, the VAT sentinel) are present.

use crate::taxonomy::{Category, CommodityGroup, CATEGORIES, COMMODITY_GROUPS};

/// Token the vision oracle returns when no VAT ID is visible.
pub const VAT_NOT_FOUND: &str = "NOT_FOUND";

/// System prompt for the structured-output extraction call.
pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"You are an expert at extracting procurement information from vendor offers and quotes.
You receive the text of one document. Text recovered from images (letterheads, footers) may follow a marker line.

ROLES
- vendor: the company that ISSUED the document. Prefer footer and signature-block text over header text.
  Indicators: "our offer", "our quote", a VAT ID in the footer, bank details, managing directors.
- requestor: the RECIPIENT of the document, found in the header address block ("To:", "Customer:", "Kunde:").
  A "processed by" / "Bearbeiter" contact belongs to the vendor, never to the requestor.
- A department, if mentioned, belongs to the requestor.

ORDER LINES
- Every line that carries its own unit price and its own total price is a separate order line.
- This includes "alternative to the preceding position" items (e.g. 1.1a, 1.1b): emit them as their own lines,
  never merge them into the base position and never drop them.
- Lines without their own price (headings, notes) are not order lines.
- Numbers are plain JSON numbers without currency symbols or thousands separators (1.438,00 € -> 1438.0).

Return ONLY a JSON object with exactly this structure:
{
  "document": {"type": "offer|quote|invoice|other", "title": string|null, "date": string|null, "number": string|null, "terms": string|null},
  "vendor": {"name": string, "vat_id": string|null, "address": string|null, "contact_person": string|null, "department": null, "role": "vendor"},
  "requestor": {"name": string, "vat_id": string|null, "address": string|null, "contact_person": string|null, "department": string|null, "role": "requestor"},
  "order_lines": [{"description": string, "unit_price": number, "quantity": number, "unit": string, "total_price": number}],
  "currency": "EUR|USD|...",
  "totals": {"net": number|null, "tax": number|null, "gross": number|null},
  "confidence": number between 0.0 and 1.0 (your confidence in this extraction)
}
VAT IDs (USt-IdNr.) look like DE followed by 9 digits. Use null for anything not present."#;

/// User message for the structured-output extraction call.
pub fn extraction_user_message(document_text: &str) -> String {
    format!("Extract the procurement information from this vendor offer:\n\n{document_text}")
}

/// Instruction for reading text out of cropped footer images.
pub const IMAGE_TEXT_RECOVERY_PROMPT: &str = r#"These images are the footer areas of a business document.
Transcribe ALL legible text exactly as written: company names, addresses, VAT IDs (USt-IdNr.), tax numbers,
registry entries, bank details, phone numbers, e-mail addresses.
Output plain text only, one block per image, without commentary. If nothing is legible, output nothing."#;

/// Instruction for the VAT-ID vision fallback over the first pages.
pub fn vat_fallback_prompt() -> String {
    format!(
        r#"Analyze these document pages and extract the VAT ID (Umsatzsteuer-Identifikationsnummer) of the company that issued the document.
- Usually "DE" followed by exactly 9 digits, e.g. DE123456789
- May be labelled "USt-IdNr", "USt-ID", "VAT ID", "Umsatzsteuer-ID" or "UID"
- Often in headers, footers or company information blocks, possibly rendered as an image
- If several VAT IDs appear, return the vendor's (sender's)
Return ONLY the VAT ID without spaces, labels or explanations. If there is none, return {VAT_NOT_FOUND}."#
    )
}

fn bullet_list(descriptions: &[String]) -> String {
    descriptions
        .iter()
        .map(|d| format!("- {}", d.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Category step: pick one of the seven categories.
pub fn category_prompt(descriptions: &[String]) -> String {
    let categories = CATEGORIES
        .iter()
        .map(|c| format!("- {}: {}", c.name(), c.definition()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"You are a procurement specialist. Choose the ONE commodity category that best fits these order items.

Categories:
{categories}

Order items:
{items}

If the items span several categories, choose the category that covers the majority of the items or of the order value.
Answer with exactly three lines:
Category: <category name exactly as listed>
Confidence: <number between 0.0 and 1.0>
Reasoning: <one sentence>"#,
        items = bullet_list(descriptions)
    )
}

fn group_lines<'a>(groups: impl IntoIterator<Item = &'a CommodityGroup>, with_category: bool) -> String {
    groups
        .into_iter()
        .map(|g| {
            if with_category {
                format!("{}: {}", g.id, g.display_name())
            } else {
                format!("{}: {}", g.id, g.name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Leaf step: pick one commodity group inside the chosen category.
pub fn leaf_prompt(category: Category, descriptions: &[String]) -> String {
    format!(
        r#"You are a procurement specialist. These order items belong to the category "{category}".
Choose the ONE commodity group that fits them best.

Commodity groups:
{groups}

Order items:
{items}

Answer with exactly three lines:
ID: <group number from the list>
Confidence: <number between 0.0 and 1.0>
Reasoning: <one sentence>"#,
        category = category.name(),
        groups = group_lines(category.groups(), false),
        items = bullet_list(descriptions)
    )
}

/// Single-step classification of free text against every leaf group.
pub fn text_classification_prompt(text: &str) -> String {
    format!(
        r#"You are a procurement specialist. Choose the ONE commodity group that best fits this description.

Commodity groups:
{groups}

Description:
{text}

Answer with exactly three lines:
ID: <group number from the list>
Confidence: <number between 0.0 and 1.0>
Reasoning: <one sentence>"#,
        groups = group_lines(COMMODITY_GROUPS.iter(), true),
        text = text.trim()
    )
}
