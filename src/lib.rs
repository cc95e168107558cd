//! # procure-extract
//!
//! Turn vendor offer PDFs into confidence-scored procurement records.
//!
//! An offer PDF carries everything a purchase request needs (who sells, who
//! buys, what, for how much) but in free layout, sometimes with the legal
//! footer baked into a scanned letterhead image. This crate recovers the
//! text, asks a document-understanding oracle (an LLM behind the
//! [`DocumentOracle`] trait) for a role-disambiguated structure, validates
//! it, classifies the order into a fixed commodity taxonomy and scores how
//! far the result can be trusted.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Raw       page text via pdfium, footer bands of large images via vision
//!  ├─ 2. Entities  one structured-output call → vendor, requestor, lines, totals
//!  ├─ 3. Project   map to the flat procurement record
//!  ├─ 4. Classify  category, then leaf commodity group (soft failure)
//!  ├─ 5. VAT       vision fallback over the first pages when the VAT ID is bad
//!  └─ 6. Score     min(structural checks, oracle confidence)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use procure_extract::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = ExtractionConfig::default();
//!     let output = extract("offer.pdf", &config).await?;
//!     println!("{}", serde_json::to_string_pretty(&output.data)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `procure-extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! procure-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod oracle;
pub mod output;
pub mod pdfium;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod taxonomy;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{extract_stream, BatchItem, ExtractionStream};
pub use config::{ExtractionConfig, ExtractionConfigBuilder};
pub use document::{CompanyEntity, EntityRole, FullDocumentStructure, OrderLineDetailed, RawContent};
pub use error::{ClassificationError, ClassificationStep, ExtractionError, OracleError};
pub use extract::{extract, extract_from_bytes, extract_from_raw_content, extract_sync, extract_to_file};
pub use oracle::{resolve_oracle, DocumentOracle, LlmOracle, OracleSession};
pub use output::{
    CategoryClassification, ClassificationOutcome, CommodityClassification, ConfidenceReport,
    ExtractedData, ExtractionOutput, ExtractionStats, OrderLineCreate, StructuralChecks,
};
pub use pipeline::classify::{classify_descriptions, classify_text};
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use taxonomy::{Category, CommodityGroup, CATEGORIES, COMMODITY_GROUPS};
