//! Progress-callback trait for per-stage extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to observe
//! the pipeline as it moves through its stages.
//!
//! # Example
//!
//! ```rust
//! use procure_extract::{ExtractionConfig, ExtractionProgressCallback, Stage};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl ExtractionProgressCallback for Printer {
//!     fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
//!         eprintln!("{stage} done in {elapsed_ms}ms");
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(Printer))
//!     .build()
//!     .unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A step of the extraction pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    RawContent,
    ImageRecovery,
    EntityExtraction,
    Projection,
    VatFallback,
    Classification,
    Confidence,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::RawContent => "reading document",
            Stage::ImageRecovery => "reading footer images",
            Stage::EntityExtraction => "extracting entities",
            Stage::Projection => "projecting record",
            Stage::VatFallback => "VAT fallback",
            Stage::Classification => "classifying",
            Stage::Confidence => "scoring confidence",
        })
    }
}

/// Called by the pipeline as it processes a document.
///
/// Implementations must be `Send + Sync`: batch extraction runs several
/// documents concurrently against the same callback. All methods default to
/// no-ops.
pub trait ExtractionProgressCallback: Send + Sync {
    /// Called once, before the document is opened.
    fn on_extraction_start(&self, input: &str) {
        let _ = input;
    }

    /// Called when a stage begins. Optional stages that are not needed
    /// (no surviving images, valid VAT ID) never start.
    fn on_stage_start(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called when a stage finishes normally.
    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        let _ = (stage, elapsed_ms);
    }

    /// Called when a non-fatal stage failed and the pipeline carried on
    /// without its result.
    fn on_stage_degraded(&self, stage: Stage, reason: &str) {
        let _ = (stage, reason);
    }

    /// Called once after a successful extraction.
    fn on_extraction_complete(&self, confidence: f64) {
        let _ = confidence;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
