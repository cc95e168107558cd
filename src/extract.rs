//! Single-document extraction entry points.
//!
//! Every entry point funnels into the same chain: raw content, structured
//! extraction, projection, classification, VAT fallback, confidence. Fatal
//! errors stop the chain and no partial record is returned; classification
//! and the two vision helpers (footer text, VAT fallback) degrade instead.
//! Use [`crate::batch::extract_stream`] for many documents at once.

use crate::config::ExtractionConfig;
use crate::document::RawContent;
use crate::error::ExtractionError;
use crate::oracle::{resolve_oracle, OracleSession};
use crate::output::{ClassificationOutcome, ExtractionOutput, ExtractionStats};
use crate::pipeline::render::{PageRenderer, PdfiumRenderer, VAT_FALLBACK_PAGES};
use crate::pipeline::{classify, confidence, entities, input, project, raw};
use crate::progress::{ProgressCallback, Stage};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Extract a procurement record from a PDF on disk.
///
/// This is the primary entry point for the library.
///
/// # Errors
/// Returns `Err(ExtractionError)` only for fatal errors:
/// - File not found / permission denied / not a PDF / unreadable PDF
/// - No oracle could be configured, or the structured-extraction call failed
/// - The oracle's answer violated the document contract
/// - No vendor could be identified
///
/// # Example
/// ```rust,no_run
/// use procure_extract::{extract, ExtractionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExtractionConfig::default();
/// let output = extract("offer.pdf", &config).await?;
/// println!("{} → {:.2}", output.data.vendor_name, output.data.confidence);
/// # Ok(())
/// # }
/// ```
pub async fn extract(
    pdf_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    let pdf_path = pdf_path.as_ref();
    let label = pdf_path.display().to_string();
    let resolved = input::resolve_local(pdf_path)?;
    extract_resolved(resolved.path(), &label, config).await
}

/// Extract a procurement record from PDF bytes held in memory.
///
/// The bytes are written to a managed temp file that is removed when this
/// function returns.
pub async fn extract_from_bytes(
    bytes: &[u8],
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    let resolved = input::spool_bytes(bytes)?;
    let label = format!("<{} bytes>", bytes.len());
    extract_resolved(resolved.path(), &label, config).await
}

/// Extract and write the output as pretty JSON to `output_path`.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn extract_to_file(
    pdf_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    let output = extract(pdf_path, config).await?;
    write_json_atomic(output_path.as_ref(), &output).await?;
    Ok(output)
}

/// Synchronous wrapper around [`extract`].
///
/// Creates a temporary tokio runtime internally.
pub fn extract_sync(
    pdf_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExtractionError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(extract(pdf_path, config))
}

/// Run the chain after raw content recovery.
///
/// `renderer` supplies pages for the VAT fallback. This is the seam for
/// callers that recover text themselves, and for tests.
pub async fn extract_from_raw_content(
    raw: RawContent,
    renderer: &dyn PageRenderer,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    let started = Instant::now();
    let progress = Progress(config.progress_callback.as_ref());
    progress.extraction_start("<raw content>");

    let oracle = resolve_oracle(config)?;
    let session = OracleSession::new(oracle.as_ref(), config.api_timeout_secs);
    let stats = ExtractionStats::default();
    run_chain(raw, &session, renderer, config, &progress, stats, started).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Forwards stage events to the optional callback.
struct Progress<'a>(Option<&'a ProgressCallback>);

impl Progress<'_> {
    fn extraction_start(&self, input: &str) {
        if let Some(cb) = self.0 {
            cb.on_extraction_start(input);
        }
    }

    fn start(&self, stage: Stage) -> Instant {
        if let Some(cb) = self.0 {
            cb.on_stage_start(stage);
        }
        Instant::now()
    }

    fn complete(&self, stage: Stage, started: Instant) {
        let elapsed_ms = started.elapsed().as_millis() as u64;
        debug!("{} finished in {}ms", stage, elapsed_ms);
        if let Some(cb) = self.0 {
            cb.on_stage_complete(stage, elapsed_ms);
        }
    }

    fn degraded(&self, stage: Stage, reason: &str) {
        warn!("{} degraded: {}", stage, reason);
        if let Some(cb) = self.0 {
            cb.on_stage_degraded(stage, reason);
        }
    }

    fn extraction_complete(&self, confidence: f64) {
        if let Some(cb) = self.0 {
            cb.on_extraction_complete(confidence);
        }
    }
}

pub(crate) async fn extract_resolved(
    pdf_path: &Path,
    label: &str,
    config: &ExtractionConfig,
) -> Result<ExtractionOutput, ExtractionError> {
    let started = Instant::now();
    info!("Starting extraction: {}", label);
    let progress = Progress(config.progress_callback.as_ref());
    progress.extraction_start(label);

    // ── Step 1: Resolve oracle ───────────────────────────────────────────
    let oracle = resolve_oracle(config)?;
    let session = OracleSession::new(oracle.as_ref(), config.api_timeout_secs);

    // ── Step 2: Page text and candidate images ───────────────────────────
    let stage = progress.start(Stage::RawContent);
    let loaded = raw::load_document(pdf_path, config.password.as_deref()).await?;
    progress.complete(Stage::RawContent, stage);

    // ── Step 3: Footer-image text (optional) ─────────────────────────────
    let mut recovered = String::new();
    if !loaded.images.is_empty() {
        let stage = progress.start(Stage::ImageRecovery);
        match raw::recover_image_text(&loaded.images, &session).await {
            Ok(text) => {
                recovered = text;
                progress.complete(Stage::ImageRecovery, stage);
            }
            Err(e) => progress.degraded(Stage::ImageRecovery, &e.to_string()),
        }
    }
    let raw_content = raw::assemble(loaded, recovered);
    let stats = ExtractionStats {
        raw_duration_ms: started.elapsed().as_millis() as u64,
        ..ExtractionStats::default()
    };
    info!(
        "Raw content: {} pages, {} chars, images: {}",
        raw_content.page_count,
        raw_content.text.len(),
        raw_content.has_images
    );

    let renderer = PdfiumRenderer::new(pdf_path, config.password.clone(), config.max_rendered_pixels);
    run_chain(raw_content, &session, &renderer, config, &progress, stats, started).await
}

async fn run_chain(
    raw_content: RawContent,
    session: &OracleSession<'_>,
    renderer: &dyn PageRenderer,
    config: &ExtractionConfig,
    progress: &Progress<'_>,
    mut stats: ExtractionStats,
    started: Instant,
) -> Result<ExtractionOutput, ExtractionError> {
    let chain_start = Instant::now();

    // ── Step 4: Structured extraction ────────────────────────────────────
    let stage = progress.start(Stage::EntityExtraction);
    let structure = entities::extract_entities(&raw_content, session).await?;
    progress.complete(Stage::EntityExtraction, stage);

    // ── Step 5: Projection ───────────────────────────────────────────────
    let stage = progress.start(Stage::Projection);
    let mut data = project::project(&structure);
    progress.complete(Stage::Projection, stage);

    // ── Step 6: Classification (soft) ────────────────────────────────────
    let classification = if config.classify {
        let stage = progress.start(Stage::Classification);
        let descriptions: Vec<String> = data
            .order_lines
            .iter()
            .map(|l| l.position_description.clone())
            .collect();
        let outcome = ClassificationOutcome::from(
            classify::classify_descriptions(session, &descriptions).await,
        );
        match outcome {
            ClassificationOutcome::Unclassified { ref reason } => {
                progress.degraded(Stage::Classification, &reason.to_string())
            }
            _ => progress.complete(Stage::Classification, stage),
        }
        outcome
    } else {
        ClassificationOutcome::Skipped
    };
    data.commodity_group = classification.group_id();

    // ── Step 7: VAT fallback (recoverable) ───────────────────────────────
    let primary_vat = data.vat_id.take();
    let mut fallback_vat = None;
    if confidence::valid_vat_id(primary_vat.as_deref()).is_none() && config.vat_fallback {
        let stage = progress.start(Stage::VatFallback);
        match vat_fallback(renderer, session).await {
            Ok(Some(vat)) => {
                info!("VAT fallback recovered {}", vat);
                fallback_vat = Some(vat);
                progress.complete(Stage::VatFallback, stage);
            }
            Ok(None) => progress.degraded(Stage::VatFallback, "no valid VAT ID found"),
            Err(reason) => progress.degraded(Stage::VatFallback, &reason),
        }
    }

    // ── Step 8: Confidence ───────────────────────────────────────────────
    let stage = progress.start(Stage::Confidence);
    let fallback_used = fallback_vat.is_some();
    let scored_vat = fallback_vat.as_deref().or(primary_vat.as_deref());
    let checks = confidence::structural_checks(&data, scored_vat);
    let report = confidence::score(checks, structure.confidence, fallback_used);
    data.vat_id = fallback_vat.or_else(|| confidence::valid_vat_id(primary_vat.as_deref()));
    data.confidence = report.final_confidence;
    progress.complete(Stage::Confidence, stage);

    // ── Step 9: Stats ────────────────────────────────────────────────────
    stats.page_count = raw_content.page_count;
    stats.has_images = raw_content.has_images;
    stats.text_chars = raw_content.text.chars().count();
    stats.image_text_chars = raw_content.image_recovered_text.chars().count();
    stats.oracle_calls = session.calls();
    stats.extraction_duration_ms = chain_start.elapsed().as_millis() as u64;
    stats.total_duration_ms = started.elapsed().as_millis() as u64;

    info!(
        "Extraction complete: vendor '{}', {} lines, confidence {:.2}, {} oracle calls, {}ms",
        data.vendor_name,
        data.order_lines.len(),
        data.confidence,
        stats.oracle_calls,
        stats.total_duration_ms
    );
    progress.extraction_complete(data.confidence);

    Ok(ExtractionOutput {
        data,
        classification,
        confidence: report,
        stats,
    })
}

/// Render the leading pages and ask for the VAT ID; errors become reasons.
async fn vat_fallback(
    renderer: &dyn PageRenderer,
    session: &OracleSession<'_>,
) -> Result<Option<String>, String> {
    let pages = renderer
        .render_leading_pages(VAT_FALLBACK_PAGES)
        .await
        .map_err(|e| e.to_string())?;
    confidence::vat_fallback(&pages, session)
        .await
        .map_err(|e| e.to_string())
}

async fn write_json_atomic(path: &Path, output: &ExtractionOutput) -> Result<(), ExtractionError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| ExtractionError::Internal(format!("Failed to serialise output: {}", e)))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ExtractionError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, json)
        .await
        .map_err(|e| ExtractionError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| ExtractionError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(())
}
