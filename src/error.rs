//! Error types for the procure-extract library.
//!
//! Three error types reflect three distinct failure modes:
//!
//! * [`ExtractionError`] is **fatal**: the document cannot be turned into a
//!   procurement record at all (unreadable file, oracle contract violation,
//!   no vendor resolved). Returned as `Err(ExtractionError)` from the
//!   top-level `extract*` functions. No partial data accompanies it.
//!
//! * [`ClassificationError`] is **soft**: commodity classification failed at
//!   one of its two steps. Never propagated out of `extract`; it is stored in
//!   [`crate::output::ClassificationOutcome::Unclassified`] and the record is
//!   returned without a commodity group.
//!
//! * [`OracleError`] means a single oracle round trip failed. Whether that is
//!   fatal depends on the stage that made the call.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the procure-extract library.
#[derive(Debug, Error)]
pub enum ExtractionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Text or embedded images of a page could not be read.
    #[error("Failed to read page {page}: {detail}")]
    PageReadFailed { page: usize, detail: String },

    /// A page could not be rasterised for the vision fallback.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the binary,\n\
or install it system-wide."
    )]
    PdfiumBindingFailed(String),

    // ── Oracle errors ─────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The structured-extraction oracle call itself failed.
    #[error("Structured extraction call failed")]
    OracleFailed(#[source] OracleError),

    /// The oracle answered, but not with a valid document structure.
    #[error("Oracle returned a malformed document structure: {detail}")]
    ContractViolation { detail: String },

    /// No entity tagged `vendor` could be resolved from the document.
    #[error("No vendor could be identified in the document{}", role_suffix(.found_role))]
    VendorNotFound { found_role: Option<String> },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn role_suffix(role: &Option<String>) -> String {
    role.as_ref()
        .map(|r| format!(" (issuer entity was tagged '{r}')"))
        .unwrap_or_default()
}

/// Failure of a single oracle round trip.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum OracleError {
    /// The provider returned an error (network, auth, rate limit, 5xx …).
    #[error("Oracle provider error: {0}")]
    Provider(String),

    /// The call did not complete within the configured timeout.
    #[error("Oracle call timed out after {secs}s")]
    Timeout { secs: u64 },

    /// The provider answered with no content at all.
    #[error("Oracle returned an empty response")]
    EmptyResponse,
}

/// Soft failure of commodity classification.
///
/// Stored alongside the result; the surrounding extraction still succeeds.
#[derive(Debug, Clone, Error, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ClassificationError {
    /// There was nothing to classify.
    #[error("No order-line descriptions to classify")]
    NoDescriptions,

    /// The oracle call for a step failed.
    #[error("Oracle call failed during {step} step: {source}")]
    Oracle {
        step: ClassificationStep,
        #[source]
        source: OracleError,
    },

    /// The oracle answer could not be parsed.
    #[error("Unparseable {step} response: {detail}")]
    Unparseable {
        step: ClassificationStep,
        detail: String,
    },

    /// The category step named something outside the taxonomy.
    #[error("Unknown commodity category '{0}'")]
    UnknownCategory(String),

    /// The leaf step returned an ID that does not belong to the chosen category.
    #[error("Commodity group {id} is not part of category '{category}'")]
    LeafOutsideCategory { id: u32, category: String },

    /// The single-step text classification returned an ID outside the taxonomy.
    #[error("Unknown commodity group {0}")]
    UnknownGroup(u32),
}

/// Which classification step produced a [`ClassificationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ClassificationStep {
    Category,
    Leaf,
    Text,
}

impl std::fmt::Display for ClassificationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ClassificationStep::Category => "category",
            ClassificationStep::Leaf => "leaf",
            ClassificationStep::Text => "text",
        })
    }
}
