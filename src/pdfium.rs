//! Pdfium binding and document opening shared by the raw-content loader and
//! the page renderer.
//!
//! Binding order: `PDFIUM_LIB_PATH` (a file or a directory), the working
//! directory, the directory of the running executable, then the system
//! library search path.

use crate::error::ExtractionError;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming the pdfium shared library or its directory.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

fn candidate_libraries() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(p) = std::env::var(PDFIUM_LIB_PATH_ENV) {
        let p = PathBuf::from(p);
        if p.is_dir() {
            candidates.push(Pdfium::pdfium_platform_library_name_at_path(&p));
        } else {
            candidates.push(p);
        }
    }

    candidates.push(Pdfium::pdfium_platform_library_name_at_path("./"));

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(Pdfium::pdfium_platform_library_name_at_path(&dir));
    }

    candidates
}

/// Bind to the first pdfium library that loads.
pub fn bind_pdfium() -> Result<Pdfium, ExtractionError> {
    let mut last_error = None;
    for candidate in candidate_libraries() {
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => {
                debug!("Bound pdfium at {}", candidate.display());
                return Ok(Pdfium::new(bindings));
            }
            Err(e) => last_error = Some(format!("{}: {:?}", candidate.display(), e)),
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| {
            let detail = match last_error {
                Some(local) => format!("{local}; system library: {e:?}"),
                None => format!("system library: {e:?}"),
            };
            ExtractionError::PdfiumBindingFailed(detail)
        })
}

/// Open a PDF, translating pdfium's load errors into the password and
/// corruption variants of [`ExtractionError`].
pub fn open_document<'a>(
    pdfium: &'a Pdfium,
    pdf_path: &Path,
    password: Option<&'a str>,
) -> Result<PdfDocument<'a>, ExtractionError> {
    pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| load_error(pdf_path, password.is_some(), e))
}

fn load_error(pdf_path: &Path, had_password: bool, e: PdfiumError) -> ExtractionError {
    let err_str = format!("{:?}", e);
    if err_str.to_ascii_lowercase().contains("password") {
        if had_password {
            ExtractionError::WrongPassword {
                path: pdf_path.to_path_buf(),
            }
        } else {
            ExtractionError::PasswordRequired {
                path: pdf_path.to_path_buf(),
            }
        }
    } else {
        ExtractionError::CorruptPdf {
            path: pdf_path.to_path_buf(),
            detail: err_str,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_directory_is_tried_first() {
        let dir = tempfile::tempdir().unwrap();
        std::env::set_var(PDFIUM_LIB_PATH_ENV, dir.path());
        let candidates = candidate_libraries();
        std::env::remove_var(PDFIUM_LIB_PATH_ENV);
        assert!(candidates[0].starts_with(dir.path()));
        assert!(candidates.len() >= 2);
    }
}
