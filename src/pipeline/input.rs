//! Input resolution: validate a local path before pdfium sees it.
//!
//! pdfium only opens file-system paths. In-memory documents are spooled to a
//! [`tempfile::NamedTempFile`] that lives as long as the [`ResolvedInput`],
//! so the file is removed when extraction returns or panics. The `%PDF`
//! magic bytes are checked up front so callers get [`ExtractionError::NotAPdf`]
//! instead of a pdfium parse error.

use crate::error::ExtractionError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// A PDF that is known to exist, be readable and start with `%PDF`.
#[derive(Debug)]
pub enum ResolvedInput {
    /// The caller's own file.
    Local(PathBuf),
    /// Bytes spooled to a temp file; the file is deleted on drop.
    Spooled(NamedTempFile),
}

impl ResolvedInput {
    pub fn path(&self) -> &Path {
        match self {
            ResolvedInput::Local(p) => p,
            ResolvedInput::Spooled(tmp) => tmp.path(),
        }
    }
}

/// Validate a local file path.
pub fn resolve_local(path: impl AsRef<Path>) -> Result<ResolvedInput, ExtractionError> {
    let path = path.as_ref().to_path_buf();

    if !path.exists() {
        return Err(ExtractionError::FileNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(mut f) => {
            let mut magic = [0u8; 4];
            if f.read_exact(&mut magic).is_ok() && &magic != PDF_MAGIC {
                return Err(ExtractionError::NotAPdf { path, magic });
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExtractionError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExtractionError::FileNotFound { path });
        }
    }

    debug!("Resolved local PDF: {}", path.display());
    Ok(ResolvedInput::Local(path))
}

/// Spool an in-memory PDF to a temp file.
pub fn spool_bytes(bytes: &[u8]) -> Result<ResolvedInput, ExtractionError> {
    let mut tmp = NamedTempFile::new()
        .map_err(|e| ExtractionError::Internal(format!("tempfile: {e}")))?;

    if bytes.len() >= 4 && &bytes[..4] != PDF_MAGIC {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(ExtractionError::NotAPdf {
            path: tmp.path().to_path_buf(),
            magic,
        });
    }

    tmp.write_all(bytes)
        .map_err(|e| ExtractionError::Internal(format!("tempfile write: {e}")))?;
    debug!("Spooled {} bytes to {}", bytes.len(), tmp.path().display());
    Ok(ResolvedInput::Spooled(tmp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_local("/definitely/not/here/offer.pdf").unwrap_err();
        assert!(matches!(err, ExtractionError::FileNotFound { .. }));
    }

    #[test]
    fn non_pdf_is_rejected_with_magic() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"PK\x03\x04zipdata").unwrap();
        match resolve_local(f.path()) {
            Err(ExtractionError::NotAPdf { magic, .. }) => assert_eq!(&magic, b"PK\x03\x04"),
            _ => panic!("expected NotAPdf"),
        }
    }

    #[test]
    fn pdf_header_is_accepted() {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(b"%PDF-1.7\n").unwrap();
        assert!(matches!(resolve_local(f.path()), Ok(ResolvedInput::Local(_))));
    }

    #[test]
    fn spooled_bytes_live_until_drop() {
        let resolved = spool_bytes(b"%PDF-1.4\n%%EOF").unwrap();
        let path = resolved.path().to_path_buf();
        assert!(path.exists());
        drop(resolved);
        assert!(!path.exists());
    }

    #[test]
    fn spooled_non_pdf_is_rejected() {
        assert!(matches!(
            spool_bytes(b"<html></html>"),
            Err(ExtractionError::NotAPdf { .. })
        ));
    }
}
