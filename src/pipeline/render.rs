//! Page rasterisation for the VAT-ID vision fallback.
//!
//! Only the leading pages are ever rendered; the issuer's VAT ID sits in the
//! letterhead or the footer of the first page, occasionally the second.
//! The longest edge is capped at `max_rendered_pixels` rather than using a
//! fixed DPI so odd page sizes cannot blow up memory.

use crate::error::ExtractionError;
use crate::pdfium::{bind_pdfium, open_document};
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of leading pages rendered for the VAT fallback.
pub const VAT_FALLBACK_PAGES: usize = 2;

/// Source of page images for vision calls.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render up to `count` pages from the start of the document.
    async fn render_leading_pages(&self, count: usize) -> Result<Vec<DynamicImage>, ExtractionError>;
}

/// Renders pages of a PDF on disk with pdfium.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    path: PathBuf,
    password: Option<String>,
    max_pixels: u32,
}

impl PdfiumRenderer {
    pub fn new(path: impl Into<PathBuf>, password: Option<String>, max_pixels: u32) -> Self {
        Self {
            path: path.into(),
            password,
            max_pixels,
        }
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn render_leading_pages(&self, count: usize) -> Result<Vec<DynamicImage>, ExtractionError> {
        let renderer = self.clone();
        tokio::task::spawn_blocking(move || {
            render_leading_pages_blocking(
                &renderer.path,
                renderer.password.as_deref(),
                renderer.max_pixels,
                count,
            )
        })
        .await
        .map_err(|e| ExtractionError::Internal(format!("Render task panicked: {}", e)))?
    }
}

fn render_leading_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
    max_pixels: u32,
    count: usize,
) -> Result<Vec<DynamicImage>, ExtractionError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(count);
    for (idx, page) in document.pages().iter().take(count).enumerate() {
        let bitmap = page.render_with_config(&render_config).map_err(|e| {
            ExtractionError::RasterisationFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            }
        })?;
        let image = bitmap.as_image();
        debug!("Rendered page {} → {}x{} px", idx + 1, image.width(), image.height());
        images.push(image);
    }

    Ok(images)
}

/// A renderer with nothing to render; the VAT fallback then has no input.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPages;

#[async_trait]
impl PageRenderer for NoPages {
    async fn render_leading_pages(&self, _count: usize) -> Result<Vec<DynamicImage>, ExtractionError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn no_pages_renders_nothing() {
        assert!(NoPages.render_leading_pages(VAT_FALLBACK_PAGES).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_pdf_fails_to_render() {
        let renderer = PdfiumRenderer::new("/definitely/not/here.pdf", None, 1000);
        assert!(renderer.render_leading_pages(1).await.is_err());
    }
}
