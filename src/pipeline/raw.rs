//! Raw content recovery: page text plus text read from embedded images.
//!
//! Loading runs inside `spawn_blocking` because pdfium is a blocking C
//! library. The loader walks every page once, reads its text, decides for
//! each embedded image with [`region::decide`] and decodes only the images
//! that survive, up to [`MAX_RECOVERY_IMAGES`]. The decoded bitmaps live in
//! the [`LoadedDocument`] and are dropped when [`assemble`] consumes it.

use crate::document::RawContent;
use crate::error::{ExtractionError, OracleError};
use crate::oracle::OracleSession;
use crate::pdfium::{bind_pdfium, open_document};
use crate::pipeline::{encode, postprocess, region};
use crate::prompts::IMAGE_TEXT_RECOVERY_PROMPT;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// At most this many surviving images are sent to the vision oracle.
pub const MAX_RECOVERY_IMAGES: usize = 2;

/// What the loader read from a PDF, before any oracle call.
#[derive(Debug, Default)]
pub struct LoadedDocument {
    /// Cleaned text of each page, in page order.
    pub page_texts: Vec<String>,
    /// The first [`MAX_RECOVERY_IMAGES`] surviving images, already cropped and resized.
    pub images: Vec<DynamicImage>,
    /// How many images survived selection across the whole document.
    pub surviving_images: usize,
}

/// Read page text and candidate images from a PDF.
pub async fn load_document(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<LoadedDocument, ExtractionError> {
    let path: PathBuf = pdf_path.to_path_buf();
    let password = password.map(str::to_string);

    tokio::task::spawn_blocking(move || load_document_blocking(&path, password.as_deref()))
        .await
        .map_err(|e| ExtractionError::Internal(format!("Load task panicked: {}", e)))?
}

fn load_document_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<LoadedDocument, ExtractionError> {
    let pdfium = bind_pdfium()?;
    let document = open_document(&pdfium, pdf_path, password)?;

    let mut loaded = LoadedDocument::default();

    for (index, page) in document.pages().iter().enumerate() {
        let page_num = index + 1;

        let text = page
            .text()
            .map_err(|e| ExtractionError::PageReadFailed {
                page: page_num,
                detail: format!("{:?}", e),
            })?
            .all();
        loaded.page_texts.push(postprocess::clean_page_text(&text));

        let page_size = (page.width().value as f64, page.height().value as f64);

        for object in page.objects().iter() {
            let Some(image_object) = object.as_image_object() else {
                continue;
            };

            let placed = match (object.width(), object.height()) {
                (Ok(w), Ok(h)) => Some((w.value as f64, h.value as f64)),
                _ => None,
            };
            let decision = region::decide(placed, page_size);
            debug!("Page {}: image placed at {:?} → {:?}", page_num, placed, decision);

            if decision == region::RegionDecision::Discard {
                continue;
            }
            loaded.surviving_images += 1;

            if loaded.images.len() >= MAX_RECOVERY_IMAGES {
                continue;
            }
            match image_object.get_raw_image() {
                Ok(bitmap) => {
                    if let Some(prepared) = region::prepare(decision, bitmap) {
                        loaded.images.push(prepared);
                    }
                }
                Err(e) => warn!("Page {}: could not decode embedded image: {:?}", page_num, e),
            }
        }
    }

    info!(
        "Loaded {} pages, {} surviving images",
        loaded.page_texts.len(),
        loaded.surviving_images
    );
    Ok(loaded)
}

/// Ask the vision oracle for the text in the candidate images.
///
/// Returns an empty string when there is nothing to send.
pub async fn recover_image_text(
    images: &[DynamicImage],
    session: &OracleSession<'_>,
) -> Result<String, OracleError> {
    let encoded: Vec<_> = images
        .iter()
        .take(MAX_RECOVERY_IMAGES)
        .filter_map(|img| match encode::encode_png(img) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to encode footer image: {}", e);
                None
            }
        })
        .collect();

    if encoded.is_empty() {
        return Ok(String::new());
    }

    debug!("Sending {} footer images to the vision oracle", encoded.len());
    let answer = session.vision(encoded, IMAGE_TEXT_RECOVERY_PROMPT).await?;
    Ok(postprocess::clean_page_text(&postprocess::strip_code_fences(&answer)))
}

/// Build the [`RawContent`], consuming (and so releasing) the loaded bitmaps.
pub fn assemble(loaded: LoadedDocument, image_recovered_text: String) -> RawContent {
    RawContent {
        text: loaded.page_texts.join("\n"),
        image_recovered_text,
        has_images: loaded.surviving_images > 0,
        page_count: loaded.page_texts.len(),
    }
}
