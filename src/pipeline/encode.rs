//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! PNG keeps small footer text crisp; JPEG artefacts around glyphs cost the
//! vision oracle digits in VAT IDs and IBANs. `detail: "high"` asks
//! tile-based vision models for the full tile budget.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode an image as a base64 PNG ready for the vision oracle.
pub fn encode_png(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!(
        "Encoded {}x{} image → {} bytes base64",
        img.width(),
        img.height(),
        b64.len()
    );

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}
