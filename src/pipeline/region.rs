//! Image region selection: which embedded images are worth a vision call,
//! and what part of them to send.
//!
//! Offers built from a scanned letterhead carry the whole page as one large
//! background image whose only machine-unreadable text is the footer (legal
//! entity, VAT ID, bank details). Small images are logos and signatures. So
//! large images are cut down to their bottom band and small ones are dropped.
//!
//! Sizes in page units (points) decide; pixel sizes only matter for the
//! crop and the resize.

use image::imageops::FilterType;
use image::DynamicImage;

/// An image is "large" when its placed area exceeds `page_area / LARGE_IMAGE_DIVISOR`.
pub const LARGE_IMAGE_DIVISOR: f64 = 3.0;

/// Fraction of a large image's height kept as the footer band.
pub const FOOTER_FRACTION: f64 = 0.2;

/// Longest side, in pixels, of any image sent to the vision oracle.
pub const MAX_VISION_SIDE: u32 = 1500;

/// What to do with one embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionDecision {
    /// Large background image: keep only the footer band.
    FooterCrop,
    /// Too small to carry document text.
    Discard,
    /// Placement unknown: keep the whole image.
    KeepUnfiltered,
}

/// Decide from the image's placed size and the page size, both in points.
pub fn decide(placed: Option<(f64, f64)>, page: (f64, f64)) -> RegionDecision {
    let Some((w, h)) = placed else {
        return RegionDecision::KeepUnfiltered;
    };
    if !(w.is_finite() && h.is_finite()) {
        return RegionDecision::KeepUnfiltered;
    }
    let threshold = (page.0 * page.1) / LARGE_IMAGE_DIVISOR;
    if w.abs() * h.abs() > threshold {
        RegionDecision::FooterCrop
    } else {
        RegionDecision::Discard
    }
}

/// Height in pixels of the footer band of an image `height` pixels tall.
pub fn footer_height(height: u32) -> u32 {
    let band = (FOOTER_FRACTION * height as f64).round() as u32;
    band.clamp(1.min(height), height)
}

/// Bottom [`FOOTER_FRACTION`] of `img`, full width.
pub fn crop_footer(img: &DynamicImage) -> DynamicImage {
    let (w, h) = (img.width(), img.height());
    let band = footer_height(h);
    img.crop_imm(0, h - band, w, band)
}

/// Target size with the longest side capped at `max_side`, aspect preserved.
pub fn capped_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= max_side || longest == 0 {
        return (width, height);
    }
    let scale = max_side as f64 / longest as f64;
    let scaled = |side: u32| ((side as f64 * scale).round() as u32).max(1);
    if width >= height {
        (max_side, scaled(height))
    } else {
        (scaled(width), max_side)
    }
}

/// Downscale so the longest side is at most [`MAX_VISION_SIDE`].
pub fn cap_longest_side(img: DynamicImage) -> DynamicImage {
    let (w, h) = capped_dimensions(img.width(), img.height(), MAX_VISION_SIDE);
    if (w, h) == (img.width(), img.height()) {
        return img;
    }
    img.resize_exact(w, h, FilterType::Lanczos3)
}

/// Apply `decision` to a decoded image. `None` means the image is dropped.
pub fn prepare(decision: RegionDecision, img: DynamicImage) -> Option<DynamicImage> {
    match decision {
        RegionDecision::Discard => None,
        RegionDecision::FooterCrop => Some(cap_longest_side(crop_footer(&img))),
        RegionDecision::KeepUnfiltered => Some(cap_longest_side(img)),
    }
}
