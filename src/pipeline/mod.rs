//! Pipeline stages for offer extraction.
//!
//! Each submodule implements exactly one step, so each can be tested with a
//! scripted oracle and without pdfium.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ raw ──▶ entities ──▶ project ──▶ classify ──▶ confidence
//! (path)   (pdfium    (structured   (target    (category,   (checks, VAT
//!           + region   oracle call)  schema)    then leaf)   fallback)
//!           + vision)
//! ```
//!
//! 1. [`input`]     : validate the path or spool bytes to a temp file
//! 2. [`raw`]       : page text and footer-image text; uses [`region`] to
//!    pick images and [`encode`] to ship them
//! 3. [`entities`]  : the structured-output call and its validation
//! 4. [`project`]   : pure mapping to the procurement record
//! 5. [`classify`]  : two-step commodity classification (soft)
//! 6. [`confidence`]: structural checks and the VAT fallback, which renders
//!    pages through [`render`]
//!
//! [`postprocess`] holds the text and answer cleanup rules shared by stages.

pub mod classify;
pub mod confidence;
pub mod encode;
pub mod entities;
pub mod input;
pub mod postprocess;
pub mod project;
pub mod raw;
pub mod region;
pub mod render;
