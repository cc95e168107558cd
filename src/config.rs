//! Configuration for offer extraction.
//!
//! All pipeline behaviour is controlled through [`ExtractionConfig`], built
//! via its [`ExtractionConfigBuilder`]. The heuristics themselves (image
//! threshold, footer band, confidence buckets) are named constants in their
//! stage modules; this struct only carries operational knobs.

use crate::error::ExtractionError;
use crate::oracle::DocumentOracle;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default model for structured extraction and classification.
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";

/// Default model for vision calls (image text recovery, VAT fallback).
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Configuration for a single-document or batch extraction.
///
/// # Example
/// ```rust
/// use procure_extract::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gpt-4o-mini")
///     .api_timeout_secs(90)
///     .classify(false)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Model used for structured extraction and classification.
    /// If None, uses [`DEFAULT_TEXT_MODEL`].
    pub model: Option<String>,

    /// Model used for vision calls. If None, uses [`DEFAULT_VISION_MODEL`].
    pub vision_model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider, used for both text and vision calls.
    /// Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Pre-constructed oracle. Takes precedence over every provider setting;
    /// this is how tests and alternative model backends plug in.
    pub oracle: Option<Arc<dyn DocumentOracle>>,

    /// Sampling temperature. Default: 0.0.
    ///
    /// Extraction is transcription, not writing; any randomness only makes
    /// repeated runs disagree.
    pub temperature: f32,

    /// Maximum tokens for the structured-extraction answer. Default: 4096.
    ///
    /// Offers with many positions and long descriptions produce large JSON
    /// documents; a truncated answer is unparseable and therefore fatal.
    pub max_tokens: usize,

    /// Maximum tokens for vision and classification answers. Default: 1024.
    pub short_answer_max_tokens: usize,

    /// Per-oracle-call timeout in seconds. Default: 60.
    ///
    /// A timeout counts as a failed call. There is no retry inside the
    /// pipeline.
    pub api_timeout_secs: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Longest edge, in pixels, of pages rendered for the VAT fallback. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Run commodity classification. Default: true.
    pub classify: bool,

    /// Allow the vision VAT-ID fallback call. Default: true.
    pub vat_fallback: bool,

    /// Number of documents processed at once by
    /// [`crate::batch::extract_stream`]. Default: 4.
    pub concurrency: usize,

    /// Optional stage-progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: None,
            vision_model: None,
            provider_name: None,
            provider: None,
            oracle: None,
            temperature: 0.0,
            max_tokens: 4096,
            short_answer_max_tokens: 1024,
            api_timeout_secs: 60,
            password: None,
            max_rendered_pixels: 2000,
            classify: true,
            vat_fallback: true,
            concurrency: 4,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("vision_model", &self.vision_model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("oracle", &self.oracle.as_ref().map(|_| "<dyn DocumentOracle>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("short_answer_max_tokens", &self.short_answer_max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("classify", &self.classify)
            .field("vat_fallback", &self.vat_fallback)
            .field("concurrency", &self.concurrency)
            .finish()
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }

    pub fn text_model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_TEXT_MODEL)
    }

    pub fn vision_model(&self) -> &str {
        self.vision_model.as_deref().unwrap_or(DEFAULT_VISION_MODEL)
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.config.vision_model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn oracle(mut self, oracle: Arc<dyn DocumentOracle>) -> Self {
        self.config.oracle = Some(oracle);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn short_answer_max_tokens(mut self, n: usize) -> Self {
        self.config.short_answer_max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn classify(mut self, v: bool) -> Self {
        self.config.classify = v;
        self
    }

    pub fn vat_fallback(mut self, v: bool) -> Self {
        self.config.vat_fallback = v;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ExtractionConfig, ExtractionError> {
        let c = &self.config;
        if c.max_tokens == 0 || c.short_answer_max_tokens == 0 {
            return Err(ExtractionError::InvalidConfig(
                "Token limits must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ExtractionError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.concurrency == 0 {
            return Err(ExtractionError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = ExtractionConfig::default();
        assert_eq!(c.temperature, 0.0);
        assert_eq!(c.api_timeout_secs, 60);
        assert!(c.classify);
        assert!(c.vat_fallback);
        assert_eq!(c.text_model(), DEFAULT_TEXT_MODEL);
        assert_eq!(c.vision_model(), DEFAULT_VISION_MODEL);
    }

    #[test]
    fn builder_clamps_and_overrides() {
        let c = ExtractionConfig::builder()
            .temperature(5.0)
            .concurrency(0)
            .vision_model("gpt-4.1")
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.vision_model(), "gpt-4.1");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ExtractionConfig::builder()
            .api_timeout_secs(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
