//! The document-understanding oracle: the only place the pipeline talks to a
//! model.
//!
//! [`DocumentOracle`] has exactly two call shapes. Structured-output mode takes
//! document text and answers with JSON shaped like
//! [`crate::document::FullDocumentStructure`]; vision mode takes zero or more
//! images plus an instruction and answers with free text. The pipeline never
//! trusts either answer: every response is parsed and validated by the stage
//! that asked for it.
//!
//! [`LlmOracle`] implements the trait on top of any `edgequake_llm` provider.
//! Tests and alternative backends implement it directly and inject it through
//! [`crate::config::ExtractionConfig::oracle`].

use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, OracleError};
use crate::prompts::{extraction_user_message, EXTRACTION_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// An opaque model capable of reading documents.
#[async_trait]
pub trait DocumentOracle: Send + Sync {
    /// Structured-output mode: return the JSON document structure for `document_text`.
    async fn structured(&self, document_text: &str) -> Result<String, OracleError>;

    /// Vision mode: answer `instruction` about `images` (which may be empty).
    async fn vision(&self, images: Vec<ImageData>, instruction: &str) -> Result<String, OracleError>;
}

/// [`DocumentOracle`] backed by `edgequake_llm` chat providers.
pub struct LlmOracle {
    text: Arc<dyn LLMProvider>,
    vision: Arc<dyn LLMProvider>,
    temperature: f32,
    max_tokens: usize,
    short_answer_max_tokens: usize,
}

impl LlmOracle {
    /// Use `text` for structured extraction and text-only questions, `vision`
    /// for anything with images attached.
    pub fn new(text: Arc<dyn LLMProvider>, vision: Arc<dyn LLMProvider>, config: &ExtractionConfig) -> Self {
        Self {
            text,
            vision,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            short_answer_max_tokens: config.short_answer_max_tokens,
        }
    }

    fn options(&self, max_tokens: usize) -> CompletionOptions {
        CompletionOptions {
            temperature: Some(self.temperature),
            max_tokens: Some(max_tokens),
            ..Default::default()
        }
    }

    async fn chat(
        provider: &Arc<dyn LLMProvider>,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, OracleError> {
        let response = provider
            .chat(messages, Some(options))
            .await
            .map_err(|e| OracleError::Provider(e.to_string()))?;
        debug!(
            "Oracle answered: {} input tokens, {} output tokens",
            response.prompt_tokens, response.completion_tokens
        );
        if response.content.trim().is_empty() {
            return Err(OracleError::EmptyResponse);
        }
        Ok(response.content)
    }
}

#[async_trait]
impl DocumentOracle for LlmOracle {
    async fn structured(&self, document_text: &str) -> Result<String, OracleError> {
        let messages = vec![
            ChatMessage::system(EXTRACTION_SYSTEM_PROMPT),
            ChatMessage::user(&extraction_user_message(document_text)),
        ];
        Self::chat(&self.text, &messages, &self.options(self.max_tokens)).await
    }

    async fn vision(&self, images: Vec<ImageData>, instruction: &str) -> Result<String, OracleError> {
        let options = self.options(self.short_answer_max_tokens);
        if images.is_empty() {
            let messages = vec![ChatMessage::user(instruction)];
            return Self::chat(&self.text, &messages, &options).await;
        }
        let messages = vec![ChatMessage::user_with_images(instruction, images)];
        Self::chat(&self.vision, &messages, &options).await
    }
}

/// One document's view of the oracle: applies the per-call timeout and counts
/// round trips.
pub struct OracleSession<'a> {
    oracle: &'a dyn DocumentOracle,
    timeout: Duration,
    calls: AtomicUsize,
}

impl<'a> OracleSession<'a> {
    pub fn new(oracle: &'a dyn DocumentOracle, timeout_secs: u64) -> Self {
        Self {
            oracle,
            timeout: Duration::from_secs(timeout_secs),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of oracle calls issued through this session so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    pub async fn structured(&self, document_text: &str) -> Result<String, OracleError> {
        self.timed(self.oracle.structured(document_text)).await
    }

    pub async fn vision(&self, images: Vec<ImageData>, instruction: &str) -> Result<String, OracleError> {
        self.timed(self.oracle.vision(images, instruction)).await
    }

    async fn timed<F>(&self, call: F) -> Result<String, OracleError>
    where
        F: Future<Output = Result<String, OracleError>>,
    {
        self.calls.fetch_add(1, Ordering::Relaxed);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, ExtractionError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        ExtractionError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the oracle, from most-specific to least-specific:
///
/// 1. **Pre-built oracle** (`config.oracle`), used as-is.
/// 2. **Pre-built provider** (`config.provider`), used for text and vision.
/// 3. **Named provider** (`config.provider_name`) with the text and vision
///    models from the config.
/// 4. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`);
///    the model applies to both call shapes.
/// 5. **OpenAI** when `OPENAI_API_KEY` is set.
/// 6. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_oracle(config: &ExtractionConfig) -> Result<Arc<dyn DocumentOracle>, ExtractionError> {
    if let Some(ref oracle) = config.oracle {
        return Ok(Arc::clone(oracle));
    }

    let (text, vision) = resolve_providers(config)?;
    Ok(Arc::new(LlmOracle::new(text, vision, config)))
}

type ProviderPair = (Arc<dyn LLMProvider>, Arc<dyn LLMProvider>);

fn resolve_providers(config: &ExtractionConfig) -> Result<ProviderPair, ExtractionError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), Arc::clone(provider)));
    }

    if let Some(ref name) = config.provider_name {
        return Ok((
            create_provider(name, config.text_model())?,
            create_provider(name, config.vision_model())?,
        ));
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            let provider = create_provider(&prov, &model)?;
            return Ok((Arc::clone(&provider), provider));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return Ok((
                create_provider("openai", config.text_model())?,
                create_provider("openai", config.vision_model())?,
            ));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| ExtractionError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((Arc::clone(&llm_provider), llm_provider))
}
