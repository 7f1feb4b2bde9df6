//! Analysis entry points.
//!
//! [`Analyzer`] is the process-wide context: the resolved model client plus
//! the configuration. Build it once at startup and share it (the web server
//! keeps it in an `Arc`); every analysis borrows it immutably, so there is no
//! global client and no shared mutable state between requests.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use crate::output::{Analysis, AnalysisStats, ImageSummary};
use crate::pipeline::llm::{self, ProviderClient, VisionClient, VisionRequest};
use crate::pipeline::input::{self, ImageUpload};
use crate::pipeline::{encode, extract, postprocess};
use crate::prompts;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Explicitly constructed analysis context.
#[derive(Clone)]
pub struct Analyzer {
    client: Arc<dyn VisionClient>,
    config: AnalyzerConfig,
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("client", &self.client.name())
            .field("config", &self.config)
            .finish()
    }
}

impl Analyzer {
    /// Resolve the provider named by `config` (or the environment) and wrap it.
    ///
    /// # Errors
    /// [`AnalyzerError::ProviderNotConfigured`] when no provider can be built,
    /// typically because no API key is set.
    pub fn from_config(config: AnalyzerConfig) -> Result<Self, AnalyzerError> {
        let (provider, label) = resolve_provider(&config)?;
        let client = ProviderClient::new(provider, label, &config);
        info!("Using provider '{}' with model '{}'", client.name(), client.model());
        Ok(Self {
            client: Arc::new(client),
            config,
        })
    }

    /// Use a caller-supplied client, e.g. a stub in tests or a provider with
    /// custom middleware.
    pub fn with_client(client: Arc<dyn VisionClient>, config: AnalyzerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Analyse one drawing.
    ///
    /// # Returns
    /// `Ok(Analysis)` whenever the model answered, whether or not a JSON
    /// record was found (check `analysis.record`).
    ///
    /// # Errors
    /// - [`AnalyzerError::NoImage`] for an empty upload; no request is sent.
    /// - Any model-call failure, unrecovered.
    pub async fn analyze(&self, upload: ImageUpload) -> Result<Analysis, AnalyzerError> {
        self.analyze_with_preview(upload)
            .await
            .map(|(analysis, _)| analysis)
    }

    /// Like [`Self::analyze`], and also return the `data:` URI that was sent
    /// to the model, for showing the image next to the result.
    pub async fn analyze_with_preview(
        &self,
        upload: ImageUpload,
    ) -> Result<(Analysis, String), AnalyzerError> {
        if upload.is_empty() {
            return Err(AnalyzerError::NoImage);
        }

        let start = Instant::now();
        let mime_type = encode::detect_mime_type(&upload.bytes, upload.content_type.as_deref());
        info!(
            "Analysing {} ({} bytes, {})",
            upload.file_name.as_deref().unwrap_or("<upload>"),
            upload.bytes.len(),
            mime_type
        );
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_analysis_start(upload.bytes.len(), mime_type);
        }

        let image = ImageSummary {
            file_name: upload.file_name.clone(),
            mime_type: mime_type.to_string(),
            size_bytes: upload.bytes.len(),
        };

        let request = VisionRequest {
            prompt: prompts::instruction(self.config.prompt.as_deref()).to_string(),
            image: encode::to_image_data(&upload, self.config.image_detail),
        };
        let preview = encode::data_uri(&request.image.mime_type, &request.image.data);
        // The raw bytes are not needed past this point.
        drop(upload);

        let model = self.client.model().to_string();
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_request_start(&model);
        }

        let reply = match llm::request_with_timeout(
            self.client.as_ref(),
            request,
            self.config.api_timeout_secs,
        )
        .await
        {
            Ok(reply) => reply,
            Err(e) => {
                if let Some(ref cb) = self.config.progress_callback {
                    cb.on_request_error(&e.to_string());
                }
                return Err(e);
            }
        };

        if let Some(ref cb) = self.config.progress_callback {
            cb.on_request_complete(reply.content.len());
        }

        let (record, extraction_error) =
            match extract::extract_with(&reply.content, self.config.extraction) {
                Ok(value) => (Some(value), None),
                Err(e) => {
                    warn!("No structured data in reply: {}", e);
                    (None, Some(e))
                }
            };
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_extraction(record.is_some());
        }

        let markdown = postprocess::clean_markdown(&reply.content);
        let stats = AnalysisStats {
            model,
            input_tokens: reply.input_tokens,
            output_tokens: reply.output_tokens,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        debug!(
            "Reply: {} chars, record: {}",
            reply.content.len(),
            record.is_some()
        );
        info!("Analysis complete in {}ms", stats.duration_ms);

        let analysis = Analysis {
            raw_response: reply.content,
            markdown,
            record,
            extraction_error,
            image,
            stats,
        };
        Ok((analysis, preview))
    }

    /// Analyse a local image file or an HTTP(S) URL.
    pub async fn analyze_input(&self, input_str: impl AsRef<str>) -> Result<Analysis, AnalyzerError> {
        let upload =
            input::resolve_input(input_str.as_ref(), self.config.download_timeout_secs).await?;
        self.analyze(upload).await
    }
}

/// Analyse raw bytes with a fresh [`Analyzer`] built from `config`.
pub async fn analyze_bytes(
    bytes: impl Into<Vec<u8>>,
    config: AnalyzerConfig,
) -> Result<Analysis, AnalyzerError> {
    Analyzer::from_config(config)?
        .analyze(ImageUpload::new(bytes))
        .await
}

/// Synchronous wrapper around [`Analyzer::analyze_input`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    input_str: impl AsRef<str>,
    config: AnalyzerConfig,
) -> Result<Analysis, AnalyzerError> {
    let analyzer = Analyzer::from_config(config)?;
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalyzerError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyzer.analyze_input(input_str))
}

// ── Internal helpers ─────────────────────────────────────────────────────

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, AnalyzerError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AnalyzerError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`).
/// 2. **Named provider** (`config.provider_name`) with the configured model.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **`OPENAI_API_KEY`** present → OpenAI with the configured model.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
///
/// Returns the provider and a label for logs.
fn resolve_provider(
    config: &AnalyzerConfig,
) -> Result<(Arc<dyn LLMProvider>, String), AnalyzerError> {
    if let Some(ref provider) = config.provider {
        return Ok((Arc::clone(provider), "custom".to_string()));
    }

    let model = config.model_name();

    if let Some(ref name) = config.provider_name {
        return Ok((create_vision_provider(name, model)?, name.clone()));
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return Ok((create_vision_provider(&prov, &env_model)?, prov));
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            return Ok((create_vision_provider("openai", model)?, "openai".to_string()));
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AnalyzerError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok((llm_provider, "auto".to_string()))
}
