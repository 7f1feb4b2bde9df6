//! Configuration types for drawing analysis.
//!
//! Model-call behaviour is controlled through [`AnalyzerConfig`], built via
//! its [`AnalyzerConfigBuilder`]. The web server has its own small
//! [`ServerConfig`] for socket and upload limits.

use crate::error::AnalyzerError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

/// Model used when neither the config nor the environment names one.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for a drawing analysis.
///
/// Built via [`AnalyzerConfig::builder()`] or using
/// [`AnalyzerConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_drawing2md::{AnalyzerConfig, ExtractionStrategy};
///
/// let config = AnalyzerConfig::builder()
///     .model("gpt-4o-mini")
///     .api_timeout_secs(90)
///     .extraction(ExtractionStrategy::OuterBraces)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalyzerConfig {
    /// LLM model identifier, e.g. "gpt-4o-mini", "claude-sonnet-4-20250514".
    /// If None, [`DEFAULT_MODEL`] is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is detected from the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Custom instruction sent with the image. If None, uses
    /// [`crate::prompts::DEFAULT_PROMPT`].
    pub prompt: Option<String>,

    /// Sampling temperature. None leaves the provider default in place.
    pub temperature: Option<f32>,

    /// Maximum tokens the model may generate. None leaves the provider default.
    pub max_tokens: Option<usize>,

    /// Image detail hint forwarded with the attachment. Default: [`ImageDetail::Auto`].
    pub image_detail: ImageDetail,

    /// How the JSON record is located in the reply. Default: [`ExtractionStrategy::OuterBraces`].
    pub extraction: ExtractionStrategy,

    /// Timeout for the model call in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Optional observer for analysis events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            prompt: None,
            temperature: None,
            max_tokens: None,
            image_detail: ImageDetail::default(),
            extraction: ExtractionStrategy::default(),
            api_timeout_secs: 120,
            download_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalyzerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("prompt", &self.prompt)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("image_detail", &self.image_detail)
            .field("extraction", &self.extraction)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl AnalyzerConfig {
    /// Create a new builder for `AnalyzerConfig`.
    pub fn builder() -> AnalyzerConfigBuilder {
        AnalyzerConfigBuilder {
            config: Self::default(),
        }
    }

    /// The model that will be requested.
    pub fn model_name(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }
}

/// Builder for [`AnalyzerConfig`].
#[derive(Debug)]
pub struct AnalyzerConfigBuilder {
    config: AnalyzerConfig,
}

impl AnalyzerConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
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

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = Some(t.clamp(0.0, 2.0));
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = Some(n);
        self
    }

    pub fn image_detail(mut self, detail: ImageDetail) -> Self {
        self.config.image_detail = detail;
        self
    }

    pub fn extraction(mut self, strategy: ExtractionStrategy) -> Self {
        self.config.extraction = strategy;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalyzerConfig, AnalyzerError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(AnalyzerError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if matches!(c.max_tokens, Some(0)) {
            return Err(AnalyzerError::InvalidConfig(
                "max_tokens must be ≥ 1 when set".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Resolution hint attached to the image for providers that support it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageDetail {
    /// Let the provider decide. No hint is sent. (default)
    #[default]
    Auto,
    /// Single low-resolution tile; cheapest.
    Low,
    /// Full tiling; small dimension text stays legible.
    High,
}

impl ImageDetail {
    /// The value forwarded to the provider, if any.
    pub fn as_hint(&self) -> Option<&'static str> {
        match self {
            ImageDetail::Auto => None,
            ImageDetail::Low => Some("low"),
            ImageDetail::High => Some("high"),
        }
    }
}

/// How the structured record is located inside the model's free-text reply.
///
/// | Strategy | Behaviour |
/// |----------|-----------|
/// | `OuterBraces` | First `{` to last `}`, parsed as one document (default) |
/// | `FirstBalancedObject` | First brace-balanced span that parses as JSON |
///
/// `OuterBraces` fails when the reply holds more than one object or has prose
/// braces around the object. That is accepted behaviour; switch to
/// `FirstBalancedObject` to pick the first complete object instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExtractionStrategy {
    #[default]
    OuterBraces,
    FirstBalancedObject,
}

// ── Server ───────────────────────────────────────────────────────────────

/// Socket and upload limits for the web UI.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on. Default: `127.0.0.1:3000`.
    pub bind: SocketAddr,

    /// Largest accepted request body in bytes. Default: 20 MiB.
    ///
    /// Hosted vision APIs cap inline images at about 20 MB, so larger uploads
    /// would fail upstream anyway.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_upload_bytes: 20 * 1024 * 1024,
        }
    }
}
