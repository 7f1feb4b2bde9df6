//! VLM interaction: send the instruction and the drawing in one user turn.
//!
//! [`VisionClient`] is the seam between the analysis flow and the network.
//! Production code uses [`ProviderClient`], which forwards to an
//! `edgequake_llm` provider; tests and embedders can supply their own.
//!
//! There is no retry loop. A failed call is reported once and the
//! interaction ends; the only guard is the per-call timeout.

use crate::config::AnalyzerConfig;
use crate::error::AnalyzerError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// One request: instruction text plus a single image.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    pub prompt: String,
    pub image: ImageData,
}

/// The model's answer to a [`VisionRequest`].
#[derive(Debug, Clone, Default)]
pub struct VisionReply {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// Anything that can answer a vision request.
#[async_trait]
pub trait VisionClient: Send + Sync {
    /// Short label used in logs and error messages.
    fn name(&self) -> &str;

    /// Model that answers, as reported in `AnalysisStats`.
    fn model(&self) -> &str;

    /// Send the request and wait for the full reply.
    async fn complete(&self, request: VisionRequest) -> Result<VisionReply, AnalyzerError>;
}

/// [`VisionClient`] backed by an `edgequake_llm` provider.
pub struct ProviderClient {
    provider: Arc<dyn LLMProvider>,
    label: String,
    model: String,
    options: CompletionOptions,
}

impl ProviderClient {
    pub fn new(provider: Arc<dyn LLMProvider>, label: impl Into<String>, config: &AnalyzerConfig) -> Self {
        // The provider knows which model it was built for; the configured
        // name may have been overridden during resolution.
        let model = provider.model().to_string();
        Self {
            provider,
            label: label.into(),
            model,
            options: build_options(config),
        }
    }
}

#[async_trait]
impl VisionClient for ProviderClient {
    fn name(&self) -> &str {
        &self.label
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: VisionRequest) -> Result<VisionReply, AnalyzerError> {
        let start = Instant::now();
        let messages = vec![ChatMessage::user_with_images(
            request.prompt.as_str(),
            vec![request.image],
        )];

        match self.provider.chat(&messages, Some(&self.options)).await {
            Ok(response) => {
                debug!(
                    "{}: {} input tokens, {} output tokens, {:?}",
                    self.label,
                    response.prompt_tokens,
                    response.completion_tokens,
                    start.elapsed()
                );
                Ok(VisionReply {
                    content: response.content,
                    input_tokens: response.prompt_tokens,
                    output_tokens: response.completion_tokens,
                })
            }
            Err(e) => {
                warn!("{}: request failed: {}", self.label, e);
                Err(AnalyzerError::from_llm_error(&self.label, e))
            }
        }
    }
}

/// Run one request against `client`, bounded by `api_timeout_secs`.
pub async fn request_with_timeout(
    client: &dyn VisionClient,
    request: VisionRequest,
    api_timeout_secs: u64,
) -> Result<VisionReply, AnalyzerError> {
    match tokio::time::timeout(Duration::from_secs(api_timeout_secs), client.complete(request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{}: no reply after {}s", client.name(), api_timeout_secs);
            Err(AnalyzerError::ApiTimeout {
                secs: api_timeout_secs,
            })
        }
    }
}

/// Build `CompletionOptions` from the analyzer config.
fn build_options(config: &AnalyzerConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: config.temperature,
        max_tokens: config.max_tokens,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowClient;

    #[async_trait]
    impl VisionClient for SlowClient {
        fn name(&self) -> &str {
            "slow"
        }

        fn model(&self) -> &str {
            "slow-model"
        }

        async fn complete(&self, _request: VisionRequest) -> Result<VisionReply, AnalyzerError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(VisionReply::default())
        }
    }

    struct EchoClient;

    #[async_trait]
    impl VisionClient for EchoClient {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-model"
        }

        async fn complete(&self, request: VisionRequest) -> Result<VisionReply, AnalyzerError> {
            Ok(VisionReply {
                content: request.prompt,
                input_tokens: 1,
                output_tokens: 1,
            })
        }
    }

    fn request() -> VisionRequest {
        VisionRequest {
            prompt: "describe".into(),
            image: ImageData::new("AAAA".to_string(), "image/png"),
        }
    }

    #[test]
    fn build_options_defaults_leave_provider_defaults() {
        let opts = build_options(&AnalyzerConfig::default());
        assert_eq!(opts.temperature, None);
        assert_eq!(opts.max_tokens, None);
    }

    #[test]
    fn build_options_forwards_overrides() {
        let config = AnalyzerConfig::builder()
            .temperature(0.2)
            .max_tokens(2048)
            .build()
            .unwrap();
        let opts = build_options(&config);
        assert_eq!(opts.temperature, Some(0.2));
        assert_eq!(opts.max_tokens, Some(2048));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_api_timeout() {
        let err = request_with_timeout(&SlowClient, request(), 1).await.unwrap_err();
        assert!(matches!(err, AnalyzerError::ApiTimeout { secs: 1 }));
    }

    #[tokio::test]
    async fn provider_client_reports_provider_model() {
        let mock = edgequake_llm::MockProvider::new();
        mock.add_response(r#"{"qty": 4}"#).await;
        let client = ProviderClient::new(Arc::new(mock), "mock", &AnalyzerConfig::default());

        assert_eq!(client.model(), "mock-model");
        let reply = request_with_timeout(&client, request(), 5).await.unwrap();
        assert_eq!(reply.content, r#"{"qty": 4}"#);
    }

    #[tokio::test]
    async fn reply_passes_through() {
        let reply = request_with_timeout(&EchoClient, request(), 5).await.unwrap();
        assert_eq!(reply.content, "describe");
    }
}
