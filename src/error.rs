//! Error types for the edgequake-drawing2md library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`AnalyzerError`] — **Fatal**: the analysis cannot produce a result at
//!   all (no image, provider not configured, the model call failed). Returned
//!   as `Err(AnalyzerError)` from [`crate::analyze::Analyzer::analyze`] and the
//!   other top-level entry points.
//!
//! * [`ExtractionError`] — **Non-fatal**: the model answered, but no JSON
//!   object could be pulled out of its reply. Stored inside
//!   [`crate::output::Analysis`] next to the raw text so the Markdown is still
//!   shown.

use edgequake_llm::LlmError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-drawing2md library.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// No image was supplied (missing upload or zero-byte file).
    #[error("No image was supplied; nothing to analyse")]
    NoImage,

    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned an error.
    #[error("LLM API error: {message}")]
    LlmApiError { message: String },

    /// VLM API returned an authentication error (401/403).
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    /// VLM API returned HTTP 429.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded { provider: String },

    /// VLM API call did not answer within `api_timeout_secs`.
    #[error("API call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AnalyzerError {
    /// Classify a typed provider error.
    ///
    /// Providers that only report free text (`ApiError`, `ProviderError`,
    /// `Unknown`) go through [`Self::from_provider_message`].
    pub fn from_llm_error(provider: &str, err: LlmError) -> Self {
        match err {
            LlmError::AuthError(detail) => AnalyzerError::AuthError {
                provider: provider.to_string(),
                detail,
            },
            LlmError::RateLimited(_) => AnalyzerError::RateLimitExceeded {
                provider: provider.to_string(),
            },
            LlmError::ConfigError(hint) => AnalyzerError::ProviderNotConfigured {
                provider: provider.to_string(),
                hint,
            },
            LlmError::ApiError(msg) | LlmError::ProviderError(msg) | LlmError::Unknown(msg) => {
                Self::from_provider_message(provider, msg)
            }
            other => AnalyzerError::LlmApiError {
                message: other.to_string(),
            },
        }
    }

    /// Sort a free-text provider message into auth, rate-limit or generic API
    /// failure.
    ///
    /// Status codes only count as whole tokens, so `401` inside `140192` does
    /// not match.
    pub fn from_provider_message(provider: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_lowercase();
        let has_status = |code: &str| {
            lower
                .split(|c: char| !c.is_ascii_alphanumeric())
                .any(|token| token == code)
        };

        if has_status("401")
            || has_status("403")
            || lower.contains("unauthorized")
            || lower.contains("invalid api key")
            || lower.contains("incorrect api key")
        {
            return AnalyzerError::AuthError {
                provider: provider.to_string(),
                detail: message,
            };
        }
        if has_status("429") || lower.contains("rate limit") {
            return AnalyzerError::RateLimitExceeded {
                provider: provider.to_string(),
            };
        }
        AnalyzerError::LlmApiError { message }
    }

    /// True when the failure came from the remote model call.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AnalyzerError::LlmApiError { .. }
                | AnalyzerError::AuthError { .. }
                | AnalyzerError::RateLimitExceeded { .. }
                | AnalyzerError::ApiTimeout { .. }
        )
    }
}

/// Why no structured record could be pulled out of a model reply.
///
/// Never fatal: the reply is still shown, only the JSON viewer is replaced by
/// a notice.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ExtractionError {
    /// The reply contains no `{`.
    #[error("response contains no '{{'")]
    MissingOpenBrace,

    /// The reply contains no `}`.
    #[error("response contains no '}}'")]
    MissingCloseBrace,

    /// The last `}` comes before the first `{`.
    #[error("last '}}' precedes the first '{{'")]
    BracesOutOfOrder,

    /// The brace-delimited span is not valid JSON.
    #[error("embedded text is not valid JSON: {detail}")]
    InvalidJson { detail: String },

    /// Balanced scanning found no complete object that parses.
    #[error("no complete JSON object found in response")]
    NoBalancedObject,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_image_display() {
        assert!(AnalyzerError::NoImage.to_string().contains("No image"));
    }

    #[test]
    fn provider_message_401_is_auth() {
        let e = AnalyzerError::from_provider_message("openai", "HTTP 401: Incorrect API key provided");
        match e {
            AnalyzerError::AuthError { provider, detail } => {
                assert_eq!(provider, "openai");
                assert!(detail.contains("401"));
            }
            other => panic!("expected AuthError, got {other:?}"),
        }
    }

    #[test]
    fn provider_message_429_is_rate_limit() {
        let e = AnalyzerError::from_provider_message("openai", "Rate limit reached for gpt-4o-mini");
        assert!(matches!(e, AnalyzerError::RateLimitExceeded { .. }));
        assert!(e.to_string().contains("openai"));
    }

    #[test]
    fn provider_message_other_is_api_error() {
        let e = AnalyzerError::from_provider_message("openai", "connection reset by peer");
        assert!(matches!(e, AnalyzerError::LlmApiError { .. }));
        assert!(e.is_upstream());
    }

    #[test]
    fn status_codes_match_whole_tokens_only() {
        let e = AnalyzerError::from_provider_message(
            "openai",
            "This model's maximum context length is 128000 tokens. However, you requested 140192 tokens.",
        );
        assert!(matches!(e, AnalyzerError::LlmApiError { .. }), "got {e:?}");

        let e = AnalyzerError::from_provider_message("openai", "request id 4290017 failed");
        assert!(matches!(e, AnalyzerError::LlmApiError { .. }), "got {e:?}");

        let e = AnalyzerError::from_provider_message("gemini", "status=403 PERMISSION_DENIED");
        assert!(matches!(e, AnalyzerError::AuthError { .. }));
    }

    #[test]
    fn typed_llm_errors_keep_their_class() {
        let e = AnalyzerError::from_llm_error("openai", LlmError::AuthError("bad key".into()));
        assert!(matches!(e, AnalyzerError::AuthError { ref detail, .. } if detail == "bad key"));

        let e = AnalyzerError::from_llm_error("openai", LlmError::RateLimited("slow down".into()));
        assert!(matches!(e, AnalyzerError::RateLimitExceeded { .. }));

        let e = AnalyzerError::from_llm_error(
            "openai",
            LlmError::TokenLimitExceeded {
                max: 128000,
                got: 140192,
            },
        );
        assert!(matches!(e, AnalyzerError::LlmApiError { .. }), "got {e:?}");

        let e = AnalyzerError::from_llm_error(
            "openai",
            LlmError::ApiError("maximum context length is 128000 tokens, you requested 140192".into()),
        );
        assert!(matches!(e, AnalyzerError::LlmApiError { .. }), "got {e:?}");
    }

    #[test]
    fn api_timeout_display() {
        let e = AnalyzerError::ApiTimeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
        assert!(e.is_upstream());
        assert!(!AnalyzerError::NoImage.is_upstream());
    }

    #[test]
    fn extraction_error_display_has_braces() {
        assert_eq!(
            ExtractionError::MissingOpenBrace.to_string(),
            "response contains no '{'"
        );
        assert_eq!(
            ExtractionError::BracesOutOfOrder.to_string(),
            "last '}' precedes the first '{'"
        );
    }

    #[test]
    fn extraction_error_serialises() {
        let e = ExtractionError::InvalidJson {
            detail: "trailing characters".into(),
        };
        let json = serde_json::to_string(&e).expect("serialise");
        assert!(json.contains("InvalidJson"));
    }
}
