//! Progress-callback trait for analysis events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalyzerConfigBuilder::progress_callback`] to be told when
//! the model call starts and ends. The CLI drives its spinner from these
//! events; a web host could forward them to a log or a socket.
//!
//! # Example
//!
//! ```rust
//! use edgequake_drawing2md::{AnalysisProgressCallback, AnalyzerConfig};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! impl AnalysisProgressCallback for Printer {
//!     fn on_request_complete(&self, response_len: usize) {
//!         eprintln!("model answered with {response_len} chars");
//!     }
//! }
//!
//! let config = AnalyzerConfig::builder()
//!     .progress_callback(Arc::new(Printer) as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by [`crate::analyze::Analyzer`] during one analysis.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called once the upload is accepted, before encoding.
    fn on_analysis_start(&self, image_bytes: usize, mime_type: &str) {
        let _ = (image_bytes, mime_type);
    }

    /// Called just before the model request is sent.
    fn on_request_start(&self, model: &str) {
        let _ = model;
    }

    /// Called when the model returns a reply.
    fn on_request_complete(&self, response_len: usize) {
        let _ = response_len;
    }

    /// Called when the model call fails; the analysis aborts afterwards.
    fn on_request_error(&self, error: &str) {
        let _ = error;
    }

    /// Called after JSON extraction with whether a record was found.
    fn on_extraction(&self, found_record: bool) {
        let _ = found_record;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalyzerConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
