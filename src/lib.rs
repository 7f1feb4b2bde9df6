//! # edgequake-drawing2md
//!
//! Describe mechanical engineering drawings with Vision Language Models.
//!
//! Upload a JPEG or PNG of a drawing; the image is sent to a VLM together with
//! an instruction asking for the key information as a Markdown table and as
//! JSON. The reply is shown as rendered Markdown, and the JSON object embedded
//! in it, when one can be found, is parsed into structured data.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image bytes
//!  │
//!  ├─ 1. Input    browser upload, local file or URL
//!  ├─ 2. Encode   bytes → base64 data URI
//!  ├─ 3. VLM      one call to gpt-4o-mini / claude / gemini / …
//!  ├─ 4. Extract  first '{' … last '}' → serde_json::Value (best effort)
//!  └─ 5. Render   Markdown + structured-data viewer
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_drawing2md::{Analyzer, AnalyzerConfig, ImageUpload};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / GEMINI_API_KEY
//!     let analyzer = Analyzer::from_config(AnalyzerConfig::default())?;
//!     let bytes = std::fs::read("bracket.jpg")?;
//!     let analysis = analyzer.analyze(ImageUpload::new(bytes)).await?;
//!     println!("{}", analysis.markdown);
//!     if let Some(record) = analysis.record {
//!         println!("{record:#}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `web`   | on      | axum server with the upload form and JSON API |
//! | `cli`   | on      | Enables the `drawing2md` binary (clap + anyhow + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
#[cfg(feature = "web")]
pub mod web;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze_bytes, analyze_sync, Analyzer};
pub use config::{AnalyzerConfig, AnalyzerConfigBuilder, ExtractionStrategy, ImageDetail, ServerConfig};
pub use error::{AnalyzerError, ExtractionError};
pub use output::{Analysis, AnalysisStats, ImageSummary};
pub use pipeline::encode::encode_image;
pub use pipeline::extract::{extract_record, extract_with};
pub use pipeline::input::ImageUpload;
pub use pipeline::llm::{VisionClient, VisionReply, VisionRequest};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback};
