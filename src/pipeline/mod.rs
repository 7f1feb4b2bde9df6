//! Pipeline stages for one drawing analysis.
//!
//! Each submodule implements exactly one step, so each is testable without
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ encode ──▶ llm ──▶ extract
//!                        │
//!                        └───▶ postprocess (display copy)
//! ```
//!
//! 1. [`input`]   — upload bytes, local path or URL → `ImageUpload`
//! 2. [`encode`]  — base64-wrap the bytes for the multimodal request body
//! 3. [`llm`]     — the single network call, bounded by a timeout
//! 4. [`extract`] — best-effort JSON object extraction from the reply
//! 5. [`postprocess`] — deterministic cleanup of the Markdown shown to the user

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
