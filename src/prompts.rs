//! Instruction text sent alongside the drawing image.
//!
//! Callers can override the default via [`crate::config::AnalyzerConfig::prompt`];
//! the constant here is used only when no override is provided.

/// Default instruction for analysing a mechanical engineering drawing.
///
/// Asks for both a Markdown table (shown to the user) and JSON (picked up by
/// [`crate::pipeline::extract`]).
pub const DEFAULT_PROMPT: &str = "Please analyze the attached mechanical engineering drawing \
and extract key information in a table format (Markdown) and as JSON.";

/// Resolve the instruction text for a request.
pub fn instruction(custom: Option<&str>) -> &str {
    match custom {
        Some(p) if !p.trim().is_empty() => p,
        _ => DEFAULT_PROMPT,
    }
}
