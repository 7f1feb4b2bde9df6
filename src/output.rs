//! Result types produced by one drawing analysis.

use crate::error::ExtractionError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything shown to the user after one analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    /// The model reply exactly as received.
    pub raw_response: String,

    /// The reply after deterministic Markdown cleanup, for display.
    pub markdown: String,

    /// JSON object found in `raw_response`, if any.
    pub record: Option<Value>,

    /// Why `record` is absent. `None` whenever `record` is `Some`.
    pub extraction_error: Option<ExtractionError>,

    pub image: ImageSummary,

    pub stats: AnalysisStats,
}

impl Analysis {
    /// True if a structured record was extracted.
    pub fn has_record(&self) -> bool {
        self.record.is_some()
    }
}

/// What was sent to the model, minus the pixels.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageSummary {
    pub file_name: Option<String>,
    pub mime_type: String,
    pub size_bytes: usize,
}

/// Cost and latency of the model call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub model: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialises_record_and_nulls() {
        let a = Analysis {
            raw_response: "x".into(),
            markdown: "x\n".into(),
            record: Some(json!({"qty": 4})),
            extraction_error: None,
            image: ImageSummary {
                file_name: Some("part.jpg".into()),
                mime_type: "image/jpeg".into(),
                size_bytes: 10,
            },
            stats: AnalysisStats::default(),
        };
        assert!(a.has_record());
        let v = serde_json::to_value(&a).expect("serialise");
        assert_eq!(v["record"]["qty"], 4);
        assert!(v["extraction_error"].is_null());
        assert_eq!(v["image"]["mime_type"], "image/jpeg");
    }
}
