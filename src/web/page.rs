//! HTML pages served by the web UI.
//!
//! Plain `format!` templates: three pages that share one layout do not
//! justify a template engine.

use crate::output::Analysis;
use crate::web::render::{escape_html, json_to_html, markdown_to_html};

/// Shown under the Markdown when no JSON could be pulled out of the reply.
pub const NO_JSON_NOTICE: &str = "JSON data could not be extracted from the response.";

const TITLE: &str = "Mechanical Drawing Analyzer";

const STYLE: &str = r#"
body { font-family: system-ui, sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; color: #222; }
h1 { font-size: 1.6rem; }
form { margin: 1.5rem 0; }
.preview { max-width: 100%; border: 1px solid #ddd; }
.caption { color: #666; font-size: 0.9rem; }
.markdown table { border-collapse: collapse; }
.markdown th, .markdown td { border: 1px solid #ccc; padding: 0.3rem 0.6rem; }
.json { background: #f6f8fa; padding: 1rem; overflow-x: auto; }
.notice { color: #8a6d3b; }
.error { color: #a94442; }
#loading { display: none; }
#loading.active { display: block; }
.spinner { display: inline-block; width: 1rem; height: 1rem; border: 2px solid #ccc; border-top-color: #333; border-radius: 50%; animation: spin 0.8s linear infinite; vertical-align: middle; }
@keyframes spin { to { transform: rotate(360deg); } }
"#;

fn layout(body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{TITLE}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n\
         <h1>{TITLE}</h1>\n{body}\n</body>\n</html>\n"
    )
}

fn form() -> &'static str {
    r#"<form method="post" action="/analyze" enctype="multipart/form-data"
      onsubmit="document.getElementById('loading').classList.add('active')">
  <label for="file">Upload an image of the mechanical drawing</label><br>
  <input type="file" id="file" name="file" accept=".jpg,.jpeg,.png,image/jpeg,image/png">
  <button type="submit">Analyze</button>
</form>
<p id="loading"><span class="spinner"></span> Extracting information...</p>"#
}

/// The landing page: upload form, optionally with a notice above it.
pub fn upload_page(notice: Option<&str>) -> String {
    let notice = notice
        .map(|n| format!("<p class=\"notice\">{}</p>\n", escape_html(n)))
        .unwrap_or_default();
    layout(&format!("{notice}{}", form()))
}

/// Image preview, rendered Markdown and the structured-data viewer.
///
/// `preview_uri` is a `data:` URI of the uploaded image.
pub fn results_page(analysis: &Analysis, preview_uri: &str) -> String {
    let caption = analysis
        .image
        .file_name
        .as_deref()
        .map(escape_html)
        .unwrap_or_else(|| "Uploaded Image".to_string());

    let structured = match &analysis.record {
        Some(record) => json_to_html(record),
        None => format!("<p class=\"notice\">{NO_JSON_NOTICE}</p>"),
    };

    let body = format!(
        "{form}\n\
         <figure>\n<img class=\"preview\" src=\"{src}\" alt=\"{caption}\">\n\
         <figcaption class=\"caption\">{caption}</figcaption>\n</figure>\n\
         <h3>Extracted Information (Markdown Table)</h3>\n\
         <div class=\"markdown\">\n{markdown}</div>\n\
         <h3>Structured Data</h3>\n{structured}\n\
         <p class=\"caption\">{model} · {input} tokens in / {output} tokens out · {ms} ms</p>",
        form = form(),
        src = escape_html(preview_uri),
        caption = caption,
        markdown = markdown_to_html(&analysis.markdown),
        structured = structured,
        model = escape_html(&analysis.stats.model),
        input = analysis.stats.input_tokens,
        output = analysis.stats.output_tokens,
        ms = analysis.stats.duration_ms,
    );
    layout(&body)
}

/// Generic failure page for an aborted analysis.
pub fn failure_page(message: &str) -> String {
    layout(&format!(
        "<p class=\"error\"><strong>Analysis failed.</strong></p>\n\
         <pre class=\"error\">{}</pre>\n{}",
        escape_html(message),
        form()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{AnalysisStats, ImageSummary};
    use serde_json::json;

    fn analysis(record: Option<serde_json::Value>) -> Analysis {
        Analysis {
            raw_response: "| A | B |\n| --- | --- |\n| 1 | 2 |".into(),
            markdown: "| A | B |\n| --- | --- |\n| 1 | 2 |\n".into(),
            record,
            extraction_error: None,
            image: ImageSummary {
                file_name: Some("shaft<1>.png".into()),
                mime_type: "image/png".into(),
                size_bytes: 3,
            },
            stats: AnalysisStats {
                model: "gpt-4o-mini".into(),
                input_tokens: 10,
                output_tokens: 5,
                duration_ms: 42,
            },
        }
    }

    #[test]
    fn upload_page_has_multipart_form_and_spinner() {
        let html = upload_page(None);
        assert!(html.contains("enctype=\"multipart/form-data\""));
        assert!(html.contains("name=\"file\""));
        assert!(html.contains("id=\"loading\""));
        assert!(!html.contains("class=\"notice\""));
    }

    #[test]
    fn upload_page_escapes_notice() {
        let html = upload_page(Some("<bad>"));
        assert!(html.contains("&lt;bad&gt;"));
    }

    #[test]
    fn results_page_with_record() {
        let html = results_page(&analysis(Some(json!({"qty": 4}))), "data:image/png;base64,AAAA");
        assert!(html.contains("src=\"data:image/png;base64,AAAA\""));
        assert!(html.contains("<table>"));
        assert!(html.contains("&quot;qty&quot;: 4"));
        assert!(html.contains("shaft&lt;1&gt;.png"));
        assert!(!html.contains(NO_JSON_NOTICE));
    }

    #[test]
    fn results_page_without_record_shows_notice() {
        let html = results_page(&analysis(None), "data:image/png;base64,AAAA");
        assert!(html.contains(NO_JSON_NOTICE));
        assert!(html.contains("<table>"));
    }

    #[test]
    fn failure_page_escapes_message() {
        let html = failure_page("LLM API error: <html>");
        assert!(html.contains("Analysis failed."));
        assert!(html.contains("&lt;html&gt;"));
    }
}
