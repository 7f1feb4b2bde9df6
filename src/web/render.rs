//! Turn an [`Analysis`](crate::output::Analysis) into HTML fragments.
//!
//! Model output is untrusted text. Markdown goes through pulldown-cmark with
//! raw HTML blocks demoted to text and link targets limited to safe schemes;
//! everything else is escaped.

use pulldown_cmark::{escape, html, CowStr, Event, Options, Parser, Tag};
use serde_json::Value;

/// Replacement target for links whose scheme is not allowed.
const BLOCKED_URL: &str = "#";

/// Render GitHub-flavoured Markdown (tables, strikethrough) to HTML.
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        Event::Start(Tag::Link(kind, dest, title)) => {
            Event::Start(Tag::Link(kind, safe_dest(dest, LINK_SCHEMES), title))
        }
        Event::Start(Tag::Image(kind, dest, title)) => {
            Event::Start(Tag::Image(kind, safe_dest(dest, IMAGE_SCHEMES), title))
        }
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Pretty-printed, escaped JSON for the structured-data viewer.
pub fn json_to_html(value: &Value) -> String {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    format!("<pre class=\"json\"><code>{}</code></pre>", escape_html(&pretty))
}

/// Escape `<`, `>`, `&` and `"` for text and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    // Writing into a String cannot fail.
    let _ = escape::escape_html(&mut out, s);
    out
}

const LINK_SCHEMES: &[&str] = &["http", "https", "mailto"];
const IMAGE_SCHEMES: &[&str] = &["http", "https"];

fn safe_dest<'a>(dest: CowStr<'a>, allowed: &[&str]) -> CowStr<'a> {
    if is_allowed_url(&dest, allowed) {
        dest
    } else {
        CowStr::Borrowed(BLOCKED_URL)
    }
}

/// Relative URLs and the listed schemes pass. Browsers drop ASCII whitespace
/// and control characters inside a scheme, so those are ignored here too.
fn is_allowed_url(url: &str, allowed: &[&str]) -> bool {
    let scheme_end = match url.find(|c: char| matches!(c, ':' | '/' | '?' | '#')) {
        Some(i) if url[i..].starts_with(':') => i,
        _ => return true,
    };
    let scheme: String = url[..scheme_end]
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect::<String>()
        .to_ascii_lowercase();
    allowed.contains(&scheme.as_str())
}
