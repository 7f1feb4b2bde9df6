//! Post-processing: deterministic cleanup of the reply before display.
//!
//! Only the copy shown as Markdown goes through here. JSON extraction always
//! reads the untouched reply, so none of these rules can change the record.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so the fence regex
//! sees the model's own text; table repair runs after blank-line collapsing so
//! it sees contiguous rows.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model reply.
///
/// Rules (applied in order):
/// 1. Strip an outer ```` ```markdown ```` fence wrapping the whole reply
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 2
/// 5. Insert the separator row a GFM table needs after its header
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 7. Ensure the text ends with exactly one newline
pub fn clean_markdown(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = fix_missing_table_separator(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer markdown fence ───────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        // A ```json fence in the middle would also match `(.*)`; only unwrap
        // when the captured body has no fence of its own.
        Some(caps) if !caps[1].contains("```") => caps[1].to_string(),
        _ => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").into_owned()
}

// ── Rule 5: Missing table separator ──────────────────────────────────────────

/// A header row directly followed by a data row gets a `| --- |` row between
/// them; pulldown-cmark renders the block as plain text otherwise.
fn fix_missing_table_separator(input: &str) -> String {
    let lines: Vec<&str> = input.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len() + 4);
    let mut prev_is_row = false;

    for (i, line) in lines.iter().enumerate() {
        out.push(line.to_string());

        let row = is_table_row(line);
        let starts_table = row && !prev_is_row && !is_separator_row(line);
        if starts_table {
            let next = lines.get(i + 1).copied().unwrap_or("");
            if is_table_row(next) && !is_separator_row(next) {
                let cols = line.trim().matches('|').count().saturating_sub(1).max(1);
                let sep: String = std::iter::once("|")
                    .chain(std::iter::repeat_n(" --- |", cols))
                    .collect();
                out.push(sep);
            }
        }
        prev_is_row = row;
    }

    out.join("\n")
}

fn is_table_row(line: &str) -> bool {
    let t = line.trim();
    t.len() > 2 && t.starts_with('|') && t.ends_with('|')
}

fn is_separator_row(line: &str) -> bool {
    let t = line.trim();
    t.starts_with('|')
        && t.contains('-')
        && t.chars().all(|c| matches!(c, '|' | '-' | ':' | ' '))
}

// ── Rule 6: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

// ── Rule 7: Ensure text ends with a single newline ───────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_outer_fence() {
        let input = "```markdown\n| A | B |\n| --- | --- |\n```";
        assert_eq!(strip_markdown_fences(input), "| A | B |\n| --- | --- |");
    }

    #[test]
    fn keeps_reply_with_inner_json_fence() {
        let input = "```\n| A |\n```\n\n```json\n{\"a\": 1}\n```";
        assert_eq!(strip_markdown_fences(input), input);
    }

    #[test]
    fn normalises_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn trims_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("  a   \nb  "), "  a\nb");
    }

    #[test]
    fn collapses_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
    }

    #[test]
    fn inserts_missing_separator_once() {
        let input = "| Part | Qty |\n| Bolt | 4 |\n| Nut | 4 |";
        let result = fix_missing_table_separator(input);
        let lines: Vec<&str> = result.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(is_separator_row(lines[1]));
        assert_eq!(lines.iter().filter(|l| is_separator_row(l)).count(), 1);
    }

    #[test]
    fn leaves_valid_table_alone() {
        let input = "| Part | Qty |\n|:---|---:|\n| Bolt | 4 |";
        assert_eq!(fix_missing_table_separator(input), input);
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(remove_invisible_chars("st\u{200B}eel\u{FEFF}"), "steel");
    }

    #[test]
    fn final_newline() {
        assert_eq!(ensure_final_newline("x"), "x\n");
        assert_eq!(ensure_final_newline("x\n\n"), "x\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn full_pipeline() {
        let input = "```markdown\r\n| Field | Value |   \r\n| Material | Steel |\r\n\r\n\r\n\r\n\r\nDone\r\n```";
        let result = clean_markdown(input);
        assert!(result.starts_with("| Field | Value |\n| --- | --- |\n| Material | Steel |"));
        assert!(!result.contains("\n\n\n\n"));
        assert!(result.ends_with("Done\n"));
    }
}
