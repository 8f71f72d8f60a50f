//! Fenced code block extraction from AI replies.
//!
//! This is a heuristic scanner, not a markdown parser. Fences are matched
//! non-greedily, so a block whose body contains a literal triple backtick
//! ends at that marker. That limitation is part of the contract.

use regex::Regex;
use std::sync::LazyLock;

/// ```` ```lang\n...``` ```` with an optional bare language tag glued to the
/// opening fence. Content is the shortest span up to the next fence.
static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(\w+)?\n(.*?)```").expect("fence regex"));

/// `filename: <token>` or `file: <token>` inside a block's leading lines.
static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:filename|file):\s*(\S+)").expect("filename regex"));

/// How many leading lines of a block are searched for a filename label.
const HINT_WINDOW: usize = 5;

/// One fenced block lifted out of a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSegment {
    /// Lowercased fence tag, or `"text"` when the fence had none.
    pub language: String,
    /// Block body with surrounding whitespace trimmed.
    pub content: String,
    /// Filename declared in the block's leading lines, if any.
    pub filename_hint: Option<String>,
}

/// Extract every fenced code block from `text`, in source order.
///
/// Total over any input: malformed fences simply yield fewer segments,
/// and text without fences yields an empty vec. Callers treat the empty
/// vec as "nothing to save".
pub fn extract(text: &str) -> Vec<CodeSegment> {
    FENCE_RE
        .captures_iter(text)
        .map(|caps| {
            let language = caps
                .get(1)
                .map(|m| m.as_str().to_lowercase())
                .unwrap_or_else(|| "text".to_string());
            let raw = &caps[2];
            let filename_hint = filename_hint(raw);
            let content = raw.trim().to_string();
            CodeSegment {
                language,
                content,
                filename_hint,
            }
        })
        .collect()
}

/// Look for a `filename:`/`file:` label in the first lines of a block.
///
/// The label may sit inside a comment in any language, so the match is a
/// substring check rather than anything syntax-aware.
fn filename_hint(content: &str) -> Option<String> {
    content.lines().take(HINT_WINDOW).find_map(|line| {
        let lower = line.to_lowercase();
        if lower.contains("filename:") || lower.contains("file:") {
            FILENAME_RE.captures(line).map(|caps| caps[1].to_string())
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fences_yields_nothing() {
        assert!(extract("just a plain answer, no code here").is_empty());
        assert!(extract("").is_empty());
    }

    #[test]
    fn test_single_block_with_language() {
        let segments = extract("Here you go:\n```python\nprint('hi')\n```\nDone.");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].language, "python");
        assert_eq!(segments[0].content, "print('hi')");
        assert!(segments[0].filename_hint.is_none());
    }

    #[test]
    fn test_language_tag_is_lowercased() {
        let segments = extract("```Python\nx = 1\n```");
        assert_eq!(segments[0].language, "python");
    }

    #[test]
    fn test_missing_language_defaults_to_text() {
        let segments = extract("```\nsome snippet\n```");
        assert_eq!(segments[0].language, "text");
    }

    #[test]
    fn test_multiple_blocks_keep_source_order() {
        let text = "```rust\nfn a() {}\n```\nand then\n```go\nfunc b() {}\n```";
        let segments = extract(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].language, "rust");
        assert_eq!(segments[1].language, "go");
    }

    #[test]
    fn test_filename_hint_from_comment() {
        let segments = extract("```python\n# Filename: util.py\ndef f():\n    pass\n```");
        assert_eq!(segments[0].filename_hint.as_deref(), Some("util.py"));
    }

    #[test]
    fn test_file_label_also_matches() {
        let segments = extract("```javascript\n// file: app.js\nconsole.log(1)\n```");
        assert_eq!(segments[0].filename_hint.as_deref(), Some("app.js"));
    }

    #[test]
    fn test_hint_outside_window_is_ignored() {
        let body = "a\nb\nc\nd\ne\n# filename: late.py\nf";
        let segments = extract(&format!("```python\n{}\n```", body));
        assert!(segments[0].filename_hint.is_none());
    }

    #[test]
    fn test_content_is_trimmed() {
        let segments = extract("```rust\n\nfn main() {}\n\n```");
        assert_eq!(segments[0].content, "fn main() {}");
    }

    #[test]
    fn test_nongreedy_match_stops_at_first_closing_fence() {
        // A body containing a fence marker ends the block there. Accepted
        // limitation of the shortest-match scan.
        let segments = extract("```text\nbefore\n```\nafter\n```");
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].content, "before");
    }

    #[test]
    fn test_unclosed_fence_yields_nothing() {
        assert!(extract("```python\nprint('never closed')").is_empty());
    }
}
