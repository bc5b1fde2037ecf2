//! Text formatting for message bubbles
//!
//! Replies come from the server and are untrusted. Terminal front ends run
//! them through [`sanitize`]; HTML front ends use [`to_html`], which escapes
//! before applying the lightweight `**bold**` markup.
//!
//! The `guru` TUI uses `sanitize` and `parse_emphasis`. [`escape_html`] and
//! [`to_html`] serve embedders that show replies in a webview.

use regex::Regex;
use std::sync::LazyLock;

static BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern is valid"));

/// A run of text with uniform emphasis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub bold: bool,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: false,
        }
    }

    fn bold(text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: true,
        }
    }
}

/// Drop control characters (escape sequences, carriage returns) but keep
/// newlines and tabs
pub fn sanitize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect()
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Split one line into plain and bold segments. An unclosed `**` stays
/// literal.
pub fn parse_emphasis(line: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for caps in BOLD.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if whole.start() > last {
            segments.push(Segment::plain(&line[last..whole.start()]));
        }
        segments.push(Segment::bold(inner.as_str()));
        last = whole.end();
    }

    if last < line.len() {
        segments.push(Segment::plain(&line[last..]));
    }

    segments
}

/// Render message text as safe HTML: escaped, `**bold**` to `<b>`, newlines
/// to `<br>`
pub fn to_html(text: &str) -> String {
    sanitize(text)
        .split('\n')
        .map(|line| {
            parse_emphasis(line)
                .into_iter()
                .map(|segment| {
                    let escaped = escape_html(&segment.text);
                    if segment.bold {
                        format!("<b>{}</b>", escaped)
                    } else {
                        escaped
                    }
                })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_emphasis_mixed() {
        let segments = parse_emphasis("The **Robotics lab** is open");
        assert_eq!(
            segments,
            vec![
                Segment::plain("The "),
                Segment::bold("Robotics lab"),
                Segment::plain(" is open"),
            ]
        );
    }

    #[test]
    fn test_parse_emphasis_unclosed() {
        let segments = parse_emphasis("a **dangling marker");
        assert_eq!(segments, vec![Segment::plain("a **dangling marker")]);
    }

    #[test]
    fn test_parse_emphasis_empty_line() {
        assert!(parse_emphasis("").is_empty());
    }

    #[test]
    fn test_to_html_escapes_before_formatting() {
        let html = to_html("<script>alert(1)</script> **<i>x</i>**");
        assert_eq!(
            html,
            "&lt;script&gt;alert(1)&lt;/script&gt; <b>&lt;i&gt;x&lt;/i&gt;</b>"
        );
    }

    #[test]
    fn test_to_html_newlines() {
        assert_eq!(to_html("one\n**two**"), "one<br><b>two</b>");
    }

    #[test]
    fn test_sanitize_strips_escape_sequences() {
        assert_eq!(sanitize("ok\u{1b}[2Jwiped\r\nnext\tcol"), "ok[2Jwiped\nnext\tcol");
    }
}
