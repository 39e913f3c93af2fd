//! Typographic post-processing for assembled HTML.
//!
//! Runs over text nodes only: tag markup, comments and the contents of
//! `pre`, `code`, `kbd`, `script`, `style` and `textarea` are copied through
//! untouched. Quote direction is decided from the preceding character, which
//! carries across inline tags and resets at block boundaries.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use deckbuilder_shared::Result;

/// A pass that normalizes typography in a fully assembled HTML string.
pub trait Typesetter: Send + Sync {
    fn typeset(&self, html: &str) -> Result<String>;
}

/// Elements whose contents are never rewritten.
const RAW_ELEMENTS: &[&str] = &["pre", "code", "kbd", "script", "style", "textarea"];

/// Elements that start a new run of text for quote matching.
const BLOCK_ELEMENTS: &[&str] = &[
    "section", "div", "p", "br", "hr", "li", "ul", "ol", "blockquote", "h1", "h2", "h3", "h4",
    "h5", "h6", "table", "tr", "td", "th", "aside", "figure", "figcaption", "header", "footer",
];

static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->|<[^>]*>").expect("valid regex"));

static TAG_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<(/?)\s*([A-Za-z][A-Za-z0-9-]*)").expect("valid regex"));

/// Smart quotes, dashes and ellipses.
#[derive(Debug, Clone, Copy)]
pub struct Typeset {
    pub quotes: bool,
    pub dashes: bool,
    pub ellipses: bool,
}

impl Default for Typeset {
    fn default() -> Self {
        Self {
            quotes: true,
            dashes: true,
            ellipses: true,
        }
    }
}

impl Typesetter for Typeset {
    #[instrument(skip_all, fields(len = html.len()))]
    fn typeset(&self, html: &str) -> Result<String> {
        let mut out = String::with_capacity(html.len());
        let mut raw_depth = 0usize;
        let mut prev: Option<char> = None;
        let mut last = 0;

        for m in MARKUP_RE.find_iter(html) {
            let text = &html[last..m.start()];
            self.push_text(text, raw_depth > 0, &mut prev, &mut out);

            let tag = m.as_str();
            if let Some(caps) = TAG_NAME_RE.captures(tag) {
                let closing = !caps[1].is_empty();
                let name = caps[2].to_ascii_lowercase();
                if RAW_ELEMENTS.contains(&name.as_str()) && !tag.ends_with("/>") {
                    raw_depth = if closing {
                        raw_depth.saturating_sub(1)
                    } else {
                        raw_depth + 1
                    };
                }
                if BLOCK_ELEMENTS.contains(&name.as_str()) {
                    prev = None;
                }
            }
            out.push_str(tag);
            last = m.end();
        }
        self.push_text(&html[last..], raw_depth > 0, &mut prev, &mut out);

        debug!(out_len = out.len(), "typeset complete");
        Ok(out)
    }
}

impl Typeset {
    fn push_text(&self, text: &str, raw: bool, prev: &mut Option<char>, out: &mut String) {
        if text.is_empty() {
            return;
        }
        if raw {
            out.push_str(text);
            *prev = text.chars().last();
            return;
        }

        let mut text = text.to_string();
        if self.dashes {
            text = text.replace("---", "\u{2014}").replace("--", "\u{2013}");
        }
        if self.ellipses {
            text = text.replace("...", "\u{2026}");
        }
        if self.quotes {
            text = smart_quotes(&decode_quote_entities(&text), prev);
        } else if let Some(c) = text.chars().last() {
            *prev = Some(c);
        }
        out.push_str(&text);
    }
}

/// Markdown renderers escape straight quotes; treat the entities as quotes.
fn decode_quote_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
}

fn opens_after(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => {
            c.is_whitespace()
                || matches!(c, '(' | '[' | '{' | '\u{2014}' | '\u{2013}' | '-' | '\u{201C}' | '\u{2018}')
        }
    }
}

fn smart_quotes(text: &str, prev: &mut Option<char>) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        let next = chars.get(i + 1).copied();
        let replaced = match c {
            '"' => {
                if opens_after(*prev) {
                    '\u{201C}'
                } else {
                    '\u{201D}'
                }
            }
            '\'' => {
                let between_words = prev.is_some_and(char::is_alphanumeric)
                    && next.is_some_and(char::is_alphanumeric);
                if !between_words && opens_after(*prev) {
                    '\u{2018}'
                } else {
                    '\u{2019}'
                }
            }
            other => other,
        };
        out.push(replaced);
        *prev = Some(replaced);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typeset(html: &str) -> String {
        Typeset::default().typeset(html).unwrap()
    }

    #[test]
    fn curls_double_quotes() {
        assert_eq!(typeset(r#"<p>"Hello"</p>"#), "<p>\u{201C}Hello\u{201D}</p>");
    }

    #[test]
    fn apostrophes_and_single_quotes() {
        assert_eq!(typeset("<p>It's 'fine'</p>"), "<p>It\u{2019}s \u{2018}fine\u{2019}</p>");
    }

    #[test]
    fn dashes_and_ellipses() {
        assert_eq!(typeset("a -- b --- c..."), "a \u{2013} b \u{2014} c\u{2026}");
    }

    #[test]
    fn quote_entities_are_curled() {
        assert_eq!(
            typeset("<p>&quot;x&quot;</p>"),
            "<p>\u{201C}x\u{201D}</p>"
        );
    }

    #[test]
    fn attributes_are_untouched() {
        let html = r#"<section data-filename="1-intro" title="a -- b"><p>"q"</p></section>"#;
        let out = typeset(html);
        assert!(out.starts_with(r#"<section data-filename="1-intro" title="a -- b">"#));
        assert!(out.contains("\u{201C}q\u{201D}"));
    }

    #[test]
    fn code_is_untouched() {
        let html = r#"<pre><code>let s = "a--b";</code></pre><p>"x"</p>"#;
        let out = typeset(html);
        assert!(out.contains(r#"let s = "a--b";"#));
        assert!(out.contains("\u{201C}x\u{201D}"));
    }

    #[test]
    fn comments_are_untouched() {
        assert_eq!(typeset("<!-- a -- b -->"), "<!-- a -- b -->");
    }

    #[test]
    fn quotes_carry_across_inline_tags() {
        assert_eq!(
            typeset(r#"<p><em>"word</em>"</p>"#),
            "<p><em>\u{201C}word</em>\u{201D}</p>"
        );
    }

    #[test]
    fn block_boundaries_reset_quote_context() {
        assert_eq!(
            typeset(r#"<p>end</p><p>"start"</p>"#),
            "<p>end</p><p>\u{201C}start\u{201D}</p>"
        );
    }

    #[test]
    fn idempotent() {
        let once = typeset(r#"<p>"It's" -- fine...</p>"#);
        assert_eq!(typeset(&once), once);
    }
}
