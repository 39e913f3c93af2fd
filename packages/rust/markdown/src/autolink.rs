//! Bare URL and e-mail autolinking over a pulldown-cmark event stream.

use std::sync::LazyLock;

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use regex::Regex;
use url::Url;

static LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?:https?|ftp)://|www\.)[^\s<>]+|\b[\w.+-]+@[\w-]+(?:\.[\w-]+)+\b",
    )
    .expect("valid regex")
});

static ANCHOR_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^<a[\s>]").expect("valid regex"));

static ANCHOR_CLOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^</a\s*>").expect("valid regex"));

/// Wrap bare URLs in text events with autolinks.
///
/// Text inside existing links (Markdown or inline `<a>` tags), images and
/// code blocks is left alone.
/// Expects adjacent text events to be merged already.
pub(crate) fn linkify<'a>(events: impl Iterator<Item = Event<'a>>) -> Vec<Event<'a>> {
    let mut out = Vec::new();
    let mut opaque_depth = 0usize;

    for event in events {
        match event {
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => {
                opaque_depth += 1;
                out.push(event);
            }
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                opaque_depth = opaque_depth.saturating_sub(1);
                out.push(event);
            }
            Event::InlineHtml(ref raw) if ANCHOR_OPEN_RE.is_match(raw) => {
                opaque_depth += 1;
                out.push(event);
            }
            Event::InlineHtml(ref raw) if ANCHOR_CLOSE_RE.is_match(raw) => {
                opaque_depth = opaque_depth.saturating_sub(1);
                out.push(event);
            }
            Event::Text(text) if opaque_depth == 0 => split_links(text, &mut out),
            other => out.push(other),
        }
    }

    out
}

fn split_links<'a>(text: CowStr<'a>, out: &mut Vec<Event<'a>>) {
    let mut last = 0;

    for m in LINK_RE.find_iter(&text) {
        let candidate = trim_trailing(m.as_str());
        let Some(href) = href_for(candidate) else {
            continue;
        };

        let start = m.start();
        if start > last {
            out.push(Event::Text(CowStr::from(text[last..start].to_string())));
        }
        out.push(Event::Start(Tag::Link {
            link_type: LinkType::Autolink,
            dest_url: CowStr::from(href),
            title: CowStr::Borrowed(""),
            id: CowStr::Borrowed(""),
        }));
        out.push(Event::Text(CowStr::from(candidate.to_string())));
        out.push(Event::End(TagEnd::Link));
        last = start + candidate.len();
    }

    if last == 0 {
        out.push(Event::Text(text));
    } else if last < text.len() {
        out.push(Event::Text(CowStr::from(text[last..].to_string())));
    }
}

/// Drop trailing punctuation that belongs to the sentence, not the link.
fn trim_trailing(candidate: &str) -> &str {
    let mut s = candidate;
    loop {
        let Some(c) = s.chars().last() else {
            return s;
        };
        let strip = match c {
            '.' | ',' | ':' | ';' | '!' | '?' | '"' | '\'' | '’' | '”' => true,
            ')' => s.matches('(').count() < s.matches(')').count(),
            _ => false,
        };
        if !strip {
            return s;
        }
        s = &s[..s.len() - c.len_utf8()];
    }
}

/// Build the link target for a matched candidate, or `None` if it does not
/// hold up as a URL.
fn href_for(candidate: &str) -> Option<String> {
    let href = if candidate.contains("://") {
        candidate.to_string()
    } else if candidate.to_ascii_lowercase().starts_with("www.") {
        format!("http://{candidate}")
    } else if candidate.contains('@') {
        format!("mailto:{candidate}")
    } else {
        return None;
    };

    let url = Url::parse(&href).ok()?;
    if url.scheme() != "mailto" && url.host_str().is_none_or(|h| !h.contains('.')) {
        return None;
    }
    Some(href)
}
