//! Markdown rendering, front matter splitting, and typography.
//!
//! The content composer depends on these through the [`MarkdownRenderer`]
//! and [`Typesetter`] traits so tests can swap in fakes. The stock
//! implementations are [`CmarkRenderer`] (pulldown-cmark) and [`Typeset`].

mod autolink;
pub mod frontmatter;
mod typeset;

use pulldown_cmark::{Event, Options, Parser, TextMergeStream, html};
use tracing::{debug, instrument};

use deckbuilder_shared::{MarkdownConfig, Result};

pub use typeset::{Typeset, Typesetter};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Renders a Markdown body to an HTML fragment.
pub trait MarkdownRenderer: Send + Sync {
    fn render(&self, body: &str) -> Result<String>;
}

/// Switches for the Markdown renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkdownOptions {
    /// Pass raw HTML through. When off, HTML in the source is escaped.
    pub html: bool,
    /// Render single newlines inside paragraphs as `<br />`.
    pub breaks: bool,
    /// Autolink bare URLs and e-mail addresses.
    pub linkify: bool,
    /// Smart quotes, dashes and ellipses.
    pub typographer: bool,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self::from(&MarkdownConfig::default())
    }
}

impl From<&MarkdownConfig> for MarkdownOptions {
    fn from(config: &MarkdownConfig) -> Self {
        Self {
            html: config.html,
            breaks: config.breaks,
            linkify: config.linkify,
            typographer: config.typographer,
        }
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// CommonMark renderer with tables and strikethrough enabled.
#[derive(Debug, Clone, Default)]
pub struct CmarkRenderer {
    options: MarkdownOptions,
}

impl CmarkRenderer {
    pub fn new(options: MarkdownOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MarkdownOptions {
        self.options
    }

    fn parser_options(&self) -> Options {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        if self.options.typographer {
            options.insert(Options::ENABLE_SMART_PUNCTUATION);
        }
        options
    }
}

impl MarkdownRenderer for CmarkRenderer {
    #[instrument(skip_all, fields(len = body.len()))]
    fn render(&self, body: &str) -> Result<String> {
        let opts = self.options;
        let parser = Parser::new_ext(body, self.parser_options());

        let events = TextMergeStream::new(parser).map(|event| match event {
            Event::SoftBreak if opts.breaks => Event::HardBreak,
            Event::Html(raw) | Event::InlineHtml(raw) if !opts.html => Event::Text(raw),
            other => other,
        });

        let mut out = String::with_capacity(body.len() * 3 / 2);
        if opts.linkify {
            html::push_html(&mut out, autolink::linkify(events).into_iter());
        } else {
            html::push_html(&mut out, events);
        }

        debug!(out_len = out.len(), "markdown rendered");
        Ok(out)
    }
}
