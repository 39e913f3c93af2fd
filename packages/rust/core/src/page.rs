//! Host page templating.
//!
//! The template is plain HTML with `{{placeholder}}` tokens. Substitution is
//! literal text replacement. Deck fields and asset names are replaced in the
//! template text only, so slide content is never rewritten by them. The
//! slides are spliced in afterwards, and list fragments are marked last.

use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use tracing::{debug, warn};

use deckbuilder_shared::{BuildMode, DeckBuilderError, DeckMeta, Result};

/// Placeholder replaced by the composed slides.
pub const SLIDES_PLACEHOLDER: &str = "{{slides}}";

static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{\{title\}\}").expect("valid regex"));

static DESCRIPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\{\{description\}\}").expect("valid regex"));

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<li>").expect("valid regex"));

/// Options for [`render_page`].
#[derive(Debug, Clone, Copy)]
pub struct PageOptions {
    /// Mark every bare `<li>` as a reveal fragment.
    pub fragment_lists: bool,
    /// Production builds reference minified assets.
    pub mode: BuildMode,
}

/// Substitute composed slides and deck fields into the host template.
///
/// Fails if the template has no `{{slides}}` placeholder.
pub fn render_page(
    template: &str,
    slides: &str,
    meta: &DeckMeta,
    opts: &PageOptions,
) -> Result<String> {
    let Some((head, tail)) = template.split_once(SLIDES_PLACEHOLDER) else {
        return Err(DeckBuilderError::template(format!(
            "template has no {SLIDES_PLACEHOLDER} placeholder"
        )));
    };
    let mut parts = [head.to_string(), tail.to_string()];

    for part in &mut parts {
        *part = TITLE_RE
            .replace_all(part.as_str(), NoExpand(meta.title.as_str()))
            .into_owned();
        *part = DESCRIPTION_RE
            .replace_all(part.as_str(), NoExpand(meta.description.as_str()))
            .into_owned();
    }

    for (token, value) in [
        ("{{colophonImage}}", &meta.colophon_image),
        ("{{colophonAlt}}", &meta.colophon_alt),
        ("{{colophonURL}}", &meta.colophon_url),
        ("{{colophonShortURL}}", &meta.colophon_short_url),
    ] {
        if !replace_first(&mut parts, token, value) {
            debug!(token, "placeholder not present in template");
        }
    }

    if opts.mode.is_production() {
        for (asset, minified) in [("style.css", "style.min.css"), ("index.js", "index.min.js")] {
            if !replace_first(&mut parts, asset, minified) {
                warn!(asset, "production build: asset reference not found in template");
            }
        }
    }

    let [head, tail] = parts;
    let mut page = String::with_capacity(head.len() + slides.len() + tail.len());
    page.push_str(&head);
    page.push_str(slides);
    page.push_str(&tail);

    if opts.fragment_lists {
        page = LIST_ITEM_RE
            .replace_all(&page, NoExpand(r#"<li class="fragment">"#))
            .into_owned();
    }

    Ok(page)
}

/// Replace the first occurrence of `token` across `parts`, in order.
fn replace_first(parts: &mut [String], token: &str, value: &str) -> bool {
    for part in parts.iter_mut() {
        if part.contains(token) {
            *part = part.replacen(token, value, 1);
            return true;
        }
    }
    false
}
