//! Content composer.
//!
//! Walks a directory tree of slide fragments and flattens it into nested
//! `<section>` markup:
//!
//! ```text
//! content/
//! ├── 1-title.md            <section data-filename="1-title">…</section>
//! ├── 2-basics/             <section data-filename="2-basics">
//! │   ├── 1-what.md           <section data-filename="1-what">…</section>
//! │   └── 2-why.md            <section data-filename="2-why">…</section>
//! │                         </section>
//! └── 10-outro.md           <section data-filename="10-outro">…</section>
//! ```
//!
//! Siblings are ordered by the first run of digits in their name, then by
//! name. Each directory is listed once; every entry is classified as a leaf
//! or a group up front. Symlinked files are followed, symlinked directories
//! are skipped.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use deckbuilder_markdown::{
    CmarkRenderer, MarkdownOptions, MarkdownRenderer, Typeset, Typesetter, frontmatter,
};
use deckbuilder_shared::{
    ComposeConfig, ContentNode, DeckBuilderError, DeckConfig, NodeKind, OutlineEntry, Result,
    UnnumberedPolicy,
};

/// Composer behavior switches.
#[derive(Debug, Clone, Default)]
pub struct ComposeOptions {
    /// Placement of names without digits.
    pub unnumbered: UnnumberedPolicy,
    /// Wrap the output in a section for the root directory itself.
    pub wrap_root: bool,
    /// Drop front matter keys that do not start with `data-`.
    pub data_attributes_only: bool,
}

impl From<&ComposeConfig> for ComposeOptions {
    fn from(config: &ComposeConfig) -> Self {
        Self {
            unnumbered: config.unnumbered,
            wrap_root: config.wrap_root,
            data_attributes_only: config.data_attributes_only,
        }
    }
}

/// Counts gathered during one composition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ComposeStats {
    pub leaves: usize,
    pub groups: usize,
}

/// Turns a content directory into section markup.
///
/// The Markdown renderer and the typographic pass are injected so each
/// build gets its own instances.
pub struct Composer {
    renderer: Box<dyn MarkdownRenderer>,
    typesetter: Box<dyn Typesetter>,
    options: ComposeOptions,
}

impl Composer {
    pub fn new(
        renderer: Box<dyn MarkdownRenderer>,
        typesetter: Box<dyn Typesetter>,
        options: ComposeOptions,
    ) -> Self {
        Self {
            renderer,
            typesetter,
            options,
        }
    }

    /// Build a composer with the stock renderer and typesetter.
    pub fn from_config(config: &DeckConfig) -> Self {
        Self::new(
            Box::new(CmarkRenderer::new(MarkdownOptions::from(&config.markdown))),
            Box::new(Typeset::default()),
            ComposeOptions::from(&config.compose),
        )
    }

    pub fn options(&self) -> &ComposeOptions {
        &self.options
    }

    /// Compose the tree under `root` into one markup string.
    ///
    /// The typographic pass runs once over the assembled string.
    pub fn compose(&self, root: &Path) -> Result<String> {
        self.compose_with_stats(root).map(|(html, _)| html)
    }

    /// Like [`compose`](Self::compose), also returning leaf and group counts.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn compose_with_stats(&self, root: &Path) -> Result<(String, ComposeStats)> {
        let mut stats = ComposeStats::default();
        let tree = self.compose_dir(root, &mut stats)?;

        let assembled = if self.options.wrap_root {
            render(&tree)
        } else {
            tree.body
        };
        let html = self.typesetter.typeset(&assembled)?;

        info!(
            leaves = stats.leaves,
            groups = stats.groups,
            len = html.len(),
            "composition complete"
        );
        Ok((html, stats))
    }

    /// Compose one directory into a group node whose body holds the
    /// rendered containers of its entries, in order.
    pub fn compose_directory(&self, dir: &Path) -> Result<ContentNode> {
        self.compose_dir(dir, &mut ComposeStats::default())
    }

    fn compose_dir(&self, dir: &Path, stats: &mut ComposeStats) -> Result<ContentNode> {
        let entries = list_entries(dir, self.options.unnumbered)?;
        let mut body = String::new();

        for entry in entries {
            let node = match entry.kind {
                NodeKind::Leaf => {
                    stats.leaves += 1;
                    self.parse_leaf(&entry.path)?
                }
                NodeKind::Group => {
                    stats.groups += 1;
                    self.compose_dir(&entry.path, stats)?
                }
            };
            body.push_str(&render(&node));
        }

        let name = entry_name(dir);
        Ok(ContentNode::group(&name, sort_key(&name), body))
    }

    /// Read one content file: split front matter, render the body.
    pub fn parse_leaf(&self, path: &Path) -> Result<ContentNode> {
        let raw = std::fs::read_to_string(path).map_err(|e| DeckBuilderError::io(path, e))?;

        let (mut metadata, body) = frontmatter::split(&raw).map_err(|e| with_path(e, path))?;
        if self.options.data_attributes_only {
            metadata.retain_keys(|k| k.starts_with("data-"));
        }

        let html = self.renderer.render(&body).map_err(|e| with_path(e, path))?;
        let name = stem(path);

        debug!(
            path = %path.display(),
            attrs = metadata.len(),
            len = html.len(),
            "composed leaf"
        );

        Ok(ContentNode::leaf(&name, sort_key(&name), metadata, html))
    }

    /// The ordered tree under `root`, without reading or rendering files.
    #[instrument(skip(self), fields(root = %root.display()))]
    pub fn outline(&self, root: &Path) -> Result<OutlineEntry> {
        let name = entry_name(root);
        Ok(OutlineEntry {
            sort_key: sort_key(&name),
            name,
            kind: NodeKind::Group,
            children: self.outline_children(root)?,
        })
    }

    fn outline_children(&self, dir: &Path) -> Result<Vec<OutlineEntry>> {
        list_entries(dir, self.options.unnumbered)?
            .into_iter()
            .map(|entry| {
                let children = match entry.kind {
                    NodeKind::Leaf => Vec::new(),
                    NodeKind::Group => self.outline_children(&entry.path)?,
                };
                Ok(OutlineEntry {
                    name: entry.name,
                    kind: entry.kind,
                    sort_key: entry.sort_key,
                    children,
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sort keys and listing
// ---------------------------------------------------------------------------

/// The first run of ASCII digits in `name`, as a base-10 integer.
///
/// Returns `None` when `name` has no digits. Runs too long for `u64`
/// saturate to `u64::MAX`.
pub fn sort_key(name: &str) -> Option<u64> {
    let start = name.find(|c: char| c.is_ascii_digit())?;
    let digits = &name[start..];
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    Some(digits[..end].parse().unwrap_or(u64::MAX))
}

/// One directory entry, classified once.
#[derive(Debug)]
struct Entry {
    name: String,
    path: PathBuf,
    kind: NodeKind,
    sort_key: Option<u64>,
}

/// List, classify and order the immediate entries of `dir`.
fn list_entries(dir: &Path, policy: UnnumberedPolicy) -> Result<Vec<Entry>> {
    let read = std::fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DeckBuilderError::not_found(dir),
        _ => DeckBuilderError::io(dir, e),
    })?;

    let mut entries = Vec::new();
    for item in read {
        let item = item.map_err(|e| DeckBuilderError::io(dir, e))?;
        let path = item.path();
        let file_name = item.file_name().to_string_lossy().into_owned();

        if file_name.starts_with('.') {
            debug!(path = %path.display(), "skipping hidden entry");
            continue;
        }

        let file_type = item.file_type().map_err(|e| DeckBuilderError::io(&path, e))?;
        let meta = std::fs::metadata(&path).map_err(|e| DeckBuilderError::io(&path, e))?;
        if file_type.is_symlink() && meta.is_dir() {
            warn!(path = %path.display(), "skipping symlinked directory");
            continue;
        }

        let (kind, name) = if meta.is_file() {
            (NodeKind::Leaf, stem(&path))
        } else if meta.is_dir() {
            (NodeKind::Group, file_name)
        } else {
            debug!(path = %path.display(), "skipping special file");
            continue;
        };

        let key = sort_key(&name);
        if key.is_none() && policy == UnnumberedPolicy::Error {
            return Err(DeckBuilderError::MalformedName { name });
        }

        entries.push(Entry {
            name,
            path,
            kind,
            sort_key: key,
        });
    }

    entries.sort_by(|a, b| compare_entries(a, b, policy));
    Ok(entries)
}

fn compare_entries(a: &Entry, b: &Entry, policy: UnnumberedPolicy) -> Ordering {
    let rank = |key: Option<u64>| match (key, policy) {
        (Some(n), _) => (1u8, n),
        (None, UnnumberedPolicy::First) => (0, 0),
        (None, _) => (2, 0),
    };
    rank(a.sort_key)
        .cmp(&rank(b.sort_key))
        .then_with(|| a.name.cmp(&b.name))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Wrap a node's body in a `<section>` carrying its name and metadata.
///
/// Metadata keys are emitted verbatim; values are attribute-escaped.
pub fn render(node: &ContentNode) -> String {
    let mut out = String::with_capacity(node.body.len() + 64);
    out.push_str("<section data-filename=\"");
    out.push_str(&escape_attr(&node.name));
    out.push('"');
    for (key, value) in node.metadata.iter() {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
    out.push('>');
    out.push_str(&node.body);
    out.push_str("</section>");
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// File name without its extension.
fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Point render errors at the file that produced them.
fn with_path(err: DeckBuilderError, path: &Path) -> DeckBuilderError {
    match err {
        DeckBuilderError::Render { message } => {
            DeckBuilderError::render(format!("{}: {message}", path.display()))
        }
        other => other,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
