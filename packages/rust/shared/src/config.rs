//! Project configuration for deckbuilder.
//!
//! The config lives at `<project>/deck.toml`. Every field has a default, so a
//! project without a config file builds with the stock layout. Relative paths
//! resolve against the directory the config was loaded from.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DeckBuilderError, Result};
use crate::types::BuildMode;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "deck.toml";

// ---------------------------------------------------------------------------
// Config structs (matching deck.toml schema)
// ---------------------------------------------------------------------------

/// Top-level project config, deserialized from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckConfig {
    /// Values substituted into the page template.
    #[serde(default)]
    pub deck: DeckMeta,

    /// Source and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Markdown renderer switches.
    #[serde(default)]
    pub markdown: MarkdownConfig,

    /// Content composer behavior.
    #[serde(default)]
    pub compose: ComposeConfig,

    /// Directory relative paths resolve against. Set by the loader.
    #[serde(skip)]
    pub root: PathBuf,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            deck: DeckMeta::default(),
            paths: PathsConfig::default(),
            markdown: MarkdownConfig::default(),
            compose: ComposeConfig::default(),
            root: PathBuf::from("."),
        }
    }
}

/// `[deck]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeckMeta {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_description")]
    pub description: String,
    #[serde(default)]
    pub colophon_image: String,
    #[serde(default)]
    pub colophon_alt: String,
    #[serde(default)]
    pub colophon_url: String,
    #[serde(default)]
    pub colophon_short_url: String,
}

impl Default for DeckMeta {
    fn default() -> Self {
        Self {
            title: default_title(),
            description: default_description(),
            colophon_image: String::new(),
            colophon_alt: String::new(),
            colophon_url: String::new(),
            colophon_short_url: String::new(),
        }
    }
}

fn default_title() -> String {
    "A Reveal.js Slide Deck".into()
}
fn default_description() -> String {
    "Slides made with Reveal.js".into()
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Root of all watched sources.
    #[serde(default = "default_src_dir")]
    pub src_dir: String,

    /// Root of the slide content tree.
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Host HTML template containing the `{{slides}}` placeholder.
    #[serde(default = "default_template")]
    pub template: String,

    /// Production output directory.
    #[serde(default = "default_dist_dir")]
    pub dist_dir: String,

    /// Development output directory.
    #[serde(default = "default_dev_dir")]
    pub dev_dir: String,

    /// Directories copied verbatim into the build directory.
    #[serde(default = "default_passthrough")]
    pub passthrough: Vec<PassthroughDir>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            src_dir: default_src_dir(),
            content_dir: default_content_dir(),
            template: default_template(),
            dist_dir: default_dist_dir(),
            dev_dir: default_dev_dir(),
            passthrough: default_passthrough(),
        }
    }
}

fn default_src_dir() -> String {
    "src".into()
}
fn default_content_dir() -> String {
    "src/content".into()
}
fn default_template() -> String {
    "index.html".into()
}
fn default_dist_dir() -> String {
    "docs".into()
}
fn default_dev_dir() -> String {
    "dev".into()
}
fn default_passthrough() -> Vec<PassthroughDir> {
    vec![
        PassthroughDir {
            from: "src/fonts".into(),
            to: "fonts".into(),
        },
        PassthroughDir {
            from: "src/images".into(),
            to: "images".into(),
        },
    ]
}

/// `[[paths.passthrough]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassthroughDir {
    /// Source directory, relative to the project root.
    pub from: String,
    /// Destination, relative to the build directory.
    pub to: String,
}

/// `[markdown]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownConfig {
    /// Pass raw HTML in the source through unescaped.
    #[serde(default = "default_true")]
    pub html: bool,
    /// Turn single newlines into `<br>`.
    #[serde(default = "default_true")]
    pub breaks: bool,
    /// Turn bare URLs into links.
    #[serde(default = "default_true")]
    pub linkify: bool,
    /// Curly quotes, dashes and ellipses.
    #[serde(default = "default_true")]
    pub typographer: bool,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            html: true,
            breaks: true,
            linkify: true,
            typographer: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// What to do with a content entry whose name has no digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnnumberedPolicy {
    /// Sort after every numbered sibling.
    #[default]
    Last,
    /// Sort before every numbered sibling.
    First,
    /// Fail the build with a malformed-name error.
    Error,
}

/// `[compose]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposeConfig {
    #[serde(default)]
    pub unnumbered: UnnumberedPolicy,

    /// Wrap the whole tree in one extra section for the root directory.
    #[serde(default)]
    pub wrap_root: bool,

    /// Only emit front matter keys starting with `data-` as attributes.
    #[serde(default)]
    pub data_attributes_only: bool,

    /// Mark every list item as a reveal fragment.
    #[serde(default = "default_true")]
    pub fragment_lists: bool,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            unnumbered: UnnumberedPolicy::default(),
            wrap_root: false,
            data_attributes_only: false,
            fragment_lists: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Path resolution
// ---------------------------------------------------------------------------

impl DeckConfig {
    /// Resolve a config path against the project root.
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.root.join(p)
        }
    }

    pub fn src_dir(&self) -> PathBuf {
        self.resolve(&self.paths.src_dir)
    }

    pub fn content_dir(&self) -> PathBuf {
        self.resolve(&self.paths.content_dir)
    }

    pub fn template_path(&self) -> PathBuf {
        self.resolve(&self.paths.template)
    }

    /// Output directory for a build mode.
    pub fn build_dir(&self, mode: BuildMode) -> PathBuf {
        match mode {
            BuildMode::Production => self.resolve(&self.paths.dist_dir),
            BuildMode::Development => self.resolve(&self.paths.dev_dir),
        }
    }

    /// Reject layouts where cleaning the build directory would delete sources.
    ///
    /// Paths are compared after resolving against the root and normalizing
    /// `.` and `..` components.
    pub fn validate(&self) -> Result<()> {
        let base = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());
        let at = |p: &str| normalize(&base.join(p.trim()));
        let root = normalize(&base);
        let sources = [
            at(&self.paths.src_dir),
            at(&self.paths.content_dir),
            at(&self.paths.template),
        ];

        for (field, dir) in [
            ("dist_dir", &self.paths.dist_dir),
            ("dev_dir", &self.paths.dev_dir),
        ] {
            let build = at(dir);
            if dir.trim().is_empty() || root.starts_with(&build) {
                return Err(DeckBuilderError::config(format!(
                    "paths.{field} must name a dedicated output directory, got {dir:?}"
                )));
            }
            if sources.iter().any(|s| s.starts_with(&build)) {
                return Err(DeckBuilderError::config(format!(
                    "paths.{field} ({dir}) contains project sources and would be wiped on build"
                )));
            }
        }
        Ok(())
    }
}

/// Lexically drop `.` components and fold `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(Component::ParentDir),
            },
            other => out.push(other),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load `deck.toml` from a project directory. Returns defaults rooted at
/// `project_root` if the file does not exist.
pub fn load_config(project_root: &Path) -> Result<DeckConfig> {
    let path = project_root.join(CONFIG_FILE_NAME);

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(DeckConfig {
            root: project_root.to_path_buf(),
            ..DeckConfig::default()
        });
    }

    load_config_from(&path)
}

/// Load the config from a specific file path. Relative paths inside it
/// resolve against the file's directory.
pub fn load_config_from(path: &Path) -> Result<DeckConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DeckBuilderError::io(path, e))?;

    let mut config: DeckConfig = toml::from_str(&content).map_err(|e| {
        DeckBuilderError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    config.root = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    config.validate()?;
    Ok(config)
}

/// Write a default `deck.toml` into a project directory.
/// Returns the path to the created file. Refuses to overwrite.
pub fn init_config(project_root: &Path) -> Result<PathBuf> {
    let path = project_root.join(CONFIG_FILE_NAME);
    if path.exists() {
        return Err(DeckBuilderError::config(format!(
            "{} already exists",
            path.display()
        )));
    }

    let config = DeckConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DeckBuilderError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DeckBuilderError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "deck-config-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn default_config_serializes() {
        let config = DeckConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("content_dir"));
        assert!(toml_str.contains("A Reveal.js Slide Deck"));
        assert!(toml_str.contains("unnumbered = \"last\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = DeckConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: DeckConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.paths.dist_dir, "docs");
        assert_eq!(parsed.paths.passthrough.len(), 2);
        assert!(parsed.markdown.linkify);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[deck]
title = "Intro to Web Components"

[compose]
unnumbered = "error"
"#;
        let config: DeckConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.deck.title, "Intro to Web Components");
        assert_eq!(config.deck.description, "Slides made with Reveal.js");
        assert_eq!(config.compose.unnumbered, UnnumberedPolicy::Error);
        assert!(config.compose.fragment_lists);
        assert_eq!(config.paths.content_dir, "src/content");
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let toml_str = "[compose]\nunnumbered = \"middle\"\n";
        assert!(toml::from_str::<DeckConfig>(toml_str).is_err());
    }

    #[test]
    fn paths_resolve_against_root() {
        let config = DeckConfig {
            root: PathBuf::from("/projects/talk"),
            ..DeckConfig::default()
        };
        assert_eq!(config.content_dir(), PathBuf::from("/projects/talk/src/content"));
        assert_eq!(
            config.build_dir(BuildMode::Development),
            PathBuf::from("/projects/talk/dev")
        );
        assert_eq!(config.resolve("/abs/x"), PathBuf::from("/abs/x"));
    }

    #[test]
    fn validate_rejects_root_as_build_dir() {
        let mut config = DeckConfig::default();
        config.paths.dist_dir = ".".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("paths.dist_dir"));
    }

    #[test]
    fn validate_rejects_build_dir_containing_sources() {
        let mut config = DeckConfig::default();
        config.paths.dev_dir = "src".into();
        assert!(config.validate().is_err());
        assert!(DeckConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_normalizes_before_comparing() {
        for dir in ["./src", "src/.", "src/", "docs/../src", "src/content/..", ".."] {
            let mut config = DeckConfig {
                root: PathBuf::from("/projects/talk"),
                ..DeckConfig::default()
            };
            config.paths.dist_dir = dir.into();
            assert!(config.validate().is_err(), "{dir:?} should be rejected");
        }
    }

    #[test]
    fn validate_rejects_absolute_path_to_sources() {
        let mut config = DeckConfig {
            root: PathBuf::from("/projects/talk"),
            ..DeckConfig::default()
        };
        config.paths.dev_dir = "/projects/talk/src".into();
        assert!(config.validate().is_err());

        config.paths.dev_dir = "/projects/talk/./dev".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_handles_relative_root() {
        let mut config = DeckConfig::default();
        config.paths.dist_dir = "./src".into();
        assert!(config.validate().is_err());

        config.paths.dist_dir = "./docs".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn normalize_folds_dot_components() {
        assert_eq!(normalize(Path::new("/a/./b/../c")), PathBuf::from("/a/c"));
        assert_eq!(normalize(Path::new("/..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn load_missing_file_uses_defaults() {
        let tmp = temp_dir();
        let config = load_config(&tmp).unwrap();
        assert_eq!(config.root, tmp);
        assert_eq!(config.deck.title, "A Reveal.js Slide Deck");
        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn init_then_load() {
        let tmp = temp_dir();
        let path = init_config(&tmp).unwrap();
        assert!(path.exists());

        let config = load_config(&tmp).unwrap();
        assert_eq!(config.root, tmp);
        assert_eq!(config.paths.template, "index.html");

        // Second init must not clobber the file.
        assert!(init_config(&tmp).is_err());

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
