//! Shared types, error model, and configuration for deckbuilder.
//!
//! This crate is the foundation depended on by all other deckbuilder crates.
//! It provides:
//! - The unified error type ([`DeckBuilderError`])
//! - Domain types ([`ContentNode`], [`Metadata`], [`OutlineEntry`], [`BuildMode`])
//! - Configuration ([`DeckConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    CONFIG_FILE_NAME, ComposeConfig, DeckConfig, DeckMeta, MarkdownConfig, PassthroughDir,
    PathsConfig, UnnumberedPolicy, init_config, load_config, load_config_from,
};
pub use error::{DeckBuilderError, Result};
pub use types::{BuildMode, ContentNode, Metadata, NodeKind, OutlineEntry};
