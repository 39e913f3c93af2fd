//! Core build logic for deckbuilder.
//!
//! This crate ties together content composition, page templating, static
//! file copying and watch mode into the `build` and `watch` workflows.

pub mod composer;
pub mod page;
pub mod pipeline;
pub mod watch;
