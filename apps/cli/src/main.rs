//! deckbuilder CLI: compose slide content into a reveal.js page.
//!
//! Reads `deck.toml`, composes the content tree, fills the host template and
//! writes the build directory. `watch` keeps rebuilding on changes.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
