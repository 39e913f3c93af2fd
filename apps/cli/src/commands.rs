//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use deckbuilder_core::composer::Composer;
use deckbuilder_core::pipeline::{self, BuildReport, ProgressReporter};
use deckbuilder_core::watch::{self, WatchOptions};
use deckbuilder_shared::{
    BuildMode, DeckConfig, NodeKind, OutlineEntry, init_config, load_config, load_config_from,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, trace};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// deckbuilder: compose slide fragments into a reveal.js page.
#[derive(Parser)]
#[command(
    name = "deckbuilder",
    version,
    about = "Compose a directory of slide fragments into a deployable reveal.js page.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to deck.toml (defaults to ./deck.toml).
    #[arg(long, env = "DECKBUILDER_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Clean the build directory and build everything.
    Build {
        /// Development build (dev directory, unminified asset names).
        #[arg(long)]
        dev: bool,

        /// Print the build report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Build, then rebuild on every source change.
    Watch {
        /// Development build (dev directory, unminified asset names).
        #[arg(long)]
        dev: bool,
    },

    /// Print the composed slide markup to stdout.
    Compose {
        /// Content directory (defaults to paths.content_dir).
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Show the content tree in composition order.
    Outline {
        /// Content directory (defaults to paths.content_dir).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Print the outline as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a deck.toml with defaults in the current directory.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "deckbuilder=info",
        1 => "deckbuilder=debug",
        _ => "deckbuilder=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    match cli.command {
        Command::Build { dev, json } => cmd_build(config_path.as_deref(), mode(dev), json).await,
        Command::Watch { dev } => cmd_watch(config_path.as_deref(), mode(dev)).await,
        Command::Compose { root } => cmd_compose(config_path.as_deref(), root.as_deref()),
        Command::Outline { root, json } => cmd_outline(config_path.as_deref(), root.as_deref(), json),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

fn mode(dev: bool) -> BuildMode {
    if dev {
        BuildMode::Development
    } else {
        BuildMode::Production
    }
}

/// Load `--config` if given, else `./deck.toml` (or defaults).
fn resolve_config(path: Option<&Path>) -> Result<DeckConfig> {
    let config = match path {
        Some(p) => load_config_from(p)?,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| eyre!("cannot determine working directory: {e}"))?;
            load_config(&cwd)?
        }
    };
    Ok(config)
}

// ---------------------------------------------------------------------------
// Progress reporters
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn file_copied(&self, path: &Path, current: usize) {
        self.spinner
            .set_message(format!("Copying [{current}] {}", path.display()));
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}

/// Log-only reporter for long-running watch sessions.
///
/// The pipeline logs its own summary, so only phase changes are reported.
struct LogProgress;

impl ProgressReporter for LogProgress {
    fn phase(&self, name: &str) {
        debug!(phase = name, "build phase");
    }

    fn file_copied(&self, path: &Path, current: usize) {
        trace!(path = %path.display(), current, "copied");
    }

    fn done(&self, _report: &BuildReport) {}
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(config_path: Option<&Path>, mode: BuildMode, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;

    info!(%mode, content = %config.content_dir().display(), "building deck");

    let report = tokio::task::spawn_blocking(move || {
        let progress = CliProgress::new();
        let result = pipeline::build(&config, mode, &progress);
        progress.spinner.finish_and_clear();
        result
    })
    .await??;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("  Deck built successfully!");
    println!("  Mode:    {}", report.mode);
    println!("  Slides:  {}", report.slide_count);
    println!("  Copied:  {} files", report.copied_files);
    println!("  Output:  {}", report.index_path.display());
    println!("  SHA-256: {}", report.sha256);
    println!(
        "  Time:    {:.1}s",
        report.elapsed_ms as f64 / 1000.0
    );
    println!();

    Ok(())
}

async fn cmd_watch(config_path: Option<&Path>, mode: BuildMode) -> Result<()> {
    let config = resolve_config(config_path)?;
    let opts = WatchOptions {
        mode,
        ..WatchOptions::default()
    };

    info!(%mode, out = %config.build_dir(mode).display(), "starting watch");

    watch::watch(config, opts, Arc::new(LogProgress)).await?;
    Ok(())
}

fn cmd_compose(config_path: Option<&Path>, root: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let root = root.map(Path::to_path_buf).unwrap_or_else(|| config.content_dir());

    let html = Composer::from_config(&config).compose(&root)?;
    println!("{html}");
    Ok(())
}

fn cmd_outline(config_path: Option<&Path>, root: Option<&Path>, json: bool) -> Result<()> {
    let config = resolve_config(config_path)?;
    let root = root.map(Path::to_path_buf).unwrap_or_else(|| config.content_dir());

    let outline = Composer::from_config(&config).outline(&root)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outline)?);
        return Ok(());
    }

    println!("{}/ ({} slides)", outline.name, outline.leaf_count());
    print_outline(&outline.children, "");
    Ok(())
}

fn print_outline(entries: &[OutlineEntry], prefix: &str) {
    for (i, entry) in entries.iter().enumerate() {
        let last = i + 1 == entries.len();
        let branch = if last { "└── " } else { "├── " };
        let suffix = match entry.kind {
            NodeKind::Group => "/",
            NodeKind::Leaf => "",
        };
        let key = entry
            .sort_key
            .map(|k| format!("  [{k}]"))
            .unwrap_or_else(|| "  [unnumbered]".to_string());
        println!("{prefix}{branch}{}{suffix}{key}", entry.name);

        if !entry.children.is_empty() {
            let child_prefix = format!("{prefix}{}", if last { "    " } else { "│   " });
            print_outline(&entry.children, &child_prefix);
        }
    }
}

fn cmd_config_init() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let path = init_config(&cwd)?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = resolve_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("# root: {}", config.root.display());
    println!("{toml_str}");
    Ok(())
}
