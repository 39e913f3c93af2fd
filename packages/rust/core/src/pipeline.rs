//! End-to-end `build` pipeline: content → compose → template → build dir.
//!
//! Content is composed in memory before anything on disk is touched, so a
//! broken slide leaves the previous build in place.

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};
use walkdir::WalkDir;

use deckbuilder_shared::{BuildMode, DeckBuilderError, DeckConfig, Result};

use crate::composer::Composer;
use crate::page::{PageOptions, render_page};

/// Name of the generated page inside the build directory.
pub const INDEX_FILE: &str = "index.html";

/// Result of a full build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub mode: BuildMode,
    /// Build directory that was (re)created.
    pub output_dir: PathBuf,
    /// The generated page.
    pub index_path: PathBuf,
    /// Number of content files composed.
    pub slide_count: usize,
    /// Number of files copied from passthrough directories.
    pub copied_files: usize,
    /// Hex SHA-256 of the generated page.
    pub sha256: String,
    pub built_at: DateTime<Utc>,
    pub elapsed_ms: u64,
}

/// Result of regenerating `index.html` alone.
#[derive(Debug, Clone, Serialize)]
pub struct ContentOutput {
    pub index_path: PathBuf,
    pub slide_count: usize,
    pub sha256: String,
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each passthrough file is copied.
    fn file_copied(&self, path: &Path, current: usize);
    /// Called when the build completes.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn file_copied(&self, _path: &Path, _current: usize) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Run the full build.
///
/// 1. Compose the content tree and fill the page template (in memory)
/// 2. Clean the build directory
/// 3. Copy passthrough directories
/// 4. Write `index.html`
#[instrument(skip_all, fields(mode = %mode))]
pub fn build(
    config: &DeckConfig,
    mode: BuildMode,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    let start = Instant::now();
    config.validate()?;
    let build_dir = config.build_dir(mode);

    info!(out = %build_dir.display(), "starting build");

    // --- Phase 1: Compose ---
    progress.phase("Composing slides");
    let composer = Composer::from_config(config);
    let (page, slide_count) = render_content(config, mode, &composer)?;

    // --- Phase 2: Clean ---
    progress.phase("Cleaning build directory");
    clean(&build_dir)?;

    // --- Phase 3: Passthrough ---
    progress.phase("Copying static files");
    let copied_files = copy_passthrough(config, mode, progress)?;

    // --- Phase 4: Write page ---
    progress.phase("Writing page");
    let index_path = build_dir.join(INDEX_FILE);
    write_atomic(&index_path, &page)?;

    let report = BuildReport {
        mode,
        output_dir: build_dir,
        index_path,
        slide_count,
        copied_files,
        sha256: sha256_hex(&page),
        built_at: Utc::now(),
        elapsed_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    };

    progress.done(&report);

    info!(
        slides = report.slide_count,
        copied = report.copied_files,
        elapsed_ms = report.elapsed_ms,
        "build complete"
    );

    Ok(report)
}

/// Recompose the content tree and rewrite `index.html` only.
#[instrument(skip_all, fields(mode = %mode))]
pub fn rebuild_content(config: &DeckConfig, mode: BuildMode) -> Result<ContentOutput> {
    let composer = Composer::from_config(config);
    let (page, slide_count) = render_content(config, mode, &composer)?;

    let build_dir = config.build_dir(mode);
    std::fs::create_dir_all(&build_dir).map_err(|e| DeckBuilderError::io(&build_dir, e))?;

    let index_path = build_dir.join(INDEX_FILE);
    write_atomic(&index_path, &page)?;

    info!(slides = slide_count, "content rebuilt");

    Ok(ContentOutput {
        index_path,
        slide_count,
        sha256: sha256_hex(&page),
    })
}

/// Compose the content tree and substitute it into the page template.
fn render_content(
    config: &DeckConfig,
    mode: BuildMode,
    composer: &Composer,
) -> Result<(String, usize)> {
    let (slides, stats) = composer.compose_with_stats(&config.content_dir())?;

    let template_path = config.template_path();
    let template = std::fs::read_to_string(&template_path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DeckBuilderError::not_found(&template_path),
        _ => DeckBuilderError::io(&template_path, e),
    })?;

    let page = render_page(
        &template,
        &slides,
        &config.deck,
        &PageOptions {
            fragment_lists: config.compose.fragment_lists,
            mode,
        },
    )?;

    Ok((page, stats.leaves))
}

/// Copy every configured passthrough directory into the build directory.
/// Sources that do not exist are skipped. Returns the number of files copied.
pub fn copy_passthrough(
    config: &DeckConfig,
    mode: BuildMode,
    progress: &dyn ProgressReporter,
) -> Result<usize> {
    let build_dir = config.build_dir(mode);
    let mut copied = 0;

    for entry in &config.paths.passthrough {
        let from = config.resolve(&entry.from);
        let to = build_dir.join(&entry.to);

        if !from.is_dir() {
            debug!(from = %from.display(), "passthrough source missing, skipping");
            continue;
        }

        for item in WalkDir::new(&from).follow_links(true) {
            let item = item.map_err(|e| {
                let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| from.clone());
                DeckBuilderError::io(path, e.into())
            })?;
            if !item.file_type().is_file() {
                continue;
            }

            let rel = item.path().strip_prefix(&from).unwrap_or(item.path());
            let target = to.join(rel);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DeckBuilderError::io(parent, e))?;
            }
            std::fs::copy(item.path(), &target).map_err(|e| DeckBuilderError::io(item.path(), e))?;

            copied += 1;
            progress.file_copied(&target, copied);
            debug!(from = %item.path().display(), to = %target.display(), "copied");
        }
    }

    Ok(copied)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Remove and recreate the build directory.
fn clean(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => debug!(path = %dir.display(), "removed previous build"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(DeckBuilderError::io(dir, e)),
    }
    std::fs::create_dir_all(dir).map_err(|e| DeckBuilderError::io(dir, e))
}

/// Write to a temp file next to `path`, then rename over it.
fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp = path.with_file_name(format!(".{file_name}.tmp"));

    std::fs::write(&temp, content).map_err(|e| DeckBuilderError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| DeckBuilderError::io(path, e))?;

    debug!(path = %path.display(), size = content.len(), "wrote file");
    Ok(())
}

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
