//! Watch mode: build once, then rebuild on source changes until Ctrl-C.
//!
//! Filesystem events are batched over a short debounce window and mapped to
//! the work they require. Content or template changes recompose the whole
//! tree; passthrough changes recopy static files. Rebuilds run one at a time
//! on the blocking pool and a failed rebuild is logged, not fatal.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

use deckbuilder_shared::{BuildMode, DeckBuilderError, DeckConfig, Result};

use crate::pipeline::{self, ProgressReporter};

/// Extensions under the content directory that trigger a recomposition.
const CONTENT_EXTENSIONS: &[&str] = &["md", "html", "json"];

/// Watch mode settings.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    pub mode: BuildMode,
    /// Quiet period used to batch bursts of events.
    pub debounce: Duration,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            mode: BuildMode::Production,
            debounce: Duration::from_millis(200),
        }
    }
}

/// Work needed after a batch of changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rebuild {
    pub content: bool,
    pub assets: bool,
}

impl Rebuild {
    pub fn is_empty(&self) -> bool {
        !self.content && !self.assets
    }

    pub fn merge(&mut self, other: Rebuild) {
        self.content |= other.content;
        self.assets |= other.assets;
    }
}

/// Resolved locations that matter to watch mode.
#[derive(Debug, Clone)]
pub struct WatchTargets {
    pub src_dir: PathBuf,
    pub content_dir: PathBuf,
    pub template: PathBuf,
    pub passthrough: Vec<PathBuf>,
    pub build_dir: PathBuf,
}

impl WatchTargets {
    pub fn from_config(config: &DeckConfig, mode: BuildMode) -> Self {
        Self {
            src_dir: absolute(&config.src_dir()),
            content_dir: absolute(&config.content_dir()),
            template: absolute(&config.template_path()),
            passthrough: config
                .paths
                .passthrough
                .iter()
                .map(|p| absolute(&config.resolve(&p.from)))
                .collect(),
            build_dir: absolute(&config.build_dir(mode)),
        }
    }

    /// Map one changed path to the rebuild it requires.
    pub fn classify(&self, path: &Path) -> Rebuild {
        if path.starts_with(&self.build_dir) {
            return Rebuild::default();
        }

        let is_content = path.starts_with(&self.content_dir)
            && path
                .extension()
                .is_none_or(|ext| CONTENT_EXTENSIONS.iter().any(|c| ext.eq_ignore_ascii_case(c)));

        Rebuild {
            content: is_content || path == self.template,
            assets: self.passthrough.iter().any(|p| path.starts_with(p)),
        }
    }

    /// Roots to register with the watcher. Missing paths are left out.
    fn roots(&self) -> Vec<(PathBuf, RecursiveMode)> {
        let mut roots = vec![(self.src_dir.clone(), RecursiveMode::Recursive)];
        for dir in std::iter::once(&self.content_dir).chain(&self.passthrough) {
            if !dir.starts_with(&self.src_dir) {
                roots.push((dir.clone(), RecursiveMode::Recursive));
            }
        }
        // Editors that save by rename replace the file, so watch its directory.
        if let Some(parent) = self.template.parent() {
            if !roots.iter().any(|(r, _)| parent.starts_with(r)) {
                roots.push((parent.to_path_buf(), RecursiveMode::NonRecursive));
            }
        }
        roots.retain(|(p, _)| p.exists());
        roots
    }
}

/// Build, then keep rebuilding on changes until Ctrl-C.
///
/// An error in the initial build is returned; errors in later rebuilds are
/// logged and watching continues.
#[instrument(skip_all, fields(mode = %opts.mode))]
pub async fn watch(
    config: DeckConfig,
    opts: WatchOptions,
    progress: Arc<dyn ProgressReporter>,
) -> Result<()> {
    let config = Arc::new(config);
    let mode = opts.mode;

    {
        let config = Arc::clone(&config);
        let progress = Arc::clone(&progress);
        tokio::task::spawn_blocking(move || pipeline::build(&config, mode, progress.as_ref()))
            .await
            .map_err(|e| DeckBuilderError::Watch(format!("initial build panicked: {e}")))??;
    }

    let targets = WatchTargets::from_config(&config, mode);

    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = notify::recommended_watcher(move |res| {
        if tx.send(res).is_err() {
            debug!("watch channel closed, dropping event");
        }
    })
    .map_err(|e| DeckBuilderError::Watch(format!("failed to create watcher: {e}")))?;

    for (root, recursive) in targets.roots() {
        watcher
            .watch(&root, recursive)
            .map_err(|e| DeckBuilderError::Watch(format!("failed to watch {}: {e}", root.display())))?;
        debug!(path = %root.display(), "watching");
    }

    info!(src = %targets.src_dir.display(), "watching for changes (Ctrl-C to stop)");

    event_loop(&targets, &mut rx, opts.debounce, tokio::signal::ctrl_c(), |pending| {
        run_rebuild(Arc::clone(&config), mode, pending, Arc::clone(&progress))
    })
    .await;

    Ok(())
}

/// Debounce events into batches and hand each non-empty batch to `rebuild`,
/// until `shutdown` resolves or the channel closes.
///
/// `shutdown` is polled across the whole loop, including the debounce wait.
async fn event_loop<S, F, Fut>(
    targets: &WatchTargets,
    rx: &mut mpsc::UnboundedReceiver<notify::Result<Event>>,
    debounce: Duration,
    shutdown: S,
    mut rebuild: F,
) where
    S: Future,
    F: FnMut(Rebuild) -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        let received = tokio::select! {
            _ = &mut shutdown => break,
            received = rx.recv() => received,
        };
        let Some(first) = received else {
            error!("watcher channel disconnected");
            return;
        };

        let mut pending = Rebuild::default();
        absorb(targets, first, &mut pending);

        tokio::select! {
            _ = &mut shutdown => break,
            () = tokio::time::sleep(debounce) => {}
        }
        while let Ok(more) = rx.try_recv() {
            absorb(targets, more, &mut pending);
        }

        if pending.is_empty() {
            continue;
        }
        rebuild(pending).await;
    }

    info!("stopping watch");
}

fn absorb(targets: &WatchTargets, res: notify::Result<Event>, pending: &mut Rebuild) {
    match res {
        Ok(event) => {
            if matches!(event.kind, EventKind::Access(_)) {
                return;
            }
            for path in &event.paths {
                let needed = targets.classify(path);
                if !needed.is_empty() {
                    debug!(path = %path.display(), ?needed, "change detected");
                }
                pending.merge(needed);
            }
        }
        Err(e) => warn!(error = %e, "watch error"),
    }
}

async fn run_rebuild(
    config: Arc<DeckConfig>,
    mode: BuildMode,
    pending: Rebuild,
    progress: Arc<dyn ProgressReporter>,
) {
    let joined = tokio::task::spawn_blocking(move || -> Result<()> {
        if pending.assets {
            progress.phase("Copying static files");
            let copied = pipeline::copy_passthrough(&config, mode, progress.as_ref())?;
            info!(copied, "static files recopied");
        }
        if pending.content {
            progress.phase("Composing slides");
            let out = pipeline::rebuild_content(&config, mode)?;
            info!(slides = out.slide_count, sha256 = %out.sha256, "page regenerated");
        }
        Ok(())
    })
    .await;

    match joined {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "rebuild failed, keeping previous output"),
        Err(e) => error!(error = %e, "rebuild task panicked"),
    }
}

/// Canonical form when the path exists; unchanged otherwise.
fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> WatchTargets {
        let config = DeckConfig {
            root: PathBuf::from("/nonexistent/deck"),
            ..DeckConfig::default()
        };
        WatchTargets::from_config(&config, BuildMode::Development)
    }

    #[test]
    fn content_files_trigger_recomposition() {
        let t = targets();
        let needed = t.classify(Path::new("/nonexistent/deck/src/content/2-part/1-a.md"));
        assert_eq!(needed, Rebuild { content: true, assets: false });

        let needed = t.classify(Path::new("/nonexistent/deck/src/content/3-data.JSON"));
        assert!(needed.content);
    }

    #[test]
    fn content_directories_trigger_recomposition() {
        let t = targets();
        assert!(t.classify(Path::new("/nonexistent/deck/src/content/4-new-part")).content);
    }

    #[test]
    fn other_content_extensions_are_ignored() {
        let t = targets();
        let needed = t.classify(Path::new("/nonexistent/deck/src/content/1-a.md.swp"));
        assert!(needed.is_empty());
    }

    #[test]
    fn template_triggers_recomposition() {
        let t = targets();
        assert!(t.classify(Path::new("/nonexistent/deck/index.html")).content);
    }

    #[test]
    fn passthrough_triggers_copy() {
        let t = targets();
        let needed = t.classify(Path::new("/nonexistent/deck/src/images/logo.svg"));
        assert_eq!(needed, Rebuild { content: false, assets: true });
    }

    #[test]
    fn build_output_is_ignored() {
        let t = targets();
        assert!(t.classify(Path::new("/nonexistent/deck/dev/index.html")).is_empty());
    }

    #[test]
    fn merge_accumulates() {
        let mut pending = Rebuild::default();
        assert!(pending.is_empty());
        pending.merge(Rebuild { content: true, assets: false });
        pending.merge(Rebuild { content: false, assets: true });
        assert_eq!(pending, Rebuild { content: true, assets: true });
    }

    #[test]
    fn absorb_skips_access_events() {
        let t = targets();
        let mut pending = Rebuild::default();
        let event = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("/nonexistent/deck/src/content/1-a.md"));
        absorb(&t, Ok(event), &mut pending);
        assert!(pending.is_empty());

        let event = Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from("/nonexistent/deck/src/content/1-a.md"));
        absorb(&t, Ok(event), &mut pending);
        assert!(pending.content);
    }

    #[test]
    fn roots_skip_missing_paths() {
        assert!(targets().roots().is_empty());
    }

    #[test]
    fn template_is_watched_through_its_directory() {
        let root = std::env::temp_dir().join(format!("deck-watch-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(root.join("src/content")).unwrap();
        std::fs::write(root.join("index.html"), "{{slides}}").unwrap();

        let config = DeckConfig {
            root: root.clone(),
            ..DeckConfig::default()
        };
        let t = WatchTargets::from_config(&config, BuildMode::Development);
        let roots = t.roots();

        let root_dir = std::fs::canonicalize(&root).unwrap();
        assert!(roots.contains(&(root_dir, RecursiveMode::NonRecursive)));
        assert!(!roots.iter().any(|(p, _)| p == &t.template));

        let _ = std::fs::remove_dir_all(&root);
    }

    fn modify(path: &str) -> notify::Result<Event> {
        Ok(Event::new(EventKind::Modify(notify::event::ModifyKind::Any))
            .add_path(PathBuf::from(path)))
    }

    #[tokio::test]
    async fn shutdown_interrupts_debounce() {
        let t = targets();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(modify("/nonexistent/deck/src/content/1-a.md")).unwrap();

        let mut batches = Vec::new();
        let finished = tokio::time::timeout(
            Duration::from_secs(5),
            event_loop(
                &t,
                &mut rx,
                Duration::from_secs(60),
                tokio::time::sleep(Duration::from_millis(50)),
                |pending| {
                    batches.push(pending);
                    std::future::ready(())
                },
            ),
        )
        .await;

        assert!(finished.is_ok(), "loop did not stop during debounce");
        assert!(batches.is_empty());
    }

    #[tokio::test]
    async fn events_in_one_window_become_one_rebuild() {
        let t = targets();
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send(modify("/nonexistent/deck/src/content/1-a.md")).unwrap();
        tx.send(modify("/nonexistent/deck/src/images/logo.svg")).unwrap();
        tx.send(modify("/nonexistent/deck/dev/index.html")).unwrap();

        let mut batches = Vec::new();
        event_loop(
            &t,
            &mut rx,
            Duration::from_millis(20),
            tokio::time::sleep(Duration::from_millis(300)),
            |pending| {
                batches.push(pending);
                std::future::ready(())
            },
        )
        .await;

        assert_eq!(batches, vec![Rebuild { content: true, assets: true }]);
    }

    #[tokio::test]
    async fn closed_channel_ends_the_loop() {
        let t = targets();
        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
        drop(tx);

        event_loop(
            &t,
            &mut rx,
            Duration::from_millis(20),
            std::future::pending::<()>(),
            |_| std::future::ready(()),
        )
        .await;
    }
}
