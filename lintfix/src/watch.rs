//! Save trigger: re-lint Python files whenever they change on disk.
//!
//! Each save launches its own analysis thread. A run that is still in flight
//! when the file is saved again is not cancelled; whichever run finishes last
//! publishes last.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::{Event, EventKind, PollWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, warn};

use crate::io::analysis::Analyzer;
use crate::io::document::{Document, DocumentId, Language};
use crate::io::publish::DiagnosticSink;
use crate::io::ui::Notifier;
use crate::lint::lint_document;

/// Shared collaborators for background refreshes.
#[derive(Clone)]
pub struct Refresher {
    pub analyzer: Arc<dyn Analyzer + Send + Sync>,
    pub sink: Arc<dyn DiagnosticSink + Send + Sync>,
    pub notifier: Arc<dyn Notifier + Send + Sync>,
}

impl Refresher {
    /// Lint `path` on a new thread. The handle may be dropped (fire-and-forget).
    pub fn spawn(&self, path: PathBuf) -> thread::JoinHandle<()> {
        let this = self.clone();
        thread::spawn(move || this.refresh(&path))
    }

    fn refresh(&self, path: &Path) {
        let document = match Document::load(path) {
            Ok(document) => document,
            Err(err) => {
                self.notifier.error(&format!("{err:#}"));
                return;
            }
        };
        let id = document.id.clone();
        // The file may be gone by the time the tool finishes.
        let active = || id.path().exists().then(|| id.clone());
        lint_document(
            &*self.analyzer,
            &*self.sink,
            &*self.notifier,
            &document,
            active,
        );
    }
}

/// Python files created or modified by `events`, de-duplicated and sorted.
pub fn saved_python_paths(events: &[Event]) -> Vec<PathBuf> {
    let paths: BTreeSet<PathBuf> = events
        .iter()
        .filter(|event| matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)))
        .flat_map(|event| event.paths.iter())
        .filter(|path| Language::from_path(path) == Language::Python)
        .cloned()
        .collect();
    paths.into_iter().collect()
}

/// Watch `paths` until the process is interrupted.
///
/// Events are batched once per `poll_interval` so a burst of writes from one
/// save triggers a single refresh per file.
pub fn watch(paths: &[PathBuf], poll_interval: Duration, refresher: Refresher) -> Result<()> {
    let (tx, rx) = mpsc::channel::<Event>();
    let mut watcher = PollWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let _ = tx.send(event);
            }
            Err(err) => warn!(err = %err, "watch error"),
        },
        notify::Config::default().with_poll_interval(poll_interval),
    )
    .context("create file watcher")?;

    for path in paths {
        watcher
            .watch(path, RecursiveMode::Recursive)
            .with_context(|| format!("watch {}", path.display()))?;
        info!(path = %path.display(), "watching");
    }

    let mut pending: Vec<Event> = Vec::new();
    loop {
        match rx.recv_timeout(poll_interval) {
            Ok(event) => pending.push(event),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if pending.is_empty() {
                    continue;
                }
                for path in saved_python_paths(&pending) {
                    debug!(document = %DocumentId::from_path(&path), "document saved");
                    refresher.spawn(path);
                }
                pending.clear();
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                warn!("file watcher stopped");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::publish::DiagnosticCollection;
    use crate::test_support::{RecordingUi, ScriptedAnalyzer, TestWorkspace};
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    fn event(kind: EventKind, path: &str) -> Event {
        Event::new(kind).add_path(PathBuf::from(path))
    }

    #[test]
    fn only_saved_python_files_trigger() {
        let events = vec![
            event(EventKind::Modify(ModifyKind::Any), "/w/b.py"),
            event(EventKind::Create(CreateKind::File), "/w/a.py"),
            event(EventKind::Modify(ModifyKind::Any), "/w/notes.md"),
            event(EventKind::Remove(RemoveKind::File), "/w/gone.py"),
            event(EventKind::Modify(ModifyKind::Any), "/w/b.py"),
        ];
        assert_eq!(
            saved_python_paths(&events),
            vec![PathBuf::from("/w/a.py"), PathBuf::from("/w/b.py")]
        );
    }

    #[test]
    fn refresh_publishes_findings_for_saved_file() {
        let workspace = TestWorkspace::new().expect("workspace");
        let path = workspace.write("pkg/mod.py", "x = 1\n").expect("write");
        let sink = Arc::new(DiagnosticCollection::new());
        let analyzer = Arc::new(ScriptedAnalyzer::new(vec![Ok(
            "mod.py:1:0: C0114: Missing module docstring".to_string(),
        )]));
        let refresher = Refresher {
            analyzer: analyzer.clone(),
            sink: sink.clone(),
            notifier: Arc::new(RecordingUi::default()),
        };

        refresher.spawn(path.clone()).join().expect("join");

        let published = sink.get(&DocumentId::from_path(&path));
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].message, "Missing module docstring");
        assert_eq!(analyzer.seen_inputs(), vec!["x = 1\n".to_string()]);
    }

    #[test]
    fn unreadable_file_is_reported() {
        let workspace = TestWorkspace::new().expect("workspace");
        let ui = Arc::new(RecordingUi::default());
        let sink = Arc::new(DiagnosticCollection::new());
        let refresher = Refresher {
            analyzer: Arc::new(ScriptedAnalyzer::default()),
            sink: sink.clone(),
            notifier: ui.clone(),
        };

        refresher
            .spawn(workspace.path().join("missing.py"))
            .join()
            .expect("join");

        assert_eq!(ui.errors().len(), 1);
        assert!(sink.documents().is_empty());
    }
}
