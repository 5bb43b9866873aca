//! User-facing notifications and progress.
//!
//! These traits are the presentation surface the flows write to. The terminal
//! implementation prints to stderr so that stdout stays reserved for
//! diagnostics and repaired documents.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

/// Sink for user-visible messages.
pub trait Notifier {
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

/// Progress surface for long-running commands.
pub trait ProgressReporter {
    /// Start a task. `cancellable` tells the surface whether to offer an abort.
    fn begin(&self, title: &str, cancellable: bool);
    fn report(&self, message: &str);
    /// End the task. The surface only announces completion when `succeeded`.
    fn finish(&self, succeeded: bool);
}

/// Stderr-backed notifier and progress reporter.
#[derive(Debug, Default)]
pub struct TerminalUi {
    step: AtomicUsize,
}

impl TerminalUi {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for TerminalUi {
    fn error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn info(&self, message: &str) {
        info!(text = message, "notify info");
        eprintln!("{message}");
    }
}

impl ProgressReporter for TerminalUi {
    fn begin(&self, title: &str, cancellable: bool) {
        self.step.store(0, Ordering::Relaxed);
        if cancellable {
            eprintln!("{title} (Ctrl-C to cancel)");
        } else {
            eprintln!("{title}");
        }
    }

    fn report(&self, message: &str) {
        let step = self.step.fetch_add(1, Ordering::Relaxed) + 1;
        eprintln!("  [{step}] {message}...");
    }

    fn finish(&self, succeeded: bool) {
        if succeeded {
            eprintln!("  done");
        }
    }
}
