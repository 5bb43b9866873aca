//! Publication of parsed findings onto documents.
//!
//! Records are converted into the presentation shape (0-based, zero-width
//! ranges) and handed to a [`DiagnosticSink`]. Every publish replaces the
//! previous set for that document; nothing is merged.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::core::diagnostics::{DiagnosticRecord, Severity};
use crate::io::document::DocumentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    /// 0-based line.
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn point(position: Position) -> Self {
        Self {
            start: position,
            end: position,
        }
    }
}

/// A finding as the presentation layer sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub range: Range,
    pub message: String,
    pub severity: Severity,
}

impl From<&DiagnosticRecord> for Diagnostic {
    fn from(record: &DiagnosticRecord) -> Self {
        let start = Position {
            line: record.line.saturating_sub(1),
            character: record.column,
        };
        Self {
            range: Range::point(start),
            message: record.message.clone(),
            severity: record.severity(),
        }
    }
}

/// Destination for per-document diagnostic sets.
pub trait DiagnosticSink {
    /// Replace the full set published for `document`.
    fn replace(&self, document: &DocumentId, diagnostics: Vec<Diagnostic>);
}

/// Publish `records` for the active document.
///
/// With no active document (focus moved away before the run finished) this is
/// a no-op.
pub fn publish<S: DiagnosticSink + ?Sized>(
    sink: &S,
    document: Option<&DocumentId>,
    records: &[DiagnosticRecord],
) {
    let Some(document) = document else {
        debug!(count = records.len(), "no active document, dropping diagnostics");
        return;
    };
    let diagnostics: Vec<Diagnostic> = records.iter().map(Diagnostic::from).collect();
    debug!(%document, count = diagnostics.len(), "publishing diagnostics");
    sink.replace(document, diagnostics);
}

/// In-memory diagnostic store keyed by document.
#[derive(Debug, Default)]
pub struct DiagnosticCollection {
    sets: Mutex<HashMap<DocumentId, Vec<Diagnostic>>>,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current set for `document`, empty if nothing was published.
    pub fn get(&self, document: &DocumentId) -> Vec<Diagnostic> {
        self.sets
            .lock()
            .map(|sets| sets.get(document).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    pub fn documents(&self) -> Vec<DocumentId> {
        let mut ids: Vec<DocumentId> = self
            .sets
            .lock()
            .map(|sets| sets.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }
}

impl DiagnosticSink for DiagnosticCollection {
    fn replace(&self, document: &DocumentId, diagnostics: Vec<Diagnostic>) {
        match self.sets.lock() {
            Ok(mut sets) => {
                sets.insert(document.clone(), diagnostics);
            }
            Err(_) => warn!(%document, "diagnostic collection poisoned"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Renders each published set to stdout.
#[derive(Debug)]
pub struct TerminalSink {
    format: OutputFormat,
}

#[derive(Serialize)]
struct JsonSet<'a> {
    document: String,
    diagnostics: &'a [Diagnostic],
}

impl TerminalSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn render(&self, document: &DocumentId, diagnostics: &[Diagnostic]) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut buf = serde_json::to_string(&JsonSet {
                    document: document.to_string(),
                    diagnostics,
                })
                .context("serialize diagnostics")?;
                buf.push('\n');
                Ok(buf)
            }
            OutputFormat::Text => Ok(render_text(document, diagnostics)),
        }
    }
}

impl DiagnosticSink for TerminalSink {
    fn replace(&self, document: &DocumentId, diagnostics: Vec<Diagnostic>) {
        let rendered = match self.render(document, &diagnostics) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(err = %format!("{err:#}"), "failed to render diagnostics");
                return;
            }
        };
        let mut stdout = std::io::stdout().lock();
        if let Err(err) = stdout.write_all(rendered.as_bytes()) {
            warn!(err = %err, "failed to write diagnostics");
        }
    }
}

/// Human-readable listing, one diagnostic per line with 1-based lines.
pub fn render_text(document: &DocumentId, diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return format!("{document}: no findings\n");
    }
    let mut buf = String::new();
    for diagnostic in diagnostics {
        buf.push_str(&format!(
            "{}:{}:{}: {}: {}\n",
            document,
            diagnostic.range.start.line + 1,
            diagnostic.range.start.character,
            diagnostic.severity.as_str(),
            diagnostic.message
        ));
    }
    buf
}
