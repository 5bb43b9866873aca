//! Orchestration for one diagnostic refresh: analyze, parse, publish.

use tracing::{debug, instrument};

use crate::core::diagnostics::{DiagnosticRecord, parse};
use crate::io::analysis::{AnalysisRun, AnalysisStatus, Analyzer, run_analysis};
use crate::io::document::{Document, DocumentId};
use crate::io::publish::{DiagnosticSink, publish};
use crate::io::ui::Notifier;

/// Outcome of a lint refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LintReport {
    pub run: AnalysisRun,
    pub records: Vec<DiagnosticRecord>,
    /// Whether the records reached the sink.
    pub published: bool,
}

/// Analyze `document` and publish its findings.
///
/// `active` is asked for the current target once the run completes; if it
/// yields nothing the findings are dropped. A failed run notifies the user and
/// leaves previously published diagnostics untouched.
#[instrument(skip_all, fields(document = %document.id))]
pub fn lint_document<A, S, N, F>(
    analyzer: &A,
    sink: &S,
    notifier: &N,
    document: &Document,
    active: F,
) -> LintReport
where
    A: Analyzer + ?Sized,
    S: DiagnosticSink + ?Sized,
    N: Notifier + ?Sized,
    F: FnOnce() -> Option<DocumentId>,
{
    let run = run_analysis(analyzer, document, notifier);
    if let AnalysisStatus::Failed(message) = &run.status {
        notifier.error(&format!("analysis failed for {}: {message}", document.id));
        return LintReport {
            run,
            records: Vec::new(),
            published: false,
        };
    }

    let records = parse(&run.raw_output);
    debug!(count = records.len(), "parsed findings");
    let target = active();
    publish(sink, target.as_ref(), &records);
    LintReport {
        run,
        records,
        published: target.is_some(),
    }
}
