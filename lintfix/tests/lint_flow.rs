//! End-to-end diagnostic refresh: tool output in, published diagnostics out.

use lintfix::core::diagnostics::Severity;
use lintfix::io::analysis::CommandAnalyzer;
use lintfix::io::config::AnalysisConfig;
use lintfix::io::document::Document;
use lintfix::io::publish::DiagnosticCollection;
use lintfix::lint::lint_document;
use lintfix::test_support::{RecordingUi, ScriptedAnalyzer, TestWorkspace};

const SAMPLE_SOURCE: &str = include_str!("fixtures/sample.py");
const SAMPLE_OUTPUT: &str = include_str!("fixtures/pylint_sample.txt");

/// Full tool report for the sample module: headers and the score footer are
/// skipped, every finding lands on the document with a 0-based line.
#[test]
fn sample_report_publishes_every_finding() {
    let workspace = TestWorkspace::new().expect("workspace");
    let path = workspace.write("sample.py", SAMPLE_SOURCE).expect("write");
    let document = Document::load(&path).expect("load");
    let analyzer = ScriptedAnalyzer::new(vec![Ok(SAMPLE_OUTPUT.to_string())]);
    let sink = DiagnosticCollection::new();
    let ui = RecordingUi::default();

    let report = lint_document(&analyzer, &sink, &ui, &document, || {
        Some(document.id.clone())
    });

    assert!(report.published);
    let published = sink.get(&document.id);
    assert_eq!(published.len(), 12);
    let errors = published
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    assert_eq!(errors, 5);
    let first = &published[0];
    assert_eq!(first.range.start.line, 3);
    assert_eq!(first.range.start.character, 22);
    assert!(first.message.starts_with("Duplicate argument name"));
    assert_eq!(analyzer.seen_inputs(), vec![SAMPLE_SOURCE.to_string()]);
}

/// Two saves of the same document: the second run's findings replace the first.
#[test]
fn later_run_replaces_earlier_findings() {
    let workspace = TestWorkspace::new().expect("workspace");
    let path = workspace.write("sample.py", SAMPLE_SOURCE).expect("write");
    let document = Document::load(&path).expect("load");
    let analyzer = ScriptedAnalyzer::new(vec![
        Ok(SAMPLE_OUTPUT.to_string()),
        Ok("sample.py:1:0: C0114: Missing module docstring".to_string()),
    ]);
    let sink = DiagnosticCollection::new();
    let ui = RecordingUi::default();

    lint_document(&analyzer, &sink, &ui, &document, || Some(document.id.clone()));
    lint_document(&analyzer, &sink, &ui, &document, || Some(document.id.clone()));

    let published = sink.get(&document.id);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].severity, Severity::Warning);
}

/// A real child process: the document is piped in, the tool exits non-zero,
/// and its stderr is surfaced without entering the parse buffer.
#[cfg(unix)]
#[test]
fn command_analyzer_end_to_end() {
    let workspace = TestWorkspace::new().expect("workspace");
    let path = workspace.write("app.py", "print(z)\n").expect("write");
    let document = Document::load(&path).expect("load");
    let analyzer = CommandAnalyzer::new(AnalysisConfig {
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            concat!(
                "grep -q 'print(z)' || exit 99; ",
                "echo '************* Module app'; ",
                "echo \"$0:1:6: E0602: Undefined variable 'z' (undefined-variable)\"; ",
                "echo 'config not found' >&2; ",
                "exit 2"
            )
            .to_string(),
        ],
        ..AnalysisConfig::default()
    });
    let sink = DiagnosticCollection::new();
    let ui = RecordingUi::default();

    let report = lint_document(&analyzer, &sink, &ui, &document, || {
        Some(document.id.clone())
    });

    assert!(report.run.is_completed());
    let published = sink.get(&document.id);
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].range.start.line, 0);
    assert_eq!(published[0].range.start.character, 6);
    assert_eq!(published[0].message, "Undefined variable 'z' (undefined-variable)");
    assert_eq!(ui.errors(), vec!["config not found".to_string()]);
}
