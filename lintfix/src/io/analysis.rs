//! Analysis runs: one invocation of the external tool against one snapshot.

use std::process::Command;

use anyhow::{Context, Result};
use tracing::{debug, info, instrument};

use crate::io::config::AnalysisConfig;
use crate::io::document::{Document, DocumentId};
use crate::io::process::{collect_output, spawn_process};
use crate::io::ui::Notifier;

/// Backend that produces raw tool output for a document.
pub trait Analyzer {
    /// Run the tool over `document.text` and return its accumulated stdout.
    ///
    /// `on_stderr` receives each stderr line; a non-zero exit is not an error.
    fn analyze(&self, document: &Document, on_stderr: &mut dyn FnMut(&str)) -> Result<String>;
}

/// Analyzer that pipes the document into a configured command.
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    config: AnalysisConfig,
}

impl CommandAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    fn command_for(&self, document: &Document) -> Command {
        let mut cmd = Command::new(&self.config.command[0]);
        cmd.args(&self.config.command[1..]).arg(document.id.path());
        if let Some(dir) = document.id.path().parent() {
            cmd.current_dir(dir);
        }
        cmd
    }
}

impl Analyzer for CommandAnalyzer {
    #[instrument(skip_all, fields(document = %document.id))]
    fn analyze(&self, document: &Document, on_stderr: &mut dyn FnMut(&str)) -> Result<String> {
        let run = spawn_process(
            self.command_for(document),
            document.text.as_bytes().to_vec(),
            self.config.timeout(),
        );
        let output = collect_output(run, self.config.output_limit_bytes, on_stderr)
            .with_context(|| format!("run {}", self.config.command[0]))?;
        info!(
            exit_code = ?output.exit_code,
            bytes = output.stdout.len(),
            "analysis finished"
        );
        Ok(output.stdout)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisStatus {
    Running,
    Completed,
    Failed(String),
}

/// Result of one analysis run. Owns its output; runs never share a buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRun {
    pub document: DocumentId,
    /// The exact text submitted to the tool.
    pub input_text: String,
    /// Accumulated stdout. Empty when the run failed.
    pub raw_output: String,
    pub status: AnalysisStatus,
}

impl AnalysisRun {
    fn start(document: &Document) -> Self {
        Self {
            document: document.id.clone(),
            input_text: document.text.clone(),
            raw_output: String::new(),
            status: AnalysisStatus::Running,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == AnalysisStatus::Completed
    }
}

/// Execute one analysis run, forwarding stderr lines to `notifier`.
///
/// Failures are recorded in the returned run rather than propagated.
pub fn run_analysis<A: Analyzer + ?Sized, N: Notifier + ?Sized>(
    analyzer: &A,
    document: &Document,
    notifier: &N,
) -> AnalysisRun {
    let mut run = AnalysisRun::start(document);
    let mut on_stderr = |line: &str| notifier.error(line);
    match analyzer.analyze(document, &mut on_stderr) {
        Ok(output) => {
            run.raw_output = output;
            run.status = AnalysisStatus::Completed;
        }
        Err(err) => {
            let message = format!("{err:#}");
            debug!(document = %document.id, err = %message, "analysis failed");
            run.status = AnalysisStatus::Failed(message);
        }
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingUi, ScriptedAnalyzer, python_document};

    #[test]
    fn completed_run_owns_its_output() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok("a.py:1:0: C0114: doc".to_string())]);
        let ui = RecordingUi::default();
        let doc = python_document("mod.py", "x = 1\n");

        let run = run_analysis(&analyzer, &doc, &ui);
        assert!(run.is_completed());
        assert_eq!(run.raw_output, "a.py:1:0: C0114: doc");
        assert_eq!(run.input_text, "x = 1\n");
        assert_eq!(run.document, doc.id);
    }

    #[test]
    fn failure_is_recorded_not_raised() {
        let analyzer = ScriptedAnalyzer::new(vec![Err("spawn command: not found".to_string())]);
        let ui = RecordingUi::default();
        let doc = python_document("mod.py", "x = 1\n");

        let run = run_analysis(&analyzer, &doc, &ui);
        assert!(matches!(run.status, AnalysisStatus::Failed(ref m) if m.contains("not found")));
        assert!(run.raw_output.is_empty());
    }

    #[test]
    fn stderr_lines_reach_the_notifier() {
        let analyzer = ScriptedAnalyzer::new(vec![Ok(String::new())])
            .with_stderr(vec!["No config file found".to_string()]);
        let ui = RecordingUi::default();
        let doc = python_document("mod.py", "");

        let run = run_analysis(&analyzer, &doc, &ui);
        assert!(run.is_completed());
        assert_eq!(ui.errors(), vec!["No config file found".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn command_analyzer_pipes_text_and_ignores_exit_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let doc = Document::new(DocumentId::from_path(&temp.path().join("mod.py")), "x = 1\n");
        let analyzer = CommandAnalyzer::new(AnalysisConfig {
            command: vec![
                "sh".to_string(),
                "-c".to_string(),
                "cat; echo \"$0:1:0: C0114: Missing module docstring\"; exit 16".to_string(),
            ],
            ..AnalysisConfig::default()
        });

        let output = analyzer.analyze(&doc, &mut |_| {}).expect("analyze");
        assert!(output.starts_with("x = 1\n"));
        assert!(output.contains("mod.py:1:0: C0114: Missing module docstring"));
    }
}
