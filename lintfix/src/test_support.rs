//! Test-only fakes for the analysis, model, and presentation boundaries.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Result, anyhow};

use crate::io::analysis::Analyzer;
use crate::io::document::{Document, DocumentId};
use crate::io::model::{ModelClient, ModelRequest};
use crate::io::ui::{Notifier, ProgressReporter};

/// Build an in-memory Python document with a stable fake path.
pub fn python_document(name: &str, text: &str) -> Document {
    Document::new(DocumentId::from_path(&Path::new("/virtual").join(name)), text)
}

/// Model client that pops queued responses in order and records every request.
///
/// `Err(message)` entries simulate transport failures.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Result<String, String>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedModel {
    pub fn new(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl ModelClient for ScriptedModel {
    fn complete(&self, request: &ModelRequest) -> Result<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        let next = self
            .responses
            .lock()
            .expect("responses lock")
            .pop_front()
            .ok_or_else(|| anyhow!("scripted model exhausted"))?;
        next.map_err(|message| anyhow!(message))
    }
}

type PromptFn = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// Model client computing its response from the rendered prompt.
pub struct FnModel {
    respond: PromptFn,
}

impl FnModel {
    pub fn new(respond: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
        }
    }
}

impl ModelClient for FnModel {
    fn complete(&self, request: &ModelRequest) -> Result<String> {
        (self.respond)(request.prompt())
    }
}

/// Analyzer returning queued outputs; the last entry repeats once the queue drains.
#[derive(Debug, Default)]
pub struct ScriptedAnalyzer {
    outputs: Mutex<VecDeque<Result<String, String>>>,
    stderr: Vec<String>,
    seen: Mutex<Vec<String>>,
}

impl ScriptedAnalyzer {
    pub fn new(outputs: Vec<Result<String, String>>) -> Self {
        Self {
            outputs: Mutex::new(outputs.into()),
            stderr: Vec::new(),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Emit these stderr lines on every run.
    pub fn with_stderr(mut self, lines: Vec<String>) -> Self {
        self.stderr = lines;
        self
    }

    /// Texts submitted so far, in call order.
    pub fn seen_inputs(&self) -> Vec<String> {
        self.seen.lock().expect("seen lock").clone()
    }
}

impl Analyzer for ScriptedAnalyzer {
    fn analyze(&self, document: &Document, on_stderr: &mut dyn FnMut(&str)) -> Result<String> {
        self.seen
            .lock()
            .expect("seen lock")
            .push(document.text.clone());
        for line in &self.stderr {
            on_stderr(line);
        }
        let mut outputs = self.outputs.lock().expect("outputs lock");
        let next = if outputs.len() > 1 {
            outputs.pop_front()
        } else {
            outputs.front().cloned()
        };
        next.unwrap_or_else(|| Ok(String::new()))
            .map_err(|message| anyhow!(message))
    }
}

/// Records notifications and progress for assertions.
#[derive(Debug, Default)]
pub struct RecordingUi {
    errors: Mutex<Vec<String>>,
    infos: Mutex<Vec<String>>,
    reports: Mutex<Vec<String>>,
    begun: Mutex<Vec<(String, bool)>>,
    finished: Mutex<Vec<bool>>,
}

impl RecordingUi {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("errors lock").clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().expect("infos lock").clone()
    }

    pub fn reports(&self) -> Vec<String> {
        self.reports.lock().expect("reports lock").clone()
    }

    /// `(title, cancellable)` for each `begin` call.
    pub fn begun(&self) -> Vec<(String, bool)> {
        self.begun.lock().expect("begun lock").clone()
    }

    /// `succeeded` flag of each `finish` call.
    pub fn finished(&self) -> Vec<bool> {
        self.finished.lock().expect("finished lock").clone()
    }
}

impl Notifier for RecordingUi {
    fn error(&self, message: &str) {
        self.errors
            .lock()
            .expect("errors lock")
            .push(message.to_string());
    }

    fn info(&self, message: &str) {
        self.infos
            .lock()
            .expect("infos lock")
            .push(message.to_string());
    }
}

impl ProgressReporter for RecordingUi {
    fn begin(&self, title: &str, cancellable: bool) {
        self.begun
            .lock()
            .expect("begun lock")
            .push((title.to_string(), cancellable));
    }

    fn report(&self, message: &str) {
        self.reports
            .lock()
            .expect("reports lock")
            .push(message.to_string());
    }

    fn finish(&self, succeeded: bool) {
        self.finished
            .lock()
            .expect("finished lock")
            .push(succeeded);
    }
}

/// Temporary directory holding Python sources for end-to-end tests.
pub struct TestWorkspace {
    dir: tempfile::TempDir,
}

impl TestWorkspace {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `text` to `name` inside the workspace and return its path.
    pub fn write(&self, name: &str, text: &str) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, text)?;
        Ok(path)
    }
}
