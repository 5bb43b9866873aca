//! Orchestration of the multi-stage repair pipeline.
//!
//! Each stage renders its template around the current working text, asks the
//! model for a rewrite, and keeps only the extracted answer. The answer becomes
//! the `code` input of the next stage. Stages run strictly in order; the first
//! failing stage ends the run and no intermediate text is surfaced.

use tracing::{debug, info, instrument};

use crate::core::extract::extract;
use crate::core::stages::RepairStage;
use crate::core::template::{Bindings, Slot, render};
use crate::io::analysis::{AnalysisStatus, Analyzer, run_analysis};
use crate::io::document::Document;
use crate::io::model::{ModelClient, ModelRequest};
use crate::io::ui::{Notifier, ProgressReporter};

/// Model settings applied to every stage of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RepairSettings {
    pub model: String,
    pub temperature: f32,
}

/// Position of a pipeline run in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    /// Stage index (0-based) currently awaiting the model.
    Running(usize),
    Succeeded,
    Failed,
}

/// How a pipeline run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Succeeded(String),
    Failed { stage_index: usize, message: String },
}

impl PipelineOutcome {
    pub fn final_text(&self) -> Option<&str> {
        match self {
            PipelineOutcome::Succeeded(text) => Some(text),
            PipelineOutcome::Failed { .. } => None,
        }
    }
}

/// Drives a stage sequence through a model client.
pub struct RepairOrchestrator<'a, M: ModelClient + ?Sized> {
    model: &'a M,
    settings: RepairSettings,
    state: PipelineState,
}

impl<'a, M: ModelClient + ?Sized> RepairOrchestrator<'a, M> {
    pub fn new(model: &'a M, settings: RepairSettings) -> Self {
        Self {
            model,
            settings,
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Run every stage against `initial_code`.
    ///
    /// `side_bindings` supplies slots other than `code` (e.g. `linterOutput`).
    /// A label is reported to `progress` before each stage begins.
    #[instrument(skip_all, fields(stages = stages.len(), model = %self.settings.model))]
    pub fn run<P: ProgressReporter + ?Sized>(
        &mut self,
        initial_code: &str,
        stages: &[RepairStage],
        side_bindings: &Bindings,
        progress: &P,
    ) -> PipelineOutcome {
        let mut current = initial_code.to_string();

        for (index, stage) in stages.iter().enumerate() {
            self.state = PipelineState::Running(index);
            progress.report(&stage.label);
            debug!(stage = index, label = %stage.label, input_len = current.len(), "stage started");

            match self.run_stage(stage, &current, side_bindings) {
                Ok(next) => {
                    debug!(stage = index, output_len = next.len(), "stage finished");
                    current = next;
                }
                Err(err) => {
                    let message = format!("{err:#}");
                    debug!(stage = index, label = %stage.label, err = %message, "stage failed");
                    self.state = PipelineState::Failed;
                    return PipelineOutcome::Failed {
                        stage_index: index,
                        message,
                    };
                }
            }
        }

        self.state = PipelineState::Succeeded;
        info!(output_len = current.len(), "pipeline succeeded");
        PipelineOutcome::Succeeded(current)
    }

    fn run_stage(
        &self,
        stage: &RepairStage,
        code: &str,
        side_bindings: &Bindings,
    ) -> anyhow::Result<String> {
        let mut bindings = Bindings::new().with(Slot::Code, code);
        for slot in &stage.required_slots {
            if *slot == Slot::Code {
                continue;
            }
            bindings.set(*slot, side_bindings.get(*slot).unwrap_or_default());
        }

        let prompt = render(&stage.template, &bindings);
        let request =
            ModelRequest::user_prompt(&self.settings.model, self.settings.temperature, prompt);
        let response = self
            .model
            .complete(&request)
            .map_err(|err| err.context(format!("model request failed ({})", stage.label)))?;
        Ok(extract(&response).to_string())
    }
}

/// Title shown on the progress surface for a repair command.
pub const REPAIR_TITLE: &str = "Generating fixed code";

/// Repair command body: bind `linterOutput` from a fresh analysis run, then
/// run the pipeline with a non-cancellable progress surface.
///
/// A failed or skipped analysis leaves `linterOutput` empty; it does not stop
/// the repair.
pub fn repair_document<M, U>(
    analyzer: Option<&dyn Analyzer>,
    model: &M,
    ui: &U,
    document: &Document,
    stages: &[RepairStage],
    settings: RepairSettings,
) -> PipelineOutcome
where
    M: ModelClient + ?Sized,
    U: Notifier + ProgressReporter + ?Sized,
{
    ui.begin(REPAIR_TITLE, false);

    let mut side_bindings = Bindings::new();
    if let Some(analyzer) = analyzer {
        ui.report("Running analysis");
        let run = run_analysis(analyzer, document, ui);
        match run.status {
            AnalysisStatus::Completed => side_bindings.set(Slot::LinterOutput, run.raw_output),
            AnalysisStatus::Failed(message) => {
                ui.error(&format!("analysis failed, repairing without findings: {message}"));
            }
            AnalysisStatus::Running => {}
        }
    }

    let mut orchestrator = RepairOrchestrator::new(model, settings);
    let outcome = orchestrator.run(&document.text, stages, &side_bindings, ui);
    ui.finish(matches!(outcome, PipelineOutcome::Succeeded(_)));
    outcome
}
