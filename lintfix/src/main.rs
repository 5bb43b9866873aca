//! Lint-driven Python repair CLI.
//!
//! `lint` publishes analysis findings for a file, `watch` refreshes them on
//! every save, and `fix` runs the staged model repair and prints the result.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use lintfix::core::stages::default_stages;
use lintfix::exit_codes;
use lintfix::io::analysis::{Analyzer, CommandAnalyzer};
use lintfix::io::config::{CONFIG_FILE, LintfixConfig, load_config, write_config};
use lintfix::io::document::{Document, write_fixed_document};
use lintfix::io::model::OpenAiClient;
use lintfix::io::publish::{OutputFormat, TerminalSink};
use lintfix::io::ui::{Notifier, TerminalUi};
use lintfix::lint::lint_document;
use lintfix::logging;
use lintfix::repair::{PipelineOutcome, RepairSettings, repair_document};
use lintfix::watch::{Refresher, watch};

#[derive(Parser)]
#[command(
    name = "lintfix",
    version,
    about = "Surface Python analysis findings and repair them with a language model"
)]
struct Cli {
    /// Config file (defaults to `.lintfix.toml` in the working directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default `.lintfix.toml` if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Analyze a file once and print its diagnostics.
    Lint {
        file: PathBuf,
        /// Print diagnostics as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Run the staged repair on a file and emit the fixed code.
    Fix {
        file: Option<PathBuf>,
        /// Write the fixed code here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Do not run the analysis tool; the first stage gets no findings.
        #[arg(long)]
        skip_analysis: bool,
    },
    /// Re-lint Python files under the given paths whenever they are saved.
    Watch {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::FAILED);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

    let load = || -> Result<LintfixConfig> {
        let cfg = load_config(&config_path)?;
        debug!(config = %config_path.display(), "loaded config");
        Ok(cfg)
    };

    match cli.command {
        Command::Init { force } => cmd_init(&config_path, force),
        Command::Lint { file, json } => cmd_lint(&load()?, &file, json),
        Command::Fix {
            file,
            output,
            skip_analysis,
        } => cmd_fix(&load()?, file.as_deref(), output.as_deref(), skip_analysis),
        Command::Watch { paths, json } => cmd_watch(&load()?, &paths, json),
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        eprintln!("{} already exists (use --force to overwrite)", path.display());
        return Ok(exit_codes::OK);
    }
    write_config(path, &LintfixConfig::default())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(exit_codes::OK)
}

fn output_format(json: bool) -> OutputFormat {
    if json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    }
}

fn cmd_lint(cfg: &LintfixConfig, file: &Path, json: bool) -> Result<i32> {
    let document = Document::load(file)?;
    let analyzer = CommandAnalyzer::new(cfg.analysis.clone());
    let sink = TerminalSink::new(output_format(json));
    let ui = TerminalUi::new();

    let report = lint_document(&analyzer, &sink, &ui, &document, || {
        Some(document.id.clone())
    });
    if report.run.is_completed() {
        Ok(exit_codes::OK)
    } else {
        Ok(exit_codes::FAILED)
    }
}

fn cmd_fix(
    cfg: &LintfixConfig,
    file: Option<&Path>,
    output: Option<&Path>,
    skip_analysis: bool,
) -> Result<i32> {
    let ui = TerminalUi::new();
    let Some(file) = file else {
        ui.info("No document to fix: pass the path of a Python file.");
        return Ok(exit_codes::NO_TARGET);
    };

    let document = Document::load(file)?;
    if !document.is_python() {
        ui.info(&format!(
            "{} does not look like a Python file; repairing anyway",
            document.id
        ));
    }

    let model = OpenAiClient::from_config(&cfg.model)?;
    let analyzer = CommandAnalyzer::new(cfg.analysis.clone());
    let analyzer: Option<&dyn Analyzer> = if skip_analysis {
        None
    } else {
        Some(&analyzer)
    };
    let stages = default_stages();
    let settings = RepairSettings {
        model: cfg.model.model.clone(),
        temperature: cfg.model.temperature,
    };

    match repair_document(analyzer, &model, &ui, &document, &stages, settings) {
        PipelineOutcome::Succeeded(text) => {
            write_fixed_document(&document.id, output, &text)?;
            Ok(exit_codes::OK)
        }
        PipelineOutcome::Failed {
            stage_index,
            message,
        } => {
            let label = stages
                .get(stage_index)
                .map(|stage| stage.label.as_str())
                .unwrap_or("unknown stage");
            bail!("repair failed during \"{label}\": {message}")
        }
    }
}

fn cmd_watch(cfg: &LintfixConfig, paths: &[PathBuf], json: bool) -> Result<i32> {
    let refresher = Refresher {
        analyzer: Arc::new(CommandAnalyzer::new(cfg.analysis.clone())),
        sink: Arc::new(TerminalSink::new(output_format(json))),
        notifier: Arc::new(TerminalUi::new()),
    };
    watch(
        paths,
        Duration::from_millis(cfg.watch.poll_interval_ms),
        refresher,
    )?;
    Ok(exit_codes::OK)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["lintfix", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
    }

    #[test]
    fn parse_lint_json() {
        let cli = Cli::parse_from(["lintfix", "lint", "app.py", "--json"]);
        match cli.command {
            Command::Lint { file, json } => {
                assert_eq!(file, PathBuf::from("app.py"));
                assert!(json);
            }
            _ => panic!("expected lint"),
        }
    }

    #[test]
    fn parse_fix_without_file() {
        let cli = Cli::parse_from(["lintfix", "fix"]);
        assert!(matches!(
            cli.command,
            Command::Fix {
                file: None,
                output: None,
                skip_analysis: false
            }
        ));
    }

    #[test]
    fn parse_fix_with_output_and_global_config() {
        let cli = Cli::parse_from([
            "lintfix",
            "fix",
            "app.py",
            "-o",
            "app.fixed.py",
            "--config",
            "ci.toml",
        ]);
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
        match cli.command {
            Command::Fix { file, output, .. } => {
                assert_eq!(file, Some(PathBuf::from("app.py")));
                assert_eq!(output, Some(PathBuf::from("app.fixed.py")));
            }
            _ => panic!("expected fix"),
        }
    }

    #[test]
    fn watch_requires_a_path() {
        assert!(Cli::try_parse_from(["lintfix", "watch"]).is_err());
    }

    #[test]
    fn fix_without_file_is_no_target() {
        let code = cmd_fix(&LintfixConfig::default(), None, None, false).expect("no target");
        assert_eq!(code, exit_codes::NO_TARGET);
    }
}
