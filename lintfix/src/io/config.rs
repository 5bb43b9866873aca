//! Configuration stored in `.lintfix.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = ".lintfix.toml";

/// Top-level configuration (TOML).
///
/// Meant to be edited by humans. Missing fields fall back to defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LintfixConfig {
    pub analysis: AnalysisConfig,
    pub model: ModelConfig,
    pub watch: WatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Analysis tool invocation. The document path is appended as the last argument.
    pub command: Vec<String>,

    /// Kill the tool if it runs longer than this.
    pub timeout_secs: u64,

    /// Keep at most this many bytes of tool output.
    pub output_limit_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "pylint".to_string(),
                "--output-format=text".to_string(),
                "--score=n".to_string(),
                "--from-stdin".to_string(),
            ],
            timeout_secs: 120,
            output_limit_bytes: 1_000_000,
        }
    }
}

impl AnalysisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API (without `/chat/completions`).
    pub endpoint: String,

    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Kept low so stages make minimal, repeatable edits.
    pub temperature: f32,

    /// Per-request HTTP timeout. Unset means wait for the model indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.1,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WatchConfig {
    /// How often watched files are polled for saves.
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

impl LintfixConfig {
    pub fn validate(&self) -> Result<()> {
        if self.analysis.command.is_empty() || self.analysis.command[0].trim().is_empty() {
            return Err(anyhow!("analysis.command must be a non-empty array"));
        }
        if self.analysis.timeout_secs == 0 {
            return Err(anyhow!("analysis.timeout_secs must be > 0"));
        }
        if self.analysis.output_limit_bytes == 0 {
            return Err(anyhow!("analysis.output_limit_bytes must be > 0"));
        }
        let endpoint = self.model.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(anyhow!("model.endpoint must be an http(s) URL"));
        }
        if self.model.model.trim().is_empty() {
            return Err(anyhow!("model.model must not be empty"));
        }
        if self.model.api_key_env.trim().is_empty() {
            return Err(anyhow!("model.api_key_env must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.model.temperature) {
            return Err(anyhow!("model.temperature must be within 0.0..=2.0"));
        }
        if self.model.timeout_secs == Some(0) {
            return Err(anyhow!("model.timeout_secs must be > 0 when set"));
        }
        if self.watch.poll_interval_ms == 0 {
            return Err(anyhow!("watch.poll_interval_ms must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `LintfixConfig::default()`.
pub fn load_config(path: &Path) -> Result<LintfixConfig> {
    if !path.exists() {
        let cfg = LintfixConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: LintfixConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &LintfixConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
