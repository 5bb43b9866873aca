//! Child process execution as a stream of output events.
//!
//! A run feeds its input to the child, closes stdin, and then reports stdout
//! chunks and stderr lines as they arrive, followed by exactly one terminal
//! event. The exit code is reported but never treated as a failure: analysis
//! tools exit non-zero whenever they find anything.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// One observation from a running child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(Vec<u8>),
    Stderr(String),
    /// The process exited, whatever its exit code.
    Completed { exit_code: Option<i32> },
    /// Spawning, writing input, or reading output failed.
    Failed(String),
}

impl ProcessEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProcessEvent::Completed { .. } | ProcessEvent::Failed(_)
        )
    }
}

/// Handle to a spawned run. Iterating yields events until the terminal one.
pub struct ProcessRun {
    events: Receiver<ProcessEvent>,
    finished: bool,
}

impl Iterator for ProcessRun {
    type Item = ProcessEvent;

    fn next(&mut self) -> Option<ProcessEvent> {
        if self.finished {
            return None;
        }
        match self.events.recv() {
            Ok(event) => {
                self.finished = event.is_terminal();
                Some(event)
            }
            Err(_) => {
                self.finished = true;
                Some(ProcessEvent::Failed(
                    "process supervisor exited without a result".to_string(),
                ))
            }
        }
    }
}

/// Start `cmd` on a supervisor thread, write `input` to its stdin and close it.
///
/// `timeout` bounds the wait for exit; a child still running after it is
/// killed and the run fails.
pub fn spawn_process(cmd: Command, input: Vec<u8>, timeout: Duration) -> ProcessRun {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let terminal = match supervise(cmd, input, timeout, &tx) {
            Ok(exit_code) => ProcessEvent::Completed { exit_code },
            Err(err) => {
                let message = format!("{err:#}");
                debug!(err = %message, "process run failed");
                ProcessEvent::Failed(message)
            }
        };
        let _ = tx.send(terminal);
    });
    ProcessRun {
        events: rx,
        finished: false,
    }
}

#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = timeout.as_secs()))]
fn supervise(
    mut cmd: Command,
    input: Vec<u8>,
    timeout: Duration,
    tx: &Sender<ProcessEvent>,
) -> Result<Option<i32>> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = cmd.spawn().context("spawn command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;

    // Input is written off this thread so the timeout also covers a child
    // that never drains stdin.
    let stdin_handle = thread::spawn(move || write_input(stdin, &input));
    let stdout_tx = tx.clone();
    let stdout_handle = thread::spawn(move || forward_chunks(stdout, &stdout_tx));
    let stderr_tx = tx.clone();
    let stderr_handle = thread::spawn(move || forward_lines(stderr, &stderr_tx));

    let status = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => status,
        None => {
            debug!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            kill_quietly(&mut child);
            bail!("command timed out after {:?}", timeout);
        }
    };

    join_reader(stdin_handle).context("write stdin")?;
    join_reader(stdout_handle).context("read stdout")?;
    join_reader(stderr_handle).context("read stderr")?;

    debug!(exit_code = ?status.code(), "command finished");
    Ok(status.code())
}

/// Write the whole input, then drop stdin so the child sees EOF.
fn write_input(mut stdin: ChildStdin, input: &[u8]) -> Result<()> {
    match stdin.write_all(input) {
        Ok(()) => Ok(()),
        // The child may legitimately exit before consuming all input.
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => {
            debug!("child closed stdin before reading all input");
            Ok(())
        }
        Err(err) => Err(err).context("write stdin"),
    }
}

fn kill_quietly(child: &mut Child) {
    if let Err(err) = child.kill() {
        warn!(err = %err, "failed to kill child process");
    }
    let _ = child.wait();
}

fn join_reader(handle: thread::JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("pipe thread panicked")),
    }
}

fn forward_chunks<R: Read>(mut reader: R, tx: &Sender<ProcessEvent>) -> Result<()> {
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(());
        }
        // A closed receiver means nobody is listening any more; keep draining.
        let _ = tx.send(ProcessEvent::Stdout(chunk[..n].to_vec()));
    }
}

fn forward_lines<R: Read>(reader: R, tx: &Sender<ProcessEvent>) -> Result<()> {
    let mut reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        let n = reader.read_until(b'\n', &mut line).context("read line")?;
        if n == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&line).trim_end().to_string();
        if !text.is_empty() {
            let _ = tx.send(ProcessEvent::Stderr(text));
        }
    }
}

/// Accumulated result of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectedOutput {
    pub stdout: String,
    pub exit_code: Option<i32>,
    /// Bytes of stdout discarded beyond the output limit.
    pub stdout_truncated: usize,
}

/// Drain a run into one stdout buffer, handing each stderr line to `on_stderr`.
///
/// Stdout is kept in arrival order up to `output_limit_bytes`; excess bytes are
/// counted and dropped. A `Failed` event becomes an error.
pub fn collect_output(
    run: ProcessRun,
    output_limit_bytes: usize,
    on_stderr: &mut dyn FnMut(&str),
) -> Result<CollectedOutput> {
    let mut stdout = Vec::new();
    let mut truncated = 0usize;

    for event in run {
        match event {
            ProcessEvent::Stdout(chunk) => {
                let remaining = output_limit_bytes.saturating_sub(stdout.len());
                let keep = chunk.len().min(remaining);
                stdout.extend_from_slice(&chunk[..keep]);
                truncated += chunk.len() - keep;
            }
            ProcessEvent::Stderr(line) => on_stderr(&line),
            ProcessEvent::Completed { exit_code } => {
                if truncated > 0 {
                    warn!(stdout_truncated = truncated, "output truncated");
                }
                return Ok(CollectedOutput {
                    stdout: String::from_utf8_lossy(&stdout).into_owned(),
                    exit_code,
                    stdout_truncated: truncated,
                });
            }
            ProcessEvent::Failed(message) => bail!(message),
        }
    }
    bail!("process run ended without a terminal event")
}
