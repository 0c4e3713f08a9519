// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host process execution: run-to-completion commands and streamed,
//! stoppable subprocesses.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot};

/// Time a stopped process gets between SIGTERM and SIGKILL
pub const STOP_GRACE: Duration = Duration::from_secs(1);

/// Errors from process operations
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{program}`: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` exited with code {code}: {stderr}")]
    Failed { program: String, code: i32, stdout: String, stderr: String },
}

impl ProcessError {
    /// Exit code for a process that ran and failed
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ProcessError::Failed { code, .. } => Some(*code),
            ProcessError::SpawnFailed { .. } => None,
        }
    }
}

/// Captured output of a command that exited with status 0
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecOutput {
    pub fn stdout(stdout: impl Into<String>) -> Self {
        Self { code: 0, stdout: stdout.into(), stderr: String::new() }
    }
}

/// How a streamed process ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessExit {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl ProcessExit {
    pub fn code(code: i32) -> Self {
        Self { code: Some(code), signal: None }
    }

    pub fn signal(signal: i32) -> Self {
        Self { code: None, signal: Some(signal) }
    }

    fn from_status(status: ExitStatus) -> Self {
        use std::os::unix::process::ExitStatusExt;
        Self { code: status.code(), signal: status.signal() }
    }

    /// Signal name such as `SIGTERM`, if the process was signalled
    pub fn signal_name(&self) -> Option<String> {
        let signal = self.signal?;
        Some(match Signal::try_from(signal) {
            Ok(sig) => sig.as_str().to_string(),
            Err(_) => signal.to_string(),
        })
    }
}

/// Program, arguments, working directory and extra environment of a
/// subprocess. The parent environment is always inherited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

impl SpawnSpec {
    /// Command line as a single string, for logging
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

/// Requests termination of a spawned process. Cloneable; the first stop wins.
#[derive(Debug, Clone)]
pub struct ProcessStopper {
    tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

impl ProcessStopper {
    fn new(tx: oneshot::Sender<()>) -> Self {
        Self { tx: Arc::new(Mutex::new(Some(tx))) }
    }

    /// Ask the process to stop. Returns false if a stop was already requested.
    pub fn stop(&self) -> bool {
        match self.tx.lock().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }
}

/// A running subprocess.
///
/// Stdout and stderr lines arrive interleaved on `output`; every line is
/// delivered before `exit` resolves. Dropping the handle does not stop the
/// process.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub pid: Option<u32>,
    pub output: mpsc::UnboundedReceiver<String>,
    pub exit: oneshot::Receiver<ProcessExit>,
    pub stopper: ProcessStopper,
}

/// Adapter for running host programs
#[async_trait]
pub trait ProcessAdapter: Clone + Send + Sync + 'static {
    /// Run to completion. A non-zero exit is a [`ProcessError::Failed`].
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<ExecOutput, ProcessError>;

    /// Start a long-running process and stream its output
    async fn spawn(&self, spec: SpawnSpec) -> Result<SpawnedProcess, ProcessError>;
}

/// Owned argument list from string literals
pub fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Process adapter backed by `tokio::process`
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioProcessAdapter;

#[async_trait]
impl ProcessAdapter for TokioProcessAdapter {
    async fn exec(
        &self,
        program: &str,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<ExecOutput, ProcessError> {
        let mut command = Command::new(program);
        command.args(args).stdin(Stdio::null());
        if let Some(cwd) = cwd {
            command.current_dir(cwd);
        }
        let output = command
            .output()
            .await
            .map_err(|source| ProcessError::SpawnFailed { program: program.to_string(), source })?;

        let code = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        tracing::debug!(program, ?args, code, "exec finished");
        if !output.status.success() {
            return Err(ProcessError::Failed { program: program.to_string(), code, stdout, stderr });
        }
        Ok(ExecOutput { code, stdout, stderr })
    }

    async fn spawn(&self, spec: SpawnSpec) -> Result<SpawnedProcess, ProcessError> {
        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            command.current_dir(cwd);
        }
        let mut child = command
            .spawn()
            .map_err(|source| ProcessError::SpawnFailed { program: spec.program.clone(), source })?;
        let pid = child.id();
        tracing::info!(program = %spec.program, pid, "spawned process");

        let (line_tx, line_rx) = mpsc::unbounded_channel();
        let readers = [
            child.stdout.take().map(|out| tokio::spawn(forward_lines(out, line_tx.clone()))),
            child.stderr.take().map(|err| tokio::spawn(forward_lines(err, line_tx.clone()))),
        ];
        drop(line_tx);

        let (stop_tx, stop_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel();
        let program = spec.program;
        tokio::spawn(async move {
            let status = tokio::select! {
                status = child.wait() => status,
                Ok(()) = stop_rx => terminate(&mut child).await,
            };
            let exit = match status {
                Ok(status) => ProcessExit::from_status(status),
                Err(e) => {
                    tracing::warn!(%program, error = %e, "failed to wait for process");
                    ProcessExit::default()
                }
            };
            for reader in readers.into_iter().flatten() {
                let _ = reader.await;
            }
            let _ = exit_tx.send(exit);
        });

        Ok(SpawnedProcess {
            pid,
            output: line_rx,
            exit: exit_rx,
            stopper: ProcessStopper::new(stop_tx),
        })
    }
}

async fn forward_lines<R>(stream: R, tx: mpsc::UnboundedSender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut forwarding = true;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(error = %e, "failed to read process output");
                break;
            }
        }
        // Keep draining once the receiver is gone: a closed pipe kills the child with SIGPIPE.
        if !forwarding {
            continue;
        }
        let line = String::from_utf8_lossy(strip_newline(&buf)).into_owned();
        forwarding = tx.send(line).is_ok();
    }
}

fn strip_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// SIGTERM, then SIGKILL if the process is still alive after [`STOP_GRACE`].
async fn terminate(child: &mut Child) -> std::io::Result<ExitStatus> {
    if let Some(pid) = child.id().and_then(|pid| i32::try_from(pid).ok()) {
        if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            tracing::debug!(pid, error = %e, "SIGTERM failed");
        }
        if let Ok(status) = tokio::time::timeout(STOP_GRACE, child.wait()).await {
            return status;
        }
        tracing::warn!(pid, "process ignored SIGTERM, killing");
    }
    child.start_kill()?;
    child.wait().await
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{
        ExecOutput, ProcessAdapter, ProcessError, ProcessExit, ProcessStopper, SpawnSpec,
        SpawnedProcess,
    };
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tokio::sync::{mpsc, oneshot};

    /// Recorded `exec` call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ExecCall {
        pub program: String,
        pub args: Vec<String>,
        pub cwd: Option<PathBuf>,
    }

    impl ExecCall {
        /// Command line as a single string
        pub fn line(&self) -> String {
            std::iter::once(self.program.as_str())
                .chain(self.args.iter().map(String::as_str))
                .collect::<Vec<_>>()
                .join(" ")
        }
    }

    /// Recorded `spawn` call
    pub type SpawnCall = SpawnSpec;

    /// Scripted behaviour of one spawned process
    #[derive(Debug, Clone, Default)]
    pub struct FakeSpawn {
        pub lines: Vec<String>,
        /// `None` keeps the process running until stopped
        pub exit: Option<ProcessExit>,
    }

    impl FakeSpawn {
        pub fn exits(code: i32, lines: &[&str]) -> Self {
            Self {
                lines: lines.iter().map(|s| s.to_string()).collect(),
                exit: Some(ProcessExit::code(code)),
            }
        }

        pub fn running(lines: &[&str]) -> Self {
            Self { lines: lines.iter().map(|s| s.to_string()).collect(), exit: None }
        }
    }

    struct ExecRule {
        program: String,
        args_contain: Vec<String>,
        result: Result<ExecOutput, (i32, String)>,
    }

    #[derive(Default)]
    struct FakeProcessState {
        exec_calls: Vec<ExecCall>,
        spawn_calls: Vec<SpawnCall>,
        rules: Vec<ExecRule>,
        spawns: VecDeque<FakeSpawn>,
        stops: usize,
    }

    /// Process adapter that records calls and replays scripted results.
    ///
    /// Unmatched `exec` calls succeed with empty output; `spawn` without a
    /// queued script runs until stopped.
    #[derive(Clone, Default)]
    pub struct FakeProcessAdapter {
        inner: Arc<Mutex<FakeProcessState>>,
    }

    impl FakeProcessAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// Answer `program` calls whose arguments include all of `args_contain`
        pub fn on_exec(&self, program: &str, args_contain: &[&str], stdout: &str) -> &Self {
            self.push_rule(program, args_contain, Ok(ExecOutput::stdout(stdout)))
        }

        /// Fail matching calls with a non-zero exit code
        pub fn on_exec_fail(&self, program: &str, args_contain: &[&str], code: i32) -> &Self {
            self.push_rule(program, args_contain, Err((code, String::new())))
        }

        fn push_rule(
            &self,
            program: &str,
            args_contain: &[&str],
            result: Result<ExecOutput, (i32, String)>,
        ) -> &Self {
            self.inner.lock().rules.push(ExecRule {
                program: program.to_string(),
                args_contain: args_contain.iter().map(|s| s.to_string()).collect(),
                result,
            });
            self
        }

        /// Queue the behaviour of the next spawned process
        pub fn push_spawn(&self, spawn: FakeSpawn) -> &Self {
            self.inner.lock().spawns.push_back(spawn);
            self
        }

        pub fn exec_calls(&self) -> Vec<ExecCall> {
            self.inner.lock().exec_calls.clone()
        }

        /// `exec` command lines, in call order
        pub fn exec_lines(&self) -> Vec<String> {
            self.exec_calls().iter().map(ExecCall::line).collect()
        }

        pub fn spawn_calls(&self) -> Vec<SpawnCall> {
            self.inner.lock().spawn_calls.clone()
        }

        /// Number of spawned processes that were stopped
        pub fn stops(&self) -> usize {
            self.inner.lock().stops
        }
    }

    #[async_trait]
    impl ProcessAdapter for FakeProcessAdapter {
        async fn exec(
            &self,
            program: &str,
            args: &[String],
            cwd: Option<&Path>,
        ) -> Result<ExecOutput, ProcessError> {
            let mut inner = self.inner.lock();
            inner.exec_calls.push(ExecCall {
                program: program.to_string(),
                args: args.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
            });
            let rule = inner.rules.iter().rev().find(|rule| {
                rule.program == program
                    && rule.args_contain.iter().all(|needle| args.contains(needle))
            });
            match rule.map(|rule| rule.result.clone()) {
                None => Ok(ExecOutput::default()),
                Some(Ok(output)) => Ok(output),
                Some(Err((code, stderr))) => Err(ProcessError::Failed {
                    program: program.to_string(),
                    code,
                    stdout: String::new(),
                    stderr,
                }),
            }
        }

        async fn spawn(&self, spec: SpawnSpec) -> Result<SpawnedProcess, ProcessError> {
            let script = {
                let mut inner = self.inner.lock();
                inner.spawn_calls.push(spec);
                inner.spawns.pop_front().unwrap_or_default()
            };
            let (line_tx, line_rx) = mpsc::unbounded_channel();
            let (stop_tx, stop_rx) = oneshot::channel();
            let (exit_tx, exit_rx) = oneshot::channel();
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                for line in script.lines {
                    let _ = line_tx.send(line);
                }
                drop(line_tx);
                let exit = match script.exit {
                    Some(exit) => exit,
                    None => match stop_rx.await {
                        Ok(()) => {
                            inner.lock().stops += 1;
                            ProcessExit::signal(15)
                        }
                        Err(_) => return,
                    },
                };
                let _ = exit_tx.send(exit);
            });

            Ok(SpawnedProcess {
                pid: None,
                output: line_rx,
                exit: exit_rx,
                stopper: ProcessStopper::new(stop_tx),
            })
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ExecCall, FakeProcessAdapter, FakeSpawn, SpawnCall};

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
