//! Launch an interpreter, drain both pipes concurrently, classify the exit.

use std::ffi::OsStr;
use std::process::Stdio;

use tokio::io::AsyncWrite;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use super::drain::{self, DrainReport};
use super::error::{RunError, Stream};
use super::{RunnerConfig, StderrPolicy};

/// Runs scripts through the configured interpreter. Cheap to clone and safe
/// to share across concurrent calls; nothing is mutated after construction.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
}

struct ProcessHandle {
    child: Child,
    stdout: ChildStdout,
    stderr: ChildStderr,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Run `script` with `args`, forwarding the child's stdout to ours.
    pub async fn run<S, I, A>(&self, script: S, args: I) -> Result<(), RunError>
    where
        S: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        self.run_with_output(script, args, tokio::io::stdout()).await
    }

    /// Like [`Runner::run`], but stdout lines go to `sink`.
    pub async fn run_with_output<S, I, A, W>(&self, script: S, args: I, sink: W) -> Result<(), RunError>
    where
        S: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let script = script.as_ref();
        let mut cmd = self.command(script, args);

        tracing::debug!(
            executable = %self.config.executable().to_string_lossy(),
            script = %script.to_string_lossy(),
            "launching interpreter"
        );
        let ProcessHandle { mut child, stdout, stderr } = self.spawn(&mut cmd).await?;

        tracing::debug!(pid = ?child.id(), "draining interpreter output");
        let out_task = tokio::spawn(drain::forward_lines(stdout, sink));
        let err_task = tokio::spawn(drain::collect(stderr));
        let (out_report, err_report) = tokio::join!(out_task, err_task);

        tracing::debug!(pid = ?child.id(), "reaping interpreter");
        let status = child.wait().await.map_err(RunError::PrematureTermination)?;

        let mut out_report = out_report.map_err(|e| join_failure(Stream::Stdout, e))?;
        let mut err_report = err_report.map_err(|e| join_failure(Stream::Stderr, e))?;
        check_drain(Stream::Stdout, &mut out_report)?;
        check_drain(Stream::Stderr, &mut err_report)?;

        let wrote_stderr = !err_report.value.is_empty();
        let stderr = err_report.value.trim_end().to_string();
        if wrote_stderr && self.config.stderr_policy() == StderrPolicy::Strict {
            tracing::debug!(%status, "interpreter wrote to stderr");
            return Err(RunError::StderrNonEmpty { stderr });
        }
        if !status.success() {
            tracing::debug!(%status, "interpreter exited unsuccessfully");
            return Err(RunError::NonZeroExit { status, stderr });
        }

        tracing::debug!(bytes = out_report.value, "interpreter finished");
        Ok(())
    }

    fn command<I, A>(&self, script: &OsStr, args: I) -> Command
    where
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        let mut cmd = Command::new(self.config.executable());
        cmd.arg(script).args(args);
        // Applied in order on top of the inherited environment; a repeated
        // key keeps its last value.
        for (key, value) in self.config.extra_env() {
            cmd.env(key, value);
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn spawn(&self, cmd: &mut Command) -> Result<ProcessHandle, RunError> {
        let mut child = cmd.spawn().map_err(|source| RunError::Launch {
            executable: self.config.executable().to_string_lossy().into_owned(),
            source,
        })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        match (stdout, stderr) {
            (Some(stdout), Some(stderr)) => Ok(ProcessHandle { child, stdout, stderr }),
            (out, _) => {
                let missing = if out.is_none() { Stream::Stdout } else { Stream::Stderr };
                let _ = child.kill().await;
                Err(RunError::PipeAcquisition(missing))
            }
        }
    }
}

fn join_failure(stream: Stream, err: tokio::task::JoinError) -> RunError {
    RunError::Drain {
        stream,
        source: std::io::Error::new(std::io::ErrorKind::Other, err),
    }
}

fn check_drain<T>(stream: Stream, report: &mut DrainReport<T>) -> Result<(), RunError> {
    match report.error.take() {
        Some(source) => Err(RunError::Drain { stream, source }),
        None => Ok(()),
    }
}
