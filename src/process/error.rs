//! Failure taxonomy for a single interpreter run.

use std::io;
use std::process::ExitStatus;

use thiserror::Error;

/// Which child stream an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stream::Stdout => f.write_str("stdout"),
            Stream::Stderr => f.write_str("stderr"),
        }
    }
}

/// Coarse classification of a [`RunError`], for callers that branch on the
/// failure category rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    PipeAcquisition,
    Launch,
    PrematureTermination,
    NonZeroExit,
    StderrNonEmpty,
    Drain,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("unable to acquire {0} pipe for the interpreter process")]
    PipeAcquisition(Stream),

    #[error("unable to start interpreter process '{executable}': {source}")]
    Launch {
        executable: String,
        #[source]
        source: io::Error,
    },

    #[error("interpreter terminated prematurely: {0}")]
    PrematureTermination(#[source] io::Error),

    #[error("interpreter did not complete successfully: {}{}", describe_status(.status), stderr_suffix(.stderr))]
    NonZeroExit { status: ExitStatus, stderr: String },

    #[error("interpreter wrote to stderr: {stderr}")]
    StderrNonEmpty { stderr: String },

    #[error("failed to drain {stream}: {source}")]
    Drain {
        stream: Stream,
        #[source]
        source: io::Error,
    },
}

impl RunError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RunError::PipeAcquisition(_) => ErrorKind::PipeAcquisition,
            RunError::Launch { .. } => ErrorKind::Launch,
            RunError::PrematureTermination(_) => ErrorKind::PrematureTermination,
            RunError::NonZeroExit { .. } => ErrorKind::NonZeroExit,
            RunError::StderrNonEmpty { .. } => ErrorKind::StderrNonEmpty,
            RunError::Drain { .. } => ErrorKind::Drain,
        }
    }

    /// Exit code of the child, when it ran to completion and reported one.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            RunError::NonZeroExit { status, .. } => status.code(),
            _ => None,
        }
    }
}

fn describe_status(status: &ExitStatus) -> String {
    if let Some(code) = status.code() {
        return format!("exit status {}", code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return format!("killed by signal {}", sig);
        }
    }
    status.to_string()
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}
