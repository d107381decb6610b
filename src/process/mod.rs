//! Interpreter process management (launch, output draining, exit status).

use std::ffi::OsString;

use thiserror::Error;

pub mod drain;
pub mod error;
pub mod python;
pub mod runner;

pub use drain::StreamEnd;
pub use error::{ErrorKind, RunError, Stream};
pub use runner::Runner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpreterType {
    #[default]
    Python,
    R,
}

impl InterpreterType {
    /// Executable name used when no override is configured. Resolution
    /// against `PATH` is left to the OS.
    pub fn default_executable(self) -> &'static str {
        match self {
            InterpreterType::Python if cfg!(windows) => "python",
            InterpreterType::Python => "python3",
            InterpreterType::R => "Rscript",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "python" | "py" => Some(InterpreterType::Python),
            "r" | "rscript" => Some(InterpreterType::R),
            _ => None,
        }
    }
}

/// What to make of output on the child's stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StderrPolicy {
    /// Any stderr output fails the run, even when the exit status is 0.
    #[default]
    Strict,
    /// Only the exit status decides; stderr is attached to the diagnostic.
    Lenient,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvEntryError {
    #[error("environment entry '{0}' is not of the form KEY=VALUE")]
    MissingSeparator(String),
    #[error("environment entry '{0}' has an empty key")]
    EmptyKey(String),
}

/// Split a raw `KEY=VALUE` assignment on the first `=`.
pub fn parse_env_entry(raw: &str) -> Result<(OsString, OsString), EnvEntryError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| EnvEntryError::MissingSeparator(raw.to_string()))?;
    if key.is_empty() {
        return Err(EnvEntryError::EmptyKey(raw.to_string()));
    }
    Ok((key.into(), value.into()))
}

/// Immutable runner settings, built once and shared by reference.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    executable: OsString,
    extra_env: Vec<(OsString, OsString)>,
    stderr_policy: StderrPolicy,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self::for_interpreter(InterpreterType::default())
    }
}

impl RunnerConfig {
    pub fn for_interpreter(ty: InterpreterType) -> Self {
        Self {
            executable: ty.default_executable().into(),
            extra_env: Vec::new(),
            stderr_policy: StderrPolicy::default(),
        }
    }

    pub fn with_executable(mut self, executable: impl Into<OsString>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Append one environment assignment. Later entries win over earlier ones
    /// and over the inherited environment.
    pub fn with_env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.extra_env.push((key.into(), value.into()));
        self
    }

    /// Append raw `KEY=VALUE` assignments in order.
    pub fn with_env_entries<I, S>(mut self, entries: I) -> Result<Self, EnvEntryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for entry in entries {
            self.extra_env.push(parse_env_entry(entry.as_ref())?);
        }
        Ok(self)
    }

    pub fn with_stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.stderr_policy = policy;
        self
    }

    pub fn executable(&self) -> &OsString {
        &self.executable
    }

    pub fn extra_env(&self) -> &[(OsString, OsString)] {
        &self.extra_env
    }

    pub fn stderr_policy(&self) -> StderrPolicy {
        self.stderr_policy
    }
}
