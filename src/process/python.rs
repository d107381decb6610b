//! Python interpreter front-end over [`Runner`].

use std::ffi::{OsStr, OsString};

use super::{EnvEntryError, InterpreterType, RunError, Runner, RunnerConfig, StderrPolicy};

/// Runs Python scripts. Configure with the builder methods, then call
/// [`Python::execute`] as often as needed.
#[derive(Debug, Clone)]
pub struct Python {
    config: RunnerConfig,
}

impl Default for Python {
    fn default() -> Self {
        Self::new()
    }
}

impl Python {
    pub fn new() -> Self {
        Self { config: RunnerConfig::for_interpreter(InterpreterType::Python) }
    }

    pub fn with_executable(mut self, executable: impl Into<OsString>) -> Self {
        self.config = self.config.with_executable(executable);
        self
    }

    /// Extra `KEY=VALUE` entries layered over the inherited environment.
    pub fn with_env<I, S>(mut self, entries: I) -> Result<Self, EnvEntryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.config = self.config.with_env_entries(entries)?;
        Ok(self)
    }

    pub fn with_stderr_policy(mut self, policy: StderrPolicy) -> Self {
        self.config = self.config.with_stderr_policy(policy);
        self
    }

    pub fn runner(&self) -> Runner {
        Runner::new(self.config.clone())
    }

    /// Run `path` with the configured interpreter. Set `PYTHONUNBUFFERED=1`
    /// through [`Python::with_env`] to see lines as the script prints them.
    pub async fn execute<P, I, A>(&self, path: P, args: I) -> Result<(), RunError>
    where
        P: AsRef<OsStr>,
        I: IntoIterator<Item = A>,
        A: AsRef<OsStr>,
    {
        self.runner().run(path, args).await
    }
}
