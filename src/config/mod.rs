use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;

use crate::process::{InterpreterType, RunnerConfig, StderrPolicy};

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        let config_path = default_config_path();
        let mut cfg = Self { inner: default_map(), config_path };

        // Read .pyrunrc if exists
        if cfg.config_path.exists() {
            if let Ok(file) = fs::File::open(&cfg.config_path) {
                cfg.merge_rc(BufReader::new(file));
            }
        }

        // Overlay environment variables (take precedence)
        cfg.merge_vars(env::vars());
        cfg
    }

    /// Apply `KEY=VALUE` lines; blank lines and `#` comments are skipped.
    pub fn merge_rc<R: BufRead>(&mut self, reader: R) {
        for line in reader.lines().map_while(std::io::Result::ok) {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((k, v)) = line.split_once('=') {
                self.inner.insert(k.trim().to_string(), v.trim().to_string());
            }
        }
    }

    pub fn merge_vars<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (k, v) in vars {
            if is_config_key(&k) {
                self.inner.insert(k, v);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key).cloned()
    }

    /// Strict boolean: `true`/`false`, case-insensitive, surrounding whitespace
    /// ignored. Anything else is an error. A missing key is `None`.
    pub fn parse_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Some(true)),
                "false" => Ok(Some(false)),
                _ => Err(anyhow!("invalid {} '{}': expected true or false", key, raw)),
            },
        }
    }

    pub fn interpreter(&self) -> Result<InterpreterType> {
        let raw = self.get("PYRUN_INTERPRETER").unwrap_or_default();
        InterpreterType::parse(&raw).ok_or_else(|| anyhow!("unknown interpreter '{}' in PYRUN_INTERPRETER", raw))
    }

    /// `PYRUN_ENV` entries, `;`-separated, empty segments ignored.
    pub fn extra_env(&self) -> Vec<String> {
        self.get("PYRUN_ENV")
            .map(|v| {
                v.split(';')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn runner_config(&self) -> Result<RunnerConfig> {
        self.runner_config_for(None)
    }

    /// Build runner settings, optionally forcing the interpreter type. A
    /// forced type ignores `PYRUN_INTERPRETER` and `PYRUN_EXECUTABLE`.
    pub fn runner_config_for(&self, interpreter: Option<InterpreterType>) -> Result<RunnerConfig> {
        let mut rc = match interpreter {
            Some(ty) => RunnerConfig::for_interpreter(ty),
            None => {
                let rc = RunnerConfig::for_interpreter(self.interpreter()?);
                match self.get("PYRUN_EXECUTABLE").filter(|s| !s.is_empty()) {
                    Some(exe) => rc.with_executable(exe),
                    None => rc,
                }
            }
        };
        rc = rc
            .with_env_entries(self.extra_env())
            .context("invalid PYRUN_ENV")?;
        let policy = match self.parse_bool("PYRUN_STRICT_STDERR")? {
            Some(false) => StderrPolicy::Lenient,
            Some(true) | None => StderrPolicy::Strict,
        };
        Ok(rc.with_stderr_policy(policy))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { inner: default_map(), config_path: default_config_path() }
    }
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        "PYRUN_EXECUTABLE",
        "PYRUN_INTERPRETER",
        "PYRUN_ENV",
        "PYRUN_STRICT_STDERR",
    ];

    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pyrun").join(".pyrunrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();
    m.insert("PYRUN_INTERPRETER".into(), "python".into());
    m.insert("PYRUN_STRICT_STDERR".into(), "true".into());
    m
}
