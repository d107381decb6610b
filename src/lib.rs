//! Launch interpreter scripts, forward their stdout, and turn exit status and
//! stderr output into typed results.

pub mod config;
pub mod logging;
pub mod printer;
pub mod process;

pub use process::{
    ErrorKind, InterpreterType, RunError, Runner, RunnerConfig, StderrPolicy,
};
