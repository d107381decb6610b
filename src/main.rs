mod cli;

use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use pyrun::config::Config;
use pyrun::printer::DiagnosticPrinter;
use pyrun::{logging, InterpreterType, Runner, RunnerConfig, StderrPolicy};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = cli::Cli::parse();
    logging::init(args.verbose)?;

    let cfg = Config::load();
    let runner = Runner::new(resolve_config(&cfg, &args)?);

    match runner.run(&args.script, &args.args).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(err) => {
            DiagnosticPrinter::default().print(&err);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// CLI flags override the config file and PYRUN_* variables.
fn resolve_config(cfg: &Config, args: &cli::Cli) -> Result<RunnerConfig> {
    let forced = args
        .interpreter
        .as_deref()
        .map(|name| InterpreterType::parse(name).ok_or_else(|| anyhow!("unknown interpreter '{}'", name)))
        .transpose()?;
    let mut rc = cfg.runner_config_for(forced)?;
    if let Some(exe) = &args.executable {
        rc = rc.with_executable(exe);
    }
    rc = rc.with_env_entries(&args.env).context("invalid --env entry")?;
    if args.lenient_stderr {
        rc = rc.with_stderr_policy(StderrPolicy::Lenient);
    }
    Ok(rc)
}
