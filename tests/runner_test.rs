#![cfg(unix)]

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use anyhow::Result;
use pyrun::{ErrorKind, RunError, Runner, RunnerConfig, StderrPolicy};
use tempfile::TempDir;
use tokio::io::AsyncWrite;

/// Sink that keeps everything written to it, readable after the run.
#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl AsyncWrite for Captured {
    fn poll_write(self: Pin<&mut Self>, _: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }
    fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
    fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).unwrap();
    path
}

fn sh() -> RunnerConfig {
    RunnerConfig::default().with_executable("sh")
}

async fn run(config: RunnerConfig, path: &Path, args: &[&str]) -> (Result<(), RunError>, String) {
    let out = Captured::default();
    let res = Runner::new(config).run_with_output(path, args, out.clone()).await;
    (res, out.text())
}

#[tokio::test]
async fn hello_succeeds_and_forwards_stdout() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "hello.sh", "echo hello\n");

    let (res, out) = run(sh(), &path, &[]).await;
    assert!(res.is_ok(), "Got: {:?}", res);
    assert_eq!(out, "hello\n");
    Ok(())
}

#[tokio::test]
async fn stderr_with_exit_zero_is_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "boom.sh", "echo boom >&2\nexit 0\n");

    let (res, _) = run(sh(), &path, &[]).await;
    let err = res.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StderrNonEmpty);
    assert!(err.to_string().contains("boom"), "Got: {}", err);
    Ok(())
}

#[tokio::test]
async fn single_stderr_byte_without_newline_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "byte.sh", "printf x >&2\n");

    let (res, _) = run(sh(), &path, &[]).await;
    assert_eq!(res.unwrap_err().kind(), ErrorKind::StderrNonEmpty);
    Ok(())
}

#[tokio::test]
async fn lenient_policy_ignores_stderr_on_success() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "warn.sh", "echo 'DeprecationWarning: old' >&2\necho done\n");

    let config = sh().with_stderr_policy(StderrPolicy::Lenient);
    let (res, out) = run(config, &path, &[]).await;
    assert!(res.is_ok(), "Got: {:?}", res);
    assert_eq!(out, "done\n");
    Ok(())
}

#[tokio::test]
async fn missing_executable_is_launch_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "never.sh", "echo never\n");

    let config = RunnerConfig::default().with_executable("/nonexistent/bin/python-pyrun");
    let (res, out) = run(config, &path, &[]).await;
    let err = res.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Launch);
    assert!(err.to_string().contains("unable to start"), "Got: {}", err);
    assert!(out.is_empty());
    Ok(())
}

#[tokio::test]
async fn non_zero_exit_reports_code() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "fail.sh", "echo partial\nexit 3\n");

    let (res, out) = run(sh(), &path, &[]).await;
    let err = res.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NonZeroExit);
    assert_eq!(err.exit_code(), Some(3));
    assert!(err.to_string().contains("exit status 3"), "Got: {}", err);
    assert_eq!(out, "partial\n");
    Ok(())
}

#[tokio::test]
async fn killed_by_signal_is_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "kill.sh", "echo before\nkill -9 $$\n");

    let (res, out) = run(sh(), &path, &[]).await;
    let err = res.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NonZeroExit);
    assert_eq!(err.exit_code(), None);
    assert!(err.to_string().contains("killed by signal 9"), "Got: {}", err);
    assert_eq!(out, "before\n");
    Ok(())
}

#[tokio::test]
async fn stderr_takes_precedence_over_exit_status() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "both.sh", "echo 'Traceback: bad' >&2\nexit 1\n");

    let (res, _) = run(sh(), &path, &[]).await;
    assert_eq!(res.unwrap_err().kind(), ErrorKind::StderrNonEmpty);

    let config = sh().with_stderr_policy(StderrPolicy::Lenient);
    let (res, _) = run(config, &path, &[]).await;
    let err = res.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NonZeroExit);
    assert!(err.to_string().contains("Traceback: bad"), "Got: {}", err);
    Ok(())
}

#[tokio::test]
async fn child_inherits_parent_environment() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "path.sh", "printf '%s' \"$PATH\"\n");

    let (res, out) = run(sh(), &path, &[]).await;
    assert!(res.is_ok(), "Got: {:?}", res);
    assert_eq!(out, std::env::var("PATH").unwrap_or_default());
    Ok(())
}

#[tokio::test]
async fn extra_env_later_entries_win() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(
        &dir,
        "env.sh",
        "echo \"$PYRUN_TEST_INHERITED\"\necho \"$PYRUN_TEST_DUP\"\n",
    );

    let base = sh().with_env("PYRUN_TEST_INHERITED", "parent");
    let (res, out) = run(base.clone(), &path, &[]).await;
    assert!(res.is_ok(), "Got: {:?}", res);
    assert_eq!(out, "parent\n\n");

    let config = base.with_env_entries([
        "PYRUN_TEST_INHERITED=child",
        "PYRUN_TEST_DUP=first",
        "PYRUN_TEST_DUP=second",
    ])?;
    let (res, out) = run(config, &path, &[]).await;
    assert!(res.is_ok(), "Got: {:?}", res);
    assert_eq!(out, "child\nsecond\n");
    Ok(())
}

#[tokio::test]
async fn arguments_are_passed_verbatim() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(&dir, "args.sh", "for a in \"$@\"; do printf '%s\\n' \"$a\"; done\n");

    let args = ["two words", "$(echo injected)", "; rm -rf /", "--flag"];
    let (res, out) = run(sh(), &path, &args).await;
    assert!(res.is_ok(), "Got: {:?}", res);
    assert_eq!(out, "two words\n$(echo injected)\n; rm -rf /\n--flag\n");
    Ok(())
}

#[tokio::test]
async fn same_script_gives_same_classification() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let ok = script(&dir, "ok.sh", "echo ok\n");
    let bad = script(&dir, "bad.sh", "echo bad >&2\n");
    let runner = Runner::new(sh());

    for _ in 0..2 {
        assert!(runner.run_with_output(&ok, ["x"], Captured::default()).await.is_ok());
        let err = runner.run_with_output(&bad, ["x"], Captured::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StderrNonEmpty);
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn high_volume_on_both_streams_does_not_deadlock() -> Result<()> {
    let dir = tempfile::tempdir()?;
    // Roughly 1.2 MB on each stream, written concurrently.
    let path = script(
        &dir,
        "flood.sh",
        "yes out | head -n 300000 &\nyes err | head -n 300000 >&2\nwait\n",
    );

    let (res, out) = run(sh(), &path, &[]).await;
    let err = res.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StderrNonEmpty);
    match err {
        RunError::StderrNonEmpty { stderr } => assert_eq!(stderr.lines().count(), 300000),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(out.lines().count(), 300000);
    assert!(out.lines().all(|l| l == "out"));
    Ok(())
}

#[tokio::test]
async fn interleaved_stdout_keeps_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = script(
        &dir,
        "interleave.sh",
        "i=1\nwhile [ $i -le 2000 ]; do\n  echo \"line $i\"\n  echo \"err $i\" >&2\n  i=$((i+1))\ndone\n",
    );

    let config = sh().with_stderr_policy(StderrPolicy::Lenient);
    let (res, out) = run(config, &path, &[]).await;
    assert!(res.is_ok(), "Got: {:?}", res);
    let expected: Vec<String> = (1..=2000).map(|i| format!("line {}", i)).collect();
    let got: Vec<&str> = out.lines().collect();
    assert_eq!(got, expected);
    Ok(())
}
