//! Bounded external-process execution shared by both stages.
//!
//! Every external call goes through [`run`]: the child runs on the tokio
//! process driver (so other requests keep being served while it works), its
//! output is captured for diagnostics, and it is killed if it outlives the
//! timeout or if the awaiting future is dropped (client went away).

use crate::config::CommandSpec;
use std::ffi::OsString;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// What a finished child left behind.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    /// `None` when the child was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub elapsed_ms: u64,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Why [`run`] did not produce a [`CommandOutcome`].
#[derive(Debug)]
pub enum CommandFailure {
    /// The program could not be started at all.
    Spawn(std::io::Error),
    /// The child outlived its timeout and was killed.
    TimedOut,
}

/// A fully assembled invocation: program, prefix, stage args and child env.
#[derive(Debug, Clone)]
pub struct Invocation {
    program: String,
    args: Vec<OsString>,
    envs: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(spec: &CommandSpec) -> Self {
        Self {
            program: spec.program.clone(),
            args: spec.leading_args.iter().map(OsString::from).collect(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set a variable in the child's environment only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn envs(&self) -> &[(String, String)] {
        &self.envs
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut s = self.program.clone();
        for a in &self.args {
            s.push(' ');
            s.push_str(&a.to_string_lossy());
        }
        s
    }
}

/// Run `invocation` to completion, killing it after `timeout`.
pub async fn run(invocation: &Invocation, timeout: Duration) -> Result<CommandOutcome, CommandFailure> {
    let start = Instant::now();
    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .envs(invocation.envs.iter().map(|(k, v)| (k, v)))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    debug!("Running: {}", invocation.display());
    let child = cmd.spawn().map_err(CommandFailure::Spawn)?;

    // On timeout the `wait_with_output` future is dropped, which drops the
    // child and with it (kill_on_drop) the process.
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(CommandFailure::Spawn(e)),
        Err(_) => return Err(CommandFailure::TimedOut),
    };

    Ok(CommandOutcome {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        elapsed_ms: start.elapsed().as_millis() as u64,
    })
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Invocation {
        Invocation::new(&CommandSpec::new("sh").with_args(["-c", script, "sh"]))
    }

    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let out = run(&sh("echo hello; echo oops >&2; exit 3"), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(out.code, Some(3));
        assert!(!out.success());
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn stage_args_follow_leading_args() {
        let inv = sh("printf '%s %s' \"$1\" \"$2\"").arg("-p").arg("in.pdf");
        let out = run(&inv, Duration::from_secs(10)).await.unwrap();
        assert!(out.success());
        assert_eq!(out.stdout.trim(), "-p in.pdf");
    }

    #[tokio::test]
    async fn env_is_scoped_to_the_child() {
        let inv = sh("echo \"$DOCPARSE_TEST_SCOPED\"").env("DOCPARSE_TEST_SCOPED", "modelscope");
        let out = run(&inv, Duration::from_secs(10)).await.unwrap();
        assert_eq!(out.stdout.trim(), "modelscope");
        assert!(std::env::var("DOCPARSE_TEST_SCOPED").is_err());
    }

    #[tokio::test]
    async fn slow_child_times_out() {
        let err = run(&sh("sleep 5"), Duration::from_millis(100)).await.unwrap_err();
        assert!(matches!(err, CommandFailure::TimedOut));
    }

    #[tokio::test]
    async fn missing_program_is_spawn_failure() {
        let inv = Invocation::new(&CommandSpec::new("/definitely/not/a/program"));
        let err = run(&inv, Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, CommandFailure::Spawn(_)));
    }

    #[test]
    fn display_joins_program_and_args() {
        let inv = Invocation::new(&CommandSpec::new("mineru")).arg("-p").arg("a.pdf");
        assert_eq!(inv.display(), "mineru -p a.pdf");
    }
}
