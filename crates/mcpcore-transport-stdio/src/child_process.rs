//! Parent-side process supervisor for the stdio transport (§2/§4.8.3/§6):
//! launches a child with an optional environment map and working directory,
//! wires its stdio pipes to a [`StdioTransport`], and terminates it by
//! closing stdin, waiting, then signal-then-kill.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::transport::StdioTransport;

/// How long to wait after a signal before escalating to the next one.
const TERMINATE_GRACE: Duration = Duration::from_secs(2);

#[derive(Clone, Debug)]
pub struct ChildProcessConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Working directory for the child. `None` inherits the parent's.
    pub working_directory: Option<String>,
    /// Environment variables set on top of the parent's environment.
    pub environment: Option<Vec<(String, String)>>,
    /// How long to wait for a clean exit after stdin is closed before
    /// escalating to a terminate signal (§6: "if still alive after 5 seconds").
    pub shutdown_timeout: Duration,
}

impl Default for ChildProcessConfig {
    fn default() -> Self {
        Self {
            command: String::new(),
            args: Vec::new(),
            working_directory: None,
            environment: None,
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Owns the spawned child and its shutdown sequence; the stdio framing
/// itself lives in the [`StdioTransport`] returned alongside it.
pub struct ChildProcessLauncher {
    child: Mutex<Child>,
    config: ChildProcessConfig,
}

impl ChildProcessLauncher {
    /// Spawn `config.command`, pipe its stdio, and build the transport over
    /// it. Stderr is tapped line-by-line into `tracing` rather than exposed
    /// to the caller, matching §4.8.3's "free-form log channel."
    pub fn spawn(config: ChildProcessConfig) -> io::Result<(Self, StdioTransport)> {
        if config.command.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "command cannot be empty"));
        }

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref dir) = config.working_directory {
            cmd.current_dir(dir);
        }
        if let Some(ref env) = config.environment {
            for (key, value) in env {
                cmd.env(key, value);
            }
        }

        info!(command = %config.command, args = ?config.args, "spawning child process");
        let mut child = cmd.spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "child process did not expose a stdin pipe")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "child process did not expose a stdout pipe")
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(tap_stderr(stderr));
        }

        let transport = StdioTransport::from_raw(stdout, stdin);
        Ok((Self { child: Mutex::new(child), config }, transport))
    }

    /// Close `transport`'s stdin, wait up to `shutdown_timeout` for the
    /// child to exit on its own, then escalate: terminate signal, a further
    /// grace period, then a hard kill (§6).
    pub async fn shutdown(&self, transport: &StdioTransport) -> io::Result<()> {
        transport.close_writer().await;

        let mut child = self.child.lock().await;
        if timeout(self.config.shutdown_timeout, child.wait()).await.is_ok() {
            debug!("child process exited after stdin closed");
            return Ok(());
        }

        warn!("child process still alive after shutdown_timeout, sending terminate signal");
        send_terminate_signal(&child);
        if timeout(TERMINATE_GRACE, child.wait()).await.is_ok() {
            return Ok(());
        }

        warn!("child process ignored terminate signal, killing");
        child.kill().await
    }

    /// `true` if the child has not yet exited.
    pub async fn is_running(&self) -> bool {
        matches!(self.child.lock().await.try_wait(), Ok(None))
    }
}

async fn tap_stderr(stderr: tokio::process::ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => warn!(target: "child_process::stderr", "{line}"),
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "child process stderr read error");
                break;
            }
        }
    }
}

#[cfg(unix)]
fn send_terminate_signal(child: &Child) {
    if let Some(pid) = child.id() {
        // SAFETY: `pid` names a process this launcher spawned and still holds
        // a handle to; sending SIGTERM to it is the documented escalation
        // step before a hard kill.
        let result = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if result != 0 {
            warn!(pid, "failed to deliver SIGTERM to child process");
        }
    }
}

#[cfg(not(unix))]
fn send_terminate_signal(_child: &Child) {
    // No portable graceful-terminate signal outside Unix; the caller's
    // subsequent `kill()` call is the only escalation available.
}
