//! Subprocess execution under a deadline.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use super::env::EnvOverrides;

/// Exit code recorded for launch failures, timeouts and signal deaths.
pub const ABNORMAL_EXIT_CODE: i32 = -1;

pub struct SubprocessResult {
    pub exit_code: i32,
    /// stdout and stderr lines interleaved in arrival order.
    pub output: String,
    pub error: Option<String>,
}

impl SubprocessResult {
    fn abnormal(output: String, error: String) -> Self {
        Self {
            exit_code: ABNORMAL_EXIT_CODE,
            output,
            error: Some(error),
        }
    }
}

/// Spawns `args[0]` with the remaining arguments. The child inherits the
/// test process environment with `env` layered on top.
pub async fn run(
    args: &[String],
    env: &EnvOverrides,
    working_dir: &Path,
    deadline: Duration,
) -> SubprocessResult {
    let Some((program, rest)) = args.split_first() else {
        return SubprocessResult::abnormal(String::new(), "empty command line".to_string());
    };

    let mut command = Command::new(program);
    command
        .args(rest)
        .envs(env.effective())
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!("Failed to launch {}: {}", program, e);
            return SubprocessResult::abnormal(
                String::new(),
                format!("failed to launch '{}': {}", program, e),
            );
        }
    };
    debug!("Spawned {} (pid {:?})", program, child.id());

    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
    if let Some(stdout) = child.stdout.take() {
        tokio::spawn(forward_lines(stdout, tx.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(forward_lines(stderr, tx.clone()));
    }
    drop(tx);

    let mut captured = Vec::new();
    let waited = tokio::time::timeout(deadline, async {
        let drain = async {
            while let Some(line) = rx.recv().await {
                captured.extend_from_slice(&line);
            }
        };
        let (status, ()) = tokio::join!(child.wait(), drain);
        status
    })
    .await;

    match waited {
        Ok(Ok(status)) => {
            let output = String::from_utf8_lossy(&captured).into_owned();
            from_status(status, output)
        }
        Ok(Err(e)) => SubprocessResult::abnormal(
            String::from_utf8_lossy(&captured).into_owned(),
            format!("failed to wait for '{}': {}", program, e),
        ),
        Err(_) => {
            warn!("{} timed out after {}s, killing", program, deadline.as_secs());
            if let Err(e) = child.start_kill() {
                debug!("start_kill failed: {}", e);
            }
            let _ = child.wait().await;
            while let Ok(line) = rx.try_recv() {
                captured.extend_from_slice(&line);
            }
            SubprocessResult::abnormal(
                String::from_utf8_lossy(&captured).into_owned(),
                format!("timed out after {}s", deadline.as_secs()),
            )
        }
    }
}

fn from_status(status: ExitStatus, output: String) -> SubprocessResult {
    match status.code() {
        Some(code) => SubprocessResult {
            exit_code: code,
            output,
            error: None,
        },
        None => SubprocessResult::abnormal(output, describe_signal(status)),
    }
}

#[cfg(unix)]
fn describe_signal(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;
    match status.signal() {
        Some(signal) => format!("terminated by signal {}", signal),
        None => "terminated without an exit code".to_string(),
    }
}

#[cfg(not(unix))]
fn describe_signal(_status: ExitStatus) -> String {
    "terminated without an exit code".to_string()
}

async fn forward_lines<R>(reader: R, tx: mpsc::UnboundedSender<Vec<u8>>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!("Stopped reading child output: {}", e);
                break;
            }
        }
    }
}
