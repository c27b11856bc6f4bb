//! A real server binary spawned as a child process.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tracing::Instrument;

use crate::config::HarnessConfig;
use crate::error::ServerError;
use crate::exec::directive::tokenize;
use crate::exec::EnvOverrides;
use crate::http::HttpClient;
use crate::sanitize;

use super::health;
use super::{ServerAddress, ServerBackend};

const PORT_CHECK_TIMEOUT: Duration = Duration::from_millis(200);
/// Bytes of the server log attached to a readiness failure.
const LOG_TAIL_BYTES: usize = 4096;

pub struct ProcessServer {
    config: Arc<HarnessConfig>,
    program: PathBuf,
    args: Vec<String>,
    address: ServerAddress,
    env: EnvOverrides,
    working_dir: PathBuf,
    log_path: PathBuf,
    client: HttpClient,
    child: Option<Child>,
}

impl ProcessServer {
    /// Prepares (but does not start) the server named by `directive`.
    ///
    /// A directive that opens with a flag (`--port 9000`) runs the configured
    /// `server_program`. The server's stdout and stderr go to `log_path`.
    pub fn from_directive(
        config: Arc<HarnessConfig>,
        directive: &str,
        env: EnvOverrides,
        working_dir: &Path,
        log_path: PathBuf,
    ) -> Result<Self, ServerError> {
        let mut args = tokenize(directive);
        if args.is_empty() {
            return Err(ServerError::Directive {
                directive: directive.to_string(),
                reason: "empty directive".to_string(),
            });
        }
        let program_name = if args[0].starts_with('-') {
            config.server_program.clone()
        } else {
            args.remove(0)
        };
        let address = ServerAddress::from_directive(&args, &config).map_err(|reason| {
            ServerError::Directive {
                directive: directive.to_string(),
                reason,
            }
        })?;
        let program = resolve_program(&program_name, &config.build_dirs, working_dir);
        let client = HttpClient::with_timeout(config.health_poll_interval().max(Duration::from_secs(1)))
            .map_err(|e| ServerError::Directive {
                directive: directive.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            config,
            program,
            args,
            address,
            env,
            working_dir: working_dir.to_path_buf(),
            log_path,
            client,
            child: None,
        })
    }

    pub fn address(&self) -> &ServerAddress {
        &self.address
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().and_then(Child::id)
    }

    async fn port_in_use(&self) -> bool {
        let target = (self.address.connect_host(), self.address.port);
        matches!(
            tokio::time::timeout(PORT_CHECK_TIMEOUT, TcpStream::connect(target)).await,
            Ok(Ok(_))
        )
    }

    fn spawn(&mut self) -> Result<(), ServerError> {
        let program = self.program.to_string_lossy().into_owned();
        let spawn_error = |source| ServerError::Spawn {
            program: program.clone(),
            source,
        };

        let log = File::create(&self.log_path).map_err(spawn_error)?;
        let log_err = log.try_clone().map_err(spawn_error)?;

        let child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.env.effective())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err))
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        info!(
            "Spawned {} (pid {:?}) for {}",
            sanitize::redact_path(&self.program),
            child.id(),
            self.address
        );
        self.child = Some(child);
        Ok(())
    }

    fn log_tail(&self) -> String {
        match std::fs::read(&self.log_path) {
            Ok(bytes) => {
                let start = bytes.len().saturating_sub(LOG_TAIL_BYTES);
                String::from_utf8_lossy(&bytes[start..]).into_owned()
            }
            Err(e) => format!("<server log unavailable: {}>", e),
        }
    }
}

#[async_trait]
impl ServerBackend for ProcessServer {
    fn kind(&self) -> &'static str {
        "process"
    }

    async fn start(&mut self) -> Result<(), ServerError> {
        let span = tracing::info_span!("server.start", address = %self.address);
        async {
            if self.port_in_use().await {
                return Err(ServerError::PortInUse {
                    host: self.address.host.clone(),
                    port: self.address.port,
                });
            }

            self.spawn()?;

            let health_url = format!("{}/health", self.address.base_url());
            let child = &mut self.child;
            let ready = health::wait_until_ready(
                &self.client,
                &health_url,
                self.config.health_poll_interval(),
                self.config.health_timeout(),
                || exit_reason(child),
            )
            .await;

            match ready {
                Ok(()) => {
                    info!("Server ready at {}", self.address.base_url());
                    Ok(())
                }
                Err(reason) => {
                    warn!("Server at {} not ready: {}", self.address, reason);
                    if let Err(e) = self.stop().await {
                        warn!("Cleanup after failed start: {}", e);
                    }
                    Err(ServerError::NotReady {
                        url: health_url,
                        timeout_ms: self.config.health_timeout_ms,
                        reason,
                        log: self.log_tail(),
                    })
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn stop(&mut self) -> Result<(), ServerError> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let pid = child.id().unwrap_or(0);
        let stop_error = |reason: String| ServerError::Stop { pid, reason };

        if child.id().is_some() {
            if let Err(reason) = terminate(&child) {
                debug!("SIGTERM to {} failed ({}), killing", pid, reason);
                child.start_kill().map_err(|e| stop_error(e.to_string()))?;
            }

            if tokio::time::timeout(self.config.stop_grace(), child.wait())
                .await
                .is_err()
            {
                warn!(
                    "Server {} ignored SIGTERM for {}ms, killing",
                    pid, self.config.stop_grace_ms
                );
                child.start_kill().map_err(|e| stop_error(e.to_string()))?;
            }
        }

        let status = child.wait().await.map_err(|e| stop_error(e.to_string()))?;
        info!("Server {} exited with {}", pid, status);
        Ok(())
    }

    fn base_url(&self) -> Option<String> {
        Some(self.address.base_url())
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/health", self.address.base_url());
        self.client.is_ok(&url).await.unwrap_or(false)
    }

    fn kill_now(&mut self) {
        if let Some(child) = self.child.as_mut() {
            if let Err(e) = child.start_kill() {
                debug!("kill on teardown: {}", e);
            }
        }
    }
}

fn exit_reason(child: &mut Option<Child>) -> Option<String> {
    let child = child.as_mut()?;
    match child.try_wait() {
        Ok(Some(status)) => Some(format!("server process exited early with {}", status)),
        Ok(None) => None,
        Err(e) => Some(format!("failed to poll server process: {}", e)),
    }
}

#[cfg(unix)]
fn terminate(child: &Child) -> Result<(), String> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = child.id().ok_or_else(|| "process already reaped".to_string())?;
    let pid = i32::try_from(pid).map_err(|e| e.to_string())?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(|e| e.to_string())
}

#[cfg(not(unix))]
fn terminate(_child: &Child) -> Result<(), String> {
    Err("graceful termination is not supported on this platform".to_string())
}

/// A bare program name is looked up in the build directories under
/// `working_dir`; anything else, or a name found nowhere, is used as given.
pub fn resolve_program(program: &str, build_dirs: &[String], working_dir: &Path) -> PathBuf {
    let as_path = Path::new(program);
    if as_path.components().count() > 1 {
        return if as_path.is_absolute() {
            as_path.to_path_buf()
        } else {
            working_dir.join(as_path)
        };
    }

    build_dirs
        .iter()
        .map(|dir| working_dir.join(dir).join(program))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| as_path.to_path_buf())
}
