//! Server lifecycle: `Idle -> Starting -> Ready -> Stopping -> Idle`.
//!
//! A scenario talks to one server at a time, either a spawned
//! [`ProcessServer`] or an in-memory [`MockServer`]. Callers ask the
//! [`ServerManager`] for the base URL without caring which one it is.

pub mod health;
mod mock;
mod process;

use std::fmt;

use async_trait::async_trait;
use log::info;

use crate::config::HarnessConfig;
use crate::error::ServerError;
use crate::exec::directive::flag_value;

pub use mock::MockServer;
pub use process::{resolve_program, ProcessServer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Idle,
    Starting,
    Ready,
    Stopping,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServerState::Idle => "idle",
            ServerState::Starting => "starting",
            ServerState::Ready => "ready",
            ServerState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// One way of providing the HTTP service to a scenario.
#[async_trait]
pub trait ServerBackend: Send + Sync {
    /// Short name used in logs and errors, e.g. `process` or `mock`.
    fn kind(&self) -> &'static str;

    /// Returns once the service answers its health endpoint.
    async fn start(&mut self) -> Result<(), ServerError>;

    async fn stop(&mut self) -> Result<(), ServerError>;

    /// `None` until started.
    fn base_url(&self) -> Option<String>;

    async fn is_healthy(&self) -> bool;

    /// Requests served so far, when the backend counts them.
    fn request_count(&self) -> Option<usize> {
        None
    }

    /// Synchronous best-effort shutdown for drop paths.
    fn kill_now(&mut self) {}
}

/// Host and port a server directive asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    pub host: String,
    pub port: u16,
}

impl ServerAddress {
    /// Reads `--host` and `--port` (either `--flag value` or
    /// `--flag=value`), defaulting to the configured address.
    pub fn from_directive(args: &[String], config: &HarnessConfig) -> Result<Self, String> {
        let host = flag_value(args, "--host")
            .unwrap_or(&config.default_host)
            .to_string();
        let port = match flag_value(args, "--port") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| format!("invalid port '{}': {}", raw, e))?,
            None => config.default_port,
        };
        Ok(Self { host, port })
    }

    /// Host to connect to; wildcard bind addresses map to loopback.
    pub fn connect_host(&self) -> &str {
        match self.host.as_str() {
            "0.0.0.0" => "127.0.0.1",
            "::" | "[::]" => "::1",
            host => host,
        }
    }

    pub fn base_url(&self) -> String {
        let host = self.connect_host();
        if host.contains(':') && !host.starts_with('[') {
            format!("http://[{}]:{}", host, self.port)
        } else {
            format!("http://{}:{}", host, self.port)
        }
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Holds at most one active backend per scenario.
pub struct ServerManager {
    state: ServerState,
    backend: Option<Box<dyn ServerBackend>>,
}

impl Default for ServerManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerManager {
    pub fn new() -> Self {
        Self {
            state: ServerState::Idle,
            backend: None,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.backend.is_some()
    }

    pub fn active_kind(&self) -> Option<&'static str> {
        self.backend.as_ref().map(|b| b.kind())
    }

    /// Starts `backend`. A second start while one is active is rejected
    /// instead of silently replacing the running server.
    pub async fn start(&mut self, mut backend: Box<dyn ServerBackend>) -> Result<(), ServerError> {
        if let Some(active) = &self.backend {
            return Err(ServerError::AlreadyRunning {
                active: active.kind(),
            });
        }

        self.state = ServerState::Starting;
        match backend.start().await {
            Ok(()) => {
                info!(
                    "{} server ready at {}",
                    backend.kind(),
                    backend.base_url().unwrap_or_default()
                );
                self.backend = Some(backend);
                self.state = ServerState::Ready;
                Ok(())
            }
            Err(e) => {
                self.state = ServerState::Idle;
                Err(e)
            }
        }
    }

    pub async fn stop(&mut self) -> Result<(), ServerError> {
        let Some(mut backend) = self.backend.take() else {
            return Ok(());
        };
        self.state = ServerState::Stopping;
        let result = backend.stop().await;
        self.state = ServerState::Idle;
        info!("{} server stopped", backend.kind());
        result
    }

    pub fn base_url(&self) -> Option<String> {
        self.backend.as_ref().and_then(|b| b.base_url())
    }

    pub async fn is_healthy(&self) -> bool {
        match &self.backend {
            Some(backend) => backend.is_healthy().await,
            None => false,
        }
    }

    pub fn request_count(&self) -> Option<usize> {
        self.backend.as_ref().and_then(|b| b.request_count())
    }

    pub fn kill_now(&mut self) {
        if let Some(backend) = self.backend.as_mut() {
            backend.kill_now();
        }
        self.backend = None;
        self.state = ServerState::Idle;
    }
}
