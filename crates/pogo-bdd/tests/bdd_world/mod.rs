use std::fmt;
use std::net::TcpListener;
use std::sync::Arc;

use pogo_bdd::logging::init_test_logging;
use pogo_bdd::{HarnessConfig, SyntheticTool, TestContext};

#[derive(cucumber::World)]
#[world(init = Self::new)]
pub struct World {
    pub ctx: TestContext,
    /// Message of the last step that was expected to fail.
    pub last_error: Option<String>,
    /// Keeps a port busy for port-in-use scenarios.
    pub occupied: Option<TcpListener>,
}

impl World {
    pub fn new() -> Self {
        init_test_logging();
        let config = HarnessConfig::from_env().unwrap_or_else(|e| panic!("{}", e));
        Self {
            ctx: TestContext::new(Arc::new(config)).with_tool(Arc::new(SyntheticTool::new())),
            last_error: None,
            occupied: None,
        }
    }

    pub fn occupy_port(&mut self) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind occupying listener");
        let port = listener.local_addr().expect("local addr").port();
        self.occupied = Some(listener);
        port
    }

    pub fn occupied_port(&self) -> u16 {
        self.occupied
            .as_ref()
            .and_then(|l| l.local_addr().ok())
            .map(|a| a.port())
            .expect("a port should have been occupied by an earlier step")
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("World");
        match self.ctx.last_command() {
            Ok(cmd) => s
                .field("directive", &cmd.directive)
                .field("exit_code", &cmd.exit_code)
                .field("output", &cmd.output),
            Err(_) => s.field("directive", &None::<String>),
        };
        s.field("server", &self.ctx.server().active_kind())
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Unwraps step results, failing the step with the error's full message.
pub trait OrFail<T> {
    fn or_fail(self) -> T;
}

impl<T, E: fmt::Display> OrFail<T> for Result<T, E> {
    fn or_fail(self) -> T {
        self.unwrap_or_else(|e| panic!("{}", e))
    }
}

/// Free port for a server that is expected to fail before binding.
pub fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind port listener");
    listener.local_addr().expect("local addr").port()
}
