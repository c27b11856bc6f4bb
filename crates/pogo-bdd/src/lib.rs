//! Behaviour-driven test harness for the `pogo` OCR tool and its HTTP
//! service.
//!
//! Scenarios drive the tool through textual directives, in-process or as a
//! subprocess, and check what comes back with the predicates in [`verify`].
//! Servers are either the real binary or the deterministic [`mock`] service.

pub mod config;
pub mod context;
pub mod error;
pub mod exec;
pub mod http;
pub mod logging;
pub mod mock;
pub mod ocr_result;
pub mod sanitize;
pub mod server;
pub mod tool;
pub mod verify;

pub use config::{load_config, load_config_from_str, HarnessConfig};
pub use context::{ModelKind, TestContext};
pub use error::{
    ConfigError, HarnessError, HttpError, PreconditionError, Result, ServerError, VerifyError,
};
pub use exec::{CommandOutcome, EnvOverrides, ExecutionMode, Executor};
pub use http::{HttpClient, HttpExchange};
pub use mock::MockService;
pub use ocr_result::{ImageResponse, OcrRegion, OutputFormat};
pub use server::{MockServer, ProcessServer, ServerAddress, ServerBackend, ServerManager, ServerState};
pub use tool::{InvocationConfig, SyntheticTool, ToolEntry, ToolIo};
