//! Command execution engine.
//!
//! A directive is run either through the tool's entry point inside this
//! process or as a child process. The caller picks the mode; outcomes,
//! including non-zero exits and launch failures, come back as
//! [`CommandOutcome`] data rather than errors.

pub mod directive;
pub mod env;
pub mod in_process;
pub mod subprocess;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use log::{debug, info};
use tracing::Instrument;

use crate::config::HarnessConfig;
use crate::error::PreconditionError;
use crate::sanitize;
use crate::tool::ToolEntry;

pub use env::{CwdGuard, EnvGuard, EnvOverrides};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    InProcess,
    Subprocess,
}

impl ExecutionMode {
    /// `InProcess` when the directive's first word is the tool's own
    /// program name, `Subprocess` otherwise.
    pub fn suggested_for(directive: &str, tool_name: &str) -> Self {
        match directive.split_whitespace().next() {
            Some(program) if program == tool_name => ExecutionMode::InProcess,
            _ => ExecutionMode::Subprocess,
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::InProcess => write!(f, "in-process"),
            ExecutionMode::Subprocess => write!(f, "subprocess"),
        }
    }
}

/// Observable result of one directive.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub directive: String,
    pub mode: ExecutionMode,
    /// Combined stdout and stderr.
    pub output: String,
    pub exit_code: i32,
    /// Why the run ended abnormally (launch failure, timeout, panic).
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Resolved against the working directory when the directive named
    /// `--output`/`-o`.
    pub output_file: Option<PathBuf>,
}

impl CommandOutcome {
    /// An outcome with no output yet and exit code 0.
    pub fn started(directive: &str, mode: ExecutionMode) -> Self {
        Self {
            directive: directive.to_string(),
            mode,
            output: String::new(),
            exit_code: 0,
            error: None,
            started_at: Utc::now(),
            duration: Duration::ZERO,
            output_file: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0 && self.error.is_none()
    }
}

/// Runs directives with a fixed configuration and, for in-process mode,
/// the tool entry point.
#[derive(Clone)]
pub struct Executor {
    config: Arc<HarnessConfig>,
    tool: Option<Arc<dyn ToolEntry>>,
}

impl Executor {
    pub fn new(config: Arc<HarnessConfig>) -> Self {
        Self { config, tool: None }
    }

    pub fn with_tool(mut self, tool: Arc<dyn ToolEntry>) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn has_tool(&self) -> bool {
        self.tool.is_some()
    }

    /// Executes an already substituted directive.
    ///
    /// Only an empty directive or a missing in-process tool is an error;
    /// everything the command itself does ends up in the outcome.
    pub async fn run(
        &self,
        directive: &str,
        mode: ExecutionMode,
        env: &EnvOverrides,
        working_dir: &Path,
    ) -> Result<CommandOutcome, PreconditionError> {
        let args = directive::tokenize(directive);
        if args.is_empty() {
            return Err(PreconditionError::EmptyDirective);
        }

        let span = tracing::info_span!(
            "exec",
            mode = %mode,
            program = %args[0],
            cwd = %sanitize::redact_path(working_dir),
        );

        let mut outcome = CommandOutcome::started(directive, mode);
        let timer = Instant::now();

        match mode {
            ExecutionMode::InProcess => {
                let tool = self
                    .tool
                    .as_ref()
                    .ok_or_else(|| PreconditionError::NoTool(args[0].clone()))?;
                let _entered = span.enter();
                let result = in_process::run(tool.as_ref(), &self.config, &args, env, working_dir);
                outcome.exit_code = result.exit_code;
                outcome.output = result.output;
                outcome.error = result.error;
            }
            ExecutionMode::Subprocess => {
                let result = subprocess::run(&args, env, working_dir, self.config.command_timeout())
                    .instrument(span)
                    .await;
                outcome.exit_code = result.exit_code;
                outcome.output = result.output;
                outcome.error = result.error;
            }
        }

        outcome.duration = timer.elapsed();
        outcome.output_file = directive::any_flag_value(&args, &["--output", "-o"])
            .map(|p| resolve_output_file(working_dir, p));

        info!(
            "{} '{}' exited {} in {:?}",
            mode, args[0], outcome.exit_code, outcome.duration
        );
        debug!("output: {}", sanitize::preview(&outcome.output));

        Ok(outcome)
    }
}

fn resolve_output_file(working_dir: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        working_dir.join(path)
    }
}
