//! In-process execution: the tool's entry point runs inside the test
//! process with its streams captured.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use log::{debug, warn};

use crate::config::HarnessConfig;
use crate::tool::{InvocationConfig, ToolEntry, ToolIo};

use super::directive::has_flag;
use super::env::{CwdGuard, EnvGuard, EnvOverrides};

/// Exit code reported when the entry point panics.
pub const PANIC_EXIT_CODE: i32 = 101;

/// Process env and cwd are global; only one invocation may hold them.
static IN_PROCESS_LOCK: Mutex<()> = Mutex::new(());

pub struct InProcessResult {
    pub exit_code: i32,
    pub output: String,
    pub error: Option<String>,
}

/// Runs `args` (program name included) through `tool`.
///
/// No cancellation: once started the entry point runs to completion.
pub fn run(
    tool: &dyn ToolEntry,
    config: &HarnessConfig,
    args: &[String],
    env: &EnvOverrides,
    working_dir: &Path,
) -> InProcessResult {
    let mut args: Vec<String> = args.iter().skip(1).cloned().collect();

    let models_dir = resolve_models_dir(config, env);
    if let Some(dir) = &models_dir {
        if !has_flag(&args, &config.models_dir_flag) {
            debug!("Injecting {} {}", config.models_dir_flag, dir.display());
            args.push(config.models_dir_flag.clone());
            args.push(dir.to_string_lossy().into_owned());
        }
    }

    let invocation = InvocationConfig {
        env: env.effective(),
        working_dir: working_dir.to_path_buf(),
        models_dir,
    };

    let _lock = IN_PROCESS_LOCK
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    let mut io = ToolIo::default();
    let _env_guard = EnvGuard::apply(&invocation.env);
    let _cwd_guard = match CwdGuard::enter(working_dir) {
        Ok(guard) => guard,
        Err(e) => {
            return InProcessResult {
                exit_code: -1,
                output: String::new(),
                error: Some(format!(
                    "failed to enter working directory {}: {}",
                    working_dir.display(),
                    e
                )),
            };
        }
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        tool.run(&args, &invocation, &mut io)
    }));

    match outcome {
        Ok(exit_code) => InProcessResult {
            exit_code,
            output: io.combined(),
            error: None,
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!("Tool panicked: {}", message);
            let _ = writeln!(io.err(), "panic: {}", message);
            InProcessResult {
                exit_code: PANIC_EXIT_CODE,
                output: io.combined(),
                error: Some(format!("panicked: {}", message)),
            }
        }
    }
}

/// Scenario override first, then the test process's own environment.
fn resolve_models_dir(config: &HarnessConfig, env: &EnvOverrides) -> Option<PathBuf> {
    env.get(&config.models_dir_env)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(&config.models_dir_env).map(PathBuf::from))
        .filter(|p| !p.as_os_str().is_empty())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
